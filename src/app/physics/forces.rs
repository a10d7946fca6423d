use glam::{Vec3, vec3};

use crate::payload::EntityCategory;

use super::SpringLink;
use super::octree::{OctNode, for_each_pair_within};

const MIN_DISTANCE: f32 = 1e-4;
/// Separated pairs land this far past contact so neighbouring pushes do not re-trigger them.
const COLLISION_SLACK: f32 = 0.05;
const CATEGORY_COUNT: usize = EntityCategory::ALL.len();

#[derive(Clone, Copy)]
pub(super) struct RepulsionParams {
    pub(super) same_type: f32,
    pub(super) cross_type: f32,
    pub(super) softening: f32,
    pub(super) cutoff: f32,
}

pub(super) fn accumulate_springs(
    links: &[SpringLink],
    positions: &[Vec3],
    fixed: &[bool],
    rest_length: f32,
    strength: f32,
    forces: &mut [Vec3],
) {
    let node_count = positions.len();
    for link in links {
        let (source, target) = (link.source, link.target);
        if source >= node_count || target >= node_count || source == target {
            continue;
        }

        let delta = positions[target] - positions[source];
        let distance = delta.length();
        if distance <= MIN_DISTANCE {
            continue;
        }

        let direction = delta / distance;
        let pull = direction * ((distance - rest_length) * strength * link.weight);
        if !fixed[source] {
            forces[source] += pull;
        }
        if !fixed[target] {
            forces[target] -= pull;
        }
    }
}

pub(super) fn accumulate_repulsion(
    tree: &OctNode,
    positions: &[Vec3],
    categories: &[EntityCategory],
    params: RepulsionParams,
    forces: &mut [Vec3],
) {
    let cutoff_sq = params.cutoff * params.cutoff;
    for_each_pair_within(tree, tree, true, cutoff_sq, &mut |a, b| {
        let delta = positions[a] - positions[b];
        let distance_sq = delta.length_squared();
        if distance_sq > cutoff_sq || distance_sq <= MIN_DISTANCE * MIN_DISTANCE {
            return;
        }

        let multiplier = if categories[a] == categories[b] {
            params.same_type
        } else {
            params.cross_type
        };
        let direction = delta / distance_sq.sqrt();
        let push = direction * (multiplier / (distance_sq + params.softening));
        forces[a] += push;
        forces[b] -= push;
    });
}

pub(super) fn accumulate_clustering(
    positions: &[Vec3],
    categories: &[EntityCategory],
    fixed: &[bool],
    strength: f32,
    forces: &mut [Vec3],
) {
    if strength <= 0.0 {
        return;
    }

    let mut sums = [Vec3::ZERO; CATEGORY_COUNT];
    let mut counts = [0u32; CATEGORY_COUNT];
    for (position, category) in positions.iter().zip(categories) {
        sums[category.index()] += *position;
        counts[category.index()] += 1;
    }

    for (index, position) in positions.iter().enumerate() {
        if fixed[index] {
            continue;
        }
        let slot = categories[index].index();
        if counts[slot] < 2 {
            continue;
        }
        let centroid = sums[slot] / counts[slot] as f32;
        forces[index] += (centroid - *position) * strength;
    }
}

pub(super) fn accumulate_centering(
    positions: &[Vec3],
    fixed: &[bool],
    strength: f32,
    forces: &mut [Vec3],
) {
    for (index, position) in positions.iter().enumerate() {
        if !fixed[index] {
            forces[index] -= *position * strength;
        }
    }
}

fn fallback_direction(from: usize, to: usize) -> Vec3 {
    let angle = ((from as f32) * 0.618_034 + (to as f32) * 0.414_214) * std::f32::consts::TAU;
    vec3(angle.cos(), angle.sin(), 0.0)
}

/// Pushes overlapping pairs apart in place; returns how many pairs were corrected.
pub(super) fn resolve_collisions(
    positions: &mut [Vec3],
    radii: &[f32],
    fixed: &[bool],
    padding: f32,
) -> usize {
    let max_radius = radii.iter().copied().fold(0.0_f32, f32::max);
    let max_collision_distance = (max_radius * 2.0) + padding;
    if max_collision_distance <= 0.0 {
        return 0;
    }

    let Some(tree) = OctNode::build(positions) else {
        return 0;
    };

    let mut corrected = 0usize;
    let max_distance_sq = max_collision_distance * max_collision_distance;
    for_each_pair_within(&tree, &tree, true, max_distance_sq, &mut |a, b| {
        if fixed[a] && fixed[b] {
            return;
        }

        let min_distance = radii[a] + radii[b] + padding;
        let delta = positions[a] - positions[b];
        let distance = delta.length();
        if distance >= min_distance {
            return;
        }

        let direction = if distance > MIN_DISTANCE {
            delta / distance
        } else {
            fallback_direction(a, b)
        };
        let overlap = min_distance - distance + COLLISION_SLACK;

        match (fixed[a], fixed[b]) {
            (false, false) => {
                positions[a] += direction * (overlap * 0.5);
                positions[b] -= direction * (overlap * 0.5);
            }
            (false, true) => positions[a] += direction * overlap,
            (true, false) => positions[b] -= direction * overlap,
            (true, true) => return,
        }
        corrected += 1;
    });

    corrected
}
