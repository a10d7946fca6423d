use glam::{Vec3, vec3};

const OCTREE_LEAF_CAPACITY: usize = 12;
const OCTREE_MAX_DEPTH: usize = 10;

#[derive(Clone, Copy, Debug)]
pub(super) struct OctBounds {
    pub(super) center: Vec3,
    pub(super) half_extent: f32,
}

impl OctBounds {
    fn from_points(points: &[Vec3]) -> Option<Self> {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);

        for point in points {
            min = min.min(*point);
            max = max.max(*point);
        }

        if !min.is_finite() || !max.is_finite() {
            return None;
        }

        let center = (min + max) * 0.5;
        let span = (max - min).max(Vec3::ONE);
        let half_extent = (span.max_element() * 0.5) + 1.0;

        Some(Self {
            center,
            half_extent,
        })
    }

    fn child(self, octant: usize) -> Self {
        let quarter = self.half_extent * 0.5;
        let sign = |bit: usize| if octant & bit == 0 { -quarter } else { quarter };

        Self {
            center: self.center + vec3(sign(1), sign(2), sign(4)),
            half_extent: quarter,
        }
    }

    fn octant_for(self, point: Vec3) -> usize {
        usize::from(point.x >= self.center.x)
            | (usize::from(point.y >= self.center.y) << 1)
            | (usize::from(point.z >= self.center.z) << 2)
    }

    pub(super) fn distance_sq_to(self, other: Self) -> f32 {
        let reach = self.half_extent + other.half_extent;
        let gap = ((self.center - other.center).abs() - Vec3::splat(reach)).max(Vec3::ZERO);
        gap.length_squared()
    }
}

pub(super) struct OctNode {
    pub(super) bounds: OctBounds,
    pub(super) indices: Vec<usize>,
    pub(super) children: [Option<Box<OctNode>>; 8],
}

impl OctNode {
    pub(super) fn build(positions: &[Vec3]) -> Option<Self> {
        let bounds = OctBounds::from_points(positions)?;
        let indices = (0..positions.len()).collect::<Vec<_>>();
        Some(Self::build_node(bounds, indices, positions, 0))
    }

    fn build_node(bounds: OctBounds, indices: Vec<usize>, positions: &[Vec3], depth: usize) -> Self {
        let mut node = Self {
            bounds,
            indices,
            children: std::array::from_fn(|_| None),
        };

        if depth >= OCTREE_MAX_DEPTH || node.indices.len() <= OCTREE_LEAF_CAPACITY {
            return node;
        }

        let mut buckets = std::array::from_fn::<_, 8, _>(|_| Vec::new());
        for &index in &node.indices {
            let octant = bounds.octant_for(positions[index]);
            buckets[octant].push(index);
        }

        let non_empty = buckets.iter().filter(|bucket| !bucket.is_empty()).count();
        if non_empty <= 1 {
            return node;
        }

        for (octant, bucket) in buckets.into_iter().enumerate() {
            if bucket.is_empty() {
                continue;
            }

            node.children[octant] = Some(Box::new(Self::build_node(
                bounds.child(octant),
                bucket,
                positions,
                depth + 1,
            )));
        }
        node.indices.clear();
        node
    }

    pub(super) fn is_leaf(&self) -> bool {
        self.children.iter().all(|child| child.is_none())
    }
}

/// Visits every unordered index pair whose cells lie within `max_distance_sq`.
///
/// Cells are pruned by box distance only, so callers still see some pairs
/// slightly beyond the cutoff and must test the exact distance themselves.
pub(super) fn for_each_pair_within<F>(
    node_a: &OctNode,
    node_b: &OctNode,
    same_node: bool,
    max_distance_sq: f32,
    visit: &mut F,
) where
    F: FnMut(usize, usize),
{
    if node_a.bounds.distance_sq_to(node_b.bounds) > max_distance_sq {
        return;
    }

    if node_a.is_leaf() && node_b.is_leaf() {
        if same_node {
            for (offset, &from) in node_a.indices.iter().enumerate() {
                for &to in &node_a.indices[offset + 1..] {
                    visit(from, to);
                }
            }
        } else {
            for &from in &node_a.indices {
                for &to in &node_b.indices {
                    visit(from, to);
                }
            }
        }
        return;
    }

    if same_node {
        for first in 0..8 {
            let Some(child_a) = node_a.children[first].as_ref() else {
                continue;
            };

            for_each_pair_within(child_a, child_a, true, max_distance_sq, visit);

            for second in (first + 1)..8 {
                let Some(child_b) = node_a.children[second].as_ref() else {
                    continue;
                };
                for_each_pair_within(child_a, child_b, false, max_distance_sq, visit);
            }
        }
        return;
    }

    let split_a = if node_a.is_leaf() {
        false
    } else if node_b.is_leaf() {
        true
    } else {
        node_a.bounds.half_extent >= node_b.bounds.half_extent
    };

    if split_a {
        for child in node_a.children.iter().flatten() {
            for_each_pair_within(child, node_b, false, max_distance_sq, visit);
        }
    } else {
        for child in node_b.children.iter().flatten() {
            for_each_pair_within(node_a, child, false, max_distance_sq, visit);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn lattice(count: usize, spacing: f32) -> Vec<Vec3> {
        (0..count)
            .map(|index| {
                let x = (index % 5) as f32;
                let y = ((index / 5) % 5) as f32;
                let z = (index / 25) as f32;
                vec3(x, y, z) * spacing
            })
            .collect()
    }

    #[test]
    fn traversal_finds_every_close_pair_exactly_once() {
        let positions = lattice(80, 10.0);
        let tree = OctNode::build(&positions).expect("finite positions");
        let cutoff = 15.0_f32;

        let mut seen = HashSet::new();
        for_each_pair_within(&tree, &tree, true, cutoff * cutoff, &mut |a, b| {
            let key = (a.min(b), a.max(b));
            assert!(seen.insert(key), "pair {key:?} visited twice");
        });

        for a in 0..positions.len() {
            for b in (a + 1)..positions.len() {
                if positions[a].distance(positions[b]) <= cutoff {
                    assert!(seen.contains(&(a, b)), "missing close pair {a}-{b}");
                }
            }
        }
    }

    #[test]
    fn non_finite_positions_do_not_build() {
        assert!(OctNode::build(&[Vec3::ZERO, vec3(f32::NAN, 0.0, 0.0)]).is_none());
        assert!(OctNode::build(&[]).is_none());
    }

    #[test]
    fn coincident_points_stay_in_one_leaf() {
        let positions = vec![Vec3::splat(3.0); 40];
        let tree = OctNode::build(&positions).expect("finite positions");
        assert!(tree.is_leaf());
        assert_eq!(tree.indices.len(), 40);
    }
}
