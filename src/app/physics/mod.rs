mod forces;
mod octree;

use glam::{Vec3, vec3};

use crate::config::PhysicsConfig;
use crate::payload::{EntityCategory, GraphData};
use crate::util::stable_triple;

use forces::{
    RepulsionParams, accumulate_centering, accumulate_clustering, accumulate_repulsion,
    accumulate_springs, resolve_collisions,
};
use octree::OctNode;

/// Upper bound on collision sweeps per tick; dense clusters settle well within it.
const MAX_COLLISION_PASSES: usize = 32;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct SpringLink {
    pub source: usize,
    pub target: usize,
    pub weight: f32,
}

/// Force-directed layout state, stored as parallel per-node buffers.
///
/// Node handles are dense indices that match the generation's arena order.
pub(in crate::app) struct Simulation {
    positions: Vec<Vec3>,
    velocities: Vec<Vec3>,
    forces: Vec<Vec3>,
    radii: Vec<f32>,
    categories: Vec<EntityCategory>,
    fixed: Vec<bool>,
    links: Vec<SpringLink>,
    alpha: f32,
    config: PhysicsConfig,
    ticks: u64,
}

pub(in crate::app) fn seed_position(id: &str, index: usize, node_count: usize, spread: f32) -> Vec3 {
    let mut direction = stable_triple(id);
    if direction.length_squared() <= 0.0001 {
        let angle = ((index as f32) * 0.618_034 + 0.11) * std::f32::consts::TAU;
        direction = vec3(angle.cos(), angle.sin(), ((index % 7) as f32 - 3.0) / 3.0);
    }
    direction * spread * (node_count.max(1) as f32).cbrt()
}

impl Simulation {
    pub(in crate::app) fn new(config: PhysicsConfig) -> Self {
        Self {
            positions: Vec::new(),
            velocities: Vec::new(),
            forces: Vec::new(),
            radii: Vec::new(),
            categories: Vec::new(),
            fixed: Vec::new(),
            links: Vec::new(),
            alpha: 1.0,
            config: config.sanitized(),
            ticks: 0,
        }
    }

    /// Builds a simulation holding every node and link of `data` at once.
    pub(in crate::app) fn from_graph(data: &GraphData, config: PhysicsConfig) -> Self {
        let mut simulation = Self::new(config);
        let node_count = data.node_count();
        for (index, node) in data.nodes.iter().enumerate() {
            let position = seed_position(&node.id, index, node_count, simulation.config.seed_spread);
            simulation.add_node(position, node.size, node.category);
        }
        for link in &data.links {
            simulation.add_link(link.source, link.target, link.weight);
        }
        simulation
    }

    pub(in crate::app) fn add_node(&mut self, position: Vec3, radius: f32, category: EntityCategory) -> usize {
        let position = if position.is_finite() { position } else { Vec3::ZERO };
        self.positions.push(position);
        self.velocities.push(Vec3::ZERO);
        self.forces.push(Vec3::ZERO);
        self.radii.push(if radius.is_finite() { radius.max(0.0) } else { 0.0 });
        self.categories.push(category);
        self.fixed.push(false);
        self.positions.len() - 1
    }

    pub(in crate::app) fn add_link(&mut self, source: usize, target: usize, weight: f32) -> bool {
        if source >= self.positions.len() || target >= self.positions.len() {
            return false;
        }
        let weight = if weight.is_finite() { weight.clamp(0.0, 4.0) } else { 1.0 };
        self.links.push(SpringLink {
            source,
            target,
            weight,
        });
        true
    }

    pub(in crate::app) fn node_count(&self) -> usize {
        self.positions.len()
    }

    pub(in crate::app) fn link_count(&self) -> usize {
        self.links.len()
    }

    pub(in crate::app) fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub(in crate::app) fn position(&self, index: usize) -> Option<Vec3> {
        self.positions.get(index).copied()
    }

    pub(in crate::app) fn velocity(&self, index: usize) -> Option<Vec3> {
        self.velocities.get(index).copied()
    }

    pub(in crate::app) fn is_fixed(&self, index: usize) -> bool {
        self.fixed.get(index).copied().unwrap_or(false)
    }

    pub(in crate::app) fn alpha(&self) -> f32 {
        self.alpha
    }

    pub(in crate::app) fn is_active(&self) -> bool {
        self.alpha > self.config.alpha_min
    }

    pub(in crate::app) fn ticks(&self) -> u64 {
        self.ticks
    }

    pub(in crate::app) fn config(&self) -> PhysicsConfig {
        self.config
    }

    pub(in crate::app) fn set_config(&mut self, config: PhysicsConfig) {
        let config = config.sanitized();
        if config != self.config {
            self.config = config;
            self.reheat(config.drag_reheat_alpha);
        }
    }

    pub(in crate::app) fn restart(&mut self) {
        self.alpha = 1.0;
    }

    pub(in crate::app) fn reheat(&mut self, min_alpha: f32) {
        self.alpha = self.alpha.max(min_alpha.clamp(0.0, 1.0));
    }

    pub(in crate::app) fn pin(&mut self, index: usize) -> bool {
        if index >= self.positions.len() {
            return false;
        }
        self.fixed[index] = true;
        self.velocities[index] = Vec3::ZERO;
        self.reheat(self.config.drag_reheat_alpha);
        true
    }

    pub(in crate::app) fn drag_to(&mut self, index: usize, position: Vec3) -> bool {
        if index >= self.positions.len() || !position.is_finite() {
            return false;
        }
        self.fixed[index] = true;
        self.positions[index] = position;
        self.velocities[index] = Vec3::ZERO;
        self.reheat(self.config.drag_reheat_alpha);
        true
    }

    pub(in crate::app) fn release(&mut self, index: usize) -> bool {
        if index >= self.positions.len() {
            return false;
        }
        self.fixed[index] = false;
        self.reheat(self.config.drag_reheat_alpha);
        true
    }

    /// Advances the layout by one step and reports whether it is still cooling.
    pub(in crate::app) fn tick(&mut self) -> bool {
        let config = self.config;
        let node_count = self.positions.len();

        if node_count > 0 {
            self.forces.fill(Vec3::ZERO);

            accumulate_springs(
                &self.links,
                &self.positions,
                &self.fixed,
                config.rest_length,
                config.spring_strength,
                &mut self.forces,
            );

            if let Some(tree) = OctNode::build(&self.positions) {
                accumulate_repulsion(
                    &tree,
                    &self.positions,
                    &self.categories,
                    RepulsionParams {
                        same_type: config.same_type_repulsion,
                        cross_type: config.cross_type_repulsion,
                        softening: config.repulsion_softening,
                        cutoff: config.repulsion_cutoff,
                    },
                    &mut self.forces,
                );
            }

            accumulate_clustering(
                &self.positions,
                &self.categories,
                &self.fixed,
                config.cluster_strength,
                &mut self.forces,
            );
            accumulate_centering(
                &self.positions,
                &self.fixed,
                config.center_strength,
                &mut self.forces,
            );

            self.integrate();

            for _ in 0..MAX_COLLISION_PASSES {
                let corrected = resolve_collisions(
                    &mut self.positions,
                    &self.radii,
                    &self.fixed,
                    config.collision_padding,
                );
                if corrected == 0 {
                    break;
                }
            }
        }

        self.alpha *= 1.0 - config.alpha_decay;
        self.ticks += 1;
        self.is_active()
    }

    fn integrate(&mut self) {
        let alpha = self.alpha;
        let decay = self.config.velocity_decay;
        let max_speed = self.config.max_speed;
        let max_speed_sq = max_speed * max_speed;

        for index in 0..self.positions.len() {
            if self.fixed[index] {
                continue;
            }

            let mut velocity = (self.velocities[index] + self.forces[index] * alpha) * decay;
            let speed_sq = velocity.length_squared();
            if !speed_sq.is_finite() {
                velocity = Vec3::ZERO;
            } else if speed_sq > max_speed_sq {
                velocity *= max_speed / speed_sq.sqrt();
            }

            let next = self.positions[index] + velocity;
            if next.is_finite() {
                self.positions[index] = next;
                self.velocities[index] = velocity;
            } else {
                self.velocities[index] = Vec3::ZERO;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const CATEGORIES: [EntityCategory; 3] = [
        EntityCategory::Person,
        EntityCategory::Place,
        EntityCategory::Concept,
    ];

    fn build(positions: &[Vec3], links: &[(usize, usize)]) -> Simulation {
        let mut simulation = Simulation::new(PhysicsConfig::default());
        for (index, position) in positions.iter().enumerate() {
            simulation.add_node(*position, 6.0, CATEGORIES[index % CATEGORIES.len()]);
        }
        for &(source, target) in links {
            simulation.add_link(source, target, 1.0);
        }
        simulation
    }

    fn ring(count: usize) -> Vec<Vec3> {
        (0..count)
            .map(|index| {
                let angle = index as f32 / count as f32 * std::f32::consts::TAU;
                vec3(angle.cos(), angle.sin(), (index % 3) as f32 - 1.0) * 120.0
            })
            .collect()
    }

    #[test]
    fn ticking_converges_within_five_hundred_iterations() {
        let positions = ring(40);
        let links = (0..39).map(|index| (index, index + 1)).collect::<Vec<_>>();
        let mut simulation = build(&positions, &links);

        let mut ticks = 0;
        while simulation.tick() {
            ticks += 1;
            assert!(ticks <= 500, "simulation still active after 500 ticks");
        }
        assert!(simulation.alpha() <= simulation.config().alpha_min);
    }

    #[test]
    fn empty_simulation_still_cools() {
        let mut simulation = Simulation::new(PhysicsConfig::default());
        let ticks = std::iter::from_fn(|| simulation.tick().then_some(())).count();
        assert!(ticks < 500);
    }

    #[test]
    fn overlapping_pair_is_separated_within_one_tick() {
        let mut simulation = build(&[Vec3::ZERO, vec3(3.0, 0.0, 0.0)], &[]);
        let min_distance = 6.0 + 6.0 + simulation.config().collision_padding;
        simulation.tick();
        let a = simulation.position(0).expect("node 0");
        let b = simulation.position(1).expect("node 1");
        assert!(a.distance(b) >= min_distance - 1e-3);
    }

    #[test]
    fn dragging_pins_and_release_reheats() {
        let mut simulation = build(&ring(5), &[(0, 1)]);
        for _ in 0..400 {
            simulation.tick();
        }
        assert!(simulation.alpha() < 0.3);

        assert!(simulation.pin(0));
        let target = vec3(12.0, -40.0, 7.5);
        assert!(simulation.drag_to(0, target));
        assert!(simulation.is_fixed(0));
        simulation.tick();
        assert_eq!(simulation.position(0), Some(target));

        assert!(simulation.release(0));
        assert!(!simulation.is_fixed(0));
        assert!(simulation.alpha() >= 0.3);
    }

    #[test]
    fn restart_resets_alpha_to_one() {
        let mut simulation = build(&ring(3), &[]);
        for _ in 0..50 {
            simulation.tick();
        }
        simulation.restart();
        assert_eq!(simulation.alpha(), 1.0);
    }

    #[test]
    fn links_to_missing_nodes_are_refused() {
        let mut simulation = build(&ring(2), &[]);
        assert!(!simulation.add_link(0, 5, 1.0));
        assert_eq!(simulation.link_count(), 0);
    }

    #[test]
    fn non_finite_drag_targets_are_ignored() {
        let mut simulation = build(&ring(2), &[]);
        let before = simulation.position(0);
        assert!(!simulation.drag_to(0, vec3(f32::NAN, 0.0, 0.0)));
        assert_eq!(simulation.position(0), before);
    }

    fn clump_strategy() -> impl Strategy<Value = Vec<Vec3>> {
        prop::collection::vec((-3.0f32..3.0, -3.0f32..3.0, -3.0f32..3.0), 10..=20)
            .prop_map(|points| points.into_iter().map(|(x, y, z)| vec3(x, y, z)).collect())
    }

    fn layout_strategy() -> impl Strategy<Value = (Vec<Vec3>, Vec<(usize, usize)>)> {
        prop::collection::vec(
            (-500.0f32..500.0, -500.0f32..500.0, -500.0f32..500.0),
            2..24,
        )
        .prop_flat_map(|points| {
            let count = points.len();
            let positions = points
                .into_iter()
                .map(|(x, y, z)| vec3(x, y, z))
                .collect::<Vec<_>>();
            let links = prop::collection::vec((0..count, 0..count), 0..count * 2);
            (Just(positions), links)
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn coordinates_stay_finite_for_a_thousand_ticks((positions, links) in layout_strategy()) {
            let mut simulation = build(&positions, &links);
            for tick in 0..1000 {
                if tick % 250 == 0 {
                    simulation.restart();
                }
                simulation.tick();
                prop_assert!(simulation.positions().iter().all(|position| position.is_finite()));
            }
        }

        #[test]
        fn dense_clump_has_no_overlap_after_one_tick(positions in clump_strategy()) {
            let mut simulation = build(&positions, &[]);
            let min_distance = 6.0 + 6.0 + simulation.config().collision_padding;
            simulation.tick();

            let settled = simulation.positions();
            for a in 0..settled.len() {
                for b in (a + 1)..settled.len() {
                    let distance = settled[a].distance(settled[b]);
                    prop_assert!(
                        distance >= min_distance - 1e-2,
                        "nodes {} and {} are {} apart",
                        a,
                        b,
                        distance
                    );
                }
            }
        }

        #[test]
        fn fixed_nodes_do_not_move_during_tick(
            (positions, links) in layout_strategy(),
            pinned in prop::collection::vec(any::<bool>(), 24),
        ) {
            let mut simulation = build(&positions, &links);
            for index in 0..simulation.node_count() {
                if pinned[index] {
                    simulation.pin(index);
                }
            }
            let before = (0..simulation.node_count())
                .map(|index| (simulation.position(index), simulation.velocity(index)))
                .collect::<Vec<_>>();

            simulation.tick();

            for (index, (position, velocity)) in before.into_iter().enumerate() {
                if pinned[index] {
                    prop_assert_eq!(simulation.position(index), position);
                    prop_assert_eq!(simulation.velocity(index), velocity);
                }
            }
        }
    }
}
