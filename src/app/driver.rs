use std::cell::Cell;
use std::ops::Range;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use eframe::egui::{Painter, Pos2};
use tracing::{debug, info};

use crate::config::{EngineConfig, PhysicsConfig};
use crate::payload::GraphData;

use super::camera::{OrbitCamera, Viewport};
use super::highlight::{HighlightState, SearchPath, Target};
use super::interaction::{
    CursorAffordance, InteractionController, InteractionEvent, InteractionState, PointerContext,
};
use super::loader::{BatchSink, CompletionCallback, LoadPhase, LoadProgress, ProgressiveLoader};
use super::physics::{Simulation, seed_position};
use super::scene::{SceneError, SceneGraph, paint_scene};

#[derive(Clone, Debug, PartialEq, Eq)]
pub(in crate::app) struct NodeClick {
    pub id: String,
    pub label: String,
    pub book_id: Option<String>,
}

pub(in crate::app) type VisibilityCallback = Rc<dyn Fn(&[String])>;
pub(in crate::app) type NodeClickCallback = Rc<dyn Fn(&NodeClick)>;

#[derive(Clone, Default)]
pub(in crate::app) struct DriverCallbacks {
    pub on_node_visibility_change: Option<VisibilityCallback>,
    pub on_node_click: Option<NodeClickCallback>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) enum LoadMode {
    Immediate,
    Progressive,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(in crate::app) struct FrameOutcome {
    pub simulating: bool,
    pub loading: bool,
    pub restarted: bool,
}

impl FrameOutcome {
    pub(in crate::app) fn needs_frame(&self) -> bool {
        self.simulating || self.loading || self.restarted
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum SearchInput {
    None,
    Query(String),
    Ids(Vec<String>),
}

/// Nodes, links and everything derived from them for one loaded payload.
struct Generation {
    serial: u64,
    data: Arc<GraphData>,
    simulation: Simulation,
    scene: SceneGraph,
    loader: Option<ProgressiveLoader>,
    live: Rc<Cell<bool>>,
}

impl Generation {
    fn empty(physics: PhysicsConfig) -> Self {
        Self {
            serial: 0,
            data: Arc::default(),
            simulation: Simulation::new(physics),
            scene: SceneGraph::default(),
            loader: None,
            live: Rc::new(Cell::new(true)),
        }
    }

    fn teardown(&mut self) {
        if let Some(loader) = &mut self.loader {
            loader.cancel();
        }
        self.scene.dispose();
        self.live.set(false);
    }
}

struct GenerationSink<'a> {
    data: &'a GraphData,
    simulation: &'a mut Simulation,
    scene: &'a mut SceneGraph,
}

impl BatchSink for GenerationSink<'_> {
    fn reveal_nodes(&mut self, nodes: Range<usize>) {
        let node_count = self.data.node_count();
        let spread = self.simulation.config().seed_spread;
        for index in nodes.clone() {
            if let Some(node) = self.data.nodes.get(index) {
                let position = seed_position(&node.id, index, node_count, spread);
                self.simulation.add_node(position, node.size, node.category);
            }
        }
        self.scene.extend_nodes(nodes, self.data, self.simulation);
        self.simulation.restart();
    }

    fn reveal_links(&mut self, links: &[usize]) {
        for link in links.iter().filter_map(|&index| self.data.links.get(index)) {
            self.simulation.add_link(link.source, link.target, link.weight);
        }
        self.scene.extend_links(links, self.data, self.simulation);
        self.simulation.restart();
    }
}

/// Frame loop owner: loads generations, advances physics, syncs the scene and routes pointer input.
pub(in crate::app) struct GalaxyDriver {
    config: EngineConfig,
    camera: OrbitCamera,
    controller: InteractionController,
    highlight: HighlightState,
    generation: Generation,
    next_serial: u64,
    restart_elapsed: Duration,
    mounted: bool,
    callbacks: DriverCallbacks,
    search: SearchInput,
}

impl GalaxyDriver {
    pub(in crate::app) fn new(config: EngineConfig, callbacks: DriverCallbacks) -> Self {
        Self {
            camera: OrbitCamera::new(config.camera),
            controller: InteractionController::new(config.camera.click_tolerance_px),
            highlight: HighlightState::default(),
            generation: Generation::empty(config.physics),
            next_serial: 1,
            restart_elapsed: Duration::ZERO,
            mounted: true,
            callbacks,
            search: SearchInput::None,
            config,
        }
    }

    pub(in crate::app) fn data(&self) -> &GraphData {
        &self.generation.data
    }

    pub(in crate::app) fn shared_data(&self) -> Arc<GraphData> {
        Arc::clone(&self.generation.data)
    }

    pub(in crate::app) fn simulation(&self) -> &Simulation {
        &self.generation.simulation
    }

    pub(in crate::app) fn scene(&self) -> &SceneGraph {
        &self.generation.scene
    }

    pub(in crate::app) fn highlight(&self) -> &HighlightState {
        &self.highlight
    }

    pub(in crate::app) fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub(in crate::app) fn generation_serial(&self) -> u64 {
        self.generation.serial
    }

    pub(in crate::app) fn affordance(&self) -> CursorAffordance {
        self.controller.affordance()
    }

    pub(in crate::app) fn interaction_state(&self) -> InteractionState {
        self.controller.state()
    }

    pub(in crate::app) fn is_loading(&self) -> bool {
        self.generation
            .loader
            .as_ref()
            .is_some_and(|loader| matches!(loader.phase(), LoadPhase::Nodes | LoadPhase::Links))
    }

    pub(in crate::app) fn revealed_nodes(&self) -> usize {
        self.generation.simulation.node_count()
    }

    /// Tears the current generation down, then swaps in a fully constructed replacement.
    pub(in crate::app) fn replace_generation(&mut self, data: Arc<GraphData>, mode: LoadMode) {
        if !self.mounted {
            return;
        }

        self.generation.teardown();
        self.controller.reset();
        self.highlight.reset();
        self.restart_elapsed = Duration::ZERO;

        let serial = self.next_serial;
        self.next_serial += 1;
        let live = Rc::new(Cell::new(true));
        let physics = self.config.physics;

        let mut next = match mode {
            LoadMode::Immediate => {
                let simulation = Simulation::from_graph(&data, physics);
                let mut scene = SceneGraph::default();
                scene.build(&data, &simulation);
                Generation {
                    serial,
                    data,
                    simulation,
                    scene,
                    loader: None,
                    live,
                }
            }
            LoadMode::Progressive => {
                let on_visibility = self.callbacks.on_node_visibility_change.clone();
                let guard = Rc::clone(&live);
                let on_complete: CompletionCallback = Box::new(move |ids: &[String]| {
                    if guard.get()
                        && let Some(callback) = &on_visibility
                    {
                        callback(ids);
                    }
                });
                Generation {
                    serial,
                    data,
                    simulation: Simulation::new(physics),
                    scene: SceneGraph::default(),
                    loader: Some(ProgressiveLoader::load(self.config.loader, on_complete)),
                    live,
                }
            }
        };
        std::mem::swap(&mut self.generation, &mut next);

        info!(
            generation = serial,
            nodes = self.generation.data.node_count(),
            links = self.generation.data.link_count(),
            ?mode,
            "galaxy generation installed"
        );

        self.apply_search();
        if mode == LoadMode::Immediate {
            self.camera.frame(self.generation.simulation.positions());
            self.notify_visibility();
        }
    }

    fn notify_visibility(&self) {
        if !self.generation.live.get() {
            return;
        }
        if let Some(callback) = &self.callbacks.on_node_visibility_change {
            let ids = self
                .generation
                .data
                .nodes
                .iter()
                .map(|node| node.id.clone())
                .collect::<Vec<_>>();
            callback(&ids);
        }
    }

    /// Time left before the periodic restart reheats the layout, if one is scheduled.
    pub(in crate::app) fn until_restart(&self) -> Option<Duration> {
        if !self.mounted {
            return None;
        }
        let interval = self.config.restart.interval()?;
        Some(interval.saturating_sub(self.restart_elapsed))
    }

    /// One frame: reveal due batches, tick physics, then sync the scene.
    pub(in crate::app) fn advance(&mut self, dt: Duration) -> FrameOutcome {
        if !self.mounted {
            return FrameOutcome::default();
        }

        let mut outcome = FrameOutcome::default();
        let Generation {
            data,
            simulation,
            scene,
            loader,
            ..
        } = &mut self.generation;
        let data: &GraphData = data;

        if let Some(loader) = loader {
            let mut sink = GenerationSink {
                data,
                simulation: &mut *simulation,
                scene: &mut *scene,
            };
            match loader.advance(dt, data, &mut sink) {
                LoadProgress::Completed => {
                    debug!(nodes = simulation.node_count(), "progressive load complete");
                    self.camera.frame(simulation.positions());
                }
                LoadProgress::Waiting | LoadProgress::Revealed => outcome.loading = true,
                LoadProgress::Finished => {}
            }
        }

        if let Some(interval) = self.config.restart.interval() {
            self.restart_elapsed += dt;
            if self.restart_elapsed >= interval {
                self.restart_elapsed = Duration::ZERO;
                if simulation.node_count() > 0 {
                    simulation.restart();
                    outcome.restarted = true;
                }
            }
        }

        if simulation.is_active() {
            outcome.simulating = simulation.tick();
        }
        scene.sync_frame(data, simulation, &self.highlight);
        outcome
    }

    pub(in crate::app) fn paint(
        &mut self,
        painter: &Painter,
        viewport: &Viewport,
        label_all: bool,
    ) -> Result<usize, SceneError> {
        paint_scene(
            painter,
            viewport,
            &self.camera,
            &mut self.generation.scene,
            &self.generation.data,
            label_all,
        )
    }

    pub(in crate::app) fn pointer_down(&mut self, viewport: &Viewport, pointer: Pos2) {
        if !self.mounted {
            return;
        }
        let mut context = PointerContext {
            viewport,
            camera: &mut self.camera,
            scene: &self.generation.scene,
            simulation: &mut self.generation.simulation,
            highlight: &mut self.highlight,
        };
        let event = self.controller.pointer_down(pointer, &mut context);
        self.dispatch(event);
    }

    pub(in crate::app) fn pointer_move(&mut self, viewport: &Viewport, pointer: Pos2) {
        if !self.mounted {
            return;
        }
        let mut context = PointerContext {
            viewport,
            camera: &mut self.camera,
            scene: &self.generation.scene,
            simulation: &mut self.generation.simulation,
            highlight: &mut self.highlight,
        };
        self.controller.pointer_move(pointer, &mut context);
    }

    pub(in crate::app) fn pointer_up(&mut self, viewport: &Viewport, pointer: Pos2) {
        if !self.mounted {
            return;
        }
        let mut context = PointerContext {
            viewport,
            camera: &mut self.camera,
            scene: &self.generation.scene,
            simulation: &mut self.generation.simulation,
            highlight: &mut self.highlight,
        };
        let event = self.controller.pointer_up(pointer, &mut context);
        self.dispatch(event);
    }

    pub(in crate::app) fn pointer_leave(&mut self, viewport: &Viewport) {
        if !self.mounted {
            return;
        }
        let mut context = PointerContext {
            viewport,
            camera: &mut self.camera,
            scene: &self.generation.scene,
            simulation: &mut self.generation.simulation,
            highlight: &mut self.highlight,
        };
        self.controller.pointer_leave(&mut context);
    }

    pub(in crate::app) fn scroll(&mut self, delta: f32) {
        if self.mounted {
            self.controller.scroll(delta, &mut self.camera);
        }
    }

    fn dispatch(&self, event: Option<InteractionEvent>) {
        let data = &self.generation.data;
        match event {
            Some(InteractionEvent::NodeSelected(index)) => {
                let Some(node) = data.nodes.get(index) else {
                    return;
                };
                debug!(id = %node.id, "node selected");
                if let Some(callback) = &self.callbacks.on_node_click {
                    callback(&NodeClick {
                        id: node.id.clone(),
                        label: node.label.clone(),
                        book_id: node.book_id.clone(),
                    });
                }
            }
            Some(InteractionEvent::LinkSelected(index)) => {
                if let Some(link) = data.links.get(index) {
                    debug!(id = %link.id, "link selected");
                }
            }
            Some(InteractionEvent::DragStarted(node)) => debug!(node, "drag started"),
            Some(InteractionEvent::DragEnded(node)) => debug!(node, "drag released"),
            Some(InteractionEvent::SelectionCleared) => debug!("selection cleared"),
            None => {}
        }
    }

    /// Selects a node from outside the canvas, e.g. a details panel row.
    pub(in crate::app) fn select(&mut self, target: Option<Target>) {
        self.highlight.set_selected(target);
    }

    pub(in crate::app) fn set_search_query(&mut self, query: &str) {
        let query = query.trim();
        let next = if query.is_empty() {
            SearchInput::None
        } else {
            SearchInput::Query(query.to_owned())
        };
        if next != self.search {
            self.search = next;
            self.apply_search();
        }
    }

    pub(in crate::app) fn set_highlight_ids(&mut self, ids: Vec<String>) {
        let next = if ids.is_empty() {
            SearchInput::None
        } else {
            SearchInput::Ids(ids)
        };
        if next != self.search {
            self.search = next;
            self.apply_search();
        }
    }

    fn apply_search(&mut self) {
        let data = &self.generation.data;
        let (path, active) = match &self.search {
            SearchInput::None => (SearchPath::default(), false),
            SearchInput::Query(query) => (SearchPath::from_query(data, query), true),
            SearchInput::Ids(ids) => (SearchPath::from_node_ids(data, ids), true),
        };
        self.highlight.set_search(Arc::new(path), active);
    }

    pub(in crate::app) fn physics_config(&self) -> PhysicsConfig {
        self.generation.simulation.config()
    }

    pub(in crate::app) fn set_physics_config(&mut self, physics: PhysicsConfig) {
        self.config.physics = physics.sanitized();
        self.generation.simulation.set_config(self.config.physics);
    }

    pub(in crate::app) fn restart(&mut self) {
        self.restart_elapsed = Duration::ZERO;
        self.generation.simulation.restart();
    }

    pub(in crate::app) fn frame_all(&mut self) {
        self.camera.frame(self.generation.simulation.positions());
    }

    /// Cancels pending batches and releases geometry; later calls are no-ops.
    pub(in crate::app) fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.mounted = false;
        self.generation.teardown();
        self.controller.reset();
        info!(generation = self.generation.serial, "galaxy view unmounted");
    }
}

impl Drop for GalaxyDriver {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use eframe::egui::{Rect, pos2};

    use super::*;
    use crate::config::RestartConfig;
    use crate::payload::parse_payload;

    type Seen = Rc<RefCell<Vec<Vec<String>>>>;

    fn graph(json: &str) -> Arc<GraphData> {
        Arc::new(GraphData::from_payload(parse_payload(json).expect("payload parses")).0)
    }

    fn five_nodes() -> Arc<GraphData> {
        graph(
            r#"{
                "nodes": [{"id": "A"}, {"id": "B"}, {"id": "D"}, {"id": "E"}, {"id": "F"}],
                "relationships": [
                    {"source": "A", "target": "B"},
                    {"source": "A", "target": "C"}
                ]
            }"#,
        )
    }

    fn driver_with(config: EngineConfig) -> (GalaxyDriver, Seen, Rc<RefCell<Vec<NodeClick>>>) {
        let seen: Seen = Rc::default();
        let clicks: Rc<RefCell<Vec<NodeClick>>> = Rc::default();
        let visibility_sink = Rc::clone(&seen);
        let click_sink = Rc::clone(&clicks);
        let callbacks = DriverCallbacks {
            on_node_visibility_change: Some(Rc::new(move |ids: &[String]| {
                visibility_sink.borrow_mut().push(ids.to_vec());
            })),
            on_node_click: Some(Rc::new(move |click: &NodeClick| {
                click_sink.borrow_mut().push(click.clone());
            })),
        };
        (GalaxyDriver::new(config, callbacks), seen, clicks)
    }

    fn frame() -> Duration {
        Duration::from_millis(16)
    }

    #[test]
    fn progressive_load_reports_visible_nodes_once() {
        let (mut driver, seen, _) = driver_with(EngineConfig::default());
        driver.replace_generation(five_nodes(), LoadMode::Progressive);
        assert!(driver.is_loading());

        for _ in 0..20 {
            driver.advance(frame());
        }

        assert!(!driver.is_loading());
        assert_eq!(driver.simulation().node_count(), 5);
        assert_eq!(driver.simulation().link_count(), 1);
        assert_eq!(driver.scene().links().len(), 1);
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(seen.borrow()[0], vec!["A", "B", "D", "E", "F"]);
    }

    #[test]
    fn immediate_load_builds_everything_at_once() {
        let (mut driver, seen, _) = driver_with(EngineConfig::default());
        driver.replace_generation(five_nodes(), LoadMode::Immediate);

        assert!(!driver.is_loading());
        assert_eq!(driver.scene().nodes().len(), 5);
        assert_eq!(seen.borrow().len(), 1);
        assert!(driver.advance(frame()).simulating);
    }

    #[test]
    fn unmount_cancels_pending_load_and_releases_geometry() {
        let (mut driver, seen, _) = driver_with(EngineConfig::default());
        driver.replace_generation(five_nodes(), LoadMode::Progressive);
        driver.advance(frame());
        assert_eq!(driver.revealed_nodes(), 5);

        driver.unmount();
        for _ in 0..20 {
            assert!(!driver.advance(frame()).needs_frame());
        }

        assert!(seen.borrow().is_empty());
        assert_eq!(driver.scene().pool().live(), 0);
        driver.replace_generation(five_nodes(), LoadMode::Immediate);
        assert_eq!(driver.generation_serial(), 1);
    }

    #[test]
    fn replaced_generation_never_reports_stale_visibility() {
        let (mut driver, seen, _) = driver_with(EngineConfig::default());
        driver.replace_generation(five_nodes(), LoadMode::Progressive);
        driver.advance(frame());
        let first_serial = driver.generation_serial();

        driver.replace_generation(graph(r#"{"nodes": [{"id": "solo"}]}"#), LoadMode::Progressive);
        assert!(driver.generation_serial() > first_serial);
        for _ in 0..10 {
            driver.advance(frame());
        }

        assert_eq!(seen.borrow().as_slice(), &[vec!["solo".to_owned()]]);
        assert_eq!(driver.scene().pool().live(), 2);
    }

    #[test]
    fn periodic_restart_reheats_the_simulation() {
        let config = EngineConfig {
            restart: RestartConfig { interval_secs: 1.0 },
            ..EngineConfig::default()
        };
        let (mut driver, _, _) = driver_with(config);
        driver.replace_generation(five_nodes(), LoadMode::Immediate);
        for _ in 0..40 {
            assert!(!driver.advance(frame()).restarted);
        }
        assert!(driver.simulation().alpha() < 0.9);

        let outcome = driver.advance(Duration::from_millis(400));
        assert!(outcome.restarted);
        assert!(driver.simulation().alpha() > 0.9);
    }

    #[test]
    fn restart_countdown_tracks_idle_time() {
        let config = EngineConfig {
            restart: RestartConfig { interval_secs: 1.0 },
            ..EngineConfig::default()
        };
        let (mut driver, _, _) = driver_with(config);
        driver.replace_generation(five_nodes(), LoadMode::Immediate);
        assert_eq!(driver.until_restart(), Some(Duration::from_secs(1)));

        driver.advance(Duration::from_millis(400));
        assert_eq!(driver.until_restart(), Some(Duration::from_millis(600)));

        driver.unmount();
        assert_eq!(driver.until_restart(), None);

        let disabled = EngineConfig {
            restart: RestartConfig { interval_secs: 0.0 },
            ..EngineConfig::default()
        };
        let (driver, _, _) = driver_with(disabled);
        assert_eq!(driver.until_restart(), None);
    }

    #[test]
    fn clicking_a_node_reports_its_identity() {
        let (mut driver, _, clicks) = driver_with(EngineConfig::default());
        driver.replace_generation(
            graph(r#"{"nodes": [{"id": "n1", "properties": {"name": "Tlön", "book_id": "b-7"}}]}"#),
            LoadMode::Immediate,
        );
        driver.advance(frame());

        let viewport = Viewport::new(Rect::from_min_max(pos2(0.0, 0.0), pos2(800.0, 600.0)))
            .expect("viewport");
        let center = driver.scene().nodes()[0].pick.center;
        let screen = driver
            .camera()
            .project(center, &viewport)
            .expect("node in view")
            .screen;

        driver.pointer_down(&viewport, screen);
        driver.pointer_up(&viewport, screen);

        assert_eq!(
            clicks.borrow().as_slice(),
            &[NodeClick {
                id: "n1".to_owned(),
                label: "Tlön".to_owned(),
                book_id: Some("b-7".to_owned()),
            }]
        );
        assert_eq!(driver.highlight().selected(), Some(Target::Node(0)));
    }

    #[test]
    fn search_survives_generation_replacement() {
        let (mut driver, _, _) = driver_with(EngineConfig::default());
        driver.set_search_query("solo");
        driver.replace_generation(graph(r#"{"nodes": [{"id": "solo"}, {"id": "other"}]}"#), LoadMode::Immediate);
        assert!(driver.highlight().search_active());
        assert!(driver.highlight().path().contains_node(0));
        assert!(!driver.highlight().path().contains_node(1));
    }
}
