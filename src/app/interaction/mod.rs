use eframe::egui::{CursorIcon, Pos2};
use glam::{Vec3, vec2};

use super::camera::{OrbitCamera, Ray, Viewport};
use super::highlight::{HighlightState, Target};
use super::physics::Simulation;
use super::scene::SceneGraph;

mod picking;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) enum InteractionState {
    Idle,
    HoveringNode(usize),
    HoveringLink(usize),
    OrbitingCamera,
    DraggingNode {
        node: usize,
        plane_point: Vec3,
        plane_normal: Vec3,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) enum CursorAffordance {
    Default,
    Pointer,
    Grab,
    Grabbing,
    Move,
}

impl CursorAffordance {
    pub(in crate::app) fn cursor_icon(self) -> CursorIcon {
        match self {
            Self::Default => CursorIcon::Default,
            Self::Pointer => CursorIcon::PointingHand,
            Self::Grab => CursorIcon::Grab,
            Self::Grabbing => CursorIcon::Grabbing,
            Self::Move => CursorIcon::AllScroll,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) enum InteractionEvent {
    NodeSelected(usize),
    LinkSelected(usize),
    SelectionCleared,
    DragStarted(usize),
    DragEnded(usize),
}

/// Everything a pointer gesture reads or writes during one event.
pub(in crate::app) struct PointerContext<'a> {
    pub viewport: &'a Viewport,
    pub camera: &'a mut OrbitCamera,
    pub scene: &'a SceneGraph,
    pub simulation: &'a mut Simulation,
    pub highlight: &'a mut HighlightState,
}

impl PointerContext<'_> {
    fn ray_at(&self, pointer: Pos2) -> Option<Ray> {
        self.camera
            .ray_from_ndc(self.viewport.to_ndc(pointer), self.viewport.aspect())
    }

    fn pick(&self, pointer: Pos2) -> Option<Target> {
        self.ray_at(pointer)
            .and_then(|ray| picking::pick(self.scene, &ray))
    }
}

/// Turns pointer gestures into hover, selection, orbit and drag changes.
pub(in crate::app) struct InteractionController {
    state: InteractionState,
    last_pointer: Option<Pos2>,
    travelled: f32,
    click_tolerance: f32,
}

impl InteractionController {
    pub(in crate::app) fn new(click_tolerance: f32) -> Self {
        Self {
            state: InteractionState::Idle,
            last_pointer: None,
            travelled: 0.0,
            click_tolerance: click_tolerance.max(0.0),
        }
    }

    pub(in crate::app) fn state(&self) -> InteractionState {
        self.state
    }

    pub(in crate::app) fn affordance(&self) -> CursorAffordance {
        match self.state {
            InteractionState::Idle => CursorAffordance::Default,
            InteractionState::HoveringNode(_) => CursorAffordance::Grab,
            InteractionState::HoveringLink(_) => CursorAffordance::Pointer,
            InteractionState::OrbitingCamera => CursorAffordance::Move,
            InteractionState::DraggingNode { .. } => CursorAffordance::Grabbing,
        }
    }

    /// Drops gesture state that refers to the previous generation's indices.
    pub(in crate::app) fn reset(&mut self) {
        self.state = InteractionState::Idle;
        self.last_pointer = None;
        self.travelled = 0.0;
    }

    pub(in crate::app) fn pointer_down(
        &mut self,
        pointer: Pos2,
        context: &mut PointerContext<'_>,
    ) -> Option<InteractionEvent> {
        self.last_pointer = Some(pointer);
        self.travelled = 0.0;

        let hit = context
            .ray_at(pointer)
            .and_then(|ray| picking::pick_node(context.scene, &ray));
        if let Some(node) = hit
            && let Some(plane_point) = context.simulation.position(node)
            && context.simulation.pin(node)
        {
            self.state = InteractionState::DraggingNode {
                node,
                plane_point,
                plane_normal: context.camera.forward(),
            };
            return Some(InteractionEvent::DragStarted(node));
        }

        if self.state != InteractionState::OrbitingCamera {
            self.state = InteractionState::OrbitingCamera;
        }
        None
    }

    pub(in crate::app) fn pointer_move(&mut self, pointer: Pos2, context: &mut PointerContext<'_>) {
        let delta = self
            .last_pointer
            .map_or(eframe::egui::Vec2::ZERO, |last| pointer - last);
        self.last_pointer = Some(pointer);

        match self.state {
            InteractionState::OrbitingCamera => {
                self.travelled += delta.length();
                context.camera.orbit(vec2(delta.x, delta.y));
            }
            InteractionState::DraggingNode {
                node,
                plane_point,
                plane_normal,
            } => {
                self.travelled += delta.length();
                if let Some(target) = context
                    .ray_at(pointer)
                    .and_then(|ray| ray.intersect_plane(plane_point, plane_normal))
                {
                    context.simulation.drag_to(node, target);
                }
            }
            InteractionState::Idle
            | InteractionState::HoveringNode(_)
            | InteractionState::HoveringLink(_) => self.update_hover(pointer, context),
        }
    }

    pub(in crate::app) fn pointer_up(
        &mut self,
        pointer: Pos2,
        context: &mut PointerContext<'_>,
    ) -> Option<InteractionEvent> {
        let moved = self.travelled > self.click_tolerance;
        let previous = self.state;
        self.state = InteractionState::Idle;
        self.travelled = 0.0;

        let event = match previous {
            InteractionState::DraggingNode { node, .. } => {
                context.simulation.release(node);
                if moved {
                    Some(InteractionEvent::DragEnded(node))
                } else {
                    Some(self.click(pointer, context))
                }
            }
            InteractionState::OrbitingCamera if !moved => Some(self.click(pointer, context)),
            _ => None,
        };

        self.update_hover(pointer, context);
        event
    }

    pub(in crate::app) fn pointer_leave(&mut self, context: &mut PointerContext<'_>) {
        if let InteractionState::DraggingNode { node, .. } = self.state {
            context.simulation.release(node);
        }
        self.reset();
        context.highlight.set_hovered(None);
    }

    pub(in crate::app) fn scroll(&mut self, delta: f32, camera: &mut OrbitCamera) {
        camera.zoom(delta);
    }

    fn click(&self, pointer: Pos2, context: &mut PointerContext<'_>) -> InteractionEvent {
        let target = context.pick(pointer);
        context.highlight.set_selected(target);
        match target {
            Some(Target::Node(node)) => InteractionEvent::NodeSelected(node),
            Some(Target::Link(link)) => InteractionEvent::LinkSelected(link),
            None => InteractionEvent::SelectionCleared,
        }
    }

    fn update_hover(&mut self, pointer: Pos2, context: &mut PointerContext<'_>) {
        let target = context.pick(pointer);
        self.state = match target {
            Some(Target::Node(node)) => InteractionState::HoveringNode(node),
            Some(Target::Link(link)) => InteractionState::HoveringLink(link),
            None => InteractionState::Idle,
        };
        context.highlight.set_hovered(target);
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::{Rect, pos2};
    use glam::vec3;

    use super::*;
    use crate::config::{CameraConfig, PhysicsConfig};
    use crate::payload::{GraphData, parse_payload};

    struct Fixture {
        data: GraphData,
        viewport: Viewport,
        camera: OrbitCamera,
        scene: SceneGraph,
        simulation: Simulation,
        highlight: HighlightState,
        controller: InteractionController,
    }

    impl Fixture {
        fn new() -> Self {
            let payload = parse_payload(
                r#"{
                    "nodes": [{"id": "a"}, {"id": "b"}],
                    "relationships": [{"id": "ab", "source": "a", "target": "b"}]
                }"#,
            )
            .expect("payload parses");
            let data = GraphData::from_payload(payload).0;

            let mut simulation = Simulation::new(PhysicsConfig::default());
            for (node, position) in data.nodes.iter().zip([Vec3::ZERO, vec3(200.0, 0.0, 0.0)]) {
                simulation.add_node(position, node.size, node.category);
            }
            simulation.add_link(0, 1, 1.0);

            let mut scene = SceneGraph::default();
            scene.build(&data, &simulation);
            let highlight = HighlightState::default();
            scene.sync_frame(&data, &simulation, &highlight);

            Self {
                data,
                viewport: Viewport::new(Rect::from_min_max(pos2(0.0, 0.0), pos2(800.0, 600.0)))
                    .expect("viewport"),
                camera: OrbitCamera::new(CameraConfig::default()),
                scene,
                simulation,
                highlight,
                controller: InteractionController::new(CameraConfig::default().click_tolerance_px),
            }
        }

        fn screen_of(&self, world: Vec3) -> Pos2 {
            self.camera
                .project(world, &self.viewport)
                .expect("visible")
                .screen
        }

        fn down(&mut self, pointer: Pos2) -> Option<InteractionEvent> {
            let mut context = PointerContext {
                viewport: &self.viewport,
                camera: &mut self.camera,
                scene: &self.scene,
                simulation: &mut self.simulation,
                highlight: &mut self.highlight,
            };
            self.controller.pointer_down(pointer, &mut context)
        }

        fn moved(&mut self, pointer: Pos2) {
            let mut context = PointerContext {
                viewport: &self.viewport,
                camera: &mut self.camera,
                scene: &self.scene,
                simulation: &mut self.simulation,
                highlight: &mut self.highlight,
            };
            self.controller.pointer_move(pointer, &mut context);
        }

        fn up(&mut self, pointer: Pos2) -> Option<InteractionEvent> {
            let mut context = PointerContext {
                viewport: &self.viewport,
                camera: &mut self.camera,
                scene: &self.scene,
                simulation: &mut self.simulation,
                highlight: &mut self.highlight,
            };
            self.controller.pointer_up(pointer, &mut context)
        }
    }

    #[test]
    fn dragging_pins_moves_on_the_camera_plane_and_release_reheats() {
        let mut fixture = Fixture::new();
        let start = fixture.screen_of(Vec3::ZERO);
        let forward = fixture.camera.forward();

        assert_eq!(fixture.down(start), Some(InteractionEvent::DragStarted(0)));
        assert!(fixture.simulation.is_fixed(0));
        assert_eq!(fixture.controller.affordance(), CursorAffordance::Grabbing);

        fixture.moved(start + eframe::egui::vec2(60.0, -20.0));
        let moved = fixture.simulation.position(0).expect("node exists");
        assert!(moved.length() > 1.0);
        assert!(moved.dot(forward).abs() < 1e-2);
        assert_eq!(fixture.simulation.velocity(0), Some(Vec3::ZERO));

        for _ in 0..400 {
            fixture.simulation.tick();
        }
        let event = fixture.up(start + eframe::egui::vec2(60.0, -20.0));
        assert_eq!(event, Some(InteractionEvent::DragEnded(0)));
        assert!(!fixture.simulation.is_fixed(0));
        assert!(fixture.simulation.alpha() >= 0.3);
        assert_eq!(fixture.highlight.selected(), None);
    }

    #[test]
    fn press_and_release_on_a_node_selects_it() {
        let mut fixture = Fixture::new();
        let on_node = fixture.screen_of(vec3(200.0, 0.0, 0.0));
        fixture.down(on_node);
        assert_eq!(fixture.up(on_node), Some(InteractionEvent::NodeSelected(1)));
        assert_eq!(fixture.highlight.selected(), Some(Target::Node(1)));
        assert!(!fixture.simulation.is_fixed(1));
    }

    #[test]
    fn click_on_empty_space_clears_selection() {
        let mut fixture = Fixture::new();
        fixture.highlight.set_selected(Some(Target::Node(0)));
        let empty = pos2(12.0, 12.0);

        assert_eq!(fixture.down(empty), None);
        assert_eq!(fixture.controller.state(), InteractionState::OrbitingCamera);
        assert_eq!(fixture.up(empty), Some(InteractionEvent::SelectionCleared));
        assert_eq!(fixture.highlight.selected(), None);
    }

    #[test]
    fn orbit_gesture_rotates_without_clicking() {
        let mut fixture = Fixture::new();
        fixture.highlight.set_selected(Some(Target::Node(0)));
        let eye = fixture.camera.eye();

        fixture.down(pos2(12.0, 12.0));
        fixture.moved(pos2(80.0, 40.0));
        assert_eq!(fixture.up(pos2(80.0, 40.0)), None);
        assert!(fixture.camera.eye().distance(eye) > 1.0);
        assert_eq!(fixture.highlight.selected(), Some(Target::Node(0)));
    }

    #[test]
    fn hover_prefers_nodes_then_links() {
        let mut fixture = Fixture::new();
        let link_mid = fixture.screen_of(vec3(100.0, 0.0, 0.0));
        fixture.moved(link_mid);
        assert_eq!(fixture.controller.state(), InteractionState::HoveringLink(0));
        assert_eq!(fixture.controller.affordance(), CursorAffordance::Pointer);
        assert_eq!(fixture.highlight.hovered(), Some(Target::Link(0)));

        let node = fixture.screen_of(Vec3::ZERO);
        fixture.moved(node);
        assert_eq!(fixture.controller.state(), InteractionState::HoveringNode(0));
        assert_eq!(fixture.highlight.hovered(), Some(Target::Node(0)));

        fixture.moved(pos2(5.0, 590.0));
        assert_eq!(fixture.controller.state(), InteractionState::Idle);
        assert_eq!(fixture.highlight.hovered(), None);
        assert_eq!(fixture.data.link_count(), 1);
    }
}
