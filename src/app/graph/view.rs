use std::time::Duration;

use eframe::egui::{Align2, Color32, FontId, Response, Sense, Ui, vec2};
use tracing::debug;

use crate::util::short_label;

use super::super::camera::Viewport;
use super::super::highlight::Target;
use super::super::interaction::InteractionState;
use super::super::render_utils::draw_background;
use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);
        draw_background(&painter, rect);

        let viewport = match Viewport::new(rect) {
            Ok(viewport) => viewport,
            Err(error) => {
                self.note_scene_error(error.to_string());
                ui.ctx().request_repaint();
                return;
            }
        };

        self.route_pointer(ui, &viewport, &response);

        let now = ui.ctx().input(|input| input.time);
        let dt = self.last_frame_time.map_or(0.0, |last| now - last);
        self.last_frame_time = Some(now);
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let outcome = self.driver.advance(Duration::from_secs_f64(dt));
        let gesture = matches!(
            self.driver.interaction_state(),
            InteractionState::OrbitingCamera | InteractionState::DraggingNode { .. }
        );
        if outcome.needs_frame() || gesture {
            ui.ctx().request_repaint();
        } else if let Some(remaining) = self.driver.until_restart() {
            ui.ctx().request_repaint_after(remaining);
        }

        match self.driver.paint(&painter, &viewport, self.label_all) {
            Ok(drawn) => {
                self.drawn_node_count = drawn;
                self.scene_error = None;
            }
            Err(error) => {
                self.note_scene_error(error.to_string());
                painter.text(
                    rect.center(),
                    Align2::CENTER_CENTER,
                    "Scene not ready",
                    FontId::proportional(16.0),
                    Color32::from_gray(200),
                );
                return;
            }
        }

        if let Some(hovered) = self.driver.highlight().hovered() {
            let data = self.driver.data();
            let panel_text = match hovered {
                Target::Node(index) => data.nodes.get(index).map(|node| {
                    format!(
                        "{}  |  {}  |  degree {}",
                        short_label(&node.label, 48),
                        node.category.label(),
                        node.degree
                    )
                }),
                Target::Link(index) => data.links.get(index).map(|link| {
                    format!(
                        "{} -[{}]-> {}",
                        short_label(&data.nodes[link.source].label, 24),
                        link.relation_type,
                        short_label(&data.nodes[link.target].label, 24)
                    )
                }),
            };
            if let Some(panel_text) = panel_text {
                painter.text(
                    rect.left_top() + vec2(10.0, 10.0),
                    Align2::LEFT_TOP,
                    panel_text,
                    FontId::proportional(13.0),
                    Color32::from_gray(240),
                );
            }
        }
    }

    fn route_pointer(&mut self, ui: &Ui, viewport: &Viewport, response: &Response) {
        let (pointer, pressed, released, scroll) = ui.input(|input| {
            (
                input.pointer.hover_pos(),
                input.pointer.primary_pressed(),
                input.pointer.primary_released(),
                input.raw_scroll_delta.y,
            )
        });
        let engaged = response.hovered() || response.dragged();

        if let Some(pointer) = pointer
            && engaged
        {
            if pressed && response.hovered() {
                self.driver.pointer_down(viewport, pointer);
            } else {
                self.driver.pointer_move(viewport, pointer);
            }
            if released {
                self.driver.pointer_up(viewport, pointer);
            }
            self.pointer_inside = true;
        } else if self.pointer_inside {
            self.driver.pointer_leave(viewport);
            self.pointer_inside = false;
        }

        if response.hovered() {
            if scroll.abs() > f32::EPSILON {
                self.driver.scroll(scroll);
            }
            ui.ctx().set_cursor_icon(self.driver.affordance().cursor_icon());
        }
    }

    fn note_scene_error(&mut self, message: String) {
        if self.scene_error.as_deref() != Some(message.as_str()) {
            debug!(%message, "scene not ready");
            self.scene_error = Some(message);
        }
    }
}
