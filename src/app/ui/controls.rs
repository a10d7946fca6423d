use eframe::egui::{self, Key, Response, Ui};

use super::super::driver::LoadMode;
use super::super::ViewModel;

const ARROW_BASE_RATE: f32 = 10.0;
const ARROW_ACCEL_PER_SEC: f32 = 9.0;
const ARROW_ACCEL_MAX: f32 = 40.0;

fn arrow_accel(held_secs: f32) -> f32 {
    let ramp = held_secs * ARROW_ACCEL_PER_SEC;
    (1.0 + ramp + ramp * ramp * 0.15).min(ARROW_ACCEL_MAX)
}

/// Arrow keys nudge a focused slider, faster the longer they are held.
fn nudge_with_arrow_keys(ui: &Ui, response: &Response, value: &mut f32, min: f32, max: f32) -> bool {
    let state_id = response.id.with("arrow_hold_secs");
    let (dt, direction) = ui.input(|input| {
        let up = input.key_down(Key::ArrowRight) || input.key_down(Key::ArrowUp);
        let down = input.key_down(Key::ArrowLeft) || input.key_down(Key::ArrowDown);
        (input.stable_dt.min(0.1), up as i8 - down as i8)
    });

    if !response.has_focus() || direction == 0 {
        ui.ctx().data_mut(|data| data.insert_temp(state_id, 0.0_f32));
        return false;
    }

    // Signed hold time; flipping direction starts the ramp over.
    let previous = ui.ctx().data(|data| data.get_temp::<f32>(state_id).unwrap_or(0.0));
    let held = if previous * direction as f32 >= 0.0 {
        previous.abs() + dt
    } else {
        dt
    };
    ui.ctx()
        .data_mut(|data| data.insert_temp(state_id, held * direction as f32));
    ui.ctx().request_repaint();

    let step = ((max - min) / 200.0).max(0.0005);
    let old_value = *value;
    *value = (*value + direction as f32 * step * ARROW_BASE_RATE * arrow_accel(held) * dt).clamp(min, max);
    (*value - old_value).abs() > f32::EPSILON
}

struct SliderSpec {
    label: &'static str,
    hint: &'static str,
    min: f32,
    max: f32,
}

fn physics_slider(ui: &mut Ui, value: &mut f32, spec: SliderSpec) -> bool {
    let response = ui
        .add(
            egui::Slider::new(value, spec.min..=spec.max)
                .text(spec.label)
                .clamping(egui::SliderClamping::Always),
        )
        .on_hover_text(spec.hint);
    if response.hovered() {
        response.request_focus();
    }
    let changed = response.changed();
    changed | nudge_with_arrow_keys(ui, &response, value, spec.min, spec.max)
}

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Galaxy Controls");
        ui.separator();
        ui.add_space(4.0);

        ui.label("Search entities")
            .on_hover_text("Fuzzy-highlight matching entities and the short paths between them.");
        let search_response = ui.text_edit_singleline(&mut self.search);
        if search_response.changed() {
            self.driver.set_search_query(&self.search);
        }
        let highlight = self.driver.highlight();
        if highlight.search_active() && highlight.path().is_empty() {
            ui.small("No entities match.");
        } else if highlight.search_active() {
            ui.small(format!(
                "{} entities, {} relationships on the path",
                highlight.path().node_count(),
                highlight.path().link_count()
            ));
        }

        ui.separator();

        ui.horizontal(|ui| {
            if ui
                .button("Restart layout")
                .on_hover_text("Reheat the simulation to full energy.")
                .clicked()
            {
                self.driver.restart();
            }
            if ui
                .button("Frame all")
                .on_hover_text("Point the camera at every loaded entity.")
                .clicked()
            {
                self.driver.frame_all();
            }
            if ui.button("Clear selection").clicked() {
                self.driver.select(None);
            }
        });

        ui.horizontal_wrapped(|ui| {
            ui.label("Load mode");
            ui.selectable_value(&mut self.load_mode, LoadMode::Progressive, "Progressive")
                .on_hover_text("Reveal nodes then links in timed batches on the next load.");
            ui.selectable_value(&mut self.load_mode, LoadMode::Immediate, "Immediate")
                .on_hover_text("Build the whole galaxy at once on the next load.");
        });

        ui.checkbox(&mut self.label_all, "Label every node")
            .on_hover_text("Draw labels for all nodes instead of only emphasized ones.");

        ui.checkbox(&mut self.show_fps_bar, "FPS Display")
            .on_hover_text("Show a live FPS readout in the header.");

        ui.collapsing("FPS Display tuning", |ui| {
            ui.add_enabled_ui(self.show_fps_bar, |ui| {
                ui.checkbox(&mut self.fps_show_average, "Show average FPS")
                    .on_hover_text("Display the running average FPS over recent samples.");
                ui.checkbox(&mut self.fps_show_frame_time, "Show frame time")
                    .on_hover_text("Display frame duration in milliseconds.");
            });
        });

        let mut changed = false;
        egui::CollapsingHeader::new("Physics tuning")
            .default_open(true)
            .show(ui, |ui| {
                let physics = &mut self.physics;
                changed |= physics_slider(
                    ui,
                    &mut physics.spring_strength,
                    SliderSpec {
                        label: "Link spring",
                        hint: "How strongly linked entities pull toward the rest length.",
                        min: 0.0,
                        max: 0.3,
                    },
                );
                changed |= physics_slider(
                    ui,
                    &mut physics.rest_length,
                    SliderSpec {
                        label: "Rest length",
                        hint: "Preferred distance between linked entities.",
                        min: 10.0,
                        max: 200.0,
                    },
                );
                changed |= physics_slider(
                    ui,
                    &mut physics.same_type_repulsion,
                    SliderSpec {
                        label: "Same-type repulsion",
                        hint: "Push between entities of the same category.",
                        min: 0.0,
                        max: 10_000.0,
                    },
                );
                changed |= physics_slider(
                    ui,
                    &mut physics.cross_type_repulsion,
                    SliderSpec {
                        label: "Cross-type repulsion",
                        hint: "Push between entities of different categories.",
                        min: 0.0,
                        max: 30_000.0,
                    },
                );
                changed |= physics_slider(
                    ui,
                    &mut physics.cluster_strength,
                    SliderSpec {
                        label: "Clustering",
                        hint: "Pull toward the centroid of the entity's category.",
                        min: 0.0,
                        max: 0.1,
                    },
                );
                changed |= physics_slider(
                    ui,
                    &mut physics.center_strength,
                    SliderSpec {
                        label: "Centering",
                        hint: "Pull toward the origin of the galaxy.",
                        min: 0.0,
                        max: 0.05,
                    },
                );
                changed |= physics_slider(
                    ui,
                    &mut physics.velocity_decay,
                    SliderSpec {
                        label: "Velocity retention",
                        hint: "Share of velocity kept from one tick to the next.",
                        min: 0.1,
                        max: 0.95,
                    },
                );
                changed |= physics_slider(
                    ui,
                    &mut physics.collision_padding,
                    SliderSpec {
                        label: "Collision padding",
                        hint: "Extra gap kept between node surfaces.",
                        min: 0.0,
                        max: 12.0,
                    },
                );
                if ui.button("Reset physics").clicked() {
                    *physics = Default::default();
                    changed = true;
                }
            });

        if changed {
            self.driver.set_physics_config(self.physics);
        }
    }
}
