use std::path::Path;

use eframe::egui::{self, Align, Context, Layout};

use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) const INITIAL_RELATED_ROWS: usize = 24;
    pub(in crate::app) const RELATED_PAGE_ROWS: usize = 24;
    pub(in crate::app) const RELATED_PREFETCH_MARGIN: usize = 4;

    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        payload: &Path,
        reload_requested: &mut bool,
        is_reloading: bool,
    ) {
        self.update_fps_counter(ctx);
        self.drain_host_events();

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("borges-galaxy");
                    ui.separator();
                    ui.label(format!("payload: {}", payload.display()));
                    ui.label(format!("generation: {}", self.driver.generation_serial()));
                    ui.label(format!("nodes: {}", self.driver.data().node_count()));
                    ui.label(format!("links: {}", self.driver.data().link_count()));
                    if self.report.dropped_links > 0 {
                        ui.label(format!("dropped: {}", self.report.dropped_links))
                            .on_hover_text("Relationships whose endpoints are missing from the payload.");
                    }
                    if self.driver.is_loading() {
                        ui.spinner();
                        ui.label(self.load_progress_text());
                    }
                    let reload_button =
                        ui.add_enabled(!is_reloading, egui::Button::new("Reload payload"));
                    if reload_button.clicked() {
                        *reload_requested = true;
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.label(self.visible_graph_text());
                        if let Some(fps_text) = self.fps_display_text() {
                            ui.label(fps_text);
                        }
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(360.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.draw_graph(ui));
    }

    fn load_progress_text(&self) -> String {
        format!(
            "revealing {}/{}",
            self.driver.revealed_nodes(),
            self.driver.data().node_count()
        )
    }
}
