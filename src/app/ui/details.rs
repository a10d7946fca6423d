use eframe::egui::{self, RichText, Ui};

use crate::util::short_label;

use super::super::highlight::Target;
use super::super::ViewModel;

struct NeighborRow {
    node: usize,
    label: String,
    relation: String,
    outgoing: bool,
}

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Selection Details");
        ui.add_space(6.0);

        match self.driver.highlight().selected() {
            Some(Target::Node(index)) => self.draw_node_details(ui, index),
            Some(Target::Link(index)) => self.draw_link_details(ui, index),
            None => {
                ui.label("Click a node or relationship in the galaxy.");
            }
        }

        ui.separator();
        ui.label(RichText::new("Engine reports").strong());
        if let Some(click) = &self.last_click {
            ui.label(format!(
                "Last click: {} ({})",
                short_label(&click.label, 40),
                click.book_id.as_deref().unwrap_or("no book")
            ))
            .on_hover_text(click.id.as_str());
        }
        ui.label(format!("Visible nodes reported: {}", self.visible_ids.len()));

        let scene = self.driver.scene();
        let pool = scene.pool();
        ui.small(format!(
            "Geometry: {} live, {} allocated, {} released",
            pool.live(),
            pool.allocated(),
            pool.released()
        ));
        ui.small(format!(
            "Links: {} ambient, {} emphasized ({} restyles)",
            scene.ambient().len(),
            scene.emphasized().len(),
            scene.population_rebuilds()
        ));
        let camera = self.driver.camera();
        ui.small(format!(
            "Camera: distance {:.0}, elevation {:.0} deg",
            camera.distance(),
            camera.elevation().to_degrees()
        ));
        if self.report.duplicate_nodes > 0 || self.report.self_links > 0 {
            ui.small(format!(
                "{} duplicate ids ignored, {} self links",
                self.report.duplicate_nodes, self.report.self_links
            ));
        }
        if let Some(error) = &self.scene_error {
            ui.small(format!("Scene: {error}"));
        }
    }

    fn draw_node_details(&mut self, ui: &mut Ui, index: usize) {
        let data = self.driver.shared_data();
        let Some(node) = data.nodes.get(index) else {
            ui.label("Selected node is not part of the current generation.");
            return;
        };

        ui.label(RichText::new(node.label.as_str()).strong().color(node.color));
        ui.small(node.id.as_str());
        ui.add_space(6.0);
        ui.label(format!("Category: {}", node.category.label()));
        ui.label(format!("Degree: {}", node.degree));
        ui.label(format!("Centrality: {:.3}", node.centrality_score));
        if let Some(book_id) = &node.book_id {
            ui.label(format!("Book: {book_id}"));
        }
        if let Some(velocity) = self.driver.simulation().velocity(index) {
            ui.label(format!("Speed: {:.2}", velocity.length()));
        }
        if let Some(position) = self.driver.simulation().position(index) {
            ui.label(format!(
                "Position: ({:.0}, {:.0}, {:.0}){}",
                position.x,
                position.y,
                position.z,
                if self.driver.simulation().is_fixed(index) {
                    "  pinned"
                } else {
                    ""
                }
            ));
        }

        let neighbors = data
            .links
            .iter()
            .filter_map(|link| {
                let (other, outgoing) = if link.source == index {
                    (link.target, true)
                } else if link.target == index {
                    (link.source, false)
                } else {
                    return None;
                };
                Some(NeighborRow {
                    node: other,
                    label: data.nodes[other].label.clone(),
                    relation: link.relation_type.clone(),
                    outgoing,
                })
            })
            .collect::<Vec<_>>();

        ui.separator();
        ui.label(RichText::new("Relationships").strong());
        if neighbors.is_empty() {
            ui.label("No relationships in this generation.");
            return;
        }

        let row_count = neighbors.len().min(self.related_rows_visible);
        let mut should_load_more = false;
        let mut pending_selection = None;

        egui::ScrollArea::vertical()
            .id_salt("neighbor_rows_scroll")
            .max_height(320.0)
            .auto_shrink([false, false])
            .show_rows(ui, 22.0, row_count, |ui, row_range| {
                if row_range.end + Self::RELATED_PREFETCH_MARGIN >= row_count {
                    should_load_more = true;
                }

                for row in row_range.filter_map(|index| neighbors.get(index)) {
                    let arrow = if row.outgoing { "->" } else { "<-" };
                    let relation = if row.relation.is_empty() {
                        "related"
                    } else {
                        row.relation.as_str()
                    };
                    let text = format!("{arrow} [{relation}] {}", short_label(&row.label, 36));
                    if ui.link(text).clicked() {
                        pending_selection = Some(row.node);
                    }
                }
            });

        if should_load_more && row_count < neighbors.len() {
            self.related_rows_visible = (row_count + Self::RELATED_PAGE_ROWS).min(neighbors.len());
        }
        if let Some(node) = pending_selection {
            self.related_rows_visible = Self::INITIAL_RELATED_ROWS;
            self.driver.select(Some(Target::Node(node)));
        }
    }

    fn draw_link_details(&mut self, ui: &mut Ui, index: usize) {
        let data = self.driver.shared_data();
        let Some(link) = data.links.get(index) else {
            ui.label("Selected relationship is not part of the current generation.");
            return;
        };

        let source = &data.nodes[link.source];
        let target = &data.nodes[link.target];
        ui.label(RichText::new(link.relation_type.as_str()).strong());
        ui.small(link.id.as_str());
        ui.add_space(6.0);

        ui.horizontal(|ui| {
            if ui.link(short_label(&source.label, 28)).clicked() {
                self.driver.select(Some(Target::Node(link.source)));
            }
            ui.label("->");
            if ui.link(short_label(&target.label, 28)).clicked() {
                self.driver.select(Some(Target::Node(link.target)));
            }
        });
        ui.label(format!("Weight: {:.2}", link.weight));

        let enrichment = &link.enrichment;
        if let Some(description) = &enrichment.description {
            ui.separator();
            ui.label(RichText::new("Description").strong());
            ui.label(description.as_str());
        }
        if let Some(chunk) = &enrichment.source_chunk_ref {
            ui.label(format!("Source chunk: {chunk}"));
        }
        if let Some(order) = enrichment.confidence_order {
            ui.label(format!("Order: {order}"));
        }
        if !enrichment.is_provenance_rich() {
            ui.small("No provenance recorded for this relationship.");
        }
    }
}
