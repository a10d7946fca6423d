use std::ops::Range;

use eframe::egui::Color32;
use glam::Vec3;
use thiserror::Error;

use crate::payload::GraphData;

use super::camera::Projection;
use super::highlight::{
    HighlightState, LinkStyle, LinkTier, NodeStyle, NodeTier, link_style, node_style,
};
use super::physics::Simulation;

mod render;

pub(in crate::app) use render::paint_scene;

const OUTLINE_SCALE: f32 = 1.28;
const LINK_PICK_RADIUS: f32 = 2.5;

/// Failures while preparing the drawing surface; the view shows a "not ready" state instead.
#[derive(Debug, Error)]
pub(in crate::app) enum SceneError {
    #[error("viewport unavailable ({width}x{height})")]
    ViewportUnavailable { width: f32, height: f32 },
    #[error("camera projection is degenerate")]
    DegenerateProjection,
}

/// Counts primitives so leaks across generations show up.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(in crate::app) struct GeometryPool {
    live: usize,
    allocated: usize,
    released: usize,
}

impl GeometryPool {
    fn allocate(&mut self, count: usize) {
        self.live += count;
        self.allocated += count;
    }

    fn release_all(&mut self) {
        self.released += self.live;
        self.live = 0;
    }

    pub(in crate::app) fn live(&self) -> usize {
        self.live
    }

    pub(in crate::app) fn allocated(&self) -> usize {
        self.allocated
    }

    pub(in crate::app) fn released(&self) -> usize {
        self.released
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct PickSphere {
    pub center: Vec3,
    pub radius: f32,
}

/// Cosmetic ring drawn around a node; never takes part in picking.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct Badge {
    pub center: Vec3,
    pub radius: f32,
    pub color: Color32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct PickSegment {
    pub start: Vec3,
    pub end: Vec3,
    pub radius: f32,
}

#[derive(Clone, Debug)]
pub(in crate::app) struct NodeVisual {
    pub node: usize,
    pub base_radius: f32,
    pub pick: PickSphere,
    pub outline: Badge,
    pub style: NodeStyle,
}

#[derive(Clone, Debug)]
pub(in crate::app) struct LinkVisual {
    pub link: usize,
    pub source: usize,
    pub target: usize,
    pub pick: PickSegment,
    pub glow: bool,
    pub style: LinkStyle,
}

#[derive(Default)]
pub(in crate::app) struct ViewScratch {
    projections: Vec<Option<Projection>>,
    draw_order: Vec<usize>,
}

/// Renderable counterparts of the current generation's nodes and links.
#[derive(Default)]
pub(in crate::app) struct SceneGraph {
    nodes: Vec<NodeVisual>,
    links: Vec<LinkVisual>,
    ambient: Vec<usize>,
    emphasized: Vec<usize>,
    styles_revision: Option<u64>,
    populations_revision: Option<u64>,
    population_rebuilds: u64,
    pool: GeometryPool,
    scratch: ViewScratch,
}

impl SceneGraph {
    pub(in crate::app) fn build(&mut self, data: &GraphData, simulation: &Simulation) {
        self.dispose();
        self.extend_nodes(0..simulation.node_count(), data, simulation);
        let links = (0..data.link_count()).collect::<Vec<_>>();
        self.extend_links(&links, data, simulation);
    }

    pub(in crate::app) fn extend_nodes(
        &mut self,
        nodes: Range<usize>,
        data: &GraphData,
        simulation: &Simulation,
    ) {
        for node in nodes {
            let (Some(info), Some(center)) = (data.nodes.get(node), simulation.position(node)) else {
                continue;
            };
            if node != self.nodes.len() {
                continue;
            }

            let style = node_style(NodeTier::Default, info.color);
            self.nodes.push(NodeVisual {
                node,
                base_radius: info.size,
                pick: PickSphere {
                    center,
                    radius: info.size,
                },
                outline: Badge {
                    center,
                    radius: info.size * OUTLINE_SCALE,
                    color: style.color,
                },
                style,
            });
            self.pool.allocate(2);
        }
        self.styles_revision = None;
    }

    pub(in crate::app) fn extend_links(
        &mut self,
        links: &[usize],
        data: &GraphData,
        simulation: &Simulation,
    ) {
        for &link in links {
            let Some(info) = data.links.get(link) else {
                continue;
            };
            let (Some(start), Some(end)) = (
                simulation.position(info.source),
                simulation.position(info.target),
            ) else {
                continue;
            };

            self.links.push(LinkVisual {
                link,
                source: info.source,
                target: info.target,
                pick: PickSegment {
                    start,
                    end,
                    radius: LINK_PICK_RADIUS,
                },
                glow: false,
                style: link_style(LinkTier::Plain),
            });
            self.pool.allocate(1);
        }
        self.populations_revision = None;
    }

    /// Copies simulation positions into every primitive; restyles only when the highlight changed.
    pub(in crate::app) fn sync_frame(
        &mut self,
        data: &GraphData,
        simulation: &Simulation,
        highlight: &HighlightState,
    ) {
        let restyle = self.styles_revision != Some(highlight.revision());

        for visual in &mut self.nodes {
            if let Some(center) = simulation.position(visual.node) {
                visual.pick.center = center;
                visual.outline.center = center;
            }
            if restyle && let Some(info) = data.nodes.get(visual.node) {
                visual.style = node_style(highlight.node_tier(visual.node, data), info.color);
                visual.pick.radius = visual.base_radius * visual.style.scale;
                visual.outline.radius = visual.pick.radius * OUTLINE_SCALE;
                visual.outline.color = visual.style.color;
            }
        }
        if restyle {
            self.styles_revision = Some(highlight.revision());
        }

        for visual in &mut self.links {
            if let (Some(start), Some(end)) = (
                simulation.position(visual.source),
                simulation.position(visual.target),
            ) {
                visual.pick.start = start;
                visual.pick.end = end;
            }
        }

        if self.populations_revision != Some(highlight.revision()) {
            self.rebuild_link_populations(data, highlight);
        }
    }

    pub(in crate::app) fn rebuild_link_populations(
        &mut self,
        data: &GraphData,
        highlight: &HighlightState,
    ) {
        self.ambient.clear();
        self.emphasized.clear();

        for (slot, visual) in self.links.iter_mut().enumerate() {
            let Some(info) = data.links.get(visual.link) else {
                continue;
            };
            let tier = highlight.link_tier(visual.link, info);
            visual.style = link_style(tier);
            visual.glow = visual.style.tier == LinkTier::HighlightedPath;
            if visual.glow {
                self.emphasized.push(slot);
            } else {
                self.ambient.push(slot);
            }
        }

        self.populations_revision = Some(highlight.revision());
        self.population_rebuilds += 1;
    }

    pub(in crate::app) fn dispose(&mut self) {
        self.pool.release_all();
        self.nodes.clear();
        self.links.clear();
        self.ambient.clear();
        self.emphasized.clear();
        self.scratch.projections.clear();
        self.scratch.draw_order.clear();
        self.styles_revision = None;
        self.populations_revision = None;
    }

    pub(in crate::app) fn nodes(&self) -> &[NodeVisual] {
        &self.nodes
    }

    pub(in crate::app) fn links(&self) -> &[LinkVisual] {
        &self.links
    }

    pub(in crate::app) fn ambient(&self) -> &[usize] {
        &self.ambient
    }

    pub(in crate::app) fn emphasized(&self) -> &[usize] {
        &self.emphasized
    }

    pub(in crate::app) fn population_rebuilds(&self) -> u64 {
        self.population_rebuilds
    }

    pub(in crate::app) fn pool(&self) -> GeometryPool {
        self.pool
    }
}
