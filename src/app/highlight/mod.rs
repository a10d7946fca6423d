use std::sync::Arc;

use eframe::egui::Color32;

use crate::payload::{GraphData, GraphLink};

mod paths;
mod search;

pub(in crate::app) use self::search::SearchPath;
use super::render_utils::scale_brightness;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(in crate::app) enum Target {
    Node(usize),
    Link(usize),
}

/// Emphasis tiers for nodes, strongest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) enum NodeTier {
    Selected,
    Hovered,
    PathHighlighted,
    GroupHover,
    Dimmed,
    Default,
}

impl NodeTier {
    pub(in crate::app) fn scale(self) -> f32 {
        match self {
            Self::Selected => 1.6,
            Self::Hovered => 1.35,
            Self::PathHighlighted => 1.2,
            Self::GroupHover => 1.08,
            Self::Dimmed => 0.85,
            Self::Default => 1.0,
        }
    }

    pub(in crate::app) fn brightness(self) -> f32 {
        match self {
            Self::Selected => 1.45,
            Self::Hovered => 1.3,
            Self::PathHighlighted => 1.2,
            Self::GroupHover => 1.1,
            Self::Dimmed => 0.3,
            Self::Default => 0.85,
        }
    }

    pub(in crate::app) fn shows_label(self) -> bool {
        matches!(self, Self::Selected | Self::Hovered | Self::PathHighlighted)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) enum LinkTier {
    HighlightedPath,
    ProvenanceRich { source_text: bool, description: bool },
    Plain,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct NodeStyle {
    pub tier: NodeTier,
    pub scale: f32,
    pub color: Color32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct LinkStyle {
    pub tier: LinkTier,
    pub color: Color32,
    pub opacity: f32,
    pub width: f32,
}

pub(in crate::app) fn node_style(tier: NodeTier, base: Color32) -> NodeStyle {
    NodeStyle {
        tier,
        scale: tier.scale(),
        color: scale_brightness(base, tier.brightness()),
    }
}

pub(in crate::app) fn link_style(tier: LinkTier) -> LinkStyle {
    match tier {
        LinkTier::HighlightedPath => LinkStyle {
            tier,
            color: Color32::from_rgb(246, 206, 104),
            opacity: 0.95,
            width: 2.6,
        },
        LinkTier::ProvenanceRich {
            source_text,
            description,
        } => {
            let mut opacity = 0.4;
            if source_text {
                opacity += 0.15;
            }
            if description {
                opacity += 0.1;
            }
            LinkStyle {
                tier,
                color: Color32::from_rgb(126, 178, 255),
                opacity,
                width: 1.4,
            }
        }
        LinkTier::Plain => LinkStyle {
            tier,
            color: Color32::from_rgb(112, 122, 138),
            opacity: 0.22,
            width: 0.9,
        },
    }
}

/// Hover, selection and search inputs the tiers are derived from.
///
/// `revision` only moves when one of the inputs actually changes, so callers can
/// cache anything derived from it.
#[derive(Clone, Debug, Default)]
pub(in crate::app) struct HighlightState {
    selected: Option<Target>,
    hovered: Option<Target>,
    path: Arc<SearchPath>,
    search_active: bool,
    revision: u64,
}

impl HighlightState {
    pub(in crate::app) fn revision(&self) -> u64 {
        self.revision
    }

    pub(in crate::app) fn selected(&self) -> Option<Target> {
        self.selected
    }

    pub(in crate::app) fn hovered(&self) -> Option<Target> {
        self.hovered
    }

    pub(in crate::app) fn path(&self) -> &SearchPath {
        &self.path
    }

    pub(in crate::app) fn search_active(&self) -> bool {
        self.search_active
    }

    fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    pub(in crate::app) fn set_hovered(&mut self, hovered: Option<Target>) -> bool {
        if self.hovered == hovered {
            return false;
        }
        self.hovered = hovered;
        self.bump();
        true
    }

    pub(in crate::app) fn set_selected(&mut self, selected: Option<Target>) -> bool {
        if self.selected == selected {
            return false;
        }
        self.selected = selected;
        self.bump();
        true
    }

    pub(in crate::app) fn set_search(&mut self, path: Arc<SearchPath>, active: bool) -> bool {
        if Arc::ptr_eq(&self.path, &path) && self.search_active == active {
            return false;
        }
        self.path = path;
        self.search_active = active;
        self.bump();
        true
    }

    /// Forgets per-generation indices; the search inputs are rebuilt by the caller.
    pub(in crate::app) fn reset(&mut self) {
        self.selected = None;
        self.hovered = None;
        self.path = Arc::default();
        self.search_active = false;
        self.bump();
    }

    pub(in crate::app) fn node_tier(&self, index: usize, data: &GraphData) -> NodeTier {
        if self.selected == Some(Target::Node(index)) {
            return NodeTier::Selected;
        }
        if self.hovered == Some(Target::Node(index)) {
            return NodeTier::Hovered;
        }
        if self.path.contains_node(index) {
            return NodeTier::PathHighlighted;
        }
        if let Some(Target::Node(hovered)) = self.hovered
            && let (Some(hovered), Some(node)) = (data.nodes.get(hovered), data.nodes.get(index))
            && hovered.category == node.category
        {
            return NodeTier::GroupHover;
        }
        if self.search_active {
            return NodeTier::Dimmed;
        }
        NodeTier::Default
    }

    pub(in crate::app) fn link_tier(&self, index: usize, link: &GraphLink) -> LinkTier {
        let selected = match self.selected {
            Some(Target::Link(selected)) => selected == index,
            Some(Target::Node(node)) => link.source == node || link.target == node,
            None => false,
        };
        if selected || self.hovered == Some(Target::Link(index)) || self.path.contains_link(index) {
            return LinkTier::HighlightedPath;
        }

        if link.enrichment.is_provenance_rich() {
            return LinkTier::ProvenanceRich {
                source_text: link.enrichment.has_source_text(),
                description: link.enrichment.has_description(),
            };
        }
        LinkTier::Plain
    }
}
