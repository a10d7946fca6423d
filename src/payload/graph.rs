use std::collections::HashMap;

use eframe::egui::Color32;
use tracing::{debug, warn};

use super::parse::{GraphPayload, RawNode, RawRelationship, number_property, string_property};

/// Closed set of entity classes the galaxy colors and clusters by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityCategory {
    Person,
    Place,
    Organization,
    Event,
    Concept,
    Book,
    Other,
}

struct CategoryRow {
    name: &'static str,
    color: Color32,
}

impl EntityCategory {
    pub const ALL: [Self; 7] = [
        Self::Person,
        Self::Place,
        Self::Organization,
        Self::Event,
        Self::Concept,
        Self::Book,
        Self::Other,
    ];

    fn row(self) -> CategoryRow {
        match self {
            Self::Person => CategoryRow {
                name: "Person",
                color: Color32::from_rgb(255, 138, 101),
            },
            Self::Place => CategoryRow {
                name: "Place",
                color: Color32::from_rgb(102, 187, 106),
            },
            Self::Organization => CategoryRow {
                name: "Organization",
                color: Color32::from_rgb(171, 130, 255),
            },
            Self::Event => CategoryRow {
                name: "Event",
                color: Color32::from_rgb(255, 213, 79),
            },
            Self::Concept => CategoryRow {
                name: "Concept",
                color: Color32::from_rgb(79, 195, 247),
            },
            Self::Book => CategoryRow {
                name: "Book",
                color: Color32::from_rgb(240, 98, 146),
            },
            Self::Other => CategoryRow {
                name: "Other",
                color: Color32::from_rgb(158, 167, 180),
            },
        }
    }

    pub fn label(self) -> &'static str {
        self.row().name
    }

    pub fn color(self) -> Color32 {
        self.row().color
    }

    pub fn index(self) -> usize {
        self as usize
    }

    fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        let name = name.trim_matches('"');
        let category = match name {
            "person" | "people" | "character" | "author" | "writer" => Self::Person,
            "place" | "location" | "geo" | "city" | "country" | "region" => Self::Place,
            "organization" | "organisation" | "org" | "institution" | "group" => {
                Self::Organization
            }
            "event" | "date" | "period" => Self::Event,
            "concept" | "idea" | "theme" | "topic" | "category" => Self::Concept,
            "book" | "work" | "document" | "text" | "story" => Self::Book,
            _ => return None,
        };
        Some(category)
    }

    /// Resolves the category from the entity type property first, then node labels.
    pub fn resolve(labels: &[String], entity_type: Option<&str>) -> Self {
        entity_type
            .and_then(Self::from_name)
            .or_else(|| labels.iter().find_map(|label| Self::from_name(label)))
            .unwrap_or(Self::Other)
    }
}

pub fn node_size(degree: u32) -> f32 {
    (6.0 + (degree as f32).sqrt() * 2.2).min(24.0)
}

#[derive(Clone, Debug)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub category: EntityCategory,
    pub degree: u32,
    pub centrality_score: f32,
    pub color: Color32,
    pub size: f32,
    pub book_id: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LinkEnrichment {
    pub description: Option<String>,
    pub source_chunk_ref: Option<String>,
    pub confidence_order: Option<u32>,
}

impl LinkEnrichment {
    pub fn has_source_text(&self) -> bool {
        self.source_chunk_ref.is_some()
    }

    pub fn has_description(&self) -> bool {
        self.description.is_some()
    }

    pub fn is_provenance_rich(&self) -> bool {
        self.has_source_text() || self.has_description()
    }
}

#[derive(Clone, Debug)]
pub struct GraphLink {
    pub id: String,
    pub source: usize,
    pub target: usize,
    pub relation_type: String,
    pub weight: f32,
    pub enrichment: LinkEnrichment,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub dropped_links: usize,
    pub duplicate_nodes: usize,
    pub self_links: usize,
}

/// One generation of the galaxy: nodes in arena order plus index-resolved links.
#[derive(Clone, Debug, Default)]
pub struct GraphData {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
    pub index_by_id: HashMap<String, usize>,
}

impl GraphData {
    pub fn from_payload(payload: GraphPayload) -> (Self, IngestReport) {
        let mut report = IngestReport::default();
        let mut nodes = Vec::with_capacity(payload.nodes.len());
        let mut index_by_id = HashMap::with_capacity(payload.nodes.len());

        for raw in payload.nodes {
            if index_by_id.contains_key(&raw.id) {
                report.duplicate_nodes += 1;
                continue;
            }
            index_by_id.insert(raw.id.clone(), nodes.len());
            nodes.push(make_node(raw));
        }

        let mut links = Vec::with_capacity(payload.relationships.len());
        for (position, raw) in payload.relationships.into_iter().enumerate() {
            let endpoints = raw
                .source
                .as_deref()
                .and_then(|id| index_by_id.get(id).copied())
                .zip(raw.target.as_deref().and_then(|id| index_by_id.get(id).copied()));
            let Some((source, target)) = endpoints else {
                report.dropped_links += 1;
                debug!(source = ?raw.source, target = ?raw.target, "dropping dangling relationship");
                continue;
            };
            if source == target {
                report.self_links += 1;
            }
            links.push(make_link(raw, position, source, target));
        }

        if report.dropped_links > 0 {
            warn!(
                dropped = report.dropped_links,
                "relationships with missing or absent endpoints were dropped"
            );
        }
        if report.duplicate_nodes > 0 {
            warn!(
                duplicates = report.duplicate_nodes,
                "duplicate node ids kept their first occurrence"
            );
        }

        (
            Self {
                nodes,
                links,
                index_by_id,
            },
            report,
        )
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn adjacency(&self) -> Vec<Vec<usize>> {
        let mut adjacency = vec![Vec::new(); self.nodes.len()];
        for link in &self.links {
            if link.source == link.target {
                continue;
            }
            adjacency[link.source].push(link.target);
            adjacency[link.target].push(link.source);
        }
        for neighbors in &mut adjacency {
            neighbors.sort_unstable();
            neighbors.dedup();
        }
        adjacency
    }
}

fn make_node(raw: RawNode) -> GraphNode {
    let entity_type = string_property(&raw.properties, &["entity_type", "type"]);
    let category = EntityCategory::resolve(&raw.labels, entity_type);
    let label = string_property(&raw.properties, &["name", "title", "label"])
        .map(str::to_owned)
        .unwrap_or_else(|| raw.id.clone());
    let book_id = string_property(&raw.properties, &["book_id", "bookId", "book"]).map(str::to_owned);
    let centrality_score = if raw.centrality_score.is_finite() {
        raw.centrality_score.max(0.0) as f32
    } else {
        0.0
    };

    GraphNode {
        label,
        category,
        degree: raw.degree,
        centrality_score,
        color: category.color(),
        size: node_size(raw.degree),
        book_id,
        id: raw.id,
    }
}

fn make_link(raw: RawRelationship, position: usize, source: usize, target: usize) -> GraphLink {
    let weight = number_property(&raw.properties, &["weight"])
        .map(|weight| weight.max(0.0) as f32)
        .unwrap_or(1.0);
    let enrichment = LinkEnrichment {
        description: string_property(&raw.properties, &["description"]).map(str::to_owned),
        source_chunk_ref: string_property(
            &raw.properties,
            &["source_chunk", "source_chunk_ref", "source_id", "text_unit_id"],
        )
        .map(str::to_owned),
        confidence_order: number_property(&raw.properties, &["order", "confidence_order"])
            .filter(|order| *order >= 0.0)
            .map(|order| order as u32),
    };
    let id = match raw.id {
        Some(id) => id,
        None => format!(
            "{}-{}-{position}",
            raw.source.unwrap_or_default(),
            raw.target.unwrap_or_default()
        ),
    };

    GraphLink {
        id,
        source,
        target,
        relation_type: raw.relation_type,
        weight,
        enrichment,
    }
}
