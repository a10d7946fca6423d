use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::graph::{GraphData, IngestReport};
use super::parse::parse_payload;

pub fn collect_graph_data(path: &Path) -> Result<(GraphData, IngestReport)> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read graph payload from {}", path.display()))?;
    let payload = parse_payload(&raw)
        .with_context(|| format!("failed to parse graph payload {}", path.display()))?;

    let (data, report) = GraphData::from_payload(payload);
    info!(
        nodes = data.node_count(),
        links = data.link_count(),
        dropped = report.dropped_links,
        "graph payload ingested"
    );
    Ok((data, report))
}
