mod collect;
mod graph;
mod parse;

pub use collect::collect_graph_data;
pub use graph::{EntityCategory, GraphData, GraphLink, IngestReport};
#[cfg(test)]
pub use parse::parse_payload;
