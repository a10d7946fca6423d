use std::collections::{HashMap, HashSet};

use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::payload::GraphData;

use super::paths::shortest_path;

const MAX_BRIDGED_MATCHES: usize = 24;
const MAX_BRIDGE_HOPS: usize = 3;

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

/// Nodes and links emphasized because they answer the active search.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(in crate::app) struct SearchPath {
    nodes: HashSet<usize>,
    links: HashSet<usize>,
}

impl SearchPath {
    pub(in crate::app) fn from_query(data: &GraphData, query: &str) -> Self {
        let query = query.trim();
        if query.is_empty() {
            return Self::default();
        }

        let matcher = SkimMatcherV2::default();
        let mut scored = data
            .nodes
            .iter()
            .enumerate()
            .filter_map(|(index, node)| {
                fuzzy_match_score(&matcher, &node.label, query)
                    .or_else(|| fuzzy_match_score(&matcher, &node.id, query))
                    .map(|score| (score, index))
            })
            .collect::<Vec<_>>();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        Self::from_matches(data, scored.into_iter().map(|(_, index)| index).collect())
    }

    pub(in crate::app) fn from_node_ids<S: AsRef<str>>(data: &GraphData, ids: &[S]) -> Self {
        let matches = ids
            .iter()
            .filter_map(|id| data.index_by_id.get(id.as_ref()).copied())
            .collect();
        Self::from_matches(data, matches)
    }

    fn from_matches(data: &GraphData, matches: Vec<usize>) -> Self {
        let mut nodes = matches.iter().copied().collect::<HashSet<_>>();
        if nodes.is_empty() {
            return Self::default();
        }

        let mut link_by_pair: HashMap<(usize, usize), Vec<usize>> = HashMap::new();
        for (index, link) in data.links.iter().enumerate() {
            let key = (link.source.min(link.target), link.source.max(link.target));
            link_by_pair.entry(key).or_default().push(index);
        }

        let mut links = HashSet::new();
        let add_pair = |a: usize, b: usize, links: &mut HashSet<usize>| {
            if let Some(indices) = link_by_pair.get(&(a.min(b), a.max(b))) {
                links.extend(indices.iter().copied());
            }
        };

        for (index, link) in data.links.iter().enumerate() {
            if nodes.contains(&link.source) && nodes.contains(&link.target) {
                links.insert(index);
            }
        }

        let adjacency = data.adjacency();
        let bridged = &matches[..matches.len().min(MAX_BRIDGED_MATCHES)];
        for pair in bridged.windows(2) {
            let [from, to] = pair else {
                continue;
            };
            let Some(path) = shortest_path(&adjacency, *from, *to, MAX_BRIDGE_HOPS) else {
                continue;
            };
            nodes.extend(path.iter().copied());
            for step in path.windows(2) {
                add_pair(step[0], step[1], &mut links);
            }
        }

        Self { nodes, links }
    }

    pub(in crate::app) fn contains_node(&self, index: usize) -> bool {
        self.nodes.contains(&index)
    }

    pub(in crate::app) fn contains_link(&self, index: usize) -> bool {
        self.links.contains(&index)
    }

    pub(in crate::app) fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub(in crate::app) fn link_count(&self) -> usize {
        self.links.len()
    }

    pub(in crate::app) fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
