use std::ops::Range;
use std::time::Duration;

use tracing::debug;

use crate::config::LoaderConfig;
use crate::payload::GraphData;

/// Receives revealed batches; implemented by the generation that owns simulation and scene.
pub(in crate::app) trait BatchSink {
    fn reveal_nodes(&mut self, nodes: Range<usize>);
    fn reveal_links(&mut self, links: &[usize]);
}

pub(in crate::app) type CompletionCallback = Box<dyn FnOnce(&[String])>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) enum LoadPhase {
    Nodes,
    Links,
    Complete,
    Cancelled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) enum LoadProgress {
    Waiting,
    Revealed,
    Completed,
    Finished,
}

/// Reveals a generation in timed batches: every node first, then links.
pub(in crate::app) struct ProgressiveLoader {
    phase: LoadPhase,
    node_batch_size: usize,
    link_batch_size: usize,
    interval: Duration,
    elapsed: Duration,
    started: bool,
    revealed_nodes: usize,
    link_cursor: usize,
    batch_scratch: Vec<usize>,
    on_complete: Option<CompletionCallback>,
}

impl ProgressiveLoader {
    pub(in crate::app) fn load(config: LoaderConfig, on_complete: CompletionCallback) -> Self {
        Self {
            phase: LoadPhase::Nodes,
            node_batch_size: config.node_batch_size.max(1),
            link_batch_size: config.link_batch_size.max(1),
            interval: config.batch_interval(),
            elapsed: Duration::ZERO,
            started: false,
            revealed_nodes: 0,
            link_cursor: 0,
            batch_scratch: Vec::new(),
            on_complete: Some(on_complete),
        }
    }

    pub(in crate::app) fn phase(&self) -> LoadPhase {
        self.phase
    }

    pub(in crate::app) fn is_pending(&self) -> bool {
        matches!(self.phase, LoadPhase::Nodes | LoadPhase::Links)
    }

    /// Drops pending batches and the completion callback.
    pub(in crate::app) fn cancel(&mut self) {
        if self.is_pending() {
            debug!(revealed = self.revealed_nodes, "progressive load cancelled");
            self.phase = LoadPhase::Cancelled;
        }
        self.on_complete = None;
    }

    pub(in crate::app) fn advance(
        &mut self,
        dt: Duration,
        data: &GraphData,
        sink: &mut impl BatchSink,
    ) -> LoadProgress {
        if !self.is_pending() {
            return LoadProgress::Finished;
        }

        if self.started {
            self.elapsed += dt;
            if self.elapsed < self.interval {
                return LoadProgress::Waiting;
            }
            self.elapsed = (self.elapsed - self.interval).min(self.interval);
        } else {
            self.started = true;
        }

        if self.phase == LoadPhase::Nodes {
            let end = (self.revealed_nodes + self.node_batch_size).min(data.node_count());
            if end > self.revealed_nodes {
                sink.reveal_nodes(self.revealed_nodes..end);
                self.revealed_nodes = end;
            }
            if self.revealed_nodes < data.node_count() {
                return LoadProgress::Revealed;
            }
            self.phase = LoadPhase::Links;
            if end > 0 && data.link_count() > 0 {
                return LoadProgress::Revealed;
            }
        }

        let end = (self.link_cursor + self.link_batch_size).min(data.link_count());
        self.batch_scratch.clear();
        let revealed = self.revealed_nodes;
        self.batch_scratch.extend(
            (self.link_cursor..end).filter(|&index| {
                data.links[index].source < revealed && data.links[index].target < revealed
            }),
        );
        self.link_cursor = end;
        if !self.batch_scratch.is_empty() {
            sink.reveal_links(&self.batch_scratch);
        }

        if self.link_cursor < data.link_count() {
            return LoadProgress::Revealed;
        }

        self.phase = LoadPhase::Complete;
        if let Some(on_complete) = self.on_complete.take() {
            let ids = data.nodes[..self.revealed_nodes]
                .iter()
                .map(|node| node.id.clone())
                .collect::<Vec<_>>();
            on_complete(&ids);
        }
        LoadProgress::Completed
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use proptest::prelude::*;

    use super::*;
    use crate::payload::parse_payload;

    #[derive(Default)]
    struct Recorder {
        nodes: usize,
        links: Vec<usize>,
        node_batches: usize,
        link_before_all_nodes: bool,
        total_nodes: usize,
    }

    impl BatchSink for Recorder {
        fn reveal_nodes(&mut self, nodes: Range<usize>) {
            assert_eq!(nodes.start, self.nodes);
            self.nodes = nodes.end;
            self.node_batches += 1;
        }

        fn reveal_links(&mut self, links: &[usize]) {
            if self.nodes < self.total_nodes {
                self.link_before_all_nodes = true;
            }
            self.links.extend_from_slice(links);
        }
    }

    fn completion() -> (Rc<RefCell<Option<Vec<String>>>>, CompletionCallback) {
        let seen = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&seen);
        let callback: CompletionCallback =
            Box::new(move |ids: &[String]| *sink.borrow_mut() = Some(ids.to_vec()));
        (seen, callback)
    }

    fn run_to_end(loader: &mut ProgressiveLoader, data: &GraphData, recorder: &mut Recorder) {
        for _ in 0..10_000 {
            if loader.advance(Duration::from_millis(60), data, recorder) == LoadProgress::Completed {
                return;
            }
        }
        panic!("loader never completed");
    }

    fn five_node_graph() -> GraphData {
        let payload = parse_payload(
            r#"{
                "nodes": [{"id": "A"}, {"id": "B"}, {"id": "D"}, {"id": "E"}, {"id": "F"}],
                "relationships": [
                    {"source": "A", "target": "B"},
                    {"source": "A", "target": "C"}
                ]
            }"#,
        )
        .expect("payload parses");
        GraphData::from_payload(payload).0
    }

    #[test]
    fn five_node_scenario_completes_with_every_node_id() {
        let data = five_node_graph();
        let (seen, callback) = completion();
        let mut loader = ProgressiveLoader::load(LoaderConfig::default(), callback);
        let mut recorder = Recorder {
            total_nodes: data.node_count(),
            ..Recorder::default()
        };

        assert_eq!(loader.advance(Duration::ZERO, &data, &mut recorder), LoadProgress::Revealed);
        assert_eq!(recorder.nodes, 5);
        assert!(recorder.links.is_empty());
        assert_eq!(loader.advance(Duration::from_millis(20), &data, &mut recorder), LoadProgress::Waiting);
        assert_eq!(loader.advance(Duration::from_millis(40), &data, &mut recorder), LoadProgress::Completed);

        assert_eq!(recorder.links, vec![0]);
        assert_eq!(
            seen.borrow().as_deref(),
            Some(&["A", "B", "D", "E", "F"].map(str::to_owned)[..])
        );
        assert_eq!(loader.advance(Duration::from_secs(1), &data, &mut recorder), LoadProgress::Finished);
    }

    #[test]
    fn nodes_arrive_in_batches_before_any_link() {
        let nodes = (0..25)
            .map(|index| format!(r#"{{"id": "n{index}"}}"#))
            .collect::<Vec<_>>()
            .join(",");
        let links = (1..25)
            .map(|index| format!(r#"{{"source": "n0", "target": "n{index}"}}"#))
            .collect::<Vec<_>>()
            .join(",");
        let payload = parse_payload(&format!(r#"{{"nodes": [{nodes}], "relationships": [{links}]}}"#))
            .expect("payload parses");
        let data = GraphData::from_payload(payload).0;

        let (seen, callback) = completion();
        let mut loader = ProgressiveLoader::load(LoaderConfig::default(), callback);
        let mut recorder = Recorder {
            total_nodes: data.node_count(),
            ..Recorder::default()
        };
        run_to_end(&mut loader, &data, &mut recorder);

        assert_eq!(recorder.node_batches, 3);
        assert!(!recorder.link_before_all_nodes);
        assert_eq!(recorder.links.len(), 24);
        assert_eq!(seen.borrow().as_ref().map(Vec::len), Some(25));
    }

    #[test]
    fn empty_graph_completes_on_first_advance() {
        let data = GraphData::default();
        let (seen, callback) = completion();
        let mut loader = ProgressiveLoader::load(LoaderConfig::default(), callback);
        let mut recorder = Recorder::default();
        assert_eq!(loader.advance(Duration::ZERO, &data, &mut recorder), LoadProgress::Completed);
        assert_eq!(seen.borrow().as_deref(), Some(&[][..]));
    }

    #[test]
    fn cancelled_loader_never_calls_back() {
        let data = five_node_graph();
        let (seen, callback) = completion();
        let mut loader = ProgressiveLoader::load(LoaderConfig::default(), callback);
        let mut recorder = Recorder::default();
        loader.advance(Duration::ZERO, &data, &mut recorder);
        loader.cancel();

        assert_eq!(loader.phase(), LoadPhase::Cancelled);
        assert_eq!(loader.advance(Duration::from_secs(5), &data, &mut recorder), LoadProgress::Finished);
        assert!(seen.borrow().is_none());
        assert!(recorder.links.is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn revealed_links_only_reference_revealed_nodes(
            node_count in 0usize..60,
            raw_links in prop::collection::vec((0usize..80, 0usize..80), 0..120),
            node_batch in 1usize..16,
            link_batch in 1usize..32,
        ) {
            let nodes = (0..node_count)
                .map(|index| format!(r#"{{"id": "n{index}"}}"#))
                .collect::<Vec<_>>()
                .join(",");
            let links = raw_links
                .iter()
                .map(|(source, target)| format!(r#"{{"source": "n{source}", "target": "n{target}"}}"#))
                .collect::<Vec<_>>()
                .join(",");
            let payload = parse_payload(&format!(r#"{{"nodes": [{nodes}], "relationships": [{links}]}}"#))
                .expect("payload parses");
            let data = GraphData::from_payload(payload).0;

            let config = LoaderConfig {
                node_batch_size: node_batch,
                link_batch_size: link_batch,
                batch_interval_ms: 10,
            };
            let (seen, callback) = completion();
            let mut loader = ProgressiveLoader::load(config, callback);
            let mut recorder = Recorder {
                total_nodes: data.node_count(),
                ..Recorder::default()
            };
            run_to_end(&mut loader, &data, &mut recorder);

            prop_assert!(!recorder.link_before_all_nodes);
            prop_assert_eq!(recorder.nodes, data.node_count());
            prop_assert_eq!(recorder.links.len(), data.link_count());
            for &link in &recorder.links {
                prop_assert!(data.links[link].source < recorder.nodes);
                prop_assert!(data.links[link].target < recorder.nodes);
            }
            prop_assert_eq!(seen.borrow().as_ref().map(Vec::len), Some(data.node_count()));
        }
    }
}
