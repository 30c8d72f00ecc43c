//! Cross-graph deduplication and ranking of synthesized paths.

use std::{collections::HashSet, sync::Arc};

use crate::paths::FlowPath;

/// Deduplicates and ranks paths collected over all graphs.
///
/// 1. A path with the same statement sequence as a kept path is dropped; the others
///    are inserted before the first kept path that is strictly longer, so the
///    ranking is by ascending length and stable within one length.
/// 2. With `one_per_start`, only the best-ranked path of each first statement
///    survives.
/// 3. Of two surviving paths from the same source instance, the later-ranked one
///    is removed if its sink is older than the earlier-ranked one's sink.
#[must_use]
pub fn deduplicate(paths: Vec<FlowPath>, one_per_start: bool) -> Vec<FlowPath> {
    let mut ranked: Vec<FlowPath> = Vec::with_capacity(paths.len());
    for path in paths {
        if ranked
            .iter()
            .any(|kept| kept.statements().eq(path.statements()))
        {
            continue;
        }

        let at = ranked
            .iter()
            .position(|kept| kept.len() > path.len())
            .unwrap_or(ranked.len());
        ranked.insert(at, path);
    }

    if one_per_start {
        let mut starts: HashSet<Arc<str>> = HashSet::new();
        ranked.retain(|path| match path.steps.first() {
            Some(first) => starts.insert(Arc::clone(&first.statement)),
            None => true,
        });
    }

    let mut dominated = vec![false; ranked.len()];
    for i in 0..ranked.len() {
        for j in i + 1..ranked.len() {
            if ranked[i].source == ranked[j].source && ranked[j].sink.time < ranked[i].sink.time {
                dominated[j] = true;
            }
        }
    }

    let before = ranked.len();
    let kept: Vec<FlowPath> = ranked
        .into_iter()
        .zip(dominated)
        .filter_map(|(path, dominated)| (!dominated).then_some(path))
        .collect();
    if kept.len() < before {
        log::debug!("removed {} paths that end before their sibling's sink", before - kept.len());
    }
    kept
}
