//! Swim lane ordering: count sort, alphabetical sort and the
//! position-preserving smart rerank.

use super::types::{Record, TimeWindow};
use std::collections::{BTreeMap, HashSet};

/// Which ordering the manual reorder action applied last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
    Count,
    Alphabetical,
}

impl SortMode {
    pub fn toggled(self) -> Self {
        match self {
            SortMode::Count => SortMode::Alphabetical,
            SortMode::Alphabetical => SortMode::Count,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortMode::Count => "by count",
            SortMode::Alphabetical => "A-Z",
        }
    }
}

/// Ordered, duplicate-free list of project identifiers. Index = lane.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectOrder {
    projects: Vec<String>,
    sort_mode: SortMode,
}

impl Default for ProjectOrder {
    fn default() -> Self {
        Self {
            projects: Vec::new(),
            sort_mode: SortMode::Count,
        }
    }
}

/// Record count per project id. BTreeMap keeps iteration deterministic.
pub fn count_by_project<'a, I>(records: I) -> BTreeMap<String, usize>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(record.project_id().to_string()).or_insert(0) += 1;
    }
    counts
}

/// Projects by count descending, ties by identifier ascending.
pub fn candidate_order(counts: &BTreeMap<String, usize>) -> Vec<String> {
    let mut entries: Vec<(&String, &usize)> = counts.iter().collect();
    entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    entries.into_iter().map(|(p, _)| p.clone()).collect()
}

/// Merge `candidate` into `current` while moving as few lanes as possible.
///
/// For each of the first `top_n` slots the current project stays if it is in
/// the candidate's top `top_n`; empty slots take the next unused candidates in
/// order. Everything not placed follows in its previous relative order.
pub fn position_preserving_merge(current: &[String], candidate: &[String], top_n: usize) -> Vec<String> {
    let top_n = top_n.min(candidate.len());
    let candidate_top: HashSet<&str> = candidate[..top_n].iter().map(String::as_str).collect();

    let mut slots: Vec<Option<&str>> = vec![None; top_n];
    let mut used: HashSet<&str> = HashSet::new();

    for (slot, prev) in slots.iter_mut().zip(current.iter()) {
        if candidate_top.contains(prev.as_str()) {
            *slot = Some(prev.as_str());
            used.insert(prev.as_str());
        }
    }

    let mut next = candidate.iter().map(String::as_str);
    for slot in slots.iter_mut().filter(|s| s.is_none()) {
        if let Some(project) = next.by_ref().find(|p| !used.contains(p)) {
            *slot = Some(project);
            used.insert(project);
        }
    }

    let mut merged: Vec<String> = slots.into_iter().flatten().map(String::from).collect();
    merged.extend(current.iter().filter(|p| !used.contains(p.as_str())).cloned());
    merged
}

impl ProjectOrder {
    pub fn new(projects: Vec<String>) -> Self {
        let mut order = Self::default();
        order.ensure_all(projects);
        order
    }

    /// All projects of `records` by total count (the initial lane order).
    pub fn by_total_count<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a Record>,
    {
        Self::new(candidate_order(&count_by_project(records)))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.projects
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    pub fn sort_mode(&self) -> SortMode {
        self.sort_mode
    }

    /// Append any projects not yet present, keeping each id exactly once.
    pub fn ensure_all<I>(&mut self, projects: I)
    where
        I: IntoIterator<Item = String>,
    {
        for project in projects {
            if !self.projects.contains(&project) {
                self.projects.push(project);
            }
        }
    }

    /// Projects that get a lane: an optional single-project filter, then the first `max`.
    pub fn visible(&self, filter: Option<&str>, max: usize) -> Vec<&str> {
        self.projects
            .iter()
            .map(String::as_str)
            .filter(|p| filter.map_or(true, |f| f == *p))
            .take(max)
            .collect()
    }

    /// Manual reorder: toggle count/alphabetical over the projects visible in
    /// `window`; the rest follow in previous order.
    pub fn toggle_manual_sort<'a, I>(&mut self, records: I, window: TimeWindow) -> SortMode
    where
        I: IntoIterator<Item = &'a Record>,
    {
        let counts = count_by_project(records.into_iter().filter(|r| window.contains(r.timestamp)));
        self.sort_mode = self.sort_mode.toggled();
        let sorted: Vec<String> = match self.sort_mode {
            SortMode::Count => candidate_order(&counts),
            // BTreeMap keys are already ascending
            SortMode::Alphabetical => counts.keys().cloned().collect(),
        };
        let rest: Vec<String> = self
            .projects
            .iter()
            .filter(|p| !counts.contains_key(p.as_str()))
            .cloned()
            .collect();
        self.projects = sorted;
        self.ensure_all(rest);
        self.sort_mode
    }

    /// Apply the smart rerank for `candidate` if its prefix differs from the
    /// current order. Returns true when the order changed.
    pub fn smart_rerank(&mut self, candidate: &[String], max_visible: usize) -> bool {
        let n = candidate.len();
        if n == 0 || (self.projects.len() >= n && self.projects[..n] == *candidate) {
            return false;
        }
        let merged = position_preserving_merge(&self.projects, candidate, max_visible);
        // Candidate may name projects missing from the current order
        let mut next = ProjectOrder {
            projects: Vec::with_capacity(merged.len()),
            sort_mode: self.sort_mode,
        };
        next.ensure_all(merged);
        next.ensure_all(candidate.iter().cloned());
        if next.projects == self.projects {
            return false;
        }
        tracing::debug!(
            "Auto-rerank: {:?} -> {:?}",
            &self.projects[..self.projects.len().min(max_visible)],
            &next.projects[..next.projects.len().min(max_visible)]
        );
        self.projects = next.projects;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn rec(id: i64, ts: i64, project: &str) -> Record {
        Record {
            id,
            timestamp: ts,
            display: String::new(),
            project: Some(project.to_string()),
            rating: None,
            note: None,
        }
    }

    #[test]
    fn merge_preserves_surviving_slots() {
        let merged = position_preserving_merge(
            &names(&["A", "B", "C", "D"]),
            &names(&["B", "E", "A", "F"]),
            4,
        );
        assert_eq!(merged, names(&["A", "B", "E", "F", "C", "D"]));
    }

    #[test]
    fn merge_fills_holes_in_candidate_order() {
        let merged = position_preserving_merge(&names(&["A", "B", "C"]), &names(&["C", "X", "Y"]), 3);
        assert_eq!(merged, names(&["X", "Y", "C", "A", "B"]));
    }

    #[test]
    fn merge_respects_top_n_limit() {
        let merged = position_preserving_merge(&names(&["A", "B", "C"]), &names(&["C", "B", "A"]), 1);
        // Only slot 0 is considered; C is candidate top-1
        assert_eq!(merged, names(&["C", "A", "B"]));
    }

    #[test]
    fn initial_order_is_count_then_name() {
        let records = vec![rec(1, 0, "b"), rec(2, 0, "a"), rec(3, 0, "c"), rec(4, 0, "c")];
        let order = ProjectOrder::by_total_count(&records);
        assert_eq!(order.as_slice(), &names(&["c", "a", "b"])[..]);
    }

    #[test]
    fn smart_rerank_is_noop_when_prefix_matches() {
        let mut order = ProjectOrder::new(names(&["a", "b", "c"]));
        assert!(!order.smart_rerank(&names(&["a", "b"]), 999));
        assert_eq!(order.as_slice(), &names(&["a", "b", "c"])[..]);
    }

    #[test]
    fn smart_rerank_swaps_when_only_second_lane_visible() {
        let mut order = ProjectOrder::new(names(&["a", "b"]));
        assert!(order.smart_rerank(&names(&["b"]), 999));
        assert_eq!(order.as_slice(), &names(&["b", "a"])[..]);
    }

    #[test]
    fn manual_sort_toggles_between_count_and_alpha() {
        let records = vec![
            rec(1, 10, "zeta"),
            rec(2, 11, "zeta"),
            rec(3, 12, "alpha"),
            rec(4, 500, "hidden"),
        ];
        let mut order = ProjectOrder::new(names(&["hidden", "zeta", "alpha"]));
        let window = TimeWindow::new(0.0, 100.0);

        assert_eq!(order.toggle_manual_sort(&records, window), SortMode::Alphabetical);
        assert_eq!(order.as_slice(), &names(&["alpha", "zeta", "hidden"])[..]);

        assert_eq!(order.toggle_manual_sort(&records, window), SortMode::Count);
        assert_eq!(order.as_slice(), &names(&["zeta", "alpha", "hidden"])[..]);
    }

    #[test]
    fn visible_applies_filter_and_limit() {
        let order = ProjectOrder::new(names(&["a", "b", "c"]));
        assert_eq!(order.visible(None, 2), vec!["a", "b"]);
        assert_eq!(order.visible(Some("c"), 2), vec!["c"]);
        assert!(order.visible(Some("zzz"), 2).is_empty());
    }

    #[test]
    fn ensure_all_never_duplicates() {
        let mut order = ProjectOrder::new(names(&["a", "a", "b"]));
        order.ensure_all(names(&["b", "c"]));
        assert_eq!(order.as_slice(), &names(&["a", "b", "c"])[..]);
    }
}
