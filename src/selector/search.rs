//! Selector search for the configuration admin screen.
//!
//! A query selects values per attribute. A fragment matches *exactly* when it is set
//! on precisely the queried attributes and each of its values was selected; it is
//! *related* when at least one of its values was selected.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::models::{FragmentCategory, SelectorAxis, SelectorFragment};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchingType {
    /// Matching all attributes
    Exact,
    /// Matching any of the given attributes
    Related,
}

/// Selected values per attribute; an empty set leaves the attribute out of the query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorQuery {
    #[serde(default)]
    pub workflows: BTreeSet<String>,
    #[serde(default)]
    pub axes: BTreeMap<SelectorAxis, BTreeSet<String>>,
    /// Restricts hits to these categories when non-empty
    #[serde(default)]
    pub categories: BTreeSet<FragmentCategory>,
}

impl SelectorQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workflow(mut self, workflow: impl Into<String>) -> Self {
        self.workflows.insert(workflow.into());
        self
    }

    pub fn with_axis(mut self, axis: SelectorAxis, value: impl Into<String>) -> Self {
        self.axes.entry(axis).or_default().insert(value.into());
        self
    }

    pub fn with_category(mut self, category: FragmentCategory) -> Self {
        self.categories.insert(category);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty() && self.axes.values().all(BTreeSet::is_empty)
    }

    fn selected(&self, axis: SelectorAxis) -> Option<&BTreeSet<String>> {
        self.axes.get(&axis).filter(|values| !values.is_empty())
    }
}

/// A fragment found by a search together with how it matched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub fragment: SelectorFragment,
    pub matching_type: MatchingType,
}

/// Classify a fragment against a query; `None` when it does not match at all
pub fn classify(fragment: &SelectorFragment, query: &SelectorQuery) -> Option<MatchingType> {
    if query.is_empty() {
        return None;
    }
    if !query.categories.is_empty() && !query.categories.contains(&fragment.category) {
        return None;
    }

    let workflow_selected = query.workflows.contains(&fragment.workflow);
    let axis_hits = fragment
        .axes
        .iter()
        .filter(|(axis, value)| {
            query
                .selected(**axis)
                .is_some_and(|values| values.contains(*value))
        })
        .count();

    let queried_axes = SelectorAxis::ALL
        .iter()
        .filter(|axis| query.selected(**axis).is_some())
        .count();

    let exact = (query.workflows.is_empty() || workflow_selected)
        && axis_hits == fragment.axes.len()
        && axis_hits == queried_axes;

    if exact {
        Some(MatchingType::Exact)
    } else if workflow_selected || axis_hits > 0 {
        Some(MatchingType::Related)
    } else {
        None
    }
}

/// Search the given fragments. Exact hits come first, each group ordered by id.
pub fn search<'a>(
    fragments: impl IntoIterator<Item = &'a SelectorFragment>,
    query: &SelectorQuery,
    matching: MatchingType,
) -> Vec<SearchHit> {
    let mut hits: Vec<SearchHit> = fragments
        .into_iter()
        .filter_map(|fragment| {
            let matching_type = classify(fragment, query)?;
            (matching == MatchingType::Related || matching_type == MatchingType::Exact).then(
                || SearchHit {
                    fragment: fragment.clone(),
                    matching_type,
                },
            )
        })
        .collect();

    hits.sort_by_key(|hit| (hit.matching_type, hit.fragment.id));
    hits
}
