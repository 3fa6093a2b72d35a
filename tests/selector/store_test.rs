use serde_json::json;

use workflow_core::constants::events;
use workflow_core::models::{FragmentCategory, NewSelectorFragment, RunContext, SelectorAxis};
use workflow_core::selector::{MatchingType, SelectorError, SelectorQuery};

use crate::common::{add_fragment, core, CELL_RANGER, WGS};

#[test]
fn test_identical_axes_replacement_leaves_one_live_fragment() {
    let core = core();
    let first = add_fragment(
        &core,
        CELL_RANGER,
        FragmentCategory::Generic,
        &[(SelectorAxis::Project, "P1")],
        json!({"expectedCells": 3000}),
    );
    let second = add_fragment(
        &core,
        CELL_RANGER,
        FragmentCategory::Generic,
        &[(SelectorAxis::Project, "P1")],
        json!({"expectedCells": 5000}),
    );

    let matching = core
        .selector_store
        .fragments_matching(&RunContext::new(CELL_RANGER).with_project("P1"));
    let ids: Vec<_> = matching.iter().map(|fragment| fragment.id).collect();
    assert_eq!(ids, vec![second]);

    let predecessor = core.selector_store.get(first).unwrap();
    assert!(!predecessor.is_live());
    assert_eq!(predecessor.replaced_by, Some(second));
    assert_eq!(core.selector_store.history(&predecessor.key()).len(), 2);
}

#[test]
fn test_same_axes_in_other_category_coexist() {
    let core = core();
    add_fragment(&core, CELL_RANGER, FragmentCategory::Generic, &[], json!({"a": 1}));
    add_fragment(&core, CELL_RANGER, FragmentCategory::BedFile, &[], json!({"bed": "x.bed"}));

    assert_eq!(core.selector_store.live_count(), 2);
}

#[test]
fn test_stale_predecessor_yields_conflict_warning_not_error() {
    let core = core();
    let original = add_fragment(&core, CELL_RANGER, FragmentCategory::Generic, &[], json!({"v": 1}));
    let concurrent = core
        .selector_store
        .update_fragment(original, json!({"v": 2}))
        .unwrap();
    assert!(concurrent.conflict.is_none());

    let name = core.selector_store.get(original).unwrap().name;
    let late = core
        .selector_store
        .add_fragment(
            NewSelectorFragment::new(name, FragmentCategory::Generic, CELL_RANGER, json!({"v": 3}))
                .replacing(original),
        )
        .unwrap();

    let conflict = late.conflict.expect("conflict warning");
    assert_eq!(conflict.expected, original);
    assert_eq!(conflict.displaced, Some(concurrent.fragment.id));
    assert_eq!(late.replaced, Some(concurrent.fragment.id));
}

#[test]
fn test_live_names_are_unique_across_axes() {
    let core = core();
    core.selector_store
        .add_fragment(
            NewSelectorFragment::new("shared", FragmentCategory::Generic, CELL_RANGER, json!({}))
                .with_axis(SelectorAxis::Project, "P1"),
        )
        .unwrap();

    let err = core
        .selector_store
        .add_fragment(
            NewSelectorFragment::new("shared", FragmentCategory::Generic, CELL_RANGER, json!({}))
                .with_axis(SelectorAxis::Project, "P2"),
        )
        .unwrap_err();

    assert!(matches!(err, SelectorError::DuplicateName { .. }));
}

#[test]
fn test_default_values_can_only_be_replaced_unless_forced() {
    let core = core();
    let defaults = add_fragment(&core, WGS, FragmentCategory::DefaultValues, &[], json!({"threads": 4}));

    assert_eq!(
        core.selector_store.invalidate(defaults).unwrap_err(),
        SelectorError::DefaultValuesRequireReplacement(defaults)
    );

    let invalidated = core.selector_store.force_invalidate(defaults).unwrap();
    assert!(!invalidated.is_live());
    assert_eq!(
        core.selector_store.invalidate(defaults).unwrap_err(),
        SelectorError::AlreadyObsolete(defaults)
    );
}

#[test]
fn test_search_returns_exact_hits_before_related() {
    let core = core();
    let exact = add_fragment(
        &core,
        CELL_RANGER,
        FragmentCategory::Generic,
        &[(SelectorAxis::Project, "P1")],
        json!({}),
    );
    let same_workflow = add_fragment(
        &core,
        CELL_RANGER,
        FragmentCategory::Generic,
        &[(SelectorAxis::Project, "P2")],
        json!({}),
    );
    let same_project = add_fragment(
        &core,
        WGS,
        FragmentCategory::Generic,
        &[(SelectorAxis::Project, "P1")],
        json!({}),
    );

    let query = SelectorQuery::new()
        .with_workflow(CELL_RANGER)
        .with_axis(SelectorAxis::Project, "P1");

    let exact_hits = core.selector_store.search(&query, MatchingType::Exact);
    assert_eq!(exact_hits.len(), 1);
    assert_eq!(exact_hits[0].fragment.id, exact);

    let related: Vec<_> = core
        .selector_store
        .search(&query, MatchingType::Related)
        .into_iter()
        .map(|hit| (hit.fragment.id, hit.matching_type))
        .collect();
    assert_eq!(
        related,
        vec![
            (exact, MatchingType::Exact),
            (same_workflow, MatchingType::Related),
            (same_project, MatchingType::Related),
        ]
    );
}

#[tokio::test]
async fn test_writes_publish_selector_events() {
    let core = core();
    let mut receiver = core.event_publisher.subscribe();

    let id = add_fragment(&core, CELL_RANGER, FragmentCategory::Generic, &[], json!({"a": 1}));
    core.selector_store.invalidate(id).unwrap();

    assert_eq!(receiver.recv().await.unwrap().name, events::SELECTOR_ADDED);
    let invalidated = receiver.recv().await.unwrap();
    assert_eq!(invalidated.name, events::SELECTOR_INVALIDATED);
    assert_eq!(invalidated.context["fragment_id"], json!(id));
}
