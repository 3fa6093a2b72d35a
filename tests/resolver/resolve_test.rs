use serde_json::json;

use workflow_core::models::{FragmentCategory, RunContext, SelectorAxis};
use workflow_core::resolver::ResolverError;

use crate::common::{add_fragment, core, CELL_RANGER, WGS};

#[test]
fn test_project_fragment_overrides_workflow_defaults() {
    let core = core();
    let defaults = add_fragment(
        &core,
        CELL_RANGER,
        FragmentCategory::DefaultValues,
        &[],
        json!({"cellranger": {"expectedCells": 3000, "enforceCells": false}}),
    );
    let project = add_fragment(
        &core,
        CELL_RANGER,
        FragmentCategory::Generic,
        &[(SelectorAxis::Project, "P1")],
        json!({"cellranger": {"expectedCells": 5000}}),
    );

    let resolved = core
        .resolver
        .resolve(&RunContext::new(CELL_RANGER).with_project("P1"))
        .unwrap();
    assert_eq!(
        resolved.config_value,
        json!({"cellranger": {"expectedCells": 5000, "enforceCells": false}})
    );
    assert_eq!(resolved.provenance, vec![defaults, project]);
    assert_eq!(resolved.value_at("cellranger.expectedCells"), Some(&json!(5000)));

    let other_project = core
        .resolver
        .resolve(&RunContext::new(CELL_RANGER).with_project("P2"))
        .unwrap();
    assert_eq!(
        other_project.value_at("cellranger.expectedCells"),
        Some(&json!(3000))
    );
    assert_eq!(other_project.provenance, vec![defaults]);
}

#[test]
fn test_more_specific_fragment_wins_regardless_of_insertion_order() {
    let core = core();
    let specific = add_fragment(
        &core,
        WGS,
        FragmentCategory::Generic,
        &[(SelectorAxis::Project, "P1"), (SelectorAxis::SeqType, "WGS")],
        json!({"adapterTrimming": true}),
    );
    let general = add_fragment(
        &core,
        WGS,
        FragmentCategory::DefaultValues,
        &[],
        json!({"adapterTrimming": false, "threads": 8}),
    );

    let resolved = core
        .resolver
        .resolve(&RunContext::new(WGS).with_project("P1").with_seq_type("WGS"))
        .unwrap();

    assert_eq!(resolved.config_value, json!({"adapterTrimming": true, "threads": 8}));
    assert_eq!(resolved.provenance, vec![general, specific]);
}

#[test]
fn test_no_core_fragment_is_no_configuration_found() {
    let core = core();
    add_fragment(
        &core,
        CELL_RANGER,
        FragmentCategory::BedFile,
        &[],
        json!({"bedFile": "targets.bed"}),
    );

    let err = core
        .resolver
        .resolve(&RunContext::new(CELL_RANGER))
        .unwrap_err();
    assert!(matches!(err, ResolverError::NoConfigurationFound { .. }));
}

#[test]
fn test_non_core_categories_resolve_into_related_selectors() {
    let core = core();
    add_fragment(&core, WGS, FragmentCategory::DefaultValues, &[], json!({"threads": 4}));
    let bed = add_fragment(
        &core,
        WGS,
        FragmentCategory::BedFile,
        &[(SelectorAxis::ReferenceGenome, "hg38")],
        json!({"bedFile": "hg38.bed"}),
    );

    let resolved = core
        .resolver
        .resolve(&RunContext::new(WGS).with_reference_genome("hg38"))
        .unwrap();

    assert_eq!(resolved.config_value, json!({"threads": 4}));
    let related = resolved.related(FragmentCategory::BedFile).unwrap();
    assert_eq!(related.value, json!({"bedFile": "hg38.bed"}));
    assert_eq!(related.provenance, vec![bed]);
    assert!(resolved.related(FragmentCategory::AdapterFile).is_none());
}

#[test]
fn test_store_writes_are_visible_to_the_next_resolution() {
    let core = core();
    let defaults = add_fragment(&core, WGS, FragmentCategory::DefaultValues, &[], json!({"threads": 4}));
    let context = RunContext::new(WGS).with_project("P1");

    let before = core.resolver.resolve(&context).unwrap();
    assert_eq!(core.resolver.resolve(&context).unwrap(), before);
    assert_eq!(core.resolver.cached_entries(), 1);

    core.selector_store.update_fragment(defaults, json!({"threads": 16})).unwrap();

    let after = core.resolver.resolve(&context).unwrap();
    assert_eq!(after.value_at("threads"), Some(&json!(16)));
    assert_ne!(after.provenance, before.provenance);
}
