//! Proptest strategies for selector fragments and run contexts

use proptest::prelude::*;
use serde_json::{json, Map, Value};

use workflow_core::models::{AxisValues, SelectorAxis};

/// Axis subsets drawn from a small value space so fragments overlap often
pub fn axis_values_strategy() -> impl Strategy<Value = AxisValues> {
    (
        prop::option::of(prop::sample::select(vec!["P1", "P2"])),
        prop::option::of(prop::sample::select(vec!["WGS", "10x_scRNA"])),
        prop::option::of(prop::sample::select(vec!["hs37d5", "GRCh38"])),
    )
        .prop_map(|(project, seq_type, reference_genome)| {
            let mut axes = AxisValues::new();
            if let Some(project) = project {
                axes.insert(SelectorAxis::Project, project.to_string());
            }
            if let Some(seq_type) = seq_type {
                axes.insert(SelectorAxis::SeqType, seq_type.to_string());
            }
            if let Some(reference_genome) = reference_genome {
                axes.insert(SelectorAxis::ReferenceGenome, reference_genome.to_string());
            }
            axes
        })
}

/// Full contexts: every axis set, so each generated fragment may match
pub fn full_axis_values_strategy() -> impl Strategy<Value = AxisValues> {
    (
        prop::sample::select(vec!["P1", "P2"]),
        prop::sample::select(vec!["WGS", "10x_scRNA"]),
        prop::sample::select(vec!["hs37d5", "GRCh38"]),
    )
        .prop_map(|(project, seq_type, reference_genome)| {
            [
                (SelectorAxis::Project, project.to_string()),
                (SelectorAxis::SeqType, seq_type.to_string()),
                (SelectorAxis::ReferenceGenome, reference_genome.to_string()),
            ]
            .into_iter()
            .collect()
        })
}

/// Small nested JSON objects sharing key names across samples
pub fn payload_strategy() -> impl Strategy<Value = Value> {
    prop::collection::btree_map(
        prop::sample::select(vec!["threads", "memory", "tool", "options"]),
        prop_oneof![
            any::<u16>().prop_map(|n| json!(n)),
            "[a-z]{1,6}".prop_map(Value::String),
            (any::<bool>(), any::<u8>()).prop_map(|(flag, level)| json!({"flag": flag, "level": level})),
        ],
        1..4,
    )
    .prop_map(|entries| {
        Value::Object(
            entries
                .into_iter()
                .map(|(key, value)| (key.to_string(), value))
                .collect::<Map<String, Value>>(),
        )
    })
}

/// Fragment specifications in insertion order
pub fn fragment_specs_strategy() -> impl Strategy<Value = Vec<(AxisValues, Value)>> {
    prop::collection::vec((axis_values_strategy(), payload_strategy()), 1..12)
}
