use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The fixed, enumerable set of selector axes a fragment may be scoped by.
///
/// The workflow itself is not an axis: every fragment and every context names a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SelectorAxis {
    WorkflowVersion,
    Project,
    SeqType,
    ReferenceGenome,
    LibraryPreparationKit,
    Species,
}

impl SelectorAxis {
    pub const ALL: [SelectorAxis; 6] = [
        Self::WorkflowVersion,
        Self::Project,
        Self::SeqType,
        Self::ReferenceGenome,
        Self::LibraryPreparationKit,
        Self::Species,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WorkflowVersion => "workflow_version",
            Self::Project => "project",
            Self::SeqType => "seq_type",
            Self::ReferenceGenome => "reference_genome",
            Self::LibraryPreparationKit => "library_preparation_kit",
            Self::Species => "species",
        }
    }
}

impl fmt::Display for SelectorAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Axis values keyed by axis; ordered so that equal tuples hash and compare equal.
pub type AxisValues = BTreeMap<SelectorAxis, String>;

/// The concrete context a workflow is requested for.
///
/// Only `workflow` and `axes` take part in configuration selection. Sample identifiers
/// and the display name are carried through to the run for the operator views.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunContext {
    pub workflow: String,
    #[serde(default)]
    pub axes: AxisValues,
    #[serde(default)]
    pub sample_ids: Vec<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl RunContext {
    pub fn new(workflow: impl Into<String>) -> Self {
        Self {
            workflow: workflow.into(),
            ..Default::default()
        }
    }

    pub fn with_axis(mut self, axis: SelectorAxis, value: impl Into<String>) -> Self {
        self.axes.insert(axis, value.into());
        self
    }

    pub fn with_project(self, project: impl Into<String>) -> Self {
        self.with_axis(SelectorAxis::Project, project)
    }

    pub fn with_seq_type(self, seq_type: impl Into<String>) -> Self {
        self.with_axis(SelectorAxis::SeqType, seq_type)
    }

    pub fn with_reference_genome(self, reference_genome: impl Into<String>) -> Self {
        self.with_axis(SelectorAxis::ReferenceGenome, reference_genome)
    }

    pub fn with_workflow_version(self, version: impl Into<String>) -> Self {
        self.with_axis(SelectorAxis::WorkflowVersion, version)
    }

    pub fn with_sample(mut self, sample_id: impl Into<String>) -> Self {
        self.sample_ids.push(sample_id.into());
        self
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn axis(&self, axis: SelectorAxis) -> Option<&str> {
        self.axes.get(&axis).map(String::as_str)
    }

    /// The part of the context that determines configuration selection
    pub fn selection_key(&self) -> SelectionKey {
        SelectionKey {
            workflow: self.workflow.clone(),
            axes: self.axes.clone(),
        }
    }
}

impl fmt::Display for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "workflow={}", self.workflow)?;
        for (axis, value) in &self.axes {
            write!(f, ", {axis}={value}")?;
        }
        Ok(())
    }
}

/// Hashable selection-relevant projection of a [`RunContext`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelectionKey {
    pub workflow: String,
    pub axes: AxisValues,
}
