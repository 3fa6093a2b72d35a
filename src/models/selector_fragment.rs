use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use super::context::{AxisValues, RunContext, SelectorAxis};
use super::FragmentId;

/// Category of a selector fragment.
///
/// Core categories feed the merged configuration of a run; the others (BED files,
/// reverse sequences, adapter files) are resolved independently as related selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FragmentCategory {
    DefaultValues,
    Generic,
    BedFile,
    ReverseSequence,
    AdapterFile,
}

impl fmt::Display for FragmentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DefaultValues => write!(f, "DEFAULT_VALUES"),
            Self::Generic => write!(f, "GENERIC"),
            Self::BedFile => write!(f, "BED_FILE"),
            Self::ReverseSequence => write!(f, "REVERSE_SEQUENCE"),
            Self::AdapterFile => write!(f, "ADAPTER_FILE"),
        }
    }
}

impl std::str::FromStr for FragmentCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEFAULT_VALUES" => Ok(Self::DefaultValues),
            "GENERIC" => Ok(Self::Generic),
            "BED_FILE" => Ok(Self::BedFile),
            "REVERSE_SEQUENCE" => Ok(Self::ReverseSequence),
            "ADAPTER_FILE" => Ok(Self::AdapterFile),
            _ => Err(format!("Invalid fragment category: {s}")),
        }
    }
}

/// Identity of a fragment slot: at most one live fragment exists per key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FragmentKey {
    pub category: FragmentCategory,
    pub workflow: String,
    pub axes: AxisValues,
}

/// One piece of configuration applicable under a selector condition.
///
/// Fragments are never mutated in place apart from the obsolete marker: a change
/// creates a new fragment that replaces the old one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectorFragment {
    pub id: FragmentId,
    pub name: String,
    pub category: FragmentCategory,
    pub workflow: String,
    pub axes: AxisValues,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
    pub obsoleted_at: Option<DateTime<Utc>>,
    pub replaced_by: Option<FragmentId>,
}

impl SelectorFragment {
    pub fn is_live(&self) -> bool {
        self.obsoleted_at.is_none()
    }

    pub fn key(&self) -> FragmentKey {
        FragmentKey {
            category: self.category,
            workflow: self.workflow.clone(),
            axes: self.axes.clone(),
        }
    }

    /// Number of non-wildcard attributes, the workflow included
    pub fn specificity(&self) -> usize {
        1 + self.axes.len()
    }

    /// Read-only priority shown to operators; higher wins
    pub fn priority(&self) -> u32 {
        self.axes
            .keys()
            .map(|axis| axis_weight(*axis))
            .sum::<u32>()
            + 1
    }

    /// Whether every declared axis is a wildcard or equals the context value
    pub fn matches(&self, context: &RunContext) -> bool {
        self.workflow == context.workflow
            && self
                .axes
                .iter()
                .all(|(axis, value)| context.axis(*axis) == Some(value.as_str()))
    }
}

/// Weight of an axis in the displayed priority. Resolution precedence uses
/// [`SelectorFragment::specificity`]; the weight only spreads equal counts apart
/// for display.
fn axis_weight(axis: SelectorAxis) -> u32 {
    match axis {
        SelectorAxis::Project => 32,
        SelectorAxis::WorkflowVersion => 16,
        SelectorAxis::SeqType => 8,
        SelectorAxis::ReferenceGenome => 4,
        SelectorAxis::LibraryPreparationKit => 2,
        SelectorAxis::Species => 2,
    }
}

/// Submission for a new fragment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSelectorFragment {
    pub name: String,
    pub category: FragmentCategory,
    pub workflow: String,
    #[serde(default)]
    pub axes: AxisValues,
    pub payload: Value,
    /// The live fragment the submitter read before writing, if any
    #[serde(default)]
    pub expected_predecessor: Option<FragmentId>,
}

impl NewSelectorFragment {
    pub fn new(
        name: impl Into<String>,
        category: FragmentCategory,
        workflow: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            workflow: workflow.into(),
            axes: AxisValues::new(),
            payload,
            expected_predecessor: None,
        }
    }

    pub fn with_axis(mut self, axis: SelectorAxis, value: impl Into<String>) -> Self {
        self.axes.insert(axis, value.into());
        self
    }

    pub fn replacing(mut self, predecessor: FragmentId) -> Self {
        self.expected_predecessor = Some(predecessor);
        self
    }

    pub fn key(&self) -> FragmentKey {
        FragmentKey {
            category: self.category,
            workflow: self.workflow.clone(),
            axes: self.axes.clone(),
        }
    }
}
