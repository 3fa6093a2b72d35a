use serde::{Deserialize, Serialize};
use std::fmt;

/// Workflow run state definitions.
///
/// The string forms are stable identifiers consumed by the operator UI for
/// status coloring; never rename them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    /// Run exists, steps are created, nothing was scheduled yet
    Created,
    /// Waiting for a step to be dispatched
    Pending,
    /// At least one step holds an external job
    Running,
    /// Results of a step are being validated
    Checking,
    /// An operator decision is required
    WaitingForUser,
    /// All steps succeeded or were omitted
    Success,
    /// No step can make further progress and at least one failed
    Failed,
    /// Operator gave up on the run
    FailedFinal,
    /// Run was cancelled
    Killed,
    /// Run was replaced by a restarted run
    Restarted,
    /// No configuration was available; no step was executed
    OmittedMissingPrecondition,
}

impl RunState {
    pub const ALL: [RunState; 11] = [
        Self::Created,
        Self::Pending,
        Self::Running,
        Self::Checking,
        Self::WaitingForUser,
        Self::Success,
        Self::Failed,
        Self::FailedFinal,
        Self::Killed,
        Self::Restarted,
        Self::OmittedMissingPrecondition,
    ];

    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Success
                | Self::FailedFinal
                | Self::Killed
                | Self::Restarted
                | Self::OmittedMissingPrecondition
        )
    }

    /// Final states carry the run's `final` flag
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Success | Self::FailedFinal)
    }

    /// Check if this is an active state (a step is being processed)
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running | Self::Checking)
    }

    /// Allowed edges of the run state graph
    pub fn can_transition_to(&self, target: RunState) -> bool {
        use RunState::*;

        match self {
            Created => matches!(target, Pending | OmittedMissingPrecondition | Killed),
            Pending | Running | Checking | WaitingForUser => matches!(
                target,
                Pending | Running | Checking | WaitingForUser | Success | Failed | Killed
            ) && target != *self,
            Failed => matches!(target, Pending | FailedFinal | Restarted | Killed),
            Success | FailedFinal | Killed | Restarted | OmittedMissingPrecondition => false,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "CREATED"),
            Self::Pending => write!(f, "PENDING"),
            Self::Running => write!(f, "RUNNING"),
            Self::Checking => write!(f, "CHECKING"),
            Self::WaitingForUser => write!(f, "WAITING_FOR_USER"),
            Self::Success => write!(f, "SUCCESS"),
            Self::Failed => write!(f, "FAILED"),
            Self::FailedFinal => write!(f, "FAILED_FINAL"),
            Self::Killed => write!(f, "KILLED"),
            Self::Restarted => write!(f, "RESTARTED"),
            Self::OmittedMissingPrecondition => write!(f, "OMITTED_MISSING_PRECONDITION"),
        }
    }
}

impl std::str::FromStr for RunState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.to_string() == s)
            .ok_or_else(|| format!("Invalid workflow run state: {s}"))
    }
}

/// Workflow step state definitions, including the external-call variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepState {
    Created,
    Pending,
    /// Executed by the core itself or through a cluster job it submitted
    RunningOtp,
    /// Executed by an external workflow execution service
    RunningWes,
    Checking,
    WaitingForUser,
    Success,
    Failed,
    Omitted,
    OmittedMissingPrecondition,
    /// Replaced by a successor step instance
    Restarted,
    Killed,
}

impl StepState {
    pub const ALL: [StepState; 12] = [
        Self::Created,
        Self::Pending,
        Self::RunningOtp,
        Self::RunningWes,
        Self::Checking,
        Self::WaitingForUser,
        Self::Success,
        Self::Failed,
        Self::Omitted,
        Self::OmittedMissingPrecondition,
        Self::Restarted,
        Self::Killed,
    ];

    /// Check if this is a terminal state (left only by restart)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Success
                | Self::Failed
                | Self::Omitted
                | Self::OmittedMissingPrecondition
                | Self::Restarted
                | Self::Killed
        )
    }

    /// Check if this is an active state (an external job is held)
    pub fn is_active(&self) -> bool {
        matches!(self, Self::RunningOtp | Self::RunningWes)
    }

    /// Check if this step satisfies the input of the following step
    pub fn satisfies_dependencies(&self) -> bool {
        matches!(self, Self::Success | Self::Omitted)
    }

    /// Terminal states from which an operator restart is allowed
    pub fn is_restartable(&self) -> bool {
        matches!(
            self,
            Self::Failed | Self::Killed | Self::OmittedMissingPrecondition
        )
    }
}

impl fmt::Display for StepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "CREATED"),
            Self::Pending => write!(f, "PENDING"),
            Self::RunningOtp => write!(f, "RUNNING_OTP"),
            Self::RunningWes => write!(f, "RUNNING_WES"),
            Self::Checking => write!(f, "CHECKING"),
            Self::WaitingForUser => write!(f, "WAITING_FOR_USER"),
            Self::Success => write!(f, "SUCCESS"),
            Self::Failed => write!(f, "FAILED"),
            Self::Omitted => write!(f, "OMITTED"),
            Self::OmittedMissingPrecondition => write!(f, "OMITTED_MISSING_PRECONDITION"),
            Self::Restarted => write!(f, "RESTARTED"),
            Self::Killed => write!(f, "KILLED"),
        }
    }
}

impl std::str::FromStr for StepState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.to_string() == s)
            .ok_or_else(|| format!("Invalid workflow step state: {s}"))
    }
}

/// Default state for new runs
impl Default for RunState {
    fn default() -> Self {
        Self::Created
    }
}

/// Default state for new steps
impl Default for StepState {
    fn default() -> Self {
        Self::Created
    }
}
