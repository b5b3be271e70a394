/// Query state definitions for the orchestrator loop
use std::fmt;

/// Represents where a query is in its lifecycle
///
/// `Running` only ever exists in memory. Only the terminal states are ever
/// recorded in the progress file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryState {
    /// Not yet started in this run
    Pending,

    /// Pages are being extracted and assets downloaded
    Running,

    /// Result persisted and recorded as completed
    Done,

    /// Query-level failure recorded in the failed log
    Failed,
}

impl QueryState {
    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns true if moving from this state to `next` is allowed
    ///
    /// Pending -> Running -> {Done, Failed}. An interrupted Running query is
    /// simply dropped; it never goes back to Pending within the same run.
    pub fn can_transition_to(&self, next: QueryState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Running, Self::Done)
                | (Self::Running, Self::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
