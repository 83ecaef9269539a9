//! Process exit classification

use squad_core::{AggregateReport, Snapshot, WaitResult};
use std::fmt;
use std::process::ExitCode;

/// How a command ended, as seen by scripts driving the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitClass {
    Success,
    /// A teammate reported failure
    Failure,
    Timeout,
    /// Usage, configuration or storage fault
    Error,
}

impl ExitClass {
    pub const fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
            Self::Timeout => 2,
            Self::Error => 3,
        }
    }

    /// A point-in-time snapshot only fails once a member has failed; pending members
    /// are not an error without `--wait`
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        if snapshot.any_failed() {
            Self::Failure
        } else {
            Self::Success
        }
    }

    pub fn from_report(report: &AggregateReport) -> Self {
        if report.failed > 0 {
            Self::Failure
        } else {
            Self::Success
        }
    }
}

impl From<WaitResult> for ExitClass {
    fn from(result: WaitResult) -> Self {
        match result {
            WaitResult::Success => Self::Success,
            WaitResult::Failure => Self::Failure,
            WaitResult::Timeout => Self::Timeout,
        }
    }
}

impl From<ExitClass> for ExitCode {
    fn from(class: ExitClass) -> Self {
        ExitCode::from(class.code())
    }
}

impl fmt::Display for ExitClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
            Self::Timeout => write!(f, "timeout"),
            Self::Error => write!(f, "error"),
        }
    }
}
