use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a single probe ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProbeOutcome {
    /// The server answered with HTTP 200
    Live { status: u16 },
    /// The server answered, but not with HTTP 200
    Rejected { status: u16 },
    /// No HTTP response at all (timeout, refused, DNS, TLS)
    Unreachable { reason: String },
}

impl ProbeOutcome {
    pub fn from_status(status: u16) -> Self {
        if status == 200 {
            ProbeOutcome::Live { status }
        } else {
            ProbeOutcome::Rejected { status }
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, ProbeOutcome::Live { .. })
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            ProbeOutcome::Live { status } | ProbeOutcome::Rejected { status } => Some(*status),
            ProbeOutcome::Unreachable { .. } => None,
        }
    }

    /// Short human label, used in console output and the status page.
    pub fn label(&self) -> String {
        match self {
            ProbeOutcome::Live { status } => format!("HTTP {}", status),
            ProbeOutcome::Rejected { status } => format!("HTTP {}", status),
            ProbeOutcome::Unreachable { reason } => reason.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    /// Position of the candidate in discovery order
    pub index: usize,
    pub url: String,
    pub outcome: ProbeOutcome,
    pub response_time: Duration,
}

impl ProbeResult {
    pub fn new(index: usize, url: String, outcome: ProbeOutcome, response_time: Duration) -> Self {
        Self {
            index,
            url,
            outcome,
            response_time,
        }
    }

    pub fn unreachable(index: usize, url: String, reason: String) -> Self {
        Self {
            index,
            url,
            outcome: ProbeOutcome::Unreachable { reason },
            response_time: Duration::from_secs(0),
        }
    }

    pub fn is_live(&self) -> bool {
        self.outcome.is_live()
    }
}
