use serde_json::json;

/// Status text stored for a successful reachability probe.
pub const REACHABLE_STATUS: &str = "reachable";

/// Result of a single probe execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// An HTTP response was received, whatever its status.
    Response { status_code: u16, latency_ms: u64 },
    /// The host answered a reachability probe.
    Reachable { latency_ms: u64 },
    /// Transport-level failure: DNS, connect, TLS or timeout.
    Failure { latency_ms: u64, reason: String },
}

impl ProbeOutcome {
    pub fn failure(latency_ms: u64, reason: impl Into<String>) -> Self {
        ProbeOutcome::Failure {
            latency_ms,
            reason: reason.into(),
        }
    }

    pub fn latency_ms(&self) -> u64 {
        match self {
            ProbeOutcome::Response { latency_ms, .. }
            | ProbeOutcome::Reachable { latency_ms }
            | ProbeOutcome::Failure { latency_ms, .. } => *latency_ms,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            ProbeOutcome::Response { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ProbeOutcome::Failure { reason, .. } => Some(reason),
            _ => None,
        }
    }

    /// Value stored in `status` columns: the status code, or the failure reason.
    pub fn status_text(&self) -> String {
        match self {
            ProbeOutcome::Response { status_code, .. } => status_code.to_string(),
            ProbeOutcome::Reachable { .. } => REACHABLE_STATUS.to_string(),
            ProbeOutcome::Failure { reason, .. } => reason.clone(),
        }
    }

    /// Value stored in `response_text` columns.
    pub fn response_text(&self) -> String {
        match self {
            ProbeOutcome::Response { status_code, .. } => json!({ "status": status_code }).to_string(),
            ProbeOutcome::Reachable { latency_ms } => {
                json!({ "reachable": true, "latencyMs": latency_ms }).to_string()
            }
            ProbeOutcome::Failure { reason, .. } => reason.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_records_code_and_json_body() {
        let outcome = ProbeOutcome::Response {
            status_code: 200,
            latency_ms: 50,
        };
        assert_eq!(outcome.status_text(), "200");
        assert_eq!(outcome.response_text(), r#"{"status":200}"#);
        assert_eq!(outcome.error(), None);
        assert_eq!(outcome.latency_ms(), 50);
    }

    #[test]
    fn failure_records_reason_in_both_columns() {
        let outcome = ProbeOutcome::failure(12, "ECONNREFUSED");
        assert_eq!(outcome.status_text(), "ECONNREFUSED");
        assert_eq!(outcome.response_text(), "ECONNREFUSED");
        assert_eq!(outcome.status_code(), None);
        assert_eq!(outcome.error(), Some("ECONNREFUSED"));
    }

    #[test]
    fn reachable_reports_latency() {
        let outcome = ProbeOutcome::Reachable { latency_ms: 7 };
        assert_eq!(outcome.status_text(), "reachable");
        let body: serde_json::Value = serde_json::from_str(&outcome.response_text()).unwrap();
        assert_eq!(body["reachable"], true);
        assert_eq!(body["latencyMs"], 7);
    }
}
