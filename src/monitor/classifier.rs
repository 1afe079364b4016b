use crate::db::enums::SiteStatus;

use super::outcome::ProbeOutcome;

/// Maps one probe outcome to a site status.
///
/// Order matters: failures and a zero status code are checked first, then
/// server errors (treated as transient), then client errors.
pub fn classify(outcome: &ProbeOutcome) -> SiteStatus {
    match outcome {
        ProbeOutcome::Failure { .. } => SiteStatus::Inactive,
        ProbeOutcome::Reachable { .. } => SiteStatus::Active,
        ProbeOutcome::Response { status_code, .. } => match *status_code {
            0 => SiteStatus::Inactive,
            code if code >= 500 => SiteStatus::Maintenance,
            code if code >= 400 => SiteStatus::Inactive,
            _ => SiteStatus::Active,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status_code: u16) -> ProbeOutcome {
        ProbeOutcome::Response {
            status_code,
            latency_ms: 10,
        }
    }

    #[test]
    fn failures_and_zero_status_are_inactive() {
        assert_eq!(classify(&ProbeOutcome::failure(5, "dns error")), SiteStatus::Inactive);
        assert_eq!(classify(&response(0)), SiteStatus::Inactive);
    }

    #[test]
    fn server_errors_are_maintenance() {
        for code in 500..=599 {
            assert_eq!(classify(&response(code)), SiteStatus::Maintenance, "code {code}");
        }
    }

    #[test]
    fn client_errors_are_inactive() {
        for code in 400..=499 {
            assert_eq!(classify(&response(code)), SiteStatus::Inactive, "code {code}");
        }
    }

    #[test]
    fn success_and_redirects_are_active() {
        for code in 200..=399 {
            assert_eq!(classify(&response(code)), SiteStatus::Active, "code {code}");
        }
        assert_eq!(classify(&ProbeOutcome::Reachable { latency_ms: 3 }), SiteStatus::Active);
    }

    #[test]
    fn classification_is_stable() {
        let outcome = response(503);
        assert_eq!(classify(&outcome), classify(&outcome));
    }
}
