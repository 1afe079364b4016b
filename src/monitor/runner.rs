//! The check runner: probes checks, classifies the outcome and persists it.
//!
//! A single check failing (probe error, storage error, even a panic) never
//! stops the rest of the run; it is reported as [`Disposition::Failed`] in
//! the [`PassReport`]. Checks run with bounded concurrency, and every write to
//! a site happens under that site's lease so two runs never race on the same
//! row.

use chrono::Utc;
use dashmap::DashMap;
use futures::{FutureExt, StreamExt, stream};
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::db::entities::{check, site};
use crate::db::enums::{CheckType, SiteStatus};
use crate::db::services::{CheckRun, CheckStore, CheckWithSite, StoreError};

use super::classifier::classify;
use super::probe::{ProbeKind, Prober};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Disposition {
    Recorded {
        status: String,
        site_status: SiteStatus,
        latency_ms: u64,
    },
    Skipped {
        check_type: CheckType,
    },
    Failed {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckReport {
    pub check_id: i32,
    pub site_id: i32,
    #[serde(flatten)]
    pub disposition: Disposition,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassSummary {
    pub total: usize,
    pub recorded: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PassReport {
    /// Updated check rows of the recorded checks, in load order.
    pub results: Vec<check::Model>,
    /// One entry per processed check, in load order.
    pub checks: Vec<CheckReport>,
    pub summary: PassSummary,
}

impl PassReport {
    fn push(&mut self, report: CheckReport, updated: Option<check::Model>) {
        self.summary.total += 1;
        match report.disposition {
            Disposition::Recorded { .. } => self.summary.recorded += 1,
            Disposition::Skipped { .. } => self.summary.skipped += 1,
            Disposition::Failed { .. } => self.summary.failed += 1,
        }
        if let Some(updated) = updated {
            self.results.push(updated);
        }
        self.checks.push(report);
    }
}

pub struct CheckRunner {
    store: Arc<dyn CheckStore>,
    prober: Arc<dyn Prober>,
    max_concurrent: usize,
    site_leases: DashMap<i32, Arc<Mutex<()>>>,
}

impl CheckRunner {
    pub fn new(store: Arc<dyn CheckStore>, prober: Arc<dyn Prober>, max_concurrent: usize) -> Self {
        Self {
            store,
            prober,
            max_concurrent: max_concurrent.max(1),
            site_leases: DashMap::new(),
        }
    }

    pub async fn load_checks(&self) -> Result<Vec<CheckWithSite>, StoreError> {
        self.store.list_checks_with_site().await
    }

    /// Runs every check once. Only a failure to load the checks fails the pass.
    pub async fn run_pass(&self) -> Result<PassReport, StoreError> {
        let checks = self.load_checks().await?;
        info!(count = checks.len(), "Running checks for all sites.");
        let report = self.run_checks(checks).await;
        info!(
            total = report.summary.total,
            recorded = report.summary.recorded,
            skipped = report.summary.skipped,
            failed = report.summary.failed,
            "Check pass finished."
        );
        Ok(report)
    }

    /// Runs the given checks, at most `max_concurrent` at a time.
    pub async fn run_checks(&self, checks: Vec<CheckWithSite>) -> PassReport {
        let pending: Vec<_> = checks
            .into_iter()
            .map(|item| self.run_isolated(item))
            .collect();
        let runs: Vec<(CheckReport, Option<check::Model>)> = stream::iter(pending)
            .buffered(self.max_concurrent)
            .collect()
            .await;

        let mut report = PassReport::default();
        for (check_report, updated) in runs {
            report.push(check_report, updated);
        }
        report
    }

    async fn run_isolated(&self, item: CheckWithSite) -> (CheckReport, Option<check::Model>) {
        let check_id = item.check.id;
        let site_id = item.site.id;

        let run = AssertUnwindSafe(self.run_one(item)).catch_unwind().await;
        match run {
            Ok(run) => run,
            Err(_) => {
                error!(check_id, site_id, "Check processing panicked. Continuing with the next check.");
                self.release_site_lease(site_id);
                (
                    CheckReport {
                        check_id,
                        site_id,
                        disposition: Disposition::Failed {
                            reason: "check processing panicked".to_string(),
                        },
                    },
                    None,
                )
            }
        }
    }

    async fn run_one(&self, item: CheckWithSite) -> (CheckReport, Option<check::Model>) {
        let CheckWithSite { check, site } = item;

        let Some(kind) = ProbeKind::for_check_type(check.check_type) else {
            warn!(check_id = check.id, check_type = %check.check_type, "Unsupported check type. Skipping.");
            return (
                CheckReport {
                    check_id: check.id,
                    site_id: site.id,
                    disposition: Disposition::Skipped {
                        check_type: check.check_type,
                    },
                },
                None,
            );
        };

        let site_id = site.id;
        let lease = self.site_lease(site_id);
        let run = {
            let _guard = lease.lock().await;
            self.probe_and_record(check, site, kind).await
        };
        drop(lease);
        self.release_site_lease(site_id);
        run
    }

    /// Must be called with the site's lease held.
    async fn probe_and_record(
        &self,
        check: check::Model,
        site: site::Model,
        kind: ProbeKind,
    ) -> (CheckReport, Option<check::Model>) {
        debug!(check_id = check.id, url = %site.url, "Checking site.");
        let outcome = self.prober.probe(kind, &site.url).await;
        let site_status = classify(&outcome);
        debug!(check_id = check.id, ?outcome, %site_status, "Probe finished.");

        let run = CheckRun {
            check_id: check.id,
            site_id: site.id,
            timestamp: Utc::now(),
            status: outcome.status_text(),
            latency_ms: i64::try_from(outcome.latency_ms()).unwrap_or(i64::MAX),
            response_text: outcome.response_text(),
            site_status: site_status.clone(),
        };

        match self.store.record_run(&run).await {
            Ok(updated) => (
                CheckReport {
                    check_id: check.id,
                    site_id: site.id,
                    disposition: Disposition::Recorded {
                        status: run.status,
                        site_status,
                        latency_ms: outcome.latency_ms(),
                    },
                },
                Some(updated),
            ),
            Err(e) => {
                error!(check_id = check.id, url = %site.url, error = %e, "Error processing check. Continuing with the next check.");
                (
                    CheckReport {
                        check_id: check.id,
                        site_id: site.id,
                        disposition: Disposition::Failed {
                            reason: e.to_string(),
                        },
                    },
                    None,
                )
            }
        }
    }

    fn site_lease(&self, site_id: i32) -> Arc<Mutex<()>> {
        self.site_leases.entry(site_id).or_default().clone()
    }

    /// Drops the site's lease once no run holds or waits on it, so the map
    /// only tracks sites with work in flight.
    fn release_site_lease(&self, site_id: i32) {
        self.site_leases
            .remove_if(&site_id, |_, lease| Arc::strong_count(lease) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::outcome::ProbeOutcome;
    use async_trait::async_trait;

    struct OkProber;

    #[async_trait]
    impl Prober for OkProber {
        async fn probe(&self, _kind: ProbeKind, target: &str) -> ProbeOutcome {
            if target.contains("explode") {
                panic!("prober blew up");
            }
            ProbeOutcome::Response {
                status_code: 200,
                latency_ms: 1,
            }
        }
    }

    struct EchoStore;

    #[async_trait]
    impl CheckStore for EchoStore {
        async fn list_checks_with_site(&self) -> Result<Vec<CheckWithSite>, StoreError> {
            Ok(Vec::new())
        }

        async fn record_run(&self, run: &CheckRun) -> Result<check::Model, StoreError> {
            Ok(check_row(run.check_id, run.site_id))
        }
    }

    fn check_row(id: i32, site_id: i32) -> check::Model {
        let now = Utc::now();
        check::Model {
            id,
            site_id,
            check_type: CheckType::Http,
            interval_seconds: 60,
            status: "pending".to_string(),
            latency_ms: None,
            response_text: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn item(check_id: i32, site_id: i32, url: &str) -> CheckWithSite {
        let now = Utc::now();
        CheckWithSite {
            check: check_row(check_id, site_id),
            site: site::Model {
                id: site_id,
                user_id: 1,
                name: format!("site-{site_id}"),
                url: url.to_string(),
                description: None,
                status: SiteStatus::Active,
                created_at: now,
                updated_at: now,
            },
        }
    }

    #[tokio::test]
    async fn site_leases_are_released_after_each_run() {
        let runner = CheckRunner::new(Arc::new(EchoStore), Arc::new(OkProber), 4);

        let pass = runner
            .run_checks(vec![
                item(1, 10, "https://a.example"),
                item(2, 10, "https://a.example"),
                item(3, 20, "https://b.example"),
                item(4, 30, "https://explode.example"),
            ])
            .await;

        assert_eq!(pass.summary.recorded, 3);
        assert_eq!(pass.summary.failed, 1);
        assert!(runner.site_leases.is_empty());
    }

    fn report(check_id: i32, disposition: Disposition) -> CheckReport {
        CheckReport {
            check_id,
            site_id: 1,
            disposition,
        }
    }

    #[test]
    fn summary_counts_each_disposition() {
        let mut pass = PassReport::default();
        pass.push(
            report(
                1,
                Disposition::Recorded {
                    status: "200".to_string(),
                    site_status: SiteStatus::Active,
                    latency_ms: 5,
                },
            ),
            None,
        );
        pass.push(report(2, Disposition::Skipped { check_type: CheckType::Dns }), None);
        pass.push(
            report(
                3,
                Disposition::Failed {
                    reason: "timeout".to_string(),
                },
            ),
            None,
        );

        assert_eq!(
            pass.summary,
            PassSummary {
                total: 3,
                recorded: 1,
                skipped: 1,
                failed: 1,
            }
        );
        assert_eq!(pass.checks.len(), 3);
    }

    #[test]
    fn dispositions_serialize_with_an_outcome_tag() {
        let json = serde_json::to_value(report(
            7,
            Disposition::Skipped {
                check_type: CheckType::Tcp,
            },
        ))
        .unwrap();

        assert_eq!(json["checkId"], 7);
        assert_eq!(json["outcome"], "skipped");
        assert_eq!(json["checkType"], "TCP");
    }
}
