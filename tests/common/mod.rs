#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use sea_orm::DbErr;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use uptime_backend::db::entities::{check, site};
use uptime_backend::db::enums::{CheckType, SiteStatus};
use uptime_backend::db::services::{CheckRun, CheckStore, CheckWithSite, StoreError};
use uptime_backend::monitor::{ProbeKind, ProbeOutcome, Prober};

pub fn site(id: i32, url: &str) -> site::Model {
    let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    site::Model {
        id,
        user_id: 1,
        name: format!("site-{id}"),
        url: url.to_string(),
        description: None,
        status: SiteStatus::Active,
        created_at: created,
        updated_at: created,
    }
}

pub fn check(id: i32, site_id: i32, check_type: CheckType) -> check::Model {
    let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    check::Model {
        id,
        site_id,
        check_type,
        interval_seconds: check::DEFAULT_INTERVAL_SECONDS,
        status: check::PENDING_STATUS.to_string(),
        latency_ms: None,
        response_text: None,
        created_at: created,
        updated_at: created,
    }
}

pub fn with_site(check: check::Model, site: &site::Model) -> CheckWithSite {
    CheckWithSite {
        check,
        site: site.clone(),
    }
}

#[derive(Default)]
struct MemoryState {
    checks: Vec<CheckWithSite>,
    runs: Vec<CheckRun>,
    site_statuses: HashMap<i32, SiteStatus>,
}

/// In-memory [`CheckStore`] that records every run it is asked to persist.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    fail_writes_for: Mutex<HashSet<i32>>,
    fail_load: Mutex<bool>,
}

impl MemoryStore {
    pub fn with_checks(checks: Vec<CheckWithSite>) -> Self {
        let store = Self::default();
        store.state.lock().unwrap().checks = checks;
        store
    }

    pub fn fail_writes_for(&self, check_id: i32) {
        self.fail_writes_for.lock().unwrap().insert(check_id);
    }

    pub fn fail_load(&self) {
        *self.fail_load.lock().unwrap() = true;
    }

    pub fn runs(&self) -> Vec<CheckRun> {
        self.state.lock().unwrap().runs.clone()
    }

    pub fn site_status(&self, site_id: i32) -> Option<SiteStatus> {
        self.state.lock().unwrap().site_statuses.get(&site_id).cloned()
    }

    pub fn check(&self, check_id: i32) -> Option<check::Model> {
        self.state
            .lock()
            .unwrap()
            .checks
            .iter()
            .find(|c| c.check.id == check_id)
            .map(|c| c.check.clone())
    }
}

#[async_trait]
impl CheckStore for MemoryStore {
    async fn list_checks_with_site(&self) -> Result<Vec<CheckWithSite>, StoreError> {
        if *self.fail_load.lock().unwrap() {
            return Err(StoreError::Database(DbErr::Custom(
                "connection reset".to_string(),
            )));
        }
        Ok(self.state.lock().unwrap().checks.clone())
    }

    async fn record_run(&self, run: &CheckRun) -> Result<check::Model, StoreError> {
        if self.fail_writes_for.lock().unwrap().contains(&run.check_id) {
            return Err(StoreError::Database(DbErr::Custom("write rejected".to_string())));
        }

        let mut state = self.state.lock().unwrap();
        state.runs.push(run.clone());
        state.site_statuses.insert(run.site_id, run.site_status.clone());

        let entry = state
            .checks
            .iter_mut()
            .find(|c| c.check.id == run.check_id)
            .ok_or_else(|| StoreError::NotFound(format!("check {}", run.check_id)))?;
        entry.check.status = run.status.clone();
        entry.check.latency_ms = Some(run.latency_ms);
        entry.check.response_text = Some(run.response_text.clone());
        entry.check.updated_at = run.timestamp;
        entry.site.status = run.site_status.clone();
        Ok(entry.check.clone())
    }
}

/// [`Prober`] that answers from a fixed url -> outcome table.
pub struct ScriptedProber {
    outcomes: HashMap<String, ProbeOutcome>,
    panic_on: HashSet<String>,
    delay: Duration,
    probes: Mutex<Vec<(ProbeKind, String)>>,
    in_flight: Mutex<HashMap<String, usize>>,
    max_in_flight_per_target: AtomicUsize,
    total_in_flight: AtomicUsize,
    max_total_in_flight: AtomicUsize,
}

impl ScriptedProber {
    pub fn new(outcomes: impl IntoIterator<Item = (&'static str, ProbeOutcome)>) -> Self {
        Self {
            outcomes: outcomes
                .into_iter()
                .map(|(url, outcome)| (url.to_string(), outcome))
                .collect(),
            panic_on: HashSet::new(),
            delay: Duration::ZERO,
            probes: Mutex::new(Vec::new()),
            in_flight: Mutex::new(HashMap::new()),
            max_in_flight_per_target: AtomicUsize::new(0),
            total_in_flight: AtomicUsize::new(0),
            max_total_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Makes every probe of `target` panic.
    pub fn panicking_on(mut self, target: &str) -> Self {
        self.panic_on.insert(target.to_string());
        self
    }

    pub fn probes(&self) -> Vec<(ProbeKind, String)> {
        self.probes.lock().unwrap().clone()
    }

    pub fn max_in_flight_per_target(&self) -> usize {
        self.max_in_flight_per_target.load(Ordering::SeqCst)
    }

    pub fn max_total_in_flight(&self) -> usize {
        self.max_total_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, kind: ProbeKind, target: &str) -> ProbeOutcome {
        if self.panic_on.contains(target) {
            panic!("scripted panic for {target}");
        }
        self.probes.lock().unwrap().push((kind, target.to_string()));

        {
            let mut in_flight = self.in_flight.lock().unwrap();
            let count = in_flight.entry(target.to_string()).or_insert(0);
            *count += 1;
            self.max_in_flight_per_target.fetch_max(*count, Ordering::SeqCst);
        }
        let total = self.total_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_total_in_flight.fetch_max(total, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.total_in_flight.fetch_sub(1, Ordering::SeqCst);
        if let Some(count) = self.in_flight.lock().unwrap().get_mut(target) {
            *count -= 1;
        }

        self.outcomes
            .get(target)
            .cloned()
            .unwrap_or_else(|| ProbeOutcome::failure(0, "no scripted outcome"))
    }
}
