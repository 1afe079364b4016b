//! Network probes.
//!
//! Probes never return errors: anything that goes wrong on the wire becomes a
//! [`ProbeOutcome::Failure`] so the runner can record it like any other result.

use async_trait::async_trait;
use rand::random;
use std::net::IpAddr;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::db::enums::CheckType;

use super::outcome::ProbeOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeKind {
    /// Single GET against the site URL.
    Http,
    /// ICMP echo against the host of the site URL.
    Ping,
}

impl ProbeKind {
    /// Returns `None` for check types that have no probe yet (TCP, DNS).
    pub fn for_check_type(check_type: CheckType) -> Option<Self> {
        match check_type {
            CheckType::Http | CheckType::Https => Some(ProbeKind::Http),
            CheckType::Ping => Some(ProbeKind::Ping),
            CheckType::Tcp | CheckType::Dns => None,
        }
    }
}

#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, kind: ProbeKind, target: &str) -> ProbeOutcome;
}

/// Probes real network targets, each bounded by the configured timeout.
pub struct NetworkProber {
    http: reqwest::Client,
    timeout: Duration,
    icmp_v4: Option<surge_ping::Client>,
    icmp_v6: Option<surge_ping::Client>,
}

impl NetworkProber {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        // ICMP sockets may be unavailable without privileges; ping checks then
        // record a failure instead of keeping the server from starting.
        let icmp_v4 = match surge_ping::Client::new(&surge_ping::Config::default()) {
            Ok(client) => Some(client),
            Err(e) => {
                warn!(error = %e, "ICMPv4 socket unavailable. PING checks against IPv4 hosts will fail.");
                None
            }
        };
        let v6_config = surge_ping::Config::builder()
            .kind(surge_ping::ICMP::V6)
            .build();
        let icmp_v6 = match surge_ping::Client::new(&v6_config) {
            Ok(client) => Some(client),
            Err(e) => {
                warn!(error = %e, "ICMPv6 socket unavailable. PING checks against IPv6 hosts will fail.");
                None
            }
        };

        Ok(Self {
            http,
            timeout,
            icmp_v4,
            icmp_v6,
        })
    }

    async fn probe_http(&self, url: &str) -> ProbeOutcome {
        let start_time = Instant::now();
        let result = self.http.get(url).send().await;
        let latency_ms = elapsed_ms(start_time);

        match result {
            Ok(response) => ProbeOutcome::Response {
                status_code: response.status().as_u16(),
                latency_ms,
            },
            Err(e) => {
                let reason = if e.is_timeout() {
                    "Request timed out".to_string()
                } else {
                    error_chain(&e)
                };
                ProbeOutcome::failure(latency_ms, reason)
            }
        }
    }

    async fn probe_ping(&self, target: &str) -> ProbeOutcome {
        let start_time = Instant::now();

        let host = match host_of(target) {
            Some(host) => host,
            None => return ProbeOutcome::failure(0, format!("No host in target '{target}'")),
        };

        let address = match tokio::time::timeout(self.timeout, resolve(&host)).await {
            Ok(Ok(address)) => address,
            Ok(Err(reason)) => return ProbeOutcome::failure(elapsed_ms(start_time), reason),
            Err(_) => return ProbeOutcome::failure(elapsed_ms(start_time), "DNS resolution timed out"),
        };

        let client = match address {
            IpAddr::V4(_) => self.icmp_v4.as_ref(),
            IpAddr::V6(_) => self.icmp_v6.as_ref(),
        };
        let Some(client) = client else {
            return ProbeOutcome::failure(elapsed_ms(start_time), "ICMP socket unavailable");
        };

        let mut pinger = client
            .pinger(address, surge_ping::PingIdentifier(random()))
            .await;
        pinger.timeout(self.timeout);

        match pinger.ping(surge_ping::PingSequence(0), &[]).await {
            Ok((_reply, rtt)) => {
                debug!(%address, rtt_ms = rtt.as_millis() as u64, "Ping reply received.");
                ProbeOutcome::Reachable {
                    latency_ms: duration_ms(rtt),
                }
            }
            Err(e) => ProbeOutcome::failure(elapsed_ms(start_time), e.to_string()),
        }
    }
}

#[async_trait]
impl Prober for NetworkProber {
    async fn probe(&self, kind: ProbeKind, target: &str) -> ProbeOutcome {
        match kind {
            ProbeKind::Http => self.probe_http(target).await,
            ProbeKind::Ping => self.probe_ping(target).await,
        }
    }
}

/// Accepts either a full URL or a bare host name.
pub fn host_of(target: &str) -> Option<String> {
    match reqwest::Url::parse(target) {
        Ok(url) => url
            .host_str()
            .map(|host| host.trim_start_matches('[').trim_end_matches(']').to_string()),
        Err(_) => {
            let trimmed = target.trim();
            (!trimmed.is_empty() && !trimmed.contains('/')).then(|| trimmed.to_string())
        }
    }
}

async fn resolve(host: &str) -> Result<IpAddr, String> {
    if let Ok(address) = host.parse::<IpAddr>() {
        return Ok(address);
    }
    let mut addresses = tokio::net::lookup_host((host, 0))
        .await
        .map_err(|e| format!("Failed to resolve {host}: {e}"))?;
    addresses
        .next()
        .map(|socket_addr| socket_addr.ip())
        .ok_or_else(|| format!("DNS resolution returned no addresses for {host}"))
}

/// reqwest hides the root cause (e.g. "Connection refused") behind "error
/// sending request"; include the source chain in the recorded reason.
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.contains(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = cause.source();
    }
    message
}

fn elapsed_ms(start_time: Instant) -> u64 {
    duration_ms(start_time.elapsed())
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
