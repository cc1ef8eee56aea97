use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::ProbeId;

/// Connectivity status of a probe as observed by the control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    Online,
    Offline,
}

/// Host inventory reported once at registration (and on request).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Inventory {
    pub cpus: u32,
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub arch: String,
}

/// Most recent heartbeat sample from a probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatSample {
    /// 1/5/15-minute load averages.
    pub load: [f64; 3],
    pub mem_used: u64,
    pub mem_total: u64,
    pub disk_used: u64,
    pub disk_total: u64,
}

/// The control plane's read-only view of a single probe.
///
/// Supplied by the external fleet collaborator (spec.md §3); the Alert
/// Engine only ever reads this, never writes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeSnapshot {
    pub id: ProbeId,
    pub status: ProbeStatus,
    pub last_seen: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub inventory: Option<Inventory>,
    pub last_heartbeat: Option<HeartbeatSample>,
}

impl ProbeSnapshot {
    /// CPU count used by `cpu_threshold` evaluation; defaults to 1 when
    /// inventory hasn't been reported yet, per spec.md §4.2.
    #[must_use]
    pub fn cpu_count(&self) -> u32 {
        self.inventory.as_ref().map_or(1, |inv| inv.cpus.max(1))
    }
}

/// Case-insensitive, trimmed tag matching per spec.md §3/§4.2.
///
/// A rule matches a probe only if every non-empty rule tag is present in
/// the probe's tag set. An empty rule tag list matches all probes.
#[must_use]
pub fn match_tags(probe_tags: &[String], rule_tags: &[String]) -> bool {
    let normalize = |s: &str| s.trim().to_lowercase();
    let probe_set: Vec<String> = probe_tags.iter().map(|t| normalize(t)).collect();

    rule_tags
        .iter()
        .map(|t| normalize(t))
        .filter(|t| !t.is_empty())
        .all(|t| probe_set.contains(&t))
}
