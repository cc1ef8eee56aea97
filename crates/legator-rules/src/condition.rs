use std::time::Duration;

use chrono::{DateTime, Utc};
use legator_core::{Condition, ProbeSnapshot, ProbeStatus};

/// Evaluate a single condition against a probe snapshot, per spec.md §4.2's
/// condition semantics. `duration` is the rule's already-parsed duration;
/// `probe_offline` uses it directly, the sustained types pass it through
/// unused here (their duration gating happens in the pending-timer phase).
#[must_use]
pub fn condition_met(condition: &Condition, probe: &ProbeSnapshot, now: DateTime<Utc>, duration: Duration) -> (bool, String) {
    match condition {
        Condition::ProbeOffline { .. } => probe_offline(probe, now, duration),
        Condition::DiskThreshold { threshold_pct, .. } => disk_threshold(probe, *threshold_pct),
        Condition::CpuThreshold { threshold_pct, .. } => cpu_threshold(probe, *threshold_pct),
    }
}

fn probe_offline(probe: &ProbeSnapshot, now: DateTime<Utc>, duration: Duration) -> (bool, String) {
    if probe.status != ProbeStatus::Offline {
        return (false, String::new());
    }
    let offline_for = now.signed_duration_since(probe.last_seen);
    let threshold = chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::zero());
    if offline_for < threshold {
        return (false, String::new());
    }
    let seconds = offline_for.num_seconds().max(0);
    (
        true,
        format!(
            "probe {} has been offline for {}s",
            probe.id, seconds
        ),
    )
}

fn disk_threshold(probe: &ProbeSnapshot, threshold_pct: f64) -> (bool, String) {
    let Some(sample) = &probe.last_heartbeat else {
        return (false, String::new());
    };
    if sample.disk_total == 0 {
        return (false, String::new());
    }
    let usage = 100.0 * sample.disk_used as f64 / sample.disk_total as f64;
    if usage > threshold_pct {
        (
            true,
            format!("disk usage {usage:.1}% exceeds threshold {threshold_pct:.1}%"),
        )
    } else {
        (false, String::new())
    }
}

fn cpu_threshold(probe: &ProbeSnapshot, threshold_pct: f64) -> (bool, String) {
    let Some(sample) = &probe.last_heartbeat else {
        return (false, String::new());
    };
    let cpu_count = probe.cpu_count() as f64;
    let usage = 100.0 * sample.load[0] / cpu_count;
    if usage > threshold_pct {
        (
            true,
            format!("cpu usage {usage:.1}% exceeds threshold {threshold_pct:.1}%"),
        )
    } else {
        (false, String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use legator_core::{HeartbeatSample, ProbeId};

    fn probe(status: ProbeStatus, last_seen: DateTime<Utc>) -> ProbeSnapshot {
        ProbeSnapshot {
            id: ProbeId::from("p1"),
            status,
            last_seen,
            tags: vec![],
            inventory: None,
            last_heartbeat: None,
        }
    }

    #[test]
    fn probe_offline_fires_after_duration_elapsed() {
        let now = Utc::now();
        let p = probe(ProbeStatus::Offline, now - chrono::Duration::minutes(3));
        let (met, msg) = probe_offline(&p, now, Duration::from_secs(120));
        assert!(met);
        assert!(msg.contains("offline"));
    }

    #[test]
    fn probe_offline_does_not_fire_while_online() {
        let now = Utc::now();
        let p = probe(ProbeStatus::Online, now - chrono::Duration::minutes(3));
        let (met, _) = probe_offline(&p, now, Duration::from_secs(120));
        assert!(!met);
    }

    #[test]
    fn probe_offline_zero_duration_fires_immediately() {
        let now = Utc::now();
        let p = probe(ProbeStatus::Offline, now);
        let (met, _) = probe_offline(&p, now, Duration::ZERO);
        assert!(met);
    }

    #[test]
    fn disk_threshold_message_reports_both_percentages() {
        let mut p = probe(ProbeStatus::Online, Utc::now());
        p.last_heartbeat = Some(HeartbeatSample {
            load: [0.0, 0.0, 0.0],
            mem_used: 0,
            mem_total: 0,
            disk_used: 95,
            disk_total: 100,
        });
        let (met, msg) = disk_threshold(&p, 80.0);
        assert!(met);
        assert!(msg.contains("95.0%"));
        assert!(msg.contains("80.0%"));
    }

    #[test]
    fn disk_threshold_without_heartbeat_is_no_match() {
        let p = probe(ProbeStatus::Online, Utc::now());
        let (met, _) = disk_threshold(&p, 80.0);
        assert!(!met);
    }

    #[test]
    fn cpu_threshold_clamps_by_cpu_count() {
        let mut p = probe(ProbeStatus::Online, Utc::now());
        p.last_heartbeat = Some(HeartbeatSample {
            load: [2.0, 0.0, 0.0],
            mem_used: 0,
            mem_total: 0,
            disk_used: 0,
            disk_total: 0,
        });
        // No inventory -> cpu_count() defaults to 1, so load 2.0 -> 200%.
        let (met, msg) = cpu_threshold(&p, 90.0);
        assert!(met);
        assert!(msg.contains("200.0%"));
    }
}
