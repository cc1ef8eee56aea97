use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::WebhookId;

/// A registered webhook sink, per spec.md §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub id: WebhookId,
    pub url: String,
    #[serde(default)]
    pub events: Vec<String>,
    /// HMAC signing secret. Never logged; see [`mask_url`].
    #[serde(default)]
    pub secret: Option<String>,
    pub enabled: bool,
}

impl WebhookConfig {
    /// A webhook is a candidate for a given event type if its `events` list
    /// is empty (subscribes to everything) or contains the type, per the
    /// "all enabled webhooks subscribed to the event" contract in spec.md
    /// §4.4.
    #[must_use]
    pub fn subscribes_to(&self, event_type: &str) -> bool {
        self.enabled && (self.events.is_empty() || self.events.iter().any(|e| e == event_type))
    }
}

/// One completed webhook delivery attempt, per spec.md §3/§4.4. `target_url`
/// is masked to `scheme://host/***` before storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub target_url_masked: String,
    pub status_code: Option<u16>,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Mask a URL down to `scheme://host/***`, per spec.md §4.4's "avoid logging
/// path secrets".
#[must_use]
pub fn mask_url(url: &str) -> String {
    match url.split_once("://") {
        Some((scheme, rest)) => {
            let host = rest.split('/').next().unwrap_or(rest);
            format!("{scheme}://{host}/***")
        }
        None => "***".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_url_path() {
        assert_eq!(
            mask_url("https://hooks.example.com/t/secret-token-123"),
            "https://hooks.example.com/***"
        );
    }

    #[test]
    fn masks_url_without_path() {
        assert_eq!(mask_url("https://hooks.example.com"), "https://hooks.example.com/***");
    }

    #[test]
    fn subscribes_to_empty_events_matches_all() {
        let cfg = WebhookConfig {
            id: WebhookId::from("w1"),
            url: "https://x".into(),
            events: vec![],
            secret: None,
            enabled: true,
        };
        assert!(cfg.subscribes_to("anything"));
    }

    #[test]
    fn disabled_webhook_never_subscribes() {
        let cfg = WebhookConfig {
            id: WebhookId::from("w1"),
            url: "https://x".into(),
            events: vec![],
            secret: None,
            enabled: false,
        };
        assert!(!cfg.subscribes_to("anything"));
    }

    #[test]
    fn subscribes_to_named_event_only() {
        let cfg = WebhookConfig {
            id: WebhookId::from("w1"),
            url: "https://x".into(),
            events: vec!["AlertFired".into()],
            secret: None,
            enabled: true,
        };
        assert!(cfg.subscribes_to("AlertFired"));
        assert!(!cfg.subscribes_to("AlertResolved"));
    }
}
