use legator_core::ProbeId;

/// Construction parameters for a `ProbeClient`, per spec.md §4.1/§10.
#[derive(Debug, Clone)]
pub struct ProbeClientConfig {
    /// Base control-plane URL, e.g. `wss://control.example.com`. The
    /// client appends `/ws/probe?id={probe_id}`.
    pub server_url: String,
    pub probe_id: ProbeId,
    pub api_key: String,
    /// Capacity of the non-blocking inbound envelope queue. Spec.md §4.1
    /// fixes this at 64; kept configurable for tests that want to exercise
    /// drop-on-full without waiting on real timers.
    pub inbox_capacity: usize,
}

impl ProbeClientConfig {
    #[must_use]
    pub fn new(server_url: impl Into<String>, probe_id: ProbeId, api_key: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            probe_id,
            api_key: api_key.into(),
            inbox_capacity: 64,
        }
    }

    pub(crate) fn ws_url(&self) -> String {
        format!(
            "{}/ws/probe?id={}",
            self.server_url.trim_end_matches('/'),
            self.probe_id.as_str()
        )
    }
}
