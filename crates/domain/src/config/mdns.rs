use crate::interface::InterfaceChoice;
use crate::service_info::DEFAULT_TTL;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Largest mDNS message the engine will emit (RFC 6762 §17).
pub const MAX_MSG_ABSOLUTE: usize = 8966;

/// Protocol timing and sizing for one engine instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MdnsConfig {
    /// Interfaces to join: "all", "default" or a list of addresses
    #[serde(default)]
    pub interfaces: InterfaceChoice,

    /// TTL (seconds) for registered services when none is given
    #[serde(default = "default_ttl")]
    pub default_ttl: u32,

    /// Payload budget per outgoing packet
    #[serde(default = "default_max_packet_size")]
    pub max_packet_size: usize,

    #[serde(default = "default_probe_count")]
    pub probe_count: u32,

    #[serde(default = "default_probe_interval_ms")]
    pub probe_interval_ms: u64,

    #[serde(default = "default_announce_count")]
    pub announce_count: u32,

    #[serde(default = "default_announce_interval_ms")]
    pub announce_interval_ms: u64,

    #[serde(default = "default_goodbye_count")]
    pub goodbye_count: u32,

    #[serde(default = "default_goodbye_interval_ms")]
    pub goodbye_interval_ms: u64,

    /// First browse re-query interval; doubles up to the max
    #[serde(default = "default_browser_initial_interval_ms")]
    pub browser_initial_interval_ms: u64,

    #[serde(default = "default_browser_max_interval_ms")]
    pub browser_max_interval_ms: u64,

    /// Random delay `[min, max]` before a browser's first query
    #[serde(default = "default_query_jitter_ms")]
    pub query_jitter_ms: [u64; 2],

    /// Percentages of a record's lifetime at which browsers re-query
    #[serde(default = "default_refresh_thresholds")]
    pub refresh_thresholds: Vec<u32>,

    /// First re-query interval of a single-service lookup; doubles
    #[serde(default = "default_lookup_initial_interval_ms")]
    pub lookup_initial_interval_ms: u64,

    #[serde(default = "default_reaper_interval_secs")]
    pub reaper_interval_secs: u64,

    /// How often the interface set is re-resolved; 0 disables the watch
    #[serde(default = "default_interface_watch_interval_secs")]
    pub interface_watch_interval_secs: u64,

    /// Repeats of one failure within this window are logged at debug
    #[serde(default = "default_log_recurrence_window_secs")]
    pub log_recurrence_window_secs: u64,

    /// A failure that keeps recurring is logged at warn again after this long
    #[serde(default = "default_log_escalation_interval_secs")]
    pub log_escalation_interval_secs: u64,
}

impl Default for MdnsConfig {
    fn default() -> Self {
        Self {
            interfaces: InterfaceChoice::default(),
            default_ttl: default_ttl(),
            max_packet_size: default_max_packet_size(),
            probe_count: default_probe_count(),
            probe_interval_ms: default_probe_interval_ms(),
            announce_count: default_announce_count(),
            announce_interval_ms: default_announce_interval_ms(),
            goodbye_count: default_goodbye_count(),
            goodbye_interval_ms: default_goodbye_interval_ms(),
            browser_initial_interval_ms: default_browser_initial_interval_ms(),
            browser_max_interval_ms: default_browser_max_interval_ms(),
            query_jitter_ms: default_query_jitter_ms(),
            refresh_thresholds: default_refresh_thresholds(),
            lookup_initial_interval_ms: default_lookup_initial_interval_ms(),
            reaper_interval_secs: default_reaper_interval_secs(),
            interface_watch_interval_secs: default_interface_watch_interval_secs(),
            log_recurrence_window_secs: default_log_recurrence_window_secs(),
            log_escalation_interval_secs: default_log_escalation_interval_secs(),
        }
    }
}

impl MdnsConfig {
    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    pub fn announce_interval(&self) -> Duration {
        Duration::from_millis(self.announce_interval_ms)
    }

    pub fn goodbye_interval(&self) -> Duration {
        Duration::from_millis(self.goodbye_interval_ms)
    }

    pub fn log_recurrence_window(&self) -> Duration {
        Duration::from_secs(self.log_recurrence_window_secs)
    }

    pub fn log_escalation_interval(&self) -> Duration {
        Duration::from_secs(self.log_escalation_interval_secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.default_ttl == 0 {
            return Err("mdns.default_ttl must be greater than 0".to_string());
        }
        if !(512..=MAX_MSG_ABSOLUTE).contains(&self.max_packet_size) {
            return Err(format!(
                "mdns.max_packet_size must be between 512 and {}",
                MAX_MSG_ABSOLUTE
            ));
        }
        if self.announce_count < 2 {
            return Err("mdns.announce_count must be at least 2".to_string());
        }
        if self.browser_initial_interval_ms == 0
            || self.browser_initial_interval_ms > self.browser_max_interval_ms
        {
            return Err(
                "mdns.browser_initial_interval_ms must be non-zero and not above the max"
                    .to_string(),
            );
        }
        if self.query_jitter_ms[0] > self.query_jitter_ms[1] {
            return Err("mdns.query_jitter_ms must be [min, max]".to_string());
        }
        if self.lookup_initial_interval_ms == 0 {
            return Err("mdns.lookup_initial_interval_ms cannot be 0".to_string());
        }
        if self.reaper_interval_secs == 0 {
            return Err("mdns.reaper_interval_secs cannot be 0".to_string());
        }
        if self
            .refresh_thresholds
            .iter()
            .any(|pct| *pct == 0 || *pct >= 100)
            || self.refresh_thresholds.windows(2).any(|w| w[0] >= w[1])
        {
            return Err(
                "mdns.refresh_thresholds must be ascending percentages between 1 and 99"
                    .to_string(),
            );
        }
        Ok(())
    }
}

fn default_ttl() -> u32 {
    DEFAULT_TTL
}

fn default_max_packet_size() -> usize {
    MAX_MSG_ABSOLUTE
}

fn default_probe_count() -> u32 {
    3
}

fn default_probe_interval_ms() -> u64 {
    175
}

fn default_announce_count() -> u32 {
    3
}

fn default_announce_interval_ms() -> u64 {
    225
}

fn default_goodbye_count() -> u32 {
    3
}

fn default_goodbye_interval_ms() -> u64 {
    125
}

fn default_browser_initial_interval_ms() -> u64 {
    1000
}

fn default_browser_max_interval_ms() -> u64 {
    20_000
}

fn default_query_jitter_ms() -> [u64; 2] {
    [20, 120]
}

fn default_refresh_thresholds() -> Vec<u32> {
    vec![50, 85, 95]
}

fn default_lookup_initial_interval_ms() -> u64 {
    200
}

fn default_reaper_interval_secs() -> u64 {
    10
}

fn default_interface_watch_interval_secs() -> u64 {
    30
}

fn default_log_recurrence_window_secs() -> u64 {
    30
}

fn default_log_escalation_interval_secs() -> u64 {
    300
}
