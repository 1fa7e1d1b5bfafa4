use rustc_hash::FxHashMap;
use std::fmt::Display;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSeverity {
    /// Report at warn.
    Visible,
    /// Report at debug.
    Quiet,
}

#[derive(Debug, Clone, Copy)]
struct ConditionState {
    first_seen: Instant,
    last_seen: Instant,
    occurrences: u64,
    last_escalation: Instant,
}

/// Rate-limited reporting of recurring failures.
///
/// The first occurrence of a condition is visible. Recurrences within the
/// recurrence window are quiet until the condition has persisted for the
/// escalation interval since its last visible report, which makes it visible
/// again. A gap longer than the recurrence window starts the condition over.
pub struct LogBackoff {
    recurrence_window: Duration,
    escalation_interval: Duration,
    conditions: Mutex<FxHashMap<String, ConditionState>>,
}

impl LogBackoff {
    pub fn new(recurrence_window: Duration, escalation_interval: Duration) -> Self {
        Self {
            recurrence_window,
            escalation_interval,
            conditions: Mutex::new(FxHashMap::default()),
        }
    }

    pub fn observe(&self, condition: &str) -> LogSeverity {
        self.observe_at(condition, Instant::now())
    }

    pub fn observe_at(&self, condition: &str, now: Instant) -> LogSeverity {
        let mut conditions = self.conditions.lock().unwrap_or_else(|e| e.into_inner());

        match conditions.get_mut(condition) {
            Some(state)
                if now.saturating_duration_since(state.last_seen) <= self.recurrence_window =>
            {
                state.last_seen = now;
                state.occurrences += 1;
                if now.saturating_duration_since(state.last_escalation)
                    >= self.escalation_interval
                {
                    state.last_escalation = now;
                    LogSeverity::Visible
                } else {
                    LogSeverity::Quiet
                }
            }
            _ => {
                // only conditions inside their recurrence window are kept
                let window = self.recurrence_window;
                conditions
                    .retain(|_, state| now.saturating_duration_since(state.last_seen) <= window);
                conditions.insert(
                    condition.to_string(),
                    ConditionState {
                        first_seen: now,
                        last_seen: now,
                        occurrences: 1,
                        last_escalation: now,
                    },
                );
                LogSeverity::Visible
            }
        }
    }

    /// Times `condition` has been seen since it last started over.
    pub fn occurrences(&self, condition: &str) -> u64 {
        let conditions = self.conditions.lock().unwrap_or_else(|e| e.into_inner());
        conditions.get(condition).map_or(0, |state| state.occurrences)
    }

    /// Number of conditions currently tracked.
    pub fn tracked(&self) -> usize {
        self.conditions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// How long `condition` has been recurring.
    pub fn persisted_for(&self, condition: &str, now: Instant) -> Option<Duration> {
        let conditions = self.conditions.lock().unwrap_or_else(|e| e.into_inner());
        conditions
            .get(condition)
            .map(|state| now.saturating_duration_since(state.first_seen))
    }

    /// Observe `condition` and log `message` at the resulting severity.
    pub fn report(&self, condition: &str, message: &str, error: &dyn Display) -> LogSeverity {
        let severity = self.observe(condition);
        match severity {
            LogSeverity::Visible => {
                let occurrences = self.occurrences(condition);
                warn!(condition = %condition, occurrences, error = %error, "{}", message);
            }
            LogSeverity::Quiet => {
                debug!(condition = %condition, error = %error, "{}", message);
            }
        }
        severity
    }
}

impl std::fmt::Debug for LogBackoff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogBackoff")
            .field("recurrence_window", &self.recurrence_window)
            .field("escalation_interval", &self.escalation_interval)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backoff() -> LogBackoff {
        LogBackoff::new(Duration::from_secs(30), Duration::from_secs(300))
    }

    #[test]
    fn first_occurrence_is_visible() {
        let backoff = backoff();
        assert_eq!(
            backoff.observe_at("send", Instant::now()),
            LogSeverity::Visible
        );
    }

    #[test]
    fn recurrence_within_window_is_quiet() {
        let backoff = backoff();
        let t0 = Instant::now();

        backoff.observe_at("send", t0);
        assert_eq!(
            backoff.observe_at("send", t0 + Duration::from_secs(5)),
            LogSeverity::Quiet
        );
        assert_eq!(
            backoff.observe_at("send", t0 + Duration::from_secs(20)),
            LogSeverity::Quiet
        );
        assert_eq!(backoff.occurrences("send"), 3);
    }

    #[test]
    fn persisting_condition_escalates_again() {
        let backoff = backoff();
        let t0 = Instant::now();

        backoff.observe_at("send", t0);
        let mut at = t0;
        let mut visible = 0;
        // one failure every 10s for 10 minutes
        for _ in 0..60 {
            at += Duration::from_secs(10);
            if backoff.observe_at("send", at) == LogSeverity::Visible {
                visible += 1;
            }
        }
        assert_eq!(visible, 2);
        assert_eq!(
            backoff.persisted_for("send", at),
            Some(Duration::from_secs(600))
        );
    }

    #[test]
    fn gap_longer_than_window_starts_over() {
        let backoff = backoff();
        let t0 = Instant::now();

        backoff.observe_at("send", t0);
        backoff.observe_at("send", t0 + Duration::from_secs(1));
        assert_eq!(
            backoff.observe_at("send", t0 + Duration::from_secs(60)),
            LogSeverity::Visible
        );
        assert_eq!(backoff.occurrences("send"), 1);
    }

    #[test]
    fn lapsed_conditions_are_dropped() {
        let backoff = backoff();
        let mut at = Instant::now();

        for port in 0..1_000u32 {
            at += Duration::from_secs(3600);
            backoff.observe_at(&format!("malformed:10.0.0.{}", port), at);
        }

        assert_eq!(backoff.tracked(), 1);
        assert_eq!(backoff.occurrences("malformed:10.0.0.999"), 1);
    }

    #[test]
    fn active_conditions_survive_new_ones() {
        let backoff = backoff();
        let t0 = Instant::now();

        backoff.observe_at("send:multicast", t0);
        backoff.observe_at("send:unicast", t0 + Duration::from_secs(10));

        assert_eq!(backoff.tracked(), 2);
        assert_eq!(
            backoff.observe_at("send:multicast", t0 + Duration::from_secs(20)),
            LogSeverity::Quiet
        );
    }

    #[test]
    fn conditions_are_independent() {
        let backoff = backoff();
        let t0 = Instant::now();

        backoff.observe_at("send", t0);
        assert_eq!(
            backoff.observe_at("decode", t0 + Duration::from_secs(1)),
            LogSeverity::Visible
        );
        assert_eq!(
            backoff.observe_at("send", t0 + Duration::from_secs(2)),
            LogSeverity::Quiet
        );
    }
}
