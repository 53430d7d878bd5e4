use std::fmt;
use std::time::Duration;

use cortex_config::CircuitBreakerConfig;
use serde::{Deserialize, Serialize};

/// Circuit breaker state for a provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CircuitState {
    /// Normal operation, requests flow through
    #[default]
    Closed,
    /// Provider is failing, requests are rejected
    Open,
    /// Probing whether the provider has recovered
    HalfOpen,
}

impl CircuitState {
    const fn label(self) -> &'static str {
        match self {
            Self::Closed => "CLOSED",
            Self::Open => "OPEN",
            Self::HalfOpen => "HALF_OPEN",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Thresholds shared by every provider's breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSettings {
    pub failure_threshold: u32,
    pub open_timeout: Duration,
    pub half_open_max_calls: u32,
    /// Reject half-open calls beyond `half_open_max_calls`
    pub enforce_half_open_limit: bool,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_timeout: Duration::from_secs(60),
            half_open_max_calls: 1,
            enforce_half_open_limit: false,
        }
    }
}

impl From<&CircuitBreakerConfig> for BreakerSettings {
    fn from(config: &CircuitBreakerConfig) -> Self {
        Self {
            failure_threshold: config.failure_threshold,
            open_timeout: config.open_timeout,
            half_open_max_calls: config.half_open_max_calls,
            enforce_half_open_limit: config.enforce_half_open_limit,
        }
    }
}

/// Outcome of asking whether a provider may be called
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub allowed: bool,
    pub state: CircuitState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Verdict {
    const fn allow(state: CircuitState) -> Self {
        Self {
            allowed: true,
            state,
            reason: None,
        }
    }

    fn reject(state: CircuitState, reason: String) -> Self {
        Self {
            allowed: false,
            state,
            reason: Some(reason),
        }
    }
}

/// Breaker state of one provider
///
/// Timestamps are epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitRecord {
    pub provider: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub last_failure_time: Option<u64>,
    pub next_attempt_time: Option<u64>,
    #[serde(default)]
    pub half_open_calls: u32,
}

impl CircuitRecord {
    /// The zero value for a provider
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            state: CircuitState::Closed,
            failure_count: 0,
            last_failure_time: None,
            next_attempt_time: None,
            half_open_calls: 0,
        }
    }

    /// Decide whether a call may proceed, moving open to half-open once the timeout has passed
    pub fn check(&mut self, settings: &BreakerSettings, now_ms: u64) -> Verdict {
        if self.state == CircuitState::Open && self.next_attempt_time.is_some_and(|next| now_ms >= next) {
            self.state = CircuitState::HalfOpen;
            self.half_open_calls = 0;
        }

        match self.state {
            CircuitState::Open => Verdict::reject(self.state, format!("Circuit breaker is {}", self.state)),
            CircuitState::HalfOpen => {
                if settings.enforce_half_open_limit && self.half_open_calls >= settings.half_open_max_calls {
                    return Verdict::reject(
                        self.state,
                        format!("Circuit breaker is {} and probe limit reached", self.state),
                    );
                }
                self.half_open_calls += 1;
                Verdict::allow(self.state)
            }
            CircuitState::Closed => Verdict::allow(self.state),
        }
    }

    /// Record a successful dispatch
    pub fn record_success(&mut self) {
        match self.state {
            CircuitState::HalfOpen => {
                self.state = CircuitState::Closed;
                self.failure_count = 0;
                self.last_failure_time = None;
                self.next_attempt_time = None;
                self.half_open_calls = 0;
            }
            CircuitState::Closed => self.failure_count = 0,
            CircuitState::Open => {}
        }
    }

    /// Record a failed dispatch, opening the circuit at the threshold
    ///
    /// The failure count is not cleared when probing starts, so a failure
    /// while half-open re-opens the circuit immediately.
    pub fn record_failure(&mut self, settings: &BreakerSettings, now_ms: u64) {
        self.failure_count = self.failure_count.saturating_add(1);
        self.last_failure_time = Some(now_ms);

        if self.failure_count >= settings.failure_threshold {
            let timeout = u64::try_from(settings.open_timeout.as_millis()).unwrap_or(u64::MAX);
            self.state = CircuitState::Open;
            self.next_attempt_time = Some(now_ms.saturating_add(timeout));
        }
    }

    /// Hand back a half-open probe slot whose call ended without an outcome
    ///
    /// Does nothing once the probe's outcome has moved the circuit out of
    /// half-open.
    pub const fn release_probe(&mut self) {
        if matches!(self.state, CircuitState::HalfOpen) {
            self.half_open_calls = self.half_open_calls.saturating_sub(1);
        }
    }

    /// Return to the zero value regardless of the current state
    pub fn reset(&mut self) {
        *self = Self::new(std::mem::take(&mut self.provider));
    }
}
