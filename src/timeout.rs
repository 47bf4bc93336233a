// ABOUTME: Timeout policy for every wait phase of a rollout.
// ABOUTME: Unset or zero phases fall back to a single default duration.

use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Fallback applied when neither the phase nor the default is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// A named wait phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    TaskRunning,
    TaskHealthCheck,
    TaskStopped,
    ServiceStable,
    TargetHealthCheck,
    CanaryIdle,
}

impl Phase {
    pub const ALL: [Phase; 6] = [
        Phase::TaskRunning,
        Phase::TaskHealthCheck,
        Phase::TaskStopped,
        Phase::ServiceStable,
        Phase::TargetHealthCheck,
        Phase::CanaryIdle,
    ];
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::TaskRunning => "task running",
            Phase::TaskHealthCheck => "container health check",
            Phase::TaskStopped => "task stopped",
            Phase::ServiceStable => "service stable",
            Phase::TargetHealthCheck => "target health check",
            Phase::CanaryIdle => "canary idle",
        };
        f.write_str(s)
    }
}

/// Per-phase timeouts. Values are fixed once built; use the `with_*`
/// builders to derive a new policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    #[serde(with = "humantime_serde")]
    default: Duration,
    #[serde(with = "humantime_serde")]
    task_running: Duration,
    #[serde(with = "humantime_serde")]
    task_health_check: Duration,
    #[serde(with = "humantime_serde")]
    task_stopped: Duration,
    #[serde(with = "humantime_serde")]
    service_stable: Duration,
    #[serde(with = "humantime_serde")]
    target_health_check: Duration,
    #[serde(with = "humantime_serde")]
    canary_idle: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl TimeoutConfig {
    /// A policy where every phase resolves to `default`.
    pub fn new(default: Duration) -> Self {
        Self {
            default,
            task_running: Duration::ZERO,
            task_health_check: Duration::ZERO,
            task_stopped: Duration::ZERO,
            service_stable: Duration::ZERO,
            target_health_check: Duration::ZERO,
            canary_idle: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn with_phase(mut self, phase: Phase, duration: Duration) -> Self {
        *self.slot(phase) = duration;
        self
    }

    fn slot(&mut self, phase: Phase) -> &mut Duration {
        match phase {
            Phase::TaskRunning => &mut self.task_running,
            Phase::TaskHealthCheck => &mut self.task_health_check,
            Phase::TaskStopped => &mut self.task_stopped,
            Phase::ServiceStable => &mut self.service_stable,
            Phase::TargetHealthCheck => &mut self.target_health_check,
            Phase::CanaryIdle => &mut self.canary_idle,
        }
    }

    pub fn default_timeout(&self) -> Duration {
        if self.default.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            self.default
        }
    }

    /// The effective duration for `phase`.
    pub fn resolve(&self, phase: Phase) -> Duration {
        let configured = match phase {
            Phase::TaskRunning => self.task_running,
            Phase::TaskHealthCheck => self.task_health_check,
            Phase::TaskStopped => self.task_stopped,
            Phase::ServiceStable => self.service_stable,
            Phase::TargetHealthCheck => self.target_health_check,
            Phase::CanaryIdle => self.canary_idle,
        };
        if configured.is_zero() {
            self.default_timeout()
        } else {
            configured
        }
    }
}
