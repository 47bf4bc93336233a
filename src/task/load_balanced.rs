// ABOUTME: Canary task verified through a load balancer target group.
// ABOUTME: Registers the running task as a target and polls its health until healthy or failed.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::base::{LaunchSpec, TaskBase};
use super::error::TaskError;
use super::target::{CanaryTarget, CanaryTaskHandle, TaskPhase};
use super::CanaryTask;
use crate::deps::Deps;
use crate::diagnostics::Warning;
use crate::timeout::Phase;
use crate::types::{LoadBalancer, TargetHealth, TargetHealthState};
use crate::wait::{Deadline, HEALTH_POLL_INTERVAL, WaitError, pause};

/// Consecutive `unused` reads tolerated before the target is failed.
pub const MAX_UNUSED_READS: u32 = 5;

/// Used when the target group does not report its deregistration delay.
pub const DEFAULT_DEREGISTRATION_DELAY: Duration = Duration::from_secs(300);

/// Added to the deregistration delay when waiting for a target to leave.
pub const DEREGISTRATION_MARGIN: Duration = Duration::from_secs(60);

/// Verdict on one target health read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthProgress {
    Healthy,
    Pending,
    Failed {
        state: TargetHealthState,
        reason: Option<String>,
    },
    NotRegistered,
}

/// Classifies successive target health reads.
#[derive(Debug, Default)]
pub struct TargetHealthTracker {
    unused_reads: u32,
    last: Option<TargetHealthState>,
}

impl TargetHealthTracker {
    pub fn observe(&mut self, health: Option<&TargetHealth>) -> HealthProgress {
        let Some(health) = health else {
            self.last = None;
            return HealthProgress::NotRegistered;
        };
        self.last = Some(health.state);

        match health.state {
            TargetHealthState::Healthy => HealthProgress::Healthy,
            TargetHealthState::Initial => {
                self.unused_reads = 0;
                HealthProgress::Pending
            }
            // A fresh registration can briefly read unused.
            TargetHealthState::Unused => {
                self.unused_reads += 1;
                if self.unused_reads >= MAX_UNUSED_READS {
                    HealthProgress::Failed {
                        state: health.state,
                        reason: health.reason.clone(),
                    }
                } else {
                    HealthProgress::Pending
                }
            }
            state => HealthProgress::Failed {
                state,
                reason: health.reason.clone(),
            },
        }
    }

    pub fn last(&self) -> Option<TargetHealthState> {
        self.last
    }

    pub fn unused_reads(&self) -> u32 {
        self.unused_reads
    }
}

#[derive(Debug)]
pub struct LoadBalancedTask {
    base: TaskBase,
    load_balancer: LoadBalancer,
    target: Option<CanaryTarget>,
}

impl LoadBalancedTask {
    pub fn new(deps: Arc<Deps>, spec: LaunchSpec, load_balancer: LoadBalancer) -> Self {
        Self {
            base: TaskBase::new(deps, spec),
            load_balancer,
            target: None,
        }
    }

    /// The registered target, once registration succeeded.
    pub fn target(&self) -> Option<&CanaryTarget> {
        self.target.as_ref()
    }

    async fn verify(&mut self, cancel: &CancellationToken) -> Result<(), TaskError> {
        let task = self.base.wait_running(cancel).await?;
        self.base.wait_container_health(cancel).await?;
        self.base.set_phase(TaskPhase::Verifying);

        let port = self.base.published_port(
            &task,
            &self.load_balancer.container_name,
            self.load_balancer.container_port,
        )?;
        let identity = self.base.network_identity(&task).await?;
        let target = CanaryTarget {
            target_group_arn: self.load_balancer.target_group_arn.clone(),
            target_id: identity.private_ip,
            target_port: port,
            availability_zone: identity.availability_zone,
        };

        let deps = Arc::clone(self.base.deps());
        deps.clients
            .load_balancer
            .register_target(&target.target_group_arn, &target.description())
            .await?;
        tracing::info!(task = %task.task_arn, target = %target, "registered canary target");
        let target = self.target.insert(target);

        wait_target_healthy(&deps, target, cancel).await
    }

    /// Deregister the target and wait for it to leave the group. Failures are
    /// recorded as warnings and never block the task stop.
    async fn deregister(&mut self, cancel: &CancellationToken) {
        let Some(target) = self.target.take() else {
            return;
        };
        let deps = Arc::clone(self.base.deps());
        let client = &deps.clients.load_balancer;

        let delay = match client.deregistration_delay(&target.target_group_arn).await {
            Ok(delay) => delay.unwrap_or(DEFAULT_DEREGISTRATION_DELAY),
            Err(e) => {
                tracing::debug!(target = %target, error = %e, "using default deregistration delay");
                DEFAULT_DEREGISTRATION_DELAY
            }
        };

        if let Err(e) = client
            .deregister_target(&target.target_group_arn, &target.description())
            .await
        {
            self.base.warn(Warning::target_deregistration(format!(
                "failed to deregister canary target {target}: {e}"
            )));
            return;
        }
        tracing::info!(target = %target, "deregistering canary target");

        if let Err(e) = wait_target_gone(&deps, &target, delay + DEREGISTRATION_MARGIN, cancel).await {
            self.base.warn(Warning::target_deregistration(format!(
                "canary target {target} not confirmed deregistered: {e}"
            )));
        }
    }
}

async fn wait_target_healthy(
    deps: &Deps,
    target: &CanaryTarget,
    cancel: &CancellationToken,
) -> Result<(), TaskError> {
    let deadline = Deadline::start(
        deps.clock.as_ref(),
        deps.timeouts().resolve(Phase::TargetHealthCheck),
    );
    let mut tracker = TargetHealthTracker::default();
    loop {
        let health = deps
            .clients
            .load_balancer
            .describe_target_health(&target.target_group_arn, &target.description())
            .await?;

        match tracker.observe(health.as_ref()) {
            HealthProgress::Healthy => {
                tracing::info!(target = %target, "canary target is healthy");
                return Ok(());
            }
            HealthProgress::Failed { state, reason } => {
                return Err(TaskError::TargetUnhealthy {
                    target_group: target.target_group_arn.to_string(),
                    target_id: target.target_id.clone(),
                    port: target.target_port,
                    state,
                    reason,
                });
            }
            HealthProgress::NotRegistered => {
                return Err(TaskError::TargetNotRegistered {
                    target_group: target.target_group_arn.to_string(),
                    target_id: target.target_id.clone(),
                    port: target.target_port,
                });
            }
            HealthProgress::Pending => {}
        }

        if deadline.expired() {
            return Err(TaskError::TargetHealthTimeout {
                target_group: target.target_group_arn.to_string(),
                target_id: target.target_id.clone(),
                port: target.target_port,
                last: tracker
                    .last()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "none".to_string()),
                after: deadline.limit(),
            });
        }
        tracing::debug!(
            target = %target,
            state = ?tracker.last(),
            unused_reads = tracker.unused_reads(),
            "waiting for canary target health"
        );
        pause(
            deps.clock.as_ref(),
            cancel,
            deadline.next_interval(HEALTH_POLL_INTERVAL),
        )
        .await?;
    }
}

/// A target is gone once the group has no record of it or reports it unused.
async fn wait_target_gone(
    deps: &Deps,
    target: &CanaryTarget,
    limit: Duration,
    cancel: &CancellationToken,
) -> Result<(), TaskError> {
    let deadline = Deadline::start(deps.clock.as_ref(), limit);
    loop {
        let health = deps
            .clients
            .load_balancer
            .describe_target_health(&target.target_group_arn, &target.description())
            .await?;
        let last = match health {
            None => return Ok(()),
            Some(h) if h.state == TargetHealthState::Unused => return Ok(()),
            Some(h) => h.state.to_string(),
        };
        if deadline.expired() {
            return Err(WaitError::Timeout {
                what: format!("target {target} to deregister"),
                after: limit,
                last,
            }
            .into());
        }
        pause(
            deps.clock.as_ref(),
            cancel,
            deadline.next_interval(HEALTH_POLL_INTERVAL),
        )
        .await?;
    }
}

#[async_trait]
impl CanaryTask for LoadBalancedTask {
    async fn start(&mut self, cancel: &CancellationToken) -> Result<(), TaskError> {
        self.base.start(cancel).await
    }

    async fn wait(&mut self, cancel: &CancellationToken) -> Result<(), TaskError> {
        let result = self.verify(cancel).await;
        self.base.settle(result, TaskPhase::Verified)
    }

    async fn stop(&mut self, cancel: &CancellationToken) -> Result<(), TaskError> {
        self.deregister(cancel).await;
        self.base.stop_task(cancel).await
    }

    fn handle(&self) -> &CanaryTaskHandle {
        self.base.handle()
    }

    fn warnings(&self) -> &[Warning] {
        self.base.warnings()
    }
}
