// ABOUTME: Canary task with no external verification target.
// ABOUTME: Passes the shared gates, idles for the canary-idle budget, then re-checks it still runs.

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::base::{LaunchSpec, TaskBase};
use super::error::TaskError;
use super::target::{CanaryTaskHandle, TaskPhase};
use super::CanaryTask;
use crate::deps::Deps;
use crate::timeout::Phase;
use crate::wait::{Deadline, HEALTH_POLL_INTERVAL, pause};

#[derive(Debug)]
pub struct StandaloneTask {
    base: TaskBase,
}

impl StandaloneTask {
    pub fn new(deps: Arc<Deps>, spec: LaunchSpec) -> Self {
        Self {
            base: TaskBase::new(deps, spec),
        }
    }

    async fn verify(&mut self, cancel: &CancellationToken) -> Result<(), TaskError> {
        self.base.wait_running(cancel).await?;
        self.base.wait_container_health(cancel).await?;
        self.base.set_phase(TaskPhase::Verifying);

        let deps = Arc::clone(self.base.deps());
        let idle = deps.timeouts().resolve(Phase::CanaryIdle);
        let arn = self.base.task_arn()?;
        tracing::info!(
            task = %arn,
            idle_secs = idle.as_secs(),
            "idling canary task before final check"
        );

        // Idle in poll-sized slices.
        let deadline = Deadline::start(deps.clock.as_ref(), idle);
        while !deadline.expired() {
            pause(
                deps.clock.as_ref(),
                cancel,
                deadline.next_interval(HEALTH_POLL_INTERVAL),
            )
            .await?;
        }

        self.base.ensure_running(cancel).await?;
        Ok(())
    }
}

#[async_trait]
impl CanaryTask for StandaloneTask {
    async fn start(&mut self, cancel: &CancellationToken) -> Result<(), TaskError> {
        self.base.start(cancel).await
    }

    async fn wait(&mut self, cancel: &CancellationToken) -> Result<(), TaskError> {
        let result = self.verify(cancel).await;
        self.base.settle(result, TaskPhase::Verified)
    }

    async fn stop(&mut self, cancel: &CancellationToken) -> Result<(), TaskError> {
        self.base.stop_task(cancel).await
    }

    fn handle(&self) -> &CanaryTaskHandle {
        self.base.handle()
    }
}
