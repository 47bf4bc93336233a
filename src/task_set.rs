// ABOUTME: Coordinates the canary tasks of one rollout as a unit.
// ABOUTME: Sequential start, concurrent wait and concurrent best-effort cleanup.

use futures::stream::{FuturesUnordered, StreamExt};
use nonempty::NonEmpty;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::deps::Deps;
use crate::diagnostics::Warning;
use crate::task::{
    CanaryTask, CanaryTaskHandle, LaunchSpec, LoadBalancedTask, RegistryTask, StandaloneTask,
    TaskError,
};
use crate::types::{Attachments, TaskDefinition};

/// The canary tasks verifying one task definition.
#[derive(Debug)]
pub struct TaskSet {
    tasks: NonEmpty<Box<dyn CanaryTask>>,
}

impl TaskSet {
    /// One load-balanced task per load balancer; failing that, one registry
    /// task per service registry; failing that, a single standalone task.
    pub fn new(
        deps: Arc<Deps>,
        task_definition: Arc<TaskDefinition>,
        attachments: &Attachments,
    ) -> Self {
        let spec = LaunchSpec::canary(&deps, task_definition, attachments);

        let tasks: Vec<Box<dyn CanaryTask>> = if !attachments.load_balancers.is_empty() {
            attachments
                .load_balancers
                .iter()
                .map(|lb| {
                    Box::new(LoadBalancedTask::new(
                        Arc::clone(&deps),
                        spec.clone(),
                        lb.clone(),
                    )) as Box<dyn CanaryTask>
                })
                .collect()
        } else {
            attachments
                .service_registries
                .iter()
                .map(|registry| {
                    Box::new(RegistryTask::new(
                        Arc::clone(&deps),
                        spec.clone(),
                        registry.clone(),
                    )) as Box<dyn CanaryTask>
                })
                .collect()
        };

        let tasks = NonEmpty::from_vec(tasks).unwrap_or_else(|| {
            NonEmpty::new(Box::new(StandaloneTask::new(Arc::clone(&deps), spec)) as Box<dyn CanaryTask>)
        });
        tracing::debug!(tasks = tasks.len(), "built canary task set");
        Self { tasks }
    }

    /// Wrap tasks built elsewhere.
    pub fn from_tasks(tasks: NonEmpty<Box<dyn CanaryTask>>) -> Self {
        Self { tasks }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Always false: a set holds at least one task.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn handles(&self) -> Vec<&CanaryTaskHandle> {
        self.tasks.iter().map(|t| t.handle()).collect()
    }

    /// Start tasks one after another, stopping at the first failure.
    pub async fn start(&mut self, cancel: &CancellationToken) -> Result<(), TaskError> {
        for task in self.tasks.iter_mut() {
            task.start(cancel).await?;
        }
        Ok(())
    }

    /// Wait on every task concurrently. All waits run to completion; the
    /// first failure to complete is returned.
    pub async fn wait(&mut self, cancel: &CancellationToken) -> Result<(), TaskError> {
        let mut waits: FuturesUnordered<_> =
            self.tasks.iter_mut().map(|task| task.wait(cancel)).collect();

        let mut first_error = None;
        while let Some(result) = waits.next().await {
            if let Err(e) = result
                && first_error.is_none()
            {
                first_error = Some(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    pub async fn exec(&mut self, cancel: &CancellationToken) -> Result<(), TaskError> {
        self.start(cancel).await?;
        self.wait(cancel).await
    }

    /// Stop every task concurrently. Every stop runs whatever the others do;
    /// the first failure is returned and the rest are logged.
    pub async fn cleanup(&mut self, cancel: &CancellationToken) -> Result<(), TaskError> {
        let mut stops: FuturesUnordered<_> =
            self.tasks.iter_mut().map(|task| task.stop(cancel)).collect();

        let mut first_error = None;
        while let Some(result) = stops.next().await {
            if let Err(e) = result {
                if first_error.is_none() {
                    first_error = Some(e);
                } else {
                    tracing::warn!(error = %e, "failed to stop canary task");
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Best-effort failures recorded by the tasks during cleanup.
    pub fn warnings(&self) -> Vec<Warning> {
        self.tasks
            .iter()
            .flat_map(|t| t.warnings().iter().cloned())
            .collect()
    }
}
