// ABOUTME: Runs a single ad-hoc task to completion and reports its exit code.
// ABOUTME: Reuses the canary launch path with an optional command override.

use snafu::{ResultExt, Snafu};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::deps::Deps;
use crate::task::{LaunchSpec, TaskBase, TaskError};
use crate::timeout::Phase;
use crate::types::{Attachments, ContainerOverride, TaskArn, TaskDefinition};
use crate::wait::WaitError;

/// Task group ad-hoc tasks are started under.
pub const RUN_TASK_GROUP: &str = "run-once";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunInput {
    /// Container whose exit code is reported.
    pub container: String,
    /// Replaces the container's command when set.
    pub command_override: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunResult {
    pub exit_code: i32,
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RunError {
    #[snafu(display("container {container} not found in task definition {task_definition}"))]
    ContainerNotFound {
        container: String,
        task_definition: String,
    },

    #[snafu(display("task did not start: {source}"))]
    Launch { source: TaskError },

    #[snafu(display("task {task} did not stop: {source}"))]
    WaitStopped { task: TaskArn, source: WaitError },

    #[snafu(display("container {container} of task {task} reported no exit code"))]
    NoExitCode { task: TaskArn, container: String },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunErrorKind {
    Precondition,
    Launch,
    Timeout,
    Cancelled,
    Inconsistent,
}

impl RunError {
    pub fn kind(&self) -> RunErrorKind {
        match self {
            RunError::ContainerNotFound { .. } => RunErrorKind::Precondition,
            RunError::Launch { source } => match source.kind() {
                crate::task::TaskErrorKind::Cancelled => RunErrorKind::Cancelled,
                _ => RunErrorKind::Launch,
            },
            RunError::WaitStopped { source, .. } if source.is_cancelled() => {
                RunErrorKind::Cancelled
            }
            RunError::WaitStopped { .. } => RunErrorKind::Timeout,
            RunError::NoExitCode { .. } => RunErrorKind::Inconsistent,
        }
    }
}

/// Runs one task from a task definition.
#[derive(Debug)]
pub struct Runner {
    deps: Arc<Deps>,
    task_definition: Arc<TaskDefinition>,
    attachments: Attachments,
}

impl Runner {
    /// `attachments` supplies the network configuration and platform version.
    pub fn new(
        deps: Arc<Deps>,
        task_definition: Arc<TaskDefinition>,
        attachments: Attachments,
    ) -> Self {
        Self {
            deps,
            task_definition,
            attachments,
        }
    }

    pub async fn run(
        &self,
        cancel: &CancellationToken,
        input: RunInput,
    ) -> Result<RunResult, RunError> {
        if self.task_definition.container(&input.container).is_none() {
            return ContainerNotFoundSnafu {
                container: input.container,
                task_definition: self.task_definition.arn.to_string(),
            }
            .fail();
        }

        let spec = LaunchSpec {
            task_definition: Arc::clone(&self.task_definition),
            network_configuration: self.attachments.network_configuration.clone(),
            platform_version: self.attachments.platform_version.clone(),
            group: RUN_TASK_GROUP.to_string(),
        };
        let mut base = TaskBase::new(Arc::clone(&self.deps), spec);
        let overrides = input
            .command_override
            .map(|command| {
                vec![ContainerOverride {
                    name: input.container.clone(),
                    command,
                }]
            })
            .unwrap_or_default();

        let arn = base.launch(overrides).await.context(LaunchSnafu)?;
        base.wait_running(cancel).await.context(LaunchSnafu)?;
        tracing::info!(task = %arn, container = %input.container, "waiting for task to finish");

        let stopped = self
            .deps
            .waiter(cancel)
            .task_stopped(&arn, self.deps.timeouts().resolve(Phase::TaskStopped))
            .await
            .context(WaitStoppedSnafu { task: arn.clone() })?;

        let exit_code = stopped
            .as_ref()
            .and_then(|task| task.container(&input.container))
            .and_then(|container| container.exit_code);
        match exit_code {
            Some(exit_code) => {
                tracing::info!(task = %arn, exit_code, "task finished");
                Ok(RunResult { exit_code })
            }
            None => NoExitCodeSnafu {
                task: arn,
                container: input.container,
            }
            .fail(),
        }
    }
}
