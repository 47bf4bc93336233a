// ABOUTME: Error types for canary task start, verification and stop.
// ABOUTME: Every variant names the resource and last observed state involved.

use std::time::Duration;

use crate::client::ClientError;
use crate::types::{TargetHealthState, TaskArn, TaskStatus};
use crate::wait::WaitError;

/// Errors raised by a canary task.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TaskError {
    #[error("failed to launch canary task: {0}")]
    Launch(#[source] ClientError),

    #[error("canary task has not been started")]
    NotStarted,

    #[error("task {task} is {status}: {reason}")]
    NotRunning {
        task: TaskArn,
        status: TaskStatus,
        reason: String,
    },

    #[error("task {0} is not reported by the scheduler")]
    TaskNotFound(TaskArn),

    #[error("container(s) {containers} of task {task} not healthy after {}s", .after.as_secs())]
    ContainerHealthTimeout {
        task: TaskArn,
        containers: String,
        after: Duration,
    },

    #[error("container {container} not found in task definition {task_definition}")]
    ContainerNotFound {
        container: String,
        task_definition: String,
    },

    #[error("no private address for task {task}: {detail}")]
    AddressUnavailable { task: TaskArn, detail: String },

    #[error("canary target {target_id}:{port} in {target_group} is {state}{}", reason_suffix(.reason))]
    TargetUnhealthy {
        target_group: String,
        target_id: String,
        port: u16,
        state: TargetHealthState,
        reason: Option<String>,
    },

    #[error("canary target {target_id}:{port} is not registered in {target_group}")]
    TargetNotRegistered {
        target_group: String,
        target_id: String,
        port: u16,
    },

    #[error(
        "canary target {target_id}:{port} in {target_group} not healthy after {}s (last state: {last})",
        .after.as_secs()
    )]
    TargetHealthTimeout {
        target_group: String,
        target_id: String,
        port: u16,
        last: String,
        after: Duration,
    },

    #[error("instance {instance_id} not discoverable as healthy in {service} after {}s", .after.as_secs())]
    InstanceNotDiscoverable {
        service: String,
        instance_id: String,
        after: Duration,
    },

    #[error(transparent)]
    Wait(#[from] WaitError),

    #[error(transparent)]
    Client(#[from] ClientError),
}

fn reason_suffix(reason: &Option<String>) -> String {
    reason
        .as_deref()
        .map(|r| format!(" ({r})"))
        .unwrap_or_default()
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskErrorKind {
    /// The control plane refused to launch the task.
    Launch,
    /// The task stopped or left the running state.
    TaskStopped,
    /// A task, container or target never reached the required state in time.
    Timeout,
    /// A registered target reported a failing state.
    Unhealthy,
    /// The control plane reported something inconsistent with what was just done.
    Inconsistent,
    /// The task definition does not match what the service expects.
    Precondition,
    /// The wait was cancelled.
    Cancelled,
    /// A control-plane call failed.
    ControlPlane,
}

impl TaskError {
    pub fn kind(&self) -> TaskErrorKind {
        match self {
            TaskError::Launch(_) => TaskErrorKind::Launch,
            TaskError::NotRunning { .. } => TaskErrorKind::TaskStopped,
            TaskError::ContainerHealthTimeout { .. }
            | TaskError::TargetHealthTimeout { .. }
            | TaskError::InstanceNotDiscoverable { .. } => TaskErrorKind::Timeout,
            TaskError::TargetUnhealthy { .. } => TaskErrorKind::Unhealthy,
            TaskError::NotStarted
            | TaskError::TaskNotFound(_)
            | TaskError::AddressUnavailable { .. }
            | TaskError::TargetNotRegistered { .. } => TaskErrorKind::Inconsistent,
            TaskError::ContainerNotFound { .. } => TaskErrorKind::Precondition,
            TaskError::Wait(wait) => match wait {
                WaitError::Cancelled => TaskErrorKind::Cancelled,
                WaitError::Timeout { .. } => TaskErrorKind::Timeout,
                WaitError::TaskStopped { .. } => TaskErrorKind::TaskStopped,
                WaitError::ServiceNotFound(_) | WaitError::ServiceInactive(_) => {
                    TaskErrorKind::Inconsistent
                }
                WaitError::Client(_) => TaskErrorKind::ControlPlane,
            },
            TaskError::Client(_) => TaskErrorKind::ControlPlane,
        }
    }
}
