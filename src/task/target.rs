// ABOUTME: Verification identity of a running canary and its per-task handle.
// ABOUTME: A target is created once at registration and discarded when the task stops.

use std::fmt;

use crate::types::{ContainerInstanceArn, TargetDescription, TargetGroupArn, TaskArn};

/// The load balancer endpoint a canary task was registered under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanaryTarget {
    pub target_group_arn: TargetGroupArn,
    pub target_id: String,
    pub target_port: u16,
    pub availability_zone: String,
}

impl CanaryTarget {
    pub fn description(&self) -> TargetDescription {
        TargetDescription {
            id: self.target_id.clone(),
            port: self.target_port,
            availability_zone: Some(self.availability_zone.clone()),
        }
    }
}

impl fmt::Display for CanaryTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} ({}) in {}",
            self.target_id, self.target_port, self.availability_zone, self.target_group_arn
        )
    }
}

/// How a canary task is placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchKind {
    /// Scheduler-managed capacity; addressed through its own network interface.
    OnDemand,
    /// Pinned to a container instance; addressed through the host instance.
    Instance(ContainerInstanceArn),
}

/// Lifecycle of one canary task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskPhase {
    Created,
    Starting,
    Running,
    Verifying,
    Verified,
    Failed,
    Stopping,
    Stopped,
}

impl fmt::Display for TaskPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskPhase::Created => "created",
            TaskPhase::Starting => "starting",
            TaskPhase::Running => "running",
            TaskPhase::Verifying => "verifying",
            TaskPhase::Verified => "verified",
            TaskPhase::Failed => "failed",
            TaskPhase::Stopping => "stopping",
            TaskPhase::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// What a canary task knows about itself. Without a task ARN the task was
/// never launched and stopping it is a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanaryTaskHandle {
    pub task_arn: Option<TaskArn>,
    pub launch: LaunchKind,
    pub phase: TaskPhase,
}

impl CanaryTaskHandle {
    pub fn new(launch: LaunchKind) -> Self {
        Self {
            task_arn: None,
            launch,
            phase: TaskPhase::Created,
        }
    }

    pub fn is_started(&self) -> bool {
        self.task_arn.is_some()
    }
}
