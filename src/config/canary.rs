// ABOUTME: Canary task settings: how canaries are launched and cleaned up.
// ABOUTME: Cleanup has its own time budget, independent of the rollout's cancellation.

use serde::Deserialize;
use std::time::Duration;

use crate::types::{ContainerInstanceArn, LaunchType};

#[derive(Debug, Clone, Deserialize)]
pub struct CanaryConfig {
    /// Pin canary tasks to this container instance instead of launching
    /// them on scheduler-managed capacity.
    #[serde(default)]
    pub instance_arn: Option<ContainerInstanceArn>,

    /// Launch type for on-demand canary tasks.
    #[serde(default)]
    pub launch_type: Option<LaunchType>,

    /// Task group canary tasks are started under.
    #[serde(default = "default_task_group")]
    pub task_group: String,

    #[serde(default = "default_cleanup_timeout", with = "humantime_serde")]
    pub cleanup_timeout: Duration,
}

fn default_task_group() -> String {
    "canary-task".to_string()
}

fn default_cleanup_timeout() -> Duration {
    Duration::from_secs(10 * 60)
}

impl Default for CanaryConfig {
    fn default() -> Self {
        CanaryConfig {
            instance_arn: None,
            launch_type: None,
            task_group: default_task_group(),
            cleanup_timeout: default_cleanup_timeout(),
        }
    }
}
