// ABOUTME: Canary task contract and its three verification strategies.
// ABOUTME: Variants compose the shared TaskBase and own only their verification state.

mod base;
mod error;
mod load_balanced;
mod registry;
mod standalone;
mod target;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::diagnostics::Warning;

pub use base::{LAUNCH_GRACE, LaunchSpec, NetworkIdentity, TaskBase};
pub use error::{TaskError, TaskErrorKind};
pub use load_balanced::{
    DEFAULT_DEREGISTRATION_DELAY, DEREGISTRATION_MARGIN, HealthProgress, LoadBalancedTask,
    MAX_UNUSED_READS, TargetHealthTracker,
};
pub use registry::{RegisteredInstance, RegistryTask};
pub use standalone::StandaloneTask;
pub use target::{CanaryTarget, CanaryTaskHandle, LaunchKind, TaskPhase};

/// A temporary task that must prove a task definition before the live
/// service is switched to it.
///
/// `start` runs once and precedes `wait`. `stop` is always called, including
/// after a failed or skipped `start`, and must then be a no-op.
#[async_trait]
pub trait CanaryTask: Send + std::fmt::Debug {
    /// Launch the task.
    async fn start(&mut self, cancel: &CancellationToken) -> Result<(), TaskError>;

    /// Wait until the task is running, healthy and verified.
    async fn wait(&mut self, cancel: &CancellationToken) -> Result<(), TaskError>;

    /// Release verification resources and stop the task.
    async fn stop(&mut self, cancel: &CancellationToken) -> Result<(), TaskError>;

    fn handle(&self) -> &CanaryTaskHandle;

    fn phase(&self) -> TaskPhase {
        self.handle().phase
    }

    /// Best-effort cleanup failures recorded by `stop`.
    fn warnings(&self) -> &[Warning] {
        &[]
    }
}
