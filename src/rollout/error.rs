// ABOUTME: Rollout error types with SNAFU pattern.
// ABOUTME: Separates precondition, canary and live-service failures for programmatic handling.

use snafu::Snafu;

use crate::client::ClientError;
use crate::task::{TaskError, TaskErrorKind};
use crate::types::ServiceName;
use crate::wait::WaitError;

/// Errors from rolling a task definition out to a live service.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RolloutError {
    #[snafu(display("failed to describe service {service}: {source}"))]
    DescribeService {
        service: ServiceName,
        source: ClientError,
    },

    #[snafu(display("service {service} does not exist; create it before rolling out"))]
    ServiceNotFound { service: ServiceName },

    #[snafu(display("service {service} is inactive; create it before rolling out"))]
    ServiceInactive { service: ServiceName },

    #[snafu(display("updating the service configuration requires a service definition"))]
    MissingServiceDefinition,

    #[snafu(display("canary task failed to start: {source}"))]
    StartCanary { source: TaskError },

    #[snafu(display("canary verification failed: {source}"))]
    VerifyCanary { source: TaskError },

    #[snafu(display("failed to update service {service}: {source}"))]
    UpdateService {
        service: ServiceName,
        source: ClientError,
    },

    #[snafu(display("service {service} did not become stable after update: {source}"))]
    ServiceStable {
        service: ServiceName,
        source: WaitError,
    },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RolloutErrorKind {
    /// Nothing was mutated; the service or input is not in a state to roll out.
    Precondition,
    /// A control-plane call failed before any canary ran.
    ControlPlane,
    /// A canary task could not be launched.
    CanaryLaunch,
    /// A canary task launched but did not pass verification.
    CanaryVerification,
    /// The live service could not be updated.
    ServiceUpdate,
    /// The live service was updated but did not stabilize.
    ServiceStability,
    /// The rollout was cancelled.
    Cancelled,
}

impl RolloutError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> RolloutErrorKind {
        match self {
            RolloutError::DescribeService { .. } => RolloutErrorKind::ControlPlane,
            RolloutError::ServiceNotFound { .. }
            | RolloutError::ServiceInactive { .. }
            | RolloutError::MissingServiceDefinition => RolloutErrorKind::Precondition,
            RolloutError::StartCanary { source } | RolloutError::VerifyCanary { source }
                if source.kind() == TaskErrorKind::Cancelled =>
            {
                RolloutErrorKind::Cancelled
            }
            RolloutError::StartCanary { .. } => RolloutErrorKind::CanaryLaunch,
            RolloutError::VerifyCanary { .. } => RolloutErrorKind::CanaryVerification,
            RolloutError::UpdateService { .. } => RolloutErrorKind::ServiceUpdate,
            RolloutError::ServiceStable { source, .. } if source.is_cancelled() => {
                RolloutErrorKind::Cancelled
            }
            RolloutError::ServiceStable { .. } => RolloutErrorKind::ServiceStability,
        }
    }

    /// The canary failure behind this error, if any.
    pub fn task_error(&self) -> Option<&TaskError> {
        match self {
            RolloutError::StartCanary { source } | RolloutError::VerifyCanary { source } => {
                Some(source)
            }
            _ => None,
        }
    }
}
