// ABOUTME: Create path for a service that does not exist yet.
// ABOUTME: Creates the service at its desired count and waits for it to become stable.

use snafu::{ResultExt, Snafu};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::client::{ClientError, CreateServiceRequest};
use crate::deps::Deps;
use crate::timeout::Phase;
use crate::types::{Service, ServiceDefinition, ServiceName, TaskDefinition};
use crate::wait::WaitError;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum UpError {
    #[snafu(display("failed to describe service {service}: {source}"))]
    Lookup {
        service: ServiceName,
        source: ClientError,
    },

    #[snafu(display("service {service} already exists; roll out to it instead"))]
    AlreadyExists { service: ServiceName },

    #[snafu(display("failed to create service {service}: {source}"))]
    Create {
        service: ServiceName,
        source: ClientError,
    },

    #[snafu(display("service {service} did not become stable after creation: {source}"))]
    Stabilize {
        service: ServiceName,
        source: WaitError,
    },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpErrorKind {
    Precondition,
    ControlPlane,
    Timeout,
    Cancelled,
}

impl UpError {
    pub fn kind(&self) -> UpErrorKind {
        match self {
            UpError::AlreadyExists { .. } => UpErrorKind::Precondition,
            UpError::Lookup { .. } | UpError::Create { .. } => UpErrorKind::ControlPlane,
            UpError::Stabilize { source, .. } if source.is_cancelled() => UpErrorKind::Cancelled,
            UpError::Stabilize { .. } => UpErrorKind::Timeout,
        }
    }
}

/// Creates the service described by a service definition.
#[derive(Debug)]
pub struct ServiceCreator {
    deps: Arc<Deps>,
    task_definition: Arc<TaskDefinition>,
    definition: ServiceDefinition,
}

impl ServiceCreator {
    pub fn new(
        deps: Arc<Deps>,
        task_definition: Arc<TaskDefinition>,
        definition: ServiceDefinition,
    ) -> Self {
        Self {
            deps,
            task_definition,
            definition,
        }
    }

    /// Create the service. An existing, non-inactive service is left alone.
    pub async fn up(&self, cancel: &CancellationToken) -> Result<Service, UpError> {
        let name = &self.definition.service_name;
        let existing = self
            .deps
            .clients
            .cluster
            .describe_service(self.deps.cluster(), name)
            .await
            .context(LookupSnafu {
                service: name.clone(),
            })?;
        if existing.is_some_and(|s| !s.is_inactive()) {
            return AlreadyExistsSnafu {
                service: name.clone(),
            }
            .fail();
        }

        let request = CreateServiceRequest {
            cluster: self.deps.cluster().to_string(),
            task_definition: self.task_definition.arn.clone(),
            definition: self.definition.clone(),
        };
        self.deps
            .clients
            .cluster
            .create_service(&request)
            .await
            .context(CreateSnafu {
                service: name.clone(),
            })?;
        tracing::info!(
            service = %name,
            desired_count = self.definition.desired_count,
            "service created"
        );

        let service = self
            .deps
            .waiter(cancel)
            .service_stable(name, self.deps.timeouts().resolve(Phase::ServiceStable))
            .await
            .context(StabilizeSnafu {
                service: name.clone(),
            })?;
        tracing::info!(service = %name, "service is stable");
        Ok(service)
    }
}
