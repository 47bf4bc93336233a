// ABOUTME: Full replacement of a live service through a temporary transit service.
// ABOUTME: Capacity moves old -> transit -> final, each step confirmed before the next.

use snafu::{OptionExt, ResultExt, Snafu};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::client::{ClientError, CreateServiceRequest, UpdateServiceRequest};
use crate::deps::Deps;
use crate::timeout::Phase;
use crate::types::{Service, ServiceDefinition, ServiceName, TaskDefinition};
use crate::wait::WaitError;

/// One step of the transition, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecreateStep {
    CreateTransit,
    ScaleTransit,
    DrainOld,
    DeleteOld,
    CreateFinal,
    ScaleFinal,
    DrainTransit,
    DeleteTransit,
}

impl fmt::Display for RecreateStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecreateStep::CreateTransit => "create transit service",
            RecreateStep::ScaleTransit => "scale up transit service",
            RecreateStep::DrainOld => "scale down old service",
            RecreateStep::DeleteOld => "delete old service",
            RecreateStep::CreateFinal => "create final service",
            RecreateStep::ScaleFinal => "scale up final service",
            RecreateStep::DrainTransit => "scale down transit service",
            RecreateStep::DeleteTransit => "delete transit service",
        };
        f.write_str(s)
    }
}

/// A completed step: which service changed and the desired count it settled
/// at (zero for deleted services).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionStep {
    pub step: RecreateStep,
    pub service: ServiceName,
    pub desired_count: u32,
}

#[derive(Debug, Clone)]
pub struct RecreateResult {
    /// The final service, stable at the original desired count.
    pub service: Service,
    pub steps: Vec<TransitionStep>,
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RecreateError {
    #[snafu(display("failed to describe service {service}: {source}"))]
    Describe {
        service: ServiceName,
        source: ClientError,
    },

    #[snafu(display("service {service} does not exist; create it instead of recreating"))]
    NotFound { service: ServiceName },

    #[snafu(display("service {service} is inactive; create it instead of recreating"))]
    Inactive { service: ServiceName },

    #[snafu(display("{step} failed for {service}: {source}"))]
    Mutate {
        step: RecreateStep,
        service: ServiceName,
        source: ClientError,
    },

    #[snafu(display("{step}: {service} did not settle: {source}"))]
    Settle {
        step: RecreateStep,
        service: ServiceName,
        source: WaitError,
    },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecreateErrorKind {
    /// The service is not in a state that can be recreated.
    Precondition,
    /// A control-plane call failed.
    ControlPlane,
    /// A service never reached the state a step waits for.
    Timeout,
    /// The transition was cancelled.
    Cancelled,
}

impl RecreateError {
    pub fn kind(&self) -> RecreateErrorKind {
        match self {
            RecreateError::NotFound { .. } | RecreateError::Inactive { .. } => {
                RecreateErrorKind::Precondition
            }
            RecreateError::Describe { .. } | RecreateError::Mutate { .. } => {
                RecreateErrorKind::ControlPlane
            }
            RecreateError::Settle { source, .. } => match source {
                WaitError::Cancelled => RecreateErrorKind::Cancelled,
                WaitError::Client(_) => RecreateErrorKind::ControlPlane,
                _ => RecreateErrorKind::Timeout,
            },
        }
    }

    /// The step that failed, if the transition had begun.
    pub fn step(&self) -> Option<RecreateStep> {
        match self {
            RecreateError::Mutate { step, .. } | RecreateError::Settle { step, .. } => Some(*step),
            _ => None,
        }
    }
}

/// Replaces the configured service with one created from `definition`.
///
/// Nothing is rolled back on failure: the services are left as the last
/// completed step put them, and [`RecreateEngine::steps`] says how far it got.
#[derive(Debug)]
pub struct RecreateEngine {
    deps: Arc<Deps>,
    task_definition: Arc<TaskDefinition>,
    definition: ServiceDefinition,
    steps: Vec<TransitionStep>,
}

impl RecreateEngine {
    pub fn new(
        deps: Arc<Deps>,
        task_definition: Arc<TaskDefinition>,
        definition: ServiceDefinition,
    ) -> Self {
        Self {
            deps,
            task_definition,
            definition,
            steps: Vec::new(),
        }
    }

    /// Steps completed so far.
    pub fn steps(&self) -> &[TransitionStep] {
        &self.steps
    }

    pub async fn recreate(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<RecreateResult, RecreateError> {
        self.steps.clear();
        let old_name = self.deps.service().clone();
        let old = self
            .deps
            .clients
            .cluster
            .describe_service(self.deps.cluster(), &old_name)
            .await
            .context(DescribeSnafu {
                service: old_name.clone(),
            })?
            .context(NotFoundSnafu {
                service: old_name.clone(),
            })?;
        if old.is_inactive() {
            return InactiveSnafu { service: old_name }.fail();
        }

        let desired = old.desired_count;
        let suffix = self.deps.clock.now().format("%Y%m%d%H%M%S").to_string();
        let transit = old_name.transit(&suffix);
        tracing::info!(
            service = %old_name,
            transit = %transit,
            desired,
            "recreating service through transit"
        );

        self.create(cancel, RecreateStep::CreateTransit, &transit).await?;
        self.scale(cancel, RecreateStep::ScaleTransit, &transit, desired).await?;
        self.scale(cancel, RecreateStep::DrainOld, &old_name, 0).await?;
        self.delete(cancel, RecreateStep::DeleteOld, &old_name).await?;
        self.create(cancel, RecreateStep::CreateFinal, &old_name).await?;
        let service = self
            .scale(cancel, RecreateStep::ScaleFinal, &old_name, desired)
            .await?;
        self.scale(cancel, RecreateStep::DrainTransit, &transit, 0).await?;
        self.delete(cancel, RecreateStep::DeleteTransit, &transit).await?;

        tracing::info!(service = %old_name, "service recreated");
        Ok(RecreateResult {
            service,
            steps: self.steps.clone(),
        })
    }

    async fn create(
        &mut self,
        cancel: &CancellationToken,
        step: RecreateStep,
        name: &ServiceName,
    ) -> Result<Service, RecreateError> {
        let mut definition = self.definition.clone();
        definition.service_name = name.clone();
        definition.desired_count = 1;
        let request = CreateServiceRequest {
            cluster: self.deps.cluster().to_string(),
            task_definition: self.task_definition.arn.clone(),
            definition,
        };
        self.deps
            .clients
            .cluster
            .create_service(&request)
            .await
            .context(MutateSnafu {
                step,
                service: name.clone(),
            })?;
        self.settle(cancel, step, name, 1).await
    }

    async fn scale(
        &mut self,
        cancel: &CancellationToken,
        step: RecreateStep,
        name: &ServiceName,
        desired_count: u32,
    ) -> Result<Service, RecreateError> {
        let request =
            UpdateServiceRequest::new(self.deps.cluster(), name.clone()).desired_count(desired_count);
        self.deps
            .clients
            .cluster
            .update_service(&request)
            .await
            .context(MutateSnafu {
                step,
                service: name.clone(),
            })?;
        self.settle(cancel, step, name, desired_count).await
    }

    async fn delete(
        &mut self,
        cancel: &CancellationToken,
        step: RecreateStep,
        name: &ServiceName,
    ) -> Result<(), RecreateError> {
        self.deps
            .clients
            .cluster
            .delete_service(self.deps.cluster(), name)
            .await
            .context(MutateSnafu {
                step,
                service: name.clone(),
            })?;
        self.deps
            .waiter(cancel)
            .service_inactive(name, self.deps.timeouts().resolve(Phase::ServiceStable))
            .await
            .context(SettleSnafu {
                step,
                service: name.clone(),
            })?;
        self.record(step, name, 0);
        Ok(())
    }

    async fn settle(
        &mut self,
        cancel: &CancellationToken,
        step: RecreateStep,
        name: &ServiceName,
        desired_count: u32,
    ) -> Result<Service, RecreateError> {
        let service = self
            .deps
            .waiter(cancel)
            .service_stable(name, self.deps.timeouts().resolve(Phase::ServiceStable))
            .await
            .context(SettleSnafu {
                step,
                service: name.clone(),
            })?;
        self.record(step, name, desired_count);
        Ok(service)
    }

    fn record(&mut self, step: RecreateStep, service: &ServiceName, desired_count: u32) {
        tracing::info!(step = %step, service = %service, desired_count, "transition step complete");
        self.steps.push(TransitionStep {
            step,
            service: service.clone(),
            desired_count,
        });
    }
}
