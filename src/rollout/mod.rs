// ABOUTME: Canary-gated rollout of a task definition onto a live service.
// ABOUTME: Verify canaries, update the service, wait for stability, always clean up.

mod error;

pub use error::{RolloutError, RolloutErrorKind};

use futures::FutureExt;
use snafu::{OptionExt, ResultExt};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::client::UpdateServiceRequest;
use crate::deps::Deps;
use crate::diagnostics::{Diagnostics, Warning};
use crate::task_set::TaskSet;
use crate::timeout::Phase;
use crate::types::{Attachments, ServiceDefinition, TaskDefinition};
use error::{
    DescribeServiceSnafu, MissingServiceDefinitionSnafu, ServiceInactiveSnafu,
    ServiceNotFoundSnafu, ServiceStableSnafu, StartCanarySnafu, UpdateServiceSnafu,
    VerifyCanarySnafu,
};

/// Options for one rollout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RollOutInput {
    /// Verify against the pending service definition's attachments and apply
    /// its configuration along with the task definition.
    pub update_service: bool,
}

/// Rolls a task definition out to the configured service.
#[derive(Debug)]
pub struct RolloutExecutor {
    deps: Arc<Deps>,
    task_definition: Arc<TaskDefinition>,
    pending: Option<ServiceDefinition>,
    service_updated: bool,
    diagnostics: Diagnostics,
}

impl RolloutExecutor {
    pub fn new(deps: Arc<Deps>, task_definition: Arc<TaskDefinition>) -> Self {
        Self {
            deps,
            task_definition,
            pending: None,
            service_updated: false,
            diagnostics: Diagnostics::default(),
        }
    }

    /// Service definition applied when rolling out with `update_service`.
    pub fn with_service_definition(mut self, definition: ServiceDefinition) -> Self {
        self.pending = Some(definition);
        self
    }

    /// Whether the live service has been mutated. Once true it stays true,
    /// even if a later step fails.
    pub fn service_updated(&self) -> bool {
        self.service_updated
    }

    /// Non-fatal cleanup failures from the last rollout.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Verify the task definition with canary tasks and switch the service to
    /// it. Canary tasks are stopped on every path once they exist.
    pub async fn roll_out(
        &mut self,
        cancel: &CancellationToken,
        input: RollOutInput,
    ) -> Result<(), RolloutError> {
        self.diagnostics = Diagnostics::default();
        let attachments = self.resolve_attachments(input).await?;
        let mut task_set = TaskSet::new(
            Arc::clone(&self.deps),
            Arc::clone(&self.task_definition),
            &attachments,
        );
        tracing::info!(
            service = %self.deps.service(),
            task_definition = %self.task_definition.arn,
            canaries = task_set.len(),
            "starting rollout"
        );

        let outcome = AssertUnwindSafe(self.verify_and_update(&mut task_set, cancel, input))
            .catch_unwind()
            .await;
        self.cleanup(&mut task_set).await;
        let result = match outcome {
            Ok(result) => result,
            Err(panic) => {
                tracing::error!(service = %self.deps.service(), "rollout panicked, canaries stopped");
                std::panic::resume_unwind(panic)
            }
        };

        match &result {
            Ok(()) => tracing::info!(service = %self.deps.service(), "rollout complete"),
            Err(e) => tracing::warn!(
                service = %self.deps.service(),
                service_updated = self.service_updated,
                error = %e,
                "rollout failed"
            ),
        }
        result
    }

    async fn resolve_attachments(&self, input: RollOutInput) -> Result<Attachments, RolloutError> {
        if input.update_service {
            let pending = self
                .pending
                .as_ref()
                .context(MissingServiceDefinitionSnafu)?;
            return Ok(pending.attachments());
        }

        let service = self.deps.service();
        let current = self
            .deps
            .clients
            .cluster
            .describe_service(self.deps.cluster(), service)
            .await
            .context(DescribeServiceSnafu {
                service: service.clone(),
            })?
            .context(ServiceNotFoundSnafu {
                service: service.clone(),
            })?;
        if current.is_inactive() {
            return ServiceInactiveSnafu {
                service: service.clone(),
            }
            .fail();
        }
        Ok(current.attachments())
    }

    async fn verify_and_update(
        &mut self,
        task_set: &mut TaskSet,
        cancel: &CancellationToken,
        input: RollOutInput,
    ) -> Result<(), RolloutError> {
        task_set.start(cancel).await.context(StartCanarySnafu)?;
        task_set.wait(cancel).await.context(VerifyCanarySnafu)?;
        tracing::info!(service = %self.deps.service(), "canary verification passed");

        let service = self.deps.service().clone();
        let mut request = UpdateServiceRequest::new(self.deps.cluster(), service.clone())
            .task_definition(self.task_definition.arn.clone());
        if input.update_service
            && let Some(pending) = &self.pending
        {
            request = request.configuration_from(pending);
        }
        self.deps
            .clients
            .cluster
            .update_service(&request)
            .await
            .context(UpdateServiceSnafu {
                service: service.clone(),
            })?;
        self.service_updated = true;
        tracing::info!(service = %service, "service updated");

        self.deps
            .waiter(cancel)
            .service_stable(&service, self.deps.timeouts().resolve(Phase::ServiceStable))
            .await
            .context(ServiceStableSnafu {
                service: service.clone(),
            })?;
        Ok(())
    }

    /// Stop every canary under its own token and time budget, independent of
    /// the rollout's cancellation.
    async fn cleanup(&mut self, task_set: &mut TaskSet) {
        let cancel = CancellationToken::new();
        let budget = self.deps.config.canary.cleanup_timeout;

        match tokio::time::timeout(budget, task_set.cleanup(&cancel)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => self
                .diagnostics
                .warn(Warning::task_stop(format!("failed to stop canary task: {e}"))),
            Err(_) => self.diagnostics.warn(Warning::cleanup_timeout(format!(
                "canary cleanup did not finish within {}s",
                budget.as_secs()
            ))),
        }
        self.diagnostics.absorb(&task_set.warnings());
    }
}
