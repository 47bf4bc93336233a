// ABOUTME: Canary task verified through a service discovery registry.
// ABOUTME: Registers a discovery instance for the task and waits until it is discoverable as healthy.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::base::{LaunchSpec, NetworkIdentity, TaskBase};
use super::error::TaskError;
use super::target::{CanaryTaskHandle, TaskPhase};
use super::CanaryTask;
use crate::deps::Deps;
use crate::diagnostics::Warning;
use crate::timeout::Phase;
use crate::types::{CustomHealthStatus, HealthStatusFilter, ServiceRegistry, Task};
use crate::wait::{Deadline, HEALTH_POLL_INTERVAL, pause};

const ATTR_IPV4: &str = "AWS_INSTANCE_IPV4";
const ATTR_PORT: &str = "AWS_INSTANCE_PORT";
const ATTR_AZ: &str = "AVAILABILITY_ZONE";
const ATTR_INIT_HEALTH: &str = "AWS_INIT_HEALTH_STATUS";
const ATTR_CLUSTER: &str = "ECS_CLUSTER_NAME";
const ATTR_SERVICE: &str = "ECS_SERVICE_NAME";
const ATTR_FAMILY: &str = "ECS_TASK_DEFINITION_FAMILY";

/// A discovery instance registered for a canary task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredInstance {
    pub service_id: String,
    pub instance_id: String,
}

#[derive(Debug)]
pub struct RegistryTask {
    base: TaskBase,
    registry: ServiceRegistry,
    instance: Option<RegisteredInstance>,
}

impl RegistryTask {
    pub fn new(deps: Arc<Deps>, spec: LaunchSpec, registry: ServiceRegistry) -> Self {
        Self {
            base: TaskBase::new(deps, spec),
            registry,
            instance: None,
        }
    }

    pub fn instance(&self) -> Option<&RegisteredInstance> {
        self.instance.as_ref()
    }

    fn port(&self, task: &Task) -> Result<Option<u16>, TaskError> {
        match (&self.registry.container_name, self.registry.container_port) {
            (Some(container), Some(port)) => {
                self.base.published_port(task, container, port).map(Some)
            }
            _ => Ok(self.registry.port),
        }
    }

    fn attributes(&self, identity: &NetworkIdentity, port: Option<u16>) -> HashMap<String, String> {
        let deps = self.base.deps();
        let mut attributes = HashMap::from([
            (ATTR_IPV4.to_string(), identity.private_ip.clone()),
            (ATTR_AZ.to_string(), identity.availability_zone.clone()),
            (
                ATTR_INIT_HEALTH.to_string(),
                CustomHealthStatus::Unhealthy.to_string(),
            ),
            (ATTR_CLUSTER.to_string(), deps.cluster().to_string()),
            (ATTR_SERVICE.to_string(), deps.service().to_string()),
            (
                ATTR_FAMILY.to_string(),
                self.base.task_definition().family.clone(),
            ),
        ]);
        if let Some(port) = port {
            attributes.insert(ATTR_PORT.to_string(), port.to_string());
        }
        attributes
    }

    async fn verify(&mut self, cancel: &CancellationToken) -> Result<(), TaskError> {
        let task = self.base.wait_running(cancel).await?;
        self.base.wait_container_health(cancel).await?;
        self.base.set_phase(TaskPhase::Verifying);

        let deps = Arc::clone(self.base.deps());
        let discovery = &deps.clients.discovery;
        let service_id = self.registry.registry_arn.resource_id().to_string();
        let service = discovery.get_service(&service_id).await?;
        let namespace = discovery.get_namespace(&service.namespace_id).await?;

        let port = self.port(&task)?;
        let identity = self.base.network_identity(&task).await?;
        let attributes = self.attributes(&identity, port);
        let instance_id = task.task_arn.resource_id().to_string();

        discovery
            .register_instance(&service_id, &instance_id, &attributes)
            .await?;
        self.instance = Some(RegisteredInstance {
            service_id: service_id.clone(),
            instance_id: instance_id.clone(),
        });
        tracing::info!(
            task = %task.task_arn,
            service = %service.name,
            namespace = %namespace.name,
            instance = %instance_id,
            "registered canary discovery instance"
        );

        discovery
            .update_instance_health(&service_id, &instance_id, CustomHealthStatus::Healthy)
            .await?;

        let query = HashMap::from([
            (ATTR_CLUSTER.to_string(), deps.cluster().to_string()),
            (ATTR_SERVICE.to_string(), deps.service().to_string()),
        ]);
        let deadline = Deadline::start(
            deps.clock.as_ref(),
            deps.timeouts().resolve(Phase::TargetHealthCheck),
        );
        loop {
            let healthy = discovery
                .discover_instances(
                    &namespace.name,
                    &service.name,
                    HealthStatusFilter::Healthy,
                    &query,
                )
                .await?;
            if healthy.iter().any(|i| i.instance_id == instance_id) {
                tracing::info!(instance = %instance_id, "canary instance is discoverable");
                return Ok(());
            }
            if deadline.expired() {
                return Err(TaskError::InstanceNotDiscoverable {
                    service: service.name.clone(),
                    instance_id,
                    after: deadline.limit(),
                });
            }
            pause(
                deps.clock.as_ref(),
                cancel,
                deadline.next_interval(HEALTH_POLL_INTERVAL),
            )
            .await?;
        }
    }

    async fn deregister(&mut self) {
        let Some(instance) = self.instance.take() else {
            return;
        };
        let deps = Arc::clone(self.base.deps());
        match deps
            .clients
            .discovery
            .deregister_instance(&instance.service_id, &instance.instance_id)
            .await
        {
            Ok(()) => tracing::info!(
                instance = %instance.instance_id,
                "deregistered canary discovery instance"
            ),
            Err(e) => self.base.warn(Warning::instance_deregistration(format!(
                "failed to deregister discovery instance {} from {}: {e}",
                instance.instance_id, instance.service_id
            ))),
        }
    }
}

#[async_trait]
impl CanaryTask for RegistryTask {
    async fn start(&mut self, cancel: &CancellationToken) -> Result<(), TaskError> {
        self.base.start(cancel).await
    }

    async fn wait(&mut self, cancel: &CancellationToken) -> Result<(), TaskError> {
        let result = self.verify(cancel).await;
        self.base.settle(result, TaskPhase::Verified)
    }

    async fn stop(&mut self, cancel: &CancellationToken) -> Result<(), TaskError> {
        self.deregister().await;
        self.base.stop_task(cancel).await
    }

    fn handle(&self) -> &CanaryTaskHandle {
        self.base.handle()
    }

    fn warnings(&self) -> &[Warning] {
        self.base.warnings()
    }
}
