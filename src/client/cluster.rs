// ABOUTME: Cluster scheduler operations consumed by the rollout engine.
// ABOUTME: Services (describe/create/update/delete) and tasks (run/start/stop/describe).

use async_trait::async_trait;

use super::error::ClientError;
use crate::types::{
    ContainerInstance, ContainerInstanceArn, ContainerOverride, LaunchType, LoadBalancer,
    NetworkConfiguration, Service, ServiceConnectConfiguration, ServiceDefinition, ServiceName,
    ServiceRegistry, Task, TaskArn, TaskDefinitionArn, VolumeConfiguration,
};

/// Service and task lifecycle operations against one cluster scheduler.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Describe a service. Returns `None` if the cluster has never heard of it.
    async fn describe_service(
        &self,
        cluster: &str,
        service: &ServiceName,
    ) -> Result<Option<Service>, ClientError>;

    async fn create_service(&self, request: &CreateServiceRequest) -> Result<Service, ClientError>;

    async fn update_service(&self, request: &UpdateServiceRequest) -> Result<Service, ClientError>;

    /// Delete a service. The service must already be scaled to zero.
    async fn delete_service(&self, cluster: &str, service: &ServiceName)
    -> Result<(), ClientError>;

    /// Launch a task on capacity managed by the scheduler.
    async fn run_task(&self, request: &RunTaskRequest) -> Result<Task, ClientError>;

    /// Launch a task pinned to a specific container instance.
    async fn start_task(&self, request: &StartTaskRequest) -> Result<Task, ClientError>;

    async fn stop_task(&self, cluster: &str, task: &TaskArn, reason: &str)
    -> Result<(), ClientError>;

    async fn describe_tasks(&self, cluster: &str, tasks: &[TaskArn])
    -> Result<Vec<Task>, ClientError>;

    async fn describe_container_instance(
        &self,
        cluster: &str,
        instance: &ContainerInstanceArn,
    ) -> Result<ContainerInstance, ClientError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateServiceRequest {
    pub cluster: String,
    pub task_definition: TaskDefinitionArn,
    pub definition: ServiceDefinition,
}

/// Fields left as `None` are not changed on the live service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateServiceRequest {
    pub cluster: String,
    pub service: ServiceName,
    pub task_definition: Option<TaskDefinitionArn>,
    pub desired_count: Option<u32>,
    pub load_balancers: Option<Vec<LoadBalancer>>,
    pub network_configuration: Option<NetworkConfiguration>,
    pub service_registries: Option<Vec<ServiceRegistry>>,
    pub platform_version: Option<String>,
    pub service_connect_configuration: Option<ServiceConnectConfiguration>,
    pub volume_configurations: Option<Vec<VolumeConfiguration>>,
}

impl UpdateServiceRequest {
    pub fn new(cluster: impl Into<String>, service: ServiceName) -> Self {
        Self {
            cluster: cluster.into(),
            service,
            task_definition: None,
            desired_count: None,
            load_balancers: None,
            network_configuration: None,
            service_registries: None,
            platform_version: None,
            service_connect_configuration: None,
            volume_configurations: None,
        }
    }

    pub fn task_definition(mut self, arn: TaskDefinitionArn) -> Self {
        self.task_definition = Some(arn);
        self
    }

    pub fn desired_count(mut self, count: u32) -> Self {
        self.desired_count = Some(count);
        self
    }

    /// Carry every mutable attribute of `definition` into the update.
    pub fn configuration_from(mut self, definition: &ServiceDefinition) -> Self {
        self.load_balancers = Some(definition.load_balancers.clone());
        self.network_configuration = definition.network_configuration.clone();
        self.service_registries = Some(definition.service_registries.clone());
        self.platform_version = definition.platform_version.clone();
        self.service_connect_configuration = definition.service_connect_configuration.clone();
        self.volume_configurations = Some(definition.volume_configurations.clone());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunTaskRequest {
    pub cluster: String,
    pub task_definition: TaskDefinitionArn,
    pub group: String,
    pub launch_type: Option<LaunchType>,
    pub network_configuration: Option<NetworkConfiguration>,
    pub platform_version: Option<String>,
    pub overrides: Vec<ContainerOverride>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartTaskRequest {
    pub cluster: String,
    pub task_definition: TaskDefinitionArn,
    pub group: String,
    pub container_instance: ContainerInstanceArn,
    pub network_configuration: Option<NetworkConfiguration>,
    pub overrides: Vec<ContainerOverride>,
}
