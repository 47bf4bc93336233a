// ABOUTME: Type-safe identifiers and the control-plane data model.
// ABOUTME: Phantom-typed ARNs, task definitions, services, tasks and targets.

mod id;
mod service;
mod service_name;
mod target;
mod task;
mod task_definition;

pub use id::{
    ContainerInstanceArn, Id, RegistryArn, ServiceArn, TargetGroupArn, TaskArn,
    TaskDefinitionArn,
};
pub use service::{
    Attachments, LaunchType, LoadBalancer, NetworkConfiguration, Service,
    ServiceConnectConfiguration, ServiceDefinition, ServiceDeployment, ServiceRegistry,
    ServiceStatus, VolumeConfiguration,
};
pub use service_name::{ServiceName, ServiceNameError};
pub use target::{
    CustomHealthStatus, DiscoveredInstance, DiscoveryService, Ec2Instance, HealthStatusFilter,
    Namespace, Subnet, TargetDescription, TargetHealth, TargetHealthState,
};
pub use task::{
    ContainerInstance, ContainerOverride, ContainerState, HealthStatus, NetworkAttachment,
    NetworkBinding, Task, TaskStatus,
};
pub use task_definition::{ContainerDefinition, ContainerHealthCheck, PortMapping, TaskDefinition};
