// ABOUTME: Service model: the pending definition a caller supplies and the observed state.
// ABOUTME: Also defines the attachments a canary borrows (load balancers, registries, network).

use serde::{Deserialize, Serialize};

use super::id::{RegistryArn, ServiceArn, TargetGroupArn, TaskDefinitionArn};
use super::service_name::ServiceName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceStatus {
    Active,
    Draining,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LaunchType {
    Fargate,
    Ec2,
    External,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancer {
    pub target_group_arn: TargetGroupArn,
    pub container_name: String,
    pub container_port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRegistry {
    pub registry_arn: RegistryArn,
    #[serde(default)]
    pub container_name: Option<String>,
    #[serde(default)]
    pub container_port: Option<u16>,
    #[serde(default)]
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfiguration {
    #[serde(default)]
    pub subnets: Vec<String>,
    #[serde(default)]
    pub security_groups: Vec<String>,
    #[serde(default)]
    pub assign_public_ip: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConnectConfiguration {
    pub enabled: bool,
    #[serde(default)]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeConfiguration {
    pub name: String,
    #[serde(default)]
    pub size_in_gib: Option<u32>,
}

/// Service definition supplied by the caller, used to create a service or to
/// replace the configuration of an existing one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDefinition {
    pub service_name: ServiceName,
    #[serde(default)]
    pub desired_count: u32,
    #[serde(default)]
    pub load_balancers: Vec<LoadBalancer>,
    #[serde(default)]
    pub service_registries: Vec<ServiceRegistry>,
    #[serde(default)]
    pub network_configuration: Option<NetworkConfiguration>,
    #[serde(default)]
    pub platform_version: Option<String>,
    #[serde(default)]
    pub launch_type: Option<LaunchType>,
    #[serde(default)]
    pub service_connect_configuration: Option<ServiceConnectConfiguration>,
    #[serde(default)]
    pub volume_configurations: Vec<VolumeConfiguration>,
}

impl ServiceDefinition {
    pub fn attachments(&self) -> Attachments {
        Attachments {
            load_balancers: self.load_balancers.clone(),
            service_registries: self.service_registries.clone(),
            network_configuration: self.network_configuration.clone(),
            platform_version: self.platform_version.clone(),
        }
    }
}

/// One rollout in flight for a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDeployment {
    pub id: String,
    pub status: String,
    pub desired_count: u32,
    pub running_count: u32,
}

/// Observed state of a live service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub service_name: ServiceName,
    pub service_arn: ServiceArn,
    pub status: ServiceStatus,
    pub desired_count: u32,
    pub running_count: u32,
    pub task_definition: TaskDefinitionArn,
    #[serde(default)]
    pub deployments: Vec<ServiceDeployment>,
    #[serde(default)]
    pub load_balancers: Vec<LoadBalancer>,
    #[serde(default)]
    pub service_registries: Vec<ServiceRegistry>,
    #[serde(default)]
    pub network_configuration: Option<NetworkConfiguration>,
    #[serde(default)]
    pub platform_version: Option<String>,
    #[serde(default)]
    pub launch_type: Option<LaunchType>,
}

impl Service {
    /// A single deployment whose running count matches the desired count.
    pub fn is_stable(&self) -> bool {
        self.status == ServiceStatus::Active
            && self.deployments.len() == 1
            && self.running_count == self.desired_count
    }

    pub fn is_inactive(&self) -> bool {
        self.status == ServiceStatus::Inactive
    }

    pub fn attachments(&self) -> Attachments {
        Attachments {
            load_balancers: self.load_balancers.clone(),
            service_registries: self.service_registries.clone(),
            network_configuration: self.network_configuration.clone(),
            platform_version: self.platform_version.clone(),
        }
    }
}

/// What a canary task borrows from a service: where it is verified and how it
/// is launched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attachments {
    pub load_balancers: Vec<LoadBalancer>,
    pub service_registries: Vec<ServiceRegistry>,
    pub network_configuration: Option<NetworkConfiguration>,
    pub platform_version: Option<String>,
}
