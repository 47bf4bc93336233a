// ABOUTME: Task definition model: the containers a canary or service runs.
// ABOUTME: Read-only to the rollout engine; supplied by the caller.

use serde::{Deserialize, Serialize};

use super::id::TaskDefinitionArn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDefinition {
    #[serde(rename = "taskDefinitionArn")]
    pub arn: TaskDefinitionArn,
    pub family: String,
    #[serde(default, rename = "containerDefinitions")]
    pub containers: Vec<ContainerDefinition>,
}

impl TaskDefinition {
    /// Look up a container definition by name.
    pub fn container(&self, name: &str) -> Option<&ContainerDefinition> {
        self.containers.iter().find(|c| c.name == name)
    }

    /// Containers that declare a health-check command.
    pub fn health_checked_containers(&self) -> impl Iterator<Item = &ContainerDefinition> {
        self.containers.iter().filter(|c| c.has_health_check())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerDefinition {
    pub name: String,
    pub image: String,
    #[serde(default = "default_essential")]
    pub essential: bool,
    #[serde(default)]
    pub port_mappings: Vec<PortMapping>,
    #[serde(default)]
    pub health_check: Option<ContainerHealthCheck>,
}

fn default_essential() -> bool {
    true
}

impl ContainerDefinition {
    pub fn has_health_check(&self) -> bool {
        self.health_check
            .as_ref()
            .is_some_and(|hc| !hc.command.is_empty())
    }

    /// Host port published for `container_port`, if the mapping names one.
    pub fn host_port_for(&self, container_port: u16) -> Option<u16> {
        self.port_mappings
            .iter()
            .find(|m| m.container_port == container_port)
            .and_then(|m| m.host_port)
            .filter(|p| *p != 0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortMapping {
    pub container_port: u16,
    #[serde(default)]
    pub host_port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerHealthCheck {
    pub command: Vec<String>,
}
