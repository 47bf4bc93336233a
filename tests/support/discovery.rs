// ABOUTME: In-memory subnet/instance lookup and service discovery registry for tests.
// ABOUTME: Registered instances become discoverable once marked healthy, unless told otherwise.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

use canarist::client::{ClientError, DiscoveryClient, InstanceClient};
use canarist::types::{
    CustomHealthStatus, DiscoveredInstance, DiscoveryService, Ec2Instance, HealthStatusFilter,
    Namespace, Subnet,
};

pub const NAMESPACE_ID: &str = "ns-canary";
pub const NAMESPACE_NAME: &str = "internal.local";

#[derive(Default)]
pub struct FakeInstances;

#[async_trait]
impl InstanceClient for FakeInstances {
    async fn describe_subnet(&self, subnet_id: &str) -> Result<Subnet, ClientError> {
        let availability_zone = match subnet_id {
            "subnet-a" => "us-east-1a",
            "subnet-b" => "us-east-1b",
            other => return Err(ClientError::not_found("subnet", other)),
        };
        Ok(Subnet {
            subnet_id: subnet_id.to_string(),
            availability_zone: availability_zone.to_string(),
        })
    }

    async fn describe_instance(&self, instance_id: &str) -> Result<Ec2Instance, ClientError> {
        Ok(Ec2Instance {
            instance_id: instance_id.to_string(),
            private_ip_address: "10.0.2.5".to_string(),
            subnet_id: "subnet-b".to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct RegisteredInstance {
    pub service_id: String,
    pub instance_id: String,
    pub attributes: HashMap<String, String>,
    pub health: CustomHealthStatus,
}

#[derive(Default)]
struct State {
    instances: Vec<RegisteredInstance>,
    deregistered: Vec<String>,
    never_discoverable: bool,
}

#[derive(Default)]
pub struct FakeDiscovery {
    state: Mutex<State>,
}

impl FakeDiscovery {
    /// Healthy instances are never returned by discovery queries.
    pub fn never_discoverable(&self) {
        self.state.lock().never_discoverable = true;
    }

    pub fn instances(&self) -> Vec<RegisteredInstance> {
        self.state.lock().instances.clone()
    }

    pub fn deregistered(&self) -> Vec<String> {
        self.state.lock().deregistered.clone()
    }
}

#[async_trait]
impl DiscoveryClient for FakeDiscovery {
    async fn get_service(&self, service_id: &str) -> Result<DiscoveryService, ClientError> {
        Ok(DiscoveryService {
            id: service_id.to_string(),
            name: "web".to_string(),
            namespace_id: NAMESPACE_ID.to_string(),
        })
    }

    async fn get_namespace(&self, namespace_id: &str) -> Result<Namespace, ClientError> {
        if namespace_id != NAMESPACE_ID {
            return Err(ClientError::not_found("namespace", namespace_id));
        }
        Ok(Namespace {
            id: namespace_id.to_string(),
            name: NAMESPACE_NAME.to_string(),
        })
    }

    async fn register_instance(
        &self,
        service_id: &str,
        instance_id: &str,
        attributes: &HashMap<String, String>,
    ) -> Result<(), ClientError> {
        self.state.lock().instances.push(RegisteredInstance {
            service_id: service_id.to_string(),
            instance_id: instance_id.to_string(),
            attributes: attributes.clone(),
            health: CustomHealthStatus::Unhealthy,
        });
        Ok(())
    }

    async fn deregister_instance(
        &self,
        _service_id: &str,
        instance_id: &str,
    ) -> Result<(), ClientError> {
        let mut state = self.state.lock();
        state.instances.retain(|i| i.instance_id != instance_id);
        state.deregistered.push(instance_id.to_string());
        Ok(())
    }

    async fn update_instance_health(
        &self,
        _service_id: &str,
        instance_id: &str,
        status: CustomHealthStatus,
    ) -> Result<(), ClientError> {
        let mut state = self.state.lock();
        let instance = state
            .instances
            .iter_mut()
            .find(|i| i.instance_id == instance_id)
            .ok_or_else(|| ClientError::not_found("instance", instance_id))?;
        instance.health = status;
        Ok(())
    }

    async fn discover_instances(
        &self,
        namespace_name: &str,
        _service_name: &str,
        health_filter: HealthStatusFilter,
        query: &HashMap<String, String>,
    ) -> Result<Vec<DiscoveredInstance>, ClientError> {
        let state = self.state.lock();
        if state.never_discoverable || namespace_name != NAMESPACE_NAME {
            return Ok(Vec::new());
        }
        Ok(state
            .instances
            .iter()
            .filter(|i| match health_filter {
                HealthStatusFilter::Healthy => i.health == CustomHealthStatus::Healthy,
                HealthStatusFilter::Unhealthy => i.health == CustomHealthStatus::Unhealthy,
                HealthStatusFilter::All => true,
            })
            .filter(|i| query.iter().all(|(k, v)| i.attributes.get(k) == Some(v)))
            .map(|i| DiscoveredInstance {
                instance_id: i.instance_id.clone(),
                attributes: i.attributes.clone(),
            })
            .collect())
    }
}
