// ABOUTME: Service discovery operations for registry-backed canaries.
// ABOUTME: Instance registration, custom health updates and health-filtered lookup.

use async_trait::async_trait;
use std::collections::HashMap;

use super::error::ClientError;
use crate::types::{
    CustomHealthStatus, DiscoveredInstance, DiscoveryService, HealthStatusFilter, Namespace,
};

#[async_trait]
pub trait DiscoveryClient: Send + Sync {
    async fn get_service(&self, service_id: &str) -> Result<DiscoveryService, ClientError>;

    async fn get_namespace(&self, namespace_id: &str) -> Result<Namespace, ClientError>;

    async fn register_instance(
        &self,
        service_id: &str,
        instance_id: &str,
        attributes: &HashMap<String, String>,
    ) -> Result<(), ClientError>;

    async fn deregister_instance(
        &self,
        service_id: &str,
        instance_id: &str,
    ) -> Result<(), ClientError>;

    async fn update_instance_health(
        &self,
        service_id: &str,
        instance_id: &str,
        status: CustomHealthStatus,
    ) -> Result<(), ClientError>;

    /// Instances of `service_name` in `namespace_name` that pass
    /// `health_filter` and carry every attribute in `query`.
    async fn discover_instances(
        &self,
        namespace_name: &str,
        service_name: &str,
        health_filter: HealthStatusFilter,
        query: &HashMap<String, String>,
    ) -> Result<Vec<DiscoveredInstance>, ClientError>;
}
