// ABOUTME: Subnet and EC2 instance lookups.
// ABOUTME: Resolves availability zones and private addresses for canary targets.

use async_trait::async_trait;

use super::error::ClientError;
use crate::types::{Ec2Instance, Subnet};

#[async_trait]
pub trait InstanceClient: Send + Sync {
    async fn describe_subnet(&self, subnet_id: &str) -> Result<Subnet, ClientError>;

    async fn describe_instance(&self, instance_id: &str) -> Result<Ec2Instance, ClientError>;
}
