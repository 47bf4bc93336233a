// ABOUTME: Load balancer target group operations.
// ABOUTME: Register/deregister canary targets and read their health.

use async_trait::async_trait;
use std::time::Duration;

use super::error::ClientError;
use crate::types::{TargetDescription, TargetGroupArn, TargetHealth};

#[async_trait]
pub trait LoadBalancerClient: Send + Sync {
    /// The `deregistration_delay.timeout_seconds` attribute of a target
    /// group, or `None` if the attribute is not set.
    async fn deregistration_delay(
        &self,
        target_group: &TargetGroupArn,
    ) -> Result<Option<Duration>, ClientError>;

    /// Health of one target. `None` means the target group holds no record
    /// for it.
    async fn describe_target_health(
        &self,
        target_group: &TargetGroupArn,
        target: &TargetDescription,
    ) -> Result<Option<TargetHealth>, ClientError>;

    async fn register_target(
        &self,
        target_group: &TargetGroupArn,
        target: &TargetDescription,
    ) -> Result<(), ClientError>;

    async fn deregister_target(
        &self,
        target_group: &TargetGroupArn,
        target: &TargetDescription,
    ) -> Result<(), ClientError>;
}
