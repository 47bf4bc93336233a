// ABOUTME: In-memory target group for integration tests.
// ABOUTME: Replays scripted health reads for registered targets and forgets them on deregistration.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use canarist::client::{ClientError, LoadBalancerClient};
use canarist::types::{TargetDescription, TargetGroupArn, TargetHealth, TargetHealthState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetCall {
    Register(String, TargetDescription),
    Deregister(String, TargetDescription),
}

#[derive(Default)]
struct State {
    script: VecDeque<Option<TargetHealth>>,
    registered: Vec<(String, TargetDescription)>,
    calls: Vec<TargetCall>,
    health_reads: usize,
    deregistration_delay: Option<Duration>,
    fail_deregister: Option<ClientError>,
    linger: Option<TargetHealthState>,
    cancel_on_register: Option<CancellationToken>,
}

#[derive(Default)]
pub struct FakeLoadBalancer {
    state: Mutex<State>,
}

pub fn health(state: TargetHealthState) -> Option<TargetHealth> {
    Some(TargetHealth {
        state,
        reason: None,
        description: None,
    })
}

impl FakeLoadBalancer {
    /// Health reads returned in order for a registered target; the last one
    /// repeats. `None` entries report no record for the target.
    pub fn script_health(&self, reads: impl IntoIterator<Item = Option<TargetHealth>>) {
        self.state.lock().script.extend(reads);
    }

    pub fn set_deregistration_delay(&self, delay: Duration) {
        self.state.lock().deregistration_delay = Some(delay);
    }

    pub fn fail_deregister(&self, error: ClientError) {
        self.state.lock().fail_deregister = Some(error);
    }

    /// Keep deregistered targets in the group, reporting `state` forever.
    pub fn linger_after_deregister(&self, state: TargetHealthState) {
        self.state.lock().linger = Some(state);
    }

    /// Fire `token` as soon as a target is registered.
    pub fn cancel_on_register(&self, token: CancellationToken) {
        self.state.lock().cancel_on_register = Some(token);
    }

    pub fn calls(&self) -> Vec<TargetCall> {
        self.state.lock().calls.clone()
    }

    pub fn registered(&self) -> Vec<TargetDescription> {
        self.state
            .lock()
            .registered
            .iter()
            .map(|(_, t)| t.clone())
            .collect()
    }

    /// Health reads served while targets were registered.
    pub fn health_reads(&self) -> usize {
        self.state.lock().health_reads
    }
}

fn same_target(a: &TargetDescription, b: &TargetDescription) -> bool {
    a.id == b.id && a.port == b.port
}

#[async_trait]
impl LoadBalancerClient for FakeLoadBalancer {
    async fn deregistration_delay(
        &self,
        _target_group: &TargetGroupArn,
    ) -> Result<Option<Duration>, ClientError> {
        Ok(self.state.lock().deregistration_delay)
    }

    async fn describe_target_health(
        &self,
        target_group: &TargetGroupArn,
        target: &TargetDescription,
    ) -> Result<Option<TargetHealth>, ClientError> {
        let mut state = self.state.lock();
        let registered = state
            .registered
            .iter()
            .any(|(tg, t)| tg == target_group.as_str() && same_target(t, target));
        if !registered {
            return Ok(None);
        }
        state.health_reads += 1;
        let read = if state.script.len() > 1 {
            state.script.pop_front().flatten()
        } else {
            state.script.front().cloned().flatten()
        };
        Ok(read)
    }

    async fn register_target(
        &self,
        target_group: &TargetGroupArn,
        target: &TargetDescription,
    ) -> Result<(), ClientError> {
        let mut state = self.state.lock();
        state
            .calls
            .push(TargetCall::Register(target_group.to_string(), target.clone()));
        state
            .registered
            .push((target_group.to_string(), target.clone()));
        if let Some(token) = &state.cancel_on_register {
            token.cancel();
        }
        Ok(())
    }

    async fn deregister_target(
        &self,
        target_group: &TargetGroupArn,
        target: &TargetDescription,
    ) -> Result<(), ClientError> {
        let mut state = self.state.lock();
        state
            .calls
            .push(TargetCall::Deregister(target_group.to_string(), target.clone()));
        if let Some(error) = state.fail_deregister.clone() {
            return Err(error);
        }
        if let Some(linger) = state.linger {
            state.script = VecDeque::from([health(linger)]);
            return Ok(());
        }
        state
            .registered
            .retain(|(tg, t)| !(tg == target_group.as_str() && same_target(t, target)));
        Ok(())
    }
}
