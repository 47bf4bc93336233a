// ABOUTME: Phantom-typed identifiers for control-plane resources.
// ABOUTME: Keeps task, service, target group and registry ARNs from being swapped.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Marker types for phantom type parameters.
pub enum TaskMarker {}
pub enum TaskDefinitionMarker {}
pub enum ServiceMarker {}
pub enum ContainerInstanceMarker {}
pub enum TargetGroupMarker {}
pub enum RegistryMarker {}

/// A resource identifier tagged with the kind of resource it names.
#[must_use = "IDs reference resources and should not be ignored"]
pub struct Id<T> {
    value: String,
    _marker: PhantomData<T>,
}

impl<T> Id<T> {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            _marker: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn into_inner(self) -> String {
        self.value
    }

    /// The last path segment of an ARN (`.../cluster/abc123` -> `abc123`).
    ///
    /// Plain identifiers without a `/` are returned unchanged.
    pub fn resource_id(&self) -> &str {
        self.value.rsplit('/').next().unwrap_or(&self.value)
    }
}

impl<T> std::fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Id").field(&self.value).finish()
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        Self::new(self.value.clone())
    }
}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> Eq for Id<T> {}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T> std::fmt::Display for Id<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.value)
    }
}

impl<T> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

pub type TaskArn = Id<TaskMarker>;
pub type TaskDefinitionArn = Id<TaskDefinitionMarker>;
pub type ServiceArn = Id<ServiceMarker>;
pub type ContainerInstanceArn = Id<ContainerInstanceMarker>;
pub type TargetGroupArn = Id<TargetGroupMarker>;
pub type RegistryArn = Id<RegistryMarker>;
