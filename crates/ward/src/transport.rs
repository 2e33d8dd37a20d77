//! The RPC transport consumed by the safety primitives.
//!
//! Ward does not speak any wire protocol itself. Everything that reaches the
//! cluster goes through a [`Transport`], which the embedding client
//! implements on top of its driver.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::EphemeralDefaults;
use crate::error::TransportError;

/// Named request parameters.
pub type Params = Map<String, Value>;

/// Client-side view of the RPC driver.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a named command and return its decoded response.
    async fn request(&self, command: &str, params: Params) -> Result<Value, TransportError>;

    /// Create an ephemeral object and return its identifier (a remote path).
    async fn create_ephemeral_resource(&self, spec: &EphemeralSpec)
    -> Result<String, TransportError>;

    /// Remove an object.
    ///
    /// With `force` set, a missing object is not an error.
    async fn remove_resource(&self, id: &str, force: bool) -> Result<(), TransportError>;
}

// Allow `Arc<dyn Transport>` wherever a transport is expected.
#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn request(&self, command: &str, params: Params) -> Result<Value, TransportError> {
        (**self).request(command, params).await
    }

    async fn create_ephemeral_resource(
        &self,
        spec: &EphemeralSpec,
    ) -> Result<String, TransportError> {
        (**self).create_ephemeral_resource(spec).await
    }

    async fn remove_resource(&self, id: &str, force: bool) -> Result<(), TransportError> {
        (**self).remove_resource(id, force).await
    }
}

/// Parameters for creating an ephemeral object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EphemeralSpec {
    /// Directory to create the object in; the transport picks one if unset.
    pub location: Option<String>,
    /// Name prefix for the generated object name.
    pub prefix: Option<String>,
    /// Attributes set on the object at creation.
    pub attributes: Params,
    /// Server-side expiration, a backstop for clients that die mid-scope.
    #[serde(with = "duration_ms_opt")]
    pub expiration_timeout: Option<Duration>,
    /// Remove with `force` on scope exit.
    pub force: bool,
}

impl Default for EphemeralSpec {
    fn default() -> Self {
        Self {
            location: None,
            prefix: None,
            attributes: Params::new(),
            expiration_timeout: None,
            force: true,
        }
    }
}

impl EphemeralSpec {
    /// Create an empty spec: transport-chosen location, forced removal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a spec from configured defaults.
    pub fn from_defaults(defaults: &EphemeralDefaults) -> Self {
        Self {
            location: defaults.location.clone(),
            prefix: defaults.prefix.clone(),
            attributes: Params::new(),
            expiration_timeout: defaults.expiration_timeout,
            force: defaults.force,
        }
    }

    /// Set the location hint.
    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Set the name prefix.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Add one attribute.
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Set the server-side expiration timeout.
    pub fn expiration_timeout(mut self, timeout: Duration) -> Self {
        self.expiration_timeout = Some(timeout);
        self
    }

    /// Choose whether removal on scope exit is forced.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

/// Serialize `Option<Duration>` as optional milliseconds.
pub(crate) mod duration_ms_opt {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.map(|d| d.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = Option::<u64>::deserialize(deserializer)?;
        Ok(ms.map(Duration::from_millis))
    }
}
