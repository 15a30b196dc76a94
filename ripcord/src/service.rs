//! Service binding: method schemas and the bound client handle.
//!
//! Methods are resolved through an explicit name → descriptor map built
//! once at bind time. There is no dynamic lookup at call time beyond a map
//! hit; a name the schema does not declare fails with
//! [`CallError::UnknownMethod`] before anything touches the wire.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::cancel::CancelToken;
use crate::codec::PayloadCodec;
use crate::config::{ClientConfig, ConfigError};
use crate::dispatch::CallDispatcher;
use crate::error::CallError;
use crate::transport::{NodeId, Transport};

/// Delivery guarantee requested for a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryKind {
    /// Fire-and-forget: one send, no reply, success unobservable.
    Signalling,
    /// Resent until exactly one correlated reply acknowledges it.
    Repliable,
    /// Same dispatch behavior as [`DeliveryKind::Repliable`]; the durable
    /// half of the guarantee (persisting the call across peer restarts) is
    /// a collaborator concern outside this engine.
    Durable,
}

impl DeliveryKind {
    /// Whether a call of this kind blocks for a correlated reply.
    pub const fn expects_reply(&self) -> bool {
        !matches!(self, DeliveryKind::Signalling)
    }
}

/// One method's call descriptor, fixed at schema-build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodDescriptor {
    /// Wire name of the method.
    pub name: &'static str,
    /// Delivery guarantee the method is invoked with.
    pub delivery: DeliveryKind,
}

/// Named set of method descriptors a client can bind to.
///
/// # Example
///
/// ```
/// use ripcord::{DeliveryKind, ServiceSchema};
///
/// let schema = ServiceSchema::new("telemetry")
///     .method("record", DeliveryKind::Signalling)
///     .method("flush", DeliveryKind::Repliable);
/// assert!(schema.resolve("flush").is_some());
/// assert!(schema.resolve("drop_tables").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ServiceSchema {
    name: &'static str,
    methods: HashMap<&'static str, MethodDescriptor>,
}

impl ServiceSchema {
    /// Start an empty schema for the named service.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            methods: HashMap::new(),
        }
    }

    /// Declare a method. Redeclaring a name replaces the earlier entry.
    pub fn method(mut self, name: &'static str, delivery: DeliveryKind) -> Self {
        self.methods.insert(name, MethodDescriptor { name, delivery });
        self
    }

    /// Service name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Look up a declared method.
    pub fn resolve(&self, method: &str) -> Option<&MethodDescriptor> {
        self.methods.get(method)
    }

    /// Number of declared methods.
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Whether no methods are declared.
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

/// Client handle: one schema bound to one destination over one dispatcher.
pub struct RpcClient<C: PayloadCodec> {
    dispatcher: CallDispatcher<C>,
    schema: ServiceSchema,
    destination: NodeId,
}

impl<C: PayloadCodec> RpcClient<C> {
    /// Bind a schema to a destination.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for an invalid retry configuration.
    pub fn bind(
        schema: ServiceSchema,
        destination: NodeId,
        transport: Arc<dyn Transport>,
        codec: C,
        config: ClientConfig,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            dispatcher: CallDispatcher::new(transport, codec, config)?,
            schema,
            destination,
        })
    }

    /// The schema this client was bound with.
    pub fn schema(&self) -> &ServiceSchema {
        &self.schema
    }

    /// Invoke a declared method, routing by its delivery kind.
    ///
    /// Signalling methods return `Ok(None)` immediately after the single
    /// send; repliable and durable methods block for the correlated reply
    /// and return `Ok(Some(result))`.
    ///
    /// # Errors
    ///
    /// [`CallError::UnknownMethod`] if the schema does not declare
    /// `method`; otherwise whatever the underlying dispatch fails with.
    pub fn invoke<A, R>(
        &self,
        method: &str,
        args: &A,
        cancel: &CancelToken,
    ) -> Result<Option<R>, CallError>
    where
        A: Serialize,
        R: DeserializeOwned + Send + 'static,
    {
        let descriptor = self
            .schema
            .resolve(method)
            .ok_or_else(|| CallError::UnknownMethod {
                method: method.to_string(),
            })?;

        if descriptor.delivery.expects_reply() {
            self.dispatcher
                .call(&self.destination, descriptor.name, args, cancel)
                .map(Some)
        } else {
            self.dispatcher
                .signal(&self.destination, descriptor.name, args)?;
            Ok(None)
        }
    }
}
