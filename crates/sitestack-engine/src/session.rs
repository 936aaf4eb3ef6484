//! Graph-building session
//!
//! Every declaration registers itself with one [`Session`], which is passed
//! explicitly to each program. The session records resources and exports;
//! it never resolves anything itself. Resolution is driven afterwards by
//! [`crate::deploy`].

use crate::engine::Engine;
use crate::error::{EngineError, OutputError, OutputResult, Result};
use crate::input::{Args, Input, PropertyMap};
use crate::output::Output;
use crate::resource::{Resource, ResourceOptions, Urn, package_of};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;

/// A resource as declared by a program, before resolution
#[derive(Debug, Clone)]
pub struct Registration {
    pub urn: Urn,
    pub token: String,
    pub args: Args,
    pub options: ResourceOptions,
}

impl Registration {
    pub fn name(&self) -> &str {
        self.urn.name()
    }

    /// Every resource this one waits on: data dependencies, explicit
    /// `depends_on` and the provider instance.
    pub fn dependencies(&self) -> BTreeSet<Urn> {
        let mut deps = self.args.dependencies();
        deps.extend(self.options.depends_on.iter().map(|r| r.urn().clone()));
        if let Some(provider) = &self.options.provider {
            deps.insert(provider.urn().clone());
        }
        deps
    }
}

pub(crate) type Slot = oneshot::Sender<OutputResult<PropertyMap>>;

/// A registration plus the slot its outputs are delivered through
pub struct PendingResource {
    pub registration: Registration,
    pub(crate) slot: Slot,
}

/// Everything a program declared
pub struct ResourceGraph {
    pub project: String,
    pub stack: String,
    pub resources: Vec<PendingResource>,
    pub exports: Vec<(String, Input)>,
    pub(crate) engine: Arc<dyn Engine>,
}

impl ResourceGraph {
    pub fn registrations(&self) -> impl Iterator<Item = &Registration> {
        self.resources.iter().map(|r| &r.registration)
    }
}

#[derive(Default)]
struct Registry {
    resources: Vec<PendingResource>,
    exports: Vec<(String, Input)>,
}

struct SessionInner {
    project: String,
    stack: String,
    now: DateTime<Utc>,
    engine: Arc<dyn Engine>,
    registry: Mutex<Registry>,
}

#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("project", &self.inner.project)
            .field("stack", &self.inner.stack)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(
        project: impl Into<String>,
        stack: impl Into<String>,
        engine: Arc<dyn Engine>,
    ) -> Self {
        Self::with_clock(project, stack, engine, Utc::now())
    }

    /// Session with a fixed clock; time-scoped values (SAS windows) are
    /// computed from `now`.
    pub fn with_clock(
        project: impl Into<String>,
        stack: impl Into<String>,
        engine: Arc<dyn Engine>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                project: project.into(),
                stack: stack.into(),
                now,
                engine,
                registry: Mutex::new(Registry::default()),
            }),
        }
    }

    pub fn project(&self) -> &str {
        &self.inner.project
    }

    pub fn stack(&self) -> &str {
        &self.inner.stack
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.inner.now
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        // A poisoned registry only means a program panicked mid-declaration
        self.inner
            .registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Declares a resource.
    ///
    /// Fails if the name is empty, the token malformed, the URN already
    /// taken, or the engine rejects the registration.
    pub fn register(
        &self,
        token: &str,
        name: &str,
        args: Args,
        options: ResourceOptions,
    ) -> Result<Resource> {
        if name.trim().is_empty() {
            return Err(EngineError::InvalidName(name.to_string()));
        }
        package_of(token)?;

        let urn = Urn::new(&self.inner.stack, &self.inner.project, token, name);
        let registration = Registration {
            urn: urn.clone(),
            token: token.to_string(),
            args,
            options,
        };

        let mut registry = self.registry();
        if registry
            .resources
            .iter()
            .any(|r| r.registration.urn == urn)
        {
            return Err(EngineError::DuplicateResource(urn.to_string()));
        }

        self.inner.engine.check(&registration)?;

        let (slot, receiver) = oneshot::channel();
        let abandoned = urn.to_string();
        let state = Output::from_future(
            async move {
                receiver
                    .await
                    .unwrap_or(Err(OutputError::Abandoned(abandoned)))
            },
            BTreeSet::from([urn.clone()]),
        );

        tracing::debug!(urn = %urn, "Registered resource");
        registry.resources.push(PendingResource { registration, slot });
        Ok(Resource::new(urn, token, state))
    }

    /// Calls a provider function once `args` are known, e.g. a lookup of an
    /// existing DNS zone.
    pub fn invoke(&self, token: &str, args: Args) -> Output<PropertyMap> {
        let session = self.clone();
        let token = token.to_string();
        let dependencies = args.dependencies();
        Output::from_future(
            async move {
                let resolved = args.resolve().await?;
                session.call(&token, resolved).await
            },
            dependencies,
        )
    }

    /// Calls a provider function with already resolved arguments. Meant
    /// for use inside combinators.
    pub async fn call(&self, token: &str, args: PropertyMap) -> OutputResult<PropertyMap> {
        tracing::debug!(token, "Invoking provider function");
        self.inner
            .engine
            .invoke(token, &args)
            .await
            .map_err(|e| OutputError::Invoke {
                token: token.to_string(),
                message: e.to_string(),
            })
    }

    /// Publishes a named stack output
    pub fn export(&self, name: impl Into<String>, value: impl Into<Input>) {
        let name = name.into();
        let mut registry = self.registry();
        registry.exports.retain(|(existing, _)| *existing != name);
        registry.exports.push((name, value.into()));
    }

    /// Takes everything declared so far, leaving the session empty
    pub fn into_graph(&self) -> ResourceGraph {
        let registry = std::mem::take(&mut *self.registry());
        ResourceGraph {
            project: self.inner.project.clone(),
            stack: self.inner.stack.clone(),
            resources: registry.resources,
            exports: registry.exports,
            engine: Arc::clone(&self.inner.engine),
        }
    }
}

/// Convenience for exporting a literal string
pub fn literal(value: impl Into<String>) -> Input {
    Input::Value(Value::String(value.into()))
}
