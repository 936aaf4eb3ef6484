//! Resource identity and handles

use crate::error::{EngineError, OutputError, Result};
use crate::input::PropertyMap;
use crate::output::Output;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Unique resource name within a stack:
/// `urn:sitestack:<stack>::<project>::<type token>::<name>`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Urn(String);

impl Urn {
    pub fn new(stack: &str, project: &str, token: &str, name: &str) -> Self {
        Self(format!(
            "urn:sitestack:{}::{}::{}::{}",
            stack, project, token, name
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The logical name the resource was declared with
    pub fn name(&self) -> &str {
        self.0.rsplit("::").next().unwrap_or(&self.0)
    }
}

impl std::fmt::Display for Urn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Urn> for String {
    fn from(urn: Urn) -> Self {
        urn.0
    }
}

/// Returns the package of a `<package>:<module>:<Type>` token
pub fn package_of(token: &str) -> Result<&str> {
    let mut parts = token.split(':');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(package), Some(module), Some(type_name), None)
            if !package.is_empty() && !module.is_empty() && !type_name.is_empty() =>
        {
            Ok(package)
        }
        _ => Err(EngineError::InvalidTypeToken(token.to_string())),
    }
}

/// Handle to a declared resource.
///
/// Cheap to clone; never mutated after creation. Every attribute is a
/// deferred value that resolves once the engine has created the resource.
#[derive(Clone, Debug)]
pub struct Resource {
    urn: Urn,
    token: String,
    state: Output<PropertyMap>,
}

impl Resource {
    pub(crate) fn new(urn: Urn, token: impl Into<String>, state: Output<PropertyMap>) -> Self {
        Self {
            urn,
            token: token.into(),
            state,
        }
    }

    pub fn urn(&self) -> &Urn {
        &self.urn
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn name(&self) -> &str {
        self.urn.name()
    }

    /// All outputs of the resource
    pub fn state(&self) -> &Output<PropertyMap> {
        &self.state
    }

    pub fn output(&self, attribute: &str) -> Output<Value> {
        let urn = self.urn.to_string();
        let attribute = attribute.to_string();
        self.state.try_apply(move |outputs| {
            outputs
                .get(&attribute)
                .cloned()
                .ok_or(OutputError::MissingAttribute { urn, attribute })
        })
    }

    pub fn string(&self, attribute: &str) -> Output<String> {
        self.output(attribute).try_apply(|value| match value {
            Value::String(s) => Ok(s),
            other => Err(OutputError::TypeMismatch {
                expected: "string".to_string(),
                found: other.to_string(),
            }),
        })
    }

    /// Provider-assigned identifier
    pub fn id(&self) -> Output<String> {
        self.string("id")
    }
}

/// Options that change how a resource is registered
#[derive(Clone, Debug, Default)]
pub struct ResourceOptions {
    /// Resources that must be created first even without a data dependency
    pub depends_on: Vec<Resource>,
    /// Explicit provider instance (e.g. a second region)
    pub provider: Option<Resource>,
}

impl ResourceOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depends_on(mut self, resource: &Resource) -> Self {
        self.depends_on.push(resource.clone());
        self
    }

    pub fn provider(mut self, provider: &Resource) -> Self {
        self.provider = Some(provider.clone());
        self
    }
}
