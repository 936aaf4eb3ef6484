//! Resource arguments
//!
//! Arguments may mix known values with deferred outputs of other resources,
//! at any depth. They are resolved into plain JSON right before the engine
//! creates the resource.

use crate::error::{OutputError, OutputResult};
use crate::output::Output;
use crate::resource::Urn;
use futures_util::future::{BoxFuture, FutureExt};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Resolved inputs or outputs of a resource
pub type PropertyMap = serde_json::Map<String, Value>;

/// Marker key identifying serialized assets inside property values
pub const ASSET_KEY: &str = "__asset";

#[derive(Clone, Debug, Default)]
pub enum Input {
    /// Omitted argument
    #[default]
    Absent,
    Value(Value),
    Output(Output<Value>),
    Object(BTreeMap<String, Input>),
    Array(Vec<Input>),
}

impl Input {
    pub fn object<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Input)>,
        K: Into<String>,
    {
        Input::Object(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn array<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Input>,
    {
        Input::Array(items.into_iter().map(Into::into).collect())
    }

    /// Resources this argument waits on
    pub fn dependencies(&self) -> BTreeSet<Urn> {
        let mut deps = BTreeSet::new();
        self.collect_dependencies(&mut deps);
        deps
    }

    fn collect_dependencies(&self, deps: &mut BTreeSet<Urn>) {
        match self {
            Input::Output(output) => deps.extend(output.dependencies().iter().cloned()),
            Input::Object(fields) => fields.values().for_each(|v| v.collect_dependencies(deps)),
            Input::Array(items) => items.iter().for_each(|v| v.collect_dependencies(deps)),
            Input::Absent | Input::Value(_) => {}
        }
    }

    /// Waits for every deferred part and returns plain JSON. Absent object
    /// fields are dropped.
    pub fn resolve(&self) -> BoxFuture<'_, OutputResult<Value>> {
        async move {
            match self {
                Input::Absent => Ok(Value::Null),
                Input::Value(value) => Ok(value.clone()),
                Input::Output(output) => output.resolve().await,
                Input::Object(fields) => {
                    let mut map = PropertyMap::new();
                    for (key, input) in fields {
                        if matches!(input, Input::Absent) {
                            continue;
                        }
                        map.insert(key.clone(), input.resolve().await?);
                    }
                    Ok(Value::Object(map))
                }
                Input::Array(items) => {
                    let mut values = Vec::with_capacity(items.len());
                    for item in items {
                        values.push(item.resolve().await?);
                    }
                    Ok(Value::Array(values))
                }
            }
        }
        .boxed()
    }
}

impl From<Value> for Input {
    fn from(value: Value) -> Self {
        Input::Value(value)
    }
}

impl From<&str> for Input {
    fn from(value: &str) -> Self {
        Input::Value(Value::from(value))
    }
}

impl From<String> for Input {
    fn from(value: String) -> Self {
        Input::Value(Value::from(value))
    }
}

impl From<&String> for Input {
    fn from(value: &String) -> Self {
        Input::Value(Value::from(value.as_str()))
    }
}

impl From<bool> for Input {
    fn from(value: bool) -> Self {
        Input::Value(Value::from(value))
    }
}

impl From<i64> for Input {
    fn from(value: i64) -> Self {
        Input::Value(Value::from(value))
    }
}

impl From<i32> for Input {
    fn from(value: i32) -> Self {
        Input::Value(Value::from(value))
    }
}

impl From<u32> for Input {
    fn from(value: u32) -> Self {
        Input::Value(Value::from(value))
    }
}

impl From<Output<Value>> for Input {
    fn from(output: Output<Value>) -> Self {
        Input::Output(output)
    }
}

impl From<Output<String>> for Input {
    fn from(output: Output<String>) -> Self {
        Input::Output(output.apply(Value::String))
    }
}

impl From<&Output<String>> for Input {
    fn from(output: &Output<String>) -> Self {
        Input::Output(output.apply(Value::String))
    }
}

impl From<Asset> for Input {
    fn from(asset: Asset) -> Self {
        Input::Value(asset.to_value())
    }
}

impl From<Output<Asset>> for Input {
    fn from(output: Output<Asset>) -> Self {
        Input::Output(output.apply(|asset| asset.to_value()))
    }
}

impl<T: Into<Input>> From<Vec<T>> for Input {
    fn from(items: Vec<T>) -> Self {
        Input::array(items)
    }
}

impl<T: Into<Input>> From<Option<T>> for Input {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

/// Ordered resource arguments
#[derive(Clone, Debug, Default)]
pub struct Args {
    fields: BTreeMap<String, Input>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Input>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Input>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Input> {
        self.fields.get(key)
    }

    /// Present arguments in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Input)> {
        self.fields
            .iter()
            .filter(|(_, v)| !matches!(v, Input::Absent))
    }

    pub fn dependencies(&self) -> BTreeSet<Urn> {
        self.fields
            .values()
            .flat_map(|input| input.dependencies())
            .collect()
    }

    /// Resolves every argument; fails with the first failing one in key order
    pub async fn resolve(&self) -> OutputResult<PropertyMap> {
        let mut map = PropertyMap::new();
        for (key, input) in self.iter() {
            map.insert(key.clone(), input.resolve().await?);
        }
        Ok(map)
    }
}

/// File content attached to a resource argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Asset {
    /// Literal text
    String(String),
    /// A local directory packed into an archive on upload
    FileArchive(PathBuf),
}

impl Asset {
    pub fn string(text: impl Into<String>) -> Self {
        Asset::String(text.into())
    }

    pub fn file_archive(path: impl Into<PathBuf>) -> Self {
        Asset::FileArchive(path.into())
    }

    pub fn to_value(&self) -> Value {
        match self {
            Asset::String(text) => serde_json::json!({ ASSET_KEY: "string", "text": text }),
            Asset::FileArchive(path) => serde_json::json!({
                ASSET_KEY: "fileArchive",
                "path": path.to_string_lossy(),
            }),
        }
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        let kind = value.get(ASSET_KEY)?.as_str()?;
        match kind {
            "string" => Some(Asset::String(value.get("text")?.as_str()?.to_string())),
            "fileArchive" => Some(Asset::FileArchive(PathBuf::from(
                value.get("path")?.as_str()?,
            ))),
            _ => None,
        }
    }
}

/// Reads a string argument from resolved inputs
pub fn input_str<'a>(inputs: &'a PropertyMap, key: &str) -> Option<&'a str> {
    inputs.get(key).and_then(Value::as_str)
}

/// Turns a resolve failure of a single argument into a message for the
/// preview table.
pub fn describe_unresolved(error: &OutputError) -> String {
    if error.is_unknown() {
        "(known after apply)".to_string()
    } else {
        format!("(error: {})", error)
    }
}
