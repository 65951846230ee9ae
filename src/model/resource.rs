//! Service resources: a method and path template bound to a type

use indexmap::IndexMap;

use super::Annotations;
use crate::value::Value;
use crate::{Marshal, Unmarshal};

/// HTTP methods a resource may declare, in canonical (upper) case.
pub const METHODS: [&str; 7] = ["GET", "PUT", "POST", "DELETE", "PATCH", "HEAD", "OPTIONS"];

#[derive(Marshal, Unmarshal, Clone, PartialEq, Debug, Default)]
#[cfg_attr(feature = "serde_impls", derive(serde::Serialize, serde::Deserialize))]
pub struct Resource {
    #[tbin(name = "type")]
    #[cfg_attr(feature = "serde_impls", serde(rename = "type"))]
    pub ty: String,
    pub method: String,
    pub path: String,
    pub comment: Option<String>,
    pub inputs: Vec<ResourceInput>,
    pub outputs: Vec<ResourceOutput>,
    pub auth: Option<ResourceAuth>,
    pub expected: String,
    pub alternatives: Vec<String>,
    pub exceptions: IndexMap<String, ExceptionDef>,
    #[tbin(name = "async")]
    #[cfg_attr(feature = "serde_impls", serde(rename = "async"))]
    pub is_async: Option<bool>,
    #[cfg_attr(feature = "serde_impls", serde(default, skip_serializing_if = "IndexMap::is_empty"))]
    pub annotations: Annotations,
    pub consumes: Vec<String>,
    pub produces: Vec<String>,
    pub name: Option<String>,
}

impl Resource {
    /// A resource with no inputs, expecting `OK`.
    pub fn new(ty: impl Into<String>, method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            ty: ty.into(),
            method: method.into(),
            path: path.into(),
            comment: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            auth: None,
            expected: String::from("OK"),
            alternatives: Vec::new(),
            exceptions: IndexMap::new(),
            is_async: None,
            annotations: Annotations::new(),
            consumes: Vec::new(),
            produces: Vec::new(),
            name: None,
        }
    }

    /// Names of the `{param}` placeholders in the path, before any query string.
    pub fn path_params(&self) -> Vec<&str> {
        let path = self.path.split('?').next().unwrap_or("");
        placeholders(path).map(|(_, name)| name).collect()
    }

    /// `(key, param)` pairs from `key={param}` entries of the query string.
    pub fn query_params(&self) -> Vec<(&str, &str)> {
        let Some((_, query)) = self.path.split_once('?') else {
            return Vec::new();
        };
        query
            .split('&')
            .filter_map(|kv| {
                let (key, val) = kv.split_once('=')?;
                let name = val.strip_prefix('{')?.strip_suffix('}')?;
                Some((key, name))
            })
            .collect()
    }

    pub fn find_input(&self, name: &str) -> Option<&ResourceInput> {
        self.inputs.iter().find(|i| i.name == name)
    }
}

/// Iterates over `{name}` placeholders as `(byte offset, name)`.
fn placeholders(path: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut rest = 0;
    std::iter::from_fn(move || {
        let open = rest + path[rest..].find('{')?;
        let close = open + path[open..].find('}')?;
        rest = close + 1;
        Some((open, &path[open + 1..close]))
    })
}

#[derive(Marshal, Unmarshal, Clone, PartialEq, Debug, Default)]
#[cfg_attr(feature = "serde_impls", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde_impls", serde(rename_all = "camelCase"))]
pub struct ResourceInput {
    pub name: String,
    #[tbin(name = "type")]
    #[cfg_attr(feature = "serde_impls", serde(rename = "type"))]
    pub ty: String,
    pub comment: Option<String>,
    #[tbin(name = "pathParam")]
    pub path_param: bool,
    #[tbin(name = "queryParam")]
    pub query_param: Option<String>,
    pub header: Option<String>,
    pub pattern: Option<String>,
    pub default: Option<Value>,
    pub optional: bool,
    pub flag: bool,
    pub context: Option<String>,
    #[cfg_attr(feature = "serde_impls", serde(default, skip_serializing_if = "IndexMap::is_empty"))]
    pub annotations: Annotations,
}

#[derive(Marshal, Unmarshal, Clone, PartialEq, Debug, Default)]
#[cfg_attr(feature = "serde_impls", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceOutput {
    pub name: String,
    #[tbin(name = "type")]
    #[cfg_attr(feature = "serde_impls", serde(rename = "type"))]
    pub ty: String,
    pub header: String,
    pub comment: Option<String>,
    pub optional: bool,
    #[cfg_attr(feature = "serde_impls", serde(default, skip_serializing_if = "IndexMap::is_empty"))]
    pub annotations: Annotations,
}

/// Authentication and authorization requirements of a resource
///
/// Presence of `action`, `resource` or `domain` implies authentication.
#[derive(Marshal, Unmarshal, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde_impls", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceAuth {
    pub authenticate: bool,
    pub action: Option<String>,
    pub resource: Option<String>,
    pub domain: Option<String>,
}

#[derive(Marshal, Unmarshal, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde_impls", derive(serde::Serialize, serde::Deserialize))]
pub struct ExceptionDef {
    #[tbin(name = "type")]
    #[cfg_attr(feature = "serde_impls", serde(rename = "type"))]
    pub ty: String,
    pub comment: Option<String>,
}
