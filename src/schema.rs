//! Static attribute schemas for resources and data sources.
//!
//! Schemas describe attribute shape and lifecycle flags. `Schema::plan` is the
//! small amount of planning the local driver needs: defaults, required checks
//! and carrying computed values forward from prior state.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::provider::ProviderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    String,
    Bool,
    Int32,
    Int64,
    ListOfString,
    MapOfString,
    Object,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Required,
    Optional,
    Computed,
    OptionalComputed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: AttributeType,
    pub mode: Mode,
    pub description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub requires_replace: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
}

impl Attribute {
    fn new(name: &'static str, kind: AttributeType, mode: Mode, description: &'static str) -> Self {
        Self {
            name,
            kind,
            mode,
            description,
            default: None,
            requires_replace: false,
            attributes: Vec::new(),
        }
    }

    pub fn required(name: &'static str, kind: AttributeType, description: &'static str) -> Self {
        Self::new(name, kind, Mode::Required, description)
    }

    pub fn optional(name: &'static str, kind: AttributeType, description: &'static str) -> Self {
        Self::new(name, kind, Mode::Optional, description)
    }

    pub fn computed(name: &'static str, kind: AttributeType, description: &'static str) -> Self {
        Self::new(name, kind, Mode::Computed, description)
    }

    /// Optional attribute that takes `default` when left unset.
    pub fn with_default(mut self, default: Value) -> Self {
        self.mode = Mode::OptionalComputed;
        self.default = Some(default);
        self
    }

    pub fn requires_replace(mut self) -> Self {
        self.requires_replace = true;
        self
    }

    pub fn nested(mut self, attributes: Vec<Attribute>) -> Self {
        self.kind = AttributeType::Object;
        self.attributes = attributes;
        self
    }

    pub fn is_computed_only(&self) -> bool {
        self.mode == Mode::Computed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
    pub description: &'static str,
    pub attributes: Vec<Attribute>,
}

impl Schema {
    pub fn new(description: &'static str, attributes: Vec<Attribute>) -> Self {
        Self {
            description,
            attributes,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Builds the planned value for `config`, optionally on top of `prior`.
    pub fn plan(&self, config: &Value, prior: Option<&Value>) -> Result<Value, ProviderError> {
        let empty = Map::new();
        let config = match config {
            Value::Null => &empty,
            Value::Object(map) => map,
            other => {
                return Err(ProviderError::InvalidConfig(format!(
                    "configuration must be an object, got {}",
                    other
                )));
            }
        };

        for key in config.keys() {
            match self.attribute(key) {
                None => {
                    return Err(ProviderError::diagnostic(
                        "Unsupported Argument",
                        format!("An argument named \"{}\" is not expected here.", key),
                    ));
                }
                Some(attr) if attr.is_computed_only() && !config[key].is_null() => {
                    return Err(ProviderError::diagnostic(
                        "Invalid Configuration for Read-Only Attribute",
                        format!("Cannot set value for the computed attribute \"{}\".", key),
                    ));
                }
                Some(_) => {}
            }
        }

        let mut planned = Map::new();
        for attr in &self.attributes {
            let configured = config.get(attr.name).filter(|v| !v.is_null()).cloned();
            let value = match attr.mode {
                Mode::Required => configured.ok_or_else(|| {
                    ProviderError::diagnostic(
                        "Missing required argument",
                        format!("The argument \"{}\" is required, but no definition was found.", attr.name),
                    )
                })?,
                Mode::Optional => configured.unwrap_or(Value::Null),
                Mode::OptionalComputed => configured
                    .or_else(|| attr.default.clone())
                    .unwrap_or(Value::Null),
                Mode::Computed => prior
                    .and_then(|p| p.get(attr.name))
                    .cloned()
                    .unwrap_or(Value::Null),
            };
            planned.insert(attr.name.to_string(), value);
        }

        Ok(Value::Object(planned))
    }

    pub fn requires_replace(&self, prior: &Value, planned: &Value) -> bool {
        self.attributes
            .iter()
            .filter(|a| a.requires_replace)
            .any(|a| prior.get(a.name) != planned.get(a.name))
    }
}
