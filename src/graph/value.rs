// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property Values and Cross-Resource References
//!
//! A property value is either a literal or a reference that only resolves
//! once the provisioning engine has created the referenced resource. Every
//! reference names its target explicitly, so dependencies are read straight
//! off the values instead of from declaration order.

use serde_json::json;
use std::collections::BTreeMap;
use std::fmt;

use super::LogicalId;

/// Platform pseudo parameter, known only to the provisioning engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PseudoParameter {
    Region,
    AccountId,
}

impl PseudoParameter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Region => "AWS::Region",
            Self::AccountId => "AWS::AccountId",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "AWS::Region" => Some(Self::Region),
            "AWS::AccountId" => Some(Self::AccountId),
            _ => None,
        }
    }
}

/// Reference to a named secret in the credential store
///
/// The secret value never passes through the graph; the engine resolves it
/// at deploy time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SecretRef {
    pub name: String,
    pub field: Option<String>,
}

impl SecretRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field: None,
        }
    }

    /// Reference one JSON field of the secret
    pub fn field(&self, field: impl Into<String>) -> Self {
        Self {
            name: self.name.clone(),
            field: Some(field.into()),
        }
    }
}

impl fmt::Display for SecretRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "secret:{}:{}", self.name, field),
            None => write!(f, "secret:{}", self.name),
        }
    }
}

/// Resource property value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Number(i64),
    Float(f64),
    Bool(bool),
    /// Primary identifier of another resource
    Ref(LogicalId),
    /// Named attribute of another resource
    GetAtt(LogicalId, String),
    Secret(SecretRef),
    Pseudo(PseudoParameter),
    /// Concatenation, resolved once every part resolves
    Join(String, Vec<Value>),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    pub fn reference(target: &LogicalId) -> Self {
        Self::Ref(target.clone())
    }

    pub fn attribute(target: &LogicalId, attribute: impl Into<String>) -> Self {
        Self::GetAtt(target.clone(), attribute.into())
    }

    pub fn join(separator: impl Into<String>, parts: Vec<Value>) -> Self {
        Self::Join(separator.into(), parts)
    }

    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Self::List(items.into_iter().collect())
    }

    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Self::Map(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value))
                .collect(),
        )
    }

    /// Every resource this value depends on
    pub fn references(&self) -> Vec<&LogicalId> {
        let mut found = Vec::new();
        self.collect_references(&mut found);
        found
    }

    fn collect_references<'a>(&'a self, found: &mut Vec<&'a LogicalId>) {
        match self {
            Self::Ref(id) | Self::GetAtt(id, _) => found.push(id),
            Self::Join(_, parts) | Self::List(parts) => {
                parts.iter().for_each(|part| part.collect_references(found))
            }
            Self::Map(entries) => entries
                .values()
                .for_each(|value| value.collect_references(found)),
            Self::String(_)
            | Self::Number(_)
            | Self::Float(_)
            | Self::Bool(_)
            | Self::Secret(_)
            | Self::Pseudo(_) => {}
        }
    }

    /// A literal scalar, known at synthesis time
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Self::String(_) | Self::Number(_) | Self::Float(_) | Self::Bool(_)
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a key of a map value
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Map(entries) => entries.get(key),
            _ => None,
        }
    }

    /// Render into template JSON
    pub fn to_template(&self) -> serde_json::Value {
        match self {
            Self::String(value) => json!(value),
            Self::Number(value) => json!(value),
            Self::Float(value) => json!(value),
            Self::Bool(value) => json!(value),
            Self::Ref(id) => json!({ "Ref": id.as_str() }),
            Self::GetAtt(id, attribute) => json!({ "Fn::GetAtt": [id.as_str(), attribute] }),
            Self::Secret(secret) => match &secret.field {
                Some(field) => json!({ "Fn::Secret": [secret.name, field] }),
                None => json!({ "Fn::Secret": secret.name }),
            },
            Self::Pseudo(parameter) => json!({ "Ref": parameter.as_str() }),
            Self::Join(separator, parts) => json!({
                "Fn::Join": [
                    separator,
                    parts.iter().map(Value::to_template).collect::<Vec<_>>()
                ]
            }),
            Self::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_template).collect())
            }
            Self::Map(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_template()))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Number(i64::from(value))
    }
}

impl From<u16> for Value {
    fn from(value: u16) -> Self {
        Self::Number(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<SecretRef> for Value {
    fn from(value: SecretRef) -> Self {
        Self::Secret(value)
    }
}

impl From<PseudoParameter> for Value {
    fn from(value: PseudoParameter) -> Self {
        Self::Pseudo(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::List(value)
    }
}
