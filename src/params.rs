/*!
 * String-keyed parameters for steps and filters.
 *
 * Every configurable component describes its parameters with a
 * `ParameterSchema`. Parameters given by the user are checked against the
 * schema before a batch starts: unknown keys and values of the wrong type are
 * configuration errors. Resolving parameters fills in the schema defaults, so
 * components can read every declared key without caring whether it was set.
 */

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::errors::ConfigurationError;

/// Type of a parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterType {
    Boolean,
    Integer,
    String,
    StringList,
}

impl ParameterType {
    fn accepts(&self, value: &Value) -> bool {
        match self {
            ParameterType::Boolean => value.is_boolean(),
            // Values beyond i64 would read back as missing
            ParameterType::Integer => value.is_i64(),
            ParameterType::String => value.is_string(),
            ParameterType::StringList => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
        }
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterType::Boolean => write!(f, "a boolean"),
            ParameterType::Integer => write!(f, "an integer"),
            ParameterType::String => write!(f, "a string"),
            ParameterType::StringList => write!(f, "a list of strings"),
        }
    }
}

/// Description of one parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    pub name: String,
    pub param_type: ParameterType,
    pub default: Value,
    pub description: String,
}

/// The parameters a component accepts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Name of the step or filter owning the parameters
    pub owner: String,
    pub descriptors: Vec<ParameterDescriptor>,
}

impl ParameterSchema {
    /// Create an empty schema
    pub fn new(owner: &str) -> Self {
        Self {
            owner: owner.to_string(),
            descriptors: Vec::new(),
        }
    }

    fn with(mut self, name: &str, param_type: ParameterType, default: Value, description: &str) -> Self {
        self.descriptors.push(ParameterDescriptor {
            name: name.to_string(),
            param_type,
            default,
            description: description.to_string(),
        });
        self
    }

    pub fn boolean(self, name: &str, default: bool, description: &str) -> Self {
        self.with(name, ParameterType::Boolean, Value::Bool(default), description)
    }

    pub fn integer(self, name: &str, default: i64, description: &str) -> Self {
        self.with(name, ParameterType::Integer, Value::from(default), description)
    }

    pub fn string(self, name: &str, default: &str, description: &str) -> Self {
        self.with(name, ParameterType::String, Value::from(default), description)
    }

    pub fn string_list(self, name: &str, default: &[&str], description: &str) -> Self {
        self.with(name, ParameterType::StringList, Value::from(default.to_vec()), description)
    }

    /// Find the descriptor of a parameter
    pub fn descriptor(&self, name: &str) -> Option<&ParameterDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    /// Check that every key is declared and every value has the declared type
    pub fn validate(&self, params: &Parameters) -> Result<(), ConfigurationError> {
        for (key, value) in params.iter() {
            let descriptor = self.descriptor(key).ok_or_else(|| ConfigurationError::UnknownParameter {
                owner: self.owner.clone(),
                key: key.to_string(),
            })?;
            if !descriptor.param_type.accepts(value) {
                return Err(ConfigurationError::InvalidParameter {
                    owner: self.owner.clone(),
                    key: key.to_string(),
                    expected: descriptor.param_type.to_string(),
                });
            }
        }
        Ok(())
    }

    /// The default value of every parameter
    pub fn defaults(&self) -> Parameters {
        let mut params = Parameters::new();
        for descriptor in &self.descriptors {
            params.set(&descriptor.name, descriptor.default.clone());
        }
        params
    }

    /// Validate the parameters and fill in defaults for missing keys
    pub fn resolve(&self, params: &Parameters) -> Result<Parameters, ConfigurationError> {
        self.validate(params)?;
        let mut resolved = self.defaults();
        for (key, value) in params.iter() {
            resolved.set(key, value.clone());
        }
        Ok(resolved)
    }
}

/// String-keyed parameter values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters {
    values: BTreeMap<String, Value>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_string_list(&self, key: &str) -> Option<Vec<String>> {
        self.get(key)?
            .as_array()?
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}
