use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::error::ActionError;

use super::handler::ActionHandler;

/// Dynamic key → value mapping used for action inputs and outputs.
pub type ValueMap = BTreeMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Create new projects/files
    Create,
    /// Setup infrastructure/services
    Setup,
    /// Add features to existing projects
    Add,
    Deploy,
    Util,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Setup => "setup",
            Self::Add => "add",
            Self::Deploy => "deploy",
            Self::Util => "util",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "setup" => Ok(Self::Setup),
            "add" => Ok(Self::Add),
            "deploy" => Ok(Self::Deploy),
            "util" => Ok(Self::Util),
            other => Err(format!("unknown category: {other}")),
        }
    }
}

/// Cost/speed classification of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Under ~30 seconds, deterministic implementation.
    Fast,
    /// 30s to several minutes, may defer to an interpreter.
    Flexible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Bool,
    Int,
    Float,
    Array,
    Object,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    /// Whether `value` is an acceptable JSON representation of this type.
    /// Integers are accepted where floats are declared.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Bool => value.is_boolean(),
            Self::Int => value.is_i64() || value.is_u64(),
            Self::Float => value.is_number(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Closed set of accepted values for string inputs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_values: Vec<String>,
}

impl InputSpec {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            description: String::new(),
            required: false,
            default: None,
            allowed_values: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_allowed<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_values = values.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    #[serde(default)]
    pub description: String,
}

impl OutputSpec {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            description: String::new(),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A named, registered unit of work.
///
/// Built once with the chained setters below, then handed to the
/// [`Registry`](super::Registry) which owns it for the process lifetime.
#[derive(Clone, Serialize)]
pub struct Action {
    pub name: String,
    pub description: String,
    pub category: Category,
    pub tags: BTreeSet<String>,
    pub tier: Tier,
    #[serde(rename = "estimated_duration_ms", serialize_with = "serialize_millis")]
    pub estimated_duration: Duration,
    pub inputs: Vec<InputSpec>,
    pub outputs: Vec<OutputSpec>,
    /// Actions that must complete first when present in the same call set.
    pub dependencies: BTreeSet<String>,
    /// Actions that may never appear in the same call set.
    pub conflicts: BTreeSet<String>,
    #[serde(skip)]
    pub handler: Arc<dyn ActionHandler>,
}

fn serialize_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("tier", &self.tier)
            .field("dependencies", &self.dependencies)
            .field("conflicts", &self.conflicts)
            .finish_non_exhaustive()
    }
}

impl Action {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        category: Category,
        handler: Arc<dyn ActionHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            category,
            tags: BTreeSet::new(),
            tier: Tier::Fast,
            estimated_duration: Duration::ZERO,
            inputs: Vec::new(),
            outputs: Vec::new(),
            dependencies: BTreeSet::new(),
            conflicts: BTreeSet::new(),
            handler,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }

    pub fn with_estimate(mut self, estimate: Duration) -> Self {
        self.estimated_duration = estimate;
        self
    }

    pub fn input(mut self, spec: InputSpec) -> Self {
        self.inputs.push(spec);
        self
    }

    pub fn output(mut self, spec: OutputSpec) -> Self {
        self.outputs.push(spec);
        self
    }

    pub fn depends_on(mut self, action: impl Into<String>) -> Self {
        self.dependencies.insert(action.into());
        self
    }

    pub fn conflicts_with(mut self, action: impl Into<String>) -> Self {
        self.conflicts.insert(action.into());
        self
    }

    /// Check that the definition is well formed.
    pub fn validate(&self) -> Result<(), ActionError> {
        let invalid = |msg: String| Err(ActionError::InvalidAction(msg));

        if self.name.trim().is_empty() {
            return invalid("action name is required".into());
        }
        if self.description.trim().is_empty() {
            return invalid(format!("action '{}': description is required", self.name));
        }
        if self.dependencies.contains(&self.name) {
            return invalid(format!("action '{}' depends on itself", self.name));
        }
        if self.conflicts.contains(&self.name) {
            return invalid(format!("action '{}' conflicts with itself", self.name));
        }
        if let Some(both) = self.dependencies.intersection(&self.conflicts).next() {
            return invalid(format!(
                "action '{}' both depends on and conflicts with '{}'",
                self.name, both
            ));
        }

        let mut seen = BTreeSet::new();
        for input in &self.inputs {
            if !seen.insert(input.name.as_str()) {
                return invalid(format!(
                    "action '{}': duplicate input '{}'",
                    self.name, input.name
                ));
            }
            if !input.allowed_values.is_empty() && input.value_type != ValueType::String {
                return invalid(format!(
                    "action '{}': allowed values on non-string input '{}'",
                    self.name, input.name
                ));
            }
            if let Some(default) = &input.default {
                if !input.value_type.matches(default) {
                    return invalid(format!(
                        "action '{}': default for '{}' is not a {}",
                        self.name, input.name, input.value_type
                    ));
                }
                if let (false, Some(s)) = (input.allowed_values.is_empty(), default.as_str()) {
                    if !input.allowed_values.iter().any(|v| v == s) {
                        return invalid(format!(
                            "action '{}': default '{}' for '{}' is not an allowed value",
                            self.name, s, input.name
                        ));
                    }
                }
            }
        }

        Ok(())
    }

    /// Check that `inputs` satisfies the declared input contract.
    pub fn validate_inputs(&self, inputs: &ValueMap) -> Result<(), ActionError> {
        for spec in &self.inputs {
            let value = inputs.get(&spec.name).filter(|v| !v.is_null());

            let Some(value) = value else {
                if spec.required {
                    return Err(ActionError::MissingInput {
                        action: self.name.clone(),
                        input: spec.name.clone(),
                    });
                }
                continue;
            };

            if !spec.value_type.matches(value) {
                return Err(ActionError::InvalidInput {
                    action: self.name.clone(),
                    input: spec.name.clone(),
                    reason: format!("expected {}, got {}", spec.value_type, json_type(value)),
                });
            }

            if let (false, Some(s)) = (spec.allowed_values.is_empty(), value.as_str()) {
                if !spec.allowed_values.iter().any(|v| v == s) {
                    return Err(ActionError::InvalidInput {
                        action: self.name.clone(),
                        input: spec.name.clone(),
                        reason: format!("must be one of: {}", spec.allowed_values.join(", ")),
                    });
                }
            }
        }
        Ok(())
    }

    /// Fill declared defaults for absent inputs. Present values always win.
    pub fn apply_defaults(&self, mut inputs: ValueMap) -> ValueMap {
        for spec in &self.inputs {
            let Some(default) = &spec.default else {
                continue;
            };
            let absent = inputs.get(&spec.name).map_or(true, Value::is_null);
            if absent {
                inputs.insert(spec.name.clone(), default.clone());
            }
        }
        inputs
    }

    pub fn metadata(&self) -> ActionMetadata {
        ActionMetadata {
            name: self.name.clone(),
            description: self.description.clone(),
            category: self.category,
            tags: self.tags.iter().cloned().collect(),
            tier: self.tier,
            estimated_duration_ms: self.estimated_duration.as_millis() as u64,
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Lightweight description of an action for discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionMetadata {
    pub name: String,
    pub description: String,
    pub category: Category,
    pub tags: Vec<String>,
    pub tier: Tier,
    pub estimated_duration_ms: u64,
}

/// One requested invocation inside a call set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionCall {
    pub action: String,
    #[serde(default)]
    pub inputs: ValueMap,
}

impl ActionCall {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            inputs: ValueMap::new(),
        }
    }

    pub fn with_input(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inputs.insert(key.into(), value.into());
        self
    }
}
