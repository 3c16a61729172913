//! Variable Records
//!
//! This module defines the record stored for each variable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named value that may be derived from other variables.
///
/// Dependencies are an ordered set: insertion order is kept and duplicates
/// are dropped. Edges point from this variable to the ones it reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    /// Unique identifier.
    name: String,

    /// Current value. `None` until first computed or set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<Value>,

    /// Names of the variables this one is derived from.
    #[serde(default)]
    dependencies: Vec<String>,

    /// Snippet handed to the executor to compute `value`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    code: Option<String>,

    /// Declared type of the value ("number", "table", ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value_type: Option<String>,

    /// Human readable description shown to authors and executors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,

    /// Display format hint ("0.00", "percent", ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    format: Option<String>,

    /// When `value` last changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_updated: Option<DateTime<Utc>>,
}

impl Variable {
    /// Create a variable with no value and no dependencies.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            dependencies: Vec::new(),
            code: None,
            value_type: None,
            description: None,
            format: None,
            last_updated: None,
        }
    }

    /// Set the code used to compute this variable.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Declare the dependency list.
    ///
    /// This does not check for cycles or unknown names; `Document` does that
    /// when the variable is added.
    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_dependencies(dependencies.into_iter().map(Into::into).collect());
        self
    }

    /// Set an initial value.
    pub fn with_value(mut self, value: Value) -> Self {
        self.set_value(value);
        self
    }

    /// Set the declared value type.
    pub fn with_value_type(mut self, value_type: impl Into<String>) -> Self {
        self.value_type = Some(value_type.into());
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the display format.
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn value_type(&self) -> Option<&str> {
        self.value_type.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    /// Check whether this variable reads `name`.
    pub fn depends_on(&self, name: &str) -> bool {
        self.dependencies.iter().any(|d| d == name)
    }

    /// Replace the value and stamp `last_updated`.
    pub(crate) fn set_value(&mut self, value: Value) {
        self.value = Some(value);
        self.last_updated = Some(Utc::now());
    }

    /// Replace the dependency list, dropping duplicates but keeping order.
    pub(crate) fn set_dependencies(&mut self, dependencies: Vec<String>) {
        let mut unique: Vec<String> = Vec::with_capacity(dependencies.len());
        for dep in dependencies {
            if !unique.contains(&dep) {
                unique.push(dep);
            }
        }
        self.dependencies = unique;
    }

    pub(crate) fn set_code(&mut self, code: Option<String>) {
        self.code = code;
    }

    pub(crate) fn set_metadata(
        &mut self,
        value_type: Option<String>,
        description: Option<String>,
        format: Option<String>,
    ) {
        self.value_type = value_type;
        self.description = description;
        self.format = format;
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    /// Rewrite a dependency entry after a rename. Returns true if it matched.
    pub(crate) fn rename_dependency(&mut self, old: &str, new: &str) -> bool {
        let mut renamed = false;
        for dep in &mut self.dependencies {
            if dep == old {
                *dep = new.to_string();
                renamed = true;
            }
        }
        renamed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_variable_is_empty() {
        let var = Variable::new("total");
        assert_eq!(var.name(), "total");
        assert!(var.value().is_none());
        assert!(var.dependencies().is_empty());
        assert!(var.code().is_none());
        assert!(var.last_updated().is_none());
    }

    #[test]
    fn dependencies_are_an_ordered_set() {
        let var = Variable::new("c").with_dependencies(["b", "a", "b"]);
        assert_eq!(var.dependencies(), ["b".to_string(), "a".to_string()]);
        assert!(var.depends_on("a"));
        assert!(!var.depends_on("c"));
    }

    #[test]
    fn setting_value_stamps_time() {
        let mut var = Variable::new("x");
        var.set_value(json!(3));
        assert_eq!(var.value(), Some(&json!(3)));
        assert!(var.last_updated().is_some());
    }

    #[test]
    fn rename_dependency_rewrites_entry() {
        let mut var = Variable::new("c").with_dependencies(["a", "b"]);
        assert!(var.rename_dependency("a", "alpha"));
        assert!(!var.rename_dependency("zzz", "y"));
        assert_eq!(var.dependencies(), ["alpha".to_string(), "b".to_string()]);
    }

    #[test]
    fn serializes_camel_case() {
        let var = Variable::new("rate")
            .with_value_type("number")
            .with_value(json!(0.5));
        let encoded = serde_json::to_value(&var).unwrap();
        assert_eq!(encoded["valueType"], json!("number"));
        assert!(encoded.get("lastUpdated").is_some());
        assert!(encoded.get("code").is_none());

        let decoded: Variable = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, var);
    }
}
