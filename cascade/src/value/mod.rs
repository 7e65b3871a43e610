//! Parameter values: those currently held by a form, and those submitted with it.


use serde::Serialize;

use crate::{
    choices::scalar_string,
    param::{Parameter, ParameterName},
};

/// Joins the values of a multiple selection into a single string.
pub const MULTI_VALUE_SEPARATOR: &str = ",";

/// The current value of one parameter in a form.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FormValue {
    Single(String),
    Multiple(Vec<String>),
}

impl FormValue {
    /// The flat representation that scripts see.
    pub fn flatten(&self) -> String {
        match self {
            FormValue::Single(value) => value.clone(),
            FormValue::Multiple(values) => values.join(MULTI_VALUE_SEPARATOR),
        }
    }
}

impl From<&str> for FormValue {
    fn from(value: &str) -> Self {
        FormValue::Single(value.to_string())
    }
}

impl From<String> for FormValue {
    fn from(value: String) -> Self {
        FormValue::Single(value)
    }
}

impl From<Vec<String>> for FormValue {
    fn from(value: Vec<String>) -> Self {
        FormValue::Multiple(value)
    }
}

/// Current values of the parameters of a form, as known to the UI when a change happened.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ValueSnapshot {
    values: hashbrown::HashMap<ParameterName, FormValue>,
}

impl ValueSnapshot {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn set(&mut self, name: ParameterName, value: impl Into<FormValue>) {
        self.values.insert(name, value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FormValue> {
        self.values.get(name)
    }

    /// Flat value of `name`, if present.
    pub fn flat(&self, name: &str) -> Option<String> {
        self.get(name).map(FormValue::flatten)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<V> FromIterator<(ParameterName, V)> for ValueSnapshot
where
    V: Into<FormValue>,
{
    fn from_iter<T: IntoIterator<Item = (ParameterName, V)>>(iter: T) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(name, value)| (name, value.into()))
                .collect(),
        }
    }
}

/// Final value of a parameter as submitted with the form.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ParameterValue {
    pub name: ParameterName,
    pub value: String,
    pub description: String,
}

const VALUE_JSON_KEY: &str = "value";

impl ParameterValue {
    /// Creates the value of `parameter` from a plain string.
    pub fn from_string(parameter: &Parameter, value: impl Into<String>) -> Self {
        Self {
            name: parameter.name().clone(),
            value: value.into(),
            description: parameter.description().to_string(),
        }
    }

    /// Creates the value of `parameter` from the object that the form submits for it,
    /// `{"name": ..., "value": ...}`.
    ///
    /// A list `value` (a multiple selection) is joined with [MULTI_VALUE_SEPARATOR], and a
    /// missing or `null` value is the empty string.
    pub fn from_submission(parameter: &Parameter, submitted: &serde_json::Value) -> Self {
        log::debug!(
            "Creating value for parameter {:?} from {submitted}.",
            parameter.name()
        );
        let value = match submitted.get(VALUE_JSON_KEY) {
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .map(scalar_string)
                .collect::<Vec<_>>()
                .join(MULTI_VALUE_SEPARATOR),
            Some(value) => scalar_string(value),
            None => String::new(),
        };
        Self::from_string(parameter, value)
    }
}
