//! Normalisation of script results into ordered [ChoiceSet]s.


use serde::Serialize;
use serde_json::Value;

/// One selectable entry.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Choice {
    pub label: String,
    pub value: String,
    pub selected: bool,
}

impl Choice {
    pub fn new(label: impl Into<String>, value: impl Into<String>, selected: bool) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            selected,
        }
    }
}

/// Ordered choices produced by a single evaluation. Order is exactly as the script returned
/// them.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ChoiceSet {
    choices: Vec<Choice>,
    /// Whether the script result selected any entry with a `selected: true` flag. When it did
    /// not, the widget's default selection rule applies.
    explicit_selection: bool,
}

impl ChoiceSet {
    pub fn new(choices: Vec<Choice>, explicit_selection: bool) -> Self {
        Self {
            choices,
            explicit_selection,
        }
    }

    pub fn empty() -> Self {
        Default::default()
    }

    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.choices.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Choice> {
        self.choices.iter()
    }

    pub fn has_explicit_selection(&self) -> bool {
        self.explicit_selection
    }

    pub fn labels(&self) -> Vec<&str> {
        self.choices.iter().map(|choice| choice.label.as_str()).collect()
    }

    pub fn values(&self) -> Vec<&str> {
        self.choices.iter().map(|choice| choice.value.as_str()).collect()
    }
}

impl Serialize for ChoiceSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.choices.serialize(serializer)
    }
}

impl<'a> IntoIterator for &'a ChoiceSet {
    type Item = &'a Choice;
    type IntoIter = std::slice::Iter<'a, Choice>;

    fn into_iter(self) -> Self::IntoIter {
        self.choices.iter()
    }
}

/// Describes why a script result could not be turned into a [ChoiceSet].
#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum ShapeError {
    #[error("script returned null")]
    Null,
    #[error("script returned a bare {0}, expected a list or mapping")]
    Scalar(&'static str),
    #[error("list entry {index} is a {kind}, expected a scalar")]
    NonScalarListEntry { index: usize, kind: &'static str },
    #[error("mapping entry {label:?} is a {kind}, expected a scalar or an object with a \"value\"")]
    NonScalarMappingEntry { label: String, kind: &'static str },
    #[error("mapping entry {label:?} has no \"value\" field")]
    MissingValue { label: String },
    #[error("mapping entry {label:?} has a non-boolean \"selected\" flag")]
    InvalidSelectedFlag { label: String },
}

/// Whether a bare scalar script result is accepted as a single entry. Display elements such as
/// formatted HTML are typically produced from a single string.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScalarResult {
    Reject,
    AcceptAsSingleEntry,
}

const VALUE_KEY: &str = "value";
const SELECTED_KEY: &str = "selected";

/// Converts a script's return value into a [ChoiceSet].
///
/// Supported shapes:
///
/// * An object whose entries are objects, `{label: {"value": v, "selected": b}}`. The key is
///   the label. `selected` is optional.
/// * A list of scalars. Each scalar is both label and value.
/// * An object of scalars, `{label: value}`, with nothing selected.
///
/// The two object forms may be mixed within one object. Order is preserved, and nothing is
/// sorted or deduplicated.
pub fn normalize(value: &Value, scalar: ScalarResult) -> Result<ChoiceSet, ShapeError> {
    match value {
        Value::Null => Err(ShapeError::Null),
        Value::Object(entries) => normalize_mapping(entries),
        Value::Array(items) => normalize_list(items),
        other => match scalar {
            ScalarResult::AcceptAsSingleEntry => {
                let text = scalar_string(other);
                Ok(ChoiceSet::new(vec![Choice::new(text.clone(), text, false)], false))
            }
            ScalarResult::Reject => Err(ShapeError::Scalar(kind_name(other))),
        },
    }
}

fn normalize_list(items: &[Value]) -> Result<ChoiceSet, ShapeError> {
    let choices = items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            if is_scalar(item) {
                let text = scalar_string(item);
                Ok(Choice::new(text.clone(), text, false))
            } else {
                Err(ShapeError::NonScalarListEntry {
                    index,
                    kind: kind_name(item),
                })
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ChoiceSet::new(choices, false))
}

fn normalize_mapping(entries: &serde_json::Map<String, Value>) -> Result<ChoiceSet, ShapeError> {
    let mut explicit_selection = false;
    let mut choices = Vec::with_capacity(entries.len());

    for (label, entry) in entries {
        let choice = match entry {
            Value::Object(fields) => {
                let value = fields.get(VALUE_KEY).ok_or_else(|| ShapeError::MissingValue {
                    label: label.clone(),
                })?;
                if !is_scalar(value) {
                    return Err(ShapeError::NonScalarMappingEntry {
                        label: label.clone(),
                        kind: kind_name(value),
                    });
                }
                let selected = match fields.get(SELECTED_KEY) {
                    None => false,
                    Some(Value::Bool(selected)) => {
                        explicit_selection |= *selected;
                        *selected
                    }
                    Some(_) => {
                        return Err(ShapeError::InvalidSelectedFlag {
                            label: label.clone(),
                        });
                    }
                };
                Choice::new(label.clone(), scalar_string(value), selected)
            }
            Value::Array(_) => {
                return Err(ShapeError::NonScalarMappingEntry {
                    label: label.clone(),
                    kind: kind_name(entry),
                });
            }
            scalar => Choice::new(label.clone(), scalar_string(scalar), false),
        };
        choices.push(choice);
    }

    Ok(ChoiceSet::new(choices, explicit_selection))
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

/// Canonical string form of a scalar. `null` is the empty string.
pub(crate) fn scalar_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}
