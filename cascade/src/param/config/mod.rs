//! Serialised configuration of parameters and forms.
//!
//! This is the surface that job configurations are read from and written back to. It is only
//! validated when converted into a [Parameter].


use serde::{Deserialize, Serialize};

use super::{
    ChoiceType, ElementType, Parameter, ParameterName, RandomName, ScriptPair, SecureScript,
    ValueError, Variant, VisibleItemCount, WidgetKind, parse_name_list,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("parameter name: This field is required.")]
    MissingName,
    #[error("invalid parameter name: {0}")]
    InvalidName(#[source] ValueError<String>),
    #[error("parameter {parameter:?} has an unrecognised choice type {value:?}")]
    UnknownChoiceType {
        parameter: ParameterName,
        value: String,
    },
    #[error("parameter {parameter:?} has an invalid referenced parameter: {source}")]
    InvalidReference {
        parameter: ParameterName,
        #[source]
        source: ValueError<String>,
    },
    #[error("parameter {0:?} is defined more than once in the form")]
    DuplicateName(ParameterName),
    #[error("parsing form YAML")]
    Yaml(#[from] serde_yaml_ng::Error),
    #[error("parsing form JSON")]
    Json(#[from] serde_json::Error),
}

/// Configuration of every parameter in a form, in display order.
#[derive(Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct FormConfig {
    #[serde(default)]
    pub parameters: Vec<ParameterConfig>,
}

impl FormConfig {
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml_ng::from_str(s)?)
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml_ng::to_string(self)?)
    }
}

/// Generic properties of a parameter, wrapping its variant specific [ParameterSpec].
#[derive(Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ParameterConfig {
    pub name: String,
    /// Absent for parameters that have never been saved. One is generated upon conversion to
    /// [Parameter].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub random_name: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub spec: ParameterSpec,
}

/// Per-variant configuration.
#[derive(Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "type", content = "spec")]
pub enum ParameterSpec {
    Choice(ChoiceSpec),
    Cascade(CascadeSpec),
    Reference(ReferenceSpec),
}

/// Configures a [Variant::Choice] parameter.
#[derive(Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ChoiceSpec {
    pub script: SecureScript,
    #[serde(default)]
    pub fallback_script: SecureScript,
    /// One of the [ChoiceType] names. Blank selects [ChoiceType::SingleSelect].
    #[serde(default)]
    pub choice_type: String,
    #[serde(default)]
    pub filterable: bool,
    #[serde(default)]
    pub visible_item_count: VisibleItemCount,
}

/// Configures a [Variant::Cascade] parameter.
#[derive(Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct CascadeSpec {
    pub script: SecureScript,
    #[serde(default)]
    pub fallback_script: SecureScript,
    /// One of the [ChoiceType] names. Blank selects [ChoiceType::SingleSelect].
    #[serde(default)]
    pub choice_type: String,
    /// Comma separated names of the parameters that the scripts read.
    ///
    /// E.g. `"COUNTRY, REGION"`
    #[serde(default)]
    pub referenced_parameters: String,
    #[serde(default)]
    pub filterable: bool,
    #[serde(default)]
    pub visible_item_count: VisibleItemCount,
}

/// Configures a [Variant::Reference] parameter.
#[derive(Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ReferenceSpec {
    pub script: SecureScript,
    #[serde(default)]
    pub fallback_script: SecureScript,
    /// One of the [ElementType] names. Blank selects [ElementType::TextBox].
    #[serde(default)]
    pub choice_type: String,
    /// Comma separated names of the parameters that the scripts read.
    #[serde(default)]
    pub referenced_parameters: String,
    /// Asks the UI not to emit the hidden value field alongside the rendered output.
    #[serde(default)]
    pub omit_value_field: bool,
}

fn parse_type<T>(parameter: &ParameterName, value: &str) -> Result<T, ConfigError>
where
    T: Default + std::str::FromStr,
{
    let value = value.trim();
    if value.is_empty() {
        return Ok(T::default());
    }
    value.parse().map_err(|_| ConfigError::UnknownChoiceType {
        parameter: parameter.clone(),
        value: value.to_string(),
    })
}

fn parse_references(
    parameter: &ParameterName,
    value: &str,
) -> Result<Vec<ParameterName>, ConfigError> {
    parse_name_list(value).map_err(|source| ConfigError::InvalidReference {
        parameter: parameter.clone(),
        source,
    })
}

impl TryFrom<ParameterConfig> for Parameter {
    type Error = ConfigError;

    fn try_from(value: ParameterConfig) -> Result<Self, Self::Error> {
        if value.name.trim().is_empty() {
            return Err(ConfigError::MissingName);
        }
        let name = ParameterName::try_from(value.name.trim()).map_err(ConfigError::InvalidName)?;
        let random_name = RandomName::existing_or_generate(value.random_name.as_deref());

        let mut parameter = Parameter {
            name,
            random_name,
            description: value.description,
            variant: Variant::Choice,
            scripts: ScriptPair::default(),
            referenced: Vec::new(),
            widget: WidgetKind::SingleSelect,
            filterable: false,
            visible_item_count: VisibleItemCount::Auto,
            omit_value_field: false,
        };

        match value.spec {
            ParameterSpec::Choice(spec) => {
                let choice_type: ChoiceType = parse_type(&parameter.name, &spec.choice_type)?;
                parameter.scripts = ScriptPair {
                    primary: spec.script,
                    fallback: spec.fallback_script,
                };
                parameter.widget = choice_type.into();
                parameter.filterable = spec.filterable;
                parameter.visible_item_count = spec.visible_item_count;
            }
            ParameterSpec::Cascade(spec) => {
                let choice_type: ChoiceType = parse_type(&parameter.name, &spec.choice_type)?;
                parameter.variant = Variant::Cascade;
                parameter.referenced =
                    parse_references(&parameter.name, &spec.referenced_parameters)?;
                parameter.scripts = ScriptPair {
                    primary: spec.script,
                    fallback: spec.fallback_script,
                };
                parameter.widget = choice_type.into();
                parameter.filterable = spec.filterable;
                parameter.visible_item_count = spec.visible_item_count;
            }
            ParameterSpec::Reference(spec) => {
                let element_type: ElementType = parse_type(&parameter.name, &spec.choice_type)?;
                parameter.variant = Variant::Reference;
                parameter.referenced =
                    parse_references(&parameter.name, &spec.referenced_parameters)?;
                parameter.scripts = ScriptPair {
                    primary: spec.script,
                    fallback: spec.fallback_script,
                };
                parameter.widget = element_type.into();
                parameter.omit_value_field = spec.omit_value_field;
            }
        }

        Ok(parameter)
    }
}

impl WidgetKind {
    fn choice_type(self) -> Option<ChoiceType> {
        match self {
            WidgetKind::SingleSelect => Some(ChoiceType::SingleSelect),
            WidgetKind::MultiSelect => Some(ChoiceType::MultiSelect),
            WidgetKind::Checkbox => Some(ChoiceType::Checkbox),
            WidgetKind::Radio => Some(ChoiceType::Radio),
            _ => None,
        }
    }

    fn element_type(self) -> Option<ElementType> {
        match self {
            WidgetKind::TextBox => Some(ElementType::TextBox),
            WidgetKind::OrderedList => Some(ElementType::OrderedList),
            WidgetKind::UnorderedList => Some(ElementType::UnorderedList),
            WidgetKind::FormattedHtml => Some(ElementType::FormattedHtml),
            WidgetKind::FormattedHiddenHtml => Some(ElementType::FormattedHiddenHtml),
            _ => None,
        }
    }
}

impl From<&Parameter> for ParameterConfig {
    /// Produces the configuration to persist for `value`, including its random name so that it
    /// is never regenerated.
    fn from(value: &Parameter) -> Self {
        let scripts = value.scripts.clone();
        let references = value
            .referenced
            .iter()
            .map(ParameterName::as_ref)
            .collect::<Vec<_>>()
            .join(", ");
        let choice_type = value
            .widget
            .choice_type()
            .map(|choice_type| choice_type.to_string())
            .unwrap_or_default();

        let spec = match value.variant {
            Variant::Choice => ParameterSpec::Choice(ChoiceSpec {
                script: scripts.primary,
                fallback_script: scripts.fallback,
                choice_type,
                filterable: value.filterable,
                visible_item_count: value.visible_item_count,
            }),
            Variant::Cascade => ParameterSpec::Cascade(CascadeSpec {
                script: scripts.primary,
                fallback_script: scripts.fallback,
                choice_type,
                referenced_parameters: references,
                filterable: value.filterable,
                visible_item_count: value.visible_item_count,
            }),
            Variant::Reference => ParameterSpec::Reference(ReferenceSpec {
                script: scripts.primary,
                fallback_script: scripts.fallback,
                choice_type: value
                    .widget
                    .element_type()
                    .map(|element_type| element_type.to_string())
                    .unwrap_or_default(),
                referenced_parameters: references,
                omit_value_field: value.omit_value_field,
            }),
        };

        Self {
            name: value.name.to_string(),
            random_name: Some(value.random_name.as_ref().to_string()),
            description: value.description.clone(),
            spec,
        }
    }
}

#[cfg(any(test, feature = "testing"))]
impl testutils::DefaultForTest for SecureScript {
    fn default_for_test() -> Self {
        Self::new("return []", true)
    }
}
