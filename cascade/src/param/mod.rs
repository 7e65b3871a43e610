//! Data types that describe a single scripted choice parameter.

pub mod config;
mod core_type;

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

pub use core_type::{ParameterName, RandomName, ValueError, parse_name_list};

/// Source of a script, and whether the host should run it inside its sandbox.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct SecureScript {
    /// Script source.
    #[serde(default)]
    pub script: String,
    /// Requests that the script capability run the script sandboxed. Unsandboxed scripts are
    /// subject to the capability's approval rules.
    #[serde(default)]
    pub sandbox: bool,
}

impl SecureScript {
    pub fn new(script: impl Into<String>, sandbox: bool) -> Self {
        Self {
            script: script.into(),
            sandbox,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.script.trim().is_empty()
    }
}

/// Primary script that generates a parameter's choices, and the fallback that is run in its
/// place when it fails.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ScriptPair {
    pub primary: SecureScript,
    pub fallback: SecureScript,
}

/// Selection widget of choice and cascade parameters, as named in their configuration.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Eq,
    Hash,
    PartialEq,
    Serialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::IntoStaticStr,
)]
pub enum ChoiceType {
    #[default]
    #[serde(rename = "PT_SINGLE_SELECT")]
    #[strum(serialize = "PT_SINGLE_SELECT")]
    SingleSelect,
    #[serde(rename = "PT_MULTI_SELECT")]
    #[strum(serialize = "PT_MULTI_SELECT")]
    MultiSelect,
    #[serde(rename = "PT_CHECKBOX")]
    #[strum(serialize = "PT_CHECKBOX")]
    Checkbox,
    #[serde(rename = "PT_RADIO")]
    #[strum(serialize = "PT_RADIO")]
    Radio,
}

/// Display element of reference parameters, as named in their configuration.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Eq,
    Hash,
    PartialEq,
    Serialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::IntoStaticStr,
)]
pub enum ElementType {
    #[default]
    #[serde(rename = "ET_TEXT_BOX")]
    #[strum(serialize = "ET_TEXT_BOX")]
    TextBox,
    #[serde(rename = "ET_ORDERED_LIST")]
    #[strum(serialize = "ET_ORDERED_LIST")]
    OrderedList,
    #[serde(rename = "ET_UNORDERED_LIST")]
    #[strum(serialize = "ET_UNORDERED_LIST")]
    UnorderedList,
    #[serde(rename = "ET_FORMATTED_HTML")]
    #[strum(serialize = "ET_FORMATTED_HTML")]
    FormattedHtml,
    #[serde(rename = "ET_FORMATTED_HIDDEN_HTML")]
    #[strum(serialize = "ET_FORMATTED_HIDDEN_HTML")]
    FormattedHiddenHtml,
}

/// Every way that a parameter's choices can be presented. The rendering decisions for each kind
/// live in [crate::render].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetKind {
    SingleSelect,
    MultiSelect,
    Checkbox,
    Radio,
    TextBox,
    OrderedList,
    UnorderedList,
    FormattedHtml,
    FormattedHiddenHtml,
}

impl From<ChoiceType> for WidgetKind {
    fn from(value: ChoiceType) -> Self {
        match value {
            ChoiceType::SingleSelect => Self::SingleSelect,
            ChoiceType::MultiSelect => Self::MultiSelect,
            ChoiceType::Checkbox => Self::Checkbox,
            ChoiceType::Radio => Self::Radio,
        }
    }
}

impl From<ElementType> for WidgetKind {
    fn from(value: ElementType) -> Self {
        match value {
            ElementType::TextBox => Self::TextBox,
            ElementType::OrderedList => Self::OrderedList,
            ElementType::UnorderedList => Self::UnorderedList,
            ElementType::FormattedHtml => Self::FormattedHtml,
            ElementType::FormattedHiddenHtml => Self::FormattedHiddenHtml,
        }
    }
}

/// Number of choice rows shown without scrolling.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(try_from = "RawVisibleItemCount", into = "RawVisibleItemCount")]
pub enum VisibleItemCount {
    /// Sized to the number of choices, up to
    /// [crate::render::DEFAULT_MAX_VISIBLE_ITEM_COUNT].
    #[default]
    Auto,
    /// Exactly this many rows, regardless of the number of choices.
    Fixed(NonZeroUsize),
}

#[derive(Clone, Deserialize, Serialize)]
#[serde(untagged)]
enum RawVisibleItemCount {
    Count(usize),
    Keyword(String),
}

impl TryFrom<RawVisibleItemCount> for VisibleItemCount {
    type Error = ValueError<String>;

    fn try_from(value: RawVisibleItemCount) -> Result<Self, Self::Error> {
        const EXPECTED: &str = "a positive integer or \"auto\"";
        match value {
            RawVisibleItemCount::Count(count) => NonZeroUsize::new(count)
                .map(VisibleItemCount::Fixed)
                .ok_or_else(|| ValueError {
                    value: count.to_string(),
                    expected: EXPECTED,
                }),
            RawVisibleItemCount::Keyword(keyword) if keyword.eq_ignore_ascii_case("auto") => {
                Ok(VisibleItemCount::Auto)
            }
            RawVisibleItemCount::Keyword(keyword) => Err(ValueError {
                value: keyword,
                expected: EXPECTED,
            }),
        }
    }
}

impl From<VisibleItemCount> for RawVisibleItemCount {
    fn from(value: VisibleItemCount) -> Self {
        match value {
            VisibleItemCount::Auto => RawVisibleItemCount::Keyword("auto".into()),
            VisibleItemCount::Fixed(count) => RawVisibleItemCount::Count(count.get()),
        }
    }
}

/// Which of the three parameter flavours a [Parameter] was configured as.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, strum_macros::Display)]
pub enum Variant {
    /// Choices come from a script that references no other parameters.
    Choice,
    /// Choices are re-evaluated when any referenced parameter changes.
    Cascade,
    /// Display-only output that is re-evaluated when any referenced parameter changes.
    Reference,
}

/// A scripted choice parameter.
///
/// Parameters are immutable once constructed: a configuration change produces a new
/// [Parameter] (see [config::ParameterConfig]).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Parameter {
    name: ParameterName,
    random_name: RandomName,
    description: String,
    variant: Variant,
    scripts: ScriptPair,
    referenced: Vec<ParameterName>,
    widget: WidgetKind,
    filterable: bool,
    visible_item_count: VisibleItemCount,
    omit_value_field: bool,
}

impl Parameter {
    pub fn name(&self) -> &ParameterName {
        &self.name
    }

    /// Stable unique identifier, used by the UI for data binding across re-renders.
    pub fn random_name(&self) -> &RandomName {
        &self.random_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn scripts(&self) -> &ScriptPair {
        &self.scripts
    }

    /// Names of the other parameters that this parameter's script may read, in declared order.
    pub fn referenced_parameters(&self) -> &[ParameterName] {
        &self.referenced
    }

    pub fn widget(&self) -> WidgetKind {
        self.widget
    }

    pub fn filterable(&self) -> bool {
        self.filterable
    }

    pub fn visible_item_count(&self) -> VisibleItemCount {
        self.visible_item_count
    }

    pub fn omit_value_field(&self) -> bool {
        self.omit_value_field
    }
}
