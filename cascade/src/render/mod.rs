//! Markup independent rendering decisions for a parameter's [ChoiceSet].
//!
//! Each [WidgetKind] maps to a row of decisions (see [WidgetKind::decisions]): how many entries
//! may be selected, what is selected when the script gave no explicit selection, and whether
//! the widget can be filtered.


use serde::Serialize;

use crate::{
    choices::{Choice, ChoiceSet},
    param::{Parameter, VisibleItemCount, WidgetKind},
    value::{FormValue, MULTI_VALUE_SEPARATOR},
};

/// Cap on the number of rows shown when the parameter does not declare its own count.
pub const DEFAULT_MAX_VISIBLE_ITEM_COUNT: usize = 10;

/// Number of rows to show for `choice_count` choices.
pub fn visible_item_count(choice_count: usize, declared: VisibleItemCount) -> usize {
    match declared {
        VisibleItemCount::Fixed(count) => count.get(),
        VisibleItemCount::Auto => choice_count.min(DEFAULT_MAX_VISIBLE_ITEM_COUNT),
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum SelectionMode {
    /// At most one entry may be selected.
    Single,
    /// Any number of entries may be selected, in order.
    Multiple,
    /// Display only.
    Display,
}

#[derive(Clone, Copy, Debug)]
struct WidgetDecisions {
    selection: SelectionMode,
    /// Selects the first entry when the script selected nothing explicitly.
    default_first: bool,
    filter_supported: bool,
}

impl WidgetKind {
    fn decisions(self) -> WidgetDecisions {
        use SelectionMode::*;
        use WidgetKind::*;
        let (selection, default_first, filter_supported) = match self {
            // A plain select element always has some entry selected.
            SingleSelect => (Single, true, true),
            MultiSelect => (Multiple, false, true),
            Checkbox => (Multiple, false, false),
            // Radio groups may start with nothing checked.
            Radio => (Single, false, false),
            TextBox => (Single, true, false),
            OrderedList | UnorderedList | FormattedHtml | FormattedHiddenHtml => {
                (Display, false, false)
            }
        };
        WidgetDecisions {
            selection,
            default_first,
            filter_supported,
        }
    }

    /// Whether the widget can be shown with nothing selected.
    pub fn supports_no_selection(self) -> bool {
        !self.decisions().default_first
    }

    /// Whether the widget can offer a filter box.
    pub fn supports_filter(self) -> bool {
        self.decisions().filter_supported
    }
}

/// Final selected value(s) of a rendered parameter.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "mode", content = "values", rename_all = "snake_case")]
pub enum Selection {
    /// Nothing is selected, or the widget is display only.
    None,
    Single(String),
    Multiple(Vec<String>),
}

impl Selection {
    /// The single string value submitted with the form. Multiple values are joined with
    /// [MULTI_VALUE_SEPARATOR].
    pub fn form_value(&self) -> String {
        match self {
            Selection::None => String::new(),
            Selection::Single(value) => value.clone(),
            Selection::Multiple(values) => values.join(MULTI_VALUE_SEPARATOR),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStatus {
    Ok,
    /// Both the script and its fallback failed. The choices are empty.
    Failed,
}

/// Options of the parameter being rendered.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RenderOptions {
    pub widget: WidgetKind,
    pub filterable: bool,
    pub visible_item_count: VisibleItemCount,
    pub omit_value_field: bool,
}

impl From<&Parameter> for RenderOptions {
    fn from(value: &Parameter) -> Self {
        Self {
            widget: value.widget(),
            filterable: value.filterable(),
            visible_item_count: value.visible_item_count(),
            omit_value_field: value.omit_value_field(),
        }
    }
}

/// Payload handed back to the UI layer for one parameter.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct RenderedChoices {
    pub widget: WidgetKind,
    pub status: EvaluationStatus,
    /// Choices in script order, with `selected` reflecting [Self::selection].
    pub choices: ChoiceSet,
    pub selection: Selection,
    pub filter_enabled: bool,
    pub visible_item_count: usize,
    pub omit_value_field: bool,
}

impl RenderedChoices {
    pub fn is_failed(&self) -> bool {
        self.status == EvaluationStatus::Failed
    }

    /// See [Selection::form_value].
    pub fn form_value(&self) -> String {
        self.selection.form_value()
    }

    /// Value that the parameter holds once this is shown. `None` for display only widgets,
    /// which hold no value of their own.
    pub fn held_value(&self) -> Option<FormValue> {
        match &self.selection {
            _ if self.widget.decisions().selection == SelectionMode::Display => None,
            Selection::None => Some(FormValue::Single(String::new())),
            Selection::Single(value) => Some(FormValue::Single(value.clone())),
            Selection::Multiple(values) => Some(FormValue::Multiple(values.clone())),
        }
    }
}

/// Applies the rendering policy of `options.widget` to `choices`.
pub fn render(choices: &ChoiceSet, options: &RenderOptions) -> RenderedChoices {
    let decisions = options.widget.decisions();
    let selected = selected_indices(choices, &decisions);

    let selection = match decisions.selection {
        SelectionMode::Display => Selection::None,
        SelectionMode::Single => match selected.first() {
            Some(&index) => Selection::Single(value_at(choices, index)),
            None => Selection::None,
        },
        SelectionMode::Multiple => Selection::Multiple(
            selected
                .iter()
                .map(|&index| value_at(choices, index))
                .collect(),
        ),
    };

    let rendered = ChoiceSet::new(
        choices
            .iter()
            .enumerate()
            .map(|(index, choice)| Choice {
                selected: selected.contains(&index),
                ..choice.clone()
            })
            .collect(),
        choices.has_explicit_selection(),
    );

    RenderedChoices {
        widget: options.widget,
        status: EvaluationStatus::Ok,
        visible_item_count: visible_item_count(rendered.len(), options.visible_item_count),
        choices: rendered,
        selection,
        filter_enabled: options.filterable && decisions.filter_supported,
        omit_value_field: options.omit_value_field,
    }
}

/// Renders a parameter whose evaluation failed.
pub fn render_failed(options: &RenderOptions) -> RenderedChoices {
    let decisions = options.widget.decisions();
    RenderedChoices {
        widget: options.widget,
        status: EvaluationStatus::Failed,
        choices: ChoiceSet::empty(),
        selection: match decisions.selection {
            SelectionMode::Multiple => Selection::Multiple(Vec::new()),
            _ => Selection::None,
        },
        filter_enabled: options.filterable && decisions.filter_supported,
        visible_item_count: visible_item_count(0, options.visible_item_count),
        omit_value_field: options.omit_value_field,
    }
}

/// Indices of the entries that end up selected. Single selection widgets keep only the last
/// explicitly selected entry.
fn selected_indices(choices: &ChoiceSet, decisions: &WidgetDecisions) -> Vec<usize> {
    if decisions.selection == SelectionMode::Display {
        return Vec::new();
    }

    if choices.has_explicit_selection() && choices.iter().any(|choice| choice.selected) {
        let flagged = choices
            .iter()
            .enumerate()
            .filter(|(_, choice)| choice.selected)
            .map(|(index, _)| index);
        return match decisions.selection {
            SelectionMode::Single => flagged.last().into_iter().collect(),
            _ => flagged.collect(),
        };
    }

    if decisions.default_first && !choices.is_empty() {
        vec![0]
    } else {
        Vec::new()
    }
}

fn value_at(choices: &ChoiceSet, index: usize) -> String {
    choices
        .iter()
        .nth(index)
        .map(|choice| choice.value.clone())
        .unwrap_or_default()
}
