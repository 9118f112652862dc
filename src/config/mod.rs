//! Query-builder configuration.
//!
//! A [`Config`] is a validated record of conjunctions, operators, widgets,
//! types, functions and fields. It is only produced by [`ConfigBuilder`],
//! which composes a base [`Preset`] with explicit override layers.

pub mod builder;
pub mod preset;

pub use builder::ConfigBuilder;
pub use preset::Preset;

use crate::callbacks::{
    FormatOpFn, FormatValueFn, MongoFormatOpFn, MongoFormatValueFn, SqlFormatValueFn,
    ValidateValueFn,
};
use crate::fetch::SimulatedFetch;
use crate::value::{ListItem, ValueSource, ValueType};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// How a group joins its children.
#[derive(Debug, Clone, PartialEq)]
pub struct ConjunctionDef {
    pub label: String,
    pub sql_conj: String,
    pub mongo_conj: String,
    pub json_logic_conj: String,
    pub reversed_conj: Option<String>,
}

/// Label and placeholder of one operand slot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValueLabel {
    pub label: String,
    pub placeholder: Option<String>,
}

impl ValueLabel {
    pub fn new(label: impl Into<String>, placeholder: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            placeholder: Some(placeholder.into()),
        }
    }
}

impl From<&str> for ValueLabel {
    fn from(label: &str) -> Self {
        Self {
            label: label.to_string(),
            placeholder: None,
        }
    }
}

/// Extra option of an operator (the proximity distance).
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorOptions {
    pub option_label: String,
    pub option_text_before: String,
    pub option_placeholder: String,
    pub min_proximity: u32,
    pub max_proximity: u32,
    pub default_proximity: u32,
    pub custom_props: Map<String, Value>,
}

impl Default for OperatorOptions {
    fn default() -> Self {
        Self {
            option_label: "Near".to_string(),
            option_text_before: "Near".to_string(),
            option_placeholder: "Select words between".to_string(),
            min_proximity: 2,
            max_proximity: 10,
            default_proximity: 2,
            custom_props: Map::new(),
        }
    }
}

impl OperatorOptions {
    /// Proximity from a rule's operator options, falling back to the default.
    pub fn proximity(&self, options: Option<&Map<String, Value>>) -> u64 {
        options
            .and_then(|o| o.get("proximity"))
            .and_then(Value::as_u64)
            .unwrap_or(self.default_proximity as u64)
    }
}

/// Shape of the JsonLogic expression an operator produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonLogicShape {
    /// `{op: [var, value..]}`; unary operators compare against `null`.
    #[default]
    Binary,
    /// `{op: [value, var]}`, e.g. substring `in`.
    ValueFirst,
    /// `{op: [from, var, to]}`.
    Range,
    /// `{op: [var]}`.
    Unary,
}

/// A comparison/relation and how it renders in each target format.
#[derive(Debug, Clone)]
pub struct OperatorDef {
    pub label: String,
    pub label_for_format: Option<String>,
    pub reversed_op: Option<String>,
    pub cardinality: usize,
    pub sql_op: Option<String>,
    pub sql_format_op: Option<FormatOpFn>,
    pub format_op: Option<FormatOpFn>,
    pub json_logic: Option<String>,
    pub json_logic_shape: JsonLogicShape,
    pub json_logic_negate: bool,
    pub mongo_op: Option<String>,
    pub mongo_format_op: Option<MongoFormatOpFn>,
    pub value_labels: Vec<ValueLabel>,
    pub text_separators: Vec<String>,
    pub options: Option<OperatorOptions>,
}

impl Default for OperatorDef {
    fn default() -> Self {
        Self {
            label: String::new(),
            label_for_format: None,
            reversed_op: None,
            cardinality: 1,
            sql_op: None,
            sql_format_op: None,
            format_op: None,
            json_logic: None,
            json_logic_shape: JsonLogicShape::Binary,
            json_logic_negate: false,
            mongo_op: None,
            mongo_format_op: None,
            value_labels: Vec::new(),
            text_separators: Vec::new(),
            options: None,
        }
    }
}

impl OperatorDef {
    /// Label used by text formatters.
    pub fn format_label(&self) -> &str {
        self.label_for_format.as_deref().unwrap_or(&self.label)
    }
}

/// A value editor and its per-format value formatters.
#[derive(Debug, Clone)]
pub struct WidgetDef {
    pub value_type: ValueType,
    pub value_src: ValueSource,
    pub value_label: Option<String>,
    pub value_placeholder: Option<String>,
    pub format_value: FormatValueFn,
    pub sql_format_value: SqlFormatValueFn,
    pub mongo_format_value: MongoFormatValueFn,
    pub custom_props: Map<String, Value>,
    pub date_format: Option<String>,
    pub value_format: Option<String>,
    pub time_format: Option<String>,
    pub use_12_hours: bool,
}

impl WidgetDef {
    /// A widget with JSON-preserving formatters.
    pub fn new(value_type: ValueType) -> Self {
        Self {
            value_type,
            value_src: ValueSource::Value,
            value_label: None,
            value_placeholder: None,
            format_value: preset::format_scalar,
            sql_format_value: crate::callbacks::sql_escape,
            mongo_format_value: preset::mongo_identity,
            custom_props: Map::new(),
            date_format: None,
            value_format: None,
            time_format: None,
            use_12_hours: false,
        }
    }
}

/// Operators and props a type enables for one widget.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TypeWidget {
    pub operators: Vec<String>,
    pub widget_props: Map<String, Value>,
    pub op_props: BTreeMap<String, Vec<ValueLabel>>,
}

impl TypeWidget {
    pub fn with_operators(operators: &[&str]) -> Self {
        Self {
            operators: operators.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }
}

/// Behaviour shared by every field of one value type.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TypeDef {
    pub value_sources: Vec<ValueSource>,
    pub default_operator: Option<String>,
    /// Ordered: the first widget listing an operator is the default for it.
    pub widgets: Vec<(String, TypeWidget)>,
}

/// One typed argument of a function.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncArg {
    pub arg_type: ValueType,
    pub value_sources: Vec<ValueSource>,
}

/// A function usable as the right hand side of a rule.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncDef {
    pub label: String,
    pub sql_func: Option<String>,
    pub mongo_func: Option<String>,
    pub json_logic: Option<String>,
    pub return_type: ValueType,
    pub args: Vec<(String, FuncArg)>,
}

/// Constraints and UI preferences of a single field.
#[derive(Debug, Clone, Default)]
pub struct FieldSettings {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
    pub max_length: Option<usize>,
    pub date_format: Option<String>,
    pub value_format: Option<String>,
    pub time_format: Option<String>,
    pub list_values: Option<Vec<ListItem>>,
    pub async_fetch: Option<SimulatedFetch>,
    pub use_async_search: bool,
    pub use_load_more: bool,
    pub force_async_search: bool,
    pub allow_custom_values: bool,
    pub validate_value: Option<ValidateValueFn>,
}

/// One queryable attribute.
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub label: String,
    pub field_type: ValueType,
    pub value_sources: Option<Vec<ValueSource>>,
    pub prefer_widgets: Vec<String>,
    pub operators: Option<Vec<String>>,
    pub default_value: Option<Value>,
    pub funcs: Vec<String>,
    pub field_settings: FieldSettings,
    pub main_widget_props: Map<String, Value>,
}

impl FieldDef {
    pub fn new(label: impl Into<String>, field_type: ValueType) -> Self {
        Self {
            label: label.into(),
            field_type,
            value_sources: None,
            prefer_widgets: Vec::new(),
            operators: None,
            default_value: None,
            funcs: Vec::new(),
            field_settings: FieldSettings::default(),
            main_widget_props: Map::new(),
        }
    }
}

/// Global behaviour switches.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub show_labels: bool,
    pub show_not: bool,
    pub default_conjunction: String,
    pub max_nesting: Option<usize>,
    pub remove_incomplete_rules_on_load: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            show_labels: false,
            show_not: true,
            default_conjunction: "AND".to_string(),
            max_nesting: None,
            remove_incomplete_rules_on_load: false,
        }
    }
}

/// A validated query-builder configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) conjunctions: BTreeMap<String, ConjunctionDef>,
    pub(crate) operators: BTreeMap<String, OperatorDef>,
    pub(crate) widgets: BTreeMap<String, WidgetDef>,
    pub(crate) types: BTreeMap<ValueType, TypeDef>,
    pub(crate) funcs: BTreeMap<String, FuncDef>,
    pub(crate) fields: BTreeMap<String, FieldDef>,
    pub(crate) settings: Settings,
}

impl Config {
    pub fn conjunction(&self, name: &str) -> Option<&ConjunctionDef> {
        self.conjunctions.get(name)
    }

    pub fn operator(&self, name: &str) -> Option<&OperatorDef> {
        self.operators.get(name)
    }

    pub fn widget(&self, name: &str) -> Option<&WidgetDef> {
        self.widgets.get(name)
    }

    pub fn type_def(&self, ty: ValueType) -> Option<&TypeDef> {
        self.types.get(&ty)
    }

    pub fn func(&self, name: &str) -> Option<&FuncDef> {
        self.funcs.get(name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldDef)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Operators a field accepts, in type widget order.
    pub fn operators_for_field(&self, field: &str) -> Vec<&str> {
        let Some(def) = self.fields.get(field) else {
            return Vec::new();
        };
        if let Some(ops) = &def.operators {
            return ops.iter().map(String::as_str).collect();
        }
        let mut ops: Vec<&str> = Vec::new();
        if let Some(ty) = self.types.get(&def.field_type) {
            for (_, tw) in &ty.widgets {
                for op in &tw.operators {
                    if !ops.contains(&op.as_str()) {
                        ops.push(op);
                    }
                }
            }
        }
        ops
    }

    /// Value sources a field accepts: field, then type, then `[value]`.
    pub fn value_sources_for(&self, field: &str) -> Vec<ValueSource> {
        let Some(def) = self.fields.get(field) else {
            return Vec::new();
        };
        if let Some(srcs) = &def.value_sources {
            return srcs.clone();
        }
        match self.types.get(&def.field_type) {
            Some(ty) if !ty.value_sources.is_empty() => ty.value_sources.clone(),
            _ => vec![ValueSource::Value],
        }
    }

    /// The widget editing `field` under operator `op`.
    ///
    /// Preferred widgets of the field win when the type enables them for the
    /// operator; otherwise the first type widget listing the operator.
    pub fn widget_for(&self, field: &str, op: &str) -> Option<(&str, &WidgetDef)> {
        let def = self.fields.get(field)?;
        let ty = self.types.get(&def.field_type)?;
        let candidates: Vec<&str> = ty
            .widgets
            .iter()
            .filter(|(_, tw)| tw.operators.iter().any(|o| o == op))
            .map(|(name, _)| name.as_str())
            .collect();

        let chosen = def
            .prefer_widgets
            .iter()
            .map(String::as_str)
            .find(|w| candidates.contains(w))
            .or_else(|| candidates.first().copied())
            .or_else(|| ty.widgets.first().map(|(name, _)| name.as_str()))?;

        self.widgets.get_key_value(chosen).map(|(k, w)| (k.as_str(), w))
    }

    /// The first widget a type declares, used for function arguments.
    pub fn widget_for_type(&self, ty: ValueType) -> Option<&WidgetDef> {
        let def = self.types.get(&ty)?;
        let (name, _) = def.widgets.first()?;
        self.widgets.get(name)
    }

    pub fn field_label<'a>(&'a self, field: &'a str) -> &'a str {
        self.fields
            .get(field)
            .map(|f| f.label.as_str())
            .unwrap_or(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        ConfigBuilder::from_preset(Preset::basic())
            .field("name", FieldDef::new("Name", ValueType::Text))
            .field(
                "qty",
                FieldDef {
                    prefer_widgets: vec!["slider".to_string()],
                    ..FieldDef::new("Qty", ValueType::Number)
                },
            )
            .field(
                "flag",
                FieldDef {
                    operators: Some(vec!["equal".to_string()]),
                    value_sources: Some(vec![ValueSource::Value]),
                    ..FieldDef::new("Flag", ValueType::Boolean)
                },
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_operators_for_field() {
        let config = config();
        let ops = config.operators_for_field("qty");
        assert!(ops.contains(&"between"));
        assert!(ops.contains(&"equal"));
        assert_eq!(config.operators_for_field("flag"), vec!["equal"]);
        assert!(config.operators_for_field("missing").is_empty());
    }

    #[test]
    fn test_widget_for_prefers_field_widgets() {
        let config = config();
        assert_eq!(config.widget_for("qty", "equal").map(|(n, _)| n), Some("slider"));
        assert_eq!(config.widget_for("qty", "between").map(|(n, _)| n), Some("number"));
        assert_eq!(config.widget_for("name", "like").map(|(n, _)| n), Some("text"));
    }

    #[test]
    fn test_value_sources_fallbacks() {
        let config = config();
        assert_eq!(config.value_sources_for("flag"), vec![ValueSource::Value]);
        assert!(config.value_sources_for("name").contains(&ValueSource::Field));
    }

    #[test]
    fn test_field_label_falls_back_to_key() {
        let config = config();
        assert_eq!(config.field_label("qty"), "Qty");
        assert_eq!(config.field_label("ghost"), "ghost");
    }
}
