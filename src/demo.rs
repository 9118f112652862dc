//! The demo configuration: the basic preset with a custom text widget, a
//! 12-hour time type, relabelled operators, one function and a field
//! catalogue covering every value type.

use crate::callbacks::{FormattedValue, display_string, json_string};
use crate::config::{
    Config, ConfigBuilder, FieldDef, FieldSettings, FuncArg, FuncDef, OperatorDef,
    OperatorOptions, Preset, TypeDef, TypeWidget, ValueLabel, WidgetDef,
};
use crate::error::QbResult;
use crate::fetch::SimulatedFetch;
use crate::tree::JsonGroup;
use crate::value::{ListItem, ValueSource, ValueType, moment_to_chrono};
use chrono::{Datelike, NaiveDate};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

/// Items served by the autocomplete field.
pub fn demo_list_values() -> Vec<ListItem> {
    [
        "A", "AA", "AAA1", "AAA2", "B", "C", "D", "E", "F", "G", "H", "I", "J",
    ]
    .into_iter()
    .map(|title| ListItem::new(title.to_lowercase(), title))
    .collect()
}

/// The query loaded on start: an empty root group.
pub fn initial_query_value() -> JsonGroup {
    JsonGroup::new()
}

// ============================================================================
// Callbacks
// ============================================================================

/// Text widget display: plain string for display, JSON otherwise.
pub fn text_format_value(value: &Value, is_for_display: bool) -> String {
    if is_for_display {
        display_string(value)
    } else {
        json_string(value)
    }
}

/// Text widget storage format: the raw value with `PAT` appended.
pub fn text_sql_format_value(value: &Value) -> String {
    format!("{}PAT", display_string(value))
}

/// `<field> <label for format> <value>`.
pub fn format_with_label(
    field: &str,
    _op: &str,
    value: &FormattedValue,
    op_def: &OperatorDef,
    _options: Option<&Map<String, Value>>,
) -> String {
    format!("{} {} {}", field, op_def.format_label(), value)
}

/// `{field: {"$eq": value}}`, or `{"$eq": [field, value]}` as an expression.
pub fn mongo_eq(
    field: &str,
    _op: &str,
    value: &Value,
    use_expr: bool,
    _op_def: &OperatorDef,
) -> Value {
    if use_expr {
        return json!({"$eq": [field, value]});
    }
    let mut inner = Map::new();
    inner.insert("$eq".to_string(), value.clone());
    let mut outer = Map::new();
    outer.insert(field.to_string(), Value::Object(inner));
    Value::Object(outer)
}

/// Accept only dates in the current calendar year.
pub fn validate_current_year(value: &Value, settings: &FieldSettings) -> Option<String> {
    let format = moment_to_chrono(settings.value_format.as_deref().unwrap_or("YYYY-MM-DD"));
    let year = value
        .as_str()
        .and_then(|s| NaiveDate::parse_from_str(s, &format).ok())
        .map(|d| d.year());

    if year == Some(chrono::Local::now().year()) {
        None
    } else {
        Some("Please use current year".to_string())
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Build the demo configuration.
pub fn demo_config() -> QbResult<Config> {
    fields(overrides(ConfigBuilder::from_preset(Preset::basic()))).build()
}

fn overrides(builder: ConfigBuilder) -> ConfigBuilder {
    let mut text_props = Map::new();
    text_props.insert("maxLength".to_string(), json!(10));

    let mut time_props = Map::new();
    time_props.insert("valuePlaceholder".to_string(), json!("Time"));
    time_props.insert("timeFormat".to_string(), json!("h:mm:ss A"));
    time_props.insert("use12Hours".to_string(), json!(true));
    let mut time_op_props = BTreeMap::new();
    time_op_props.insert(
        "between".to_string(),
        vec![ValueLabel::from("Time from"), ValueLabel::from("Time to")],
    );

    builder
        .widget(
            "text",
            WidgetDef {
                value_label: Some("Text".to_string()),
                value_placeholder: Some("Enter text".to_string()),
                format_value: text_format_value,
                sql_format_value: text_sql_format_value,
                custom_props: text_props,
                ..WidgetDef::new(ValueType::Text)
            },
        )
        .type_def(
            ValueType::Time,
            TypeDef {
                value_sources: vec![ValueSource::Value, ValueSource::Field, ValueSource::Func],
                default_operator: Some("equal".to_string()),
                widgets: vec![(
                    "time".to_string(),
                    TypeWidget {
                        operators: vec!["equal".to_string(), "between".to_string()],
                        widget_props: time_props,
                        op_props: time_op_props,
                    },
                )],
            },
        )
        .operator(
            "equal",
            OperatorDef {
                label: "testEqual".to_string(),
                label_for_format: Some("==".to_string()),
                reversed_op: Some("not_equal".to_string()),
                cardinality: 1,
                sql_format_op: Some(format_with_label),
                format_op: Some(format_with_label),
                mongo_format_op: Some(mongo_eq),
                ..OperatorDef::default()
            },
        )
        .patch_operator("proximity", |base| OperatorDef {
            value_labels: vec![
                ValueLabel::new("Word 1", "Enter first word"),
                ValueLabel::new("Word 2", "Enter second word"),
            ],
            text_separators: Vec::new(),
            options: Some(OperatorOptions {
                option_label: "Near".to_string(),
                option_text_before: "Near".to_string(),
                option_placeholder: "Select words between".to_string(),
                min_proximity: 2,
                max_proximity: 10,
                default_proximity: 2,
                custom_props: Map::new(),
            }),
            ..base
        })
        .patch_operator("between", |base| OperatorDef {
            value_labels: vec!["Value from".into(), "Value to".into()],
            text_separators: vec!["from".to_string(), "to".to_string()],
            ..base
        })
        .func(
            "lower",
            FuncDef {
                label: "Lowercase".to_string(),
                sql_func: Some("LOWER".to_string()),
                mongo_func: Some("$toLower".to_string()),
                json_logic: None,
                return_type: ValueType::Text,
                args: vec![(
                    "str".to_string(),
                    FuncArg {
                        arg_type: ValueType::Text,
                        value_sources: vec![ValueSource::Value, ValueSource::Field],
                    },
                )],
            },
        )
}

fn values_only() -> Option<Vec<ValueSource>> {
    Some(vec![ValueSource::Value])
}

fn prefer(widgets: &[&str]) -> Vec<String> {
    widgets.iter().map(|w| w.to_string()).collect()
}

fn fields(builder: ConfigBuilder) -> ConfigBuilder {
    let mut stock_props = Map::new();
    stock_props.insert("labelYes".to_string(), json!("+"));
    stock_props.insert("labelNo".to_string(), json!("-"));

    builder
        .field(
            "bio",
            FieldDef {
                prefer_widgets: prefer(&["textarea"]),
                field_settings: FieldSettings {
                    max_length: Some(1000),
                    ..FieldSettings::default()
                },
                ..FieldDef::new("Bio", ValueType::Text)
            },
        )
        .field(
            "qty",
            FieldDef {
                value_sources: values_only(),
                prefer_widgets: prefer(&["number"]),
                field_settings: FieldSettings {
                    min: Some(0.0),
                    ..FieldSettings::default()
                },
                ..FieldDef::new("Qty", ValueType::Number)
            },
        )
        .field(
            "time",
            FieldDef {
                value_sources: values_only(),
                prefer_widgets: prefer(&["number"]),
                field_settings: FieldSettings {
                    min: Some(0.0),
                    ..FieldSettings::default()
                },
                ..FieldDef::new("time", ValueType::Time)
            },
        )
        .field(
            "tiger",
            FieldDef {
                value_sources: values_only(),
                prefer_widgets: prefer(&["text"]),
                ..FieldDef::new("tiger", ValueType::Text)
            },
        )
        .field(
            "reifen",
            FieldDef {
                value_sources: values_only(),
                prefer_widgets: prefer(&["number"]),
                field_settings: FieldSettings {
                    min: Some(0.0),
                    ..FieldSettings::default()
                },
                ..FieldDef::new("Reifen", ValueType::Number)
            },
        )
        .field(
            "price",
            FieldDef {
                value_sources: values_only(),
                prefer_widgets: prefer(&["slider", "rangeslider"]),
                field_settings: FieldSettings {
                    min: Some(10.0),
                    max: Some(100.0),
                    ..FieldSettings::default()
                },
                ..FieldDef::new("Price", ValueType::Number)
            },
        )
        .field(
            "date",
            FieldDef {
                value_sources: values_only(),
                field_settings: FieldSettings {
                    date_format: Some("DD-MM-YYYY".to_string()),
                    validate_value: Some(validate_current_year),
                    ..FieldSettings::default()
                },
                ..FieldDef::new("Date", ValueType::Date)
            },
        )
        .field(
            "color",
            FieldDef {
                value_sources: values_only(),
                funcs: vec!["lower".to_string()],
                field_settings: FieldSettings {
                    list_values: Some(
                        ["YELLOW", "GREEN", "ORANGE"]
                            .into_iter()
                            .map(|c| ListItem::new(c, c))
                            .collect(),
                    ),
                    ..FieldSettings::default()
                },
                ..FieldDef::new("Color", ValueType::Select)
            },
        )
        .field(
            "autocomplete",
            FieldDef {
                value_sources: values_only(),
                field_settings: FieldSettings {
                    async_fetch: Some(SimulatedFetch::new(demo_list_values(), 3)),
                    use_async_search: true,
                    use_load_more: true,
                    force_async_search: false,
                    allow_custom_values: true,
                    ..FieldSettings::default()
                },
                ..FieldDef::new("SomeName", ValueType::Select)
            },
        )
        .field(
            "stock",
            FieldDef {
                default_value: Some(json!(true)),
                main_widget_props: stock_props,
                ..FieldDef::new("In stock", ValueType::Boolean)
            },
        )
        .field(
            "is_promotion",
            FieldDef {
                operators: Some(vec!["equal".to_string()]),
                value_sources: values_only(),
                ..FieldDef::new("Promo?", ValueType::Boolean)
            },
        )
}
