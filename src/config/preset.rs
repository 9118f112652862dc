//! The base preset: conjunctions, the standard operator set, widgets and
//! types every configuration starts from.

use super::{
    ConjunctionDef, JsonLogicShape, OperatorDef, OperatorOptions, Settings, TypeDef, TypeWidget,
    ValueLabel, WidgetDef,
};
use crate::callbacks::{FormattedValue, display_string, json_string, sql_unquote};
use crate::config::FuncDef;
use crate::value::{ValueSource, ValueType};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

/// A named bundle of defaults that a [`super::ConfigBuilder`] starts from.
#[derive(Debug, Clone)]
pub struct Preset {
    pub conjunctions: BTreeMap<String, ConjunctionDef>,
    pub operators: BTreeMap<String, OperatorDef>,
    pub widgets: BTreeMap<String, WidgetDef>,
    pub types: BTreeMap<ValueType, TypeDef>,
    pub funcs: BTreeMap<String, FuncDef>,
    pub settings: Settings,
}

impl Preset {
    /// The basic preset with every standard operator, widget and type.
    pub fn basic() -> Self {
        Self {
            conjunctions: basic_conjunctions(),
            operators: basic_operators(),
            widgets: basic_widgets(),
            types: basic_types(),
            funcs: BTreeMap::new(),
            settings: Settings::default(),
        }
    }

    pub fn operator(&self, name: &str) -> Option<&OperatorDef> {
        self.operators.get(name)
    }
}

// ============================================================================
// Value formatters
// ============================================================================

/// Display form for display, JSON form otherwise.
pub fn format_scalar(value: &Value, is_for_display: bool) -> String {
    if is_for_display {
        display_string(value)
    } else {
        json_string(value)
    }
}

pub fn mongo_identity(value: &Value) -> Value {
    value.clone()
}

fn format_boolean(value: &Value, is_for_display: bool) -> String {
    match (value.as_bool(), is_for_display) {
        (Some(true), true) => "Yes".to_string(),
        (Some(false), true) => "No".to_string(),
        _ => format_scalar(value, is_for_display),
    }
}

// ============================================================================
// Operator formatters
// ============================================================================

fn single_key(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}

fn sql_between(
    field: &str,
    _op: &str,
    value: &FormattedValue,
    op_def: &OperatorDef,
    _options: Option<&Map<String, Value>>,
) -> String {
    format!(
        "{} {} {} AND {}",
        field,
        op_def.sql_op.as_deref().unwrap_or("BETWEEN"),
        value.get(0).unwrap_or_default(),
        value.get(1).unwrap_or_default()
    )
}

fn format_between(
    field: &str,
    op: &str,
    value: &FormattedValue,
    _op_def: &OperatorDef,
    _options: Option<&Map<String, Value>>,
) -> String {
    let range = format!(
        "{field} >= {} AND {field} <= {}",
        value.get(0).unwrap_or_default(),
        value.get(1).unwrap_or_default()
    );
    if op == "not_between" {
        format!("NOT({range})")
    } else {
        range
    }
}

fn mongo_between(
    field: &str,
    op: &str,
    value: &Value,
    use_expr: bool,
    _op_def: &OperatorDef,
) -> Value {
    let from = value.get(0).cloned().unwrap_or(Value::Null);
    let to = value.get(1).cloned().unwrap_or(Value::Null);
    let range = if use_expr {
        json!({ "$and": [{ "$gte": [field, from] }, { "$lte": [field, to] }] })
    } else {
        json!({ "$gte": from, "$lte": to })
    };
    match (op == "not_between", use_expr) {
        (true, true) => single_key("$not", range),
        (true, false) => single_key(field, single_key("$not", range)),
        (false, true) => range,
        (false, false) => single_key(field, range),
    }
}

fn sql_like(
    field: &str,
    op: &str,
    value: &FormattedValue,
    op_def: &OperatorDef,
    _options: Option<&Map<String, Value>>,
) -> String {
    let escaped = sql_unquote(value.first().unwrap_or_default()).replace('\'', "''");
    let pattern = match op {
        "starts_with" => format!("{escaped}%"),
        "ends_with" => format!("%{escaped}"),
        _ => format!("%{escaped}%"),
    };
    format!(
        "{} {} '{}'",
        field,
        op_def.sql_op.as_deref().unwrap_or("LIKE"),
        pattern
    )
}

fn escape_regex(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if "\\^$.|?*+()[]{}".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn mongo_like(
    field: &str,
    op: &str,
    value: &Value,
    use_expr: bool,
    _op_def: &OperatorDef,
) -> Value {
    let pattern = match value {
        Value::String(text) => {
            let escaped = escape_regex(text);
            match op {
                "starts_with" => Value::String(format!("^{escaped}")),
                "ends_with" => Value::String(format!("{escaped}$")),
                _ => Value::String(escaped),
            }
        }
        expr => expr.clone(),
    };
    let regex = if use_expr {
        json!({ "$regexMatch": { "input": field, "regex": pattern } })
    } else {
        single_key("$regex", pattern)
    };
    match (op == "not_like", use_expr) {
        (true, true) => single_key("$not", regex),
        (true, false) => single_key(field, single_key("$not", regex)),
        (false, true) => regex,
        (false, false) => single_key(field, regex),
    }
}

fn mongo_emptiness(
    field: &str,
    op: &str,
    _value: &Value,
    use_expr: bool,
    _op_def: &OperatorDef,
) -> Value {
    let empty = json!(["", null]);
    match (op == "is_empty", use_expr) {
        (true, true) => json!({ "$in": [field, empty] }),
        (false, true) => json!({ "$not": { "$in": [field, empty] } }),
        (true, false) => single_key(field, single_key("$in", empty)),
        (false, false) => single_key(field, single_key("$nin", empty)),
    }
}

fn sql_proximity(
    field: &str,
    _op: &str,
    value: &FormattedValue,
    op_def: &OperatorDef,
    options: Option<&Map<String, Value>>,
) -> String {
    let prox = proximity(op_def, options);
    format!(
        "CONTAINS({}, 'NEAR(({}, {}), {})')",
        field,
        sql_unquote(value.get(0).unwrap_or_default()),
        sql_unquote(value.get(1).unwrap_or_default()),
        prox
    )
}

fn format_proximity(
    field: &str,
    _op: &str,
    value: &FormattedValue,
    op_def: &OperatorDef,
    options: Option<&Map<String, Value>>,
) -> String {
    format!(
        "{} {} NEAR/{} {}",
        field,
        value.get(0).unwrap_or_default(),
        proximity(op_def, options),
        value.get(1).unwrap_or_default()
    )
}

fn proximity(op_def: &OperatorDef, options: Option<&Map<String, Value>>) -> u64 {
    match &op_def.options {
        Some(opts) => opts.proximity(options),
        None => OperatorOptions::default().proximity(options),
    }
}

// ============================================================================
// Tables
// ============================================================================

fn basic_conjunctions() -> BTreeMap<String, ConjunctionDef> {
    let mut map = BTreeMap::new();
    map.insert(
        "AND".to_string(),
        ConjunctionDef {
            label: "And".to_string(),
            sql_conj: "AND".to_string(),
            mongo_conj: "$and".to_string(),
            json_logic_conj: "and".to_string(),
            reversed_conj: Some("OR".to_string()),
        },
    );
    map.insert(
        "OR".to_string(),
        ConjunctionDef {
            label: "Or".to_string(),
            sql_conj: "OR".to_string(),
            mongo_conj: "$or".to_string(),
            json_logic_conj: "or".to_string(),
            reversed_conj: Some("AND".to_string()),
        },
    );
    map
}

fn op(
    label: &str,
    reversed: &str,
    sql_op: &str,
    json_logic: Option<&str>,
    mongo_op: Option<&str>,
) -> OperatorDef {
    OperatorDef {
        label: label.to_string(),
        reversed_op: Some(reversed.to_string()),
        sql_op: Some(sql_op.to_string()),
        json_logic: json_logic.map(str::to_string),
        mongo_op: mongo_op.map(str::to_string),
        ..OperatorDef::default()
    }
}

fn basic_operators() -> BTreeMap<String, OperatorDef> {
    let mut ops = BTreeMap::new();
    let mut add = |name: &str, def: OperatorDef| {
        ops.insert(name.to_string(), def);
    };

    add(
        "equal",
        OperatorDef {
            label_for_format: Some("==".to_string()),
            ..op("==", "not_equal", "=", Some("=="), Some("$eq"))
        },
    );
    add(
        "not_equal",
        OperatorDef {
            label_for_format: Some("!=".to_string()),
            ..op("!=", "equal", "<>", Some("!="), Some("$ne"))
        },
    );
    add("less", op("<", "greater_or_equal", "<", Some("<"), Some("$lt")));
    add(
        "less_or_equal",
        op("<=", "greater", "<=", Some("<="), Some("$lte")),
    );
    add("greater", op(">", "less_or_equal", ">", Some(">"), Some("$gt")));
    add(
        "greater_or_equal",
        op(">=", "less", ">=", Some(">="), Some("$gte")),
    );
    add(
        "like",
        OperatorDef {
            label_for_format: Some("Like".to_string()),
            sql_format_op: Some(sql_like),
            json_logic_shape: JsonLogicShape::ValueFirst,
            mongo_format_op: Some(mongo_like),
            ..op("Contains", "not_like", "LIKE", Some("in"), None)
        },
    );
    add(
        "not_like",
        OperatorDef {
            label_for_format: Some("Not Like".to_string()),
            sql_format_op: Some(sql_like),
            json_logic_shape: JsonLogicShape::ValueFirst,
            json_logic_negate: true,
            mongo_format_op: Some(mongo_like),
            ..op("Not contains", "like", "NOT LIKE", Some("in"), None)
        },
    );
    add(
        "starts_with",
        OperatorDef {
            label_for_format: Some("Starts with".to_string()),
            reversed_op: None,
            sql_format_op: Some(sql_like),
            mongo_format_op: Some(mongo_like),
            ..op("Starts with", "", "LIKE", None, None)
        },
    );
    add(
        "ends_with",
        OperatorDef {
            label_for_format: Some("Ends with".to_string()),
            reversed_op: None,
            sql_format_op: Some(sql_like),
            mongo_format_op: Some(mongo_like),
            ..op("Ends with", "", "LIKE", None, None)
        },
    );
    add(
        "between",
        OperatorDef {
            cardinality: 2,
            sql_format_op: Some(sql_between),
            format_op: Some(format_between),
            json_logic_shape: JsonLogicShape::Range,
            mongo_format_op: Some(mongo_between),
            value_labels: vec!["Value from".into(), "Value to".into()],
            text_separators: vec![String::new(), "and".to_string()],
            ..op("Between", "not_between", "BETWEEN", Some("<="), None)
        },
    );
    add(
        "not_between",
        OperatorDef {
            cardinality: 2,
            sql_format_op: Some(sql_between),
            format_op: Some(format_between),
            json_logic_shape: JsonLogicShape::Range,
            json_logic_negate: true,
            mongo_format_op: Some(mongo_between),
            value_labels: vec!["Value from".into(), "Value to".into()],
            text_separators: vec![String::new(), "and".to_string()],
            ..op("Not between", "between", "NOT BETWEEN", Some("<="), None)
        },
    );
    add(
        "is_empty",
        OperatorDef {
            cardinality: 0,
            label_for_format: Some("IS EMPTY".to_string()),
            json_logic_shape: JsonLogicShape::Unary,
            mongo_format_op: Some(mongo_emptiness),
            ..op("Is empty", "is_not_empty", "= ''", Some("!"), None)
        },
    );
    add(
        "is_not_empty",
        OperatorDef {
            cardinality: 0,
            label_for_format: Some("IS NOT EMPTY".to_string()),
            json_logic_shape: JsonLogicShape::Unary,
            mongo_format_op: Some(mongo_emptiness),
            ..op("Is not empty", "is_empty", "<> ''", Some("!!"), None)
        },
    );
    add(
        "is_null",
        OperatorDef {
            cardinality: 0,
            label_for_format: Some("IS NULL".to_string()),
            ..op("Is null", "is_not_null", "IS NULL", Some("=="), Some("$eq"))
        },
    );
    add(
        "is_not_null",
        OperatorDef {
            cardinality: 0,
            label_for_format: Some("IS NOT NULL".to_string()),
            ..op("Is not null", "is_null", "IS NOT NULL", Some("!="), Some("$ne"))
        },
    );
    add(
        "select_equals",
        OperatorDef {
            label_for_format: Some("==".to_string()),
            ..op("==", "select_not_equals", "=", Some("=="), Some("$eq"))
        },
    );
    add(
        "select_not_equals",
        OperatorDef {
            label_for_format: Some("!=".to_string()),
            ..op("!=", "select_equals", "<>", Some("!="), Some("$ne"))
        },
    );
    add(
        "select_any_in",
        OperatorDef {
            label_for_format: Some("IN".to_string()),
            ..op("Any in", "select_not_any_in", "IN", Some("in"), Some("$in"))
        },
    );
    add(
        "select_not_any_in",
        OperatorDef {
            label_for_format: Some("NOT IN".to_string()),
            json_logic_negate: true,
            ..op("Not in", "select_any_in", "NOT IN", Some("in"), Some("$nin"))
        },
    );
    add(
        "proximity",
        OperatorDef {
            label: "Proximity search".to_string(),
            cardinality: 2,
            sql_format_op: Some(sql_proximity),
            format_op: Some(format_proximity),
            value_labels: vec![
                ValueLabel::new("Word 1", "Enter first word"),
                ValueLabel::new("Word 2", "Enter second word"),
            ],
            text_separators: vec![String::new(), String::new()],
            options: Some(OperatorOptions::default()),
            ..OperatorDef::default()
        },
    );

    ops
}

fn widget(value_type: ValueType, label: &str, placeholder: &str) -> WidgetDef {
    WidgetDef {
        value_label: Some(label.to_string()),
        value_placeholder: Some(placeholder.to_string()),
        ..WidgetDef::new(value_type)
    }
}

fn basic_widgets() -> BTreeMap<String, WidgetDef> {
    let mut widgets = BTreeMap::new();
    widgets.insert("text".to_string(), widget(ValueType::Text, "String", "Enter string"));
    widgets.insert(
        "textarea".to_string(),
        widget(ValueType::Text, "Text", "Enter text"),
    );
    widgets.insert(
        "number".to_string(),
        widget(ValueType::Number, "Number", "Enter number"),
    );
    widgets.insert(
        "slider".to_string(),
        widget(ValueType::Number, "Number", "Enter number or move slider"),
    );
    widgets.insert(
        "rangeslider".to_string(),
        widget(ValueType::Number, "Range", "Select range"),
    );
    widgets.insert(
        "select".to_string(),
        widget(ValueType::Select, "Value", "Select value"),
    );
    widgets.insert(
        "multiselect".to_string(),
        widget(ValueType::Multiselect, "Values", "Select values"),
    );
    widgets.insert(
        "date".to_string(),
        WidgetDef {
            date_format: Some("DD.MM.YYYY".to_string()),
            value_format: Some("YYYY-MM-DD".to_string()),
            ..widget(ValueType::Date, "Date", "Enter date")
        },
    );
    widgets.insert(
        "time".to_string(),
        WidgetDef {
            time_format: Some("HH:mm".to_string()),
            value_format: Some("HH:mm:ss".to_string()),
            ..widget(ValueType::Time, "Time", "Enter time")
        },
    );
    widgets.insert(
        "datetime".to_string(),
        WidgetDef {
            date_format: Some("DD.MM.YYYY".to_string()),
            time_format: Some("HH:mm".to_string()),
            value_format: Some("YYYY-MM-DD HH:mm:ss".to_string()),
            ..widget(ValueType::Datetime, "Datetime", "Enter datetime")
        },
    );
    widgets.insert(
        "boolean".to_string(),
        WidgetDef {
            format_value: format_boolean,
            ..widget(ValueType::Boolean, "Value", "")
        },
    );
    widgets
}

const COMPARISON_OPS: &[&str] = &[
    "equal",
    "not_equal",
    "less",
    "less_or_equal",
    "greater",
    "greater_or_equal",
    "between",
    "not_between",
    "is_null",
    "is_not_null",
];

fn type_def(default_operator: &str, widgets: Vec<(&str, TypeWidget)>) -> TypeDef {
    TypeDef {
        value_sources: vec![ValueSource::Value, ValueSource::Field, ValueSource::Func],
        default_operator: Some(default_operator.to_string()),
        widgets: widgets
            .into_iter()
            .map(|(name, tw)| (name.to_string(), tw))
            .collect(),
    }
}

fn basic_types() -> BTreeMap<ValueType, TypeDef> {
    let text_ops: &[&str] = &[
        "equal",
        "not_equal",
        "like",
        "not_like",
        "starts_with",
        "ends_with",
        "proximity",
        "is_empty",
        "is_not_empty",
        "is_null",
        "is_not_null",
    ];
    let textarea_ops: Vec<&str> = text_ops
        .iter()
        .copied()
        .filter(|o| *o != "proximity")
        .collect();

    let mut types = BTreeMap::new();
    types.insert(
        ValueType::Text,
        type_def(
            "equal",
            vec![
                ("text", TypeWidget::with_operators(text_ops)),
                ("textarea", TypeWidget::with_operators(&textarea_ops)),
            ],
        ),
    );
    types.insert(
        ValueType::Number,
        type_def(
            "equal",
            vec![
                ("number", TypeWidget::with_operators(COMPARISON_OPS)),
                (
                    "slider",
                    TypeWidget::with_operators(&[
                        "equal",
                        "not_equal",
                        "less",
                        "less_or_equal",
                        "greater",
                        "greater_or_equal",
                        "is_null",
                        "is_not_null",
                    ]),
                ),
                (
                    "rangeslider",
                    TypeWidget::with_operators(&["between", "not_between"]),
                ),
            ],
        ),
    );
    for (ty, name) in [
        (ValueType::Date, "date"),
        (ValueType::Time, "time"),
        (ValueType::Datetime, "datetime"),
    ] {
        types.insert(
            ty,
            type_def("equal", vec![(name, TypeWidget::with_operators(COMPARISON_OPS))]),
        );
    }
    types.insert(
        ValueType::Select,
        type_def(
            "select_equals",
            vec![
                (
                    "select",
                    TypeWidget::with_operators(&[
                        "select_equals",
                        "select_not_equals",
                        "is_null",
                        "is_not_null",
                    ]),
                ),
                (
                    "multiselect",
                    TypeWidget::with_operators(&["select_any_in", "select_not_any_in"]),
                ),
            ],
        ),
    );
    types.insert(
        ValueType::Multiselect,
        type_def(
            "select_any_in",
            vec![(
                "multiselect",
                TypeWidget::with_operators(&["select_any_in", "select_not_any_in"]),
            )],
        ),
    );
    types.insert(
        ValueType::Boolean,
        TypeDef {
            value_sources: vec![ValueSource::Value, ValueSource::Field],
            ..type_def(
                "equal",
                vec![(
                    "boolean",
                    TypeWidget::with_operators(&["equal", "not_equal", "is_null", "is_not_null"]),
                )],
            )
        },
    );
    types
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_type_widget_operator_exists() {
        let preset = Preset::basic();
        for (ty, def) in &preset.types {
            for (widget, tw) in &def.widgets {
                assert!(preset.widgets.contains_key(widget), "{ty}: {widget}");
                for op in &tw.operators {
                    assert!(preset.operators.contains_key(op), "{ty}/{widget}: {op}");
                }
            }
        }
    }

    #[test]
    fn test_reversed_ops_are_symmetric() {
        let preset = Preset::basic();
        for (name, def) in &preset.operators {
            if let Some(rev) = &def.reversed_op {
                let back = preset.operators[rev].reversed_op.as_deref();
                assert_eq!(back, Some(name.as_str()), "{name} <-> {rev}");
            }
        }
    }

    #[test]
    fn test_sql_like_patterns() {
        let preset = Preset::basic();
        let value = FormattedValue::Single("'ab''c'".to_string());
        let like = &preset.operators["like"];
        assert_eq!(sql_like("bio", "like", &value, like, None), "bio LIKE '%ab''c%'");
        let starts = &preset.operators["starts_with"];
        assert_eq!(sql_like("bio", "starts_with", &value, starts, None), "bio LIKE 'ab''c%'");
    }

    #[test]
    fn test_proximity_uses_rule_option() {
        let preset = Preset::basic();
        let def = &preset.operators["proximity"];
        let value = FormattedValue::Many(vec!["'red'".into(), "'car'".into()]);
        let mut opts = Map::new();
        opts.insert("proximity".to_string(), json!(4));
        assert_eq!(
            sql_proximity("bio", "proximity", &value, def, Some(&opts)),
            "CONTAINS(bio, 'NEAR((red, car), 4)')"
        );
        assert_eq!(
            format_proximity("bio", "proximity", &value, def, None),
            "bio 'red' NEAR/2 'car'"
        );
    }

    #[test]
    fn test_mongo_between_and_like() {
        let preset = Preset::basic();
        let def = &preset.operators["between"];
        assert_eq!(
            mongo_between("qty", "between", &json!([1, 5]), false, def),
            json!({"qty": {"$gte": 1, "$lte": 5}})
        );
        assert_eq!(
            mongo_like("bio", "starts_with", &json!("a.b"), false, def),
            json!({"bio": {"$regex": "^a\\.b"}})
        );
    }

    #[test]
    fn test_mongo_expressions() {
        let preset = Preset::basic();
        let def = &preset.operators["not_between"];
        assert_eq!(
            mongo_between("$qty", "not_between", &json!(["$min", 5]), true, def),
            json!({"$not": {"$and": [{"$gte": ["$qty", "$min"]}, {"$lte": ["$qty", 5]}]}})
        );
        assert_eq!(
            mongo_like("$bio", "like", &json!({"$toLower": "$name"}), true, def),
            json!({"$regexMatch": {"input": "$bio", "regex": {"$toLower": "$name"}}})
        );
        assert_eq!(
            mongo_emptiness("$bio", "is_not_empty", &Value::Null, true, def),
            json!({"$not": {"$in": ["$bio", ["", null]]}})
        );
    }

    #[test]
    fn test_boolean_display() {
        assert_eq!(format_boolean(&json!(true), true), "Yes");
        assert_eq!(format_boolean(&json!(false), false), "false");
    }
}
