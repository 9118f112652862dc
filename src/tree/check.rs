use super::{FuncValue, JsonGroup, JsonItem, JsonRule, QueryTree};
use crate::callbacks::{display_string, json_string};
use crate::config::{Config, FieldDef, FieldSettings, WidgetDef};
use crate::format::resolve_rule;
use crate::value::{ValueSource, ValueType};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// A problem found (and repaired) while checking a tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeIssue {
    /// Child indexes from the root, dot separated; `root` for the root group.
    pub path: String,
    pub item_id: String,
    pub message: String,
}

impl std::fmt::Display for TreeIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Check a tree against a configuration and return a repaired copy.
///
/// Rules with an unknown field, or an operator the field does not accept,
/// are removed. Operands that fail a check are cleared, which leaves the
/// rule incomplete. Unknown conjunctions fall back to the default one.
pub fn check_tree(tree: &QueryTree, config: &Config) -> (QueryTree, Vec<TreeIssue>) {
    let mut issues = Vec::new();
    let root = check_group(tree.root(), config, &mut issues, &[], 1);
    for issue in &issues {
        warn!(path = %issue.path, id = %issue.item_id, "{}", issue.message);
    }
    (tree.with_root(root), issues)
}

fn path_string(path: &[usize]) -> String {
    if path.is_empty() {
        return "root".to_string();
    }
    path.iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

fn push_issue(issues: &mut Vec<TreeIssue>, path: &[usize], id: &str, message: String) {
    issues.push(TreeIssue {
        path: path_string(path),
        item_id: id.to_string(),
        message,
    });
}

fn check_group(
    group: &JsonGroup,
    config: &Config,
    issues: &mut Vec<TreeIssue>,
    path: &[usize],
    depth: usize,
) -> JsonGroup {
    let settings = config.settings();
    let mut properties = group.properties.clone();

    if config.conjunction(&properties.conjunction).is_none() {
        push_issue(
            issues,
            path,
            &group.id,
            format!("Unknown conjunction '{}'", properties.conjunction),
        );
        properties.conjunction = settings.default_conjunction.clone();
    }
    if properties.not && !settings.show_not {
        push_issue(issues, path, &group.id, "Negation is disabled".to_string());
        properties.not = false;
    }

    let mut children = Vec::with_capacity(group.children1.len());
    for (i, child) in group.children1.iter().enumerate() {
        let child_path = [path, &[i]].concat();
        match child {
            JsonItem::Group(g) => {
                if let Some(max) = settings.max_nesting.filter(|max| depth >= *max) {
                    push_issue(
                        issues,
                        &child_path,
                        &g.id,
                        format!("Group exceeds maximum nesting of {}", max),
                    );
                    continue;
                }
                children.push(JsonItem::Group(check_group(
                    g,
                    config,
                    issues,
                    &child_path,
                    depth + 1,
                )));
            }
            JsonItem::Rule(r) => {
                if let Some(rule) = check_rule(r, config, issues, &child_path) {
                    children.push(JsonItem::Rule(rule));
                }
            }
        }
    }

    JsonGroup {
        id: group.id.clone(),
        properties,
        children1: children,
    }
}

fn check_rule(
    rule: &JsonRule,
    config: &Config,
    issues: &mut Vec<TreeIssue>,
    path: &[usize],
) -> Option<JsonRule> {
    let (Some(field), Some(op)) = (rule.field(), rule.operator()) else {
        return keep_if_allowed(rule.clone(), config);
    };

    let Some(field_def) = config.field(field) else {
        push_issue(
            issues,
            path,
            &rule.id,
            format!("Field '{}' is not configured", field),
        );
        return None;
    };
    let op_def = match config.operator(op) {
        Some(def) if config.operators_for_field(field).contains(&op) => def,
        _ => {
            push_issue(
                issues,
                path,
                &rule.id,
                format!("Operator '{}' is not supported for field '{}'", op, field),
            );
            return None;
        }
    };

    let mut props = rule.properties.clone();
    let cardinality = op_def.cardinality;
    props.value.resize(cardinality, Value::Null);
    props.value_src.resize(cardinality, None);
    props.value_type.resize(cardinality, None);

    let widget = config.widget_for(field, op).map(|(_, w)| w);
    let widget_type = widget.map(|w| w.value_type).unwrap_or(field_def.field_type);
    let literal_settings = with_widget_formats(&field_def.field_settings, widget);
    let allowed = config.value_sources_for(field);

    for i in 0..cardinality {
        let src = props.value_src[i].unwrap_or_default();
        props.value_src[i] = Some(src);
        props.value_type[i] = Some(widget_type);

        let value = &props.value[i];
        if value.is_null() {
            continue;
        }
        let problem = if !allowed.contains(&src) {
            Some(format!(
                "Value source '{}' is not allowed for field '{}'",
                src, field
            ))
        } else {
            match src {
                ValueSource::Value => check_literal(value, widget_type, &literal_settings),
                ValueSource::Field => check_field_ref(value, field, field_def, config),
                ValueSource::Func => check_func(value, field_def, config),
            }
        };
        if let Some(message) = problem {
            push_issue(issues, path, &rule.id, message);
            props.value[i] = Value::Null;
        }
    }

    if let Some(opts) = &op_def.options {
        let options = props.operator_options.get_or_insert_with(Map::new);
        let range = opts.min_proximity as u64..=opts.max_proximity as u64;
        match options.get("proximity").and_then(Value::as_u64) {
            Some(p) if range.contains(&p) => {}
            Some(p) => {
                push_issue(
                    issues,
                    path,
                    &rule.id,
                    format!(
                        "Proximity {} is outside {}..={}",
                        p, opts.min_proximity, opts.max_proximity
                    ),
                );
                options.insert("proximity".to_string(), opts.default_proximity.into());
            }
            None => {
                options.insert("proximity".to_string(), opts.default_proximity.into());
            }
        }
    }

    keep_if_allowed(
        JsonRule {
            id: rule.id.clone(),
            properties: props,
        },
        config,
    )
}

fn keep_if_allowed(rule: JsonRule, config: &Config) -> Option<JsonRule> {
    if config.settings().remove_incomplete_rules_on_load && resolve_rule(&rule, config).is_none() {
        debug!(id = %rule.id, "dropping incomplete rule");
        return None;
    }
    Some(rule)
}

/// Field settings with the widget's formats filled in where the field sets none.
fn with_widget_formats(settings: &FieldSettings, widget: Option<&WidgetDef>) -> FieldSettings {
    let mut merged = settings.clone();
    if let Some(widget) = widget {
        merged.value_format = merged.value_format.or_else(|| widget.value_format.clone());
        merged.date_format = merged.date_format.or_else(|| widget.date_format.clone());
        merged.time_format = merged.time_format.or_else(|| widget.time_format.clone());
    }
    merged
}

fn check_literal(value: &Value, ty: ValueType, settings: &FieldSettings) -> Option<String> {
    if !ty.accepts(value) {
        return Some(format!("Value {} is not a valid {}", json_string(value), ty));
    }

    match ty {
        ValueType::Number => {
            let n = value.as_f64().unwrap_or_default();
            if let Some(min) = settings.min.filter(|min| n < *min) {
                return Some(format!(
                    "Value {} should be greater than or equal to {}",
                    n, min
                ));
            }
            if let Some(max) = settings.max.filter(|max| n > *max) {
                return Some(format!("Value {} should be less than or equal to {}", n, max));
            }
        }
        ValueType::Text => {
            let len = value.as_str().map(|s| s.chars().count()).unwrap_or_default();
            if let Some(max) = settings.max_length.filter(|max| len > *max) {
                return Some(format!("Value is longer than {} characters", max));
            }
        }
        ValueType::Select | ValueType::Multiselect => {
            let closed_list = !settings.allow_custom_values && settings.async_fetch.is_none();
            if let (Some(list), true) = (&settings.list_values, closed_list) {
                let values: Vec<Value> = match value {
                    Value::Array(items) => items.clone(),
                    v => vec![v.clone()],
                };
                for v in values {
                    let key = display_string(&v);
                    if !list.iter().any(|item| item.value == key) {
                        return Some(format!("Value '{}' is not in the list", key));
                    }
                }
            }
        }
        _ => {}
    }

    settings.validate_value.and_then(|validate| validate(value, settings))
}

fn check_field_ref(
    value: &Value,
    field: &str,
    field_def: &FieldDef,
    config: &Config,
) -> Option<String> {
    let Some(other) = value.as_str() else {
        return Some(format!("Field reference {} is not a name", json_string(value)));
    };
    match config.field(other) {
        Some(def) if other != field && def.field_type == field_def.field_type => None,
        Some(_) => Some(format!("Field '{}' cannot be compared with '{}'", field, other)),
        None => Some(format!("Field '{}' is not configured", other)),
    }
}

fn check_func(value: &Value, field_def: &FieldDef, config: &Config) -> Option<String> {
    let Some(call) = FuncValue::from_value(value) else {
        return Some(format!("Function call {} is malformed", json_string(value)));
    };
    let Some(func) = config.func(&call.func) else {
        return Some(format!("Function '{}' is not configured", call.func));
    };
    let permitted = if field_def.funcs.is_empty() {
        func.return_type == field_def.field_type
    } else {
        field_def.funcs.contains(&call.func)
    };
    if !permitted {
        return Some(format!(
            "Function '{}' is not available for field '{}'",
            call.func, field_def.label
        ));
    }
    for (name, arg) in &call.args {
        let Some((_, def)) = func.args.iter().find(|(n, _)| n == name) else {
            return Some(format!("Function '{}' has no argument '{}'", call.func, name));
        };
        if !def.value_sources.contains(&arg.value_src) {
            return Some(format!(
                "Argument '{}' of '{}' does not accept {} values",
                name, call.func, arg.value_src
            ));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigBuilder, FuncArg, FuncDef, Preset, Settings};
    use crate::tree::{JsonRule, load_tree};
    use crate::value::ListItem;
    use serde_json::json;

    fn config() -> Config {
        ConfigBuilder::from_preset(Preset::basic())
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
            .field(
                "qty",
                FieldDef {
                    field_settings: FieldSettings {
                        min: Some(0.0),
                        max: Some(10.0),
                        ..FieldSettings::default()
                    },
                    ..FieldDef::new("Qty", ValueType::Number)
                },
            )
            .field("price", FieldDef::new("Price", ValueType::Number))
            .field("bio", FieldDef::new("Bio", ValueType::Text))
            .field(
                "color",
                FieldDef {
                    field_settings: FieldSettings {
                        list_values: Some(vec![ListItem::new("RED", "Red")]),
                        ..FieldSettings::default()
                    },
                    ..FieldDef::new("Color", ValueType::Select)
                },
            )
            .build()
            .unwrap()
    }

    fn check(group: JsonGroup) -> (QueryTree, Vec<TreeIssue>) {
        check_tree(&load_tree(group), &config())
    }

    fn only_rule(tree: &QueryTree) -> &JsonRule {
        match &tree.root().children1[..] {
            [JsonItem::Rule(r)] => r,
            other => panic!("expected one rule, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_field_is_removed() {
        let (tree, issues) = check(JsonGroup::new().rule(JsonRule::new("ghost", "equal").value(1)));
        assert!(tree.is_empty());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "0");
        assert_eq!(issues[0].message, "Field 'ghost' is not configured");
    }

    #[test]
    fn test_operator_must_fit_field() {
        let (tree, issues) = check(JsonGroup::new().rule(JsonRule::new("qty", "like").value("x")));
        assert!(tree.is_empty());
        assert!(issues[0].message.contains("'like' is not supported"));
    }

    #[test]
    fn test_out_of_range_value_is_cleared() {
        let (tree, issues) = check(JsonGroup::new().rule(JsonRule::new("qty", "equal").value(42)));
        let rule = only_rule(&tree);
        assert_eq!(rule.properties.value, vec![Value::Null]);
        assert_eq!(rule.properties.value_type, vec![Some(ValueType::Number)]);
        assert_eq!(issues[0].message, "Value 42 should be less than or equal to 10");
    }

    #[test]
    fn test_cardinality_is_normalized() {
        let (tree, issues) = check(
            JsonGroup::new().rule(JsonRule::new("qty", "between").value(1)),
        );
        let rule = only_rule(&tree);
        assert_eq!(rule.properties.value, vec![json!(1), Value::Null]);
        assert_eq!(rule.properties.value_src.len(), 2);
        assert!(issues.is_empty());
    }

    #[test]
    fn test_closed_list_rejects_unknown_value() {
        let (_, issues) = check(
            JsonGroup::new().rule(JsonRule::new("color", "select_equals").value("BLUE")),
        );
        assert_eq!(issues[0].message, "Value 'BLUE' is not in the list");
    }

    #[test]
    fn test_field_reference_must_share_type() {
        let (_, issues) = check(
            JsonGroup::new()
                .rule(JsonRule::new("qty", "equal").field_value("price"))
                .rule(JsonRule::new("qty", "equal").field_value("bio")),
        );
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "1");
    }

    fn lower_a() -> FuncValue {
        FuncValue::new("lower").arg("str", "A")
    }

    #[test]
    fn test_function_return_type_checked() {
        let (_, issues) = check(
            JsonGroup::new()
                .rule(JsonRule::new("bio", "equal").func_value(lower_a()))
                .rule(JsonRule::new("qty", "equal").func_value(lower_a())),
        );
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("not available for field 'Qty'"));
    }

    #[test]
    fn test_unknown_conjunction_falls_back() {
        let (tree, issues) = check(JsonGroup::new().with_conjunction("XOR"));
        assert_eq!(tree.root().properties.conjunction, "AND");
        assert_eq!(issues[0].path, "root");
    }

    #[test]
    fn test_max_nesting_drops_deep_groups() {
        let config = ConfigBuilder::from_preset(Preset {
            settings: Settings {
                max_nesting: Some(2),
                ..Settings::default()
            },
            ..Preset::basic()
        })
        .build()
        .unwrap();
        let tree = load_tree(JsonGroup::new().group(JsonGroup::new().group(JsonGroup::new())));
        let (checked, issues) = check_tree(&tree, &config);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "0.0");
        assert_eq!(issues[0].message, "Group exceeds maximum nesting of 2");
        match &checked.root().children1[0] {
            JsonItem::Group(g) => assert!(g.children1.is_empty()),
            other => panic!("expected group, got {other:?}"),
        }
    }

    fn dotted_date_only(_value: &Value, settings: &FieldSettings) -> Option<String> {
        match settings.value_format.as_deref() {
            Some("DD.MM.YYYY") => None,
            other => Some(format!("unexpected format {:?}", other)),
        }
    }

    #[test]
    fn test_validator_sees_widget_value_format() {
        let date_field = |value_format: Option<&str>| FieldDef {
            field_settings: FieldSettings {
                value_format: value_format.map(str::to_string),
                validate_value: Some(dotted_date_only),
                ..FieldSettings::default()
            },
            ..FieldDef::new("Date", ValueType::Date)
        };
        let config = ConfigBuilder::from_preset(Preset::basic())
            .patch_widget("date", |base| WidgetDef {
                value_format: Some("DD.MM.YYYY".to_string()),
                ..base
            })
            .field("from_widget", date_field(None))
            .field("own_format", date_field(Some("YYYY-MM-DD")))
            .build()
            .unwrap();
        let tree = load_tree(
            JsonGroup::new()
                .rule(JsonRule::new("from_widget", "equal").value("01.02.2026"))
                .rule(JsonRule::new("own_format", "equal").value("2026-02-01")),
        );

        let (_, issues) = check_tree(&tree, &config);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "1");
        assert_eq!(issues[0].message, "unexpected format Some(\"YYYY-MM-DD\")");
    }

    #[test]
    fn test_remove_incomplete_rules_on_load() {
        let config = ConfigBuilder::from_preset(Preset {
            settings: Settings {
                remove_incomplete_rules_on_load: true,
                ..Settings::default()
            },
            ..Preset::basic()
        })
        .field("qty", FieldDef::new("Qty", ValueType::Number))
        .build()
        .unwrap();
        let tree = load_tree(
            JsonGroup::new()
                .rule(JsonRule::new("qty", "equal"))
                .rule(JsonRule::new("qty", "is_null")),
        );
        let (checked, issues) = check_tree(&tree, &config);
        assert!(issues.is_empty());
        assert_eq!(checked.root().children1.len(), 1);
    }
}
