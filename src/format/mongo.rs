//! MongoDB filter rendering.

use super::{FuncCall, Operand, resolve_rule, single_key};
use crate::config::Config;
use crate::tree::{JsonGroup, JsonItem, JsonRule, QueryTree};
use crate::value::ValueSource;
use serde_json::Value;
use tracing::warn;

/// Render the tree as a MongoDB find filter. Rules comparing against other
/// fields or functions become `$expr` aggregation expressions.
pub fn mongodb_format(tree: &QueryTree, config: &Config) -> Option<Value> {
    group_mongo(tree.root(), config)
}

fn group_mongo(group: &JsonGroup, config: &Config) -> Option<Value> {
    let mut parts: Vec<Value> = group
        .children1
        .iter()
        .filter_map(|item| match item {
            JsonItem::Group(g) => group_mongo(g, config),
            JsonItem::Rule(r) => rule_mongo(r, config),
        })
        .collect();
    if parts.is_empty() {
        return None;
    }

    let combined = if parts.len() == 1 {
        parts.remove(0)
    } else {
        let conj = config
            .conjunction(&group.properties.conjunction)
            .map(|c| c.mongo_conj.as_str())
            .unwrap_or("$and");
        single_key(conj, Value::Array(parts))
    };

    if group.properties.not {
        Some(single_key("$nor", Value::Array(vec![combined])))
    } else {
        Some(combined)
    }
}

fn rule_mongo(rule: &JsonRule, config: &Config) -> Option<Value> {
    let resolved = resolve_rule(rule, config)?;
    let op_def = resolved.op_def;
    let use_expr = resolved
        .operands
        .iter()
        .any(|operand| !matches!(operand, Operand::Value(_)));

    let mut values = Vec::with_capacity(resolved.operands.len());
    for operand in &resolved.operands {
        values.push(match operand {
            Operand::Value(v) => match resolved.widget {
                Some(widget) => (widget.mongo_format_value)(v),
                None => (*v).clone(),
            },
            Operand::Field(f) => Value::String(format!("${f}")),
            Operand::Func(call) => func_mongo(call, config)?,
        });
    }

    let value = match op_def.cardinality {
        0 => Value::Null,
        1 => values.into_iter().next().unwrap_or(Value::Null),
        _ => Value::Array(values),
    };

    let field = if use_expr {
        format!("${}", resolved.field)
    } else {
        resolved.field.to_string()
    };
    let condition = if let Some(format_op) = op_def.mongo_format_op {
        format_op(&field, resolved.op, &value, use_expr, op_def)
    } else if let Some(mongo_op) = &op_def.mongo_op {
        if use_expr {
            single_key(mongo_op, Value::Array(vec![Value::String(field), value]))
        } else {
            single_key(&field, single_key(mongo_op, value))
        }
    } else {
        warn!(operator = resolved.op, "operator is not supported for MongoDB");
        return None;
    };

    if use_expr {
        Some(single_key("$expr", condition))
    } else {
        Some(condition)
    }
}

/// `{mongo_func: arg}` for one argument, `{mongo_func: [args..]}` otherwise.
fn func_mongo(call: &FuncCall<'_>, config: &Config) -> Option<Value> {
    let Some(name) = call.def.mongo_func.as_deref() else {
        warn!(func = call.name, "function is not supported for MongoDB");
        return None;
    };
    let mut args: Vec<Value> = call
        .args
        .iter()
        .map(|arg| match (arg.src, arg.value.as_str()) {
            (ValueSource::Field, Some(f)) => Value::String(format!("${f}")),
            _ => match config.widget_for_type(arg.arg_type) {
                Some(widget) => (widget.mongo_format_value)(&arg.value),
                None => arg.value.clone(),
            },
        })
        .collect();
    let args = if args.len() == 1 {
        args.remove(0)
    } else {
        Value::Array(args)
    };
    Some(single_key(name, args))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigBuilder, FieldDef, FuncArg, FuncDef, Preset};
    use crate::tree::{FuncValue, load_tree};
    use crate::value::ValueType;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn config() -> Config {
        ConfigBuilder::from_preset(Preset::basic())
            .field("qty", FieldDef::new("Qty", ValueType::Number))
            .field("price", FieldDef::new("Price", ValueType::Number))
            .field("name", FieldDef::new("Name", ValueType::Text))
            .build()
            .unwrap()
    }

    fn mongo(group: JsonGroup) -> Option<Value> {
        mongodb_format(&load_tree(group), &config())
    }

    #[test]
    fn test_empty_is_none() {
        assert_eq!(mongo(JsonGroup::new()), None);
    }

    #[test]
    fn test_single_rule_unwrapped() {
        let group = JsonGroup::new().rule(JsonRule::new("qty", "greater_or_equal").value(3));
        assert_eq!(mongo(group), Some(json!({"qty": {"$gte": 3}})));
    }

    #[test]
    fn test_or_group_with_callbacks() {
        let group = JsonGroup::new()
            .with_conjunction("OR")
            .rule(JsonRule::new("qty", "between").value(1).value(2))
            .rule(JsonRule::new("name", "is_empty"))
            .rule(JsonRule::new("name", "is_null"));
        assert_eq!(
            mongo(group),
            Some(json!({"$or": [
                {"qty": {"$gte": 1, "$lte": 2}},
                {"name": {"$in": ["", null]}},
                {"name": {"$eq": null}}
            ]}))
        );
    }

    #[test]
    fn test_negated_group() {
        let group = JsonGroup::new()
            .negated()
            .rule(JsonRule::new("qty", "equal").value(1));
        assert_eq!(mongo(group), Some(json!({"$nor": [{"qty": {"$eq": 1}}]})));
    }

    #[test]
    fn test_field_operand_uses_expr() {
        let group = JsonGroup::new()
            .rule(JsonRule::new("qty", "equal").field_value("price"))
            .rule(JsonRule::new("qty", "between").value(1).field_value("price"));
        assert_eq!(
            mongo(group),
            Some(json!({"$and": [
                {"$expr": {"$eq": ["$qty", "$price"]}},
                {"$expr": {"$and": [{"$gte": ["$qty", 1]}, {"$lte": ["$qty", "$price"]}]}}
            ]}))
        );
    }

    #[test]
    fn test_function_operand() {
        let config = ConfigBuilder::from_preset(Preset::basic())
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
            .field("name", FieldDef::new("Name", ValueType::Text))
            .field("nick", FieldDef::new("Nick", ValueType::Text))
            .build()
            .unwrap();
        let group = JsonGroup::new()
            .rule(
                JsonRule::new("name", "equal")
                    .func_value(FuncValue::new("lower").arg("str", "ABC")),
            )
            .rule(
                JsonRule::new("name", "not_equal")
                    .func_value(FuncValue::new("lower").field_arg("str", "nick")),
            );
        assert_eq!(
            mongodb_format(&load_tree(group), &config),
            Some(json!({"$and": [
                {"$expr": {"$eq": ["$name", {"$toLower": "ABC"}]}},
                {"$expr": {"$ne": ["$name", {"$toLower": "$nick"}]}}
            ]}))
        );
    }

    #[test]
    fn test_function_without_mongo_form_skipped() {
        let config = ConfigBuilder::from_preset(Preset::basic())
            .func(
                "abs",
                FuncDef {
                    label: "Abs".to_string(),
                    sql_func: Some("ABS".to_string()),
                    mongo_func: None,
                    json_logic: None,
                    return_type: ValueType::Number,
                    args: vec![(
                        "n".to_string(),
                        FuncArg {
                            arg_type: ValueType::Number,
                            value_sources: vec![ValueSource::Value],
                        },
                    )],
                },
            )
            .field("qty", FieldDef::new("Qty", ValueType::Number))
            .build()
            .unwrap();
        let group = JsonGroup::new()
            .rule(JsonRule::new("qty", "equal").func_value(FuncValue::new("abs").arg("n", -2)))
            .rule(JsonRule::new("qty", "less").value(4));
        assert_eq!(
            mongodb_format(&load_tree(group), &config),
            Some(json!({"qty": {"$lt": 4}}))
        );
    }
}
