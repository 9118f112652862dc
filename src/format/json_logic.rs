//! JsonLogic rendering.

use super::{Operand, resolve_rule, single_key};
use crate::config::{Config, JsonLogicShape};
use crate::tree::{JsonGroup, JsonItem, JsonRule, QueryTree};
use crate::value::ValueSource;
use serde::Serialize;
use serde_json::{Map, Value, json};

/// JsonLogic expression plus the data skeleton it reads from.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct JsonLogicResult {
    /// `None` when the tree has no complete rules.
    pub logic: Option<Value>,
    /// Every referenced field, mapped to `null`.
    pub data: Map<String, Value>,
    /// Operators or functions that have no JsonLogic form.
    pub errors: Vec<String>,
}

pub fn json_logic_format(tree: &QueryTree, config: &Config) -> JsonLogicResult {
    let mut result = JsonLogicResult::default();
    let logic = group_logic(tree.root(), config, &mut result);
    result.logic = logic;
    result
}

fn group_logic(group: &JsonGroup, config: &Config, out: &mut JsonLogicResult) -> Option<Value> {
    let mut parts = Vec::new();
    for item in &group.children1 {
        let part = match item {
            JsonItem::Group(g) => group_logic(g, config, out),
            JsonItem::Rule(r) => rule_logic(r, config, out),
        };
        parts.extend(part);
    }
    if parts.is_empty() {
        return None;
    }

    let conj = config
        .conjunction(&group.properties.conjunction)
        .map(|c| c.json_logic_conj.as_str())
        .unwrap_or("and");
    let logic = single_key(conj, Value::Array(parts));
    if group.properties.not {
        Some(single_key("!", logic))
    } else {
        Some(logic)
    }
}

fn var(field: &str, out: &mut JsonLogicResult) -> Value {
    out.data.insert(field.to_string(), Value::Null);
    json!({ "var": field })
}

fn rule_logic(rule: &JsonRule, config: &Config, out: &mut JsonLogicResult) -> Option<Value> {
    let resolved = resolve_rule(rule, config)?;
    let op_def = resolved.op_def;
    let Some(op) = op_def.json_logic.as_deref() else {
        out.errors
            .push(format!("Operator {} is not supported", resolved.op));
        return None;
    };

    let mut values = Vec::with_capacity(resolved.operands.len());
    for operand in &resolved.operands {
        let value = match operand {
            Operand::Value(v) => (*v).clone(),
            Operand::Field(f) => var(f, out),
            Operand::Func(call) => {
                let Some(name) = call.def.json_logic.as_deref() else {
                    out.errors
                        .push(format!("Function {} is not supported", call.name));
                    return None;
                };
                let args: Vec<Value> = call
                    .args
                    .iter()
                    .map(|arg| match (arg.src, arg.value.as_str()) {
                        (ValueSource::Field, Some(f)) => var(f, out),
                        _ => arg.value.clone(),
                    })
                    .collect();
                single_key(name, Value::Array(args))
            }
        };
        values.push(value);
    }

    let field = var(resolved.field, out);
    let args = match op_def.json_logic_shape {
        JsonLogicShape::Binary => {
            let mut args = vec![field];
            if values.is_empty() {
                args.push(Value::Null);
            }
            args.extend(values);
            args
        }
        JsonLogicShape::ValueFirst => {
            let mut args = values;
            args.push(field);
            args
        }
        JsonLogicShape::Range => {
            let mut it = values.into_iter();
            let from = it.next().unwrap_or(Value::Null);
            let to = it.next().unwrap_or(Value::Null);
            vec![from, field, to]
        }
        JsonLogicShape::Unary => vec![field],
    };

    let logic = single_key(op, Value::Array(args));
    if op_def.json_logic_negate {
        Some(single_key("!", logic))
    } else {
        Some(logic)
    }
}
