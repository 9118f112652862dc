//! Human readable query string.

use super::{Operand, formatted, resolve_rule};
use crate::config::Config;
use crate::config::preset::format_scalar;
use crate::tree::{JsonGroup, JsonItem, JsonRule, QueryTree};
use crate::value::ValueSource;

/// Render the tree as text. With `is_for_display` fields and functions use
/// their labels and values their display form; otherwise keys and JSON.
pub fn query_string(tree: &QueryTree, config: &Config, is_for_display: bool) -> Option<String> {
    group_string(tree.root(), config, is_for_display, true)
}

fn group_string(
    group: &JsonGroup,
    config: &Config,
    is_for_display: bool,
    is_root: bool,
) -> Option<String> {
    let parts: Vec<String> = group
        .children1
        .iter()
        .filter_map(|item| match item {
            JsonItem::Group(g) => group_string(g, config, is_for_display, false),
            JsonItem::Rule(r) => rule_string(r, config, is_for_display),
        })
        .collect();
    if parts.is_empty() {
        return None;
    }

    let conj = config
        .conjunction(&group.properties.conjunction)
        .map(|c| c.sql_conj.as_str())
        .unwrap_or("AND");
    let joined = parts.join(&format!(" {} ", conj));

    Some(if group.properties.not {
        format!("NOT ({})", joined)
    } else if parts.len() > 1 && !is_root {
        format!("({})", joined)
    } else {
        joined
    })
}

fn rule_string(rule: &JsonRule, config: &Config, is_for_display: bool) -> Option<String> {
    let resolved = resolve_rule(rule, config)?;
    let op_def = resolved.op_def;
    let name = |field: &str| {
        if is_for_display {
            config.field_label(field).to_string()
        } else {
            field.to_string()
        }
    };

    let values: Vec<String> = resolved
        .operands
        .iter()
        .map(|operand| match operand {
            Operand::Value(v) => match resolved.widget {
                Some(widget) => (widget.format_value)(v, is_for_display),
                None => format_scalar(v, is_for_display),
            },
            Operand::Field(f) => name(f),
            Operand::Func(call) => {
                let args: Vec<String> = call
                    .args
                    .iter()
                    .map(|arg| match (arg.src, arg.value.as_str()) {
                        (ValueSource::Field, Some(f)) => name(f),
                        _ => format_scalar(&arg.value, is_for_display),
                    })
                    .collect();
                let func = if is_for_display {
                    call.def.label.as_str()
                } else {
                    call.name
                };
                format!("{}({})", func, args.join(", "))
            }
        })
        .collect();

    let field = name(resolved.field);
    if let Some(format_op) = op_def.format_op {
        let value = formatted(values, op_def.cardinality);
        return Some(format_op(&field, resolved.op, &value, op_def, resolved.options));
    }

    let label = op_def.format_label();
    Some(match op_def.cardinality {
        0 => format!("{} {}", field, label),
        1 => format!("{} {} {}", field, label, values.join("")),
        _ => format!("{} {} {}", field, label, values.join(" AND ")),
    })
}
