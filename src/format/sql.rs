//! SQL where rendering.

use super::{FuncCall, Operand, ResolvedRule, formatted, resolve_rule};
use crate::callbacks::sql_escape;
use crate::config::Config;
use crate::tree::{JsonGroup, JsonItem, JsonRule, QueryTree};
use crate::value::ValueSource;
use tracing::warn;

/// Render the tree as a SQL where condition; `None` when there is nothing
/// to filter on.
pub fn sql_format(tree: &QueryTree, config: &Config) -> Option<String> {
    group_sql(tree.root(), config)
}

fn group_sql(group: &JsonGroup, config: &Config) -> Option<String> {
    let mut parts: Vec<String> = group
        .children1
        .iter()
        .filter_map(|item| match item {
            JsonItem::Group(g) => group_sql(g, config),
            JsonItem::Rule(r) => rule_sql(r, config),
        })
        .collect();

    let not = group.properties.not;
    match parts.len() {
        0 => None,
        1 if not => Some(format!("NOT ({})", parts[0])),
        1 => Some(parts.remove(0)),
        _ => {
            let conj = config
                .conjunction(&group.properties.conjunction)
                .map(|c| c.sql_conj.as_str())
                .unwrap_or("AND");
            let joined = parts.join(&format!(" {} ", conj));
            Some(format!("{}({})", if not { "NOT " } else { "" }, joined))
        }
    }
}

fn rule_sql(rule: &JsonRule, config: &Config) -> Option<String> {
    let resolved = resolve_rule(rule, config)?;
    let ResolvedRule {
        field,
        op,
        op_def,
        options,
        ..
    } = resolved;

    let values: Vec<String> = resolved
        .operands
        .iter()
        .map(|operand| operand_sql(operand, &resolved, config))
        .collect();

    if let Some(format_op) = op_def.sql_format_op {
        let value = formatted(values, op_def.cardinality);
        return Some(format_op(field, op, &value, op_def, options));
    }
    if let Some(sql_op) = &op_def.sql_op {
        return Some(match op_def.cardinality {
            0 => format!("{} {}", field, sql_op),
            1 => format!("{} {} {}", field, sql_op, values.join("")),
            _ => format!("{} {} {}", field, sql_op, values.join(" AND ")),
        });
    }
    if let Some(format_op) = op_def.format_op {
        let value = formatted(values, op_def.cardinality);
        return Some(format_op(field, op, &value, op_def, options));
    }

    warn!(operator = op, field, "operator is not supported for SQL");
    None
}

fn operand_sql(operand: &Operand<'_>, rule: &ResolvedRule<'_>, config: &Config) -> String {
    match operand {
        Operand::Value(v) => match rule.widget {
            Some(widget) => (widget.sql_format_value)(v),
            None => sql_escape(v),
        },
        Operand::Field(name) => name.to_string(),
        Operand::Func(call) => func_sql(call, config),
    }
}

fn func_sql(call: &FuncCall<'_>, config: &Config) -> String {
    let args: Vec<String> = call
        .args
        .iter()
        .map(|arg| match arg.src {
            ValueSource::Value => match config.widget_for_type(arg.arg_type) {
                Some(widget) => (widget.sql_format_value)(&arg.value),
                None => sql_escape(&arg.value),
            },
            _ => arg.value.as_str().unwrap_or_default().to_string(),
        })
        .collect();
    let name = call.def.sql_func.as_deref().unwrap_or(call.name);
    format!("{}({})", name, args.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigBuilder, FieldDef, FuncArg, FuncDef, Preset};
    use crate::tree::{FuncValue, load_tree};
    use crate::value::{ValueSource, ValueType};

    fn config() -> Config {
        ConfigBuilder::from_preset(Preset::basic())
            .func(
                "lower",
                FuncDef {
                    label: "Lowercase".to_string(),
                    sql_func: Some("LOWER".to_string()),
                    mongo_func: None,
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
            .field("qty", FieldDef::new("Qty", ValueType::Number))
            .field("price", FieldDef::new("Price", ValueType::Number))
            .field("name", FieldDef::new("Name", ValueType::Text))
            .field("tags", FieldDef::new("Tags", ValueType::Multiselect))
            .build()
            .unwrap()
    }

    fn sql(group: JsonGroup) -> Option<String> {
        sql_format(&load_tree(group), &config())
    }

    #[test]
    fn test_empty_group_is_none() {
        assert_eq!(sql(JsonGroup::new()), None);
        assert_eq!(sql(JsonGroup::new().group(JsonGroup::new())), None);
    }

    #[test]
    fn test_single_rule() {
        let group = JsonGroup::new().rule(JsonRule::new("qty", "greater").value(5));
        assert_eq!(sql(group).as_deref(), Some("qty > 5"));
    }

    #[test]
    fn test_conjunctions_and_nesting() {
        let group = JsonGroup::new()
            .rule(JsonRule::new("name", "equal").value("O'Brien"))
            .group(
                JsonGroup::new()
                    .with_conjunction("OR")
                    .rule(JsonRule::new("qty", "less").value(1))
                    .rule(JsonRule::new("qty", "is_null")),
            );
        assert_eq!(
            sql(group).as_deref(),
            Some("(name = 'O''Brien' AND (qty < 1 OR qty IS NULL))")
        );
    }

    #[test]
    fn test_negation() {
        let single = JsonGroup::new()
            .negated()
            .rule(JsonRule::new("qty", "equal").value(1));
        assert_eq!(sql(single).as_deref(), Some("NOT (qty = 1)"));

        let many = JsonGroup::new()
            .negated()
            .rule(JsonRule::new("qty", "equal").value(1))
            .rule(JsonRule::new("qty", "equal").value(2));
        assert_eq!(sql(many).as_deref(), Some("NOT (qty = 1 AND qty = 2)"));
    }

    #[test]
    fn test_between_and_field_operand() {
        let group = JsonGroup::new()
            .rule(JsonRule::new("qty", "between").value(1).value(9))
            .rule(JsonRule::new("qty", "not_equal").field_value("price"));
        assert_eq!(
            sql(group).as_deref(),
            Some("(qty BETWEEN 1 AND 9 AND qty <> price)")
        );
    }

    #[test]
    fn test_function_operand() {
        let group = JsonGroup::new().rule(
            JsonRule::new("name", "equal").func_value(FuncValue::new("lower").arg("str", "ABC")),
        );
        assert_eq!(sql(group).as_deref(), Some("name = LOWER('ABC')"));
    }

    #[test]
    fn test_multiselect_in() {
        let group = JsonGroup::new()
            .rule(JsonRule::new("tags", "select_any_in").value(serde_json::json!(["a", "b"])));
        assert_eq!(sql(group).as_deref(), Some("tags IN ('a', 'b')"));
    }

    #[test]
    fn test_incomplete_rules_are_skipped() {
        let group = JsonGroup::new()
            .rule(JsonRule::new("qty", "equal"))
            .rule(JsonRule::new("name", "like").value("bob"));
        assert_eq!(sql(group).as_deref(), Some("name LIKE '%bob%'"));
    }

    #[test]
    fn test_operator_without_sql_rendering_is_skipped() {
        let config = ConfigBuilder::from_preset(Preset::basic())
            .patch_operator("less", |base| crate::config::OperatorDef {
                sql_op: None,
                ..base
            })
            .field("qty", FieldDef::new("Qty", ValueType::Number))
            .build()
            .unwrap();
        let tree = load_tree(JsonGroup::new().rule(JsonRule::new("qty", "less").value(1)));
        assert_eq!(sql_format(&tree, &config), None);
    }
}
