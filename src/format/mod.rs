//! Pure converters from a query tree to target formats.
//!
//! Every formatter skips incomplete rules (unknown field or operator, or a
//! missing operand) and returns "no condition" for a tree without complete
//! rules.

mod json_logic;
mod mongo;
mod query_string;
mod sql;

pub use json_logic::{JsonLogicResult, json_logic_format};
pub use mongo::mongodb_format;
pub use query_string::query_string;
pub use sql::sql_format;

use crate::callbacks::FormattedValue;
use crate::config::{Config, FuncDef, OperatorDef, WidgetDef};
use crate::tree::{FuncValue, JsonRule};
use crate::value::{ValueSource, ValueType};
use serde_json::{Map, Value};

/// A rule whose field, operator and operands all resolve.
pub(crate) struct ResolvedRule<'a> {
    pub field: &'a str,
    pub op: &'a str,
    pub op_def: &'a OperatorDef,
    pub widget: Option<&'a WidgetDef>,
    pub operands: Vec<Operand<'a>>,
    pub options: Option<&'a Map<String, Value>>,
}

pub(crate) enum Operand<'a> {
    Value(&'a Value),
    Field(&'a str),
    Func(FuncCall<'a>),
}

pub(crate) struct FuncCall<'a> {
    pub name: &'a str,
    pub def: &'a FuncDef,
    /// In declaration order.
    pub args: Vec<FuncArgOperand>,
}

pub(crate) struct FuncArgOperand {
    pub src: ValueSource,
    pub value: Value,
    pub arg_type: ValueType,
}

pub(crate) fn resolve_rule<'a>(rule: &'a JsonRule, config: &'a Config) -> Option<ResolvedRule<'a>> {
    let field = rule.field()?;
    let op = rule.operator()?;
    config.field(field)?;
    let op_def = config.operator(op)?;

    let values = &rule.properties.value;
    if values.len() < op_def.cardinality {
        return None;
    }

    let mut operands = Vec::with_capacity(op_def.cardinality);
    for (i, value) in values.iter().take(op_def.cardinality).enumerate() {
        if value.is_null() {
            return None;
        }
        let operand = match rule.value_src(i) {
            ValueSource::Value => Operand::Value(value),
            ValueSource::Field => Operand::Field(value.as_str()?),
            ValueSource::Func => Operand::Func(resolve_func(value, config)?),
        };
        operands.push(operand);
    }

    Some(ResolvedRule {
        field,
        op,
        op_def,
        widget: config.widget_for(field, op).map(|(_, w)| w),
        operands,
        options: rule.properties.operator_options.as_ref(),
    })
}

fn resolve_func<'a>(value: &Value, config: &'a Config) -> Option<FuncCall<'a>> {
    let call = FuncValue::from_value(value)?;
    let (name, def) = config.funcs.get_key_value(&call.func)?;

    let mut args = Vec::with_capacity(def.args.len());
    for (arg_name, arg_def) in &def.args {
        let arg = call.args.get(arg_name)?;
        if arg.value.is_null() {
            return None;
        }
        args.push(FuncArgOperand {
            src: arg.value_src,
            value: arg.value.clone(),
            arg_type: arg_def.arg_type,
        });
    }

    Some(FuncCall {
        name: name.as_str(),
        def,
        args,
    })
}

/// Whether every formatter would render this rule.
pub fn is_complete(rule: &JsonRule, config: &Config) -> bool {
    resolve_rule(rule, config).is_some()
}

fn formatted(mut values: Vec<String>, cardinality: usize) -> FormattedValue {
    if cardinality == 1 && values.len() == 1 {
        FormattedValue::Single(values.remove(0))
    } else {
        FormattedValue::Many(values)
    }
}

fn single_key(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigBuilder, FieldDef, Preset};
    use crate::tree::JsonRule;
    use serde_json::json;

    fn config() -> Config {
        ConfigBuilder::from_preset(Preset::basic())
            .field("qty", FieldDef::new("Qty", ValueType::Number))
            .build()
            .unwrap()
    }

    #[test]
    fn test_completeness() {
        let config = config();
        assert!(is_complete(&JsonRule::new("qty", "equal").value(1), &config));
        assert!(is_complete(&JsonRule::new("qty", "is_null"), &config));
        assert!(!is_complete(&JsonRule::new("qty", "equal"), &config));
        assert!(!is_complete(&JsonRule::new("qty", "between").value(1), &config));
        assert!(!is_complete(&JsonRule::new("qty", "equal").value(json!(null)), &config));
        assert!(!is_complete(&JsonRule::new("ghost", "equal").value(1), &config));
    }

    #[test]
    fn test_unknown_function_is_incomplete() {
        let rule = JsonRule::new("qty", "equal").func_value(FuncValue::new("abs").arg("n", 1));
        assert!(!is_complete(&rule, &config()));
    }
}
