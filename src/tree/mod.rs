//! The query tree.
//!
//! [`JsonItem`] and friends are the serialized form exchanged with storage.
//! [`QueryTree`] is the immutable loaded value: it is shared behind an `Arc`
//! and never mutated in place; every transformation builds a new tree.

mod check;

pub use check::{TreeIssue, check_tree};

use crate::error::{QbError, QbResult};
use crate::value::{ValueSource, ValueType};
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// A node of the serialized tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum JsonItem {
    Group(JsonGroup),
    Rule(JsonRule),
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupProperties {
    #[serde(default = "default_conjunction")]
    pub conjunction: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub not: bool,
}

fn default_conjunction() -> String {
    "AND".to_string()
}

impl Default for GroupProperties {
    fn default() -> Self {
        Self {
            conjunction: default_conjunction(),
            not: false,
        }
    }
}

/// A group node: a conjunction over children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonGroup {
    #[serde(default = "new_id")]
    pub id: String,
    #[serde(default)]
    pub properties: GroupProperties,
    #[serde(
        default,
        deserialize_with = "deserialize_children",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub children1: Vec<JsonItem>,
}

impl Default for JsonGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonGroup {
    /// An empty AND group with a fresh id.
    pub fn new() -> Self {
        Self {
            id: new_id(),
            properties: GroupProperties::default(),
            children1: Vec::new(),
        }
    }

    pub fn with_conjunction(mut self, conjunction: impl Into<String>) -> Self {
        self.properties.conjunction = conjunction.into();
        self
    }

    pub fn negated(mut self) -> Self {
        self.properties.not = true;
        self
    }

    pub fn rule(mut self, rule: JsonRule) -> Self {
        self.children1.push(JsonItem::Rule(rule));
        self
    }

    pub fn group(mut self, group: JsonGroup) -> Self {
        self.children1.push(JsonItem::Group(group));
        self
    }

    /// Serialize with the `"type": "group"` tag.
    pub fn to_value(&self) -> QbResult<Value> {
        Ok(serde_json::to_value(JsonItem::Group(self.clone()))?)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleProperties {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub operator: Option<String>,
    #[serde(default)]
    pub value: Vec<Value>,
    #[serde(default)]
    pub value_src: Vec<Option<ValueSource>>,
    #[serde(default)]
    pub value_type: Vec<Option<ValueType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator_options: Option<Map<String, Value>>,
}

/// A rule node: `field operator value..`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRule {
    #[serde(default = "new_id")]
    pub id: String,
    #[serde(default)]
    pub properties: RuleProperties,
}

impl JsonRule {
    pub fn new(field: impl Into<String>, operator: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            properties: RuleProperties {
                field: Some(field.into()),
                operator: Some(operator.into()),
                ..RuleProperties::default()
            },
        }
    }

    /// Append a literal operand.
    pub fn value(self, value: impl Into<Value>) -> Self {
        self.operand(value.into(), ValueSource::Value)
    }

    /// Append an operand referring to another field.
    pub fn field_value(self, field: impl Into<String>) -> Self {
        self.operand(Value::String(field.into()), ValueSource::Field)
    }

    /// Append a function call operand.
    pub fn func_value(self, func: FuncValue) -> Self {
        let value = serde_json::to_value(func).unwrap_or(Value::Null);
        self.operand(value, ValueSource::Func)
    }

    pub fn operator_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties
            .operator_options
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    fn operand(mut self, value: Value, src: ValueSource) -> Self {
        self.properties.value.push(value);
        self.properties.value_src.push(Some(src));
        self
    }

    pub fn field(&self) -> Option<&str> {
        self.properties.field.as_deref()
    }

    pub fn operator(&self) -> Option<&str> {
        self.properties.operator.as_deref()
    }

    /// Source of operand `index`, `value` when unset.
    pub fn value_src(&self, index: usize) -> ValueSource {
        self.properties
            .value_src
            .get(index)
            .copied()
            .flatten()
            .unwrap_or_default()
    }
}

/// A function call stored as a rule operand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuncValue {
    pub func: String,
    #[serde(default)]
    pub args: BTreeMap<String, FuncArgValue>,
}

impl FuncValue {
    pub fn new(func: impl Into<String>) -> Self {
        Self {
            func: func.into(),
            args: BTreeMap::new(),
        }
    }

    pub fn arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(
            name.into(),
            FuncArgValue {
                value_src: ValueSource::Value,
                value: value.into(),
            },
        );
        self
    }

    pub fn field_arg(mut self, name: impl Into<String>, field: impl Into<String>) -> Self {
        self.args.insert(
            name.into(),
            FuncArgValue {
                value_src: ValueSource::Field,
                value: Value::String(field.into()),
            },
        );
        self
    }

    /// Parse a stored operand.
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuncArgValue {
    #[serde(default)]
    pub value_src: ValueSource,
    #[serde(default)]
    pub value: Value,
}

/// Children arrive either as an array or, from older producers, as an
/// object keyed by child id. Object order is preserved, and a child without
/// its own `id` takes its key.
fn deserialize_children<'de, D>(deserializer: D) -> Result<Vec<JsonItem>, D::Error>
where
    D: Deserializer<'de>,
{
    struct ChildrenVisitor;

    impl<'de> Visitor<'de> for ChildrenVisitor {
        type Value = Vec<JsonItem>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an array or an object of tree items")
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut items = Vec::new();
            while let Some(item) = seq.next_element()? {
                items.push(item);
            }
            Ok(items)
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut items = Vec::new();
            while let Some((key, mut item)) = map.next_entry::<String, Value>()? {
                if let Value::Object(fields) = &mut item {
                    fields.entry("id").or_insert(Value::String(key));
                }
                items.push(JsonItem::deserialize(item).map_err(de::Error::custom)?);
            }
            Ok(items)
        }
    }

    deserializer.deserialize_any(ChildrenVisitor)
}

/// An immutable, cheaply clonable query tree.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryTree {
    root: Arc<JsonGroup>,
}

impl QueryTree {
    /// A tree holding one empty group.
    pub fn empty() -> Self {
        load_tree(JsonGroup::new())
    }

    pub fn root(&self) -> &JsonGroup {
        &self.root
    }

    pub fn id(&self) -> &str {
        &self.root.id
    }

    /// Whether the tree has no rules at any depth.
    pub fn is_empty(&self) -> bool {
        fn has_rule(group: &JsonGroup) -> bool {
            group.children1.iter().any(|item| match item {
                JsonItem::Rule(_) => true,
                JsonItem::Group(g) => has_rule(g),
            })
        }
        !has_rule(&self.root)
    }

    /// Parse a serialized tree; the top level must be a group.
    pub fn from_json_str(json: &str) -> QbResult<Self> {
        let item: JsonItem = serde_json::from_str(json)?;
        Self::from_item(item)
    }

    pub fn from_value(value: Value) -> QbResult<Self> {
        let item: JsonItem = serde_json::from_value(value)?;
        Self::from_item(item)
    }

    fn from_item(item: JsonItem) -> QbResult<Self> {
        match item {
            JsonItem::Group(group) => Ok(load_tree(group)),
            JsonItem::Rule(rule) => Err(QbError::tree(format!(
                "top level item '{}' is a rule, expected a group",
                rule.id
            ))),
        }
    }

    pub fn to_value(&self) -> QbResult<Value> {
        self.root.to_value()
    }

    /// A new tree with `group` as root; `self` is left untouched.
    pub fn with_root(&self, group: JsonGroup) -> Self {
        load_tree(group)
    }
}

/// Load a serialized group into an immutable tree.
pub fn load_tree(value: JsonGroup) -> QueryTree {
    QueryTree {
        root: Arc::new(value),
    }
}

/// The serialized form of a tree, for logging and persistence.
pub fn get_tree(tree: &QueryTree) -> JsonGroup {
    (*tree.root).clone()
}
