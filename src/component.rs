//! The query-builder component: one piece of state and a render path.
//!
//! The component owns `{tree, config}`. A change notification replaces the
//! state wholesale and logs the serialized tree. Rendering derives read-only
//! views that are never fed back into state.

use crate::config::Config;
use crate::format::{JsonLogicResult, json_logic_format, sql_format};
use crate::tree::{JsonGroup, QueryTree, TreeIssue, check_tree, get_tree, load_tree};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// The component state.
#[derive(Debug, Clone)]
pub struct QueryBuilderState {
    pub tree: QueryTree,
    pub config: Arc<Config>,
}

/// Holds the current tree and configuration of one query builder.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    state: QueryBuilderState,
    load_issues: Vec<TreeIssue>,
}

impl QueryBuilder {
    /// Load and check the initial query value against `config`.
    pub fn new(config: Arc<Config>, initial: JsonGroup) -> Self {
        let (tree, load_issues) = check_tree(&load_tree(initial), &config);
        Self {
            state: QueryBuilderState { tree, config },
            load_issues,
        }
    }

    pub fn state(&self) -> &QueryBuilderState {
        &self.state
    }

    pub fn tree(&self) -> &QueryTree {
        &self.state.tree
    }

    pub fn config(&self) -> &Config {
        &self.state.config
    }

    /// Problems repaired while loading the initial value.
    pub fn load_issues(&self) -> &[TreeIssue] {
        &self.load_issues
    }

    /// Change notification from the editor: replace the state and log the
    /// serialized tree.
    pub fn on_change(&mut self, tree: QueryTree, config: Arc<Config>) {
        self.state = QueryBuilderState { tree, config };

        match serde_json::to_string(&get_tree(&self.state.tree)) {
            Ok(json) => info!(tree = %json, "query tree changed"),
            Err(e) => warn!(error = %e, "failed to serialize query tree"),
        }
    }

    /// Derive the display views of the current state.
    pub fn render(&self) -> RenderedQuery {
        let QueryBuilderState { tree, config } = &self.state;
        RenderedQuery {
            sql_where: sql_format(tree, config),
            json_logic: json_logic_format(tree, config),
        }
    }
}

/// The result panel of the component.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedQuery {
    pub sql_where: Option<String>,
    pub json_logic: JsonLogicResult,
}

impl std::fmt::Display for RenderedQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sql = serde_json::to_string(&self.sql_where).map_err(|_| std::fmt::Error)?;
        let logic = serde_json::to_string(&self.json_logic).map_err(|_| std::fmt::Error)?;
        writeln!(f, "Query Builder")?;
        writeln!(f, "SQL where: {}", sql)?;
        write!(f, "JsonLogic: {}", logic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigBuilder, FieldDef, Preset};
    use crate::tree::JsonRule;
    use crate::value::ValueType;

    fn config() -> Arc<Config> {
        Arc::new(
            ConfigBuilder::from_preset(Preset::basic())
                .field("qty", FieldDef::new("Qty", ValueType::Number))
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_new_checks_initial_value() {
        let initial = JsonGroup::new()
            .rule(JsonRule::new("qty", "equal").value(2))
            .rule(JsonRule::new("ghost", "equal").value(1));
        let builder = QueryBuilder::new(config(), initial);
        assert_eq!(builder.load_issues().len(), 1);
        assert_eq!(builder.render().sql_where.as_deref(), Some("qty = 2"));
    }

    #[test]
    fn test_on_change_replaces_state() {
        let config = config();
        let mut builder = QueryBuilder::new(config.clone(), JsonGroup::new());
        let before = builder.tree().clone();

        let next = before.with_root(get_tree(&before).rule(JsonRule::new("qty", "less").value(3)));
        builder.on_change(next.clone(), config.clone());

        assert_eq!(builder.tree(), &next);
        assert!(before.is_empty());
        assert!(Arc::ptr_eq(&builder.state().config, &config));
        assert_eq!(builder.render().sql_where.as_deref(), Some("qty < 3"));
    }

    #[test]
    fn test_render_display() {
        let builder = QueryBuilder::new(config(), JsonGroup::new());
        assert_eq!(
            builder.render().to_string(),
            "Query Builder\nSQL where: null\nJsonLogic: {\"logic\":null,\"data\":{},\"errors\":[]}"
        );
    }
}
