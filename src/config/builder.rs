//! Explicit composition of a preset with override layers.
//!
//! Each `.operator()`, `.widget()`... call is one layer: it replaces the
//! entry of the same key wholesale. `.patch_operator()` and friends derive
//! the new entry from the current one, so partial overrides read as
//! `OperatorDef { label: .., ..base }`. Later calls win.

use super::{
    Config, ConjunctionDef, FieldDef, FuncDef, OperatorDef, Preset, Settings, TypeDef, WidgetDef,
};
use crate::error::{ConfigError, QbError, QbResult};
use crate::value::ValueType;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    conjunctions: BTreeMap<String, ConjunctionDef>,
    operators: BTreeMap<String, OperatorDef>,
    widgets: BTreeMap<String, WidgetDef>,
    types: BTreeMap<ValueType, TypeDef>,
    funcs: BTreeMap<String, FuncDef>,
    fields: BTreeMap<String, FieldDef>,
    settings: Settings,
    errors: Vec<ConfigError>,
}

impl ConfigBuilder {
    pub fn from_preset(preset: Preset) -> Self {
        Self {
            conjunctions: preset.conjunctions,
            operators: preset.operators,
            widgets: preset.widgets,
            types: preset.types,
            funcs: preset.funcs,
            fields: BTreeMap::new(),
            settings: preset.settings,
            errors: Vec::new(),
        }
    }

    pub fn conjunction(mut self, name: impl Into<String>, def: ConjunctionDef) -> Self {
        self.conjunctions.insert(name.into(), def);
        self
    }

    pub fn operator(mut self, name: impl Into<String>, def: OperatorDef) -> Self {
        self.operators.insert(name.into(), def);
        self
    }

    /// Derive an operator from the current definition of the same name.
    pub fn patch_operator(
        mut self,
        name: &str,
        patch: impl FnOnce(OperatorDef) -> OperatorDef,
    ) -> Self {
        match self.operators.remove(name) {
            Some(base) => {
                self.operators.insert(name.to_string(), patch(base));
            }
            None => self.errors.push(ConfigError::MissingBase {
                kind: "operator",
                name: name.to_string(),
            }),
        }
        self
    }

    pub fn widget(mut self, name: impl Into<String>, def: WidgetDef) -> Self {
        self.widgets.insert(name.into(), def);
        self
    }

    /// Derive a widget from the current definition of the same name.
    pub fn patch_widget(mut self, name: &str, patch: impl FnOnce(WidgetDef) -> WidgetDef) -> Self {
        match self.widgets.remove(name) {
            Some(base) => {
                self.widgets.insert(name.to_string(), patch(base));
            }
            None => self.errors.push(ConfigError::MissingBase {
                kind: "widget",
                name: name.to_string(),
            }),
        }
        self
    }

    pub fn type_def(mut self, ty: ValueType, def: TypeDef) -> Self {
        self.types.insert(ty, def);
        self
    }

    pub fn func(mut self, name: impl Into<String>, def: FuncDef) -> Self {
        self.funcs.insert(name.into(), def);
        self
    }

    pub fn field(mut self, name: impl Into<String>, def: FieldDef) -> Self {
        self.fields.insert(name.into(), def);
        self
    }

    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Validate every cross reference and produce the configuration.
    /// All problems are reported together.
    pub fn build(self) -> QbResult<Config> {
        let mut errors = self.errors.clone();
        self.check_operators(&mut errors);
        self.check_types(&mut errors);
        self.check_funcs(&mut errors);
        self.check_fields(&mut errors);
        if !self.conjunctions.contains_key(&self.settings.default_conjunction) {
            errors.push(ConfigError::UnknownConjunction(
                self.settings.default_conjunction.clone(),
            ));
        }

        if !errors.is_empty() {
            return Err(QbError::Config(errors));
        }

        Ok(Config {
            conjunctions: self.conjunctions,
            operators: self.operators,
            widgets: self.widgets,
            types: self.types,
            funcs: self.funcs,
            fields: self.fields,
            settings: self.settings,
        })
    }

    fn check_operators(&self, errors: &mut Vec<ConfigError>) {
        for (name, def) in &self.operators {
            if let Some(rev) = &def.reversed_op {
                if !self.operators.contains_key(rev) {
                    errors.push(ConfigError::UnknownOperator {
                        owner: format!("operator '{name}'"),
                        operator: rev.clone(),
                    });
                }
            }
            if def.cardinality > 2 {
                errors.push(ConfigError::InvalidOperator {
                    operator: name.clone(),
                    message: format!("cardinality {} is not supported", def.cardinality),
                });
            }
            if let Some(opts) = &def.options {
                let range = opts.min_proximity..=opts.max_proximity;
                if !range.contains(&opts.default_proximity) {
                    errors.push(ConfigError::InvalidOperator {
                        operator: name.clone(),
                        message: format!(
                            "default proximity {} outside {}..={}",
                            opts.default_proximity, opts.min_proximity, opts.max_proximity
                        ),
                    });
                }
            }
        }
    }

    fn check_types(&self, errors: &mut Vec<ConfigError>) {
        for (ty, def) in &self.types {
            let owner = format!("type '{ty}'");
            if let Some(op) = &def.default_operator {
                if !self.operators.contains_key(op) {
                    errors.push(ConfigError::UnknownOperator {
                        owner: owner.clone(),
                        operator: op.clone(),
                    });
                }
            }
            for (widget, tw) in &def.widgets {
                if !self.widgets.contains_key(widget) {
                    errors.push(ConfigError::UnknownWidget {
                        owner: owner.clone(),
                        widget: widget.clone(),
                    });
                }
                for op in tw.operators.iter().chain(tw.op_props.keys()) {
                    if !self.operators.contains_key(op) {
                        errors.push(ConfigError::UnknownOperator {
                            owner: format!("{owner} widget '{widget}'"),
                            operator: op.clone(),
                        });
                    }
                }
            }
        }
    }

    fn check_funcs(&self, errors: &mut Vec<ConfigError>) {
        for (name, def) in &self.funcs {
            let arg_types = def.args.iter().map(|(_, a)| a.arg_type);
            let types = std::iter::once(def.return_type).chain(arg_types);
            for ty in types {
                if !self.types.contains_key(&ty) {
                    errors.push(ConfigError::UnknownType {
                        field: format!("function {name}"),
                        ty: ty.to_string(),
                    });
                }
            }
        }
    }

    fn check_fields(&self, errors: &mut Vec<ConfigError>) {
        for (name, def) in &self.fields {
            let owner = format!("field '{name}'");
            if !self.types.contains_key(&def.field_type) {
                errors.push(ConfigError::UnknownType {
                    field: name.clone(),
                    ty: def.field_type.to_string(),
                });
            }
            for widget in &def.prefer_widgets {
                if !self.widgets.contains_key(widget) {
                    errors.push(ConfigError::UnknownWidget {
                        owner: owner.clone(),
                        widget: widget.clone(),
                    });
                }
            }
            for op in def.operators.iter().flatten() {
                if !self.operators.contains_key(op) {
                    errors.push(ConfigError::UnknownOperator {
                        owner: owner.clone(),
                        operator: op.clone(),
                    });
                }
            }
            for func in &def.funcs {
                if !self.funcs.contains_key(func) {
                    errors.push(ConfigError::UnknownFunc {
                        field: name.clone(),
                        func: func.clone(),
                    });
                }
            }
        }
    }
}
