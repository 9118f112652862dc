//! # qbuild: Typed Query Builder Configuration
//!
//! > **Describe your fields once. Render every dialect.**
//!
//! qbuild models a visual query builder: a validated [`config::Config`]
//! of fields, types, widgets and operators, an immutable
//! [`tree::QueryTree`] of rules and groups, and pure formatters that turn
//! the tree into a SQL where condition, JsonLogic, a MongoDB filter or a
//! readable query string.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use qbuild::prelude::*;
//!
//! let config = demo_config()?;
//! let tree = load_tree(JsonGroup::new().rule(JsonRule::new("qty", "greater").value(5)));
//!
//! let sql = sql_format(&tree, &config);
//! // => Some("qty > 5")
//! ```
//!
//! ## Formats
//!
//! | Function              | Output                          |
//! |-----------------------|---------------------------------|
//! | `sql_format`          | `Option<String>` where clause   |
//! | `json_logic_format`   | logic, data skeleton, errors    |
//! | `mongodb_format`      | `Option<Value>` find filter     |
//! | `query_string`        | `Option<String>` for humans     |

pub mod callbacks;
pub mod component;
pub mod config;
pub mod demo;
pub mod error;
pub mod fetch;
pub mod format;
pub mod settings;
pub mod tree;
pub mod value;

pub mod prelude {
    pub use crate::component::{QueryBuilder, QueryBuilderState, RenderedQuery};
    pub use crate::config::{Config, ConfigBuilder, FieldDef, OperatorDef, Preset, WidgetDef};
    pub use crate::demo::{demo_config, initial_query_value};
    pub use crate::error::*;
    pub use crate::format::{
        JsonLogicResult, json_logic_format, mongodb_format, query_string, sql_format,
    };
    pub use crate::tree::{
        FuncValue, JsonGroup, JsonRule, QueryTree, check_tree, get_tree, load_tree,
    };
    pub use crate::value::{ValueSource, ValueType};
}

pub use component::QueryBuilder;
pub use config::{Config, ConfigBuilder};
pub use error::{QbError, QbResult};
pub use tree::QueryTree;
