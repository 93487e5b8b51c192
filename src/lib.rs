//! # jz
//!
//! An embedded templating and data-transformation engine: a relaxed,
//! JSON5-like template plus an input data tree produce an output JSON tree.
//!
//! Templates are JSON with comments, single quotes, unquoted keys and
//! trailing commas, extended with two evaluated constructs:
//!
//! * `$(expr)` placeholders that read from the data and splice JSON values,
//! * backtick strings with interpolation: `` `Hi $(user.name)!` ``.
//!
//! Expressions support paths (`a.b[0]`), literals, `! == != < > <= >=`,
//! short-circuiting `|| && ?? ?:`, and tool pipelines
//! (`$(name | #upper)`). Values that are missing from the data evaluate to
//! an in-band undefined sentinel which is pruned from the final tree, so
//! absent data shapes the output instead of erroring.
//!
//! ```
//! use serde_json::json;
//!
//! let data = json!({ "user": { "name": "Luca" }, "val": 42 });
//! let mut metadata = json!({});
//! let out = jz::to_json(
//!     r#"{
//!         // comments are fine
//!         greeting: `Hi $(user.name)!`,
//!         value: $(val),
//!         missing: $(user.middle),
//!     }"#,
//!     &data,
//!     &mut metadata,
//! )
//! .unwrap();
//! assert_eq!(out, json!({ "greeting": "Hi Luca!", "value": 42 }));
//! ```
//!
//! ## Architecture
//!
//! * `normalize` - JSON5-ish to JSON text passes (comments, quotes, keys, commas)
//! * `template` - `$(...)` and backtick rewriting
//! * `parser` - expression lexer + evaluating recursive-descent parser
//! * `value` - undefined sentinel, truthiness/nullishness, coercion
//! * `registry` - name -> tool table with shared/exclusive locking
//! * `tools` - built-in tool set (upper, lower, length, dateFormat, ...)
//! * `engine` - registry injection, recursion bound, pipeline composition

mod engine;
mod error;
mod normalize;
mod parser;
mod registry;
mod scanner;
mod template;
pub mod tools;
mod value;

use serde_json::Value;

pub use engine::{Engine, DEFAULT_MAX_DEPTH};
pub use error::JzError;
pub use registry::{global_registry, option_bool, option_str, ToolFailure, ToolFn, ToolRegistry};
pub use value::{is_undefined, undefined};

/// Transform a template into its output JSON tree.
///
/// Runs the full pipeline against the process-wide tool registry. `data` is
/// the tree placeholder paths resolve against; `metadata` is a mutable bag
/// shared by every tool invocation within this call.
///
/// Missing data is not an error: it becomes undefined and is pruned. Any
/// syntax or tool failure aborts with a [`JzError`] carrying a best-effort
/// source position.
pub fn to_json(template: &str, data: &Value, metadata: &mut Value) -> Result<Value, JzError> {
    Engine::new().to_json(template, data, metadata)
}

/// Transform a template into the intermediate JSONish text: comments
/// stripped and placeholders substituted, but JSON5-isms left in place.
pub fn to_string(template: &str, data: &Value, metadata: &mut Value) -> Result<String, JzError> {
    Engine::new().to_string(template, data, metadata)
}

/// Normalize JSON5-ish text to strict JSON: single-quoted strings, unquoted
/// object keys and trailing commas. Comment stripping is part of
/// [`to_string`]/[`to_json`], not of this helper.
pub fn normalize_json5_to_json(text: &str) -> Result<String, JzError> {
    normalize::normalize_json5_to_json(text)
}
