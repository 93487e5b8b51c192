// Engine: registry injection, recursion accounting and the pipeline.
//
// A call runs: strip comments -> replace placeholders (evaluating
// expressions against the data) -> normalize JSON5-isms -> strict JSON
// parse -> prune undefined sentinels. Tool context blocks re-enter the
// pipeline with a depth counter so template-induced recursion is bounded.

use std::sync::Arc;

use serde_json::Value;

use crate::error::JzError;
use crate::normalize;
use crate::registry::{global_registry, ToolRegistry};
use crate::template::replace_placeholders;
use crate::value::prune_undefined;

/// Default bound on nested template expansion (tool context blocks).
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Per-call evaluation state threaded through rewriter and parser.
pub(crate) struct EvalContext<'a> {
    pub(crate) registry: &'a ToolRegistry,
    pub(crate) metadata: &'a mut Value,
    pub(crate) max_depth: usize,
}

/// A configured instance of the templating engine.
///
/// The free functions [`crate::to_json`] and [`crate::to_string`] run on the
/// process-wide tool registry; embedders that want an isolated tool set (or
/// a different recursion bound) build an `Engine` instead:
///
/// ```
/// use std::sync::Arc;
/// use serde_json::json;
///
/// let registry = Arc::new(jz::ToolRegistry::with_builtins());
/// registry.register("shout", |input, _options, _ctx, _metadata| {
///     Ok(json!(format!("{}!", input.as_str().unwrap_or_default())))
/// });
///
/// let engine = jz::Engine::with_registry(registry);
/// let mut metadata = json!({});
/// let out = engine
///     .to_json("{ v: $(name | #shout) }", &json!({"name": "hi"}), &mut metadata)
///     .unwrap();
/// assert_eq!(out, json!({"v": "hi!"}));
/// ```
pub struct Engine {
    registry: Arc<ToolRegistry>,
    max_depth: usize,
}

impl Engine {
    /// Engine backed by the process-wide registry.
    pub fn new() -> Self {
        Engine {
            registry: global_registry(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Engine backed by an injected registry.
    pub fn with_registry(registry: Arc<ToolRegistry>) -> Self {
        Engine {
            registry,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Override the nested-template recursion bound.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Strip comments and substitute placeholders, returning the
    /// intermediate JSONish text.
    pub fn to_string(
        &self,
        template: &str,
        data: &Value,
        metadata: &mut Value,
    ) -> Result<String, JzError> {
        let mut ctx = EvalContext {
            registry: &self.registry,
            metadata,
            max_depth: self.max_depth,
        };
        to_string_at(template, data, &mut ctx, 0)
    }

    /// Run the full pipeline and return the output JSON tree.
    pub fn to_json(
        &self,
        template: &str,
        data: &Value,
        metadata: &mut Value,
    ) -> Result<Value, JzError> {
        let mut ctx = EvalContext {
            registry: &self.registry,
            metadata,
            max_depth: self.max_depth,
        };
        to_json_at(template, data, &mut ctx, 0)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}

pub(crate) fn to_string_at(
    template: &str,
    data: &Value,
    ctx: &mut EvalContext<'_>,
    depth: usize,
) -> Result<String, JzError> {
    let no_comments = normalize::strip_comments(template)?;
    replace_placeholders(&no_comments, data, ctx, depth)
}

pub(crate) fn to_json_at(
    template: &str,
    data: &Value,
    ctx: &mut EvalContext<'_>,
    depth: usize,
) -> Result<Value, JzError> {
    if depth > ctx.max_depth {
        return Err(JzError::RecursionLimit {
            limit: ctx.max_depth,
        });
    }

    let with_values = to_string_at(template, data, ctx, depth)?;
    let jsonish = normalize::normalize_json5_to_json(&with_values)?;

    match serde_json::from_str::<Value>(&jsonish) {
        Ok(mut parsed) => {
            prune_undefined(&mut parsed);
            Ok(parsed)
        }
        Err(err) => Err(JzError::InvalidJsonAfterTransform {
            message: err.to_string(),
            intermediate: jsonish,
        }),
    }
}
