// Tool registry: process-wide name → callable table.
//
// Lookup is exact and case-sensitive. Reads take a shared lock; registration
// takes an exclusive lock. The callable is cloned out of the table before it
// runs so a tool re-entering the engine (and thus the registry) cannot
// deadlock against a pending writer.

use std::sync::{Arc, OnceLock, RwLock};

use indexmap::IndexMap;
use serde_json::Value;
use thiserror::Error;

/// Error raised by a tool body or by dispatch.
///
/// The engine wraps these into [`crate::JzError::Tool`] (or
/// [`crate::JzError::UnknownTool`]) together with the pipeline's source
/// position.
#[derive(Error, Debug)]
pub enum ToolFailure {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("argument error: {0}")]
    Argument(String),

    #[error("type error: {0}")]
    Type(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}

/// Signature shared by every registered tool.
///
/// * `input` — the value coming in through the pipe
/// * `options` — evaluated `name=expr` options from the parentheses
/// * `ctx` — context object parsed from the `{ … }` block, or an empty object
/// * `metadata` — mutable bag shared by all tools within one engine call
pub type ToolFn =
    Arc<dyn Fn(&Value, &Value, &Value, &mut Value) -> Result<Value, ToolFailure> + Send + Sync>;

/// Name → callable table with shared-read / exclusive-write concurrency.
#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<IndexMap<String, ToolFn>>,
}

impl ToolRegistry {
    /// An empty registry with no built-ins.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with the built-in tool set.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        crate::tools::register_builtins(&registry);
        registry
    }

    /// Register a tool under `name`, overwriting any previous registration.
    pub fn register<F>(&self, name: &str, tool: F)
    where
        F: Fn(&Value, &Value, &Value, &mut Value) -> Result<Value, ToolFailure>
            + Send
            + Sync
            + 'static,
    {
        let mut tools = self.tools.write().expect("tool registry lock poisoned");
        tools.insert(name.to_string(), Arc::new(tool));
    }

    pub fn has(&self, name: &str) -> bool {
        let tools = self.tools.read().expect("tool registry lock poisoned");
        tools.contains_key(name)
    }

    /// Registered tool names in registration order.
    pub fn names(&self) -> Vec<String> {
        let tools = self.tools.read().expect("tool registry lock poisoned");
        tools.keys().cloned().collect()
    }

    /// Run a registered tool.
    pub fn invoke(
        &self,
        name: &str,
        input: &Value,
        options: &Value,
        ctx: &Value,
        metadata: &mut Value,
    ) -> Result<Value, ToolFailure> {
        let tool = {
            let tools = self.tools.read().expect("tool registry lock poisoned");
            tools.get(name).cloned()
        };
        let tool = tool.ok_or_else(|| ToolFailure::UnknownTool(name.to_string()))?;
        tool(input, options, ctx, metadata)
    }
}

/// The process-wide registry used by the free functions [`crate::to_json`]
/// and [`crate::to_string`]. First use registers the built-in tool set.
pub fn global_registry() -> Arc<ToolRegistry> {
    static GLOBAL: OnceLock<Arc<ToolRegistry>> = OnceLock::new();
    GLOBAL
        .get_or_init(|| Arc::new(ToolRegistry::with_builtins()))
        .clone()
}

/// Read a typed option, falling back to `default` when absent or mistyped.
pub fn option_bool(options: &Value, name: &str, default: bool) -> bool {
    options
        .get(name)
        .and_then(Value::as_bool)
        .unwrap_or(default)
}

/// Read a string option; `None` when absent or not a string.
pub fn option_str<'a>(options: &'a Value, name: &str) -> Option<&'a str> {
    options.get(name).and_then(Value::as_str)
}
