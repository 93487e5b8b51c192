// Built-in tool implementations.
//
// Registered on the global registry at first use, and by
// `ToolRegistry::with_builtins` for injected registries. Tools are tolerant
// of missing or mistyped options and fall back to null rather than erroring
// where the input is simply the wrong shape.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::registry::{option_str, ToolFailure, ToolRegistry};
use crate::value::{is_empty_value, merge_patch};

/// Register the built-in tool set on `registry`.
pub fn register_builtins(registry: &ToolRegistry) {
    registry.register("upper", string::upper);
    registry.register("lower", string::lower);
    registry.register("capitalize", string::capitalize);
    registry.register("length", collection::length);
    registry.register("dateFormat", date::date_format);
    registry.register("merge", template::merge);
    registry.register("vars", template::vars);
}

/// String case tools.
pub mod string {
    use super::*;

    fn as_text(input: &Value) -> String {
        match input {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// `#upper` — uppercase a string; non-strings are dumped first.
    pub fn upper(
        input: &Value,
        _options: &Value,
        _ctx: &Value,
        _metadata: &mut Value,
    ) -> Result<Value, ToolFailure> {
        if input.is_null() {
            return Ok(Value::Null);
        }
        Ok(Value::String(as_text(input).to_uppercase()))
    }

    /// `#lower` — lowercase, same contract as `upper`.
    pub fn lower(
        input: &Value,
        _options: &Value,
        _ctx: &Value,
        _metadata: &mut Value,
    ) -> Result<Value, ToolFailure> {
        if input.is_null() {
            return Ok(Value::Null);
        }
        Ok(Value::String(as_text(input).to_lowercase()))
    }

    /// `#capitalize(firstOnly=bool)` — title-case each word, or with
    /// `firstOnly` lowercase the text and capitalize only the first letter.
    pub fn capitalize(
        input: &Value,
        options: &Value,
        _ctx: &Value,
        _metadata: &mut Value,
    ) -> Result<Value, ToolFailure> {
        if input.is_null() {
            return Ok(Value::Null);
        }
        let text = as_text(input);
        let first_only = crate::registry::option_bool(options, "firstOnly", false);

        if first_only {
            Ok(Value::String(capitalize_word(&text)))
        } else {
            let words: Vec<String> = text.split_whitespace().map(capitalize_word).collect();
            Ok(Value::String(words.join(" ")))
        }
    }

    fn capitalize_word(word: &str) -> String {
        let lower = word.to_lowercase();
        let mut chars = lower.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => lower,
        }
    }
}

/// Container inspection tools.
pub mod collection {
    use super::*;

    /// `#length(default=n)` — characters of a string, elements of an array,
    /// entries of an object; otherwise the `default` option or null.
    pub fn length(
        input: &Value,
        options: &Value,
        _ctx: &Value,
        _metadata: &mut Value,
    ) -> Result<Value, ToolFailure> {
        match input {
            Value::String(s) => Ok(json!(s.chars().count())),
            Value::Array(a) => Ok(json!(a.len())),
            Value::Object(o) => Ok(json!(o.len())),
            _ => match options.get("default") {
                Some(Value::Number(n)) => Ok(Value::Number(n.clone())),
                _ => Ok(Value::Null),
            },
        }
    }
}

/// Date formatting tools.
pub mod date {
    use super::*;
    use std::fmt::Write as _;

    const DEFAULT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    /// `#dateFormat(format="%Y-%m-%d")` — milliseconds since epoch (number
    /// or numeric string) formatted as a UTC timestamp.
    pub fn date_format(
        input: &Value,
        options: &Value,
        _ctx: &Value,
        _metadata: &mut Value,
    ) -> Result<Value, ToolFailure> {
        let millis = match input {
            Value::Number(n) => match n.as_i64() {
                Some(i) => i,
                None => match n.as_f64() {
                    Some(f) => f as i64,
                    None => return Ok(Value::Null),
                },
            },
            Value::String(s) => match s.parse::<i64>() {
                Ok(i) => i,
                Err(_) => return Ok(Value::Null),
            },
            _ => return Ok(Value::Null),
        };

        let format = option_str(options, "format").unwrap_or(DEFAULT_FORMAT);
        let timestamp: DateTime<Utc> = DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| ToolFailure::Argument(format!("timestamp out of range: {millis}")))?;

        let mut out = String::new();
        write!(out, "{}", timestamp.format(format))
            .map_err(|_| ToolFailure::Argument(format!("invalid date format: {format}")))?;
        Ok(Value::String(out))
    }
}

/// Context-manipulation tools.
pub mod template {
    use super::*;

    /// `#merge{…}` — JSON-merge-patch the context block into an object
    /// input; non-objects pass through unchanged.
    pub fn merge(
        input: &Value,
        _options: &Value,
        ctx: &Value,
        _metadata: &mut Value,
    ) -> Result<Value, ToolFailure> {
        if is_empty_value(ctx) {
            return Ok(input.clone());
        }
        if input.is_object() {
            let mut result = input.clone();
            merge_patch(&mut result, ctx);
            return Ok(result);
        }
        Ok(input.clone())
    }

    /// `#vars(key=name){…}` — build a context carrying the input: under the
    /// `key` option, or merged at top level; the context block wins.
    pub fn vars(
        input: &Value,
        options: &Value,
        ctx: &Value,
        _metadata: &mut Value,
    ) -> Result<Value, ToolFailure> {
        if !input.is_null() {
            if let Some(key) = option_str(options, "key") {
                let mut vars = json!({ key: input });
                merge_patch(&mut vars, ctx);
                return Ok(vars);
            }
            if !is_empty_value(input) {
                let mut vars = input.clone();
                merge_patch(&mut vars, ctx);
                return Ok(vars);
            }
        }
        Ok(ctx.clone())
    }
}
