// Template placeholder replacement.
//
// Scans comment-free template text for `$(expr)` placeholders and backtick
// interpolated segments. Interpolation is active ONLY inside backticks:
// `Hi $(user.name)!` evaluates, "Hi $(user.name)!" stays literal.
//
// A standalone placeholder splices the compact JSON form of its value, with
// missing/undefined spliced as the sentinel literal so the finalizer can
// prune it. Inside backticks, strings splice raw, null and undefined splice
// as empty text, and everything else splices as compact JSON; the whole
// segment then becomes one quoted JSON string literal.

use serde_json::Value;

use crate::engine::EvalContext;
use crate::error::JzError;
use crate::parser::evaluate_expression;
use crate::scanner::Scanner;
use crate::value::{undefined, EvalValue};

pub(crate) fn replace_placeholders(
    source: &str,
    data: &Value,
    ctx: &mut EvalContext<'_>,
    depth: usize,
) -> Result<String, JzError> {
    let mut sc = Scanner::new(source);
    let mut out = String::with_capacity(source.len());

    let mut in_string = false;
    let mut delim = '\0';
    let mut escape = false;

    while let Some(c) = sc.bump() {
        if !in_string && c == '`' {
            let (start_line, start_col) = sc.position_prev();
            let text = read_backtick_segment(&mut sc, start_line, start_col, data, ctx, depth)?;
            out.push_str(&Value::String(text).to_string());
            continue;
        }

        if in_string {
            out.push(c);
            if escape {
                escape = false;
            } else if c == '\\' {
                escape = true;
            } else if c == delim {
                in_string = false;
            }
            continue;
        }

        if c == '"' || c == '\'' {
            in_string = true;
            delim = c;
            out.push(c);
            continue;
        }

        if c == '$' && sc.peek(0) == Some('(') {
            sc.advance(1);
            let expr = read_placeholder_expr(&mut sc)?;
            let value = evaluate_expression(&expr, data, ctx, depth)?;
            if value.is_missing() {
                out.push_str(&undefined().to_string());
            } else {
                let json = value.into_json();
                if crate::value::is_undefined(&json) {
                    out.push_str(&undefined().to_string());
                } else {
                    out.push_str(&json.to_string());
                }
            }
            continue;
        }

        out.push(c);
    }

    Ok(out)
}

/// Consume a backtick segment (opening backtick already consumed), return
/// the accumulated plain text. `\X` puts a literal `X` into the text; the
/// JSON string emission afterwards re-escapes as needed.
fn read_backtick_segment(
    sc: &mut Scanner,
    start_line: usize,
    start_col: usize,
    data: &Value,
    ctx: &mut EvalContext<'_>,
    depth: usize,
) -> Result<String, JzError> {
    let mut acc = String::new();
    let mut escape = false;

    while let Some(c) = sc.bump() {
        if escape {
            acc.push(c);
            escape = false;
            continue;
        }
        if c == '\\' {
            escape = true;
            continue;
        }
        if c == '`' {
            return Ok(acc);
        }
        if c == '$' && sc.peek(0) == Some('(') {
            sc.advance(1);
            let expr = read_placeholder_expr(sc)?;
            let value = evaluate_expression(&expr, data, ctx, depth)?;
            append_template_value(&mut acc, &value);
            continue;
        }
        acc.push(c);
    }

    Err(JzError::UnterminatedTemplate {
        line: start_line,
        column: start_col,
    })
}

/// Scanner sits right after `$(`. Consume up to the matching `)`, balancing
/// nested parentheses and skipping string literals, and return the
/// expression text between.
fn read_placeholder_expr(sc: &mut Scanner) -> Result<String, JzError> {
    let start_idx = sc.pos();
    let (start_line, start_col) = sc.position();

    let mut depth = 1usize;
    let mut in_string = false;
    let mut delim = '\0';
    let mut escape = false;

    while let Some(c) = sc.bump() {
        if in_string {
            if escape {
                escape = false;
            } else if c == '\\' {
                escape = true;
            } else if c == delim {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' | '\'' => {
                in_string = true;
                delim = c;
            }
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(sc.slice(start_idx, sc.pos() - 1));
                }
            }
            _ => {}
        }
    }

    Err(JzError::UnterminatedPlaceholder {
        line: start_line,
        column: start_col,
    })
}

// strings splice raw, null/undefined splice as nothing, the rest as JSON
fn append_template_value(acc: &mut String, value: &EvalValue) {
    let json = match value {
        EvalValue::Missing => return,
        EvalValue::Present(v) => v,
    };
    if json.is_null() || crate::value::is_undefined(json) {
        return;
    }
    match json {
        Value::String(s) => acc.push_str(s),
        other => acc.push_str(&other.to_string()),
    }
}
