// JSON5-ish to JSON text normalization.
//
// Four stateless passes, each string-literal aware (double quotes, single
// quotes and backticks, with backslash escapes). Comments are stripped
// before template rewriting; the remaining passes run on the rewritten text,
// so by then backtick segments have already become plain JSON strings.

use crate::error::JzError;
use crate::scanner::Scanner;

pub(crate) fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

pub(crate) fn is_identifier_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn is_space_char(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\u{000C}' | '\u{000B}')
}

/// Strip `// …` and `/* … */` comments. Newlines inside comments are kept so
/// line numbers stay aligned for later error reporting.
pub(crate) fn strip_comments(source: &str) -> Result<String, JzError> {
    let mut sc = Scanner::new(source);
    let mut out = String::with_capacity(source.len());

    let mut in_line_comment = false;
    let mut in_block_comment = false;
    let mut in_string = false;
    let mut delim = '\0';
    let mut escape = false;

    while let Some(c) = sc.bump() {
        let next = sc.peek(0);

        if in_line_comment {
            if c == '\n' {
                in_line_comment = false;
                out.push(c);
            }
            continue;
        }

        if in_block_comment {
            if c == '\n' || c == '\r' {
                // CRLF collapses to a single newline; the '\n' half is
                // swallowed as comment content on the next iteration
                out.push('\n');
                continue;
            }
            if c == '*' && next == Some('/') {
                sc.advance(1);
                in_block_comment = false;
            }
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

        if c == '/' && next == Some('/') {
            in_line_comment = true;
            sc.advance(1);
            continue;
        }
        if c == '/' && next == Some('*') {
            in_block_comment = true;
            sc.advance(1);
            continue;
        }
        if c == '"' || c == '\'' || c == '`' {
            in_string = true;
            delim = c;
            out.push(c);
            continue;
        }

        out.push(c);
    }

    if in_block_comment {
        let (line, column) = sc.position_prev();
        return Err(JzError::UnterminatedBlockComment { line, column });
    }

    Ok(out)
}

/// Convert single-quoted string literals to valid JSON double-quoted ones.
/// Double-quoted strings pass through verbatim.
pub(crate) fn convert_single_quotes(source: &str) -> Result<String, JzError> {
    let mut sc = Scanner::new(source);
    let mut out = String::with_capacity(source.len());

    let mut in_string = false;
    let mut delim = '\0';
    let mut escape = false;

    while let Some(c) = sc.bump() {
        if !in_string {
            if c == '"' || c == '\'' {
                in_string = true;
                delim = c;
                out.push('"');
                escape = false;
                continue;
            }
            out.push(c);
            continue;
        }

        if delim == '"' {
            out.push(c);
            if escape {
                escape = false;
            } else if c == '\\' {
                escape = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        // inside a single-quoted literal
        if escape {
            match c {
                '\'' => out.push('\''),
                '"' => out.push_str("\\\""),
                '\\' => out.push_str("\\\\"),
                'n' => out.push_str("\\n"),
                'r' => out.push_str("\\r"),
                't' => out.push_str("\\t"),
                _ => {
                    out.push('\\');
                    out.push(c);
                }
            }
            escape = false;
            continue;
        }
        if c == '\\' {
            escape = true;
            continue;
        }
        if c == '\'' {
            out.push('"');
            in_string = false;
            continue;
        }
        if c == '"' {
            out.push_str("\\\"");
        } else {
            out.push(c);
        }
    }

    if in_string && delim == '\'' {
        let (line, column) = sc.position_prev();
        return Err(JzError::UnterminatedString { line, column });
    }

    Ok(out)
}

/// Wrap identifier-like object keys in double quotes. A container stack
/// tracks whether the next bare identifier sits in key position; whitespace
/// between the key and its ':' is preserved.
pub(crate) fn quote_bare_keys(source: &str) -> String {
    #[derive(PartialEq)]
    enum Ctx {
        Object,
        Array,
    }
    struct Frame {
        ctx: Ctx,
        expecting_key: bool,
    }

    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut stack: Vec<Frame> = Vec::new();

    let mut in_string = false;
    let mut delim = '\0';
    let mut escape = false;

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if in_string {
            out.push(c);
            if escape {
                escape = false;
            } else if c == '\\' {
                escape = true;
            } else if c == delim {
                in_string = false;
            }
            i += 1;
            continue;
        }

        match c {
            '"' | '\'' => {
                in_string = true;
                delim = c;
                out.push(c);
                i += 1;
                continue;
            }
            '{' => {
                out.push(c);
                stack.push(Frame {
                    ctx: Ctx::Object,
                    expecting_key: true,
                });
                i += 1;
                continue;
            }
            '[' => {
                out.push(c);
                stack.push(Frame {
                    ctx: Ctx::Array,
                    expecting_key: false,
                });
                i += 1;
                continue;
            }
            '}' | ']' => {
                out.push(c);
                stack.pop();
                i += 1;
                continue;
            }
            _ => {}
        }

        if let Some(frame) = stack.last_mut() {
            if frame.ctx == Ctx::Object {
                if frame.expecting_key {
                    if is_space_char(c) {
                        out.push(c);
                        i += 1;
                        continue;
                    }
                    if is_identifier_start(c) {
                        let mut j = i + 1;
                        while j < chars.len() && is_identifier_part(chars[j]) {
                            j += 1;
                        }
                        let mut k = j;
                        while k < chars.len() && is_space_char(chars[k]) {
                            k += 1;
                        }
                        if k < chars.len() && chars[k] == ':' {
                            out.push('"');
                            out.extend(&chars[i..j]);
                            out.push('"');
                            out.extend(&chars[j..k]);
                            out.push(':');
                            i = k + 1;
                            frame.expecting_key = false;
                            continue;
                        }
                    }
                    out.push(c);
                    i += 1;
                    continue;
                } else {
                    out.push(c);
                    if c == ',' {
                        frame.expecting_key = true;
                    }
                    i += 1;
                    continue;
                }
            }
        }

        out.push(c);
        i += 1;
    }

    out
}

/// Drop one comma sitting (across whitespace) directly before a `]` or `}`.
pub(crate) fn strip_trailing_commas(source: &str) -> String {
    let mut out = String::with_capacity(source.len());

    let mut in_string = false;
    let mut delim = '\0';
    let mut escape = false;

    for c in source.chars() {
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

        if c == ']' || c == '}' {
            let trimmed_len = out.trim_end_matches(is_space_char).len();
            if out[..trimmed_len].ends_with(',') {
                out.truncate(trimmed_len - 1);
            }
            out.push(c);
            continue;
        }

        out.push(c);
    }

    out
}

/// JSON5-ish to strict JSON: single quotes, bare keys, trailing commas.
/// Comment stripping is separate because it runs before template rewriting.
pub(crate) fn normalize_json5_to_json(source: &str) -> Result<String, JzError> {
    let converted = convert_single_quotes(source)?;
    Ok(strip_trailing_commas(&quote_bare_keys(&converted)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_line_comments_keep_newline() {
        let out = strip_comments("a // gone\nb").unwrap();
        assert_eq!(out, "a \nb");
    }

    #[test]
    fn test_strip_block_comments_keep_newlines() {
        let out = strip_comments("a /* x\ny */ b").unwrap();
        assert_eq!(out, "a \n b");
    }

    #[test]
    fn test_comments_inside_strings_survive() {
        let out = strip_comments(r#"{"a": "// not a comment"}"#).unwrap();
        assert_eq!(out, r#"{"a": "// not a comment"}"#);
        let out = strip_comments("`/* kept */`").unwrap();
        assert_eq!(out, "`/* kept */`");
    }

    #[test]
    fn test_unterminated_block_comment() {
        let err = strip_comments("x /* unclosed").unwrap_err();
        assert!(matches!(err, JzError::UnterminatedBlockComment { .. }));
    }

    #[test]
    fn test_convert_single_quotes() {
        assert_eq!(convert_single_quotes("'abc'").unwrap(), r#""abc""#);
        // embedded double quote gets escaped
        assert_eq!(
            convert_single_quotes(r#"'say "hi"'"#).unwrap(),
            r#""say \"hi\"""#
        );
        // escaped single quote becomes a plain apostrophe
        assert_eq!(convert_single_quotes(r"'it\'s'").unwrap(), r#""it's""#);
        // escapes normalize to their JSON forms
        assert_eq!(convert_single_quotes(r"'a\nb'").unwrap(), r#""a\nb""#);
        // double-quoted strings are untouched
        assert_eq!(
            convert_single_quotes(r#""keep 'this'""#).unwrap(),
            r#""keep 'this'""#
        );
    }

    #[test]
    fn test_unterminated_single_quote() {
        let err = convert_single_quotes("{ a: 'no end }").unwrap_err();
        assert!(matches!(err, JzError::UnterminatedString { .. }));
    }

    #[test]
    fn test_quote_bare_keys() {
        assert_eq!(quote_bare_keys("{a: 1}"), r#"{"a": 1}"#);
        assert_eq!(quote_bare_keys("{a: 1, b_2: 2}"), r#"{"a": 1, "b_2": 2}"#);
        // whitespace before the colon is preserved
        assert_eq!(quote_bare_keys("{key : 1}"), r#"{"key" : 1}"#);
        // quoted keys pass through
        assert_eq!(quote_bare_keys(r#"{"a": 1}"#), r#"{"a": 1}"#);
        // identifiers in value position are left alone
        assert_eq!(quote_bare_keys("{a: true}"), r#"{"a": true}"#);
        // nested containers
        assert_eq!(
            quote_bare_keys("{o: {x: 1}, arr: [1, 2]}"),
            r#"{"o": {"x": 1}, "arr": [1, 2]}"#
        );
    }

    #[test]
    fn test_strip_trailing_commas() {
        assert_eq!(strip_trailing_commas("[1, 2, ]"), "[1, 2]");
        assert_eq!(strip_trailing_commas(r#"{"a": 1,}"#), r#"{"a": 1}"#);
        assert_eq!(strip_trailing_commas("[1, 2,\n]"), "[1, 2]");
        // commas inside strings are untouched
        assert_eq!(strip_trailing_commas(r#"["a,", ]"#), r#"["a,"]"#);
    }

    #[test]
    fn test_normalize_composition() {
        let out = normalize_json5_to_json("{name: 'x', items: [1, 2,],}").unwrap();
        assert_eq!(out, r#"{"name": "x", "items": [1, 2]}"#);
    }
}
