// Expression lexer and evaluating recursive-descent parser.
//
// Expressions are evaluated while being parsed, which makes short-circuiting
// a parsing concern: the not-taken side of `?:`, `||`, `&&` and `??` must
// still consume its tokens to keep the parser aligned, but must not run
// tools. The `tools_enabled` flag carries that state; it is saved and
// restored around every discarded sub-parse, on error paths included.
//
// Grammar, lowest to highest precedence:
//
//   expr       = ternary
//   ternary    = or ( '?' expr ':' expr )?
//   or         = and ( '||' and )*
//   and        = nullish ( '&&' nullish )*
//   nullish    = equality ( '??' equality )?
//   equality   = relational ( ('=='|'!=') relational )*
//   relational = unary ( ('<'|'>'|'<='|'>=') unary )*
//   unary      = '!' unary | pipeline
//   pipeline   = primary ( '|' '#' tool )*
//   primary    = '.' | '(' expr ')' | literal | path

use serde_json::{json, Map, Value};

use crate::engine::{to_json_at, EvalContext};
use crate::error::JzError;
use crate::normalize::{is_identifier_part, is_identifier_start};
use crate::registry::{option_bool, option_str, ToolFailure};
use crate::value::{
    compare_values, eq_values, is_empty_value, merge_patch, undefined, CmpOp, EvalValue,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Eof,
    Identifier,
    Number,
    Str,
    True,
    False,
    Null,
    Undefined,
    Question,
    Colon,
    Dot,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Pipe,
    Hash,
    Not,
    Assign,
    Or,
    And,
    Nullish,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

#[derive(Debug, Clone)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,
    pub(crate) text: String,
    pub(crate) line: usize,
    pub(crate) col: usize,
}

/// Tokenizer over the expression text. Keeps its own 1-based position
/// because the parser needs raw character access for tool context blocks.
struct Lexer {
    chars: Vec<char>,
    i: usize,
    line: usize,
    col: usize,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Lexer {
            chars: source.chars().collect(),
            i: 0,
            line: 1,
            col: 1,
        }
    }

    fn peek(&self, lookahead: usize) -> Option<char> {
        self.chars.get(self.i + lookahead).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek(0) {
            match c {
                ' ' | '\t' | '\r' | '\u{000C}' | '\u{000B}' => {
                    self.i += 1;
                    self.col += 1;
                }
                '\n' => {
                    self.i += 1;
                    self.line += 1;
                    self.col = 1;
                }
                _ => break,
            }
        }
    }

    fn token(kind: TokenKind, text: impl Into<String>, line: usize, col: usize) -> Token {
        Token {
            kind,
            text: text.into(),
            line,
            col,
        }
    }

    fn two_char(&mut self, kind: TokenKind, text: &str) -> Token {
        let tok = Self::token(kind, text, self.line, self.col);
        self.i += 2;
        self.col += 2;
        tok
    }

    fn one_char(&mut self, kind: TokenKind) -> Token {
        let tok = Self::token(kind, "", self.line, self.col);
        self.i += 1;
        self.col += 1;
        tok
    }

    fn next_token(&mut self) -> Result<Token, JzError> {
        self.skip_whitespace();

        let c = match self.peek(0) {
            None => return Ok(Self::token(TokenKind::Eof, "", self.line, self.col)),
            Some(c) => c,
        };

        match (c, self.peek(1)) {
            ('?', Some('?')) => return Ok(self.two_char(TokenKind::Nullish, "??")),
            ('|', Some('|')) => return Ok(self.two_char(TokenKind::Or, "||")),
            ('&', Some('&')) => return Ok(self.two_char(TokenKind::And, "&&")),
            ('=', Some('=')) => return Ok(self.two_char(TokenKind::Eq, "==")),
            ('!', Some('=')) => return Ok(self.two_char(TokenKind::Ne, "!=")),
            ('>', Some('=')) => return Ok(self.two_char(TokenKind::Ge, ">=")),
            ('<', Some('=')) => return Ok(self.two_char(TokenKind::Le, "<=")),
            _ => {}
        }

        match c {
            '?' => return Ok(self.one_char(TokenKind::Question)),
            ':' => return Ok(self.one_char(TokenKind::Colon)),
            '.' => return Ok(self.one_char(TokenKind::Dot)),
            '(' => return Ok(self.one_char(TokenKind::LParen)),
            ')' => return Ok(self.one_char(TokenKind::RParen)),
            '[' => return Ok(self.one_char(TokenKind::LBracket)),
            ']' => return Ok(self.one_char(TokenKind::RBracket)),
            '{' => return Ok(self.one_char(TokenKind::LBrace)),
            '}' => return Ok(self.one_char(TokenKind::RBrace)),
            ',' => return Ok(self.one_char(TokenKind::Comma)),
            '|' => return Ok(self.one_char(TokenKind::Pipe)),
            '#' => return Ok(self.one_char(TokenKind::Hash)),
            '!' => return Ok(self.one_char(TokenKind::Not)),
            '>' => return Ok(self.one_char(TokenKind::Gt)),
            '<' => return Ok(self.one_char(TokenKind::Lt)),
            '=' => return Ok(self.one_char(TokenKind::Assign)),
            _ => {}
        }

        if c == '"' || c == '\'' {
            return self.read_string(c);
        }

        let next_is_digit = self.peek(1).map_or(false, |n| n.is_ascii_digit());
        if c.is_ascii_digit() || (c == '-' && next_is_digit) {
            return Ok(self.read_number());
        }

        if is_identifier_start(c) {
            return Ok(self.read_identifier());
        }

        Err(JzError::UnexpectedChar {
            ch: c,
            line: self.line,
            column: self.col,
        })
    }

    fn read_string(&mut self, delim: char) -> Result<Token, JzError> {
        let (start_line, start_col) = (self.line, self.col);
        self.i += 1;
        self.col += 1;

        let mut acc = String::new();
        let mut escaped = false;
        while let Some(c) = self.peek(0) {
            self.i += 1;
            if c == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }

            if escaped {
                match c {
                    '"' => acc.push('"'),
                    '\\' => acc.push('\\'),
                    '/' => acc.push('/'),
                    'b' => acc.push('\u{0008}'),
                    'f' => acc.push('\u{000C}'),
                    'n' => acc.push('\n'),
                    'r' => acc.push('\r'),
                    't' => acc.push('\t'),
                    'u' => {
                        // keep \uXXXX verbatim for the final JSON parse
                        acc.push('\\');
                        acc.push('u');
                        for _ in 0..4 {
                            match self.peek(0) {
                                Some(h) => {
                                    acc.push(h);
                                    self.i += 1;
                                    self.col += 1;
                                }
                                None => break,
                            }
                        }
                    }
                    other => acc.push(other),
                }
                escaped = false;
                continue;
            }
            if c == '\\' {
                escaped = true;
                continue;
            }
            if c == delim {
                return Ok(Self::token(TokenKind::Str, acc, start_line, start_col));
            }
            acc.push(c);
        }

        Err(JzError::UnterminatedString {
            line: start_line,
            column: start_col,
        })
    }

    fn read_number(&mut self) -> Token {
        let start = self.i;
        let (start_line, start_col) = (self.line, self.col);

        // optional leading '-' or first digit
        self.i += 1;
        self.col += 1;
        self.bump_digits();

        if self.peek(0) == Some('.') {
            self.i += 1;
            self.col += 1;
            self.bump_digits();
        }
        if matches!(self.peek(0), Some('e') | Some('E')) {
            self.i += 1;
            self.col += 1;
            if matches!(self.peek(0), Some('+') | Some('-')) {
                self.i += 1;
                self.col += 1;
            }
            self.bump_digits();
        }

        let text: String = self.chars[start..self.i].iter().collect();
        Self::token(TokenKind::Number, text, start_line, start_col)
    }

    fn bump_digits(&mut self) {
        while self.peek(0).map_or(false, |c| c.is_ascii_digit()) {
            self.i += 1;
            self.col += 1;
        }
    }

    fn read_identifier(&mut self) -> Token {
        let start = self.i;
        let (start_line, start_col) = (self.line, self.col);

        self.i += 1;
        self.col += 1;
        while self.peek(0).map_or(false, is_identifier_part) {
            self.i += 1;
            self.col += 1;
        }

        let text: String = self.chars[start..self.i].iter().collect();
        let kind = match text.as_str() {
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            "undefined" => TokenKind::Undefined,
            _ => TokenKind::Identifier,
        };
        Self::token(kind, text, start_line, start_col)
    }
}

/// Evaluate an expression against `data`.
pub(crate) fn evaluate_expression(
    expr: &str,
    data: &Value,
    ctx: &mut EvalContext<'_>,
    depth: usize,
) -> Result<EvalValue, JzError> {
    let mut parser = Parser::new(expr, data, ctx, depth)?;
    parser.parse_expr()
}

struct Parser<'p, 'c> {
    lexer: Lexer,
    cur: Token,
    data: &'p Value,
    ctx: &'p mut EvalContext<'c>,
    depth: usize,
    tools_enabled: bool,
}

impl<'p, 'c> Parser<'p, 'c> {
    fn new(
        expr: &str,
        data: &'p Value,
        ctx: &'p mut EvalContext<'c>,
        depth: usize,
    ) -> Result<Self, JzError> {
        let mut lexer = Lexer::new(expr);
        let cur = lexer.next_token()?;
        Ok(Parser {
            lexer,
            cur,
            data,
            ctx,
            depth,
            tools_enabled: true,
        })
    }

    fn advance(&mut self) -> Result<(), JzError> {
        self.cur = self.lexer.next_token()?;
        Ok(())
    }

    fn consume(&mut self, kind: TokenKind, what: &str) -> Result<(), JzError> {
        if self.cur.kind != kind {
            return Err(self.unexpected(what));
        }
        self.advance()
    }

    fn unexpected(&self, expected: &str) -> JzError {
        JzError::UnexpectedToken {
            expected: expected.to_string(),
            line: self.cur.line,
            column: self.cur.col,
        }
    }

    /// Parse-and-discard: consume the same tokens but keep tools gated off.
    /// The flag is restored before returning, whether `f` succeeded or not.
    fn parse_discarded<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, JzError>,
    ) -> Result<T, JzError> {
        let prev = self.tools_enabled;
        self.tools_enabled = false;
        let result = f(self);
        self.tools_enabled = prev;
        result
    }

    fn parse_expr(&mut self) -> Result<EvalValue, JzError> {
        self.parse_ternary()
    }

    // only the selected branch is evaluated; the other is parsed gated
    fn parse_ternary(&mut self) -> Result<EvalValue, JzError> {
        let cond = self.parse_or()?;
        if self.cur.kind != TokenKind::Question {
            return Ok(cond);
        }
        self.advance()?;
        if cond.is_truthy() {
            let then_value = self.parse_expr()?;
            self.consume(TokenKind::Colon, "':'")?;
            self.parse_discarded(|p| p.parse_expr())?;
            Ok(then_value)
        } else {
            self.parse_discarded(|p| p.parse_expr())?;
            self.consume(TokenKind::Colon, "':'")?;
            self.parse_expr()
        }
    }

    fn parse_or(&mut self) -> Result<EvalValue, JzError> {
        let mut left = self.parse_and()?;
        while self.cur.kind == TokenKind::Or {
            self.advance()?;
            if left.is_truthy() {
                self.parse_discarded(|p| p.parse_and())?;
            } else {
                left = self.parse_and()?;
            }
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<EvalValue, JzError> {
        let mut left = self.parse_nullish()?;
        while self.cur.kind == TokenKind::And {
            self.advance()?;
            if left.is_truthy() {
                left = self.parse_nullish()?;
            } else {
                self.parse_discarded(|p| p.parse_nullish())?;
            }
        }
        Ok(left)
    }

    fn parse_nullish(&mut self) -> Result<EvalValue, JzError> {
        let left = self.parse_equality()?;
        if self.cur.kind != TokenKind::Nullish {
            return Ok(left);
        }
        self.advance()?;
        if left.is_nullish() {
            self.parse_equality()
        } else {
            self.parse_discarded(|p| p.parse_equality())?;
            Ok(left)
        }
    }

    fn parse_equality(&mut self) -> Result<EvalValue, JzError> {
        let mut left = self.parse_relational()?;
        while matches!(self.cur.kind, TokenKind::Eq | TokenKind::Ne) {
            let negate = self.cur.kind == TokenKind::Ne;
            self.advance()?;
            let right = self.parse_relational()?;
            let equal = eq_values(&left, &right);
            left = EvalValue::Present(Value::Bool(equal != negate));
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<EvalValue, JzError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.cur.kind {
                TokenKind::Lt => CmpOp::Lt,
                TokenKind::Gt => CmpOp::Gt,
                TokenKind::Le => CmpOp::Le,
                TokenKind::Ge => CmpOp::Ge,
                _ => return Ok(left),
            };
            self.advance()?;
            let right = self.parse_unary()?;
            // non-comparable operands read as false
            let result = compare_values(&left, &right, op).unwrap_or(false);
            left = EvalValue::Present(Value::Bool(result));
        }
    }

    fn parse_unary(&mut self) -> Result<EvalValue, JzError> {
        if self.cur.kind == TokenKind::Not {
            self.advance()?;
            let value = self.parse_unary()?;
            return Ok(EvalValue::Present(Value::Bool(!value.is_truthy())));
        }
        self.parse_pipeline()
    }

    fn parse_pipeline(&mut self) -> Result<EvalValue, JzError> {
        let mut left = self.parse_primary()?;
        while self.cur.kind == TokenKind::Pipe {
            self.advance()?;
            self.consume(TokenKind::Hash, "'#' before tool name in pipeline")?;

            let tool_name = match self.cur.kind {
                TokenKind::Identifier => {
                    let name = self.cur.text.clone();
                    self.advance()?;
                    name
                }
                // '#{...}' and '#(...)': anonymous tool
                TokenKind::LBrace | TokenKind::LParen => String::new(),
                _ => return Err(self.unexpected("tool identifier or '{' after '#'")),
            };

            let options = self.parse_tool_options()?;

            // the block's syntax is always consumed to keep the parser
            // aligned; it is only evaluated when the tool will actually run
            let mut raw_block = String::new();
            if self.cur.kind == TokenKind::LBrace {
                raw_block = self.extract_brace_block()?;
            }

            if left.is_undefined() {
                // undefined flows through the pipe without touching the tool
            } else if self.tools_enabled {
                let ctx_value = if raw_block.is_empty() {
                    Value::Object(Map::new())
                } else {
                    self.preparse_context(&tool_name, &options, &left, &raw_block)
                        .map_err(|err| match err {
                            limit @ JzError::RecursionLimit { .. } => limit,
                            other => JzError::Tool {
                                name: tool_name.clone(),
                                message: format!("error parsing context: {other}"),
                                line: self.cur.line,
                                column: self.cur.col,
                            },
                        })?
                };
                let output = self
                    .dispatch_tool(&tool_name, &options, &left, &ctx_value, &raw_block)
                    .map_err(|err| match err {
                        wrapped @ (JzError::Tool { .. }
                        | JzError::UnknownTool { .. }
                        | JzError::RecursionLimit { .. }) => wrapped,
                        other => JzError::Tool {
                            name: tool_name.clone(),
                            message: other.to_string(),
                            line: self.cur.line,
                            column: self.cur.col,
                        },
                    })?;
                left = EvalValue::Present(output);
            }
            // tools gated off: syntax was consumed, value unchanged
        }
        Ok(left)
    }

    fn parse_tool_options(&mut self) -> Result<Value, JzError> {
        let mut options = Map::new();
        if self.cur.kind != TokenKind::LParen {
            return Ok(Value::Object(options));
        }
        self.advance()?;
        while self.cur.kind != TokenKind::RParen {
            if self.cur.kind != TokenKind::Identifier {
                return Err(self.unexpected("option name in tool options"));
            }
            let name = self.cur.text.clone();
            self.advance()?;
            self.consume(TokenKind::Assign, "'=' in tool option")?;
            let value = self.parse_expr()?;
            options.insert(name, value.into_json());
            if self.cur.kind == TokenKind::Comma {
                self.advance()?;
            } else {
                break;
            }
        }
        self.consume(TokenKind::RParen, "')'")?;
        Ok(Value::Object(options))
    }

    /// Extract the raw text of a `{ … }` tool context block directly from
    /// the source, honoring nested braces and string literals, then realign
    /// the lexer past the closing brace. Blocks not starting with a
    /// container open get wrapped in braces so they parse as an object.
    fn extract_brace_block(&mut self) -> Result<String, JzError> {
        let start = self.lexer.i;
        let end = self.find_matching_brace(start)?;
        let block: String = self.lexer.chars[start..end].iter().collect();

        self.lexer.i = end + 1;
        for c in block.chars() {
            if c == '\n' {
                self.lexer.line += 1;
                self.lexer.col = 1;
            } else {
                self.lexer.col += 1;
            }
        }
        self.lexer.col += 1; // closing '}'
        self.advance()?;

        let trimmed = block.trim_start();
        if trimmed.starts_with('[') || trimmed.starts_with('{') {
            Ok(trimmed.to_string())
        } else {
            Ok(format!("{{{trimmed}}}"))
        }
    }

    fn find_matching_brace(&self, start: usize) -> Result<usize, JzError> {
        let chars = &self.lexer.chars;
        let mut pos = start;
        let mut depth = 1usize;
        let mut in_string = false;
        let mut delim = '\0';
        let mut escaped = false;

        while pos < chars.len() {
            let c = chars[pos];
            pos += 1;
            if in_string {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
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
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(pos - 1);
                    }
                }
                _ => {}
            }
        }
        Err(self.unexpected("'}' closing tool context block"))
    }

    /// Evaluate the context block before dispatch. Modifier tools (and the
    /// anonymous `$`) see the global data with the piped input merged in;
    /// plain named tools see the global data as-is; the plain anonymous
    /// tool gets no pre-parsed context at all.
    fn preparse_context(
        &mut self,
        name: &str,
        options: &Value,
        left: &EvalValue,
        raw_block: &str,
    ) -> Result<Value, JzError> {
        let empty = Value::Object(Map::new());

        if name.starts_with('$') {
            let input = left.as_json().clone();
            if input.is_null() {
                return Ok(empty);
            }
            if let Some(key) = option_str(options, "$key") {
                let key = key.to_string();
                let mut scoped = object_or_empty(self.data);
                scoped.insert(key, input);
                return self.reenter(raw_block, &Value::Object(scoped));
            }
            if input.is_array() {
                // arrays merge only through $key
                return Ok(empty);
            }
            if input.is_object() && !is_empty_value(&input) {
                let mut scoped = self.data.clone();
                merge_patch(&mut scoped, &input);
                return self.reenter(raw_block, &scoped);
            }
            let data = self.data.clone();
            return self.reenter(raw_block, &data);
        }

        if !name.is_empty() {
            let data = self.data.clone();
            return self.reenter(raw_block, &data);
        }

        Ok(empty)
    }

    fn dispatch_tool(
        &mut self,
        name: &str,
        options: &Value,
        left: &EvalValue,
        ctx_value: &Value,
        raw_block: &str,
    ) -> Result<Value, JzError> {
        let input = left.as_json().clone();

        if name == "$" {
            // anonymous with global context: loop over array input,
            // re-running the block with each item merged into the data
            let looping = option_bool(options, "$loop", true);
            if let (true, Value::Array(items)) = (looping, &input) {
                let key = option_str(options, "$key").map(str::to_string);
                let index_key = option_str(options, "$index").map(str::to_string);
                let mut output = Vec::with_capacity(items.len());
                for (idx, item) in items.iter().enumerate() {
                    let mut scoped = object_or_empty(self.data);
                    if let Some(index_key) = &index_key {
                        scoped.insert(index_key.clone(), json!(idx));
                    }
                    let mut scoped = Value::Object(scoped);
                    match &key {
                        Some(key) => scoped[key.as_str()] = item.clone(),
                        None => merge_patch(&mut scoped, item),
                    }
                    output.push(self.reenter(raw_block, &scoped)?);
                }
                return Ok(Value::Array(output));
            }
            return Ok(ctx_value.clone());
        }

        if name.is_empty() {
            // anonymous without global context
            let looping = option_bool(options, "loop", true);
            if let (true, Value::Array(items)) = (looping, &input) {
                let key = option_str(options, "key").map(str::to_string);
                let index_key = option_str(options, "index").map(str::to_string);
                let mut output = Vec::with_capacity(items.len());
                for (idx, item) in items.iter().enumerate() {
                    if key.is_none() && index_key.is_none() {
                        output.push(self.reenter(raw_block, item)?);
                        continue;
                    }
                    let mut scoped = Value::Object(Map::new());
                    if let Some(index_key) = &index_key {
                        scoped[index_key.as_str()] = json!(idx);
                    }
                    match &key {
                        Some(key) => scoped[key.as_str()] = item.clone(),
                        None => merge_patch(&mut scoped, item),
                    }
                    output.push(self.reenter(raw_block, &scoped)?);
                }
                return Ok(Value::Array(output));
            }
            return self.reenter(raw_block, &input);
        }

        // registered tool; modifiers are looked up without their '$' prefix
        let lookup = name.strip_prefix('$').unwrap_or(name);
        let registry = self.ctx.registry;
        registry
            .invoke(lookup, &input, options, ctx_value, self.ctx.metadata)
            .map_err(|failure| match failure {
                ToolFailure::UnknownTool(tool) => JzError::UnknownTool {
                    name: tool,
                    line: self.cur.line,
                    column: self.cur.col,
                },
                other => JzError::Tool {
                    name: name.to_string(),
                    message: other.to_string(),
                    line: self.cur.line,
                    column: self.cur.col,
                },
            })
    }

    /// Re-run the full engine over a tool context block.
    fn reenter(&mut self, template: &str, data: &Value) -> Result<Value, JzError> {
        to_json_at(template, data, self.ctx, self.depth + 1)
    }

    fn parse_primary(&mut self) -> Result<EvalValue, JzError> {
        match self.cur.kind {
            TokenKind::Dot => {
                // bare '.' is the whole input
                self.advance()?;
                Ok(EvalValue::Present(self.data.clone()))
            }
            TokenKind::LParen => {
                self.advance()?;
                let value = self.parse_expr()?;
                self.consume(TokenKind::RParen, "')'")?;
                Ok(value)
            }
            TokenKind::Str => {
                let text = self.cur.text.clone();
                self.advance()?;
                Ok(EvalValue::Present(Value::String(text)))
            }
            TokenKind::Number => {
                let text = self.cur.text.clone();
                self.advance()?;
                let value = if text.contains(['.', 'e', 'E']) {
                    text.parse::<f64>()
                        .map(|d| json!(d))
                        .unwrap_or_else(|_| Value::String(text))
                } else {
                    text.parse::<i64>()
                        .map(|i| json!(i))
                        .unwrap_or_else(|_| Value::String(text))
                };
                Ok(EvalValue::Present(value))
            }
            TokenKind::True => {
                self.advance()?;
                Ok(EvalValue::Present(Value::Bool(true)))
            }
            TokenKind::False => {
                self.advance()?;
                Ok(EvalValue::Present(Value::Bool(false)))
            }
            TokenKind::Null => {
                self.advance()?;
                Ok(EvalValue::Present(Value::Null))
            }
            TokenKind::Undefined => {
                self.advance()?;
                Ok(EvalValue::Present(undefined()))
            }
            TokenKind::Identifier => {
                let mut parts = vec![self.cur.text.clone()];
                self.advance()?;
                loop {
                    match self.cur.kind {
                        TokenKind::Dot => {
                            self.advance()?;
                            if self.cur.kind != TokenKind::Identifier {
                                return Err(JzError::InvalidPath {
                                    message: "expected identifier after '.'".to_string(),
                                    line: self.cur.line,
                                    column: self.cur.col,
                                });
                            }
                            parts.push(self.cur.text.clone());
                            self.advance()?;
                        }
                        TokenKind::LBracket => {
                            self.advance()?;
                            match self.cur.kind {
                                TokenKind::Number | TokenKind::Str => {
                                    parts.push(self.cur.text.clone());
                                    self.advance()?;
                                }
                                _ => {
                                    return Err(JzError::InvalidPath {
                                        message: "expected number or string inside [...]"
                                            .to_string(),
                                        line: self.cur.line,
                                        column: self.cur.col,
                                    })
                                }
                            }
                            self.consume(TokenKind::RBracket, "']'")?;
                        }
                        _ => break,
                    }
                }
                Ok(self.resolve_path(&parts))
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    /// Walk `data` along the path. All-digit segments index arrays; objects
    /// use key lookup. Any miss is `Missing`. Landing on the undefined
    /// sentinel is a present value, not a miss.
    fn resolve_path(&self, parts: &[String]) -> EvalValue {
        let mut current = self.data;
        for part in parts {
            let is_index = !part.is_empty() && part.chars().all(|c| c.is_ascii_digit());
            match current {
                Value::Array(items) if is_index => {
                    let idx: usize = match part.parse() {
                        Ok(idx) => idx,
                        Err(_) => return EvalValue::Missing,
                    };
                    match items.get(idx) {
                        Some(item) => current = item,
                        None => return EvalValue::Missing,
                    }
                }
                Value::Object(entries) => match entries.get(part) {
                    Some(value) => current = value,
                    None => return EvalValue::Missing,
                },
                _ => return EvalValue::Missing,
            }
        }
        EvalValue::Present(current.clone())
    }
}

fn object_or_empty(data: &Value) -> Map<String, Value> {
    match data {
        Value::Object(entries) => entries.clone(),
        _ => Map::new(),
    }
}
