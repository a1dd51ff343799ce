//! Template expressions embedded in configuration strings
//!
//! Strings may contain `{{ expr }}` expressions and `{# comment #}` blocks.
//! Expressions are evaluated against a [`RenderContext`] only: names resolve
//! to context values, and the only callables are context functions.
//!
//! Supported expression syntax:
//! - literals: `'text'`, `"text"`, `42`, `1.5`, `true`, `false`, `none`, `[a, b]`
//! - names, attributes and indexing: `target.schema`, `target['schema']`, `xs[0]`
//! - calls and filters: `var('x', 1)`, `env_var('HOME') | as_text`
//! - operators: `~` (concatenation), `==`, `!=`, `not`, `and`, `or`, unary `-`

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value};
use std::iter::Peekable;
use std::str::Chars;

use crate::context::{ContextEntry, RenderContext};

/// Matches the opening of an expression, comment or statement block
static TAG_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{|\{#|\{%").unwrap());

/// Returns true if the string contains template syntax
pub fn has_template(source: &str) -> bool {
    source.contains("{{") || source.contains("{#") || source.contains("{%")
}

/// One tag found in a template string
#[derive(Debug, Clone, Copy, PartialEq)]
enum Tag<'a> {
    Expression(&'a str),
    Comment,
    Statement(&'a str),
}

/// Locate every tag in `source` as `(start, end, tag)` byte ranges
///
/// Expressions end at the first `}}` outside a string literal, so literals
/// may contain closing braces.
fn scan_tags(source: &str) -> Result<Vec<(usize, usize, Tag<'_>)>, String> {
    let mut tags = Vec::new();
    let mut pos = 0;

    while let Some(open) = TAG_OPEN.find_at(source, pos) {
        let body_start = open.end();
        let body_end = match open.as_str() {
            "{{" => expression_end(source, body_start),
            "{#" => source[body_start..].find("#}").map(|i| body_start + i),
            _ => source[body_start..].find("%}").map(|i| body_start + i),
        };
        let Some(body_end) = body_end else {
            return Err(format!("unclosed template tag in '{}'", source[open.start()..].trim()));
        };

        // every closer is two bytes
        let end = body_end + 2;
        let tag = match open.as_str() {
            "{{" => Tag::Expression(&source[body_start..body_end]),
            "{#" => Tag::Comment,
            _ => Tag::Statement(&source[open.start()..end]),
        };
        tags.push((open.start(), end, tag));
        pos = end;
    }

    Ok(tags)
}

/// Byte offset of the `}}` closing an expression that starts at `start`
fn expression_end(source: &str, start: usize) -> Option<usize> {
    let mut quote = None;
    let mut escaped = false;
    for (offset, c) in source[start..].char_indices() {
        let at = start + offset;
        match quote {
            Some(_) if escaped => escaped = false,
            Some(_) if c == '\\' => escaped = true,
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '\'' || c == '"' => quote = Some(c),
            None if source[at..].starts_with("}}") => return Some(at),
            None => {}
        }
    }
    None
}

/// Evaluate every tag in `source`
///
/// A string made of exactly one expression evaluates to the expression's own
/// value; anything else evaluates to the concatenated text.
pub fn render_template(source: &str, context: &RenderContext) -> Result<Value, String> {
    if !has_template(source) {
        return Ok(Value::String(source.to_string()));
    }

    let tags = scan_tags(source)?;

    if let [(0, end, Tag::Expression(expr))] = tags.as_slice() {
        if *end == source.len() {
            return evaluate(expr, context);
        }
    }

    let mut output = String::with_capacity(source.len());
    let mut last = 0;
    for (start, end, tag) in tags {
        output.push_str(&source[last..start]);
        last = end;

        match tag {
            Tag::Expression(expr) => output.push_str(&to_text(&evaluate(expr, context)?)),
            Tag::Comment => {}
            Tag::Statement(block) => {
                return Err(format!("statement blocks are not supported: '{}'", block))
            }
        }
    }
    output.push_str(&source[last..]);

    Ok(Value::String(output))
}

/// Text form of a value when it is interpolated into a string
pub fn to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Truthiness used by `not`, `and` and `or`
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Parse and evaluate a single expression
pub fn evaluate(source: &str, context: &RenderContext) -> Result<Value, String> {
    let expr = parse(source)?;
    expr.eval(context)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
    Dot,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Pipe,
    Tilde,
    Minus,
    EqEq,
    NotEq,
}

fn tokenize(source: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '\'' | '"' => tokens.push(Token::Str(string_literal(&mut chars)?)),
            c if c.is_ascii_digit() => tokens.push(number_literal(&mut chars)?),
            c if c.is_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        ident.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            '=' | '!' => {
                chars.next();
                if chars.next() != Some('=') {
                    return Err(format!("unexpected '{}' in expression", c));
                }
                tokens.push(if c == '=' { Token::EqEq } else { Token::NotEq });
            }
            _ => {
                chars.next();
                tokens.push(match c {
                    '.' => Token::Dot,
                    ',' => Token::Comma,
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    '[' => Token::LBracket,
                    ']' => Token::RBracket,
                    '|' => Token::Pipe,
                    '~' => Token::Tilde,
                    '-' => Token::Minus,
                    other => return Err(format!("unexpected '{}' in expression", other)),
                });
            }
        }
    }

    Ok(tokens)
}

fn string_literal(chars: &mut Peekable<Chars<'_>>) -> Result<String, String> {
    let quote = chars.next().unwrap_or('\'');
    let mut text = String::new();
    loop {
        match chars.next() {
            Some(c) if c == quote => return Ok(text),
            Some('\\') => match chars.next() {
                Some('n') => text.push('\n'),
                Some('t') => text.push('\t'),
                Some(other) => text.push(other),
                None => break,
            },
            Some(c) => text.push(c),
            None => break,
        }
    }
    Err("unterminated string literal".to_string())
}

fn number_literal(chars: &mut Peekable<Chars<'_>>) -> Result<Token, String> {
    let mut digits = String::new();
    let mut is_float = false;
    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() || c == '_' {
            digits.push(c);
        } else if c == '.' && !is_float {
            // `1.x` is attribute access, not a float
            let mut lookahead = chars.clone();
            lookahead.next();
            if !lookahead.peek().map(|d| d.is_ascii_digit()).unwrap_or(false) {
                break;
            }
            is_float = true;
            digits.push(c);
        } else {
            break;
        }
        chars.next();
    }

    let digits = digits.replace('_', "");
    if is_float {
        digits
            .parse()
            .map(Token::Float)
            .map_err(|_| format!("invalid number '{}'", digits))
    } else {
        digits
            .parse()
            .map(Token::Int)
            .map_err(|_| format!("invalid number '{}'", digits))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(Value),
    List(Vec<Expr>),
    Name(String),
    Attr(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
    Filter(Box<Expr>, String, Vec<Expr>),
    Neg(Box<Expr>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Eq(Box<Expr>, Box<Expr>),
    Ne(Box<Expr>, Box<Expr>),
    Concat(Box<Expr>, Box<Expr>),
}

fn parse(source: &str) -> Result<Expr, String> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err("empty expression".to_string());
    }
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.or()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(format!("unexpected {:?} in '{}'", token, source.trim())),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        match self.peek() {
            Some(Token::Ident(name)) if name == keyword => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn expect(&mut self, token: Token) -> Result<(), String> {
        if self.eat(&token) {
            Ok(())
        } else {
            Err(format!("expected {:?}, found {:?}", token, self.peek()))
        }
    }

    fn or(&mut self) -> Result<Expr, String> {
        let mut lhs = self.and()?;
        while self.eat_keyword("or") {
            lhs = Expr::Or(Box::new(lhs), Box::new(self.and()?));
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Expr, String> {
        let mut lhs = self.not()?;
        while self.eat_keyword("and") {
            lhs = Expr::And(Box::new(lhs), Box::new(self.not()?));
        }
        Ok(lhs)
    }

    fn not(&mut self) -> Result<Expr, String> {
        if self.eat_keyword("not") {
            return Ok(Expr::Not(Box::new(self.not()?)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, String> {
        let lhs = self.concat()?;
        if self.eat(&Token::EqEq) {
            return Ok(Expr::Eq(Box::new(lhs), Box::new(self.concat()?)));
        }
        if self.eat(&Token::NotEq) {
            return Ok(Expr::Ne(Box::new(lhs), Box::new(self.concat()?)));
        }
        Ok(lhs)
    }

    fn concat(&mut self) -> Result<Expr, String> {
        let mut lhs = self.filtered()?;
        while self.eat(&Token::Tilde) {
            lhs = Expr::Concat(Box::new(lhs), Box::new(self.filtered()?));
        }
        Ok(lhs)
    }

    fn filtered(&mut self) -> Result<Expr, String> {
        let mut value = self.unary()?;
        while self.eat(&Token::Pipe) {
            let name = match self.next() {
                Some(Token::Ident(name)) => name,
                other => return Err(format!("expected filter name, found {:?}", other)),
            };
            let args = if self.eat(&Token::LParen) {
                self.arguments(Token::RParen)?
            } else {
                Vec::new()
            };
            value = Expr::Filter(Box::new(value), name, args);
        }
        Ok(value)
    }

    fn unary(&mut self) -> Result<Expr, String> {
        if self.eat(&Token::Minus) {
            return Ok(Expr::Neg(Box::new(self.unary()?)));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, String> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(&Token::Dot) {
                match self.next() {
                    Some(Token::Ident(attr)) => expr = Expr::Attr(Box::new(expr), attr),
                    other => return Err(format!("expected attribute name, found {:?}", other)),
                }
            } else if self.eat(&Token::LBracket) {
                let index = self.or()?;
                self.expect(Token::RBracket)?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, String> {
        match self.next() {
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::String(s))),
            Some(Token::Int(i)) => Ok(Expr::Literal(Value::from(i))),
            Some(Token::Float(f)) => Ok(Expr::Literal(float(f)?)),
            Some(Token::LParen) => {
                let inner = self.or()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::LBracket) => Ok(Expr::List(self.arguments(Token::RBracket)?)),
            Some(Token::Ident(name)) => match name.as_str() {
                "true" | "True" => Ok(Expr::Literal(Value::Bool(true))),
                "false" | "False" => Ok(Expr::Literal(Value::Bool(false))),
                "none" | "None" => Ok(Expr::Literal(Value::Null)),
                _ if self.eat(&Token::LParen) => Ok(Expr::Call(name, self.arguments(Token::RParen)?)),
                _ => Ok(Expr::Name(name)),
            },
            other => Err(format!("unexpected {:?} in expression", other)),
        }
    }

    /// Comma-separated expressions up to and including `close`
    fn arguments(&mut self, close: Token) -> Result<Vec<Expr>, String> {
        let mut args = Vec::new();
        if self.eat(&close) {
            return Ok(args);
        }
        loop {
            args.push(self.or()?);
            if self.eat(&close) {
                return Ok(args);
            }
            self.expect(Token::Comma)?;
        }
    }
}

fn float(f: f64) -> Result<Value, String> {
    Number::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| format!("invalid number {}", f))
}

fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => lhs == rhs,
    }
}

fn call(context: &RenderContext, name: &str, args: &[Value]) -> Result<Value, String> {
    match context.get(name) {
        Some(ContextEntry::Function(f)) => f(args).map_err(|e| format!("{}(): {}", name, e)),
        Some(ContextEntry::Value(_)) => Err(format!("'{}' is not callable", name)),
        None => Err(format!("'{}' is undefined", name)),
    }
}

impl Expr {
    fn eval(&self, context: &RenderContext) -> Result<Value, String> {
        match self {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::List(items) => items
                .iter()
                .map(|item| item.eval(context))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Expr::Name(name) => match context.get(name) {
                Some(ContextEntry::Value(value)) => Ok(value.clone()),
                Some(ContextEntry::Function(_)) => {
                    Err(format!("'{}' is a function and must be called", name))
                }
                None => Err(format!("'{}' is undefined", name)),
            },
            Expr::Attr(base, attr) => {
                let base = base.eval(context)?;
                base.as_object()
                    .and_then(|map| map.get(attr))
                    .cloned()
                    .ok_or_else(|| format!("{} has no attribute '{}'", to_text(&base), attr))
            }
            Expr::Index(base, index) => {
                let base = base.eval(context)?;
                let index = index.eval(context)?;
                let found = match (&base, &index) {
                    (Value::Object(map), Value::String(key)) => map.get(key),
                    (Value::Array(items), Value::Number(n)) => {
                        let len = items.len() as i64;
                        n.as_i64()
                            .map(|i| if i < 0 { len + i } else { i })
                            .filter(|i| (0..len).contains(i))
                            .and_then(|i| items.get(i as usize))
                    }
                    _ => None,
                };
                found
                    .cloned()
                    .ok_or_else(|| format!("cannot index {} with {}", to_text(&base), index))
            }
            Expr::Call(name, args) => {
                let args = args
                    .iter()
                    .map(|arg| arg.eval(context))
                    .collect::<Result<Vec<_>, _>>()?;
                call(context, name, &args)
            }
            Expr::Filter(value, name, args) => {
                let mut all = vec![value.eval(context)?];
                for arg in args {
                    all.push(arg.eval(context)?);
                }
                call(context, name, &all)
            }
            Expr::Neg(inner) => match inner.eval(context)? {
                Value::Number(n) => match n.as_i64().and_then(i64::checked_neg) {
                    Some(negated) => Ok(Value::from(negated)),
                    None => float(-n.as_f64().unwrap_or(0.0)),
                },
                other => Err(format!("cannot negate {}", to_text(&other))),
            },
            Expr::Not(inner) => Ok(Value::Bool(!is_truthy(&inner.eval(context)?))),
            Expr::And(lhs, rhs) => {
                let lhs = lhs.eval(context)?;
                if is_truthy(&lhs) {
                    rhs.eval(context)
                } else {
                    Ok(lhs)
                }
            }
            Expr::Or(lhs, rhs) => {
                let lhs = lhs.eval(context)?;
                if is_truthy(&lhs) {
                    Ok(lhs)
                } else {
                    rhs.eval(context)
                }
            }
            Expr::Eq(lhs, rhs) => Ok(Value::Bool(values_equal(
                &lhs.eval(context)?,
                &rhs.eval(context)?,
            ))),
            Expr::Ne(lhs, rhs) => Ok(Value::Bool(!values_equal(
                &lhs.eval(context)?,
                &rhs.eval(context)?,
            ))),
            Expr::Concat(lhs, rhs) => Ok(Value::String(format!(
                "{}{}",
                to_text(&lhs.eval(context)?),
                to_text(&rhs.eval(context)?)
            ))),
        }
    }
}
