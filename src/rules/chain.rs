//! Default rule-chain adapter
//!
//! Parses chains of the form `.name(arg, ...)` where each argument is a number,
//! a quoted string or a `/regex/flags` literal. A trailing string argument on
//! any rule overrides its error message.

use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use super::{FieldValidator, ValidatorAdapter};

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";
const URL_PATTERN: &str = r"^[a-zA-Z][a-zA-Z0-9+.-]*://[^\s/?#]+[^\s]*$";

/// Adapter for zod-style rule chains (`.min(5).email()`)
#[derive(Debug, Clone, Copy, Default)]
pub struct ChainAdapter;

impl ChainAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl ValidatorAdapter for ChainAdapter {
    fn compile(&self, chain: &str) -> Result<Arc<dyn FieldValidator>, String> {
        let calls = parse_chain(chain)?;
        let validator = ChainValidator::from_calls(calls)?;
        tracing::trace!(chain, checks = validator.checks.len(), "compiled rule chain");
        Ok(Arc::new(validator))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Arg {
    Number(f64),
    Text(String),
    Pattern(String),
}

#[derive(Debug, Clone, PartialEq)]
struct RuleCall {
    name: String,
    args: Vec<Arg>,
}

struct Parser<'a> {
    chars: Vec<char>,
    pos: usize,
    source: &'a str,
}

fn parse_chain(source: &str) -> Result<Vec<RuleCall>, String> {
    let mut parser = Parser {
        chars: source.chars().collect(),
        pos: 0,
        source,
    };
    let mut calls = Vec::new();
    loop {
        parser.skip_whitespace();
        if parser.at_end() {
            break;
        }
        parser.expect('.')?;
        let name = parser.identifier()?;
        parser.skip_whitespace();
        parser.expect('(')?;
        let args = parser.arguments()?;
        calls.push(RuleCall { name, args });
    }
    Ok(calls)
}

impl Parser<'_> {
    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn error(&self, message: &str) -> String {
        format!("{} at position {} in '{}'", message, self.pos, self.source)
    }

    fn expect(&mut self, expected: char) -> Result<(), String> {
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(self.error(&format!("expected '{}', found '{}'", expected, c))),
            None => Err(self.error(&format!("expected '{}', found end of input", expected))),
        }
    }

    fn identifier(&mut self) -> Result<String, String> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("expected rule name"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn arguments(&mut self) -> Result<Vec<Arg>, String> {
        let mut args = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(')') {
            self.pos += 1;
            return Ok(args);
        }
        loop {
            self.skip_whitespace();
            args.push(self.argument()?);
            self.skip_whitespace();
            match self.bump() {
                Some(',') => continue,
                Some(')') => return Ok(args),
                _ => return Err(self.error("expected ',' or ')'")),
            }
        }
    }

    fn argument(&mut self) -> Result<Arg, String> {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                self.quoted(quote).map(Arg::Text)
            }
            Some('/') => {
                self.pos += 1;
                self.pattern().map(Arg::Pattern)
            }
            Some(c) if c.is_ascii_digit() || c == '-' || c == '.' => self.number().map(Arg::Number),
            _ => Err(self.error("expected a number, string or /pattern/")),
        }
    }

    fn quoted(&mut self, quote: char) -> Result<String, String> {
        let mut text = String::new();
        loop {
            match self.bump() {
                Some('\\') => match self.bump() {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some(c) => text.push(c),
                    None => return Err(self.error("unterminated string")),
                },
                Some(c) if c == quote => return Ok(text),
                Some(c) => text.push(c),
                None => return Err(self.error("unterminated string")),
            }
        }
    }

    /// Body of a `/regex/flags` literal, with flags folded into an inline group
    fn pattern(&mut self) -> Result<String, String> {
        let mut body = String::new();
        loop {
            match self.bump() {
                Some('\\') => {
                    let escaped = self.bump().ok_or_else(|| self.error("unterminated pattern"))?;
                    if escaped != '/' {
                        body.push('\\');
                    }
                    body.push(escaped);
                }
                Some('/') => break,
                Some(c) => body.push(c),
                None => return Err(self.error("unterminated pattern")),
            }
        }

        let mut flags = String::new();
        while let Some(flag) = self.peek().filter(char::is_ascii_alphabetic) {
            match flag {
                'i' | 'm' | 's' => flags.push(flag),
                // Global and unicode flags have no effect on a single match
                'g' | 'u' => {}
                other => return Err(self.error(&format!("unsupported pattern flag '{}'", other))),
            }
            self.pos += 1;
        }

        if flags.is_empty() {
            Ok(body)
        } else {
            Ok(format!("(?{}){}", flags, body))
        }
    }

    fn number(&mut self) -> Result<f64, String> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E' | '_'))
        {
            self.pos += 1;
        }
        let literal: String = self.chars[start..self.pos].iter().filter(|c| **c != '_').collect();
        literal
            .parse::<f64>()
            .map_err(|_| self.error(&format!("invalid number '{}'", literal)))
    }
}

#[derive(Debug)]
enum Check {
    Min(f64),
    Max(f64),
    Length(f64),
    Email(Regex),
    Url(Regex),
    Uuid,
    Pattern(Regex),
    StartsWith(String),
    EndsWith(String),
    Includes(String),
    NonEmpty,
    Date,
}

/// Validator compiled from one rule chain
#[derive(Debug, Default)]
pub struct ChainValidator {
    checks: Vec<(Check, Option<String>)>,
    trim: bool,
    optional: bool,
    nonempty: bool,
}

impl ChainValidator {
    fn from_calls(calls: Vec<RuleCall>) -> Result<Self, String> {
        let mut validator = Self::default();
        for call in calls {
            let (args, message) = split_message(&call.name, call.args);
            let check = match (call.name.as_str(), args.as_slice()) {
                ("min", [Arg::Number(n)]) => Check::Min(*n),
                ("max", [Arg::Number(n)]) => Check::Max(*n),
                ("length", [Arg::Number(n)]) => Check::Length(*n),
                ("email", []) => Check::Email(compile_regex(EMAIL_PATTERN)?),
                ("url", []) => Check::Url(compile_regex(URL_PATTERN)?),
                ("uuid", []) => Check::Uuid,
                ("regex", [Arg::Pattern(p)]) | ("regex", [Arg::Text(p)]) => Check::Pattern(compile_regex(p)?),
                ("startsWith", [Arg::Text(s)]) => Check::StartsWith(s.clone()),
                ("endsWith", [Arg::Text(s)]) => Check::EndsWith(s.clone()),
                ("includes", [Arg::Text(s)]) => Check::Includes(s.clone()),
                ("date", []) => Check::Date,
                ("nonempty", []) => {
                    validator.nonempty = true;
                    Check::NonEmpty
                }
                ("trim", []) => {
                    validator.trim = true;
                    continue;
                }
                ("optional", []) => {
                    validator.optional = true;
                    continue;
                }
                (
                    "min" | "max" | "length" | "email" | "url" | "uuid" | "regex" | "startsWith" | "endsWith"
                    | "includes" | "date" | "nonempty" | "trim" | "optional",
                    _,
                ) => return Err(format!("invalid arguments for rule '{}'", call.name)),
                (name, _) => return Err(format!("unknown rule '{}'", name)),
            };
            validator.checks.push((check, message));
        }
        Ok(validator)
    }

    fn run(&self, check: &Check, value: &Value) -> Result<(), String> {
        let text = value.as_str().map(|s| if self.trim { s.trim() } else { s });
        match (check, value) {
            (Check::Min(n), Value::Number(v)) => at_least(v.as_f64(), *n, || format!("Must be at least {}", n)),
            (Check::Max(n), Value::Number(v)) => at_most(v.as_f64(), *n, || format!("Must be at most {}", n)),
            (Check::Min(n), Value::Array(items)) => {
                at_least(Some(items.len() as f64), *n, || format!("Must contain at least {} item(s)", n))
            }
            (Check::Max(n), Value::Array(items)) => {
                at_most(Some(items.len() as f64), *n, || format!("Must contain at most {} item(s)", n))
            }
            (Check::Length(n), Value::Array(items)) => {
                exactly(items.len() as f64, *n, || format!("Must contain exactly {} item(s)", n))
            }
            (Check::NonEmpty, Value::Array(items)) => {
                if items.is_empty() {
                    Err("Must not be empty".to_string())
                } else {
                    Ok(())
                }
            }
            (check, _) => match text {
                Some(text) => check_text(check, text),
                None => Err("Expected text".to_string()),
            },
        }
    }
}

fn check_text(check: &Check, text: &str) -> Result<(), String> {
    let len = text.chars().count() as f64;
    let ok = |pass: bool, message: &str| if pass { Ok(()) } else { Err(message.to_string()) };
    match check {
        Check::Min(n) => at_least(Some(len), *n, || format!("Must contain at least {} character(s)", n)),
        Check::Max(n) => at_most(Some(len), *n, || format!("Must contain at most {} character(s)", n)),
        Check::Length(n) => exactly(len, *n, || format!("Must contain exactly {} character(s)", n)),
        Check::Email(re) => ok(re.is_match(text), "Invalid email"),
        Check::Url(re) => ok(re.is_match(text), "Invalid url"),
        Check::Uuid => ok(Uuid::parse_str(text).is_ok(), "Invalid uuid"),
        Check::Pattern(re) => ok(re.is_match(text), "Invalid format"),
        Check::StartsWith(prefix) => ok(text.starts_with(prefix.as_str()), &format!("Must start with \"{}\"", prefix)),
        Check::EndsWith(suffix) => ok(text.ends_with(suffix.as_str()), &format!("Must end with \"{}\"", suffix)),
        Check::Includes(needle) => ok(text.contains(needle.as_str()), &format!("Must include \"{}\"", needle)),
        Check::NonEmpty => ok(!text.is_empty(), "Must not be empty"),
        Check::Date => ok(is_date(text), "Invalid date"),
    }
}

impl FieldValidator for ChainValidator {
    fn validate(&self, value: Option<&Value>) -> Result<(), Vec<String>> {
        let value = match value {
            None | Some(Value::Null) => {
                return if self.enforces_presence() {
                    Err(vec!["Required".to_string()])
                } else {
                    Ok(())
                };
            }
            Some(value) => value,
        };

        // Optional chains accept an empty string as "not filled in"
        if self.optional && value.as_str().is_some_and(|s| s.trim().is_empty()) {
            return Ok(());
        }

        let errors: Vec<String> = self
            .checks
            .iter()
            .filter_map(|(check, message)| {
                self.run(check, value)
                    .err()
                    .map(|default| message.clone().unwrap_or(default))
            })
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn enforces_presence(&self) -> bool {
        self.nonempty && !self.optional
    }
}

/// ISO-8601 calendar date or RFC 3339 timestamp
pub fn is_date(text: &str) -> bool {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok() || DateTime::parse_from_rfc3339(text).is_ok()
}

/// Separate a trailing message argument from the rule's own arguments
fn split_message(name: &str, mut args: Vec<Arg>) -> (Vec<Arg>, Option<String>) {
    let arity = match name {
        "min" | "max" | "length" | "regex" | "startsWith" | "endsWith" | "includes" => 1,
        _ => 0,
    };
    if args.len() > arity {
        if let Some(Arg::Text(message)) = args.last().cloned() {
            args.pop();
            return (args, Some(message));
        }
    }
    (args, None)
}

fn compile_regex(pattern: &str) -> Result<Regex, String> {
    Regex::new(pattern).map_err(|e| format!("invalid pattern '{}': {}", pattern, e))
}

fn at_least(actual: Option<f64>, min: f64, message: impl FnOnce() -> String) -> Result<(), String> {
    match actual {
        Some(v) if v >= min => Ok(()),
        _ => Err(message()),
    }
}

fn at_most(actual: Option<f64>, max: f64, message: impl FnOnce() -> String) -> Result<(), String> {
    match actual {
        Some(v) if v <= max => Ok(()),
        _ => Err(message()),
    }
}

fn exactly(actual: f64, expected: f64, message: impl FnOnce() -> String) -> Result<(), String> {
    if actual == expected {
        Ok(())
    } else {
        Err(message())
    }
}
