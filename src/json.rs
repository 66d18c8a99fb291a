use std::str::FromStr;

use serde::Serialize;
use serde_json::{ser::PrettyFormatter, Serializer, Value};
use thiserror::Error;

/// Indent widths offered by the formatter
pub const INDENT_CHOICES: [usize; 3] = [2, 4, 8];

#[derive(Debug, Error)]
pub enum JsonError {
    #[error("input is empty")]
    EmptyInput,
    #[error("{0}")]
    Parse(#[from] serde_json::Error),
    #[error("unsupported indent width: {0}")]
    Indent(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonAction {
    #[default]
    Format,
    Compress,
    Validate,
    Unescape,
}

impl FromStr for JsonAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "format" => Ok(JsonAction::Format),
            "compress" | "minify" => Ok(JsonAction::Compress),
            "validate" => Ok(JsonAction::Validate),
            "unescape" => Ok(JsonAction::Unescape),
            _ => Err(format!("unknown action: {s}")),
        }
    }
}

fn parse(input: &str) -> Result<Value, JsonError> {
    if input.trim().is_empty() {
        return Err(JsonError::EmptyInput);
    }

    Ok(serde_json::from_str(input)?)
}

/// Pretty-prints `input` with `indent` spaces per level. Key order is kept.
pub fn format(input: &str, indent: usize) -> Result<String, JsonError> {
    if !INDENT_CHOICES.contains(&indent) {
        return Err(JsonError::Indent(indent));
    }
    let value = parse(input)?;
    let spaces = " ".repeat(indent);
    let mut out = Vec::new();
    let mut ser =
        Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(spaces.as_bytes()));
    value.serialize(&mut ser)?;

    // serde_json only ever writes valid UTF-8
    Ok(String::from_utf8_lossy(&out).into_owned())
}

pub fn compress(input: &str) -> Result<String, JsonError> {
    Ok(serde_json::to_string(&parse(input)?)?)
}

pub fn validate(input: &str) -> Result<(), JsonError> {
    parse(input).map(|_| ())
}

/// Strips one pair of surrounding quotes, then undoes common escapes.
///
/// Replacements run one after another over the whole text, so `\\n`
/// ends up as a newline rather than a backslash followed by `n`.
pub fn unescape(input: &str) -> Result<String, JsonError> {
    if input.trim().is_empty() {
        return Err(JsonError::EmptyInput);
    }
    let inner = if input.len() >= 2 && input.starts_with('"') && input.ends_with('"') {
        &input[1..input.len() - 1]
    } else {
        input
    };

    Ok(inner
        .replace("\\\"", "\"")
        .replace("\\\\", "\\")
        .replace("\\n", "\n")
        .replace("\\r", "\r")
        .replace("\\t", "\t")
        .replace("\\b", "\u{8}")
        .replace("\\f", "\u{c}"))
}

// tests
#[test]
fn test_format_indent() {
    let input = r#"{"b":1,"a":[true,null]}"#;
    assert_eq!(
        format(input, 2).unwrap(),
        "{\n  \"b\": 1,\n  \"a\": [\n    true,\n    null\n  ]\n}"
    );
    assert_eq!(format(r#"{"k":"v"}"#, 4).unwrap(), "{\n    \"k\": \"v\"\n}");
    assert_eq!(format(r#"{"k":"v"}"#, 8).unwrap(), "{\n        \"k\": \"v\"\n}");
    assert!(matches!(format(input, 3), Err(JsonError::Indent(3))));
}

#[test]
fn test_compress() {
    let input = "{\n  \"z\": 1,\n  \"y\": \"中文\"\n}";
    assert_eq!(compress(input).unwrap(), r#"{"z":1,"y":"中文"}"#);
}

#[test]
fn test_empty_and_invalid() {
    assert!(matches!(format("  ", 2), Err(JsonError::EmptyInput)));
    assert!(matches!(compress(""), Err(JsonError::EmptyInput)));
    assert!(matches!(validate("{"), Err(JsonError::Parse(_))));
    assert!(validate("[1, 2, 3]").is_ok());
    let err = format("{\"a\":}", 2).unwrap_err();
    assert!(err.to_string().contains("line 1"));
}

#[test]
fn test_unescape() {
    assert_eq!(
        unescape(r#""{\"name\":\"toolset\"}""#).unwrap(),
        r#"{"name":"toolset"}"#
    );
    assert_eq!(unescape(r"a\tb\nc").unwrap(), "a\tb\nc");
    assert_eq!(unescape(r"C:\\path").unwrap(), r"C:\path");
    assert_eq!(unescape("\"").unwrap(), "\"");
    assert!(matches!(unescape(""), Err(JsonError::EmptyInput)));
}

#[test]
fn test_action_parse() {
    assert_eq!("minify".parse::<JsonAction>().unwrap(), JsonAction::Compress);
    assert_eq!("unescape".parse::<JsonAction>().unwrap(), JsonAction::Unescape);
    assert!("pretty".parse::<JsonAction>().is_err());
}
