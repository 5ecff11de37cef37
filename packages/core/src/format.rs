//! Formatter templates.
//!
//! A template such as `{level}\t{target}:{line}\t{message}` is compiled
//! once when a configuration is installed and rendered for every record.

use std::fmt::Write as _;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};

use crate::configuration::{FormatterSpec, DEFAULT_DATE_FORMAT};
use crate::error::{LogConfigError, LogConfigResult};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Level,
    Timestamp,
    Target,
    Line,
    Module,
    Message,
}

/// Everything a formatter can reference about one log record.
#[derive(Debug, Clone)]
pub struct Record<'a> {
    pub level: &'a str,
    pub target: &'a str,
    pub module: Option<&'a str>,
    pub line: Option<u32>,
    pub message: &'a str,
    pub timestamp: DateTime<Utc>,
}

/// A compiled formatter.
#[derive(Debug, Clone)]
pub struct Template {
    segments: Vec<Segment>,
    datefmt: String,
}

impl Template {
    /// Compile `spec`; `name` is only used in error messages.
    pub fn compile(name: &str, spec: &FormatterSpec) -> LogConfigResult<Self> {
        let datefmt = spec
            .datefmt
            .clone()
            .unwrap_or_else(|| DEFAULT_DATE_FORMAT.to_string());

        if StrftimeItems::new(&datefmt).any(|item| matches!(item, Item::Error)) {
            return Err(LogConfigError::invalid_format(
                name,
                format!("unsupported date format `{}`", datefmt),
            ));
        }

        Ok(Self {
            segments: parse_segments(name, &spec.format)?,
            datefmt,
        })
    }

    pub fn render(&self, record: &Record<'_>) -> String {
        let mut out = String::with_capacity(64 + record.message.len());

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Level => out.push_str(record.level),
                Segment::Timestamp => {
                    let _ = write!(out, "{}", record.timestamp.format(&self.datefmt));
                }
                Segment::Target => out.push_str(record.target),
                Segment::Line => match record.line {
                    Some(line) => {
                        let _ = write!(out, "{}", line);
                    }
                    None => out.push('?'),
                },
                Segment::Module => out.push_str(record.module.unwrap_or(record.target)),
                Segment::Message => out.push_str(record.message),
            }
        }

        out
    }
}

fn parse_segments(name: &str, format: &str) -> LogConfigResult<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = format.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                literal.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                literal.push('}');
            }
            '{' => {
                let mut placeholder = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(ch) => placeholder.push(ch),
                        None => {
                            return Err(LogConfigError::invalid_format(
                                name,
                                "unterminated `{` in format",
                            ))
                        }
                    }
                }

                let segment = match placeholder.as_str() {
                    "level" => Segment::Level,
                    "timestamp" => Segment::Timestamp,
                    "target" => Segment::Target,
                    "line" => Segment::Line,
                    "module" => Segment::Module,
                    "message" => Segment::Message,
                    other => {
                        return Err(LogConfigError::invalid_format(
                            name,
                            format!("unknown placeholder `{{{}}}`", other),
                        ))
                    }
                };

                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(segment);
            }
            '}' => {
                return Err(LogConfigError::invalid_format(
                    name,
                    "unmatched `}` in format",
                ))
            }
            other => literal.push(other),
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }

    Ok(segments)
}
