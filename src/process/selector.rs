use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::fmt;

use crate::process::diagnostics::Issue;

/// `key`, `key[0]`, `key[0][2]`, or a bare `[0]`.
static SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^\[\]]*)((?:\[\d+\])*)$").expect("segment regex should compile"));
static INDEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(\d+)\]").expect("index regex should compile"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Key(String),
    Index(usize),
}

/// A parsed path into a JSON document, e.g. `personal_records[0].records`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    raw: String,
    steps: Vec<Step>,
}

impl Selector {
    pub fn parse(raw: &str) -> Result<Self, Issue> {
        let syntax = |reason: String| Issue::SelectorSyntax {
            selector: raw.to_string(),
            reason,
        };
        if raw.trim().is_empty() {
            return Err(syntax("empty selector".into()));
        }

        let mut steps = Vec::new();
        for (pos, segment) in raw.split('.').enumerate() {
            let caps = SEGMENT
                .captures(segment)
                .ok_or_else(|| syntax(format!("bad segment `{}` at position {}", segment, pos)))?;
            let key = &caps[1];
            let indices = &caps[2];
            if key.is_empty() && indices.is_empty() {
                return Err(syntax(format!("empty segment at position {}", pos)));
            }
            if !key.is_empty() {
                steps.push(Step::Key(key.to_string()));
            }
            for idx in INDEX.captures_iter(indices) {
                let n = idx[1]
                    .parse::<usize>()
                    .map_err(|e| syntax(format!("index `{}`: {}", &idx[1], e)))?;
                steps.push(Step::Index(n));
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            steps,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Walk `doc`. Missing keys, out-of-range indices, and wrong container
    /// types all come back as an `Issue`, never a panic.
    pub fn resolve<'a>(&self, doc: &'a Value) -> Result<&'a Value, Issue> {
        let mut current = doc;
        let mut at = String::new();

        for step in &self.steps {
            match step {
                Step::Key(key) => {
                    if !at.is_empty() {
                        at.push('.');
                    }
                    at.push_str(key);
                    current = match current {
                        Value::Object(map) => map.get(key).ok_or_else(|| self.missing(&at))?,
                        other => return Err(self.mismatch(&at, "object", other)),
                    };
                }
                Step::Index(idx) => {
                    at.push_str(&format!("[{}]", idx));
                    current = match current {
                        Value::Array(items) => items.get(*idx).ok_or_else(|| self.missing(&at))?,
                        other => return Err(self.mismatch(&at, "array", other)),
                    };
                }
            }
        }

        Ok(current)
    }

    fn missing(&self, at: &str) -> Issue {
        Issue::SelectorMissing {
            selector: self.raw.clone(),
            at: at.to_string(),
        }
    }

    fn mismatch(&self, at: &str, expected: &'static str, found: &Value) -> Issue {
        Issue::SelectorMismatch {
            selector: self.raw.clone(),
            at: at.to_string(),
            expected,
            found: json_type(found),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

pub fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
