//! Filters, functions and tests installed into template engines.
//!
//! Engines are configured from an explicit [`CapabilitySet`] rather than by
//! copying registrations out of another engine. The strict and the lenient
//! engine are built from the same set, so both understand the same syntax.

use std::collections::HashSet;
use std::fmt::{self, Write as _};

use chrono::{DateTime, NaiveDate, Utc};
use minijinja::{Environment, Error, ErrorKind, Value};
use thiserror::Error as ThisError;

/// Default format of the `date` filter (`F j, Y`)
const DEFAULT_DATE_FORMAT: &str = "%B %-d, %Y";

/// What a capability registers as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityKind {
    Filter,
    Function,
    Test,
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CapabilityKind::Filter => "filter",
            CapabilityKind::Function => "function",
            CapabilityKind::Test => "test",
        };
        f.write_str(name)
    }
}

/// Errors raised while assembling or installing capabilities
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum CapabilityError {
    #[error("Unknown template capability: {0}")]
    Unknown(String),

    #[error("Template {kind} already registered: {name}")]
    Duplicate { kind: CapabilityKind, name: String },
}

/// A single named filter, function or test
#[derive(Clone)]
pub struct Capability {
    name: &'static str,
    kind: CapabilityKind,
    install: fn(&mut Environment<'static>, &'static str),
}

impl Capability {
    pub fn new(
        name: &'static str,
        kind: CapabilityKind,
        install: fn(&mut Environment<'static>, &'static str),
    ) -> Self {
        Self {
            name,
            kind,
            install,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> CapabilityKind {
        self.kind
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capability")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Ordered list of capabilities to install into an engine
#[derive(Debug, Clone, Default)]
pub struct CapabilitySet {
    entries: Vec<Capability>,
}

impl CapabilitySet {
    /// An empty set: engines get only the built-in syntax
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every capability this crate provides
    pub fn all() -> Self {
        Self {
            entries: vec![
                Capability {
                    name: "raw",
                    kind: CapabilityKind::Filter,
                    install: |env, name| env.add_filter(name, raw),
                },
                Capability {
                    name: "number_format",
                    kind: CapabilityKind::Filter,
                    install: |env, name| env.add_filter(name, number_format),
                },
                Capability {
                    name: "date",
                    kind: CapabilityKind::Filter,
                    install: |env, name| env.add_filter(name, date),
                },
                Capability {
                    name: "nl2br",
                    kind: CapabilityKind::Filter,
                    install: |env, name| env.add_filter(name, nl2br),
                },
                Capability {
                    name: "cycle",
                    kind: CapabilityKind::Function,
                    install: |env, name| env.add_function(name, cycle),
                },
                Capability {
                    name: "empty",
                    kind: CapabilityKind::Test,
                    install: |env, name| env.add_test(name, is_empty),
                },
            ],
        }
    }

    /// Select capabilities by name, in the order given.
    ///
    /// Unknown names are returned as errors alongside the resolved set so the
    /// caller can log them and carry on.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> (Self, Vec<CapabilityError>) {
        let available = Self::all();
        let mut entries = Vec::with_capacity(names.len());
        let mut errors = Vec::new();

        for name in names {
            let name = name.as_ref();
            match available.entries.iter().find(|c| c.name == name) {
                Some(capability) => entries.push(capability.clone()),
                None => errors.push(CapabilityError::Unknown(name.to_string())),
            }
        }

        (Self { entries }, errors)
    }

    /// Append a capability; later installation rejects duplicate names
    pub fn push(&mut self, capability: Capability) {
        self.entries.push(capability);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Capability> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Install every capability into `env`.
    ///
    /// A capability that cannot be installed is skipped and reported; the
    /// remaining ones are still installed. Returns the names installed.
    pub fn install_into(
        &self,
        env: &mut Environment<'static>,
    ) -> (Vec<&'static str>, Vec<CapabilityError>) {
        let mut seen = HashSet::new();
        let mut installed = Vec::with_capacity(self.entries.len());
        let mut errors = Vec::new();

        for capability in &self.entries {
            if !seen.insert((capability.kind, capability.name)) {
                errors.push(CapabilityError::Duplicate {
                    kind: capability.kind,
                    name: capability.name.to_string(),
                });
                continue;
            }
            (capability.install)(env, capability.name);
            installed.push(capability.name);
        }

        (installed, errors)
    }
}

fn invalid(msg: impl Into<String>) -> Error {
    Error::new(ErrorKind::InvalidOperation, msg.into())
}

/// `{{ html|raw }}`: output as-is
fn raw(value: Value) -> Value {
    value
}

/// `{{ total|number_format(2, ".", ",") }}`
///
/// Accepts numbers and numeric strings; undefined and none format as zero.
fn number_format(
    value: Value,
    decimals: Option<usize>,
    dec_point: Option<String>,
    thousands_sep: Option<String>,
) -> Result<String, Error> {
    let value = to_number(&value)
        .ok_or_else(|| invalid(format!("number_format cannot interpret {}", value)))?;
    if !value.is_finite() {
        return Err(invalid("number_format requires a finite number"));
    }
    let decimals = decimals.unwrap_or(0);
    let dec_point = dec_point.unwrap_or_else(|| ".".to_string());
    let thousands_sep = thousands_sep.unwrap_or_else(|| ",".to_string());

    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (formatted.as_str(), None),
    };

    let mut out = String::with_capacity(formatted.len() + int_part.len() / 3);
    if value < 0.0 && formatted.chars().any(|c| c.is_ascii_digit() && c != '0') {
        out.push('-');
    }
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            out.push_str(&thousands_sep);
        }
        out.push(digit);
    }
    if let Some(frac_part) = frac_part {
        out.push_str(&dec_point);
        out.push_str(frac_part);
    }
    Ok(out)
}

fn to_number(value: &Value) -> Option<f64> {
    if value.is_undefined() || value.is_none() {
        return Some(0.0);
    }
    match value.as_str() {
        Some(s) => s.trim().parse::<f64>().ok(),
        None => f64::try_from(value.clone()).ok(),
    }
}

/// `{{ "now"|date("Y") }}`, `{{ order.placed_at|date("d/m/Y H:i") }}`
///
/// Formats use PHP `date()` letters; a backslash makes the next character
/// literal. A format containing `%` is taken as a chrono strftime pattern.
fn date(value: Value, format: Option<String>) -> Result<String, Error> {
    let timestamp = parse_datetime(&value)
        .ok_or_else(|| invalid(format!("date filter cannot interpret {}", value)))?;
    let pattern = match format.as_deref() {
        None => DEFAULT_DATE_FORMAT.to_string(),
        Some(format) if format.contains('%') => format.to_string(),
        Some(format) => php_date_pattern(format),
    };

    let mut out = String::new();
    write!(out, "{}", timestamp.format(&pattern))
        .map_err(|_| invalid(format!("invalid date format: {}", pattern)))?;
    Ok(out)
}

/// Translate a PHP `date()` format into a strftime pattern
fn php_date_pattern(format: &str) -> String {
    let mut pattern = String::with_capacity(format.len() * 2);
    let mut chars = format.chars();
    while let Some(c) = chars.next() {
        let spec = match c {
            'd' => "%d",
            'D' => "%a",
            'j' => "%-d",
            'l' => "%A",
            'N' => "%u",
            'w' => "%w",
            'W' => "%V",
            'F' => "%B",
            'm' => "%m",
            'M' => "%b",
            'n' => "%-m",
            'o' => "%G",
            'Y' => "%Y",
            'y' => "%y",
            'a' => "%P",
            'A' => "%p",
            'g' => "%-I",
            'G' => "%-H",
            'h' => "%I",
            'H' => "%H",
            'i' => "%M",
            's' => "%S",
            'u' => "%6f",
            'v' => "%3f",
            'e' | 'T' => "%Z",
            'O' => "%z",
            'P' => "%:z",
            'c' => "%Y-%m-%dT%H:%M:%S%:z",
            'r' => "%a, %d %b %Y %H:%M:%S %z",
            'U' => "%s",
            '\\' => {
                if let Some(literal) = chars.next() {
                    push_literal(&mut pattern, literal);
                }
                continue;
            }
            other => {
                push_literal(&mut pattern, other);
                continue;
            }
        };
        pattern.push_str(spec);
    }
    pattern
}

fn push_literal(pattern: &mut String, c: char) {
    if c == '%' {
        pattern.push_str("%%");
    } else {
        pattern.push(c);
    }
}

fn parse_datetime(value: &Value) -> Option<DateTime<Utc>> {
    if let Some(s) = value.as_str() {
        let s = s.trim();
        if s.eq_ignore_ascii_case("now") {
            return Some(Utc::now());
        }
        if let Ok(parsed) = DateTime::parse_from_rfc3339(s) {
            return Some(parsed.with_timezone(&Utc));
        }
        if let Ok(day) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return day.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
        return s
            .parse::<i64>()
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0));
    }
    i64::try_from(value.clone())
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

/// `{{ note|nl2br }}`
fn nl2br(value: String) -> String {
    value.replace('\n', "<br />\n")
}

/// `{{ cycle(["odd", "even"], loop.index0) }}`
fn cycle(values: Value, position: usize) -> Result<Value, Error> {
    match values.len() {
        Some(0) | None => Err(invalid("cycle requires a non-empty sequence")),
        Some(len) => values.get_item_by_index(position % len),
    }
}

/// `{% if items is empty %}`
fn is_empty(value: Value) -> bool {
    if value.is_undefined() || value.is_none() {
        return true;
    }
    match value.as_str() {
        Some(s) => s.is_empty(),
        None => value.len() == Some(0),
    }
}
