//! Coercion of loosely-typed configuration values.
//!
//! Raw values arrive in whatever shape a data-attribute or JSON configuration layer
//! produced: already-typed numbers and lists pass through verbatim, text is parsed.
//! Every coercion is explicit and fallible; a malformed value is a reported error,
//! never a silently invalid state.

use crate::error::ParseError;
use crate::types::SizeRange;

/// A raw configuration value, prior to type coercion.
#[derive(Clone, Debug, PartialEq)]
pub enum RawValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<i64>),
    Range { min: i64, max: i64 },
}

impl RawValue {
    /// A present-but-empty text value counts as absent and skips coercion entirely.
    pub(crate) fn is_absent(&self) -> bool {
        matches!(self, RawValue::Text(t) if t.trim().is_empty())
    }
}

impl From<bool> for RawValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for RawValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<i64>> for RawValue {
    fn from(v: Vec<i64>) -> Self {
        Self::List(v)
    }
}

impl From<SizeRange> for RawValue {
    fn from(v: SizeRange) -> Self {
        Self::Range {
            min: v.min as i64,
            max: v.max as i64,
        }
    }
}

pub(crate) fn parse_integer(raw: &RawValue) -> Result<i64, ParseError> {
    match raw {
        RawValue::Int(v) => Ok(*v),
        RawValue::Float(v) => Ok(*v as i64),
        RawValue::Text(t) => {
            leading_integer(t.trim()).ok_or_else(|| ParseError::InvalidInteger(t.clone()))
        }
        other => Err(ParseError::InvalidInteger(format!("{other:?}"))),
    }
}

pub(crate) fn parse_float(raw: &RawValue) -> Result<f64, ParseError> {
    match raw {
        RawValue::Int(v) => Ok(*v as f64),
        RawValue::Float(v) => Ok(*v),
        RawValue::Text(t) => {
            let s = t.trim();
            s.parse::<f64>()
                .ok()
                .or_else(|| leading_float(s))
                .ok_or_else(|| ParseError::InvalidFloat(t.clone()))
        }
        other => Err(ParseError::InvalidFloat(format!("{other:?}"))),
    }
}

/// `true` iff the value is boolean `true`, the text `"true"` or `"1"`, or numeric `1`.
/// Everything else (including unparseable text) is `false`.
pub(crate) fn parse_boolean(raw: &RawValue) -> bool {
    match raw {
        RawValue::Bool(b) => *b,
        RawValue::Int(v) => *v == 1,
        RawValue::Float(v) => *v == 1.0,
        RawValue::Text(t) => matches!(t.trim(), "true" | "1"),
        _ => false,
    }
}

/// An already-shaped range passes through verbatim; text must contain two integers
/// separated by a dash, a comma, or a whitespace run.
pub(crate) fn parse_range(raw: &RawValue) -> Result<SizeRange, ParseError> {
    match raw {
        RawValue::Range { min, max } => {
            let min = u32::try_from(*min)
                .map_err(|_| ParseError::MalformedRange(format!("{min}-{max}")))?;
            let max = u32::try_from(*max)
                .map_err(|_| ParseError::MalformedRange(format!("{min}-{max}")))?;
            Ok(SizeRange { min, max })
        }
        RawValue::Text(t) => {
            parse_range_text(t).ok_or_else(|| ParseError::MalformedRange(t.clone()))
        }
        other => Err(ParseError::MalformedRange(format!("{other:?}"))),
    }
}

fn parse_range_text(s: &str) -> Option<SizeRange> {
    let b = s.as_bytes();
    let mut i = 0;
    while i < b.len() && !b[i].is_ascii_digit() {
        i += 1;
    }
    let (min, mut i) = scan_uint(b, i)?;
    while i < b.len() && b[i].is_ascii_whitespace() {
        i += 1;
    }
    if i < b.len() && (b[i] == b'-' || b[i] == b',') {
        i += 1;
    }
    while i < b.len() && b[i].is_ascii_whitespace() {
        i += 1;
    }
    let (max, _) = scan_uint(b, i)?;
    Some(SizeRange { min, max })
}

fn scan_uint(b: &[u8], mut i: usize) -> Option<(u32, usize)> {
    let start = i;
    let mut value: u64 = 0;
    while i < b.len() && b[i].is_ascii_digit() {
        value = value.saturating_mul(10).saturating_add((b[i] - b'0') as u64);
        i += 1;
    }
    if i == start || value > u32::MAX as u64 {
        return None;
    }
    Some((value as u32, i))
}

/// An integer list passes through verbatim; text is split on commas. The result is
/// always sorted descending (numerically) and deduplicated.
pub(crate) fn parse_width_list(raw: &RawValue) -> Result<Vec<u32>, ParseError> {
    let mut widths = match raw {
        RawValue::List(values) => values
            .iter()
            .map(|&v| u32::try_from(v).map_err(|_| ParseError::InvalidWidthList(v.to_string())))
            .collect::<Result<Vec<u32>, ParseError>>()?,
        RawValue::Int(v) => {
            vec![u32::try_from(*v).map_err(|_| ParseError::InvalidWidthList(v.to_string()))?]
        }
        RawValue::Text(t) => t
            .split(',')
            .map(|piece| {
                let piece = piece.trim();
                scan_uint(piece.as_bytes(), 0)
                    .map(|(v, _)| v)
                    .ok_or_else(|| ParseError::InvalidWidthList(t.clone()))
            })
            .collect::<Result<Vec<u32>, ParseError>>()?,
        other => return Err(ParseError::InvalidWidthList(format!("{other:?}"))),
    };
    widths.sort_unstable_by(|a, b| b.cmp(a));
    widths.dedup();
    Ok(widths)
}

fn leading_integer(s: &str) -> Option<i64> {
    let b = s.as_bytes();
    let (negative, start) = match b.first() {
        Some(b'-') => (true, 1),
        _ => (false, 0),
    };
    let (value, _) = scan_uint(b, start)?;
    let value = value as i64;
    Some(if negative { -value } else { value })
}

fn leading_float(s: &str) -> Option<f64> {
    let b = s.as_bytes();
    let start = if b.first() == Some(&b'-') { 1 } else { 0 };
    let mut end = start;
    while end < b.len() && b[end].is_ascii_digit() {
        end += 1;
    }
    if end < b.len() && b[end] == b'.' {
        end += 1;
        while end < b.len() && b[end].is_ascii_digit() {
            end += 1;
        }
    }
    if end == start {
        return None;
    }
    s[..end].parse::<f64>().ok()
}
