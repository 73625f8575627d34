//! Scalar SQL functions.

use chrono::{Datelike, Local};

use crate::error::{Result, SheetqlError};
use crate::value::Value;

/// Longest text, in bytes, that `REPLICATE` and `SPACE` may build.
const MAX_REPEAT_BYTES: usize = 1 << 24;

/// A scalar function callable from a calculated field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    // Numeric
    Abs,
    Ceiling,
    Floor,
    Round,
    Sqrt,
    Power,
    Log,
    Log10,
    // String
    Left,
    Right,
    Length,
    Lower,
    Upper,
    Ltrim,
    Rtrim,
    Trim,
    Substring,
    Reverse,
    Replicate,
    Space,
    Stuff,
    CharIndex,
    ConcatWs,
    Concat,
    Coalesce,
    Convert,
    // Date
    Year,
    Month,
    Day,
    Now,
}

impl Function {
    /// Looks a function up by name (case-insensitive).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let function = match name.to_ascii_uppercase().as_str() {
            "ABS" => Self::Abs,
            "CEILING" | "CEIL" => Self::Ceiling,
            "FLOOR" => Self::Floor,
            "ROUND" => Self::Round,
            "SQRT" => Self::Sqrt,
            "POWER" | "POW" => Self::Power,
            "LOG" => Self::Log,
            "LOG10" => Self::Log10,
            "LEFT" => Self::Left,
            "RIGHT" => Self::Right,
            "LEN" | "LENGTH" => Self::Length,
            "LOWER" => Self::Lower,
            "UPPER" => Self::Upper,
            "LTRIM" => Self::Ltrim,
            "RTRIM" => Self::Rtrim,
            "TRIM" => Self::Trim,
            "SUBSTRING" | "SUBSTR" => Self::Substring,
            "REVERSE" => Self::Reverse,
            "REPLICATE" => Self::Replicate,
            "SPACE" => Self::Space,
            "STUFF" => Self::Stuff,
            "CHARINDEX" => Self::CharIndex,
            "CONCAT_WS" => Self::ConcatWs,
            "CONCAT" => Self::Concat,
            "COALESCE" => Self::Coalesce,
            "CONVERT" => Self::Convert,
            "YEAR" => Self::Year,
            "MONTH" => Self::Month,
            "DAY" => Self::Day,
            "NOW" => Self::Now,
            _ => return None,
        };
        Some(function)
    }

    /// Accepted argument counts; `None` means unbounded.
    const fn arity(self) -> (usize, Option<usize>) {
        match self {
            Self::Now => (0, Some(0)),
            Self::Abs
            | Self::Ceiling
            | Self::Floor
            | Self::Sqrt
            | Self::Log
            | Self::Log10
            | Self::Length
            | Self::Lower
            | Self::Upper
            | Self::Ltrim
            | Self::Rtrim
            | Self::Trim
            | Self::Reverse
            | Self::Space
            | Self::Year
            | Self::Month
            | Self::Day => (1, Some(1)),
            Self::Round => (1, Some(2)),
            Self::Power | Self::Left | Self::Right | Self::Replicate | Self::Convert => {
                (2, Some(2))
            }
            Self::Substring | Self::CharIndex => (2, Some(3)),
            Self::Stuff => (4, Some(4)),
            Self::ConcatWs => (2, None),
            Self::Concat | Self::Coalesce => (1, None),
        }
    }

    /// Checks an argument count.
    ///
    /// # Errors
    ///
    /// Fails with a syntax error naming the function.
    pub fn check_arity(self, name: &str, count: usize) -> Result<()> {
        let (min, max) = self.arity();
        if count < min || max.is_some_and(|max| count > max) {
            let expected = match max {
                Some(max) if max == min => format!("{min}"),
                Some(max) => format!("{min} to {max}"),
                None => format!("at least {min}"),
            };
            return Err(SheetqlError::syntax(format!(
                "{name} expects {expected} argument(s), got {count}"
            )));
        }
        Ok(())
    }

    /// Applies the function. Arguments of the wrong type produce `Null`.
    #[must_use]
    pub fn call(self, args: &[Value]) -> Value {
        match self {
            Self::Abs => numeric(args, f64::abs),
            Self::Ceiling => numeric(args, f64::ceil),
            Self::Floor => numeric(args, f64::floor),
            Self::Sqrt => numeric(args, f64::sqrt),
            Self::Log => numeric(args, f64::ln),
            Self::Log10 => numeric(args, f64::log10),
            Self::Round => {
                let digits = args.get(1).and_then(Value::as_number).unwrap_or(0.0);
                let scale = 10f64.powf(digits.trunc());
                numeric(args, |n| (n * scale).round() / scale)
            }
            Self::Power => match (number(args, 0), number(args, 1)) {
                (Some(base), Some(exp)) => Value::Number(base.powf(exp)),
                _ => Value::Null,
            },
            Self::Left => {
                let count = count(args, 1);
                Value::Text(text(args, 0).chars().take(count).collect())
            }
            Self::Right => {
                let chars: Vec<char> = text(args, 0).chars().collect();
                let count = count(args, 1).min(chars.len());
                Value::Text(chars[chars.len() - count..].iter().collect())
            }
            #[allow(clippy::cast_precision_loss)]
            Self::Length => Value::Number(text(args, 0).chars().count() as f64),
            Self::Lower => Value::Text(text(args, 0).to_lowercase()),
            Self::Upper => Value::Text(text(args, 0).to_uppercase()),
            Self::Ltrim => Value::Text(text(args, 0).trim_start().to_string()),
            Self::Rtrim => Value::Text(text(args, 0).trim_end().to_string()),
            Self::Trim => Value::Text(text(args, 0).trim().to_string()),
            Self::Reverse => Value::Text(text(args, 0).chars().rev().collect()),
            Self::Substring => {
                let chars: Vec<char> = text(args, 0).chars().collect();
                let start = count(args, 1).max(1) - 1;
                let length = if args.len() > 2 {
                    count(args, 2)
                } else {
                    chars.len()
                };
                Value::Text(chars.iter().skip(start).take(length).collect())
            }
            Self::Replicate => repeat(&text(args, 0), count(args, 1)),
            Self::Space => repeat(" ", count(args, 0)),
            Self::Stuff => {
                let chars: Vec<char> = text(args, 0).chars().collect();
                let start = (count(args, 1).max(1) - 1).min(chars.len());
                let end = start.saturating_add(count(args, 2)).min(chars.len());
                let mut out: String = chars[..start].iter().collect();
                out.push_str(&text(args, 3));
                out.extend(&chars[end..]);
                Value::Text(out)
            }
            Self::CharIndex => {
                let needle = text(args, 0);
                let haystack: Vec<char> = text(args, 1).chars().collect();
                let start = if args.len() > 2 {
                    count(args, 2).max(1) - 1
                } else {
                    0
                };
                let tail: String = haystack.iter().skip(start).collect();
                match tail.find(&needle) {
                    Some(byte) => {
                        #[allow(clippy::cast_precision_loss)]
                        let position = start
                            .saturating_add(tail[..byte].chars().count() + 1)
                            as f64;
                        Value::Number(position)
                    }
                    None => Value::Number(0.0),
                }
            }
            Self::ConcatWs => {
                let separator = text(args, 0);
                let parts: Vec<String> = args
                    .iter()
                    .skip(1)
                    .filter(|v| !v.is_null())
                    .map(Value::to_string)
                    .collect();
                Value::Text(parts.join(&separator))
            }
            Self::Concat => Value::Text(args.iter().map(Value::to_string).collect()),
            Self::Coalesce => args
                .iter()
                .find(|v| !v.is_null())
                .cloned()
                .unwrap_or_default(),
            Self::Convert => args
                .first()
                .map_or(Value::Null, |value| convert(value, &text(args, 1))),
            Self::Year => date_part(args, |d| f64::from(d.year())),
            Self::Month => date_part(args, |d| f64::from(d.month())),
            Self::Day => date_part(args, |d| f64::from(d.day())),
            Self::Now => Value::Date(Local::now().naive_local()),
        }
    }
}

fn number(args: &[Value], index: usize) -> Option<f64> {
    args.get(index).and_then(Value::as_number)
}

fn numeric(args: &[Value], f: impl Fn(f64) -> f64) -> Value {
    number(args, 0).map_or(Value::Null, |n| Value::Number(f(n)))
}

fn text(args: &[Value], index: usize) -> String {
    args.get(index).map(Value::to_string).unwrap_or_default()
}

/// A non-negative count argument; anything else counts as zero.
fn count(args: &[Value], index: usize) -> usize {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    number(args, index).filter(|n| *n > 0.0).map_or(0, |n| n as usize)
}

/// `text` repeated `times`, or `Null` past the size limit.
fn repeat(text: &str, times: usize) -> Value {
    match text.len().checked_mul(times) {
        Some(bytes) if bytes <= MAX_REPEAT_BYTES => Value::Text(text.repeat(times)),
        _ => Value::Null,
    }
}

fn date_part(args: &[Value], f: impl Fn(chrono::NaiveDateTime) -> f64) -> Value {
    args.first()
        .and_then(Value::as_date)
        .map_or(Value::Null, |d| Value::Number(f(d)))
}

fn convert(value: &Value, target: &str) -> Value {
    if value.is_null() {
        return Value::Null;
    }
    match target.to_ascii_uppercase().as_str() {
        "SIGNED" | "UNSIGNED" | "INT" | "INTEGER" => value
            .as_number()
            .map_or(Value::Null, |n| Value::Number(n.trunc())),
        "DECIMAL" | "FLOAT" | "NUMERIC" | "REAL" | "DOUBLE" => {
            value.as_number().map_or(Value::Null, Value::Number)
        }
        "DATE" | "DATETIME" => value.as_date().map_or(Value::Null, Value::Date),
        _ => Value::Text(value.to_string()),
    }
}
