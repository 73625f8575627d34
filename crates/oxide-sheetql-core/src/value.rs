//! Cell values.
//!
//! A [`Value`] is one spreadsheet cell. Comparison semantics are loose in
//! the way spreadsheet data needs them to be: numeric strings compare as
//! numbers, dates compare by epoch, and the empty string is a null.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Date formats accepted when a text cell is compared against a date.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// Date-time formats accepted when a text cell is compared against a date.
const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Empty cell.
    #[default]
    Null,
    /// Boolean cell.
    Boolean(bool),
    /// Numeric cell. All numbers are IEEE doubles.
    Number(f64),
    /// Date or date-time cell.
    Date(NaiveDateTime),
    /// Text cell.
    Text(String),
}

impl Value {
    /// Creates a text value.
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Creates a date value at midnight, or `Null` for an invalid date.
    #[must_use]
    pub fn date(year: i32, month: u32, day: u32) -> Self {
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map_or(Self::Null, Self::Date)
    }

    /// Infers a typed value from free text (command-line binds, CSV-ish input).
    #[must_use]
    pub fn infer(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Self::Null;
        }
        if trimmed.eq_ignore_ascii_case("true") {
            return Self::Boolean(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return Self::Boolean(false);
        }
        if let Ok(n) = trimmed.parse::<f64>() {
            return Self::Number(n);
        }
        parse_date(trimmed).map_or_else(|| Self::text(text), Self::Date)
    }

    /// Returns true for `Null` and for the empty string.
    #[must_use]
    pub fn is_null(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Returns the numeric interpretation of this value, if any.
    ///
    /// Text is numeric when its trimmed content parses as a float.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    trimmed.parse::<f64>().ok()
                }
            }
            _ => None,
        }
    }

    /// Returns the date interpretation of this value, if any.
    #[must_use]
    pub fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Date(d) => Some(*d),
            Self::Text(s) => parse_date(s.trim()),
            _ => None,
        }
    }

    /// Returns the text content for `Text` values.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns true if the value is a `Date`.
    #[must_use]
    pub const fn is_date(&self) -> bool {
        matches!(self, Self::Date(_))
    }

    /// String-cast used for index keys and row signatures.
    #[must_use]
    pub fn to_key(&self) -> String {
        self.to_string()
    }

    /// Epoch milliseconds used when either side of a comparison is a date.
    fn epoch(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            #[allow(clippy::cast_precision_loss)]
            other => other
                .as_date()
                .map(|d| d.and_utc().timestamp_millis() as f64),
        }
    }

    /// Loose equality used by `=`, `IN` and join keys.
    #[must_use]
    pub fn loose_eq(&self, other: &Self) -> bool {
        match (self.is_null(), other.is_null()) {
            (true, true) => return true,
            (true, false) | (false, true) => return false,
            (false, false) => {}
        }
        if self.is_date() || other.is_date() {
            if let (Some(a), Some(b)) = (self.epoch(), other.epoch()) {
                return a == b;
            }
        }
        if let (Some(a), Some(b)) = (self.as_number(), other.as_number()) {
            return a == b;
        }
        self.to_key() == other.to_key()
    }

    /// Ordering used by `<`, `<=`, `>`, `>=`.
    ///
    /// Returns `None` when either side is null or the values are not
    /// comparable (NaN).
    #[must_use]
    pub fn sql_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.is_null() || other.is_null() {
            return None;
        }
        if self.is_date() || other.is_date() {
            if let (Some(a), Some(b)) = (self.epoch(), other.epoch()) {
                return a.partial_cmp(&b);
            }
        }
        if let (Some(a), Some(b)) = (self.as_number(), other.as_number()) {
            return a.partial_cmp(&b);
        }
        Some(self.to_key().cmp(&other.to_key()))
    }

    /// Total ordering used for sorting (`ORDER BY`, `GROUP BY`, `MIN`, `MAX`).
    ///
    /// Values sort by class first: nulls, booleans, numbers (numeric text
    /// included, NaN last), dates (date text included), then other text.
    /// Within a class they compare by value, so the order stays total on
    /// mixed columns.
    #[must_use]
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        let (a, b) = (self.sort_key(), other.sort_key());
        match (a, b) {
            (SortKey::Boolean(x), SortKey::Boolean(y)) => x.cmp(&y),
            (SortKey::Number(x), SortKey::Number(y)) => match (x.is_nan(), y.is_nan()) {
                (false, false) => x.total_cmp(&y),
                (x_nan, y_nan) => x_nan.cmp(&y_nan),
            },
            (SortKey::Date(x), SortKey::Date(y)) => x.cmp(&y),
            (SortKey::Text(x), SortKey::Text(y)) => x.cmp(y),
            (a, b) => a.class().cmp(&b.class()),
        }
    }

    fn sort_key(&self) -> SortKey<'_> {
        match self {
            Self::Null => SortKey::Null,
            Self::Boolean(b) => SortKey::Boolean(*b),
            Self::Number(n) => SortKey::Number(*n),
            Self::Date(d) => SortKey::Date(*d),
            Self::Text(s) if s.is_empty() => SortKey::Null,
            Self::Text(s) => self
                .as_number()
                .map(SortKey::Number)
                .or_else(|| parse_date(s.trim()).map(SortKey::Date))
                .unwrap_or(SortKey::Text(s)),
        }
    }
}

/// A value reduced to its sorting class and comparable payload.
#[derive(Debug, Clone, Copy)]
enum SortKey<'a> {
    Null,
    Boolean(bool),
    Number(f64),
    Date(NaiveDateTime),
    Text(&'a str),
}

impl SortKey<'_> {
    const fn class(self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Boolean(_) => 1,
            Self::Number(_) => 2,
            Self::Date(_) => 3,
            Self::Text(_) => 4,
        }
    }
}

/// Parses text as a date using the accepted formats.
#[must_use]
pub fn parse_date(text: &str) -> Option<NaiveDateTime> {
    if text.is_empty() || !text.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    for format in DATE_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(text, format) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Formats a number the way a spreadsheet shows it: integral values
/// without a fractional part.
fn format_number(n: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        #[allow(clippy::cast_possible_truncation)]
        let integral = n as i64;
        write!(f, "{integral}")
    } else {
        write!(f, "{n}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Number(n) => format_number(*n, f),
            Self::Date(d) => {
                if d.time() == chrono::NaiveTime::MIN {
                    write!(f, "{}", d.format("%Y-%m-%d"))
                } else {
                    write!(f, "{}", d.format("%Y-%m-%d %H:%M:%S"))
                }
            }
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for Value {
    #[allow(clippy::cast_precision_loss)]
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Self::Date(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        value.and_hms_opt(0, 0, 0).map_or(Self::Null, Self::Date)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
