//! Column values.
//!
//! A [`Value`] is one bound or fetched column: an integer, a float, text,
//! a blob or NULL. Text and blob payloads are length-delimited byte
//! sequences, so embedded zero bytes survive intact. Values decoded from a
//! result row borrow the statement's row buffer until detached with
//! [`Value::into_owned`].

use std::borrow::Cow;

use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};

/// Discriminant of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Integer,
    Float,
    Text,
    Blob,
    Null,
}

/// A single column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    Integer(i64),
    Float(f64),
    Text(Cow<'a, [u8]>),
    Blob(Cow<'a, [u8]>),
    Null,
}

impl<'a> Value<'a> {
    /// Borrow a string as a text value.
    #[must_use]
    pub fn text(s: &'a str) -> Self {
        Self::Text(Cow::Borrowed(s.as_bytes()))
    }

    /// Borrow bytes as a blob value.
    #[must_use]
    pub const fn blob(bytes: &'a [u8]) -> Self {
        Self::Blob(Cow::Borrowed(bytes))
    }

    /// Text value, or NULL when `s` is `None`.
    #[must_use]
    pub fn optional_text(s: Option<&'a str>) -> Self {
        s.map_or(Self::Null, Self::text)
    }

    /// The discriminant of this value.
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Integer(_) => ValueKind::Integer,
            Self::Float(_) => ValueKind::Float,
            Self::Text(_) => ValueKind::Text,
            Self::Blob(_) => ValueKind::Blob,
            Self::Null => ValueKind::Null,
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Text payload as UTF-8, if this is a text value holding valid UTF-8.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(bytes) => std::str::from_utf8(bytes.as_ref()).ok(),
            _ => None,
        }
    }

    /// Raw payload of a text or blob value.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Text(bytes) | Self::Blob(bytes) => Some(bytes.as_ref()),
            _ => None,
        }
    }

    /// Detach this value from whatever buffer it borrows.
    #[must_use]
    pub fn into_owned(self) -> Value<'static> {
        match self {
            Self::Integer(i) => Value::Integer(i),
            Self::Float(f) => Value::Float(f),
            Self::Text(bytes) => Value::Text(Cow::Owned(bytes.into_owned())),
            Self::Blob(bytes) => Value::Blob(Cow::Owned(bytes.into_owned())),
            Self::Null => Value::Null,
        }
    }
}

impl<'a> From<ValueRef<'a>> for Value<'a> {
    fn from(value: ValueRef<'a>) -> Self {
        match value {
            ValueRef::Null => Self::Null,
            ValueRef::Integer(i) => Self::Integer(i),
            ValueRef::Real(f) => Self::Float(f),
            ValueRef::Text(bytes) => Self::Text(Cow::Borrowed(bytes)),
            ValueRef::Blob(bytes) => Self::Blob(Cow::Borrowed(bytes)),
        }
    }
}

impl ToSql for Value<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Borrowed(match self {
            Self::Integer(i) => ValueRef::Integer(*i),
            Self::Float(f) => ValueRef::Real(*f),
            Self::Text(bytes) => ValueRef::Text(bytes.as_ref()),
            Self::Blob(bytes) => ValueRef::Blob(bytes.as_ref()),
            Self::Null => ValueRef::Null,
        }))
    }
}

impl From<i64> for Value<'_> {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<u32> for Value<'_> {
    fn from(i: u32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<bool> for Value<'_> {
    fn from(b: bool) -> Self {
        Self::Integer(i64::from(b))
    }
}

impl From<f64> for Value<'_> {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl<'a> From<&'a str> for Value<'a> {
    fn from(s: &'a str) -> Self {
        Self::text(s)
    }
}

impl From<String> for Value<'_> {
    fn from(s: String) -> Self {
        Self::Text(Cow::Owned(s.into_bytes()))
    }
}
