//! Generic query builder.
//!
//! Builds parameterized INSERT / UPDATE / DELETE / SELECT text from a table
//! name and a list of columns. Table and column names are trusted schema
//! identifiers and are written into the SQL as-is (after a plain identifier
//! check); values never are. Parameters are collected in the same order as
//! their placeholders, so `params()[i]` binds to placeholder `i`.

use std::fmt::Write as _;

use super::value::Value;
use crate::error::StorageError;
use crate::Result;

/// A column name paired with a value.
#[derive(Debug, Clone, PartialEq)]
pub struct Column<'a> {
    pub name: &'a str,
    pub value: Value<'a>,
}

impl<'a> Column<'a> {
    #[must_use]
    pub fn new(name: &'a str, value: impl Into<Value<'a>>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }
}

/// SQL text plus its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Query<'a> {
    sql: String,
    params: Vec<Value<'a>>,
}

impl<'a> Query<'a> {
    /// `INSERT INTO <table> (<c1>, <c2>, ...) VALUES (?, ?, ...)`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidArgument`] if `columns` is empty or a
    /// name is not a plain identifier.
    pub fn insert(table: &str, columns: Vec<Column<'a>>) -> Result<Self> {
        check_identifier(table)?;
        if columns.is_empty() {
            return Err(StorageError::invalid(format!("insert into {table} without columns")).into());
        }

        let mut names = Vec::with_capacity(columns.len());
        let mut params = Vec::with_capacity(columns.len());
        for column in columns {
            check_identifier(column.name)?;
            names.push(column.name);
            params.push(column.value);
        }
        let placeholders = vec!["?"; names.len()].join(", ");
        let sql = format!(
            "INSERT INTO {table} ({}) VALUES ({placeholders})",
            names.join(", ")
        );

        Ok(Self::finish(sql, params))
    }

    /// `UPDATE <table> SET <c1> = ?, ... WHERE id = ?`.
    ///
    /// The id is bound last, after every SET column.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidArgument`] if `columns` is empty or a
    /// name is not a plain identifier.
    pub fn update_by_id(table: &str, id: i64, columns: Vec<Column<'a>>) -> Result<Self> {
        check_identifier(table)?;
        if columns.is_empty() {
            return Err(StorageError::invalid(format!("update of {table} without columns")).into());
        }

        let mut sql = format!("UPDATE {table} SET ");
        let mut params = Vec::with_capacity(columns.len() + 1);
        for (i, column) in columns.into_iter().enumerate() {
            check_identifier(column.name)?;
            if i > 0 {
                sql.push_str(", ");
            }
            let _ = write!(sql, "{} = ?", column.name);
            params.push(column.value);
        }
        sql.push_str(" WHERE id = ?");
        params.push(Value::Integer(id));

        Ok(Self::finish(sql, params))
    }

    /// `DELETE FROM <table> [WHERE <c1> = ? AND ...]`.
    ///
    /// No conditions deletes every row.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidArgument`] if a name is not a plain
    /// identifier.
    pub fn delete(table: &str, conditions: Vec<Column<'a>>) -> Result<Self> {
        check_identifier(table)?;
        Self::filtered(format!("DELETE FROM {table}"), conditions)
    }

    /// `SELECT * FROM <table> [WHERE <c1> = ? AND ...]`.
    ///
    /// No conditions selects every row.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidArgument`] if a name is not a plain
    /// identifier.
    pub fn select(table: &str, conditions: Vec<Column<'a>>) -> Result<Self> {
        check_identifier(table)?;
        Self::filtered(format!("SELECT * FROM {table}"), conditions)
    }

    /// Caller-written SQL with its parameters, for statements the builder
    /// does not cover.
    #[must_use]
    pub fn raw(sql: impl Into<String>, params: Vec<Value<'a>>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    fn filtered(mut sql: String, conditions: Vec<Column<'a>>) -> Result<Self> {
        let mut params = Vec::with_capacity(conditions.len());
        for (i, column) in conditions.into_iter().enumerate() {
            check_identifier(column.name)?;
            sql.push_str(if i == 0 { " WHERE " } else { " AND " });
            let _ = write!(sql, "{} = ?", column.name);
            params.push(column.value);
        }
        Ok(Self::finish(sql, params))
    }

    fn finish(sql: String, params: Vec<Value<'a>>) -> Self {
        tracing::debug!(sql = %sql, params = params.len(), "Built query");
        Self { sql, params }
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Parameters in placeholder order.
    #[must_use]
    pub fn params(&self) -> &[Value<'a>] {
        &self.params
    }
}

/// Accept `[A-Za-z_][A-Za-z0-9_]*` only.
fn check_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StorageError::invalid(format!("'{name}' is not a valid identifier")).into())
    }
}
