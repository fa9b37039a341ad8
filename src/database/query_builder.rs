use chrono::{DateTime, Utc};
use std::fmt;

use crate::database::manager::DatabaseError;
use crate::database::value::SqlValue;
use crate::types::Operation;

/// Ordered (column, value) list. Used both for SET/INSERT assignments and for
/// equality conditions, so placeholder N always maps to the Nth pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnValues(Vec<(String, SqlValue)>);

pub type Assignments = ColumnValues;
pub type Conditions = ColumnValues;

impl ColumnValues {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Builder-style insert. Setting a column twice keeps the latest value in
    /// the original position.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<SqlValue>) {
        let column = column.into();
        let value = value.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == column) {
            Some(slot) => slot.1 = value,
            None => self.0.push((column, value)),
        }
    }

    pub fn remove(&mut self, column: &str) -> Option<SqlValue> {
        let index = self.0.iter().position(|(existing, _)| existing == column)?;
        Some(self.0.remove(index).1)
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.0.iter().find(|(existing, _)| existing == column).map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.0.iter().map(|(c, v)| (c.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<SqlValue>> FromIterator<(K, V)> for ColumnValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = ColumnValues::new();
        for (column, value) in iter {
            values.insert(column, value);
        }
        values
    }
}

/// SQL text with `$N` placeholders plus the arguments that fill them, in order
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedQuery {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl PreparedQuery {
    /// Highest placeholder index referenced by the SQL text
    pub fn placeholder_count(&self) -> usize {
        let bytes = self.sql.as_bytes();
        let mut max = 0;
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'$' {
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && bytes[end].is_ascii_digit() {
                    end += 1;
                }
                if let Ok(n) = self.sql[start..end].parse::<usize>() {
                    max = max.max(n);
                }
                i = end;
            } else {
                i += 1;
            }
        }
        max
    }
}

impl fmt::Display for PreparedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -- {} param(s)", self.sql, self.params.len())
    }
}

/// Offset/limit window for paginated selects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub offset: i64,
    pub limit: i64,
}

/// Which statement to render
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Statement {
    Insert,
    Update,
    SoftDelete { at: DateTime<Utc> },
    Select,
    Count,
    /// Count that must be scoped by at least one condition (uniqueness checks)
    Exists,
    Delete,
}

impl Statement {
    pub fn operation(&self) -> Operation {
        match self {
            Statement::Insert => Operation::Insert,
            Statement::Update => Operation::Update,
            Statement::SoftDelete { .. } => Operation::SoftDelete,
            Statement::Select => Operation::Select,
            Statement::Count | Statement::Exists => Operation::Count,
            Statement::Delete => Operation::Delete,
        }
    }
}

pub const ID_COLUMN: &str = "id";
pub const UPDATED_AT_COLUMN: &str = "updated_at";
pub const DELETED_AT_COLUMN: &str = "deleted_at";

/// Single-table parameterized statement builder.
///
/// Holds the table, optional select list, assignments, equality conditions,
/// an "active rows only" flag and an optional pagination window; renders
/// any [`Statement`] from that description. Identifiers are validated and
/// double-quoted, values are only ever bound.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    table: String,
    columns: Vec<String>,
    fields: Assignments,
    conditions: Conditions,
    active_only: bool,
    window: Option<Window>,
}

impl QueryBuilder {
    pub fn table(name: impl Into<String>) -> Result<Self, DatabaseError> {
        let name = name.into();
        validate_identifier(&name)?;
        Ok(Self {
            table: name,
            columns: Vec::new(),
            fields: Assignments::new(),
            conditions: Conditions::new(),
            active_only: false,
            window: None,
        })
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Restrict the select list; empty means `*`
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn set(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.fields.insert(column, value);
        self
    }

    pub fn fields(mut self, fields: Assignments) -> Self {
        for (column, value) in fields.0 {
            self.fields.insert(column, value);
        }
        self
    }

    pub fn filter(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.conditions.insert(column, value);
        self
    }

    pub fn conditions(mut self, conditions: Conditions) -> Self {
        for (column, value) in conditions.0 {
            self.conditions.insert(column, value);
        }
        self
    }

    /// Exclude tombstoned rows (`deleted_at IS NULL`)
    pub fn active_only(mut self) -> Self {
        self.active_only = true;
        self
    }

    pub fn window(mut self, offset: i64, limit: i64) -> Self {
        self.window = Some(Window { offset, limit });
        self
    }

    pub fn has_conditions(&self) -> bool {
        !self.conditions.is_empty()
    }

    pub fn assignments(&self) -> &Assignments {
        &self.fields
    }

    pub fn build(&self, statement: Statement) -> Result<PreparedQuery, DatabaseError> {
        match statement {
            Statement::Insert => self.build_insert(),
            Statement::Update => self.build_update(None),
            Statement::SoftDelete { at } => self.build_update(Some(at)),
            Statement::Select => self.build_select(),
            Statement::Count => self.build_count(false),
            Statement::Exists => self.build_count(true),
            Statement::Delete => self.build_delete(),
        }
    }

    fn build_insert(&self) -> Result<PreparedQuery, DatabaseError> {
        if self.fields.is_empty() {
            return Err(DatabaseError::InvalidArgument(format!(
                "no fields provided for insert into {}",
                self.table
            )));
        }

        let mut params = Params::default();
        let mut columns = Vec::with_capacity(self.fields.len());
        let mut values = Vec::with_capacity(self.fields.len());
        for (column, value) in self.fields.iter() {
            columns.push(quote_identifier(column)?);
            values.push(params.bind(value));
        }

        Ok(params.finish(format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            quote_identifier(&self.table)?,
            columns.join(", "),
            values.join(", "),
            quote_identifier(ID_COLUMN)?,
        )))
    }

    /// UPDATE, or the soft-delete flavour when `deleted_at` is given
    fn build_update(&self, deleted_at: Option<DateTime<Utc>>) -> Result<PreparedQuery, DatabaseError> {
        let operation = if deleted_at.is_some() { Operation::SoftDelete } else { Operation::Update };

        let mut fields = self.fields.clone();
        if let Some(at) = deleted_at {
            fields.remove(UPDATED_AT_COLUMN);
            fields.remove(DELETED_AT_COLUMN);
            fields.insert(UPDATED_AT_COLUMN, at);
            fields.insert(DELETED_AT_COLUMN, at);
        }

        if fields.is_empty() {
            return Err(DatabaseError::InvalidArgument(format!(
                "no fields provided for {} of {}",
                operation, self.table
            )));
        }
        if self.conditions.is_empty() {
            return Err(DatabaseError::InvalidArgument(format!(
                "refusing unscoped {} of {}: no conditions provided",
                operation, self.table
            )));
        }

        let mut params = Params::default();
        let mut sets = Vec::with_capacity(fields.len());
        for (column, value) in fields.iter() {
            sets.push(format!("{}={}", quote_identifier(column)?, params.bind(value)));
        }

        let active_only = self.active_only || deleted_at.is_some();
        let where_clause = self.where_clause(&mut params, active_only)?;

        Ok(params.finish(format!(
            "UPDATE {} SET {}{}",
            quote_identifier(&self.table)?,
            sets.join(", "),
            where_clause
        )))
    }

    fn build_select(&self) -> Result<PreparedQuery, DatabaseError> {
        let select_list = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns
                .iter()
                .map(|c| quote_identifier(c))
                .collect::<Result<Vec<_>, _>>()?
                .join(", ")
        };

        let mut params = Params::default();
        let mut sql = format!("SELECT {} FROM {}", select_list, quote_identifier(&self.table)?);
        sql.push_str(&self.where_clause(&mut params, self.active_only)?);

        if let Some(window) = self.window {
            if window.offset < 0 || window.limit <= 0 {
                return Err(DatabaseError::InvalidArgument(format!(
                    "invalid pagination window offset={} limit={}",
                    window.offset, window.limit
                )));
            }
            let offset = params.push(SqlValue::Int(window.offset));
            let limit = params.push(SqlValue::Int(window.limit));
            sql.push_str(&format!(
                " ORDER BY {} DESC OFFSET {} LIMIT {}",
                quote_identifier(ID_COLUMN)?,
                offset,
                limit
            ));
        }

        Ok(params.finish(sql))
    }

    fn build_count(&self, require_conditions: bool) -> Result<PreparedQuery, DatabaseError> {
        if require_conditions && self.conditions.is_empty() {
            return Err(DatabaseError::InvalidArgument(format!(
                "no conditions provided for existence check on {}",
                self.table
            )));
        }

        let mut params = Params::default();
        let mut sql = format!("SELECT count(*) FROM {}", quote_identifier(&self.table)?);
        sql.push_str(&self.where_clause(&mut params, self.active_only)?);
        Ok(params.finish(sql))
    }

    fn build_delete(&self) -> Result<PreparedQuery, DatabaseError> {
        if self.conditions.is_empty() {
            return Err(DatabaseError::InvalidArgument(format!(
                "refusing unscoped delete from {}: no conditions provided",
                self.table
            )));
        }

        let mut params = Params::default();
        let where_clause = self.where_clause(&mut params, false)?;
        Ok(params.finish(format!("DELETE FROM {}{}", quote_identifier(&self.table)?, where_clause)))
    }

    /// ` WHERE a=$i AND b IS NULL [AND deleted_at IS NULL]`, or empty
    fn where_clause(&self, params: &mut Params, active_only: bool) -> Result<String, DatabaseError> {
        let mut clauses = Vec::with_capacity(self.conditions.len() + 1);
        for (column, value) in self.conditions.iter() {
            let column = quote_identifier(column)?;
            match value {
                SqlValue::Null => clauses.push(format!("{} IS NULL", column)),
                value => clauses.push(format!("{}={}", column, params.push(value.clone()))),
            }
        }
        if active_only {
            clauses.push(format!("{} IS NULL", quote_identifier(DELETED_AT_COLUMN)?));
        }

        if clauses.is_empty() {
            Ok(String::new())
        } else {
            Ok(format!(" WHERE {}", clauses.join(" AND ")))
        }
    }
}

/// Accumulates bound arguments and hands out the matching `$N`
#[derive(Default)]
struct Params {
    values: Vec<SqlValue>,
}

impl Params {
    fn push(&mut self, value: SqlValue) -> String {
        self.values.push(value);
        format!("${}", self.values.len())
    }

    /// Like `push`, but NULL is rendered inline so the column type decides
    fn bind(&mut self, value: &SqlValue) -> String {
        match value {
            SqlValue::Null => "NULL".to_string(),
            value => self.push(value.clone()),
        }
    }

    fn finish(self, sql: String) -> PreparedQuery {
        PreparedQuery { sql, params: self.values }
    }
}

/// Table and column names must be plain `[A-Za-z_][A-Za-z0-9_]*` identifiers
pub fn validate_identifier(name: &str) -> Result<(), DatabaseError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_') && name.len() <= 63
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(DatabaseError::InvalidArgument(format!("invalid identifier: {:?}", name)))
    }
}

fn quote_identifier(name: &str) -> Result<String, DatabaseError> {
    validate_identifier(name)?;
    Ok(format!("\"{}\"", name))
}
