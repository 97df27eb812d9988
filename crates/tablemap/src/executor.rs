//! The execution boundary consumed by the mapper.
//!
//! Drivers implement [`Executor`] (statement preparation), [`Statement`]
//! (execute / query with positional `?` parameters) and [`RowCursor`]
//! (column names, row iteration, scanning). Dropping any returned future
//! cancels the call; the mapper adds no timeouts or retries of its own.

use crate::error::{OrmError, OrmResult};
use crate::value::Value;
use std::collections::VecDeque;
use std::future::Future;

/// Outcome of a non-query statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
    /// Generated key of the inserted row, when the driver reports one.
    pub last_insert_id: Option<i64>,
}

/// Cursor over a query's result rows.
pub trait RowCursor: Send {
    /// Result column names, in result order.
    fn column_names(&self) -> &[String];

    /// Advance to the next row; `false` once the rows are exhausted.
    fn next(&mut self) -> bool;

    /// Values of the current row, one per column.
    fn scan(&mut self) -> OrmResult<Vec<Value>>;

    /// Release the cursor.
    fn close(self)
    where
        Self: Sized,
    {
    }
}

/// A prepared statement.
pub trait Statement: Send + Sync {
    type Rows: RowCursor;

    /// Execute the statement, failing with `OrmError::Execution`.
    fn execute(&self, params: &[Value]) -> impl Future<Output = OrmResult<ExecResult>> + Send;

    /// Run the statement as a query, failing with `OrmError::Execution`.
    fn query(&self, params: &[Value]) -> impl Future<Output = OrmResult<Self::Rows>> + Send;
}

/// A connection (or anything that behaves like one) able to prepare statements.
pub trait Executor: Send + Sync {
    type Statement<'a>: Statement
    where
        Self: 'a;

    /// Prepare `sql`, failing with `OrmError::Connection`.
    fn prepare<'a>(
        &'a self,
        sql: &str,
    ) -> impl Future<Output = OrmResult<Self::Statement<'a>>> + Send;
}

impl<X: Executor> Executor for &X {
    type Statement<'a>
        = X::Statement<'a>
    where
        Self: 'a;

    fn prepare<'a>(
        &'a self,
        sql: &str,
    ) -> impl Future<Output = OrmResult<Self::Statement<'a>>> + Send {
        (**self).prepare(sql)
    }
}

/// A fully materialized result set.
///
/// Drivers that fetch all rows up front can return this directly.
#[derive(Debug, Clone, Default)]
pub struct MemoryCursor {
    columns: Vec<String>,
    rows: VecDeque<Vec<Value>>,
    current: Option<Vec<Value>>,
}

impl MemoryCursor {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            rows: rows.into(),
            current: None,
        }
    }

    /// Number of rows not yet consumed.
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

impl RowCursor for MemoryCursor {
    fn column_names(&self) -> &[String] {
        &self.columns
    }

    fn next(&mut self) -> bool {
        self.current = self.rows.pop_front();
        self.current.is_some()
    }

    fn scan(&mut self) -> OrmResult<Vec<Value>> {
        let row = self
            .current
            .as_ref()
            .ok_or_else(|| OrmError::scan("*", "scan called without a current row"))?;
        if row.len() != self.columns.len() {
            return Err(OrmError::scan(
                "*",
                format!("row has {} values for {} columns", row.len(), self.columns.len()),
            ));
        }
        Ok(row.clone())
    }
}
