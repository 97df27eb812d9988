//! `Executor` implementation for `tokio_postgres::Client`.
//!
//! Statements produced by the mapper use `?` placeholders and backtick-quoted
//! identifiers; both are rewritten to PostgreSQL syntax (`$1..$n`, `"ident"`)
//! before preparation. Result rows are decoded eagerly into a
//! [`MemoryCursor`].
//!
//! ```ignore
//! let (client, connection) = tokio_postgres::connect(&url, tokio_postgres::NoTls).await?;
//! tokio::spawn(connection);
//!
//! let mapper = tablemap::Mapper::new(client);
//! let users: Vec<User> = mapper.select_all(&[tablemap::options::limit(10)]).await?;
//! ```

use crate::error::{OrmError, OrmResult};
use crate::executor::{ExecResult, Executor, MemoryCursor, Statement};
use crate::value::Value;
use bytes::BytesMut;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::error::Error;
use std::fmt::Write;
use std::future::Future;
use tokio_postgres::types::{FromSql, IsNull, ToSql, Type, to_sql_checked};
use tokio_postgres::{Client, Row};

/// Rewrite `?` placeholders to `$n` and backtick-quoted identifiers to
/// double-quoted ones. Quoted strings and identifiers are left alone.
pub fn to_postgres_sql(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut index = 0usize;
    let mut quote: Option<char> = None;

    for c in sql.chars() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
                out.push(if q == '`' { '"' } else { c });
            } else {
                out.push(c);
            }
            continue;
        }
        match c {
            '\'' | '"' => {
                quote = Some(c);
                out.push(c);
            }
            '`' => {
                quote = Some('`');
                out.push('"');
            }
            '?' => {
                index += 1;
                let _ = write!(out, "${index}");
            }
            _ => out.push(c),
        }
    }
    out
}

/// A statement prepared on a borrowed client.
pub struct PgStatement<'a> {
    client: &'a Client,
    statement: tokio_postgres::Statement,
}

fn as_params(params: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

impl Executor for Client {
    type Statement<'a> = PgStatement<'a>;

    fn prepare<'a>(
        &'a self,
        sql: &str,
    ) -> impl Future<Output = OrmResult<Self::Statement<'a>>> + Send {
        let sql = to_postgres_sql(sql);
        async move {
            let statement = Client::prepare(self, &sql)
                .await
                .map_err(|e| OrmError::Connection(e.to_string()))?;
            Ok(PgStatement {
                client: self,
                statement,
            })
        }
    }
}

impl Statement for PgStatement<'_> {
    type Rows = MemoryCursor;

    fn execute(&self, params: &[Value]) -> impl Future<Output = OrmResult<ExecResult>> + Send {
        async move {
            let refs = as_params(params);
            let rows_affected = self.client.execute(&self.statement, &refs).await?;
            Ok(ExecResult {
                rows_affected,
                last_insert_id: None,
            })
        }
    }

    fn query(&self, params: &[Value]) -> impl Future<Output = OrmResult<Self::Rows>> + Send {
        async move {
            let refs = as_params(params);
            let rows = self.client.query(&self.statement, &refs).await?;
            let columns = self
                .statement
                .columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect();
            let decoded = rows.iter().map(decode_row).collect::<OrmResult<Vec<_>>>()?;
            Ok(MemoryCursor::new(columns, decoded))
        }
    }
}

fn get<'a, T: FromSql<'a>>(row: &'a Row, idx: usize) -> OrmResult<Option<T>> {
    row.try_get::<usize, Option<T>>(idx)
        .map_err(|e| OrmError::scan(row.columns()[idx].name(), e.to_string()))
}

fn decode_column(row: &Row, idx: usize) -> OrmResult<Value> {
    let column = &row.columns()[idx];
    let ty = column.type_();

    let value = if *ty == Type::INT2 {
        get::<i16>(row, idx)?.map(|v| Value::Int(v.into()))
    } else if *ty == Type::INT4 {
        get::<i32>(row, idx)?.map(|v| Value::Int(v.into()))
    } else if *ty == Type::INT8 {
        get::<i64>(row, idx)?.map(Value::Int)
    } else if *ty == Type::OID {
        get::<u32>(row, idx)?.map(|v| Value::UInt(v.into()))
    } else if *ty == Type::FLOAT4 {
        get::<f32>(row, idx)?.map(|v| Value::Float(v.into()))
    } else if *ty == Type::FLOAT8 {
        get::<f64>(row, idx)?.map(Value::Float)
    } else if *ty == Type::BOOL {
        get::<bool>(row, idx)?.map(Value::from)
    } else if *ty == Type::TIMESTAMPTZ {
        get::<DateTime<Utc>>(row, idx)?.map(Value::Timestamp)
    } else if *ty == Type::TIMESTAMP {
        get::<NaiveDateTime>(row, idx)?.map(Value::from)
    } else if [Type::TEXT, Type::VARCHAR, Type::BPCHAR, Type::NAME, Type::UNKNOWN].contains(ty) {
        get::<String>(row, idx)?.map(Value::Text)
    } else {
        return Err(OrmError::scan(
            column.name(),
            format!("unsupported column type {ty}"),
        ));
    };

    Ok(value.unwrap_or(Value::Null))
}

fn decode_row(row: &Row) -> OrmResult<Vec<Value>> {
    (0..row.len()).map(|idx| decode_column(row, idx)).collect()
}

fn int_to_sql(
    v: i64,
    ty: &Type,
    out: &mut BytesMut,
) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
    if *ty == Type::INT2 {
        i16::try_from(v)?.to_sql(ty, out)
    } else if *ty == Type::INT4 {
        i32::try_from(v)?.to_sql(ty, out)
    } else if *ty == Type::OID {
        u32::try_from(v)?.to_sql(ty, out)
    } else if *ty == Type::BOOL {
        (v != 0).to_sql(ty, out)
    } else if *ty == Type::FLOAT8 {
        (v as f64).to_sql(ty, out)
    } else if *ty == Type::FLOAT4 {
        (v as f32).to_sql(ty, out)
    } else if *ty == Type::TEXT || *ty == Type::VARCHAR {
        v.to_string().to_sql(ty, out)
    } else {
        v.to_sql(ty, out)
    }
}

impl ToSql for Value {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Int(v) => int_to_sql(*v, ty, out),
            Value::UInt(v) => int_to_sql(i64::try_from(*v)?, ty, out),
            Value::Float(v) => {
                if *ty == Type::FLOAT4 {
                    (*v as f32).to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            Value::Text(s) => s.to_sql(ty, out),
            Value::Timestamp(t) => {
                if *ty == Type::TIMESTAMP {
                    t.naive_utc().to_sql(ty, out)
                } else {
                    t.to_sql(ty, out)
                }
            }
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}
