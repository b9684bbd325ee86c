//! `tokio-postgres` integration.
//!
//! With the `postgres` feature, a [`Value`] can be passed directly as a
//! query parameter, typically from [`BuiltQuery::to_positional`](crate::BuiltQuery::to_positional):
//!
//! ```ignore
//! let (sql, values) = built.to_positional(PlaceholderStyle::Dollar);
//! let refs: Vec<&(dyn ToSql + Sync)> = values.iter().map(|v| v as _).collect();
//! client.query(&sql, &refs).await?;
//! ```

use std::error::Error;

use bytes::BytesMut;
use tokio_postgres::types::{IsNull, ToSql, Type};

use crate::value::Value;

type BoxError = Box<dyn Error + Sync + Send>;

fn int_to_sql(i: i64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 => i16::try_from(i)?.to_sql_checked(ty, out),
        Type::INT4 => i32::try_from(i)?.to_sql_checked(ty, out),
        Type::FLOAT4 => (i as f32).to_sql_checked(ty, out),
        Type::FLOAT8 => (i as f64).to_sql_checked(ty, out),
        _ => i.to_sql_checked(ty, out),
    }
}

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => b.to_sql_checked(ty, out),
            Value::Int(i) => int_to_sql(*i, ty, out),
            Value::UInt(u) => int_to_sql(i64::try_from(*u)?, ty, out),
            Value::Float(f) => match *ty {
                Type::FLOAT4 => (*f as f32).to_sql_checked(ty, out),
                _ => f.to_sql_checked(ty, out),
            },
            Value::String(s) => s.to_sql_checked(ty, out),
            Value::Bytes(b) => b.to_sql_checked(ty, out),
            Value::Json(j) => j.to_sql_checked(ty, out),
            Value::Date(d) => d.to_sql_checked(ty, out),
            Value::DateTime(dt) => dt.to_sql_checked(ty, out),
            Value::DateTimeUtc(dt) => dt.to_sql_checked(ty, out),
            Value::Uuid(u) => u.to_sql_checked(ty, out),
        }
    }

    // The wrapped value checks its own type in `to_sql`.
    fn accepts(_ty: &Type) -> bool {
        true
    }

    tokio_postgres::types::to_sql_checked!();
}
