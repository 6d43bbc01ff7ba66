use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use kiln_core::{
    stmt::{self, Value as CoreValue},
    Error, Result,
};
use rusqlite::{
    types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef},
    Row,
};
use rust_decimal::{prelude::FromPrimitive, Decimal};

#[derive(Debug)]
pub struct Value(CoreValue);

impl From<CoreValue> for Value {
    fn from(value: CoreValue) -> Self {
        Self(value)
    }
}

impl Value {
    /// Converts this SQLite driver value into the core Kiln value.
    pub fn into_inner(self) -> CoreValue {
        self.0
    }

    /// Converts a SQLite value within a row to a Kiln value of type `ty`.
    pub fn from_sql(row: &Row, index: usize, ty: &stmt::Type) -> Result<Self> {
        let value: SqlValue = row.get(index).map_err(Error::driver_operation_failed)?;

        let core_value = match value {
            SqlValue::Null => CoreValue::Null,
            SqlValue::Integer(value) => from_integer(value, ty)?,
            SqlValue::Real(value) => from_real(value, ty)?,
            SqlValue::Text(value) => from_text(value, ty)?,
            SqlValue::Blob(value) => match ty {
                stmt::Type::String => CoreValue::String(String::from_utf8_lossy(&value).into_owned()),
                _ => CoreValue::Bytes(value),
            },
        };

        Ok(Value(core_value))
    }
}

fn from_integer(value: i64, ty: &stmt::Type) -> Result<CoreValue> {
    Ok(match ty {
        stmt::Type::Bool => CoreValue::Bool(value != 0),
        stmt::Type::I32 => CoreValue::I32(i32::try_from(value).map_err(|_| Error::type_conversion(value, "i32"))?),
        stmt::Type::F64 => CoreValue::F64(value as f64),
        stmt::Type::Decimal => CoreValue::Decimal(Decimal::from(value)),
        stmt::Type::String => CoreValue::String(value.to_string()),
        stmt::Type::Json => CoreValue::Json(value.into()),
        _ => CoreValue::I64(value),
    })
}

fn from_real(value: f64, ty: &stmt::Type) -> Result<CoreValue> {
    Ok(match ty {
        stmt::Type::Decimal => {
            CoreValue::Decimal(Decimal::from_f64(value).ok_or_else(|| Error::type_conversion(value, "Decimal"))?)
        }
        stmt::Type::I32 if value.fract() == 0.0 => CoreValue::I32(value as i32),
        stmt::Type::I64 if value.fract() == 0.0 => CoreValue::I64(value as i64),
        stmt::Type::String => CoreValue::String(value.to_string()),
        stmt::Type::Json => serde_json::Number::from_f64(value)
            .map(|n| CoreValue::Json(n.into()))
            .unwrap_or(CoreValue::Null),
        _ => CoreValue::F64(value),
    })
}

fn from_text(value: String, ty: &stmt::Type) -> Result<CoreValue> {
    Ok(match ty {
        stmt::Type::DateTime => CoreValue::DateTime(parse_datetime(&value)?),
        stmt::Type::Decimal => CoreValue::Decimal(
            value
                .parse::<Decimal>()
                .or_else(|_| Decimal::from_scientific(&value))
                .map_err(|_| Error::type_conversion(&value, "Decimal"))?,
        ),
        stmt::Type::Json => CoreValue::Json(serde_json::from_str(&value)?),
        stmt::Type::List(item) => {
            let json: serde_json::Value = serde_json::from_str(&value)?;
            let serde_json::Value::Array(items) = json else {
                return Err(Error::type_conversion(value, "list"));
            };
            CoreValue::List(
                items
                    .into_iter()
                    .map(|item_json| typed_json(item_json, item))
                    .collect::<Result<_>>()?,
            )
        }
        stmt::Type::Bool => match value.as_str() {
            "1" | "true" => CoreValue::Bool(true),
            "0" | "false" => CoreValue::Bool(false),
            _ => return Err(Error::type_conversion(value, "bool")),
        },
        _ => CoreValue::String(value),
    })
}

/// Element of a list column, stored as a JSON array.
fn typed_json(json: serde_json::Value, ty: &stmt::Type) -> Result<CoreValue> {
    use serde_json::Value as Json;

    Ok(match (json, ty) {
        (Json::Null, _) => CoreValue::Null,
        (Json::String(value), stmt::Type::DateTime | stmt::Type::Decimal | stmt::Type::Bool) => {
            from_text(value, ty)?
        }
        (Json::Number(n), stmt::Type::Decimal) => CoreValue::Decimal(
            n.to_string()
                .parse::<Decimal>()
                .map_err(|_| Error::type_conversion(&n, "Decimal"))?,
        ),
        (Json::Number(n), _) if n.is_i64() => from_integer(n.as_i64().unwrap_or_default(), ty)?,
        (Json::Number(n), _) => from_real(n.as_f64().unwrap_or_default(), ty)?,
        (Json::Bool(value), _) => CoreValue::Bool(value),
        (json, stmt::Type::Json) => CoreValue::Json(json),
        (json, _) => CoreValue::from_json(json),
    })
}

/// Datetimes are written as RFC 3339; `CURRENT_TIMESTAMP` defaults produce
/// `YYYY-MM-DD HH:MM:SS` in UTC.
fn parse_datetime(value: &str) -> Result<DateTime<Utc>> {
    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Ok(datetime.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| Error::type_conversion(value, "DateTime"))
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        use stmt::Value;

        match &self.0 {
            Value::Null => Ok(ToSqlOutput::Owned(SqlValue::Null)),
            Value::Bool(v) => Ok(ToSqlOutput::Owned(SqlValue::Integer(*v as i64))),
            Value::I32(v) => Ok(ToSqlOutput::Owned(SqlValue::Integer(*v as i64))),
            Value::I64(v) => Ok(ToSqlOutput::Owned(SqlValue::Integer(*v))),
            Value::F64(v) => Ok(ToSqlOutput::Owned(SqlValue::Real(*v))),
            // Text keeps the full precision; the column's numeric affinity
            // converts it where that is lossless.
            Value::Decimal(v) => Ok(ToSqlOutput::Owned(SqlValue::Text(v.normalize().to_string()))),
            Value::String(v) => Ok(ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes()))),
            Value::Bytes(v) => Ok(ToSqlOutput::Borrowed(ValueRef::Blob(&v[..]))),
            Value::DateTime(v) => Ok(ToSqlOutput::Owned(SqlValue::Text(
                v.to_rfc3339_opts(SecondsFormat::Millis, true),
            ))),
            Value::Json(v) => Ok(ToSqlOutput::Owned(SqlValue::Text(v.to_string()))),
            value @ (Value::List(_) | Value::Object(_)) => {
                Ok(ToSqlOutput::Owned(SqlValue::Text(value.to_json().to_string())))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datetime_formats() {
        let rfc = parse_datetime("2024-03-01T10:20:30.123Z").unwrap();
        let sqlite = parse_datetime("2024-03-01 10:20:30.123").unwrap();
        assert_eq!(rfc, sqlite);
        assert!(parse_datetime("yesterday").is_err());
    }

    #[test]
    fn decimal_text_round_trips_exactly() {
        let value = from_text("100.10".to_string(), &stmt::Type::Decimal).unwrap();
        assert_eq!(value, CoreValue::Decimal("100.10".parse().unwrap()));
    }

    #[test]
    fn list_elements_follow_item_type() {
        let ty = stmt::Type::list(stmt::Type::I32);
        let value = from_text("[1,2,null]".to_string(), &ty).unwrap();
        assert_eq!(
            value,
            CoreValue::List(vec![CoreValue::I32(1), CoreValue::I32(2), CoreValue::Null])
        );
    }

    #[test]
    fn out_of_range_i32() {
        let err = from_integer(i64::MAX, &stmt::Type::I32).unwrap_err();
        assert!(err.is_type_conversion());
    }
}
