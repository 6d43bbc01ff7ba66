use chrono::{DateTime, NaiveDateTime, Utc};
use kiln_core::{
    stmt::{self, Value as CoreValue},
    Error, Result,
};
use rust_decimal::{
    prelude::{FromPrimitive, ToPrimitive},
    Decimal,
};
use tokio_postgres::{
    types::{private::BytesMut, to_sql_checked, FromSql, IsNull, Kind, ToSql, Type},
    Row,
};

type BoxError = Box<dyn std::error::Error + Sync + Send>;

/// A parameter bound to a prepared statement. Converts to whatever type the
/// server inferred for its placeholder.
#[derive(Debug)]
pub struct Value(CoreValue);

impl From<CoreValue> for Value {
    fn from(value: CoreValue) -> Self {
        Self(value)
    }
}

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> std::result::Result<IsNull, BoxError> {
        if let Kind::Array(_) = ty.kind() {
            return match &self.0 {
                CoreValue::Null => Ok(IsNull::Yes),
                CoreValue::List(items) => {
                    let items: Vec<Value> = items.iter().cloned().map(Value).collect();
                    items.to_sql(ty, out)
                }
                value => Err(format!("cannot bind {value:?} to array type {ty}").into()),
            };
        }

        if *ty == Type::JSON || *ty == Type::JSONB {
            return match &self.0 {
                CoreValue::Null => Ok(IsNull::Yes),
                CoreValue::Json(value) => value.to_sql(ty, out),
                value => value.to_json().to_sql(ty, out),
            };
        }

        match &self.0 {
            CoreValue::Null => Ok(IsNull::Yes),
            CoreValue::Bool(value) => value.to_sql(ty, out),
            CoreValue::I32(value) => int_to_sql(*value as i64, ty, out),
            CoreValue::I64(value) => int_to_sql(*value, ty, out),
            CoreValue::F64(value) => match *ty {
                Type::FLOAT4 => (*value as f32).to_sql(ty, out),
                Type::NUMERIC => Decimal::from_f64(*value)
                    .ok_or_else(|| format!("{value} is not a finite decimal"))?
                    .to_sql(ty, out),
                _ => value.to_sql(ty, out),
            },
            CoreValue::Decimal(value) => match *ty {
                Type::FLOAT8 => value.to_f64().unwrap_or_default().to_sql(ty, out),
                Type::TEXT | Type::VARCHAR => value.to_string().to_sql(ty, out),
                _ => value.to_sql(ty, out),
            },
            CoreValue::String(value) => match *ty {
                Type::NUMERIC => value.parse::<Decimal>()?.to_sql(ty, out),
                Type::TIMESTAMPTZ => DateTime::parse_from_rfc3339(value)?
                    .with_timezone(&Utc)
                    .to_sql(ty, out),
                _ => value.as_str().to_sql(ty, out),
            },
            CoreValue::Bytes(value) => value.as_slice().to_sql(ty, out),
            CoreValue::DateTime(value) => match *ty {
                Type::TIMESTAMP => value.naive_utc().to_sql(ty, out),
                Type::TEXT | Type::VARCHAR => value.to_rfc3339().to_sql(ty, out),
                _ => value.to_sql(ty, out),
            },
            value @ (CoreValue::Json(_) | CoreValue::List(_) | CoreValue::Object(_)) => {
                value.to_json().to_string().to_sql(ty, out)
            }
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

fn int_to_sql(value: i64, ty: &Type, out: &mut BytesMut) -> std::result::Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 => i16::try_from(value)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(value)?.to_sql(ty, out),
        Type::FLOAT4 => (value as f32).to_sql(ty, out),
        Type::FLOAT8 => (value as f64).to_sql(ty, out),
        Type::NUMERIC => Decimal::from(value).to_sql(ty, out),
        Type::TEXT | Type::VARCHAR => value.to_string().to_sql(ty, out),
        _ => value.to_sql(ty, out),
    }
}

/// Converts the column `index` of `row` to a Kiln value of type `expected`.
pub fn from_row(row: &Row, index: usize, expected: &stmt::Type) -> Result<CoreValue> {
    let ty = row.columns()[index].type_().clone();
    let value = match ty.kind() {
        Kind::Array(member) => match get::<Vec<Option<Cell>>>(row, index)? {
            Some(items) => CoreValue::List(
                items
                    .into_iter()
                    .map(|item| item.map(|cell| cell.into_value(member)).unwrap_or(Ok(CoreValue::Null)))
                    .collect::<Result<_>>()?,
            ),
            None => CoreValue::Null,
        },
        _ => match get::<Cell>(row, index)? {
            Some(cell) => cell.into_value(&ty)?,
            None => CoreValue::Null,
        },
    };
    coerce(value, expected)
}

fn get<'a, T: FromSql<'a>>(row: &'a Row, index: usize) -> Result<Option<T>> {
    row.try_get::<_, Option<T>>(index).map_err(Error::driver_operation_failed)
}

/// Raw column bytes, decoded once the member type is known.
struct Cell(Vec<u8>);

impl<'a> FromSql<'a> for Cell {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> std::result::Result<Self, BoxError> {
        Ok(Cell(raw.to_vec()))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

impl Cell {
    fn into_value(self, ty: &Type) -> Result<CoreValue> {
        let raw = &self.0[..];
        let value = match *ty {
            Type::BOOL => CoreValue::Bool(decode(ty, raw)?),
            Type::INT2 => CoreValue::I32(decode::<i16>(ty, raw)? as i32),
            Type::INT4 => CoreValue::I32(decode(ty, raw)?),
            Type::INT8 => CoreValue::I64(decode(ty, raw)?),
            Type::FLOAT4 => CoreValue::F64(decode::<f32>(ty, raw)? as f64),
            Type::FLOAT8 => CoreValue::F64(decode(ty, raw)?),
            Type::NUMERIC => CoreValue::Decimal(decode(ty, raw)?),
            Type::BYTEA => CoreValue::Bytes(decode(ty, raw)?),
            Type::TIMESTAMPTZ => CoreValue::DateTime(decode(ty, raw)?),
            Type::TIMESTAMP => CoreValue::DateTime(decode::<NaiveDateTime>(ty, raw)?.and_utc()),
            Type::JSON | Type::JSONB => CoreValue::Json(decode(ty, raw)?),
            _ => CoreValue::String(decode(ty, raw)?),
        };
        Ok(value)
    }
}

fn decode<'a, T: FromSql<'a>>(ty: &Type, raw: &'a [u8]) -> Result<T> {
    T::from_sql(ty, raw).map_err(|err| Error::type_conversion(err, std::any::type_name::<T>()))
}

/// Adjusts a decoded value to the type the engine asked for; aggregates in
/// particular come back wider than the column.
fn coerce(value: CoreValue, expected: &stmt::Type) -> Result<CoreValue> {
    use stmt::Type;

    Ok(match (value, expected) {
        (CoreValue::Null, _) => CoreValue::Null,
        (CoreValue::I64(v), Type::I32) => {
            CoreValue::I32(i32::try_from(v).map_err(|_| Error::type_conversion(v, "i32"))?)
        }
        (CoreValue::I32(v), Type::I64) => CoreValue::I64(v as i64),
        (CoreValue::I32(v), Type::F64) => CoreValue::F64(v as f64),
        (CoreValue::I64(v), Type::F64) => CoreValue::F64(v as f64),
        (CoreValue::I32(v), Type::Decimal) => CoreValue::Decimal(Decimal::from(v)),
        (CoreValue::I64(v), Type::Decimal) => CoreValue::Decimal(Decimal::from(v)),
        (CoreValue::F64(v), Type::Decimal) => {
            CoreValue::Decimal(Decimal::from_f64(v).ok_or_else(|| Error::type_conversion(v, "Decimal"))?)
        }
        (CoreValue::Decimal(v), Type::F64) => {
            CoreValue::F64(v.to_f64().ok_or_else(|| Error::type_conversion(v, "f64"))?)
        }
        (CoreValue::Decimal(v), Type::I64) => {
            CoreValue::I64(v.to_i64().ok_or_else(|| Error::type_conversion(v, "i64"))?)
        }
        (CoreValue::Decimal(v), Type::I32) => {
            CoreValue::I32(v.to_i32().ok_or_else(|| Error::type_conversion(v, "i32"))?)
        }
        (CoreValue::String(v), Type::Json) => CoreValue::Json(serde_json::from_str(&v)?),
        (CoreValue::String(v), Type::Decimal) => {
            CoreValue::Decimal(v.parse().map_err(|_| Error::type_conversion(&v, "Decimal"))?)
        }
        (CoreValue::List(items), Type::List(item)) => CoreValue::List(
            items
                .into_iter()
                .map(|value| coerce(value, item))
                .collect::<Result<_>>()?,
        ),
        (value, _) => value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregates_narrow_to_requested_type() {
        let sum = coerce(CoreValue::Decimal(Decimal::from(6)), &stmt::Type::I64).unwrap();
        assert_eq!(sum, CoreValue::I64(6));

        let count = coerce(CoreValue::I64(3), &stmt::Type::I32).unwrap();
        assert_eq!(count, CoreValue::I32(3));
    }

    #[test]
    fn out_of_range_narrowing_fails() {
        let err = coerce(CoreValue::I64(i64::MAX), &stmt::Type::I32).unwrap_err();
        assert!(err.is_type_conversion());
    }

    #[test]
    fn list_items_are_coerced() {
        let list = CoreValue::List(vec![CoreValue::I32(1), CoreValue::Null]);
        let value = coerce(list, &stmt::Type::list(stmt::Type::I64)).unwrap();
        assert_eq!(value, CoreValue::List(vec![CoreValue::I64(1), CoreValue::Null]));
    }

    #[test]
    fn binds_integers_to_inferred_width() {
        let mut out = BytesMut::new();
        Value::from(CoreValue::I64(7)).to_sql(&Type::INT4, &mut out).unwrap();
        assert_eq!(&out[..], &7i32.to_be_bytes());

        let mut out = BytesMut::new();
        assert!(Value::from(CoreValue::I64(i64::MAX))
            .to_sql(&Type::INT2, &mut out)
            .is_err());
    }
}
