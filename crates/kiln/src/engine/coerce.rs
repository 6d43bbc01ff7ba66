//! Converting caller JSON into typed statement values, and back.

use super::args::Json;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use kiln_core::{
    schema::{Field, FieldType, ScalarType},
    stmt::Value,
    Error, Result, Schema,
};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Coerces a field value, honoring list fields.
pub(crate) fn input(schema: &Schema, field: &Field, json: &Json) -> Result<Value> {
    match json {
        Json::Null => Ok(Value::Null),
        Json::Array(items) if field.array => items
            .iter()
            .map(|item| element(schema, field, item))
            .collect::<Result<Vec<_>>>()
            .map(Value::List),
        _ if field.array && field.ty.scalar() != Some(ScalarType::Json) => Err(mismatch(field, json)),
        _ => element(schema, field, json),
    }
}

/// Coerces a single element of a field, ignoring `array`.
pub(crate) fn element(schema: &Schema, field: &Field, json: &Json) -> Result<Value> {
    if json.is_null() {
        return Ok(Value::Null);
    }

    let value = match &field.ty {
        FieldType::Scalar(scalar) => scalar_value(*scalar, json),
        FieldType::Enum(name) => match (json.as_str(), schema.enums.get(name)) {
            (Some(variant), Some(def)) if def.contains(variant) => Some(Value::from(variant)),
            (Some(variant), Some(_)) => {
                return Err(Error::invalid_argument(format!(
                    "`{variant}` is not a variant of enum `{name}` (field `{}`)",
                    field.name
                )))
            }
            _ => None,
        },
        FieldType::Model(_) => {
            return Err(Error::invalid_argument(format!(
                "relation field `{}` cannot be used as a value",
                field.name
            )))
        }
    };

    value.ok_or_else(|| mismatch(field, json))
}

fn scalar_value(scalar: ScalarType, json: &Json) -> Option<Value> {
    Some(match scalar {
        ScalarType::String => Value::from(json.as_str()?),
        ScalarType::Boolean => Value::Bool(json.as_bool()?),
        ScalarType::Int => Value::I32(i32::try_from(json.as_i64()?).ok()?),
        ScalarType::BigInt => match json {
            Json::String(text) => Value::I64(text.parse().ok()?),
            _ => Value::I64(json.as_i64()?),
        },
        ScalarType::Float => Value::F64(json.as_f64()?),
        ScalarType::Decimal => Value::Decimal(decimal(json)?),
        ScalarType::DateTime => Value::DateTime(datetime(json.as_str()?)?),
        ScalarType::Json => Value::Json(json.clone()),
        ScalarType::Bytes => Value::Bytes(STANDARD.decode(json.as_str()?).ok()?),
    })
}

fn mismatch(field: &Field, json: &Json) -> Error {
    let expected = match &field.ty {
        FieldType::Scalar(scalar) => format!("{scalar:?}"),
        FieldType::Enum(name) | FieldType::Model(name) => name.clone(),
    };
    let expected = if field.array {
        format!("{expected}[]")
    } else {
        expected
    };
    Error::invalid_argument(format!(
        "invalid value for field `{}`: expected {expected}, got `{json}`",
        field.name
    ))
}

/// Decimals arrive as strings (exact) or numbers.
pub(crate) fn decimal(json: &Json) -> Option<Decimal> {
    match json {
        Json::String(text) => Decimal::from_str(text)
            .or_else(|_| Decimal::from_scientific(text))
            .ok(),
        Json::Number(number) => {
            let text = number.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .ok()
        }
        _ => None,
    }
}

/// Accepts RFC 3339, naive `YYYY-MM-DD HH:MM:SS[.fff]` (read as UTC) and
/// bare dates.
pub(crate) fn datetime(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    // Offsets without a colon, as PostgreSQL renders them in JSON.
    if let Ok(parsed) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Decodes the hex text backends produce for binary columns inside JSON.
pub(crate) fn hex_decode(text: &str) -> Option<Vec<u8>> {
    let text = text.strip_prefix("\\x").unwrap_or(text);
    if text.len() % 2 != 0 {
        return None;
    }
    (0..text.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(text.get(i..i + 2)?, 16).ok())
        .collect()
}
