//! Values generated for fields a create leaves out.

use super::coerce;

use chrono::{DateTime, SubsecRound, Utc};
use kiln_core::{
    schema::{DefaultCall, Field, FieldDefault, Generator},
    stmt::Value,
    Result, Schema,
};
use rand::{distributions::Slice, Rng};

use std::sync::atomic::{AtomicU32, Ordering};

const NANOID_ALPHABET: &[u8] = b"_-0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const NANOID_LEN: usize = 21;

/// The default for `field`, or `None` when it has none or the database
/// assigns it.
pub(crate) fn generate(schema: &Schema, field: &Field) -> Result<Option<Value>> {
    match &field.default {
        None => Ok(None),
        Some(FieldDefault::Literal(json)) => coerce::input(schema, field, json).map(Some),
        Some(FieldDefault::Call(call)) => Ok(call_default(call)),
    }
}

fn call_default(call: &DefaultCall) -> Option<Value> {
    Some(match call.function {
        Generator::Autoincrement => return None,
        Generator::Uuid if call.int_arg() == Some(7) => Value::String(uuid::Uuid::now_v7().to_string()),
        Generator::Uuid => Value::String(uuid::Uuid::new_v4().to_string()),
        Generator::Ulid => Value::String(ulid::Ulid::new().to_string()),
        Generator::Cuid => Value::String(cuid()),
        Generator::Nanoid => {
            let len = call.int_arg().and_then(|n| usize::try_from(n).ok()).unwrap_or(NANOID_LEN);
            Value::String(nanoid(len))
        }
        Generator::Now => Value::DateTime(now()),
    })
}

/// The current time at the millisecond precision every backend stores.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

fn nanoid(len: usize) -> String {
    let Ok(alphabet) = Slice::new(NANOID_ALPHABET) else {
        return String::new();
    };
    rand::thread_rng()
        .sample_iter(alphabet)
        .take(len)
        .map(|b| char::from(*b))
        .collect()
}

/// A collision-resistant id: `c`, then base-36 timestamp, counter,
/// process fingerprint and random blocks.
fn cuid() -> String {
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    const BLOCK: u64 = 36 * 36 * 36 * 36;

    let mut rng = rand::thread_rng();
    let millis = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
    let count = u64::from(COUNTER.fetch_add(1, Ordering::Relaxed)) % BLOCK;
    let fingerprint = u64::from(std::process::id()) % BLOCK;

    let mut out = String::with_capacity(25);
    out.push('c');
    out.push_str(&base36(millis, 8));
    out.push_str(&base36(count, 4));
    out.push_str(&base36(fingerprint, 4));
    out.push_str(&base36(rng.gen_range(0..BLOCK), 4));
    out.push_str(&base36(rng.gen_range(0..BLOCK), 4));
    out
}

/// Lowercase base-36, left-padded or truncated to the last `width` digits.
fn base36(mut n: u64, width: usize) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut digits = vec![b'0'; width];
    for slot in digits.iter_mut().rev() {
        *slot = DIGITS[(n % 36) as usize];
        n /= 36;
    }
    String::from_utf8(digits).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_util;

    #[test]
    fn autoincrement_is_left_to_the_database() {
        let schema = test_util::blog();
        let id = schema.require_model("User").unwrap().require_field("id").unwrap();
        assert_eq!(generate(&schema, id).unwrap(), None);
    }

    #[test]
    fn literal_defaults_are_coerced() {
        let schema = test_util::blog();
        let post = schema.require_model("Post").unwrap();
        let published = post.require_field("published").unwrap();
        assert_eq!(generate(&schema, published).unwrap(), Some(Value::Bool(false)));

        let score = schema.require_model("User").unwrap().require_field("score").unwrap();
        assert_eq!(generate(&schema, score).unwrap(), Some(Value::I32(0)));
    }

    #[test]
    fn uuid_version_follows_the_argument() {
        let schema = test_util::blog();
        let id = schema.require_model("Category").unwrap().require_field("id").unwrap();
        let Some(Value::String(text)) = generate(&schema, id).unwrap() else {
            panic!("expected a string id");
        };
        let parsed = uuid::Uuid::parse_str(&text).unwrap();
        assert_eq!(parsed.get_version_num(), 7);
    }

    #[test]
    fn now_has_millisecond_precision() {
        let schema = test_util::blog();
        let created = schema.require_model("Post").unwrap().require_field("createdAt").unwrap();
        let Some(Value::DateTime(at)) = generate(&schema, created).unwrap() else {
            panic!("expected a timestamp");
        };
        assert_eq!(at.timestamp_subsec_nanos() % 1_000_000, 0);
    }

    #[test]
    fn nanoid_shape() {
        let id = nanoid(NANOID_LEN);
        assert_eq!(id.len(), 21);
        assert!(id.bytes().all(|b| NANOID_ALPHABET.contains(&b)));
    }

    #[test]
    fn cuids_are_unique_and_shaped() {
        let a = cuid();
        let b = cuid();
        assert_ne!(a, b);
        assert_eq!(a.len(), 25);
        assert!(a.starts_with('c'));
        assert_eq!(base36(35, 2), "0z");
        assert_eq!(base36(36 * 36, 2), "00");
    }
}
