//! Typed operation descriptors, parsed from the caller's JSON arguments.
//!
//! Everything a descriptor can say is validated here, before any statement
//! is compiled, so malformed input fails without touching the database.

mod aggregate;
pub(crate) use aggregate::{AggregateFunc, AggregateItem, Having};

mod data;
pub(crate) use data::{Data, NestedAction, NestedUpdate, NestedUpsert, ScalarWrite};

mod filter;
pub(crate) use filter::{Filter, RelationFilter, ScalarCond, ScalarFilter};

mod order;
pub(crate) use order::OrderBy;

mod select;
pub(crate) use select::{CountItem, ReadArgs, Selected, Selection};

use kiln_core::{Error, Result};

pub(crate) type Json = serde_json::Value;
pub(crate) type JsonMap = serde_json::Map<String, Json>;

/// The top-level argument object of an operation.
#[derive(Debug, Default)]
pub(crate) struct Args {
    map: JsonMap,
}

impl Args {
    pub(crate) fn new(value: Json) -> Result<Args> {
        match value {
            Json::Object(map) => Ok(Args { map }),
            Json::Null => Ok(Args::default()),
            other => Err(Error::invalid_argument(format!(
                "operation arguments must be an object, got `{other}`"
            ))),
        }
    }

    pub(crate) fn take(&mut self, key: &str) -> Option<Json> {
        self.map.remove(key)
    }

    /// Takes a required key.
    pub(crate) fn require(&mut self, key: &str) -> Result<Json> {
        self.take(key)
            .ok_or_else(|| Error::invalid_argument(format!("missing required argument `{key}`")))
    }

    pub(crate) fn take_bool(&mut self, key: &str) -> Result<bool> {
        match self.take(key) {
            None | Some(Json::Null) => Ok(false),
            Some(Json::Bool(value)) => Ok(value),
            Some(other) => Err(Error::invalid_argument(format!(
                "`{key}` must be a boolean, got `{other}`"
            ))),
        }
    }

    pub(crate) fn take_u64(&mut self, key: &str) -> Result<Option<u64>> {
        match self.take(key) {
            None | Some(Json::Null) => Ok(None),
            Some(value) => value.as_u64().map(Some).ok_or_else(|| {
                Error::invalid_argument(format!(
                    "`{key}` must be a non-negative integer, got `{value}`"
                ))
            }),
        }
    }

    pub(crate) fn take_i64(&mut self, key: &str) -> Result<Option<i64>> {
        match self.take(key) {
            None | Some(Json::Null) => Ok(None),
            Some(value) => value.as_i64().map(Some).ok_or_else(|| {
                Error::invalid_argument(format!("`{key}` must be an integer, got `{value}`"))
            }),
        }
    }

    /// Fails on any key no parser consumed.
    pub(crate) fn finish(self, context: &str) -> Result<()> {
        match self.map.keys().next() {
            Some(key) => Err(Error::invalid_argument(format!(
                "unknown argument `{key}` for {context}"
            ))),
            None => Ok(()),
        }
    }
}

impl From<JsonMap> for Args {
    fn from(map: JsonMap) -> Self {
        Args { map }
    }
}

/// Borrows `value` as an object, failing with a usage error naming `what`.
pub(crate) fn expect_object<'a>(value: &'a Json, what: &str) -> Result<&'a JsonMap> {
    value
        .as_object()
        .ok_or_else(|| Error::invalid_argument(format!("{what} must be an object, got `{value}`")))
}

/// Accepts a single item or a list of items.
pub(crate) fn one_or_many(value: Json) -> Vec<Json> {
    match value {
        Json::Array(items) => items,
        item => vec![item],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn leftover_keys_are_rejected() {
        let mut args = Args::new(json!({ "where": {}, "bogus": 1 })).unwrap();
        args.take("where");
        let err = args.finish("findMany").unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(err.to_string().contains("bogus"));
    }

    #[test]
    fn non_object_arguments() {
        assert!(Args::new(json!([1])).unwrap_err().is_invalid_argument());
        assert!(Args::new(Json::Null).is_ok());
    }

    #[test]
    fn numeric_arguments() {
        let mut args = Args::new(json!({ "skip": 2, "take": -3, "limit": "x" })).unwrap();
        assert_eq!(args.take_u64("skip").unwrap(), Some(2));
        assert_eq!(args.take_i64("take").unwrap(), Some(-3));
        assert!(args.take_u64("limit").is_err());
    }
}
