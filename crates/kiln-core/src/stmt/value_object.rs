use super::Value;
use indexmap::IndexMap;
use std::ops;

/// An ordered map of field name to value: one shaped result row.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ValueObject {
    fields: IndexMap<String, Value>,
}

impl ValueObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(key.into(), value.into())
    }

    /// Removes `key`, preserving the order of the remaining fields.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.shift_remove(key)
    }

    /// Returns the value for `key`, or `Value::Null` when absent.
    pub fn get_or_null(&self, key: &str) -> &Value {
        const NULL: &Value = &Value::Null;
        self.fields.get(key).unwrap_or(NULL)
    }

    pub fn into_inner(self) -> IndexMap<String, Value> {
        self.fields
    }
}

impl ops::Deref for ValueObject {
    type Target = IndexMap<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.fields
    }
}

impl ops::DerefMut for ValueObject {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.fields
    }
}

impl From<IndexMap<String, Value>> for ValueObject {
    fn from(fields: IndexMap<String, Value>) -> Self {
        ValueObject { fields }
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for ValueObject {
    fn from_iter<T: IntoIterator<Item = (K, Value)>>(iter: T) -> Self {
        ValueObject {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl IntoIterator for ValueObject {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValueObject {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}
