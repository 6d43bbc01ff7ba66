use serde::Deserialize;

/// Default applied to a field when a create omits it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldDefault {
    /// A generator call such as `autoincrement()` or `uuid(7)`.
    Call(DefaultCall),

    /// A literal value, stored as written.
    Literal(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DefaultCall {
    kind: CallTag,
    pub function: Generator,
    #[serde(default)]
    pub args: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum CallTag {
    Call,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Generator {
    /// Assigned by the database.
    Autoincrement,
    Uuid,
    Ulid,
    Cuid,
    Nanoid,
    Now,
}

impl FieldDefault {
    /// Returns true when the database assigns the value itself.
    pub fn is_database_generated(&self) -> bool {
        matches!(
            self,
            FieldDefault::Call(DefaultCall {
                function: Generator::Autoincrement,
                ..
            })
        )
    }
}

impl DefaultCall {
    /// First numeric argument, e.g. the version in `uuid(7)`.
    pub fn int_arg(&self) -> Option<u64> {
        self.args.first().and_then(serde_json::Value::as_u64)
    }

    pub fn is(&self, generator: Generator) -> bool {
        self.kind == CallTag::Call && self.function == generator
    }
}
