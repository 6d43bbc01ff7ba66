use crate::stmt::Type;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum FieldType {
    Scalar(ScalarType),

    /// Reference to a declared enum. Stored as text.
    Enum(String),

    /// Reference to another model: the field is a relation.
    Model(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    String,
    Boolean,
    Int,
    BigInt,
    Float,
    Decimal,
    DateTime,
    Json,
    Bytes,
}

impl From<String> for FieldType {
    fn from(name: String) -> FieldType {
        match ScalarType::from_name(&name) {
            Some(scalar) => FieldType::Scalar(scalar),
            // Enum references are told apart once the whole schema is known.
            None => FieldType::Model(name),
        }
    }
}

impl FieldType {
    pub fn model_name(&self) -> Option<&str> {
        match self {
            FieldType::Model(name) => Some(name),
            _ => None,
        }
    }

    pub fn scalar(&self) -> Option<ScalarType> {
        match self {
            FieldType::Scalar(scalar) => Some(*scalar),
            _ => None,
        }
    }

    /// Type of a single stored element.
    pub fn stmt_type(&self) -> Type {
        match self {
            FieldType::Scalar(scalar) => scalar.stmt_type(),
            FieldType::Enum(_) => Type::String,
            FieldType::Model(_) => Type::Json,
        }
    }
}

impl ScalarType {
    pub fn from_name(name: &str) -> Option<ScalarType> {
        Some(match name {
            "String" => ScalarType::String,
            "Boolean" => ScalarType::Boolean,
            "Int" => ScalarType::Int,
            "BigInt" => ScalarType::BigInt,
            "Float" => ScalarType::Float,
            "Decimal" => ScalarType::Decimal,
            "DateTime" => ScalarType::DateTime,
            "Json" => ScalarType::Json,
            "Bytes" => ScalarType::Bytes,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            ScalarType::String => "String",
            ScalarType::Boolean => "Boolean",
            ScalarType::Int => "Int",
            ScalarType::BigInt => "BigInt",
            ScalarType::Float => "Float",
            ScalarType::Decimal => "Decimal",
            ScalarType::DateTime => "DateTime",
            ScalarType::Json => "Json",
            ScalarType::Bytes => "Bytes",
        }
    }

    pub fn stmt_type(self) -> Type {
        match self {
            ScalarType::String => Type::String,
            ScalarType::Boolean => Type::Bool,
            ScalarType::Int => Type::I32,
            ScalarType::BigInt => Type::I64,
            ScalarType::Float => Type::F64,
            ScalarType::Decimal => Type::Decimal,
            ScalarType::DateTime => Type::DateTime,
            ScalarType::Json => Type::Json,
            ScalarType::Bytes => Type::Bytes,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            ScalarType::Int | ScalarType::BigInt | ScalarType::Float | ScalarType::Decimal
        )
    }
}
