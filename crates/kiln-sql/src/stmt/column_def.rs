use kiln_core::schema::{Field, ScalarType};

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub ty: ColumnType,
    pub nullable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnType {
    pub scalar: ScalarType,

    /// Scalar lists. Native on PostgreSQL, JSON text elsewhere.
    pub array: bool,

    pub auto_increment: bool,
}

impl ColumnDef {
    /// Column for a non-relation field. Enums are stored as text.
    pub fn from_field(field: &Field) -> ColumnDef {
        let scalar = field.ty.scalar().unwrap_or(ScalarType::String);
        let auto_increment = field
            .default
            .as_ref()
            .is_some_and(|default| default.is_database_generated());

        ColumnDef {
            name: field.name.clone(),
            ty: ColumnType {
                scalar,
                array: field.array,
                auto_increment,
            },
            nullable: field.optional && !field.id,
        }
    }

    pub fn new(name: impl Into<String>, scalar: ScalarType) -> ColumnDef {
        ColumnDef {
            name: name.into(),
            ty: ColumnType {
                scalar,
                array: false,
                auto_increment: false,
            },
            nullable: false,
        }
    }
}
