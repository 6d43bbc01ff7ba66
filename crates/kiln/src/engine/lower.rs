//! Lowers typed descriptors into statement trees.
//!
//! Every model read is aliased `t0`, `t1`, ...; delegate base tables joined
//! to a model are aliased `{alias}${Base}` and sub-model tables of a
//! polymorphic read `{alias}${Sub}`.

mod aggregate;

mod filter;

mod order;

mod project;
pub(crate) use project::{count_key, sub_model_key, Column};

mod read;
pub(crate) use read::{InMemory, Query};

mod source;

use super::dialect::{self, Dialect};

use kiln_core::{
    driver::Capability,
    schema::Field,
    stmt::Type,
    Schema,
};

pub(crate) struct Lower<'a> {
    pub(crate) schema: &'a Schema,
    pub(crate) capability: &'static Capability,
    pub(crate) dialect: &'static dyn Dialect,
    next_alias: usize,
}

impl<'a> Lower<'a> {
    pub(crate) fn new(schema: &'a Schema, capability: &'static Capability) -> Lower<'a> {
        Lower {
            schema,
            capability,
            dialect: dialect::for_provider(capability.provider),
            next_alias: 0,
        }
    }

    pub(crate) fn alias(&mut self) -> String {
        let alias = format!("t{}", self.next_alias);
        self.next_alias += 1;
        alias
    }
}

/// Storage type of a field as the driver should decode it.
pub(crate) fn field_type(field: &Field) -> Type {
    let element = field.ty.stmt_type();
    if field.array {
        Type::list(element)
    } else {
        element
    }
}

#[cfg(test)]
mod tests;
