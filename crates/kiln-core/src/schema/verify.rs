use super::{FieldType, Schema};
use crate::{Error, Result};

pub(super) fn verify(schema: &Schema) -> Result<()> {
    for model in schema.models.values() {
        if model.id_fields.is_empty() {
            return Err(Error::invalid_schema(format!("model `{}` has no id fields", model.name)));
        }

        for id in &model.id_fields {
            if model.field(id).is_none() {
                return Err(Error::invalid_schema(format!(
                    "model `{}` names unknown id field `{id}`",
                    model.name
                )));
            }
        }

        for (name, set) in &model.unique_fields {
            for field in set.fields() {
                if model.field(field).is_none() {
                    return Err(Error::invalid_schema(format!(
                        "unique set `{name}` on `{}` names unknown field `{field}`",
                        model.name
                    )));
                }
            }
        }

        if let Some(base) = &model.base_model {
            match schema.model(base) {
                Some(base) if base.is_delegate => {}
                Some(_) => {
                    return Err(Error::invalid_schema(format!(
                        "`{}` extends `{base}` which is not a delegate model",
                        model.name
                    )))
                }
                None => {
                    return Err(Error::invalid_schema(format!(
                        "`{}` extends unknown model `{base}`",
                        model.name
                    )))
                }
            }
        }

        if model.is_delegate && schema.discriminator(model).is_none() {
            return Err(Error::invalid_schema(format!(
                "delegate model `{}` has no discriminator field",
                model.name
            )));
        }

        for field in model.fields.values() {
            match &field.ty {
                FieldType::Model(target) => {
                    let target_model = schema.model(target).ok_or_else(|| {
                        Error::invalid_schema(format!(
                            "field `{}.{}` references unknown type `{target}`",
                            model.name, field.name
                        ))
                    })?;

                    let relation = field.relation.as_ref().ok_or_else(|| {
                        Error::invalid_schema(format!(
                            "relation field `{}.{}` has no relation information",
                            model.name, field.name
                        ))
                    })?;

                    for fk in &relation.fields {
                        if model.field(fk).is_none() {
                            return Err(Error::invalid_schema(format!(
                                "relation `{}.{}` names unknown foreign key `{fk}`",
                                model.name, field.name
                            )));
                        }
                    }
                    for pk in &relation.references {
                        if target_model.field(pk).is_none() {
                            return Err(Error::invalid_schema(format!(
                                "relation `{}.{}` references unknown field `{target}.{pk}`",
                                model.name, field.name
                            )));
                        }
                    }

                    if schema.many_to_many(model, field)?.is_none() {
                        schema.relation_keys(model, field)?;
                    }
                }
                FieldType::Enum(name) if !schema.enums.contains_key(name) => {
                    return Err(Error::invalid_schema(format!("unknown enum `{name}`")));
                }
                _ => {}
            }
        }
    }

    Ok(())
}
