use super::{AddForeignKey, ColumnDef, CreateTable, ForeignKey, Statement};

use kiln_core::{
    driver::Provider,
    schema::{Model, ReferentialAction, ScalarType, Schema},
    Result,
};

impl Statement {
    /// DDL creating every table of `schema`: one table per model (sub-models
    /// included) plus one per implicit many-to-many relation.
    ///
    /// SQLite cannot add constraints to existing tables, so foreign keys are
    /// declared inline there. Other providers get them as trailing `ALTER
    /// TABLE` statements so table order does not matter.
    pub fn create_schema(schema: &Schema, provider: Provider) -> Result<Vec<Statement>> {
        let inline_fks = provider == Provider::Sqlite;

        let mut tables = vec![];
        let mut constraints = vec![];

        for model in schema.models.values() {
            let mut table = create_model_table(schema, model)?;

            if !inline_fks {
                for (i, foreign_key) in table.foreign_keys.drain(..).enumerate() {
                    constraints.push(Statement::AddForeignKey(AddForeignKey {
                        name: format!("{}_fk{i}", table.name),
                        table: table.name.clone(),
                        foreign_key,
                    }));
                }
            }

            tables.push(Statement::CreateTable(table));
        }

        for mut table in join_tables(schema)? {
            if !inline_fks {
                for (i, foreign_key) in table.foreign_keys.drain(..).enumerate() {
                    constraints.push(Statement::AddForeignKey(AddForeignKey {
                        name: format!("{}_fk{i}", table.name),
                        table: table.name.clone(),
                        foreign_key,
                    }));
                }
            }
            tables.push(Statement::CreateTable(table));
        }

        tables.extend(constraints);
        Ok(tables)
    }
}

fn create_model_table(schema: &Schema, model: &Model) -> Result<CreateTable> {
    let columns = model.table_columns().map(ColumnDef::from_field).collect();

    let unique = model
        .unique_fields
        .values()
        .map(|set| set.fields().to_vec())
        .filter(|fields| fields != &model.id_fields)
        // Constraints over inherited columns live on the base table.
        .filter(|fields| {
            fields.iter().all(|name| {
                model
                    .field(name)
                    .is_some_and(|field| !field.is_inherited() || field.id)
            })
        })
        .collect();

    let mut foreign_keys = vec![];

    // Sub-model rows share their id with the base row and go away with it.
    if let Some(base) = model.base_model.as_deref() {
        foreign_keys.push(ForeignKey {
            columns: model.id_fields.clone(),
            references_table: base.to_string(),
            references_columns: schema.require_model(base)?.id_fields.clone(),
            on_delete: Some(ReferentialAction::Cascade),
            on_update: Some(ReferentialAction::Cascade),
        });
    }

    for field in model.relation_fields().filter(|field| !field.is_inherited()) {
        let Some(relation) = &field.relation else {
            continue;
        };
        if relation.fields.is_empty() {
            continue;
        }

        let target = schema.relation_target(field)?;
        let optional = relation
            .fields
            .iter()
            .any(|name| model.field(name).is_some_and(|f| f.optional));

        foreign_keys.push(ForeignKey {
            columns: relation.fields.clone(),
            references_table: target.table_name().to_string(),
            references_columns: relation.references.clone(),
            on_delete: Some(relation.on_delete.unwrap_or(if optional {
                ReferentialAction::SetNull
            } else {
                ReferentialAction::Restrict
            })),
            on_update: Some(relation.on_update.unwrap_or(ReferentialAction::Cascade)),
        });
    }

    Ok(CreateTable {
        name: model.table_name().to_string(),
        columns,
        primary_key: model.id_fields.clone(),
        unique,
        foreign_keys,
    })
}

fn join_tables(schema: &Schema) -> Result<Vec<CreateTable>> {
    let mut tables: Vec<CreateTable> = vec![];

    for model in schema.models.values() {
        for field in model.relation_fields().filter(|field| !field.is_inherited()) {
            let Some(m2m) = schema.many_to_many(model, field)? else {
                continue;
            };
            if tables.iter().any(|table| table.name == m2m.join_table) {
                continue;
            }

            let target = schema.relation_target(field)?;
            let id_type = |m: &Model, id: &str| {
                m.field(id)
                    .and_then(|field| field.ty.scalar())
                    .unwrap_or(ScalarType::String)
            };

            let mut sides = [
                (m2m.parent_column, model, m2m.parent_id.as_str()),
                (m2m.other_column, target, m2m.other_id.as_str()),
            ];
            sides.sort_by_key(|(column, ..)| *column);

            let columns = sides
                .iter()
                .map(|(column, m, id)| ColumnDef::new(*column, id_type(m, id)))
                .collect();

            let foreign_keys = sides
                .iter()
                .map(|(column, m, id)| ForeignKey {
                    columns: vec![column.to_string()],
                    references_table: m.table_name().to_string(),
                    references_columns: vec![id.to_string()],
                    on_delete: Some(ReferentialAction::Cascade),
                    on_update: Some(ReferentialAction::Cascade),
                })
                .collect();

            tables.push(CreateTable {
                name: m2m.join_table,
                columns,
                primary_key: vec![],
                unique: vec![vec!["A".to_string(), "B".to_string()]],
                foreign_keys,
            });
        }
    }

    Ok(tables)
}
