use super::Lower;
use crate::engine::{
    args::{Filter, RelationFilter, ScalarCond, ScalarFilter},
    dialect::StringMatch,
};

use kiln_core::{
    schema::{Field, Model},
    stmt::{Expr, Value},
    Result,
};

impl Lower<'_> {
    /// Lowers a filter over `model` rows aliased `alias`.
    pub(crate) fn filter(&mut self, model: &Model, alias: &str, filter: &Filter) -> Result<Expr> {
        Ok(match filter {
            Filter::And(filters) => {
                let mut operands = vec![];
                for filter in filters {
                    operands.push(self.filter(model, alias, filter)?);
                }
                Expr::and_from_vec(operands)
            }
            Filter::Or(filters) => {
                let mut operands = vec![];
                for filter in filters {
                    operands.push(self.filter(model, alias, filter)?);
                }
                Expr::or_from_vec(operands)
            }
            Filter::Not(filter) => Expr::not(self.filter(model, alias, filter)?),
            Filter::Scalar { field, filter } => {
                let field = model.require_field(field)?;
                let column = self.field_column(alias, field);
                self.scalar_filter(field, column, filter)?
            }
            Filter::Relation { field, filter } => {
                let field = model.require_field(field)?;
                self.relation_filter(model, alias, field, filter)?
            }
        })
    }

    /// Lowers an optional filter, `None` meaning every row.
    pub(crate) fn filter_opt(
        &mut self,
        model: &Model,
        alias: &str,
        filter: Option<&Filter>,
    ) -> Result<Option<Expr>> {
        match filter {
            Some(filter) if !filter.is_empty() => Ok(Some(self.filter(model, alias, filter)?)),
            _ => Ok(None),
        }
    }

    pub(crate) fn scalar_filter(
        &mut self,
        field: &Field,
        column: Expr,
        filter: &ScalarFilter,
    ) -> Result<Expr> {
        let mut operands = vec![];
        for cond in &filter.conds {
            operands.push(self.scalar_cond(field, column.clone(), cond, filter.insensitive)?);
        }
        Ok(Expr::and_from_vec(operands))
    }

    fn scalar_cond(
        &mut self,
        field: &Field,
        column: Expr,
        cond: &ScalarCond,
        insensitive: bool,
    ) -> Result<Expr> {
        let dialect = self.dialect;
        let fold = |column: Expr, value: &Value| match value {
            Value::String(_) if insensitive => (Expr::lower(column), Expr::lower(Expr::Value(value.clone()))),
            _ => (column, Expr::Value(value.clone())),
        };

        Ok(match cond {
            ScalarCond::Equals(Value::Null) => Expr::is_null(column),
            ScalarCond::Equals(value) if field.array => dialect.array_equals(column, value.clone()),
            ScalarCond::Equals(value @ Value::String(_)) if insensitive => {
                dialect.insensitive_eq(column, value.clone())
            }
            ScalarCond::Equals(value) => Expr::eq(column, value.clone()),
            ScalarCond::In(values) => {
                let (nulls, values): (Vec<_>, Vec<_>) = values.iter().partition(|v| v.is_null());
                let mut alternatives = vec![];
                if insensitive {
                    for value in values {
                        alternatives.push(dialect.insensitive_eq(column.clone(), value.clone()));
                    }
                } else if !values.is_empty() {
                    let list = values.into_iter().cloned().map(Expr::Value).collect();
                    alternatives.push(Expr::in_list(column.clone(), list));
                }
                if !nulls.is_empty() {
                    alternatives.push(Expr::is_null(column));
                }
                Expr::or_from_vec(alternatives)
            }
            ScalarCond::NotIn(values) => {
                let (nulls, values): (Vec<_>, Vec<_>) = values.iter().partition(|v| v.is_null());
                let list: Vec<_> = values.into_iter().cloned().map(Expr::Value).collect();
                let mut operands = vec![];
                if !list.is_empty() {
                    operands.push(Expr::not_in_list(column.clone(), list));
                }
                if !nulls.is_empty() {
                    operands.push(Expr::is_not_null(column));
                }
                Expr::and_from_vec(operands)
            }
            ScalarCond::Lt(value) => {
                let (lhs, rhs) = fold(column, value);
                Expr::lt(lhs, rhs)
            }
            ScalarCond::Lte(value) => {
                let (lhs, rhs) = fold(column, value);
                Expr::le(lhs, rhs)
            }
            ScalarCond::Gt(value) => {
                let (lhs, rhs) = fold(column, value);
                Expr::gt(lhs, rhs)
            }
            ScalarCond::Gte(value) => {
                let (lhs, rhs) = fold(column, value);
                Expr::ge(lhs, rhs)
            }
            ScalarCond::Not(inner) => {
                let mut inner = inner.clone();
                inner.insensitive |= insensitive;
                Expr::not(self.scalar_filter(field, column, &inner)?)
            }
            ScalarCond::Contains(needle) => {
                dialect.string_match(column, StringMatch::Contains, needle, insensitive)
            }
            ScalarCond::StartsWith(needle) => {
                dialect.string_match(column, StringMatch::StartsWith, needle, insensitive)
            }
            ScalarCond::EndsWith(needle) => {
                dialect.string_match(column, StringMatch::EndsWith, needle, insensitive)
            }
            ScalarCond::Has(Value::Null) => Expr::from(false),
            ScalarCond::Has(value) => {
                let alias = self.alias();
                dialect.array_has(column, value.clone(), &alias)
            }
            ScalarCond::HasEvery(values) if values.is_empty() => Expr::from(true),
            ScalarCond::HasEvery(values) => {
                let alias = self.alias();
                dialect.array_has_every(column, values.clone(), &alias)
            }
            ScalarCond::HasSome(values) if values.is_empty() => Expr::from(false),
            ScalarCond::HasSome(values) => {
                let alias = self.alias();
                dialect.array_has_some(column, values.clone(), &alias)
            }
            ScalarCond::IsEmpty(true) => dialect.array_is_empty(column),
            ScalarCond::IsEmpty(false) => Expr::not(dialect.array_is_empty(column)),
        })
    }

    fn relation_filter(
        &mut self,
        model: &Model,
        alias: &str,
        field: &Field,
        filter: &RelationFilter,
    ) -> Result<Expr> {
        let target = self.schema.relation_target(field)?;

        // A missing to-one on the side holding the key is a null key.
        let null_key = |this: &Self| -> Result<Option<Expr>> {
            if field.is_to_many() || this.schema.many_to_many(model, field)?.is_some() {
                return Ok(None);
            }
            let keys = this.schema.relation_keys(model, field)?;
            if !keys.owned_by_this() {
                return Ok(None);
            }
            let mut operands = vec![];
            for fk in keys.fk_fields() {
                operands.push(Expr::is_null(this.column(model, alias, fk)?));
            }
            Ok(Some(Expr::or_from_vec(operands)))
        };

        Ok(match filter {
            RelationFilter::Is(None) => match null_key(self)? {
                Some(is_null) => is_null,
                None => Expr::not_exists(self.related(model, alias, field)?.0),
            },
            RelationFilter::IsNot(None) => match null_key(self)? {
                Some(is_null) => Expr::not(is_null),
                None => Expr::exists(self.related(model, alias, field)?.0),
            },
            RelationFilter::Is(Some(inner)) => {
                Expr::exists(self.related_matching(model, alias, field, target, inner, false)?)
            }
            RelationFilter::IsNot(Some(inner)) => {
                Expr::not_exists(self.related_matching(model, alias, field, target, inner, false)?)
            }
            RelationFilter::Some(inner) => {
                let count = self.related_count(model, alias, field, target, inner, false)?;
                Expr::gt(count, 0i64)
            }
            RelationFilter::None(inner) => {
                let count = self.related_count(model, alias, field, target, inner, false)?;
                Expr::eq(count, 0i64)
            }
            RelationFilter::Every(inner) if inner.is_empty() => Expr::from(true),
            RelationFilter::Every(inner) => {
                let count = self.related_count(model, alias, field, target, inner, true)?;
                Expr::eq(count, 0i64)
            }
        })
    }

    fn related_matching(
        &mut self,
        model: &Model,
        alias: &str,
        field: &Field,
        target: &Model,
        inner: &Filter,
        negate: bool,
    ) -> Result<kiln_core::stmt::Select> {
        let (mut select, child) = self.related(model, alias, field)?;
        if let Some(expr) = self.filter_opt(target, &child, Some(inner))? {
            select.and_filter(if negate { Expr::not(expr) } else { expr });
        }
        Ok(select)
    }

    /// `(SELECT COUNT(*) FROM target WHERE link AND [NOT] inner)`.
    pub(crate) fn related_count(
        &mut self,
        model: &Model,
        alias: &str,
        field: &Field,
        target: &Model,
        inner: &Filter,
        negate: bool,
    ) -> Result<Expr> {
        let mut select = self.related_matching(model, alias, field, target, inner, negate)?;
        select.columns.clear();
        select.column(Expr::count_star(), "count");
        Ok(Expr::subquery(select))
    }
}
