//! # Query Builder
//!
//! [`FilterQuery`] wraps a Sea-ORM [`Select`] and only ever narrows it: every
//! method consumes the query and returns a refined one, so a query handed to
//! a filter can never be observed half-modified.
//!
//! Fields are addressed by name. A bare name (`title`) refers to a column of
//! the base entity; a dotted name (`sections.id`) refers to a column of a
//! relation registered on the [`QuerySchema`], which must be joined before it
//! can be filtered on.
//!
//! ```rust,ignore
//! let schema = Arc::new(
//!     QuerySchema::of::<course::Entity>()
//!         .with_relation::<section::Entity>("sections", || course::Relation::Sections.def()),
//! );
//!
//! let query = FilterQuery::new(schema)
//!     .join("sections")?
//!     .where_in("sections.id", &["3", "4"])?
//!     .include_related("sections")?;
//! ```

use sea_orm::{
    ColumnTrait, ColumnType, Condition, ConnectionTrait, DbBackend, DbErr, EntityTrait,
    IdenStatic, Iterable, JoinType, QueryFilter, QuerySelect, QueryTrait,
    RelationDef, RelationType, Select, Statement, Value,
    sea_query::{Alias, Expr, Func, LikeExpr, SimpleExpr},
};
use std::sync::Arc;
use uuid::Uuid;

use crate::errors::FilterError;

/// Escape LIKE wildcards so user terms match literally.
/// Escapes: % (match any) and _ (match single char)
fn escape_like_wildcards(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub column_type: ColumnType,
}

fn fields_of<E: EntityTrait>() -> Vec<FieldDef> {
    <E::Column as Iterable>::iter()
        .map(|column| FieldDef {
            name: column.as_str().to_string(),
            column_type: column.def().get_column_type().clone(),
        })
        .collect()
}

/// A relation the query may join, with the columns it exposes.
#[derive(Debug, Clone)]
pub struct RelationSchema {
    pub name: &'static str,
    pub table: String,
    pub fields: Vec<FieldDef>,
    relate: fn() -> RelationDef,
    has_many: bool,
}

impl RelationSchema {
    #[must_use]
    pub const fn is_has_many(&self) -> bool {
        self.has_many
    }
}

/// The fields and relations a [`FilterQuery`] may reference.
///
/// Built once at startup and shared between requests.
#[derive(Debug, Clone)]
pub struct QuerySchema {
    table: String,
    fields: Vec<FieldDef>,
    relations: Vec<RelationSchema>,
    searchable: Vec<String>,
}

/// A field name resolved against the schema.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedField<'a> {
    pub relation: Option<&'a RelationSchema>,
    pub table: &'a str,
    pub column: &'a str,
    pub column_type: &'a ColumnType,
}

impl QuerySchema {
    /// Schema for the base entity `E`, with no relations.
    #[must_use]
    pub fn of<E: EntityTrait>() -> Self {
        Self {
            table: E::default().table_name().to_string(),
            fields: fields_of::<E>(),
            relations: Vec::new(),
            searchable: Vec::new(),
        }
    }

    /// Register a joinable relation to entity `R` under `name`.
    ///
    /// `relate` returns the Sea-ORM relation definition from the base entity
    /// to `R`, typically `|| Relation::Sections.def()`.
    #[must_use]
    pub fn with_relation<R: EntityTrait>(
        mut self,
        name: &'static str,
        relate: fn() -> RelationDef,
    ) -> Self {
        let has_many = matches!(relate().rel_type, RelationType::HasMany);
        self.relations.push(RelationSchema {
            name,
            table: R::default().table_name().to_string(),
            fields: fields_of::<R>(),
            relate,
            has_many,
        });
        self
    }

    /// Declare the fields free-text search matches against.
    #[must_use]
    pub fn searchable(mut self, fields: &[&str]) -> Self {
        self.searchable = fields.iter().map(|f| (*f).to_string()).collect();
        self
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub fn relation(&self, name: &str) -> Option<&RelationSchema> {
        self.relations.iter().find(|r| r.name == name)
    }

    #[must_use]
    pub fn searchable_fields(&self) -> &[String] {
        &self.searchable
    }

    /// Look up a bare or dotted field name.
    ///
    /// # Errors
    ///
    /// `InvalidFilterTarget` if the relation or column does not exist.
    pub fn resolve(&self, field: &str) -> Result<ResolvedField<'_>, FilterError> {
        match field.split_once('.') {
            Some((relation_name, column)) => {
                let relation = self.relation(relation_name).ok_or_else(|| {
                    FilterError::invalid_target(field, format!("unknown relation '{relation_name}'"))
                })?;
                let def = relation
                    .fields
                    .iter()
                    .find(|f| f.name == column)
                    .ok_or_else(|| {
                        FilterError::invalid_target(
                            field,
                            format!("relation '{relation_name}' has no column '{column}'"),
                        )
                    })?;
                Ok(ResolvedField {
                    relation: Some(relation),
                    table: &relation.table,
                    column: &def.name,
                    column_type: &def.column_type,
                })
            }
            None => {
                let def = self.fields.iter().find(|f| f.name == field).ok_or_else(|| {
                    FilterError::invalid_target(
                        field,
                        format!("table '{}' has no column '{field}'", self.table),
                    )
                })?;
                Ok(ResolvedField {
                    relation: None,
                    table: &self.table,
                    column: &def.name,
                    column_type: &def.column_type,
                })
            }
        }
    }

    /// Check that every searchable field resolves.
    ///
    /// # Errors
    ///
    /// The first `InvalidFilterTarget` found.
    pub fn validate(&self) -> Result<(), FilterError> {
        for field in &self.searchable {
            self.resolve(field)?;
        }
        Ok(())
    }
}

/// Convert a raw parameter value to the Sea-ORM value for `column_type`.
fn coerce(field: &str, raw: &str, column_type: &ColumnType) -> Result<Value, FilterError> {
    let raw = raw.trim();
    match column_type {
        ColumnType::TinyInteger
        | ColumnType::SmallInteger
        | ColumnType::Integer
        | ColumnType::BigInteger => raw
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| FilterError::malformed(field, raw, "an integer")),
        ColumnType::TinyUnsigned
        | ColumnType::SmallUnsigned
        | ColumnType::Unsigned
        | ColumnType::BigUnsigned => raw
            .parse::<u64>()
            .map(Value::from)
            .map_err(|_| FilterError::malformed(field, raw, "a non-negative integer")),
        ColumnType::Float | ColumnType::Double | ColumnType::Decimal(_) => raw
            .parse::<f64>()
            .map(Value::from)
            .map_err(|_| FilterError::malformed(field, raw, "a number")),
        ColumnType::Boolean => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(Value::from(true)),
            "false" | "0" => Ok(Value::from(false)),
            _ => Err(FilterError::malformed(field, raw, "a boolean")),
        },
        ColumnType::Uuid => Uuid::parse_str(raw)
            .map(Value::from)
            .map_err(|_| FilterError::malformed(field, raw, "a UUID")),
        _ => Ok(Value::from(raw.to_string())),
    }
}

/// A progressively narrowed query over entity `E`.
#[derive(Debug, Clone)]
pub struct FilterQuery<E: EntityTrait> {
    select: Select<E>,
    schema: Arc<QuerySchema>,
    joined: Vec<&'static str>,
    includes: Vec<&'static str>,
}

impl<E: EntityTrait> FilterQuery<E> {
    /// The unfiltered query: every row of `E`.
    #[must_use]
    pub fn new(schema: Arc<QuerySchema>) -> Self {
        Self {
            select: E::find(),
            schema,
            joined: Vec::new(),
            includes: Vec::new(),
        }
    }

    #[must_use]
    pub fn schema(&self) -> &QuerySchema {
        &self.schema
    }

    /// Relations joined so far, in join order.
    #[must_use]
    pub fn joined(&self) -> &[&'static str] {
        &self.joined
    }

    /// Relations to load alongside the result rows.
    #[must_use]
    pub fn includes(&self) -> &[&'static str] {
        &self.includes
    }

    #[must_use]
    pub fn is_included(&self, relation: &str) -> bool {
        self.includes.contains(&relation)
    }

    /// Inner-join a registered relation. Joining twice is a no-op.
    ///
    /// Has-many joins make the query `DISTINCT` so parent rows stay unique.
    ///
    /// # Errors
    ///
    /// `InvalidFilterTarget` if the relation is not registered.
    pub fn join(self, relation: &str) -> Result<Self, FilterError> {
        self.join_as(relation, JoinType::InnerJoin)
    }

    /// Left-join a registered relation, keeping rows that have no related
    /// row. A relation already joined keeps its existing join.
    ///
    /// # Errors
    ///
    /// `InvalidFilterTarget` if the relation is not registered.
    pub fn left_join(self, relation: &str) -> Result<Self, FilterError> {
        self.join_as(relation, JoinType::LeftJoin)
    }

    fn join_as(mut self, relation: &str, join_type: JoinType) -> Result<Self, FilterError> {
        let schema = Arc::clone(&self.schema);
        let rel = schema
            .relation(relation)
            .ok_or_else(|| FilterError::invalid_target(relation, "unknown relation"))?;

        if self.joined.contains(&rel.name) {
            return Ok(self);
        }

        self.select = self.select.join(join_type, (rel.relate)());
        if rel.is_has_many() {
            self.select = self.select.distinct();
        }
        self.joined.push(rel.name);
        Ok(self)
    }

    fn membership<S: AsRef<str>>(&self, field: &str, values: &[S]) -> Result<SimpleExpr, FilterError> {
        let resolved = self.schema.resolve(field)?;
        if let Some(rel) = resolved.relation
            && !self.joined.contains(&rel.name)
        {
            return Err(FilterError::invalid_target(
                field,
                format!("relation '{}' is not joined", rel.name),
            ));
        }

        let mut coerced = values
            .iter()
            .map(|v| coerce(field, v.as_ref(), resolved.column_type))
            .collect::<Result<Vec<_>, _>>()?;

        let column = Expr::col((Alias::new(resolved.table), Alias::new(resolved.column)));
        match (coerced.pop(), coerced.is_empty()) {
            (None, _) => Err(FilterError::malformed(field, "", "at least one value")),
            (Some(only), true) => Ok(column.eq(only)),
            (Some(last), false) => {
                coerced.push(last);
                Ok(column.is_in(coerced))
            }
        }
    }

    /// Keep rows whose `field` equals one of `values`.
    ///
    /// # Errors
    ///
    /// `InvalidFilterTarget` for unknown or unjoined fields,
    /// `MalformedParameter` if a value does not fit the column type or
    /// `values` is empty.
    pub fn where_in<S: AsRef<str>>(mut self, field: &str, values: &[S]) -> Result<Self, FilterError> {
        let expr = self.membership(field, values)?;
        self.select = self.select.filter(expr);
        Ok(self)
    }

    /// Keep rows matching any one of the `(field, values)` clauses.
    ///
    /// All clauses go into a single `OR` condition. No clauses is a no-op.
    ///
    /// # Errors
    ///
    /// As [`FilterQuery::where_in`], for the first failing clause.
    pub fn where_any<F, S>(mut self, clauses: &[(F, Vec<S>)]) -> Result<Self, FilterError>
    where
        F: AsRef<str>,
        S: AsRef<str>,
    {
        if clauses.is_empty() {
            return Ok(self);
        }

        let mut any = Condition::any();
        for (field, values) in clauses {
            any = any.add(self.membership(field.as_ref(), values)?);
        }
        self.select = self.select.filter(any);
        Ok(self)
    }

    /// Keep rows where every term appears in at least one searchable field.
    ///
    /// Relations referenced by searchable fields are left-joined first, so a
    /// row with no related rows can still match on its own fields. Matching
    /// is case-insensitive substring matching. An empty term list is a no-op.
    ///
    /// # Errors
    ///
    /// `InvalidFilterTarget` if no searchable fields are declared or one of
    /// them does not resolve.
    pub fn search<S: AsRef<str>>(mut self, terms: &[S]) -> Result<Self, FilterError> {
        if terms.is_empty() {
            return Ok(self);
        }

        let schema = Arc::clone(&self.schema);
        if schema.searchable.is_empty() {
            return Err(FilterError::invalid_target(
                schema.table.as_str(),
                "no searchable fields declared",
            ));
        }

        let mut columns = Vec::with_capacity(schema.searchable.len());
        for field in &schema.searchable {
            let resolved = schema.resolve(field)?;
            if let Some(rel) = resolved.relation {
                self = self.left_join(rel.name)?;
            }
            columns.push((resolved.table, resolved.column));
        }

        let mut all_terms = Condition::all();
        for term in terms {
            let pattern = format!("%{}%", escape_like_wildcards(term.as_ref()).to_uppercase());
            let mut any_field = Condition::any();
            for (table, column) in &columns {
                let column = Expr::col((Alias::new(*table), Alias::new(*column)));
                any_field = any_field.add(
                    Expr::expr(Func::upper(column)).like(LikeExpr::new(pattern.clone()).escape('\\')),
                );
            }
            all_terms = all_terms.add(any_field);
        }

        self.select = self.select.filter(all_terms);
        Ok(self)
    }

    /// Ask for `relation` to be loaded alongside the rows. Does not change the
    /// rows returned.
    ///
    /// # Errors
    ///
    /// `InvalidFilterTarget` if the relation is not registered.
    pub fn include_related(mut self, relation: &str) -> Result<Self, FilterError> {
        let name = self
            .schema
            .relation(relation)
            .map(|r| r.name)
            .ok_or_else(|| FilterError::invalid_target(relation, "unknown relation"))?;

        if !self.includes.contains(&name) {
            self.includes.push(name);
        }
        Ok(self)
    }

    /// Render the SQL this query would run.
    #[must_use]
    pub fn build(&self, backend: DbBackend) -> Statement {
        self.select.build(backend)
    }

    #[must_use]
    pub fn into_select(self) -> Select<E> {
        self.select
    }

    /// Run the query.
    ///
    /// # Errors
    ///
    /// Whatever the database returns.
    pub async fn all<C: ConnectionTrait>(self, db: &C) -> Result<Vec<E::Model>, DbErr> {
        self.select.all(db).await
    }
}
