//! Multi-field "any of" matching.
//!
//! Whatever the value source, the matcher adds exactly one disjunctive clause
//! to the query, so the database sees `a = x OR b = y` rather than separate
//! lookups.

use sea_orm::EntityTrait;

use crate::context::RequestContext;
use crate::errors::FilterError;
use crate::query::FilterQuery;

use super::activation::AnyParamPresent;
use super::apply::ApplyFilter;

#[derive(Debug, Clone)]
enum Targets {
    /// Each field reads its own parameter.
    PerField(Vec<(String, String)>),
    /// One parameter feeds every field.
    FirstPresent {
        params: Vec<String>,
        fields: Vec<String>,
    },
}

#[derive(Debug, Clone)]
pub struct MultiFieldMatcher {
    targets: Targets,
}

impl MultiFieldMatcher {
    /// Each field is fed by the parameter of the same name.
    ///
    /// With `?id=5&department_id=7` the clause is
    /// `id = 5 OR department_id = 7`. Absent parameters contribute nothing.
    pub fn per_field<S: AsRef<str>>(fields: &[S]) -> Self {
        Self::aliased(
            &fields
                .iter()
                .map(|f| (f.as_ref(), f.as_ref()))
                .collect::<Vec<_>>(),
        )
    }

    /// Like [`MultiFieldMatcher::per_field`] with explicit `(param, field)`
    /// pairs.
    #[must_use]
    pub fn aliased(pairs: &[(&str, &str)]) -> Self {
        Self {
            targets: Targets::PerField(
                pairs
                    .iter()
                    .map(|(param, field)| ((*param).to_string(), (*field).to_string()))
                    .collect(),
            ),
        }
    }

    /// A single value matched against every field.
    ///
    /// The value comes from the first parameter in `params` that is present;
    /// later aliases are ignored when several are sent.
    pub fn first_present<P: AsRef<str>, F: AsRef<str>>(params: &[P], fields: &[F]) -> Self {
        Self {
            targets: Targets::FirstPresent {
                params: params.iter().map(|p| p.as_ref().to_string()).collect(),
                fields: fields.iter().map(|f| f.as_ref().to_string()).collect(),
            },
        }
    }

    /// Names of the parameters that can feed this matcher, in declared order.
    #[must_use]
    pub fn params(&self) -> Vec<&str> {
        match &self.targets {
            Targets::PerField(pairs) => pairs.iter().map(|(param, _)| param.as_str()).collect(),
            Targets::FirstPresent { params, .. } => params.iter().map(String::as_str).collect(),
        }
    }

    /// The activation rule that matches this matcher's inputs.
    #[must_use]
    pub fn activation(&self) -> AnyParamPresent {
        AnyParamPresent::new(&self.params())
    }
}

impl<E: EntityTrait> ApplyFilter<E> for MultiFieldMatcher {
    fn apply(&self, query: FilterQuery<E>, ctx: &RequestContext) -> Result<FilterQuery<E>, FilterError> {
        match &self.targets {
            Targets::PerField(pairs) => {
                let clauses: Vec<(&str, Vec<&str>)> = pairs
                    .iter()
                    .filter(|(param, _)| ctx.params.is_present(param))
                    .map(|(param, field)| (field.as_str(), ctx.params.list(param)))
                    .collect();

                query.where_any(&clauses).map_err(|err| {
                    let source = match &err {
                        FilterError::MalformedParameter { parameter, .. } => pairs
                            .iter()
                            .find(|(_, field)| field == parameter)
                            .map(|(param, _)| param.clone()),
                        FilterError::InvalidFilterTarget { .. } => None,
                    };
                    match source {
                        Some(param) => err.for_parameter(&param),
                        None => err,
                    }
                })
            }
            Targets::FirstPresent { params, fields } => {
                let Some(source) = params.iter().find(|p| ctx.params.is_present(p)) else {
                    return Ok(query);
                };
                let values = ctx.params.list(source);
                let clauses: Vec<(&str, Vec<&str>)> = fields
                    .iter()
                    .map(|field| (field.as_str(), values.clone()))
                    .collect();

                query
                    .where_any(&clauses)
                    .map_err(|err| err.for_parameter(source))
            }
        }
    }
}
