//! Activation rules: when does a filter apply?
//!
//! Every rule reads the whole [`RequestContext`], so a filter may switch on
//! raw parameters, on derived flags, or on both.

use crate::config::SearchConfig;
use crate::context::RequestContext;

use super::search::normalize_search_with;

/// Decides whether a filter takes part in a request.
pub trait Activation: Send + Sync {
    fn is_active(&self, ctx: &RequestContext) -> bool;
}

impl<F> Activation for F
where
    F: Fn(&RequestContext) -> bool + Send + Sync,
{
    fn is_active(&self, ctx: &RequestContext) -> bool {
        self(ctx)
    }
}

/// Active on every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct Always;

impl Activation for Always {
    fn is_active(&self, _ctx: &RequestContext) -> bool {
        true
    }
}

/// Active when the named parameter has a non-blank value.
#[derive(Debug, Clone)]
pub struct ParamPresent(String);

impl ParamPresent {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl Activation for ParamPresent {
    fn is_active(&self, ctx: &RequestContext) -> bool {
        ctx.params.is_present(&self.0)
    }
}

/// Active when at least one of the named parameters is present.
#[derive(Debug, Clone)]
pub struct AnyParamPresent(Vec<String>);

impl AnyParamPresent {
    pub fn new<S: AsRef<str>>(names: &[S]) -> Self {
        Self(names.iter().map(|n| n.as_ref().to_string()).collect())
    }
}

impl Activation for AnyParamPresent {
    fn is_active(&self, ctx: &RequestContext) -> bool {
        self.0.iter().any(|name| ctx.params.is_present(name))
    }
}

/// Active when every named flag is set. No flags means always active.
#[derive(Debug, Clone)]
pub struct FlagsSet(Vec<String>);

impl FlagsSet {
    pub fn new<S: AsRef<str>>(flags: &[S]) -> Self {
        Self(flags.iter().map(|f| f.as_ref().to_string()).collect())
    }
}

impl Activation for FlagsSet {
    fn is_active(&self, ctx: &RequestContext) -> bool {
        self.0.iter().all(|flag| ctx.flag(flag))
    }
}

/// Active when the parameter still holds at least one term after
/// sanitization. `search=!!!` leaves the filter off rather than matching
/// nothing.
#[derive(Debug, Clone)]
pub struct SearchTermsPresent {
    param: String,
    config: SearchConfig,
}

impl SearchTermsPresent {
    pub fn new(param: impl Into<String>) -> Self {
        Self::with_config(param, SearchConfig::default())
    }

    pub fn with_config(param: impl Into<String>, config: SearchConfig) -> Self {
        Self {
            param: param.into(),
            config,
        }
    }
}

impl Activation for SearchTermsPresent {
    fn is_active(&self, ctx: &RequestContext) -> bool {
        ctx.params
            .joined(&self.param)
            .is_some_and(|input| !normalize_search_with(&input, &self.config).is_empty())
    }
}

/// Active when every inner rule is.
pub struct AllOf(Vec<Box<dyn Activation>>);

impl AllOf {
    #[must_use]
    pub fn new(rules: Vec<Box<dyn Activation>>) -> Self {
        Self(rules)
    }
}

impl Activation for AllOf {
    fn is_active(&self, ctx: &RequestContext) -> bool {
        self.0.iter().all(|rule| rule.is_active(ctx))
    }
}
