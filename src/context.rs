//! Per-request state read by filters and the cache gate.

use std::collections::BTreeMap;

/// A single request parameter, as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Single(String),
    Many(Vec<String>),
}

impl ParamValue {
    fn raw(&self) -> impl Iterator<Item = &str> {
        let values: &[String] = match self {
            Self::Single(value) => std::slice::from_ref(value),
            Self::Many(values) => values,
        };
        values.iter().map(String::as_str)
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Request parameters keyed by name.
///
/// Repeated keys and `name[]` keys collapse into [`ParamValue::Many`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParams {
    values: BTreeMap<String, ParamValue>,
}

impl RequestParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from decoded query-string pairs, in arrival order.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::new();
        for (key, value) in pairs {
            let key = key.as_ref();
            let name = key.strip_suffix("[]").unwrap_or(key);
            params.push(name, value);
        }
        params
    }

    /// Set a parameter, replacing any previous value.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values
            .insert(name.into(), ParamValue::Single(value.into()));
        self
    }

    /// Append a value, turning an existing single value into a list.
    pub fn push(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.values.remove(name) {
            None => {
                self.values
                    .insert(name.to_string(), ParamValue::Single(value));
            }
            Some(ParamValue::Single(first)) => {
                self.values
                    .insert(name.to_string(), ParamValue::Many(vec![first, value]));
            }
            Some(ParamValue::Many(mut values)) => {
                values.push(value);
                self.values.insert(name.to_string(), ParamValue::Many(values));
            }
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    /// A parameter is present when at least one of its values is not blank.
    #[must_use]
    pub fn is_present(&self, name: &str) -> bool {
        self.values
            .get(name)
            .is_some_and(|value| value.raw().any(|v| !is_blank(v)))
    }

    /// First non-blank value, trimmed.
    #[must_use]
    pub fn first(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)?
            .raw()
            .map(str::trim)
            .find(|v| !v.is_empty())
    }

    /// Every non-blank value, with comma separated entries split apart.
    ///
    /// `?id=1,2&id=3` yields `["1", "2", "3"]`.
    #[must_use]
    pub fn list(&self, name: &str) -> Vec<&str> {
        self.values.get(name).map_or_else(Vec::new, |value| {
            value
                .raw()
                .flat_map(|v| v.split(','))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .collect()
        })
    }

    /// Every non-blank value joined with a single space.
    #[must_use]
    pub fn joined(&self, name: &str) -> Option<String> {
        let value = self.values.get(name)?;
        let parts: Vec<&str> = value.raw().map(str::trim).filter(|v| !v.is_empty()).collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

/// Boolean flags derived from the request by the surrounding application
/// (for example whether sections are to be rendered).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestFlags {
    flags: BTreeMap<String, bool>,
}

impl RequestFlags {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: bool) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: bool) {
        self.flags.insert(name.into(), value);
    }

    /// Unknown flags read as false.
    #[must_use]
    pub fn is_set(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }
}

/// Everything a filter or the cache gate may look at for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub params: RequestParams,
    pub flags: RequestFlags,
}

impl RequestContext {
    #[must_use]
    pub const fn new(params: RequestParams, flags: RequestFlags) -> Self {
        Self { params, flags }
    }

    #[must_use]
    pub fn from_params(params: RequestParams) -> Self {
        Self {
            params,
            flags: RequestFlags::default(),
        }
    }

    #[must_use]
    pub fn flag(&self, name: &str) -> bool {
        self.flags.is_set(name)
    }
}

/// Reads a boolean-ish parameter, falling back to `default` when absent.
///
/// `false`, `0`, `no` and `off` (any case) are false; any other non-blank
/// value is true.
#[must_use]
pub fn param_flag(params: &RequestParams, name: &str, default: bool) -> bool {
    params.first(name).map_or(default, |value| {
        !matches!(
            value.to_ascii_lowercase().as_str(),
            "false" | "0" | "no" | "off"
        )
    })
}
