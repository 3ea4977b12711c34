//! Server-side filters for subscriptions to the global log.

use crate::error::{ClientError, Result};
use crate::wire;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;

/// Regex matching every event type that is not a system type (`$`-prefixed).
const NON_SYSTEM_EVENT_TYPES: &str = r"^[^\$].*";

/// What the filter predicate looks at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterScope {
    EventType,
    StreamName,
}

/// How the predicate matches.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMatch {
    Regex(String),
    Prefixes(Vec<String>),
}

/// A predicate over exactly one scope with exactly one matching mode.
///
/// The checkpoint interval is the number of filtered-out events the server may
/// skip before emitting a checkpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "FilterRepr")]
pub struct Filter {
    scope: FilterScope,
    matching: FilterMatch,
    checkpoint_interval: Option<NonZeroU32>,
}

/// Unchecked serde form of [`Filter`].
#[derive(Deserialize)]
struct FilterRepr {
    scope: FilterScope,
    matching: FilterMatch,
    checkpoint_interval: Option<NonZeroU32>,
}

impl TryFrom<FilterRepr> for Filter {
    type Error = ClientError;

    fn try_from(repr: FilterRepr) -> Result<Self> {
        let mut filter = Self::new(repr.scope, repr.matching)?;
        filter.checkpoint_interval = repr.checkpoint_interval;
        Ok(filter)
    }
}

impl Filter {
    /// Create a filter, validating the matching mode.
    pub fn new(scope: FilterScope, matching: FilterMatch) -> Result<Self> {
        match &matching {
            FilterMatch::Regex(regex) if regex.is_empty() => {
                return Err(ClientError::InvalidFilter("regex is empty".into()));
            }
            FilterMatch::Prefixes(prefixes) if prefixes.is_empty() => {
                return Err(ClientError::InvalidFilter("prefix list is empty".into()));
            }
            FilterMatch::Prefixes(prefixes) if prefixes.iter().any(|p| p.is_empty()) => {
                return Err(ClientError::InvalidFilter("prefix is empty".into()));
            }
            _ => {}
        }

        Ok(Self {
            scope,
            matching,
            checkpoint_interval: None,
        })
    }

    pub fn event_type_regex(regex: impl Into<String>) -> Result<Self> {
        Self::new(FilterScope::EventType, FilterMatch::Regex(regex.into()))
    }

    pub fn event_type_prefixes<I, S>(prefixes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            FilterScope::EventType,
            FilterMatch::Prefixes(prefixes.into_iter().map(Into::into).collect()),
        )
    }

    pub fn stream_name_regex(regex: impl Into<String>) -> Result<Self> {
        Self::new(FilterScope::StreamName, FilterMatch::Regex(regex.into()))
    }

    pub fn stream_name_prefixes<I, S>(prefixes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            FilterScope::StreamName,
            FilterMatch::Prefixes(prefixes.into_iter().map(Into::into).collect()),
        )
    }

    /// Skip system events (event types starting with `$`).
    pub fn exclude_system_events() -> Self {
        Self {
            scope: FilterScope::EventType,
            matching: FilterMatch::Regex(NON_SYSTEM_EVENT_TYPES.to_string()),
            checkpoint_interval: None,
        }
    }

    /// Set the checkpoint interval. Must be positive.
    pub fn with_checkpoint_interval(mut self, interval: u32) -> Result<Self> {
        let interval = NonZeroU32::new(interval).ok_or_else(|| {
            ClientError::InvalidFilter("checkpoint interval must be positive".into())
        })?;
        self.checkpoint_interval = Some(interval);
        Ok(self)
    }

    pub fn scope(&self) -> FilterScope {
        self.scope
    }

    pub fn matching(&self) -> &FilterMatch {
        &self.matching
    }

    pub fn checkpoint_interval(&self) -> Option<u32> {
        self.checkpoint_interval.map(NonZeroU32::get)
    }

    /// Translate into the read request's filter sub-message.
    pub fn to_wire(&self) -> wire::FilterOptions {
        let expression = match &self.matching {
            FilterMatch::Regex(regex) => wire::Expression {
                regex: regex.clone(),
                prefix: Vec::new(),
            },
            FilterMatch::Prefixes(prefixes) => wire::Expression {
                regex: String::new(),
                prefix: prefixes.clone(),
            },
        };

        let filter = match self.scope {
            FilterScope::EventType => wire::FilterExpression::EventType(expression),
            FilterScope::StreamName => wire::FilterExpression::StreamIdentifier(expression),
        };

        let window = match self.checkpoint_interval {
            Some(interval) => wire::Window::Max(interval.get()),
            None => wire::Window::Count,
        };

        wire::FilterOptions {
            filter: Some(filter),
            window: Some(window),
            checkpoint_interval_multiplier: 1,
        }
    }

    /// Rebuild a filter from its wire form.
    pub fn from_wire(options: &wire::FilterOptions) -> Result<Self> {
        let (scope, expression) = match &options.filter {
            Some(wire::FilterExpression::EventType(e)) => (FilterScope::EventType, e),
            Some(wire::FilterExpression::StreamIdentifier(e)) => (FilterScope::StreamName, e),
            None => return Err(ClientError::InvalidFilter("no filter expression".into())),
        };

        let matching = match (expression.regex.is_empty(), expression.prefix.is_empty()) {
            (false, true) => FilterMatch::Regex(expression.regex.clone()),
            (true, false) => FilterMatch::Prefixes(expression.prefix.clone()),
            (false, false) => {
                return Err(ClientError::InvalidFilter(
                    "expression has both a regex and prefixes".into(),
                ))
            }
            (true, true) => {
                return Err(ClientError::InvalidFilter(
                    "expression has neither a regex nor prefixes".into(),
                ))
            }
        };

        let filter = Self::new(scope, matching)?;
        match options.window {
            Some(wire::Window::Max(max)) => filter.with_checkpoint_interval(max),
            Some(wire::Window::Count) | None => Ok(filter),
        }
    }
}
