//! Correlation identifiers for management requests
//!
//! Every request carries a [`RequestContext`]. The dispatcher, delegated
//! handlers and the import engine all log under its request id.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! correlation_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// A fresh time-ordered id (UUIDv7)
            pub fn new() -> Self {
                Self(Uuid::now_v7().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        /// Ids handed in by a front-end are kept verbatim
        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(raw)
            }
        }

        impl FromStr for $name {
            type Err = EmptyId;

            fn from_str(raw: &str) -> Result<Self, EmptyId> {
                let raw = raw.trim();
                if raw.is_empty() {
                    return Err(EmptyId);
                }
                Ok(Self(raw.to_string()))
            }
        }
    };
}

correlation_id!(
    /// Identifies one management request
    RequestId
);

correlation_id!(
    /// Trace id propagated from an outer front-end
    TraceId
);

/// Returned when parsing a blank correlation id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmptyId;

impl fmt::Display for EmptyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("correlation id must not be empty")
    }
}

impl std::error::Error for EmptyId {}

/// Correlation data carried by a request through every handler it reaches
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub request_id: RequestId,
    pub trace_id: Option<TraceId>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reuse an id assigned by the caller
    pub fn with_request_id(request_id: RequestId) -> Self {
        Self {
            request_id,
            trace_id: None,
        }
    }

    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }
}
