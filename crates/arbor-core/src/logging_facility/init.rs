//! Logging initialization

use std::str::FromStr;
use std::sync::Once;

use serde::{Deserialize, Serialize};
use tracing_subscriber::{util::SubscriberInitExt, EnvFilter};

use crate::errors::ArborError;

/// Logging profile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Human-readable output, `arbor=debug`
    Development,
    /// JSON output, `arbor=info`
    #[default]
    Production,
    /// Bare registry; tests install the capture layer instead
    Test,
}

impl Profile {
    fn default_directive(self) -> &'static str {
        match self {
            Profile::Development => "arbor=debug",
            Profile::Production | Profile::Test => "arbor=info",
        }
    }
}

impl FromStr for Profile {
    type Err = ArborError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Profile::Development),
            "production" | "prod" => Ok(Profile::Production),
            "test" => Ok(Profile::Test),
            other => Err(ArborError::parse(
                other,
                "expected development, production or test",
            )),
        }
    }
}

static INIT_ONCE: Once = Once::new();

/// Initialize the logging facility
///
/// Call once at start-up. Later calls are no-ops. `RUST_LOG` overrides the
/// profile's default directive.
///
/// ```
/// use arbor_core::logging_facility::{init, Profile};
///
/// init(Profile::Development);
/// ```
pub fn init(profile: Profile) {
    init_with_filter(profile, None);
}

/// Like [`init`], with an explicit fallback directive used when `RUST_LOG`
/// is unset
pub fn init_with_filter(profile: Profile, directive: Option<&str>) {
    INIT_ONCE.call_once(|| {
        let fallback = directive.unwrap_or_else(|| profile.default_directive());
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
        // try_init: a test harness may already own the global dispatcher
        let _ = match profile {
            Profile::Development => tracing_subscriber::fmt()
                .with_env_filter(filter)
                .finish()
                .try_init(),
            Profile::Production => tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .finish()
                .try_init(),
            Profile::Test => tracing_subscriber::registry().try_init(),
        };
    });
}
