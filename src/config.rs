//! Run configuration -- one immutable value assembled in `main`.
//!
//! All ambient environment signals are read here, exactly once, and passed
//! down by value. Nothing below this layer touches `std::env`.

use std::env;
use std::path::PathBuf;

/// CI signals from the host environment.
#[derive(Debug, Clone, Default)]
pub struct HostSignals {
    /// `MOODLE_START_BEHAT_SERVERS=YES` forces server startup (set during
    /// site install).
    pub force_start_servers: bool,
    /// `MOODLE_BEHAT_DEFAULT_BROWSER` steers the `default` profile.
    pub preferred_browser: Option<String>,
    /// `MOODLE_BEHAT_SELENIUM_IMAGE` overrides the image unless `--selenium`
    /// is given.
    pub selenium_image: Option<String>,
    /// `MOODLE_APP` marks a Moodle App (mobile) test context.
    pub mobile_app: bool,
}

impl HostSignals {
    pub fn from_env() -> Self {
        Self {
            force_start_servers: env::var("MOODLE_START_BEHAT_SERVERS")
                .is_ok_and(|value| value == "YES"),
            preferred_browser: non_empty(env::var("MOODLE_BEHAT_DEFAULT_BROWSER").ok()),
            selenium_image: non_empty(env::var("MOODLE_BEHAT_SELENIUM_IMAGE").ok()),
            mobile_app: env::var("MOODLE_APP").is_ok_and(|value| !value.is_empty()),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Everything one invocation needs. Never mutated after assembly.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub moodle_dir: PathBuf,
    pub plugin_dir: PathBuf,
    pub profile: String,
    pub suite: String,
    /// Empty means "default to `@<component>`".
    pub tags: String,
    /// Empty means no scenario name filter.
    pub name: String,
    pub auto_rerun: u32,
    /// CLI flag OR the forced environment signal.
    pub start_servers: bool,
    /// `--selenium`, falling back to the environment image signal.
    pub selenium_image: Option<String>,
    pub dump: bool,
    pub scss_deprecations: bool,
    pub signals: HostSignals,
}
