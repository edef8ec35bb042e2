//! Behat run orchestration -- command construction, execution, outcome.

pub mod dump;

use anyhow::Result;
use tracing::warn;

use crate::config::RunConfig;
use crate::host::{MoodleSite, Plugin};
use crate::process::{CommandRunner, ProcessOutput};

/// Final result of one invocation. There are no partial-success states:
/// the exit code is 0 for a passing (or skipped) run and 1 otherwise.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub exit_code: i32,
    pub success: bool,
    pub stdout: String,
    pub skipped: bool,
}

impl RunOutcome {
    /// A plugin with no Behat features: success without running anything.
    pub fn skipped() -> Self {
        Self {
            exit_code: 0,
            success: true,
            stdout: String::new(),
            skipped: true,
        }
    }

    fn from_output(output: ProcessOutput) -> Self {
        let success = output.success();
        Self {
            exit_code: if success { 0 } else { 1 },
            success,
            stdout: output.stdout,
            skipped: false,
        }
    }
}

/// Build the Behat CLI invocation.
///
/// The tag filter defaults to `@<component>` when the caller gave none; the
/// name filter is single-quoted so embedded spaces survive; the rerun count
/// passes through verbatim, zero included.
pub fn behat_command(config: &RunConfig, component: &str, color: bool) -> Vec<String> {
    let tags = if config.tags.is_empty() {
        format!("@{}", component)
    } else {
        config.tags.clone()
    };

    let mut cmd = vec![
        "php".to_string(),
        "admin/tool/behat/cli/run.php".to_string(),
        format!("--profile={}", config.profile),
        format!("--suite={}", config.suite),
        format!("--tags={}", tags),
        format!("--auto-rerun={}", config.auto_rerun),
        "--verbose".to_string(),
        "-vvv".to_string(),
    ];

    if !config.name.is_empty() {
        cmd.push(format!("--name='{}'", config.name));
    }

    if color {
        cmd.push("--colors".to_string());
    }

    cmd
}

/// One-shot site re-init that switches the SCSS deprecation checks on.
fn scss_enable_command() -> Vec<String> {
    [
        "php",
        "admin/tool/behat/cli/util_single_run.php",
        "--enable",
        "--add-core-features-to-theme",
        "--scss-deprecations",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Run the suite, streaming its output live, and fold the process result
/// into a [`RunOutcome`].
pub async fn run(
    config: &RunConfig,
    site: &MoodleSite,
    plugin: &Plugin,
    runner: &dyn CommandRunner,
    color: bool,
) -> Result<RunOutcome> {
    if config.scss_deprecations {
        let enable = runner
            .run_streaming(&scss_enable_command(), Some(&site.directory))
            .await?;
        if !enable.success() {
            // The run itself decides pass/fail; the re-init is advisory.
            warn!(
                "SCSS deprecation re-init exited with status {}",
                enable.exit_code
            );
        }
    }

    let cmd = behat_command(config, &plugin.component, color);
    let output = runner.run_streaming(&cmd, Some(&site.directory)).await?;
    Ok(RunOutcome::from_output(output))
}
