//! behat-ci -- Behat acceptance-test orchestration for Moodle plugins.
//!
//! Provisions an ephemeral Selenium container and an embedded PHP web
//! server, runs the plugin's Behat suite against them, and tears both down
//! before reporting a single exit status.

pub mod behat;
pub mod config;
pub mod host;
pub mod process;
pub mod selenium;
pub mod servers;

use std::io::IsTerminal;

use anyhow::Result;

use behat::RunOutcome;
use config::RunConfig;
use host::{MoodleSite, Plugin};
use process::CommandRunner;
use servers::TestServers;

/// Run the whole acceptance pass for one plugin.
///
/// When servers were started, teardown of both is attempted exactly once
/// before this returns, whatever the test run did. Configuration and
/// tooling errors raised before anything started abort with no teardown.
pub async fn run_acceptance(config: &RunConfig, runner: &dyn CommandRunner) -> Result<RunOutcome> {
    let site = MoodleSite::open(&config.moodle_dir)?;
    let plugin = Plugin::discover(&config.plugin_dir)?;

    println!("Running Behat features for {}", plugin.component);

    if !plugin.has_behat_features() {
        println!("No Behat features to run, free pass!");
        return Ok(RunOutcome::skipped());
    }

    let color = std::io::stdout().is_terminal();

    let mut servers = if config.start_servers {
        Some(TestServers::start(config, &site, runner).await?)
    } else {
        None
    };

    let result = behat::run(config, &site, &plugin, runner, color).await;

    if let Some(servers) = servers.as_mut() {
        // Runs regardless of the suite result; a failed stop is itself
        // fatal, a lingering container poisons the next run.
        servers.stop(runner).await?;
    }

    let outcome = result?;

    if config.dump {
        if let Some(dir) = site.behat_faildump_path() {
            behat::dump::dump_failures(&dir, &mut std::io::stdout())?;
        }
    }

    Ok(outcome)
}
