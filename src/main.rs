use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use behat_ci::config::{HostSignals, RunConfig};
use behat_ci::process::SystemRunner;

#[derive(Parser)]
#[command(
    name = "behat-ci",
    about = "Run Behat acceptance tests for a Moodle plugin",
    version,
    long_about = None
)]
struct Cli {
    /// Path to the plugin under test
    #[arg(default_value = ".")]
    plugin: PathBuf,

    /// Path to the Moodle checkout
    #[arg(long, env = "MOODLE_DIR", default_value = "moodle")]
    moodle: PathBuf,

    /// Behat profile option to use
    #[arg(short, long, default_value = "default")]
    profile: String,

    /// Behat suite option to use (Moodle theme)
    #[arg(long, default_value = "default")]
    suite: String,

    /// Behat tags option to use; defaults to the plugin component
    #[arg(long, default_value = "")]
    tags: String,

    /// Behat name option to use
    #[arg(long, default_value = "")]
    name: String,

    /// Start Selenium and PHP servers
    #[arg(long)]
    start_servers: bool,

    /// Number of times to rerun failures
    #[arg(long, default_value_t = 2)]
    auto_rerun: u32,

    /// Selenium Docker image
    #[arg(long)]
    selenium: Option<String>,

    /// Print contents of Behat failure HTML files
    #[arg(long)]
    dump: bool,

    /// Enable SCSS deprecation checks
    #[arg(long)]
    scss_deprecations: bool,
}

impl Cli {
    fn into_config(self, signals: HostSignals) -> RunConfig {
        RunConfig {
            moodle_dir: self.moodle,
            plugin_dir: self.plugin,
            profile: self.profile,
            suite: self.suite,
            tags: self.tags,
            name: self.name,
            auto_rerun: self.auto_rerun,
            start_servers: self.start_servers || signals.force_start_servers,
            selenium_image: self.selenium.or_else(|| signals.selenium_image.clone()),
            dump: self.dump,
            scss_deprecations: self.scss_deprecations,
            signals,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.into_config(HostSignals::from_env());

    let outcome = behat_ci::run_acceptance(&config, &SystemRunner).await?;
    std::process::exit(outcome.exit_code);
}
