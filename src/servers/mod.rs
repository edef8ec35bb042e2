//! Test-environment lifecycle -- the Selenium container plus the PHP web
//! server.
//!
//! The two resources are deliberately managed differently: the container is
//! tracked by its well-known name only (the docker runtime owns the process
//! and can stop it by name even after this program's state is gone), while
//! the web server is held as an in-process handle that nothing else may
//! touch. Teardown attempts both, always.

use std::time::Duration;

use anyhow::Result;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::RunConfig;
use crate::host::MoodleSite;
use crate::process::{CommandRunner, ManagedProcess};
use crate::selenium::{self, BackendTarget, ImageSelection, OsFamily};

/// Deterministic container name so a later `docker stop` can address it,
/// even from a fresh process.
pub const SELENIUM_CONTAINER_NAME: &str = "selenium";

/// How long Selenium's control port gets to come up. There is no readiness
/// probe; this fixed delay is the only startup synchronization, and early
/// flakes are left to Behat's rerun policy.
pub const SELENIUM_STARTUP_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("docker is not available, cannot start the Selenium server")]
    DockerUnavailable,

    #[error("could not start the Selenium container: {stderr}")]
    SeleniumStart { stderr: String },

    #[error("could not stop the Selenium container: {stderr}")]
    Teardown { stderr: String },
}

/// The running test environment. Sole owner of the web-server handle from
/// start until stop.
#[derive(Debug)]
pub struct TestServers {
    webserver: ManagedProcess,
}

impl TestServers {
    /// Start the Selenium container and the embedded web server, then wait
    /// out the startup grace period.
    pub async fn start(
        config: &RunConfig,
        site: &MoodleSite,
        runner: &dyn CommandRunner,
    ) -> Result<Self> {
        // Docker must be reachable before any other side effect.
        match runner.run(&argv(&["docker", "-v"]), None).await {
            Ok(output) if output.success() => {}
            _ => return Err(ServerError::DockerUnavailable.into()),
        }

        let legacy = selenium::legacy::uses_legacy_webdriver(&site.composer_lock())?;
        let selection = ImageSelection {
            profile: &config.profile,
            preferred_browser: config.signals.preferred_browser.as_deref(),
            explicit_image: config.selenium_image.as_deref(),
            legacy_webdriver: legacy,
            mobile_app: config.signals.mobile_app,
        };
        let target = BackendTarget::resolve(&selection, OsFamily::host());
        info!(image = %target.image, network = target.network_mode, "Starting Selenium container");

        let moodle = site.directory.display().to_string();
        let started = runner
            .run_streaming(
                &argv(&[
                    "docker",
                    "run",
                    "-d",
                    "--rm",
                    &format!("--name={}", SELENIUM_CONTAINER_NAME),
                    target.network_mode,
                    "--shm-size=2g",
                    "-v",
                    &format!("{}:{}", moodle, moodle),
                    &target.image,
                ]),
                None,
            )
            .await?;
        if !started.success() {
            return Err(ServerError::SeleniumStart {
                stderr: started.stderr,
            }
            .into());
        }

        info!(bind = target.webserver_bind, dir = %site.directory.display(), "Starting PHP web server");
        let web_argv = argv(&["php", "-S", target.webserver_bind]);
        let webserver = match runner.spawn_detached(&web_argv, Some(&site.directory)).await {
            Ok(handle) => handle,
            Err(err) => {
                // The container is already up; take it back down before
                // surfacing the spawn failure.
                if let Err(stop_err) = stop_container(runner).await {
                    warn!(
                        "Selenium teardown after a failed web server start also failed: {}",
                        stop_err
                    );
                }
                return Err(err);
            }
        };

        tokio::time::sleep(SELENIUM_STARTUP_GRACE).await;

        Ok(Self { webserver })
    }

    /// Tear down both server processes.
    ///
    /// Both stops are attempted even when the first fails; only then is a
    /// container-stop failure reported, as [`ServerError::Teardown`].
    pub async fn stop(&mut self, runner: &dyn CommandRunner) -> Result<()> {
        let container = stop_container(runner).await;
        let webserver = self.webserver.stop().await;
        container?;
        webserver
    }
}

async fn stop_container(runner: &dyn CommandRunner) -> Result<()> {
    // The container was started with --rm, so stopping it also removes it.
    let output = runner
        .run(&argv(&["docker", "stop", SELENIUM_CONTAINER_NAME]), None)
        .await?;
    if !output.success() {
        return Err(ServerError::Teardown {
            stderr: output.stderr,
        }
        .into());
    }
    Ok(())
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HostSignals;
    use crate::process::fake::FakeRunner;
    use std::fs;
    use std::path::Path;

    fn site_with_lockfile() -> (tempfile::TempDir, MoodleSite) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("composer.lock"), "{\"packages\": []}").unwrap();
        let site = MoodleSite::open(dir.path()).unwrap();
        (dir, site)
    }

    fn config_for(moodle: &Path) -> RunConfig {
        RunConfig {
            moodle_dir: moodle.to_path_buf(),
            plugin_dir: moodle.to_path_buf(),
            profile: "default".to_string(),
            suite: "default".to_string(),
            tags: String::new(),
            name: String::new(),
            auto_rerun: 2,
            start_servers: true,
            selenium_image: None,
            dump: false,
            scss_deprecations: false,
            signals: HostSignals::default(),
        }
    }

    #[tokio::test]
    async fn unreachable_docker_aborts_before_any_other_side_effect() {
        let (_dir, site) = site_with_lockfile();
        let config = config_for(&site.directory);
        let runner = FakeRunner::failing_on(&["docker -v"]);

        let err = TestServers::start(&config, &site, &runner)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ServerError>(),
            Some(ServerError::DockerUnavailable)
        ));
        // Only the probe ran: no container, no web server.
        assert_eq!(runner.call_count(), 1);
        assert_eq!(runner.spawn_count(), 0);
    }

    #[tokio::test]
    async fn an_unreadable_lockfile_aborts_before_backend_selection() {
        let dir = tempfile::tempdir().unwrap();
        let site = MoodleSite::open(dir.path()).unwrap();
        let config = config_for(dir.path());
        let runner = FakeRunner::new();

        let err = TestServers::start(&config, &site, &runner)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<selenium::SeleniumError>(),
            Some(selenium::SeleniumError::LockfileUnreadable { .. })
        ));
        // The docker probe ran, the container launch did not.
        assert_eq!(runner.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn start_launches_the_container_then_the_web_server() {
        let (_dir, site) = site_with_lockfile();
        let config = config_for(&site.directory);
        let runner = FakeRunner::new();

        let servers = TestServers::start(&config, &site, &runner).await.unwrap();
        assert!(!servers.webserver.is_stopped());

        let calls = runner.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0], vec!["docker", "-v"]);
        assert_eq!(calls[1][0], "docker");
        assert_eq!(calls[1][1], "run");
        assert!(calls[1].contains(&format!("--name={}", SELENIUM_CONTAINER_NAME)));
        assert!(calls[1].contains(&"--shm-size=2g".to_string()));
        assert_eq!(calls[2][0], "php");
        assert_eq!(runner.spawn_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn a_failed_container_launch_never_starts_the_web_server() {
        let (_dir, site) = site_with_lockfile();
        let config = config_for(&site.directory);
        let runner = FakeRunner::failing_on(&["docker run"]);

        let err = TestServers::start(&config, &site, &runner)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ServerError>(),
            Some(ServerError::SeleniumStart { .. })
        ));
        assert_eq!(runner.spawn_count(), 0);
    }

    #[tokio::test]
    async fn teardown_stops_the_web_server_even_when_the_container_stop_fails() {
        let runner = FakeRunner::failing_on(&["docker stop"]);
        let mut servers = TestServers {
            webserver: ManagedProcess::stub(),
        };

        let err = servers.stop(&runner).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ServerError>(),
            Some(ServerError::Teardown { .. })
        ));
        // The handle was still signalled.
        assert!(servers.webserver.is_stopped());
    }

    #[tokio::test]
    async fn teardown_stops_both_processes_on_the_happy_path() {
        let runner = FakeRunner::new();
        let mut servers = TestServers {
            webserver: ManagedProcess::stub(),
        };

        servers.stop(&runner).await.unwrap();
        assert!(servers.webserver.is_stopped());
        assert_eq!(
            runner.calls(),
            vec![vec![
                "docker".to_string(),
                "stop".to_string(),
                SELENIUM_CONTAINER_NAME.to_string()
            ]]
        );
    }
}
