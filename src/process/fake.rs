//! Scripted command runner for lifecycle and orchestration tests.

use std::path::Path;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use super::{CommandRunner, ManagedProcess, ProcessOutput};

/// Records every facade call; calls whose joined argv contains one of the
/// scripted patterns report exit status 1.
pub(crate) struct FakeRunner {
    calls: Mutex<Vec<Vec<String>>>,
    spawns: Mutex<usize>,
    fail_on: Vec<&'static str>,
}

impl FakeRunner {
    pub(crate) fn new() -> Self {
        Self::failing_on(&[])
    }

    pub(crate) fn failing_on(patterns: &[&'static str]) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            spawns: Mutex::new(0),
            fail_on: patterns.to_vec(),
        }
    }

    pub(crate) fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn spawn_count(&self) -> usize {
        *self.spawns.lock().unwrap()
    }

    fn record(&self, argv: &[String]) -> ProcessOutput {
        self.calls.lock().unwrap().push(argv.to_vec());
        let line = argv.join(" ");
        if self.fail_on.iter().any(|pattern| line.contains(pattern)) {
            ProcessOutput {
                exit_code: 1,
                stdout: String::new(),
                stderr: format!("scripted failure for `{}`", line),
            }
        } else {
            ProcessOutput {
                exit_code: 0,
                stdout: String::new(),
                stderr: String::new(),
            }
        }
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, argv: &[String], _cwd: Option<&Path>) -> Result<ProcessOutput> {
        Ok(self.record(argv))
    }

    async fn run_streaming(&self, argv: &[String], _cwd: Option<&Path>) -> Result<ProcessOutput> {
        Ok(self.record(argv))
    }

    async fn spawn_detached(&self, argv: &[String], _cwd: Option<&Path>) -> Result<ManagedProcess> {
        self.calls.lock().unwrap().push(argv.to_vec());
        *self.spawns.lock().unwrap() += 1;
        Ok(ManagedProcess::stub())
    }
}
