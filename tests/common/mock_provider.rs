//! Mock sandbox provider for orchestrator tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use sandbridge_lib::sandbox::provider::{
    CommandOutcome, CommandSpec, ProviderError, SandboxHandle, SandboxProvider, SandboxSpec,
};

/// Scripted provider that logs every call.
pub struct MockSandboxProvider {
    /// Endpoint URL reported for provisioned sandboxes.
    pub endpoint: Mutex<String>,
    /// Outcome of non-detached commands (the install step).
    pub command_outcome: Mutex<CommandOutcome>,
    pub fail_create: AtomicBool,
    pub calls: Mutex<Vec<String>>,
}

impl MockSandboxProvider {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: Mutex::new(endpoint.into()),
            command_outcome: Mutex::new(CommandOutcome {
                exit_code: 0,
                stdout: String::new(),
                stderr: String::new(),
            }),
            fail_create: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_command_outcome(&self, exit_code: i32, stderr: &str) {
        *self.command_outcome.lock().unwrap() = CommandOutcome {
            exit_code,
            stdout: String::new(),
            stderr: stderr.to_string(),
        };
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl SandboxProvider for MockSandboxProvider {
    async fn create(&self, _spec: &SandboxSpec) -> Result<SandboxHandle, ProviderError> {
        self.log("create".to_string());
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(ProviderError::Http {
                status: 503,
                message: "no capacity".to_string(),
            });
        }
        Ok(SandboxHandle {
            id: "sbx-test".to_string(),
            domain: "sbx-test.example.dev".to_string(),
        })
    }

    async fn run_command(
        &self,
        _sandbox: &SandboxHandle,
        command: &CommandSpec,
    ) -> Result<CommandOutcome, ProviderError> {
        self.log(format!("run:{}", command.display()));
        Ok(self.command_outcome.lock().unwrap().clone())
    }

    async fn start_detached(
        &self,
        _sandbox: &SandboxHandle,
        command: &CommandSpec,
    ) -> Result<(), ProviderError> {
        self.log(format!("detached:{}", command.display()));
        Ok(())
    }

    fn endpoint_url(&self, _sandbox: &SandboxHandle, _port: u16) -> String {
        self.endpoint.lock().unwrap().clone()
    }

    async fn stop(&self, sandbox: &SandboxHandle) -> Result<(), ProviderError> {
        self.log(format!("stop:{}", sandbox.id));
        Ok(())
    }
}
