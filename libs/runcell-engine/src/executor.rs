//! Executor - High-Level Orchestration
//!
//! **Responsibility:**
//! Take one request from validation to a classified outcome.
//!
//! **Pipeline:**
//! 1. Validate the request and resolve the toolchain (client errors, no
//!    filesystem work)
//! 2. Acquire a workspace and write the source
//! 3. Compile stage, if the toolchain has one; failure skips the run stage
//! 4. Run stage with the request input as stdin
//! 5. Release the workspace on every path, including internal faults
//!
//! The executor knows nothing about how processes are created (launcher's
//! job) or how outcomes are presented (caller's job).

use crate::error::ExecuteError;
use crate::launcher::{HostLauncher, ResourceLimits};
use crate::runner::{Completion, ProcessOutput, ProcessRunner};
use crate::toolchain::{ToolchainRegistry, ToolchainSpec};
use crate::workspace::{Workspace, WorkspaceManager};
use anyhow::Context;
use runcell_common::{Config, ExecutionOutcome, ExecutionRequest, FailureStage};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

const TRUNCATION_NOTICE: &str = "\n[output truncated]";

/// Knobs that shape every execution
#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    pub run_timeout: Duration,
    pub compile_timeout: Duration,
    pub run_limits: ResourceLimits,
    pub max_concurrent: usize,
}

impl ExecutorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            run_timeout: Duration::from_millis(config.run_timeout_ms),
            compile_timeout: Duration::from_millis(config.compile_timeout_ms),
            run_limits: ResourceLimits::new(
                config.run_cpu_limit_secs,
                config.run_file_size_limit_bytes,
            ),
            max_concurrent: config.max_concurrent_executions,
        }
    }
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Runs submissions end to end
#[derive(Debug)]
pub struct Executor {
    registry: Arc<ToolchainRegistry>,
    workspaces: WorkspaceManager,
    runner: ProcessRunner,
    settings: ExecutorSettings,
    permits: Semaphore,
}

impl Executor {
    pub fn new(
        registry: Arc<ToolchainRegistry>,
        workspaces: WorkspaceManager,
        runner: ProcessRunner,
        settings: ExecutorSettings,
    ) -> Self {
        let permits = Semaphore::new(settings.max_concurrent.max(1));
        Self {
            registry,
            workspaces,
            runner,
            settings,
            permits,
        }
    }

    /// Production wiring: standard toolchains on the host launcher
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(ToolchainRegistry::standard(&config.programs)),
            WorkspaceManager::new(&config.scratch_dir),
            ProcessRunner::new(Arc::new(HostLauncher::from_env()), config.max_output_bytes),
            ExecutorSettings::from_config(config),
        )
    }

    pub fn registry(&self) -> &ToolchainRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &ExecutorSettings {
        &self.settings
    }

    pub fn scratch_dir(&self) -> &std::path::Path {
        self.workspaces.scratch_dir()
    }

    /// Execute one submission
    ///
    /// Program behavior (compile errors, crashes, timeouts) comes back as
    /// `Ok` with a failure stage. `Err` is reserved for request-shape
    /// problems and internal faults.
    pub async fn execute(
        &self,
        request: &ExecutionRequest,
    ) -> Result<ExecutionOutcome, ExecuteError> {
        if request.code.is_empty() || request.language.trim().is_empty() {
            return Err(ExecuteError::MissingFields);
        }
        let toolchain = self
            .registry
            .resolve(&request.language)
            .ok_or_else(|| ExecuteError::UnsupportedLanguage(request.language.clone()))?;

        let _permit = self
            .permits
            .acquire()
            .await
            .context("execution limiter closed")?;

        let started = Instant::now();
        let workspace = self
            .workspaces
            .acquire(toolchain)
            .await
            .context("failed to allocate workspace")?;
        let workspace_id = workspace.id();

        info!(
            workspace_id = %workspace_id,
            language = %toolchain.language,
            source_bytes = request.code.len(),
            input_bytes = request.input.len(),
            "Starting execution"
        );

        let result = self.run_pipeline(toolchain, &workspace, request).await;
        self.workspaces.release(workspace).await;

        let mut outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    workspace_id = %workspace_id,
                    error = %format!("{e:#}"),
                    "Execution failed internally"
                );
                return Err(ExecuteError::Internal(e));
            }
        };
        outcome.elapsed_ms = started.elapsed().as_millis() as u64;

        info!(
            workspace_id = %workspace_id,
            language = %toolchain.language,
            succeeded = outcome.succeeded,
            stage = %outcome.failure_stage,
            elapsed_ms = outcome.elapsed_ms,
            "Execution finished"
        );
        Ok(outcome)
    }

    async fn run_pipeline(
        &self,
        toolchain: &ToolchainSpec,
        workspace: &Workspace,
        request: &ExecutionRequest,
    ) -> anyhow::Result<ExecutionOutcome> {
        workspace
            .write_source(&request.code)
            .await
            .context("failed to write source file")?;

        if let Some(compile) = &toolchain.compile {
            let invocation = compile.render(workspace)?;
            let output = self
                .runner
                .run(
                    &invocation,
                    "",
                    &ResourceLimits::none(),
                    self.settings.compile_timeout,
                )
                .await
                .with_context(|| format!("failed to start compiler `{}`", invocation.program))?;

            debug!(
                workspace_id = %workspace.id(),
                exit_code = ?output.exit_code(),
                elapsed_ms = output.elapsed.as_millis() as u64,
                "Compile stage finished"
            );
            if !output.success() {
                return Ok(self.compile_failure(output));
            }
            if let Some(missing) = missing_artifact(workspace).await? {
                return Ok(missing);
            }
        }

        let invocation = toolchain.run.render(workspace)?;
        let output = self
            .runner
            .run(
                &invocation,
                &request.input,
                &self.settings.run_limits,
                self.settings.run_timeout,
            )
            .await
            .with_context(|| format!("failed to start `{}`", invocation.program))?;

        debug!(
            workspace_id = %workspace.id(),
            exit_code = ?output.exit_code(),
            elapsed_ms = output.elapsed.as_millis() as u64,
            "Run stage finished"
        );
        Ok(self.classify_run(output))
    }

    fn compile_failure(&self, output: ProcessOutput) -> ExecutionOutcome {
        let truncated = output.truncated();
        let diagnostics = match output.completion {
            Completion::TimedOut => annotate(
                format!(
                    "Compilation timed out after {}ms\n{}",
                    self.settings.compile_timeout.as_millis(),
                    output.stderr
                ),
                truncated,
            ),
            Completion::Exited(code) => {
                // Some compilers report on stdout
                let text = if !output.stderr.trim().is_empty() {
                    output.stderr
                } else if !output.stdout.trim().is_empty() {
                    output.stdout
                } else {
                    format!("Compilation failed with exit code {code}")
                };
                annotate(text, truncated)
            }
        };
        let mut outcome = ExecutionOutcome::compile_failed(diagnostics);
        outcome.truncated = truncated;
        outcome
    }

    fn classify_run(&self, output: ProcessOutput) -> ExecutionOutcome {
        let truncated = output.truncated();
        let stdout = annotate(output.stdout, output.stdout_truncated);
        let stderr = annotate(output.stderr, output.stderr_truncated);

        let mut outcome = match output.completion {
            Completion::TimedOut => ExecutionOutcome::timed_out(
                stdout,
                format!(
                    "Time limit exceeded: execution took longer than {}ms",
                    self.settings.run_timeout.as_millis()
                ),
            ),
            Completion::Exited(0) => ExecutionOutcome::success(stdout, stderr),
            Completion::Exited(code) => {
                let stderr = if stderr.trim().is_empty() {
                    format!("Process exited with code {code}")
                } else {
                    stderr
                };
                ExecutionOutcome::run_failed(stdout, stderr)
            }
        };
        outcome.truncated = truncated;
        debug_assert_eq!(outcome.succeeded, outcome.failure_stage == FailureStage::None);
        outcome
    }
}

/// A clean compile that left no artifact behind, e.g. a Java submission
/// whose entry class is not `Main`, is still a compile failure
async fn missing_artifact(workspace: &Workspace) -> anyhow::Result<Option<ExecutionOutcome>> {
    let Some(binary) = workspace.binary_path() else {
        return Ok(None);
    };
    let exists = tokio::fs::try_exists(binary)
        .await
        .context("failed to inspect compiler output")?;
    if exists {
        return Ok(None);
    }

    let artifact = binary
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let entry = binary
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(Some(ExecutionOutcome::compile_failed(format!(
        "Compilation produced no {artifact}: the entry point must be declared as `{entry}`"
    ))))
}

fn annotate(mut text: String, truncated: bool) -> String {
    if truncated {
        text.push_str(TRUNCATION_NOTICE);
    }
    text
}
