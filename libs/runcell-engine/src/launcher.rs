//! Launcher - the boundary between the process runner and process creation
//!
//! The runner owns the process lifecycle (pipes, timeout, tree kill); the
//! launcher only decides how an [`Invocation`] becomes a command: which
//! environment it sees and which resource limits it runs under. Swapping
//! the isolation mechanism means swapping the launcher; the executor never
//! changes.

use crate::toolchain::Invocation;
use std::fmt;
use tokio::process::Command;

/// Environment variables forwarded to toolchains; everything else is dropped
const FORWARDED_ENV: &[&str] = &["PATH", "HOME", "LANG", "LC_ALL", "JAVA_HOME", "TMPDIR"];

/// Per-stage process resource limits (rlimits)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceLimits {
    /// RLIMIT_CPU, seconds of CPU time
    pub cpu_secs: Option<u64>,
    /// RLIMIT_FSIZE, largest file the process may write
    pub file_size_bytes: Option<u64>,
}

impl ResourceLimits {
    pub fn none() -> Self {
        Self::default()
    }

    /// Zero disables a limit
    pub fn new(cpu_secs: u64, file_size_bytes: u64) -> Self {
        Self {
            cpu_secs: (cpu_secs > 0).then_some(cpu_secs),
            file_size_bytes: (file_size_bytes > 0).then_some(file_size_bytes),
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.cpu_secs.is_none() && self.file_size_bytes.is_none()
    }
}

/// Turns an invocation into a spawnable command
///
/// Implementations must not touch stdio, process groups or kill-on-drop;
/// the runner configures those after `command` returns.
pub trait Launcher: Send + Sync + fmt::Debug {
    fn command(&self, invocation: &Invocation, limits: &ResourceLimits) -> Command;
}

/// Runs toolchains directly on the host with a scrubbed environment and
/// rlimits applied in the child before exec
#[derive(Debug, Clone)]
pub struct HostLauncher {
    env: Vec<(String, String)>,
}

impl HostLauncher {
    /// Capture the forwarded variables from the current environment
    pub fn from_env() -> Self {
        let env = FORWARDED_ENV
            .iter()
            .filter_map(|key| std::env::var(key).ok().map(|value| (key.to_string(), value)))
            .collect();
        Self { env }
    }

    pub fn with_env(env: Vec<(String, String)>) -> Self {
        Self { env }
    }
}

impl Default for HostLauncher {
    fn default() -> Self {
        Self::from_env()
    }
}

impl Launcher for HostLauncher {
    fn command(&self, invocation: &Invocation, limits: &ResourceLimits) -> Command {
        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .current_dir(&invocation.working_dir)
            .env_clear()
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        #[cfg(unix)]
        {
            let limits = *limits;
            // SAFETY: the closure only calls setrlimit, which is
            // async-signal-safe, and allocates nothing.
            unsafe {
                command.pre_exec(move || apply_rlimits(&limits));
            }
        }
        #[cfg(not(unix))]
        let _ = limits;

        command
    }
}

#[cfg(unix)]
fn apply_rlimits(limits: &ResourceLimits) -> std::io::Result<()> {
    // Never leave core dumps of submissions in the workspace
    set_rlimit(libc::RLIMIT_CORE, 0)?;
    if let Some(secs) = limits.cpu_secs {
        set_rlimit(libc::RLIMIT_CPU, secs)?;
    }
    if let Some(bytes) = limits.file_size_bytes {
        set_rlimit(libc::RLIMIT_FSIZE, bytes)?;
    }
    Ok(())
}

#[cfg(all(unix, target_os = "linux", target_env = "gnu"))]
type RlimitResource = libc::__rlimit_resource_t;
#[cfg(not(all(unix, target_os = "linux", target_env = "gnu")))]
type RlimitResource = libc::c_int;

#[cfg(unix)]
fn set_rlimit(resource: RlimitResource, value: u64) -> std::io::Result<()> {
    let limit = libc::rlimit {
        rlim_cur: value as libc::rlim_t,
        rlim_max: value as libc::rlim_t,
    };
    // SAFETY: `limit` is a valid rlimit for the duration of the call.
    if unsafe { libc::setrlimit(resource, &limit) } != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}
