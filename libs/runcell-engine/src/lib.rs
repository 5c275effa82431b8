//! Code execution engine: workspaces, toolchains, process supervision and
//! the executor that ties them together.

pub mod error;
pub mod executor;
pub mod launcher;
pub mod runner;
pub mod toolchain;
pub mod workspace;

pub use error::ExecuteError;
pub use executor::{Executor, ExecutorSettings};
pub use launcher::{HostLauncher, Launcher, ResourceLimits};
pub use runner::{Completion, ProcessOutput, ProcessRunner};
pub use toolchain::{Arg, Invocation, Stage, ToolchainRegistry, ToolchainSpec};
pub use workspace::{Workspace, WorkspaceManager};
