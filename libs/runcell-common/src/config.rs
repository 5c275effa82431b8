use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Programs invoked for each toolchain stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainPrograms {
    pub python: String,
    pub node: String,
    pub javac: String,
    pub java: String,
    pub cxx: String,
}

impl Default for ToolchainPrograms {
    fn default() -> Self {
        Self {
            python: "python3".to_string(),
            node: "node".to_string(),
            javac: "javac".to_string(),
            java: "java".to_string(),
            cxx: "g++".to_string(),
        }
    }
}

/// Application configuration
/// Provides defaults with environment variable overrides
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub scratch_dir: PathBuf,
    pub run_timeout_ms: u64,
    pub compile_timeout_ms: u64,
    /// Per-stream capture limit
    pub max_output_bytes: usize,
    pub max_concurrent_executions: usize,
    /// RLIMIT_CPU for the run stage, 0 disables
    pub run_cpu_limit_secs: u64,
    /// RLIMIT_FSIZE for the run stage, 0 disables
    pub run_file_size_limit_bytes: u64,
    pub json_logs: bool,
    pub programs: ToolchainPrograms,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup; unparsable values fall back to
    /// their defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ToolchainPrograms::default();

        Self {
            port: parsed(&lookup, "PORT").unwrap_or(4000),
            scratch_dir: lookup("SCRATCH_DIR")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| env::temp_dir().join("runcell")),
            run_timeout_ms: parsed(&lookup, "RUN_TIMEOUT_MS").unwrap_or(5000),
            compile_timeout_ms: parsed(&lookup, "COMPILE_TIMEOUT_MS").unwrap_or(10_000),
            max_output_bytes: parsed(&lookup, "MAX_OUTPUT_BYTES").unwrap_or(1024 * 1024),
            max_concurrent_executions: parsed(&lookup, "MAX_CONCURRENT_EXECUTIONS")
                .filter(|n: &usize| *n > 0)
                .unwrap_or(8),
            run_cpu_limit_secs: parsed(&lookup, "RUN_CPU_LIMIT_SECS").unwrap_or(10),
            run_file_size_limit_bytes: parsed(&lookup, "RUN_FILE_SIZE_LIMIT_BYTES")
                .unwrap_or(16 * 1024 * 1024),
            json_logs: lookup("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            programs: ToolchainPrograms {
                python: lookup("PYTHON_BIN").unwrap_or(defaults.python),
                node: lookup("NODE_BIN").unwrap_or(defaults.node),
                javac: lookup("JAVAC_BIN").unwrap_or(defaults.javac),
                java: lookup("JAVA_BIN").unwrap_or(defaults.java),
                cxx: lookup("CXX_BIN").unwrap_or(defaults.cxx),
            },
        }
    }
}

fn parsed<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|v| v.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
