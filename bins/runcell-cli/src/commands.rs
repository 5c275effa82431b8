// CLI commands for running submissions locally
use anyhow::{bail, Context, Result};
use runcell_common::types::{ApiResponse, ExecutionData};
use runcell_common::{Config, ExecutionOutcome, ExecutionRequest};
use runcell_engine::{Executor, ToolchainRegistry};
use std::fs;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Resolve stdin for the submission from `--input` or `--input-file`
fn read_input(input: Option<&str>, input_file: Option<&Path>) -> Result<String> {
    match (input, input_file) {
        (Some(_), Some(_)) => bail!("Use either --input or --input-file, not both"),
        (Some(text), None) => Ok(text.to_string()),
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file {}", path.display())),
        (None, None) => Ok(String::new()),
    }
}

/// Run a source file; returns whether the program succeeded
pub async fn run_file(
    language: &str,
    file: &Path,
    input: Option<&str>,
    input_file: Option<&Path>,
    timeout_ms: Option<u64>,
    json: bool,
) -> Result<bool> {
    let code = fs::read_to_string(file)
        .with_context(|| format!("Failed to read source file {}", file.display()))?;
    let stdin = read_input(input, input_file)?;

    let mut config = Config::from_env();
    if let Some(timeout_ms) = timeout_ms {
        config.run_timeout_ms = timeout_ms;
    }
    let executor = Executor::from_config(&config);

    let request = ExecutionRequest::new(language, code).with_input(stdin);
    let outcome = match executor.execute(&request).await {
        Ok(outcome) => outcome,
        Err(e) if e.is_client_error() => bail!("{}", e),
        Err(e) => return Err(e).context("Execution engine failed"),
    };

    if json {
        let response = ApiResponse::<ExecutionData>::from(&outcome);
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print!("{}", render_outcome(language, &outcome));
    }

    Ok(outcome.succeeded)
}

fn render_outcome(language: &str, outcome: &ExecutionOutcome) -> String {
    let mut out = String::new();
    let status = if outcome.succeeded { "✅" } else { "❌" };
    out.push_str(&format!(
        "{} {} ({}, {} ms)\n",
        status,
        outcome.message(),
        language.trim().to_lowercase(),
        outcome.elapsed_ms
    ));

    if !outcome.stdout.is_empty() {
        out.push_str("\n📤 stdout:\n");
        out.push_str(&outcome.stdout);
        if !outcome.stdout.ends_with('\n') {
            out.push('\n');
        }
    }
    if !outcome.stderr.is_empty() {
        out.push_str("\n⚠️  stderr:\n");
        out.push_str(&outcome.stderr);
        if !outcome.stderr.ends_with('\n') {
            out.push('\n');
        }
    }
    if outcome.truncated {
        out.push_str("\n✂️  Output was truncated at the capture limit\n");
    }
    out
}

/// List configured toolchains
pub fn list_languages() -> Result<()> {
    let config = Config::from_env();
    let registry = ToolchainRegistry::standard(&config.programs);

    println!("📋 Configured Languages:\n");
    println!(
        "{:<12} {:<10} {:<12} {:<12} {:<14}",
        "NAME", "COMPILED", "COMPILER", "RUNNER", "SOURCE"
    );
    println!("{}", "─".repeat(64));

    for spec in registry.iter() {
        let compiler = spec
            .compile
            .as_ref()
            .and_then(|stage| stage.program())
            .unwrap_or("-");
        let runner = spec
            .run
            .program()
            .or(spec.binary_file.as_deref())
            .unwrap_or("-");
        println!(
            "{:<12} {:<10} {:<12} {:<12} {:<14}",
            spec.language.as_str(),
            if spec.is_compiled() { "yes" } else { "no" },
            compiler,
            runner,
            spec.source_file
        );
    }

    println!("\n✅ Total: {} language(s)", registry.len());
    println!("\n💡 Override programs with PYTHON_BIN, NODE_BIN, JAVAC_BIN, JAVA_BIN, CXX_BIN");
    Ok(())
}

/// Programs each toolchain needs on the host, in registry order
fn required_programs(registry: &ToolchainRegistry) -> Vec<(String, String)> {
    let mut programs = Vec::new();
    for spec in registry.iter() {
        let stages = spec.compile.iter().chain(std::iter::once(&spec.run));
        for program in stages.filter_map(|stage| stage.program()) {
            programs.push((spec.language.to_string(), program.to_string()));
        }
    }
    programs
}

/// Whether `program --version` starts and exits cleanly
async fn probe(program: &str) -> bool {
    Command::new(program)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .status()
        .await
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Check that every toolchain program is installed; returns whether all were
pub async fn check_toolchains() -> Result<bool> {
    let config = Config::from_env();
    let registry = ToolchainRegistry::standard(&config.programs);

    println!("🔍 Checking toolchains...\n");

    let mut missing = 0;
    for (language, program) in required_programs(&registry) {
        if probe(&program).await {
            println!("  ✅ {:<12} {}", language, program);
        } else {
            println!("  ❌ {:<12} {} (not found or not runnable)", language, program);
            missing += 1;
        }
    }

    if missing > 0 {
        println!(
            "\n⚠️  {} program(s) missing - those languages will fail at execution time",
            missing
        );
        return Ok(false);
    }

    println!("\n✅ All toolchains available");
    Ok(true)
}
