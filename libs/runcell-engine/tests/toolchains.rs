//! End-to-end runs against the real python/node/g++/java toolchains.
//!
//! Each test skips itself when its toolchain is not installed.

use runcell_common::{Config, ExecutionRequest, FailureStage};
use runcell_engine::Executor;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

fn installed(program: &str) -> bool {
    Command::new(program)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn executor(scratch: &Path) -> Executor {
    let config = Config {
        scratch_dir: scratch.to_path_buf(),
        ..Config::default()
    };
    Executor::from_config(&config)
}

fn assert_scratch_empty(scratch: &Path) {
    let leftovers: Vec<_> = std::fs::read_dir(scratch)
        .map(|d| d.filter_map(|e| e.ok()).map(|e| e.path()).collect())
        .unwrap_or_default();
    assert!(leftovers.is_empty(), "leaked scratch files: {leftovers:?}");
}

#[cfg(target_os = "linux")]
fn process_gone(pid: u32) -> bool {
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Err(_) => true,
        Ok(stat) => stat
            .rsplit(')')
            .next()
            .and_then(|rest| rest.split_whitespace().next())
            .map(|state| state == "Z" || state == "X")
            .unwrap_or(true),
    }
}

#[tokio::test]
async fn test_python_sum_of_two_inputs() {
    if !installed("python3") {
        eprintln!("Skipping: python3 not found");
        return;
    }
    let scratch = tempfile::tempdir().unwrap();
    let executor = executor(scratch.path());
    let request = ExecutionRequest::new("python", "a=int(input());b=int(input());print(a+b)")
        .with_input("1\n2\n");

    let outcome = executor.execute(&request).await.unwrap();

    assert!(outcome.succeeded, "unexpected outcome: {outcome:?}");
    assert_eq!(outcome.stdout, "3\n");
    assert_scratch_empty(scratch.path());
}

#[tokio::test]
async fn test_python_exception_is_runtime_error() {
    if !installed("python3") {
        eprintln!("Skipping: python3 not found");
        return;
    }
    let scratch = tempfile::tempdir().unwrap();
    let executor = executor(scratch.path());

    let outcome = executor
        .execute(&ExecutionRequest::new("python", "raise ValueError('bad input')"))
        .await
        .unwrap();

    assert_eq!(outcome.failure_stage, FailureStage::Run);
    assert!(outcome.stderr.contains("ValueError: bad input"));
    assert_scratch_empty(scratch.path());
}

#[tokio::test]
async fn test_python_infinite_loop_times_out_and_dies() {
    if !installed("python3") {
        eprintln!("Skipping: python3 not found");
        return;
    }
    let scratch = tempfile::tempdir().unwrap();
    let executor = executor(scratch.path());
    let code = "import os\nprint(os.getpid(), flush=True)\nwhile True:\n    pass\n";

    let started = Instant::now();
    let outcome = executor
        .execute(&ExecutionRequest::new("python", code))
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(outcome.failure_stage, FailureStage::Timeout);
    assert!(elapsed >= Duration::from_millis(5000));
    assert!(elapsed < Duration::from_millis(8000), "timeout took {elapsed:?}");
    assert_scratch_empty(scratch.path());

    #[cfg(target_os = "linux")]
    {
        let pid: u32 = outcome.stdout.trim().parse().unwrap();
        let deadline = Instant::now() + Duration::from_secs(2);
        while !process_gone(pid) && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(process_gone(pid), "interpreter {pid} still running");
    }
}

#[tokio::test]
async fn test_javascript_echo() {
    if !installed("node") {
        eprintln!("Skipping: node not found");
        return;
    }
    let scratch = tempfile::tempdir().unwrap();
    let executor = executor(scratch.path());
    let code = "const data = require('fs').readFileSync(0, 'utf8');\n\
                console.log(data.trim().toUpperCase());\n";

    let outcome = executor
        .execute(&ExecutionRequest::new("javascript", code).with_input("hello"))
        .await
        .unwrap();

    assert!(outcome.succeeded, "unexpected outcome: {outcome:?}");
    assert_eq!(outcome.stdout, "HELLO\n");
    assert_scratch_empty(scratch.path());
}

#[tokio::test]
async fn test_cpp_missing_semicolon_is_compile_error() {
    if !installed("g++") {
        eprintln!("Skipping: g++ not found");
        return;
    }
    let scratch = tempfile::tempdir().unwrap();
    let executor = executor(scratch.path());
    let code = "#include <iostream>\nint main() { std::cout << 1 << std::endl return 0; }\n";

    let outcome = executor.execute(&ExecutionRequest::new("cpp", code)).await.unwrap();

    assert!(!outcome.succeeded);
    assert_eq!(outcome.failure_stage, FailureStage::Compile);
    assert_eq!(outcome.stdout, "");
    assert!(!outcome.stderr.is_empty());
    assert_scratch_empty(scratch.path());
}

#[tokio::test]
async fn test_cpp_compile_and_run() {
    if !installed("g++") {
        eprintln!("Skipping: g++ not found");
        return;
    }
    let scratch = tempfile::tempdir().unwrap();
    let executor = executor(scratch.path());
    let code = r#"#include <iostream>
int main() {
    int a, b;
    std::cin >> a >> b;
    std::cout << a * b << "\n";
    return 0;
}
"#;

    let outcome = executor
        .execute(&ExecutionRequest::new("cpp", code).with_input("6 7\n"))
        .await
        .unwrap();

    assert!(outcome.succeeded, "unexpected outcome: {outcome:?}");
    assert_eq!(outcome.stdout, "42\n");
    assert_scratch_empty(scratch.path());
}

#[tokio::test]
async fn test_java_max_of_three() {
    if !installed("javac") || !installed("java") {
        eprintln!("Skipping: JDK not found");
        return;
    }
    let scratch = tempfile::tempdir().unwrap();
    let executor = executor(scratch.path());
    let code = r#"import java.util.Scanner;

public class Main {
    static int max(int a, int b, int c) {
        return Math.max(a, Math.max(b, c));
    }

    public static void main(String[] args) {
        Scanner in = new Scanner(System.in);
        int a = in.nextInt(), b = in.nextInt(), c = in.nextInt();
        System.out.println(max(a, b, c));
    }
}
"#;

    let outcome = executor
        .execute(&ExecutionRequest::new("java", code).with_input("5\n2\n1\n"))
        .await
        .unwrap();

    assert!(outcome.succeeded, "unexpected outcome: {outcome:?}");
    assert_eq!(outcome.stdout.trim(), "5");
    assert_scratch_empty(scratch.path());
}

#[tokio::test]
async fn test_java_other_public_class_is_compile_error() {
    if !installed("javac") || !installed("java") {
        eprintln!("Skipping: JDK not found");
        return;
    }
    let scratch = tempfile::tempdir().unwrap();
    let executor = executor(scratch.path());
    let code = "public class Solution {\n\
                    public static void main(String[] a) { System.out.println(1); }\n\
                }\n";

    let outcome = executor.execute(&ExecutionRequest::new("java", code)).await.unwrap();

    assert_eq!(outcome.failure_stage, FailureStage::Compile);
    assert!(outcome.stderr.contains("Solution"));
    assert_scratch_empty(scratch.path());
}

#[tokio::test]
async fn test_java_other_package_private_class_is_compile_error() {
    if !installed("javac") || !installed("java") {
        eprintln!("Skipping: JDK not found");
        return;
    }
    let scratch = tempfile::tempdir().unwrap();
    let executor = executor(scratch.path());
    let code = "class Solution {\n\
                    public static void main(String[] a) { System.out.println(1); }\n\
                }\n";

    let outcome = executor
        .execute(&ExecutionRequest::new("java", code))
        .await
        .unwrap();

    assert_eq!(outcome.failure_stage, FailureStage::Compile);
    assert_eq!(outcome.stdout, "");
    assert!(outcome.stderr.contains("Main.class"), "stderr: {}", outcome.stderr);
    assert_scratch_empty(scratch.path());
}
