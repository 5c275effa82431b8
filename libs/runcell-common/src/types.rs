use serde::{Deserialize, Serialize};
use std::fmt;

/// Strongly-typed language enum
/// Every variant has exactly one toolchain in the engine registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Javascript,
    Java,
    Cpp,
}

impl Language {
    /// Returns all language variants
    /// This is the single source of truth for available languages
    pub fn all_variants() -> &'static [Language] {
        &[
            Language::Python,
            Language::Javascript,
            Language::Java,
            Language::Cpp,
        ]
    }

    /// Parse a language from its wire name (case-insensitive, surrounding
    /// whitespace ignored)
    pub fn parse(s: &str) -> Option<Language> {
        match s.trim().to_lowercase().as_str() {
            "python" => Some(Language::Python),
            "javascript" => Some(Language::Javascript),
            "java" => Some(Language::Java),
            "cpp" => Some(Language::Cpp),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Javascript => "javascript",
            Language::Java => "java",
            Language::Cpp => "cpp",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Execution Input (Immutable)
///
/// Arrives already authenticated. `language` stays a raw string because an
/// unknown name is a client error reported by the executor, not a
/// deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionRequest {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub input: String,
}

impl ExecutionRequest {
    pub fn new(language: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            language: language.into(),
            input: String::new(),
        }
    }

    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = input.into();
        self
    }
}

/// Pipeline stage at which an execution stopped succeeding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    None,
    Compile,
    Run,
    Timeout,
    Internal,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureStage::None => "none",
            FailureStage::Compile => "compile",
            FailureStage::Run => "run",
            FailureStage::Timeout => "timeout",
            FailureStage::Internal => "internal",
        }
    }
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Execution Output
///
/// Produced once per request by the executor and never persisted.
/// `failure_stage` is `None` exactly when `succeeded` is true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub stdout: String,
    pub stderr: String,
    pub succeeded: bool,
    pub failure_stage: FailureStage,
    /// Either stream hit the capture limit
    #[serde(default)]
    pub truncated: bool,
    #[serde(default)]
    pub elapsed_ms: u64,
}

impl ExecutionOutcome {
    pub fn success(stdout: String, stderr: String) -> Self {
        Self::new(stdout, stderr, FailureStage::None)
    }

    /// Compile failures never carry program output
    pub fn compile_failed(diagnostics: String) -> Self {
        Self::new(String::new(), diagnostics, FailureStage::Compile)
    }

    pub fn run_failed(stdout: String, stderr: String) -> Self {
        Self::new(stdout, stderr, FailureStage::Run)
    }

    pub fn timed_out(stdout: String, message: String) -> Self {
        Self::new(stdout, message, FailureStage::Timeout)
    }

    fn new(stdout: String, stderr: String, failure_stage: FailureStage) -> Self {
        Self {
            stdout,
            stderr,
            succeeded: failure_stage == FailureStage::None,
            failure_stage,
            truncated: false,
            elapsed_ms: 0,
        }
    }

    /// Human-facing summary used as the response `message`
    pub fn message(&self) -> &'static str {
        match self.failure_stage {
            FailureStage::None => "Code executed successfully",
            FailureStage::Compile => "Compilation failed",
            FailureStage::Run => "Runtime error",
            FailureStage::Timeout => "Time limit exceeded",
            FailureStage::Internal => "Internal error",
        }
    }

    /// Text shown to the client: program output on success, diagnostics
    /// otherwise
    pub fn output(&self) -> &str {
        if self.succeeded {
            &self.stdout
        } else {
            &self.stderr
        }
    }
}

/// `data` payload of a program-behavior response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionData {
    pub output: String,
    pub error: bool,
}

/// Successful-protocol envelope
///
/// Compile, runtime and timeout failures travel through this envelope with
/// `data.error = true`; only request-shape and internal errors use the
/// error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub status_code: u16,
    pub data: T,
    pub message: String,
    pub success: bool,
}

impl<T> ApiResponse<T> {
    pub fn new(status_code: u16, data: T, message: impl Into<String>) -> Self {
        Self {
            status_code,
            data,
            message: message.into(),
            success: status_code < 400,
        }
    }
}

impl From<&ExecutionOutcome> for ApiResponse<ExecutionData> {
    fn from(outcome: &ExecutionOutcome) -> Self {
        ApiResponse::new(
            200,
            ExecutionData {
                output: outcome.output().to_string(),
                error: !outcome.succeeded,
            },
            outcome.message(),
        )
    }
}

/// Protocol-level error body (4xx/5xx)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status_code: u16,
    pub data: Option<serde_json::Value>,
    pub message: String,
    pub success: bool,
    pub errors: Vec<String>,
}

impl ErrorBody {
    pub fn new(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code,
            data: None,
            message: message.into(),
            success: false,
            errors: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_serialization() {
        let lang = Language::Javascript;
        let json = serde_json::to_string(&lang).unwrap();
        assert_eq!(json, "\"javascript\"");

        let deserialized: Language = serde_json::from_str("\"cpp\"").unwrap();
        assert_eq!(deserialized, Language::Cpp);
    }

    #[test]
    fn test_language_parse() {
        assert_eq!(Language::parse("python"), Some(Language::Python));
        assert_eq!(Language::parse("Python"), Some(Language::Python));
        assert_eq!(Language::parse(" JAVA "), Some(Language::Java));
        assert_eq!(Language::parse("cpp"), Some(Language::Cpp));
        assert_eq!(Language::parse("javascript"), Some(Language::Javascript));

        assert_eq!(Language::parse("rust"), None);
        assert_eq!(Language::parse("c++"), None);
        assert_eq!(Language::parse(""), None);
    }

    #[test]
    fn test_language_all_variants() {
        let variants = Language::all_variants();
        assert_eq!(variants.len(), 4);
        for variant in variants {
            assert_eq!(Language::parse(&variant.to_string()), Some(*variant));
        }
    }

    #[test]
    fn test_request_input_is_optional() {
        let request: ExecutionRequest =
            serde_json::from_str(r#"{"code": "print(1)", "language": "python"}"#).unwrap();
        assert_eq!(request.input, "");
        assert_eq!(request.language, "python");

        let empty: ExecutionRequest = serde_json::from_str("{}").unwrap();
        assert!(empty.code.is_empty());
        assert!(empty.language.is_empty());
    }

    #[test]
    fn test_outcome_constructors_keep_stage_and_flag_consistent() {
        let ok = ExecutionOutcome::success("3\n".into(), String::new());
        assert!(ok.succeeded);
        assert_eq!(ok.failure_stage, FailureStage::None);

        let compile = ExecutionOutcome::compile_failed("error: expected ';'".into());
        assert!(!compile.succeeded);
        assert_eq!(compile.failure_stage, FailureStage::Compile);
        assert_eq!(compile.stdout, "");

        let run = ExecutionOutcome::run_failed(String::new(), "boom".into());
        assert_eq!(run.failure_stage, FailureStage::Run);

        let timeout = ExecutionOutcome::timed_out("partial".into(), "too slow".into());
        assert_eq!(timeout.failure_stage, FailureStage::Timeout);
        assert_eq!(timeout.output(), "too slow");
    }

    #[test]
    fn test_response_envelope_shape() {
        let outcome = ExecutionOutcome::success("3\n".into(), String::new());
        let response = ApiResponse::<ExecutionData>::from(&outcome);
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["statusCode"], 200);
        assert_eq!(json["data"]["output"], "3\n");
        assert_eq!(json["data"]["error"], false);
        assert_eq!(json["message"], "Code executed successfully");
        assert_eq!(json["success"], true);
    }

    #[test]
    fn test_failure_response_carries_diagnostics() {
        let outcome = ExecutionOutcome::compile_failed("main.cpp:3: error".into());
        let response = ApiResponse::<ExecutionData>::from(&outcome);

        assert_eq!(response.status_code, 200);
        assert!(response.data.error);
        assert_eq!(response.data.output, "main.cpp:3: error");
        assert_eq!(response.message, "Compilation failed");
    }

    #[test]
    fn test_error_body_shape() {
        let body = ErrorBody::new(400, "Unsupported language");
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["statusCode"], 400);
        assert_eq!(json["success"], false);
        assert!(json["data"].is_null());
        assert_eq!(json["errors"], serde_json::json!([]));
    }
}
