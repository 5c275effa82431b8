//! Toolchain Registry
//!
//! Fixed mapping from a language to the shape of its pipeline: a single run
//! step for interpreted languages, compile then run for compiled ones.
//! Built once at startup and shared read-only between requests.

use crate::workspace::Workspace;
use anyhow::{anyhow, Result};
use runcell_common::{Language, ToolchainPrograms};
use std::collections::HashMap;
use std::path::PathBuf;

/// One argument of a stage command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    Literal(String),
    /// Path of the submitted source file
    Source,
    /// Path reserved for the compiled artifact
    Binary,
    /// The workspace directory
    WorkDir,
    /// Entry class name, taken from the source file stem
    EntryClass,
}

impl Arg {
    pub fn lit(value: impl Into<String>) -> Self {
        Arg::Literal(value.into())
    }
}

/// A fully rendered command: program plus argument array, never a shell string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

/// Command template for one pipeline step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    program: Program,
    args: Vec<Arg>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Program {
    Named(String),
    /// Execute the compiled artifact itself
    Binary,
}

impl Stage {
    pub fn new(program: impl Into<String>, args: Vec<Arg>) -> Self {
        Self {
            program: Program::Named(program.into()),
            args,
        }
    }

    /// Run the workspace binary directly
    pub fn binary(args: Vec<Arg>) -> Self {
        Self {
            program: Program::Binary,
            args,
        }
    }

    /// Program name for display; `None` when the stage runs the compiled
    /// artifact
    pub fn program(&self) -> Option<&str> {
        match &self.program {
            Program::Named(name) => Some(name),
            Program::Binary => None,
        }
    }

    /// Substitute workspace paths into the template
    pub fn render(&self, workspace: &Workspace) -> Result<Invocation> {
        let program = match &self.program {
            Program::Named(name) => name.clone(),
            Program::Binary => path_arg(binary_path(workspace)?),
        };

        let args = self
            .args
            .iter()
            .map(|arg| render_arg(arg, workspace))
            .collect::<Result<Vec<_>>>()?;

        Ok(Invocation {
            program,
            args,
            working_dir: workspace.root().to_path_buf(),
        })
    }
}

fn render_arg(arg: &Arg, workspace: &Workspace) -> Result<String> {
    Ok(match arg {
        Arg::Literal(value) => value.clone(),
        Arg::Source => path_arg(workspace.source_path()),
        Arg::Binary => path_arg(binary_path(workspace)?),
        Arg::WorkDir => path_arg(workspace.root()),
        Arg::EntryClass => workspace
            .source_path()
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow!("source path has no file stem"))?,
    })
}

fn binary_path(workspace: &Workspace) -> Result<&std::path::Path> {
    workspace
        .binary_path()
        .ok_or_else(|| {
            anyhow!(
                "toolchain references a binary but workspace {} has none",
                workspace.id()
            )
        })
}

fn path_arg(path: &std::path::Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Static pipeline description for one language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainSpec {
    pub language: Language,
    /// File name of the source inside the workspace
    pub source_file: String,
    /// File name of the compiled artifact, compiled languages only
    pub binary_file: Option<String>,
    pub compile: Option<Stage>,
    pub run: Stage,
}

impl ToolchainSpec {
    pub fn interpreted(language: Language, source_file: impl Into<String>, run: Stage) -> Self {
        Self {
            language,
            source_file: source_file.into(),
            binary_file: None,
            compile: None,
            run,
        }
    }

    pub fn compiled(
        language: Language,
        source_file: impl Into<String>,
        binary_file: impl Into<String>,
        compile: Stage,
        run: Stage,
    ) -> Self {
        Self {
            language,
            source_file: source_file.into(),
            binary_file: Some(binary_file.into()),
            compile: Some(compile),
            run,
        }
    }

    pub fn is_compiled(&self) -> bool {
        self.compile.is_some()
    }
}

/// Language → toolchain lookup
#[derive(Debug, Clone, Default)]
pub struct ToolchainRegistry {
    specs: HashMap<Language, ToolchainSpec>,
}

impl ToolchainRegistry {
    /// Registry with no toolchains; populate with [`ToolchainRegistry::with`]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The standard four toolchains using the given programs
    ///
    /// | language   | compile                                    | run                   |
    /// |------------|--------------------------------------------|-----------------------|
    /// | python     | -                                          | `python3 main.py`     |
    /// | javascript | -                                          | `node main.js`        |
    /// | java       | `javac -encoding UTF-8 -d <dir> Main.java` | `java -cp <dir> Main` |
    /// | cpp        | `g++ -std=c++17 -Wall main.cpp -o main`    | `./main`              |
    pub fn standard(programs: &ToolchainPrograms) -> Self {
        Self::empty()
            .with(ToolchainSpec::interpreted(
                Language::Python,
                "main.py",
                Stage::new(&programs.python, vec![Arg::Source]),
            ))
            .with(ToolchainSpec::interpreted(
                Language::Javascript,
                "main.js",
                Stage::new(&programs.node, vec![Arg::Source]),
            ))
            .with(ToolchainSpec::compiled(
                Language::Java,
                "Main.java",
                "Main.class",
                Stage::new(
                    &programs.javac,
                    vec![
                        Arg::lit("-encoding"),
                        Arg::lit("UTF-8"),
                        Arg::lit("-d"),
                        Arg::WorkDir,
                        Arg::Source,
                    ],
                ),
                Stage::new(
                    &programs.java,
                    vec![Arg::lit("-cp"), Arg::WorkDir, Arg::EntryClass],
                ),
            ))
            .with(ToolchainSpec::compiled(
                Language::Cpp,
                "main.cpp",
                "main",
                Stage::new(
                    &programs.cxx,
                    vec![
                        Arg::lit("-std=c++17"),
                        Arg::lit("-Wall"),
                        Arg::Source,
                        Arg::lit("-o"),
                        Arg::Binary,
                    ],
                ),
                Stage::binary(Vec::new()),
            ))
    }

    /// Add or replace the toolchain for `spec.language`
    pub fn with(mut self, spec: ToolchainSpec) -> Self {
        self.specs.insert(spec.language, spec);
        self
    }

    /// Look up a toolchain by wire name; `None` means unsupported
    pub fn resolve(&self, language: &str) -> Option<&ToolchainSpec> {
        Language::parse(language).and_then(|lang| self.get(lang))
    }

    pub fn get(&self, language: Language) -> Option<&ToolchainSpec> {
        self.specs.get(&language)
    }

    /// Registered toolchains in canonical language order
    pub fn iter(&self) -> impl Iterator<Item = &ToolchainSpec> {
        Language::all_variants()
            .iter()
            .filter_map(move |lang| self.specs.get(lang))
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::WorkspaceManager;

    fn standard() -> ToolchainRegistry {
        ToolchainRegistry::standard(&ToolchainPrograms::default())
    }

    #[test]
    fn test_standard_registry_covers_every_language() {
        let registry = standard();
        assert_eq!(registry.len(), Language::all_variants().len());
        for lang in Language::all_variants() {
            assert!(registry.get(*lang).is_some(), "missing toolchain for {lang}");
        }
    }

    #[test]
    fn test_resolve_by_name() {
        let registry = standard();
        assert_eq!(registry.resolve("python").unwrap().language, Language::Python);
        assert_eq!(registry.resolve("CPP").unwrap().language, Language::Cpp);
        assert!(registry.resolve("ruby").is_none());
        assert!(registry.resolve("").is_none());
    }

    #[test]
    fn test_resolve_respects_registered_subset() {
        let registry = ToolchainRegistry::empty().with(ToolchainSpec::interpreted(
            Language::Python,
            "main.py",
            Stage::new("python3", vec![Arg::Source]),
        ));
        assert!(registry.resolve("python").is_some());
        assert!(registry.resolve("java").is_none());
    }

    #[test]
    fn test_pipeline_shapes() {
        let registry = standard();
        assert!(!registry.get(Language::Python).unwrap().is_compiled());
        assert!(!registry.get(Language::Javascript).unwrap().is_compiled());
        assert!(registry.get(Language::Java).unwrap().is_compiled());

        let cpp = registry.get(Language::Cpp).unwrap();
        assert!(cpp.is_compiled());
        assert_eq!(cpp.run.program(), None);
        assert_eq!(cpp.binary_file.as_deref(), Some("main"));
    }

    #[test]
    fn test_iter_is_in_canonical_order() {
        let order: Vec<Language> = standard().iter().map(|spec| spec.language).collect();
        assert_eq!(order, Language::all_variants());
    }

    #[tokio::test]
    async fn test_render_cpp_stages() {
        let scratch = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(scratch.path());
        let registry = standard();
        let cpp = registry.get(Language::Cpp).unwrap();
        let workspace = manager.acquire(cpp).await.unwrap();

        let compile = cpp.compile.as_ref().unwrap().render(&workspace).unwrap();
        let source = workspace.source_path().to_string_lossy().into_owned();
        let binary = workspace.binary_path().unwrap().to_string_lossy().into_owned();
        assert_eq!(compile.program, "g++");
        assert_eq!(
            compile.args,
            vec!["-std=c++17".to_string(), "-Wall".into(), source, "-o".into(), binary.clone()]
        );
        assert_eq!(compile.working_dir, workspace.root());

        let run = cpp.run.render(&workspace).unwrap();
        assert_eq!(run.program, binary);
        assert!(run.args.is_empty());

        manager.release(workspace).await;
    }

    #[tokio::test]
    async fn test_render_java_uses_main_entry_class() {
        let scratch = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(scratch.path());
        let registry = standard();
        let java = registry.get(Language::Java).unwrap();
        let workspace = manager.acquire(java).await.unwrap();

        let run = java.run.render(&workspace).unwrap();
        let dir = workspace.root().to_string_lossy().into_owned();
        assert_eq!(run.program, "java");
        assert_eq!(run.args, vec!["-cp".to_string(), dir, "Main".into()]);

        manager.release(workspace).await;
    }

    #[tokio::test]
    async fn test_binary_reference_without_binary_path_is_an_error() {
        let scratch = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(scratch.path());
        let spec =
            ToolchainSpec::interpreted(Language::Python, "main.py", Stage::binary(Vec::new()));
        let workspace = manager.acquire(&spec).await.unwrap();

        assert!(spec.run.render(&workspace).is_err());

        manager.release(workspace).await;
    }
}
