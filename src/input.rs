//! Process-wide read-only configuration: the `Input` record threaded by
//! reference through the parser and generator.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;

static EMPTY_FLAGS: Lazy<Vec<String>> = Lazy::new(Vec::new);

/// Closed enumeration of the languages a node can be tagged with.
/// `NoLang` is the wildcard used for language-agnostic contexts
/// (touchfiles, `gen_sh`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Lang {
    C,
    Cpp,
    Java,
    Python,
    Golang,
    NoLang,
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Lang::C => "c",
            Lang::Cpp => "cpp",
            Lang::Java => "java",
            Lang::Python => "python",
            Lang::Golang => "golang",
            Lang::NoLang => "no_lang",
        };
        write!(f, "{s}")
    }
}

/// The categories propagated upward through the dependency DAG.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    DependencyFiles,
    ObjectFiles,
    FinalOutputs,
    LinkFlags,
    CompileFlags,
    IncludeDirs,
    EnvVariables,
}

/// Process-wide configuration, constructed once from the CLI and shared
/// by reference with the parser and every node.
#[derive(Clone, Debug)]
pub struct Input {
    /// Filesystem anchor used for I/O (reading `BUILD` files, checking
    /// source files exist). The emitted Makefile resolves `$(ROOT_DIR)` at
    /// `make` time via `$(shell pwd)` rather than baking this path in, so
    /// a moved or copied tree still resolves it correctly.
    pub root_dir: PathBuf,
    /// Repo-root-relative logical directory a bare `seed_token` resolves
    /// against (empty for the repo root itself). Never filesystem-absolute;
    /// every [`crate::resource::TargetInfo`] directory threaded through the
    /// parser shares this convention.
    pub current_path: PathBuf,
    pub object_dir: PathBuf,
    pub source_dir: PathBuf,
    pub genfile_dir: PathBuf,
    pub pkgfile_dir: PathBuf,
    pub binary_dir: PathBuf,
    pub silent_make: bool,
    pub silent_gensh: bool,
    pub jobs: usize,
    pub flags: HashMap<String, Vec<String>>,
}

impl Input {
    /// Never fails: a miss returns an empty list rather than an error, per
    /// the data model contract.
    pub fn flags(&self, name: &str) -> &[String] {
        self.flags.get(name).map(Vec::as_slice).unwrap_or(&EMPTY_FLAGS)
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// The build-output directories the `clean` rule removes. `source_dir`
    /// is deliberately excluded: it defaults to `root_dir` itself (sources
    /// are read in place, never staged into a build-owned copy), so
    /// treating it as build-owned would make the generated `clean` target
    /// `rm -rf` the repository it was pointed at.
    pub fn managed_directories(&self) -> [&Path; 4] {
        [
            &self.object_dir,
            &self.binary_dir,
            &self.genfile_dir,
            &self.pkgfile_dir,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_input() -> Input {
        Input {
            root_dir: PathBuf::from("/repo"),
            current_path: PathBuf::from("/repo"),
            object_dir: PathBuf::from("$(OBJ_DIR)"),
            source_dir: PathBuf::from("$(SRC_DIR)"),
            genfile_dir: PathBuf::from("$(GEN_DIR)"),
            pkgfile_dir: PathBuf::from("$(PKG_DIR)"),
            binary_dir: PathBuf::from("$(BIN_DIR)"),
            silent_make: true,
            silent_gensh: false,
            jobs: 4,
            flags: HashMap::new(),
        }
    }

    #[test]
    fn missing_flag_name_returns_empty_slice() {
        let input = sample_input();
        assert!(input.flags("unknown").is_empty());
    }

    #[test]
    fn present_flag_name_returns_its_values() {
        let mut input = sample_input();
        input
            .flags
            .insert("CXXFLAGS".to_string(), vec!["-Wall".to_string()]);
        assert_eq!(input.flags("CXXFLAGS"), &["-Wall".to_string()]);
    }
}
