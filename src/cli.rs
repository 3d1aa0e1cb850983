//! CLI & Input assembly: a `clap`-derived command line with a single
//! `generate` operation, assembling the process-wide [`Input`] record
//! handed by reference to the parser and generator.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::errors::CommandLineError;
use crate::input::Input;

#[derive(clap::Parser, Debug)]
#[command(
    name = "repomake",
    version,
    about = "Reads declarative BUILD files across a repository and emits a single self-contained Makefile."
)]
pub struct CommandLine {
    #[command(subcommand)]
    pub subcommand: Subcommand,
}

#[derive(clap::Subcommand, Debug)]
pub enum Subcommand {
    /// Parse BUILD files reachable from the target and emit a Makefile.
    Generate(GenerateOpts),
}

#[derive(clap::Args, Debug)]
pub struct GenerateOpts {
    /// Repository root containing BUILD files.
    #[arg(long = "root-dir", default_value = ".")]
    pub root_dir: PathBuf,
    /// Directory the generated Makefile and its managed subdirectories
    /// (object/genfile/pkgfile/binary) are rooted under. Defaults to
    /// `<root-dir>/.build`.
    #[arg(long = "build-dir")]
    pub build_dir: Option<PathBuf>,
    /// Define a flag value, e.g. `-D CXXFLAGS=-Wall`. Repeatable; later
    /// definitions for the same name append rather than replace.
    #[arg(short = 'D', value_parser = Define::from_cli)]
    pub defines: Vec<Define>,
    /// Suppress per-command echoing (`@` prefix) in the generated Makefile.
    #[arg(long = "silent-make")]
    pub silent_make: bool,
    /// Suppress the teed log file `gen_sh` recipes write alongside stdout.
    #[arg(long = "silent-gensh")]
    pub silent_gensh: bool,
    /// Parallelism hint threaded into `Input` for collaborators that shell
    /// out (`make -j`, generated recipes). Defaults to the host's logical
    /// core count.
    #[arg(long)]
    pub jobs: Option<usize>,
    /// A single target to generate rules for (any form accepted by
    /// `TargetInfo::parse`). Omit to generate the whole repository.
    pub target: Option<String>,
}

/// A single `name=value` flag definition from `-D`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Define {
    pub name: String,
    pub value: String,
}

impl Define {
    pub fn from_cli(s: &str) -> Result<Self, CommandLineError> {
        let (name, value) = s
            .split_once('=')
            .ok_or_else(|| CommandLineError::InvalidDefine(s.to_string()))?;
        if name.is_empty() {
            return Err(CommandLineError::InvalidDefine(s.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            value: value.to_string(),
        })
    }
}

impl Input {
    /// Assembles the process-wide configuration record from parsed CLI
    /// options. The five managed directories default to subdirectories of
    /// `build_dir`; `source_dir` defaults to `root_dir` itself, since
    /// sources are read from the repository tree rather than copied.
    pub fn from_command_line(opts: &GenerateOpts) -> Result<Input, CommandLineError> {
        let root_dir = canonicalize(&opts.root_dir)?;
        let build_dir = match &opts.build_dir {
            Some(dir) => canonicalize(dir)?,
            None => root_dir.join(".build"),
        };

        let mut flags: HashMap<String, Vec<String>> = HashMap::new();
        for define in &opts.defines {
            flags.entry(define.name.clone()).or_default().push(define.value.clone());
        }

        Ok(Input {
            object_dir: build_dir.join("obj"),
            genfile_dir: build_dir.join("gen"),
            pkgfile_dir: build_dir.join("pkg"),
            binary_dir: build_dir.join("bin"),
            source_dir: root_dir.clone(),
            current_path: PathBuf::new(),
            root_dir,
            silent_make: opts.silent_make,
            silent_gensh: opts.silent_gensh,
            jobs: opts.jobs.unwrap_or_else(num_cpus::get),
            flags,
        })
    }
}

fn canonicalize(path: &std::path::Path) -> Result<PathBuf, CommandLineError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir()
        .map_err(|e| crate::errors::FsError::Canonicalize(path.to_path_buf(), e))?;
    Ok(cwd.join(path))
}
