use thiserror;

/// Top-level error surfaced through the generator's return type. The CLI
/// translates this into a one-line diagnostic and a non-zero exit code.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Target(#[from] TargetError),
    #[error(transparent)]
    Parser(#[from] ParserError),
    #[error(transparent)]
    Generator(#[from] GeneratorError),
    #[error(transparent)]
    BuildFile(#[from] BuildFileError),
    #[error(transparent)]
    CommandLine(#[from] CommandLineError),
    #[error(transparent)]
    Fs(#[from] FsError),
    #[error(transparent)]
    Logger(#[from] LoggerError),
}

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    #[error("malformed target token \"{0}\"")]
    MalformedTarget(String),
}

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ParserError {
    #[error("unknown target referenced: {0}")]
    UnknownTarget(String),
    #[error("no node type registered for kind \"{0}\" (target {1})")]
    UnknownNodeType(String, String),
    #[error("{1} is missing required field \"{0}\"")]
    MissingRequiredField(String, String),
    #[error(transparent)]
    BuildFile(#[from] BuildFileError),
    #[error(transparent)]
    Target(#[from] TargetError),
    #[error(transparent)]
    Fs(#[from] FsError),
}

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("recursive dependency detected at {0}")]
    RecursiveDependency(String),
    #[error(transparent)]
    Parser(#[from] ParserError),
    #[error(transparent)]
    Fs(#[from] FsError),
}

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum BuildFileError {
    #[error("failed to read build file {0:?}")]
    Read(std::path::PathBuf, #[source] std::io::Error),
    #[error("failed to parse build file {0:?} as toml")]
    Parse(std::path::PathBuf, #[source] toml::de::Error),
    #[error("build file {0:?} entry {1} is missing a \"type\" field")]
    MissingType(std::path::PathBuf, usize),
    #[error("build file {0:?} entry {1} is missing a \"name\" field")]
    MissingName(std::path::PathBuf, usize),
    #[error("field \"{0}\" in {1:?} is not a string")]
    NotAString(String, std::path::PathBuf),
    #[error("variable \"{0}\" referenced in {1:?} is not defined")]
    UndefinedVariable(String, std::path::PathBuf),
    #[error("source file {0:?} does not exist")]
    FileNotFound(std::path::PathBuf),
}

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum CommandLineError {
    #[error("invalid define \"{0}\", expected key=value")]
    InvalidDefine(String),
    #[error(transparent)]
    Fs(#[from] FsError),
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("error occurred when creating cache")]
    FailedToCache(#[source] std::io::Error),
    #[error("error occurred when writing to cache")]
    FailedToWrite(#[source] serde_json::Error),
    #[error("error occurred when reading cache")]
    FailedToRead(#[source] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum FsError {
    #[error("error occurred in creating directory {0:?}")]
    CreateDirectory(std::path::PathBuf, #[source] std::io::Error),
    #[error("error occurred in removing directory {0:?}")]
    RemoveDirectory(std::path::PathBuf, #[source] std::io::Error),
    #[error("failed to create symlink between {dest:?} and {src:?}")]
    CreateSymlink {
        dest: std::path::PathBuf,
        src: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("error occurred in creating file {0:?}")]
    CreateFile(std::path::PathBuf, #[source] std::io::Error),
    #[error("error occurred reading from file {0:?}")]
    ReadFromFile(std::path::PathBuf, #[source] std::io::Error),
    #[error("the path {0:?} does not exist")]
    FileDoesNotExist(std::path::PathBuf),
    #[error("failed to canonicalize path {0:?}")]
    Canonicalize(std::path::PathBuf, #[source] std::io::Error),
    #[error("could not find program {0}")]
    CouldNotFindProgram(String),
    #[error("failed to write to file")]
    WriteToFile(#[source] std::io::Error),
    #[error("failed to spawn child process: {0:?}")]
    SpawnChild(#[source] std::io::Error),
    #[error("failed to execute external program")]
    FailedToExecute(#[source] std::io::Error),
    #[error("failed to convert utf8 array to string")]
    FailedToCreateStringFromUtf8(#[source] std::string::FromUtf8Error),
}

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    #[error("failed to create file appender: {0}")]
    FailedToCreateFileAppender(#[source] std::io::Error),
    #[error("failed to create logger configuration: {0}")]
    FailedToCreateConfig(#[source] log4rs::config::runtime::ConfigErrors),
    #[error(transparent)]
    FailedToSetLogger(#[from] log::SetLoggerError),
}

pub type Result<T> = std::result::Result<T, Error>;
