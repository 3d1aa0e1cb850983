//! On-disk build-file reader: loads `BUILD` files from disk and exposes a
//! field-extraction facade with `${VAR}`/`${env:VAR}` substitution.

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::errors::BuildFileError;
use crate::input::Input;
use crate::resource::Resource;

lazy_static::lazy_static! {
    static ref ENV_VAR_REGEX: Regex = Regex::new(r"\$\{env:(?P<env>[^}]+)\}").unwrap();
    static ref VAR_REGEX: Regex = Regex::new(r"\$\{(?P<var>[^}]+)\}").unwrap();
}

pub const BUILD_FILE_NAME: &str = "BUILD";

/// A parsed `BUILD` file: a list of entries, each a toml table with a
/// `type` and a `name`.
pub struct BuildFile {
    pub path: PathBuf,
    pub dir: PathBuf,
    entries: Vec<toml::value::Table>,
}

impl BuildFile {
    pub fn load(dir: &Path) -> Result<Self, BuildFileError> {
        let path = dir.join(BUILD_FILE_NAME);
        let value = Self::load_value(&path)?;
        Ok(Self::from_value(dir, path, value))
    }

    /// Reads and parses a `BUILD` file's raw toml tree, without extracting
    /// entries. Split out from [`Self::load`] so a [`crate::cache::BuildFileCache`]
    /// can intercept between the file read and the entry extraction.
    pub fn load_value(path: &Path) -> Result<toml::Value, BuildFileError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| BuildFileError::Read(path.to_path_buf(), e))?;
        toml::from_str(&contents).map_err(|e| BuildFileError::Parse(path.to_path_buf(), e))
    }

    pub fn from_value(dir: &Path, path: PathBuf, value: toml::Value) -> Self {
        let entries = value
            .get("target")
            .and_then(toml::Value::as_array)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter_map(|v| v.as_table().cloned())
            .collect();
        Self {
            path,
            dir: dir.to_path_buf(),
            entries,
        }
    }

    /// Finds the entry named `name`, wrapped as a [`BuildFileNode`].
    pub fn find<'a>(
        &'a self,
        name: &str,
        input: &'a Input,
    ) -> Result<BuildFileNode<'a>, BuildFileError> {
        for (idx, entry) in self.entries.iter().enumerate() {
            if entry.get("name").and_then(toml::Value::as_str) == Some(name) {
                return BuildFileNode::new(&self.path, self.dir.clone(), entry, idx, input);
            }
        }
        Err(BuildFileError::MissingName(self.path.clone(), 0))
    }

    pub fn entries<'a>(
        &'a self,
        input: &'a Input,
    ) -> Result<Vec<BuildFileNode<'a>>, BuildFileError> {
        self.entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| BuildFileNode::new(&self.path, self.dir.clone(), entry, idx, input))
            .collect()
    }
}

/// Thin facade over a single entry's toml table, with typed field
/// extractors that perform `${VAR}` and `${env:VAR}` substitution against
/// the `Input`'s flag map and the process environment before returning.
pub struct BuildFileNode<'a> {
    path: PathBuf,
    pub dir: PathBuf,
    table: &'a toml::value::Table,
    input: &'a Input,
    pub kind: String,
    pub name: String,
}

impl<'a> BuildFileNode<'a> {
    fn new(
        path: &Path,
        dir: PathBuf,
        table: &'a toml::value::Table,
        idx: usize,
        input: &'a Input,
    ) -> Result<Self, BuildFileError> {
        let kind = table
            .get("type")
            .and_then(toml::Value::as_str)
            .ok_or_else(|| BuildFileError::MissingType(path.to_path_buf(), idx))?
            .to_string();
        let name = table
            .get("name")
            .and_then(toml::Value::as_str)
            .ok_or_else(|| BuildFileError::MissingName(path.to_path_buf(), idx))?
            .to_string();
        Ok(Self {
            path: path.to_path_buf(),
            dir,
            table,
            input,
            kind,
            name,
        })
    }

    fn substitute(&self, raw: &str) -> Result<String, BuildFileError> {
        let mut out = raw.to_string();
        while let Some(caps) = ENV_VAR_REGEX.captures(&out) {
            let key = caps.name("env").unwrap().as_str();
            let value = std::env::var(key)
                .map_err(|_| BuildFileError::UndefinedVariable(key.to_string(), self.path.clone()))?;
            out = out.replacen(caps.get(0).unwrap().as_str(), &value, 1);
        }
        while let Some(caps) = VAR_REGEX.captures(&out) {
            let key = caps.name("var").unwrap().as_str();
            let value = self.input.flags(key).join(" ");
            out = out.replacen(caps.get(0).unwrap().as_str(), &value, 1);
        }
        Ok(out)
    }

    pub fn strict_file_mode(&self) -> bool {
        self.bool_field("strict_file_mode", false)
    }

    pub fn bool_field(&self, key: &str, default: bool) -> bool {
        self.table
            .get(key)
            .and_then(toml::Value::as_bool)
            .unwrap_or(default)
    }

    pub fn string_field(&self, key: &str) -> Result<Option<String>, BuildFileError> {
        match self.table.get(key) {
            None => Ok(None),
            Some(toml::Value::String(s)) => Ok(Some(self.substitute(s)?)),
            Some(_) => Err(BuildFileError::NotAString(key.to_string(), self.path.clone())),
        }
    }

    pub fn string_list_field(&self, key: &str) -> Result<Vec<String>, BuildFileError> {
        let Some(value) = self.table.get(key) else {
            return Ok(Vec::new());
        };
        let array = value.as_array().cloned().unwrap_or_default();
        array
            .iter()
            .map(|v| {
                v.as_str()
                    .ok_or_else(|| BuildFileError::NotAString(key.to_string(), self.path.clone()))
                    .and_then(|s| self.substitute(s))
            })
            .collect()
    }

    /// A repeated-string field interpreted as source-relative file paths,
    /// validated against disk in strict mode (raises `FileNotFound`).
    pub fn file_list_field(
        &self,
        key: &str,
        root_dir: &Path,
        strict: bool,
    ) -> Result<Vec<Resource>, BuildFileError> {
        let mut resources = Vec::new();
        for rel in self.string_list_field(key)? {
            let on_disk = root_dir.join(&self.dir).join(&rel);
            if !on_disk.exists() {
                if strict {
                    return Err(BuildFileError::FileNotFound(on_disk));
                }
                log::warn!("source file {} does not exist, skipping", on_disk.display());
                continue;
            }
            let local_path = self.dir.join(&rel);
            resources.push(Resource::from_root_path(&local_path.display().to_string()));
        }
        Ok(resources)
    }

    pub fn string_map_field(&self, key: &str) -> Result<Vec<(String, String)>, BuildFileError> {
        let Some(value) = self.table.get(key) else {
            return Ok(Vec::new());
        };
        let table = value.as_table().cloned().unwrap_or_default();
        let mut out = Vec::new();
        for (k, v) in table {
            let s = v
                .as_str()
                .ok_or_else(|| BuildFileError::NotAString(key.to_string(), self.path.clone()))?;
            out.push((k, self.substitute(s)?));
        }
        Ok(out)
    }

    /// Target-token dependency list, common to every kind.
    pub fn dependencies(&self) -> Result<Vec<String>, BuildFileError> {
        self.string_list_field("dependencies")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn input_with_flag(name: &str, values: &[&str]) -> Input {
        let mut flags = HashMap::new();
        flags.insert(
            name.to_string(),
            values.iter().map(|s| s.to_string()).collect(),
        );
        Input {
            root_dir: "/repo".into(),
            current_path: "/repo".into(),
            object_dir: "$(OBJ_DIR)".into(),
            source_dir: "$(SRC_DIR)".into(),
            genfile_dir: "$(GEN_DIR)".into(),
            pkgfile_dir: "$(PKG_DIR)".into(),
            binary_dir: "$(BIN_DIR)".into(),
            silent_make: true,
            silent_gensh: false,
            jobs: 1,
            flags,
        }
    }

    #[test]
    fn substitutes_registered_flag_variable() {
        let input = input_with_flag("GREETING", &["hello", "world"]);
        let mut table = toml::value::Table::new();
        table.insert("type".into(), toml::Value::String("filegroup".into()));
        table.insert("name".into(), toml::Value::String("srcs".into()));
        table.insert(
            "cmd".into(),
            toml::Value::String("echo ${GREETING}".into()),
        );
        let node =
            BuildFileNode::new(Path::new("BUILD"), PathBuf::from("."), &table, 0, &input).unwrap();
        assert_eq!(
            node.string_field("cmd").unwrap(),
            Some("echo hello world".to_string())
        );
    }

    #[test]
    fn substitutes_process_environment_variable() {
        let _lock = crate::tests::EnvLock::lock("REPOMAKE_TEST_VAR", "from-env");
        let input = input_with_flag("UNUSED", &[]);
        let mut table = toml::value::Table::new();
        table.insert("type".into(), toml::Value::String("filegroup".into()));
        table.insert("name".into(), toml::Value::String("srcs".into()));
        table.insert(
            "cmd".into(),
            toml::Value::String("echo ${env:REPOMAKE_TEST_VAR}".into()),
        );
        let node =
            BuildFileNode::new(Path::new("BUILD"), PathBuf::from("."), &table, 0, &input).unwrap();
        assert_eq!(
            node.string_field("cmd").unwrap(),
            Some("echo from-env".to_string())
        );
    }

    #[test]
    fn undefined_env_variable_is_an_error() {
        let input = input_with_flag("UNUSED", &[]);
        let mut table = toml::value::Table::new();
        table.insert("type".into(), toml::Value::String("filegroup".into()));
        table.insert("name".into(), toml::Value::String("srcs".into()));
        table.insert(
            "cmd".into(),
            toml::Value::String("echo ${env:REPOMAKE_DEFINITELY_UNSET_VAR}".into()),
        );
        let node =
            BuildFileNode::new(Path::new("BUILD"), PathBuf::from("."), &table, 0, &input).unwrap();
        assert!(matches!(
            node.string_field("cmd"),
            Err(BuildFileError::UndefinedVariable(_, _))
        ));
    }

    #[test]
    fn loads_entries_with_type_and_name() {
        let dir = tempdir::TempDir::new("buildfile").unwrap();
        std::fs::write(
            dir.path().join("BUILD"),
            r#"
[[target]]
type = "filegroup"
name = "srcs"
sources = ["a.txt"]
"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("a.txt"), "").unwrap();
        let input = input_with_flag("UNUSED", &[]);
        let bf = BuildFile::load(dir.path()).unwrap();
        let node = bf.find("srcs", &input).unwrap();
        assert_eq!(node.kind, "filegroup");
        assert_eq!(node.name, "srcs");
    }
}
