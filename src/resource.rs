//! Identity of files and build targets; the path algebra the rest of the
//! crate is built on.

use crate::errors::TargetError;

/// Identity of a declared build entity, of the canonical form `//dir:name`.
///
/// Two targets are equal iff their `full_path` matches. Immutable after
/// construction; `get_parallel_target` returns a new value rather than
/// mutating in place.
#[derive(Clone, Debug, Eq)]
pub struct TargetInfo {
    dir: std::path::PathBuf,
    local_name: String,
    full_path: String,
    make_path: String,
}

impl PartialEq for TargetInfo {
    fn eq(&self, other: &Self) -> bool {
        self.full_path == other.full_path
    }
}

impl std::hash::Hash for TargetInfo {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.full_path.hash(state);
    }
}

impl TargetInfo {
    fn new(dir: std::path::PathBuf, local_name: String) -> Self {
        let dir_str = normalize_dir(&dir);
        let full_path = format!("//{}:{}", dir_str, local_name);
        let make_path = make_path_from_full_path(&full_path);
        Self {
            dir,
            local_name,
            full_path,
            make_path,
        }
    }

    /// Accepts `:name`, `//dir:name`, `//dir`, or a bare path and resolves it
    /// to canonical form relative to `current_dir`.
    pub fn parse(current_dir: &std::path::Path, token: &str) -> Result<Self, TargetError> {
        if token.is_empty() {
            return Err(TargetError::MalformedTarget(token.to_string()));
        }

        if let Some(rest) = token.strip_prefix("//") {
            return match rest.split_once(':') {
                Some((dir, name)) if !name.is_empty() => {
                    Ok(Self::new(std::path::PathBuf::from(dir), name.to_string()))
                }
                Some((_, _)) => Err(TargetError::MalformedTarget(token.to_string())),
                None => {
                    // `//dir` with no explicit name: name is the last path component.
                    let dir = std::path::PathBuf::from(rest);
                    let name = dir
                        .file_name()
                        .and_then(|n| n.to_str())
                        .ok_or_else(|| TargetError::MalformedTarget(token.to_string()))?
                        .to_string();
                    Ok(Self::new(dir, name))
                }
            };
        }

        if let Some(name) = token.strip_prefix(':') {
            if name.is_empty() {
                return Err(TargetError::MalformedTarget(token.to_string()));
            }
            return Ok(Self::new(current_dir.to_path_buf(), name.to_string()));
        }

        // Bare path: a file reference used as a dependency token, identified
        // by its own basename within its containing directory.
        let path = std::path::Path::new(token);
        let dir = path
            .parent()
            .map(|p| current_dir.join(p))
            .unwrap_or_else(|| current_dir.to_path_buf());
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| TargetError::MalformedTarget(token.to_string()))?
            .to_string();
        Ok(Self::new(dir, name))
    }

    /// Same directory, different local name. Used when hoisting subnodes
    /// that need a unique identity distinct from their parent's.
    pub fn get_parallel_target(&self, new_local_name: &str) -> Self {
        Self::new(self.dir.clone(), new_local_name.to_string())
    }

    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    pub fn full_path(&self) -> &str {
        &self.full_path
    }

    pub fn make_path(&self) -> &str {
        &self.make_path
    }
}

impl std::fmt::Display for TargetInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.full_path)
    }
}

fn normalize_dir(dir: &std::path::Path) -> String {
    let joined = dir.to_string_lossy().replace('\\', "/");
    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

fn make_path_from_full_path(full_path: &str) -> String {
    full_path
        .trim_start_matches("//")
        .chars()
        .map(|c| if c == '/' || c == ':' { '_' } else { c })
        .collect()
}

/// Identity of a file or file-valued token, as it will appear in the
/// generated Makefile (possibly including a make variable such as
/// `$(OBJ_DIR)`).
#[derive(Clone, Debug, Eq)]
pub struct Resource {
    path: String,
    dirname: String,
    basename: String,
    is_generated: bool,
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl std::hash::Hash for Resource {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

impl Resource {
    fn from_path(path: String) -> Self {
        let (dirname, basename) = split_path(&path);
        Self {
            path,
            dirname,
            basename,
            is_generated: false,
        }
    }

    /// A resource addressed relative to the repository root.
    pub fn from_root_path(p: &str) -> Self {
        Self::from_path(p.to_string())
    }

    /// A resource addressed as `prefix/p`, e.g. `$(OBJ_DIR)` joined with a
    /// target-relative path.
    pub fn from_local_path(prefix: &str, p: &str) -> Self {
        let joined = if prefix.is_empty() {
            p.to_string()
        } else {
            format!("{}/{}", prefix.trim_end_matches('/'), p)
        };
        Self::from_path(joined)
    }

    pub fn generated(mut self) -> Self {
        self.is_generated = true;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn dirname(&self) -> &str {
        &self.dirname
    }

    pub fn basename(&self) -> &str {
        &self.basename
    }

    pub fn is_generated(&self) -> bool {
        self.is_generated
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path)
    }
}

fn split_path(path: &str) -> (String, String) {
    match path.rfind('/') {
        Some(idx) => (path[..idx].to_string(), path[idx + 1..].to_string()),
        None => (String::new(), path.to_string()),
    }
}

/// Insertion-ordered set of [`Resource`]s, deduplicated by `path`. Used
/// pervasively to accumulate transitive artifacts without reordering.
#[derive(Clone, Debug, Default)]
pub struct ResourceFileSet {
    files: Vec<Resource>,
    seen: std::collections::HashSet<String>,
}

impl ResourceFileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, resource: Resource) -> bool {
        if self.seen.insert(resource.path().to_string()) {
            self.files.push(resource);
            true
        } else {
            false
        }
    }

    pub fn extend(&mut self, other: &ResourceFileSet) {
        for file in &other.files {
            self.add(file.clone());
        }
    }

    pub fn files(&self) -> &[Resource] {
        &self.files
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn paths(&self) -> Vec<&str> {
        self.files.iter().map(Resource::path).collect()
    }

    pub fn join_paths(&self, sep: &str) -> String {
        self.paths().join(sep)
    }
}

impl IntoIterator for ResourceFileSet {
    type Item = Resource;
    type IntoIter = std::vec::IntoIter<Resource>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResourceFileSet {
    type Item = &'a Resource;
    type IntoIter = std::slice::Iter<'a, Resource>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_absolute_target() {
        let current = std::path::Path::new("some/dir");
        let target = TargetInfo::parse(current, "//foo/bar:baz").unwrap();
        assert_eq!(target.full_path(), "//foo/bar:baz");
        assert_eq!(target.make_path(), "foo_bar_baz");
    }

    #[test]
    fn parses_relative_target() {
        let current = std::path::Path::new("foo/bar");
        let target = TargetInfo::parse(current, ":baz").unwrap();
        assert_eq!(target.full_path(), "//foo/bar:baz");
    }

    #[test]
    fn parses_dir_only_target() {
        let current = std::path::Path::new(".");
        let target = TargetInfo::parse(current, "//foo/bar").unwrap();
        assert_eq!(target.full_path(), "//foo/bar:bar");
    }

    #[test]
    fn rejects_malformed_token() {
        let current = std::path::Path::new(".");
        assert!(TargetInfo::parse(current, "//:").is_err());
        assert!(TargetInfo::parse(current, ":").is_err());
    }

    #[test]
    fn equality_is_by_full_path() {
        let current = std::path::Path::new(".");
        let a = TargetInfo::parse(current, "//foo:bar").unwrap();
        let b = TargetInfo::parse(current, "//foo:bar").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn parallel_target_shares_directory() {
        let current = std::path::Path::new(".");
        let a = TargetInfo::parse(current, "//foo:bar").unwrap();
        let b = a.get_parallel_target("bar_link");
        assert_eq!(b.dir(), a.dir());
        assert_eq!(b.full_path(), "//foo:bar_link");
    }

    #[test]
    fn resource_file_set_dedupes_by_path() {
        let mut set = ResourceFileSet::new();
        assert!(set.add(Resource::from_root_path("a/b.o")));
        assert!(!set.add(Resource::from_root_path("a/b.o")));
        assert_eq!(set.files().len(), 1);
    }

    #[test]
    fn resource_file_set_preserves_insertion_order() {
        let mut set = ResourceFileSet::new();
        set.add(Resource::from_root_path("z.o"));
        set.add(Resource::from_root_path("a.o"));
        assert_eq!(set.paths(), vec!["z.o", "a.o"]);
    }

    #[test]
    fn resource_from_local_path_joins() {
        let r = Resource::from_local_path("$(OBJ_DIR)", "dir/a.o");
        assert_eq!(r.path(), "$(OBJ_DIR)/dir/a.o");
        assert_eq!(r.basename(), "a.o");
    }
}
