//! Node base and variant contract: the abstract build unit, its DAG edges,
//! and the transitive flag/artifact collection algorithm shared by every
//! variant.

pub mod variants;

use std::cell::{Ref, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use crate::input::{CollectionKind, Input, Lang};
use crate::makefile::{MakeVariable, Makefile, Rule};
use crate::resource::{Resource, ResourceFileSet, TargetInfo};
use crate::Result;

/// Non-owning handle to a pooled node. Cloning is cheap (an `Rc` bump); the
/// only owning slot is [`NodePool`] itself (see `crate::parser`).
pub type NodeHandle = Rc<RefCell<Node>>;

/// Insertion-ordered, deduplicated set of flag/include-dir strings.
/// "the string itself" is the natural identity the data model specifies
/// for this category.
#[derive(Clone, Debug, Default)]
pub struct FlagSet {
    values: Vec<String>,
    seen: HashSet<String>,
}

impl FlagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: impl Into<String>) -> bool {
        let value = value.into();
        if self.seen.insert(value.clone()) {
            self.values.push(value);
            true
        } else {
            false
        }
    }

    pub fn extend(&mut self, other: &FlagSet) {
        for value in &other.values {
            self.add(value.clone());
        }
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn join(&self, sep: &str) -> String {
        self.values.join(sep)
    }
}

/// `(name -> value)` map with last-write-wins semantics where *downstream*
/// (deeper-in-DFS) writes never override an assignment already present.
#[derive(Clone, Debug, Default)]
pub struct EnvVariables(Vec<(String, String)>);

impl EnvVariables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unconditional set, used for a node's own local contribution.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        if let Some(existing) = self.0.iter_mut().find(|(k, _)| *k == key) {
            existing.1 = value.into();
        } else {
            self.0.push((key, value.into()));
        }
    }

    /// Set used while merging in a deeper dependency's contribution: a key
    /// already present (from this node or a shallower dependency) wins.
    pub fn set_if_absent(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        if !self.0.iter().any(|(k, _)| *k == key) {
            self.0.push((key, value.into()));
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, String)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Whether a node tagged `own` should contribute its local artifacts when
/// a category is being collected for `queried`. `NoLang` nodes (touchfiles,
/// `gen_sh`) are the wildcard: they always contribute, since their output
/// may feed any downstream language.
pub fn lang_matches(own: Lang, queried: Lang) -> bool {
    own == queried || own == Lang::NoLang
}

/// Fields intrinsic to every node, regardless of variant.
pub struct NodeCore {
    pub target: TargetInfo,
    pub dep_targets: Vec<TargetInfo>,
    pub dependencies: Vec<NodeHandle>,
    pub subnodes: Vec<NodeHandle>,
    pub owned_subnodes: Vec<NodeHandle>,
    pub strict_file_mode: bool,
    pub make_variables: std::collections::HashMap<String, MakeVariable>,
    pub src_dir: std::path::PathBuf,
    pub obj_dir: std::path::PathBuf,
    pub gen_dir: std::path::PathBuf,
}

impl NodeCore {
    pub fn new(target: TargetInfo, input: &Input) -> Self {
        let rel_dir = target.dir();
        Self {
            src_dir: input.source_dir.join(rel_dir),
            obj_dir: input.object_dir.join(rel_dir),
            gen_dir: input.genfile_dir.join(rel_dir),
            target,
            dep_targets: Vec::new(),
            dependencies: Vec::new(),
            subnodes: Vec::new(),
            owned_subnodes: Vec::new(),
            strict_file_mode: false,
            make_variables: std::collections::HashMap::new(),
        }
    }

    pub fn add_dependency_target(&mut self, target: TargetInfo) {
        self.dep_targets.push(target);
    }

    pub fn add_sub_node(&mut self, node: NodeHandle) {
        self.owned_subnodes.push(node.clone());
        self.subnodes.push(node);
    }

    /// The node's touchfile: a zero-byte marker whose path depends only on
    /// this node's identity and `suffix`, so that two distinct nodes never
    /// share one.
    pub fn touchfile(&self, gen_dir: &std::path::Path, suffix: &str) -> Resource {
        Resource::from_local_path(
            &gen_dir.display().to_string(),
            &format!(".{}.{}.touch", self.target.make_path(), suffix),
        )
        .generated()
    }

    pub fn make_variable(&mut self, base: &str) -> &mut MakeVariable {
        self.make_variables
            .entry(base.to_string())
            .or_insert_with(|| MakeVariable::new(base, self.target.make_path()))
    }
}

/// The per-variant collector/emission hooks. All but `local_write_make` and
/// `node_type_name` default to no-ops, matching the "all default to no-op
/// unless noted" contract.
pub trait NodeHooks {
    fn node_type_name(&self) -> &'static str;

    /// The language this node is tagged with for propagation purposes.
    fn lang(&self) -> Lang {
        Lang::NoLang
    }

    /// Emits rules specific to this node. Must produce a rule named
    /// `core.target.make_path()` (the user target).
    fn local_write_make(&self, core: &NodeCore, input: &Input, mf: &mut Makefile) -> Result<()>;

    fn local_write_make_clean(&self, _core: &NodeCore, _rule: &mut Rule) {}

    fn local_write_make_install(&self, _core: &NodeCore, _mf: &mut Makefile, _rule: &mut Rule) {}

    fn local_dependency_files(&self, _core: &NodeCore, _lang: Lang, _out: &mut ResourceFileSet) {}
    fn local_object_files(&self, _core: &NodeCore, _lang: Lang, _out: &mut ResourceFileSet) {}
    fn local_final_outputs(&self, _core: &NodeCore, _lang: Lang, _out: &mut ResourceFileSet) {}

    fn local_link_flags(&self, _core: &NodeCore, _lang: Lang, _out: &mut FlagSet) {}
    fn local_compile_flags(&self, _core: &NodeCore, _lang: Lang, _out: &mut FlagSet) {}
    fn local_include_dirs(&self, _core: &NodeCore, _lang: Lang, _out: &mut FlagSet) {}
    fn local_env_variables(&self, _core: &NodeCore, _lang: Lang, _out: &mut EnvVariables) {}
    fn local_system_dependencies(&self, _core: &NodeCore, _out: &mut Vec<String>) {}

    /// Gate: if false, this node blocks upward propagation of `kind`
    /// through itself (used by `gen_sh` to cut `DependencyFiles`
    /// propagation in favor of a touchfile).
    fn include_dependencies(&self, _kind: CollectionKind, _lang: Lang) -> bool {
        true
    }

    /// Per-child gate, evaluated on the parent before descending into
    /// `child`.
    fn include_child_dependency(&self, _kind: CollectionKind, _lang: Lang, _child: &Node) -> bool {
        true
    }

    fn include_in_all(&self) -> bool {
        true
    }

    fn include_in_tests(&self) -> bool {
        false
    }

    fn final_tests(&self, _core: &NodeCore, _out: &mut ResourceFileSet) {}

    fn licenses(&self, _core: &NodeCore, _out: &mut Vec<(String, String)>) {}
}

/// A pooled node: shared intrinsic state plus the tagged variant carrying
/// its own fields and hook implementation.
pub struct Node {
    pub core: NodeCore,
    pub kind: variants::NodeKind,
}

impl Node {
    pub fn new(core: NodeCore, kind: variants::NodeKind) -> Self {
        Self { core, kind }
    }

    pub fn hooks(&self) -> &dyn NodeHooks {
        self.kind.hooks()
    }

    pub fn target(&self) -> &TargetInfo {
        &self.core.target
    }

    pub fn write_make(&self, input: &Input, mf: &mut Makefile) -> Result<()> {
        self.hooks().local_write_make(&self.core, input, mf)
    }

    pub fn write_make_clean(&self, rule: &mut Rule) {
        self.hooks().local_write_make_clean(&self.core, rule)
    }

    pub fn write_make_install(&self, mf: &mut Makefile, rule: &mut Rule) {
        self.hooks().local_write_make_install(&self.core, mf, rule)
    }

    pub fn include_in_all(&self) -> bool {
        self.hooks().include_in_all()
    }

    pub fn include_in_tests(&self) -> bool {
        self.hooks().include_in_tests()
    }

    pub fn final_tests(&self) -> ResourceFileSet {
        let mut out = ResourceFileSet::new();
        self.hooks().final_tests(&self.core, &mut out);
        out
    }

    pub fn licenses(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        self.hooks().licenses(&self.core, &mut out);
        out
    }

    /// Extracts subnodes hoisted into this node during parsing, clearing
    /// the parent's ownership slot. Called by the parser immediately after
    /// `parse`.
    pub fn extract_subnodes(&mut self) -> Vec<NodeHandle> {
        std::mem::take(&mut self.core.owned_subnodes)
    }

    // --- Transitive collection (this node's own aggregate) ---

    pub fn dependency_files(&self, lang: Lang) -> ResourceFileSet {
        self.collect_resources(CollectionKind::DependencyFiles, lang, |h, c, l, o| {
            h.local_dependency_files(c, l, o)
        })
    }

    pub fn object_files(&self, lang: Lang) -> ResourceFileSet {
        self.collect_resources(CollectionKind::ObjectFiles, lang, |h, c, l, o| {
            h.local_object_files(c, l, o)
        })
    }

    pub fn final_outputs(&self, lang: Lang) -> ResourceFileSet {
        self.collect_resources(CollectionKind::FinalOutputs, lang, |h, c, l, o| {
            h.local_final_outputs(c, l, o)
        })
    }

    pub fn link_flags(&self, lang: Lang) -> FlagSet {
        self.collect_flags(CollectionKind::LinkFlags, lang, |h, c, l, o| {
            h.local_link_flags(c, l, o)
        })
    }

    pub fn compile_flags(&self, lang: Lang) -> FlagSet {
        self.collect_flags(CollectionKind::CompileFlags, lang, |h, c, l, o| {
            h.local_compile_flags(c, l, o)
        })
    }

    pub fn include_dirs(&self, lang: Lang) -> FlagSet {
        self.collect_flags(CollectionKind::IncludeDirs, lang, |h, c, l, o| {
            h.local_include_dirs(c, l, o)
        })
    }

    pub fn env_variables(&self, lang: Lang) -> EnvVariables {
        let mut out = EnvVariables::new();
        self.hooks().local_env_variables(&self.core, lang, &mut out);
        let mut seen = HashSet::new();
        seen.insert(self.core.target.full_path().to_string());
        self.propagate_env(CollectionKind::EnvVariables, lang, &mut seen, &mut out);
        out
    }

    // --- "Upward" helpers: same algorithm, starting from dependencies ---

    pub fn input_dependency_files(&self, lang: Lang) -> ResourceFileSet {
        self.collect_resources_upward(CollectionKind::DependencyFiles, lang, |h, c, l, o| {
            h.local_dependency_files(c, l, o)
        })
    }

    pub fn input_object_files(&self, lang: Lang) -> ResourceFileSet {
        self.collect_resources_upward(CollectionKind::ObjectFiles, lang, |h, c, l, o| {
            h.local_object_files(c, l, o)
        })
    }

    pub fn input_final_outputs(&self, lang: Lang) -> ResourceFileSet {
        self.collect_resources_upward(CollectionKind::FinalOutputs, lang, |h, c, l, o| {
            h.local_final_outputs(c, l, o)
        })
    }

    pub fn input_link_flags(&self, lang: Lang) -> FlagSet {
        self.collect_flags_upward(CollectionKind::LinkFlags, lang, |h, c, l, o| {
            h.local_link_flags(c, l, o)
        })
    }

    pub fn input_compile_flags(&self, lang: Lang) -> FlagSet {
        self.collect_flags_upward(CollectionKind::CompileFlags, lang, |h, c, l, o| {
            h.local_compile_flags(c, l, o)
        })
    }

    pub fn input_include_dirs(&self, lang: Lang) -> FlagSet {
        self.collect_flags_upward(CollectionKind::IncludeDirs, lang, |h, c, l, o| {
            h.local_include_dirs(c, l, o)
        })
    }

    fn collect_resources<F>(&self, kind: CollectionKind, lang: Lang, local: F) -> ResourceFileSet
    where
        F: Fn(&dyn NodeHooks, &NodeCore, Lang, &mut ResourceFileSet) + Copy,
    {
        let mut out = ResourceFileSet::new();
        local(self.hooks(), &self.core, lang, &mut out);
        let mut seen = HashSet::new();
        seen.insert(self.core.target.full_path().to_string());
        self.propagate_resources(kind, lang, local, &mut seen, &mut out);
        out
    }

    fn collect_resources_upward<F>(&self, kind: CollectionKind, lang: Lang, local: F) -> ResourceFileSet
    where
        F: Fn(&dyn NodeHooks, &NodeCore, Lang, &mut ResourceFileSet) + Copy,
    {
        let mut out = ResourceFileSet::new();
        let mut seen = HashSet::new();
        seen.insert(self.core.target.full_path().to_string());
        self.propagate_resources(kind, lang, local, &mut seen, &mut out);
        out
    }

    fn propagate_resources<F>(
        &self,
        kind: CollectionKind,
        lang: Lang,
        local: F,
        seen: &mut HashSet<String>,
        out: &mut ResourceFileSet,
    ) where
        F: Fn(&dyn NodeHooks, &NodeCore, Lang, &mut ResourceFileSet) + Copy,
    {
        for dep in &self.core.dependencies {
            let dep_node: Ref<Node> = dep.borrow();
            if seen.contains(dep_node.core.target.full_path()) {
                continue;
            }
            if !self.hooks().include_child_dependency(kind, lang, &dep_node) {
                continue;
            }
            seen.insert(dep_node.core.target.full_path().to_string());
            if dep_node.hooks().include_dependencies(kind, lang) {
                local(dep_node.hooks(), &dep_node.core, lang, out);
                dep_node.propagate_resources(kind, lang, local, seen, out);
            }
        }
    }

    fn collect_flags<F>(&self, kind: CollectionKind, lang: Lang, local: F) -> FlagSet
    where
        F: Fn(&dyn NodeHooks, &NodeCore, Lang, &mut FlagSet) + Copy,
    {
        let mut out = FlagSet::new();
        local(self.hooks(), &self.core, lang, &mut out);
        let mut seen = HashSet::new();
        seen.insert(self.core.target.full_path().to_string());
        self.propagate_flags(kind, lang, local, &mut seen, &mut out);
        out
    }

    fn collect_flags_upward<F>(&self, kind: CollectionKind, lang: Lang, local: F) -> FlagSet
    where
        F: Fn(&dyn NodeHooks, &NodeCore, Lang, &mut FlagSet) + Copy,
    {
        let mut out = FlagSet::new();
        let mut seen = HashSet::new();
        seen.insert(self.core.target.full_path().to_string());
        self.propagate_flags(kind, lang, local, &mut seen, &mut out);
        out
    }

    fn propagate_flags<F>(
        &self,
        kind: CollectionKind,
        lang: Lang,
        local: F,
        seen: &mut HashSet<String>,
        out: &mut FlagSet,
    ) where
        F: Fn(&dyn NodeHooks, &NodeCore, Lang, &mut FlagSet) + Copy,
    {
        for dep in &self.core.dependencies {
            let dep_node: Ref<Node> = dep.borrow();
            if seen.contains(dep_node.core.target.full_path()) {
                continue;
            }
            if !self.hooks().include_child_dependency(kind, lang, &dep_node) {
                continue;
            }
            seen.insert(dep_node.core.target.full_path().to_string());
            if dep_node.hooks().include_dependencies(kind, lang) {
                local(dep_node.hooks(), &dep_node.core, lang, out);
                dep_node.propagate_flags(kind, lang, local, seen, out);
            }
        }
    }

    fn propagate_env(
        &self,
        kind: CollectionKind,
        lang: Lang,
        seen: &mut HashSet<String>,
        out: &mut EnvVariables,
    ) {
        for dep in &self.core.dependencies {
            let dep_node: Ref<Node> = dep.borrow();
            if seen.contains(dep_node.core.target.full_path()) {
                continue;
            }
            if !self.hooks().include_child_dependency(kind, lang, &dep_node) {
                continue;
            }
            seen.insert(dep_node.core.target.full_path().to_string());
            if dep_node.hooks().include_dependencies(kind, lang) {
                let mut local = EnvVariables::new();
                dep_node.hooks().local_env_variables(&dep_node.core, lang, &mut local);
                for (k, v) in local.iter() {
                    out.set_if_absent(k.clone(), v.clone());
                }
                dep_node.propagate_env(kind, lang, seen, out);
            }
        }
    }
}

/// Upward resource collection usable from inside a [`NodeHooks`] impl,
/// where only `&NodeCore` and `&dyn NodeHooks` (as `self`) are in scope —
/// not a `Node` wrapping them. Used by linker-style variants (`cc_binary`,
/// `go_binary`, ...) that need their transitive object files before the
/// `Node` around them exists.
pub fn upward_resources<F>(core: &NodeCore, hooks: &dyn NodeHooks, kind: CollectionKind, lang: Lang, local: F) -> ResourceFileSet
where
    F: Fn(&dyn NodeHooks, &NodeCore, Lang, &mut ResourceFileSet) + Copy,
{
    let mut out = ResourceFileSet::new();
    let mut seen = HashSet::new();
    seen.insert(core.target.full_path().to_string());
    propagate_resources_from(core, hooks, kind, lang, local, &mut seen, &mut out);
    out
}

pub fn upward_flags<F>(core: &NodeCore, hooks: &dyn NodeHooks, kind: CollectionKind, lang: Lang, local: F) -> FlagSet
where
    F: Fn(&dyn NodeHooks, &NodeCore, Lang, &mut FlagSet) + Copy,
{
    let mut out = FlagSet::new();
    let mut seen = HashSet::new();
    seen.insert(core.target.full_path().to_string());
    propagate_flags_from(core, hooks, kind, lang, local, &mut seen, &mut out);
    out
}

fn propagate_resources_from<F>(
    core: &NodeCore,
    hooks: &dyn NodeHooks,
    kind: CollectionKind,
    lang: Lang,
    local: F,
    seen: &mut HashSet<String>,
    out: &mut ResourceFileSet,
) where
    F: Fn(&dyn NodeHooks, &NodeCore, Lang, &mut ResourceFileSet) + Copy,
{
    for dep in &core.dependencies {
        let dep_node: Ref<Node> = dep.borrow();
        if seen.contains(dep_node.core.target.full_path()) {
            continue;
        }
        if !hooks.include_child_dependency(kind, lang, &dep_node) {
            continue;
        }
        seen.insert(dep_node.core.target.full_path().to_string());
        if dep_node.hooks().include_dependencies(kind, lang) {
            local(dep_node.hooks(), &dep_node.core, lang, out);
            dep_node.propagate_resources(kind, lang, local, seen, out);
        }
    }
}

fn propagate_flags_from<F>(
    core: &NodeCore,
    hooks: &dyn NodeHooks,
    kind: CollectionKind,
    lang: Lang,
    local: F,
    seen: &mut HashSet<String>,
    out: &mut FlagSet,
) where
    F: Fn(&dyn NodeHooks, &NodeCore, Lang, &mut FlagSet) + Copy,
{
    for dep in &core.dependencies {
        let dep_node: Ref<Node> = dep.borrow();
        if seen.contains(dep_node.core.target.full_path()) {
            continue;
        }
        if !hooks.include_child_dependency(kind, lang, &dep_node) {
            continue;
        }
        seen.insert(dep_node.core.target.full_path().to_string());
        if dep_node.hooks().include_dependencies(kind, lang) {
            local(dep_node.hooks(), &dep_node.core, lang, out);
            dep_node.propagate_flags(kind, lang, local, seen, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::TargetInfo;

    fn make_input() -> Input {
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
            flags: Default::default(),
        }
    }

    #[test]
    fn touchfile_paths_are_unique_per_target() {
        let input = make_input();
        let t1 = TargetInfo::parse(std::path::Path::new("a"), "//a:x").unwrap();
        let t2 = TargetInfo::parse(std::path::Path::new("a"), "//a:y").unwrap();
        let c1 = NodeCore::new(t1, &input);
        let c2 = NodeCore::new(t2, &input);
        let gen_dir = std::path::Path::new("$(GEN_DIR)/a");
        assert_ne!(c1.touchfile(gen_dir, "gen"), c2.touchfile(gen_dir, "gen"));
    }

    #[test]
    fn env_variables_downstream_does_not_override_local() {
        let mut env = EnvVariables::new();
        env.set("CC", "local-cc");
        env.set_if_absent("CC", "downstream-cc");
        env.set_if_absent("LD", "downstream-ld");
        let collected: std::collections::HashMap<_, _> = env.iter().cloned().collect();
        assert_eq!(collected.get("CC"), Some(&"local-cc".to_string()));
        assert_eq!(collected.get("LD"), Some(&"downstream-ld".to_string()));
    }

    #[test]
    fn flag_set_dedupes_by_string_identity_preserving_order() {
        let mut flags = FlagSet::new();
        flags.add("-Wall");
        flags.add("-O2");
        flags.add("-Wall");
        assert_eq!(flags.values(), &["-Wall".to_string(), "-O2".to_string()]);
    }
}
