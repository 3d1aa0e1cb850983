//! `confignode`, `filegroup`, `top_symlink`: small, language-agnostic
//! collectors and the one node kind (`top_symlink`) that exists only as a
//! hoisted subnode of another variant.

use crate::input::{Input, Lang};
use crate::makefile::Makefile;
use crate::node::variants::write_base_user_target;
use crate::node::{EnvVariables, FlagSet, NodeCore, NodeHooks};
use crate::resource::{Resource, ResourceFileSet};
use crate::Result;

/// A node with no build action of its own, only flag/env contributions
/// (e.g. a toolchain-configuration entry). Matches the "Collector" pattern
/// with an empty artifact set.
pub struct ConfigNodeData {
    pub own_compile_flags: FlagSet,
    pub own_link_flags: FlagSet,
    pub own_env: EnvVariables,
}

impl NodeHooks for ConfigNodeData {
    fn node_type_name(&self) -> &'static str {
        "confignode"
    }

    fn local_write_make(&self, core: &NodeCore, _input: &Input, mf: &mut Makefile) -> Result<()> {
        write_base_user_target(core, &[], mf);
        Ok(())
    }

    fn local_compile_flags(&self, _core: &NodeCore, _lang: Lang, out: &mut FlagSet) {
        out.extend(&self.own_compile_flags);
    }

    fn local_link_flags(&self, _core: &NodeCore, _lang: Lang, out: &mut FlagSet) {
        out.extend(&self.own_link_flags);
    }

    fn local_env_variables(&self, _core: &NodeCore, _lang: Lang, out: &mut EnvVariables) {
        for (k, v) in self.own_env.iter() {
            out.set(k.clone(), v.clone());
        }
    }

    fn include_in_all(&self) -> bool {
        false
    }
}

/// A named group of plain files, contributed to dependents without any
/// language tag filtering — always visible regardless of queried language.
pub struct FileGroupNode {
    pub files: ResourceFileSet,
}

impl NodeHooks for FileGroupNode {
    fn node_type_name(&self) -> &'static str {
        "filegroup"
    }

    fn local_write_make(&self, core: &NodeCore, _input: &Input, mf: &mut Makefile) -> Result<()> {
        write_base_user_target(core, &self.files.paths().iter().map(|s| s.to_string()).collect::<Vec<_>>(), mf);
        Ok(())
    }

    fn local_dependency_files(&self, _core: &NodeCore, _lang: Lang, out: &mut ResourceFileSet) {
        out.extend(&self.files);
    }
}

/// Hoisted subnode created by `py_binary`/`cc_binary`-family parse steps: a
/// symlink from a stable repo-root-relative path to the parent's final
/// output, so a binary's install location does not depend on its build
/// directory layout.
pub struct TopSymlinkNode {
    pub target_resource: Resource,
    pub link_path: Resource,
}

impl NodeHooks for TopSymlinkNode {
    fn node_type_name(&self) -> &'static str {
        "top_symlink"
    }

    fn local_write_make(&self, core: &NodeCore, _input: &Input, mf: &mut Makefile) -> Result<()> {
        let mut rule = mf.start_rule(self.link_path.path(), self.target_resource.path());
        rule.write_user_echo("Linking", self.link_path.path());
        rule.write_command_best_effort(&format!("rm -f {}", self.link_path.path()));
        rule.write_command(&format!(
            "ln -s {target} {link}",
            target = self.target_resource.path(),
            link = self.link_path.path(),
        ));
        mf.finish_rule(rule);
        write_base_user_target(core, &[self.link_path.path().to_string()], mf);
        Ok(())
    }

    fn local_final_outputs(&self, _core: &NodeCore, _lang: Lang, out: &mut ResourceFileSet) {
        out.add(self.link_path.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::TargetInfo;
    use std::collections::HashMap;

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
            flags: HashMap::new(),
        }
    }

    #[test]
    fn top_symlink_points_at_parent_output() {
        let input = make_input();
        let target = TargetInfo::parse(std::path::Path::new("bin"), "//bin:app_link").unwrap();
        let core = NodeCore::new(target, &input);
        let node = TopSymlinkNode {
            target_resource: Resource::from_root_path("$(BIN_DIR)/bin/app").generated(),
            link_path: Resource::from_root_path("app"),
        };
        let mut mf = Makefile::new(true);
        node.local_write_make(&core, &input, &mut mf).unwrap();
        assert!(mf.out().contains("ln -s $(BIN_DIR)/bin/app app"));
    }

    #[test]
    fn filegroup_contributes_files_regardless_of_lang() {
        let mut files = ResourceFileSet::new();
        files.add(Resource::from_root_path("data/a.txt"));
        let node = FileGroupNode { files };
        let mut out = ResourceFileSet::new();
        node.local_dependency_files(
            &NodeCore::new(
                TargetInfo::parse(std::path::Path::new("data"), "//data:files").unwrap(),
                &make_input(),
            ),
            Lang::Java,
            &mut out,
        );
        assert_eq!(out.files().len(), 1);
    }
}
