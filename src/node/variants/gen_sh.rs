//! `gen_sh`: the opaque-recipe variant. Wraps an arbitrary shell command,
//! synchronizes its (possibly combinatorial) `outs` behind a touchfile, and
//! cuts `DependencyFiles` propagation through itself so downstream nodes
//! see only the touchfile and the declared `outs`.

use crate::input::{CollectionKind, Input, Lang};
use crate::makefile::Makefile;
use crate::node::variants::write_base_user_target;
use crate::node::{upward_resources, EnvVariables, NodeCore, NodeHooks};
use crate::resource::ResourceFileSet;
use crate::Result;

pub struct GenShNode {
    pub build_cmd: String,
    pub clean_cmd: Option<String>,
    pub input_files: ResourceFileSet,
    pub outs: ResourceFileSet,
    pub env: EnvVariables,
    pub silent: bool,
}

impl NodeHooks for GenShNode {
    fn node_type_name(&self) -> &'static str {
        "gen_sh"
    }

    fn local_write_make(&self, core: &NodeCore, _input: &Input, mf: &mut Makefile) -> Result<()> {
        let touchfile = core.touchfile(&core.gen_dir, "gensh");
        let log_path = format!("{}/.{}.log", core.gen_dir.display(), core.target.make_path());

        // Depends on the inputs listed in the build file plus the
        // transitive dependency files of whatever it declares as
        // dependencies, so a change anywhere upstream re-triggers the
        // command even though downstream nodes only ever see the touchfile.
        let mut inputs = ResourceFileSet::new();
        inputs.extend(&self.input_files);
        inputs.extend(&upward_resources(
            core,
            self,
            CollectionKind::DependencyFiles,
            Lang::NoLang,
            |h, c, l, o| h.local_dependency_files(c, l, o),
        ));
        let prereqs = inputs.join_paths(" ");
        let mut rule = mf.start_rule(touchfile.path(), &prereqs);
        if !self.silent {
            rule.write_user_echo("Running", core.target.full_path());
        }
        rule.write_command(&format!("mkdir -p {}", core.gen_dir.display()));

        if !self.build_cmd.is_empty() {
            let env_exports = self
                .env
                .iter()
                .map(|(k, v)| format!("export {k}={v};"))
                .collect::<Vec<_>>()
                .join(" ");
            let cd = core.target.dir().display();
            let cmd = format!(
                "( cd {cd}; {envs} eval '{body}' ) > {log} 2>&1 || (cat {log}; exit 1)",
                cd = cd,
                envs = env_exports,
                body = self.build_cmd.replace('\'', "'\\''"),
                log = log_path,
            );
            rule.write_command(&cmd);
        }
        rule.write_command(&format!("touch {}", touchfile.path()));
        mf.finish_rule(rule);

        for out in self.outs.files() {
            mf.write_rule(out.path(), touchfile.path());
        }

        write_base_user_target(core, &[touchfile.path().to_string()], mf);
        Ok(())
    }

    fn local_write_make_clean(&self, _core: &NodeCore, rule: &mut crate::makefile::Rule) {
        if let Some(cmd) = &self.clean_cmd {
            rule.write_command_best_effort(cmd);
        }
    }

    fn local_dependency_files(&self, _core: &NodeCore, _lang: Lang, out: &mut ResourceFileSet) {
        out.extend(&self.outs);
    }

    fn local_env_variables(&self, _core: &NodeCore, _lang: Lang, out: &mut crate::node::EnvVariables) {
        for (k, v) in self.env.iter() {
            out.set(k.clone(), v.clone());
        }
    }

    /// Cuts further propagation of dependency files through this node: a
    /// downstream node sees this node's own touchfile-backed `outs`, never
    /// the raw inputs that fed the shell command.
    fn include_dependencies(&self, kind: CollectionKind, _lang: Lang) -> bool {
        kind != CollectionKind::DependencyFiles
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
    fn empty_build_cmd_emits_only_mkdir_and_touch() {
        let input = make_input();
        let target = TargetInfo::parse(std::path::Path::new("gen"), "//gen:thing").unwrap();
        let core = NodeCore::new(target, &input);
        let node = GenShNode {
            build_cmd: String::new(),
            clean_cmd: None,
            input_files: ResourceFileSet::new(),
            outs: ResourceFileSet::new(),
            env: EnvVariables::new(),
            silent: true,
        };
        let mut mf = Makefile::new(true);
        node.local_write_make(&core, &input, &mut mf).unwrap();
        let out = mf.out();
        assert!(out.contains("mkdir -p"));
        assert!(out.contains("touch"));
        assert!(!out.contains("eval"));
    }

    #[test]
    fn blocks_dependency_file_propagation() {
        let node = GenShNode {
            build_cmd: "gen.sh".to_string(),
            clean_cmd: None,
            input_files: ResourceFileSet::new(),
            outs: ResourceFileSet::new(),
            env: EnvVariables::new(),
            silent: true,
        };
        assert!(!node.include_dependencies(CollectionKind::DependencyFiles, Lang::NoLang));
        assert!(node.include_dependencies(CollectionKind::ObjectFiles, Lang::NoLang));
    }
}
