//! `py_library`, `py_egg`, `py_binary`. Python has no compile step, so
//! `py_library` is a pure Collector; `py_egg` packages a library's sources
//! into a `.egg`; `py_binary` wraps an entry-point module in a launcher
//! script and (at parse time, via the registry) hoists a `top_symlink`
//! subnode pointing at it.

use crate::input::{Input, Lang};
use crate::makefile::Makefile;
use crate::node::variants::write_base_user_target;
use crate::node::{NodeCore, NodeHooks};
use crate::resource::{Resource, ResourceFileSet};
use crate::Result;

pub struct PyLibraryNode {
    pub sources: ResourceFileSet,
}

impl NodeHooks for PyLibraryNode {
    fn node_type_name(&self) -> &'static str {
        "py_library"
    }

    fn lang(&self) -> Lang {
        Lang::Python
    }

    fn local_write_make(&self, core: &NodeCore, _input: &Input, mf: &mut Makefile) -> Result<()> {
        write_base_user_target(core, &self.sources.paths().iter().map(|s| s.to_string()).collect::<Vec<_>>(), mf);
        Ok(())
    }

    fn local_dependency_files(&self, _core: &NodeCore, lang: Lang, out: &mut ResourceFileSet) {
        if lang == Lang::Python {
            out.extend(&self.sources);
        }
    }
}

pub struct PyEggNode {
    pub sources: ResourceFileSet,
    pub egg: Resource,
}

impl NodeHooks for PyEggNode {
    fn node_type_name(&self) -> &'static str {
        "py_egg"
    }

    fn lang(&self) -> Lang {
        Lang::Python
    }

    fn local_write_make(&self, core: &NodeCore, _input: &Input, mf: &mut Makefile) -> Result<()> {
        let mut rule = mf.start_rule(self.egg.path(), &self.sources.join_paths(" "));
        rule.write_user_echo("Packaging", self.egg.path());
        rule.write_command(&format!("mkdir -p {}", core.target.dir().join("dist").display()));
        rule.write_command(&format!(
            "cd {dir} && python setup.py bdist_egg --dist-dir {out_dir}",
            dir = core.target.dir().display(),
            out_dir = core.gen_dir.display(),
        ));
        mf.finish_rule(rule);
        write_base_user_target(core, &[self.egg.path().to_string()], mf);
        Ok(())
    }

    fn local_final_outputs(&self, _core: &NodeCore, lang: Lang, out: &mut ResourceFileSet) {
        if lang == Lang::Python {
            out.add(self.egg.clone());
        }
    }
}

pub struct PyBinaryNode {
    pub default_module: String,
    pub launcher: Resource,
}

impl NodeHooks for PyBinaryNode {
    fn node_type_name(&self) -> &'static str {
        "py_binary"
    }

    fn lang(&self) -> Lang {
        Lang::Python
    }

    fn local_write_make(&self, core: &NodeCore, _input: &Input, mf: &mut Makefile) -> Result<()> {
        let entry = core.src_dir.join(format!("{}.py", self.default_module));
        let mut rule = mf.start_rule(self.launcher.path(), &entry.display().to_string());
        rule.write_user_echo("Generating launcher for", core.target.full_path());
        rule.write_command(&format!(
            "printf '#!/bin/sh\\nexec python3 %s \"$@\"\\n' {entry} > {launcher}",
            entry = entry.display(),
            launcher = self.launcher.path(),
        ));
        rule.write_command(&format!("chmod +x {}", self.launcher.path()));
        mf.finish_rule(rule);
        write_base_user_target(core, &[self.launcher.path().to_string()], mf);
        Ok(())
    }

    fn local_final_outputs(&self, _core: &NodeCore, lang: Lang, out: &mut ResourceFileSet) {
        if lang == Lang::Python {
            out.add(self.launcher.clone());
        }
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
    fn binary_launcher_points_at_default_module() {
        let input = make_input();
        let target = TargetInfo::parse(std::path::Path::new("py/app"), "//py/app:app").unwrap();
        let core = NodeCore::new(target, &input);
        let node = PyBinaryNode {
            default_module: "main".to_string(),
            launcher: Resource::from_root_path("$(BIN_DIR)/app").generated(),
        };
        let mut mf = Makefile::new(true);
        node.local_write_make(&core, &input, &mut mf).unwrap();
        assert!(mf.out().contains("main.py"));
    }
}
