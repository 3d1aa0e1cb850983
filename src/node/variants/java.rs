//! `java_library`, `java_jar`, `java_binary`. `java_library` is a Compiler
//! (per-source `.class` marks); `java_jar` is a Linker/packager that bundles
//! transitive `.class` outputs into a jar; `java_binary` packages a runnable
//! jar plus a launcher wrapper script.

use crate::input::{Input, Lang};
use crate::makefile::Makefile;
use crate::node::variants::write_base_user_target;
use crate::node::{upward_resources, FlagSet, NodeCore, NodeHooks};
use crate::resource::{Resource, ResourceFileSet};
use crate::Result;

fn class_for(core: &NodeCore, source: &Resource) -> Resource {
    let prefix = format!("{}/", core.target.dir().display());
    let rel = source.path().strip_prefix(&prefix).unwrap_or(source.path());
    Resource::from_root_path(&core.obj_dir.join(rel).with_extension("class").display().to_string())
        .generated()
}

pub struct JavaLibraryNode {
    pub sources: ResourceFileSet,
    pub own_compile_flags: FlagSet,
    pub classpath: FlagSet,
}

impl NodeHooks for JavaLibraryNode {
    fn node_type_name(&self) -> &'static str {
        "java_library"
    }

    fn lang(&self) -> Lang {
        Lang::Java
    }

    fn local_write_make(&self, core: &NodeCore, _input: &Input, mf: &mut Makefile) -> Result<()> {
        let cp = self.classpath.join(":");
        let mut object_paths = Vec::new();
        for source in self.sources.files() {
            let class = class_for(core, source);
            object_paths.push(class.path().to_string());
            let mut rule = mf.start_rule(class.path(), source.path());
            rule.write_user_echo("Compiling", source.path());
            rule.write_command(&format!(
                "javac {flags} -cp {cp} -d {obj_dir} {src}",
                flags = self.own_compile_flags.join(" "),
                cp = if cp.is_empty() { ".".to_string() } else { cp.clone() },
                obj_dir = core.obj_dir.display(),
                src = source.path(),
            ));
            mf.finish_rule(rule);
        }
        write_base_user_target(core, &object_paths, mf);
        Ok(())
    }

    fn local_dependency_files(&self, _core: &NodeCore, lang: Lang, out: &mut ResourceFileSet) {
        if lang == Lang::Java {
            out.extend(&self.sources);
        }
    }

    fn local_object_files(&self, core: &NodeCore, lang: Lang, out: &mut ResourceFileSet) {
        if lang == Lang::Java {
            for source in self.sources.files() {
                out.add(class_for(core, source));
            }
        }
    }

    fn local_compile_flags(&self, _core: &NodeCore, lang: Lang, out: &mut FlagSet) {
        if lang == Lang::Java {
            out.extend(&self.own_compile_flags);
        }
    }
}

pub struct JavaJarNode {
    pub output: Resource,
    pub main_class: Option<String>,
}

impl JavaJarNode {
    fn pack(&self, core: &NodeCore, mf: &mut Makefile) {
        let objects = upward_resources(
            core,
            self as &dyn NodeHooks,
            crate::input::CollectionKind::ObjectFiles,
            Lang::Java,
            |h, c, l, o| h.local_object_files(c, l, o),
        );
        let mut rule = mf.start_rule(self.output.path(), &objects.join_paths(" \\\n\t"));
        rule.write_user_echo("Packaging", self.output.path());
        rule.write_command(&format!("mkdir -p {}", core.obj_dir.display()));
        let manifest = match &self.main_class {
            Some(m) => format!("cfe {} {}", self.output.path(), m),
            None => format!("cf {}", self.output.path()),
        };
        rule.write_command(&format!(
            "jar {manifest} -C {obj_dir} .",
            manifest = manifest,
            obj_dir = core.obj_dir.display(),
        ));
        mf.finish_rule(rule);
        write_base_user_target(core, &[self.output.path().to_string()], mf);
    }
}

impl NodeHooks for JavaJarNode {
    fn node_type_name(&self) -> &'static str {
        "java_jar"
    }

    fn lang(&self) -> Lang {
        Lang::Java
    }

    fn local_write_make(&self, core: &NodeCore, _input: &Input, mf: &mut Makefile) -> Result<()> {
        self.pack(core, mf);
        Ok(())
    }

    fn local_final_outputs(&self, _core: &NodeCore, lang: Lang, out: &mut ResourceFileSet) {
        if lang == Lang::Java {
            out.add(self.output.clone());
        }
    }
}

pub struct JavaBinaryNode {
    pub jar: JavaJarNode,
    pub launcher: Resource,
}

impl NodeHooks for JavaBinaryNode {
    fn node_type_name(&self) -> &'static str {
        "java_binary"
    }

    fn lang(&self) -> Lang {
        Lang::Java
    }

    fn local_write_make(&self, core: &NodeCore, input: &Input, mf: &mut Makefile) -> Result<()> {
        self.jar.local_write_make(core, input, mf)?;
        let mut rule = mf.start_rule(self.launcher.path(), self.jar.output.path());
        rule.write_user_echo("Generating launcher for", core.target.full_path());
        rule.write_command(&format!(
            "printf '#!/bin/sh\\nexec java -jar %s \"$@\"\\n' {jar} > {launcher}",
            jar = self.jar.output.path(),
            launcher = self.launcher.path(),
        ));
        rule.write_command(&format!("chmod +x {}", self.launcher.path()));
        mf.finish_rule(rule);
        write_base_user_target(core, &[self.launcher.path().to_string()], mf);
        Ok(())
    }

    fn local_final_outputs(&self, core: &NodeCore, lang: Lang, out: &mut ResourceFileSet) {
        self.jar.local_final_outputs(core, lang, out);
        if lang == Lang::Java {
            out.add(self.launcher.clone());
        }
    }

    fn include_in_all(&self) -> bool {
        true
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
    fn library_compiles_each_source_to_a_class() {
        let input = make_input();
        let target = TargetInfo::parse(std::path::Path::new("java/app"), "//java/app:lib").unwrap();
        let core = NodeCore::new(target, &input);
        let mut sources = ResourceFileSet::new();
        sources.add(Resource::from_root_path("java/app/Main.java"));
        let node = JavaLibraryNode {
            sources,
            own_compile_flags: FlagSet::new(),
            classpath: FlagSet::new(),
        };
        let mut mf = Makefile::new(true);
        node.local_write_make(&core, &input, &mut mf).unwrap();
        assert!(mf.out().contains("javac"));
        assert!(mf.out().contains("java_app_lib:"));
    }

    #[test]
    fn jar_with_main_class_emits_executable_manifest_flag() {
        let input = make_input();
        let target = TargetInfo::parse(std::path::Path::new("java/app"), "//java/app:jar").unwrap();
        let core = NodeCore::new(target, &input);
        let node = JavaJarNode {
            output: Resource::from_root_path("$(BIN_DIR)/app.jar").generated(),
            main_class: Some("com.example.Main".to_string()),
        };
        let mut mf = Makefile::new(true);
        node.local_write_make(&core, &input, &mut mf).unwrap();
        assert!(mf.out().contains("cfe $(BIN_DIR)/app.jar com.example.Main"));
    }
}
