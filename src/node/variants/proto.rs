//! `proto_library`: compiles `.proto` sources via `protoc` behind a
//! touchfile (so the combinatorial `.pb.cc`/`.pb.h` outputs collapse into a
//! single dependency edge), then compiles the generated C++ sources like a
//! `cc_library`.

use crate::input::{Input, Lang};
use crate::makefile::Makefile;
use crate::node::variants::write_base_user_target;
use crate::node::{FlagSet, NodeCore, NodeHooks};
use crate::resource::{Resource, ResourceFileSet};
use crate::Result;

pub struct ProtoLibraryNode {
    pub proto_sources: ResourceFileSet,
    pub generated_sources: ResourceFileSet,
    pub generated_headers: ResourceFileSet,
    pub own_compile_flags: FlagSet,
    pub own_include_dirs: FlagSet,
}

impl ProtoLibraryNode {
    fn object_for(&self, core: &NodeCore, source: &Resource) -> Resource {
        let prefix = format!("{}/", core.target.dir().display());
        let rel = source.path().strip_prefix(&prefix).unwrap_or(source.path());
        Resource::from_root_path(&core.obj_dir.join(rel).with_extension("o").display().to_string())
            .generated()
    }
}

impl NodeHooks for ProtoLibraryNode {
    fn node_type_name(&self) -> &'static str {
        "proto_library"
    }

    fn lang(&self) -> Lang {
        Lang::Cpp
    }

    fn local_write_make(&self, core: &NodeCore, _input: &Input, mf: &mut Makefile) -> Result<()> {
        let touchfile = core.touchfile(&core.gen_dir, "protoc");
        let mut rule = mf.start_rule(touchfile.path(), &self.proto_sources.join_paths(" "));
        rule.write_user_echo("Compiling protos for", core.target.full_path());
        rule.write_command(&format!("mkdir -p {}", core.gen_dir.display()));
        rule.write_command(&format!(
            "protoc --cpp_out={gen} {srcs}",
            gen = core.gen_dir.display(),
            srcs = self.proto_sources.join_paths(" "),
        ));
        rule.write_command(&format!("touch {}", touchfile.path()));
        mf.finish_rule(rule);

        let dirs = self
            .own_include_dirs
            .values()
            .iter()
            .map(|d| format!("-I{d}"))
            .collect::<Vec<_>>()
            .join(" ");
        let mut object_paths = Vec::new();
        for source in self.generated_sources.files() {
            let object = self.object_for(core, source);
            object_paths.push(object.path().to_string());
            let mut rule = mf.start_rule(object.path(), touchfile.path());
            rule.write_user_echo("Compiling", source.path());
            rule.write_command(&format!(
                "$(CXX) {flags} {dirs} -c {src} -o {obj}",
                flags = self.own_compile_flags.join(" "),
                src = source.path(),
                obj = object.path(),
            ));
            mf.finish_rule(rule);
        }

        write_base_user_target(core, &object_paths, mf);
        Ok(())
    }

    fn local_dependency_files(&self, _core: &NodeCore, lang: Lang, out: &mut ResourceFileSet) {
        if lang == Lang::Cpp || lang == Lang::NoLang {
            out.extend(&self.generated_headers);
        }
    }

    fn local_object_files(&self, core: &NodeCore, lang: Lang, out: &mut ResourceFileSet) {
        if lang == Lang::Cpp {
            for source in self.generated_sources.files() {
                out.add(self.object_for(core, source));
            }
        }
    }

    fn local_compile_flags(&self, _core: &NodeCore, lang: Lang, out: &mut FlagSet) {
        if lang == Lang::Cpp {
            out.extend(&self.own_compile_flags);
        }
    }

    fn local_include_dirs(&self, _core: &NodeCore, lang: Lang, out: &mut FlagSet) {
        if lang == Lang::Cpp {
            out.extend(&self.own_include_dirs);
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
    fn generated_objects_collapse_behind_touchfile() {
        let input = make_input();
        let target = TargetInfo::parse(std::path::Path::new("proto"), "//proto:msgs").unwrap();
        let core = NodeCore::new(target, &input);
        let mut proto_sources = ResourceFileSet::new();
        proto_sources.add(Resource::from_root_path("proto/msgs.proto"));
        let mut generated_sources = ResourceFileSet::new();
        generated_sources.add(Resource::from_root_path("$(GEN_DIR)/proto/msgs.pb.cc").generated());
        let node = ProtoLibraryNode {
            proto_sources,
            generated_sources,
            generated_headers: ResourceFileSet::new(),
            own_compile_flags: FlagSet::new(),
            own_include_dirs: FlagSet::new(),
        };
        let mut mf = Makefile::new(true);
        node.local_write_make(&core, &input, &mut mf).unwrap();
        assert!(mf.out().contains("protoc --cpp_out="));
        assert!(mf.out().contains("proto_msgs:"));
    }
}
