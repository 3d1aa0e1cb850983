//! `go_library`, `go_binary`. Go's own toolchain resolves the package
//! graph internally, so a `go_library` is a thin Collector (its sources and
//! import path propagate, no per-file objects are minted) and `go_binary`
//! is a Linker that invokes `go build` once over the whole package tree.

use crate::input::{Input, Lang};
use crate::makefile::Makefile;
use crate::node::variants::write_base_user_target;
use crate::node::{FlagSet, NodeCore, NodeHooks};
use crate::resource::{Resource, ResourceFileSet};
use crate::Result;

pub struct GoLibraryNode {
    pub sources: ResourceFileSet,
    pub import_path: String,
}

impl NodeHooks for GoLibraryNode {
    fn node_type_name(&self) -> &'static str {
        "go_library"
    }

    fn lang(&self) -> Lang {
        Lang::Golang
    }

    fn local_write_make(&self, core: &NodeCore, _input: &Input, mf: &mut Makefile) -> Result<()> {
        write_base_user_target(core, &self.sources.paths().iter().map(|s| s.to_string()).collect::<Vec<_>>(), mf);
        Ok(())
    }

    fn local_dependency_files(&self, _core: &NodeCore, lang: Lang, out: &mut ResourceFileSet) {
        if lang == Lang::Golang {
            out.extend(&self.sources);
        }
    }
}

pub struct GoBinaryNode {
    pub package_dir: std::path::PathBuf,
    pub output: Resource,
    pub own_build_flags: FlagSet,
}

impl NodeHooks for GoBinaryNode {
    fn node_type_name(&self) -> &'static str {
        "go_binary"
    }

    fn lang(&self) -> Lang {
        Lang::Golang
    }

    fn local_write_make(&self, core: &NodeCore, _input: &Input, mf: &mut Makefile) -> Result<()> {
        let mut rule = mf.start_rule(self.output.path(), &core.src_dir.display().to_string());
        rule.write_user_echo("Building", self.output.path());
        rule.write_command(&format!(
            "go build {flags} -o {out} {pkg}",
            flags = self.own_build_flags.join(" "),
            out = self.output.path(),
            pkg = self.package_dir.display(),
        ));
        mf.finish_rule(rule);
        write_base_user_target(core, &[self.output.path().to_string()], mf);
        Ok(())
    }

    fn local_final_outputs(&self, _core: &NodeCore, lang: Lang, out: &mut ResourceFileSet) {
        if lang == Lang::Golang {
            out.add(self.output.clone());
        }
    }
}
