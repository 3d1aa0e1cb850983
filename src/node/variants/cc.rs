//! `cc_library`, `cc_binary`, `cc_test`, `cc_embed_data`: the C/C++ family.
//! `cc_library` is a Collector when header-only, a Compiler otherwise;
//! `cc_binary`/`cc_test` are Linkers over the transitive object-file set.

use crate::input::{CollectionKind, Input, Lang};
use crate::makefile::Makefile;
use crate::node::variants::write_base_user_target;
use crate::node::{lang_matches, upward_flags, upward_resources, FlagSet, NodeCore, NodeHooks};
use crate::resource::{Resource, ResourceFileSet};
use crate::Result;

fn object_for_source(core: &NodeCore, source: &Resource) -> Resource {
    let prefix = format!("{}/", core.target.dir().display());
    let rel = source.path().strip_prefix(&prefix).unwrap_or(source.path());
    let obj_path = core.obj_dir.join(rel).with_extension("o");
    Resource::from_root_path(&obj_path.display().to_string()).generated()
}

fn compiler_for(lang: Lang) -> &'static str {
    if lang == Lang::Cpp {
        "$(CXX)"
    } else {
        "$(CC)"
    }
}

fn write_compile_rules(
    core: &NodeCore,
    lang: Lang,
    sources: &ResourceFileSet,
    compile_flags: &FlagSet,
    include_dirs: &FlagSet,
    mf: &mut Makefile,
) -> Vec<String> {
    let compiler = compiler_for(lang);
    let dirs = include_dirs
        .values()
        .iter()
        .map(|d| format!("-I{d}"))
        .collect::<Vec<_>>()
        .join(" ");
    let mut object_paths = Vec::new();
    for source in sources.files() {
        let object = object_for_source(core, source);
        object_paths.push(object.path().to_string());
        let mut rule = mf.start_rule(object.path(), source.path());
        rule.write_user_echo("Compiling", source.path());
        rule.write_command(&format!(
            "{compiler} {flags} {dirs} -c {src} -o {obj}",
            flags = compile_flags.join(" "),
            src = source.path(),
            obj = object.path(),
        ));
        mf.finish_rule(rule);
    }
    object_paths
}

pub struct CcLibraryNode {
    pub lang: Lang,
    pub sources: ResourceFileSet,
    pub headers: ResourceFileSet,
    pub own_compile_flags: FlagSet,
    pub own_link_flags: FlagSet,
    pub own_include_dirs: FlagSet,
    pub license: Option<String>,
}

impl NodeHooks for CcLibraryNode {
    fn node_type_name(&self) -> &'static str {
        "cc_library"
    }

    fn lang(&self) -> Lang {
        self.lang
    }

    fn local_write_make(&self, core: &NodeCore, _input: &Input, mf: &mut Makefile) -> Result<()> {
        let object_paths = write_compile_rules(
            core,
            self.lang,
            &self.sources,
            &self.own_compile_flags,
            &self.own_include_dirs,
            mf,
        );

        if object_paths.is_empty() {
            let header_paths: Vec<String> =
                self.headers.paths().iter().map(|s| s.to_string()).collect();
            write_base_user_target(core, &header_paths, mf);
        } else {
            write_base_user_target(core, &object_paths, mf);
        }
        Ok(())
    }

    fn local_dependency_files(&self, _core: &NodeCore, lang: Lang, out: &mut ResourceFileSet) {
        if lang_matches(self.lang, lang) {
            out.extend(&self.sources);
            out.extend(&self.headers);
        }
    }

    fn local_object_files(&self, core: &NodeCore, lang: Lang, out: &mut ResourceFileSet) {
        if lang_matches(self.lang, lang) {
            for source in self.sources.files() {
                out.add(object_for_source(core, source));
            }
        }
    }

    fn local_link_flags(&self, _core: &NodeCore, lang: Lang, out: &mut FlagSet) {
        if lang_matches(self.lang, lang) {
            out.extend(&self.own_link_flags);
        }
    }

    fn local_compile_flags(&self, _core: &NodeCore, lang: Lang, out: &mut FlagSet) {
        if lang_matches(self.lang, lang) {
            out.extend(&self.own_compile_flags);
        }
    }

    fn local_include_dirs(&self, _core: &NodeCore, lang: Lang, out: &mut FlagSet) {
        if lang_matches(self.lang, lang) {
            out.extend(&self.own_include_dirs);
        }
    }

    fn licenses(&self, core: &NodeCore, out: &mut Vec<(String, String)>) {
        if let Some(license) = &self.license {
            out.push((core.target.full_path().to_string(), license.clone()));
        }
    }
}

pub struct CcBinaryNode {
    pub lang: Lang,
    pub sources: ResourceFileSet,
    pub own_compile_flags: FlagSet,
    pub own_link_flags: FlagSet,
    pub own_include_dirs: FlagSet,
    pub output: Resource,
}

impl CcBinaryNode {
    fn link(&self, core: &NodeCore, mf: &mut Makefile) {
        let mut compile_flags = FlagSet::new();
        compile_flags.extend(&self.own_compile_flags);
        compile_flags.extend(&upward_flags(
            core,
            self,
            CollectionKind::CompileFlags,
            self.lang,
            |h, c, l, o| h.local_compile_flags(c, l, o),
        ));

        let mut include_dirs = FlagSet::new();
        include_dirs.extend(&self.own_include_dirs);
        include_dirs.extend(&upward_flags(
            core,
            self,
            CollectionKind::IncludeDirs,
            self.lang,
            |h, c, l, o| h.local_include_dirs(c, l, o),
        ));

        let object_paths = write_compile_rules(core, self.lang, &self.sources, &compile_flags, &include_dirs, mf);

        let mut objects = ResourceFileSet::new();
        for path in &object_paths {
            objects.add(Resource::from_root_path(path).generated());
        }
        objects.extend(&upward_resources(
            core,
            self,
            CollectionKind::ObjectFiles,
            self.lang,
            |h, c, l, o| h.local_object_files(c, l, o),
        ));

        let mut link_flags = FlagSet::new();
        link_flags.extend(&self.own_link_flags);
        link_flags.extend(&upward_flags(
            core,
            self,
            CollectionKind::LinkFlags,
            self.lang,
            |h, c, l, o| h.local_link_flags(c, l, o),
        ));

        let compiler = compiler_for(self.lang);
        let mut rule = mf.start_rule(self.output.path(), &objects.join_paths(" \\\n\t"));
        rule.write_user_echo("Linking", self.output.path());
        rule.write_command(&format!(
            "{compiler} {objs} {flags} -o {out}",
            objs = objects.join_paths(" "),
            flags = link_flags.join(" "),
            out = self.output.path(),
        ));
        mf.finish_rule(rule);

        write_base_user_target(core, &[self.output.path().to_string()], mf);
    }
}

impl NodeHooks for CcBinaryNode {
    fn node_type_name(&self) -> &'static str {
        "cc_binary"
    }

    fn lang(&self) -> Lang {
        self.lang
    }

    fn local_write_make(&self, core: &NodeCore, _input: &Input, mf: &mut Makefile) -> Result<()> {
        self.link(core, mf);
        Ok(())
    }

    fn local_object_files(&self, core: &NodeCore, lang: Lang, out: &mut ResourceFileSet) {
        if lang_matches(self.lang, lang) {
            for source in self.sources.files() {
                out.add(object_for_source(core, source));
            }
        }
    }

    fn local_link_flags(&self, _core: &NodeCore, lang: Lang, out: &mut FlagSet) {
        if lang_matches(self.lang, lang) {
            out.extend(&self.own_link_flags);
        }
    }

    fn local_compile_flags(&self, _core: &NodeCore, lang: Lang, out: &mut FlagSet) {
        if lang_matches(self.lang, lang) {
            out.extend(&self.own_compile_flags);
        }
    }

    fn local_final_outputs(&self, _core: &NodeCore, lang: Lang, out: &mut ResourceFileSet) {
        if lang_matches(self.lang, lang) {
            out.add(self.output.clone());
        }
    }
}

pub struct CcTestNode {
    pub binary: CcBinaryNode,
}

impl NodeHooks for CcTestNode {
    fn node_type_name(&self) -> &'static str {
        "cc_test"
    }

    fn lang(&self) -> Lang {
        self.binary.lang
    }

    fn local_write_make(&self, core: &NodeCore, input: &Input, mf: &mut Makefile) -> Result<()> {
        self.binary.local_write_make(core, input, mf)
    }

    fn local_object_files(&self, core: &NodeCore, lang: Lang, out: &mut ResourceFileSet) {
        self.binary.local_object_files(core, lang, out)
    }

    fn local_link_flags(&self, core: &NodeCore, lang: Lang, out: &mut FlagSet) {
        self.binary.local_link_flags(core, lang, out)
    }

    fn local_compile_flags(&self, core: &NodeCore, lang: Lang, out: &mut FlagSet) {
        self.binary.local_compile_flags(core, lang, out)
    }

    fn local_final_outputs(&self, core: &NodeCore, lang: Lang, out: &mut ResourceFileSet) {
        self.binary.local_final_outputs(core, lang, out)
    }

    fn include_in_all(&self) -> bool {
        false
    }

    fn include_in_tests(&self) -> bool {
        true
    }

    fn final_tests(&self, _core: &NodeCore, out: &mut ResourceFileSet) {
        out.add(self.binary.output.clone());
    }
}

/// `cc_embed_data`: a one-shot generator (embeds a data blob as a `.cc`/`.h`
/// pair) synchronized through a touchfile, so a downstream `cc_library`
/// sees a single generated-pair dependency edge rather than the raw data
/// file list.
pub struct CcEmbedDataNode {
    pub data_files: ResourceFileSet,
    pub generated_header: Resource,
    pub generated_source: Resource,
}

impl NodeHooks for CcEmbedDataNode {
    fn node_type_name(&self) -> &'static str {
        "cc_embed_data"
    }

    fn lang(&self) -> Lang {
        Lang::Cpp
    }

    fn local_write_make(&self, core: &NodeCore, _input: &Input, mf: &mut Makefile) -> Result<()> {
        let touchfile = core.touchfile(&core.gen_dir, "embed");
        let mut rule = mf.start_rule(touchfile.path(), &self.data_files.join_paths(" "));
        rule.write_user_echo("Embedding data for", core.target.full_path());
        rule.write_command(&format!("mkdir -p {}", core.gen_dir.display()));
        rule.write_command(&format!(
            "embed_data --out-header {h} --out-source {s} {ins}",
            h = self.generated_header.path(),
            s = self.generated_source.path(),
            ins = self.data_files.join_paths(" "),
        ));
        rule.write_command(&format!("touch {}", touchfile.path()));
        mf.finish_rule(rule);

        write_base_user_target(core, &[touchfile.path().to_string()], mf);
        Ok(())
    }

    fn local_object_files(&self, core: &NodeCore, lang: Lang, out: &mut ResourceFileSet) {
        if lang_matches(Lang::Cpp, lang) {
            out.add(object_for_source(core, &self.generated_source));
        }
    }

    fn local_dependency_files(&self, _core: &NodeCore, lang: Lang, out: &mut ResourceFileSet) {
        if lang_matches(Lang::Cpp, lang) {
            out.add(self.generated_header.clone());
        }
    }

    fn include_dependencies(&self, kind: CollectionKind, _lang: Lang) -> bool {
        kind != CollectionKind::DependencyFiles
    }
}
