//! Node builder registry: maps a `BUILD` file entry's `type` string to a
//! constructor function, and contributes the one-time toolchain preamble
//! every node kind relies on (`$(CC)`, `$(CXX)`, …).

use std::collections::HashMap;

use crate::buildfile::BuildFileNode;
use crate::errors::ParserError;
use crate::input::{Input, Lang};
use crate::makefile::Makefile;
use crate::node::variants::{cc, gen_sh, go, java, misc, proto, py, NodeKind};
use crate::node::{EnvVariables, FlagSet, NodeCore};
use crate::resource::{Resource, ResourceFileSet, TargetInfo};

type Constructor = fn(&BuildFileNode, &mut NodeCore, &Input) -> Result<NodeKind, ParserError>;

pub struct BuilderRegistry {
    constructors: HashMap<&'static str, Constructor>,
}

impl Default for BuilderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BuilderRegistry {
    pub fn new() -> Self {
        let mut constructors: HashMap<&'static str, Constructor> = HashMap::new();
        constructors.insert("cc_library", build_cc_library);
        constructors.insert("cc_binary", build_cc_binary);
        constructors.insert("cc_test", build_cc_test);
        constructors.insert("cc_embed_data", build_cc_embed_data);
        constructors.insert("proto_library", build_proto_library);
        constructors.insert("java_library", build_java_library);
        constructors.insert("java_jar", build_java_jar);
        constructors.insert("java_binary", build_java_binary);
        constructors.insert("go_library", build_go_library);
        constructors.insert("go_binary", build_go_binary);
        constructors.insert("py_library", build_py_library);
        constructors.insert("py_egg", build_py_egg);
        constructors.insert("py_binary", build_py_binary);
        constructors.insert("gen_sh", build_gen_sh);
        constructors.insert("confignode", build_confignode);
        constructors.insert("filegroup", build_filegroup);
        Self { constructors }
    }

    pub fn construct(
        &self,
        kind: &str,
        bfnode: &BuildFileNode,
        core: &mut NodeCore,
        input: &Input,
    ) -> Result<NodeKind, ParserError> {
        let ctor = self.constructors.get(kind).ok_or_else(|| {
            ParserError::UnknownNodeType(kind.to_string(), core.target.full_path().to_string())
        })?;
        ctor(bfnode, core, input)
    }

    /// One-time preamble every variant's recipes assume is in scope.
    pub fn write_make_head(&self, input: &Input, mf: &mut Makefile) {
        mf.append("CC ?= gcc\n");
        mf.append("CXX ?= g++\n");
        mf.append(&format!("CXXFLAGS += {}\n", input.flags("CXXFLAGS").join(" ")));
        mf.append(&format!("CFLAGS += {}\n", input.flags("CFLAGS").join(" ")));
        mf.append(&format!("LDFLAGS += {}\n", input.flags("LDFLAGS").join(" ")));
        mf.append("ROOT_DIR := $(shell pwd)\n");
        mf.append(&format!("OBJ_DIR := {}\n", input.object_dir.display()));
        mf.append(&format!("BIN_DIR := {}\n", input.binary_dir.display()));
        mf.append(&format!("GEN_DIR := {}\n", input.genfile_dir.display()));
        mf.append(&format!("SRC_DIR := {}\n", input.source_dir.display()));
        mf.append(&format!("PKG_DIR := {}\n", input.pkgfile_dir.display()));
        mf.append("\n");
    }
}

fn required_files(
    bfnode: &BuildFileNode,
    key: &str,
    root_dir: &std::path::Path,
    strict: bool,
) -> Result<ResourceFileSet, ParserError> {
    let mut set = ResourceFileSet::new();
    for r in bfnode.file_list_field(key, root_dir, strict)? {
        set.add(r);
    }
    Ok(set)
}

fn flag_set(bfnode: &BuildFileNode, key: &str) -> Result<FlagSet, ParserError> {
    let mut set = FlagSet::new();
    for v in bfnode.string_list_field(key)? {
        set.add(v);
    }
    Ok(set)
}

fn resolve_dependencies(bfnode: &BuildFileNode, core: &mut NodeCore) -> Result<(), ParserError> {
    for token in bfnode.dependencies()? {
        core.add_dependency_target(TargetInfo::parse(core.target.dir(), &token)?);
    }
    Ok(())
}

fn build_cc_library(
    bfnode: &BuildFileNode,
    core: &mut NodeCore,
    input: &Input,
) -> Result<NodeKind, ParserError> {
    resolve_dependencies(bfnode, core)?;
    core.strict_file_mode = bfnode.strict_file_mode();
    let sources = required_files(bfnode, "sources", &input.root_dir, core.strict_file_mode)?;
    let headers = required_files(bfnode, "headers", &input.root_dir, core.strict_file_mode)?;
    let lang = if sources.files().iter().any(|r| r.path().ends_with(".c")) {
        Lang::C
    } else {
        Lang::Cpp
    };
    Ok(NodeKind::CcLibrary(cc::CcLibraryNode {
        lang,
        sources,
        headers,
        own_compile_flags: flag_set(bfnode, "compile_flags")?,
        own_link_flags: flag_set(bfnode, "link_flags")?,
        own_include_dirs: flag_set(bfnode, "include_dirs")?,
        license: bfnode.string_field("license")?,
    }))
}

fn build_cc_binary(
    bfnode: &BuildFileNode,
    core: &mut NodeCore,
    input: &Input,
) -> Result<NodeKind, ParserError> {
    resolve_dependencies(bfnode, core)?;
    core.strict_file_mode = bfnode.strict_file_mode();
    let sources = required_files(bfnode, "sources", &input.root_dir, core.strict_file_mode)?;
    let output = Resource::from_local_path(
        &input.binary_dir.display().to_string(),
        &format!("{}/{}", core.target.dir().display(), core.target.local_name()),
    )
    .generated();

    let link_path = Resource::from_root_path(core.target.local_name());
    let symlink_target = TargetInfo::parse(core.target.dir(), &format!(":{}_link", core.target.local_name()))?;
    let mut symlink_core = NodeCore::new(symlink_target, input);
    symlink_core.add_dependency_target(core.target.clone());
    let symlink = crate::node::Node::new(
        symlink_core,
        NodeKind::TopSymlink(misc::TopSymlinkNode {
            target_resource: output.clone(),
            link_path,
        }),
    );
    core.add_sub_node(std::rc::Rc::new(std::cell::RefCell::new(symlink)));

    Ok(NodeKind::CcBinary(cc::CcBinaryNode {
        lang: Lang::Cpp,
        sources,
        own_compile_flags: flag_set(bfnode, "compile_flags")?,
        own_link_flags: flag_set(bfnode, "link_flags")?,
        own_include_dirs: flag_set(bfnode, "include_dirs")?,
        output,
    }))
}

fn build_cc_test(
    bfnode: &BuildFileNode,
    core: &mut NodeCore,
    input: &Input,
) -> Result<NodeKind, ParserError> {
    match build_cc_binary(bfnode, core, input)? {
        NodeKind::CcBinary(binary) => Ok(NodeKind::CcTest(cc::CcTestNode { binary })),
        _ => unreachable!(),
    }
}

fn build_cc_embed_data(
    bfnode: &BuildFileNode,
    core: &mut NodeCore,
    input: &Input,
) -> Result<NodeKind, ParserError> {
    resolve_dependencies(bfnode, core)?;
    let data_files = required_files(bfnode, "data", &input.root_dir, bfnode.strict_file_mode())?;
    let base = format!("{}/{}", core.gen_dir.display(), core.target.local_name());
    Ok(NodeKind::CcEmbedData(cc::CcEmbedDataNode {
        data_files,
        generated_header: Resource::from_root_path(&format!("{base}.h")).generated(),
        generated_source: Resource::from_root_path(&format!("{base}.cc")).generated(),
    }))
}

fn build_proto_library(
    bfnode: &BuildFileNode,
    core: &mut NodeCore,
    input: &Input,
) -> Result<NodeKind, ParserError> {
    resolve_dependencies(bfnode, core)?;
    let proto_sources = required_files(bfnode, "sources", &input.root_dir, bfnode.strict_file_mode())?;
    let mut generated_sources = ResourceFileSet::new();
    let mut generated_headers = ResourceFileSet::new();
    for proto in proto_sources.files() {
        let stem = std::path::Path::new(proto.basename())
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(proto.basename())
            .to_string();
        let base = format!("{}/{}.pb", core.gen_dir.display(), stem);
        generated_sources.add(Resource::from_root_path(&format!("{base}.cc")).generated());
        generated_headers.add(Resource::from_root_path(&format!("{base}.h")).generated());
    }
    Ok(NodeKind::ProtoLibrary(proto::ProtoLibraryNode {
        proto_sources,
        generated_sources,
        generated_headers,
        own_compile_flags: flag_set(bfnode, "compile_flags")?,
        own_include_dirs: flag_set(bfnode, "include_dirs")?,
    }))
}

fn build_java_library(
    bfnode: &BuildFileNode,
    core: &mut NodeCore,
    input: &Input,
) -> Result<NodeKind, ParserError> {
    resolve_dependencies(bfnode, core)?;
    let sources = required_files(bfnode, "sources", &input.root_dir, bfnode.strict_file_mode())?;
    Ok(NodeKind::JavaLibrary(java::JavaLibraryNode {
        sources,
        own_compile_flags: flag_set(bfnode, "compile_flags")?,
        classpath: flag_set(bfnode, "classpath")?,
    }))
}

fn build_java_jar(
    bfnode: &BuildFileNode,
    core: &mut NodeCore,
    input: &Input,
) -> Result<NodeKind, ParserError> {
    resolve_dependencies(bfnode, core)?;
    let output = Resource::from_local_path(
        &input.binary_dir.display().to_string(),
        &format!("{}.jar", core.target.local_name()),
    )
    .generated();
    Ok(NodeKind::JavaJar(java::JavaJarNode {
        output,
        main_class: bfnode.string_field("main_class")?,
    }))
}

fn build_java_binary(
    bfnode: &BuildFileNode,
    core: &mut NodeCore,
    input: &Input,
) -> Result<NodeKind, ParserError> {
    match build_java_jar(bfnode, core, input)? {
        NodeKind::JavaJar(jar) => {
            let launcher = Resource::from_local_path(
                &input.binary_dir.display().to_string(),
                core.target.local_name(),
            )
            .generated();
            Ok(NodeKind::JavaBinary(java::JavaBinaryNode { jar, launcher }))
        }
        _ => unreachable!(),
    }
}

fn build_go_library(
    bfnode: &BuildFileNode,
    core: &mut NodeCore,
    input: &Input,
) -> Result<NodeKind, ParserError> {
    resolve_dependencies(bfnode, core)?;
    let sources = required_files(bfnode, "go_sources", &input.root_dir, bfnode.strict_file_mode())?;
    Ok(NodeKind::GoLibrary(go::GoLibraryNode {
        sources,
        import_path: bfnode
            .string_field("import_path")?
            .unwrap_or_else(|| core.target.full_path().to_string()),
    }))
}

fn build_go_binary(
    bfnode: &BuildFileNode,
    core: &mut NodeCore,
    input: &Input,
) -> Result<NodeKind, ParserError> {
    resolve_dependencies(bfnode, core)?;
    let output = Resource::from_local_path(
        &input.binary_dir.display().to_string(),
        core.target.local_name(),
    )
    .generated();
    Ok(NodeKind::GoBinary(go::GoBinaryNode {
        package_dir: core.target.dir().to_path_buf(),
        output,
        own_build_flags: flag_set(bfnode, "build_flags")?,
    }))
}

fn build_py_library(
    bfnode: &BuildFileNode,
    core: &mut NodeCore,
    input: &Input,
) -> Result<NodeKind, ParserError> {
    resolve_dependencies(bfnode, core)?;
    let sources = required_files(bfnode, "py_sources", &input.root_dir, bfnode.strict_file_mode())?;
    Ok(NodeKind::PyLibrary(py::PyLibraryNode { sources }))
}

fn build_py_egg(
    bfnode: &BuildFileNode,
    core: &mut NodeCore,
    input: &Input,
) -> Result<NodeKind, ParserError> {
    resolve_dependencies(bfnode, core)?;
    let sources = required_files(bfnode, "py_sources", &input.root_dir, bfnode.strict_file_mode())?;
    let egg = Resource::from_local_path(
        &input.genfile_dir.display().to_string(),
        &format!("{}.egg", core.target.local_name()),
    )
    .generated();
    Ok(NodeKind::PyEgg(py::PyEggNode { sources, egg }))
}

fn build_py_binary(
    bfnode: &BuildFileNode,
    core: &mut NodeCore,
    input: &Input,
) -> Result<NodeKind, ParserError> {
    resolve_dependencies(bfnode, core)?;
    let default_module = bfnode
        .string_field("main_module")?
        .unwrap_or_else(|| "main".to_string());
    let launcher = Resource::from_local_path(
        &input.binary_dir.display().to_string(),
        core.target.local_name(),
    )
    .generated();

    let link_path = Resource::from_root_path(core.target.local_name());
    let symlink_target = TargetInfo::parse(core.target.dir(), &format!(":{}_link", core.target.local_name()))?;
    let mut symlink_core = NodeCore::new(symlink_target, input);
    symlink_core.add_dependency_target(core.target.clone());
    let symlink = crate::node::Node::new(
        symlink_core,
        NodeKind::TopSymlink(misc::TopSymlinkNode {
            target_resource: launcher.clone(),
            link_path,
        }),
    );
    core.add_sub_node(std::rc::Rc::new(std::cell::RefCell::new(symlink)));

    Ok(NodeKind::PyBinary(py::PyBinaryNode {
        default_module,
        launcher,
    }))
}

fn build_gen_sh(
    bfnode: &BuildFileNode,
    core: &mut NodeCore,
    input: &Input,
) -> Result<NodeKind, ParserError> {
    resolve_dependencies(bfnode, core)?;
    let build_cmd = match bfnode.string_field("cmd")? {
        Some(cmd) => cmd,
        None => match bfnode.string_field("build_cmd")? {
            Some(cmd) => cmd,
            None => {
                return Err(ParserError::MissingRequiredField(
                    "build_cmd or cmd".to_string(),
                    core.target.full_path().to_string(),
                ))
            }
        },
    };
    let clean_cmd = bfnode.string_field("clean")?;
    let input_files = required_files(bfnode, "input_files", &input.root_dir, false)?;
    let mut outs = ResourceFileSet::new();
    for rel in bfnode.string_list_field("outs")? {
        outs.add(Resource::from_root_path(&core.target.dir().join(&rel).display().to_string()).generated());
    }
    let mut env = EnvVariables::new();
    for (k, v) in bfnode.string_map_field("env")? {
        env.set(k, v);
    }
    Ok(NodeKind::GenSh(gen_sh::GenShNode {
        build_cmd,
        clean_cmd,
        input_files,
        outs,
        env,
        silent: input.silent_gensh,
    }))
}

fn build_confignode(
    bfnode: &BuildFileNode,
    core: &mut NodeCore,
    _input: &Input,
) -> Result<NodeKind, ParserError> {
    resolve_dependencies(bfnode, core)?;
    let mut own_env = EnvVariables::new();
    for (k, v) in bfnode.string_map_field("env")? {
        own_env.set(k, v);
    }
    Ok(NodeKind::ConfigNode(misc::ConfigNodeData {
        own_compile_flags: flag_set(bfnode, "compile_flags")?,
        own_link_flags: flag_set(bfnode, "link_flags")?,
        own_env,
    }))
}

fn build_filegroup(
    bfnode: &BuildFileNode,
    core: &mut NodeCore,
    input: &Input,
) -> Result<NodeKind, ParserError> {
    resolve_dependencies(bfnode, core)?;
    let files = required_files(bfnode, "sources", &input.root_dir, bfnode.strict_file_mode())?;
    Ok(NodeKind::FileGroup(misc::FileGroupNode { files }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_kind_is_rejected() {
        let registry = BuilderRegistry::new();
        assert!(registry.constructors.get("nonexistent_kind").is_none());
    }

    #[test]
    fn every_documented_kind_has_a_constructor() {
        let registry = BuilderRegistry::new();
        for kind in [
            "cc_library",
            "cc_binary",
            "cc_test",
            "cc_embed_data",
            "proto_library",
            "java_library",
            "java_jar",
            "java_binary",
            "go_library",
            "go_binary",
            "py_library",
            "py_egg",
            "py_binary",
            "gen_sh",
            "confignode",
            "filegroup",
        ] {
            assert!(registry.constructors.contains_key(kind), "missing {kind}");
        }
    }
}
