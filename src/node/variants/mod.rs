//! One module per build kind family. Each variant struct carries its
//! own parsed fields and implements [`NodeHooks`]; [`NodeKind`] is the
//! tagged sum that lets the parser and generator treat all of them
//! uniformly.

pub mod cc;
pub mod gen_sh;
pub mod go;
pub mod java;
pub mod misc;
pub mod proto;
pub mod py;

use super::NodeHooks;

/// Tagged sum of every node variant. Polymorphism is expressed this way
/// rather than by deep inheritance, per the Design Notes: a shared
/// [`super::NodeCore`] plus one `NodeHooks` impl per member.
pub enum NodeKind {
    CcLibrary(cc::CcLibraryNode),
    CcBinary(cc::CcBinaryNode),
    CcTest(cc::CcTestNode),
    CcEmbedData(cc::CcEmbedDataNode),
    ProtoLibrary(proto::ProtoLibraryNode),
    JavaLibrary(java::JavaLibraryNode),
    JavaJar(java::JavaJarNode),
    JavaBinary(java::JavaBinaryNode),
    GoLibrary(go::GoLibraryNode),
    GoBinary(go::GoBinaryNode),
    PyLibrary(py::PyLibraryNode),
    PyEgg(py::PyEggNode),
    PyBinary(py::PyBinaryNode),
    GenSh(gen_sh::GenShNode),
    ConfigNode(misc::ConfigNodeData),
    FileGroup(misc::FileGroupNode),
    TopSymlink(misc::TopSymlinkNode),
}

impl NodeKind {
    pub fn hooks(&self) -> &dyn NodeHooks {
        match self {
            NodeKind::CcLibrary(n) => n,
            NodeKind::CcBinary(n) => n,
            NodeKind::CcTest(n) => n,
            NodeKind::CcEmbedData(n) => n,
            NodeKind::ProtoLibrary(n) => n,
            NodeKind::JavaLibrary(n) => n,
            NodeKind::JavaJar(n) => n,
            NodeKind::JavaBinary(n) => n,
            NodeKind::GoLibrary(n) => n,
            NodeKind::GoBinary(n) => n,
            NodeKind::PyLibrary(n) => n,
            NodeKind::PyEgg(n) => n,
            NodeKind::PyBinary(n) => n,
            NodeKind::GenSh(n) => n,
            NodeKind::ConfigNode(n) => n,
            NodeKind::FileGroup(n) => n,
            NodeKind::TopSymlink(n) => n,
        }
    }
}

/// Shared emission idiom: every variant's `local_write_make` must produce
/// a rule named `target.make_path()` so other nodes can depend on it by
/// name (the "user target"). Hoisted subnodes (e.g. a `cc_binary`'s
/// `top_symlink`) are folded in automatically: their own dependency edge
/// points at this node, not the other way around, so nothing else would
/// ever cause `make all`/`make <target>` to build them.
pub(crate) fn write_base_user_target(
    core: &super::NodeCore,
    prereqs: &[String],
    mf: &mut crate::makefile::Makefile,
) {
    let mut all = crate::resource::ResourceFileSet::new();
    for prereq in prereqs {
        all.add(crate::resource::Resource::from_local_path("", prereq));
    }
    for sub in &core.subnodes {
        for out in sub.borrow().final_outputs(crate::input::Lang::NoLang).files() {
            all.add(out.clone());
        }
    }
    mf.write_rule(core.target.make_path(), &all.join_paths(" \\\n\t"));
}
