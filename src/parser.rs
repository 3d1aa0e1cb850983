//! Parser: walks `BUILD` files across the tree, instantiates nodes
//! through the builder registry, hoists subnodes, and resolves declared
//! dependency targets into `Node*` edges.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

use crate::buildfile::{BuildFile, BUILD_FILE_NAME};
use crate::cache::BuildFileCache;
use crate::errors::ParserError;
use crate::input::Input;
use crate::node::{Node, NodeCore, NodeHandle};
use crate::registry::BuilderRegistry;
use crate::resource::TargetInfo;

/// Owns every node ever constructed during a parse. Dependencies and
/// subnodes reference nodes here by cloning the `Rc`; this pool is the only
/// owning slot.
pub struct NodePool {
    nodes: HashMap<String, NodeHandle>,
    /// The targets the parse was originally seeded with, in declaration
    /// order — used to build `all`/`tests`/`install`.
    pub input_targets: Vec<String>,
    /// Every node ever inserted into `nodes`, in the order it was created —
    /// top-level targets first, each one's hoisted subnodes immediately
    /// after. A subnode's dependency edge points *at* its parent (so the
    /// parent's rule is emitted first), which means nothing in the
    /// dependency graph points *at* the subnode itself; seeding the process
    /// order from `input_targets` alone would never visit it. Seeding from
    /// this list instead guarantees every hoisted subnode is reachable.
    creation_order: Vec<String>,
}

impl NodePool {
    pub fn get(&self, full_path: &str) -> Option<NodeHandle> {
        self.nodes.get(full_path).cloned()
    }

    pub fn input_nodes(&self) -> Vec<NodeHandle> {
        self.input_targets
            .iter()
            .filter_map(|t| self.get(t))
            .collect()
    }

    /// All nodes (top-level targets and hoisted subnodes alike) in creation
    /// order. Used to seed the process order so no subnode is dropped.
    pub fn all_nodes_in_creation_order(&self) -> Vec<NodeHandle> {
        self.creation_order
            .iter()
            .filter_map(|t| self.get(t))
            .collect()
    }

    pub fn all_nodes(&self) -> impl Iterator<Item = &NodeHandle> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

pub struct Parser<'a> {
    input: &'a Input,
    registry: BuilderRegistry,
    build_files: HashMap<PathBuf, BuildFile>,
    cache: Option<BuildFileCache>,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a Input) -> Self {
        Self {
            input,
            registry: BuilderRegistry::new(),
            build_files: HashMap::new(),
            cache: None,
        }
    }

    /// Opts into the manifest cache: repeated invocations over an
    /// unchanged tree skip re-parsing `BUILD` files whose modification
    /// time hasn't moved forward.
    pub fn with_cache(mut self, cache: BuildFileCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// `dir` is always a repo-root-relative logical directory; the actual
    /// `BUILD` file lives at `input.root_dir.join(dir)` on disk.
    fn build_file(&mut self, dir: &Path) -> Result<&BuildFile, ParserError> {
        if !self.build_files.contains_key(dir) {
            let disk_dir = self.input.root_dir.join(dir);
            let path = disk_dir.join(BUILD_FILE_NAME);
            let value = match &self.cache {
                Some(cache) => match cache.get(&path) {
                    Some(cached) => cached,
                    None => {
                        let fresh = BuildFile::load_value(&path)?;
                        if let Err(e) = cache.store(&path, &fresh) {
                            log::warn!("failed to write manifest cache entry for {}: {e}", path.display());
                        }
                        fresh
                    }
                },
                None => BuildFile::load_value(&path)?,
            };
            let loaded = BuildFile::from_value(dir, path, value);
            self.build_files.insert(dir.to_path_buf(), loaded);
        }
        Ok(self.build_files.get(dir).unwrap())
    }

    /// Entry point. `seed_token` selects a single target (any form accepted
    /// by `TargetInfo::parse`); `None` parses every entry declared in the
    /// root `BUILD` file.
    pub fn parse(&mut self, seed_token: Option<&str>) -> Result<NodePool, ParserError> {
        let mut nodes: HashMap<String, NodeHandle> = HashMap::new();
        let mut queue: VecDeque<(PathBuf, String)> = VecDeque::new();
        let mut queued: std::collections::HashSet<String> = std::collections::HashSet::new();
        let mut input_targets = Vec::new();
        let mut creation_order = Vec::new();

        match seed_token {
            Some(token) => {
                let target = TargetInfo::parse(&self.input.current_path, token)?;
                input_targets.push(target.full_path().to_string());
                queued.insert(target.full_path().to_string());
                queue.push_back((target.dir().to_path_buf(), target.local_name().to_string()));
            }
            None => {
                let logical_root = PathBuf::new();
                let names: Vec<String> = {
                    let bf = self.build_file(&logical_root)?;
                    bf.entries(self.input)?
                        .into_iter()
                        .map(|e| e.name.clone())
                        .collect()
                };
                for name in names {
                    let target = TargetInfo::parse(&logical_root, &format!(":{name}"))?;
                    input_targets.push(target.full_path().to_string());
                    queued.insert(target.full_path().to_string());
                    queue.push_back((logical_root.clone(), name));
                }
            }
        }

        while let Some((dir, name)) = queue.pop_front() {
            let target = TargetInfo::parse(&dir, &format!(":{name}"))?;
            if nodes.contains_key(target.full_path()) {
                continue;
            }

            let kind_string = {
                let bf = self.build_file(&dir)?;
                bf.find(&name, self.input)?.kind.clone()
            };

            let mut core = NodeCore::new(target.clone(), self.input);
            let kind = {
                let bf = self.build_files.get(&dir).unwrap();
                let entry = bf.find(&name, self.input)?;
                self.registry.construct(&kind_string, &entry, &mut core, self.input)?
            };

            let pending_dep_targets = core.dep_targets.clone();
            let node = Node::new(core, kind);
            let handle: NodeHandle = std::rc::Rc::new(std::cell::RefCell::new(node));
            nodes.insert(target.full_path().to_string(), handle.clone());
            creation_order.push(target.full_path().to_string());

            for dep in &pending_dep_targets {
                if queued.insert(dep.full_path().to_string()) {
                    queue.push_back((dep.dir().to_path_buf(), dep.local_name().to_string()));
                }
            }

            // Hoist subnodes (and their own subnodes, transitively).
            let mut to_hoist: Vec<NodeHandle> = handle.borrow_mut().extract_subnodes();
            while let Some(sub) = to_hoist.pop() {
                let sub_full_path = sub.borrow().target().full_path().to_string();
                let mut nested = sub.borrow_mut().extract_subnodes();
                to_hoist.append(&mut nested);
                nodes.insert(sub_full_path.clone(), sub);
                creation_order.push(sub_full_path);
            }
        }

        // Resolve dependency-target strings to live node handles.
        let full_paths: Vec<String> = nodes.keys().cloned().collect();
        for full_path in &full_paths {
            let handle = nodes.get(full_path).unwrap().clone();
            let dep_targets = handle.borrow().core.dep_targets.clone();
            for dep_target in dep_targets {
                let dep_handle = nodes.get(dep_target.full_path()).cloned().ok_or_else(|| {
                    ParserError::UnknownTarget(dep_target.full_path().to_string())
                })?;
                handle.borrow_mut().core.dependencies.push(dep_handle);
            }
        }

        Ok(NodePool {
            nodes,
            input_targets,
            creation_order,
        })
    }
}
