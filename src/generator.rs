//! Generator: orchestrates parse → process order → per-node emission →
//! global phony targets, producing the final Makefile text.

use std::collections::HashSet;

use crate::cache::BuildFileCache;
use crate::dist::DistSource;
use crate::errors::GeneratorError;
use crate::input::{Input, Lang};
use crate::makefile::Makefile;
use crate::node::NodeHandle;
use crate::parser::{NodePool, Parser};
use crate::registry::BuilderRegistry;
use crate::Result;

/// Computes a stable topological order via DFS from each seed node,
/// rejecting cycles fatally.
fn compute_process_order(seeds: &[NodeHandle]) -> std::result::Result<Vec<NodeHandle>, GeneratorError> {
    let mut process_order = Vec::new();
    let mut seen = HashSet::new();
    let mut parents = HashSet::new();

    fn visit(
        node: &NodeHandle,
        parents: &mut HashSet<String>,
        seen: &mut HashSet<String>,
        process_order: &mut Vec<NodeHandle>,
    ) -> std::result::Result<(), GeneratorError> {
        let full_path = node.borrow().target().full_path().to_string();
        if seen.contains(&full_path) {
            return Ok(());
        }
        if parents.contains(&full_path) {
            return Err(GeneratorError::RecursiveDependency(full_path));
        }
        parents.insert(full_path.clone());
        let children: Vec<NodeHandle> = node.borrow().core.dependencies.clone();
        for child in &children {
            visit(child, parents, seen, process_order)?;
        }
        parents.remove(&full_path);
        seen.insert(full_path);
        process_order.push(node.clone());
        Ok(())
    }

    for seed in seeds {
        visit(seed, &mut parents, &mut seen, &mut process_order)?;
    }
    Ok(process_order)
}

pub struct Generator<'a> {
    input: &'a Input,
    registry: BuilderRegistry,
    dist: Box<dyn DistSource>,
    use_cache: bool,
}

impl<'a> Generator<'a> {
    pub fn new(input: &'a Input, dist: Box<dyn DistSource>) -> Self {
        Self {
            input,
            registry: BuilderRegistry::new(),
            dist,
            use_cache: false,
        }
    }

    /// Opts into the manifest cache: a real `<object_dir>/.repomake-cache/`
    /// directory is created on disk and consulted/populated on every
    /// `BUILD` file load. Off by default so library consumers (and tests
    /// using placeholder directories like `$(OBJ_DIR)`) never get
    /// surprise filesystem writes; `main` opts in once `object_dir` is a
    /// real path.
    pub fn with_manifest_cache(mut self) -> Self {
        self.use_cache = true;
        self
    }

    pub fn generate_makefile(&self, seed_token: Option<&str>) -> Result<String> {
        log::info!("generating makefile for {}", self.input.root_dir.display());
        let mut mf = Makefile::new(self.input.silent_make);
        mf.append(&indoc::formatdoc! {"
            # Generated by repomake. Do not edit by hand.

        "});

        self.registry.write_make_head(self.input, &mut mf);
        self.dist.write_make_head(self.input, &mut mf);

        let mut parser = Parser::new(self.input);
        if self.use_cache {
            match BuildFileCache::new(&self.input.object_dir) {
                Ok(cache) => parser = parser.with_cache(cache),
                Err(e) => log::warn!("manifest cache unavailable, parsing uncached: {e}"),
            }
        }
        let pool: NodePool = parser.parse(seed_token)?;
        log::debug!("parsed {} node(s)", pool.len());

        let input_nodes = pool.input_nodes();
        // Seeded from every node the parse created, not just the originally
        // requested targets: a hoisted subnode (e.g. a cc_binary's
        // top_symlink) has its dependency edge pointing at its parent, so it
        // is otherwise unreachable from `input_nodes` alone. `seen` makes
        // revisiting an already-processed node a no-op.
        let all_nodes = pool.all_nodes_in_creation_order();
        let process_order = compute_process_order(&all_nodes)?;
        log::debug!("process order has {} node(s)", process_order.len());

        for node in &process_order {
            node.borrow().write_make(self.input, &mut mf)?;
        }

        self.dist.write_make_file(self.input, &mut mf);

        self.write_clean_rule(&process_order, &mut mf);
        self.write_install_rule(&process_order, &mut mf);
        self.write_all_rule(&input_nodes, &mut mf);
        self.write_tests_rule(&input_nodes, &mut mf);
        self.write_licenses_rule(&input_nodes, &mut mf);

        mf.append(".PHONY: clean all tests install licenses\n");
        mf.append(".DEFAULT_GOAL := all\n");

        Ok(mf.into_out())
    }

    fn write_clean_rule(&self, process_order: &[NodeHandle], mf: &mut Makefile) {
        let mut rule = mf.start_rule("clean", "");
        for node in process_order {
            node.borrow().write_make_clean(&mut rule);
        }
        for dir in self.input.managed_directories() {
            rule.write_command_best_effort(&format!("rm -rf {}", dir.display()));
        }
        self.dist.write_make_clean(self.input, &mut rule);
        mf.finish_rule(rule);
    }

    fn write_install_rule(&self, process_order: &[NodeHandle], mf: &mut Makefile) {
        mf.append(&indoc::formatdoc! {"
            prefix ?= /usr/local
            bindir ?= $(prefix)/bin
            INSTALL ?= install
        "});
        let mut rule = mf.start_rule("install", "");
        for node in process_order {
            node.borrow().write_make_install(mf, &mut rule);
        }
        mf.finish_rule(rule);
    }

    fn write_all_rule(&self, input_nodes: &[NodeHandle], mf: &mut Makefile) {
        let mut prereqs = Vec::new();
        for node in input_nodes {
            let n = node.borrow();
            if n.include_in_all() {
                prereqs.push(n.target().make_path().to_string());
                for out in n.final_outputs(Lang::NoLang).files() {
                    prereqs.push(out.path().to_string());
                }
            }
        }
        mf.write_rule("all", &prereqs.join(" \\\n\t"));
    }

    fn write_tests_rule(&self, input_nodes: &[NodeHandle], mf: &mut Makefile) {
        let mut prereqs = Vec::new();
        for node in input_nodes {
            let n = node.borrow();
            if n.include_in_tests() {
                for test in n.final_tests().files() {
                    prereqs.push(test.path().to_string());
                }
            }
        }
        mf.write_rule("tests", &prereqs.join(" \\\n\t"));
    }

    fn write_licenses_rule(&self, input_nodes: &[NodeHandle], mf: &mut Makefile) {
        let mut rule = mf.start_rule("licenses", "");
        for node in input_nodes {
            for (target, license) in node.borrow().licenses() {
                rule.write_command(&format!("printf \"{target} => {license}\\n\""));
            }
        }
        mf.finish_rule(rule);
    }
}
