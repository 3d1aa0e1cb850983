//! End-to-end coverage of `repomake generate`: real `BUILD` files on disk,
//! run through `Generator::generate_makefile`, asserting on the shape of
//! the emitted Makefile text. Each test is its own temp directory tree.

use std::collections::HashMap;
use std::path::Path;

use repomake::dist::NullDistSource;
use repomake::generator::Generator;
use repomake::input::Input;

fn input_for(root: &Path) -> Input {
    Input {
        root_dir: root.to_path_buf(),
        current_path: std::path::PathBuf::new(),
        object_dir: root.join(".build/obj"),
        source_dir: root.to_path_buf(),
        genfile_dir: root.join(".build/gen"),
        pkgfile_dir: root.join(".build/pkg"),
        binary_dir: root.join(".build/bin"),
        silent_make: true,
        silent_gensh: true,
        jobs: 1,
        flags: HashMap::new(),
    }
}

fn write(dir: &Path, rel: &str, contents: &str) {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

#[test]
fn single_cc_library_emits_a_compile_rule_and_user_target() {
    let dir = tempdir::TempDir::new("repomake-it").unwrap();
    write(dir.path(), "a.cc", "");
    write(
        dir.path(),
        "BUILD",
        r#"
[[target]]
type = "cc_library"
name = "lib"
sources = ["a.cc"]
"#,
    );
    let input = input_for(dir.path());
    let generator = Generator::new(&input, Box::new(NullDistSource));
    let out = generator.generate_makefile(None).unwrap();

    assert!(out.contains("$(CXX)"));
    assert!(out.contains("-c a.cc -o"));
    assert!(out.contains("lib:"));
    assert!(out.contains(".PHONY: clean all tests install licenses"));
    assert!(out.contains(".DEFAULT_GOAL := all"));
}

#[test]
fn binary_links_objects_transitively_from_a_library_dependency() {
    let dir = tempdir::TempDir::new("repomake-it").unwrap();
    write(dir.path(), "lib/core.cc", "");
    write(
        dir.path(),
        "lib/BUILD",
        r#"
[[target]]
type = "cc_library"
name = "core"
sources = ["core.cc"]
include_dirs = ["lib/include"]
"#,
    );
    write(dir.path(), "app/main.cc", "");
    write(
        dir.path(),
        "app/BUILD",
        r#"
[[target]]
type = "cc_binary"
name = "app"
sources = ["main.cc"]
dependencies = ["//lib:core"]
"#,
    );
    let input = input_for(dir.path());
    let generator = Generator::new(&input, Box::new(NullDistSource));
    let out = generator.generate_makefile(Some("//app:app")).unwrap();

    // Both translation units are compiled, and app's own compile line picks
    // up the library's include dir transitively.
    let main_compile_line = out
        .lines()
        .find(|l| l.contains("-c app/main.cc -o"))
        .expect("main.cc compile rule present");
    assert!(main_compile_line.contains("-Ilib/include"));
    assert!(out.contains("-c lib/core.cc -o"));

    // The link recipe line (compiler invocation writing into the binary
    // output dir) pulls in the library's object file alongside its own.
    let link_line = out
        .lines()
        .find(|l| l.contains("$(CXX)") && l.contains(".build/bin"))
        .expect("link command present");
    assert!(link_line.contains("core.o"));
    assert!(link_line.contains("main.o"));

    // cc_binary hoists a top_symlink subnode pointed at the binary.
    assert!(out.contains("app_link"));
}

#[test]
fn gen_sh_output_is_consumed_through_its_touchfile() {
    let dir = tempdir::TempDir::new("repomake-it").unwrap();
    write(dir.path(), "gen/seed.txt", "hello");
    write(
        dir.path(),
        "gen/BUILD",
        r#"
[[target]]
type = "gen_sh"
name = "codegen"
cmd = "cp seed.txt out.txt"
input_files = ["seed.txt"]
outs = ["out.txt"]
"#,
    );
    let input = input_for(dir.path());
    let generator = Generator::new(&input, Box::new(NullDistSource));
    let out = generator.generate_makefile(Some("//gen:codegen")).unwrap();

    assert!(out.contains(".gensh"));
    assert!(out.contains("touch"));
    // the declared output rule depends on the touchfile, not the raw seed file
    let out_rule = out
        .lines()
        .find(|l| l.starts_with("gen/out.txt:"))
        .expect("out.txt rule present");
    assert!(out_rule.contains(".gensh"));
}

#[test]
fn recursive_dependency_between_build_files_is_a_fatal_error() {
    let dir = tempdir::TempDir::new("repomake-it").unwrap();
    write(
        dir.path(),
        "a/BUILD",
        r#"
[[target]]
type = "filegroup"
name = "a"
dependencies = ["//b:b"]
"#,
    );
    write(
        dir.path(),
        "b/BUILD",
        r#"
[[target]]
type = "filegroup"
name = "b"
dependencies = ["//a:a"]
"#,
    );
    let input = input_for(dir.path());
    let generator = Generator::new(&input, Box::new(NullDistSource));
    let err = generator.generate_makefile(Some("//a:a")).unwrap_err();
    assert!(format!("{err}").contains("recursive dependency"));
}

#[test]
fn cc_binary_ignores_python_sources_of_a_mixed_dependency_chain() {
    let dir = tempdir::TempDir::new("repomake-it").unwrap();
    write(dir.path(), "py/lib.py", "");
    write(
        dir.path(),
        "py/BUILD",
        r#"
[[target]]
type = "py_library"
name = "pylib"
py_sources = ["lib.py"]
"#,
    );
    write(dir.path(), "native/main.cc", "");
    write(
        dir.path(),
        "native/BUILD",
        r#"
[[target]]
type = "cc_binary"
name = "tool"
sources = ["main.cc"]
dependencies = ["//py:pylib"]
"#,
    );
    let input = input_for(dir.path());
    let generator = Generator::new(&input, Box::new(NullDistSource));
    let out = generator.generate_makefile(Some("//native:tool")).unwrap();

    // pylib is processed and emits its own (python) user target...
    assert!(out.contains("py/lib.py"));
    // ...but tool's own link recipe never pulls python sources in as
    // objects or link inputs, only its own compiled translation unit.
    let link_line = out
        .lines()
        .find(|l| l.contains("$(CXX)") && l.contains(".build/bin"))
        .expect("link command present");
    assert!(!link_line.contains("lib.py"));
    assert!(link_line.contains("main.o"));
}

#[test]
fn define_flags_are_substituted_into_build_file_fields() {
    let dir = tempdir::TempDir::new("repomake-it").unwrap();
    write(dir.path(), "a.cc", "");
    write(
        dir.path(),
        "BUILD",
        r#"
[[target]]
type = "cc_library"
name = "lib"
sources = ["a.cc"]
compile_flags = ["${EXTRA_FLAG}"]
"#,
    );
    let mut input = input_for(dir.path());
    input
        .flags
        .insert("EXTRA_FLAG".to_string(), vec!["-DWITH_FEATURE".to_string()]);
    let generator = Generator::new(&input, Box::new(NullDistSource));
    let out = generator.generate_makefile(None).unwrap();

    assert!(out.contains("-DWITH_FEATURE"));
}

#[test]
fn empty_repository_still_emits_phony_scaffolding() {
    let dir = tempdir::TempDir::new("repomake-it").unwrap();
    write(dir.path(), "BUILD", "");
    let input = input_for(dir.path());
    let generator = Generator::new(&input, Box::new(NullDistSource));
    let out = generator.generate_makefile(None).unwrap();

    assert!(out.contains("all: "));
    assert!(out.contains("clean:"));
    assert!(out.contains("tests: "));
    assert!(out.contains("install:"));
    assert!(out.contains("licenses:"));
}

#[test]
fn clean_rule_never_touches_the_source_tree() {
    let dir = tempdir::TempDir::new("repomake-it").unwrap();
    write(dir.path(), "BUILD", "");
    let input = input_for(dir.path());
    let generator = Generator::new(&input, Box::new(NullDistSource));
    let out = generator.generate_makefile(None).unwrap();

    let clean_rule: Vec<&str> = out
        .lines()
        .skip_while(|l| !l.starts_with("clean:"))
        .take_while(|l| l.is_empty() || l.starts_with('\t') || l.starts_with("clean:"))
        .collect();
    // every managed directory removed by `clean` is a build-owned
    // subdirectory; `root_dir`/`source_dir` itself is never one of them.
    let root = dir.path().display().to_string();
    for line in &clean_rule {
        if let Some(rest) = line.trim_start().strip_prefix("-rm -rf ") {
            assert_ne!(rest, root, "clean rule must not rm -rf the source tree itself");
        }
    }
    assert!(clean_rule.iter().any(|l| l.contains(".build/obj")));
}

#[test]
fn manifest_cache_reuses_a_previously_parsed_build_file() {
    let dir = tempdir::TempDir::new("repomake-it").unwrap();
    write(dir.path(), "a.cc", "");
    write(
        dir.path(),
        "BUILD",
        r#"
[[target]]
type = "cc_library"
name = "lib"
sources = ["a.cc"]
"#,
    );
    let input = input_for(dir.path());

    let first = Generator::new(&input, Box::new(NullDistSource))
        .with_manifest_cache()
        .generate_makefile(None)
        .unwrap();
    let second = Generator::new(&input, Box::new(NullDistSource))
        .with_manifest_cache()
        .generate_makefile(None)
        .unwrap();

    assert_eq!(first, second);
    assert!(input.object_dir.join(".repomake-cache").is_dir());
}
