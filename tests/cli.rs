//! Integration tests driving the `srcdex` binary over a small C source tree.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

struct Fixture {
    /// App data directory, isolated per test
    home: TempDir,
    root: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let home = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let src = root.path().join("src");
        fs::create_dir_all(&src).unwrap();
        // Marks the source root so detection never walks further up
        fs::create_dir_all(root.path().join(".git")).unwrap();

        fs::write(
            src.join("main.c"),
            "#include <stdio.h>\n#include \"util.h\"\n\nint main(void) {\n    return util_value();\n}\n",
        )
        .unwrap();
        fs::write(src.join("util.h"), "int util_value(void);\n").unwrap();
        fs::write(
            src.join("util.c"),
            "#include \"util.h\"\n\nint util_value(void) {\n    return 42;\n}\n",
        )
        .unwrap();

        Self { home, root }
    }

    fn root(&self) -> &Path {
        self.root.path()
    }

    fn run(&self, args: &[&str]) -> (String, String, bool) {
        let output = Command::new(binary())
            .args(args)
            .arg("--no-color")
            .env("SRCDEX_HOME", self.home.path())
            .env_remove("SRCDEX_LOG")
            .output()
            .expect("Failed to run srcdex");

        (
            String::from_utf8_lossy(&output.stdout).to_string(),
            String::from_utf8_lossy(&output.stderr).to_string(),
            output.status.success(),
        )
    }

    fn run_ok(&self, args: &[&str]) -> String {
        let (stdout, stderr, ok) = self.run(args);
        assert!(ok, "srcdex {:?} failed\nstdout: {}\nstderr: {}", args, stdout, stderr);
        stdout
    }

    fn index(&self) -> String {
        let root = self.root().to_str().unwrap().to_string();
        self.run_ok(&["index", &root, "--quiet"])
    }

    fn in_root(&self, args: &[&str]) -> String {
        let root = self.root().to_str().unwrap().to_string();
        let mut all: Vec<&str> = args.to_vec();
        all.extend(["-p", &root]);
        self.run_ok(&all)
    }
}

fn binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_srcdex"))
}

fn lines(output: &str) -> BTreeSet<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn index_then_query() {
    let fx = Fixture::new();
    fx.index();

    let out = fx.in_root(&["query", "util_value"]);
    assert_eq!(
        lines(&out),
        set(&["src/main.c:util_value", "src/util.c:util_value", "src/util.h:util_value"])
    );

    let out = fx.in_root(&["query", "does_not_exist"]);
    assert!(out.trim().is_empty());
}

#[test]
fn prefix_and_pattern() {
    let fx = Fixture::new();
    fx.index();

    let out = fx.in_root(&["prefix", "util"]);
    assert!(out.starts_with("util (2)"), "{}", out);
    assert!(out.contains("util_value (3)"));

    let out = fx.in_root(&["pattern", "UTIL_*", "--ignore-case"]);
    assert!(out.starts_with("util_value (3)"), "{}", out);

    let (_, stderr, ok) = fx.run(&["pattern", "[oops", "-p", fx.root().to_str().unwrap()]);
    assert!(!ok);
    assert!(stderr.contains("invalid pattern"), "{}", stderr);
}

#[test]
fn includes_and_dependencies() {
    let fx = Fixture::new();
    fx.index();

    let out = fx.in_root(&["includes", "util.h"]);
    assert_eq!(lines(&out), set(&["util.h (2)", "src/main.c", "src/util.c"]));

    let out = fx.in_root(&["deps", "src/main.c"]);
    assert_eq!(lines(&out), set(&["stdio.h", "util.h"]));
}

#[test]
fn reindex_picks_up_deleted_and_changed_files() {
    let fx = Fixture::new();
    fx.index();

    fs::remove_file(fx.root().join("src/util.c")).unwrap();
    fs::write(fx.root().join("src/util.h"), "int util_total(void);\n").unwrap();
    // Make sure the modification time differs from the first run
    let later = std::time::SystemTime::now() + std::time::Duration::from_secs(5);
    fs::File::options()
        .write(true)
        .open(fx.root().join("src/util.h"))
        .unwrap()
        .set_modified(later)
        .unwrap();
    fx.index();

    let out = fx.in_root(&["query", "util_value"]);
    assert_eq!(lines(&out), set(&["src/main.c:util_value"]));
    let out = fx.in_root(&["query", "util_total"]);
    assert_eq!(lines(&out), set(&["src/util.h:util_total"]));
}

#[test]
fn remove_command_drops_files() {
    let fx = Fixture::new();
    fx.index();

    let out = fx.in_root(&["remove", "src/util.c"]);
    assert!(out.contains("Removed 1 of 1"), "{}", out);

    let out = fx.in_root(&["query", "util_value"]);
    assert_eq!(
        lines(&out),
        set(&["src/main.c:util_value", "src/util.h:util_value"])
    );
}

#[test]
fn stats_list_and_drop() {
    let fx = Fixture::new();
    fx.index();
    let root = fx.root().to_str().unwrap().to_string();

    let out = fx.run_ok(&["stats", &root]);
    assert!(out.contains("Documents:        3"), "{}", out);
    assert!(out.contains("Format version:   1"));

    let out = fx.run_ok(&["list"]);
    assert!(out.contains("Indexed Source Trees"), "{}", out);

    let out = fx.run_ok(&["drop", &root]);
    assert!(out.contains("Removed index for"), "{}", out);
    let out = fx.run_ok(&["list"]);
    assert!(out.contains("No indexed source trees found."), "{}", out);
}
