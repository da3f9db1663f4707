// build.rs

use std::env;
use std::path::Path;
use std::process::Command;

/// Short hash of the checked-out commit, if this is a git checkout
fn git_commit() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let commit = String::from_utf8(output.stdout).ok()?.trim().to_string();
    (!commit.is_empty()).then_some(commit)
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=PHOENIX_COMMIT");
    for path in [".git/HEAD", ".git/refs"] {
        if Path::new(path).exists() {
            println!("cargo:rerun-if-changed={path}");
        }
    }

    // Packagers building from a tarball can pass the commit in explicitly
    let commit = env::var("PHOENIX_COMMIT")
        .ok()
        .filter(|c| !c.is_empty())
        .or_else(git_commit);

    match commit {
        Some(commit) => println!("cargo:rustc-env=PHOENIX_COMMIT={commit}"),
        None => println!("cargo:warning=git commit unavailable, version reports 'unknown'"),
    }
}
