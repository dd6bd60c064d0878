//! Embeds the commit and its date into the binary so `dmxtap --version`
//! reports exactly what was shipped. CI provides GITHUB_SHA; local builds
//! ask git, and anything unavailable degrades to "unknown".

use std::env;
use std::process::Command;

const UNKNOWN: &str = "unknown";

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=GITHUB_SHA");

    let commit = env::var("GITHUB_SHA")
        .ok()
        .filter(|sha| !sha.is_empty())
        .or_else(|| git_output(&["rev-parse", "HEAD"]));

    let (short, full) = match commit {
        // Commit hashes are ASCII, so byte slicing is safe here.
        Some(full) => (full[..full.len().min(7)].to_string(), full),
        None => (UNKNOWN.to_string(), UNKNOWN.to_string()),
    };
    let date = git_output(&["log", "-1", "--format=%cI"]).unwrap_or_else(|| UNKNOWN.to_string());

    println!("cargo:rustc-env=DMXTAP_BUILD_COMMIT={short}");
    println!("cargo:rustc-env=DMXTAP_BUILD_COMMIT_FULL={full}");
    println!("cargo:rustc-env=DMXTAP_BUILD_DATE={date}");
}

fn git_output(args: &[&str]) -> Option<String> {
    let out = Command::new("git").args(args).output().ok()?;
    if !out.status.success() {
        return None;
    }
    let text = String::from_utf8(out.stdout).ok()?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
