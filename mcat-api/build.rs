//! Stamps the binary with the revision it was built from
//!
//! Sets `MCAT_GIT_REV`, `MCAT_BUILT_AT` and `MCAT_PROFILE`, read by the
//! startup banner and `/health`.

use std::path::Path;
use std::process::Command;

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn main() {
    // `g1a2b3c4d-dirty` for a modified checkout, "unknown" outside git
    let rev = git(&["describe", "--always", "--dirty", "--abbrev=8"]).unwrap_or_else(|| "unknown".to_string());

    if let Some(git_dir) = git(&["rev-parse", "--git-dir"]) {
        let head = Path::new(&git_dir).join("HEAD");
        println!("cargo:rerun-if-changed={}", head.display());
    }
    println!("cargo:rerun-if-changed=build.rs");

    let built_at = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=MCAT_GIT_REV={}", rev);
    println!("cargo:rustc-env=MCAT_BUILT_AT={}", built_at);
    println!("cargo:rustc-env=MCAT_PROFILE={}", profile);
}
