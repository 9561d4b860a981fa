// SPDX-License-Identifier: GPL-3.0-only

use std::process::Command;

fn main() {
    println!("cargo::rerun-if-changed=.git/HEAD");
    println!("cargo::rerun-if-changed=.git/refs/tags");

    // Packagers can pin the version without a git checkout
    let version = match std::env::var("KINECT_COLORDEPTH_VERSION") {
        Ok(v) => v,
        Err(_) => describe_version(),
    };

    println!("cargo::rustc-env=GIT_VERSION={}", version);
}

/// Build a version string from `git describe`
///
/// - exact tag `v0.1.0` becomes `0.1.0-<hash>`
/// - `v0.1.0-5-gabcdef1` becomes `0.1.0-dirty-abcdef1`
/// - no git at all falls back to the crate version
fn describe_version() -> String {
    let output = Command::new("git")
        .args(["describe", "--tags", "--always", "--match", "v*"])
        .output();

    let described = match output {
        Ok(output) if output.status.success() => {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        }
        _ => return env_crate_version(),
    };

    let described = described.strip_prefix('v').unwrap_or(&described);
    let commit_hash = commit_hash().unwrap_or_else(|| "unknown".to_string());

    if described.contains('-') {
        let parts: Vec<&str> = described.rsplitn(3, '-').collect();
        if parts.len() >= 3 {
            let hash = parts[0].strip_prefix('g').unwrap_or(parts[0]);
            format!("{}-dirty-{}", parts[2], hash)
        } else {
            described.to_string()
        }
    } else if described == commit_hash {
        // No tags yet, `--always` fell back to the abbreviated hash
        format!("{}-{}", env_crate_version(), commit_hash)
    } else {
        format!("{}-{}", described, commit_hash)
    }
}

fn env_crate_version() -> String {
    std::env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.0.0".to_string())
}

fn commit_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;

    if output.status.success() {
        Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        None
    }
}
