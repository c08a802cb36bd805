// SPDX-License-Identifier: GPL-3.0-only

use std::process::Command;

fn main() {
    println!("cargo::rerun-if-changed=.git/HEAD");
    println!("cargo::rerun-if-env-changed=BARCODE_SCANNER_VERSION");

    // Packagers can pin the reported version without a git checkout
    let version = std::env::var("BARCODE_SCANNER_VERSION").unwrap_or_else(|_| describe_version());

    println!("cargo::rustc-env=GIT_VERSION={}", version);
}

/// `git describe` output with the tag prefix stripped, or the crate version
/// when the build is not happening inside a repository.
fn describe_version() -> String {
    let pkg_version = std::env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.0.0".to_string());

    let output = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty", "--match", "v*"])
        .output();

    match output {
        Ok(output) if output.status.success() => {
            let described = String::from_utf8_lossy(&output.stdout).trim().to_string();
            match described.strip_prefix('v') {
                Some(tagged) => tagged.to_string(),
                // No release tag yet, only a commit hash
                None => format!("{}-{}", pkg_version, described),
            }
        }
        _ => pkg_version,
    }
}
