use std::process::Command;

/// Short commit hash, suffixed with `-dirty` for uncommitted changes
fn git_version() -> Option<String> {
    let head = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())?;
    let hash = String::from_utf8_lossy(&head.stdout).trim().to_string();

    let dirty = Command::new("git")
        .args(["diff", "--quiet"])
        .status()
        .map(|s| !s.success())
        .unwrap_or(false);
    Some(if dirty { format!("{}-dirty", hash) } else { hash })
}

fn main() {
    let version = std::env::var("TRADESIM_BUILD_VERSION")
        .ok()
        .or_else(git_version)
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=GIT_HASH={}", version);
    println!("cargo:rerun-if-env-changed=TRADESIM_BUILD_VERSION");
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads");
}
