use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=BUILD_VERSION");

    // Prefer an explicit version (CI, Docker builds), then the git hash
    let version = std::env::var("BUILD_VERSION").ok().or_else(|| {
        Command::new("git")
            .args(["rev-parse", "--short=8", "HEAD"])
            .output()
            .ok()
            .filter(|o| o.status.success())
            .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
    });

    println!(
        "cargo:rustc-env=BUILD_VERSION={}",
        version.unwrap_or_else(|| "unknown".to_string())
    );
}
