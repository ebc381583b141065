fn main() {
    // CI sets AZSCOPE_VERSION (e.g., "0.1.0-abc1234"); otherwise derive from git.
    println!("cargo:rerun-if-env-changed=AZSCOPE_VERSION");
    if let Ok(version) = std::env::var("AZSCOPE_VERSION") {
        println!("cargo:rustc-env=AZSCOPE_VERSION={version}");
    } else {
        let hash = std::process::Command::new("git")
            .args(["rev-parse", "--short=7", "HEAD"])
            .output()
            .ok()
            .and_then(|o| String::from_utf8(o.stdout).ok())
            .unwrap_or_default()
            .trim()
            .to_string();

        let pkg = std::env::var("CARGO_PKG_VERSION").unwrap_or_default();
        if hash.is_empty() {
            println!("cargo:rustc-env=AZSCOPE_VERSION={pkg}");
        } else {
            println!("cargo:rustc-env=AZSCOPE_VERSION={pkg}-{hash}");
        }
    }
}
