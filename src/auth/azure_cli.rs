use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;

use super::{AccessToken, AuthContext, AuthError, Backend, TokenCredential};

static ANSI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-9;]*[a-zA-Z]|\x1b\][^\x07]*\x07").expect("ANSI regex is valid")
});

#[cfg(windows)]
const AZ_CANDIDATES: &[&str] = &["az.cmd", "az.exe", "az"];
#[cfg(not(windows))]
const AZ_CANDIDATES: &[&str] = &["az"];

/// How the external `az login` is attached to the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginMode {
    /// Detached stdio: the TUI keeps the screen, `az` opens a browser.
    Quiet,
    /// Inherits the terminal. The caller must suspend the TUI first.
    Interactive,
}

/// Locate an executable on `PATH`.
pub fn find_on_path(names: &[&str]) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .flat_map(|dir| names.iter().map(move |n| dir.join(n)))
        .find(|candidate| candidate.is_file())
}

fn az_program() -> Option<PathBuf> {
    find_on_path(AZ_CANDIDATES)
}

/// Tokens delegated to the signed-in Azure CLI.
#[derive(Debug)]
pub struct AzureCliCredential {
    program: PathBuf,
}

impl AzureCliCredential {
    pub fn new() -> Result<Self, AuthError> {
        let program = az_program().ok_or_else(|| {
            AuthError::construction(Backend::AzureCli, "az executable not found on PATH")
        })?;
        Ok(Self { program })
    }
}

impl TokenCredential for AzureCliCredential {
    fn backend(&self) -> Backend {
        Backend::AzureCli
    }

    fn get_token(&self, scopes: &[&str], _ctx: &AuthContext) -> Result<AccessToken, AuthError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(["account", "get-access-token", "--output", "json", "--scope"])
            .args(scopes)
            .stdin(Stdio::null());

        let output = cmd
            .output()
            .map_err(|e| AuthError::token(Backend::AzureCli, format!("failed to run az: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AuthError::token(
                Backend::AzureCli,
                summarize_stderr(&stderr, &output.status.to_string()),
            ));
        }

        parse_token_output(&String::from_utf8_lossy(&output.stdout))
            .map_err(|reason| AuthError::token(Backend::AzureCli, reason))
    }
}

#[derive(Debug, Deserialize)]
struct CliTokenOutput {
    #[serde(rename = "accessToken")]
    access_token: String,
    /// Unix seconds; present on az >= 2.54.
    #[serde(default)]
    expires_on: Option<i64>,
}

/// Parse the JSON printed by `az account get-access-token`.
pub fn parse_token_output(stdout: &str) -> Result<AccessToken, String> {
    let parsed: CliTokenOutput = serde_json::from_str(stdout.trim())
        .map_err(|e| format!("unexpected az output: {e}"))?;
    if parsed.access_token.trim().is_empty() {
        return Err("az returned an empty access token".into());
    }
    Ok(AccessToken {
        token: parsed.access_token,
        expires_on: parsed
            .expires_on
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)),
    })
}

/// First meaningful line of `az` stderr without colour codes.
pub fn summarize_stderr(stderr: &str, fallback: &str) -> String {
    let cleaned = ANSI_RE.replace_all(stderr, "");
    cleaned
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map_or_else(|| fallback.to_string(), |l| l.trim_start_matches("ERROR: ").to_string())
}

/// Make sure the CLI has a signed-in account, running `az login` if not.
pub fn ensure_login(mode: LoginMode) -> Result<(), AuthError> {
    let program =
        az_program().ok_or_else(|| AuthError::LoginFailed("az executable not found on PATH".into()))?;

    let signed_in = Command::new(&program)
        .args(["account", "show", "--only-show-errors", "--output", "none"])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|s| s.success());
    if signed_in {
        tracing::debug!("az account show succeeded; skipping az login");
        return Ok(());
    }

    run_login(&program, mode)
}

/// Run `az login` unconditionally.
pub fn login(mode: LoginMode) -> Result<(), AuthError> {
    let program =
        az_program().ok_or_else(|| AuthError::LoginFailed("az executable not found on PATH".into()))?;
    run_login(&program, mode)
}

fn run_login(program: &Path, mode: LoginMode) -> Result<(), AuthError> {
    tracing::info!(?mode, "running az login");
    let mut cmd = Command::new(program);
    cmd.arg("login");
    if mode == LoginMode::Quiet {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
    }

    let status = cmd
        .status()
        .map_err(|e| AuthError::LoginFailed(format!("failed to run az login: {e}")))?;
    if status.success() {
        Ok(())
    } else {
        Err(AuthError::LoginFailed(format!("az login {status}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_modern_cli_output() {
        let out = r#"{
            "accessToken": "eyJ0.eyJ1.c2ln",
            "expiresOn": "2024-05-01 12:00:00.000000",
            "expires_on": 1714564800,
            "subscription": "sub",
            "tenant": "tid",
            "tokenType": "Bearer"
        }"#;
        let token = parse_token_output(out).unwrap();
        assert_eq!(token.token, "eyJ0.eyJ1.c2ln");
        assert_eq!(token.expires_on.unwrap().timestamp(), 1_714_564_800);
    }

    #[test]
    fn parses_legacy_output_without_epoch() {
        let out = r#"{"accessToken":"abc","expiresOn":"2024-05-01 12:00:00.000000"}"#;
        let token = parse_token_output(out).unwrap();
        assert_eq!(token.token, "abc");
        assert!(token.expires_on.is_none());
    }

    #[test]
    fn rejects_garbage_and_empty_tokens() {
        assert!(parse_token_output("Please run 'az login'").is_err());
        assert!(parse_token_output(r#"{"accessToken":"  "}"#).is_err());
    }

    #[test]
    fn summarize_strips_colour_and_prefix() {
        let stderr = "\x1b[91mERROR: Please run 'az login' to setup account.\x1b[0m\n\n";
        assert_eq!(
            summarize_stderr(stderr, "exit status: 1"),
            "Please run 'az login' to setup account."
        );
        assert_eq!(summarize_stderr("  \n", "exit status: 1"), "exit status: 1");
    }

    #[test]
    fn find_on_path_misses_unknown_binaries() {
        assert!(find_on_path(&["definitely-not-a-real-binary-4f1c"]).is_none());
    }
}
