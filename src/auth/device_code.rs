//! OAuth 2.0 device authorization grant against the Microsoft identity platform.
//!
//! Talks to the `devicecode` and `token` endpoints with `curl` via
//! `std::process::Command`, so no HTTP client dependency is needed.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Deserialize;

use super::azure_cli::{find_on_path, summarize_stderr};
use super::{AccessToken, AuthContext, AuthError, Backend, TokenCredential};

pub const AUTHORITY: &str = "https://login.microsoftonline.com";

/// Tenant used when none is configured: any work or school account.
pub const DEFAULT_TENANT: &str = "organizations";

/// Public client id of the Azure CLI, accepted by every tenant.
pub const DEFAULT_CLIENT_ID: &str = "04b07795-8ddb-461a-bbee-02f9e1bf7b46";

const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";
const EXTRA_SCOPES: &[&str] = &["openid", "profile", "offline_access"];
const CURL_TIMEOUT_SECS: &str = "30";

/// What the user must do to finish signing in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCodeMessage {
    pub user_code: String,
    pub verification_uri: String,
    pub message: String,
}

/// Delivers the device-code instructions to whoever can show them.
pub type PromptFn = Arc<dyn Fn(&DeviceCodeMessage) + Send + Sync>;

pub struct DeviceCodeCredential {
    tenant: String,
    client_id: String,
    curl: PathBuf,
    prompt: PromptFn,
}

impl std::fmt::Debug for DeviceCodeCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceCodeCredential")
            .field("tenant", &self.tenant)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

impl DeviceCodeCredential {
    pub fn new(
        tenant: Option<&str>,
        client_id: Option<&str>,
        prompt: PromptFn,
    ) -> Result<Self, AuthError> {
        let tenant = validate_tenant(tenant)?;
        let client_id = validate_client_id(client_id)?;
        let curl = find_on_path(&["curl", "curl.exe"]).ok_or_else(|| {
            AuthError::construction(Backend::DeviceCode, "curl executable not found on PATH")
        })?;
        Ok(Self {
            tenant,
            client_id,
            curl,
            prompt,
        })
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{AUTHORITY}/{}/oauth2/v2.0/{name}", self.tenant)
    }

    fn post_form(&self, url: &str, fields: &[(&str, &str)]) -> Result<String, AuthError> {
        let mut cmd = Command::new(&self.curl);
        cmd.args(["-sS", "--max-time", CURL_TIMEOUT_SECS, "-X", "POST", url])
            .stdin(Stdio::null());
        for (key, value) in fields {
            cmd.arg("--data-urlencode").arg(format!("{key}={value}"));
        }

        let output = cmd.output().map_err(|e| {
            AuthError::token(Backend::DeviceCode, format!("failed to run curl: {e}"))
        })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AuthError::token(
                Backend::DeviceCode,
                summarize_stderr(&stderr, &output.status.to_string()),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl TokenCredential for DeviceCodeCredential {
    fn backend(&self) -> Backend {
        Backend::DeviceCode
    }

    fn get_token(&self, scopes: &[&str], ctx: &AuthContext) -> Result<AccessToken, AuthError> {
        let scope = scope_param(scopes);
        let body = self.post_form(
            &self.endpoint("devicecode"),
            &[("client_id", self.client_id.as_str()), ("scope", scope.as_str())],
        )?;
        let grant = parse_device_code_response(&body)?;
        tracing::info!(uri = %grant.verification_uri, "device code issued");
        (self.prompt)(&grant.message());

        let deadline = Instant::now() + Duration::from_secs(grant.expires_in);
        let mut interval = Duration::from_secs(grant.interval.max(1));

        loop {
            sleep_unless_cancelled(interval, ctx)?;
            if Instant::now() >= deadline {
                return Err(AuthError::token(
                    Backend::DeviceCode,
                    "device code expired before sign-in completed",
                ));
            }

            let body = self.post_form(
                &self.endpoint("token"),
                &[
                    ("grant_type", DEVICE_CODE_GRANT),
                    ("client_id", self.client_id.as_str()),
                    ("device_code", grant.device_code.as_str()),
                ],
            )?;
            match parse_poll_response(&body)? {
                PollOutcome::Token(token) => return Ok(token),
                PollOutcome::Pending => {}
                PollOutcome::SlowDown => interval += Duration::from_secs(5),
            }
        }
    }
}

fn validate_tenant(tenant: Option<&str>) -> Result<String, AuthError> {
    let tenant = tenant.map(str::trim).filter(|t| !t.is_empty());
    let Some(tenant) = tenant else {
        return Ok(DEFAULT_TENANT.to_string());
    };
    if tenant
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
    {
        Ok(tenant.to_string())
    } else {
        Err(AuthError::construction(
            Backend::DeviceCode,
            format!("invalid tenant id {tenant:?}"),
        ))
    }
}

fn validate_client_id(client_id: Option<&str>) -> Result<String, AuthError> {
    let client_id = client_id.map(str::trim).filter(|c| !c.is_empty());
    let Some(client_id) = client_id else {
        return Ok(DEFAULT_CLIENT_ID.to_string());
    };
    if client_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        Ok(client_id.to_string())
    } else {
        Err(AuthError::construction(
            Backend::DeviceCode,
            format!("invalid client id {client_id:?}"),
        ))
    }
}

fn scope_param(scopes: &[&str]) -> String {
    let mut out = scopes.join(" ");
    for extra in EXTRA_SCOPES {
        if !scopes.contains(extra) {
            let _ = write!(out, " {extra}");
        }
    }
    out.trim().to_string()
}

fn sleep_unless_cancelled(total: Duration, ctx: &AuthContext) -> Result<(), AuthError> {
    let step = Duration::from_millis(200);
    let until = Instant::now() + total;
    while Instant::now() < until {
        if ctx.is_cancelled() {
            return Err(AuthError::Cancelled);
        }
        thread::sleep(step.min(until.saturating_duration_since(Instant::now())));
    }
    if ctx.is_cancelled() {
        return Err(AuthError::Cancelled);
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct EndpointError {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

impl EndpointError {
    fn describe(&self) -> String {
        match (&self.error, &self.error_description) {
            (_, Some(desc)) => desc.lines().next().unwrap_or(desc.as_str()).to_string(),
            (Some(code), None) => code.clone(),
            (None, None) => "unexpected response".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceCodeGrant {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    pub expires_in: u64,
    #[serde(default = "default_interval")]
    pub interval: u64,
    #[serde(default)]
    pub message: Option<String>,
}

fn default_interval() -> u64 {
    5
}

impl DeviceCodeGrant {
    pub fn message(&self) -> DeviceCodeMessage {
        let message = self.message.clone().unwrap_or_else(|| {
            format!(
                "To sign in, open {} and enter the code {} to authenticate.",
                self.verification_uri, self.user_code
            )
        });
        DeviceCodeMessage {
            user_code: self.user_code.clone(),
            verification_uri: self.verification_uri.clone(),
            message,
        }
    }
}

/// Parse the `devicecode` endpoint response.
pub fn parse_device_code_response(body: &str) -> Result<DeviceCodeGrant, AuthError> {
    if let Ok(grant) = serde_json::from_str::<DeviceCodeGrant>(body) {
        return Ok(grant);
    }
    let reason = serde_json::from_str::<EndpointError>(body)
        .map_or_else(|e| format!("unexpected response: {e}"), |err| err.describe());
    Err(AuthError::token(Backend::DeviceCode, reason))
}

#[derive(Debug)]
pub enum PollOutcome {
    Token(AccessToken),
    Pending,
    SlowDown,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<i64>,
    #[serde(flatten)]
    error: EndpointError,
}

/// Parse one poll of the `token` endpoint. Terminal errors become `Err`.
pub fn parse_poll_response(body: &str) -> Result<PollOutcome, AuthError> {
    let resp: TokenResponse = serde_json::from_str(body).map_err(|e| {
        AuthError::token(Backend::DeviceCode, format!("unexpected response: {e}"))
    })?;

    if let Some(token) = resp.access_token.filter(|t| !t.is_empty()) {
        return Ok(PollOutcome::Token(AccessToken {
            token,
            expires_on: resp
                .expires_in
                .map(|secs| Utc::now() + chrono::Duration::seconds(secs)),
        }));
    }

    match resp.error.error.as_deref() {
        Some("authorization_pending") => Ok(PollOutcome::Pending),
        Some("slow_down") => Ok(PollOutcome::SlowDown),
        _ => Err(AuthError::token(Backend::DeviceCode, resp.error.describe())),
    }
}
