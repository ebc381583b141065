//! Credential resolution against Microsoft Entra ID.
//!
//! [`authenticate`] negotiates between two credential backends (the Azure CLI
//! and the device-code flow), escalating at most once per path through an
//! external `az login` before falling back to the other backend.

pub mod azure_cli;
pub mod claims;
pub mod device_code;
mod error;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};

pub use error::{AuthError, Backend};

use device_code::{DeviceCodeCredential, DeviceCodeMessage, PromptFn};

/// Scope requested for every token. Graph tokens reliably carry the `upn` claim.
pub const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Rendered in place of a claim the token did not carry.
pub const PLACEHOLDER: &str = "?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMethod {
    #[default]
    Cli,
    DeviceCode,
}

impl AuthMethod {
    /// Case-insensitive parse of a configured method. Blank or unrecognised
    /// text selects the CLI.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "devicecode" | "device-code" | "device_code" | "device" => AuthMethod::DeviceCode,
            _ => AuthMethod::Cli,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AuthMethod::Cli => "cli",
            AuthMethod::DeviceCode => "devicecode",
        }
    }
}

/// Which method to try first, plus the optional device-code overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthPreference {
    pub method: AuthMethod,
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
}

impl AuthPreference {
    pub fn with_method(&self, method: AuthMethod) -> Self {
        Self {
            method,
            ..self.clone()
        }
    }
}

/// Who signed in, for the status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentitySummary {
    pub principal_name: String,
    pub tenant_id: String,
    pub source: Backend,
    /// When the token behind this summary stops being valid, if the backend said.
    pub expires_on: Option<DateTime<Utc>>,
}

impl IdentitySummary {
    /// Build a summary from an issued token. A token whose claims cannot be
    /// decoded still yields a summary, with placeholders.
    pub fn from_token(token: &AccessToken, source: Backend) -> Self {
        let claims = match claims::decode_claims(&token.token) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("{e}; showing placeholder identity");
                Default::default()
            }
        };
        Self {
            principal_name: or_placeholder(claims::principal_name(&claims)),
            tenant_id: or_placeholder(claims::tenant_id(&claims)),
            source,
            expires_on: token.expires_on,
        }
    }
}

fn or_placeholder(value: String) -> String {
    if value.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        value
    }
}

#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_on: Option<DateTime<Utc>>,
}

/// A bound credential able to issue bearer tokens.
pub trait TokenCredential: Send {
    fn backend(&self) -> Backend;
    fn get_token(&self, scopes: &[&str], ctx: &AuthContext) -> Result<AccessToken, AuthError>;
}

/// The collaborators [`authenticate`] negotiates between.
pub trait CredentialBackends {
    fn cli_credential(&self) -> Result<Box<dyn TokenCredential>, AuthError>;
    fn device_code_credential(
        &self,
        preference: &AuthPreference,
    ) -> Result<Box<dyn TokenCredential>, AuthError>;
    /// Run the external interactive login. Blocks until it exits.
    fn login(&self) -> Result<(), AuthError>;
}

/// Caller-owned cancellation hook threaded through one authentication call.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    cancelled: Arc<AtomicBool>,
}

impl AuthContext {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), AuthError> {
        if self.is_cancelled() {
            Err(AuthError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// The real backends: `az` on PATH and the device-code grant via `curl`.
pub struct AzureBackends {
    login_mode: azure_cli::LoginMode,
    prompt: PromptFn,
}

impl AzureBackends {
    pub fn new(login_mode: azure_cli::LoginMode, prompt: PromptFn) -> Self {
        Self { login_mode, prompt }
    }

    /// Backends with a no-op device-code prompt.
    pub fn quiet() -> Self {
        Self::new(
            azure_cli::LoginMode::Quiet,
            Arc::new(|_: &DeviceCodeMessage| {}),
        )
    }
}

impl CredentialBackends for AzureBackends {
    fn cli_credential(&self) -> Result<Box<dyn TokenCredential>, AuthError> {
        Ok(Box::new(azure_cli::AzureCliCredential::new()?))
    }

    fn device_code_credential(
        &self,
        preference: &AuthPreference,
    ) -> Result<Box<dyn TokenCredential>, AuthError> {
        Ok(Box::new(DeviceCodeCredential::new(
            preference.tenant_id.as_deref(),
            preference.client_id.as_deref(),
            Arc::clone(&self.prompt),
        )?))
    }

    fn login(&self) -> Result<(), AuthError> {
        azure_cli::ensure_login(self.login_mode)
    }
}

/// Obtain a token through the preferred backend and summarise its identity.
///
/// Each call is independent: no credential survives between calls.
pub fn authenticate<B>(
    preference: &AuthPreference,
    backends: &B,
    ctx: &AuthContext,
) -> Result<IdentitySummary, AuthError>
where
    B: CredentialBackends + ?Sized,
{
    ctx.check()?;
    tracing::info!(method = preference.method.as_str(), "authenticating");

    let cred = match preference.method {
        AuthMethod::Cli => match backends.cli_credential() {
            Ok(c) => c,
            Err(first) => {
                tracing::warn!("{first}; running az login");
                ctx.check()?;
                let retried = backends.login().and_then(|()| backends.cli_credential());
                match retried {
                    Ok(c) => c,
                    Err(e) => {
                        tracing::warn!("{e}; falling back to device code");
                        ctx.check()?;
                        backends.device_code_credential(preference)?
                    }
                }
            }
        },
        AuthMethod::DeviceCode => match backends.device_code_credential(preference) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("{e}; falling back to Azure CLI");
                ctx.check()?;
                backends.cli_credential()?
            }
        },
    };

    ctx.check()?;
    let use_cli = preference.method == AuthMethod::Cli;
    let mut source = cred.backend();
    let mut result = cred.get_token(&[GRAPH_SCOPE], ctx);

    // A CLI preference gets one more CLI round, whichever credential was bound.
    if let Err(e) = &result
        && use_cli
        && !matches!(e, AuthError::Cancelled)
    {
        tracing::warn!("{e}; running az login and retrying once");
        ctx.check()?;
        match backends.login().and_then(|()| backends.cli_credential()) {
            Ok(fresh) => {
                source = fresh.backend();
                result = fresh.get_token(&[GRAPH_SCOPE], ctx);
            }
            Err(e) => tracing::warn!("CLI retry unavailable: {e}"),
        }
    }

    if let Err(e) = &result
        && !matches!(e, AuthError::Cancelled)
    {
        tracing::warn!("{e}; final attempt via device code");
        ctx.check()?;
        match backends.device_code_credential(preference) {
            Ok(dc) => {
                source = dc.backend();
                result = dc.get_token(&[GRAPH_SCOPE], ctx);
            }
            Err(e) => tracing::warn!("device code fallback unavailable: {e}"),
        }
    }

    let token = result?;
    let identity = IdentitySummary::from_token(&token, source);
    tracing::info!(
        principal = %identity.principal_name,
        tenant = %identity.tenant_id,
        source = %identity.source,
        expires_on = ?identity.expires_on,
        "authenticated"
    );
    Ok(identity)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        CliCredential,
        DeviceCodeCredential,
        Login,
        Token(Backend),
    }

    type Script<T> = Arc<Mutex<VecDeque<Result<T, AuthError>>>>;

    fn script<T>(items: Vec<Result<T, AuthError>>) -> Script<T> {
        Arc::new(Mutex::new(items.into()))
    }

    fn pop<T>(script: &Script<T>, missing: impl FnOnce() -> AuthError) -> Result<T, AuthError> {
        script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(missing()))
    }

    /// Backends that replay scripted outcomes and record every call.
    #[derive(Default)]
    struct FakeBackends {
        calls: Arc<Mutex<Vec<Call>>>,
        cli: Script<()>,
        device: Script<()>,
        login: Script<()>,
        cli_tokens: Script<String>,
        device_tokens: Script<String>,
    }

    struct FakeCredential {
        backend: Backend,
        calls: Arc<Mutex<Vec<Call>>>,
        tokens: Script<String>,
    }

    impl TokenCredential for FakeCredential {
        fn backend(&self) -> Backend {
            self.backend
        }

        fn get_token(&self, _: &[&str], _: &AuthContext) -> Result<AccessToken, AuthError> {
            self.calls.lock().unwrap().push(Call::Token(self.backend));
            pop(&self.tokens, || {
                AuthError::token(self.backend, "no scripted token")
            })
            .map(|token| AccessToken {
                token,
                expires_on: None,
            })
        }
    }

    impl FakeBackends {
        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }

        fn credential(&self, backend: Backend) -> Box<dyn TokenCredential> {
            let tokens = match backend {
                Backend::AzureCli => &self.cli_tokens,
                Backend::DeviceCode => &self.device_tokens,
            };
            Box::new(FakeCredential {
                backend,
                calls: Arc::clone(&self.calls),
                tokens: Arc::clone(tokens),
            })
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn count(&self, call: &Call) -> usize {
            self.calls().iter().filter(|c| *c == call).count()
        }
    }

    impl CredentialBackends for FakeBackends {
        fn cli_credential(&self) -> Result<Box<dyn TokenCredential>, AuthError> {
            self.record(Call::CliCredential);
            pop(&self.cli, || {
                AuthError::construction(Backend::AzureCli, "not scripted")
            })?;
            Ok(self.credential(Backend::AzureCli))
        }

        fn device_code_credential(
            &self,
            _: &AuthPreference,
        ) -> Result<Box<dyn TokenCredential>, AuthError> {
            self.record(Call::DeviceCodeCredential);
            pop(&self.device, || {
                AuthError::construction(Backend::DeviceCode, "not scripted")
            })?;
            Ok(self.credential(Backend::DeviceCode))
        }

        fn login(&self) -> Result<(), AuthError> {
            self.record(Call::Login);
            pop(&self.login, || AuthError::LoginFailed("not scripted".into()))
        }
    }

    fn token_for(upn: &str) -> String {
        claims::encode_token(&serde_json::json!({ "upn": upn, "tid": "tenant-1" }))
    }

    fn cli_pref() -> AuthPreference {
        AuthPreference::default()
    }

    fn device_pref() -> AuthPreference {
        AuthPreference {
            method: AuthMethod::DeviceCode,
            tenant_id: Some("contoso.onmicrosoft.com".into()),
            client_id: Some("00000000-0000-0000-0000-000000000001".into()),
        }
    }

    #[test]
    fn parse_method_is_case_insensitive() {
        assert_eq!(AuthMethod::parse("CLI"), AuthMethod::Cli);
        assert_eq!(AuthMethod::parse("DeviceCode"), AuthMethod::DeviceCode);
        assert_eq!(AuthMethod::parse(""), AuthMethod::Cli);
        assert_eq!(AuthMethod::parse("kerberos"), AuthMethod::Cli);
    }

    #[test]
    fn device_code_preferred_never_touches_cli() {
        let fake = FakeBackends {
            device: script(vec![Ok(())]),
            device_tokens: script(vec![Ok(token_for("dev@contoso.com"))]),
            ..Default::default()
        };
        let id = authenticate(&device_pref(), &fake, &AuthContext::default()).unwrap();
        assert_eq!(id.principal_name, "dev@contoso.com");
        assert_eq!(id.tenant_id, "tenant-1");
        assert_eq!(id.source, Backend::DeviceCode);
        assert_eq!(
            fake.calls(),
            vec![Call::DeviceCodeCredential, Call::Token(Backend::DeviceCode)]
        );
    }

    #[test]
    fn cli_construction_failure_logs_in_once_and_retries() {
        let fake = FakeBackends {
            cli: script(vec![
                Err(AuthError::construction(Backend::AzureCli, "az not signed in")),
                Ok(()),
            ]),
            login: script(vec![Ok(())]),
            cli_tokens: script(vec![Ok(token_for("cli@contoso.com"))]),
            ..Default::default()
        };
        let id = authenticate(&cli_pref(), &fake, &AuthContext::default()).unwrap();
        assert_eq!(id.principal_name, "cli@contoso.com");
        assert_eq!(id.source, Backend::AzureCli);
        assert_eq!(fake.count(&Call::Login), 1);
        assert_eq!(
            fake.calls(),
            vec![
                Call::CliCredential,
                Call::Login,
                Call::CliCredential,
                Call::Token(Backend::AzureCli),
            ]
        );
    }

    #[test]
    fn failed_login_falls_back_to_device_code() {
        let fake = FakeBackends {
            cli: script(vec![Err(AuthError::construction(
                Backend::AzureCli,
                "az missing",
            ))]),
            login: script(vec![Err(AuthError::LoginFailed("exit status 1".into()))]),
            device: script(vec![Ok(())]),
            device_tokens: script(vec![Ok(token_for("dc@contoso.com"))]),
            ..Default::default()
        };
        let id = authenticate(&cli_pref(), &fake, &AuthContext::default()).unwrap();
        assert_eq!(id.source, Backend::DeviceCode);
        assert_eq!(
            fake.calls(),
            vec![
                Call::CliCredential,
                Call::Login,
                Call::DeviceCodeCredential,
                Call::Token(Backend::DeviceCode),
            ]
        );
    }

    #[test]
    fn device_code_construction_failure_falls_back_to_cli() {
        let fake = FakeBackends {
            device: script(vec![Err(AuthError::construction(
                Backend::DeviceCode,
                "invalid tenant",
            ))]),
            cli: script(vec![Ok(())]),
            cli_tokens: script(vec![Ok(token_for("cli@contoso.com"))]),
            ..Default::default()
        };
        let id = authenticate(&device_pref(), &fake, &AuthContext::default()).unwrap();
        assert_eq!(id.source, Backend::AzureCli);
        assert_eq!(fake.count(&Call::Login), 0);
    }

    #[test]
    fn cli_token_failure_escalates_once_then_succeeds() {
        let fake = FakeBackends {
            cli: script(vec![Ok(()), Ok(())]),
            login: script(vec![Ok(())]),
            cli_tokens: script(vec![
                Err(AuthError::token(Backend::AzureCli, "AADSTS700082")),
                Ok(token_for("cli@contoso.com")),
            ]),
            ..Default::default()
        };
        let id = authenticate(&cli_pref(), &fake, &AuthContext::default()).unwrap();
        assert_eq!(id.principal_name, "cli@contoso.com");
        assert_eq!(fake.count(&Call::Login), 1);
        assert_eq!(fake.count(&Call::DeviceCodeCredential), 0);
    }

    #[test]
    fn cli_token_failures_end_with_device_code_attempt() {
        let fake = FakeBackends {
            cli: script(vec![Ok(()), Ok(())]),
            login: script(vec![Ok(())]),
            cli_tokens: script(vec![
                Err(AuthError::token(Backend::AzureCli, "first")),
                Err(AuthError::token(Backend::AzureCli, "second")),
            ]),
            device: script(vec![Ok(())]),
            device_tokens: script(vec![Ok(token_for("dc@contoso.com"))]),
            ..Default::default()
        };
        let id = authenticate(&cli_pref(), &fake, &AuthContext::default()).unwrap();
        assert_eq!(id.source, Backend::DeviceCode);
        assert_eq!(id.principal_name, "dc@contoso.com");
        assert_eq!(fake.count(&Call::Login), 1);
    }

    #[test]
    fn device_code_token_failure_gets_a_final_device_code_attempt() {
        let fake = FakeBackends {
            device: script(vec![Ok(()), Ok(())]),
            device_tokens: script(vec![
                Err(AuthError::token(Backend::DeviceCode, "transient")),
                Ok(token_for("dev@contoso.com")),
            ]),
            ..Default::default()
        };
        let id = authenticate(&device_pref(), &fake, &AuthContext::default()).unwrap();
        assert_eq!(id.source, Backend::DeviceCode);
        assert_eq!(id.principal_name, "dev@contoso.com");
        assert_eq!(
            fake.calls(),
            vec![
                Call::DeviceCodeCredential,
                Call::Token(Backend::DeviceCode),
                Call::DeviceCodeCredential,
                Call::Token(Backend::DeviceCode),
            ]
        );
    }

    #[test]
    fn last_attempt_error_is_returned() {
        let fake = FakeBackends {
            device: script(vec![Ok(()), Ok(())]),
            device_tokens: script(vec![
                Err(AuthError::token(Backend::DeviceCode, "transient")),
                Err(AuthError::token(Backend::DeviceCode, "expired_token")),
            ]),
            ..Default::default()
        };
        let err = authenticate(&device_pref(), &fake, &AuthContext::default()).unwrap_err();
        assert_eq!(err, AuthError::token(Backend::DeviceCode, "expired_token"));
        assert_eq!(fake.count(&Call::Login), 0);
        assert_eq!(fake.count(&Call::CliCredential), 0);
    }

    #[test]
    fn cli_preference_retries_cli_after_device_code_fallback_token_fails() {
        let fake = FakeBackends {
            cli: script(vec![
                Err(AuthError::construction(Backend::AzureCli, "not signed in")),
                Err(AuthError::construction(Backend::AzureCli, "still not signed in")),
                Ok(()),
            ]),
            login: script(vec![Ok(()), Ok(())]),
            device: script(vec![Ok(())]),
            device_tokens: script(vec![Err(AuthError::token(
                Backend::DeviceCode,
                "declined",
            ))]),
            cli_tokens: script(vec![Ok(token_for("cli@contoso.com"))]),
            ..Default::default()
        };
        let id = authenticate(&cli_pref(), &fake, &AuthContext::default()).unwrap();
        assert_eq!(id.source, Backend::AzureCli);
        assert_eq!(id.principal_name, "cli@contoso.com");
        assert_eq!(
            fake.calls(),
            vec![
                Call::CliCredential,
                Call::Login,
                Call::CliCredential,
                Call::DeviceCodeCredential,
                Call::Token(Backend::DeviceCode),
                Call::Login,
                Call::CliCredential,
                Call::Token(Backend::AzureCli),
            ]
        );
    }

    #[test]
    fn device_preference_never_logs_in_after_cli_fallback_token_fails() {
        let fake = FakeBackends {
            device: script(vec![
                Err(AuthError::construction(Backend::DeviceCode, "curl missing")),
                Ok(()),
            ]),
            cli: script(vec![Ok(())]),
            cli_tokens: script(vec![Err(AuthError::token(
                Backend::AzureCli,
                "AADSTS700082",
            ))]),
            device_tokens: script(vec![Ok(token_for("dev@contoso.com"))]),
            ..Default::default()
        };
        let id = authenticate(&device_pref(), &fake, &AuthContext::default()).unwrap();
        assert_eq!(id.source, Backend::DeviceCode);
        assert_eq!(
            fake.calls(),
            vec![
                Call::DeviceCodeCredential,
                Call::CliCredential,
                Call::Token(Backend::AzureCli),
                Call::DeviceCodeCredential,
                Call::Token(Backend::DeviceCode),
            ]
        );
    }

    #[test]
    fn summary_carries_token_expiry() {
        let expires_on = DateTime::from_timestamp(1_714_564_800, 0);
        let token = AccessToken {
            token: token_for("a@contoso.com"),
            expires_on,
        };
        let id = IdentitySummary::from_token(&token, Backend::AzureCli);
        assert_eq!(id.principal_name, "a@contoso.com");
        assert_eq!(id.expires_on, expires_on);
    }

    #[test]
    fn all_backends_failing_returns_error() {
        let fake = FakeBackends {
            cli: script(vec![Err(AuthError::construction(
                Backend::AzureCli,
                "az missing",
            ))]),
            login: script(vec![Err(AuthError::LoginFailed("spawn failed".into()))]),
            device: script(vec![Err(AuthError::construction(
                Backend::DeviceCode,
                "invalid tenant",
            ))]),
            ..Default::default()
        };
        let err = authenticate(&cli_pref(), &fake, &AuthContext::default()).unwrap_err();
        assert!(matches!(
            err,
            AuthError::CredentialConstruction {
                backend: Backend::DeviceCode,
                ..
            }
        ));
        assert_eq!(fake.count(&Call::Login), 1);
    }

    #[test]
    fn undecodable_token_still_authenticates_with_placeholders() {
        let fake = FakeBackends {
            cli: script(vec![Ok(())]),
            cli_tokens: script(vec![Ok("opaque-token".into())]),
            ..Default::default()
        };
        let id = authenticate(&cli_pref(), &fake, &AuthContext::default()).unwrap();
        assert_eq!(id.principal_name, PLACEHOLDER);
        assert_eq!(id.tenant_id, PLACEHOLDER);
    }

    #[test]
    fn cancelled_context_short_circuits() {
        let fake = FakeBackends::default();
        let ctx = AuthContext::default();
        ctx.cancel();
        let err = authenticate(&cli_pref(), &fake, &ctx).unwrap_err();
        assert_eq!(err, AuthError::Cancelled);
        assert!(fake.calls().is_empty());
    }

    #[test]
    fn each_call_constructs_a_fresh_credential() {
        let fake = FakeBackends {
            cli: script(vec![Ok(()), Ok(())]),
            cli_tokens: script(vec![
                Ok(token_for("a@contoso.com")),
                Ok(token_for("a@contoso.com")),
            ]),
            ..Default::default()
        };
        let ctx = AuthContext::default();
        authenticate(&cli_pref(), &fake, &ctx).unwrap();
        authenticate(&cli_pref(), &fake, &ctx).unwrap();
        assert_eq!(fake.count(&Call::CliCredential), 2);
    }
}
