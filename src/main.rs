use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use azscope::auth::azure_cli::LoginMode;
use azscope::auth::device_code::DeviceCodeMessage;
use azscope::auth::{self, AuthContext, AzureBackends};
use azscope::config::{self, Config};
use azscope::tui;

#[derive(Parser)]
#[command(
    name = "azscope",
    about = "Browse Azure resources and security incidents from the terminal",
    version = azscope::VERSION
)]
struct Cli {
    /// Preferred credential backend: cli or devicecode
    #[arg(long, global = true)]
    auth: Option<String>,
    /// Directory (tenant) id to sign in to
    #[arg(long, global = true)]
    tenant: Option<String>,
    /// Application (client) id for the device-code flow
    #[arg(long, global = true)]
    client_id: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the TUI dashboard (default)
    Dashboard,
    /// Print the path of the config file
    ConfigPath,
    /// Authenticate without the TUI and print who you are signed in as
    Whoami,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Dashboard) {
        Commands::ConfigPath => {
            println!("{}", config::config_path()?.display());
            Ok(())
        }
        Commands::Whoami => {
            let cfg = load_config(cli.auth, cli.tenant, cli.client_id)?;
            init_logging(&cfg)?;
            whoami(&cfg)
        }
        Commands::Dashboard => {
            let cfg = load_config(cli.auth, cli.tenant, cli.client_id)?;
            init_logging(&cfg)?;
            tracing::info!(version = azscope::VERSION, "starting dashboard");
            tui::run(&cfg)
        }
    }
}

fn load_config(
    auth: Option<String>,
    tenant: Option<String>,
    client_id: Option<String>,
) -> Result<Config> {
    Ok(config::load()?.with_overrides(auth, tenant, client_id))
}

/// Log to a file; the terminal belongs to the TUI.
fn init_logging(cfg: &Config) -> Result<()> {
    config::ensure_dirs()?;
    let path = config::log_path()?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_max_level(cfg.log_level())
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise logging: {e}"))
}

fn whoami(cfg: &Config) -> Result<()> {
    let backends = AzureBackends::new(
        LoginMode::Interactive,
        Arc::new(|msg: &DeviceCodeMessage| eprintln!("{}", msg.message)),
    );
    match auth::authenticate(&cfg.auth_preference(), &backends, &AuthContext::default()) {
        Ok(identity) => {
            println!("principal: {}", identity.principal_name);
            println!("tenant:    {}", identity.tenant_id);
            println!("via:       {}", identity.source);
            if let Some(expires_on) = identity.expires_on {
                println!("expires:   {}", expires_on.to_rfc3339());
            }
            Ok(())
        }
        Err(e) => anyhow::bail!("authentication failed: {e}"),
    }
}
