//! Bootstrap Admin: register a privileged account using the shared secret.

use anyhow::{Context, Result};
use bootstrap_admin::{RegisterOptions, RegistrationClient, DEFAULT_SERVER_URL};
use bootstrap_core::SharedSecret;
use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Bootstrap Admin: shared-secret registration client
#[derive(Parser, Debug)]
#[command(name = "bootstrap-admin", version)]
#[command(about = "Register admin accounts through the shared-secret bootstrap endpoints")]
struct Args {
    /// Base URL of the gateway
    #[arg(long, global = true, env = "SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    server_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a new account
    Register(RegisterArgs),
    /// Fetch a nonce to check connectivity
    Nonce,
}

#[derive(ClapArgs)]
struct RegisterArgs {
    username: String,
    password: String,
    displayname: Option<String>,

    /// Create a regular account instead of an admin
    #[arg(long)]
    not_admin: bool,

    #[arg(long)]
    user_type: Option<String>,

    /// Shared registration secret
    #[arg(long, env = "ADMIN_SECRET", hide_env_values = true)]
    secret: String,
}

impl std::fmt::Debug for RegisterArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterArgs")
            .field("username", &self.username)
            .field("not_admin", &self.not_admin)
            .field("user_type", &self.user_type)
            .finish_non_exhaustive()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Command::Nonce => {
            // Only the nonce endpoint is touched; any placeholder key will do.
            let client = RegistrationClient::new(&args.server_url, SharedSecret::new("-")?)?;
            let nonce = client.fetch_nonce().await.context("fetching nonce")?;
            println!("{nonce}");
        }
        Command::Register(reg) => {
            let secret = SharedSecret::new(reg.secret.as_str()).context("ADMIN_SECRET")?;
            let client = RegistrationClient::new(&args.server_url, secret)?;

            let options = RegisterOptions {
                username: reg.username,
                password: reg.password,
                display_name: reg.displayname,
                admin: !reg.not_admin,
                user_type: reg.user_type,
            };
            let account = client
                .register_with(&options)
                .await
                .with_context(|| format!("registering {}", options.username))?;

            let token: String = account.access_token.chars().take(8).collect();
            println!("user_id:      {}", account.user_id);
            println!("device_id:    {}", account.device_id);
            println!("access_token: {token}...");
            println!("expires_in:   {}s", account.expires_in);
        }
    }

    Ok(())
}
