use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::info;
use zona_azul_client::auth::types::{LoginRequest, RegisterRequest};
use zona_azul_client::auth::{AuthService, Identity};
use zona_azul_client::client::ApiClient;
use zona_azul_client::events::SessionEvents;
use zona_azul_client::observability::metrics::metrics_text;
use zona_azul_client::store::build_token_store;
use zona_azul_client::utils::config_loader;
use zona_azul_client::utils::logging;
use zona_azul_client::utils::logging::LogLevel;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "zona-azul.yaml")]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and persist the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "ZA_PASSWORD")]
        password: String,
    },
    /// Create an account and persist the session
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "ZA_PASSWORD")]
        password: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        cpf: Option<String>,
    },
    /// Show the current user, validating the stored session
    Me,
    /// GET an API path with the stored session, e.g. `/parkings/active`
    Get { path: String },
    /// Log out and clear the stored session
    Logout,
    /// Print whether a session is stored
    Status,
    /// Print client metrics in prometheus text format
    Metrics,
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Load YAML config, init logging
    // -------------------------------

    let args = Args::parse();
    let client_config = config_loader::run(&args.config).await?;
    logging::run(&client_config, args.log_level.to_owned()).await?;

    // -------------------------------
    // 2. Token store, session events, api client
    // -------------------------------

    let settings = &client_config.settings;
    let store = build_token_store(&settings.storage)?;
    let events = SessionEvents::new();
    let api = ApiClient::new(&settings.api, store.clone(), events)?;
    let identity = Identity::new(AuthService::new(api.clone()));
    let listener = identity.start();
    info!("client ready, api: {}", settings.api.base_url);

    // -------------------------------
    // 3. Run command
    // -------------------------------

    match args.command {
        Command::Login { email, password } => {
            let user = identity.login(&LoginRequest { email, password }).await?;
            println!("logged in as {} <{}> ({:?})", user.name, user.email, user.role);
        }
        Command::Register { name, email, password, phone, cpf } => {
            let request = RegisterRequest {
                name,
                email,
                confirm_password: password.clone(),
                password,
                phone,
                cpf,
            };
            let user = identity.register(&request).await?;
            println!("registered {} <{}>", user.name, user.email);
        }
        Command::Me => {
            let user = identity
                .check_session()
                .await?
                .ok_or_else(|| anyhow!("not logged in"))?;
            println!("{}", serde_json::to_string_pretty(&user)?);
        }
        Command::Get { path } => {
            let body: Value = api.get(&path).await.map_err(|e| anyhow!(e.user_message()))?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Command::Logout => {
            identity.logout().await?;
            println!("logged out");
        }
        Command::Status => match store.get().await? {
            Some(_) => match store.user().await.ok().flatten() {
                Some(user) => println!("session stored for {} <{}>", user.email, user.name),
                None => println!("session stored"),
            },
            None => println!("no session stored"),
        },
        Command::Metrics => {
            print!("{}", metrics_text().await?);
        }
    }

    listener.abort();
    Ok(())
}
