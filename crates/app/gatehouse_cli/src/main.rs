//! Gatehouse administration CLI.
//!
//! Operator-facing entrypoint for schema migrations, account bootstrap and
//! session revocation. Request-serving surfaces live elsewhere; this binary
//! only drives `gatehouse_core` directly.

pub use self::error::{Error, Result};
mod error;

use clap::Parser;
use cli::{Cli, Commands};
use tracing::info;
use uuid::Uuid;

use gatehouse_core::auth::identity::{IdentityStore, PgIdentityStore};
use gatehouse_core::auth::jwt::resolve_jwt_secret;
use gatehouse_core::auth::service::AuthService;
use gatehouse_core::clock::{Clock, SystemClock};
use gatehouse_core::config::AuthConfig;
use gatehouse_core::{db, migrate};

mod cli;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout stays parseable.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,gatehouse_core=debug".parse().unwrap()),
        )
        .init();

    let args = Cli::parse();

    match args.command {
        Commands::InitDb => {
            let pool = db::connect(&args.database_url, args.max_connections).await?;
            info!("running database migrations");
            migrate::migrate(&pool).await?;
            println!("migrations applied");
        }

        Commands::CreateUser {
            email,
            username,
            password,
            full_name,
            superuser,
        } => {
            let pool = db::connect(&args.database_url, args.max_connections).await?;
            let secret = resolve_jwt_secret();
            let service = AuthService::postgres(pool.clone(), secret.as_bytes(), AuthConfig::from_env());

            let identity = service
                .register(&email, &username, &password, full_name.as_deref())
                .await?;

            if superuser {
                let identities = PgIdentityStore::new(pool);
                identities
                    .set_superuser(identity.id, true, SystemClock.now())
                    .await?;
                info!(user_id = %identity.id, "superuser flag set");
            }

            println!("{}", serde_json::to_string_pretty(&identity).map_err(|e| Error::Custom(e.to_string()))?);
        }

        Commands::RevokeSessions { user_id } => {
            let user_id = Uuid::parse_str(&user_id)
                .map_err(|_| Error::Custom(format!("invalid user id: {user_id}")))?;

            let pool = db::connect(&args.database_url, args.max_connections).await?;
            let secret = resolve_jwt_secret();
            let service = AuthService::postgres(pool, secret.as_bytes(), AuthConfig::from_env());

            service.logout_all(user_id).await?;
            println!("sessions revoked for {user_id}");
        }

        Commands::Version => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
