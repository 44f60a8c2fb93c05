use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "gatehouse", about = "Gatehouse authentication administration")]
pub struct Cli {
    /// PostgreSQL connection URL.
    #[arg(
        long,
        global = true,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/gatehouse"
    )]
    pub database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, global = true, default_value_t = 5)]
    pub max_connections: u32,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run pending database migrations.
    InitDb,

    /// Register a user account.
    CreateUser {
        #[arg(long)]
        email: String,

        #[arg(long)]
        username: String,

        /// Must satisfy the configured password policy.
        #[arg(long)]
        password: String,

        #[arg(long)]
        full_name: Option<String>,

        /// Grant superuser privileges after creation.
        #[arg(long, default_value_t = false)]
        superuser: bool,
    },

    /// Revoke every active session for a user.
    RevokeSessions {
        /// User id (UUID).
        user_id: String,
    },

    /// Print the version.
    Version,
}
