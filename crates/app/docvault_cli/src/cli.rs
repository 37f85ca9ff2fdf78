use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "docvault", about = "Docvault operator CLI", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply pending database migrations.
    Migrate {
        /// PostgreSQL connection URL.
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,
    },

    /// Create the first admin account, or promote an existing user to admin.
    SeedAdmin {
        /// PostgreSQL connection URL.
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,

        /// Admin email address.
        #[arg(long, env = "DOCVAULT_ADMIN_EMAIL")]
        email: String,

        /// Admin password. An existing account has its password reset to this.
        #[arg(long, env = "DOCVAULT_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Print version information.
    Version,
}
