use std::path::PathBuf;

use clap::Parser;

/// Process-wide configuration, taken from the environment (or flags).
/// Startup fails if the database URL or signing secret is missing.
#[derive(Debug, Clone, Parser)]
#[command(name = "thesis-server", about = "Thesis management backend")]
pub struct Config {
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// HS256 signing secret for session tokens, at least 32 characters.
    #[arg(long, env = "TOKEN_SECRET")]
    pub token_secret: String,

    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    #[arg(long, env = "UPLOAD_DIR", default_value = "uploads")]
    pub upload_dir: PathBuf,
}
