//! CLI command definitions

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tidings")]
#[command(about = "Authenticated real-time update hub", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Token signing secret
    #[arg(long, env = "TIDINGS_SECRET", global = true)]
    pub secret: Option<String>,

    /// Token signing algorithm
    #[arg(long, env = "TIDINGS_ALGORITHM", default_value = "HS256", global = true)]
    pub algorithm: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the hub server
    Serve {
        /// Address to bind to
        #[arg(short, long, default_value = "0.0.0.0:3000")]
        bind: String,

        /// Public URL of the hub endpoint, used for discovery and cookies
        #[arg(long, env = "TIDINGS_PUBLIC_URL")]
        public_url: Option<String>,

        /// Maximum number of retained updates
        #[arg(long, default_value_t = 4096)]
        capacity: usize,

        /// Optional age bound for retained updates, in seconds
        #[arg(long)]
        max_age_secs: Option<u64>,

        /// Per-subscriber delivery buffer; slower subscribers are closed
        #[arg(long, default_value_t = 64)]
        buffer: usize,
    },

    /// Mint a token
    ///
    /// Examples:
    ///   tidings token --subscribe '*'
    ///   tidings token --publish 'https://example.com/books/{id}' --ttl-secs 300
    Token {
        /// Topic selector the token may publish to (can be repeated)
        #[arg(short, long = "publish")]
        publish: Vec<String>,

        /// Topic selector the token may subscribe to (can be repeated)
        #[arg(short, long = "subscribe")]
        subscribe: Vec<String>,

        /// Token lifetime in seconds
        #[arg(long, default_value_t = 3600)]
        ttl_secs: u64,

        /// Additional free-form claims, as a JSON object
        #[arg(long)]
        claims: Option<String>,
    },
}
