use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "airvend-core")]
#[command(about = "Wallet and data-bundle vending ledger service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP service (default)
    Serve,
    /// Apply pending database migrations and exit
    Migrate,
}
