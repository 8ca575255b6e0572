use clap::Parser;
use pmp_key_broker::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => cli::serve::run().await,
        Command::Reconcile(args) => cli::reconcile::run(args).await,
        Command::Migrate => cli::migrate::run().await,
    }
}
