//! Reconcile command - one pass for one user

use clap::Args;

use crate::domain::UserId;

#[derive(Debug, Args)]
pub struct ReconcileArgs {
    /// User identity (email) to reconcile
    #[arg(long)]
    pub user: String,
}

pub async fn run(args: ReconcileArgs) -> anyhow::Result<()> {
    let config = super::bootstrap()?;
    let user_id = UserId::new(&args.user)?;

    let services = crate::create_services(&config).await?;
    let keys = services.key_service.active_keys(&user_id).await?;

    println!("{}", serde_json::to_string_pretty(&keys)?);
    Ok(())
}
