mod auth;
mod setup;

use anyhow::Result;

use crate::cli::{AuthAction, Cli, Commands};

pub async fn dispatch(cli: Cli) -> Result<()> {
    let mut config = crmv_auth::SetupConfig::from_env();
    if let Some(path) = cli.session_file {
        config.session_file = path;
    }

    match cli.command {
        Commands::Setup { headed, force } => setup::execute(config, headed, force).await,
        Commands::Auth { action } => match action {
            AuthAction::Check => auth::check(&config),
            AuthAction::Show => auth::show(&config),
        },
    }
}
