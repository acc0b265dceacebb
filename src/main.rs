use clap::Parser;
use quickpoll::adapters::PollApiClient;
use quickpoll::cli::{self, Cli, Commands};
use quickpoll::error::Result;
use tracing::info;

mod main_runtime;

use main_runtime::{init_logging, init_logging_simple};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    match &cli.command {
        None | Some(Commands::Watch) => {
            init_logging(&config.logging);
            info!(
                rest_url = %config.server.rest_url,
                ws_url = %config.server.ws_url,
                "starting live view"
            );
            cli::run_watch(&config).await?;
        }
        Some(Commands::List { json }) => {
            init_logging_simple();
            let client = PollApiClient::from_config(&config)?;
            cli::list_polls(&client, *json).await?;
        }
        Some(Commands::Create { title, options }) => {
            init_logging_simple();
            let client = PollApiClient::from_config(&config)?;
            cli::create_poll(&client, title, options).await?;
        }
        Some(Commands::Vote { poll_id, option_id }) => {
            init_logging_simple();
            let client = PollApiClient::from_config(&config)?;
            cli::vote_once(&client, *poll_id, *option_id).await?;
        }
        Some(Commands::Like { poll_id }) => {
            init_logging_simple();
            let client = PollApiClient::from_config(&config)?;
            cli::like_once(&client, *poll_id).await?;
        }
    }

    Ok(())
}
