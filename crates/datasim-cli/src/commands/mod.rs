mod generate;
mod history;
mod stream;
mod tables;

use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use datasim_core::{ApiConfig, CatalogStore, HttpClient, ReqwestHttpClient};

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::output::CommandOutput;

/// Resolved configuration and collaborators shared by every command.
pub struct Context {
    pub config: ApiConfig,
    pub client: Arc<dyn HttpClient>,
    pub store: CatalogStore,
}

impl Context {
    /// Defaults, then `DATASIM_*` environment variables, then flags.
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let mut config = ApiConfig::from_env()?;
        if let Some(api_url) = &cli.api_url {
            config = config.with_base_url(api_url.clone())?;
        }
        if let Some(interval) = cli.poll_interval_ms {
            config.poll.interval = Duration::from_millis(interval);
        }
        if let Some(timeout) = cli.timeout_ms {
            config.request_timeout = Duration::from_millis(timeout);
        }

        Ok(Self {
            config,
            client: Arc::new(ReqwestHttpClient::new()),
            store: CatalogStore::new(&cli.data_dir),
        })
    }
}

pub async fn run(command: &Command, context: &Context) -> Result<CommandOutput, CliError> {
    match command {
        Command::Generate(args) => generate::run(args, context).await,
        Command::Stream(args) => stream::run(args, context).await,
        Command::Tables(args) => tables::run(args, context).await,
        Command::History(args) => history::run(args, context),
    }
}

/// Reads a file, or stdin when the path is `-`.
fn read_input(path: &Path) -> Result<String, CliError> {
    if path.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        return Ok(buffer);
    }
    Ok(std::fs::read_to_string(path)?)
}
