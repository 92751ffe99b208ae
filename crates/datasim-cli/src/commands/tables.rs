use datasim_core::{to_delimited_text, CatalogClient};
use serde_json::Value;

use crate::cli::{TablesArgs, TablesCommand};
use crate::error::CliError;
use crate::output::CommandOutput;

use super::Context;

pub async fn run(args: &TablesArgs, context: &Context) -> Result<CommandOutput, CliError> {
    let catalog = CatalogClient::new(context.client.clone(), &context.config);

    match &args.command {
        TablesCommand::List => {
            let tables = catalog.list_tables().await?;
            Ok(CommandOutput::Json(serde_json::to_value(tables)?))
        }
        TablesCommand::Content { table, limit, csv } => {
            let rows = catalog.table_content(table, *limit).await?;
            if *csv {
                Ok(CommandOutput::Text(to_delimited_text(&rows)))
            } else {
                Ok(CommandOutput::Json(Value::Array(
                    rows.into_iter().map(Value::Object).collect(),
                )))
            }
        }
        TablesCommand::Schema { table } => {
            let schema = catalog.table_schema(table).await?;
            Ok(CommandOutput::Json(serde_json::to_value(schema)?))
        }
    }
}
