use datasim_core::{StreamChunk, StreamFormat, StreamReader, StreamSelector};
use serde_json::Value;

use crate::cli::StreamArgs;
use crate::error::CliError;
use crate::output::{write_fragment, CommandOutput};

use super::{read_input, Context};

pub async fn run(args: &StreamArgs, context: &Context) -> Result<CommandOutput, CliError> {
    let reader = StreamReader::new(context.client.clone(), &context.config);

    match &args.snapshot {
        Some(path) => {
            let data: Value = serde_json::from_str(&read_input(path)?)?;
            let text = reader
                .start(StreamSelector::Snapshot { data })
                .collect()
                .await
                .iter()
                .map(StreamChunk::as_text)
                .collect::<String>();
            Ok(CommandOutput::Text(text))
        }
        None => {
            print_live(&reader, args.format).await?;
            Ok(CommandOutput::Streamed)
        }
    }
}

/// Copies a live read to stdout as chunks arrive. An error chunk ends the
/// command with its message.
pub(super) async fn print_live(reader: &StreamReader, format: StreamFormat) -> Result<(), CliError> {
    let mut handle = reader.start(StreamSelector::Stream { format });
    while let Some(chunk) = handle.next().await {
        match chunk {
            StreamChunk::Text(text) => write_fragment(&text)?,
            StreamChunk::Error { message, .. } => return Err(CliError::Stream(message)),
        }
    }
    Ok(())
}
