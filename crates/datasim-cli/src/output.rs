use std::io::Write;

use serde_json::Value;

use crate::error::CliError;

/// What a command hands back for printing.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutput {
    Json(Value),
    Text(String),
    /// The command already wrote its data to stdout.
    Streamed,
}

pub fn render(output: &CommandOutput, pretty: bool) -> Result<(), CliError> {
    match output {
        CommandOutput::Json(value) => {
            let payload = if pretty {
                serde_json::to_string_pretty(value)?
            } else {
                serde_json::to_string(value)?
            };
            println!("{payload}");
        }
        CommandOutput::Text(text) => println!("{text}"),
        CommandOutput::Streamed => {}
    }

    Ok(())
}

/// Writes a fragment straight through, without adding a newline.
pub fn write_fragment(text: &str) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()?;
    Ok(())
}
