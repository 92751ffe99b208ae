use datasim_core::entry_name_for;
use serde_json::json;
use tracing::info;

use crate::cli::{HistoryArgs, HistoryCommand};
use crate::error::CliError;
use crate::output::CommandOutput;

use super::{read_input, Context};

pub fn run(args: &HistoryArgs, context: &Context) -> Result<CommandOutput, CliError> {
    let store = &context.store;

    match &args.command {
        HistoryCommand::List => Ok(CommandOutput::Json(serde_json::to_value(store.load_all()?)?)),
        HistoryCommand::Add { file, name } => {
            let content = read_input(file)?;
            if content.trim().is_empty() {
                return Err(CliError::Command(String::from("refusing to save an empty document")));
            }
            let name = match name {
                Some(name) => name.clone(),
                None => entry_name_for(&content, store.load_all()?.len()),
            };
            let entry = store.add(name, content)?;
            info!(id = %entry.id, name = %entry.name, "schema saved");
            Ok(CommandOutput::Json(serde_json::to_value(entry)?))
        }
        HistoryCommand::Remove { id } => {
            if !store.remove(id)? {
                return Err(CliError::Command(format!("no saved schema with id {id}")));
            }
            Ok(CommandOutput::Json(json!({ "removed": id })))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::context;
    use datasim_core::ScriptedHttpClient;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn add_names_entries_after_their_table_then_removes_them() {
        let dir = tempdir().expect("tempdir");
        let file = dir.path().join("orders.json");
        std::fs::write(&file, r#"{"table_name":"orders","fields":[]}"#).expect("write");
        let context = context(&Arc::new(ScriptedHttpClient::new()), dir.path());

        let added = run(
            &HistoryArgs {
                command: HistoryCommand::Add {
                    file,
                    name: None,
                },
            },
            &context,
        )
        .expect("added");
        let CommandOutput::Json(entry) = added else {
            panic!("expected json output");
        };
        assert_eq!(entry["name"], "orders");

        let id = entry["id"].as_str().expect("id").to_owned();
        run(
            &HistoryArgs {
                command: HistoryCommand::Remove { id: id.clone() },
            },
            &context,
        )
        .expect("removed");

        let error = run(
            &HistoryArgs {
                command: HistoryCommand::Remove { id },
            },
            &context,
        )
        .expect_err("already gone");
        assert_eq!(error.exit_code(), 2);
        assert!(context.store.load_all().expect("load").is_empty());
    }
}
