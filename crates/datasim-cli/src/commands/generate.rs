use std::time::Duration;

use datasim_core::{
    stream_format_for, GenerationRequest, Job, JobController, JobStatus, SchemaDescription,
    StreamFormat, StreamReader,
};
use tokio::sync::oneshot;
use tracing::info;

use crate::cli::GenerateArgs;
use crate::error::CliError;
use crate::output::CommandOutput;

use super::stream::print_live;
use super::{read_input, Context};

pub async fn run(args: &GenerateArgs, context: &Context) -> Result<CommandOutput, CliError> {
    let schema = load_schema(args, context)?;
    let request = GenerationRequest::new(
        schema,
        args.records,
        args.format,
        args.storage.unwrap_or_default(),
    )?;
    request.ensure_storage_selected()?;

    let mut config = context.config.clone();
    if let Some(deadline) = args.deadline_ms {
        config.poll.deadline = Some(Duration::from_millis(deadline));
    }
    let controller = JobController::new(context.client.clone(), &config);

    let (finished_tx, finished_rx) = oneshot::channel();
    let mut finished_tx = Some(finished_tx);
    let handle = controller
        .submit_with_listener(&request, move |job| {
            report(job);
            if job.is_terminal() {
                if let Some(sender) = finished_tx.take() {
                    let _ = sender.send(job.clone());
                }
            }
        })
        .await?;

    let job = tokio::select! {
        finished = finished_rx => finished.map_err(|_| {
            CliError::Command(format!("polling for job {} stopped without a final status", handle.id()))
        })?,
        _ = tokio::signal::ctrl_c() => {
            handle.abandon();
            return Err(CliError::Interrupted { job_id: handle.id().to_owned() });
        }
    };

    match &job.status {
        JobStatus::Success { .. } if args.show => {
            let format = stream_format_for(args.format).unwrap_or(StreamFormat::Csv);
            let reader = StreamReader::new(context.client.clone(), &context.config);
            print_live(&reader, format).await?;
            Ok(CommandOutput::Streamed)
        }
        JobStatus::Success { .. } => Ok(CommandOutput::Json(serde_json::to_value(&job)?)),
        JobStatus::Failure { error } => Err(CliError::JobFailed {
            job_id: job.id.clone(),
            message: error.clone(),
        }),
        JobStatus::Terminated => Err(CliError::JobTerminated {
            job_id: job.id.clone(),
        }),
        JobStatus::Pending | JobStatus::Running { .. } => Err(CliError::Command(format!(
            "job {} reported a non-final status as final",
            job.id
        ))),
    }
}

fn load_schema(args: &GenerateArgs, context: &Context) -> Result<SchemaDescription, CliError> {
    let raw = match (&args.schema, &args.history) {
        (Some(path), _) => read_input(path)?,
        (None, Some(id)) => context
            .store
            .load_all()?
            .into_iter()
            .find(|entry| entry.id == *id)
            .map(|entry| entry.content)
            .ok_or_else(|| CliError::Command(format!("no saved schema with id {id}")))?,
        (None, None) => {
            return Err(CliError::Command(String::from(
                "either --schema or --history is required",
            )))
        }
    };

    Ok(serde_json::from_str(&raw)?)
}

fn report(job: &Job) {
    match &job.status {
        JobStatus::Running {
            progress: Some(progress),
        } => info!(
            job_id = %job.id,
            current = progress.current,
            total = progress.total,
            message = progress.message.as_deref().unwrap_or(""),
            "job running"
        ),
        status => info!(job_id = %job.id, status = status.label(), "job status"),
    }
}
