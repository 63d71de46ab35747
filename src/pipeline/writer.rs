//! The writer task: sole owner of the output stream.
//!
//! Entity tasks send their records over a bounded channel; the orchestrator
//! sends a barrier after each batch and waits for the reply before starting
//! the next one, so every record of batch *i* is on disk before batch
//! *i + 1* is fetched.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::{AppError, Result};
use crate::models::MergedFoodRecord;
use crate::storage::{StreamingWriter, WriteSummary};
use crate::utils::log;

/// Output written so far, as acknowledged at a barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteProgress {
    pub records: usize,
    pub bytes: u64,
}

/// Messages accepted by the writer task.
#[derive(Debug)]
pub enum WriterCommand {
    /// Records of one entity, appended contiguously
    Records(Vec<MergedFoodRecord>),
    /// Reply once everything sent before has been written
    Barrier(oneshot::Sender<WriteProgress>),
}

/// Handle to a running writer task.
pub struct WriterHandle {
    sender: mpsc::Sender<WriterCommand>,
    task: JoinHandle<Result<WriteSummary>>,
}

impl WriterHandle {
    /// Move `writer` into a new task fed by a channel of `capacity` messages.
    pub fn spawn(writer: StreamingWriter, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let task = tokio::spawn(run(writer, receiver));
        Self { sender, task }
    }

    /// A sender for entity tasks.
    pub fn sender(&self) -> mpsc::Sender<WriterCommand> {
        self.sender.clone()
    }

    /// Wait until every record sent so far is written.
    pub async fn barrier(&self) -> Result<WriteProgress> {
        let (reply, ack) = oneshot::channel();
        self.sender
            .send(WriterCommand::Barrier(reply))
            .await
            .map_err(|_| AppError::writer("writer task stopped"))?;
        ack.await
            .map_err(|_| AppError::writer("writer task stopped before the barrier"))
    }

    /// Close the channel and write the closing marker.
    ///
    /// Surfaces the error that stopped the task early, if any.
    pub async fn finish(self) -> Result<WriteSummary> {
        drop(self.sender);
        self.task
            .await
            .map_err(|e| AppError::writer(format!("writer task failed: {e}")))?
    }

    /// The error that stopped the writer task, or `fallback` if it ended
    /// cleanly.
    ///
    /// Every other sender must be dropped first.
    pub async fn into_error(self, fallback: AppError) -> AppError {
        self.finish().await.err().unwrap_or(fallback)
    }
}

/// Send one entity's records to the writer.
pub async fn send_records(
    sender: &mpsc::Sender<WriterCommand>,
    records: impl IntoIterator<Item = MergedFoodRecord>,
) -> Result<()> {
    sender
        .send(WriterCommand::Records(records.into_iter().collect()))
        .await
        .map_err(|_| AppError::writer("writer task stopped"))
}

async fn run(
    mut writer: StreamingWriter,
    mut receiver: mpsc::Receiver<WriterCommand>,
) -> Result<WriteSummary> {
    while let Some(command) = receiver.recv().await {
        match command {
            WriterCommand::Records(records) => {
                for record in &records {
                    writer.append(record).await?;
                }
            }
            WriterCommand::Barrier(reply) => {
                let progress = WriteProgress {
                    records: writer.records(),
                    bytes: writer.bytes_written(),
                };
                if reply.send(progress).is_err() {
                    log::debug("Barrier dropped before the writer replied");
                }
            }
        }
    }

    writer.finish().await
}
