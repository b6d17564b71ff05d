//! Thread-pool scheduler for block workers with a bounded in-flight window.
//!
//! The coordinator pulls ranges from the lazy partitioner only while fewer
//! than `max_in_flight` tasks are outstanding, so worker memory stays
//! bounded. Completion order is irrelevant: outputs carry their `block_id`
//! and are reassembled in id order for the merger.

use crate::block::{self, BlockContext, BlockOutput};
use crate::error::BuildError;
use crate::partition::BlockRange;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    pub workers: usize,
    /// Resolved window, see `Config::in_flight_window`.
    pub max_in_flight: usize,
    /// A worker retires after this many tasks and is replaced; 0 disables.
    pub max_tasks_per_child: usize,
}

enum WorkerReply {
    Done(BlockOutput),
    Failed { block_id: u64, cause: String },
    Retiring,
}

/// The window is the caller's configured value, never widened to the worker
/// count: a window smaller than the pool simply leaves some workers idle.
fn resolved_window(opts: &SchedulerOptions) -> usize {
    opts.max_in_flight.max(1)
}

/// Run every range through the worker pool, returning outputs sorted by
/// `block_id`. The first worker failure aborts the build: queued work is
/// drained unprocessed and the error propagates as `BuildAborted`.
pub fn run_blocks(
    ctx: Arc<BlockContext>,
    ranges: impl Iterator<Item = std::io::Result<BlockRange>>,
    opts: &SchedulerOptions,
) -> Result<Vec<BlockOutput>, BuildError> {
    let workers = opts.workers.max(1);
    let window = resolved_window(opts);
    let (task_tx, task_rx) = bounded::<BlockRange>(window);
    let (reply_tx, reply_rx) = unbounded::<WorkerReply>();

    let mut handles: Vec<JoinHandle<()>> = Vec::with_capacity(workers);
    for _ in 0..workers {
        handles.push(spawn_worker(
            ctx.clone(),
            task_rx.clone(),
            reply_tx.clone(),
            opts.max_tasks_per_child,
        ));
    }

    let mut outputs: Vec<BlockOutput> = Vec::new();
    let mut in_flight = 0usize;
    let mut failure: Option<BuildError> = None;

    'dispatch: for range in ranges {
        let range = match range {
            Ok(range) => range,
            Err(err) => {
                failure = Some(err.into());
                break;
            }
        };
        while in_flight >= window {
            match reply_rx.recv() {
                Ok(reply) => {
                    handle_reply(
                        reply,
                        &mut outputs,
                        &mut in_flight,
                        &mut failure,
                        &mut handles,
                        &ctx,
                        &task_rx,
                        &reply_tx,
                        opts.max_tasks_per_child,
                    );
                    if failure.is_some() {
                        break 'dispatch;
                    }
                }
                Err(_) => break 'dispatch,
            }
        }
        if task_tx.send(range).is_err() {
            break;
        }
        in_flight += 1;
    }
    drop(task_tx);

    if failure.is_some() {
        // Cancel work that was queued but never picked up.
        while task_rx.try_recv().is_ok() {}
    }
    while failure.is_none() && in_flight > 0 {
        match reply_rx.recv() {
            Ok(reply) => handle_reply(
                reply,
                &mut outputs,
                &mut in_flight,
                &mut failure,
                &mut handles,
                &ctx,
                &task_rx,
                &reply_tx,
                opts.max_tasks_per_child,
            ),
            Err(_) => break,
        }
        if failure.is_some() {
            while task_rx.try_recv().is_ok() {}
        }
    }
    drop(reply_rx);

    for handle in handles {
        let _ = handle.join();
    }

    match failure {
        Some(err) => Err(err),
        None => {
            outputs.sort_by_key(|out| out.block_id);
            Ok(outputs)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn handle_reply(
    reply: WorkerReply,
    outputs: &mut Vec<BlockOutput>,
    in_flight: &mut usize,
    failure: &mut Option<BuildError>,
    handles: &mut Vec<JoinHandle<()>>,
    ctx: &Arc<BlockContext>,
    task_rx: &Receiver<BlockRange>,
    reply_tx: &Sender<WorkerReply>,
    max_tasks_per_child: usize,
) {
    match reply {
        WorkerReply::Done(output) => {
            *in_flight -= 1;
            outputs.push(output);
        }
        WorkerReply::Failed { block_id, cause } => {
            *in_flight -= 1;
            if failure.is_none() {
                *failure = Some(BuildError::BuildAborted { block_id, cause });
            }
        }
        WorkerReply::Retiring => {
            handles.push(spawn_worker(
                ctx.clone(),
                task_rx.clone(),
                reply_tx.clone(),
                max_tasks_per_child,
            ));
        }
    }
}

fn spawn_worker(
    ctx: Arc<BlockContext>,
    task_rx: Receiver<BlockRange>,
    reply_tx: Sender<WorkerReply>,
    max_tasks_per_child: usize,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let mut handled = 0usize;
        while let Ok(range) = task_rx.recv() {
            let block_id = range.block_id;
            let reply = match block::process_block(&ctx, range) {
                Ok(output) => WorkerReply::Done(output),
                Err(err) => WorkerReply::Failed {
                    block_id,
                    cause: err.to_string(),
                },
            };
            let failed = matches!(reply, WorkerReply::Failed { .. });
            if reply_tx.send(reply).is_err() || failed {
                return;
            }
            handled += 1;
            if max_tasks_per_child > 0 && handled >= max_tasks_per_child {
                let _ = reply_tx.send(WorkerReply::Retiring);
                return;
            }
        }
    })
}
