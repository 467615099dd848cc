//! Streaming queue maintenance.
//!
//! [`fill_queue`] tops a streaming source's chunk queue up to its queue
//! size, recycling processed chunks first. [`Refill`] runs it periodically
//! on a background thread while the source plays.

use std::sync::Weak;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{after, bounded, select, Sender};

use crate::engine::backend::{Backend, Decoded, NativeHandle, SubmitOutcome};
use crate::engine::source::SourceShared;
use crate::engine::stream::StreamSession;
use crate::error::Result;

/// Queue parameters of one source, captured under its lock
#[derive(Debug, Clone, Copy)]
pub(crate) struct QueuePlan {
    pub queue_size: usize,
    pub chunk_size: usize,
    pub looping: bool,
}

/// Bring a source's queue to exactly `queue_size` chunks where data allows.
///
/// Processed chunks are unqueued one at a time and replaced with fresh data;
/// surplus chunks left over from a larger queue size are dropped. At end of
/// stream a looping source rewinds once and keeps decoding.
pub(crate) fn fill_queue(
    backend: &dyn Backend,
    source: NativeHandle,
    stream: &StreamSession,
    plan: QueuePlan,
) -> Result<usize> {
    let mut submitted = 0;

    loop {
        let status = backend.queue_status(source);
        if status.processed > 0 {
            backend.unqueue_processed(source)?;
            if status.queued > plan.queue_size {
                continue;
            }
        } else if status.queued >= plan.queue_size {
            break;
        }

        let mut rewound = false;
        let chunk = loop {
            match stream.decode_chunk(plan.chunk_size)? {
                (format, Decoded::Data(bytes)) => break Some((format, bytes)),
                (_, Decoded::EndOfData) if plan.looping && !rewound => {
                    stream.rewind()?;
                    rewound = true;
                }
                (_, Decoded::EndOfData) => break None,
            }
        };

        let Some((format, bytes)) = chunk else {
            break;
        };
        if backend.submit_chunk(source, format, bytes)? == SubmitOutcome::QueueFull {
            break;
        }
        submitted += 1;
    }

    if submitted > 0 {
        tracing::trace!(source = %source, chunks = submitted, "queue refilled");
    }
    Ok(submitted)
}

/// A background refill worker bound to one source
pub(crate) struct Refill {
    cancel: Sender<()>,
    worker: JoinHandle<()>,
}

impl Refill {
    /// Start refilling every `interval` until the source stops playing,
    /// loses its stream, is dropped, or the worker is stopped
    pub(crate) fn spawn(source: Weak<SourceShared>, interval: Duration) -> Result<Self> {
        let (cancel, cancelled) = bounded::<()>(0);

        let worker = thread::Builder::new()
            .name("resonar-refill".to_string())
            .spawn(move || loop {
                select! {
                    recv(cancelled) -> _ => break,
                    recv(after(interval)) -> _ => {
                        let Some(source) = source.upgrade() else {
                            break;
                        };
                        if !source.refill_tick() {
                            break;
                        }
                    }
                }
            })?;

        Ok(Self { cancel, worker })
    }

    pub(crate) fn is_running(&self) -> bool {
        !self.worker.is_finished()
    }

    /// Cancel the worker and wait for it.
    ///
    /// Must not be called with the source's core lock held.
    pub(crate) fn stop(self) {
        let Refill { cancel, worker } = self;
        drop(cancel);
        if worker.join().is_err() {
            tracing::warn!("refill worker panicked");
        }
    }
}
