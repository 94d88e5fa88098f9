//! Background execution of a reorganize run.
//!
//! The caller keeps its own thread (a UI loop, or the CLI rendering a
//! progress bar) while one worker thread performs the run. Progress and the
//! outcome come back over a channel as [`RunEvent`]s, in emission order,
//! with exactly one `Finished` at the end.

use crate::classifier::Classifier;
use crate::engine::{CancelToken, ProgressEvent, ReorganizeEngine, RunOutcome};
use crate::file_organizer::{FsPrimitive, OrganizeError, StdFs};
use crate::output::{ProgressSink, SilentSink};
use crate::snapshot::FileEntry;
use crossbeam_channel::{Receiver, unbounded};
use std::path::PathBuf;
use std::thread::{self, JoinHandle};

/// Messages sent from the worker thread to the caller.
#[derive(Debug)]
pub enum RunEvent {
    Progress(ProgressEvent),
    Finished(RunOutcome),
}

/// The caller's side of a running worker.
pub struct RunHandle {
    events: Receiver<RunEvent>,
    cancel: CancelToken,
    thread: Option<JoinHandle<()>>,
}

/// Starts a run over `files` on a new thread, using the real filesystem.
pub fn spawn_run(files: Vec<FileEntry>, classifier: Classifier, destination_root: PathBuf) -> RunHandle {
    spawn_run_with(StdFs, files, classifier, destination_root)
}

/// Starts a run with a custom [`FsPrimitive`].
pub fn spawn_run_with<F>(
    fs: F,
    files: Vec<FileEntry>,
    classifier: Classifier,
    destination_root: PathBuf,
) -> RunHandle
where
    F: FsPrimitive + Send + 'static,
{
    let (sender, events) = unbounded();
    let cancel = CancelToken::new();
    let worker_cancel = cancel.clone();

    let thread = thread::spawn(move || {
        let engine = ReorganizeEngine::with_fs(fs);
        let outcome = engine.run(
            &files,
            &classifier,
            &destination_root,
            &worker_cancel,
            |event| {
                // The receiver only disappears when the caller stopped listening.
                let _ = sender.send(RunEvent::Progress(event));
            },
        );
        let _ = sender.send(RunEvent::Finished(outcome));
    });

    RunHandle {
        events,
        cancel,
        thread: Some(thread),
    }
}

impl RunHandle {
    /// A token that cancels this run; may be moved to another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Requests cancellation. Takes effect before the next file.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Raw event stream, for callers that poll it from their own loop.
    pub fn events(&self) -> &Receiver<RunEvent> {
        &self.events
    }

    /// Feeds every event into `sink` until the run ends, then joins the worker.
    ///
    /// A worker that dies without reporting yields `Failed` with
    /// [`OrganizeError::WorkerPanicked`].
    pub fn drive<S: ProgressSink + ?Sized>(mut self, sink: &mut S) -> RunOutcome {
        let mut processed = 0;
        let mut finished = None;

        for event in self.events.iter() {
            match event {
                RunEvent::Progress(progress) => {
                    processed = progress.index;
                    sink.on_progress(&progress);
                }
                RunEvent::Finished(outcome) => {
                    finished = Some(outcome);
                    break;
                }
            }
        }

        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            log::error!("reorganize worker panicked");
        }

        let outcome = finished.unwrap_or(RunOutcome::Failed {
            processed,
            error: OrganizeError::WorkerPanicked,
        });
        sink.on_finished(&outcome);
        outcome
    }

    /// Blocks until the run ends, discarding progress.
    pub fn wait(self) -> RunOutcome {
        self.drive(&mut SilentSink)
    }
}
