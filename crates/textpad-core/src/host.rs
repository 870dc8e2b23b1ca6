//! Owner thread for a session and its documents.
//!
//! Documents are not shared between threads. Other threads hand closures to
//! the owner through a [`HostHandle`] and block until the result comes back.

use std::io;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use thiserror::Error;

use crate::document::Document;
use crate::session::Session;

type Job = Box<dyn FnOnce(&mut Session, &mut Vec<Document>) + Send>;

enum Request {
    Run(Job),
    Shutdown,
}

#[derive(Debug, Error)]
pub enum HostError {
    #[error("failed to spawn the document host thread: {0}")]
    SpawnFailed(#[source] io::Error),
    #[error("the document host is no longer running")]
    Disconnected,
    #[error("the document host thread panicked")]
    WorkerPanicked,
}

/// Cloneable sender side of a [`DocumentHost`].
#[derive(Clone)]
pub struct HostHandle {
    tx: Sender<Request>,
}

impl HostHandle {
    /// Runs `f` on the host thread and waits for its result.
    ///
    /// # Errors
    ///
    /// [`HostError::Disconnected`] when the host has shut down, or when `f`
    /// panicked before answering.
    pub fn call<R, F>(&self, f: F) -> Result<R, HostError>
    where
        R: Send + 'static,
        F: FnOnce(&mut Session, &mut Vec<Document>) -> R + Send + 'static,
    {
        let (reply_tx, reply_rx) = channel::bounded(1);
        let job: Job = Box::new(move |session, docs| {
            let _ = reply_tx.send(f(session, docs));
        });
        self.tx
            .send(Request::Run(job))
            .map_err(|_| HostError::Disconnected)?;
        reply_rx.recv().map_err(|_| HostError::Disconnected)
    }
}

/// A thread owning one [`Session`] and the documents opened in it.
pub struct DocumentHost {
    handle: HostHandle,
    worker: Option<JoinHandle<()>>,
}

impl DocumentHost {
    /// Starts the owner thread.
    ///
    /// # Errors
    ///
    /// [`HostError::SpawnFailed`] if the OS refuses the thread.
    pub fn spawn(session: Session) -> Result<Self, HostError> {
        let (tx, rx) = channel::unbounded();
        let worker = thread::Builder::new()
            .name("textpad-host".into())
            .spawn(move || run_worker(session, rx))
            .map_err(HostError::SpawnFailed)?;
        Ok(Self {
            handle: HostHandle { tx },
            worker: Some(worker),
        })
    }

    pub fn handle(&self) -> HostHandle {
        self.handle.clone()
    }

    /// See [`HostHandle::call`].
    pub fn call<R, F>(&self, f: F) -> Result<R, HostError>
    where
        R: Send + 'static,
        F: FnOnce(&mut Session, &mut Vec<Document>) -> R + Send + 'static,
    {
        self.handle.call(f)
    }

    /// Stops the owner thread after pending requests and waits for it.
    ///
    /// # Errors
    ///
    /// [`HostError::WorkerPanicked`] if the thread died from a panic.
    pub fn shutdown(&mut self) -> Result<(), HostError> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        let _ = self.handle.tx.send(Request::Shutdown);
        worker.join().map_err(|_| HostError::WorkerPanicked)
    }
}

impl Drop for DocumentHost {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::warn!("document host shutdown: {e}");
        }
    }
}

fn run_worker(mut session: Session, rx: Receiver<Request>) {
    tracing::debug!("document host started");
    let mut documents = Vec::new();
    while let Ok(request) = rx.recv() {
        match request {
            Request::Run(job) => job(&mut session, &mut documents),
            Request::Shutdown => break,
        }
    }
    tracing::debug!(open = documents.len(), "document host stopped");
}
