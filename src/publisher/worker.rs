//! Publish worker
//!
//! A single named thread alternates between sleeping on the outbox condition
//! variable and draining the router's backlog into the transport. It wakes on
//! a new value, on the transport becoming connected, and on shutdown. There is
//! no timer: a refused batch is retried on the next wake.
//!
//! Shutdown clears the run flag and joins the thread. A publish already in
//! progress completes; the drain checks the flag before starting another.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info};

use super::Outbox;
use crate::router::MessageRouter;
use crate::transport::MessageSink;

pub struct PublishWorker {
    outbox: Arc<Outbox>,
    handle: Option<JoinHandle<()>>,
}

impl PublishWorker {
    /// Spawn the worker draining `router`'s backlog into `transport`.
    ///
    /// The worker starts disconnected; call `on_connected` once the transport is up.
    pub fn start(router: Arc<MessageRouter>, transport: Arc<dyn MessageSink>) -> io::Result<Self> {
        let outbox = router.outbox().clone();
        outbox.start();

        let worker_outbox = outbox.clone();
        let handle = thread::Builder::new()
            .name("publish-worker".to_string())
            .spawn(move || run(worker_outbox, router, transport))?;

        Ok(Self {
            outbox,
            handle: Some(handle),
        })
    }

    pub fn on_connected(&self) {
        info!("Transport connected, resuming publishing");
        self.outbox.set_connected(true);
    }

    pub fn on_disconnected(&self) {
        info!("Transport disconnected, holding backlog");
        self.outbox.set_connected(false);
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some() && self.outbox.is_running()
    }

    /// Stop the loop and wait for it to exit.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.outbox.stop();
        if handle.join().is_err() {
            error!("Publish worker panicked");
        }
    }
}

impl Drop for PublishWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(outbox: Arc<Outbox>, router: Arc<MessageRouter>, transport: Arc<dyn MessageSink>) {
    debug!("Publish worker started");
    while outbox.wait_for_work() {
        let report = router.drain_into(transport.as_ref(), &|| outbox.may_publish());
        if !report.is_clean() {
            debug!(
                "Drain pass: {} published, {} refused, {} dropped",
                report.published, report.failed, report.dropped
            );
        }
    }
    debug!("Publish worker stopped");
}

impl std::fmt::Debug for PublishWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublishWorker")
            .field("outbox", &self.outbox)
            .field("running", &self.handle.is_some())
            .finish()
    }
}
