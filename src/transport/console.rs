//! Line-oriented sink writing one JSON object per message.
//!
//! Used by the binary to make routing decisions visible on stdout, and by
//! tests with an in-memory writer.

use std::io::Write;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tracing::{debug, error};

use super::{MessageSink, Transport};
use crate::model::Message;

#[derive(Serialize)]
struct OutputLine<'a> {
    sink: &'a str,
    channel: &'a str,
    payload: &'a str,
}

pub struct ConsoleTransport {
    name: String,
    out: Mutex<Box<dyn Write + Send>>,
    connected: AtomicBool,
}

impl ConsoleTransport {
    pub fn new(name: impl Into<String>, out: Box<dyn Write + Send>) -> Self {
        Self {
            name: name.into(),
            out: Mutex::new(out),
            connected: AtomicBool::new(false),
        }
    }

    pub fn stdout(name: impl Into<String>) -> Self {
        Self::new(name, Box::new(std::io::stdout()))
    }
}

impl MessageSink for ConsoleTransport {
    fn publish(&self, message: &Message) -> bool {
        if !self.is_connected() {
            debug!("{} is disconnected, refusing '{}'", self.name, message.channel());
            return false;
        }
        let line = OutputLine {
            sink: &self.name,
            channel: message.channel(),
            payload: message.payload(),
        };
        let text = match serde_json::to_string(&line) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize message for {}: {e}", self.name);
                return false;
            }
        };
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        match writeln!(out, "{text}").and_then(|_| out.flush()) {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to write to {}: {e}", self.name);
                false
            }
        }
    }
}

impl Transport for ConsoleTransport {
    fn connect(&self) -> bool {
        self.connected.store(true, Ordering::SeqCst);
        true
    }

    fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for ConsoleTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleTransport")
            .field("name", &self.name)
            .field("connected", &self.is_connected())
            .finish()
    }
}
