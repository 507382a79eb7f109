use super::console::ConsoleTransport;
use super::{MessageSink, Transport};
use crate::model::Message;
use std::io::Write;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl SharedBuffer {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

#[test]
fn test_console_refuses_while_disconnected() {
    let buffer = SharedBuffer::default();
    let transport = ConsoleTransport::new("platform", Box::new(buffer.clone()));
    let msg = Message::new("d2p/sensor_reading/g/GW/r/T", "[]");

    assert!(!transport.publish(&msg));
    assert!(buffer.contents().is_empty());
}

#[test]
fn test_console_writes_one_json_line_per_message() {
    let buffer = SharedBuffer::default();
    let transport = ConsoleTransport::new("platform", Box::new(buffer.clone()));
    assert!(transport.connect());

    let msg = Message::new("d2p/sensor_reading/g/GW/r/T", "[{\"data\":\"1\"}]");
    assert!(transport.publish(&msg));

    let line = buffer.contents();
    let parsed: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();
    assert_eq!(parsed["sink"], "platform");
    assert_eq!(parsed["channel"], "d2p/sensor_reading/g/GW/r/T");
    assert_eq!(parsed["payload"], "[{\"data\":\"1\"}]");
}

#[test]
fn test_console_disconnect() {
    let transport = ConsoleTransport::new("device", Box::new(SharedBuffer::default()));
    transport.connect();
    transport.disconnect();
    assert!(!transport.is_connected());
    assert!(!transport.publish(&Message::new("p2d/actuator_set/d/D/r/SW", "{}")));
}
