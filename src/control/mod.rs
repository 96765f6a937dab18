//! Control channel: unix-socket listener, event bus and action dispatch.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  accept/read   ┌───────────┐  FIFO bus   ┌────────────┐
//! │ local client ├───────────────►│  listener ├────────────►│  consumer  ├──► ChatSession::send
//! └──────────────┘  one payload   └───────────┘  (mpsc)     └────────────┘
//!                   per connection
//! ```
//!
//! Payloads travel the bus as raw bytes in the order their connections were
//! accepted. The consumer decodes each payload independently; a payload that
//! fails to decode is reported and dropped without disturbing the bus.

pub mod action;
pub mod consumer;
pub mod listener;

pub use action::{Action, ActionError};
pub use consumer::ControlConsumer;
pub use listener::{ControlError, ControlListener, MAX_PAYLOAD_SIZE};

use tokio::sync::mpsc;

/// Bus capacity. The bus is bounded: under overload producers wait instead
/// of queueing payloads without limit, which pushes backpressure onto
/// control clients.
pub const BUS_CAPACITY: usize = 64;

/// Raw control payload as read from one accepted connection.
pub type Payload = Vec<u8>;

/// Create the control event bus.
///
/// FIFO: payloads are delivered to the consumer in the order they were
/// enqueued by the listener.
pub fn event_bus() -> (mpsc::Sender<Payload>, mpsc::Receiver<Payload>) {
    mpsc::channel(BUS_CAPACITY)
}
