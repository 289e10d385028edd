//! The ordered hand-off from driver callbacks to the application.
//!
//! The channel holds a single undelivered event. Publishing while it is
//! occupied blocks the driver's callback thread until the consumer catches
//! up, so memory stays bounded and nothing is dropped or reordered. Closing
//! the channel (at teardown, or when the consumer goes away) releases any
//! blocked publisher, which then discards its event.

use {
    crate::event::Event,
    async_channel::{Receiver, Sender},
};

pub const CAPACITY: usize = 1;

pub(crate) fn channel() -> (Publisher, EventStream) {
    let (sender, receiver) = async_channel::bounded(CAPACITY);
    (Publisher { sender }, EventStream { receiver })
}

pub(crate) struct Publisher {
    sender: Sender<Event>,
}

impl Publisher {
    /// Blocks while the previous event is undelivered. Returns `false` if
    /// the stream was closed and the event discarded.
    pub fn publish(&self, event: Event) -> bool {
        self.sender.send_blocking(event).is_ok()
    }

    pub fn close(&self) {
        self.sender.close();
    }
}

/// Receiving end of the event stream. There is exactly one per connection.
#[derive(Debug)]
pub struct EventStream {
    receiver: Receiver<Event>,
}

impl EventStream {
    /// Wait for the next event. `None` once the connection is torn down and
    /// every published event has been received.
    pub async fn recv(&self) -> Option<Event> {
        self.receiver.recv().await.ok()
    }

    pub fn recv_blocking(&self) -> Option<Event> {
        self.receiver.recv_blocking().ok()
    }

    pub fn try_recv(&self) -> Option<Event> {
        self.receiver.try_recv().ok()
    }

    pub fn is_closed(&self) -> bool {
        self.receiver.is_closed()
    }

    pub fn into_stream(self) -> impl futures_util::Stream<Item = Event> {
        self.receiver
    }
}
