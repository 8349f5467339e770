//! Purpose: Streams backed by channel receivers that hold one message in advance.
//! Exports: `OvereagerReceiver`.
//! Role: Bridge between threads producing input and processors consuming it.
//! Invariants: The buffered message is always the head; `tail` blocks for the next one.
//! Invariants: A disconnected, drained channel surfaces as `ErrorKind::Disconnected`.
use crossbeam_channel::{Receiver, Sender, bounded, unbounded};

use super::Stream;
use crate::error::{Error, ErrorKind};

/// A receiver of messages of type `X` that always holds one message already received.
#[derive(Debug)]
pub struct OvereagerReceiver<X> {
    /// overeagerly received message
    message: X,
    receiver: Receiver<X>,
}

impl<X> Stream<X> for OvereagerReceiver<X> {
    fn head(&self) -> &X {
        &self.message
    }

    /// Block for the next message and make it the head.
    fn tail(mut self) -> Result<Self, Error> {
        self.message = self.receiver.recv().map_err(disconnected)?;
        Ok(self)
    }
}

impl<X> OvereagerReceiver<X> {
    /// Create a channel with an overeager receiver instead of a plain one.
    /// - `cap` is the number of messages the channel can hold, where `0` means any number.
    /// - `message` is the initial head, standing in until the first message arrives.
    ///
    /// # Examples
    ///
    /// ```
    /// use rspl::{OvereagerReceiver, Stream};
    ///
    /// let (tx, stream) = OvereagerReceiver::channel(0, true);
    /// tx.send(false).unwrap();
    /// assert!(!*stream.tail().unwrap().head());
    /// ```
    pub fn channel(cap: usize, message: X) -> (Sender<X>, OvereagerReceiver<X>) {
        let (tx, receiver) = if cap > 0 { bounded(cap) } else { unbounded() };
        (tx, OvereagerReceiver { message, receiver })
    }

    /// Wrap an existing receiver, blocking until its first message arrives.
    pub fn from_receiver(receiver: Receiver<X>) -> Result<Self, Error> {
        let message = receiver.recv().map_err(disconnected)?;
        Ok(OvereagerReceiver { message, receiver })
    }
}

fn disconnected(err: crossbeam_channel::RecvError) -> Error {
    tracing::debug!("overeager receiver reached a disconnected channel");
    Error::new(ErrorKind::Disconnected)
        .with_message("channel disconnected")
        .with_source(err)
}
