//! Purpose: The `Stream` abstraction consumed and produced by stream processors.
//! Exports: `Stream`, `Iter`, `InfiniteList`, `OvereagerReceiver`.
//! Role: Uniform head/tail view over lazy lists, channels, and evaluated processors.
//! Invariants: `head` never blocks; only `tail` may block or fail.
//! Invariants: A failed `tail` consumes the stream; there is no retry.
use std::marker::PhantomData;

use crate::error::Error;

pub mod infinite_lists;
pub mod overeager_receivers;

pub use infinite_lists::InfiniteList;
pub use overeager_receivers::OvereagerReceiver;

/// An infinite sequence of `X`, observed one element at a time.
///
/// Sources that can run out (channels) report it through `tail` with
/// [`ErrorKind::Disconnected`](crate::ErrorKind::Disconnected).
pub trait Stream<X>: Sized {
    /// The current element.
    fn head(&self) -> &X;

    /// The stream without its current element.
    fn tail(self) -> Result<Self, Error>;

    /// Collect the first `n` heads, advancing the stream `n - 1` times.
    fn take(self, n: usize) -> Result<Vec<X>, Error>
    where
        X: Clone,
    {
        self.iter().take(n).collect()
    }

    /// Iterate over cloned heads. The first error ends the iteration.
    fn iter(self) -> Iter<Self, X>
    where
        X: Clone,
    {
        Iter {
            state: IterState::Head(self),
            _element: PhantomData,
        }
    }
}

pub struct Iter<S, X> {
    state: IterState<S>,
    _element: PhantomData<fn() -> X>,
}

enum IterState<S> {
    Head(S),
    Advance(S),
    Done,
}

impl<S, X> Iterator for Iter<S, X>
where
    S: Stream<X>,
    X: Clone,
{
    type Item = Result<X, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        match std::mem::replace(&mut self.state, IterState::Done) {
            IterState::Head(stream) => {
                let head = stream.head().clone();
                self.state = IterState::Advance(stream);
                Some(Ok(head))
            }
            IterState::Advance(stream) => match stream.tail() {
                Ok(next) => {
                    let head = next.head().clone();
                    self.state = IterState::Advance(next);
                    Some(Ok(head))
                }
                Err(err) => Some(Err(err)),
            },
            IterState::Done => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{InfiniteList, OvereagerReceiver, Stream};
    use crate::error::ErrorKind;

    #[test]
    fn take_zero_and_one_do_not_advance() {
        let (_tx, stream) = OvereagerReceiver::channel(0, 5u8);
        // A tail here would block forever on the open, empty channel.
        assert_eq!(stream.take(1).expect("take"), vec![5]);

        let (_tx, stream) = OvereagerReceiver::channel(0, 5u8);
        assert!(stream.take(0).expect("take").is_empty());
    }

    #[test]
    fn iter_stops_after_first_error() {
        let (tx, stream) = OvereagerReceiver::channel(0, 1u32);
        tx.send(2).expect("send");
        drop(tx);

        let items: Vec<_> = stream.iter().collect();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_ref().ok(), Some(&1));
        assert_eq!(items[1].as_ref().ok(), Some(&2));
        assert_eq!(
            items[2].as_ref().err().map(|err| err.kind()),
            Some(ErrorKind::Disconnected)
        );
    }

    #[test]
    fn iter_over_infinite_list_is_unbounded() {
        let naturals = InfiniteList::iterate(0u64, |n| n + 1);
        let sum: u64 = naturals
            .iter()
            .take(100)
            .map(|item| item.expect("infinite lists never fail"))
            .sum();
        assert_eq!(sum, 4950);
    }
}
