//! Purpose: Stream processors and their evaluation against input streams.
//! Exports: `StreamProcessor`, `Eval`.
//! Role: Core of the crate; combinators and demo machines are built from `get` and `put`.
//! Invariants: Input is read on demand; an output is visible before further input is requested.
//! Invariants: `Put` continuations are forced only by `Eval::tail`.
//! Invariants: Evaluation loops instead of recursing, so long runs of `Get`s use constant stack.
use std::fmt;

use crate::combinators;
use crate::error::Error;
use crate::lazy::Lazy;
use crate::streams::Stream;

/// A description of how to turn a stream of `A`s into a stream of `B`s.
///
/// # Examples
///
/// Doubling every input:
///
/// ```
/// use rspl::{InfiniteList, Stream, StreamProcessor};
///
/// fn double<'a>() -> StreamProcessor<'a, u32, u32> {
///     StreamProcessor::get(|n| StreamProcessor::put(n * 2, double))
/// }
///
/// let naturals = InfiniteList::iterate(0u32, |n| n + 1);
/// let doubled = double().eval(naturals).unwrap();
/// assert_eq!(doubled.take(4).unwrap(), vec![0, 2, 4, 6]);
/// ```
pub enum StreamProcessor<'a, A, B> {
    /// Read one input and continue with the processor it selects.
    Get(Box<dyn FnOnce(A) -> StreamProcessor<'a, A, B> + 'a>),
    /// Emit one output, then continue lazily.
    Put(B, Lazy<'a, StreamProcessor<'a, A, B>>),
}

impl<'a, A: 'a, B: 'a> StreamProcessor<'a, A, B> {
    pub fn get<F>(f: F) -> Self
    where
        F: FnOnce(A) -> StreamProcessor<'a, A, B> + 'a,
    {
        StreamProcessor::Get(Box::new(f))
    }

    pub fn put<F>(output: B, rest: F) -> Self
    where
        F: FnOnce() -> StreamProcessor<'a, A, B> + 'a,
    {
        StreamProcessor::Put(output, Lazy::new(rest))
    }

    /// Run `self` on `input` up to its first output.
    ///
    /// Never returns if the processor reads forever from an infinite input
    /// without putting.
    pub fn eval<S>(self, input: S) -> Result<Eval<'a, A, B, S>, Error>
    where
        S: Stream<A>,
        A: Clone,
    {
        run(self, Input::Fresh(input))
    }

    /// Like [`eval`](Self::eval), but `connect` is only called once the
    /// processor first needs input.
    pub fn eval_with<S, F>(self, connect: F) -> Result<Eval<'a, A, B, S>, Error>
    where
        S: Stream<A>,
        A: Clone,
        F: FnOnce() -> Result<S, Error> + 'a,
    {
        run(self, Input::Deferred(Lazy::new(connect)))
    }

    /// Feed the outputs of `self` into `next`.
    pub fn then<C: 'a>(self, next: StreamProcessor<'a, B, C>) -> StreamProcessor<'a, A, C> {
        combinators::compose(self, next)
    }
}

impl<A, B: fmt::Debug> fmt::Debug for StreamProcessor<'_, A, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamProcessor::Get(_) => f.write_str("Get(..)"),
            StreamProcessor::Put(output, _) => f.debug_tuple("Put").field(output).finish(),
        }
    }
}

/// The input side of an evaluation.
enum Input<'a, S> {
    /// Not connected yet.
    Deferred(Lazy<'a, Result<S, Error>>),
    /// Head not yet handed to a `Get`.
    Fresh(S),
    /// Head already handed out; the next read needs a `tail`.
    Consumed(S),
}

impl<S> Input<'_, S> {
    fn read<A: Clone>(self) -> Result<(A, S), Error>
    where
        S: Stream<A>,
    {
        let stream = match self {
            Input::Deferred(connect) => connect.force()?,
            Input::Fresh(stream) => stream,
            Input::Consumed(stream) => stream.tail()?,
        };
        let head = stream.head().clone();
        Ok((head, stream))
    }
}

/// The output stream of a running processor.
pub struct Eval<'a, A, B, S> {
    head: B,
    rest: Lazy<'a, StreamProcessor<'a, A, B>>,
    input: Input<'a, S>,
}

impl<A, B, S> Eval<'_, A, B, S> {
    /// Stop evaluating and give back the last output.
    pub fn into_head(self) -> B {
        self.head
    }
}

fn run<'a, A, B, S>(
    mut processor: StreamProcessor<'a, A, B>,
    mut input: Input<'a, S>,
) -> Result<Eval<'a, A, B, S>, Error>
where
    S: Stream<A>,
    A: Clone,
{
    loop {
        match processor {
            StreamProcessor::Put(head, rest) => return Ok(Eval { head, rest, input }),
            StreamProcessor::Get(f) => {
                let (a, stream) = input.read()?;
                input = Input::Consumed(stream);
                processor = f(a);
            }
        }
    }
}

impl<A, B, S> Stream<B> for Eval<'_, A, B, S>
where
    S: Stream<A>,
    A: Clone,
{
    fn head(&self) -> &B {
        &self.head
    }

    fn tail(self) -> Result<Self, Error> {
        run(self.rest.force(), self.input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::streams::{InfiniteList, OvereagerReceiver};
    use std::cell::Cell;

    fn echo<'a>() -> StreamProcessor<'a, u64, u64> {
        StreamProcessor::get(|n| StreamProcessor::put(n, echo))
    }

    fn first_at_least<'a>(limit: u64) -> StreamProcessor<'a, u64, u64> {
        StreamProcessor::get(move |n| {
            if n >= limit {
                StreamProcessor::put(n, move || first_at_least(limit))
            } else {
                first_at_least(limit)
            }
        })
    }

    #[test]
    fn echo_reproduces_its_input() {
        let naturals = InfiniteList::iterate(0u64, |n| n + 1);
        let out = echo().eval(naturals).expect("eval");
        assert_eq!(out.take(5).expect("take"), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn put_first_does_not_connect_input() {
        let connected = Cell::new(false);
        let processor = StreamProcessor::put(100, echo);
        let out = processor
            .eval_with(|| {
                connected.set(true);
                Ok(InfiniteList::constant(7u64))
            })
            .expect("eval");
        assert_eq!(*out.head(), 100);
        assert!(!connected.get());

        let out = out.tail().expect("tail");
        assert_eq!(*out.head(), 7);
        assert!(connected.get());
    }

    #[test]
    fn continuation_is_forced_only_on_tail() {
        let forced = Cell::new(0);
        let processor: StreamProcessor<'_, u64, u64> = StreamProcessor::put(1, || {
            forced.set(forced.get() + 1);
            echo()
        });
        let out = processor.eval(InfiniteList::constant(2)).expect("eval");
        assert_eq!(forced.get(), 0);
        let out = out.tail().expect("tail");
        assert_eq!(forced.get(), 1);
        assert_eq!(out.into_head(), 2);
    }

    #[test]
    fn output_does_not_wait_for_next_input() {
        let (tx, stream) = OvereagerReceiver::channel(0, 1u64);
        // The placeholder is echoed without any message on the channel.
        let out = echo().eval(stream).expect("eval");
        assert_eq!(*out.head(), 1);

        tx.send(2).expect("send");
        let out = out.tail().expect("tail");
        assert_eq!(*out.head(), 2);
    }

    #[test]
    fn long_runs_without_output_use_constant_stack() {
        let naturals = InfiniteList::iterate(0u64, |n| n + 1);
        let out = first_at_least(1_000_000).eval(naturals).expect("eval");
        assert_eq!(*out.head(), 1_000_000);
    }

    #[test]
    fn disconnected_input_ends_evaluation() {
        let (tx, stream) = OvereagerReceiver::channel(0, 1u64);
        drop(tx);
        let out = echo().eval(stream).expect("eval");
        let err = out.tail().err().map(|err| err.kind());
        assert_eq!(err, Some(ErrorKind::Disconnected));
    }

    #[test]
    fn connect_failure_is_returned() {
        let result = echo().eval_with::<InfiniteList<'_, u64>, _>(|| {
            Err(Error::new(ErrorKind::Io).with_message("no input"))
        });
        assert_eq!(result.err().map(|err| err.kind()), Some(ErrorKind::Io));
    }

    #[test]
    fn evaluations_chain_as_streams() {
        let naturals = InfiniteList::iterate(0u64, |n| n + 1);
        let first = first_at_least(3).eval(naturals).expect("eval");
        let second = echo().eval(first).expect("eval");
        assert_eq!(second.take(3).expect("take"), vec![3, 4, 5]);
    }

    #[test]
    fn debug_shows_variant() {
        assert_eq!(format!("{:?}", echo()), "Get(..)");
        assert_eq!(format!("{:?}", StreamProcessor::put(3u64, echo)), "Put(3)");
    }
}
