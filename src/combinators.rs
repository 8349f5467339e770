//! Purpose: Reusable stream processors built from `get` and `put`.
//! Exports: `identity`, `map`, `filter`, `filter_map`, `scan`, `batch`, `compose`.
//! Role: Vocabulary for assembling pipelines without hand-writing recursion.
//! Invariants: Every combinator reads exactly one input per `Get` and keeps input order.
//! Invariants: `compose` steps in a loop; internal hand-offs do not grow the stack.
//! Invariants: `compose` forces an upstream continuation only when the downstream reads again.
use std::num::NonZeroUsize;
use std::rc::Rc;

use crate::lazy::Lazy;
use crate::processor::StreamProcessor;

/// Output every input unchanged.
pub fn identity<'a, A: 'a>() -> StreamProcessor<'a, A, A> {
    StreamProcessor::get(|a| StreamProcessor::put(a, identity))
}

/// Output `f(a)` for every input `a`.
pub fn map<'a, A: 'a, B: 'a, F>(f: F) -> StreamProcessor<'a, A, B>
where
    F: Fn(A) -> B + 'a,
{
    map_shared(Rc::new(f))
}

fn map_shared<'a, A: 'a, B: 'a, F>(f: Rc<F>) -> StreamProcessor<'a, A, B>
where
    F: Fn(A) -> B + 'a,
{
    StreamProcessor::get(move |a| {
        let b = f(a);
        StreamProcessor::put(b, move || map_shared(f))
    })
}

/// Output only the inputs satisfying `pred`.
pub fn filter<'a, A: 'a, P>(pred: P) -> StreamProcessor<'a, A, A>
where
    P: Fn(&A) -> bool + 'a,
{
    filter_shared(Rc::new(pred))
}

fn filter_shared<'a, A: 'a, P>(pred: Rc<P>) -> StreamProcessor<'a, A, A>
where
    P: Fn(&A) -> bool + 'a,
{
    StreamProcessor::get(move |a| {
        if pred(&a) {
            StreamProcessor::put(a, move || filter_shared(pred))
        } else {
            filter_shared(pred)
        }
    })
}

/// Output `b` for every input where `f` returns `Some(b)`.
pub fn filter_map<'a, A: 'a, B: 'a, F>(f: F) -> StreamProcessor<'a, A, B>
where
    F: Fn(A) -> Option<B> + 'a,
{
    filter_map_shared(Rc::new(f))
}

fn filter_map_shared<'a, A: 'a, B: 'a, F>(f: Rc<F>) -> StreamProcessor<'a, A, B>
where
    F: Fn(A) -> Option<B> + 'a,
{
    StreamProcessor::get(move |a| match f(a) {
        Some(b) => StreamProcessor::put(b, move || filter_map_shared(f)),
        None => filter_map_shared(f),
    })
}

/// A Mealy machine: thread `state` through `f`, outputting one value per input.
///
/// # Examples
///
/// Running sums:
///
/// ```
/// use rspl::{InfiniteList, Stream, combinators::scan};
///
/// let sums = scan(0u32, |total, n: u32| (total + n, total + n));
/// let out = sums.eval(InfiniteList::constant(2u32)).unwrap();
/// assert_eq!(out.take(3).unwrap(), vec![2, 4, 6]);
/// ```
pub fn scan<'a, S: 'a, A: 'a, B: 'a, F>(state: S, f: F) -> StreamProcessor<'a, A, B>
where
    F: Fn(S, A) -> (S, B) + 'a,
{
    scan_shared(state, Rc::new(f))
}

fn scan_shared<'a, S: 'a, A: 'a, B: 'a, F>(state: S, f: Rc<F>) -> StreamProcessor<'a, A, B>
where
    F: Fn(S, A) -> (S, B) + 'a,
{
    StreamProcessor::get(move |a| {
        let (state, b) = f(state, a);
        StreamProcessor::put(b, move || scan_shared(state, f))
    })
}

/// Group inputs into vectors of exactly `size` elements.
pub fn batch<'a, A: 'a>(size: NonZeroUsize) -> StreamProcessor<'a, A, Vec<A>> {
    batch_from(size.get(), Vec::with_capacity(size.get()))
}

fn batch_from<'a, A: 'a>(size: usize, mut pending: Vec<A>) -> StreamProcessor<'a, A, Vec<A>> {
    StreamProcessor::get(move |a| {
        pending.push(a);
        if pending.len() >= size {
            StreamProcessor::put(pending, move || {
                batch_from(size, Vec::with_capacity(size))
            })
        } else {
            batch_from(size, pending)
        }
    })
}

/// The upstream side of a composition.
enum Upstream<'a, A, B> {
    Ready(StreamProcessor<'a, A, B>),
    /// Continuation after a hand-off, forced when the downstream reads again.
    Pending(Lazy<'a, StreamProcessor<'a, A, B>>),
}

/// Serial composition: outputs of `first` become the inputs of `second`.
pub fn compose<'a, A: 'a, B: 'a, C: 'a>(
    first: StreamProcessor<'a, A, B>,
    second: StreamProcessor<'a, B, C>,
) -> StreamProcessor<'a, A, C> {
    compose_from(Upstream::Ready(first), second)
}

fn compose_from<'a, A: 'a, B: 'a, C: 'a>(
    mut first: Upstream<'a, A, B>,
    mut second: StreamProcessor<'a, B, C>,
) -> StreamProcessor<'a, A, C> {
    loop {
        second = match second {
            StreamProcessor::Put(output, rest) => {
                return StreamProcessor::put(output, move || compose_from(first, rest.force()));
            }
            StreamProcessor::Get(consume) => {
                let upstream = match first {
                    Upstream::Ready(processor) => processor,
                    Upstream::Pending(rest) => rest.force(),
                };
                match upstream {
                    StreamProcessor::Put(handoff, rest) => {
                        first = Upstream::Pending(rest);
                        consume(handoff)
                    }
                    StreamProcessor::Get(read) => {
                        return StreamProcessor::get(move |a| {
                            compose_from(Upstream::Ready(read(a)), StreamProcessor::Get(consume))
                        });
                    }
                }
            }
        };
    }
}
