//! Purpose: Lazy infinite lists, the pure in-memory `Stream`.
//! Exports: `InfiniteList`.
//! Role: Deterministic input for processors and a building block for tests and demos.
//! Invariants: Only the head is ever strict; each tail is computed on demand.
//! Invariants: `tail` never fails.
use std::rc::Rc;
use std::vec;

use super::Stream;
use crate::error::Error;
use crate::lazy::Lazy;

/// A list without end: a head and a lazily computed rest.
#[derive(Debug)]
pub enum InfiniteList<'a, X> {
    Cons(X, Lazy<'a, InfiniteList<'a, X>>),
}

impl<'a, X: 'a> InfiniteList<'a, X> {
    pub fn cons<F>(head: X, rest: F) -> Self
    where
        F: FnOnce() -> InfiniteList<'a, X> + 'a,
    {
        InfiniteList::Cons(head, Lazy::new(rest))
    }

    /// `x, x, x, ...`
    ///
    /// # Examples
    ///
    /// ```
    /// use rspl::{InfiniteList, Stream};
    ///
    /// let ones = InfiniteList::constant(1);
    /// assert_eq!(ones.take(3).unwrap(), vec![1, 1, 1]);
    /// ```
    pub fn constant(x: X) -> Self
    where
        X: Clone,
    {
        InfiniteList::cons(x.clone(), move || InfiniteList::constant(x))
    }

    /// `x, f(x), f(f(x)), ...`
    pub fn iterate<F>(x: X, f: F) -> Self
    where
        X: Clone,
        F: Fn(&X) -> X + 'a,
    {
        iterate_shared(x, Rc::new(f))
    }

    /// The elements of `items` in order, then `rest`.
    pub fn prepend(items: Vec<X>, rest: InfiniteList<'a, X>) -> Self {
        prepend_from(items.into_iter(), rest)
    }
}

fn prepend_from<'a, X: 'a>(
    mut items: vec::IntoIter<X>,
    rest: InfiniteList<'a, X>,
) -> InfiniteList<'a, X> {
    match items.next() {
        Some(item) => InfiniteList::cons(item, move || prepend_from(items, rest)),
        None => rest,
    }
}

fn iterate_shared<'a, X, F>(x: X, f: Rc<F>) -> InfiniteList<'a, X>
where
    X: Clone + 'a,
    F: Fn(&X) -> X + 'a,
{
    let seed = x.clone();
    InfiniteList::cons(x, move || {
        let next = f(&seed);
        iterate_shared(next, f)
    })
}

impl<X> Stream<X> for InfiniteList<'_, X> {
    fn head(&self) -> &X {
        match self {
            InfiniteList::Cons(head, _) => head,
        }
    }

    fn tail(self) -> Result<Self, Error> {
        match self {
            InfiniteList::Cons(_, rest) => Ok(rest.force()),
        }
    }
}
