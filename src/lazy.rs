//! Purpose: Deferred computations used for stream tails and processor continuations.
//! Exports: `Lazy`.
//! Role: The only source of laziness in the crate; everything else is strict.
//! Invariants: Building a `Lazy` never runs it; `force` runs it exactly once.
use std::fmt;

/// A computation of a `T` that runs only when forced.
pub struct Lazy<'a, T>(Box<dyn FnOnce() -> T + 'a>);

impl<'a, T> Lazy<'a, T> {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() -> T + 'a,
    {
        Lazy(Box::new(f))
    }

    /// Wrap a value that is already computed.
    pub fn value(value: T) -> Self
    where
        T: 'a,
    {
        Lazy(Box::new(move || value))
    }

    pub fn force(self) -> T {
        (self.0)()
    }
}

impl<T> fmt::Debug for Lazy<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Lazy(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::Lazy;
    use std::cell::Cell;

    #[test]
    fn construction_does_not_run() {
        let runs = Cell::new(0);
        let lazy = Lazy::new(|| {
            runs.set(runs.get() + 1);
            7
        });
        assert_eq!(runs.get(), 0);
        assert_eq!(lazy.force(), 7);
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn value_is_returned_as_is() {
        assert_eq!(Lazy::value(String::from("x")).force(), "x");
    }
}
