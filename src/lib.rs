//! Purpose: Stream processors over lazy and channel-backed streams.
//! Exports: `StreamProcessor`, `Eval`, `Stream`, `InfiniteList`, `OvereagerReceiver`, `Lazy`, errors.
//! Role: Library behind the `rspl` CLI; `pelican` and `balancer` are worked examples.
//! Invariants: Streams are infinite; a finite source ends with `ErrorKind::Disconnected`.
//! Invariants: No panics on input exhaustion; every fallible step returns `Result`.
pub mod balancer;
pub mod combinators;
pub mod error;
pub mod lazy;
pub mod pelican;
pub mod processor;
pub mod streams;

#[doc(hidden)]
pub use error::to_exit_code;
pub use error::{Error, ErrorKind};
pub use lazy::Lazy;
pub use processor::{Eval, StreamProcessor};
pub use streams::{InfiniteList, OvereagerReceiver, Stream};
