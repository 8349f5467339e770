//! Purpose: Turn a line-oriented reader into a channel of parsed values on a background thread.
//! Exports: `ErrorPolicy`, `FeedOutcome`, `FeedHandle`, `spawn_line_feed`.
//! Role: Input side of the CLI; the receiver becomes an `OvereagerReceiver` stream.
//! Invariants: End of input closes the channel, which consumers see as `Disconnected`.
//! Invariants: Under `Stop`, the first malformed line closes the channel and is reported by `finish`.
use std::io::BufRead;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use rspl::{Error, ErrorKind};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorPolicy {
    Stop,
    Skip,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct FeedOutcome {
    pub lines: u64,
    pub sent: u64,
    pub skipped: u64,
}

pub struct FeedHandle {
    handle: JoinHandle<Result<FeedOutcome, Error>>,
}

impl FeedHandle {
    /// Wait for the reader thread and report what it read.
    pub fn finish(self) -> Result<FeedOutcome, Error> {
        self.handle.join().map_err(|_| {
            Error::new(ErrorKind::Internal).with_message("input reader thread panicked")
        })?
    }
}

/// Start reading `reader` line by line. `capacity` bounds the channel; `0` means unbounded.
///
/// `parse` returns `Ok(None)` for lines that carry no value (blank lines, comments).
pub fn spawn_line_feed<R, T, P>(
    reader: R,
    capacity: usize,
    errors: ErrorPolicy,
    parse: P,
) -> Result<(Receiver<T>, FeedHandle), Error>
where
    R: BufRead + Send + 'static,
    T: Send + 'static,
    P: Fn(&str) -> Result<Option<T>, String> + Send + 'static,
{
    let (tx, rx) = if capacity > 0 {
        bounded(capacity)
    } else {
        unbounded()
    };
    let handle = thread::Builder::new()
        .name("rspl-input".to_string())
        .spawn(move || read_lines(reader, errors, parse, tx))
        .map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to spawn input reader")
                .with_source(err)
        })?;
    Ok((rx, FeedHandle { handle }))
}

fn read_lines<R, T, P>(
    reader: R,
    errors: ErrorPolicy,
    parse: P,
    tx: Sender<T>,
) -> Result<FeedOutcome, Error>
where
    R: BufRead,
    P: Fn(&str) -> Result<Option<T>, String>,
{
    let mut outcome = FeedOutcome::default();
    for line in reader.lines() {
        let line = line.map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to read input")
                .with_source(err)
        })?;
        outcome.lines += 1;
        let line_no = outcome.lines;

        match parse(&line) {
            Ok(Some(value)) => {
                if tx.send(value).is_err() {
                    tracing::debug!(line = line_no, "consumer hung up; input reader stopping");
                    break;
                }
                outcome.sent += 1;
            }
            Ok(None) => {}
            Err(message) => match errors {
                ErrorPolicy::Stop => {
                    return Err(Error::new(ErrorKind::Usage)
                        .with_message(format!("line {line_no}: {message}"))
                        .with_hint("Use --errors skip to continue past malformed lines."));
                }
                ErrorPolicy::Skip => {
                    outcome.skipped += 1;
                    tracing::warn!(line = line_no, %message, "skipping malformed line");
                }
            },
        }
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::{ErrorPolicy, FeedOutcome, spawn_line_feed};
    use rspl::ErrorKind;
    use std::io::Cursor;

    fn parse_number(line: &str) -> Result<Option<u32>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        line.parse()
            .map(Some)
            .map_err(|_| format!("not a number: {line}"))
    }

    #[test]
    fn values_arrive_in_order_then_channel_closes() {
        let input = Cursor::new(b"1\n\n2\n3\n".to_vec());
        let (rx, feed) =
            spawn_line_feed(input, 0, ErrorPolicy::Stop, parse_number).expect("spawn");
        let values: Vec<u32> = rx.iter().collect();
        assert_eq!(values, vec![1, 2, 3]);
        assert_eq!(
            feed.finish().expect("finish"),
            FeedOutcome {
                lines: 4,
                sent: 3,
                skipped: 0
            }
        );
    }

    #[test]
    fn stop_policy_reports_line() {
        let input = Cursor::new(b"1\nx\n2\n".to_vec());
        let (rx, feed) =
            spawn_line_feed(input, 1, ErrorPolicy::Stop, parse_number).expect("spawn");
        let values: Vec<u32> = rx.iter().collect();
        assert_eq!(values, vec![1]);
        let err = feed.finish().expect_err("malformed line");
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert!(err.message().unwrap_or_default().starts_with("line 2"));
    }

    #[test]
    fn skip_policy_counts_failures() {
        let input = Cursor::new(b"x\n5\ny\n".to_vec());
        let (rx, feed) =
            spawn_line_feed(input, 0, ErrorPolicy::Skip, parse_number).expect("spawn");
        let values: Vec<u32> = rx.iter().collect();
        assert_eq!(values, vec![5]);
        let outcome = feed.finish().expect("finish");
        assert_eq!(outcome.skipped, 2);
        assert_eq!(outcome.sent, 1);
    }
}
