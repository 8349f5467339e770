//! Purpose: `rspl` CLI entry point.
//! Role: Binary crate root; parses args, runs demo stream processors over stdin, emits JSON lines.
//! Invariants: Each stdout line is one JSON object; diagnostics go to stderr only.
//! Invariants: Non-interactive errors are emitted as JSON on stderr, interactive ones as text.
//! Invariants: Process exit code is derived from `rspl::to_exit_code`.
use std::error::Error as StdError;
use std::io::{self, BufReader, IsTerminal, Write};
use std::num::NonZeroUsize;

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum, error::ErrorKind as ClapErrorKind};
use clap_complete::aot::Shell;
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

mod command_dispatch;
mod input;

use input::{ErrorPolicy, spawn_line_feed};
use rspl::balancer::{Assignment, WorkerPool, round_robin};
use rspl::pelican::{Event, Lights, PelicanConfig, pelican};
use rspl::{Error, ErrorKind, OvereagerReceiver, Stream, to_exit_code};

/// Channel capacity between the stdin reader and the pelican controller.
const EVENT_CAPACITY: usize = 64;

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, Error> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to write help")
                        .with_source(io_err)
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(clap_error_summary(&err))
                    .with_hint("Try `rspl --help`."));
            }
        },
    };

    command_dispatch::dispatch_command(cli.command)
}

#[derive(Parser)]
#[command(
    name = "rspl",
    version,
    about = "Run stream processors over stdin",
    long_about = None,
    after_help = r#"EXAMPLES
  $ printf 'push\ntick\ntick\n' | rspl pelican
  $ cat jobs.txt | rspl balance --workers 3

Set RUST_LOG=debug for diagnostics on stderr."#,
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Drive a pelican crossing controller with `push`/`tick` lines from stdin
    Pelican(PelicanArgs),
    /// Spread stdin lines across a pool of workers, round robin
    Balance(BalanceArgs),
    /// Generate shell completion scripts
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
struct PelicanArgs {
    #[arg(long, default_value_t = 1, help = "Ticks spent on amber before pedestrians go")]
    amber_ticks: u32,
    #[arg(long, default_value_t = 2, help = "Ticks pedestrians have to cross")]
    walk_ticks: u32,
    #[arg(long, default_value_t = 1, help = "Ticks of flashing before vehicles go")]
    flashing_ticks: u32,
    #[arg(long, value_enum, default_value_t = ErrorPolicyCli::Stop)]
    errors: ErrorPolicyCli,
}

#[derive(Args)]
struct BalanceArgs {
    #[arg(long, default_value_t = 4, help = "Number of worker threads")]
    workers: usize,
    #[arg(long, default_value_t = 64, help = "Jobs buffered per channel")]
    capacity: usize,
}

#[derive(Copy, Clone, Debug, PartialEq, ValueEnum)]
enum ErrorPolicyCli {
    Stop,
    Skip,
}

impl From<ErrorPolicyCli> for ErrorPolicy {
    fn from(policy: ErrorPolicyCli) -> Self {
        match policy {
            ErrorPolicyCli::Stop => ErrorPolicy::Stop,
            ErrorPolicyCli::Skip => ErrorPolicy::Skip,
        }
    }
}

#[derive(Debug, Serialize)]
struct JobReport {
    seq: u64,
    worker: usize,
    job: String,
    bytes: usize,
    words: usize,
}

fn run_pelican(args: PelicanArgs) -> Result<RunOutcome, Error> {
    let config = PelicanConfig {
        amber_ticks: args.amber_ticks,
        walk_ticks: args.walk_ticks,
        flashing_ticks: args.flashing_ticks,
    };
    let (events, feed) = spawn_line_feed(
        BufReader::new(io::stdin()),
        EVENT_CAPACITY,
        args.errors.into(),
        parse_event,
    )?;

    let lights = pelican(config).eval_with(move || OvereagerReceiver::from_receiver(events));
    let mut out = io::stdout().lock();
    let mut step = 0u64;
    let emitted = drain(lights, |lights: Lights| {
        step += 1;
        write_json_line(
            &mut out,
            &json!({
                "step": step,
                "vehicles": lights.vehicles,
                "pedestrians": lights.pedestrians,
            }),
        )
    })?;

    let outcome = feed.finish()?;
    tracing::info!(
        lines = outcome.lines,
        events = outcome.sent,
        skipped = outcome.skipped,
        emitted,
        "pelican input drained"
    );
    Ok(RunOutcome::ok())
}

fn run_balance(args: BalanceArgs) -> Result<RunOutcome, Error> {
    let workers = NonZeroUsize::new(args.workers).ok_or_else(|| {
        Error::new(ErrorKind::Usage)
            .with_message("--workers must be at least 1")
            .with_hint("Pass --workers 1 or more.")
    })?;
    let capacity = NonZeroUsize::new(args.capacity).ok_or_else(|| {
        Error::new(ErrorKind::Usage)
            .with_message("--capacity must be at least 1")
            .with_hint("Pass --capacity 1 or more.")
    })?;

    let (jobs, feed) = spawn_line_feed(
        BufReader::new(io::stdin()),
        capacity.get(),
        ErrorPolicy::Stop,
        parse_job,
    )?;
    let pool = WorkerPool::spawn(workers, capacity, measure_job)?;

    let assignments =
        round_robin(workers).eval_with(move || OvereagerReceiver::from_receiver(jobs));
    let submitted = drain(assignments, |assignment| pool.submit(assignment))?;
    let outcome = feed.finish()?;
    let reports = pool.finish()?;
    tracing::info!(
        lines = outcome.lines,
        submitted,
        workers = workers.get(),
        "balance input drained"
    );

    let mut out = io::stdout().lock();
    for report in &reports {
        write_json_line(&mut out, report)?;
    }
    Ok(RunOutcome::ok())
}

/// Emit every element of `stream` until its source disconnects.
fn drain<S, X, F>(stream: Result<S, Error>, mut emit: F) -> Result<u64, Error>
where
    S: Stream<X>,
    X: Clone,
    F: FnMut(X) -> Result<(), Error>,
{
    let stream = match stream {
        Ok(stream) => stream,
        Err(err) if err.is_disconnected() => return Ok(0),
        Err(err) => return Err(err),
    };
    let mut count = 0u64;
    for item in stream.iter() {
        match item {
            Ok(value) => {
                emit(value)?;
                count += 1;
            }
            Err(err) if err.is_disconnected() => break,
            Err(err) => return Err(err),
        }
    }
    Ok(count)
}

fn parse_event(line: &str) -> Result<Option<Event>, String> {
    let token = line.trim();
    if token.is_empty() || token.starts_with('#') {
        return Ok(None);
    }
    match token.to_ascii_lowercase().as_str() {
        "push" | "p" => Ok(Some(Event::Push)),
        "tick" | "t" => Ok(Some(Event::Tick)),
        _ => Err(format!("unknown event `{token}` (expected push or tick)")),
    }
}

fn parse_job(line: &str) -> Result<Option<String>, String> {
    let job = line.trim();
    if job.is_empty() {
        return Ok(None);
    }
    Ok(Some(job.to_string()))
}

fn measure_job(assignment: Assignment<String>) -> JobReport {
    let bytes = assignment.job.len();
    let words = assignment.job.split_whitespace().count();
    JobReport {
        seq: assignment.seq,
        worker: assignment.worker,
        job: assignment.job,
        bytes,
        words,
    }
}

fn write_json_line<W, T>(out: &mut W, value: &T) -> Result<(), Error>
where
    W: Write,
    T: Serialize + ?Sized,
{
    let io_error = |err: io::Error| {
        Error::new(ErrorKind::Io)
            .with_message("failed to write output")
            .with_source(err)
    };
    serde_json::to_writer(&mut *out, value).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to encode output")
            .with_source(err)
    })?;
    out.write_all(b"\n").map_err(io_error)?;
    out.flush().map_err(io_error)
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn emit_error(err: &Error) {
    if io::stderr().is_terminal() {
        eprintln!("{}", error_text(err));
        return;
    }

    let json = serde_json::to_string(&error_json(err)).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::Disconnected => "input disconnected".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error) -> String {
    let mut lines = vec![format!("error: {}", error_message(err))];
    if let Some(hint) = err.hint() {
        lines.push(format!("hint: {hint}"));
    }
    for cause in error_causes(err) {
        lines.push(format!("caused by: {cause}"));
    }
    lines.join("\n")
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}
