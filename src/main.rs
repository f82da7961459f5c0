//! Purpose: `fetchtree` CLI entry point and command dispatch.
//! Role: Binary crate root; parses args, runs one transfer per command, prints results.
//! Invariants: Response bodies and records go to stdout; diagnostics go to stderr.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: Every transfer goes through `api::HttpTransfer` (one blocking call per run).
use std::io::{self, IsTerminal, Write};
use std::time::Duration;

use clap::{
    CommandFactory, Parser, Subcommand, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind,
};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;

mod command_dispatch;

use fetchtree::api::{
    ChunkPrinter, DEFAULT_USER_AGENT, Error, ErrorKind, HttpTransfer, ResponseAccumulator,
    StreamSink, TransferOptions, TransferReport, VehicleRecord, to_exit_code,
};

const DEFAULT_PAGE_URL: &str = "http://ug251.eecg.utoronto.ca";
const DEFAULT_FEED_URL: &str = "http://portal.cvst.ca/api/0.1/ttc/geojson";
const SEPARATOR: &str = "====================";

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
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
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
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(clap_error_summary(&err))
                        .with_hint("Run `fetchtree --help` for usage."),
                    ColorMode::Auto,
                ));
            }
        },
    };

    init_tracing();

    let color_mode = cli.color;
    let options = transfer_options(&cli);
    command_dispatch::dispatch_command(cli.command, options)
        .map_err(add_transfer_hint)
        .map_err(|err| (err, color_mode))
}

#[derive(Parser)]
#[command(
    name = "fetchtree",
    version,
    about = "Fetch documents over HTTP and read fields out of them",
    long_about = None,
    before_help = r#"Each command is one step of the same pattern:
  - `fetch` performs a transfer and reports success or the failure code
  - `chunks` prints every chunk as the write callback receives it
  - `collect` accumulates chunks into one buffer tagged with its URL
  - `vehicles` parses the buffer as JSON and extracts vehicle positions
"#,
    after_help = r#"EXAMPLES
  $ fetchtree fetch http://example.com
  $ fetchtree fetch http://shouldnotexist.ca     # fails: couldn't resolve host (code 6)
  $ fetchtree collect --max-bytes 65536
  $ fetchtree vehicles --json

LOGGING
  Set RUST_LOG (e.g. RUST_LOG=debug) to trace chunk delivery on stderr."#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        value_name = "MS",
        help = "Abort the whole transfer after this many milliseconds"
    )]
    timeout_ms: Option<u64>,
    #[arg(
        long,
        global = true,
        default_value = DEFAULT_USER_AGENT,
        help = "User-Agent header sent with every request"
    )]
    user_agent: String,
    #[arg(
        long,
        global = true,
        help = "Treat HTTP status >= 400 as a transfer failure instead of delivering the body"
    )]
    fail_on_http_error: bool,
    #[arg(
        long,
        global = true,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics: auto|always|never"
    )]
    color: ColorMode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(
        about = "Fetch a URL, writing the body to stdout, and report the outcome",
        after_help = r#"EXAMPLES
  $ fetchtree fetch
  $ fetchtree fetch http://shouldnotexist.ca"#
    )]
    Fetch {
        #[arg(default_value = DEFAULT_PAGE_URL, value_hint = ValueHint::Url)]
        url: String,
    },
    #[command(about = "Fetch a URL and print each received chunk as it arrives")]
    Chunks {
        #[arg(default_value = DEFAULT_PAGE_URL, value_hint = ValueHint::Url)]
        url: String,
    },
    #[command(about = "Fetch a URL into one buffer and print it with its size")]
    Collect {
        #[arg(default_value = DEFAULT_FEED_URL, value_hint = ValueHint::Url)]
        url: String,
        #[arg(long, value_name = "BYTES", help = "Abort if the body grows past this size")]
        max_bytes: Option<usize>,
    },
    #[command(
        about = "Fetch a GeoJSON vehicle feed and print one line per vehicle",
        after_help = r#"Each feature must carry properties.route_name, properties.vehicle_id,
and a two-element geometry.coordinates array (longitude, latitude)."#
    )]
    Vehicles {
        #[arg(default_value = DEFAULT_FEED_URL, value_hint = ValueHint::Url)]
        url: String,
        #[arg(long, value_name = "BYTES", help = "Abort if the body grows past this size")]
        max_bytes: Option<usize>,
        #[arg(long, help = "Emit one JSON object per vehicle instead of text")]
        json: bool,
    },
    #[command(about = "Print a shell completion script")]
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn transfer_options(cli: &Cli) -> TransferOptions {
    let mut options = TransferOptions::new()
        .with_user_agent(cli.user_agent.clone())
        .with_fail_on_http_error(cli.fail_on_http_error);
    if let Some(ms) = cli.timeout_ms {
        options = options.with_timeout(Duration::from_millis(ms));
    }
    options
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn clap_error_summary(err: &clap::Error) -> String {
    let rendered = err.to_string();
    rendered
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.trim_start_matches("error: ").to_string())
        .unwrap_or_else(|| "invalid arguments".to_string())
}

fn add_transfer_hint(err: Error) -> Error {
    if err.hint().is_some() || err.kind() != ErrorKind::Transfer {
        return err;
    }
    let hint = match err.code().map(|code| code.code()) {
        Some(6) => "Check the host name; it did not resolve.",
        Some(7) => "Check that the server is running and reachable.",
        Some(22) => "Drop --fail-on-http-error to see the error body.",
        Some(23) => "The body was refused by the receiver; raise --max-bytes if set.",
        Some(28) => "Raise --timeout-ms or check the server.",
        _ => return err,
    };
    err.with_hint(hint)
}

fn io_error(context: &str, err: io::Error) -> Error {
    Error::new(ErrorKind::Io)
        .with_message(context.to_string())
        .with_source(err)
}

fn emit_outcome(report: &TransferReport) -> Result<(), Error> {
    let mut out = io::stdout().lock();
    writeln!(
        out,
        "\n\nAll good! transfer complete (status {}, {} bytes in {} chunks)",
        report.status, report.bytes, report.chunks
    )
    .map_err(|err| io_error("failed to write stdout", err))
}

fn emit_collected(acc: &ResponseAccumulator) -> Result<(), Error> {
    let mut out = io::stdout().lock();
    writeln!(
        out,
        "Received buffer for {} is {} bytes:\n{SEPARATOR}\n\n{}\n\n{SEPARATOR}\nEnd of buffer reached",
        acc.token(),
        acc.len(),
        acc.text()
    )
    .map_err(|err| io_error("failed to write stdout", err))
}

fn emit_vehicles(records: &[VehicleRecord], as_json: bool) -> Result<(), Error> {
    write_vehicles(&mut io::stdout().lock(), records, as_json)
        .map_err(|err| io_error("failed to write stdout", err))
}

fn write_vehicles(
    out: &mut impl Write,
    records: &[VehicleRecord],
    as_json: bool,
) -> io::Result<()> {
    if as_json {
        for record in records {
            let line = serde_json::to_string(record).map_err(io::Error::other)?;
            writeln!(out, "{line}")?;
        }
        return Ok(());
    }
    writeln!(out, "Current vehicle locations are as follows:\n{SEPARATOR}\n")?;
    for record in records {
        writeln!(out, "{record}")?;
    }
    writeln!(out, "\n{SEPARATOR}\nDone! ({} vehicles)", records.len())
}

fn chunk_printer() -> ChunkPrinter<io::Stdout> {
    ChunkPrinter::new(io::stdout())
}

/// Sink that streams the body straight to stdout, like an unconfigured transfer.
fn stdout_sink() -> StreamSink<io::Stdout> {
    StreamSink::new(io::stdout())
}

fn colorize_label(label: &str, use_color: bool) -> String {
    if !use_color {
        return label.to_string();
    }
    format!("\u{1b}[31m{label}\u{1b}[0m")
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    if let Some(code) = err.code() {
        return code.describe().to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::Transfer => "transfer failed".to_string(),
        ErrorKind::Parse => "invalid json".to_string(),
        ErrorKind::Schema => "unexpected document shape".to_string(),
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
    if let Some(code) = err.code() {
        inner.insert("code".to_string(), json!(code.code()));
        inner.insert("code_text".to_string(), json!(code.describe()));
    }
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(url) = err.url() {
        inner.insert("url".to_string(), json!(url));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "{} {}",
        colorize_label("error:", use_color),
        error_message(err)
    ));
    if let Some(code) = err.code() {
        lines.push(format!("  code: {code}"));
    }
    if let Some(url) = err.url() {
        lines.push(format!("  url: {url}"));
    }
    if let Some(hint) = err.hint() {
        lines.push(format!("  hint: {hint}"));
    }
    for cause in error_causes(err) {
        lines.push(format!("  caused by: {cause}"));
    }
    lines.join("\n")
}
