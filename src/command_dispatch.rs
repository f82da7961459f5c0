//! Purpose: Hold top-level CLI command dispatch for `fetchtree`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Each command performs at most one transfer.
//! Invariants: Vehicle output is printed only after extraction fully succeeds.

use super::*;

pub(super) fn dispatch_command(
    command: Command,
    options: TransferOptions,
) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "fetchtree", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Fetch { url } => {
            let transfer = HttpTransfer::new(options);
            let mut sink = stdout_sink();
            let result = transfer.perform(&url, &mut sink);
            if let Some(err) = sink.take_error() {
                return Err(io_error("failed to write body to stdout", err));
            }
            emit_outcome(&result?)?;
            Ok(RunOutcome::ok())
        }
        Command::Chunks { url } => {
            let transfer = HttpTransfer::new(options);
            let mut printer = chunk_printer();
            let result = transfer.perform(&url, &mut printer);
            if let Some(err) = printer.take_error() {
                return Err(io_error("failed to write chunk to stdout", err));
            }
            emit_outcome(&result?)?;
            Ok(RunOutcome::ok())
        }
        Command::Collect { url, max_bytes } => {
            let transfer = HttpTransfer::new(options);
            let mut acc = ResponseAccumulator::new(url.clone());
            if let Some(max) = max_bytes {
                acc = acc.with_limit(max);
            }
            transfer.perform(&url, &mut acc)?;
            emit_collected(&acc)?;
            Ok(RunOutcome::ok())
        }
        Command::Vehicles {
            url,
            max_bytes,
            json,
        } => {
            let transfer = HttpTransfer::new(options);
            let records = fetchtree::api::fetch_vehicles(&transfer, &url, max_bytes)?;
            emit_vehicles(&records, json)?;
            Ok(RunOutcome::ok())
        }
    }
}
