//! Wiring of one contact-trash run.
//!
//! Everything that can fail here fails before the first record is touched:
//! deadline parsing, opening the output file, opening the store, assembling
//! the safety checks. Once the engine starts, only an audit write failure
//! can end the run with an error.

use std::io::{self, BufRead, Write};
use std::time::Duration;

use chrono::Local;
use colored::*;
use eyre::{Context, Result};
use log::info;

use crate::audit::AuditSink;
use crate::cancel::CancellationController;
use crate::cli::ContactTrashArgs;
use crate::config::Config;
use crate::deadline::parse_deadline;
use crate::engine::{BatchPurgeEngine, RunConfig, RunSummary};
use crate::safety::SafetyCheckChain;
use crate::store::SqliteStore;

/// Assemble the immutable run configuration from flags and config defaults.
pub fn build_run_config(args: &ContactTrashArgs, config: &Config) -> Result<RunConfig> {
    let deadline = match &args.stop_at {
        Some(expr) => Some(parse_deadline(expr, Local::now()).context("Invalid --stop-at")?),
        None => None,
    };

    Ok(RunConfig::new(args.mode.unwrap_or(config.run.mode))
        .with_max_count(args.max)
        .with_deadline(deadline)
        .with_delay(Duration::from_millis(args.delay_ms.unwrap_or(config.run.delay_ms)))
        .with_resume_after(args.resume_after))
}

/// Run the contact-trash job. Returns `None` if the operator declined.
///
/// The interrupt listener is installed only once the loop is about to start,
/// so Ctrl-C keeps its default behaviour during setup and at the prompt.
pub fn run_contact_trash(
    args: &ContactTrashArgs,
    config: &Config,
    verbose: bool,
    controller: &CancellationController,
) -> Result<Option<RunSummary>> {
    println!("{}", "Starting...".cyan());
    let run_config = build_run_config(args, config)?;
    info!("Run configuration: {:?}", run_config);

    let sink = AuditSink::open(&args.output_file, config.audit.fsync)
        .context("Can't open output file for writing")?;

    let db_path = args.database.clone().unwrap_or_else(|| config.store.path.clone());
    println!("Testing if the record store is ready...");
    let mut store = SqliteStore::open(&db_path).context(format!("Failed to open store {}", db_path.display()))?;
    store.set_verbose(verbose);

    let chain = SafetyCheckChain::from_entries(&config.checks, &store).context("Failed to assemble safety checks")?;
    if verbose {
        println!("{} {}", "Safety checks:".dimmed(), chain.names().join(", "));
    }

    let mut engine = BatchPurgeEngine::new(store, chain, sink, run_config)
        .with_stop_flag(controller.flag())
        .with_progress(Box::new(io::stderr()), config.progress.interval(), config.progress.width);

    println!("Getting contacts IDs...");
    let candidates = engine.collect_candidates().context("Failed to list candidates")?;
    let total = engine.config().effective_total(candidates.len());
    println!(
        "{} {} soft-deleted contact(s), {} to process in {} mode",
        "Found:".green(),
        candidates.len(),
        total,
        engine.config().mode
    );

    if !args.yes {
        let stdin = io::stdin();
        let question = format!("Process {} contact(s) in {} mode?", total, engine.config().mode);
        if !ask_confirmation(&mut stdin.lock(), &mut io::stdout(), &question)? {
            println!("{}", "Aborted.".yellow());
            info!("Run declined at confirmation prompt");
            return Ok(None);
        }
    }

    controller.activate().context("Failed to install interrupt handler")?;
    let result = engine.run(&candidates);
    eprintln!();
    println!("Closing output file...");
    info!("Closing output file {}", args.output_file.display());
    let summary = result.context("Run aborted")?;

    print_summary(&summary);
    Ok(Some(summary))
}

/// Ask a yes/no question until answered. End of input counts as "no".
pub fn ask_confirmation<R: BufRead, W: Write>(input: &mut R, output: &mut W, message: &str) -> io::Result<bool> {
    loop {
        write!(output, "{} [y/n] ", message)?;
        output.flush()?;

        let mut response = String::new();
        if input.read_line(&mut response)? == 0 {
            writeln!(output)?;
            return Ok(false);
        }
        match response.trim().to_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => continue,
        }
    }
}

fn print_summary(summary: &RunSummary) {
    println!("{} {}", "Finished:".green(), summary.stop);
    println!("  processed:   {}/{}", summary.processed, summary.candidates);
    println!("  deleted:     {}", summary.purged);
    println!("  rolled back: {}", summary.rolled_back);
    println!("  eligible:    {}", summary.eligible);
    println!("  rejected:    {}", summary.rejected);
    if summary.stop.is_early() {
        if let Some(last) = summary.last_id {
            println!("  {} --resume-after {}", "resume with:".yellow(), last);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RunMode;
    use std::io::Cursor;
    use std::path::PathBuf;

    fn args() -> ContactTrashArgs {
        ContactTrashArgs {
            output_file: PathBuf::from("out.txt"),
            mode: None,
            max: None,
            stop_at: None,
            delay_ms: None,
            resume_after: None,
            yes: true,
            database: None,
        }
    }

    #[test]
    fn test_confirmation_yes() {
        let mut out = Vec::new();
        assert!(ask_confirmation(&mut Cursor::new("y\n"), &mut out, "Sure?").unwrap());
        assert_eq!(String::from_utf8(out).unwrap(), "Sure? [y/n] ");
    }

    #[test]
    fn test_confirmation_repeats_until_answered() {
        let mut out = Vec::new();
        assert!(!ask_confirmation(&mut Cursor::new("maybe\n\nNO\n"), &mut out, "Sure?").unwrap());
        assert_eq!(String::from_utf8(out).unwrap().matches("[y/n]").count(), 3);
    }

    #[test]
    fn test_confirmation_eof_is_no() {
        let mut out = Vec::new();
        assert!(!ask_confirmation(&mut Cursor::new(""), &mut out, "Sure?").unwrap());
    }

    #[test]
    fn test_build_run_config_defaults_from_config() {
        let mut config = Config::default();
        config.run.mode = RunMode::Rollback;
        config.run.delay_ms = 40;

        let run = build_run_config(&args(), &config).unwrap();
        assert_eq!(run.mode, RunMode::Rollback);
        assert_eq!(run.delay, Duration::from_millis(40));
        assert!(run.deadline.is_none());
        assert!(run.max_count.is_none());
    }

    #[test]
    fn test_build_run_config_flags_win() {
        let mut config = Config::default();
        config.run.delay_ms = 40;
        let mut args = args();
        args.mode = Some(RunMode::Run);
        args.delay_ms = Some(0);
        args.max = Some(3);
        args.resume_after = Some(99);
        args.stop_at = Some("+1h".to_string());

        let run = build_run_config(&args, &config).unwrap();
        assert_eq!(run.mode, RunMode::Run);
        assert_eq!(run.delay, Duration::ZERO);
        assert_eq!(run.max_count, Some(3));
        assert_eq!(run.resume_after, Some(99));
        assert!(run.deadline.unwrap() > Local::now());
    }

    #[test]
    fn test_setup_failure_leaves_interrupts_alone() {
        let temp = tempfile::TempDir::new().unwrap();
        let mut args = args();
        args.output_file = temp.path().join("out.txt");
        args.database = Some(temp.path().join("missing.db"));

        let controller = CancellationController::new();
        let result = run_contact_trash(&args, &Config::default(), false, &controller);
        assert!(result.is_err());
        assert!(!controller.is_active());
    }

    #[tokio::test]
    async fn test_listener_installed_only_for_the_loop() {
        let temp = tempfile::TempDir::new().unwrap();
        let db = temp.path().join("crm.db");
        SqliteStore::create(&db).unwrap();
        let mut args = args();
        args.output_file = temp.path().join("out.txt");
        args.database = Some(db);

        let controller = CancellationController::new();
        let summary = run_contact_trash(&args, &Config::default(), false, &controller)
            .unwrap()
            .unwrap();
        assert_eq!(summary.processed, 0);
        assert!(controller.is_active());
    }

    #[test]
    fn test_build_run_config_bad_deadline() {
        let mut args = args();
        args.stop_at = Some("whenever".to_string());
        assert!(build_run_config(&args, &Config::default()).is_err());
    }
}
