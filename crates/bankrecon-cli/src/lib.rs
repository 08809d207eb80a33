mod config;
mod show;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use bankrecon::{DateRange, ReconcileResult, ingest, report};
use chrono::NaiveDate;
use clap::{CommandFactory as _, Parser};

use config::{BankSource, Config, ConfigBank};

#[derive(Parser, Debug)]
#[command(
    name = "bankrecon",
    about = "Reconcile system transactions with bank statements"
)]
#[command(disable_help_subcommand = true)]
struct Args {
    /// Path to the system transactions CSV file
    #[arg(short, long)]
    system: Option<PathBuf>,

    /// Directory containing bank statement CSV files, or comma separated paths to them
    #[arg(short, long)]
    bank: Option<String>,

    /// First day to reconcile, in YYYY-MM-DD format
    #[arg(short = 't', long, value_parser = parse_date)]
    start: NaiveDate,

    /// Last day to reconcile (inclusive), in YYYY-MM-DD format
    #[arg(short, long, value_parser = parse_date)]
    end: NaiveDate,

    /// Path to write the JSON report to
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the result to the console
    #[arg(short, long)]
    print: bool,

    /// Config file to read defaults from. Defaults to ./bankrecon.toml if present.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{value}', use YYYY-MM-DD"))
}

/// A fully resolved reconciliation run.
#[derive(Debug)]
struct Invocation {
    system: PathBuf,
    bank_files: Vec<PathBuf>,
    date_range: DateRange,
    output: Option<PathBuf>,
    print: bool,
}

impl Invocation {
    /// Merge the command line with the config file; flags win.
    fn resolve(args: Args, config: Config) -> Result<Self> {
        let date_range = DateRange::new(args.start, args.end)?;

        let system = args
            .system
            .or(config.system)
            .context("system transaction file path is required")?;

        let bank_files: Vec<PathBuf> = match (args.bank, config.bank) {
            (Some(spec), _) => ingest::resolve_bank_sources(&spec),
            (None, Some(ConfigBank(BankSource::Directory(dir)))) => {
                ingest::bank_files_in_dir(&dir)
            }
            (None, Some(ConfigBank(BankSource::Files(files)))) => {
                ingest::existing_bank_files(files)
            }
            (None, None) => bail!("at least one bank statement file path is required"),
        }
        .context("failed to process bank files")?;

        Ok(Invocation {
            system,
            bank_files,
            date_range,
            output: args.output.or(config.output),
            print: args.print,
        })
    }
}

async fn execute(invocation: &Invocation) -> Result<ReconcileResult> {
    let range = Some(invocation.date_range);

    let started = Instant::now();
    let system = ingest::load_system_transactions(&invocation.system, range)?;
    let bank = ingest::load_bank_records(&invocation.bank_files, range).await?;
    tracing::info!(
        system = system.len(),
        bank = bank.len(),
        sources = invocation.bank_files.len(),
        elapsed = ?started.elapsed(),
        "read CSV files"
    );

    let started = Instant::now();
    let result = bankrecon::reconcile(&system, &bank);
    tracing::info!(elapsed = ?started.elapsed(), "reconciled");

    let started = Instant::now();
    if invocation.print {
        show::print_result(&result);
    }
    if let Some(output) = &invocation.output {
        report::write_json(&result, output)?;
    }
    tracing::info!(elapsed = ?started.elapsed(), "generated result");

    Ok(result)
}

pub async fn run(args: impl IntoIterator<Item = String>) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bankrecon=info,bankrecon_cli=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    clap_complete::CompleteEnv::with_factory(Args::command).complete();

    let args = Args::parse_from(args);
    let config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::find_and_load()?.unwrap_or_default(),
    };

    let started = Instant::now();
    let invocation = Invocation::resolve(args, config)?;
    execute(&invocation).await?;
    tracing::info!(elapsed = ?started.elapsed(), "total execution time");

    Ok(())
}
