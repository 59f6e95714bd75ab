use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use ::config::{Config, File};
use rdclaim_engine::{normalize_rows, ClaimWorkspace, ColumnMapping};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared_types::{Claim, ClaimParameters, Percentage, Scheme};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::prelude::*;

mod config;
mod input;
mod output;

use input::InputArg;
use output::{OutputFormat, ReportKind};

#[derive(Parser, Debug)]
#[command(name = "rdclaim", author, version, about = "Calculate qualifying R&D expenditure from mapped cost exports")]
struct Cli {
    /// Engine config (defaults to ~/.config/rdclaim/engine.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    log_file_path: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check a column mapping file without processing any data
    ValidateMapping {
        #[arg(long, value_name = "FILE")]
        mapping: PathBuf,
    },

    /// Normalize cost exports, evaluate every line and report the claim
    Calculate {
        #[arg(long, value_name = "FILE")]
        mapping: PathBuf,

        /// Claim parameters (TOML)
        #[arg(long, value_name = "FILE")]
        claim: PathBuf,

        /// Cost export for one category, e.g. staff=payroll.csv
        #[arg(long = "input", value_name = "CATEGORY=CSV", value_parser = input::parse_input_arg, required = true)]
        inputs: Vec<InputArg>,

        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,

        #[arg(long, value_enum, default_value = "summary")]
        report: ReportKind,

        /// Write the report here instead of stdout
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Fail when any row is rejected instead of skipping it
        #[arg(long)]
        strict: bool,
    },
}

/// Claim parameter file
///
/// ```toml
/// name = "FY24"
/// company = "Acme Robotics Ltd"
/// accounting_period_start = "2024-01-01"
/// accounting_period_end = "2024-12-31"
/// scheme = "sme"
/// default_rd_percentage = 80
/// claim_grant = "0"
/// # paye_nic_liability = "15000"
/// ```
#[derive(Debug, Deserialize, Clone)]
struct ClaimFile {
    name: String,
    company: String,
    accounting_period_start: NaiveDate,
    accounting_period_end: NaiveDate,
    scheme: Scheme,
    default_rd_percentage: Option<Percentage>,
    claim_grant: Option<Decimal>,
    paye_nic_liability: Option<Decimal>,
}

impl ClaimFile {
    fn into_claim(self) -> Result<Claim> {
        if self.accounting_period_end < self.accounting_period_start {
            bail!(
                "Accounting period ends ({}) before it starts ({})",
                self.accounting_period_end,
                self.accounting_period_start
            );
        }

        let parameters = ClaimParameters {
            default_rd_percentage: self.default_rd_percentage.unwrap_or_default(),
            scheme: self.scheme,
            claim_grant: self.claim_grant.unwrap_or(Decimal::ZERO),
            paye_nic_liability: self.paye_nic_liability,
        };

        Ok(Claim::new(
            self.name,
            self.company,
            self.accounting_period_start,
            self.accounting_period_end,
            parameters,
        ))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (engine_config, config_path) = config::EngineConfig::load(cli.config.as_deref())
        .context("Failed to load engine config")?;
    init_tracing(
        engine_config.log_level(),
        cli.log_file_path.as_deref().or(engine_config.log_file()),
    );
    tracing::debug!("Loaded engine config from {:?}", config_path);

    match cli.command {
        Command::ValidateMapping { mapping } => {
            let column_mapping = load_mapping(&mapping)?;
            for category in column_mapping.categories() {
                let category_mapping = column_mapping.for_category(category)?;
                println!("{}:", category);
                for (field, column) in category_mapping.fields() {
                    println!("  {:<18} <- {}", field.as_str(), column);
                }
            }
            println!("Mapping {} is valid", mapping.display());
        }
        Command::Calculate {
            mapping,
            claim,
            inputs,
            format,
            report,
            output,
            strict,
        } => {
            let (workspace, rejected) =
                build_workspace(&engine_config, &mapping, &claim, &inputs)?;

            if strict && rejected > 0 {
                bail!("{} rows were rejected", rejected);
            }

            match output {
                Some(path) => {
                    let file = std::fs::File::create(&path)
                        .with_context(|| format!("Failed to create {}", path.display()))?;
                    output::write_report(&workspace, report, format, file)?;
                    tracing::info!("Report written to {}", path.display());
                }
                None => output::write_report(&workspace, report, format, std::io::stdout().lock())?,
            }
        }
    }

    Ok(())
}

fn init_tracing(level: Option<&str>, log_file_path: Option<&str>) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(level.unwrap_or("info"))
    });

    if let Some(log_path) = log_file_path {
        let log_path = Path::new(log_path);
        let file_appender = tracing_appender::rolling::never(
            log_path.parent().unwrap_or(Path::new(".")),
            log_path
                .file_name()
                .unwrap_or(std::ffi::OsStr::new("rdclaim.log")),
        );
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        std::mem::forget(guard);

        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(non_blocking),
            )
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .try_init();
    }
}

/// Normalize every input into a fresh claim workspace. Returns the workspace
/// and the number of rejected rows.
fn build_workspace(
    engine_config: &config::EngineConfig,
    mapping: &Path,
    claim: &Path,
    inputs: &[InputArg],
) -> Result<(ClaimWorkspace, usize)> {
    let rules = engine_config.rule_set()?;
    let column_mapping = load_mapping(mapping)?;
    let claim = load_claim(claim)?;

    let mut workspace =
        ClaimWorkspace::new(claim, Arc::new(rules)).context("Failed to open claim")?;

    let mut rejected = 0;
    for input in inputs {
        let category_mapping = column_mapping
            .for_category(input.category)
            .with_context(|| format!("Cannot read {}", input.path.display()))?;
        let rows = input::read_records(&input.path)?;
        let outcome = normalize_rows(
            rows.records.iter().map(|(row, record)| (*row, record)),
            category_mapping,
        );

        let mut rejections = rows.unreadable;
        rejections.extend(outcome.rejections);
        rejections.sort_by_key(|rejection| rejection.row);

        for rejection in &rejections {
            eprintln!(
                "{} row {}: {}",
                input.path.display(),
                rejection.row,
                rejection.error
            );
        }
        rejected += rejections.len();

        workspace
            .add_line_items(outcome.items)
            .with_context(|| format!("Failed to add lines from {}", input.path.display()))?;
    }

    Ok((workspace, rejected))
}

fn load_mapping(path: &Path) -> Result<ColumnMapping> {
    let yaml = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read mapping {}", path.display()))?;
    ColumnMapping::from_yaml_str(&yaml)
        .with_context(|| format!("Invalid mapping {}", path.display()))
}

fn load_claim(path: &Path) -> Result<Claim> {
    let builder = Config::builder()
        .add_source(File::from(path.to_path_buf()))
        .build()
        .with_context(|| format!("Failed to read claim file {}", path.display()))?;

    let claim_file: ClaimFile = builder
        .try_deserialize()
        .with_context(|| format!("Invalid claim file {}", path.display()))?;
    claim_file.into_claim()
}
