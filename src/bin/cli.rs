use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use rips::export::{format_currency, write_validation_summary};
use rips::prelude::*;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ripscli")]
#[command(about = "RIPS Data CLI - Validate, summarize, and cross-reference RIPS healthcare billing files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate declared vs actual record counts per file
    Validate(ValidateArgs),
    /// Show consolidated provider billing summaries
    Providers(ProvidersArgs),
    /// Cross-reference a CUPS dictionary and export the report
    Report(ReportArgs),
    /// List unique users found in the US segments
    Users(UsersArgs),
    /// Show summary statistics for a data directory
    Stats(StatsArgs),
}

#[derive(Args)]
struct ValidateArgs {
    /// RIPS files to validate, processed in the given order
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[derive(Args)]
struct ProvidersArgs {
    /// RIPS files to aggregate, processed in the given order
    #[arg(required = true)]
    files: Vec<PathBuf>,
    /// Contracts table for enrichment (joined by contract number)
    #[arg(long)]
    contracts: Option<PathBuf>,
    /// Coverage table for enrichment (joined by tax ID)
    #[arg(long)]
    coverage: Option<PathBuf>,
}

#[derive(Args)]
struct ReportArgs {
    /// RIPS files to cross-reference, processed in the given order
    #[arg(required = true)]
    files: Vec<PathBuf>,
    /// CUPS dictionary table
    #[arg(long)]
    cups: PathBuf,
    /// Contracts table for enrichment (joined by contract number)
    #[arg(long)]
    contracts: Option<PathBuf>,
    /// Coverage table for enrichment (joined by tax ID)
    #[arg(long)]
    coverage: Option<PathBuf>,
    /// Output file path
    #[arg(short, long)]
    output: PathBuf,
    /// Export format
    #[arg(long, value_enum, default_value_t = ExportFormatOpt::Csv)]
    format: ExportFormatOpt,
}

#[derive(Args)]
struct UsersArgs {
    /// RIPS files to scan for US segments
    #[arg(required = true)]
    files: Vec<PathBuf>,
    /// Limit number of listed users
    #[arg(long, default_value_t = 50)]
    limit: usize,
}

#[derive(Args)]
struct StatsArgs {
    /// Directory containing RIPS data files
    #[arg(short, long)]
    data_dir: PathBuf,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum ExportFormatOpt {
    Json,
    Csv,
}

fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Validate(args) => cmd_validate(args),
        Commands::Providers(args) => cmd_providers(args),
        Commands::Report(args) => cmd_report(args),
        Commands::Users(args) => cmd_users(args),
        Commands::Stats(args) => cmd_stats(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn build_dataset(
    files: Vec<PathBuf>,
    contracts: Option<PathBuf>,
    coverage: Option<PathBuf>,
    cups: Option<PathBuf>,
) -> anyhow::Result<RipsDataset> {
    let mut builder = RipsDatasetBuilder::new().rips_files(files);
    if let Some(path) = contracts {
        builder = builder.contracts_table(path);
    }
    if let Some(path) = coverage {
        builder = builder.coverage_table(path);
    }
    if let Some(path) = cups {
        builder = builder.cups_dictionary(path);
    }
    builder.build().context("failed to load dataset")
}

fn cmd_validate(args: ValidateArgs) -> anyhow::Result<()> {
    let dataset = build_dataset(args.files, None, None, None)?;

    let mut stdout = std::io::stdout();
    write_validation_summary(&mut stdout, &dataset.validations)?;

    let failed = dataset
        .validations
        .iter()
        .filter(|v| !v.passed())
        .count();
    if failed > 0 {
        println!("\n{} of {} files failed validation", failed, dataset.len());
        std::process::exit(2);
    }
    println!("\nAll {} files passed validation", dataset.len());
    Ok(())
}

fn cmd_providers(args: ProvidersArgs) -> anyhow::Result<()> {
    let dataset = build_dataset(args.files, args.contracts, args.coverage, None)?;

    let mut total = 0.0;
    for provider in dataset.providers.values() {
        println!("{}", provider.provider_name);
        println!("  NI: {}", provider.tax_id);
        println!("  Contrato: {}", provider.contract);
        println!("  Tipo de servicio: {}", provider.service_type);
        println!("  Regimen: {}", provider.regimen);
        if let (Some(dep), Some(mun)) = (&provider.department, &provider.municipality) {
            println!("  Ubicacion: {} / {}", dep, mun);
        }
        if let Some(population) = provider.population {
            println!("  Poblacion: {}", population);
        }
        for detail in &provider.details {
            println!(
                "    {} -> {} ({})",
                detail.period_label(),
                format_currency(detail.value),
                detail.source_file
            );
        }
        println!("  Valor LMA Total: {}", format_currency(provider.total_value));
        total += provider.total_value;
    }
    println!("\nTOTAL GENERAL: {}", format_currency(total));
    Ok(())
}

fn cmd_report(args: ReportArgs) -> anyhow::Result<()> {
    let dataset = build_dataset(args.files, args.contracts, args.coverage, Some(args.cups))?;

    let format = match args.format {
        ExportFormatOpt::Json => ExportFormat::Json,
        ExportFormatOpt::Csv => ExportFormat::Csv,
    };
    dataset
        .export(&args.output, format)
        .context("export failed")?;

    let report = dataset.coincidence_report()?;
    let matched = report.records.iter().filter(|r| r.total > 0).count();
    println!(
        "Cross-referenced {} codes ({} with matches) over {} unique patients",
        report.records.len(),
        matched,
        report.total_population
    );
    println!("Exported to {}", args.output.display());
    Ok(())
}

fn cmd_users(args: UsersArgs) -> anyhow::Result<()> {
    let dataset = build_dataset(args.files, None, None, None)?;

    let users = dataset.unique_users();
    for user in users.values().take(args.limit) {
        println!(
            "{} {} | {} | {} | {} | {}/{}",
            user.document_type,
            user.document_number,
            user.full_name(),
            user.formatted_age(),
            user.sex,
            user.department,
            user.municipality
        );
    }
    println!("Total unique users: {}", users.len());
    Ok(())
}

fn cmd_stats(args: StatsArgs) -> anyhow::Result<()> {
    let dataset = RipsDataset::load_standard(&args.data_dir).context("failed to load dataset")?;
    dataset.statistics().print_summary();
    Ok(())
}
