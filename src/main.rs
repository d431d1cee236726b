use clap::Parser;
use sf_bulk::core::records::{parse_records, InputFormat};
use sf_bulk::domain::ports::Storage;
use sf_bulk::utils::error::ErrorSeverity;
use sf_bulk::utils::logger;
use sf_bulk::{
    BulkError, BulkRunner, CliConfig, JobService, LocalStorage, SalesforceClient, Settings,
    TomlConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    logger::init_cli_logger(cli.verbose);
    tracing::info!("Starting sf-bulk");

    if let Err(e) = run(&cli).await {
        tracing::error!(
            "Bulk load failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("Recovery suggestion: {}", e.recovery_suggestion());
        eprintln!("{}", e.user_friendly_message());
        eprintln!("Suggestion: {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

async fn run(cli: &CliConfig) -> Result<(), BulkError> {
    let file = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path);
            TomlConfig::from_file(path)?
        }
        None => TomlConfig::default(),
    };
    let settings = Settings::resolve(file, cli.overrides())?;
    tracing::debug!("Resolved settings: {:?}", settings);

    let format = InputFormat::from_path(&cli.input)?;
    let data = LocalStorage::new(".".to_string()).read_file(&cli.input).await?;
    let records = parse_records(&data, format)?;
    tracing::info!("Read {} records from {}", records.len(), cli.input);

    if cli.dry_run {
        let batches = records.len().div_ceil(settings.batch_size.max(1));
        println!(
            "Dry run: {} records for {:?} on {} in {} batches",
            records.len(),
            settings.job.operation,
            settings.job.object,
            batches
        );
        return Ok(());
    }

    let client = SalesforceClient::connect(settings.login.clone(), settings.http.clone()).await?;
    let service = JobService::new(client).with_poll_settings(settings.poll.clone());
    let storage = LocalStorage::new(settings.output_path.clone());
    let mut runner = BulkRunner::new(service, storage, settings.job.clone(), settings.batch_size);

    let summary = runner.run(records).await?;

    println!(
        "Job {}: {} records in {} batches, {} failed records, {} failed batches",
        summary.job_id,
        summary.records,
        summary.batches,
        summary.failed_records,
        summary.failed_batches
    );
    println!(
        "Report saved to: {}/{}",
        settings.output_path,
        summary.json_report_name()
    );

    if summary.has_errors() {
        return Err(BulkError::ProcessingError {
            message: format!(
                "{} records and {} batches failed, see {}",
                summary.failed_records,
                summary.failed_batches,
                summary.csv_report_name()
            ),
        });
    }

    Ok(())
}
