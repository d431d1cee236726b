use clap::Parser;

use crate::config::settings::Overrides;
use crate::domain::model::Operation;

#[derive(Debug, Clone, Parser)]
#[command(name = "sf-bulk")]
#[command(about = "Load records into Salesforce through the Bulk API")]
pub struct CliConfig {
    /// Records to submit (.json array or .csv with a header row)
    #[arg(short, long)]
    pub input: String,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// sObject name, e.g. Account
    #[arg(long)]
    pub object: Option<String>,

    /// insert, update, upsert, delete or hardDelete
    #[arg(long)]
    pub operation: Option<Operation>,

    #[arg(long)]
    pub external_id_field: Option<String>,

    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Directory for the error report
    #[arg(long)]
    pub output_path: Option<String>,

    /// Stop waiting for batches after this many seconds
    #[arg(long)]
    pub max_wait_seconds: Option<u64>,

    /// Parse and validate input without calling Salesforce
    #[arg(long)]
    pub dry_run: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            object: self.object.clone(),
            operation: self.operation,
            external_id_field: self.external_id_field.clone(),
            batch_size: self.batch_size,
            output_path: self.output_path.clone(),
            max_wait_seconds: self.max_wait_seconds,
        }
    }
}
