//! One-shot consistency check over a document collection.
//!
//! Prints duplicate key values and documents missing required fields to
//! stdout. Exits non-zero when the store cannot be opened or queried.

use clap::Parser;
use dbview_core::{
    default_log_level, init_logging, load_dotenv, run_consistency_check, CheckPlan,
    DocumentBackend, DocumentStoreLocation, DotenvStatus,
};
use log::error;
use std::error::Error;
use std::io::{self, Write};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "dbview-check", version, about = "Report duplicate and incomplete documents")]
struct Args {
    /// Document store location (`mongodb://...`, `sqlite://<path>`,
    /// `sqlite::memory:` or a path).
    #[arg(long, env = "DOCSTORE_URI")]
    docstore_uri: DocumentStoreLocation,

    /// MongoDB database holding the collection.
    #[arg(long, env = "DOCSTORE_DB", default_value = "Node")]
    docstore_db: String,

    /// Collection to scan.
    #[arg(long, default_value = "events")]
    collection: String,

    /// Field whose values must be unique.
    #[arg(long, default_value = "title")]
    key_field: String,

    /// Comma-separated fields every document must carry.
    #[arg(long, value_delimiter = ',')]
    required: Option<Vec<String>>,

    /// Log level for diagnostics on stderr.
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,
}

impl Args {
    fn plan(&self) -> CheckPlan {
        let defaults = CheckPlan::default();
        CheckPlan {
            collection: self.collection.clone(),
            key_field: self.key_field.clone(),
            required_fields: self
                .required
                .as_ref()
                .map(|fields| {
                    fields
                        .iter()
                        .map(|field| field.trim().to_string())
                        .filter(|field| !field.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.required_fields),
        }
    }
}

fn main() -> ExitCode {
    let dotenv = load_dotenv();
    let args = Args::parse();
    match run(&args, &dotenv) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=check_exit module=cli status=error error={err}");
            eprintln!("dbview-check: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args, dotenv: &DotenvStatus) -> Result<(), Box<dyn Error>> {
    let level = args.log_level.as_deref().unwrap_or(default_log_level());
    init_logging(level, None)?;
    dotenv.log();

    let store = DocumentBackend::open(&args.docstore_uri, &args.docstore_db)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_consistency_check(&store, &args.plan(), &mut out)?;
    out.flush()?;
    Ok(())
}
