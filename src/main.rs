use clap::Parser;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use datablend::cli::{self, Input};
use datablend::error_display::user_message_from_combine;
use datablend::{
    export_dataset, AppConfig, Args, Combined, ConfigManager, ExportFormat, LocalTransfer,
    Session, TransferService, APP_NAME,
};

fn init_logging(config: &AppConfig, debug: bool) {
    let directive = match &config.debug.log_filter {
        Some(filter) => filter.clone(),
        None if debug || config.debug.enabled => format!("{}=debug", APP_NAME),
        None => "warn".to_string(),
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn handle_early_exit_flags(args: &Args) -> Result<Option<()>> {
    if args.generate_config {
        let manager = ConfigManager::new(APP_NAME)?;
        let path = manager.write_default_config(args.force)?;
        println!("Configuration written to {}", path.display());
        return Ok(Some(()));
    }
    Ok(None)
}

/// Load every input into the session. Failures are reported and skipped.
fn load_inputs(args: &Args, config: &AppConfig, session: &mut Session, store: &LocalTransfer) {
    let options = cli::read_options_from_args(args, config.read_options());
    for raw in &args.inputs {
        let input = Input::parse(raw);
        let loaded = match &input {
            Input::Path(path) => session.ingest_path(path, args.format, &options),
            Input::Token(token) => session.ingest_token(store, token),
        };
        if let Err(e) = loaded {
            eprintln!("Skipping {}: {}", input.label(), e);
        }
    }
}

fn print_summaries(session: &Session) {
    for (slot, summary) in session.summaries().iter().enumerate() {
        println!(
            "[{}] {}: {} rows x {} columns, {} missing",
            slot + 1,
            summary.name,
            summary.rows,
            summary.columns,
            summary.missing
        );
    }
    for dataset in session.datasets() {
        let numeric = dataset.numeric_columns();
        if !numeric.is_empty() {
            println!("{} numeric columns: {}", dataset.name(), numeric.join(", "));
        }
    }
}

fn print_result(combined: &Combined, args: &Args, config: &AppConfig) {
    let provenance = &combined.provenance;
    println!(
        "{} of {}",
        provenance.operation.as_str(),
        provenance.inputs.join(", ")
    );
    for step in &provenance.steps {
        println!(
            "  step {}: {:?} = {:?} -> {} rows x {} columns",
            step.position, step.left_keys, step.right_keys, step.rows, step.columns
        );
        if args.debug || config.debug.enabled {
            println!("{}", step.preview.head(Some(config.display.step_preview_rows)));
        }
    }
    if let Some(warning) = &combined.warning {
        eprintln!("Warning: {}", warning);
    }
    let preview_rows = args.preview_rows.unwrap_or(config.display.preview_rows);
    println!("{}", combined.dataset.head(preview_rows));
}

fn write_outputs(
    combined: &Combined,
    args: &Args,
    config: &AppConfig,
    store: &LocalTransfer,
) -> Result<()> {
    if let Some(path) = &args.output {
        let format = match args.export_format {
            Some(f) => ExportFormat::from(f),
            None => ExportFormat::from_path(path).ok_or_else(|| {
                eyre!(
                    "Cannot infer export format from {}; use --export-format",
                    path.display()
                )
            })?,
        };
        let mut options = config.export_options();
        options.compression = args.compression;
        export_dataset(&combined.dataset, path, format, &options)?;
        println!("Wrote {}", path.display());
    }
    if args.publish {
        let source_app = args
            .source_app
            .clone()
            .unwrap_or_else(|| config.transfer.source_app.clone());
        let filename = args
            .output
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{}.parquet", combined.dataset.name()));
        let token = store.publish(&combined.dataset, &source_app, &filename)?;
        println!("Published token: {}", token);
    }
    Ok(())
}

fn run(args: &Args, config: &AppConfig) -> Result<()> {
    let operation = cli::operation_from_args(args)?;
    let store = LocalTransfer::new(config.transfer.store_dir()?);
    let mut session = Session::new(config.limits());
    load_inputs(args, config, &mut session, &store);

    let Some(operation) = operation else {
        print_summaries(&session);
        return Ok(());
    };
    if session.datasets().is_empty() {
        return Err(eyre!("No inputs could be loaded"));
    }

    debug!(operation = operation.kind().as_str(), inputs = session.datasets().len(), "running");
    let combined = session
        .run(&operation)
        .map_err(|e| eyre!(user_message_from_combine(&e)))?;
    print_result(combined, args, config);
    write_outputs(combined, args, config, &store)
}

fn main() -> Result<()> {
    let args = Args::parse();
    color_eyre::install()?;

    if let Some(()) = handle_early_exit_flags(&args)? {
        return Ok(());
    }

    let config = AppConfig::load(APP_NAME)?;
    init_logging(&config, args.debug);

    if let Err(e) = run(&args, &config) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}
