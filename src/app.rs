//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - wires catalog, location provider, and quote service together
//! - runs the requested command
//! - prints reports

use clap::Parser;

use crate::cli::{CatalogArgs, Command, QuoteArgs, SampleArgs, TrainArgs};
use crate::data::{generate_examples, SampleOptions};
use crate::domain::{QuoteRequest, SizeInput, DEFAULT_TARGET_COLUMN};
use crate::error::AppError;
use crate::io::dataset::{build_examples, load_rows_csv, write_examples_csv};
use crate::io::model_file::{read_model_json, write_model_json};
use crate::service::QuoteConfig;
use crate::train::TrainOptions;

pub mod pipeline;

/// Entry point for the `qc` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Quote(args) => handle_quote(args),
        Command::Train(args) => handle_train(args),
        Command::Catalog(args) => handle_catalog(args),
        Command::Sample(args) => handle_sample(args),
    }
}

fn handle_quote(args: QuoteArgs) -> Result<(), AppError> {
    let config = QuoteConfig {
        special_request_surcharge: args.surcharge,
        fixed_band_fraction: args.band,
        ..QuoteConfig::default()
    };
    let service = pipeline::build_service(args.catalog.as_deref(), args.offline, config)?;

    if let Some(path) = &args.model {
        let file = read_model_json(path)?;
        service.install_model(file.model);
    }

    let request = QuoteRequest {
        zip_code: args.zip,
        service_type: args.service,
        size: SizeInput::parse(&args.size),
        terrain_type: args.terrain,
        special_requests: args.special,
    };

    let (location, multiplier) = service.location(&request.zip_code);
    let quote = service.get_quote(&request)?;

    println!(
        "{}",
        crate::report::format_quote(&request, &location, multiplier, &quote)
    );
    Ok(())
}

fn handle_train(args: TrainArgs) -> Result<(), AppError> {
    let service =
        pipeline::build_service(args.catalog.as_deref(), true, QuoteConfig::default())?;

    let rows = load_rows_csv(&args.data)?;
    let examples = build_examples(&rows, &args.target)?;

    let opts = TrainOptions {
        holdout_fraction: args.holdout,
        split_seed: args.seed,
        ..TrainOptions::default()
    };
    let metrics = service.retrain(&examples, &opts)?;

    println!("{}", crate::report::format_fit_report(&metrics));

    if let Some(path) = &args.export_model {
        let model = service.export_model()?;
        write_model_json(path, &model, &metrics)?;
        println!("Model written to {}", path.display());
    }

    Ok(())
}

fn handle_catalog(args: CatalogArgs) -> Result<(), AppError> {
    let catalog = pipeline::load_catalog(args.catalog.as_deref())?;
    println!("{}", crate::report::format_catalog(catalog.entries()));
    Ok(())
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    let catalog = pipeline::load_catalog(args.catalog.as_deref())?;
    let examples = generate_examples(
        &catalog,
        &SampleOptions {
            count: args.count,
            seed: args.seed,
            noise_std: args.noise,
        },
    )?;
    write_examples_csv(&args.out, &examples, DEFAULT_TARGET_COLUMN)?;
    println!("Wrote {} rows to {}", examples.len(), args.out.display());
    Ok(())
}
