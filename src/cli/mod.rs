//! Command-line parsing for the quote estimator.
//!
//! The goal of this module is to keep **argument parsing** and **command
//! dispatch** separate from the pricing/training code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::DEFAULT_TARGET_COLUMN;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "qc", version, about = "Service quote estimator (rate-table and regression pricing)")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compute a quote for one request and print the estimate with its band.
    Quote(QuoteArgs),
    /// Train a pricing model from a labeled CSV and print fit metrics.
    Train(TrainArgs),
    /// Print the service catalog (valid services, sizes, terrains).
    Catalog(CatalogArgs),
    /// Generate a synthetic labeled dataset CSV for offline training demos.
    Sample(SampleArgs),
}

/// Options for computing a single quote.
#[derive(Debug, Parser, Clone)]
pub struct QuoteArgs {
    /// Zip code of the property.
    #[arg(short = 'z', long)]
    pub zip: String,

    /// Service type (must exist in the catalog).
    #[arg(short = 's', long)]
    pub service: String,

    /// Property size: a catalog category ("Medium") or square footage ("12000").
    #[arg(long)]
    pub size: String,

    /// Terrain type; unconfigured terrains fall back to a 1.0 multiplier.
    #[arg(short = 't', long, default_value = "Flat")]
    pub terrain: String,

    /// Special requests (adds the flat surcharge when non-empty).
    #[arg(long)]
    pub special: Option<String>,

    /// Catalog JSON file (defaults to the built-in catalog).
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Model JSON file to quote with (skips the rule-based fallback).
    #[arg(long)]
    pub model: Option<PathBuf>,

    /// Use the built-in location table instead of the HTTP provider.
    #[arg(long)]
    pub offline: bool,

    /// Flat surcharge for special requests.
    #[arg(long, default_value_t = 50.0)]
    pub surcharge: f64,

    /// Half-width of the fixed band for rule-based quotes (0.10 = +/-10%).
    #[arg(long, default_value_t = 0.10)]
    pub band: f64,
}

/// Options for training a model.
#[derive(Debug, Parser, Clone)]
pub struct TrainArgs {
    /// Labeled dataset CSV.
    #[arg(short = 'd', long)]
    pub data: PathBuf,

    /// Target column holding the observed price.
    #[arg(long, default_value = DEFAULT_TARGET_COLUMN)]
    pub target: String,

    /// Hold-out fraction for validation metrics (0 disables the split).
    #[arg(long, default_value_t = 0.2)]
    pub holdout: f64,

    /// Seed for the hold-out split shuffle.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Export the fitted model to a JSON file.
    #[arg(long = "export-model")]
    pub export_model: Option<PathBuf>,

    /// Catalog JSON file (defaults to the built-in catalog).
    #[arg(long)]
    pub catalog: Option<PathBuf>,
}

/// Options for printing the catalog.
#[derive(Debug, Parser, Clone)]
pub struct CatalogArgs {
    /// Catalog JSON file (defaults to the built-in catalog).
    #[arg(long)]
    pub catalog: Option<PathBuf>,
}

/// Options for generating a sample dataset.
#[derive(Debug, Parser, Clone)]
pub struct SampleArgs {
    /// Output CSV path.
    #[arg(short = 'o', long)]
    pub out: PathBuf,

    /// Number of rows to generate.
    #[arg(short = 'n', long, default_value_t = 200)]
    pub count: usize,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Std dev of the multiplicative price noise.
    #[arg(long, default_value_t = 0.08)]
    pub noise: f64,

    /// Catalog JSON file (defaults to the built-in catalog).
    #[arg(long)]
    pub catalog: Option<PathBuf>,
}
