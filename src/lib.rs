//! # isr-expgen: Experiment Grid Generator for Instance-Weighted GP Regression
//!
//! **Version**: 0.3.0
//!
//! isr-expgen expands grids of hyperparameters into `key = value`
//! configuration files and batch scripts for an external genetic-programming
//! engine, and carries the dataset transforms the experiments depend on.
//!
//! ## Design Principles (Toyota Way Aligned)
//!
//! - **Poka-Yoke safety**: identifier collisions and unknown placeholders fail
//!   before any file is written (plan, then write)
//! - **Jidoka**: every record has exactly one batch job line
//! - **Standardized work**: identical inputs produce byte-identical outputs
//! - **Genchi Genbutsu**: neighborhood sizes resolve against the real
//!   instance and attribute counts of each dataset
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use isr_expgen::config::GridConfig;
//!
//! // Load a grid file and write every configuration plus run_all.sh
//! let generator = GridConfig::from_file("grids/isr.toml")?.into_generator()?;
//! let report = generator.generate()?;
//! println!("{} configurations", report.configs_written);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod dataset;
pub mod error;
pub mod experiment;

pub use error::{Error, ErrorKind, Result};
