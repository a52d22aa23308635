//! Experiment Configuration Generator
//!
//! Combinatorially expands parameter axes into `key = value` configuration
//! files and batch scripts for an external engine invoked as
//! `<engine> -p <config-file>`.
//!
//! ## Data Model
//!
//! ```text
//! Axis (N) ──► Combination ──► Identifier ──► ConfigRecord ──► job line
//!                  │                              ▲
//!                  └─ ExclusionRule (skip)        └─ baseline + derived keys
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use isr_expgen::experiment::{Axis, Generator, JobSpec};
//!
//! let generator = Generator::builder("out")
//!     .axis(Axis::new("dataset", ["A", "B"]))
//!     .axis(Axis::new("scheme", ["pro", "sur"]))
//!     .derive("experiment.data", "{dataset}")
//!     .job(JobSpec::new("java -jar ISR.jar"))
//!     .build()?;
//!
//! // A-pro.txt, A-sur.txt, B-pro.txt, B-sur.txt and run_all.sh
//! let report = generator.generate()?;
//! assert_eq!(report.configs_written, 4);
//! # Ok::<(), isr_expgen::Error>(())
//! ```

mod axis;
mod batch;
mod exclusion;
mod generator;
mod neighborhood;
mod record;
mod template;

pub use axis::{Axis, AxisValue, CartesianProduct, Combination};
pub use batch::{
    BatchScript, JobSpec, JobSpecConfig, DEFAULT_LOG_DIR, DEFAULT_SCRIPT_MODE, DEFAULT_SHEBANG,
};
pub use exclusion::{Condition, ExclusionRule, ExclusionSpec};
pub use generator::{
    GenerationReport, Generator, GeneratorBuilder, GroupPlan, Inheritance, Plan,
    PlannedExperiment,
};
pub use neighborhood::{NeighborhoodBinding, NeighborhoodSize};
pub use record::{resolve_config_file, ConfigRecord, ASSIGNMENT, PARENT_KEY};
pub use template::{Template, Vars};
