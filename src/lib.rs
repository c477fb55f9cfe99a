// lib.rs - coexnet library root

//! # coexnet - Weighted gene co-expression network analysis
//!
//! This library builds weighted co-expression networks from variance-
//! stabilized expression matrices: Pearson correlation with Student-t
//! p-values, soft-threshold power selection against the scale-free
//! topology criterion, topological overlap, hierarchical module detection
//! with eigengene merging, and module-trait / hub gene statistics.
//!
//! ## Features
//!
//! - **Blockwise TOM**: memory-bounded topological overlap for large gene sets
//! - **Deterministic**: identical inputs and parameters give identical modules
//! - **Multiple sign modes**: signed, unsigned, signed-hybrid adjacency
//! - **Flexible filtering**: gene and sample filtering with regex and file lists
//! - **Trait statistics**: module-trait correlation, kME, gene significance
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use coexnet::prelude::*;
//!
//! let expr = ExpressionMatrix::from_file(std::path::Path::new("expression.tsv"))?;
//! let traits = TraitMatrix::from_file(std::path::Path::new("traits.tsv"))?
//!     .aligned_to(&expr.sample_ids)?;
//!
//! let config = NetworkConfig {
//!     power: Some(6.0),
//!     ..Default::default()
//! };
//! let result = run_analysis(&expr, Some(&traits), &config)?;
//! println!("{} modules detected", result.assignment.modules().len());
//! # Ok::<(), coexnet::error::CoexError>(())
//! ```

// Re-export all main modules
pub mod cli;
pub mod core;
pub mod data;
pub mod error;
pub mod output;
pub mod stats;

// Convenience prelude for common imports
pub mod prelude {
    pub use crate::cli::{validate_args, Args, ValidationResult};
    pub use crate::core::{run_analysis, AnalysisResult, NetworkConfig};
    pub use crate::core::{
        CorStats, DetectorConfig, Eigengenes, HubConfig, ModuleAssignment, ModuleId, SignMode,
    };
    pub use crate::data::{ExpressionMatrix, MatrixFilters, TraitMatrix};
    pub use crate::error::{CoexError, ConfigurationWarning, Result};
    pub use crate::output::{write_results, OutputFormat};
}

// Re-export main types at the root level for convenience
pub use core::{run_analysis, AnalysisResult, NetworkConfig, SignMode};
pub use data::{ExpressionMatrix, TraitMatrix};
pub use error::{CoexError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library information
pub fn get_info() -> String {
    format!(
        "coexnet v{} - Weighted gene co-expression network analysis",
        VERSION
    )
}
