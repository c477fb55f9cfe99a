// mod.rs - Network analysis engine

pub mod adjacency;
pub mod analysis;
pub mod correlation;
pub mod eigengene;
pub mod hubs;
pub mod modules;
pub mod pipeline;
pub mod soft_threshold;
pub mod tom;

pub use adjacency::SignMode;
pub use correlation::CorStats;
pub use eigengene::Eigengenes;
pub use hubs::{HubConfig, HubGene, ModuleGeneSet};
pub use modules::{Dendrogram, DetectorConfig, ModuleAssignment, ModuleId};
pub use pipeline::{run_analysis, AnalysisResult, NetworkConfig};
pub use soft_threshold::{PowerFit, PowerScan};
