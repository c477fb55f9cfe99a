// config.rs - Configuration file support

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{CoexError, Result};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    // Input/Output
    pub expression: Option<String>,
    pub traits: Option<String>,
    pub output_dir: Option<String>,
    pub analysis_id: Option<String>,
    pub format: Option<String>,

    // Network construction
    pub power: Option<f64>,
    pub powers: Option<String>,
    pub target_fit: Option<f64>,
    pub sign: Option<String>,
    pub block_size: Option<usize>,

    // Module detection
    pub min_module_size: Option<usize>,
    pub cut_height_fraction: Option<f64>,
    pub merge_cut_height: Option<f64>,

    // Trait and hub statistics
    pub trait_column: Option<String>,
    pub hub_modules: Option<String>,
    pub module_pvalue: Option<f64>,
    pub kme_threshold: Option<f64>,
    pub kme_pvalue: Option<f64>,

    // Performance
    pub threads: Option<usize>,

    // Gene/Sample filtering
    pub include_genes: Option<String>,
    pub exclude_genes: Option<String>,
    pub include_samples: Option<String>,
    pub exclude_samples: Option<String>,
    pub include_genes_list: Option<String>,
    pub exclude_genes_list: Option<String>,
    pub include_samples_list: Option<String>,
    pub exclude_samples_list: Option<String>,

    // Flags
    pub scan_only: Option<bool>,
    pub dry_run: Option<bool>,
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| CoexError::io(path.display().to_string(), e))?;

        let config: Config = toml::from_str(&content).map_err(|e| {
            CoexError::Config(format!(
                "failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        println!("📄 Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| CoexError::Config(format!("failed to serialize config: {}", e)))?;

        fs::write(path, content).map_err(|e| CoexError::io(path.display().to_string(), e))?;

        println!("📄 Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Generate a sample configuration file with comments
    pub fn generate_sample() -> String {
        r#"# coexnet.toml - Configuration file for coexnet
# Command line arguments will override these settings

# =============================================================================
# INPUT/OUTPUT
# =============================================================================

# Path to expression matrix (.tsv or .csv; samples x genes)
expression = "/path/to/expression.tsv"

# Path to sample trait table (.tsv or .csv; samples x traits)
traits = "/path/to/traits.tsv"

# Output directory for result tables
output_dir = "results"

# Analysis identifier used as output file prefix
analysis_id = "coexnet"

# Output format: tsv, csv
format = "tsv"

# =============================================================================
# NETWORK CONSTRUCTION
# =============================================================================

# Soft-threshold power (omit to run the power scan and pick automatically)
# power = 6.0

# Comma-separated candidate powers for the scan
# powers = "1,2,3,4,5,6,7,8,9,10,12,14,16,18,20"

# Target scale-free fit R^2 for automatic power selection
target_fit = 0.8

# Adjacency sign mode: signed, unsigned, signed-hybrid
sign = "signed"

# TOM block size in genes (trades memory for speed)
block_size = 2500

# =============================================================================
# MODULE DETECTION
# =============================================================================

# Minimum number of genes for a module
min_module_size = 30

# Branch cut height as a fraction of the tallest dendrogram merge
cut_height_fraction = 0.99

# Eigengene dissimilarity below which modules are merged
merge_cut_height = 0.25

# =============================================================================
# TRAIT AND HUB STATISTICS
# =============================================================================

# Trait column for gene significance (omit for the first trait column)
# trait_column = "disease_status"

# Comma-separated module labels (colors or numbers) for hub extraction
# hub_modules = "turquoise,blue"

# Module-trait p-value cutoff for automatic module-of-interest selection
module_pvalue = 0.05

# Minimum |kME| for hub genes
kme_threshold = 0.7

# Maximum kME p-value for hub genes
kme_pvalue = 0.05

# =============================================================================
# PERFORMANCE
# =============================================================================

# Number of threads (omit for auto-detection)
# threads = 16

# =============================================================================
# GENE/SAMPLE FILTERING
# =============================================================================

# Include only genes matching regex pattern
# include_genes = "^ENSG.*"

# Exclude genes matching regex pattern
# exclude_genes = "^LINC.*"

# Include only samples matching regex pattern
# include_samples = "case.*"

# Exclude samples matching regex pattern
# exclude_samples = "outlier.*"

# Include only genes listed in a file (one gene per line)
# include_genes_list = "genes_of_interest.txt"

# Exclude genes listed in a file (one gene per line)
# exclude_genes_list = "blacklist.txt"

# Include only samples listed in a file (one sample per line)
# include_samples_list = "samples.txt"

# Exclude samples listed in a file (one sample per line)
# exclude_samples_list = "exclude.txt"

# =============================================================================
# FLAGS
# =============================================================================

# Run the soft-threshold power scan only, then exit
scan_only = false

# Validate inputs without computation (dry run)
dry_run = false
"#
        .to_string()
    }
}
