// merge.rs - Merge configuration file with CLI arguments

use crate::cli::{Args, Config};
use crate::error::Result;

impl Args {
    /// Merge with configuration from file
    /// CLI arguments take precedence over config file values
    pub fn merge_with_config(mut self, config: Config) -> Self {
        // Input/Output
        if self.expression.is_none() {
            self.expression = config.expression;
        }
        if self.traits.is_none() {
            self.traits = config.traits;
        }
        if self.output_dir.is_none() {
            self.output_dir = config.output_dir;
        }
        if self.analysis_id.is_none() {
            self.analysis_id = config.analysis_id;
        }
        if self.format == "tsv" && config.format.is_some() {
            self.format = config.format.unwrap();
        }

        // Network construction (only override defaults, not explicit CLI values)
        if self.power.is_none() {
            self.power = config.power;
        }
        if self.powers.is_none() {
            self.powers = config.powers;
        }
        if self.target_fit == 0.8 && config.target_fit.is_some() {
            self.target_fit = config.target_fit.unwrap();
        }
        if self.sign == "signed" && config.sign.is_some() {
            self.sign = config.sign.unwrap();
        }
        if self.block_size == 2500 && config.block_size.is_some() {
            self.block_size = config.block_size.unwrap();
        }

        // Module detection
        if self.min_module_size == 30 && config.min_module_size.is_some() {
            self.min_module_size = config.min_module_size.unwrap();
        }
        if self.cut_height_fraction == 0.99 && config.cut_height_fraction.is_some() {
            self.cut_height_fraction = config.cut_height_fraction.unwrap();
        }
        if self.merge_cut_height == 0.25 && config.merge_cut_height.is_some() {
            self.merge_cut_height = config.merge_cut_height.unwrap();
        }

        // Trait and hub statistics
        if self.trait_column.is_none() {
            self.trait_column = config.trait_column;
        }
        if self.hub_modules.is_none() {
            self.hub_modules = config.hub_modules;
        }
        if self.module_pvalue == 0.05 && config.module_pvalue.is_some() {
            self.module_pvalue = config.module_pvalue.unwrap();
        }
        if self.kme_threshold == 0.7 && config.kme_threshold.is_some() {
            self.kme_threshold = config.kme_threshold.unwrap();
        }
        if self.kme_pvalue == 0.05 && config.kme_pvalue.is_some() {
            self.kme_pvalue = config.kme_pvalue.unwrap();
        }

        // Performance
        if self.threads.is_none() {
            self.threads = config.threads;
        }

        // Gene/Sample filtering
        if self.include_genes.is_none() {
            self.include_genes = config.include_genes;
        }
        if self.exclude_genes.is_none() {
            self.exclude_genes = config.exclude_genes;
        }
        if self.include_samples.is_none() {
            self.include_samples = config.include_samples;
        }
        if self.exclude_samples.is_none() {
            self.exclude_samples = config.exclude_samples;
        }
        if self.include_genes_list.is_none() {
            self.include_genes_list = config.include_genes_list;
        }
        if self.exclude_genes_list.is_none() {
            self.exclude_genes_list = config.exclude_genes_list;
        }
        if self.include_samples_list.is_none() {
            self.include_samples_list = config.include_samples_list;
        }
        if self.exclude_samples_list.is_none() {
            self.exclude_samples_list = config.exclude_samples_list;
        }

        // Flags (CLI flags take precedence, config only sets if not explicitly set)
        if !self.scan_only && config.scan_only.unwrap_or(false) {
            self.scan_only = true;
        }
        if !self.dry_run && config.dry_run.unwrap_or(false) {
            self.dry_run = true;
        }

        self
    }

    /// Load configuration and merge with CLI args
    pub fn with_config_file(self, config_path: &str) -> Result<Self> {
        let config = Config::from_file(config_path)?;
        Ok(self.merge_with_config(config))
    }
}
