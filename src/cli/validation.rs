// validation.rs - Input validation utilities

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::str::FromStr;

use regex::Regex;

use crate::cli::args::Args;
use crate::core::{DetectorConfig, HubConfig, NetworkConfig, SignMode};
use crate::data::MatrixFilters;
use crate::error::{CoexError, Result};
use crate::output::OutputFormat;

#[derive(Debug)]
pub struct ValidationResult {
    pub network: NetworkConfig,
    pub filters: MatrixFilters,
    pub format: OutputFormat,
    pub output_dir: PathBuf,
    pub analysis_id: String,
}

/// Validate all command line arguments
pub fn validate_args(args: &Args) -> Result<ValidationResult> {
    let sign_mode = SignMode::from_str(&args.sign)?;
    let format = OutputFormat::from_str(&args.format)?;

    if let Some(power) = args.power {
        if !(power > 0.0) {
            return Err(CoexError::Config(format!(
                "--power must be positive, got {}",
                power
            )));
        }
    }
    let powers = match &args.powers {
        Some(list) => parse_power_list(list)?,
        None => Vec::new(),
    };

    if !(args.target_fit > 0.0 && args.target_fit <= 1.0) {
        return Err(CoexError::Config(
            "--target-fit must be in (0, 1]".to_string(),
        ));
    }
    if args.min_module_size == 0 {
        return Err(CoexError::Config(
            "--min-module-size must be at least 1".to_string(),
        ));
    }
    if !(args.cut_height_fraction > 0.0 && args.cut_height_fraction <= 1.0) {
        return Err(CoexError::Config(
            "--cut-height-fraction must be in (0, 1]".to_string(),
        ));
    }
    if !(0.0..1.0).contains(&args.merge_cut_height) {
        return Err(CoexError::Config(
            "--merge-cut-height must be in [0, 1)".to_string(),
        ));
    }
    if args.block_size == 0 {
        return Err(CoexError::Config(
            "--block-size must be at least 1".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&args.kme_threshold) {
        return Err(CoexError::Config(
            "--kme-threshold must be in [0, 1]".to_string(),
        ));
    }
    if !(args.kme_pvalue > 0.0 && args.kme_pvalue <= 1.0) {
        return Err(CoexError::Config(
            "--kme-pvalue must be in (0, 1]".to_string(),
        ));
    }
    if !(args.module_pvalue > 0.0 && args.module_pvalue <= 1.0) {
        return Err(CoexError::Config(
            "--module-pvalue must be in (0, 1]".to_string(),
        ));
    }
    if args.trait_column.is_some() && args.traits.is_none() {
        return Err(CoexError::Config(
            "--trait-column requires --traits".to_string(),
        ));
    }

    let hub_modules: Vec<String> = match &args.hub_modules {
        Some(list) => list
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        None => Vec::new(),
    };

    let network = NetworkConfig {
        power: args.power,
        powers,
        target_fit_r2: args.target_fit,
        sign_mode,
        block_size: args.block_size,
        detector: DetectorConfig {
            min_module_size: args.min_module_size,
            cut_height_fraction: args.cut_height_fraction,
            merge_cut_height: args.merge_cut_height,
        },
        hub: HubConfig {
            kme_threshold: args.kme_threshold,
            kme_pvalue: args.kme_pvalue,
        },
        trait_column: args.trait_column.clone(),
        hub_modules,
        module_pvalue: args.module_pvalue,
    };

    let filters = MatrixFilters {
        gene_include_regex: compile_pattern(&args.include_genes, "include_genes")?,
        gene_exclude_regex: compile_pattern(&args.exclude_genes, "exclude_genes")?,
        sample_include_regex: compile_pattern(&args.include_samples, "include_samples")?,
        sample_exclude_regex: compile_pattern(&args.exclude_samples, "exclude_samples")?,
        gene_include_set: load_optional_set(&args.include_genes_list)?,
        gene_exclude_set: load_optional_set(&args.exclude_genes_list)?,
        sample_include_set: load_optional_set(&args.include_samples_list)?,
        sample_exclude_set: load_optional_set(&args.exclude_samples_list)?,
    };

    Ok(ValidationResult {
        network,
        filters,
        format,
        output_dir: PathBuf::from(args.output_dir.as_deref().unwrap_or(".")),
        analysis_id: args
            .analysis_id
            .clone()
            .unwrap_or_else(|| "coexnet".to_string()),
    })
}

fn parse_power_list(list: &str) -> Result<Vec<f64>> {
    let mut powers = Vec::new();
    for part in list.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let power: f64 = part
            .parse()
            .map_err(|_| CoexError::Config(format!("invalid power '{}' in --powers", part)))?;
        if !(power > 0.0) {
            return Err(CoexError::Config(format!(
                "powers must be positive, got {}",
                power
            )));
        }
        powers.push(power);
    }
    if powers.is_empty() {
        return Err(CoexError::Config(
            "--powers must list at least one candidate".to_string(),
        ));
    }
    powers.sort_by(|a, b| a.partial_cmp(b).unwrap());
    powers.dedup();
    Ok(powers)
}

fn compile_pattern(pattern: &Option<String>, name: &str) -> Result<Option<Regex>> {
    match pattern {
        Some(p) => Regex::new(p)
            .map(Some)
            .map_err(|e| CoexError::Config(format!("invalid {} regex: {}", name, e))),
        None => Ok(None),
    }
}

fn load_optional_set(file_path: &Option<String>) -> Result<Option<HashSet<String>>> {
    match file_path {
        Some(path) => load_set_from_file(path).map(Some),
        None => Ok(None),
    }
}

/// Load a set of strings from a file (one per line)
fn load_set_from_file(file_path: &str) -> Result<HashSet<String>> {
    let file = File::open(file_path).map_err(|e| CoexError::io(file_path, e))?;

    let reader = BufReader::new(file);
    let mut set = HashSet::new();

    for line in reader.lines() {
        let line = line.map_err(|e| CoexError::io(file_path, e))?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            set.insert(trimmed.to_string());
        }
    }

    println!("📋 Loaded {} items from filter file '{}'", set.len(), file_path);
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_args() -> Args {
        Args {
            expression: Some("expr.tsv".to_string()),
            traits: None,
            output_dir: None,
            analysis_id: None,
            power: None,
            powers: None,
            target_fit: 0.8,
            sign: "signed".to_string(),
            min_module_size: 30,
            cut_height_fraction: 0.99,
            merge_cut_height: 0.25,
            block_size: 2500,
            kme_threshold: 0.7,
            kme_pvalue: 0.05,
            trait_column: None,
            hub_modules: None,
            module_pvalue: 0.05,
            format: "tsv".to_string(),
            threads: None,
            include_genes: None,
            exclude_genes: None,
            include_samples: None,
            exclude_samples: None,
            include_genes_list: None,
            exclude_genes_list: None,
            include_samples_list: None,
            exclude_samples_list: None,
            scan_only: false,
            dry_run: false,
            config: None,
            generate_config: false,
        }
    }

    #[test]
    fn default_arguments_validate() {
        let result = validate_args(&default_args()).unwrap();
        assert_eq!(result.analysis_id, "coexnet");
        assert!(result.filters.is_empty());
        assert!(result.network.powers.is_empty());
        assert_eq!(result.network.detector.min_module_size, 30);
    }

    #[test]
    fn power_list_is_parsed_sorted_and_deduplicated() {
        let mut args = default_args();
        args.powers = Some("6, 2, 4, 2".to_string());
        let result = validate_args(&args).unwrap();
        assert_eq!(result.network.powers, vec![2.0, 4.0, 6.0]);
    }

    #[test]
    fn bad_sign_mode_and_ranges_are_rejected() {
        let mut args = default_args();
        args.sign = "bogus".to_string();
        assert!(validate_args(&args).is_err());

        let mut args = default_args();
        args.merge_cut_height = 1.0;
        assert!(validate_args(&args).is_err());

        let mut args = default_args();
        args.target_fit = 0.0;
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn trait_column_requires_traits_table() {
        let mut args = default_args();
        args.trait_column = Some("dose".to_string());
        assert!(matches!(
            validate_args(&args).unwrap_err(),
            CoexError::Config(_)
        ));
    }

    #[test]
    fn hub_module_list_is_split_and_trimmed() {
        let mut args = default_args();
        args.hub_modules = Some("turquoise, blue ,".to_string());
        let result = validate_args(&args).unwrap();
        assert_eq!(result.network.hub_modules, vec!["turquoise", "blue"]);
    }
}
