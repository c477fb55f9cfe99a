// main.rs - CLI entry point

use std::path::Path;
use std::time::Instant;

use coexnet::cli::Config;
use coexnet::core::correlation::self_correlations;
use coexnet::core::soft_threshold::{default_powers, scan_powers};
use coexnet::output::write_power_scan;
use coexnet::prelude::*;

fn main() {
    if let Err(e) = run_main() {
        eprintln!("❌ ERROR: {}", e);
        std::process::exit(1);
    }
}

fn run_main() -> Result<()> {
    let mut args: Args = argh::from_env();
    let command_line = std::env::args().collect::<Vec<String>>().join(" ");

    // Handle generate config first
    if args.generate_config {
        let sample_config = Config::generate_sample();
        println!("{}", sample_config);
        println!("\n💡 Save this content to a .toml file and use --config /path/to/config.toml");
        return Ok(());
    }

    // Load configuration file if specified
    if let Some(config_path) = args.config.clone() {
        args = args.with_config_file(&config_path)?;
    }

    let expression = args
        .expression
        .clone()
        .ok_or_else(|| CoexError::Config("--expression is required".to_string()))?;

    println!("🚀 coexnet v{}", env!("CARGO_PKG_VERSION"));

    // Configure thread pool
    if let Some(n) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .map_err(|e| CoexError::Config(format!("failed to configure thread pool: {}", e)))?;
        println!("🧵 Threads: {}", n);
    } else {
        println!("🧵 Threads: {} (auto-detected)", rayon::current_num_threads());
    }

    // Validate all arguments
    let validation = validate_args(&args)?;

    let total_start = Instant::now();

    // Load and filter the expression matrix
    let expr = ExpressionMatrix::from_file(Path::new(&expression))?
        .filtered(&validation.filters)?;
    expr.validate()?;

    // Load the trait table, aligned to the (filtered) expression samples
    let traits = match &args.traits {
        Some(path) => Some(TraitMatrix::from_file(Path::new(path))?.aligned_to(&expr.sample_ids)?),
        None => None,
    };

    if args.dry_run {
        println!(
            "✅ Dry run: inputs valid ({} samples, {} genes{})",
            expr.n_samples(),
            expr.n_genes(),
            match &traits {
                Some(t) => format!(", {} trait columns", t.n_traits()),
                None => String::new(),
            }
        );
        return Ok(());
    }

    if args.scan_only {
        println!("🔄 Computing gene-gene correlations for the power scan...");
        let cor = self_correlations(expr.data.view(), &expr.gene_ids)?;
        let candidates = if validation.network.powers.is_empty() {
            default_powers()
        } else {
            validation.network.powers.clone()
        };
        let scan = scan_powers(cor.cor.view(), &candidates, validation.network.sign_mode)?;
        scan.print_table();
        if let Some(power) = scan.pick_power(validation.network.target_fit_r2) {
            println!(
                "✅ Suggested power: {} (first candidate with fit R² >= {})",
                power, validation.network.target_fit_r2
            );
        } else {
            println!(
                "⚠️  No candidate power reached the target fit R² of {}",
                validation.network.target_fit_r2
            );
        }
        write_power_scan(
            &scan,
            &validation.output_dir,
            &validation.analysis_id,
            validation.format,
            &command_line,
        )?;
        println!("🏁 Power scan completed in {:.2}s", total_start.elapsed().as_secs_f64());
        return Ok(());
    }

    let result = run_analysis(&expr, traits.as_ref(), &validation.network)?;

    for warning in &result.warnings {
        println!("⚠️  {}", warning);
    }

    write_results(
        &result,
        &validation.network,
        &validation.output_dir,
        &validation.analysis_id,
        validation.format,
        &command_line,
    )?;

    println!(
        "🏁 Analysis completed in {:.2}s ({} modules, {} hub genes)",
        total_start.elapsed().as_secs_f64(),
        result.assignment.modules().len(),
        result
            .hub_sets
            .iter()
            .map(|s| s.hubs.len())
            .sum::<usize>()
    );
    Ok(())
}
