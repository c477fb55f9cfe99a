// mod.rs - Output formatters module

use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ndarray::ArrayView2;

use crate::core::pipeline::{AnalysisResult, NetworkConfig};
use crate::core::soft_threshold::PowerScan;
use crate::error::{CoexError, Result};

/// Table output format for every result file except the JSON summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Tsv,
    Csv,
}

impl FromStr for OutputFormat {
    type Err = CoexError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "tsv" => Ok(OutputFormat::Tsv),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(CoexError::Config(format!(
                "invalid output format: {}. Use: tsv, csv",
                s
            ))),
        }
    }
}

impl OutputFormat {
    pub fn extension(&self) -> &str {
        match self {
            OutputFormat::Tsv => "tsv",
            OutputFormat::Csv => "csv",
        }
    }

    fn delimiter(&self) -> u8 {
        match self {
            OutputFormat::Tsv => b'\t',
            OutputFormat::Csv => b',',
        }
    }
}

fn format_value(v: f64) -> String {
    if v.is_nan() {
        "NA".to_string()
    } else {
        format!("{}", v)
    }
}

fn create_output_file(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent).map_err(|e| CoexError::io(parent.display().to_string(), e))?;
    }
    let file = File::create(path).map_err(|e| CoexError::io(path.display().to_string(), e))?;
    Ok(BufWriter::new(file))
}

fn write_command_header<W: Write>(writer: &mut W, path: &Path, command_line: &str) -> Result<()> {
    let io_err = |e| CoexError::io(path.display().to_string(), e);
    writeln!(writer, "# Command: {}", command_line).map_err(io_err)?;
    writeln!(
        writer,
        "# Generated: {}",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    )
    .map_err(io_err)?;
    writeln!(writer, "# coexnet v{}", env!("CARGO_PKG_VERSION")).map_err(io_err)?;
    Ok(())
}

fn csv_err(path: &Path, e: csv::Error) -> CoexError {
    CoexError::io(
        path.display().to_string(),
        std::io::Error::new(std::io::ErrorKind::Other, e),
    )
}

/// Write a labelled numeric matrix with the standard command header.
fn write_matrix(
    path: &Path,
    corner: &str,
    row_ids: &[String],
    col_ids: &[String],
    data: ArrayView2<f64>,
    format: OutputFormat,
    command_line: &str,
) -> Result<()> {
    let mut writer = create_output_file(path)?;
    write_command_header(&mut writer, path, command_line)?;
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(format.delimiter())
        .from_writer(writer);

    let mut header = Vec::with_capacity(col_ids.len() + 1);
    header.push(corner.to_string());
    header.extend(col_ids.iter().cloned());
    csv_writer
        .write_record(&header)
        .map_err(|e| csv_err(path, e))?;

    for (i, id) in row_ids.iter().enumerate() {
        let mut record = Vec::with_capacity(col_ids.len() + 1);
        record.push(id.clone());
        for j in 0..col_ids.len() {
            record.push(format_value(data[[i, j]]));
        }
        csv_writer
            .write_record(&record)
            .map_err(|e| csv_err(path, e))?;
    }

    csv_writer
        .flush()
        .map_err(|e| CoexError::io(path.display().to_string(), e))?;
    Ok(())
}

/// Write rows of already-formatted fields under a column header.
fn write_record_table(
    path: &Path,
    columns: &[&str],
    rows: &[Vec<String>],
    format: OutputFormat,
    command_line: &str,
) -> Result<()> {
    let mut writer = create_output_file(path)?;
    write_command_header(&mut writer, path, command_line)?;
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(format.delimiter())
        .from_writer(writer);

    csv_writer
        .write_record(columns)
        .map_err(|e| csv_err(path, e))?;
    for row in rows {
        csv_writer.write_record(row).map_err(|e| csv_err(path, e))?;
    }
    csv_writer
        .flush()
        .map_err(|e| CoexError::io(path.display().to_string(), e))?;
    Ok(())
}

fn output_path(dir: &Path, analysis_id: &str, name: &str, ext: &str) -> PathBuf {
    dir.join(format!("{}_{}.{}", analysis_id, name, ext))
}

/// Write the power scan table on its own (used by --scan-only as well as
/// the full run).
pub fn write_power_scan(
    scan: &PowerScan,
    dir: &Path,
    analysis_id: &str,
    format: OutputFormat,
    command_line: &str,
) -> Result<()> {
    let path = output_path(dir, analysis_id, "power_scan", format.extension());
    let rows: Vec<Vec<String>> = scan
        .rows
        .iter()
        .map(|r| {
            vec![
                format_value(r.power),
                format_value(r.fit_r2),
                format_value(r.slope),
                format_value(r.mean_k),
                format_value(r.median_k),
                format_value(r.max_k),
            ]
        })
        .collect();
    write_record_table(
        &path,
        &["power", "fit_r2", "slope", "mean_k", "median_k", "max_k"],
        &rows,
        format,
        command_line,
    )?;
    println!("✅ Power scan table written to: {}", path.display());
    Ok(())
}

/// Write every result table plus the JSON run summary, all prefixed with
/// the analysis id.
pub fn write_results(
    result: &AnalysisResult,
    config: &NetworkConfig,
    dir: &Path,
    analysis_id: &str,
    format: OutputFormat,
    command_line: &str,
) -> Result<()> {
    let ext = format.extension();

    if let Some(scan) = &result.power_scan {
        write_power_scan(scan, dir, analysis_id, format, command_line)?;
    }

    // Gene-to-module assignment, pre- and post-merge
    let path = output_path(dir, analysis_id, "modules", ext);
    let rows: Vec<Vec<String>> = result
        .assignment
        .gene_ids
        .iter()
        .enumerate()
        .map(|(g, gene_id)| {
            let initial = result.assignment.initial[g];
            let module = result.assignment.merged[g];
            vec![
                gene_id.clone(),
                initial.0.to_string(),
                module.0.to_string(),
                module.color(),
            ]
        })
        .collect();
    write_record_table(
        &path,
        &["gene", "module_initial", "module", "color"],
        &rows,
        format,
        command_line,
    )?;
    println!("✅ Module assignment written to: {}", path.display());

    // Gene-level table: assignment plus own-module kME and GS
    let path = output_path(dir, analysis_id, "gene_info", ext);
    let rows: Vec<Vec<String>> = result
        .assignment
        .gene_ids
        .iter()
        .enumerate()
        .map(|(g, gene_id)| {
            let module = result.assignment.merged[g];
            let (kme, kme_p) = match result
                .eigengenes
                .column_for(module)
                .map(|c| (result.kme.cor[[g, c]], result.kme.pvalue[[g, c]]))
            {
                Some(pair) => pair,
                None => (f64::NAN, f64::NAN),
            };
            let (gs, gs_p) = match &result.gene_significance {
                Some(stats) => (stats.cor[[g, 0]], stats.pvalue[[g, 0]]),
                None => (f64::NAN, f64::NAN),
            };
            vec![
                gene_id.clone(),
                module.color(),
                format_value(kme),
                format_value(kme_p),
                format_value(gs),
                format_value(gs_p),
            ]
        })
        .collect();
    write_record_table(
        &path,
        &["gene", "module", "kme", "kme_pvalue", "gs", "gs_pvalue"],
        &rows,
        format,
        command_line,
    )?;
    println!("✅ Gene table written to: {}", path.display());

    // Eigengene matrix: samples x MEs
    let path = output_path(dir, analysis_id, "eigengenes", ext);
    write_matrix(
        &path,
        "sample",
        &result.eigengenes.sample_ids,
        &result.eigengenes.labels(),
        result.eigengenes.data.view(),
        format,
        command_line,
    )?;
    println!("✅ Eigengene matrix written to: {}", path.display());

    // Full kME matrices: genes x MEs
    let path = output_path(dir, analysis_id, "kme", ext);
    write_matrix(
        &path,
        "gene",
        &result.kme.row_ids,
        &result.kme.col_ids,
        result.kme.cor.view(),
        format,
        command_line,
    )?;
    println!("✅ kME matrix written to: {}", path.display());

    let path = output_path(dir, analysis_id, "kme_pvalue", ext);
    write_matrix(
        &path,
        "gene",
        &result.kme.row_ids,
        &result.kme.col_ids,
        result.kme.pvalue.view(),
        format,
        command_line,
    )?;
    println!("✅ kME p-value matrix written to: {}", path.display());

    // Module-trait relationship matrices: MEs x traits
    if let Some(stats) = &result.module_trait {
        let path = output_path(dir, analysis_id, "module_trait_cor", ext);
        write_matrix(
            &path,
            "module",
            &stats.row_ids,
            &stats.col_ids,
            stats.cor.view(),
            format,
            command_line,
        )?;
        println!("✅ Module-trait correlations written to: {}", path.display());

        let path = output_path(dir, analysis_id, "module_trait_pvalue", ext);
        write_matrix(
            &path,
            "module",
            &stats.row_ids,
            &stats.col_ids,
            stats.pvalue.view(),
            format,
            command_line,
        )?;
        println!("✅ Module-trait p-values written to: {}", path.display());
    }

    // Per-module member and hub tables for the modules of interest
    let gene_row = |g: &crate::core::hubs::HubGene| {
        vec![
            g.gene_id.clone(),
            format_value(g.kme),
            format_value(g.kme_pvalue),
            format_value(g.gs),
            format_value(g.gs_pvalue),
        ]
    };
    let columns = ["gene", "kme", "kme_pvalue", "gs", "gs_pvalue"];
    for set in &result.hub_sets {
        let label = set.module.color();

        let path = output_path(dir, analysis_id, &format!("members_{}", label), ext);
        let rows: Vec<Vec<String>> = set.members.iter().map(gene_row).collect();
        write_record_table(&path, &columns, &rows, format, command_line)?;

        let path = output_path(dir, analysis_id, &format!("hub_{}", label), ext);
        let rows: Vec<Vec<String>> = set.hubs.iter().map(gene_row).collect();
        write_record_table(&path, &columns, &rows, format, command_line)?;
        println!(
            "✅ Module '{}': {} members, {} hub genes written",
            label,
            set.members.len(),
            set.hubs.len()
        );
    }

    write_summary(result, config, dir, analysis_id, command_line)?;
    Ok(())
}

/// JSON run summary: parameters, module census and warnings.
fn write_summary(
    result: &AnalysisResult,
    config: &NetworkConfig,
    dir: &Path,
    analysis_id: &str,
    command_line: &str,
) -> Result<()> {
    let path = dir.join(format!("{}_summary.json", analysis_id));

    let modules: Vec<serde_json::Value> = result
        .assignment
        .modules()
        .iter()
        .map(|&m| {
            serde_json::json!({
                "id": m.0,
                "color": m.color(),
                "size": result.assignment.module_size(m),
            })
        })
        .collect();

    let summary = serde_json::json!({
        "analysis_id": analysis_id,
        "version": env!("CARGO_PKG_VERSION"),
        "generated": chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        "command": command_line,
        "parameters": {
            "power": result.power,
            "sign_mode": config.sign_mode,
            "target_fit_r2": config.target_fit_r2,
            "block_size": config.block_size,
            "detector": config.detector,
            "hub": config.hub,
            "module_pvalue": config.module_pvalue,
        },
        "n_genes": result.assignment.gene_ids.len(),
        "n_modules": result.assignment.modules().len(),
        "n_unassigned": result.assignment.n_unassigned(),
        "modules": modules,
        "trait_column": result.trait_column,
        "hub_modules": result.hub_sets.iter().map(|s| s.module.color()).collect::<Vec<_>>(),
        "n_hub_genes": result.hub_sets.iter().map(|s| s.hubs.len()).sum::<usize>(),
        "warnings": result.warnings,
    });

    let mut writer = create_output_file(&path)?;
    let content = serde_json::to_string_pretty(&summary)
        .map_err(|e| CoexError::Parse(format!("failed to serialize summary: {}", e)))?;
    writer
        .write_all(content.as_bytes())
        .map_err(|e| CoexError::io(path.display().to_string(), e))?;
    writer
        .flush()
        .map_err(|e| CoexError::io(path.display().to_string(), e))?;
    println!("✅ Run summary written to: {}", path.display());
    Ok(())
}
