// expression.rs - Expression matrix loading, filtering and validation

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use ndarray::Array2;
use regex::Regex;

use crate::error::{CoexError, Result};

/// Samples x genes expression matrix, variance-stabilized upstream.
/// Immutable once handed to the pipeline.
#[derive(Debug, Clone)]
pub struct ExpressionMatrix {
    pub sample_ids: Vec<String>,
    pub gene_ids: Vec<String>,
    /// samples x genes
    pub data: Array2<f64>,
}

/// Gene/sample filters compiled from CLI arguments (regex patterns and
/// one-id-per-line list files).
#[derive(Debug, Default)]
pub struct MatrixFilters {
    pub gene_include_regex: Option<Regex>,
    pub gene_exclude_regex: Option<Regex>,
    pub sample_include_regex: Option<Regex>,
    pub sample_exclude_regex: Option<Regex>,
    pub gene_include_set: Option<HashSet<String>>,
    pub gene_exclude_set: Option<HashSet<String>>,
    pub sample_include_set: Option<HashSet<String>>,
    pub sample_exclude_set: Option<HashSet<String>>,
}

impl MatrixFilters {
    pub fn is_empty(&self) -> bool {
        self.gene_include_regex.is_none()
            && self.gene_exclude_regex.is_none()
            && self.sample_include_regex.is_none()
            && self.sample_exclude_regex.is_none()
            && self.gene_include_set.is_none()
            && self.gene_exclude_set.is_none()
            && self.sample_include_set.is_none()
            && self.sample_exclude_set.is_none()
    }

    fn keep_gene(&self, id: &str) -> bool {
        if let Some(re) = &self.gene_include_regex {
            if !re.is_match(id) {
                return false;
            }
        }
        if let Some(re) = &self.gene_exclude_regex {
            if re.is_match(id) {
                return false;
            }
        }
        if let Some(set) = &self.gene_include_set {
            if !set.contains(id) {
                return false;
            }
        }
        if let Some(set) = &self.gene_exclude_set {
            if set.contains(id) {
                return false;
            }
        }
        true
    }

    fn keep_sample(&self, id: &str) -> bool {
        if let Some(re) = &self.sample_include_regex {
            if !re.is_match(id) {
                return false;
            }
        }
        if let Some(re) = &self.sample_exclude_regex {
            if re.is_match(id) {
                return false;
            }
        }
        if let Some(set) = &self.sample_include_set {
            if !set.contains(id) {
                return false;
            }
        }
        if let Some(set) = &self.sample_exclude_set {
            if set.contains(id) {
                return false;
            }
        }
        true
    }
}

fn delimiter_for(path: &Path) -> u8 {
    match path.extension().and_then(|s| s.to_str()) {
        Some("csv") => b',',
        _ => b'\t',
    }
}

fn parse_value(s: &str) -> f64 {
    let cleaned = s.trim();
    if cleaned.is_empty() || cleaned == "NA" || cleaned.eq_ignore_ascii_case("nan") {
        return f64::NAN;
    }
    cleaned.parse::<f64>().unwrap_or(f64::NAN)
}

/// Parse a delimited id-column + header table into (sample_ids, col_ids, rows).
fn parse_table<R: Read>(
    reader: R,
    delimiter: u8,
    source: &str,
) -> Result<(Vec<String>, Vec<String>, Vec<Vec<f64>>)> {
    let reader = BufReader::new(reader);
    let mut lines = reader.lines();

    let header_line = loop {
        match lines.next() {
            Some(line) => {
                let line = line.map_err(|e| CoexError::io(source, e))?;
                // Skip comment header lines written by this tool itself
                if line.starts_with('#') {
                    continue;
                }
                break line;
            }
            None => return Err(CoexError::Parse(format!("'{}' is empty", source))),
        }
    };

    let delim = delimiter as char;
    let header_parts: Vec<&str> = header_line.split(delim).collect();
    if header_parts.len() < 2 {
        return Err(CoexError::Parse(format!(
            "'{}': header must have an id column plus at least one data column",
            source
        )));
    }
    let col_ids: Vec<String> = header_parts[1..].iter().map(|s| s.trim().to_string()).collect();

    let mut sample_ids = Vec::new();
    let mut rows: Vec<Vec<f64>> = Vec::new();

    for (line_num, line) in lines.enumerate() {
        let line = line.map_err(|e| CoexError::io(source, e))?;
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = line.split(delim).collect();
        if parts.len() != header_parts.len() {
            return Err(CoexError::Parse(format!(
                "'{}' line {}: {} columns, expected {}",
                source,
                line_num + 2,
                parts.len(),
                header_parts.len()
            )));
        }
        sample_ids.push(parts[0].trim().to_string());
        rows.push(parts[1..].iter().map(|v| parse_value(v)).collect());
    }

    if rows.is_empty() {
        return Err(CoexError::Parse(format!("'{}' has no data rows", source)));
    }

    Ok((sample_ids, col_ids, rows))
}

impl ExpressionMatrix {
    /// Load a samples x genes table (TSV or CSV by extension): first column
    /// sample ids, header row gene ids.
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| CoexError::io(path.display().to_string(), e))?;
        let matrix = Self::from_reader(file, delimiter_for(path), &path.display().to_string())?;
        println!(
            "✅ Expression matrix loaded: {} samples, {} genes",
            matrix.n_samples(),
            matrix.n_genes()
        );
        Ok(matrix)
    }

    pub fn from_reader<R: Read>(reader: R, delimiter: u8, source: &str) -> Result<Self> {
        let (sample_ids, gene_ids, rows) = parse_table(reader, delimiter, source)?;
        let n_samples = rows.len();
        let n_genes = gene_ids.len();
        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        let data = Array2::from_shape_vec((n_samples, n_genes), flat).map_err(|e| {
            CoexError::Parse(format!("'{}': inconsistent row lengths: {}", source, e))
        })?;
        Ok(Self {
            sample_ids,
            gene_ids,
            data,
        })
    }

    pub fn n_samples(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_genes(&self) -> usize {
        self.data.ncols()
    }

    /// Apply gene/sample filters, returning the reduced matrix.
    pub fn filtered(self, filters: &MatrixFilters) -> Result<Self> {
        if filters.is_empty() {
            return Ok(self);
        }

        let keep_samples: Vec<usize> = (0..self.n_samples())
            .filter(|&i| filters.keep_sample(&self.sample_ids[i]))
            .collect();
        let keep_genes: Vec<usize> = (0..self.n_genes())
            .filter(|&j| filters.keep_gene(&self.gene_ids[j]))
            .collect();

        if keep_samples.is_empty() {
            return Err(CoexError::Config(
                "sample filters removed every sample".to_string(),
            ));
        }
        if keep_genes.is_empty() {
            return Err(CoexError::Config(
                "gene filters removed every gene".to_string(),
            ));
        }

        let removed_samples = self.n_samples() - keep_samples.len();
        let removed_genes = self.n_genes() - keep_genes.len();

        let mut data = Array2::zeros((keep_samples.len(), keep_genes.len()));
        for (ri, &si) in keep_samples.iter().enumerate() {
            for (ci, &gi) in keep_genes.iter().enumerate() {
                data[[ri, ci]] = self.data[[si, gi]];
            }
        }

        if removed_samples > 0 || removed_genes > 0 {
            println!(
                "🔍 Filters applied: removed {} samples, {} genes ({} x {} remain)",
                removed_samples,
                removed_genes,
                keep_samples.len(),
                keep_genes.len()
            );
        }

        Ok(Self {
            sample_ids: keep_samples.iter().map(|&i| self.sample_ids[i].clone()).collect(),
            gene_ids: keep_genes.iter().map(|&j| self.gene_ids[j].clone()).collect(),
            data,
        })
    }

    /// Stage-boundary validation: unique ids, >= 3 samples, all values
    /// finite, no zero-variance gene.
    pub fn validate(&self) -> Result<()> {
        if self.sample_ids.len() != self.n_samples() || self.gene_ids.len() != self.n_genes() {
            return Err(CoexError::ShapeMismatch {
                stage: "expression",
                detail: format!(
                    "{} sample ids / {} gene ids for a {} x {} matrix",
                    self.sample_ids.len(),
                    self.gene_ids.len(),
                    self.n_samples(),
                    self.n_genes()
                ),
            });
        }

        let mut seen = HashSet::new();
        for id in &self.sample_ids {
            if !seen.insert(id) {
                return Err(CoexError::Parse(format!("duplicate sample id '{}'", id)));
            }
        }
        let mut seen = HashSet::new();
        for id in &self.gene_ids {
            if !seen.insert(id) {
                return Err(CoexError::Parse(format!("duplicate gene id '{}'", id)));
            }
        }

        if self.n_samples() < 3 {
            return Err(CoexError::InsufficientSamples {
                a: "expression matrix".to_string(),
                b: "any gene pair".to_string(),
                n: self.n_samples(),
            });
        }

        for (j, col) in self.data.columns().into_iter().enumerate() {
            let mut mean = 0.0;
            for &v in col.iter() {
                if !v.is_finite() {
                    return Err(CoexError::DegenerateInput {
                        stage: "expression",
                        detail: format!(
                            "non-finite value for gene '{}' (missing values must be resolved upstream)",
                            self.gene_ids[j]
                        ),
                    });
                }
                mean += v;
            }
            mean /= self.n_samples() as f64;
            let var: f64 = col.iter().map(|&v| (v - mean) * (v - mean)).sum();
            if var == 0.0 {
                return Err(CoexError::DegenerateInput {
                    stage: "expression",
                    detail: format!(
                        "gene '{}' has zero variance (exclude invariant genes upstream)",
                        self.gene_ids[j]
                    ),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix_from(text: &str) -> Result<ExpressionMatrix> {
        ExpressionMatrix::from_reader(text.as_bytes(), b'\t', "test")
    }

    #[test]
    fn parses_tsv_with_header() {
        let m = matrix_from("id\tg1\tg2\ns1\t1.0\t2.0\ns2\t3.0\t4.5\ns3\t0.5\t1.5\n").unwrap();
        assert_eq!(m.sample_ids, vec!["s1", "s2", "s3"]);
        assert_eq!(m.gene_ids, vec!["g1", "g2"]);
        assert_eq!(m.data[[1, 1]], 4.5);
        m.validate().unwrap();
    }

    #[test]
    fn rejects_ragged_rows() {
        let err = matrix_from("id\tg1\tg2\ns1\t1.0\n").unwrap_err();
        assert!(matches!(err, CoexError::Parse(_)));
    }

    #[test]
    fn validate_rejects_missing_values() {
        let m = matrix_from("id\tg1\tg2\ns1\t1\tNA\ns2\t2\t4\ns3\t3\t5\n").unwrap();
        let err = m.validate().unwrap_err();
        assert!(matches!(err, CoexError::DegenerateInput { .. }));
        assert!(err.to_string().contains("g2"));
    }

    #[test]
    fn validate_rejects_zero_variance_gene() {
        let m = matrix_from("id\tg1\tg2\ns1\t1\t7\ns2\t2\t7\ns3\t3\t7\n").unwrap();
        let err = m.validate().unwrap_err();
        assert!(err.to_string().contains("zero variance"));
    }

    #[test]
    fn validate_rejects_too_few_samples() {
        let m = matrix_from("id\tg1\tg2\ns1\t1\t2\ns2\t2\t3\n").unwrap();
        let err = m.validate().unwrap_err();
        assert!(matches!(err, CoexError::InsufficientSamples { n: 2, .. }));
    }

    #[test]
    fn filters_by_regex_and_list() {
        let m = matrix_from(
            "id\tGENE1\tGENE2\tLNC1\ns1\t1\t2\t3\ns2\t2\t1\t4\ns3\t3\t4\t2\n",
        )
        .unwrap();
        let filters = MatrixFilters {
            gene_include_regex: Some(Regex::new("^GENE").unwrap()),
            gene_exclude_set: Some(["GENE2".to_string()].into_iter().collect()),
            ..Default::default()
        };
        let m = m.filtered(&filters).unwrap();
        assert_eq!(m.gene_ids, vec!["GENE1"]);
        assert_eq!(m.n_samples(), 3);
    }

    #[test]
    fn filters_cannot_remove_everything() {
        let m = matrix_from("id\tg1\ns1\t1\ns2\t2\ns3\t3\n").unwrap();
        let filters = MatrixFilters {
            gene_exclude_regex: Some(Regex::new(".").unwrap()),
            ..Default::default()
        };
        assert!(matches!(
            m.filtered(&filters).unwrap_err(),
            CoexError::Config(_)
        ));
    }
}
