// traits.rs - Sample trait table with one-hot encoding of categorical columns

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use ndarray::Array2;

use crate::error::{CoexError, Result};

/// Samples x trait-indicator matrix. Rows must align with the expression
/// matrix sample order; columns are numeric (0/1 indicators or continuous).
#[derive(Debug, Clone)]
pub struct TraitMatrix {
    pub sample_ids: Vec<String>,
    pub trait_names: Vec<String>,
    /// samples x traits
    pub data: Array2<f64>,
}

fn delimiter_for(path: &Path) -> char {
    match path.extension().and_then(|s| s.to_str()) {
        Some("csv") => ',',
        _ => '\t',
    }
}

fn is_numeric(s: &str) -> bool {
    let t = s.trim();
    t.is_empty() || t == "NA" || t.parse::<f64>().is_ok()
}

impl TraitMatrix {
    /// Load a samples x traits table. Columns whose values do not all parse
    /// as numbers are treated as categorical and expanded into one 0/1
    /// indicator column per level, named `<column>.<level>`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| CoexError::io(path.display().to_string(), e))?;
        let m = Self::from_reader(file, delimiter_for(path), &path.display().to_string())?;
        println!(
            "✅ Trait table loaded: {} samples, {} indicator columns",
            m.sample_ids.len(),
            m.trait_names.len()
        );
        Ok(m)
    }

    pub fn from_reader<R: Read>(reader: R, delimiter: char, source: &str) -> Result<Self> {
        let reader = BufReader::new(reader);
        let mut lines = reader.lines();

        let header_line = lines
            .next()
            .ok_or_else(|| CoexError::Parse(format!("'{}' is empty", source)))?
            .map_err(|e| CoexError::io(source, e))?;
        let header: Vec<String> = header_line
            .split(delimiter)
            .map(|s| s.trim().to_string())
            .collect();
        if header.len() < 2 {
            return Err(CoexError::Parse(format!(
                "'{}': trait table needs an id column plus at least one trait",
                source
            )));
        }
        let raw_names: Vec<String> = header[1..].to_vec();

        let mut sample_ids = Vec::new();
        let mut raw_rows: Vec<Vec<String>> = Vec::new();
        for (line_num, line) in lines.enumerate() {
            let line = line.map_err(|e| CoexError::io(source, e))?;
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let parts: Vec<&str> = line.split(delimiter).collect();
            if parts.len() != header.len() {
                return Err(CoexError::Parse(format!(
                    "'{}' line {}: {} columns, expected {}",
                    source,
                    line_num + 2,
                    parts.len(),
                    header.len()
                )));
            }
            sample_ids.push(parts[0].trim().to_string());
            raw_rows.push(parts[1..].iter().map(|s| s.trim().to_string()).collect());
        }
        if raw_rows.is_empty() {
            return Err(CoexError::Parse(format!("'{}' has no data rows", source)));
        }

        // Expand categorical columns to one-hot indicators
        let mut trait_names = Vec::new();
        let mut columns: Vec<Vec<f64>> = Vec::new();
        for (j, name) in raw_names.iter().enumerate() {
            let numeric = raw_rows.iter().all(|row| is_numeric(&row[j]));
            if numeric {
                trait_names.push(name.clone());
                columns.push(
                    raw_rows
                        .iter()
                        .map(|row| {
                            let t = row[j].trim();
                            if t.is_empty() || t == "NA" {
                                f64::NAN
                            } else {
                                t.parse().unwrap_or(f64::NAN)
                            }
                        })
                        .collect(),
                );
            } else {
                let levels: BTreeSet<&str> = raw_rows.iter().map(|row| row[j].as_str()).collect();
                for level in levels {
                    trait_names.push(format!("{}.{}", name, level));
                    columns.push(
                        raw_rows
                            .iter()
                            .map(|row| if row[j] == level { 1.0 } else { 0.0 })
                            .collect(),
                    );
                }
            }
        }

        let n_samples = sample_ids.len();
        let n_traits = trait_names.len();
        let mut data = Array2::zeros((n_samples, n_traits));
        for (j, col) in columns.iter().enumerate() {
            for (i, &v) in col.iter().enumerate() {
                data[[i, j]] = v;
            }
        }

        Ok(Self {
            sample_ids,
            trait_names,
            data,
        })
    }

    pub fn n_samples(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_traits(&self) -> usize {
        self.data.ncols()
    }

    /// Index of a named trait column.
    pub fn trait_index(&self, name: &str) -> Result<usize> {
        self.trait_names
            .iter()
            .position(|t| t == name)
            .ok_or_else(|| {
                CoexError::Config(format!(
                    "trait column '{}' not found (available: {})",
                    name,
                    self.trait_names.join(", ")
                ))
            })
    }

    /// Reorder rows to match the expression sample order. Fails if any
    /// expression sample lacks a trait row.
    pub fn aligned_to(&self, sample_ids: &[String]) -> Result<Self> {
        let mut indices = Vec::with_capacity(sample_ids.len());
        for id in sample_ids {
            let idx = self
                .sample_ids
                .iter()
                .position(|s| s == id)
                .ok_or_else(|| CoexError::ShapeMismatch {
                    stage: "traits",
                    detail: format!("sample '{}' missing from trait table", id),
                })?;
            indices.push(idx);
        }
        let mut data = Array2::zeros((indices.len(), self.n_traits()));
        for (ri, &si) in indices.iter().enumerate() {
            data.row_mut(ri).assign(&self.data.row(si));
        }
        Ok(Self {
            sample_ids: sample_ids.to_vec(),
            trait_names: self.trait_names.clone(),
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(text: &str) -> TraitMatrix {
        TraitMatrix::from_reader(text.as_bytes(), '\t', "test").unwrap()
    }

    #[test]
    fn numeric_columns_pass_through() {
        let t = table("id\tdose\ns1\t0.5\ns2\t1.0\n");
        assert_eq!(t.trait_names, vec!["dose"]);
        assert_eq!(t.data[[1, 0]], 1.0);
    }

    #[test]
    fn categorical_columns_are_one_hot_encoded() {
        let t = table("id\tgroup\ns1\ttreated\ns2\tcontrol\ns3\ttreated\n");
        assert_eq!(t.trait_names, vec!["group.control", "group.treated"]);
        assert_eq!(t.data[[0, 1]], 1.0); // s1 treated
        assert_eq!(t.data[[1, 0]], 1.0); // s2 control
        assert_eq!(t.data[[2, 0]], 0.0);
    }

    #[test]
    fn alignment_reorders_rows() {
        let t = table("id\tdose\nb\t2\na\t1\n");
        let aligned = t.aligned_to(&["a".to_string(), "b".to_string()]).unwrap();
        assert_eq!(aligned.data[[0, 0]], 1.0);
        assert_eq!(aligned.data[[1, 0]], 2.0);
    }

    #[test]
    fn alignment_fails_for_missing_sample() {
        let t = table("id\tdose\na\t1\n");
        let err = t
            .aligned_to(&["a".to_string(), "zzz".to_string()])
            .unwrap_err();
        assert!(matches!(err, CoexError::ShapeMismatch { .. }));
    }

    #[test]
    fn trait_index_lookup() {
        let t = table("id\tgroup\ns1\tx\ns2\ty\n");
        assert_eq!(t.trait_index("group.x").unwrap(), 0);
        assert!(t.trait_index("nope").is_err());
    }
}
