// soft_threshold.rs - Scale-free topology fit across candidate powers

use ndarray::ArrayView2;
use rayon::prelude::*;
use serde::Serialize;

use crate::core::adjacency::{adjacency, connectivity, SignMode};
use crate::error::Result;

/// Fit statistics for one candidate soft-threshold power.
#[derive(Debug, Clone, Serialize)]
pub struct PowerFit {
    pub power: f64,
    /// Signed scale-free fit index: -sign(slope) * R^2 of the
    /// log10(p(k)) ~ log10(k) regression.
    pub fit_r2: f64,
    pub slope: f64,
    pub mean_k: f64,
    pub median_k: f64,
    pub max_k: f64,
}

/// Power scan table. The choice of power is advisory configuration, not an
/// automatic decision: callers either pass an explicit power or accept the
/// first candidate whose fit reaches their target.
#[derive(Debug, Clone, Serialize)]
pub struct PowerScan {
    pub rows: Vec<PowerFit>,
}

/// Default candidate powers: 1..10, then even steps up to 50.
pub fn default_powers() -> Vec<f64> {
    let mut powers: Vec<f64> = (1..=10).map(|p| p as f64).collect();
    powers.extend((6..=25).map(|p| (p * 2) as f64));
    powers
}

/// Histogram bins used for the connectivity distribution regression.
const FIT_BINS: usize = 10;

/// Linear regression of log10(p(k)) against log10(k) over binned
/// connectivities. Returns (signed R^2, slope).
fn scale_free_fit(k: &[f64]) -> (f64, f64) {
    let min_k = k.iter().cloned().fold(f64::INFINITY, f64::min);
    let max_k = k.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if !(min_k.is_finite() && max_k.is_finite()) || max_k <= min_k {
        return (0.0, 0.0);
    }

    let width = (max_k - min_k) / FIT_BINS as f64;
    let mut counts = [0usize; FIT_BINS];
    let mut sums = [0.0f64; FIT_BINS];
    for &ki in k {
        let mut bin = ((ki - min_k) / width) as usize;
        if bin >= FIT_BINS {
            bin = FIT_BINS - 1;
        }
        counts[bin] += 1;
        sums[bin] += ki;
    }

    let total = k.len() as f64;
    let mut xs = Vec::with_capacity(FIT_BINS);
    let mut ys = Vec::with_capacity(FIT_BINS);
    for bin in 0..FIT_BINS {
        if counts[bin] == 0 {
            continue;
        }
        let mean_k = sums[bin] / counts[bin] as f64;
        let freq = counts[bin] as f64 / total;
        if mean_k > 0.0 && freq > 0.0 {
            xs.push(mean_k.log10());
            ys.push(freq.log10());
        }
    }
    if xs.len() < 3 {
        return (0.0, 0.0);
    }

    let n = xs.len() as f64;
    let mx = xs.iter().sum::<f64>() / n;
    let my = ys.iter().sum::<f64>() / n;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (x, y) in xs.iter().zip(ys.iter()) {
        sxy += (x - mx) * (y - my);
        sxx += (x - mx) * (x - mx);
        syy += (y - my) * (y - my);
    }
    if sxx == 0.0 || syy == 0.0 {
        return (0.0, 0.0);
    }
    let slope = sxy / sxx;
    let r2 = (sxy * sxy) / (sxx * syy);
    (-slope.signum() * r2, slope)
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = values.len();
    if n == 0 {
        return f64::NAN;
    }
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}

/// Evaluate every candidate power against the scale-free topology
/// criterion. The gene-gene correlation matrix is computed once by the
/// caller; each candidate derives its own adjacency.
pub fn scan_powers(
    cor: ArrayView2<f64>,
    powers: &[f64],
    mode: SignMode,
) -> Result<PowerScan> {
    let rows: Vec<Result<PowerFit>> = powers
        .par_iter()
        .map(|&power| {
            let adj = adjacency(cor, power, mode)?;
            let k = connectivity(adj.view());
            let (fit_r2, slope) = scale_free_fit(&k);
            let mean_k = k.iter().sum::<f64>() / k.len() as f64;
            let max_k = k.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let mut k_sorted = k;
            let median_k = median(&mut k_sorted);
            Ok(PowerFit {
                power,
                fit_r2,
                slope,
                mean_k,
                median_k,
                max_k,
            })
        })
        .collect();

    let mut table = Vec::with_capacity(rows.len());
    for row in rows {
        table.push(row?);
    }
    table.sort_by(|a, b| a.power.partial_cmp(&b.power).unwrap());
    Ok(PowerScan { rows: table })
}

impl PowerScan {
    /// Advisory selection: the smallest candidate whose fit reaches the
    /// target R^2. `None` means no candidate qualifies and the caller must
    /// be warned rather than defaulted.
    pub fn pick_power(&self, target_r2: f64) -> Option<f64> {
        self.rows
            .iter()
            .find(|row| row.fit_r2 >= target_r2)
            .map(|row| row.power)
    }

    /// Print the scan table in the same layout it is written to disk.
    pub fn print_table(&self) {
        println!("⚡ Soft-threshold power scan:");
        println!("   power\tfit_r2\tslope\tmean_k\tmedian_k\tmax_k");
        for row in &self.rows {
            println!(
                "   {}\t{:.4}\t{:.3}\t{:.2}\t{:.2}\t{:.2}",
                row.power, row.fit_r2, row.slope, row.mean_k, row.median_k, row.max_k
            );
        }
    }
}
