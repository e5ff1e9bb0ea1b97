//! Cross-coin statistics computed from cached history

use crate::backend::{CoinSymbol, PriceHistorySeries};

/// Pairwise Pearson correlation of price series
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub coins: Vec<CoinSymbol>,
    /// Row-major, `coins.len()` squared; `None` where the pair has too few common points
    pub values: Vec<Option<f64>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: CoinSymbol, b: CoinSymbol) -> Option<f64> {
        let i = self.coins.iter().position(|c| *c == a)?;
        let j = self.coins.iter().position(|c| *c == b)?;
        self.values[i * self.coins.len() + j]
    }
}

/// Pearson correlation over the common prefix of two series
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }

    let (xs, ys) = (&xs[..n], &ys[..n]);
    let mean_x = xs.iter().sum::<f64>() / n as f64;
    let mean_y = ys.iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

/// Correlation matrix across series; `None` when fewer than two usable series are given
pub fn correlation_matrix(series: &[&PriceHistorySeries]) -> Option<CorrelationMatrix> {
    let usable: Vec<&PriceHistorySeries> = series.iter().copied().filter(|s| s.len() >= 2).collect();
    if usable.len() < 2 {
        return None;
    }

    let coins = usable.iter().map(|s| s.coin()).collect::<Vec<_>>();
    let mut values = Vec::with_capacity(usable.len() * usable.len());
    for a in &usable {
        for b in &usable {
            values.push(pearson(a.prices(), b.prices()));
        }
    }

    Some(CorrelationMatrix { coins, values })
}
