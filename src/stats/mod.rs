/// Annualised historical volatility: sample standard deviation of log returns
/// between consecutive prices, scaled by `sqrt(days_per_year)`.
///
/// Order of `prices` only flips the sign of each return, so newest-first input is
/// fine. Returns `None` with fewer than three usable prices.
pub fn historical_volatility(prices: &[f64], days_per_year: u32) -> Option<f64> {
    let usable: Vec<f64> = prices
        .iter()
        .copied()
        .filter(|p| p.is_finite() && *p > 0.0)
        .collect();

    let returns: Vec<f64> = usable.windows(2).map(|w| (w[0] / w[1]).ln()).collect();
    if returns.len() < 2 {
        return None;
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.sqrt() * f64::from(days_per_year).sqrt())
}
