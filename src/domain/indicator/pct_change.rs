//! One-step percent change.
//!
//! PCT[i] = (X[i] - X[i-1]) / X[i-1] * 100
//! Undefined at i = 0, when either value is undefined, or when X[i-1] == 0.

pub fn pct_change(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());

    for i in 0..values.len() {
        if i == 0 {
            out.push(None);
            continue;
        }
        let change = match (values[i - 1], values[i]) {
            (Some(prev), Some(curr)) if prev != 0.0 && prev.is_finite() && curr.is_finite() => {
                Some((curr - prev) / prev * 100.0)
            }
            _ => None,
        };
        out.push(change);
    }

    out
}
