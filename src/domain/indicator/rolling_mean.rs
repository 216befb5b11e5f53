//! Rolling mean over a calendar-aligned column.
//!
//! MEAN(n)[i] = sum(X[i-j] for j in 0..n) / n
//! Undefined until n values are in the window, and whenever any value in
//! the window is undefined.

pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    if window == 0 {
        out.resize(values.len(), None);
        return out;
    }

    for i in 0..values.len() {
        if i + 1 < window {
            out.push(None);
            continue;
        }
        let slice = &values[i + 1 - window..=i];
        let sum: Option<f64> = slice
            .iter()
            .try_fold(0.0, |acc, v| v.filter(|x| x.is_finite()).map(|x| acc + x));
        out.push(sum.map(|s| s / window as f64));
    }

    out
}
