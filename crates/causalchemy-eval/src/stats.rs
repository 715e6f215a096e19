use causalchemy_generate::Value;

use crate::metrics::ColumnStats;

/// Count, nulls and moments of one column.
pub fn column_stats(name: &str, column: &[Value]) -> ColumnStats {
    let mut numeric_count = 0_u64;
    let mut mean = 0.0;
    let mut m2 = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for value in column.iter().filter_map(Value::as_f64) {
        numeric_count += 1;
        let delta = value - mean;
        mean += delta / numeric_count as f64;
        m2 += delta * (value - mean);
        min = min.min(value);
        max = max.max(value);
    }

    let has_values = numeric_count > 0;
    ColumnStats {
        column: name.to_string(),
        count: column.len() as u64,
        null_count: column.iter().filter(|value| value.is_null()).count() as u64,
        numeric_count,
        mean: has_values.then_some(mean),
        variance: (numeric_count > 1).then(|| m2 / (numeric_count - 1) as f64),
        min: has_values.then_some(min),
        max: has_values.then_some(max),
    }
}

/// Pearson correlation over rows where both cells are numeric.
///
/// `None` with fewer than two such rows or when either side is constant.
pub fn pearson(left: &[Value], right: &[Value]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = left
        .iter()
        .zip(right)
        .filter_map(|(left, right)| Some((left.as_f64()?, right.as_f64()?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_left = pairs.iter().map(|(left, _)| left).sum::<f64>() / n;
    let mean_right = pairs.iter().map(|(_, right)| right).sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut var_left = 0.0;
    let mut var_right = 0.0;
    for (left, right) in &pairs {
        let dl = left - mean_left;
        let dr = right - mean_right;
        covariance += dl * dr;
        var_left += dl * dl;
        var_right += dr * dr;
    }

    if var_left == 0.0 || var_right == 0.0 {
        return None;
    }
    Some((covariance / (var_left.sqrt() * var_right.sqrt())).clamp(-1.0, 1.0))
}
