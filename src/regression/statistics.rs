// Window statistics for multi-run baselines
//
// A trailing window of K runs collapses into one (value, margin) pair:
// - value: mean of the K values
// - margin: sqrt(mean(margin^2) + population variance of the K values)
//
// The combined margin is the spread of a single run drawn from the window:
// within-run noise plus run-to-run drift. With K = 1 it is the run's own
// margin.

/// Aggregate of a baseline window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub mean: f64,
    pub combined_margin: f64,
    pub count: usize,
}

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population variance (divide by n), `None` for an empty slice
pub fn population_variance(values: &[f64]) -> Option<f64> {
    let mean = mean(values)?;
    let sum_sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    Some(sum_sq / values.len() as f64)
}

/// Collapse `(value, error_margin)` points into one baseline
pub fn aggregate(points: &[(f64, f64)]) -> Option<WindowStats> {
    let values: Vec<f64> = points.iter().map(|(value, _)| *value).collect();
    let squared_margins: Vec<f64> = points.iter().map(|(_, margin)| margin * margin).collect();

    let mean_value = mean(&values)?;
    let within = mean(&squared_margins)?;
    let between = population_variance(&values)?;

    Some(WindowStats {
        mean: mean_value,
        combined_margin: (within + between).sqrt(),
        count: points.len(),
    })
}
