/// Median of a non-empty slice. Even-length inputs average the two middle
/// values.
pub fn median(values: &[f64]) -> f64 {
    debug_assert!(!values.is_empty());
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Reduces a signal to exactly `steps` values by cutting it into `steps`
/// contiguous chunks of near-equal length and taking each chunk's median.
///
/// Chunk `k` spans `[⌊k·n/steps⌋, ⌊(k+1)·n/steps⌋)`. When the signal is
/// shorter than `steps` a chunk can be empty; it then takes the single
/// sample at its start so every output step is defined.
pub fn median_downsample(signal: &[f64], steps: usize) -> Vec<f64> {
    let n = signal.len();
    if n == 0 {
        return Vec::new();
    }
    (0..steps)
        .map(|k| {
            let start = (k * n / steps).min(n - 1);
            let end = ((k + 1) * n / steps).max(start + 1);
            median(&signal[start..end])
        })
        .collect()
}

/// Applies [`median_downsample`] to every channel of a
/// `time × channels` recording and returns a `steps × channels` block.
pub fn downsample_recording(rows: &[Vec<f64>], steps: usize) -> Vec<Vec<f64>> {
    let channels = rows.first().map_or(0, |r| r.len());
    let columns: Vec<Vec<f64>> = (0..channels)
        .map(|c| {
            let signal: Vec<f64> = rows.iter().map(|r| r[c]).collect();
            median_downsample(&signal, steps)
        })
        .collect();

    (0..steps)
        .map(|t| columns.iter().map(|col| col[t]).collect())
        .collect()
}
