use std::collections::BTreeSet;

/// Indices of local price maxima.
///
/// An interior hour is a peak when it is strictly higher than both
/// neighbours; the first and last hour only need to beat their single
/// neighbour. Sequences shorter than two entries have no peaks.
pub fn identify_peaks(prices: &[f64]) -> BTreeSet<usize> {
    let mut peaks = BTreeSet::new();
    if prices.len() < 2 {
        return peaks;
    }

    let last = prices.len() - 1;
    for (idx, price) in prices.iter().enumerate() {
        let above_left = idx == 0 || *price > prices[idx - 1];
        let above_right = idx == last || *price > prices[idx + 1];
        if above_left && above_right {
            peaks.insert(idx);
        }
    }
    peaks
}
