use super::{DayOffsets, OffsetError, OffsetPair};

/// Rise anticipation never uses a step threshold above this.
const MAX_SMOOTHING_TOLERANCE: i32 = 4;

/// Pull single-hour spikes halfway back towards their neighbours.
///
/// Applies to interior hours whose two neighbours agree with each other
/// but not with the hour itself. Runs left to right on the mutated
/// sequence.
pub fn find_single_anomalies(seq: &mut [i32]) {
    if seq.len() < 3 {
        return;
    }
    for idx in 1..seq.len() - 1 {
        let prev = seq[idx - 1];
        let curr = seq[idx];
        if prev == seq[idx + 1] && prev != curr {
            let half = (prev - curr).abs() / 2;
            if prev > curr {
                seq[idx] += half;
            } else {
                seq[idx] -= half;
            }
        }
    }
}

/// Bump an hour by one when the next hour jumps up by at least
/// `tolerance`, so a cold-to-warm swing is taken in two steps and the
/// electrical add-on is less likely to kick in.
pub fn anticipate_rises(seq: &mut [i32], tolerance: i32) {
    let tolerance = tolerance.min(MAX_SMOOTHING_TOLERANCE);
    for idx in 0..seq.len().saturating_sub(1) {
        if seq[idx + 1] >= seq[idx] + tolerance {
            seq[idx] += 1;
        }
    }
}

/// Smooth today and tomorrow as one continuous sequence and split the
/// result back into days. Tomorrow is only repackaged when it is a full day.
pub fn smooth_transitions(
    today: &DayOffsets,
    tomorrow: &DayOffsets,
    tolerance: i32,
) -> Result<OffsetPair, OffsetError> {
    if today.is_empty() {
        return Err(OffsetError::EmptyDay);
    }

    let mut seq: Vec<i32> = today.values().chain(tomorrow.values()).copied().collect();
    find_single_anomalies(&mut seq);
    anticipate_rises(&mut seq, tolerance);

    let split = today.len();
    let today_out: DayOffsets = (0u32..).zip(seq[..split].iter().copied()).collect();
    let tomorrow_out = if super::is_full_day(tomorrow.len()) && seq.len() == split + tomorrow.len() {
        (0u32..).zip(seq[split..].iter().copied()).collect()
    } else {
        DayOffsets::new()
    };

    Ok(OffsetPair {
        today: today_out,
        tomorrow: tomorrow_out,
    })
}
