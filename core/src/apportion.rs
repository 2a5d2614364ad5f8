//! Largest-remainder apportionment.
//!
//! Split an integer total across weighted slots: floor each exact share,
//! then hand the leftover units one at a time to the slots that lost the
//! most to truncation. Equal losses go to the earlier slot.

/// Apportion `total` units across `weights`. The result always sums to
/// `total` when at least one weight is positive. Non-positive or non-finite
/// weights count as zero; if no weight is positive every slot is weighted
/// equally.
pub fn apportion(weights: &[f64], total: usize) -> Vec<usize> {
    if weights.is_empty() {
        return Vec::new();
    }
    if total == 0 {
        return vec![0; weights.len()];
    }

    let clean: Vec<f64> = weights
        .iter()
        .map(|w| if w.is_finite() && *w > 0.0 { *w } else { 0.0 })
        .collect();
    let weight_sum: f64 = clean.iter().sum();
    let clean = if weight_sum > 0.0 {
        clean
    } else {
        vec![1.0; weights.len()]
    };
    let weight_sum: f64 = clean.iter().sum();

    let exact: Vec<f64> = clean
        .iter()
        .map(|w| w * total as f64 / weight_sum)
        .collect();
    let mut counts: Vec<usize> = exact.iter().map(|e| e.floor() as usize).collect();

    let assigned: usize = counts.iter().sum();
    if assigned > total {
        // Only reachable through float overshoot on the floors; trim from the back.
        let mut excess = assigned - total;
        for count in counts.iter_mut().rev() {
            let take = excess.min(*count);
            *count -= take;
            excess -= take;
            if excess == 0 {
                break;
            }
        }
        return counts;
    }

    let mut by_loss: Vec<usize> = (0..counts.len()).collect();
    by_loss.sort_by(|&a, &b| {
        let loss_a = exact[a] - counts[a] as f64;
        let loss_b = exact[b] - counts[b] as f64;
        loss_b.total_cmp(&loss_a)
    });

    let remainder = total - assigned;
    for i in 0..remainder {
        counts[by_loss[i % by_loss.len()]] += 1;
    }
    counts
}
