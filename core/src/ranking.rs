//! Tie-aware ranking.
//!
//! Competition ranking ("1224"): equal values share the best rank of their
//! group and the next distinct value skips past the whole group. The result
//! depends only on the values, never on row order.

use crate::population::ScoredEntity;
use std::cmp::Ordering;

/// Rank `values` descending. Each rank is `1 + count(strictly greater values)`.
pub fn competition_rank(values: &[f64]) -> Vec<u32> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[b].total_cmp(&values[a]));

    let mut ranks = vec![0u32; values.len()];
    let mut current_rank = 1u32;
    for (position, &idx) in order.iter().enumerate() {
        if position > 0 && values[idx] != values[order[position - 1]] {
            current_rank = position as u32 + 1;
        }
        ranks[idx] = current_rank;
    }
    ranks
}

/// Indices of `entities` ordered best first: total score descending, then
/// purchase amount descending, then input position.
pub fn score_order(entities: &[ScoredEntity]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..entities.len()).collect();
    order.sort_by(|&a, &b| compare_by_score(&entities[a], &entities[b]));
    order
}

fn compare_by_score(left: &ScoredEntity, right: &ScoredEntity) -> Ordering {
    right
        .scores
        .total
        .partial_cmp(&left.scores.total)
        .unwrap_or(Ordering::Equal)
        .then_with(|| {
            right
                .purchase_amount()
                .partial_cmp(&left.purchase_amount())
                .unwrap_or(Ordering::Equal)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ties_share_the_best_rank() {
        assert_eq!(competition_rank(&[10.0, 10.0, 8.0]), vec![1, 1, 3]);
    }

    #[test]
    fn rank_gap_equals_tie_group_size() {
        let ranks = competition_rank(&[5.0, 7.0, 7.0, 7.0, 1.0, 5.0]);
        assert_eq!(ranks, vec![4, 1, 1, 1, 6, 4]);
    }

    #[test]
    fn rank_is_independent_of_row_order() {
        let forward = competition_rank(&[3.0, 9.0, 3.0, 4.0]);
        let reversed = competition_rank(&[4.0, 3.0, 9.0, 3.0]);
        assert_eq!(forward, vec![3, 1, 3, 2]);
        assert_eq!(reversed, vec![2, 3, 1, 3]);
    }

    #[test]
    fn negative_and_positive_zero_tie() {
        assert_eq!(competition_rank(&[0.0, -0.0, 1.0]), vec![2, 2, 1]);
    }

    #[test]
    fn empty_input_gives_no_ranks() {
        assert!(competition_rank(&[]).is_empty());
    }
}
