//! BYSETPOS selection over a period's candidate batch.

use cadence_core::ordinal_position;

/// Keeps the batch entries named by the non-zero BYSETPOS ordinals
/// (1-based from the front, negative from the back), re-sorted
/// chronologically. Out-of-range positions select nothing. An empty
/// position list keeps the whole batch.
pub(crate) fn select<T: Ord + Copy>(batch: Vec<T>, positions: &[i32]) -> Vec<T> {
    if positions.is_empty() || batch.is_empty() {
        return batch;
    }
    let mut picked: Vec<T> = positions
        .iter()
        .filter_map(|&pos| ordinal_position(pos, batch.len()))
        .map(|idx| batch[idx])
        .collect();
    picked.sort_unstable();
    picked.dedup();
    picked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_and_negative_positions_select_from_each_end() {
        let batch = vec![10, 20, 30, 40];
        assert_eq!(select(batch.clone(), &[1, -1]), vec![10, 40]);
        assert_eq!(select(batch.clone(), &[-2]), vec![30]);
        assert_eq!(select(batch, &[2, 3]), vec![20, 30]);
    }

    #[test]
    fn out_of_range_positions_select_nothing() {
        let batch = vec![10, 20];
        assert_eq!(select(batch.clone(), &[5]), Vec::<i32>::new());
        assert_eq!(select(batch, &[-3, 1]), vec![10]);
    }

    #[test]
    fn output_is_chronological_regardless_of_position_order() {
        let batch = vec![10, 20, 30];
        assert_eq!(select(batch, &[-1, 1]), vec![10, 30]);
    }

    #[test]
    fn empty_position_list_keeps_the_batch() {
        assert_eq!(select(vec![10, 20], &[]), vec![10, 20]);
    }
}
