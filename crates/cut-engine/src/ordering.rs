//! Cut order assignment.

use cutsync_timeline::{Frame, ItemId};

/// Number persisted items by timeline in, starting at 1.
///
/// The sort is stable, so items that start on the same frame keep the order
/// they were given in. Must only be called once grouping and hero selection
/// are final for the whole run.
pub fn assign_cut_order(items: &[(ItemId, Frame)]) -> Vec<(ItemId, u32)> {
    let mut sorted: Vec<&(ItemId, Frame)> = items.iter().collect();
    sorted.sort_by_key(|(_, timeline_in)| *timeline_in);
    sorted
        .into_iter()
        .zip(1u32..)
        .map(|((id, _), order)| (*id, order))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orders_by_timeline_in() {
        let order = assign_cut_order(&[(ItemId(1), 300), (ItemId(2), 100), (ItemId(3), 200)]);
        assert_eq!(order, vec![(ItemId(2), 1), (ItemId(3), 2), (ItemId(1), 3)]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let order = assign_cut_order(&[(ItemId(5), 10), (ItemId(4), 10)]);
        assert_eq!(order, vec![(ItemId(5), 1), (ItemId(4), 2)]);
    }

    #[test]
    fn test_empty_run() {
        assert!(assign_cut_order(&[]).is_empty());
    }
}
