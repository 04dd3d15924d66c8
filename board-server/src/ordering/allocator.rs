//! Position allocation for ordered lists
//!
//! Positions are plain integers. A task inserted between two neighbours takes
//! the midpoint of their positions; when neighbours are adjacent (or the head
//! / tail would overflow) the caller must renumber the list.

/// Result of asking for a slot in an ordered list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    /// Position to write; meaningless when `renumber_required` is set
    pub position: i64,
    pub renumber_required: bool,
}

impl Allocation {
    fn at(position: i64) -> Self {
        Self {
            position,
            renumber_required: false,
        }
    }

    fn renumber() -> Self {
        Self {
            position: 0,
            renumber_required: true,
        }
    }
}

/// Pick a position for an item inserted at `target_index`
///
/// `ordered` holds the positions of the list in display order, with the
/// moving item already removed. The coordinator rejects an index past the
/// end before calling; here it is clamped to an append.
pub fn allocate(ordered: &[i64], target_index: usize) -> Allocation {
    let index = target_index.min(ordered.len());

    let prev = index.checked_sub(1).map(|i| ordered[i]);
    let next = ordered.get(index).copied();

    match (prev, next) {
        (None, None) => Allocation::at(0),
        (None, Some(first)) => first
            .checked_sub(1)
            .map_or_else(Allocation::renumber, Allocation::at),
        (Some(last), None) => last
            .checked_add(1)
            .map_or_else(Allocation::renumber, Allocation::at),
        (Some(a), Some(b)) => {
            // Widen so a gap spanning the whole i64 range cannot overflow
            let gap = b as i128 - a as i128;
            if gap < 2 {
                Allocation::renumber()
            } else {
                Allocation::at(((a as i128 + b as i128) / 2) as i64)
            }
        }
    }
}

/// Dense positions `0..n` for a list in its final order
///
/// Returns `(id, position)` pairs; the rank of each id is its new position.
pub fn renumber(final_order: &[i64]) -> Vec<(i64, i64)> {
    final_order
        .iter()
        .enumerate()
        .map(|(rank, id)| (*id, rank as i64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list_starts_at_zero() {
        assert_eq!(allocate(&[], 0), Allocation::at(0));
        assert_eq!(allocate(&[], 5), Allocation::at(0));
    }

    #[test]
    fn head_and_tail() {
        assert_eq!(allocate(&[3, 7], 0), Allocation::at(2));
        assert_eq!(allocate(&[3, 7], 2), Allocation::at(8));
        // Past the end clamps to the tail
        assert_eq!(allocate(&[3, 7], 9), Allocation::at(8));
        // Negative positions are fine at the head
        assert_eq!(allocate(&[0], 0), Allocation::at(-1));
    }

    #[test]
    fn midpoint_between_neighbours() {
        let a = allocate(&[0, 10], 1);
        assert_eq!(a, Allocation::at(5));

        let a = allocate(&[4, 6], 1);
        assert_eq!(a, Allocation::at(5));

        let a = allocate(&[-3, 0], 1);
        assert!(!a.renumber_required);
        assert!(a.position > -3 && a.position < 0);
    }

    #[test]
    fn adjacent_neighbours_need_renumbering() {
        assert!(allocate(&[1, 2], 1).renumber_required);
        // Raw duplicates left behind by older writes
        assert!(allocate(&[2, 2], 1).renumber_required);
    }

    #[test]
    fn overflow_at_edges_needs_renumbering() {
        assert!(allocate(&[i64::MIN], 0).renumber_required);
        assert!(allocate(&[i64::MAX], 1).renumber_required);

        let wide = allocate(&[i64::MIN, i64::MAX], 1);
        assert!(!wide.renumber_required);
        assert!(wide.position > i64::MIN && wide.position < i64::MAX);
    }

    #[test]
    fn repeated_head_inserts_strictly_decrease() {
        let mut list = vec![0];
        for _ in 0..50 {
            let a = allocate(&list, 0);
            assert!(!a.renumber_required);
            assert!(a.position < list[0]);
            list.insert(0, a.position);
        }
    }

    #[test]
    fn repeated_middle_inserts_eventually_renumber() {
        let mut list = vec![0, 1024];
        let mut inserts = 0;
        loop {
            let a = allocate(&list, 1);
            if a.renumber_required {
                break;
            }
            list.insert(1, a.position);
            inserts += 1;
        }
        // log2(1024) halvings fit before the gap closes
        assert_eq!(inserts, 10);

        let ids: Vec<i64> = (100..100 + list.len() as i64).collect();
        let dense = renumber(&ids);
        assert_eq!(dense.first(), Some(&(100, 0)));
        assert_eq!(dense.last(), Some(&(100 + list.len() as i64 - 1, list.len() as i64 - 1)));
    }
}
