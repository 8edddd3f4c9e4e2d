/// Marks this close together are tied for ranking purposes. Course policy
/// treats near-equal floats as the same result.
pub const RANK_EPSILON: f64 = 0.01;

/// Standard competition ranking over optional keys, descending.
///
/// Entries with `None` keys are excluded entirely: they receive no rank and
/// do not consume a slot. Tied entries (within [`RANK_EPSILON`]) share a
/// rank; the next distinct key resumes at sorted-position + 1, skipping one
/// slot per preceding tie. `[90, 85, 85, 70]` ranks as `[1, 2, 2, 4]`.
///
/// The sort is stable on input order, so tie chains are reproducible for a
/// given input sequence.
pub fn competition_ranks(keys: &[Option<f64>]) -> Vec<Option<u32>> {
    let mut order: Vec<usize> = (0..keys.len()).filter(|&i| keys[i].is_some()).collect();
    order.sort_by(|&a, &b| {
        let ka = keys[a].unwrap_or(0.0);
        let kb = keys[b].unwrap_or(0.0);
        kb.partial_cmp(&ka).unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut ranks: Vec<Option<u32>> = vec![None; keys.len()];
    let mut current_rank: u32 = 1;
    let mut skip: u32 = 0;
    let mut prev_key: Option<f64> = None;

    for &idx in &order {
        let key = keys[idx].unwrap_or(0.0);
        if let Some(prev) = prev_key {
            if prev - key >= RANK_EPSILON {
                current_rank += 1 + skip;
                skip = 0;
            } else {
                skip += 1;
            }
        }
        ranks[idx] = Some(current_rank);
        prev_key = Some(key);
    }

    ranks
}
