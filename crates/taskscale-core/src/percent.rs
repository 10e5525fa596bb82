//! Largest-remainder percentage allocation
//!
//! Every percentage shown in a table goes through [`allocate_percentages`] so
//! that a row's shares always add up to exactly 100.

use std::collections::HashMap;
use std::hash::Hash;

use crate::error::{EngineError, Result};

/// Allocate integer percentages for `counts` out of `total`.
///
/// Returns 0 for every key when `total` is 0. Otherwise each item gets
/// `floor(count * 100 / total)`, and the remaining points go one each to the
/// items with the largest remainders. Equal remainders keep input order.
pub fn allocate_percentages<K>(counts: &[(K, i64)], total: i64) -> Result<HashMap<K, u32>>
where
    K: Clone + Eq + Hash + ToString,
{
    let raw: Vec<i64> = counts.iter().map(|(_, count)| *count).collect();
    if let Some((key, count)) = counts.iter().find(|(_, count)| *count < 0) {
        return Err(EngineError::NegativeCount {
            key: key.to_string(),
            count: *count,
        });
    }
    if total < 0 {
        return Err(EngineError::NegativeCount {
            key: "total".to_string(),
            count: total,
        });
    }

    let shares = allocate_in_order(&raw, total as u64);
    Ok(counts
        .iter()
        .zip(shares)
        .map(|((key, _), share)| (key.clone(), share))
        .collect())
}

/// Positional variant used by the table builder: the result lines up with
/// `counts` index for index.
pub fn allocate_in_order(counts: &[i64], total: u64) -> Vec<u32> {
    if total == 0 || counts.is_empty() {
        return vec![0; counts.len()];
    }

    let total = total as u128;
    let mut floors: Vec<u32> = Vec::with_capacity(counts.len());
    // Remainders share the denominator `total`, so comparing numerators is exact.
    let mut remainders: Vec<(usize, u128)> = Vec::with_capacity(counts.len());

    for (index, count) in counts.iter().enumerate() {
        let scaled = (*count).max(0) as u128 * 100;
        floors.push((scaled / total).min(u32::MAX as u128) as u32);
        remainders.push((index, scaled % total));
    }

    let floor_sum: u64 = floors.iter().map(|f| *f as u64).sum();
    let deficit = 100u64.saturating_sub(floor_sum).min(counts.len() as u64) as usize;

    // sort_by is stable: ties keep input order
    remainders.sort_by(|a, b| b.1.cmp(&a.1));
    for (index, _) in remainders.into_iter().take(deficit) {
        floors[index] += 1;
    }

    floors
}
