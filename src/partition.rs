use crate::vertical::VerticalIndex;

/// One prefix partition: the search space rooted at `prefix`. `promising`
/// holds the prefix at index 0 followed by its co-occurrence partners in
/// descending pair-count order, the order expansion walks them in.
pub struct PrefixPartition {
    pub prefix: u32,
    pub promising: Vec<u32>,
}

/// Items whose singleton support strictly exceeds the bootstrap threshold.
pub fn frequent_items(index: &VerticalIndex, threshold: u64) -> Vec<u32> {
    (0..index.n_items() as u32)
        .filter(|&item| index.support(item) > threshold)
        .collect()
}

/// Build one partition per frequent item. A partner enters the promising
/// array when its pair count with the prefix strictly exceeds `threshold`;
/// partners are ordered pair-count descending, ties by item ascending,
/// which biases expansion toward high-support candidates first.
pub fn build_partitions(
    index: &VerticalIndex,
    frequent: &[u32],
    threshold: u64,
) -> Vec<PrefixPartition> {
    // Invert the sparse pair map into per-item partner lists in one sweep.
    let mut partners: Vec<Vec<(u32, u64)>> = vec![Vec::new(); index.n_items()];
    for ((i, j), count) in index.pair_counts() {
        if count > threshold {
            partners[i as usize].push((j, count));
            partners[j as usize].push((i, count));
        }
    }

    frequent
        .iter()
        .map(|&prefix| {
            let mut ranked = std::mem::take(&mut partners[prefix as usize]);
            ranked.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            let mut promising = Vec::with_capacity(ranked.len() + 1);
            promising.push(prefix);
            promising.extend(ranked.into_iter().map(|(item, _)| item));
            PrefixPartition { prefix, promising }
        })
        .collect()
}

/// Drop partitions that cannot contribute anything new: with fewer than two
/// partners a partition can only restate a 2-itemset the bootstrap already
/// considered.
pub fn retain_live_partitions(partitions: Vec<PrefixPartition>) -> Vec<PrefixPartition> {
    partitions
        .into_iter()
        .filter(|p| p.promising.len() > 2)
        .collect()
}
