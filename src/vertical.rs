use std::cmp::Ordering;

use ahash::AHashMap;

/// Vertical layout of a transaction database: one naturally-sorted tidset
/// per item plus the sparse symmetric pair co-occurrence counts, all built
/// in a single pass over the source.
pub struct VerticalIndex {
    n_transactions: usize,
    tidsets: Vec<Vec<u32>>,
    pair_counts: AHashMap<(u32, u32), u64>,
}

impl VerticalIndex {
    /// Consume the transaction source once. Tids are assigned in input
    /// order, so every tidset comes out sorted without an extra pass.
    /// Duplicate items within a transaction are coalesced; items outside
    /// [0, n_items) are ignored here (the bindings reject them up front).
    pub fn from_transactions<I>(transactions: I, n_items: usize) -> Self
    where
        I: IntoIterator<Item = Vec<u32>>,
    {
        let mut tidsets = vec![Vec::new(); n_items];
        let mut pair_counts: AHashMap<(u32, u32), u64> = AHashMap::new();
        let mut tid: u32 = 0;
        for mut txn in transactions {
            txn.retain(|&i| (i as usize) < n_items);
            txn.sort_unstable();
            txn.dedup();
            for (pos, &i) in txn.iter().enumerate() {
                tidsets[i as usize].push(tid);
                // Ascending within the transaction, so (i, j) is canonical.
                for &j in &txn[pos + 1..] {
                    *pair_counts.entry((i, j)).or_insert(0) += 1;
                }
            }
            tid += 1;
        }
        VerticalIndex {
            n_transactions: tid as usize,
            tidsets,
            pair_counts,
        }
    }

    #[inline]
    pub fn n_transactions(&self) -> usize {
        self.n_transactions
    }

    #[inline]
    pub fn n_items(&self) -> usize {
        self.tidsets.len()
    }

    #[inline]
    pub fn tidset(&self, item: u32) -> &[u32] {
        &self.tidsets[item as usize]
    }

    #[inline]
    pub fn support(&self, item: u32) -> u64 {
        self.tidsets[item as usize].len() as u64
    }

    /// Co-occurrence count of a distinct item pair, in either argument
    /// order. Zero when the pair never shares a transaction.
    #[inline]
    pub fn pair_count(&self, a: u32, b: u32) -> u64 {
        let key = if a < b { (a, b) } else { (b, a) };
        self.pair_counts.get(&key).copied().unwrap_or(0)
    }

    /// Every stored pair `(i, j)` with `i < j` and a strictly positive
    /// count. Iteration order is arbitrary.
    pub fn pair_counts(&self) -> impl Iterator<Item = ((u32, u32), u64)> + '_ {
        self.pair_counts.iter().map(|(&pair, &count)| (pair, count))
    }
}

/// Intersect two strictly ascending tid runs with a two-pointer merge. The
/// result is strictly ascending as well.
pub fn intersect_sorted(a: &[u32], b: &[u32]) -> Vec<u32> {
    let mut out = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0usize, 0usize);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out
}
