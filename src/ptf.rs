use numpy::{IntoPyArray, PyArray1, PyReadonlyArray1, PyReadonlyArray2};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use rayon::prelude::*;

use crate::expand::process_partition;
use crate::heap::TopKHeap;
use crate::partition::{build_partitions, frequent_items, retain_live_partitions};
use crate::vertical::VerticalIndex;

/// Mine the k highest-support itemsets of a transaction database.
///
/// `transactions` is consumed in a single pass. `workers` selects the
/// execution mode: `None` folds the partitions on the calling thread,
/// `Some(w)` dispatches them to a dedicated pool of `w` OS threads. Every
/// partition receives the same by-value copy of the bootstrap heap while
/// tidsets are shared by reference, and the local heaps are merged in
/// partition order, so both modes return identical sequences.
///
/// Results are sorted by support descending, ties by itemset ascending.
pub fn mine_topk<I>(
    transactions: I,
    n_items: usize,
    k: usize,
    workers: Option<usize>,
) -> Vec<(u64, Vec<u32>)>
where
    I: IntoIterator<Item = Vec<u32>>,
{
    let index = VerticalIndex::from_transactions(transactions, n_items);
    if index.n_transactions() == 0 || n_items == 0 {
        return Vec::new();
    }

    let snapshot = bootstrap_heap(&index, k);
    let threshold = snapshot.min_support();

    let frequent = frequent_items(&index, threshold);
    let partitions = retain_live_partitions(build_partitions(&index, &frequent, threshold));

    let locals: Vec<TopKHeap> = match workers {
        Some(w) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(w)
                .build()
                .expect("failed to build worker pool");
            pool.install(|| {
                partitions
                    .par_iter()
                    .map(|p| process_partition(p, &index, snapshot.clone()))
                    .collect()
            })
        }
        None => partitions
            .iter()
            .map(|p| process_partition(p, &index, snapshot.clone()))
            .collect(),
    };

    let mut global = snapshot;
    for local in locals {
        for (support, itemset) in local.into_sorted_entries() {
            global.insert(support, itemset);
        }
    }
    global.into_sorted_entries()
}

/// Seed the heap with every occurring singleton and every co-occurring
/// pair; its minimum afterwards is the first pruning threshold. Pair counts
/// are exact pair supports, so nothing seeded here is ever revised.
fn bootstrap_heap(index: &VerticalIndex, k: usize) -> TopKHeap {
    let mut heap = TopKHeap::new(k);
    for item in 0..index.n_items() as u32 {
        let support = index.support(item);
        if support > 0 {
            heap.insert(support, vec![item]);
        }
    }
    for ((i, j), count) in index.pair_counts() {
        heap.insert(count, vec![i, j]);
    }
    heap
}

pub(crate) fn flatten_results(results: Vec<(u64, Vec<u32>)>) -> (Vec<u64>, Vec<u32>, Vec<u32>) {
    let mut supports = Vec::with_capacity(results.len());
    let mut offsets = Vec::with_capacity(results.len() + 1);

    let total_items: usize = results.iter().map(|(_, items)| items.len()).sum();
    let mut all_items = Vec::with_capacity(total_items);

    offsets.push(0);
    for (support, mut items) in results {
        supports.push(support);
        all_items.append(&mut items);
        offsets.push(all_items.len() as u32);
    }

    (supports, offsets, all_items)
}

pub(crate) fn validate_k(k: usize) -> PyResult<()> {
    if k == 0 {
        return Err(PyValueError::new_err("k must be >= 1"));
    }
    Ok(())
}

pub(crate) fn worker_config(parallel: bool, workers: Option<usize>) -> PyResult<Option<usize>> {
    match (parallel, workers) {
        (false, None) => Ok(None),
        (false, Some(_)) => Err(PyValueError::new_err(
            "workers is only meaningful with parallel=True",
        )),
        (true, Some(w)) if w >= 1 => Ok(Some(w)),
        (true, _) => Err(PyValueError::new_err(
            "parallel=True requires workers >= 1",
        )),
    }
}

#[pyfunction]
#[pyo3(signature = (data, k, parallel=false, workers=None))]
pub fn ptf_from_dense<'py>(
    py: Python<'py>,
    data: PyReadonlyArray2<u8>,
    k: usize,
    parallel: bool,
    workers: Option<usize>,
) -> PyResult<(
    Bound<'py, PyArray1<u64>>,
    Bound<'py, PyArray1<u32>>,
    Bound<'py, PyArray1<u32>>,
)> {
    validate_k(k)?;
    let workers = worker_config(parallel, workers)?;

    let arr = data.as_array();
    let (n_rows, n_cols) = (arr.nrows(), arr.ncols());
    if n_rows == 0 || n_cols == 0 {
        return Ok((
            Vec::<u64>::new().into_pyarray(py),
            Vec::<u32>::new().into_pyarray(py),
            Vec::<u32>::new().into_pyarray(py),
        ));
    }

    let flat = arr.as_slice().unwrap();
    let rows = flat.chunks(n_cols).map(|row| {
        row.iter()
            .enumerate()
            .filter(|(_, &v)| v != 0)
            .map(|(col, _)| col as u32)
            .collect::<Vec<u32>>()
    });
    let results = mine_topk(rows, n_cols, k, workers);

    let (supports, offsets, items) = flatten_results(results);
    Ok((
        supports.into_pyarray(py),
        offsets.into_pyarray(py),
        items.into_pyarray(py),
    ))
}

#[pyfunction]
#[pyo3(signature = (indptr, indices, n_cols, k, parallel=false, workers=None))]
pub fn ptf_from_csr<'py>(
    py: Python<'py>,
    indptr: PyReadonlyArray1<i32>,
    indices: PyReadonlyArray1<i32>,
    n_cols: usize,
    k: usize,
    parallel: bool,
    workers: Option<usize>,
) -> PyResult<(
    Bound<'py, PyArray1<u64>>,
    Bound<'py, PyArray1<u32>>,
    Bound<'py, PyArray1<u32>>,
)> {
    validate_k(k)?;
    let workers = worker_config(parallel, workers)?;

    let indptr = indptr.as_slice()?;
    let indices = indices.as_slice()?;
    if indptr.len() < 2 || n_cols == 0 {
        return Ok((
            Vec::<u64>::new().into_pyarray(py),
            Vec::<u32>::new().into_pyarray(py),
            Vec::<u32>::new().into_pyarray(py),
        ));
    }

    // Malformed input rejects the whole run before any mining work.
    if indptr[0] != 0
        || indptr.windows(2).any(|w| w[1] < w[0])
        || indptr[indptr.len() - 1] as usize != indices.len()
    {
        return Err(PyValueError::new_err("indptr is not a valid CSR row index"));
    }
    if let Some(&bad) = indices.iter().find(|&&c| c < 0 || c as usize >= n_cols) {
        return Err(PyValueError::new_err(format!(
            "item id {bad} outside [0, {n_cols})"
        )));
    }

    let n_rows = indptr.len() - 1;
    let rows = (0..n_rows).map(|row| {
        let start = indptr[row] as usize;
        let end = indptr[row + 1] as usize;
        indices[start..end].iter().map(|&c| c as u32).collect::<Vec<u32>>()
    });
    let results = mine_topk(rows, n_cols, k, workers);

    let (supports, offsets, items) = flatten_results(results);
    Ok((
        supports.into_pyarray(py),
        offsets.into_pyarray(py),
        items.into_pyarray(py),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singletons_alone_when_no_pair_exists() {
        let rows = vec![vec![1], vec![2]];
        let result = mine_topk(rows, 3, 10, None);
        assert_eq!(result, vec![(1, vec![1]), (1, vec![2])]);
    }

    #[test]
    fn empty_database_yields_empty_result() {
        assert!(mine_topk(Vec::<Vec<u32>>::new(), 5, 4, None).is_empty());
        assert!(mine_topk(vec![vec![0], vec![1]], 0, 4, None).is_empty());
    }

    #[test]
    fn duplicates_within_a_transaction_collapse() {
        let rows = vec![vec![1, 1, 2], vec![2, 1]];
        let result = mine_topk(rows, 3, 2, None);
        assert_eq!(result, vec![(2, vec![1]), (2, vec![1, 2])]);
    }

    #[test]
    fn k_of_one_returns_the_single_best() {
        let rows = vec![vec![0, 1], vec![0, 1], vec![0]];
        let result = mine_topk(rows, 2, 1, None);
        assert_eq!(result, vec![(3, vec![0])]);
    }

    #[test]
    fn ties_resolve_toward_the_smaller_itemset() {
        // Supports: {1} 4, {2} 4, {1,2} 4, {3} 3, {1,3} 3, {2,3} 3,
        // {1,2,3} 3. Four candidates sit at support 3; the smallest wins
        // the last slot.
        let rows = vec![
            vec![1, 2, 3, 4],
            vec![1, 2, 3, 4],
            vec![1, 2, 3],
            vec![1, 2],
        ];
        let result = mine_topk(rows, 5, 4, None);
        assert_eq!(
            result,
            vec![
                (4, vec![1]),
                (4, vec![1, 2]),
                (4, vec![2]),
                (3, vec![1, 3]),
            ]
        );
    }

    #[test]
    fn deep_itemsets_reach_the_heap() {
        let rows = vec![
            vec![0, 1, 2, 3],
            vec![0, 1, 2, 3],
            vec![0, 1, 2, 3],
            vec![4],
            vec![5],
        ];
        let result = mine_topk(rows, 6, 15, None);
        assert!(result.contains(&(3, vec![0, 1, 2, 3])));
        assert!(result.contains(&(3, vec![0, 1, 2])));
        assert!(result.contains(&(3, vec![1, 2, 3])));
        assert_eq!(result.len(), 15);
    }

    #[test]
    fn flatten_results_layout() {
        let (supports, offsets, items) =
            flatten_results(vec![(4, vec![1, 2]), (3, vec![5]), (2, vec![0, 3, 7])]);
        assert_eq!(supports, vec![4, 3, 2]);
        assert_eq!(offsets, vec![0, 2, 3, 6]);
        assert_eq!(items, vec![1, 2, 5, 0, 3, 7]);
    }

    #[test]
    fn worker_config_validation() {
        assert_eq!(worker_config(false, None).unwrap(), None);
        assert_eq!(worker_config(true, Some(4)).unwrap(), Some(4));
        assert!(worker_config(true, None).is_err());
        assert!(worker_config(true, Some(0)).is_err());
        assert!(worker_config(false, Some(2)).is_err());
        assert!(validate_k(0).is_err());
        assert!(validate_k(1).is_ok());
    }
}
