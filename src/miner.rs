//! TopKMiner — chunked top-k itemset accumulator.
//!
//! Memory strategy (HashMap-first):
//!   • add_chunk(): aggregate long-format (txn_id, item_id) pairs into an
//!     AHashMap<i64, Vec<i32>>. Peak memory = O(unique_txns × avg_items).
//!   • mine(): order transactions by ascending external id, coalesce
//!     duplicate items, run the prefix-partition miner. Tids follow the
//!     external id order, so results do not depend on chunk arrival order.

use ahash::AHashMap;
use rayon::prelude::*;

use numpy::PyReadonlyArray1;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::ptf::{flatten_results, mine_topk, validate_k, worker_config};

#[pyclass]
pub struct TopKMiner {
    txns: AHashMap<i64, Vec<i32>>,
    n_rows: usize,
    n_items: usize,
}

#[pymethods]
impl TopKMiner {
    #[new]
    #[pyo3(signature = (n_items, hint_n_transactions=None))]
    pub fn new(n_items: usize, hint_n_transactions: Option<usize>) -> Self {
        let txns = match hint_n_transactions {
            Some(n) => AHashMap::with_capacity(n),
            None => AHashMap::new(),
        };
        TopKMiner { txns, n_rows: 0, n_items }
    }

    pub fn add_chunk(
        &mut self,
        txn_ids: PyReadonlyArray1<i64>,
        item_ids: PyReadonlyArray1<i32>,
    ) -> PyResult<()> {
        let txns = txn_ids.as_slice()?;
        let items = item_ids.as_slice()?;
        if txns.len() != items.len() {
            return Err(PyValueError::new_err(
                "txn_ids and item_ids must have the same length",
            ));
        }
        // Validate the whole chunk before touching state: a malformed id
        // rejects the run without leaving a half-applied chunk behind.
        let n = self.n_items;
        if let Some(&bad) = items.iter().find(|&&i| i < 0 || (i as usize) >= n) {
            return Err(PyValueError::new_err(format!(
                "item id {bad} outside [0, {n})"
            )));
        }
        self.n_rows += txns.len();
        for (&t, &i) in txns.iter().zip(items.iter()) {
            self.txns.entry(t).or_default().push(i);
        }
        Ok(())
    }

    #[getter]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    #[getter]
    pub fn n_items(&self) -> usize {
        self.n_items
    }

    #[getter]
    pub fn n_transactions(&self) -> usize {
        self.txns.len()
    }

    #[pyo3(signature = (k, parallel=false, workers=None))]
    pub fn mine(
        &self,
        k: usize,
        parallel: bool,
        workers: Option<usize>,
    ) -> PyResult<(usize, Vec<u64>, Vec<u32>, Vec<u32>)> {
        validate_k(k)?;
        let workers = worker_config(parallel, workers)?;
        if self.txns.is_empty() {
            return Ok((0, vec![], vec![], vec![]));
        }

        let mut entries: Vec<(i64, &Vec<i32>)> =
            self.txns.iter().map(|(&t, v)| (t, v)).collect();
        entries.par_sort_unstable_by_key(|&(t, _)| t);

        let n_txn = entries.len();
        let rows = entries
            .iter()
            .map(|(_, items)| items.iter().map(|&i| i as u32).collect::<Vec<u32>>());
        let results = mine_topk(rows, self.n_items, k, workers);

        let (supports, offsets, items) = flatten_results(results);
        Ok((n_txn, supports, offsets, items))
    }

    pub fn reset(&mut self) {
        self.txns.clear();
        self.txns.shrink_to_fit();
        self.n_rows = 0;
    }
}
