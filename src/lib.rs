use mimalloc::MiMalloc;
use pyo3::prelude::*;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

pub mod expand;
pub mod heap;
pub mod miner;
pub mod partition;
pub mod ptf;
pub mod vertical;

pub use heap::TopKHeap;
pub use ptf::mine_topk;
pub use vertical::VerticalIndex;

#[pymodule]
fn _ptfk(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(ptf::ptf_from_dense, m)?)?;
    m.add_function(wrap_pyfunction!(ptf::ptf_from_csr, m)?)?;
    m.add_class::<miner::TopKMiner>()?;
    Ok(())
}
