use pyo3::prelude::*;

use network::{PyPedestrianNetwork, py_create_pedestrian_network};

pub mod network;

/// A Python module implemented in Rust.
#[pymodule]
fn sidewalker(m: &Bound<'_, PyModule>) -> PyResult<()> {
    pyo3_log::init();

    m.add_class::<PyPedestrianNetwork>()?;
    m.add_function(wrap_pyfunction!(py_create_pedestrian_network, m)?)?;
    Ok(())
}
