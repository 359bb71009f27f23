use pyo3::prelude::*;
use pyo3::types::PyDict;
use sidewalker_core::Error;
use sidewalker_core::loading::geojson::read_network_str;
use sidewalker_core::model::RoadSegment;
use sidewalker_core::prelude::*;
use wkt::ToWkt;

/// PedestrianNetwork
///
/// Sidewalks and crossings derived from a street network, together with the
/// pedestrian roads of the input cut at every place they meet them.
///
/// Every entity is exposed as an ``(id, class, length_km, wkt)`` tuple.
/// Lengths are in kilometers, geometry is WGS84 longitude/latitude.
///
/// Example:
///
/// .. code-block:: python
///
///     network = create_pedestrian_network(open("streets.geojson").read())
///     for id, class_, length_km, wkt in network.sidewalks():
///         ...
///     network.release()
#[pyclass(name = "PedestrianNetwork")]
pub struct PyPedestrianNetwork {
    pub(crate) network: Option<PedestrianNetwork>,
}

type EntityRow = (String, String, f64, String);

fn entity_row(id: impl ToString, class: &str, segment: &RoadSegment) -> EntityRow {
    (
        id.to_string(),
        class.to_string(),
        segment.length_km(),
        segment.geometry().to_wkt().to_string(),
    )
}

impl PyPedestrianNetwork {
    fn inner(&self) -> PyResult<&PedestrianNetwork> {
        self.network.as_ref().ok_or_else(|| {
            PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(
                "Pedestrian network has already been released",
            )
        })
    }
}

#[pymethods]
impl PyPedestrianNetwork {
    pub fn pedestrian_road_count(&self) -> PyResult<usize> {
        Ok(self.inner()?.store().pedestrian_road_count())
    }

    pub fn sidewalk_count(&self) -> PyResult<usize> {
        Ok(self.inner()?.store().sidewalk_count())
    }

    pub fn crossing_count(&self) -> PyResult<usize> {
        Ok(self.inner()?.store().crossing_count())
    }

    /// Counts and total lengths per entity kind
    pub fn stats<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let stats = self.inner()?.stats();
        let dict = PyDict::new(py);
        dict.set_item("pedestrian_roads", stats.pedestrian_roads)?;
        dict.set_item("pedestrian_km", stats.pedestrian_km)?;
        dict.set_item("sidewalks", stats.sidewalks)?;
        dict.set_item("sidewalk_km", stats.sidewalk_km)?;
        dict.set_item("merged_sidewalks", stats.merged_sidewalks)?;
        dict.set_item("official_crossings", stats.official_crossings)?;
        dict.set_item("regular_crossings", stats.regular_crossings)?;
        dict.set_item("crossing_km", stats.crossing_km)?;
        dict.set_item("duplicates_removed", stats.duplicates_removed)?;
        dict.set_item("duplicate_km", stats.duplicate_km)?;
        dict.set_item("split_pedestrian_roads", stats.reconciled.pedestrian_roads)?;
        dict.set_item("split_sidewalks", stats.reconciled.sidewalks)?;
        dict.set_item("split_crossings", stats.reconciled.crossings)?;
        Ok(dict)
    }

    pub fn pedestrian_roads(&self) -> PyResult<Vec<EntityRow>> {
        Ok(self
            .inner()?
            .pedestrian_roads()
            .map(|road| entity_row(road.id, &road.segment.class, &road.segment))
            .collect())
    }

    pub fn sidewalks(&self) -> PyResult<Vec<EntityRow>> {
        Ok(self
            .inner()?
            .sidewalks()
            .map(|sidewalk| entity_row(sidewalk.id, &sidewalk.segment.class, &sidewalk.segment))
            .collect())
    }

    /// Crossings, with the crossing type (``risk``, ``frequent`` or the
    /// tagged subtype) in place of the road class
    pub fn crossings(&self) -> PyResult<Vec<EntityRow>> {
        Ok(self
            .inner()?
            .crossings()
            .map(|crossing| {
                entity_row(crossing.id, crossing.crossing_type.as_str(), &crossing.segment)
            })
            .collect())
    }

    /// Removed duplicate sidewalks as ``(id, length_km, ratio)`` tuples
    pub fn duplicates(&self) -> PyResult<Vec<(String, f64, f64)>> {
        Ok(self
            .inner()?
            .duplicates()
            .iter()
            .map(|report| (report.sidewalk.to_string(), report.length_km, report.ratio))
            .collect())
    }

    /// GeoJSON FeatureCollection of every entity as a string
    pub fn to_geojson(&self) -> PyResult<String> {
        self.inner()?.to_geojson_string().map_err(|e| {
            PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(format!(
                "Failed to export network: {e}"
            ))
        })
    }

    /// Frees every collection. The network cannot be used afterwards.
    pub fn release(&mut self) {
        if let Some(network) = self.network.take() {
            network.release();
        }
    }

    fn __repr__(&self) -> String {
        match &self.network {
            Some(network) => {
                let stats = network.stats();
                format!(
                    "PedestrianNetwork with {} pedestrian roads, {} sidewalks and {} crossings",
                    stats.pedestrian_roads,
                    stats.sidewalks,
                    stats.official_crossings + stats.regular_crossings
                )
            }
            None => "PedestrianNetwork (released)".to_string(),
        }
    }

    fn __str__(&self) -> String {
        self.__repr__()
    }
}

fn to_py_error(e: &Error) -> PyErr {
    match e {
        Error::GeoJsonError(_) | Error::InvalidData(_) | Error::InvalidConfig(_) => {
            PyErr::new::<pyo3::exceptions::PyValueError, _>(format!("Invalid input: {e}"))
        }
        _ => PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(format!(
            "Failed to create pedestrian network: {e}"
        )),
    }
}

/// Create a pedestrian network from a GeoJSON street network
///
/// The input is a FeatureCollection of LineString ways carrying OSM tags
/// (``highway``, ``name``, ``sidewalk``, ``lanes``, ``foot``, ``area``) with
/// their source ``id`` and ``nodes``, and Point features for
/// ``highway=crossing`` nodes.
///
/// Parameters
/// ----------
/// geojson : str
///     GeoJSON text of the street network
/// standoff_m : float, default=3.0
///     Distance of sidewalks from the road centre line in meters
/// contrast_threshold : float, default=0.7
///     Share of probes a sidewalk must match to count as a duplicate
/// detect_duplicates : bool, default=True
///     Remove sidewalks duplicating mapped pedestrian roads
/// skip_invalid : bool, default=False
///     Log and skip malformed entities instead of failing
///
/// Returns
/// -------
/// PedestrianNetwork
///
/// Raises
/// ------
/// ValueError
///     If the input or the parameters are invalid
/// RuntimeError
///     If the pipeline fails
///
/// Notes
/// -----
/// The function releases the GIL during processing to allow other Python threads to continue execution.
#[pyfunction(name = "create_pedestrian_network")]
#[pyo3(signature = (geojson, standoff_m = 3.0, contrast_threshold = 0.7, detect_duplicates = true, skip_invalid = false))]
pub fn py_create_pedestrian_network(
    py: Python<'_>,
    geojson: &str,
    standoff_m: f64,
    contrast_threshold: f64,
    detect_duplicates: bool,
    skip_invalid: bool,
) -> PyResult<PyPedestrianNetwork> {
    let mut config = NetworkConfig {
        standoff_m,
        detect_duplicates,
        ..NetworkConfig::default()
    };
    config.contrast.threshold = contrast_threshold;
    if skip_invalid {
        config.error_policy = ErrorPolicy::SkipAndLog;
    }
    config.validate().map_err(|e| to_py_error(&e))?;

    py.detach(|| {
        let raw = read_network_str(geojson, config.error_policy).map_err(|e| to_py_error(&e))?;
        let network = create_pedestrian_network(raw, &config).map_err(|e| to_py_error(&e))?;
        Ok(PyPedestrianNetwork {
            network: Some(network),
        })
    })
}
