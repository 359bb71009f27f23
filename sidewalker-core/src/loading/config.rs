use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::Error;

/// What to do when a single input entity is malformed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Abort the whole run with the error
    #[default]
    FailFast,
    /// Log the entity id and continue without it
    SkipAndLog,
}

impl ErrorPolicy {
    /// Applies the policy to the outcome of one entity-level operation.
    ///
    /// Entity-local failures become `Ok(None)` under
    /// [`ErrorPolicy::SkipAndLog`]; everything else is passed through.
    pub(crate) fn absorb<T>(
        self,
        result: Result<T, Error>,
        entity: impl Display,
    ) -> Result<Option<T>, Error> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(e) if self == ErrorPolicy::SkipAndLog && e.is_entity_local() => {
                log::warn!("Skipping {entity}: {e}");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// Duplicate detector settings, distances in meters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContrastConfig {
    pub sample_step_m: f64,
    pub probe_half_length_m: f64,
    pub min_span_m: f64,
    pub threshold: f64,
    pub orientation_tolerance_deg: f64,
    pub nearest_tolerance_m: f64,
}

impl Default for ContrastConfig {
    fn default() -> Self {
        ContrastConfig {
            sample_step_m: 10.0,
            probe_half_length_m: 15.0,
            min_span_m: 50.0,
            threshold: 0.7,
            orientation_tolerance_deg: 15.0,
            nearest_tolerance_m: 0.05,
        }
    }
}

/// Regular crossing settings, distances in meters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossingConfig {
    pub spacing_m: f64,
    pub min_span_m: f64,
    pub split_sidewalks: bool,
    /// Road classes whose regular crossings are typed `risk`
    pub risk_classes: Vec<String>,
}

impl Default for CrossingConfig {
    fn default() -> Self {
        CrossingConfig {
            spacing_m: 50.0,
            min_span_m: 50.0,
            split_sidewalks: true,
            risk_classes: [
                "motorway",
                "motorway_link",
                "trunk",
                "trunk_link",
                "primary",
                "primary_link",
                "secondary",
                "secondary_link",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl CrossingConfig {
    pub fn is_risk_class(&self, class: &str) -> bool {
        self.risk_classes.iter().any(|risk| risk == class)
    }
}

/// Configuration of one pedestrian network run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Offset of sidewalks from the road centre line
    pub standoff_m: f64,
    pub error_policy: ErrorPolicy,
    pub detect_duplicates: bool,
    pub reconcile: bool,
    pub contrast: ContrastConfig,
    pub crossings: CrossingConfig,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            standoff_m: 3.0,
            error_policy: ErrorPolicy::default(),
            detect_duplicates: true,
            reconcile: true,
            contrast: ContrastConfig::default(),
            crossings: CrossingConfig::default(),
        }
    }
}

fn positive(name: &str, value: f64) -> Result<(), Error> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!(
            "{name} must be a positive number, got {value}"
        )))
    }
}

fn non_negative(name: &str, value: f64) -> Result<(), Error> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!(
            "{name} must not be negative, got {value}"
        )))
    }
}

impl NetworkConfig {
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] naming the first offending key.
    pub fn validate(&self) -> Result<(), Error> {
        positive("standoff_m", self.standoff_m)?;

        let contrast = &self.contrast;
        positive("contrast.sample_step_m", contrast.sample_step_m)?;
        positive("contrast.probe_half_length_m", contrast.probe_half_length_m)?;
        non_negative("contrast.min_span_m", contrast.min_span_m)?;
        positive("contrast.threshold", contrast.threshold)?;
        non_negative(
            "contrast.nearest_tolerance_m",
            contrast.nearest_tolerance_m,
        )?;
        if !(0.0..=90.0).contains(&contrast.orientation_tolerance_deg) {
            return Err(Error::InvalidConfig(format!(
                "contrast.orientation_tolerance_deg must be within [0, 90], got {}",
                contrast.orientation_tolerance_deg
            )));
        }

        positive("crossings.spacing_m", self.crossings.spacing_m)?;
        non_negative("crossings.min_span_m", self.crossings.min_span_m)?;
        Ok(())
    }
}
