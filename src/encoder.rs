//! Report encoding
//!
//! This module wraps a prediction into the JSON report handed to hosts,
//! adding producer metadata and the computation timestamp.

use chrono::Utc;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::StressError;
use crate::types::{Feature, Prediction, ReportPrediction, ReportProducer, StressReport};
use crate::{PRODUCER_NAME, STRESS_VERSION};

/// Current report schema version
pub const REPORT_VERSION: &str = "1.0.0";

/// Encoder for prediction reports
pub struct PredictionEncoder {
    instance_id: String,
    include_features: bool,
}

impl Default for PredictionEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl PredictionEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
            include_features: true,
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self {
            instance_id,
            include_features: true,
        }
    }

    /// Leave the normalized feature map out of reports
    pub fn without_features(mut self) -> Self {
        self.include_features = false;
        self
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Encode a prediction into a report
    pub fn encode(&self, prediction: &Prediction) -> StressReport {
        let features = self.include_features.then(|| {
            Feature::ORDER
                .iter()
                .map(|f| (f.as_str().to_string(), prediction.features.get(*f)))
                .collect::<BTreeMap<_, _>>()
        });

        StressReport {
            report_version: REPORT_VERSION.to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: STRESS_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            computed_at_utc: Utc::now().to_rfc3339(),
            prediction: ReportPrediction {
                label: prediction.label(),
                level: prediction.level,
                display_name: prediction.level.display_name().to_string(),
                votes: prediction.votes.clone(),
                neighbors_considered: prediction.neighbors_considered(),
                nearest_distance: prediction.nearest_distance(),
            },
            features,
        }
    }

    /// Encode to JSON string
    pub fn encode_to_json(&self, prediction: &Prediction) -> Result<String, StressError> {
        let report = self.encode(prediction);
        serde_json::to_string_pretty(&report).map_err(StressError::JsonError)
    }
}
