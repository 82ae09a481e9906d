//! Stress classification
//!
//! This module provides the public API for Synheart Stress. A prediction runs
//! through four stages:
//! 1. FeatureNormalizer - Scale the raw record into an 11-component vector
//! 2. Distance - Euclidean distance to every training point
//! 3. Neighbor selection - Keep the 15 nearest
//! 4. Majority vote - First-seen label wins ties
//!
//! The model is always passed in explicitly; nothing here holds global state.

use std::path::Path;

use crate::encoder::PredictionEncoder;
use crate::error::StressError;
use crate::knn::{nearest_neighbors, vote, K_NEIGHBORS};
use crate::model::{parse_training_row, Model};
use crate::normalizer::FeatureNormalizer;
use crate::types::{EvaluationReport, FeatureVector, Prediction, RawRecord};

/// Row cap applied by the CLI when evaluating a hold-out set
pub const DEFAULT_EVALUATION_LIMIT: usize = 1000;

/// Classify a raw record against a loaded model.
///
/// # Errors
/// * `EmptyTrainingSetError` if the model has no training rows
/// * `InvalidInputError` if a numeric field is NaN or infinite
///
/// # Example
/// ```ignore
/// let model = Model::from_path("model.json")?;
/// let prediction = classify(&record, &model)?;
/// println!("{}", prediction.level);
/// ```
pub fn classify(record: &RawRecord, model: &Model) -> Result<Prediction, StressError> {
    if model.is_empty() {
        return Err(StressError::EmptyTrainingSetError);
    }

    // Stage 1: Normalize
    let features = FeatureNormalizer::normalize(record, model)?;

    classify_vector(features, model)
}

/// Classify an already-normalized feature vector (stages 2-4)
pub fn classify_vector(features: FeatureVector, model: &Model) -> Result<Prediction, StressError> {
    // Stages 2 and 3: Rank the training set and keep the nearest
    let neighbors = nearest_neighbors(&features, model.training_set(), K_NEIGHBORS);

    // Stage 4: Vote
    let (level, votes) = vote(&neighbors).ok_or(StressError::EmptyTrainingSetError)?;

    log::debug!(
        "classified as {} from {} neighbors (votes: {:?})",
        level.as_str(),
        neighbors.len(),
        votes
    );

    Ok(Prediction {
        level,
        features,
        votes,
        neighbors,
    })
}

/// Measure accuracy over labeled, pre-normalized rows.
///
/// Rows use the training layout: 11 feature components followed by the
/// label. At most `limit` rows are evaluated when a limit is given.
pub fn evaluate(
    rows: &[Vec<f64>],
    model: &Model,
    limit: Option<usize>,
) -> Result<EvaluationReport, StressError> {
    if model.is_empty() {
        return Err(StressError::EmptyTrainingSetError);
    }

    let take = limit.unwrap_or(rows.len()).min(rows.len());
    let mut confusion = [[0usize; 3]; 3];
    let mut correct = 0;

    for (i, row) in rows[..take].iter().enumerate() {
        let point = parse_training_row(i, row)
            .map_err(|e| StressError::invalid_input(e.replace("training row", "test row")))?;
        let prediction = classify_vector(point.features, model)?;

        confusion[point.level.label() as usize][prediction.label() as usize] += 1;
        if prediction.level == point.level {
            correct += 1;
        }
    }

    let accuracy = if take > 0 {
        correct as f64 / take as f64
    } else {
        0.0
    };

    log::info!(
        "evaluated {} rows: {} correct ({:.2}%)",
        take,
        correct,
        accuracy * 100.0
    );

    Ok(EvaluationReport {
        evaluated: take,
        correct,
        accuracy,
        confusion,
    })
}

/// Classifier bound to one loaded model.
///
/// Construct it once at startup; a classifier cannot exist without a model
/// that loaded successfully. The model is never mutated, so a classifier can
/// be shared across threads behind an `Arc`.
pub struct StressClassifier {
    model: Model,
    encoder: PredictionEncoder,
}

impl StressClassifier {
    /// Create a classifier around an already-loaded model
    pub fn new(model: Model) -> Self {
        Self {
            model,
            encoder: PredictionEncoder::new(),
        }
    }

    /// Load the model from a file and create a classifier
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, StressError> {
        Ok(Self::new(Model::from_path(path)?))
    }

    /// Load the model from JSON and create a classifier
    pub fn from_json(json: &str) -> Result<Self, StressError> {
        Ok(Self::new(Model::from_json(json)?))
    }

    /// Use a specific encoder for JSON reports
    pub fn with_encoder(mut self, encoder: PredictionEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Classify one record
    pub fn classify(&self, record: &RawRecord) -> Result<Prediction, StressError> {
        classify(record, &self.model)
    }

    /// Parse a record from JSON, classify it, and return the report JSON
    pub fn classify_json(&self, record_json: &str) -> Result<String, StressError> {
        let record = RawRecord::from_json(record_json)?;
        let prediction = self.classify(&record)?;
        self.encoder.encode_to_json(&prediction)
    }

    /// Classify several records; each result stands alone
    pub fn classify_batch(&self, records: &[RawRecord]) -> Vec<Result<Prediction, StressError>> {
        records.iter().map(|r| self.classify(r)).collect()
    }

    /// Measure accuracy over labeled, pre-normalized rows
    pub fn evaluate(
        &self,
        rows: &[Vec<f64>],
        limit: Option<usize>,
    ) -> Result<EvaluationReport, StressError> {
        evaluate(rows, &self.model, limit)
    }
}
