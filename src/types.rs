//! Core types for the Synheart Stress classifier
//!
//! This module defines the data structures that flow through each stage of a
//! prediction: the raw record, the normalized feature vector, training points,
//! the prediction itself, and the JSON report produced for hosts.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::StressError;

/// Number of normalized feature components in a feature vector
pub const FEATURE_COUNT: usize = 11;

/// Length of a training row: the feature components plus the trailing label
pub const TRAINING_ROW_LEN: usize = FEATURE_COUNT + 1;

/// Stress level classes produced by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StressLevel {
    Low,
    Medium,
    High,
}

impl StressLevel {
    /// All levels, indexed by their integer label
    pub const ALL: [StressLevel; 3] = [StressLevel::Low, StressLevel::Medium, StressLevel::High];

    /// Map an integer label onto a stress level
    pub fn from_label(label: i64) -> Option<Self> {
        match label {
            0 => Some(StressLevel::Low),
            1 => Some(StressLevel::Medium),
            2 => Some(StressLevel::High),
            _ => None,
        }
    }

    /// Integer label used in training rows and returned to hosts
    pub fn label(&self) -> u8 {
        match self {
            StressLevel::Low => 0,
            StressLevel::Medium => 1,
            StressLevel::High => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StressLevel::Low => "low",
            StressLevel::Medium => "medium",
            StressLevel::High => "high",
        }
    }

    /// Human-readable name shown by renderers
    pub fn display_name(&self) -> &'static str {
        match self {
            StressLevel::Low => "Low (Relaxed)",
            StressLevel::Medium => "Medium (Alert)",
            StressLevel::High => "High (Burnout risk)",
        }
    }
}

impl fmt::Display for StressLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Feature components in the order shared with the offline trainer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Age,
    Gender,
    Occupation,
    Device,
    DailyPhone,
    SocialMedia,
    Productivity,
    Sleep,
    Apps,
    Caffeine,
    WeekendScreen,
}

impl Feature {
    /// Component order of every feature vector and training row
    pub const ORDER: [Feature; FEATURE_COUNT] = [
        Feature::Age,
        Feature::Gender,
        Feature::Occupation,
        Feature::Device,
        Feature::DailyPhone,
        Feature::SocialMedia,
        Feature::Productivity,
        Feature::Sleep,
        Feature::Apps,
        Feature::Caffeine,
        Feature::WeekendScreen,
    ];

    /// Position of this feature within a feature vector
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Field name used in record JSON
    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::Age => "age",
            Feature::Gender => "gender",
            Feature::Occupation => "occupation",
            Feature::Device => "device",
            Feature::DailyPhone => "dailyPhone",
            Feature::SocialMedia => "socialMedia",
            Feature::Productivity => "productivity",
            Feature::Sleep => "sleep",
            Feature::Apps => "apps",
            Feature::Caffeine => "caffeine",
            Feature::WeekendScreen => "weekendScreen",
        }
    }

    pub fn is_categorical(&self) -> bool {
        matches!(self, Feature::Gender | Feature::Occupation | Feature::Device)
    }
}

/// Normalized, fixed-order numeric representation of a record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(pub [f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn get(&self, feature: Feature) -> f64 {
        self.0[feature.index()]
    }
}

/// A self-reported lifestyle record submitted for classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    /// Age in years
    pub age: f64,
    pub gender: String,
    pub occupation: String,
    /// Device type (e.g. "Android", "iOS")
    pub device: String,
    /// Daily phone usage (hours)
    pub daily_phone: f64,
    /// Social media usage (hours per day)
    pub social_media: f64,
    /// Self-rated work productivity score
    pub productivity: f64,
    /// Sleep (hours per night)
    pub sleep: f64,
    /// Number of apps used per day
    pub apps: f64,
    /// Caffeine intake (cups per day)
    pub caffeine: f64,
    /// Weekend screen time (hours per day)
    pub weekend_screen: f64,
}

/// A numeric form field as submitted: either a JSON number or text
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum FieldValue {
    Number(f64),
    Text(String),
}

/// Loosely-typed record input, as collected from a form
#[derive(Debug, Deserialize)]
struct RawRecordInput {
    age: Option<FieldValue>,
    gender: Option<String>,
    occupation: Option<String>,
    #[serde(alias = "device_type", alias = "deviceType")]
    device: Option<String>,
    #[serde(alias = "daily_phone", alias = "dailyPhoneHours")]
    #[serde(rename = "dailyPhone")]
    daily_phone: Option<FieldValue>,
    #[serde(alias = "social_media", alias = "socialMediaHours")]
    #[serde(rename = "socialMedia")]
    social_media: Option<FieldValue>,
    #[serde(alias = "workProductivityScore")]
    productivity: Option<FieldValue>,
    #[serde(alias = "sleepHours")]
    sleep: Option<FieldValue>,
    #[serde(alias = "appUsageCount")]
    apps: Option<FieldValue>,
    #[serde(alias = "caffeineIntakeCups")]
    caffeine: Option<FieldValue>,
    #[serde(alias = "weekend_screen", alias = "weekendScreenTimeHours")]
    #[serde(rename = "weekendScreen")]
    weekend_screen: Option<FieldValue>,
}

fn parse_number(field: Feature, value: Option<FieldValue>) -> Result<f64, StressError> {
    let number = match value {
        Some(FieldValue::Number(n)) => n,
        Some(FieldValue::Text(text)) => text.trim().parse::<f64>().map_err(|_| {
            StressError::invalid_input(format!(
                "{} must be a number, got {:?}",
                field.as_str(),
                text
            ))
        })?,
        None => {
            return Err(StressError::invalid_input(format!(
                "missing field: {}",
                field.as_str()
            )))
        }
    };
    check_finite(field, number)
}

fn parse_category(field: Feature, value: Option<String>) -> Result<String, StressError> {
    value.ok_or_else(|| StressError::invalid_input(format!("missing field: {}", field.as_str())))
}

fn check_finite(field: Feature, value: f64) -> Result<f64, StressError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(StressError::invalid_input(format!(
            "{} must be a finite number, got {}",
            field.as_str(),
            value
        )))
    }
}

impl RawRecord {
    /// Parse a record from form-style JSON.
    ///
    /// Numeric fields may be JSON numbers or numeric strings. Missing fields
    /// and values that do not parse as finite numbers are rejected with
    /// `InvalidInputError`.
    pub fn from_json(json: &str) -> Result<Self, StressError> {
        let input: RawRecordInput = serde_json::from_str(json)
            .map_err(|e| StressError::invalid_input(format!("record is not valid JSON: {e}")))?;
        Self::from_input(input)
    }

    /// Parse a record from an already-decoded JSON value
    pub fn from_value(value: serde_json::Value) -> Result<Self, StressError> {
        let input: RawRecordInput = serde_json::from_value(value)
            .map_err(|e| StressError::invalid_input(format!("record is malformed: {e}")))?;
        Self::from_input(input)
    }

    fn from_input(input: RawRecordInput) -> Result<Self, StressError> {
        Ok(Self {
            age: parse_number(Feature::Age, input.age)?,
            gender: parse_category(Feature::Gender, input.gender)?,
            occupation: parse_category(Feature::Occupation, input.occupation)?,
            device: parse_category(Feature::Device, input.device)?,
            daily_phone: parse_number(Feature::DailyPhone, input.daily_phone)?,
            social_media: parse_number(Feature::SocialMedia, input.social_media)?,
            productivity: parse_number(Feature::Productivity, input.productivity)?,
            sleep: parse_number(Feature::Sleep, input.sleep)?,
            apps: parse_number(Feature::Apps, input.apps)?,
            caffeine: parse_number(Feature::Caffeine, input.caffeine)?,
            weekend_screen: parse_number(Feature::WeekendScreen, input.weekend_screen)?,
        })
    }

    /// Reject records whose numeric fields are NaN or infinite
    pub fn validate(&self) -> Result<(), StressError> {
        for (feature, value) in self.numeric_fields() {
            check_finite(feature, value)?;
        }
        Ok(())
    }

    /// Continuous fields paired with the feature they feed
    pub fn numeric_fields(&self) -> [(Feature, f64); 8] {
        [
            (Feature::Age, self.age),
            (Feature::DailyPhone, self.daily_phone),
            (Feature::SocialMedia, self.social_media),
            (Feature::Productivity, self.productivity),
            (Feature::Sleep, self.sleep),
            (Feature::Apps, self.apps),
            (Feature::Caffeine, self.caffeine),
            (Feature::WeekendScreen, self.weekend_screen),
        ]
    }
}

/// A training row after load: features and label kept apart
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingPoint {
    pub features: FeatureVector,
    pub level: StressLevel,
}

/// A training point selected as one of the nearest neighbors
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Neighbor {
    /// Position of the point in the training set
    pub index: usize,
    pub distance: f64,
    pub level: StressLevel,
}

/// Number of neighbors voting for a level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCount {
    pub level: StressLevel,
    pub votes: usize,
}

/// Result of classifying one record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    /// Winning stress level
    pub level: StressLevel,
    /// Normalized query the neighbors were ranked against
    pub features: FeatureVector,
    /// Vote tally in first-seen order
    pub votes: Vec<VoteCount>,
    /// Neighbors that voted, nearest first
    pub neighbors: Vec<Neighbor>,
}

impl Prediction {
    /// Integer class label in {0, 1, 2}
    pub fn label(&self) -> u8 {
        self.level.label()
    }

    pub fn neighbors_considered(&self) -> usize {
        self.neighbors.len()
    }

    pub fn nearest_distance(&self) -> Option<f64> {
        self.neighbors.first().map(|n| n.distance)
    }
}

/// Accuracy of the classifier over a labeled hold-out set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Number of rows classified
    pub evaluated: usize,
    /// Rows whose prediction matched the label
    pub correct: usize,
    /// Fraction correct (0-1); 0 when nothing was evaluated
    pub accuracy: f64,
    /// Confusion matrix indexed `[actual][predicted]`
    pub confusion: [[usize; 3]; 3],
}

// ============================================================================
// Report output types
// ============================================================================

/// JSON report wrapping a prediction for hosts and the CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub computed_at_utc: String,
    pub prediction: ReportPrediction,
    /// Normalized features keyed by feature name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<std::collections::BTreeMap<String, f64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportPrediction {
    pub label: u8,
    pub level: StressLevel,
    pub display_name: String,
    pub votes: Vec<VoteCount>,
    pub neighbors_considered: usize,
    pub nearest_distance: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_record_json() -> &'static str {
        r#"{
            "age": 39,
            "gender": "Female",
            "occupation": "IT",
            "device": "Android",
            "dailyPhone": "7.5",
            "socialMedia": 3.2,
            "productivity": 6,
            "sleep": "6.5",
            "apps": 24,
            "caffeine": 2,
            "weekendScreen": 8.0
        }"#
    }

    #[test]
    fn test_feature_order_matches_indices() {
        for (i, feature) in Feature::ORDER.iter().enumerate() {
            assert_eq!(feature.index(), i);
        }
        assert!(Feature::Gender.is_categorical());
        assert!(!Feature::Sleep.is_categorical());
    }

    #[test]
    fn test_stress_level_labels() {
        for level in StressLevel::ALL {
            assert_eq!(StressLevel::from_label(level.label() as i64), Some(level));
        }
        assert_eq!(StressLevel::from_label(3), None);
        assert_eq!(StressLevel::from_label(-1), None);
        assert_eq!(StressLevel::High.to_string(), "High (Burnout risk)");
    }

    #[test]
    fn test_record_from_json_accepts_numeric_strings() {
        let record = RawRecord::from_json(sample_record_json()).unwrap();

        assert_eq!(record.age, 39.0);
        assert_eq!(record.gender, "Female");
        assert_eq!(record.daily_phone, 7.5);
        assert_eq!(record.sleep, 6.5);
        assert_eq!(record.weekend_screen, 8.0);
    }

    #[test]
    fn test_record_from_json_snake_case_aliases() {
        let json = r#"{
            "age": 25, "gender": "Male", "occupation": "Education", "device_type": "iOS",
            "daily_phone": 4, "social_media": 1, "productivity": 8, "sleep": 8,
            "apps": 10, "caffeine": 0, "weekend_screen": 3
        }"#;
        let record = RawRecord::from_json(json).unwrap();
        assert_eq!(record.device, "iOS");
        assert_eq!(record.social_media, 1.0);
    }

    #[test]
    fn test_record_from_value() {
        let value: serde_json::Value = serde_json::from_str(sample_record_json()).unwrap();
        let record = RawRecord::from_value(value).unwrap();
        assert_eq!(record, RawRecord::from_json(sample_record_json()).unwrap());
    }

    #[test]
    fn test_record_rejects_non_numeric_field() {
        let json = sample_record_json().replace("\"7.5\"", "\"abc\"");
        let err = RawRecord::from_json(&json).unwrap_err();

        assert!(matches!(err, StressError::InvalidInputError(_)));
        assert!(err.to_string().contains("dailyPhone"));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_record_rejects_missing_field() {
        let json = r#"{"age": 30, "gender": "Male", "occupation": "IT", "device": "iOS"}"#;
        let err = RawRecord::from_json(json).unwrap_err();

        assert!(matches!(err, StressError::InvalidInputError(_)));
        assert!(err.to_string().contains("missing field: dailyPhone"));
    }

    #[test]
    fn test_record_rejects_non_finite_text() {
        let json = sample_record_json().replace("\"6.5\"", "\"NaN\"");
        let err = RawRecord::from_json(&json).unwrap_err();
        assert!(err.to_string().contains("sleep"));
    }

    #[test]
    fn test_validate_rejects_infinite_value() {
        let mut record = RawRecord::from_json(sample_record_json()).unwrap();
        assert!(record.validate().is_ok());

        record.caffeine = f64::INFINITY;
        let err = record.validate().unwrap_err();
        assert!(matches!(err, StressError::InvalidInputError(_)));
    }
}
