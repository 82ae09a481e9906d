//! Model loading
//!
//! This module reads the model artifact exported by the offline trainer and
//! turns it into an immutable [`Model`]:
//! - Min/max ranges for the eight continuous features
//! - Ordinal code maps for gender, occupation, and device
//! - The normalized training set, with features and labels split apart
//!
//! Any deviation from the artifact contract fails with `ModelLoadError`; no
//! defaults are guessed and no partial model is returned.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Read;
use std::path::Path;

use crate::error::StressError;
use crate::types::{
    Feature, FeatureVector, StressLevel, TrainingPoint, FEATURE_COUNT, TRAINING_ROW_LEN,
};

/// Observed minimum and maximum of a continuous feature
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// A range whose bounds coincide; every value normalizes to 0
    pub fn is_degenerate(&self) -> bool {
        self.max == self.min
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Ranges for every continuous feature
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRanges {
    pub age: Range,
    pub daily_phone: Range,
    pub social_media: Range,
    pub productivity: Range,
    pub sleep: Range,
    pub apps: Range,
    pub caffeine: Range,
    pub weekend_screen: Range,
}

impl FeatureRanges {
    /// Range for a continuous feature; `None` for categorical features
    pub fn get(&self, feature: Feature) -> Option<Range> {
        match feature {
            Feature::Age => Some(self.age),
            Feature::DailyPhone => Some(self.daily_phone),
            Feature::SocialMedia => Some(self.social_media),
            Feature::Productivity => Some(self.productivity),
            Feature::Sleep => Some(self.sleep),
            Feature::Apps => Some(self.apps),
            Feature::Caffeine => Some(self.caffeine),
            Feature::WeekendScreen => Some(self.weekend_screen),
            Feature::Gender | Feature::Occupation | Feature::Device => None,
        }
    }

    fn iter(&self) -> impl Iterator<Item = (Feature, Range)> + '_ {
        Feature::ORDER
            .iter()
            .filter_map(move |f| self.get(*f).map(|r| (*f, r)))
    }

    fn validate(&self) -> Result<(), StressError> {
        for (feature, range) in self.iter() {
            if !range.min.is_finite() || !range.max.is_finite() {
                return Err(StressError::model_load(format!(
                    "range for {} is not finite",
                    feature.as_str()
                )));
            }
            if range.min > range.max {
                return Err(StressError::model_load(format!(
                    "range for {} has min {} greater than max {}",
                    feature.as_str(),
                    range.min,
                    range.max
                )));
            }
        }
        Ok(())
    }
}

/// Ordinal codes assigned to the values of one categorical feature
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CategoryMap {
    codes: HashMap<String, u32>,
}

impl CategoryMap {
    /// Build a map, requiring codes to be dense and start at 0
    pub fn new(codes: HashMap<String, u32>) -> Result<Self, StressError> {
        check_dense(&codes).map_err(StressError::model_load)?;
        Ok(Self { codes })
    }

    /// Ordinal code for a value. Unknown values map to 0, the base category.
    pub fn code(&self, value: &str) -> u32 {
        self.codes.get(value).copied().unwrap_or(0)
    }

    pub fn contains(&self, value: &str) -> bool {
        self.codes.contains_key(value)
    }

    /// Number of distinct categories
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Divisor that rescales codes onto [0, 1]: `max(len - 1, 1)`
    pub fn scale(&self) -> f64 {
        self.len().saturating_sub(1).max(1) as f64
    }

    /// Category names sorted by code
    pub fn names(&self) -> Vec<&str> {
        let mut entries: Vec<(&str, u32)> =
            self.codes.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        entries.sort_by_key(|(_, code)| *code);
        entries.into_iter().map(|(name, _)| name).collect()
    }
}

fn check_dense(codes: &HashMap<String, u32>) -> Result<(), String> {
    let mut seen: Vec<u32> = codes.values().copied().collect();
    seen.sort_unstable();
    let dense = seen.iter().enumerate().all(|(i, code)| *code as usize == i);
    if dense {
        Ok(())
    } else {
        Err(format!(
            "category codes must be dense and start at 0, got {seen:?}"
        ))
    }
}

/// The three categorical code maps
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CategoryMaps {
    pub gender: CategoryMap,
    pub occupation: CategoryMap,
    pub device: CategoryMap,
}

impl CategoryMaps {
    /// Code map for a categorical feature; `None` for continuous features
    pub fn get(&self, feature: Feature) -> Option<&CategoryMap> {
        match feature {
            Feature::Gender => Some(&self.gender),
            Feature::Occupation => Some(&self.occupation),
            Feature::Device => Some(&self.device),
            _ => None,
        }
    }
}

/// Loaded KNN model: read-only after construction
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    ranges: FeatureRanges,
    categories: CategoryMaps,
    training_set: Vec<TrainingPoint>,
}

impl Model {
    /// Assemble a model from parsed parts, validating ranges and rows.
    ///
    /// Every training row must hold exactly 11 finite feature components
    /// followed by an integral label in {0, 1, 2}.
    pub fn new(
        ranges: FeatureRanges,
        categories: CategoryMaps,
        training_rows: Vec<Vec<f64>>,
    ) -> Result<Self, StressError> {
        ranges.validate()?;

        let training_set = training_rows
            .iter()
            .enumerate()
            .map(|(i, row)| parse_training_row(i, row))
            .collect::<Result<Vec<_>, _>>()
            .map_err(StressError::model_load)?;

        Ok(Self {
            ranges,
            categories,
            training_set,
        })
    }

    /// Load a model from the trainer's JSON export
    pub fn from_json(json: &str) -> Result<Self, StressError> {
        let artifact: ModelArtifact = serde_json::from_str(json)
            .map_err(|e| StressError::model_load(format!("malformed model artifact: {e}")))?;
        artifact.into_model()
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, StressError> {
        let artifact: ModelArtifact = serde_json::from_slice(bytes)
            .map_err(|e| StressError::model_load(format!("malformed model artifact: {e}")))?;
        artifact.into_model()
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, StressError> {
        let artifact: ModelArtifact = serde_json::from_reader(reader)
            .map_err(|e| StressError::model_load(format!("malformed model artifact: {e}")))?;
        artifact.into_model()
    }

    /// Load a model from a file. This is the only blocking step; run it once
    /// before serving predictions.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, StressError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| {
            StressError::model_load(format!("cannot read {}: {e}", path.display()))
        })?;
        let model = Self::from_slice(&bytes)?;
        log::info!(
            "loaded model from {} ({} training rows)",
            path.display(),
            model.len()
        );
        Ok(model)
    }

    pub fn ranges(&self) -> &FeatureRanges {
        &self.ranges
    }

    pub fn categories(&self) -> &CategoryMaps {
        &self.categories
    }

    pub fn training_set(&self) -> &[TrainingPoint] {
        &self.training_set
    }

    /// Number of training rows
    pub fn len(&self) -> usize {
        self.training_set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.training_set.is_empty()
    }

    /// Counts describing the model, for diagnostics
    pub fn summary(&self) -> ModelSummary {
        let mut label_counts = BTreeMap::new();
        for level in StressLevel::ALL {
            label_counts.insert(level.as_str().to_string(), 0);
        }
        for point in &self.training_set {
            *label_counts
                .entry(point.level.as_str().to_string())
                .or_insert(0) += 1;
        }

        ModelSummary {
            training_rows: self.training_set.len(),
            label_counts,
            genders: self.categories.gender.len(),
            occupations: self.categories.occupation.len(),
            devices: self.categories.device.len(),
            ranges: self.ranges,
        }
    }
}

/// Split a 12-component row into features and label
pub(crate) fn parse_training_row(index: usize, row: &[f64]) -> Result<TrainingPoint, String> {
    if row.len() != TRAINING_ROW_LEN {
        return Err(format!(
            "training row {index} has {} components, expected {TRAINING_ROW_LEN}",
            row.len()
        ));
    }

    let mut features = [0.0; FEATURE_COUNT];
    for (i, value) in row[..FEATURE_COUNT].iter().enumerate() {
        if !value.is_finite() {
            return Err(format!(
                "training row {index} component {i} is not finite"
            ));
        }
        features[i] = *value;
    }

    let raw_label = row[FEATURE_COUNT];
    let level = if raw_label.fract() == 0.0 {
        StressLevel::from_label(raw_label as i64)
    } else {
        None
    };
    let level = level.ok_or_else(|| {
        format!("training row {index} has label {raw_label}, expected 0, 1 or 2")
    })?;

    Ok(TrainingPoint {
        features: FeatureVector(features),
        level,
    })
}

/// Diagnostic view of a loaded model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSummary {
    pub training_rows: usize,
    /// Training rows per stress level
    pub label_counts: BTreeMap<String, usize>,
    pub genders: usize,
    pub occupations: usize,
    pub devices: usize,
    pub ranges: FeatureRanges,
}

// ============================================================================
// Artifact wire format
// ============================================================================

#[derive(Debug, Deserialize)]
struct ModelArtifact {
    ranges: RangesArtifact,
    #[serde(rename = "genderMap")]
    gender_map: HashMap<String, u32>,
    #[serde(rename = "occupationMap")]
    occupation_map: HashMap<String, u32>,
    #[serde(rename = "deviceMap")]
    device_map: HashMap<String, u32>,
    #[serde(rename = "trainSet", alias = "trainingSet")]
    train_set: Vec<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RangesArtifact {
    min_age: f64,
    max_age: f64,
    min_phone: f64,
    max_phone: f64,
    min_social: f64,
    max_social: f64,
    min_prod: f64,
    max_prod: f64,
    min_sleep: f64,
    max_sleep: f64,
    min_app: f64,
    max_app: f64,
    min_caff: f64,
    max_caff: f64,
    min_screen: f64,
    max_screen: f64,
}

impl From<RangesArtifact> for FeatureRanges {
    fn from(r: RangesArtifact) -> Self {
        FeatureRanges {
            age: Range::new(r.min_age, r.max_age),
            daily_phone: Range::new(r.min_phone, r.max_phone),
            social_media: Range::new(r.min_social, r.max_social),
            productivity: Range::new(r.min_prod, r.max_prod),
            sleep: Range::new(r.min_sleep, r.max_sleep),
            apps: Range::new(r.min_app, r.max_app),
            caffeine: Range::new(r.min_caff, r.max_caff),
            weekend_screen: Range::new(r.min_screen, r.max_screen),
        }
    }
}

fn category_map(name: &str, codes: HashMap<String, u32>) -> Result<CategoryMap, StressError> {
    check_dense(&codes).map_err(|e| StressError::model_load(format!("{name}: {e}")))?;
    Ok(CategoryMap { codes })
}

impl ModelArtifact {
    fn into_model(self) -> Result<Model, StressError> {
        let categories = CategoryMaps {
            gender: category_map("genderMap", self.gender_map)?,
            occupation: category_map("occupationMap", self.occupation_map)?,
            device: category_map("deviceMap", self.device_map)?,
        };
        Model::new(self.ranges.into(), categories, self.train_set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::io::Write;

    fn sample_artifact() -> Value {
        json!({
            "ranges": {
                "minAge": 18.0, "maxAge": 60.0,
                "minPhone": 0.0, "maxPhone": 12.0,
                "minSocial": 0.0, "maxSocial": 8.0,
                "minProd": 1.0, "maxProd": 10.0,
                "minSleep": 3.0, "maxSleep": 10.0,
                "minApp": 5.0, "maxApp": 60.0,
                "minCaff": 0.0, "maxCaff": 6.0,
                "minScreen": 0.0, "maxScreen": 14.0
            },
            "genderMap": {"Male": 0, "Female": 1, "Other": 2},
            "occupationMap": {"IT": 0, "Education": 1},
            "deviceMap": {"Android": 0, "iOS": 1},
            "trainSet": [
                [0.5, 0.0, 1.0, 0.0, 0.3, 0.2, 0.8, 0.6, 0.4, 0.1, 0.5, 1.0],
                [0.1, 0.5, 0.0, 1.0, 0.9, 0.9, 0.2, 0.1, 0.8, 0.7, 0.9, 2.0],
                [0.9, 1.0, 0.0, 0.0, 0.1, 0.0, 0.9, 0.9, 0.1, 0.0, 0.1, 0.0]
            ]
        })
    }

    #[test]
    fn test_load_model_from_json() {
        let model = Model::from_json(&sample_artifact().to_string()).unwrap();

        assert_eq!(model.len(), 3);
        assert_eq!(model.ranges().age, Range::new(18.0, 60.0));
        assert_eq!(model.ranges().weekend_screen, Range::new(0.0, 14.0));
        assert_eq!(model.categories().gender.code("Female"), 1);
        assert_eq!(model.categories().device.len(), 2);

        let first = model.training_set()[0];
        assert_eq!(first.level, StressLevel::Medium);
        assert_eq!(first.features.get(Feature::Age), 0.5);
        assert_eq!(first.features.get(Feature::WeekendScreen), 0.5);
    }

    #[test]
    fn test_training_set_alias() {
        let mut artifact = sample_artifact();
        let rows = artifact.as_object_mut().unwrap().remove("trainSet").unwrap();
        artifact["trainingSet"] = rows;

        let model = Model::from_json(&artifact.to_string()).unwrap();
        assert_eq!(model.len(), 3);
    }

    #[test]
    fn test_missing_required_fields_fail() {
        for field in ["ranges", "genderMap", "occupationMap", "deviceMap", "trainSet"] {
            let mut artifact = sample_artifact();
            artifact.as_object_mut().unwrap().remove(field);

            let err = Model::from_json(&artifact.to_string()).unwrap_err();
            assert!(
                matches!(err, StressError::ModelLoadError(_)),
                "missing {field} should fail"
            );
        }
    }

    #[test]
    fn test_missing_range_bound_fails() {
        let mut artifact = sample_artifact();
        artifact["ranges"].as_object_mut().unwrap().remove("maxCaff");

        let err = Model::from_json(&artifact.to_string()).unwrap_err();
        assert!(err.to_string().contains("maxCaff"));
    }

    #[test]
    fn test_malformed_artifact_fails() {
        let err = Model::from_json("not valid json").unwrap_err();
        assert!(matches!(err, StressError::ModelLoadError(_)));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_wrong_row_length_fails() {
        for row in [json!(vec![0.5; 11]), json!(vec![0.0; 13])] {
            let mut artifact = sample_artifact();
            artifact["trainSet"] = json!([row]);

            let err = Model::from_json(&artifact.to_string()).unwrap_err();
            assert!(err.to_string().contains("expected 12"));
        }
    }

    #[test]
    fn test_label_outside_domain_fails() {
        for label in [3.0, 1.5, -1.0] {
            let mut artifact = sample_artifact();
            artifact["trainSet"][0][11] = json!(label);

            let err = Model::from_json(&artifact.to_string()).unwrap_err();
            assert!(matches!(err, StressError::ModelLoadError(_)));
            assert!(err.to_string().contains("label"));
        }
    }

    #[test]
    fn test_inverted_range_fails() {
        let mut artifact = sample_artifact();
        artifact["ranges"]["minSleep"] = json!(11.0);

        let err = Model::from_json(&artifact.to_string()).unwrap_err();
        assert!(err.to_string().contains("sleep"));
    }

    #[test]
    fn test_sparse_category_codes_fail() {
        let mut artifact = sample_artifact();
        artifact["deviceMap"] = json!({"Android": 0, "iOS": 2});

        let err = Model::from_json(&artifact.to_string()).unwrap_err();
        assert!(err.to_string().contains("deviceMap"));
    }

    #[test]
    fn test_empty_training_set_loads() {
        let mut artifact = sample_artifact();
        artifact["trainSet"] = json!([]);

        let model = Model::from_json(&artifact.to_string()).unwrap();
        assert!(model.is_empty());
    }

    #[test]
    fn test_degenerate_range_is_accepted() {
        let mut artifact = sample_artifact();
        artifact["ranges"]["minCaff"] = json!(2.0);
        artifact["ranges"]["maxCaff"] = json!(2.0);

        let model = Model::from_json(&artifact.to_string()).unwrap();
        assert!(model.ranges().caffeine.is_degenerate());
    }

    #[test]
    fn test_unknown_category_defaults_to_zero() {
        let model = Model::from_json(&sample_artifact().to_string()).unwrap();
        let gender = &model.categories().gender;

        assert_eq!(gender.code("Nonexistent"), 0);
        assert!(!gender.contains("Nonexistent"));
        assert_eq!(gender.scale(), 2.0);
        assert_eq!(gender.names(), vec!["Male", "Female", "Other"]);
    }

    #[test]
    fn test_single_category_scale_is_one() {
        let map = CategoryMap::new(HashMap::from([("Only".to_string(), 0)])).unwrap();
        assert_eq!(map.scale(), 1.0);
        assert_eq!(CategoryMap::default().scale(), 1.0);
    }

    #[test]
    fn test_load_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(sample_artifact().to_string().as_bytes())
            .unwrap();

        let model = Model::from_path(file.path()).unwrap();
        assert_eq!(model.len(), 3);
    }

    #[test]
    fn test_load_from_missing_path_fails() {
        let err = Model::from_path("/nonexistent/model.json").unwrap_err();
        assert!(matches!(err, StressError::ModelLoadError(_)));
        assert!(err.to_string().contains("cannot read"));
    }

    #[test]
    fn test_summary_counts_labels() {
        let model = Model::from_json(&sample_artifact().to_string()).unwrap();
        let summary = model.summary();

        assert_eq!(summary.training_rows, 3);
        assert_eq!(summary.label_counts["low"], 1);
        assert_eq!(summary.label_counts["medium"], 1);
        assert_eq!(summary.label_counts["high"], 1);
        assert_eq!(summary.genders, 3);
        assert_eq!(summary.occupations, 2);
    }
}
