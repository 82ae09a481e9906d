//! Feature normalization
//!
//! This module turns a raw record into the fixed-order feature vector the
//! training set was built with.
//! - Continuous features min-max scaled with the model's ranges
//! - Categorical features mapped to ordinal codes, rescaled onto [0, 1]
//! - Non-finite numeric inputs rejected

use crate::error::StressError;
use crate::model::{CategoryMap, Model, Range};
use crate::types::{Feature, FeatureVector, RawRecord, FEATURE_COUNT};

/// Min-max scale `value` into [0, 1]. A degenerate range (`max == min`)
/// yields 0. Values outside the range map outside [0, 1].
pub fn min_max(value: f64, min: f64, max: f64) -> f64 {
    if max == min {
        return 0.0;
    }
    (value - min) / (max - min)
}

/// Ordinal code of `value` divided by `max(categories - 1, 1)`.
/// Unknown values encode as the base category (0).
pub fn encode_category(map: &CategoryMap, value: &str) -> f64 {
    map.code(value) as f64 / map.scale()
}

/// Normalizer for converting raw records to feature vectors
pub struct FeatureNormalizer;

impl FeatureNormalizer {
    /// Normalize a record against a model's ranges and category maps
    pub fn normalize(record: &RawRecord, model: &Model) -> Result<FeatureVector, StressError> {
        record.validate()?;

        let ranges = model.ranges();
        let categories = model.categories();
        let mut components = [0.0; FEATURE_COUNT];

        for feature in Feature::ORDER {
            components[feature.index()] = match feature {
                Feature::Gender => encode_logged(feature, &categories.gender, &record.gender),
                Feature::Occupation => {
                    encode_logged(feature, &categories.occupation, &record.occupation)
                }
                Feature::Device => encode_logged(feature, &categories.device, &record.device),
                continuous => {
                    let value = continuous_value(record, continuous);
                    match ranges.get(continuous) {
                        Some(range) => scale_logged(continuous, range, value),
                        None => 0.0,
                    }
                }
            };
        }

        Ok(FeatureVector(components))
    }
}

fn continuous_value(record: &RawRecord, feature: Feature) -> f64 {
    match feature {
        Feature::Age => record.age,
        Feature::DailyPhone => record.daily_phone,
        Feature::SocialMedia => record.social_media,
        Feature::Productivity => record.productivity,
        Feature::Sleep => record.sleep,
        Feature::Apps => record.apps,
        Feature::Caffeine => record.caffeine,
        Feature::WeekendScreen => record.weekend_screen,
        Feature::Gender | Feature::Occupation | Feature::Device => 0.0,
    }
}

fn encode_logged(feature: Feature, map: &CategoryMap, value: &str) -> f64 {
    if !map.contains(value) {
        log::warn!(
            "unknown {} {:?}; using base category",
            feature.as_str(),
            value
        );
    }
    encode_category(map, value)
}

fn scale_logged(feature: Feature, range: Range, value: f64) -> f64 {
    if !range.contains(value) {
        log::debug!(
            "{} = {} outside training range [{}, {}]",
            feature.as_str(),
            value,
            range.min,
            range.max
        );
    }
    min_max(value, range.min, range.max)
}
