//! Synheart Stress - On-device stress level classification
//!
//! Classifies self-reported lifestyle metrics (age, occupation, device, phone
//! and social media use, productivity, sleep, app count, caffeine, weekend
//! screen time) into one of three stress levels with a k-nearest-neighbors
//! lookup against a training set exported by an offline trainer.
//!
//! Pipeline: model artifact → Model → normalization → distance scan →
//! neighbor selection → majority vote → prediction.
//!
//! ## Modules
//!
//! - **Model**: Load and validate the trainer's JSON artifact
//! - **Classifier**: Normalize a record and vote among the 15 nearest neighbors

pub mod classifier;
pub mod encoder;
pub mod error;
pub mod knn;
pub mod model;
pub mod normalizer;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use classifier::{classify, evaluate, StressClassifier};
pub use error::StressError;
pub use knn::K_NEIGHBORS;
pub use model::Model;
pub use types::{Prediction, RawRecord, StressLevel};

/// Library version embedded in all reports
pub const STRESS_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "synheart-stress";
