//! # Brewlab Learning Engine
//!
//! Extraction diagnosis and adaptive brew learning:
//! - Sensory score diagnosis (under / over / balanced with confidence)
//! - Per grinder + method learning of grind and time offsets
//! - Static brew catalog and recipe resolution
//! - Persistence, snapshot export/import and anonymized research data
//! - Plain-text reports for the `brewlab-le` CLI

pub mod catalog;
pub mod diagnosis;
pub mod error;
pub mod history;
pub mod learning;
pub mod params;
pub mod persistence;
pub mod pressure;
pub mod recipe;
pub mod report;
pub mod research;
pub mod session;
pub mod stats;

pub use diagnosis::{diagnose, Attribute, ExtractionState, ExtractionVerdict, SensoryScores};
pub use error::{Error, Result};
pub use history::{BrewMeasurements, BrewRecord, Selections};
pub use learning::{LearningAdjustment, LearningKey, LearningModel, LearningProfile};
pub use params::EngineParams;
pub use session::{BrewSession, FeedbackOutcome};
