//! tally-classify: chronological merge, keyword rules, learned associations, and the classification pipeline

pub mod classifier;
pub mod keywords;
pub mod learner;
pub mod merger;
pub mod pipeline;
pub mod summary;

pub use classifier::{ClassifySummary, Classifier, Resolution};
pub use keywords::KeywordDictionary;
pub use learner::{Association, AssociationTable, HistoricalLearner};
pub use merger::RecordMerger;
pub use pipeline::{FailurePolicy, LoadedSource, Pipeline, RunReport};
pub use summary::{CategoryTotal, summarize};
