//! End-to-end run: normalize each source, merge, classify.

use std::path::Path;

use tally_core::{CanonicalRecord, Result, TallyError};
use tally_ingest::{SourceDecoder, SourceFile, write_canonical_file};
use tracing::warn;

use crate::classifier::{Classifier, ClassifySummary, DEFAULT_REFUND_INDICATOR};
use crate::keywords::KeywordDictionary;
use crate::learner::AssociationTable;
use crate::merger::RecordMerger;

/// What to do when one source file cannot be processed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// The first failing file aborts the run
    #[default]
    FailFast,
    /// Log the failure and continue with the remaining files
    SkipFailed,
}

/// A source file and the result of reading its bytes
#[derive(Debug)]
pub struct LoadedSource {
    pub source: SourceFile,
    pub content: std::io::Result<Vec<u8>>,
}

impl LoadedSource {
    pub fn read(source: SourceFile) -> Self {
        let content = std::fs::read(&source.path);
        Self { source, content }
    }
}

#[derive(Debug)]
pub struct RunReport {
    /// Classified records in chronological order
    pub records: Vec<CanonicalRecord>,
    pub summary: ClassifySummary,
    /// Files skipped under [`FailurePolicy::SkipFailed`]
    pub failed: Vec<(SourceFile, TallyError)>,
}

impl RunReport {
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        write_canonical_file(path, &self.records)
    }
}

pub struct Pipeline {
    decoder: SourceDecoder,
    keywords: KeywordDictionary,
    associations: AssociationTable,
    refund_indicator: String,
}

impl Pipeline {
    pub fn new(decoder: SourceDecoder, keywords: KeywordDictionary, associations: AssociationTable) -> Self {
        Self {
            decoder,
            keywords,
            associations,
            refund_indicator: DEFAULT_REFUND_INDICATOR.to_string(),
        }
    }

    pub fn with_refund_indicator(mut self, indicator: impl Into<String>) -> Self {
        self.refund_indicator = indicator.into();
        self
    }

    fn normalize(&self, input: LoadedSource) -> Result<Vec<CanonicalRecord>> {
        let bytes = input.content.map_err(|e| TallyError::io(&input.source.path, e))?;
        self.decoder
            .normalize(input.source.provider, &bytes, &input.source.display_name())
    }

    /// Process already-read sources.
    ///
    /// Alipay files come first, then WeChat Pay files, each in the order given;
    /// that order breaks timestamp ties in the merged output.
    pub fn run(&self, mut inputs: Vec<LoadedSource>, policy: FailurePolicy) -> Result<RunReport> {
        inputs.sort_by_key(|i| i.source.provider);

        let mut streams = Vec::new();
        let mut failed = Vec::new();

        for input in inputs {
            let source = input.source.clone();
            match self.normalize(input) {
                Ok(records) => streams.push(records),
                Err(e) if policy == FailurePolicy::SkipFailed => {
                    warn!("skipping {}: {}", source.path.display(), e);
                    failed.push((source, e));
                }
                Err(e) => return Err(e),
            }
        }

        let merged = RecordMerger::merge(streams);
        let classifier = Classifier::new(&self.keywords, &self.associations)
            .with_refund_indicator(self.refund_indicator.as_str());
        let (records, summary) = classifier.classify(merged);

        Ok(RunReport {
            records,
            summary,
            failed,
        })
    }

    /// Read sources from disk synchronously and process them.
    pub fn run_files(&self, sources: &[SourceFile], policy: FailurePolicy) -> Result<RunReport> {
        let inputs: Vec<LoadedSource> = sources.iter().cloned().map(LoadedSource::read).collect();
        self.run(inputs, policy)
    }
}
