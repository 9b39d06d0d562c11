//! Byte-to-row decoding for every provider.

use std::path::Path;

use tally_core::{CanonicalRecord, Result, TallyError};
use tracing::{debug, info};

use crate::mapper::FieldMapper;
use crate::parsers::{self, alipay, wechat};
use crate::types::{Provider, RawProviderRow, SourceFile};

/// Default number of metadata lines before the WeChat Pay header row
pub const DEFAULT_WECHAT_SKIP_LINES: usize = 16;
/// Default prefix of the lines framing the Alipay table
pub const DEFAULT_DIVIDER_MARKER: &str = "------------";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderOptions {
    pub divider_marker: String,
    pub wechat_skip_lines: usize,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            divider_marker: DEFAULT_DIVIDER_MARKER.to_string(),
            wechat_skip_lines: DEFAULT_WECHAT_SKIP_LINES,
        }
    }
}

/// Turns provider export bytes into rows and canonical records.
#[derive(Debug, Clone, Default)]
pub struct SourceDecoder {
    options: DecoderOptions,
    mapper: FieldMapper,
}

impl SourceDecoder {
    pub fn new(options: DecoderOptions) -> Self {
        Self {
            options,
            mapper: FieldMapper,
        }
    }

    /// Decode raw bytes into provider rows.
    pub fn decode(&self, provider: Provider, bytes: &[u8], source_name: &str) -> Result<Vec<RawProviderRow>> {
        let rows = match provider {
            Provider::Alipay => {
                let table = alipay::decode_table(bytes, &self.options.divider_marker, source_name)?;
                parsers::parse_table(table.as_bytes(), source_name)?
                    .into_iter()
                    .map(RawProviderRow::Alipay)
                    .collect::<Vec<_>>()
            }
            Provider::Wechat => {
                let table = wechat::decode_table(bytes, self.options.wechat_skip_lines, source_name)?;
                parsers::parse_table(table.as_bytes(), source_name)?
                    .into_iter()
                    .map(RawProviderRow::Wechat)
                    .collect::<Vec<_>>()
            }
        };
        debug!("{}: decoded {} {} rows", source_name, rows.len(), provider);
        Ok(rows)
    }

    /// Decode and map bytes. Either every row is produced or an error is returned.
    pub fn normalize(&self, provider: Provider, bytes: &[u8], source_name: &str) -> Result<Vec<CanonicalRecord>> {
        let rows = self.decode(provider, bytes, source_name)?;
        let records = self.mapper.map_all(rows, source_name)?;
        info!("{}: {} {} records", source_name, records.len(), provider);
        Ok(records)
    }

    /// Read a source file from disk and normalize it.
    pub fn read_source(&self, source: &SourceFile) -> Result<Vec<CanonicalRecord>> {
        let bytes = read_bytes(&source.path)?;
        self.normalize(source.provider, &bytes, &source.display_name())
    }
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| TallyError::io(path, e))
}
