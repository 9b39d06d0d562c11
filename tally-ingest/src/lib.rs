//! tally-ingest: provider export decoding, field mapping, and the canonical CSV format.

pub mod canonical;
pub mod decoder;
pub mod mapper;
pub mod parsers;
pub mod types;

pub use canonical::{read_canonical_csv, read_canonical_file, write_canonical_csv, write_canonical_file};
pub use decoder::{DecoderOptions, SourceDecoder};
pub use mapper::FieldMapper;
pub use types::{AlipayRow, Provider, RawProviderRow, SourceFile, WechatRow};
