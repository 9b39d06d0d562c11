use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use tally_classify::classifier::DEFAULT_REFUND_INDICATOR;
use tally_classify::learner::DEFAULT_MIN_FREQUENCY;
use tally_classify::{HistoricalLearner, KeywordDictionary};
use tally_core::TallyError;
use tally_ingest::decoder::{DEFAULT_DIVIDER_MARKER, DEFAULT_WECHAT_SKIP_LINES};
use tally_ingest::{DecoderOptions, SourceFile};

pub const LOCAL_CONFIG_FILE: &str = "tally.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub destination_path: PathBuf,
    /// Labelled historical dataset (canonical CSV)
    pub dataset_path: Option<PathBuf>,
    /// Pre-built association table (JSON); takes precedence over `dataset_path`
    pub association_table_path: Option<PathBuf>,
    pub min_frequency: u32,
    pub refund_indicator: String,
    pub wechat_skip_lines: usize,
    pub divider_marker: String,
    pub sources: Vec<SourceFile>,
    /// keyword → category label, matched in file order
    pub keywords: toml::Table,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            destination_path: PathBuf::from("out/processed-data.csv"),
            dataset_path: None,
            association_table_path: None,
            min_frequency: DEFAULT_MIN_FREQUENCY,
            refund_indicator: DEFAULT_REFUND_INDICATOR.to_string(),
            wechat_skip_lines: DEFAULT_WECHAT_SKIP_LINES,
            divider_marker: DEFAULT_DIVIDER_MARKER.to_string(),
            sources: Vec::new(),
            keywords: toml::Table::new(),
        }
    }
}

impl Settings {
    pub fn parse(text: &str) -> Result<Self, TallyError> {
        let settings: Settings =
            toml::from_str(text).map_err(|e| TallyError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), TallyError> {
        if self.min_frequency == 0 {
            return Err(TallyError::Config("min_frequency must be at least 1".to_string()));
        }
        if self.refund_indicator.is_empty() {
            return Err(TallyError::Config("refund_indicator must not be empty".to_string()));
        }
        if self.divider_marker.is_empty() {
            return Err(TallyError::Config("divider_marker must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn keyword_dictionary(&self) -> Result<KeywordDictionary, TallyError> {
        let mut dict = KeywordDictionary::new();
        for (keyword, value) in &self.keywords {
            let label = value.as_str().ok_or_else(|| {
                TallyError::Config(format!("keyword '{keyword}' must map to a category name"))
            })?;
            dict.push(keyword.as_str(), label);
        }
        Ok(dict)
    }

    pub fn decoder_options(&self) -> DecoderOptions {
        DecoderOptions {
            divider_marker: self.divider_marker.clone(),
            wechat_skip_lines: self.wechat_skip_lines,
        }
    }

    pub fn learner(&self) -> Result<HistoricalLearner, TallyError> {
        HistoricalLearner::new(self.min_frequency)
    }
}

/// `~/.tally`, or `None` when HOME is unset
pub fn tally_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".tally"))
}

/// Settings file to use: explicit path, then ./tally.toml, then ~/.tally/config.toml.
pub fn config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    find_config(explicit, Path::new(LOCAL_CONFIG_FILE), tally_home().as_deref())
}

fn find_config(explicit: Option<&Path>, local: &Path, home: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(p) = explicit {
        if !p.exists() {
            bail!("config not found: {}", p.display());
        }
        return Ok(Some(p.to_path_buf()));
    }
    if local.exists() {
        return Ok(Some(local.to_path_buf()));
    }
    let Some(home) = home else {
        tracing::debug!("HOME is not set; skipping global settings");
        return Ok(None);
    };
    let global = home.join("config.toml");
    Ok(global.exists().then_some(global))
}

pub fn load_settings(explicit: Option<&Path>) -> Result<Settings> {
    let Some(p) = config_path(explicit)? else {
        tracing::debug!("no settings file found; using defaults");
        return Ok(Settings::default());
    };
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    let settings = Settings::parse(&s).with_context(|| format!("parse {}", p.display()))?;
    tracing::debug!("loaded settings from {}", p.display());
    Ok(settings)
}

pub fn init_config(path: &Path) -> Result<()> {
    if path.exists() {
        println!("Config already exists: {}", path.display());
        return Ok(());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG).with_context(|| format!("write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# tally settings

destination_path = "out/processed-data.csv"

# Previously categorized output used to learn counterparty/item associations.
# dataset_path = "data/history.csv"

# Or load a table written by `tally learn`.
# association_table_path = "data/associations.json"

# Observations needed before a counterparty/item pair is trusted.
min_frequency = 3

# Uncounted rows are dropped unless their item contains this text.
refund_indicator = "退款"

# Metadata lines before the WeChat Pay header row.
wechat_skip_lines = 16

# Prefix of the lines framing the Alipay table.
divider_marker = "------------"

# [[sources]]
# provider = "alipay"
# path = "data/alipay_record.csv"
#
# [[sources]]
# provider = "wechat"
# path = "data/wechat_record.csv"

# First keyword found in the item text wins. Values: dining, housing,
# transport, living, entertainment, social-obligations, transactions,
# gifts, travel, salary (or 餐饮 住房 交通 生活 娱乐 人情 交易 礼物 旅行 工资).
[keywords]
"超市" = "living"
"地铁" = "transport"
"电影" = "entertainment"
"#;
