use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use vchain_ledger::MAX_PAGE_LIMIT;
use vchain_types::{AccountId, SchemaVersion, UserId};

use crate::error::{EngineError, EngineResult};

/// What the assembler does when some anchors cannot be resolved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanoutPolicy {
    /// The first resolution failure aborts the read.
    #[default]
    FailFast,
    /// Return what resolved, plus a per-anchor failure list.
    Partial,
}

/// Configuration shared by the chain assembler and the block builder.
///
/// Loaded from TOML; every field has a default so a file only needs to name
/// what it changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Ledger account that owns the chain.
    pub account: Option<AccountId>,
    /// Only blocks of this schema version take part in the assembled view,
    /// and new blocks are written under it.
    pub supported_version: SchemaVersion,
    /// Data-entry name prefix that marks an anchor transaction.
    pub anchor_name_prefix: String,
    /// Data-entry name written by new anchors.
    pub anchor_entry_name: String,
    /// Transactions per ledger page.
    pub page_limit: u32,
    /// Upper bound on ledger pages per read; unbounded when absent.
    pub max_pages: Option<u32>,
    /// Concurrent content resolutions.
    pub fanout_concurrency: usize,
    pub fanout_policy: FanoutPolicy,
    /// Deadline for a single resolution. A stalled fetch counts as
    /// unavailable content.
    pub resolve_timeout_ms: Option<u64>,
    /// Re-read the chain head after publishing and refuse to anchor if it moved.
    pub recheck_head_before_anchor: bool,
    /// Users treated as members before any block exists.
    pub genesis_members: Vec<UserId>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            account: None,
            supported_version: SchemaVersion::V1,
            anchor_name_prefix: "block-".into(),
            anchor_entry_name: "block-latest".into(),
            page_limit: MAX_PAGE_LIMIT,
            max_pages: None,
            fanout_concurrency: 16,
            fanout_policy: FanoutPolicy::FailFast,
            resolve_timeout_ms: None,
            recheck_head_before_anchor: true,
            genesis_members: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Defaults for the chain owned by `account`.
    pub fn for_account(account: AccountId) -> Self {
        Self {
            account: Some(account),
            ..Default::default()
        }
    }

    pub fn from_toml_str(text: &str) -> EngineResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> EngineResult<String> {
        toml::to_string_pretty(self).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Reject settings under which anchors could not be read back.
    pub fn validate(&self) -> EngineResult<()> {
        if self.anchor_name_prefix.is_empty() {
            return Err(EngineError::Config("anchor_name_prefix must not be empty".into()));
        }
        if !self.anchor_entry_name.starts_with(&self.anchor_name_prefix) {
            return Err(EngineError::Config(format!(
                "anchor_entry_name {:?} does not start with anchor_name_prefix {:?}",
                self.anchor_entry_name, self.anchor_name_prefix
            )));
        }
        if self.page_limit == 0 || self.page_limit > MAX_PAGE_LIMIT {
            return Err(EngineError::Config(format!(
                "page_limit must be within 1..={MAX_PAGE_LIMIT}"
            )));
        }
        if self.fanout_concurrency == 0 {
            return Err(EngineError::Config("fanout_concurrency must be positive".into()));
        }
        if self.max_pages == Some(0) {
            return Err(EngineError::Config("max_pages must be positive".into()));
        }
        Ok(())
    }

    /// The chain account, required by anything that reads or writes the chain.
    pub fn account(&self) -> EngineResult<&AccountId> {
        self.account
            .as_ref()
            .ok_or_else(|| EngineError::Config("account is not set".into()))
    }

    pub fn resolve_timeout(&self) -> Option<Duration> {
        self.resolve_timeout_ms.map(Duration::from_millis)
    }
}
