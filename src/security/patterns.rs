//! Regex based content scanner

use super::{ContentScanner, ScanVerdict};
use crate::config::SecuritySettings;
use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};

/// Scanner driven by configured block and warn patterns.
///
/// Patterns are case-insensitive. Block patterns are checked first.
pub struct PatternScanner {
    block: Vec<Regex>,
    warn: Vec<Regex>,
}

impl PatternScanner {
    pub fn new<B, W>(block: B, warn: W) -> Result<Self>
    where
        B: IntoIterator,
        B::Item: AsRef<str>,
        W: IntoIterator,
        W::Item: AsRef<str>,
    {
        Ok(Self {
            block: compile(block)?,
            warn: compile(warn)?,
        })
    }

    /// Build a scanner from settings; `None` when no pattern is configured
    pub fn from_settings(settings: &SecuritySettings) -> Result<Option<Self>> {
        if !settings.is_enabled() {
            return Ok(None);
        }
        Self::new(&settings.block_patterns, &settings.warn_patterns).map(Some)
    }

    pub fn pattern_count(&self) -> usize {
        self.block.len() + self.warn.len()
    }
}

fn compile<I>(patterns: I) -> Result<Vec<Regex>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    patterns
        .into_iter()
        .map(|p| {
            let p = p.as_ref();
            RegexBuilder::new(p)
                .case_insensitive(true)
                .build()
                .with_context(|| format!("invalid security pattern: {}", p))
        })
        .collect()
}

impl ContentScanner for PatternScanner {
    fn scan(&self, text: &str) -> ScanVerdict {
        if let Some(re) = self.block.iter().find(|re| re.is_match(text)) {
            return ScanVerdict::Block(format!("content matched block pattern '{}'", re.as_str()));
        }
        if let Some(re) = self.warn.iter().find(|re| re.is_match(text)) {
            return ScanVerdict::Warn(format!("content matched warn pattern '{}'", re.as_str()));
        }
        ScanVerdict::Allow
    }
}
