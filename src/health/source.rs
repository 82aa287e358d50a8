//! Loading server config lists and saving checked results

use crate::health::models::ServerHealth;
use crate::Result;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Reads and writes plain config lists, one config per line
pub struct ConfigList;

impl ConfigList {
    /// Collect configs from text
    ///
    /// Lines are trimmed; blank lines and `#` comments are skipped and
    /// repeated configs are kept only at their first occurrence. Lines are
    /// not validated here, so malformed entries still reach the checker.
    pub fn parse_string(content: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter(|line| seen.insert(*line))
            .map(str::to_string)
            .collect()
    }

    /// Collect configs from a file
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
        let content = fs::read_to_string(path)?;
        Ok(Self::parse_string(&content))
    }

    /// Write the config of each record, in order, one per line
    pub fn save_to_file<P: AsRef<Path>>(records: &[ServerHealth], path: P) -> Result<()> {
        let mut content: String = records
            .iter()
            .map(|r| r.config.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        if !content.is_empty() {
            content.push('\n');
        }

        fs::write(path, content)?;
        Ok(())
    }
}
