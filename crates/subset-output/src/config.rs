//! Configuration for output assembly.

use serde::{Deserialize, Serialize};

/// Configuration for the output assembler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Prefix for working directory and archive names. The full name is
    /// `{prefix}_{request_id}`.
    #[serde(default = "default_archive_prefix")]
    pub archive_prefix: String,

    /// Keep the working directory after the archive is written, for
    /// inspecting the raw output files. The default removes it.
    #[serde(default)]
    pub keep_workdir: bool,
}

fn default_archive_prefix() -> String {
    "subset".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            archive_prefix: default_archive_prefix(),
            keep_workdir: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OutputConfig::default();
        assert_eq!(config.archive_prefix, "subset");
        assert!(!config.keep_workdir);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: OutputConfig = serde_json::from_str(r#"{"keep_workdir": true}"#).unwrap();
        assert_eq!(config.archive_prefix, "subset");
        assert!(config.keep_workdir);
    }
}
