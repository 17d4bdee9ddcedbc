use std::path::PathBuf;

/// Configuration for a [`Model`](super::Model).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory holding the model's data file; the system temporary
    /// directory when `None`.
    pub data_dir: Option<PathBuf>,
    /// Prefix of the data file name. A random suffix keeps names unique.
    pub file_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            file_prefix: "blackbox".to_owned(),
        }
    }
}

impl Config {
    /// Validates the data file settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the prefix is empty or contains a path separator.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.file_prefix.is_empty() {
            return Err("file_prefix must not be empty");
        }
        if self.file_prefix.contains(['/', '\\']) {
            return Err("file_prefix must not contain path separators");
        }
        Ok(())
    }
}
