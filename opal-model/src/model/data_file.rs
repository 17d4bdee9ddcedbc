use std::{
    io::Write,
    path::{Path, PathBuf},
};

use serde::Serialize;
use tempfile::{Builder, NamedTempFile};

use super::{Config, PersistError};

/// A uniquely named file holding one serialized model.
///
/// The file is removed on drop. Removal failures are logged and otherwise
/// ignored: a stray file never invalidates a tuning run.
#[derive(Debug)]
pub(crate) struct DataFile {
    path: PathBuf,
    file: Option<NamedTempFile>,
}

impl DataFile {
    /// Writes `value` as JSON to a fresh file.
    pub(crate) fn write<T: Serialize>(value: &T, config: &Config) -> Result<Self, PersistError> {
        let mut builder = Builder::new();
        builder.prefix(config.file_prefix.as_str()).suffix(".json");

        let mut file = match &config.data_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };

        serde_json::to_writer_pretty(file.as_file_mut(), value)?;
        file.as_file_mut().flush()?;

        tracing::debug!(path = %file.path().display(), "wrote model data file");
        Ok(Self {
            path: file.path().to_path_buf(),
            file: Some(file),
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DataFile {
    fn drop(&mut self) {
        let Some(file) = self.file.take() else {
            return;
        };

        match file.close() {
            Ok(()) => tracing::debug!(path = %self.path.display(), "removed model data file"),
            Err(error) => tracing::warn!(
                path = %self.path.display(),
                %error,
                "failed to remove model data file"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    #[test]
    fn writes_then_removes() {
        let file = DataFile::write(&vec![1, 2, 3], &Config::default()).expect("file is written");
        let path = file.path().to_path_buf();

        let contents = fs::read_to_string(&path).expect("file is readable");
        let values: Vec<i32> = serde_json::from_str(&contents).expect("contents are JSON");
        assert_eq!(values, [1, 2, 3]);

        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .expect("name is UTF-8");
        assert!(name.starts_with("blackbox"));
        assert!(name.ends_with(".json"));

        drop(file);
        assert!(!path.exists());
    }

    #[test]
    fn names_are_unique() {
        let a = DataFile::write(&"a", &Config::default()).expect("file is written");
        let b = DataFile::write(&"b", &Config::default()).expect("file is written");

        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn missing_directory_fails() {
        let config = Config {
            data_dir: Some("/definitely/not/a/real/dir".into()),
            ..Config::default()
        };

        let result = DataFile::write(&1, &config);
        assert!(matches!(result, Err(PersistError::Io(_))));
    }

    #[test]
    fn file_already_gone_is_not_fatal() {
        let file = DataFile::write(&1, &Config::default()).expect("file is written");
        let path = file.path().to_path_buf();

        fs::remove_file(&path).expect("file can be removed");
        drop(file);

        assert!(!path.exists());
    }
}
