//! Directory holding the uploaded spreadsheet files.
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

/// Default directory for uploaded files, relative to the working directory.
pub const DEFAULT_UPLOAD_DIR: &str = "files";

#[derive(Clone, Debug)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        UploadStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the upload directory when it does not exist yet.
    pub fn ensure(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root)
    }

    /// Stores `bytes` under the base name of `original_name`, replacing any
    /// file of that name.
    ///
    /// # Returns
    /// Tuple of (stored file name, full path)
    ///
    /// # Errors
    ///
    /// Fails with `InvalidInput` when the name has no usable base name, or
    /// with the underlying error when writing fails.
    pub fn save(&self, original_name: &str, bytes: &[u8]) -> io::Result<(String, PathBuf)> {
        let file_name = base_name(original_name).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, format!("Invalid upload file name '{}'", original_name))
        })?;
        self.ensure()?;
        let path = self.root.join(&file_name);
        fs::write(&path, bytes)?;
        tracing::debug!(file = %file_name, bytes = bytes.len(), "stored upload");
        Ok((file_name, path))
    }

    /// Removes the first stored file whose name contains `table`, ignoring
    /// case.
    ///
    /// Failures are logged and otherwise ignored.
    ///
    /// # Returns
    /// Name of the removed file, if any
    pub fn remove_matching(&self, table: &str) -> Option<String> {
        let needle = table.to_lowercase();
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(error) => {
                tracing::warn!(directory = %self.root.display(), %error, "cannot list upload directory");
                return None;
            }
        };

        let mut names = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().map(|kind| kind.is_file()).unwrap_or(false))
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .collect::<Vec<_>>();
        names.sort();

        let name = names.into_iter().find(|name| name.to_lowercase().contains(&needle))?;
        match fs::remove_file(self.root.join(&name)) {
            Ok(()) => {
                tracing::info!(file = %name, "removed upload");
                Some(name)
            }
            Err(error) => {
                tracing::warn!(file = %name, %error, "cannot remove upload");
                None
            }
        }
    }
}

/// Last path component of an uploaded file name, accepting both `/` and
/// `\` as separators.
fn base_name(original_name: &str) -> Option<String> {
    let name = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    match name {
        "" | "." | ".." => None,
        name => Some(name.to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("orders.xlsx", Some("orders.xlsx"))]
    #[case("../../etc/passwd", Some("passwd"))]
    #[case("C:\\Users\\me\\Sales Q1.ods", Some("Sales Q1.ods"))]
    #[case("dir/", None)]
    #[case("..", None)]
    #[case("", None)]
    fn test_base_name(#[case] original: &str, #[case] expected: Option<&str>) {
        assert_eq!(base_name(original).as_deref(), expected);
    }

    #[test]
    fn test_save_overwrites() {
        let directory = tempfile::tempdir().unwrap();
        let store = UploadStore::new(directory.path().join("files"));
        let (name, path) = store.save("nested/Orders.xlsx", b"first").unwrap();
        assert_eq!(name, "Orders.xlsx");
        assert_eq!(path, directory.path().join("files").join("Orders.xlsx"));

        store.save("Orders.xlsx", b"second").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"second");
    }

    #[test]
    fn test_save_rejects_directory_names() {
        let directory = tempfile::tempdir().unwrap();
        let store = UploadStore::new(directory.path());
        let error = store.save("..", b"data").unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_remove_matching() {
        let directory = tempfile::tempdir().unwrap();
        let store = UploadStore::new(directory.path());
        store.save("Sales.xlsx", b"a").unwrap();
        store.save("other.ods", b"b").unwrap();

        assert_eq!(store.remove_matching("sales"), Some("Sales.xlsx".to_owned()));
        assert!(!directory.path().join("Sales.xlsx").exists());
        assert!(directory.path().join("other.ods").exists());
        assert_eq!(store.remove_matching("sales"), None);
    }

    #[test]
    fn test_remove_matching_without_directory() {
        let directory = tempfile::tempdir().unwrap();
        let store = UploadStore::new(directory.path().join("missing"));
        assert_eq!(store.remove_matching("sales"), None);
    }
}
