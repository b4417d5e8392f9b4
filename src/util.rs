use anyhow::{anyhow, Result};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

pub fn open(path: &Path, kind: &str) -> Result<File> {
    match File::open(path) {
        Err(e) => Err(anyhow!("Opening {} file `{}`: {}", kind, path.display(), e)),
        Ok(file) => Ok(file),
    }
}

/// An I/O failure and the path it happened on.
pub type PathError = (PathBuf, io::Error);

/// Attaches `path` to the error of an I/O result.
pub fn at<T>(path: &Path, result: io::Result<T>) -> std::result::Result<T, PathError> {
    result.map_err(|err| (path.to_owned(), err))
}

fn walk_error(root: &Path, err: walkdir::Error) -> PathError {
    let path = err.path().unwrap_or(root).to_owned();
    (path, io::Error::from(err))
}

/// The entries directly inside `dir`, sorted by file name.
pub fn entries(dir: &Path) -> std::result::Result<Vec<PathBuf>, PathError> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .map(|entry| entry.map(DirEntry::into_path).map_err(|err| walk_error(dir, err)))
        .collect()
}

/// Copies the tree at `from` to `to`, creating `to` and any missing
/// directories. Existing files are overwritten.
pub fn copy_dir(from: &Path, to: &Path) -> std::result::Result<(), PathError> {
    for entry in WalkDir::new(from).sort_by_file_name() {
        let entry = entry.map_err(|err| walk_error(from, err))?;
        let relative = entry.path().strip_prefix(from).unwrap_or(entry.path());
        let target = to.join(relative);
        if entry.file_type().is_dir() {
            at(&target, fs::create_dir_all(&target))?;
        } else {
            at(entry.path(), fs::copy(entry.path(), &target))?;
        }
    }
    Ok(())
}

/// Removes whatever is at `path`: a file, a symlink or a whole directory.
/// A missing path is not an error.
pub fn remove(path: &Path) -> std::result::Result<(), PathError> {
    let result = match fs::symlink_metadata(path) {
        Ok(metadata) if metadata.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    };
    at(path, result)
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copy_dir_and_remove() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join("from");
        fs::create_dir_all(from.join("nested/deeper")).unwrap();
        fs::write(from.join("a.txt"), "a").unwrap();
        fs::write(from.join("nested/deeper/b.txt"), "b").unwrap();

        let to = dir.path().join("to");
        copy_dir(&from, &to).unwrap();
        assert_eq!(fs::read_to_string(to.join("a.txt")).unwrap(), "a");
        assert_eq!(fs::read_to_string(to.join("nested/deeper/b.txt")).unwrap(), "b");

        remove(&to.join("a.txt")).unwrap();
        remove(&to.join("nested")).unwrap();
        remove(&to.join("missing")).unwrap();
        assert_eq!(fs::read_dir(&to).unwrap().count(), 0);
    }

    #[test]
    fn test_entries() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("b/nested")).unwrap();
        fs::write(dir.path().join("c.txt"), "").unwrap();
        fs::write(dir.path().join("a.txt"), "").unwrap();
        fs::write(dir.path().join("b/nested/d.txt"), "").unwrap();

        let names: Vec<_> = entries(dir.path())
            .unwrap()
            .into_iter()
            .map(|path| path.strip_prefix(dir.path()).unwrap().to_owned())
            .collect();
        assert_eq!(names, vec![PathBuf::from("a.txt"), PathBuf::from("b"), PathBuf::from("c.txt")]);

        let (path, _) = entries(&dir.path().join("nope")).unwrap_err();
        assert_eq!(path, dir.path().join("nope"));
    }

    #[test]
    fn test_copy_dir_missing_source() {
        let dir = TempDir::new().unwrap();
        let (path, _) = copy_dir(&dir.path().join("nope"), &dir.path().join("to")).unwrap_err();
        assert_eq!(path, dir.path().join("nope"));
    }

    #[test]
    fn test_open_names_the_file() {
        let err = open(Path::new("/definitely/missing.yaml"), "project").unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Opening project file `/definitely/missing.yaml`"));
    }
}
