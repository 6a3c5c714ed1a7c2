use crate::error::{Result, ShellError};
use nix::unistd::{AccessFlags, access};
use std::path::{Path, PathBuf};

/// Directories searched when nothing else was configured.
pub const DEFAULT_SEARCH_PATH: [&str; 2] = ["/bin", "/usr/bin"];

/// Ordered list of directories used to resolve bare program names.
///
/// Order matters: the first directory holding an executable with the requested
/// name wins. An empty list disables external execution altogether.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPath {
    dirs: Vec<PathBuf>,
}

impl Default for SearchPath {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_PATH)
    }
}

impl SearchPath {
    pub fn new<I, P>(dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            dirs: dirs.into_iter().map(Into::into).collect(),
        }
    }

    /// Replace the whole list, keeping the given order.
    pub fn replace<I, P>(&mut self, dirs: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        *self = Self::new(dirs);
    }

    pub fn clear(&mut self) {
        self.dirs.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Map a program name to a runnable path.
    ///
    /// Behavior:
    /// - A name starting with `/` or `.` is already a path and is returned as is.
    /// - With an empty list nothing resolves.
    /// - Otherwise each directory is tried in order and the first `dir/name`
    ///   that is an executable file is returned.
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        if name.starts_with('/') || name.starts_with('.') {
            return Ok(PathBuf::from(name));
        }
        if self.dirs.is_empty() {
            return Err(ShellError::PathCleared);
        }
        let found = self
            .dirs
            .iter()
            .map(|dir| dir.join(name))
            .find(|candidate| is_executable(candidate));
        match found {
            Some(path) => {
                tracing::trace!(program = name, path = %path.display(), "resolved");
                Ok(path)
            }
            None => Err(ShellError::NotFound(name.to_string())),
        }
    }
}

fn is_executable(path: &Path) -> bool {
    path.is_file() && access(path, AccessFlags::X_OK).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    fn write_program(dir: &Path, name: &str, mode: u32) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, "#!/bin/sh\nexit 0\n").expect("write program");
        fs::set_permissions(&path, fs::Permissions::from_mode(mode)).expect("chmod");
        path
    }

    #[test]
    fn test_absolute_and_relative_paths_are_returned_unchanged() {
        let sp = SearchPath::default();
        assert_eq!(sp.resolve("/bin/nonexisting").unwrap(), Path::new("/bin/nonexisting"));
        assert_eq!(sp.resolve("./foo").unwrap(), Path::new("./foo"));
        assert_eq!(sp.resolve("../bar").unwrap(), Path::new("../bar"));
    }

    #[test]
    fn test_paths_bypass_an_empty_search_path() {
        let sp = SearchPath::new(Vec::<PathBuf>::new());
        assert_eq!(sp.resolve("/bin/sh").unwrap(), Path::new("/bin/sh"));
    }

    #[test]
    fn test_single_component_found_in_search_path() {
        let sp = SearchPath::default();
        let found = sp.resolve("sh").expect("Expected to find 'sh' in /bin or /usr/bin");
        assert!(found.ends_with("sh"));
        assert!(found.starts_with("/bin") || found.starts_with("/usr/bin"));
    }

    #[test]
    fn test_single_component_not_found() {
        let sp = SearchPath::default();
        assert!(matches!(
            sp.resolve("definitely-not-a-program-gush"),
            Err(ShellError::NotFound(name)) if name == "definitely-not-a-program-gush"
        ));
    }

    #[test]
    fn test_cleared_search_path_fails_unconditionally() {
        let mut sp = SearchPath::default();
        sp.clear();
        assert!(sp.is_empty());
        assert!(matches!(sp.resolve("sh"), Err(ShellError::PathCleared)));
    }

    #[test]
    fn test_first_match_wins() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        write_program(second.path(), "tool", 0o755);
        let expected = write_program(first.path(), "tool", 0o755);

        let sp = SearchPath::new([first.path(), second.path()]);
        assert_eq!(sp.resolve("tool").unwrap(), expected);
    }

    #[test]
    fn test_non_executable_files_are_skipped() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        write_program(first.path(), "tool", 0o644);
        let expected = write_program(second.path(), "tool", 0o755);

        let sp = SearchPath::new([first.path(), second.path()]);
        assert_eq!(sp.resolve("tool").unwrap(), expected);
    }

    #[test]
    fn test_replace_keeps_the_given_order() {
        let mut sp = SearchPath::default();
        sp.replace(["/usr/local/bin", "/opt/bin", "/bin"]);
        assert_eq!(
            sp.dirs(),
            &[
                PathBuf::from("/usr/local/bin"),
                PathBuf::from("/opt/bin"),
                PathBuf::from("/bin")
            ]
        );
    }
}
