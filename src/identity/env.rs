//! Ordered environment snapshots.

use std::path::{Path, PathBuf};

use crate::error::HarnessError;
use crate::Result;

/// Name of the search-path variable.
pub const PATH_VAR: &str = "PATH";

/// An ordered set of environment variables.
///
/// Setting an existing key overrides its value in place, so the last write
/// wins while the original ordering is kept. An `Env` is a value: cloning it
/// and modifying the clone never affects the original, and nothing here
/// reads or writes the environment of the running process except
/// [`Env::ambient`], which only reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Env {
    vars: Vec<(String, String)>,
}

impl Env {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the environment of the current process.
    ///
    /// Variables whose name or value is not valid UTF-8 are skipped.
    pub fn ambient() -> Self {
        std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect()
    }

    /// Set `key`, overriding any earlier value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.vars.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.vars.push((key, value)),
        }
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Set several variables in order.
    pub fn extend<I, K, V>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in vars {
            self.set(k, v);
        }
    }

    /// Get a variable.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Remove a variable, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.vars.iter().position(|(k, _)| k == key)?;
        Some(self.vars.remove(index).1)
    }

    /// Check whether a variable is set.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Iterate variables in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of variables.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Whether no variables are set.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Directories listed in `PATH`, in search order.
    pub fn search_path(&self) -> Vec<PathBuf> {
        self.get(PATH_VAR)
            .map(|path| std::env::split_paths(path).collect())
            .unwrap_or_default()
    }

    /// Put `dir` at the front of `PATH`.
    pub fn prepend_path(&mut self, dir: &Path) -> Result<()> {
        let mut dirs = vec![dir.to_path_buf()];
        dirs.extend(self.search_path());
        let joined = std::env::join_paths(dirs).map_err(|e| {
            HarnessError::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
        })?;
        let joined = joined.into_string().map_err(|_| {
            HarnessError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "search path is not valid UTF-8",
            ))
        })?;
        self.set(PATH_VAR, joined);
        Ok(())
    }

    /// Resolve `name` the way a process launched with this environment
    /// would: the first executable file called `name` on `PATH`.
    pub fn resolve_program(&self, name: &str) -> Option<PathBuf> {
        self.search_path()
            .into_iter()
            .map(|dir| dir.join(name))
            .find(|candidate| is_executable(candidate))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Env {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut env = Env::new();
        env.extend(iter);
        env
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_later_set_wins_and_keeps_order() {
        let mut env = Env::new();
        env.set("A", "1");
        env.set("B", "2");
        env.set("A", "3");

        assert_eq!(env.get("A"), Some("3"));
        let keys: Vec<_> = env.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["A", "B"]);
    }

    #[test]
    fn test_from_iter_duplicates_override() {
        let env: Env = [("HOME", "/a"), ("HOME", "/b")].into_iter().collect();
        assert_eq!(env.len(), 1);
        assert_eq!(env.get("HOME"), Some("/b"));
    }

    #[test]
    fn test_remove() {
        let mut env = Env::new().with("TOKEN", "secret");
        assert_eq!(env.remove("TOKEN"), Some("secret".to_string()));
        assert!(!env.contains_key("TOKEN"));
        assert_eq!(env.remove("TOKEN"), None);
    }

    #[test]
    fn test_clone_is_independent() {
        let base = Env::new().with("HOME", "/home/base");
        let mut derived = base.clone();
        derived.set("HOME", "/home/other");

        assert_eq!(base.get("HOME"), Some("/home/base"));
        assert_eq!(derived.get("HOME"), Some("/home/other"));
    }

    #[cfg(unix)]
    #[test]
    fn test_prepend_path() {
        let mut env = Env::new().with(PATH_VAR, "/usr/bin:/bin");
        env.prepend_path(Path::new("/tmp/shims")).unwrap();

        assert_eq!(env.get(PATH_VAR), Some("/tmp/shims:/usr/bin:/bin"));
        assert_eq!(env.search_path()[0], PathBuf::from("/tmp/shims"));
    }

    #[test]
    fn test_prepend_path_without_existing_path() {
        let mut env = Env::new();
        env.prepend_path(Path::new("/opt/tools")).unwrap();
        assert_eq!(env.search_path(), vec![PathBuf::from("/opt/tools")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_program_skips_non_executables() {
        use std::os::unix::fs::PermissionsExt;

        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        std::fs::write(first.path().join("tool"), "not executable").unwrap();
        let real = second.path().join("tool");
        std::fs::write(&real, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&real, std::fs::Permissions::from_mode(0o755)).unwrap();

        let mut env = Env::new();
        env.prepend_path(second.path()).unwrap();
        env.prepend_path(first.path()).unwrap();

        assert_eq!(env.resolve_program("tool"), Some(real));
        assert_eq!(env.resolve_program("missing"), None);
    }
}
