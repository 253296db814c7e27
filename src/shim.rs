//! Stand-in executables that record how they were called.
//!
//! A [`Shim`] is an executable script in a private temporary directory. It
//! writes what it received to its output file and exits 0. Nothing here
//! changes the search path of the running process: [`Shim::env`] returns a
//! copy of an environment with the shim's directory first on `PATH`, to be
//! passed to the session that should see the shim.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::HarnessError;
use crate::identity::Env;
use crate::Result;

/// What a shim records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Capture {
    /// Space-joined arguments.
    #[default]
    Args,
    /// Arguments on the first line, then everything read from stdin.
    ArgsAndStdin,
}

/// A fake executable intercepting `name`.
#[derive(Debug)]
pub struct Shim {
    name: String,
    path: PathBuf,
    out_file: PathBuf,
    dir: PathBuf,
    tempdir: Option<TempDir>,
}

impl Shim {
    /// The command name this shim stands in for.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the shim executable.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File the shim records into.
    pub fn out_file(&self) -> &Path {
        &self.out_file
    }

    /// Directory to put first on `PATH`.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether the shim is still on disk.
    pub fn is_installed(&self) -> bool {
        self.tempdir.is_some()
    }

    /// What the most recent invocation recorded; empty if never invoked.
    pub fn recorded(&self) -> Result<String> {
        if !self.is_installed() {
            return Err(HarnessError::Shim(format!(
                "shim {} has been removed",
                self.name
            )));
        }
        Ok(std::fs::read_to_string(&self.out_file)?)
    }

    /// A copy of `base` under which `name` resolves to this shim.
    pub fn env(&self, base: &Env) -> Result<Env> {
        if !self.is_installed() {
            return Err(HarnessError::Shim(format!(
                "shim {} has been removed",
                self.name
            )));
        }
        let mut env = base.clone();
        env.prepend_path(&self.dir)?;
        Ok(env)
    }
}

impl Drop for Shim {
    fn drop(&mut self) {
        remove_shim(self);
    }
}

/// Create a shim for `name` that records its arguments.
pub fn create_shim(name: &str) -> Result<Shim> {
    create_shim_with(name, Capture::Args)
}

/// Create a shim for `name` recording what `capture` selects.
pub fn create_shim_with(name: &str, capture: Capture) -> Result<Shim> {
    validate_name(name)?;

    let tempdir = tempfile::Builder::new()
        .prefix(&format!("e2e-shim-{}-", name))
        .tempdir()?;
    let dir = tempdir.path().to_path_buf();
    let path = dir.join(name);
    let out_file = dir.join(format!("{}.out", name));

    std::fs::write(&out_file, "")?;
    std::fs::write(&path, script(&out_file, capture))?;
    make_executable(&path)?;

    debug!(shim = name, path = %path.display(), "shim installed");
    Ok(Shim {
        name: name.to_string(),
        path,
        out_file,
        dir,
        tempdir: Some(tempdir),
    })
}

/// Remove `shim` from disk. Calling it again does nothing.
pub fn remove_shim(shim: &mut Shim) {
    if let Some(dir) = shim.tempdir.take() {
        match dir.close() {
            Ok(()) => debug!(shim = %shim.name, "shim removed"),
            Err(e) => warn!(shim = %shim.name, "failed to remove shim: {}", e),
        }
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains(std::path::MAIN_SEPARATOR)
        || name.contains('\0')
    {
        return Err(HarnessError::Shim(format!(
            "invalid command name {:?}",
            name
        )));
    }
    Ok(())
}

/// Single-quote `path` for sh.
fn sh_quote(path: &Path) -> String {
    format!("'{}'", path.to_string_lossy().replace('\'', r"'\''"))
}

fn script(out_file: &Path, capture: Capture) -> String {
    let out = sh_quote(out_file);
    match capture {
        Capture::Args => format!("#!/bin/sh\nprintf '%s' \"$*\" > {}\n", out),
        Capture::ArgsAndStdin => format!(
            "#!/bin/sh\nprintf '%s\\n' \"$*\" > {out}\ncat >> {out}\n",
            out = out
        ),
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Err(HarnessError::Io(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "shims need a unix shell",
    )))
}
