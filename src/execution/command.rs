//! Fully resolved command descriptions.

use std::path::PathBuf;

use crate::identity::Env;

/// A command ready to be launched: argv, environment and working directory.
///
/// Nothing here is interpreted further. Placeholders are already
/// substituted and the environment is the complete set the child will see.
#[derive(Debug, Clone, Default)]
pub struct Command {
    /// Program to execute (resolved against `PATH` in `env`).
    pub program: String,
    /// Arguments after the program.
    pub args: Vec<String>,
    /// The command line this argv was rendered from, if any.
    pub command_line: Option<String>,
    /// Complete child environment.
    pub env: Env,
    /// Working directory override (if any).
    pub working_dir: Option<PathBuf>,
    /// Bytes written to the child's stdin before it is closed.
    pub stdin: Option<Vec<u8>>,
}

impl Command {
    /// Create a command for `program` with a snapshot of the ambient environment.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            env: Env::ambient(),
            ..Default::default()
        }
    }

    /// Create a command that runs `command_line` through `shell flag`.
    pub fn shell(
        shell: impl Into<String>,
        flag: impl Into<String>,
        command_line: impl Into<String>,
    ) -> Self {
        let command_line = command_line.into();
        Self {
            program: shell.into(),
            args: vec![flag.into(), command_line.clone()],
            command_line: Some(command_line),
            env: Env::ambient(),
            ..Default::default()
        }
    }

    /// Append an argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set one environment variable, overriding any earlier value.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.set(key, value);
        self
    }

    /// Set several environment variables.
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env.extend(vars);
        self
    }

    /// Replace the whole environment.
    pub fn with_env(mut self, env: Env) -> Self {
        self.env = env;
        self
    }

    /// Set the working directory.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Feed `input` to the child's stdin.
    pub fn stdin(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Program followed by arguments.
    pub fn argv(&self) -> Vec<String> {
        if self.program.is_empty() {
            return Vec::new();
        }
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }

    /// Human-readable form for logs and reports.
    pub fn display_line(&self) -> String {
        match &self.command_line {
            Some(line) => line.clone(),
            None => self.argv().join(" "),
        }
    }
}
