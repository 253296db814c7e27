//! Command-line interface for e2e-harness.
//!
//! Uses lexopt for minimal binary size overhead.

use std::ffi::OsString;
use std::path::PathBuf;

/// Command-line arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// Patterns expected on stdout, in order.
    pub expect: Vec<String>,
    /// Patterns expected on stderr, in order.
    pub expect_err: Vec<String>,
    /// Expected exit code.
    pub exit_code: i32,
    /// Timeout override for each expectation and for exit, in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Run as this identity.
    pub user: Option<String>,
    /// Home directory for `user` (a private temporary one if unset).
    pub home: Option<PathBuf>,
    /// Token for `user`.
    pub token: Option<String>,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// The command line to run.
    pub command: Vec<String>,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
}

impl Args {
    /// The command words joined into one shell line.
    pub fn command_line(&self) -> String {
        self.command.join(" ")
    }
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Short('e') | Long("expect") => {
                result.expect.push(parser.value()?.parse()?);
            }
            Short('E') | Long("expect-err") => {
                result.expect_err.push(parser.value()?.parse()?);
            }
            Short('x') | Long("exit-code") => {
                let value: String = parser.value()?.parse()?;
                result.exit_code = value
                    .parse()
                    .map_err(|_| ArgsError::InvalidValue("exit-code", value))?;
            }
            Short('t') | Long("timeout-ms") => {
                let value: String = parser.value()?.parse()?;
                result.timeout_ms = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("timeout-ms", value))?,
                );
            }
            Short('u') | Long("user") => {
                result.user = Some(parser.value()?.parse()?);
            }
            Long("home") => {
                result.home = Some(parser.value()?.parse()?);
            }
            Long("token") => {
                result.token = Some(parser.value()?.parse()?);
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Value(val) => {
                // Everything from the first word on belongs to the command.
                result.command.push(val.string()?);
                for raw in parser.raw_args()? {
                    result
                        .command
                        .push(raw.into_string().map_err(|raw| {
                            ArgsError::InvalidValue("command", raw.to_string_lossy().into())
                        })?);
                }
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    if (result.home.is_some() || result.token.is_some()) && result.user.is_none() {
        return Err(ArgsError::MissingUser);
    }
    if !result.help && !result.version && result.command.is_empty() {
        return Err(ArgsError::MissingCommand);
    }

    Ok(result)
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"e2e-harness {version}
Run a command and assert on its output, the way an acceptance suite would

USAGE:
    e2e-harness [OPTIONS] [--] <COMMAND LINE>...

OPTIONS:
    -c, --config <FILE>       Path to configuration file (JSON)
    -e, --expect <REGEX>      Pattern expected on stdout (repeatable, in order)
    -E, --expect-err <REGEX>  Pattern expected on stderr (repeatable, in order)
    -x, --exit-code <N>       Expected exit code [default: 0]
    -t, --timeout-ms <MS>     Bound on each expectation and on exit
    -u, --user <NAME>         Run as this identity
        --home <DIR>          Home directory for --user [default: temporary]
        --token <TOKEN>       Token for --user
    -l, --log-level <LVL>     Log level (error, warn, info, debug, trace)
    -h, --help                Print help
    -V, --version             Print version

ENVIRONMENT VARIABLES:
    E2E_HARNESS_TIMEOUT_MS        Default expectation timeout
    E2E_HARNESS_EXIT_TIMEOUT_MS   Default exit timeout
    E2E_HARNESS_POLL_MS           Poll interval
    E2E_HARNESS_SHELL             Shell used to run the command line
    E2E_HARNESS_CONTROLLER_URL    Controller written into --user profiles
    E2E_HARNESS_LOG_LEVEL         Log level (overrides config)
    RUST_LOG                      Alternative log level setting

EXIT STATUS:
    0 all checks passed, 1 a check failed, 2 usage or startup error

EXAMPLES:
    # Expect two lines in order
    e2e-harness -e 'Creating Application' -e 'created \w+' -- deis apps:create

    # Expect a failure message and exit code
    e2e-harness -x 1 -E 'Error: 404' -- deis info -a missing

    # Run as a specific identity
    e2e-harness -u alice --token tok-123 -e 'alice' -- deis whoami
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("e2e-harness {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    Lexopt(lexopt::Error),
    /// Invalid argument value.
    InvalidValue(&'static str, String),
    /// No command line was given.
    MissingCommand,
    /// `--home` or `--token` without `--user`.
    MissingUser,
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexopt(e) => write!(f, "{}", e),
            Self::InvalidValue(name, value) => {
                write!(f, "invalid value for --{}: '{}'", name, value)
            }
            Self::MissingCommand => write!(f, "missing command line to run"),
            Self::MissingUser => write!(f, "--home and --token require --user"),
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<lexopt::Error> for ArgsError {
    fn from(e: lexopt::Error) -> Self {
        Self::Lexopt(e)
    }
}
