//! `%s` / `%d` command templates.
//!
//! Templates use a small printf-style syntax so that scenario text reads the
//! way the commands are typed:
//!
//! - `%s` takes the next argument, of any kind
//! - `%d` takes the next argument, which must be an integer
//! - `%%` is a literal `%`
//!
//! Any other verb, a trailing `%`, or a mismatch between placeholders and
//! arguments is a [`HarnessError::Template`].

use std::fmt;

use crate::error::HarnessError;
use crate::Result;

/// One template argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    /// Text, usable only with `%s`.
    Str(String),
    /// Integer, usable with `%s` or `%d`.
    Int(i64),
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Str(s) => f.write_str(s),
            Arg::Int(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for Arg {
    fn from(s: &str) -> Self {
        Arg::Str(s.to_string())
    }
}

impl From<String> for Arg {
    fn from(s: String) -> Self {
        Arg::Str(s)
    }
}

impl From<&String> for Arg {
    fn from(s: &String) -> Self {
        Arg::Str(s.clone())
    }
}

macro_rules! int_arg {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Arg {
                fn from(n: $t) -> Self {
                    Arg::Int(i64::from(n))
                }
            }
        )*
    };
}

int_arg!(i8, i16, i32, i64, u8, u16, u32);

impl From<usize> for Arg {
    fn from(n: usize) -> Self {
        i64::try_from(n)
            .map(Arg::Int)
            .unwrap_or_else(|_| Arg::Str(n.to_string()))
    }
}

/// Build a `Vec<Arg>` from mixed values.
///
/// ```
/// use e2e_harness::{args, identity::Arg};
///
/// let name = String::from("demo");
/// let args = args![name, 3];
/// assert_eq!(args, vec![Arg::Str("demo".into()), Arg::Int(3)]);
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::identity::Arg>::new()
    };
    ($($arg:expr),+ $(,)?) => {
        vec![$($crate::identity::Arg::from($arg)),+]
    };
}

enum Piece<'a> {
    Literal(&'a str),
    Percent,
    Any,
    Int,
}

fn parse(template: &str) -> Result<Vec<Piece<'_>>> {
    let mut pieces = Vec::new();
    let mut literal_start = 0;
    let mut chars = template.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c != '%' {
            continue;
        }
        if literal_start < i {
            pieces.push(Piece::Literal(&template[literal_start..i]));
        }
        let piece = match chars.next() {
            Some((_, 's')) => Piece::Any,
            Some((_, 'd')) => Piece::Int,
            Some((_, '%')) => Piece::Percent,
            Some((_, other)) => {
                return Err(HarnessError::Template(format!(
                    "unsupported verb %{} at byte {} in {:?}",
                    other, i, template
                )))
            }
            None => {
                return Err(HarnessError::Template(format!(
                    "dangling % at end of {:?}",
                    template
                )))
            }
        };
        pieces.push(piece);
        literal_start = chars.peek().map(|(j, _)| *j).unwrap_or(template.len());
    }
    if literal_start < template.len() {
        pieces.push(Piece::Literal(&template[literal_start..]));
    }
    Ok(pieces)
}

/// Number of argument placeholders in `template`.
pub fn placeholder_count(template: &str) -> Result<usize> {
    Ok(parse(template)?
        .iter()
        .filter(|p| matches!(p, Piece::Any | Piece::Int))
        .count())
}

/// Substitute `args` into `template`.
pub fn format(template: &str, args: &[Arg]) -> Result<String> {
    let pieces = parse(template)?;
    let expected = pieces
        .iter()
        .filter(|p| matches!(p, Piece::Any | Piece::Int))
        .count();
    if expected != args.len() {
        return Err(HarnessError::Template(format!(
            "{:?} has {} placeholder(s) but {} argument(s) were given",
            template,
            expected,
            args.len()
        )));
    }

    let mut out = String::with_capacity(template.len());
    let mut args = args.iter().enumerate();
    for piece in pieces {
        match piece {
            Piece::Literal(text) => out.push_str(text),
            Piece::Percent => out.push('%'),
            Piece::Any => {
                if let Some((_, arg)) = args.next() {
                    out.push_str(&arg.to_string());
                }
            }
            Piece::Int => match args.next() {
                Some((_, Arg::Int(n))) => out.push_str(&n.to_string()),
                Some((index, Arg::Str(s))) => {
                    return Err(HarnessError::Template(format!(
                        "argument {} for %d in {:?} is not an integer: {:?}",
                        index + 1,
                        template,
                        s
                    )))
                }
                None => {}
            },
        }
    }
    Ok(out)
}
