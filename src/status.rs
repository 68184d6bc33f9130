//! Parsing of `git status --porcelain` (v1) output.
//!
//! Each line is `XY <path>`, or `XY <old> -> <new>` for renames and copies,
//! where `X` is the index state and `Y` the worktree state. Paths containing
//! unusual characters are quoted as C string literals.

use std::fmt::Display;

use anyhow::Result;
use anyhow::bail;

/// State of one side (index or worktree) of a status entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Unmodified,
    Modified,
    TypeChanged,
    Added,
    Deleted,
    Renamed,
    Copied,
    Unmerged,
    Untracked,
    Ignored,
}

/// Two-character porcelain status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCode {
    pub index: FileState,
    pub worktree: FileState,
}

/// A changed path reported by `git status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub code: StatusCode,
    /// Path relative to the repository root. For renames, the new path.
    pub path: String,
}

// -----------------------------------------------------------------------------
// FileState impl

impl FileState {
    fn from_char(c: char) -> Option<Self> {
        Some(match c {
            ' ' => Self::Unmodified,
            'M' => Self::Modified,
            'T' => Self::TypeChanged,
            'A' => Self::Added,
            'D' => Self::Deleted,
            'R' => Self::Renamed,
            'C' => Self::Copied,
            'U' => Self::Unmerged,
            '?' => Self::Untracked,
            '!' => Self::Ignored,
            _ => return None,
        })
    }

    fn as_char(self) -> char {
        match self {
            Self::Unmodified => ' ',
            Self::Modified => 'M',
            Self::TypeChanged => 'T',
            Self::Added => 'A',
            Self::Deleted => 'D',
            Self::Renamed => 'R',
            Self::Copied => 'C',
            Self::Unmerged => 'U',
            Self::Untracked => '?',
            Self::Ignored => '!',
        }
    }
}

// -----------------------------------------------------------------------------
// StatusCode impl

impl StatusCode {
    pub fn parse(code: &str) -> Result<Self> {
        let mut chars = code.chars();
        let (Some(x), Some(y), None) = (chars.next(), chars.next(), chars.next()) else {
            bail!("Invalid status code {code:?}: expected two characters");
        };
        match (FileState::from_char(x), FileState::from_char(y)) {
            (Some(index), Some(worktree)) => Ok(Self { index, worktree }),
            _ => bail!("Invalid status code {code:?}"),
        }
    }

    pub fn is_rename(&self) -> bool {
        matches!(self.index, FileState::Renamed | FileState::Copied)
            || matches!(self.worktree, FileState::Renamed | FileState::Copied)
    }
}

impl Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.index.as_char(), self.worktree.as_char())
    }
}

// -----------------------------------------------------------------------------
// StatusEntry impl

impl StatusEntry {
    /// Parse one porcelain line.
    pub fn parse(line: &str) -> Result<Self> {
        let (Some(code), Some(rest)) = (line.get(..2), line.get(3..)) else {
            bail!("Invalid status line {line:?}");
        };
        if rest.is_empty() || line.as_bytes()[2] != b' ' {
            bail!("Invalid status line {line:?}");
        }
        let code = StatusCode::parse(code)?;

        let path = match rest.split_once(" -> ") {
            Some((_, new)) if code.is_rename() => new,
            _ => rest,
        };

        Ok(Self {
            code,
            path: unquote(path),
        })
    }

    /// Parse the full output of `git status --porcelain`.
    pub fn parse_all(output: &str) -> Result<Vec<Self>> {
        output
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(Self::parse)
            .collect()
    }

    /// One line of a commit message summarising this entry.
    pub fn summary(&self) -> String {
        format!("{} {}", self.code, self.path)
    }
}

/// Undo git's C-style quoting of a path, if present.
fn unquote(path: &str) -> String {
    let Some(inner) = path
        .strip_prefix('"')
        .and_then(|path| path.strip_suffix('"'))
    else {
        return path.to_string();
    };

    let mut bytes = Vec::with_capacity(inner.len());
    let mut chars = inner.bytes().peekable();
    while let Some(b) = chars.next() {
        if b != b'\\' {
            bytes.push(b);
            continue;
        }
        match chars.next() {
            Some(b'n') => bytes.push(b'\n'),
            Some(b't') => bytes.push(b'\t'),
            Some(b'r') => bytes.push(b'\r'),
            Some(b'a') => bytes.push(0x07),
            Some(b'b') => bytes.push(0x08),
            Some(b'f') => bytes.push(0x0c),
            Some(b'v') => bytes.push(0x0b),
            Some(d @ b'0'..=b'7') => {
                // Up to three octal digits.
                let mut digits = vec![d];
                while digits.len() < 3 {
                    match chars.peek() {
                        Some(&next) if (b'0'..=b'7').contains(&next) => {
                            digits.push(next);
                            chars.next();
                        }
                        _ => break,
                    }
                }
                let value = digits
                    .iter()
                    .fold(0u32, |value, digit| value * 8 + u32::from(digit - b'0'));
                match u8::try_from(value) {
                    Ok(byte) => bytes.push(byte),
                    // Out of byte range: keep the escape as written
                    Err(_) => {
                        bytes.push(b'\\');
                        bytes.extend_from_slice(&digits);
                    }
                }
            }
            Some(other) => bytes.push(other),
            None => bytes.push(b'\\'),
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}
