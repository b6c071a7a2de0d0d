//! Load-time variable environment for placeholder resolution.
//!
//! Resolution never reads the process environment directly; callers
//! capture whatever sources they want (process variables, a dotenv file,
//! test fixtures) into an [`Environment`] and pass it in. This keeps
//! manifest loading deterministic and testable.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::warn;

use berth_common::error::{BerthError, Result};

/// An immutable name to value map consulted while resolving placeholders.
///
/// A name can be present with an empty value; the `:-` placeholder form
/// treats that differently from an absent name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    /// Creates an empty environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures the current process environment.
    #[must_use]
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    /// Reads a dotenv file (`KEY=VALUE` lines, `#` comments).
    ///
    /// Values may be wrapped in single or double quotes; an optional
    /// `export ` prefix is accepted. Lines without `=` are ignored with
    /// a warning. Later assignments to the same name win.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn load_dotenv(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| BerthError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse_dotenv(&text))
    }

    fn parse_dotenv(text: &str) -> Self {
        let mut vars = BTreeMap::new();
        for (line_no, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let line = line.strip_prefix("export ").unwrap_or(line).trim_start();
            let Some((name, value)) = line.split_once('=') else {
                warn!(line = line_no + 1, "ignoring dotenv line without `=`");
                continue;
            };
            let name = name.trim();
            if name.is_empty() {
                warn!(line = line_no + 1, "ignoring dotenv line without a name");
                continue;
            }
            let _ = vars.insert(name.to_string(), unquote(value.trim()).to_string());
        }
        Self { vars }
    }

    /// Looks up a variable. `Some("")` means set-but-empty.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Returns true if the variable is set, even to an empty value.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Sets a variable, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let _ = self.vars.insert(name.into(), value.into());
    }

    /// Adds every entry of `defaults` that is not already set.
    ///
    /// Used to layer a dotenv file underneath the process environment.
    pub fn merge_missing(&mut self, defaults: &Self) {
        for (name, value) in &defaults.vars {
            if !self.vars.contains_key(name) {
                let _ = self.vars.insert(name.clone(), value.clone());
            }
        }
    }

    /// Iterates entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns true if no variables are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environment {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

fn unquote(value: &str) -> &str {
    if value.len() >= 2 {
        let bytes = value.as_bytes();
        if (bytes[0] == b'"' && bytes[value.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[value.len() - 1] == b'\'')
        {
            return &value[1..value.len() - 1];
        }
    }
    value
}
