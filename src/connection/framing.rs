//! Command framing for the openMHA control protocol.
//!
//! Every request is one line of ASCII text:
//!
//! ```text
//! <path>?<query>\n          e.g. mha.gain.gains?val
//! <path>?<verb>:<file>\n    e.g. mha?save:/tmp/mha.cfg
//! <path>=<value>\n          e.g. mha.gain.gains=[-5 5]
//! ?listid\n
//! ```
//!
//! Paths are trimmed of surrounding whitespace and otherwise passed through
//! untouched. An empty path addresses the root parser node.

use std::fmt;

/// A query on a node (`<path>?<query>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// `?` - the node's contents (all children with their values).
    Contents,
    /// `?val`
    Value,
    /// `?type`
    Type,
    /// `?perm`
    Permission,
    /// `?range`
    Range,
    /// `?help`
    Help,
    /// `?entries`
    Entries,
    /// `?subst`
    Substitutions,
    /// `?cmds`
    Commands,
    /// `?save:<file>` - save with comments.
    Save(String),
    /// `?saveshort:<file>` - save without comments.
    SaveShort(String),
    /// `?savemons:<file>` - save monitor variables.
    SaveMonitors(String),
    /// `?read:<file>` - read a configuration file into the node.
    Read(String),
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Contents => Ok(()),
            Query::Value => f.write_str("val"),
            Query::Type => f.write_str("type"),
            Query::Permission => f.write_str("perm"),
            Query::Range => f.write_str("range"),
            Query::Help => f.write_str("help"),
            Query::Entries => f.write_str("entries"),
            Query::Substitutions => f.write_str("subst"),
            Query::Commands => f.write_str("cmds"),
            Query::Save(file) => write!(f, "save:{}", file),
            Query::SaveShort(file) => write!(f, "saveshort:{}", file),
            Query::SaveMonitors(file) => write!(f, "savemons:{}", file),
            Query::Read(file) => write!(f, "read:{}", file),
        }
    }
}

/// A single request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Query { path: String, query: Query },
    Assign { path: String, value: String },
    ListIds,
    /// A line sent as-is (console passthrough).
    Raw(String),
}

impl Command {
    pub fn query(path: &str, query: Query) -> Self {
        Command::Query {
            path: path.trim().to_string(),
            query,
        }
    }

    pub fn assign(path: &str, value: &str) -> Self {
        Command::Assign {
            path: path.trim().to_string(),
            value: value.trim().to_string(),
        }
    }

    pub fn raw(line: &str) -> Self {
        Command::Raw(line.trim().to_string())
    }

    /// The exact bytes written to the peer, newline included.
    pub fn to_bytes(&self) -> Vec<u8> {
        format!("{}\n", self).into_bytes()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Query { path, query } => write!(f, "{}?{}", path, query),
            Command::Assign { path, value } => write!(f, "{}={}", path, value),
            Command::ListIds => f.write_str("?listid"),
            Command::Raw(line) => f.write_str(line),
        }
    }
}

/// `?perm` answers `writable` for writable variables and something else
/// (`read-only`, monitor info) otherwise.
pub fn parse_permission(payload: &[u8]) -> bool {
    payload == b"writable"
}

/// Split an `?entries` payload (`[a b c]`) into child names.
pub fn parse_entries(payload: &str) -> Vec<String> {
    let inner = payload.trim_matches(|c| c == '[' || c == ']');
    if inner.is_empty() {
        return Vec::new();
    }
    inner.split(' ').map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_lines() {
        let cases = [
            (Query::Contents, "mha?\n"),
            (Query::Value, "mha?val\n"),
            (Query::Type, "mha?type\n"),
            (Query::Permission, "mha?perm\n"),
            (Query::Range, "mha?range\n"),
            (Query::Help, "mha?help\n"),
            (Query::Entries, "mha?entries\n"),
            (Query::Substitutions, "mha?subst\n"),
            (Query::Commands, "mha?cmds\n"),
        ];
        for (query, expected) in cases {
            assert_eq!(Command::query("mha", query).to_bytes(), expected.as_bytes());
        }
    }

    #[test]
    fn test_file_verbs() {
        let file = "/tmp/x.cfg".to_string();
        assert_eq!(
            Command::query("mha", Query::Save(file.clone())).to_string(),
            "mha?save:/tmp/x.cfg"
        );
        assert_eq!(
            Command::query("mha", Query::SaveShort(file.clone())).to_string(),
            "mha?saveshort:/tmp/x.cfg"
        );
        assert_eq!(
            Command::query("mha", Query::SaveMonitors(file.clone())).to_string(),
            "mha?savemons:/tmp/x.cfg"
        );
        assert_eq!(
            Command::query("", Query::Read(file)).to_string(),
            "?read:/tmp/x.cfg"
        );
    }

    #[test]
    fn test_path_is_trimmed() {
        let cmd = Command::query("  mha.gain.gains \n", Query::Value);
        assert_eq!(cmd.to_bytes(), b"mha.gain.gains?val\n");

        let cmd = Command::assign(" cmd ", " start\n");
        assert_eq!(cmd.to_bytes(), b"cmd=start\n");
    }

    #[test]
    fn test_listid_and_raw() {
        assert_eq!(Command::ListIds.to_bytes(), b"?listid\n");
        assert_eq!(Command::raw("srate=44100\r\n").to_bytes(), b"srate=44100\n");
    }

    #[test]
    fn test_parse_permission() {
        assert!(parse_permission(b"writable"));
        assert!(!parse_permission(b"read-only"));
        assert!(!parse_permission(b"writable "));
        assert!(!parse_permission(b""));
        assert!(!parse_permission(b"monitor \xff"));
    }

    #[test]
    fn test_parse_entries() {
        assert_eq!(parse_entries("[gain identity]"), vec!["gain", "identity"]);
        assert_eq!(parse_entries("[a]"), vec!["a"]);
        assert!(parse_entries("[]").is_empty());
    }
}
