//! Plug-in identifier listings (`?listid`).
//!
//! The peer answers `?listid` with one `path = identifier` line per plug-in
//! that was given an id:
//!
//! ```text
//! mha.transducers.mhachain.left = beamformer
//! mha.transducers.mhachain.right = beamformer
//! ```

use std::collections::BTreeMap;

use crate::codec::CodecError;

/// A parsed `?listid` reply, in the order the peer listed it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierListing {
    entries: Vec<(String, String)>,
}

impl IdentifierListing {
    /// Parse a `?listid` payload. Blank lines are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Malformed`] for a line without ` = `.
    pub fn parse(payload: &str) -> Result<Self, CodecError> {
        let entries = payload
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                line.split_once(" = ")
                    .map(|(path, id)| (path.to_string(), id.to_string()))
                    .ok_or_else(|| {
                        CodecError::Malformed(format!("listid line without ' = ': {:?}", line))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Path → identifier. A later line for the same path wins.
    pub fn into_map(self) -> BTreeMap<String, String> {
        self.entries.into_iter().collect()
    }

    /// Every path bound to `id`, in listing order.
    pub fn paths_for(&self, id: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, bound)| bound == id)
            .map(|(path, _)| path.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_listing() {
        let listing = IdentifierListing::parse("a.b = id1\nc.d = id2\n").unwrap();
        let map = listing.clone().into_map();

        assert_eq!(map.len(), 2);
        assert_eq!(map["a.b"], "id1");
        assert_eq!(map["c.d"], "id2");
        assert_eq!(listing.paths_for("id1"), vec!["a.b".to_string()]);
        assert!(listing.paths_for("id3").is_empty());
    }

    #[test]
    fn test_shared_identifier_keeps_all_paths() {
        let listing =
            IdentifierListing::parse("mha.left = bf\nmha.right = bf\nmha.post = gain\n").unwrap();
        assert_eq!(listing.paths_for("bf"), vec!["mha.left", "mha.right"]);
    }

    #[test]
    fn test_duplicate_path_overwrites_in_map() {
        let map = IdentifierListing::parse("x = first\nx = second\n")
            .unwrap()
            .into_map();
        assert_eq!(map.len(), 1);
        assert_eq!(map["x"], "second");
    }

    #[test]
    fn test_empty_and_malformed() {
        assert!(IdentifierListing::parse("").unwrap().is_empty());
        assert!(matches!(
            IdentifierListing::parse("mha.gain\n"),
            Err(CodecError::Malformed(_))
        ));
    }
}
