use serde::{Deserialize, Serialize};
use validator::Validate;

/// Descriptor of one remote file offered by a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteItem {
    /// File name as listed by the feed.
    pub name: String,
    /// Sortable watermark identifier extracted from the name. Identifiers
    /// are fixed-width and date-like, so lexicographic order is
    /// chronological order.
    pub ident: String,
}

impl RemoteItem {
    pub fn new(name: impl Into<String>, ident: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ident: ident.into(),
        }
    }
}

/// One remote file group: a wildcard name pattern plus where the files live
/// on the feed and which local folder they land in.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FilePattern {
    /// `*`/`?` wildcard pattern matched against listed file names,
    /// e.g. `VNXZ32.*0000.zip`.
    #[validate(length(min = 1))]
    pub pattern: String,

    /// Subdirectory of the feed offering the files; empty means the feed
    /// root.
    #[serde(default)]
    pub parent: String,

    /// Local folder name the files land in.
    #[validate(length(min = 1))]
    pub folder: String,
}

impl FilePattern {
    pub fn new(pattern: &str, parent: &str, folder: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            parent: parent.to_string(),
            folder: folder.to_string(),
        }
    }
}
