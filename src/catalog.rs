use std::{path::Path, sync::Arc};

use crate::foundation::error::{CollabError, CollabResult};

/// One partner logo: where the image comes from and where clicking it leads.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct LogoEntry {
    pub source: String,
    pub href: String,
}

impl LogoEntry {
    pub fn new(source: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            href: href.into(),
        }
    }
}

/// Immutable, ordered list of logos. Cloning shares the underlying list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogoCatalog {
    entries: Arc<[LogoEntry]>,
}

impl LogoCatalog {
    pub fn new(entries: Vec<LogoEntry>) -> CollabResult<Self> {
        for (i, e) in entries.iter().enumerate() {
            if e.source.trim().is_empty() {
                return Err(CollabError::validation(format!(
                    "logo {i}: source must be non-empty"
                )));
            }
            if e.href.trim().is_empty() {
                return Err(CollabError::validation(format!(
                    "logo {i}: href must be non-empty"
                )));
            }
        }
        Ok(Self {
            entries: entries.into(),
        })
    }

    /// The seven partners shipped with the strip.
    pub fn partners() -> Self {
        const PARTNERS: [(&str, &str); 7] = [
            (
                "https://upload.wikimedia.org/wikipedia/commons/c/c7/Ford-Motor-Company-Logo.png",
                "https://www.ford.com/",
            ),
            (
                "https://upload.wikimedia.org/wikipedia/commons/1/13/Kia-logo.png",
                "https://www.kia.com/",
            ),
            (
                "https://upload.wikimedia.org/wikipedia/commons/9/96/Microsoft_logo_%282012%29.svg",
                "https://microsoft.com/",
            ),
            (
                "https://upload.wikimedia.org/wikipedia/tr/b/b1/Puma_Logo.png",
                "https://puma.com/",
            ),
            (
                "https://upload.wikimedia.org/wikipedia/commons/thumb/e/e3/Udemy_logo.svg/1024px-Udemy_logo.svg.png",
                "https://www.udemy.com/",
            ),
            (
                "https://upload.wikimedia.org/wikipedia/commons/thumb/2/2f/Google_2015_logo.svg/1200px-Google_2015_logo.svg.png",
                "https://google.com/",
            ),
            (
                "https://upload.wikimedia.org/wikipedia/commons/d/de/AsusTek-black-logo.png",
                "https://www.asus.com/",
            ),
        ];

        Self {
            entries: PARTNERS
                .iter()
                .map(|(src, href)| LogoEntry::new(*src, *href))
                .collect(),
        }
    }

    /// Parse a JSON array of `{ "source": ..., "href": ... }` objects.
    pub fn from_json_str(s: &str) -> CollabResult<Self> {
        let entries: Vec<LogoEntry> =
            serde_json::from_str(s).map_err(|e| CollabError::serde(e.to_string()))?;
        Self::new(entries)
    }

    pub fn from_json_file(path: &Path) -> CollabResult<Self> {
        let s = std::fs::read_to_string(path).map_err(|e| {
            CollabError::validation(format!("read catalog '{}': {e}", path.display()))
        })?;
        Self::from_json_str(&s)
    }

    pub fn entries(&self) -> &[LogoEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
