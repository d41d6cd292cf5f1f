//! Per-script file lists and the JSON cleanup shared with the catalog parser

use serde::{Deserialize, Serialize};

/// One file of a script: where it lives upstream and where it goes on the device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSpec {
    pub source: String,
    pub destination: String,
}

impl FileSpec {
    /// Legacy catalogs list bare file names, installed under the same name
    pub fn same_name(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            source: path.clone(),
            destination: path,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFileSpec {
    Pair {
        source: String,
        #[serde(default)]
        destination: Option<String>,
    },
    Bare(String),
}

impl From<RawFileSpec> for FileSpec {
    fn from(raw: RawFileSpec) -> Self {
        match raw {
            RawFileSpec::Pair {
                source,
                destination,
            } => {
                let destination = destination.unwrap_or_else(|| source.clone());
                Self {
                    source,
                    destination,
                }
            }
            RawFileSpec::Bare(path) => Self::same_name(path),
        }
    }
}

pub(crate) fn deserialize_files<'de, D>(deserializer: D) -> Result<Vec<FileSpec>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Vec<RawFileSpec> = Vec::deserialize(deserializer)?;
    Ok(raw.into_iter().map(FileSpec::from).collect())
}

/// Detail document fetched for a script right before install or delete
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FullMetadata {
    /// Release tag the files belong to
    #[serde(default)]
    pub tag: Option<String>,

    #[serde(default, deserialize_with = "deserialize_files")]
    pub files: Vec<FileSpec>,
}

impl FullMetadata {
    pub fn parse(raw: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_str(&clean_json(raw))
    }
}

/// Decode a response body, dropping a leading BOM and every C0/C1 control
/// character (the host occasionally emits them inside string literals).
pub fn clean_json(raw: &[u8]) -> String {
    let decoded = String::from_utf8_lossy(raw);
    let text: &str = &decoded;
    text.strip_prefix('\u{FEFF}')
        .unwrap_or(text)
        .chars()
        .filter(|c| !c.is_control())
        .collect()
}
