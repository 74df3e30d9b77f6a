//! Snapshot persistence
//!
//! JSON export/import of the whole section map, used by the `save` and
//! `load` commands. Encoding and file I/O happen on the connection task,
//! never inside the server actor.
//!
//! File layout:
//! ```text
//! {
//!   "sections": [
//!     { "name": "Sports",
//!       "polls": [
//!         { "name": "Finals?", "description": "desc", "creator": "alice",
//!           "options": { "A": ["alice"], "B": [] } } ] } ]
//! }
//! ```

use std::collections::{BTreeMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::AppError;
use crate::poll::{Poll, PollOption};
use crate::section::Section;

/// Extension appended to snapshot names that lack it
pub const SNAPSHOT_EXTENSION: &str = ".json";

/// Full-store export structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub sections: Vec<SectionSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionSnapshot {
    pub name: String,
    #[serde(default)]
    pub polls: Vec<PollSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSnapshot {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub creator: String,
    /// Option label -> voter names, in display order
    #[serde(with = "ordered_options")]
    pub options: Vec<(String, Vec<String>)>,
}

impl StoreSnapshot {
    /// Copy the given sections into a snapshot
    pub fn from_sections<'a>(sections: impl IntoIterator<Item = &'a Section>) -> Self {
        Self {
            sections: sections.into_iter().map(SectionSnapshot::from).collect(),
        }
    }

    /// Number of polls across all sections
    pub fn poll_count(&self) -> usize {
        self.sections.iter().map(|s| s.polls.len()).sum()
    }

    /// Build the section map this snapshot describes
    ///
    /// Fails without producing anything if the snapshot breaks a store
    /// invariant: duplicate section, poll or option names, a poll without
    /// options, or a voter listed under two options of one poll.
    pub fn into_sections(self) -> Result<BTreeMap<String, Section>, AppError> {
        let mut sections = BTreeMap::new();

        for section_snapshot in self.sections {
            if sections.contains_key(&section_snapshot.name) {
                return Err(AppError::InvalidSnapshot(format!(
                    "duplicate topic {}",
                    section_snapshot.name
                )));
            }

            let mut section = Section::new(section_snapshot.name.clone());
            for poll_snapshot in section_snapshot.polls {
                if section.contains_poll(&poll_snapshot.name) {
                    return Err(AppError::InvalidSnapshot(format!(
                        "duplicate vote {} in topic {}",
                        poll_snapshot.name, section.name
                    )));
                }
                section.add_poll(poll_snapshot.into_poll()?);
            }

            sections.insert(section.name.clone(), section);
        }

        Ok(sections)
    }
}

impl From<&Section> for SectionSnapshot {
    fn from(section: &Section) -> Self {
        Self {
            name: section.name.clone(),
            polls: section.polls().map(PollSnapshot::from).collect(),
        }
    }
}

impl From<&Poll> for PollSnapshot {
    fn from(poll: &Poll) -> Self {
        Self {
            name: poll.name.clone(),
            description: poll.description.clone(),
            creator: poll.creator.clone(),
            options: poll
                .options()
                .iter()
                .map(|o| (o.label.clone(), o.voters.clone()))
                .collect(),
        }
    }
}

impl PollSnapshot {
    fn into_poll(self) -> Result<Poll, AppError> {
        if self.options.is_empty() {
            return Err(AppError::InvalidSnapshot(format!(
                "vote {} has no options",
                self.name
            )));
        }

        let mut labels = HashSet::new();
        let mut voters = HashSet::new();
        for (label, option_voters) in &self.options {
            if !labels.insert(label.as_str()) {
                return Err(AppError::InvalidSnapshot(format!(
                    "duplicate option {} in vote {}",
                    label, self.name
                )));
            }
            for voter in option_voters {
                if !voters.insert(voter.as_str()) {
                    return Err(AppError::InvalidSnapshot(format!(
                        "{} voted twice in vote {}",
                        voter, self.name
                    )));
                }
            }
        }

        let options = self
            .options
            .into_iter()
            .map(|(label, voters)| PollOption { label, voters })
            .collect();
        Ok(Poll::with_options(
            self.name,
            self.description,
            self.creator,
            options,
        ))
    }
}

/// Serializes options as a JSON object while keeping entry order
mod ordered_options {
    use std::fmt;

    use serde::de::{MapAccess, Visitor};
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(options: &[(String, Vec<String>)], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_map(options.iter().map(|(label, voters)| (label, voters)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<(String, Vec<String>)>, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct OptionsVisitor;

        impl<'de> Visitor<'de> for OptionsVisitor {
            type Value = Vec<(String, Vec<String>)>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of option labels to voter lists")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut options = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry()? {
                    options.push(entry);
                }
                Ok(options)
            }
        }

        deserializer.deserialize_map(OptionsVisitor)
    }
}

/// Snapshot files in a data directory
#[derive(Debug, Clone)]
pub struct SnapshotStorage {
    data_dir: PathBuf,
}

impl SnapshotStorage {
    /// Create storage rooted at `data_dir` (created on first save)
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Normalize a user-supplied snapshot name
    ///
    /// Appends `.json` when missing. Only bare file names are accepted.
    pub fn file_name(raw: &str) -> Result<String, AppError> {
        let raw = raw.trim();
        if raw.is_empty() || raw.contains(['/', '\\']) || raw.contains("..") {
            return Err(AppError::InvalidFileName(raw.to_string()));
        }

        if raw.ends_with(SNAPSHOT_EXTENSION) {
            Ok(raw.to_string())
        } else {
            Ok(format!("{}{}", raw, SNAPSHOT_EXTENSION))
        }
    }

    /// Write a snapshot, replacing any file with the same name
    ///
    /// The file is written under a temporary name unique to this call and
    /// renamed into place, so concurrent saves to one name each succeed and
    /// the last rename wins.
    pub async fn save(&self, file_name: &str, snapshot: &StoreSnapshot) -> Result<PathBuf, AppError> {
        fs::create_dir_all(&self.data_dir).await?;

        let path = self.data_dir.join(file_name);
        let tmp_path = self
            .data_dir
            .join(format!("{}.{}.tmp", file_name, Uuid::new_v4()));
        let json = serde_json::to_vec_pretty(snapshot)?;

        fs::write(&tmp_path, json).await?;
        fs::rename(&tmp_path, &path).await?;

        info!(
            "Saved {} topics ({} votes) to {}",
            snapshot.sections.len(),
            snapshot.poll_count(),
            path.display()
        );
        Ok(path)
    }

    /// Read and decode a snapshot
    pub async fn load(&self, file_name: &str) -> Result<StoreSnapshot, AppError> {
        let path = self.data_dir.join(file_name);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(AppError::SnapshotNotFound(file_name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let snapshot: StoreSnapshot = serde_json::from_slice(&bytes)?;
        debug!("Read snapshot {} ({} bytes)", path.display(), bytes.len());
        Ok(snapshot)
    }
}
