//! Tracks, their variants and the selections made from them.
//!
//! A [`Track`] is one resolvable media item. It carries display
//! [`Metadata`] and one or more concrete [`Variant`]s, of which exactly one
//! is selected at any time. Tracks are created in bulk from a resolve
//! response and only mutated through
//! [`SelectionState`](crate::selection::SelectionState).
//!
//! A [`Selection`] pairs a track's metadata with its selected variant and is
//! derived on demand for every included track. The list of selections is
//! the payload of a job submission, which returns a [`TaskId`].

use std::{fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DeserializeFromStr, DurationSeconds, SerializeDisplay};

use crate::error::{Error, Result};

/// Display strings describing a track. None of them are validated beyond
/// being present.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Metadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub genre: String,
    pub year: String,
}

/// One concrete downloadable rendition of a track.
#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    /// Server-assigned, unique within its track.
    pub id: String,
    pub url: String,
    pub title: String,

    /// Encoded on the wire as a string of whole seconds.
    #[serde_as(as = "DurationSeconds<String>")]
    pub duration: Duration,

    pub views: u64,
    pub uploader: String,
    pub upload_date: String,
}

/// One resolvable media item with selectable variants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Track {
    metadata: Metadata,
    variants: Vec<Variant>,
    included: bool,
    selected: usize,
}

/// A track's metadata paired with its chosen variant.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    pub metadata: Metadata,
    pub variant: Variant,
}

/// Opaque identifier of a submitted job.
///
/// Correlates a submission with its progress subscription. Never empty.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, SerializeDisplay, DeserializeFromStr)]
pub struct TaskId(String);

impl Track {
    /// Creates an included track with its first variant selected.
    ///
    /// # Errors
    ///
    /// Returns `InvalidResponse` if `variants` is empty.
    pub fn new(metadata: Metadata, variants: Vec<Variant>) -> Result<Self> {
        if variants.is_empty() {
            return Err(Error::invalid_response(format!(
                "track \"{}\" has no variants",
                metadata.title
            )));
        }

        Ok(Self {
            metadata,
            variants,
            included: true,
            selected: 0,
        })
    }

    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    #[must_use]
    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    /// Whether this track is part of the eventual submission.
    #[must_use]
    pub fn is_included(&self) -> bool {
        self.included
    }

    #[must_use]
    pub fn selected_variant_index(&self) -> usize {
        self.selected
    }

    #[must_use]
    pub fn selected_variant(&self) -> &Variant {
        // `selected` is bounds checked on every write and `variants` is
        // never empty.
        &self.variants[self.selected]
    }

    pub(crate) fn set_included(&mut self, included: bool) {
        self.included = included;
    }

    pub(crate) fn select_variant(&mut self, index: usize) -> Result<()> {
        let count = self.variants.len();
        if index >= count {
            return Err(Error::index_out_of_range(format!(
                "variant {index} does not exist; track \"{}\" has {count}",
                self.metadata.title
            )));
        }

        self.selected = index;
        Ok(())
    }

    /// The selection for this track, or `None` if it is excluded.
    #[must_use]
    pub fn selection(&self) -> Option<Selection> {
        self.included.then(|| Selection {
            metadata: self.metadata.clone(),
            variant: self.selected_variant().clone(),
        })
    }
}

impl fmt::Display for Track {
    /// Formats as `artist - title`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.metadata.artist, self.metadata.title)
    }
}

impl fmt::Display for Variant {
    /// Formats as `title by uploader (m:ss, views views)`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let seconds = self.duration.as_secs();
        write!(
            f,
            "{} by {} ({}:{:02}, {} views)",
            self.title,
            self.uploader,
            seconds / 60,
            seconds % 60,
            self.views
        )
    }
}

impl TaskId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TaskId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::invalid_response("task id is empty"));
        }

        Ok(Self(s.to_owned()))
    }
}
