//! Selection State: which tracks to process, and in which variant.
//!
//! Owns the tracks returned by the resolver. The presentation layer mutates
//! them only through [`SelectionState::set_included`] and
//! [`SelectionState::set_variant`]; everything else is read-only.
//!
//! Submission works on a [`snapshot`](SelectionState::snapshot) taken before
//! any network call, so edits made while a submission is in flight never
//! leak into it.

use crate::{
    error::{Error, Result},
    track::{Selection, Track},
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionState {
    tracks: Vec<Track>,
}

impl SelectionState {
    #[must_use]
    pub fn new(tracks: Vec<Track>) -> Self {
        Self { tracks }
    }

    #[must_use]
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    #[must_use]
    pub fn track(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Number of tracks currently marked for processing.
    #[must_use]
    pub fn included_count(&self) -> usize {
        self.tracks.iter().filter(|track| track.is_included()).count()
    }

    /// Includes or excludes a track.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfRange` if `track` does not exist.
    pub fn set_included(&mut self, track: usize, included: bool) -> Result<()> {
        self.track_mut(track)?.set_included(included);
        Ok(())
    }

    /// Selects which variant of a track to process.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfRange` if `track` or its `variant` does not exist.
    /// The current selection is left unchanged.
    pub fn set_variant(&mut self, track: usize, variant: usize) -> Result<()> {
        self.track_mut(track)?.select_variant(variant)
    }

    /// Includes or excludes every track at once.
    pub fn select_all(&mut self, included: bool) {
        for track in &mut self.tracks {
            track.set_included(included);
        }
    }

    /// The selections of all included tracks, in track order.
    ///
    /// Computed fresh on every call and never mutates state.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Selection> {
        self.tracks.iter().filter_map(Track::selection).collect()
    }

    fn track_mut(&mut self, index: usize) -> Result<&mut Track> {
        let count = self.tracks.len();
        self.tracks.get_mut(index).ok_or_else(|| {
            Error::index_out_of_range(format!("track {index} does not exist; there are {count}"))
        })
    }
}
