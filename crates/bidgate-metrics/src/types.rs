// Copyright (C) 2026  winnyboy5
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
//! Event contexts passed to the recorder

use serde::{Deserialize, Serialize};

use crate::labels::{
    AdapterBid, AdapterError, Bidder, Browser, CookieFlag, DemandSource, ImpPresence, LabelValue,
    RequestStatus, RequestType, SyncAction,
};

/// Labels shared by every auction-level event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Labels {
    /// Where the demand came from
    pub source: DemandSource,
    /// Endpoint family
    pub request_type: RequestType,
    /// Browser class
    pub browser: Browser,
    /// User-id cookie presence
    pub cookie: CookieFlag,
    /// Final status
    pub status: RequestStatus,
}

/// Labels for events about a single bidder inside an auction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AdapterLabels {
    /// Where the demand came from
    pub source: DemandSource,
    /// Endpoint family
    pub request_type: RequestType,
    /// Browser class
    pub browser: Browser,
    /// User-id cookie presence
    pub cookie: CookieFlag,
    /// Bidder identity
    pub adapter: Bidder,
    /// Whether the bidder returned a bid
    pub adapter_bids: AdapterBid,
    /// Error kinds seen on this call
    pub adapter_errors: AdapterErrorSet,
}

/// Set of [`AdapterError`] kinds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "Vec<AdapterError>", from = "Vec<AdapterError>")]
pub struct AdapterErrorSet(u8);

impl AdapterErrorSet {
    /// Empty set
    pub fn new() -> Self {
        Self(0)
    }

    /// Add an error kind; repeated kinds are kept once
    pub fn insert(&mut self, error: AdapterError) {
        self.0 |= 1 << error.ordinal();
    }

    /// Builder form of [`AdapterErrorSet::insert`]
    pub fn with(mut self, error: AdapterError) -> Self {
        self.insert(error);
        self
    }

    #[allow(missing_docs)]
    pub fn contains(&self, error: AdapterError) -> bool {
        self.0 & (1 << error.ordinal()) != 0
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    #[allow(missing_docs)]
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Members in domain order
    pub fn iter(&self) -> impl Iterator<Item = AdapterError> + '_ {
        AdapterError::ALL
            .iter()
            .copied()
            .filter(move |error| self.contains(*error))
    }
}

impl FromIterator<AdapterError> for AdapterErrorSet {
    fn from_iter<I: IntoIterator<Item = AdapterError>>(iter: I) -> Self {
        iter.into_iter().fold(Self::new(), Self::with)
    }
}

impl From<Vec<AdapterError>> for AdapterErrorSet {
    fn from(errors: Vec<AdapterError>) -> Self {
        errors.into_iter().collect()
    }
}

impl From<AdapterErrorSet> for Vec<AdapterError> {
    fn from(set: AdapterErrorSet) -> Self {
        set.iter().collect()
    }
}

/// Impression types present in a request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImpLabels {
    #[allow(missing_docs)]
    pub banner: bool,
    #[allow(missing_docs)]
    pub video: bool,
    #[allow(missing_docs)]
    pub audio: bool,
    #[allow(missing_docs)]
    pub native: bool,
}

impl ImpLabels {
    /// Flags as tokens, in banner/video/audio/native order
    pub fn presence(&self) -> [ImpPresence; 4] {
        [
            self.banner.into(),
            self.video.into(),
            self.audio.into(),
            self.native.into(),
        ]
    }
}

/// A user-id sync call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserLabels {
    /// What happened
    pub action: SyncAction,
    /// Bidder the id belongs to
    pub bidder: Bidder,
}
