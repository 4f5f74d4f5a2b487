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
//! Label domain catalog
//!
//! Every label dimension is a closed enum with a total mapping to its
//! exported token. Domains are known at compile time and never learned from
//! traffic, which is what makes the whole label space enumerable.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{MetricsError, Result};

/// Label keys as exported
pub mod keys {
    /// Connection error kind (kept in its historical casing)
    pub const CONNECTION_ERROR: &str = "ErrorType";
    /// Where the demand came from
    pub const DEMAND_SOURCE: &str = "demand_source";
    /// Endpoint family of the request
    pub const REQUEST_TYPE: &str = "request_type";
    /// Browser class
    pub const BROWSER: &str = "browser";
    /// User-id cookie presence
    pub const COOKIE: &str = "cookie";
    /// Final status of the request
    pub const RESPONSE_STATUS: &str = "response_status";
    /// Bidder identity
    pub const ADAPTER: &str = "adapter";
    /// Whether the bidder returned a bid
    pub const ADAPTER_BID: &str = "adapter_bid";
    /// Media type of a bid
    pub const BID_TYPE: &str = "bid_type";
    /// Whether the bid carried inline markup
    pub const MARKUP_TYPE: &str = "markup_type";
    /// Adapter error kind
    pub const ADAPTER_ERROR: &str = "adapter_error";
    /// Cache lookup outcome
    pub const CACHE_RESULT: &str = "cache_result";
    /// Sync blocked by consent rules
    pub const GDPR_BLOCKED: &str = "gdpr_blocked";
    /// Impression type flags
    pub const BANNER: &str = "banner";
    #[allow(missing_docs)]
    pub const VIDEO: &str = "video";
    #[allow(missing_docs)]
    pub const AUDIO: &str = "audio";
    #[allow(missing_docs)]
    pub const NATIVE: &str = "native";
    /// User-id sync action
    pub const ACTION: &str = "action";
    /// Bidder identity on user-id syncs
    pub const BIDDER: &str = "bidder";
    /// Upstream cache call outcome
    pub const SUCCESS: &str = "success";
    /// Queue admission outcome
    pub const REQUEST_STATUS: &str = "request_status";
    /// Timeout notice outcome
    pub const OUTCOME: &str = "outcome";
    /// Consent string version
    pub const VERSION: &str = "version";
    /// Adapter connection origin
    pub const CONNECTION: &str = "connection";
}

/// A closed label domain
pub trait LabelValue: Copy + Eq + fmt::Debug + Send + Sync + 'static {
    /// Every value, in domain order
    const ALL: &'static [Self];

    /// Exported token
    fn as_label(&self) -> &'static str;

    /// Position in [`LabelValue::ALL`]
    fn ordinal(&self) -> usize;

    /// Reverse lookup from an exported token
    fn from_label(token: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.as_label() == token)
    }
}

macro_rules! label_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident default $default:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $token:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $token)] $variant ),+
        }

        impl LabelValue for $name {
            const ALL: &'static [Self] = &[ $( $name::$variant ),+ ];

            fn as_label(&self) -> &'static str {
                match self {
                    $( $name::$variant => $token ),+
                }
            }

            fn ordinal(&self) -> usize {
                *self as usize
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_label())
            }
        }
    };
}

label_enum! {
    /// Where the demand came from
    pub enum DemandSource default Unknown {
        /// Browser traffic
        Web => "web",
        /// In-app traffic
        App => "app",
        /// Could not be determined
        Unknown => "unknown",
    }
}

label_enum! {
    /// Endpoint family of the request
    pub enum RequestType default OpenRtb2Web {
        /// Pre-OpenRTB auction endpoint
        Legacy => "legacy",
        /// OpenRTB 2 from a web page
        OpenRtb2Web => "openrtb2-web",
        /// OpenRTB 2 from an app
        OpenRtb2App => "openrtb2-app",
        /// Accelerated mobile pages
        Amp => "amp",
        /// Long-form video
        Video => "video",
    }
}

label_enum! {
    /// Browser class
    pub enum Browser default Other {
        /// Safari (tracked separately for its cookie policy)
        Safari => "safari",
        /// Everything else
        Other => "other",
    }
}

label_enum! {
    /// User-id cookie presence
    pub enum CookieFlag default Unknown {
        /// Cookie found
        Exists => "exists",
        /// No cookie
        No => "no",
        /// Not applicable (e.g. app traffic)
        Unknown => "unknown",
    }
}

label_enum! {
    /// Final status of an auction request
    pub enum RequestStatus default Ok {
        /// Served
        Ok => "ok",
        /// Rejected as malformed
        BadInput => "badinput",
        /// Internal failure
        Err => "err",
        /// Upstream network failure
        NetworkErr => "networkerr",
        /// Account or app on the block list
        Blacklisted => "blacklistedacctorapp",
    }
}

label_enum! {
    /// Bidder identity
    pub enum Bidder default Unknown {
        #[allow(missing_docs)]
        Adform => "adform",
        #[allow(missing_docs)]
        Appnexus => "appnexus",
        #[allow(missing_docs)]
        Beachfront => "beachfront",
        #[allow(missing_docs)]
        Conversant => "conversant",
        #[allow(missing_docs)]
        Gumgum => "gumgum",
        #[allow(missing_docs)]
        Ix => "ix",
        #[allow(missing_docs)]
        Openx => "openx",
        #[allow(missing_docs)]
        Pubmatic => "pubmatic",
        #[allow(missing_docs)]
        Rubicon => "rubicon",
        #[allow(missing_docs)]
        Sharethrough => "sharethrough",
        #[allow(missing_docs)]
        Sovrn => "sovrn",
        #[allow(missing_docs)]
        Triplelift => "triplelift",
        /// Name not recognised (e.g. a setuid call for an unknown bidder)
        Unknown => "unknown",
    }
}

label_enum! {
    /// Whether a bidder returned at least one bid
    pub enum AdapterBid default NoBid {
        /// One or more bids
        Present => "bid",
        /// No bid
        NoBid => "nobid",
    }
}

label_enum! {
    /// Media type of a bid
    pub enum BidType default Banner {
        #[allow(missing_docs)]
        Banner => "banner",
        #[allow(missing_docs)]
        Video => "video",
        #[allow(missing_docs)]
        Audio => "audio",
        #[allow(missing_docs)]
        Native => "native",
    }
}

label_enum! {
    /// Whether a bid carried its markup inline
    pub enum MarkupType default Unknown {
        /// Markup must be fetched elsewhere
        Unknown => "unknown",
        /// Inline `adm` payload
        Adm => "adm",
    }
}

impl MarkupType {
    /// `adm` when a markup payload is present, `unknown` otherwise
    pub fn from_adm(has_adm: bool) -> Self {
        if has_adm {
            MarkupType::Adm
        } else {
            MarkupType::Unknown
        }
    }
}

label_enum! {
    /// Error kind reported by an adapter
    pub enum AdapterError default Unknown {
        /// Request could not be built from the input
        BadInput => "badinput",
        /// Unparseable bidder response
        BadServerResponse => "badserverresponse",
        /// Bidder did not answer in time
        Timeout => "timeout",
        /// Request to the bidder failed
        FailedToRequestBids => "failedtorequestbid",
        /// Anything else
        Unknown => "unknown_error",
    }
}

label_enum! {
    /// Cache lookup outcome
    pub enum CacheResult default Miss {
        #[allow(missing_docs)]
        Hit => "hit",
        #[allow(missing_docs)]
        Miss => "miss",
    }
}

label_enum! {
    /// Presence of one impression type in a request
    pub enum ImpPresence default No {
        #[allow(missing_docs)]
        Yes => "yes",
        #[allow(missing_docs)]
        No => "no",
    }
}

impl From<bool> for ImpPresence {
    fn from(present: bool) -> Self {
        if present {
            ImpPresence::Yes
        } else {
            ImpPresence::No
        }
    }
}

label_enum! {
    /// Boolean rendered as a `true`/`false` token
    pub enum Flag default False {
        #[allow(missing_docs)]
        True => "true",
        #[allow(missing_docs)]
        False => "false",
    }
}

impl From<bool> for Flag {
    fn from(value: bool) -> Self {
        if value {
            Flag::True
        } else {
            Flag::False
        }
    }
}

label_enum! {
    /// Outcome of a user-id sync call
    pub enum SyncAction default Set {
        /// Id stored
        Set => "set",
        /// User opted out
        OptOut => "opt_out",
        /// Blocked by consent rules
        Gdpr => "gdpr",
        /// Malformed call
        Err => "err",
    }
}

label_enum! {
    /// Consent string version seen on a request
    pub enum TcfVersion default Err {
        #[allow(missing_docs)]
        V1 => "v1",
        #[allow(missing_docs)]
        V2 => "v2",
        /// Unparseable consent string
        Err => "err",
    }
}

label_enum! {
    /// Connection-level failure kind
    pub enum ConnectionError default Accept {
        #[allow(missing_docs)]
        Accept => "accept_error",
        #[allow(missing_docs)]
        Close => "close_error",
    }
}

label_enum! {
    /// Queue admission outcome
    pub enum QueueOutcome default Accepted {
        #[allow(missing_docs)]
        Accepted => "accepted",
        #[allow(missing_docs)]
        Rejected => "rejected",
    }
}

impl QueueOutcome {
    /// `accepted` on success
    pub fn from_success(success: bool) -> Self {
        if success {
            QueueOutcome::Accepted
        } else {
            QueueOutcome::Rejected
        }
    }
}

label_enum! {
    /// Timeout notification delivery outcome
    pub enum NoticeOutcome default Ok {
        #[allow(missing_docs)]
        Ok => "ok",
        #[allow(missing_docs)]
        Failed => "failed",
    }
}

impl NoticeOutcome {
    /// `ok` on success
    pub fn from_success(success: bool) -> Self {
        if success {
            NoticeOutcome::Ok
        } else {
            NoticeOutcome::Failed
        }
    }
}

label_enum! {
    /// Whether an adapter connection came from the pool
    pub enum ConnectionKind default Created {
        #[allow(missing_docs)]
        Reused => "reused",
        #[allow(missing_docs)]
        Created => "created",
    }
}

impl ConnectionKind {
    /// `reused` when the pool supplied the connection
    pub fn from_reused(reused: bool) -> Self {
        if reused {
            ConnectionKind::Reused
        } else {
            ConnectionKind::Created
        }
    }
}

/// A named label axis with a finite, ordered domain
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LabelDimension {
    name: &'static str,
    domain: Vec<&'static str>,
}

impl LabelDimension {
    /// Dimension over an explicit domain.
    ///
    /// Not validated here; [`crate::family::FamilyRegistry`] rejects invalid
    /// dimensions at build time.
    pub fn new(name: &'static str, domain: Vec<&'static str>) -> Self {
        Self { name, domain }
    }

    /// Dimension over every value of a label enum
    pub fn of<T: LabelValue>(name: &'static str) -> Self {
        Self {
            name,
            domain: T::ALL.iter().map(LabelValue::as_label).collect(),
        }
    }

    /// Label key
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Legal values in declared order
    pub fn domain(&self) -> &[&'static str] {
        &self.domain
    }

    /// Domain size
    pub fn len(&self) -> usize {
        self.domain.len()
    }

    /// True for an empty domain (always invalid)
    pub fn is_empty(&self) -> bool {
        self.domain.is_empty()
    }

    /// Position of `value` in the domain
    pub fn position(&self, value: &str) -> Option<usize> {
        self.domain.iter().position(|v| *v == value)
    }

    /// Non-empty domain, unique values, legal key
    pub fn validate(&self, family: &str) -> Result<()> {
        if !is_label_key(self.name) {
            return Err(MetricsError::invalid_dimension(
                family,
                self.name,
                "label key must match [a-zA-Z_][a-zA-Z0-9_]* and not start with '__'",
            ));
        }
        if self.domain.is_empty() {
            return Err(MetricsError::invalid_dimension(family, self.name, "empty domain"));
        }
        for (i, value) in self.domain.iter().enumerate() {
            if self.domain[..i].contains(value) {
                return Err(MetricsError::invalid_dimension(
                    family,
                    self.name,
                    format!("value '{value}' listed twice"),
                ));
            }
        }
        Ok(())
    }
}

fn is_label_key(key: &str) -> bool {
    if key.starts_with("__") {
        return false;
    }
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
