//! Error types for period and quota operations.
//!
//! Construction and decode failures are surfaced immediately; nothing in this
//! crate retries or falls back. Errors raised by a caller-supplied count
//! fetcher are carried through as the `source()` of [`QuotaError::CountSource`].

use std::fmt;

use thiserror::Error;

use crate::period::Moment;

/// Result type for period and quota operations.
pub type Result<T> = std::result::Result<T, QuotaError>;

/// Boxed error produced by a count fetcher.
pub type FetchError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for period and quota operations.
#[derive(Debug, Error)]
pub enum QuotaError {
    /// A limit or limit set was built with inconsistent fields.
    #[error("Construction error: {0}")]
    Construction(#[from] ConstructionError),

    /// A reference string does not match the grammar.
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// An anchored window was requested with the anchor after the control instant.
    #[error("Anchor {anchor} is after control instant {control}")]
    AnchorAfterControl {
        /// Start of the first window.
        anchor: Moment,
        /// The instant the window was requested for.
        control: Moment,
    },

    /// Calendar arithmetic left the representable date range.
    #[error("Date out of range: {0}")]
    OutOfRange(String),

    /// A closed period whose bounds carry different UTC offsets.
    #[error("Period bounds have different offsets: {start} vs {end}")]
    ZoneMismatch {
        /// Offset label of the start bound.
        start: String,
        /// Offset label of the end bound.
        end: String,
    },

    /// A datetime format string chrono cannot render.
    #[error("Invalid datetime format: {0:?}")]
    InvalidFormat(String),

    /// The count fetcher failed.
    #[error("Count source failed: {0}")]
    CountSource(#[source] FetchError),

    /// A state report could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl QuotaError {
    /// Wrap a count fetcher failure.
    pub fn count_source(err: impl Into<FetchError>) -> Self {
        Self::CountSource(err.into())
    }

    /// Downcast the wrapped count fetcher failure, if this is one.
    pub fn count_source_error<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::CountSource(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }

    pub(crate) fn out_of_range(what: impl fmt::Display) -> Self {
        Self::OutOfRange(what.to_string())
    }
}

/// Inconsistent limit fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstructionError {
    /// A positive limit without a period type.
    #[error("a limit of {0} requires a period type")]
    MissingPeriodType(u64),

    /// A positive limit without an alignment mode.
    #[error("a limit of {0} requires a calendar alignment flag")]
    MissingAlignment(u64),

    /// Unlimited or disabled limit carrying period fields.
    #[error("{0} limit must not carry a period type or alignment flag")]
    UnexpectedPeriod(&'static str),

    /// Unlimited or disabled limit with a non-default unit.
    #[error("{0} limit must use the default unit")]
    UnexpectedUnit(&'static str),

    /// A day scale factor of zero.
    #[error("scale factor must be at least 1")]
    ZeroScale,

    /// A limit set with no members.
    #[error("a limit set needs at least one limit")]
    EmptySet,

    /// A builder finished without a required field.
    #[error("missing required field: {0}")]
    MissingRequired(&'static str),
}

/// A reference string that does not match the grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("`{input}` at offset {offset}: {kind}")]
pub struct DecodeError {
    /// The full input that was being decoded.
    pub input: String,
    /// Byte offset of the offending token.
    pub offset: usize,
    /// What went wrong.
    pub kind: DecodeErrorKind,
}

impl DecodeError {
    pub(crate) fn new(input: &str, offset: usize, kind: DecodeErrorKind) -> Self {
        Self {
            input: input.to_string(),
            offset,
            kind,
        }
    }
}

/// Reason a reference string was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeErrorKind {
    /// Nothing to decode.
    #[error("empty reference")]
    Empty,

    /// A character outside the grammar alphabet.
    #[error("unexpected character {0:?}")]
    UnexpectedChar(char),

    /// A token other than the one the grammar requires.
    #[error("expected {expected}, found {found}")]
    UnexpectedToken {
        /// What the grammar required.
        expected: &'static str,
        /// What was actually there.
        found: String,
    },

    /// Input ended while a token was still required.
    #[error("expected {0}, found end of input")]
    UnexpectedEnd(&'static str),

    /// Digits that do not fit the target integer.
    #[error("number {0} is out of range")]
    InvalidNumber(String),

    /// An unrecognized unit code.
    #[error("unknown unit code {0:?}")]
    UnknownUnit(String),

    /// An unrecognized period name.
    #[error("unknown period {0:?}")]
    UnknownPeriod(String),

    /// `_x` scaling on a period other than `day`, or a zero factor.
    #[error("invalid scale factor on {0:?}")]
    InvalidScale(String),

    /// A timestamp that is not RFC 3339, a naive date-time, or a date.
    #[error("invalid timestamp {0:?}")]
    InvalidTimestamp(String),

    /// Valid tokens that violate a limit invariant.
    #[error("{0}")]
    Inconsistent(ConstructionError),
}
