//! Non-fatal warning sink threaded through decode calls.
//!
//! Per the design notes, the core never relies on a process-wide logger or
//! warning channel: callers get an explicit, typed [`Diagnostics`] vector
//! alongside their decoded columns. Each push is mirrored to the `log`
//! crate at `warn` level so a binary embedding this library also gets
//! human-readable lines without extra plumbing.

/// A single non-fatal condition observed while decoding a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// The stream ended mid-packet while iterating (not necessarily fatal
    /// to the caller, who may want the packets read so far).
    Truncation {
        /// Number of bytes that would have completed the packet.
        missing: usize,
    },
    /// A packet's APID was outside the caller-supplied `valid_apids` set.
    UnknownApid {
        /// The unrecognised APID.
        apid: u16,
        /// Byte offset of the packet's primary header in the stream.
        offset: usize,
    },
    /// `CCSDS_SEQUENCE_COUNT` has one or more gaps between the first and
    /// last observed value.
    SequenceGap {
        /// The sequence-count values that were expected but never seen.
        missing: Vec<u16>,
    },
    /// `CCSDS_SEQUENCE_COUNT` is not monotonically non-decreasing across
    /// the decoded stream.
    SequenceOutOfOrder,
    /// More than one distinct `CCSDS_APID` was observed in a stream that
    /// a single packet definition was applied to.
    MultipleApids {
        /// The distinct APIDs observed, in first-seen order.
        apids: Vec<u16>,
    },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::Truncation { missing } => {
                write!(f, "stream appears truncated, missing {missing} byte(s)")
            }
            Warning::UnknownApid { apid, offset } => {
                write!(f, "unknown APID {apid} at byte offset {offset}")
            }
            Warning::SequenceGap { missing } => {
                write!(f, "missing sequence counts: {missing:?}")
            }
            Warning::SequenceOutOfOrder => write!(f, "sequence counts are out of order"),
            Warning::MultipleApids { apids } => write!(f, "found multiple APIDs: {apids:?}"),
        }
    }
}

/// Collects [`Warning`]s emitted during a decode call. Also logs each
/// pushed warning via the `log` crate at `warn` level.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Create an empty diagnostics sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning, also logging it.
    pub fn push(&mut self, warning: Warning) {
        log::warn!("{warning}");
        self.warnings.push(warning);
    }

    /// True if no warnings have been recorded.
    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// The recorded warnings, in the order they were pushed.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Consume `self`, returning the recorded warnings.
    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}
