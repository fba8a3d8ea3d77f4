use std::{fmt, str::FromStr};

use super::BatchContext;

/// The encoding of the transaction section of a sequencer batch.
///
/// Legacy batches carry no marker. Every other type is signalled by prepending a marker
/// context with `timestamp = 0` whose `block_number` holds the type id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BatchType {
    /// Length-prefixed transactions written in the clear.
    #[default]
    Legacy,
    /// Length-prefixed transactions written into a zlib stream.
    Zlib,
}

/// Marker `block_number` for [`BatchType::Zlib`].
const ZLIB_MARKER_ID: u64 = 0;

impl BatchType {
    /// The marker context to prepend on the wire, if any.
    pub const fn marker_context(self) -> Option<BatchContext> {
        match self {
            Self::Legacy => None,
            Self::Zlib => Some(BatchContext {
                num_sequenced_txs: 0,
                num_subsequent_queue_txs: 0,
                timestamp: 0,
                block_number: ZLIB_MARKER_ID,
            }),
        }
    }

    /// Classifies a marker context. Unknown type ids are treated as legacy.
    pub const fn from_marker(ctx: &BatchContext) -> Self {
        match ctx.block_number {
            ZLIB_MARKER_ID => Self::Zlib,
            _ => Self::Legacy,
        }
    }
}

impl fmt::Display for BatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legacy => f.write_str("legacy"),
            Self::Zlib => f.write_str("zlib"),
        }
    }
}

/// Error returned when parsing an unknown batch type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown batch type: {0}, expected one of: legacy, zlib")]
pub struct UnknownBatchType(String);

impl FromStr for BatchType {
    type Err = UnknownBatchType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "legacy" => Ok(Self::Legacy),
            "zlib" => Ok(Self::Zlib),
            other => Err(UnknownBatchType(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zlib_marker_round_trip() {
        let marker = BatchType::Zlib.marker_context().unwrap();
        assert!(marker.is_marker());
        assert_eq!(BatchType::from_marker(&marker), BatchType::Zlib);
    }

    #[test]
    fn legacy_has_no_marker() {
        assert_eq!(BatchType::Legacy.marker_context(), None);
    }

    #[test]
    fn unknown_marker_is_legacy() {
        let marker = BatchContext { block_number: 7, ..Default::default() };
        assert_eq!(BatchType::from_marker(&marker), BatchType::Legacy);
    }

    #[test]
    fn parse_batch_type() {
        assert_eq!("zlib".parse::<BatchType>().unwrap(), BatchType::Zlib);
        assert_eq!("LEGACY".parse::<BatchType>().unwrap(), BatchType::Legacy);
        assert!("brotli".parse::<BatchType>().is_err());
    }
}
