//! Data layers addressable by the cleaner.

use std::{fmt, str::FromStr};

/// The layers of indexed data a range operation can target.
///
/// Deletion cascades from leaf entities upward, so each kind implies the
/// kinds that depend on it: cleaning `Transactions` also removes receipts,
/// cleaning `State` also removes storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind {
    /// Everything indexed for the range.
    Full,
    /// Alias for [`DataKind::Full`]: headers root the whole graph.
    Headers,
    /// Uncle headers only.
    Uncles,
    /// Transactions and their receipts.
    Transactions,
    /// Receipts only.
    Receipts,
    /// State nodes and their storage nodes.
    State,
    /// Storage nodes only.
    Storage,
}

impl FromStr for DataKind {
    type Err = UnknownDataKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "headers" => Ok(Self::Headers),
            "uncles" => Ok(Self::Uncles),
            "transactions" | "txs" => Ok(Self::Transactions),
            "receipts" | "rcts" => Ok(Self::Receipts),
            "state" => Ok(Self::State),
            "storage" => Ok(Self::Storage),
            _ => Err(UnknownDataKind(s.to_owned())),
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Full => "full",
            Self::Headers => "headers",
            Self::Uncles => "uncles",
            Self::Transactions => "transactions",
            Self::Receipts => "receipts",
            Self::State => "state",
            Self::Storage => "storage",
        };
        f.write_str(name)
    }
}

/// An unrecognized data kind name.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown data kind: {0}")]
pub struct UnknownDataKind(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_kinds() {
        assert_eq!("full".parse::<DataKind>().unwrap(), DataKind::Full);
        assert_eq!("Headers".parse::<DataKind>().unwrap(), DataKind::Headers);
        assert_eq!("txs".parse::<DataKind>().unwrap(), DataKind::Transactions);
        assert_eq!("rcts".parse::<DataKind>().unwrap(), DataKind::Receipts);
        assert_eq!("storage".parse::<DataKind>().unwrap(), DataKind::Storage);
    }

    #[test]
    fn parse_unknown_kind() {
        let err = "blocks".parse::<DataKind>().unwrap_err();
        assert_eq!(err.to_string(), "unknown data kind: blocks");
    }

    #[test]
    fn display_round_trips() {
        for kind in [
            DataKind::Full,
            DataKind::Uncles,
            DataKind::Transactions,
            DataKind::Receipts,
            DataKind::State,
            DataKind::Storage,
        ] {
            assert_eq!(kind.to_string().parse::<DataKind>().unwrap(), kind);
        }
    }
}
