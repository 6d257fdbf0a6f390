use std::str::FromStr;

use ethereum_types::Address;
use hashbrown::HashSet;

/// A set of addresses that may not send, receive or be called by a
/// transaction.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Denylist(HashSet<Address>);

/// A denylist entry that is not a 20-byte hex address.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("line {line}: `{entry}` is not a valid address")]
pub struct DenylistError {
    pub line: usize,
    pub entry: String,
}

impl Denylist {
    /// Parses newline-delimited addresses, with or without a `0x` prefix.
    /// Blank lines are skipped, so an empty text yields an empty denylist.
    pub fn parse(text: &str) -> Result<Self, DenylistError> {
        text.lines()
            .enumerate()
            .map(|(ix, line)| (ix + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty())
            .map(|(line, entry)| {
                let hex = entry.strip_prefix("0x").unwrap_or(entry);
                match hex.len() {
                    40 => Address::from_str(hex).ok(),
                    _ => None,
                }
                .ok_or_else(|| DenylistError {
                    line,
                    entry: entry.to_string(),
                })
            })
            .collect()
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.0.contains(address)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Address> for Denylist {
    fn from_iter<T: IntoIterator<Item = Address>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
