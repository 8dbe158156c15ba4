//! Address enumeration.
//!
//! Expands a [`NetworkPrefix`] plus octet bounds into the candidate host
//! addresses of a sweep. The trailing octet always runs over `1..=254`, so
//! network and broadcast addresses are never produced.

use std::net::Ipv4Addr;
use std::ops::RangeInclusive;

use websweep_core::{NetworkPrefix, ScanTarget, SweepError};

use crate::error::Result;

/// Host values of the trailing octet.
pub const HOST_OCTETS: RangeInclusive<u8> = 1..=254;

/// A finite, restartable set of targets derived from one prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRange {
    prefix: NetworkPrefix,
    lead: [u8; 2],
    third: RangeInclusive<u8>,
}

impl AddressRange {
    /// Build a range over `prefix`, varying the third octet over `start..=end`.
    ///
    /// `start == end == 0` selects single-octet mode: only the last octet
    /// varies. A three-octet prefix accepts nothing else.
    pub fn new(prefix: NetworkPrefix, start: u8, end: u8) -> Result<Self> {
        if start > end {
            return Err(SweepError::InvalidRange {
                start,
                end,
                reason: "start is greater than end".to_string(),
            }
            .into());
        }

        let single_octet = start == 0 && end == 0;
        let (lead, third) = match prefix {
            NetworkPrefix::Sixteen([a, b]) => ([a, b], start..=end),
            NetworkPrefix::TwentyFour([a, b, c]) if single_octet => ([a, b], c..=c),
            NetworkPrefix::TwentyFour(_) => {
                return Err(SweepError::InvalidRange {
                    start,
                    end,
                    reason: format!("{prefix} fixes the third octet"),
                }
                .into())
            }
        };

        Ok(Self {
            prefix,
            lead,
            third,
        })
    }

    pub fn prefix(&self) -> NetworkPrefix {
        self.prefix
    }

    /// Number of targets without iterating them.
    pub fn len(&self) -> usize {
        let thirds = usize::from(*self.third.end() - *self.third.start()) + 1;
        thirds * HOST_OCTETS.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate the targets in ascending order. Callers must not rely on order.
    pub fn iter(&self) -> impl Iterator<Item = ScanTarget> + Send + 'static {
        let [a, b] = self.lead;
        self.third.clone().flat_map(move |c| {
            HOST_OCTETS.map(move |d| ScanTarget(Ipv4Addr::new(a, b, c, d)))
        })
    }
}

/// The default sweep range for a prefix: a /16 varies the third octet over
/// `1..=254`, a /24 varies only the last octet.
pub fn default_range(prefix: NetworkPrefix) -> AddressRange {
    let (lead, third) = match prefix {
        NetworkPrefix::Sixteen(lead) => (lead, HOST_OCTETS),
        NetworkPrefix::TwentyFour([a, b, c]) => ([a, b], c..=c),
    };
    AddressRange {
        prefix,
        lead,
        third,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn collect(range: &AddressRange) -> Vec<ScanTarget> {
        range.iter().collect()
    }

    #[test]
    fn slash_24_yields_254_distinct_hosts() {
        let range = default_range(NetworkPrefix::TwentyFour([10, 0, 0]));
        let targets = collect(&range);

        assert_eq!(targets.len(), 254);
        assert_eq!(range.len(), 254);
        let unique: HashSet<_> = targets.iter().collect();
        assert_eq!(unique.len(), 254);
        assert_eq!(targets[0].to_string(), "10.0.0.1");
        assert_eq!(targets[253].to_string(), "10.0.0.254");
    }

    #[test]
    fn slash_16_yields_254_squared_distinct_hosts() {
        let range = default_range(NetworkPrefix::Sixteen([192, 168]));
        let targets = collect(&range);

        assert_eq!(targets.len(), 254 * 254);
        assert_eq!(range.len(), 254 * 254);
        let unique: HashSet<_> = targets.iter().collect();
        assert_eq!(unique.len(), 254 * 254);
    }

    #[test]
    fn trailing_octet_never_network_or_broadcast() {
        let range = AddressRange::new(NetworkPrefix::Sixteen([10, 1]), 0, 255).unwrap();
        assert!(range
            .iter()
            .all(|t| HOST_OCTETS.contains(&t.addr().octets()[3])));
        assert_eq!(range.len(), 256 * 254);
    }

    #[test]
    fn single_octet_mode_on_two_octet_prefix() {
        let range = AddressRange::new(NetworkPrefix::Sixteen([172, 16]), 0, 0).unwrap();
        let targets = collect(&range);
        assert_eq!(targets.len(), 254);
        assert!(targets.iter().all(|t| t.addr().octets()[..3] == [172, 16, 0]));
    }

    #[test]
    fn explicit_bounds_are_inclusive() {
        let range = AddressRange::new(NetworkPrefix::Sixteen([10, 2]), 3, 4).unwrap();
        let targets = collect(&range);
        assert_eq!(targets.len(), 2 * 254);
        assert_eq!(targets.first().unwrap().to_string(), "10.2.3.1");
        assert_eq!(targets.last().unwrap().to_string(), "10.2.4.254");
    }

    #[test]
    fn range_is_restartable() {
        let range = default_range(NetworkPrefix::TwentyFour([10, 0, 0]));
        assert_eq!(collect(&range), collect(&range));
    }

    #[test]
    fn inverted_bounds_rejected() {
        assert!(AddressRange::new(NetworkPrefix::Sixteen([10, 0]), 5, 4).is_err());
    }

    #[test]
    fn three_octet_prefix_requires_single_octet_mode() {
        assert!(AddressRange::new(NetworkPrefix::TwentyFour([10, 0, 0]), 1, 254).is_err());
    }
}
