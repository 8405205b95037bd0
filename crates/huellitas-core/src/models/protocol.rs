//! Resolved protocol types.

use serde::{Deserialize, Serialize};

/// Which protocol variant governs an application.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolKind {
    Standard,
    Juvenile,
    Complex,
}

impl ProtocolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolKind::Standard => "standard",
            ProtocolKind::Juvenile => "juvenile",
            ProtocolKind::Complex => "complex",
        }
    }
}

/// The effective protocol after precedence resolution: the dose count and the
/// spacing between consecutive doses, with all fallbacks already baked in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProtocolInfo {
    pub kind: ProtocolKind,
    pub effective_dose_total: u32,
    /// `intervals_weeks[i]` is the gap after dose `i + 1`; the list has
    /// `effective_dose_total - 1` entries
    pub intervals_weeks: Vec<u32>,
}

impl ProtocolInfo {
    /// Weeks between the given dose and the next one, when the interval list
    /// covers that index.
    pub fn interval_after_dose(&self, dose_number: u32) -> Option<u32> {
        if dose_number == 0 {
            return None;
        }
        self.intervals_weeks.get(dose_number as usize - 1).copied()
    }

    pub fn is_single_dose(&self) -> bool {
        self.effective_dose_total == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_lookup() {
        let protocol = ProtocolInfo {
            kind: ProtocolKind::Standard,
            effective_dose_total: 3,
            intervals_weeks: vec![4, 6],
        };
        assert_eq!(protocol.interval_after_dose(1), Some(4));
        assert_eq!(protocol.interval_after_dose(2), Some(6));
        assert_eq!(protocol.interval_after_dose(3), None);
        assert_eq!(protocol.interval_after_dose(0), None);
    }

    #[test]
    fn test_single_dose() {
        let protocol = ProtocolInfo {
            kind: ProtocolKind::Standard,
            effective_dose_total: 1,
            intervals_weeks: vec![],
        };
        assert!(protocol.is_single_dose());
    }
}
