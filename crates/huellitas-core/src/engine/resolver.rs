//! Protocol resolution.
//!
//! Picks which protocol variant governs an application and expands it into a
//! concrete dose count plus per-dose interval list. Precedence is strict and
//! variants are never merged: a complex protocol wins outright, the juvenile
//! override applies only to a never-vaccinated animal at most a year old, and
//! everything else uses the standard uniform spacing.

use crate::models::{ProtocolInfo, ProtocolKind, VaccineCatalogEntry};

/// Resolve the effective protocol for one application.
///
/// `prior_count` is the number of doses already counting toward the current
/// protocol. A partially-adult-dosed animal never becomes juvenile
/// retroactively, so the juvenile override requires `prior_count == 0`.
pub fn resolve(vaccine: &VaccineCatalogEntry, is_juvenile: bool, prior_count: u32) -> ProtocolInfo {
    if vaccine.has_complex_protocol() {
        return resolve_complex(vaccine);
    }

    if is_juvenile && prior_count == 0 {
        if let Some(juvenile) = &vaccine.juvenile_protocol {
            if juvenile.dose_total > 0 {
                return resolve_juvenile(vaccine, juvenile.dose_total, &juvenile.intervals_weeks);
            }
        }
    }

    resolve_standard(vaccine)
}

fn resolve_complex(vaccine: &VaccineCatalogEntry) -> ProtocolInfo {
    let total = vaccine.complex_protocol.len() as u32;
    // The gap after the final dose is the reinforcement, not an interval.
    let intervals_weeks = vaccine
        .complex_protocol
        .iter()
        .take(total.saturating_sub(1) as usize)
        .map(|step| match step.weeks_to_next {
            Some(weeks) if weeks > 0 => weeks,
            _ => vaccine.dose_interval_weeks,
        })
        .collect();

    ProtocolInfo {
        kind: ProtocolKind::Complex,
        effective_dose_total: total,
        intervals_weeks,
    }
}

fn resolve_juvenile(
    vaccine: &VaccineCatalogEntry,
    dose_total: u32,
    intervals: &[u32],
) -> ProtocolInfo {
    let intervals_weeks = (0..dose_total.saturating_sub(1) as usize)
        .map(|i| match intervals.get(i) {
            Some(&weeks) if weeks > 0 => weeks,
            _ => vaccine.dose_interval_weeks,
        })
        .collect();

    ProtocolInfo {
        kind: ProtocolKind::Juvenile,
        effective_dose_total: dose_total,
        intervals_weeks,
    }
}

fn resolve_standard(vaccine: &VaccineCatalogEntry) -> ProtocolInfo {
    let total = vaccine.dose_total.max(1);
    ProtocolInfo {
        kind: ProtocolKind::Standard,
        effective_dose_total: total,
        intervals_weeks: vec![vaccine.dose_interval_weeks; total as usize - 1],
    }
}
