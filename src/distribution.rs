// ABOUTME: Weighted allocation of a question count across certification domains
// ABOUTME: Also holds the submission-time checks for domain weights and per-domain counts

use crate::error::{ConsoleError, Result};
use crate::remote::models::{DomainDistributionEntry, ExamDomain};

/// Weights are normalised against this when a profile's weights sum to zero.
const FALLBACK_TOTAL_WEIGHT: u64 = 100;

/// Split `target` questions across `domains` in proportion to their weights.
///
/// Every domain but the last gets its rounded (half-up) share; the last domain
/// takes whatever is left, so the counts always sum to exactly `target`.
/// An empty domain list yields a single unnamed entry holding the full target.
pub fn allocate(domains: &[ExamDomain], target: u32) -> Vec<DomainDistributionEntry> {
    if domains.is_empty() {
        return vec![DomainDistributionEntry {
            domain: String::new(),
            question_count: target,
        }];
    }

    let weight_sum = match total_weight(domains) {
        0 => FALLBACK_TOTAL_WEIGHT,
        total => total,
    };

    let last = domains.len() - 1;
    let mut remaining = target as i64;
    let mut counts: Vec<i64> = Vec::with_capacity(domains.len());

    for (i, domain) in domains.iter().enumerate() {
        if i == last {
            counts.push(remaining.max(0));
            break;
        }
        let weighted = round_share(target as u64, domain.weight_percentage as u64, weight_sum);
        remaining -= weighted;
        counts.push(weighted.max(0));
    }

    absorb_drift(&mut counts, target as i64);

    domains
        .iter()
        .zip(counts)
        .map(|(domain, count)| DomainDistributionEntry {
            domain: domain.name.clone(),
            question_count: count as u32,
        })
        .collect()
}

/// `round(target * weight / total)` with halves rounded up, in integer arithmetic.
fn round_share(target: u64, weight: u64, total: u64) -> i64 {
    let (target, weight, total) = (target as u128, weight as u128, total as u128);
    ((2 * target * weight + total) / (2 * total)) as i64
}

/// Push any rounding drift onto the last entry. When the earlier shares
/// overshoot and the last entry is already zero, trim the overshoot from the
/// back of the list so no count goes negative.
fn absorb_drift(counts: &mut [i64], target: i64) {
    let drift = target - counts.iter().sum::<i64>();
    if drift == 0 {
        return;
    }
    let Some(last) = counts.last_mut() else {
        return;
    };
    *last = (*last + drift).max(0);

    let mut excess = counts.iter().sum::<i64>() - target;
    for count in counts.iter_mut().rev() {
        if excess <= 0 {
            break;
        }
        let taken = excess.min(*count);
        *count -= taken;
        excess -= taken;
    }
}

/// Summed wide so out-of-range weights from the backend cannot overflow.
pub fn total_weight(domains: &[ExamDomain]) -> u64 {
    domains.iter().map(|d| d.weight_percentage as u64).sum()
}

pub fn total_questions(entries: &[DomainDistributionEntry]) -> u32 {
    entries.iter().map(|e| e.question_count).sum()
}

/// Strict check applied when a profile or request is submitted.
pub fn validate_weights(domains: &[ExamDomain]) -> Result<()> {
    if domains.is_empty() {
        return Err(ConsoleError::Validation(
            "At least one exam domain is required".to_string(),
        ));
    }
    let total = total_weight(domains);
    if total != 100 {
        return Err(ConsoleError::Validation(format!(
            "Domain weights must sum to 100%, got {}%",
            total
        )));
    }
    Ok(())
}

/// Live, non-blocking warning shown while weights are being edited.
pub fn weight_warning(domains: &[ExamDomain]) -> Option<String> {
    if domains.is_empty() {
        return None;
    }
    let total = total_weight(domains);
    (total != 100).then(|| format!("Domain weights total {}% (should be 100%)", total))
}

/// The distribution a user submits must add up to the requested question count.
pub fn validate_distribution(entries: &[DomainDistributionEntry], target: u32) -> Result<()> {
    let total = total_questions(entries);
    if total != target {
        return Err(ConsoleError::Validation(format!(
            "Domain question counts sum to {}, expected {}",
            total, target
        )));
    }
    Ok(())
}
