//! Presentation ordering for findings.

use crate::ImpactFinding;

/// Default cap on the number of findings returned to a caller.
pub const DEFAULT_MAX_FINDINGS: usize = 6;

/// Order findings by severity, highest first, keeping at most `max` of them.
///
/// The sort is stable: findings of equal severity keep the order the
/// analysis stage produced them in. Ranking an already ranked list is a
/// no-op.
pub fn rank_findings(mut findings: Vec<ImpactFinding>, max: usize) -> Vec<ImpactFinding> {
    findings.sort_by(|a, b| b.severity.cmp(&a.severity));
    findings.truncate(max);
    findings
}
