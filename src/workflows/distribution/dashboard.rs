use std::collections::BTreeSet;

use serde::Serialize;

use super::domain::{Delivery, Family, FamilyStatus, Institution};
use super::session::Session;

/// Read-only counts rendered on the control panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub deliveries: usize,
    pub institutions: usize,
    pub active_families: usize,
    pub blocked_families: usize,
}

/// Reduce the fetched collections into dashboard counts.
///
/// Administrators see totals over everything. Normal users see their own
/// institution (count 1), its delivery log, and family counts restricted to
/// families that appear in that log.
pub fn summarize(
    session: &Session,
    families: &[Family],
    institutions: &[Institution],
    deliveries: &[Delivery],
) -> DashboardSummary {
    if session.is_admin() {
        return DashboardSummary {
            deliveries: deliveries.len(),
            institutions: institutions.len(),
            active_families: count_status(families.iter(), FamilyStatus::Active),
            blocked_families: count_status(families.iter(), FamilyStatus::Blocked),
        };
    }

    let institution_deliveries: Vec<&Delivery> = deliveries
        .iter()
        .filter(|delivery| Some(&delivery.institution_id) == session.institution_id.as_ref())
        .collect();
    let served: BTreeSet<_> = institution_deliveries
        .iter()
        .map(|delivery| &delivery.family_id)
        .collect();
    let scoped = families.iter().filter(|family| served.contains(&family.id));

    DashboardSummary {
        deliveries: institution_deliveries.len(),
        institutions: 1,
        active_families: count_status(scoped.clone(), FamilyStatus::Active),
        blocked_families: count_status(scoped, FamilyStatus::Blocked),
    }
}

fn count_status<'a>(families: impl Iterator<Item = &'a Family>, status: FamilyStatus) -> usize {
    families.filter(|family| family.status == status).count()
}
