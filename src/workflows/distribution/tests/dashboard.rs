use super::common::{active_family, admin_session, date, fixture, normal_session};
use crate::workflows::distribution::dashboard::summarize;
use crate::workflows::distribution::domain::BlockPeriod;
use crate::workflows::distribution::repository::{
    DeliveryRepository, FamilyRepository, InstitutionRepository,
};
use crate::workflows::distribution::service::DeliveryRequest;

#[test]
fn admin_summary_counts_everything() {
    let fx = fixture(10);
    let session = normal_session(&fx.institution.id);

    let second = fx
        .families
        .insert(active_family("Família Costa", "(11) 98765-4325"))
        .expect("second family inserts");
    fx.service
        .record_delivery_on(
            &session,
            DeliveryRequest {
                family_id: second.id.clone(),
                basket_count: 1,
                other_items: String::new(),
                block_period: BlockPeriod::Days30,
                institution_id: None,
            },
            date(2025, 8, 1),
        )
        .expect("delivery records");

    let families = fx.families.list().expect("list works");
    let institutions = fx.institutions.list().expect("list works");
    let deliveries = fx.deliveries.list().expect("list works");

    let summary = summarize(&admin_session(), &families, &institutions, &deliveries);
    assert_eq!(summary.deliveries, 1);
    assert_eq!(summary.institutions, 1);
    assert_eq!(summary.active_families, 1);
    assert_eq!(summary.blocked_families, 1);
}

#[test]
fn normal_summary_is_scoped_to_served_families() {
    let fx = fixture(10);
    let session = normal_session(&fx.institution.id);

    // A family never served by this institution must not appear in the
    // operator's counts even though it exists in the shared registry.
    fx.families
        .insert(active_family("Família Costa", "(11) 98765-4325"))
        .expect("second family inserts");

    fx.service
        .record_delivery_on(
            &session,
            DeliveryRequest {
                family_id: fx.family.id.clone(),
                basket_count: 1,
                other_items: String::new(),
                block_period: BlockPeriod::Days30,
                institution_id: None,
            },
            date(2025, 8, 1),
        )
        .expect("delivery records");

    let families = fx.families.list().expect("list works");
    let institutions = fx.institutions.list().expect("list works");
    let deliveries = fx.deliveries.list().expect("list works");

    let summary = summarize(&session, &families, &institutions, &deliveries);
    assert_eq!(summary.deliveries, 1);
    assert_eq!(summary.institutions, 1);
    assert_eq!(summary.active_families, 0);
    assert_eq!(summary.blocked_families, 1);
}
