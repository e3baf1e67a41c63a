use std::sync::Arc;

use chrono::NaiveDate;

use crate::workflows::distribution::domain::{
    Family, FamilyId, FamilyStatus, Institution, InstitutionId, Inventory, UserId, UserRole,
};
use crate::workflows::distribution::repository::{
    FamilyRepository, InMemoryDeliveryRepository, InMemoryFamilyRepository,
    InMemoryInstitutionRepository, InstitutionRepository,
};
use crate::workflows::distribution::service::DistributionService;
use crate::workflows::distribution::session::Session;

pub(super) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub(super) fn active_family(name: &str, phone: &str) -> Family {
    Family {
        id: FamilyId(String::new()),
        name: name.to_string(),
        address: "Rua das Palmeiras, 123".to_string(),
        phone: phone.to_string(),
        members: 4,
        income: 120_000,
        status: FamilyStatus::Active,
        blocked_until: None,
        created_at: date(2025, 1, 10),
    }
}

pub(super) fn institution(name: &str, baskets: u32) -> Institution {
    Institution {
        id: InstitutionId(String::new()),
        name: name.to_string(),
        address: "Rua da Esperança, 100".to_string(),
        phone: "(11) 91234-5678".to_string(),
        inventory: Inventory::with_baskets(baskets),
        created_at: date(2025, 1, 5),
    }
}

pub(super) struct Fixture {
    pub families: Arc<InMemoryFamilyRepository>,
    pub institutions: Arc<InMemoryInstitutionRepository>,
    pub deliveries: Arc<InMemoryDeliveryRepository>,
    pub service: DistributionService<
        InMemoryFamilyRepository,
        InMemoryInstitutionRepository,
        InMemoryDeliveryRepository,
    >,
    pub family: Family,
    pub institution: Institution,
}

/// One active family and one institution with the given basket stock.
pub(super) fn fixture(baskets: u32) -> Fixture {
    let families = Arc::new(InMemoryFamilyRepository::default());
    let institutions = Arc::new(InMemoryInstitutionRepository::default());
    let deliveries = Arc::new(InMemoryDeliveryRepository::default());

    let family = families
        .insert(active_family("Família Santos", "(11) 98765-4321"))
        .expect("family inserts");
    let stored_institution = institutions
        .insert(institution("Centro Social Esperança", baskets))
        .expect("institution inserts");

    let service =
        DistributionService::new(families.clone(), institutions.clone(), deliveries.clone());

    Fixture {
        families,
        institutions,
        deliveries,
        service,
        family,
        institution: stored_institution,
    }
}

pub(super) fn normal_session(institution_id: &InstitutionId) -> Session {
    Session {
        user_id: UserId("user-000001".to_string()),
        email: "operador1@prefeitura.gov.br".to_string(),
        name: "Operador".to_string(),
        role: UserRole::Normal,
        institution_id: Some(institution_id.clone()),
    }
}

pub(super) fn admin_session() -> Session {
    Session {
        user_id: UserId("user-000099".to_string()),
        email: "admin@prefeitura.gov.br".to_string(),
        name: "Administração".to_string(),
        role: UserRole::Admin,
        institution_id: None,
    }
}
