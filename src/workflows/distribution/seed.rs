//! Example data loading for demos and tests.
//!
//! Duplicate records are skipped and logged rather than surfaced as errors,
//! so the seed can be re-run against a store that already holds data.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::warn;

use super::domain::{
    Delivery, DeliveryId, DeliveryItems, Family, FamilyId, FamilyStatus, Institution,
    InstitutionId, Inventory, User, UserId, UserRole,
};
use super::repository::{
    DeliveryRepository, FamilyRepository, InstitutionRepository, UserRepository,
};

/// Counts of records actually inserted by a seed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub families: usize,
    pub institutions: usize,
    pub users: usize,
    pub deliveries: usize,
}

fn seed_date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid seed date")
}

fn sample_families() -> Vec<Family> {
    let specs = [
        (
            "Família Santos",
            "Rua das Palmeiras, 123 - Centro",
            "(11) 98765-4321",
            4_u32,
            120_000_u64,
            FamilyStatus::Active,
            None,
        ),
        (
            "Família Rodrigues",
            "Av. Brasil, 456 - Vila Nova",
            "(11) 98765-4322",
            3,
            95_000,
            FamilyStatus::Active,
            None,
        ),
        (
            "Família Ferreira",
            "Rua do Comércio, 789 - Centro",
            "(11) 98765-4323",
            5,
            180_000,
            FamilyStatus::Blocked,
            Some(seed_date(2025, 9, 15)),
        ),
        (
            "Família Oliveira",
            "Travessa da Paz, 12 - Jardim Primavera",
            "(11) 98765-4324",
            2,
            80_000,
            FamilyStatus::Active,
            None,
        ),
        (
            "Família Costa",
            "Rua Sete de Setembro, 301 - Vila União",
            "(11) 98765-4325",
            6,
            210_000,
            FamilyStatus::Active,
            None,
        ),
        (
            "Família Almeida",
            "Alameda dos Ipês, 77 - Centro",
            "(21) 97654-0001",
            3,
            105_000,
            FamilyStatus::Active,
            None,
        ),
    ];

    specs
        .into_iter()
        .map(
            |(name, address, phone, members, income, status, blocked_until)| Family {
                id: FamilyId(String::new()),
                name: name.to_string(),
                address: address.to_string(),
                phone: phone.to_string(),
                members,
                income,
                status,
                blocked_until,
                created_at: seed_date(2025, 1, 10),
            },
        )
        .collect()
}

fn sample_institutions() -> Vec<Institution> {
    let specs = [
        (
            "Centro Social Esperança",
            "Rua da Esperança, 100 - Jardim Primavera",
            "(11) 91234-5678",
            25_u32,
        ),
        (
            "Associação Comunitária Unidos",
            "Av. Solidariedade, 200 - Vila União",
            "(11) 91234-5679",
            40,
        ),
        (
            "Paróquia São Francisco",
            "Praça Matriz, 1 - Centro",
            "(11) 91234-5680",
            15,
        ),
    ];

    specs
        .into_iter()
        .map(|(name, address, phone, baskets)| Institution {
            id: InstitutionId(String::new()),
            name: name.to_string(),
            address: address.to_string(),
            phone: phone.to_string(),
            inventory: Inventory::with_baskets(baskets),
            created_at: seed_date(2025, 1, 5),
        })
        .collect()
}

fn sample_users(institutions: &[Institution]) -> Vec<User> {
    let mut users = vec![User {
        id: UserId(String::new()),
        email: "admin@prefeitura.gov.br".to_string(),
        name: "Administração Municipal".to_string(),
        role: UserRole::Admin,
        institution_id: None,
        password: "admin123".to_string(),
    }];

    for (index, institution) in institutions.iter().enumerate() {
        users.push(User {
            id: UserId(String::new()),
            email: format!("operador{}@prefeitura.gov.br", index + 1),
            name: format!("Operador {}", institution.name),
            role: UserRole::Normal,
            institution_id: Some(institution.id.clone()),
            password: "cesta123".to_string(),
        });
    }

    users
}

/// Load the example dataset, skipping anything that already exists.
pub fn load_example_data<F, I, D, U>(
    families: &Arc<F>,
    institutions: &Arc<I>,
    deliveries: &Arc<D>,
    users: &Arc<U>,
) -> SeedSummary
where
    F: FamilyRepository,
    I: InstitutionRepository,
    D: DeliveryRepository,
    U: UserRepository,
{
    let mut summary = SeedSummary::default();

    let mut stored_families = Vec::new();
    for family in sample_families() {
        match families.insert(family) {
            Ok(stored) => {
                stored_families.push(stored);
                summary.families += 1;
            }
            Err(err) => warn!(%err, "skipping example family"),
        }
    }

    let mut stored_institutions = Vec::new();
    for institution in sample_institutions() {
        match institutions.insert(institution) {
            Ok(stored) => {
                stored_institutions.push(stored);
                summary.institutions += 1;
            }
            Err(err) => warn!(%err, "skipping example institution"),
        }
    }

    for user in sample_users(&stored_institutions) {
        match users.insert(user) {
            Ok(_) => summary.users += 1,
            Err(err) => warn!(%err, "skipping example user"),
        }
    }

    // One historical delivery so dashboards and reports have data: the
    // pre-blocked family received its basket from the first institution.
    if let (Some(blocked), Some(institution)) = (
        stored_families
            .iter()
            .find(|family| family.status == FamilyStatus::Blocked),
        stored_institutions.first(),
    ) {
        let delivery = Delivery {
            id: DeliveryId(String::new()),
            family_id: blocked.id.clone(),
            family_name: blocked.name.clone(),
            institution_id: institution.id.clone(),
            institution_name: institution.name.clone(),
            delivery_date: seed_date(2025, 8, 16),
            items: DeliveryItems {
                baskets: 1,
                others: vec!["Leite (2L)".to_string()],
            },
            created_at: seed_date(2025, 8, 16),
        };
        match deliveries.append(delivery) {
            Ok(_) => summary.deliveries += 1,
            Err(err) => warn!(%err, "skipping example delivery"),
        }
    }

    summary
}
