use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use super::domain::{
    Delivery, DeliveryId, Family, FamilyId, Institution, InstitutionId, User, UserId,
};

/// Error enumeration for storage failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("insufficient stock: {available} basket(s) available, {requested} requested")]
    InsufficientStock { available: u32, requested: u32 },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Storage abstraction for the family registry.
pub trait FamilyRepository: Send + Sync {
    fn insert(&self, family: Family) -> Result<Family, RepositoryError>;
    fn update(&self, family: Family) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &FamilyId) -> Result<Option<Family>, RepositoryError>;
    fn list(&self) -> Result<Vec<Family>, RepositoryError>;
}

/// Storage abstraction for institutions and their inventory.
///
/// `reserve_baskets` and `restock` mutate inventory atomically with respect
/// to the backing store so concurrent deliveries cannot race the basket
/// count below zero. A SQL implementation would issue a conditional
/// `UPDATE ... WHERE baskets >= $count`.
pub trait InstitutionRepository: Send + Sync {
    fn insert(&self, institution: Institution) -> Result<Institution, RepositoryError>;
    fn update(&self, institution: Institution) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &InstitutionId) -> Result<Option<Institution>, RepositoryError>;
    fn list(&self) -> Result<Vec<Institution>, RepositoryError>;
    /// Compare-and-decrement the basket count, returning the remaining stock.
    fn reserve_baskets(&self, id: &InstitutionId, count: u32) -> Result<u32, RepositoryError>;
    /// Increment an inventory item, creating the key when absent. Also the
    /// compensation path for a failed delivery after reservation.
    fn restock(&self, id: &InstitutionId, item: &str, quantity: u32)
        -> Result<(), RepositoryError>;
}

/// Storage abstraction for the append-only delivery log.
pub trait DeliveryRepository: Send + Sync {
    fn append(&self, delivery: Delivery) -> Result<Delivery, RepositoryError>;
    fn list(&self) -> Result<Vec<Delivery>, RepositoryError>;
    fn list_for_institution(&self, id: &InstitutionId) -> Result<Vec<Delivery>, RepositoryError>;
}

/// Storage abstraction for system users.
pub trait UserRepository: Send + Sync {
    fn insert(&self, user: User) -> Result<User, RepositoryError>;
    fn fetch_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;
    fn list(&self) -> Result<Vec<User>, RepositoryError>;
}

static FAMILY_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static INSTITUTION_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static DELIVERY_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static USER_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_family_id() -> FamilyId {
    let id = FAMILY_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    FamilyId(format!("fam-{id:06}"))
}

fn next_institution_id() -> InstitutionId {
    let id = INSTITUTION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    InstitutionId(format!("inst-{id:06}"))
}

fn next_delivery_id() -> DeliveryId {
    let id = DELIVERY_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    DeliveryId(format!("del-{id:06}"))
}

fn next_user_id() -> UserId {
    let id = USER_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    UserId(format!("user-{id:06}"))
}

/// In-memory family store used by the service binary and tests.
#[derive(Default, Clone)]
pub struct InMemoryFamilyRepository {
    records: Arc<Mutex<BTreeMap<FamilyId, Family>>>,
}

impl FamilyRepository for InMemoryFamilyRepository {
    fn insert(&self, mut family: Family) -> Result<Family, RepositoryError> {
        let mut guard = self.records.lock().expect("family store mutex poisoned");
        if guard.values().any(|existing| existing.name == family.name) {
            return Err(RepositoryError::Conflict);
        }
        if family.id.0.is_empty() {
            family.id = next_family_id();
        }
        if guard.contains_key(&family.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(family.id.clone(), family.clone());
        Ok(family)
    }

    fn update(&self, family: Family) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("family store mutex poisoned");
        if guard.contains_key(&family.id) {
            guard.insert(family.id.clone(), family);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &FamilyId) -> Result<Option<Family>, RepositoryError> {
        let guard = self.records.lock().expect("family store mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<Family>, RepositoryError> {
        let guard = self.records.lock().expect("family store mutex poisoned");
        Ok(guard.values().cloned().collect())
    }
}

/// In-memory institution store.
#[derive(Default, Clone)]
pub struct InMemoryInstitutionRepository {
    records: Arc<Mutex<BTreeMap<InstitutionId, Institution>>>,
}

impl InstitutionRepository for InMemoryInstitutionRepository {
    fn insert(&self, mut institution: Institution) -> Result<Institution, RepositoryError> {
        let mut guard = self
            .records
            .lock()
            .expect("institution store mutex poisoned");
        if guard
            .values()
            .any(|existing| existing.name == institution.name)
        {
            return Err(RepositoryError::Conflict);
        }
        if institution.id.0.is_empty() {
            institution.id = next_institution_id();
        }
        if guard.contains_key(&institution.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(institution.id.clone(), institution.clone());
        Ok(institution)
    }

    fn update(&self, institution: Institution) -> Result<(), RepositoryError> {
        let mut guard = self
            .records
            .lock()
            .expect("institution store mutex poisoned");
        if guard.contains_key(&institution.id) {
            guard.insert(institution.id.clone(), institution);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &InstitutionId) -> Result<Option<Institution>, RepositoryError> {
        let guard = self
            .records
            .lock()
            .expect("institution store mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<Institution>, RepositoryError> {
        let guard = self
            .records
            .lock()
            .expect("institution store mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    fn reserve_baskets(&self, id: &InstitutionId, count: u32) -> Result<u32, RepositoryError> {
        let mut guard = self
            .records
            .lock()
            .expect("institution store mutex poisoned");
        let institution = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        institution
            .inventory
            .take_baskets(count)
            .map_err(|available| RepositoryError::InsufficientStock {
                available,
                requested: count,
            })
    }

    fn restock(
        &self,
        id: &InstitutionId,
        item: &str,
        quantity: u32,
    ) -> Result<(), RepositoryError> {
        let mut guard = self
            .records
            .lock()
            .expect("institution store mutex poisoned");
        let institution = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        institution.inventory.add(item, quantity);
        Ok(())
    }
}

/// In-memory delivery log.
#[derive(Default, Clone)]
pub struct InMemoryDeliveryRepository {
    records: Arc<Mutex<Vec<Delivery>>>,
}

impl DeliveryRepository for InMemoryDeliveryRepository {
    fn append(&self, mut delivery: Delivery) -> Result<Delivery, RepositoryError> {
        let mut guard = self.records.lock().expect("delivery log mutex poisoned");
        if delivery.id.0.is_empty() {
            delivery.id = next_delivery_id();
        }
        guard.push(delivery.clone());
        Ok(delivery)
    }

    fn list(&self) -> Result<Vec<Delivery>, RepositoryError> {
        let guard = self.records.lock().expect("delivery log mutex poisoned");
        Ok(guard.clone())
    }

    fn list_for_institution(&self, id: &InstitutionId) -> Result<Vec<Delivery>, RepositoryError> {
        let guard = self.records.lock().expect("delivery log mutex poisoned");
        Ok(guard
            .iter()
            .filter(|delivery| &delivery.institution_id == id)
            .cloned()
            .collect())
    }
}

/// In-memory user store keyed by email.
#[derive(Default, Clone)]
pub struct InMemoryUserRepository {
    records: Arc<Mutex<BTreeMap<String, User>>>,
}

impl UserRepository for InMemoryUserRepository {
    fn insert(&self, mut user: User) -> Result<User, RepositoryError> {
        let mut guard = self.records.lock().expect("user store mutex poisoned");
        if guard.contains_key(&user.email) {
            return Err(RepositoryError::Conflict);
        }
        if user.id.0.is_empty() {
            user.id = next_user_id();
        }
        guard.insert(user.email.clone(), user.clone());
        Ok(user)
    }

    fn fetch_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let guard = self.records.lock().expect("user store mutex poisoned");
        Ok(guard.get(email).cloned())
    }

    fn list(&self) -> Result<Vec<User>, RepositoryError> {
        let guard = self.records.lock().expect("user store mutex poisoned");
        Ok(guard.values().cloned().collect())
    }
}
