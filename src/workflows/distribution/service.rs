use std::sync::Arc;

use chrono::{Duration, Local, NaiveDate};
use tracing::{error, warn};

use super::domain::{
    parse_other_items, BlockPeriod, Delivery, DeliveryId, DeliveryItems, Family, FamilyId,
    FamilyStatus, Institution, InstitutionId, Inventory, BASKETS_KEY,
};
use super::repository::{
    DeliveryRepository, FamilyRepository, InstitutionRepository, RepositoryError,
};
use super::session::Session;

/// Inputs for recording a delivery. The institution override is honored only
/// for administrators; normal users always act for their own institution.
#[derive(Debug, Clone)]
pub struct DeliveryRequest {
    pub family_id: FamilyId,
    pub basket_count: u32,
    pub other_items: String,
    pub block_period: BlockPeriod,
    pub institution_id: Option<InstitutionId>,
}

/// Inputs for registering a family. Registration is open to any
/// authenticated user; the family starts active.
#[derive(Debug, Clone)]
pub struct RegisterFamilyRequest {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub members: u32,
    pub income: u64,
}

/// Inputs for creating an institution (administrators only).
#[derive(Debug, Clone)]
pub struct CreateInstitutionRequest {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub baskets: u32,
}

/// Contact-detail changes applied to an existing institution. Inventory is
/// untouched here; stock only moves through deliveries and restocks.
#[derive(Debug, Clone)]
pub struct InstitutionUpdate {
    pub name: String,
    pub address: String,
    pub phone: String,
}

/// Error raised by the distribution workflows.
#[derive(Debug, thiserror::Error)]
pub enum DistributionError {
    #[error("acting user has no associated institution")]
    MissingInstitution,
    #[error("name must not be blank")]
    InvalidName,
    #[error("{}", blocked_message(.until))]
    FamilyBlocked { until: Option<NaiveDate> },
    #[error("basket count must be at least 1")]
    InvalidBasketCount,
    #[error("insufficient inventory: {available} basket(s) available, {requested} requested")]
    InsufficientInventory { available: u32, requested: u32 },
    #[error("item name must not be blank")]
    InvalidItemName,
    #[error("quantity must be at least 1")]
    InvalidQuantity,
    #[error("operation requires administrator role")]
    Forbidden,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

fn blocked_message(until: &Option<NaiveDate>) -> String {
    match until {
        Some(date) => format!("family is blocked until {date}"),
        None => "family is blocked".to_string(),
    }
}

/// Service composing the family registry, institution inventory, and
/// delivery log behind the eligibility rules.
pub struct DistributionService<F, I, D> {
    families: Arc<F>,
    institutions: Arc<I>,
    deliveries: Arc<D>,
}

impl<F, I, D> DistributionService<F, I, D>
where
    F: FamilyRepository + 'static,
    I: InstitutionRepository + 'static,
    D: DeliveryRepository + 'static,
{
    pub fn new(families: Arc<F>, institutions: Arc<I>, deliveries: Arc<D>) -> Self {
        Self {
            families,
            institutions,
            deliveries,
        }
    }

    /// Record a delivery dated today. See [`Self::record_delivery_on`].
    pub fn record_delivery(
        &self,
        session: &Session,
        request: DeliveryRequest,
    ) -> Result<Delivery, DistributionError> {
        self.record_delivery_on(session, request, Local::now().date_naive())
    }

    /// Record a delivery for an explicit date.
    ///
    /// Preconditions are checked before any write: the acting user must
    /// resolve to an institution, the family must be active, and the basket
    /// count must be positive and within stock. The writes then run as
    /// reserve (atomic compare-and-decrement), family block, delivery
    /// append; a failure after the reservation compensates by restocking
    /// (and re-activating the family when the append fails) before the
    /// error is returned.
    pub fn record_delivery_on(
        &self,
        session: &Session,
        request: DeliveryRequest,
        delivery_date: NaiveDate,
    ) -> Result<Delivery, DistributionError> {
        let institution_id = self.acting_institution(session, request.institution_id.clone())?;
        let institution = self
            .institutions
            .fetch(&institution_id)?
            .ok_or(RepositoryError::NotFound)?;
        let family = self
            .families
            .fetch(&request.family_id)?
            .ok_or(RepositoryError::NotFound)?;

        if family.status == FamilyStatus::Blocked {
            return Err(DistributionError::FamilyBlocked {
                until: family.blocked_until,
            });
        }
        if request.basket_count == 0 {
            return Err(DistributionError::InvalidBasketCount);
        }
        let available = institution.inventory.baskets();
        if request.basket_count > available {
            return Err(DistributionError::InsufficientInventory {
                available,
                requested: request.basket_count,
            });
        }

        let block_until = delivery_date + Duration::days(request.block_period.days());

        // The reservation re-checks stock atomically; a concurrent delivery
        // that drained the inventory between the check above and here fails
        // cleanly instead of driving the count negative.
        match self
            .institutions
            .reserve_baskets(&institution_id, request.basket_count)
        {
            Ok(_) => {}
            Err(RepositoryError::InsufficientStock {
                available,
                requested,
            }) => {
                return Err(DistributionError::InsufficientInventory {
                    available,
                    requested,
                })
            }
            Err(other) => return Err(other.into()),
        }

        let blocked = Family {
            status: FamilyStatus::Blocked,
            blocked_until: Some(block_until),
            ..family.clone()
        };
        if let Err(err) = self.families.update(blocked) {
            self.restock_after_failure(&institution_id, request.basket_count);
            return Err(err.into());
        }

        let delivery = Delivery {
            id: DeliveryId(String::new()),
            family_id: family.id.clone(),
            family_name: family.name.clone(),
            institution_id: institution.id.clone(),
            institution_name: institution.name.clone(),
            delivery_date,
            items: DeliveryItems {
                baskets: request.basket_count,
                others: parse_other_items(&request.other_items),
            },
            created_at: delivery_date,
        };

        match self.deliveries.append(delivery) {
            Ok(stored) => Ok(stored),
            Err(err) => {
                if let Err(undo) = self.families.update(family) {
                    error!(%undo, "failed to re-activate family after delivery append failure");
                }
                self.restock_after_failure(&institution_id, request.basket_count);
                Err(err.into())
            }
        }
    }

    /// Re-activate a blocked family. Administrators only; no inventory or
    /// delivery-log side effects.
    pub fn unblock_family(
        &self,
        session: &Session,
        family_id: &FamilyId,
    ) -> Result<Family, DistributionError> {
        if !session.is_admin() {
            return Err(DistributionError::Forbidden);
        }

        let family = self
            .families
            .fetch(family_id)?
            .ok_or(RepositoryError::NotFound)?;
        let unblocked = Family {
            status: FamilyStatus::Active,
            blocked_until: None,
            ..family
        };
        self.families.update(unblocked.clone())?;
        Ok(unblocked)
    }

    /// Self-service stock increment on the acting institution's inventory.
    /// There is no decrement path here; baskets only leave through
    /// deliveries.
    pub fn add_stock(
        &self,
        session: &Session,
        item: &str,
        quantity: u32,
    ) -> Result<(), DistributionError> {
        let institution_id = self.acting_institution(session, None)?;
        if item.trim().is_empty() {
            return Err(DistributionError::InvalidItemName);
        }
        if quantity == 0 {
            return Err(DistributionError::InvalidQuantity);
        }

        self.institutions.restock(&institution_id, item, quantity)?;
        Ok(())
    }

    /// Register a new family in the program. Open to any authenticated
    /// user; the family starts active with no block date.
    pub fn register_family(
        &self,
        _session: &Session,
        request: RegisterFamilyRequest,
    ) -> Result<Family, DistributionError> {
        if request.name.trim().is_empty() {
            return Err(DistributionError::InvalidName);
        }

        let family = Family {
            id: FamilyId(String::new()),
            name: request.name,
            address: request.address,
            phone: request.phone,
            members: request.members,
            income: request.income,
            status: FamilyStatus::Active,
            blocked_until: None,
            created_at: Local::now().date_naive(),
        };
        Ok(self.families.insert(family)?)
    }

    /// Create an institution with its opening basket stock. Administrators
    /// only.
    pub fn create_institution(
        &self,
        session: &Session,
        request: CreateInstitutionRequest,
    ) -> Result<Institution, DistributionError> {
        if !session.is_admin() {
            return Err(DistributionError::Forbidden);
        }
        if request.name.trim().is_empty() {
            return Err(DistributionError::InvalidName);
        }

        let institution = Institution {
            id: InstitutionId(String::new()),
            name: request.name,
            address: request.address,
            phone: request.phone,
            inventory: Inventory::with_baskets(request.baskets),
            created_at: Local::now().date_naive(),
        };
        Ok(self.institutions.insert(institution)?)
    }

    /// Update an institution's contact details. Administrators only; the
    /// inventory and creation date are preserved.
    pub fn update_institution(
        &self,
        session: &Session,
        institution_id: &InstitutionId,
        update: InstitutionUpdate,
    ) -> Result<Institution, DistributionError> {
        if !session.is_admin() {
            return Err(DistributionError::Forbidden);
        }
        if update.name.trim().is_empty() {
            return Err(DistributionError::InvalidName);
        }

        let institution = self
            .institutions
            .fetch(institution_id)?
            .ok_or(RepositoryError::NotFound)?;
        let updated = Institution {
            name: update.name,
            address: update.address,
            phone: update.phone,
            ..institution
        };
        self.institutions.update(updated.clone())?;
        Ok(updated)
    }

    /// Institutions visible to the session: all of them for admins, the
    /// operator's own one otherwise.
    pub fn institutions_for(
        &self,
        session: &Session,
    ) -> Result<Vec<Institution>, DistributionError> {
        let institutions = self.institutions.list()?;
        if session.is_admin() {
            return Ok(institutions);
        }
        Ok(institutions
            .into_iter()
            .filter(|institution| Some(&institution.id) == session.institution_id.as_ref())
            .collect())
    }

    /// Deliveries visible to the session, newest first. Admins see the full
    /// log; normal users only their institution's entries.
    pub fn deliveries_for(&self, session: &Session) -> Result<Vec<Delivery>, DistributionError> {
        let mut deliveries = if session.is_admin() {
            self.deliveries.list()?
        } else {
            let institution_id = self.acting_institution(session, None)?;
            self.deliveries.list_for_institution(&institution_id)?
        };
        deliveries.sort_by(|a, b| b.delivery_date.cmp(&a.delivery_date));
        Ok(deliveries)
    }

    pub fn families(&self) -> Result<Vec<Family>, DistributionError> {
        Ok(self.families.list()?)
    }

    pub fn institutions(&self) -> Result<Vec<Institution>, DistributionError> {
        Ok(self.institutions.list()?)
    }

    fn acting_institution(
        &self,
        session: &Session,
        override_id: Option<InstitutionId>,
    ) -> Result<InstitutionId, DistributionError> {
        match override_id {
            Some(id) if session.is_admin() => Ok(id),
            Some(_) => Err(DistributionError::Forbidden),
            None => session
                .institution_id
                .clone()
                .ok_or(DistributionError::MissingInstitution),
        }
    }

    fn restock_after_failure(&self, institution_id: &InstitutionId, count: u32) {
        warn!(
            institution = %institution_id.0,
            count, "compensating reserved baskets after failed delivery write"
        );
        if let Err(err) = self.institutions.restock(institution_id, BASKETS_KEY, count) {
            error!(%err, "failed to restock reserved baskets; inventory understated");
        }
    }
}
