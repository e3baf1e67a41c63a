//! Basic-food-basket distribution: family registry, institution inventory,
//! eligibility-gated delivery recording, dashboards, and session scoping.

pub mod dashboard;
pub mod domain;
pub mod eligibility;
pub mod repository;
pub mod router;
pub mod seed;
pub mod service;
pub mod session;

#[cfg(test)]
mod tests;

pub use dashboard::{summarize, DashboardSummary};
pub use domain::{
    parse_other_items, BlockPeriod, Delivery, DeliveryId, DeliveryItems, Family, FamilyId,
    FamilyStatus, Institution, InstitutionId, Inventory, User, UserId, UserRole,
};
pub use eligibility::{filter_families, StatusFilter};
pub use repository::{
    DeliveryRepository, FamilyRepository, InMemoryDeliveryRepository, InMemoryFamilyRepository,
    InMemoryInstitutionRepository, InMemoryUserRepository, InstitutionRepository, RepositoryError,
    UserRepository,
};
pub use router::{distribution_router, DistributionState};
pub use seed::{load_example_data, SeedSummary};
pub use service::{
    CreateInstitutionRequest, DeliveryRequest, DistributionError, DistributionService,
    InstitutionUpdate, RegisterFamilyRequest,
};
pub use session::{AuthError, Session, SessionManager};
