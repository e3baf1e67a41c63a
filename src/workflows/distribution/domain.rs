use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier wrapper for registered families.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FamilyId(pub String);

/// Identifier wrapper for distributing institutions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstitutionId(pub String);

/// Identifier wrapper for delivery log entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeliveryId(pub String);

/// Identifier wrapper for system users.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Whether a family may currently receive a basket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FamilyStatus {
    Active,
    Blocked,
}

impl FamilyStatus {
    pub const fn label(self) -> &'static str {
        match self {
            FamilyStatus::Active => "active",
            FamilyStatus::Blocked => "blocked",
        }
    }
}

/// A registered family in the municipal program.
///
/// `blocked_until` is set exactly when the status is [`FamilyStatus::Blocked`];
/// expiry is manual (an administrator unblocks), so the date may be in the past.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Family {
    pub id: FamilyId,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub members: u32,
    /// Monthly household income in centavos.
    pub income: u64,
    pub status: FamilyStatus,
    pub blocked_until: Option<NaiveDate>,
    pub created_at: NaiveDate,
}

/// Per-institution stock, keyed by lower-cased item name.
///
/// The `baskets` entry is always present; basket counts are unsigned so the
/// floor at zero is structural rather than clamped after the fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Inventory {
    items: BTreeMap<String, u32>,
}

pub const BASKETS_KEY: &str = "baskets";

impl Inventory {
    pub fn with_baskets(baskets: u32) -> Self {
        let mut items = BTreeMap::new();
        items.insert(BASKETS_KEY.to_string(), baskets);
        Self { items }
    }

    pub fn baskets(&self) -> u32 {
        self.items.get(BASKETS_KEY).copied().unwrap_or(0)
    }

    /// Add stock for an item, creating the lower-cased key when absent.
    pub fn add(&mut self, item: &str, quantity: u32) {
        let key = item.trim().to_lowercase();
        let entry = self.items.entry(key).or_insert(0);
        *entry = entry.saturating_add(quantity);
    }

    /// Remove baskets if enough are available, returning the remaining count.
    /// The check and the decrement happen together so callers holding the
    /// store lock get compare-and-set semantics.
    pub fn take_baskets(&mut self, count: u32) -> Result<u32, u32> {
        let available = self.baskets();
        if count > available {
            return Err(available);
        }
        self.items.insert(BASKETS_KEY.to_string(), available - count);
        Ok(available - count)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, u32)> {
        self.items.iter().map(|(name, qty)| (name.as_str(), *qty))
    }
}

/// A community organization holding inventory and distributing baskets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Institution {
    pub id: InstitutionId,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub inventory: Inventory,
    pub created_at: NaiveDate,
}

/// Items handed over in a single delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryItems {
    pub baskets: u32,
    #[serde(default)]
    pub others: Vec<String>,
}

/// One entry in the append-only delivery log. Family and institution names
/// are snapshotted at creation so reports survive later renames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub id: DeliveryId,
    pub family_id: FamilyId,
    pub family_name: String,
    pub institution_id: InstitutionId,
    pub institution_name: String,
    pub delivery_date: NaiveDate,
    pub items: DeliveryItems,
    pub created_at: NaiveDate,
}

/// Access level granted to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Normal,
}

impl UserRole {
    pub const fn label(self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Normal => "normal",
        }
    }
}

/// A system user. Normal users are scoped to a single institution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub institution_id: Option<InstitutionId>,
    /// Stored verbatim for the exact-match login check; never serialized in views.
    pub password: String,
}

/// How long a family stays ineligible after receiving a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum BlockPeriod {
    Days15,
    Days30,
    Days45,
    Days60,
    Days90,
}

impl BlockPeriod {
    pub const fn days(self) -> i64 {
        match self {
            BlockPeriod::Days15 => 15,
            BlockPeriod::Days30 => 30,
            BlockPeriod::Days45 => 45,
            BlockPeriod::Days60 => 60,
            BlockPeriod::Days90 => 90,
        }
    }
}

impl From<BlockPeriod> for i64 {
    fn from(period: BlockPeriod) -> Self {
        period.days()
    }
}

impl TryFrom<i64> for BlockPeriod {
    type Error = String;

    fn try_from(days: i64) -> Result<Self, Self::Error> {
        match days {
            15 => Ok(BlockPeriod::Days15),
            30 => Ok(BlockPeriod::Days30),
            45 => Ok(BlockPeriod::Days45),
            60 => Ok(BlockPeriod::Days60),
            90 => Ok(BlockPeriod::Days90),
            other => Err(format!(
                "block period must be one of 15, 30, 45, 60 or 90 days (got {other})"
            )),
        }
    }
}

/// Split the free-text "other items" field on commas, trimming whitespace.
/// Blank input yields an empty list.
pub fn parse_other_items(raw: &str) -> Vec<String> {
    if raw.trim().is_empty() {
        return Vec::new();
    }

    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
