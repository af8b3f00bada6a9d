use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The authenticated actor behind a request. Built by the auth middleware
/// from a verified token plus a fresh role lookup, then threaded explicitly
/// into every operation that needs one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownVariant("role", other.to_string())),
        }
    }
}

/// Whether an item was lost by the poster or found by them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Lost,
    Found,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Lost => "lost",
            ItemKind::Found => "found",
        }
    }
}

impl FromStr for ItemKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lost" => Ok(ItemKind::Lost),
            "found" => Ok(ItemKind::Found),
            other => Err(UnknownVariant("item kind", other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemCategory {
    Electronics,
    Books,
    Clothing,
    Keys,
    Wallets,
    #[serde(rename = "ID Cards")]
    IdCards,
    Other,
}

impl ItemCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemCategory::Electronics => "Electronics",
            ItemCategory::Books => "Books",
            ItemCategory::Clothing => "Clothing",
            ItemCategory::Keys => "Keys",
            ItemCategory::Wallets => "Wallets",
            ItemCategory::IdCards => "ID Cards",
            ItemCategory::Other => "Other",
        }
    }
}

impl FromStr for ItemCategory {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Electronics" => Ok(ItemCategory::Electronics),
            "Books" => Ok(ItemCategory::Books),
            "Clothing" => Ok(ItemCategory::Clothing),
            "Keys" => Ok(ItemCategory::Keys),
            "Wallets" => Ok(ItemCategory::Wallets),
            "ID Cards" => Ok(ItemCategory::IdCards),
            "Other" => Ok(ItemCategory::Other),
            other => Err(UnknownVariant("category", other.to_string())),
        }
    }
}

/// Item lifecycle: active -> claimed -> resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Active,
    Claimed,
    Resolved,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Active => "active",
            ItemStatus::Claimed => "claimed",
            ItemStatus::Resolved => "resolved",
        }
    }
}

impl FromStr for ItemStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ItemStatus::Active),
            "claimed" => Ok(ItemStatus::Claimed),
            "resolved" => Ok(ItemStatus::Resolved),
            other => Err(UnknownVariant("item status", other.to_string())),
        }
    }
}

/// Claim lifecycle: pending -> approved | rejected, both terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimStatus {
    Pending,
    Approved,
    Rejected,
}

impl ClaimStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Pending => "pending",
            ClaimStatus::Approved => "approved",
            ClaimStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for ClaimStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ClaimStatus::Pending),
            "approved" => Ok(ClaimStatus::Approved),
            "rejected" => Ok(ClaimStatus::Rejected),
            other => Err(UnknownVariant("claim status", other.to_string())),
        }
    }
}

/// The owner's ruling on a pending claim. Deliberately excludes `pending`:
/// a claim is born pending and only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimDecision {
    Approved,
    Rejected,
}

impl From<ClaimDecision> for ClaimStatus {
    fn from(d: ClaimDecision) -> Self {
        match d {
            ClaimDecision::Approved => ClaimStatus::Approved,
            ClaimDecision::Rejected => ClaimStatus::Rejected,
        }
    }
}

#[derive(Debug)]
pub struct UnknownVariant(pub &'static str, pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {}: '{}'", self.0, self.1)
    }
}

impl std::error::Error for UnknownVariant {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_round_trip_through_str() {
        for role in [Role::User, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        for kind in [ItemKind::Lost, ItemKind::Found] {
            assert_eq!(kind.as_str().parse::<ItemKind>().unwrap(), kind);
        }
        for status in [ItemStatus::Active, ItemStatus::Claimed, ItemStatus::Resolved] {
            assert_eq!(status.as_str().parse::<ItemStatus>().unwrap(), status);
        }
        for status in [ClaimStatus::Pending, ClaimStatus::Approved, ClaimStatus::Rejected] {
            assert_eq!(status.as_str().parse::<ClaimStatus>().unwrap(), status);
        }
    }

    #[test]
    fn id_cards_category_keeps_its_display_name() {
        assert_eq!(ItemCategory::IdCards.as_str(), "ID Cards");
        assert_eq!("ID Cards".parse::<ItemCategory>().unwrap(), ItemCategory::IdCards);
        let json = serde_json::to_string(&ItemCategory::IdCards).unwrap();
        assert_eq!(json, "\"ID Cards\"");
    }

    #[test]
    fn unknown_variant_is_rejected() {
        assert!("owner".parse::<Role>().is_err());
        assert!("misplaced".parse::<ItemKind>().is_err());
    }
}
