use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

mod records;
mod store;

pub use records::{
    AccessCode, AccessCodeSummary, AccessCodeUpdate, Client, NamedRef, NewAccessCode, NewClient,
    NewPayout, NewProfile, NewService, Payout, Profile, ProfileUpdate, RecordId, Sale, SaleFilter,
    SaleInsert, Service, StaffMember, SALE_COMPLETED,
};
pub use store::{AccessCodeStore, BusinessStore, MagicLinkSender, ProfileStore};

/// Authorization level carried by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Manager,
    Investor,
    Staff,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Owner, Role::Manager, Role::Investor, Role::Staff];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Manager => "manager",
            Role::Investor => "investor",
            Role::Staff => "staff",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = BsaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| BsaError::Validation(format!("unknown role {s}")))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BsaError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("authentication error: {0}")]
    Auth(String),
    #[error("connection error: {0}")]
    Connection(String),
    #[error("conflict error: {0}")]
    Conflict(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal error: {0}")]
    Internal(String),
}

pub trait SecretStore: Send + Sync {
    fn get(&self, secret_ref: &str) -> Result<String, BsaError>;
}
