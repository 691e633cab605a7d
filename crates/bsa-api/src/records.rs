//! Rows exchanged with the datastore.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::Role;

pub type RecordId = String;

pub const SALE_COMPLETED: &str = "completed";

/// Stored passcode for one role. Only the unlock path reads `hashed_code`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessCode {
    pub id: RecordId,
    pub role: String,
    pub hashed_code: String,
    pub active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rotated_at: Option<DateTime<Utc>>,
}

/// Access code as listed to owners; never carries the hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessCodeSummary {
    pub id: RecordId,
    pub role: String,
    pub active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rotated_at: Option<DateTime<Utc>>,
}

impl From<&AccessCode> for AccessCodeSummary {
    fn from(code: &AccessCode) -> Self {
        Self {
            id: code.id.clone(),
            role: code.role.clone(),
            active: code.active,
            created_at: code.created_at,
            rotated_at: code.rotated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewAccessCode {
    pub role: Role,
    pub hashed_code: String,
    pub active: bool,
}

/// Partial update; unset fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessCodeUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl AccessCodeUpdate {
    pub fn is_empty(&self) -> bool {
        self.active.is_none() && self.role.is_none()
    }
}

/// Staff login profile (email based, managed by owners).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: RecordId,
    pub email: String,
    pub role: String,
    pub active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewProfile {
    pub email: String,
    pub role: Role,
    pub active: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.active.is_none() && self.role.is_none() && self.email.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewClient {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default_price: f64,
    #[serde(default)]
    pub default_duration_minutes: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewService {
    pub name: String,
    pub description: Option<String>,
    pub default_price: f64,
    pub default_duration_minutes: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffMember {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    pub active: bool,
}

/// `{id, name}` of a row joined onto a sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedRef {
    pub id: RecordId,
    pub name: String,
}

/// A sale with its joined service, client and staff names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub id: RecordId,
    #[serde(default)]
    pub sale_number: Option<i64>,
    #[serde(default)]
    pub service_id: Option<RecordId>,
    #[serde(default)]
    pub client_id: Option<RecordId>,
    #[serde(default)]
    pub staff_id: Option<RecordId>,
    pub service_date: NaiveDate,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub location_type: Option<String>,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub discount: f64,
    #[serde(default)]
    pub amount_paid: f64,
    #[serde(default)]
    pub balance: f64,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub transport_cost: f64,
    #[serde(default)]
    pub other_expenses: f64,
    #[serde(default)]
    pub staff_commission_pct: f64,
    #[serde(default)]
    pub staff_commission_amount: f64,
    #[serde(default)]
    pub profit: f64,
    pub status: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, rename = "services")]
    pub service: Option<NamedRef>,
    #[serde(default, rename = "clients")]
    pub client: Option<NamedRef>,
    #[serde(default)]
    pub staff: Option<NamedRef>,
}

impl Sale {
    pub fn is_completed(&self) -> bool {
        self.status == SALE_COMPLETED
    }
}

/// Fully derived sale row, ready to insert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaleInsert {
    pub service_id: RecordId,
    pub client_id: Option<RecordId>,
    pub staff_id: Option<RecordId>,
    pub service_date: NaiveDate,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub location_type: String,
    pub price: f64,
    pub discount: f64,
    pub amount_paid: f64,
    pub balance: f64,
    pub payment_method: Option<String>,
    pub transport_cost: f64,
    pub other_expenses: f64,
    pub staff_commission_pct: f64,
    pub staff_commission_amount: f64,
    pub profit: f64,
    pub status: String,
    pub notes: Option<String>,
}

/// Row filter for sale listings. Unset fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct SaleFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub status: Option<String>,
    pub client_id: Option<RecordId>,
    pub staff_id: Option<RecordId>,
    pub limit: Option<usize>,
}

impl SaleFilter {
    pub fn completed_between(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
            status: Some(SALE_COMPLETED.to_string()),
            ..Self::default()
        }
    }

    /// True if `sale` passes every set field. Ignores `limit`.
    pub fn matches(&self, sale: &Sale) -> bool {
        self.from.is_none_or(|d| sale.service_date >= d)
            && self.to.is_none_or(|d| sale.service_date <= d)
            && self.status.as_deref().is_none_or(|s| sale.status == s)
            && self
                .client_id
                .as_ref()
                .is_none_or(|id| sale.client_id.as_ref() == Some(id))
            && self
                .staff_id
                .as_ref()
                .is_none_or(|id| sale.staff_id.as_ref() == Some(id))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payout {
    pub id: RecordId,
    pub staff_id: RecordId,
    pub amount: f64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub scheduled_for: Option<NaiveDate>,
    #[serde(default)]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewPayout {
    pub staff_id: RecordId,
    pub amount: f64,
    pub scheduled_for: Option<NaiveDate>,
    pub notes: Option<String>,
}
