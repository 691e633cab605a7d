use std::collections::HashMap;

use bsa_api::{
    BsaError, Client, NewClient, NewPayout, NewService, Payout, Sale, SaleFilter, SaleInsert,
    Service, StaffMember, SALE_COMPLETED,
};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::BackOffice;

pub(crate) const RECENT_SALES: usize = 50;
pub(crate) const CLIENT_VISITS: usize = 20;
pub(crate) const RECENT_PAYOUTS: usize = 200;

/// Client row with lifetime stats over all of its sales.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientSummary {
    #[serde(flatten)]
    pub client: Client,
    pub visits: usize,
    pub total_spent: f64,
    pub last_visit: Option<NaiveDate>,
}

/// Staff row with month-to-date completed services and commission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaffSummary {
    #[serde(flatten)]
    pub staff: StaffMember,
    pub services: usize,
    pub commission: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Visit {
    pub id: String,
    pub service_date: NaiveDate,
    pub service_name: String,
    pub price: f64,
    pub status: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClientInput {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServiceInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub default_price: Option<f64>,
    pub default_duration_minutes: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PayoutInput {
    pub staff_id: Option<String>,
    pub amount: Option<f64>,
    pub scheduled_for: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Sale as submitted by the UI; money fields are derived on [`SaleInput::derive`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SaleInput {
    pub service_id: Option<String>,
    pub client_id: Option<String>,
    pub staff_id: Option<String>,
    pub service_date: Option<NaiveDate>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub price: Option<f64>,
    pub discount: Option<f64>,
    pub amount_paid: Option<f64>,
    pub payment_method: Option<String>,
    pub location_type: Option<String>,
    pub transport_cost: Option<f64>,
    pub other_expenses: Option<f64>,
    pub staff_commission_pct: Option<f64>,
    pub notes: Option<String>,
    pub status: Option<String>,
}

impl SaleInput {
    /// Fill defaults and compute commission, profit and balance.
    pub fn derive(self) -> Result<SaleInsert, BsaError> {
        let (Some(service_id), Some(service_date)) =
            (self.service_id.filter(|s| !s.is_empty()), self.service_date)
        else {
            return Err(BsaError::Validation("Missing required fields".to_string()));
        };

        let price = self.price.unwrap_or(0.0);
        let amount_paid = self.amount_paid.unwrap_or(0.0);
        let transport_cost = self.transport_cost.unwrap_or(0.0);
        let other_expenses = self.other_expenses.unwrap_or(0.0);
        let staff_commission_pct = self.staff_commission_pct.unwrap_or(0.0);
        let staff_commission_amount = price * staff_commission_pct / 100.0;

        Ok(SaleInsert {
            service_id,
            client_id: self.client_id.filter(|s| !s.is_empty()),
            staff_id: self.staff_id.filter(|s| !s.is_empty()),
            service_date,
            start_time: self.start_time,
            end_time: self.end_time,
            location_type: self.location_type.unwrap_or_else(|| "In-Shop".to_string()),
            price,
            discount: self.discount.unwrap_or(0.0),
            amount_paid,
            balance: price - amount_paid,
            payment_method: self.payment_method,
            transport_cost,
            other_expenses,
            staff_commission_pct,
            staff_commission_amount,
            profit: amount_paid - staff_commission_amount - transport_cost - other_expenses,
            status: self.status.unwrap_or_else(|| SALE_COMPLETED.to_string()),
            notes: self.notes,
        })
    }
}

pub(crate) fn month_start(today: NaiveDate) -> NaiveDate {
    today.with_day(1).unwrap_or(today)
}

impl BackOffice {
    pub async fn list_clients(&self) -> Result<Vec<ClientSummary>, BsaError> {
        let clients = self.stores.business.list_clients().await?;
        let sales = self.stores.business.list_sales(SaleFilter::default()).await?;

        let mut stats: HashMap<&str, (usize, f64, Option<NaiveDate>)> = HashMap::new();
        for sale in &sales {
            let Some(client_id) = sale.client_id.as_deref() else {
                continue;
            };
            let entry = stats.entry(client_id).or_default();
            entry.0 += 1;
            entry.1 += sale.amount_paid;
            entry.2 = entry.2.max(Some(sale.service_date));
        }

        Ok(clients
            .into_iter()
            .map(|client| {
                let (visits, total_spent, last_visit) =
                    stats.get(client.id.as_str()).copied().unwrap_or_default();
                ClientSummary {
                    client,
                    visits,
                    total_spent,
                    last_visit,
                }
            })
            .collect())
    }

    /// New clients start with status `new` unless one is given.
    pub async fn create_client(&self, input: ClientInput) -> Result<Client, BsaError> {
        let Some(name) = input.name.filter(|n| !n.trim().is_empty()) else {
            return Err(BsaError::Validation("Missing name".to_string()));
        };
        self.stores
            .business
            .create_client(NewClient {
                name,
                phone: input.phone,
                email: input.email,
                status: input.status.unwrap_or_else(|| "new".to_string()),
            })
            .await
    }

    /// Last 20 sales of one client, newest first.
    pub async fn client_visits(&self, client_id: &str) -> Result<Vec<Visit>, BsaError> {
        let sales = self
            .stores
            .business
            .list_sales(SaleFilter {
                client_id: Some(client_id.to_string()),
                limit: Some(CLIENT_VISITS),
                ..SaleFilter::default()
            })
            .await?;
        Ok(sales
            .into_iter()
            .map(|s| Visit {
                id: s.id,
                service_date: s.service_date,
                service_name: s
                    .service
                    .map_or_else(|| "Unknown Service".to_string(), |r| r.name),
                price: s.price,
                status: s.status,
            })
            .collect())
    }

    pub async fn list_services(&self) -> Result<Vec<Service>, BsaError> {
        self.stores.business.list_services().await
    }

    pub async fn create_service(&self, input: ServiceInput) -> Result<Service, BsaError> {
        let Some(name) = input.name.filter(|n| !n.trim().is_empty()) else {
            return Err(BsaError::Validation("Missing name".to_string()));
        };
        self.stores
            .business
            .create_service(NewService {
                name,
                description: input.description,
                default_price: input.default_price.unwrap_or(0.0),
                default_duration_minutes: input.default_duration_minutes.unwrap_or(60),
            })
            .await
    }

    /// Active staff with completed services and commission from the first of the month to `today`.
    pub async fn list_staff(&self, today: NaiveDate) -> Result<Vec<StaffSummary>, BsaError> {
        let staff = self.stores.business.list_staff().await?;
        let sales = self
            .stores
            .business
            .list_sales(SaleFilter::completed_between(month_start(today), today))
            .await?;

        let mut stats: HashMap<&str, (usize, f64)> = HashMap::new();
        for sale in &sales {
            if let Some(staff_id) = sale.staff_id.as_deref() {
                let entry = stats.entry(staff_id).or_default();
                entry.0 += 1;
                entry.1 += sale.staff_commission_amount;
            }
        }

        Ok(staff
            .into_iter()
            .map(|member| {
                let (services, commission) =
                    stats.get(member.id.as_str()).copied().unwrap_or_default();
                StaffSummary {
                    staff: member,
                    services,
                    commission,
                }
            })
            .collect())
    }

    /// The 50 most recent sales by service date.
    pub async fn recent_sales(&self) -> Result<Vec<Sale>, BsaError> {
        self.stores
            .business
            .list_sales(SaleFilter {
                limit: Some(RECENT_SALES),
                ..SaleFilter::default()
            })
            .await
    }

    pub async fn create_sale(&self, input: SaleInput) -> Result<String, BsaError> {
        let sale = input.derive()?;
        let id = self.stores.business.create_sale(sale).await?;
        tracing::info!(sale_id = %id, "sale recorded");
        Ok(id)
    }

    pub async fn delete_sale(&self, id: &str) -> Result<(), BsaError> {
        if id.is_empty() {
            return Err(BsaError::Validation("Missing sale ID".to_string()));
        }
        self.stores.business.delete_sale(id).await?;
        tracing::info!(sale_id = %id, "sale deleted");
        Ok(())
    }

    pub async fn list_payouts(&self) -> Result<Vec<Payout>, BsaError> {
        self.stores.business.list_payouts(RECENT_PAYOUTS).await
    }

    /// `staff_id` and a non-zero `amount` are required.
    pub async fn create_payout(&self, input: PayoutInput) -> Result<Payout, BsaError> {
        let (Some(staff_id), Some(amount)) = (
            input.staff_id.filter(|s| !s.is_empty()),
            input.amount.filter(|a| *a != 0.0),
        ) else {
            return Err(BsaError::Validation("Missing required fields".to_string()));
        };
        self.stores
            .business
            .create_payout(NewPayout {
                staff_id,
                amount,
                scheduled_for: input.scheduled_for,
                notes: input.notes,
            })
            .await
    }
}
