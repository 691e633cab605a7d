use std::collections::BTreeMap;
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use bsa_api::{
    AccessCode, AccessCodeStore, AccessCodeSummary, AccessCodeUpdate, BsaError, BusinessStore,
    Client, MagicLinkSender, NamedRef, NewAccessCode, NewClient, NewPayout, NewProfile, NewService,
    Payout, Profile, ProfileStore, ProfileUpdate, Role, Sale, SaleFilter, SaleInsert, Service,
    StaffMember,
};
use chrono::Utc;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    access_codes: Vec<AccessCode>,
    profiles: Vec<Profile>,
    clients: Vec<Client>,
    services: Vec<Service>,
    staff: Vec<StaffMember>,
    sales: Vec<Sale>,
    payouts: Vec<Payout>,
    next_sale_number: i64,
}

/// In-process datastore. Rows live in insertion order; listings sort on read.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    sent_links: Mutex<Vec<(String, String)>>,
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn named(id: &str, name: &str) -> NamedRef {
    NamedRef {
        id: id.to_string(),
        name: name.to_string(),
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, BsaError> {
        self.tables
            .read()
            .map_err(|_| BsaError::Internal("memory store poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, BsaError> {
        self.tables
            .write()
            .map_err(|_| BsaError::Internal("memory store poisoned".to_string()))
    }

    /// Insert an already hashed access code.
    pub fn seed_access_code(
        &self,
        role: Role,
        hashed_code: impl Into<String>,
        active: bool,
    ) -> Result<AccessCodeSummary, BsaError> {
        let code = AccessCode {
            id: new_id(),
            role: role.as_str().to_string(),
            hashed_code: hashed_code.into(),
            active,
            created_at: Some(Utc::now()),
            rotated_at: None,
        };
        let summary = AccessCodeSummary::from(&code);
        self.write()?.access_codes.push(code);
        Ok(summary)
    }

    pub fn seed_staff(
        &self,
        name: impl Into<String>,
        role: Option<&str>,
        active: bool,
    ) -> Result<StaffMember, BsaError> {
        let member = StaffMember {
            id: new_id(),
            name: name.into(),
            role: role.map(str::to_string),
            rating: None,
            active,
        };
        self.write()?.staff.push(member.clone());
        Ok(member)
    }

    /// Insert a sale row as-is, bypassing the derivations done by the service layer.
    pub fn seed_sale(&self, sale: Sale) -> Result<(), BsaError> {
        self.write()?.sales.push(sale);
        Ok(())
    }

    /// `(email, redirect_to)` pairs passed to [`MagicLinkSender::send_magic_link`].
    pub fn sent_magic_links(&self) -> Vec<(String, String)> {
        self.sent_links
            .lock()
            .map(|links| links.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AccessCodeStore for MemoryStore {
    async fn active_access_codes(&self) -> Result<Vec<AccessCode>, BsaError> {
        Ok(self
            .read()?
            .access_codes
            .iter()
            .filter(|c| c.active)
            .cloned()
            .collect())
    }

    async fn list_access_codes(&self) -> Result<Vec<AccessCodeSummary>, BsaError> {
        Ok(self
            .read()?
            .access_codes
            .iter()
            .map(AccessCodeSummary::from)
            .collect())
    }

    async fn create_access_code(&self, code: NewAccessCode) -> Result<AccessCodeSummary, BsaError> {
        self.seed_access_code(code.role, code.hashed_code, code.active)
    }

    async fn update_access_code(
        &self,
        id: &str,
        update: AccessCodeUpdate,
    ) -> Result<AccessCodeSummary, BsaError> {
        let mut tables = self.write()?;
        let code = tables
            .access_codes
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| BsaError::NotFound(format!("access code {id}")))?;
        if let Some(active) = update.active {
            code.active = active;
        }
        if let Some(role) = update.role {
            code.role = role.as_str().to_string();
        }
        Ok(AccessCodeSummary::from(&*code))
    }

    async fn delete_access_code(&self, id: &str) -> Result<(), BsaError> {
        self.write()?.access_codes.retain(|c| c.id != id);
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn list_profiles(&self) -> Result<Vec<Profile>, BsaError> {
        Ok(self.read()?.profiles.iter().rev().cloned().collect())
    }

    async fn find_profile_by_email(&self, email: &str) -> Result<Option<Profile>, BsaError> {
        Ok(self
            .read()?
            .profiles
            .iter()
            .find(|p| p.email == email)
            .cloned())
    }

    async fn create_profile(&self, profile: NewProfile) -> Result<Profile, BsaError> {
        let mut tables = self.write()?;
        if tables.profiles.iter().any(|p| p.email == profile.email) {
            return Err(BsaError::Conflict(format!(
                "profile {} already exists",
                profile.email
            )));
        }
        let row = Profile {
            id: new_id(),
            email: profile.email,
            role: profile.role.as_str().to_string(),
            active: profile.active,
            created_at: Some(Utc::now()),
            last_login: None,
        };
        tables.profiles.push(row.clone());
        Ok(row)
    }

    async fn update_profile(&self, id: &str, update: ProfileUpdate) -> Result<Profile, BsaError> {
        let mut tables = self.write()?;
        if let Some(email) = &update.email {
            if tables.profiles.iter().any(|p| p.id != id && &p.email == email) {
                return Err(BsaError::Conflict(format!("profile {email} already exists")));
            }
        }
        let profile = tables
            .profiles
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| BsaError::NotFound(format!("profile {id}")))?;
        if let Some(active) = update.active {
            profile.active = active;
        }
        if let Some(role) = update.role {
            profile.role = role.as_str().to_string();
        }
        if let Some(email) = update.email {
            profile.email = email;
        }
        Ok(profile.clone())
    }

    async fn delete_profile(&self, id: &str) -> Result<(), BsaError> {
        self.write()?.profiles.retain(|p| p.id != id);
        Ok(())
    }
}

#[async_trait]
impl BusinessStore for MemoryStore {
    async fn list_clients(&self) -> Result<Vec<Client>, BsaError> {
        let mut clients = self.read()?.clients.clone();
        clients.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(clients)
    }

    async fn create_client(&self, client: NewClient) -> Result<Client, BsaError> {
        let row = Client {
            id: new_id(),
            name: client.name,
            phone: client.phone,
            email: client.email,
            status: Some(client.status),
        };
        self.write()?.clients.push(row.clone());
        Ok(row)
    }

    async fn list_services(&self) -> Result<Vec<Service>, BsaError> {
        let mut services = self.read()?.services.clone();
        services.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(services)
    }

    async fn create_service(&self, service: NewService) -> Result<Service, BsaError> {
        let row = Service {
            id: new_id(),
            name: service.name,
            description: service.description,
            default_price: service.default_price,
            default_duration_minutes: Some(service.default_duration_minutes),
        };
        self.write()?.services.push(row.clone());
        Ok(row)
    }

    async fn list_staff(&self) -> Result<Vec<StaffMember>, BsaError> {
        let mut staff: Vec<StaffMember> = self
            .read()?
            .staff
            .iter()
            .filter(|s| s.active)
            .cloned()
            .collect();
        staff.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(staff)
    }

    async fn list_sales(&self, filter: SaleFilter) -> Result<Vec<Sale>, BsaError> {
        let tables = self.read()?;
        // Newest first; insertion order breaks date ties.
        let mut sales: Vec<Sale> = tables
            .sales
            .iter()
            .rev()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        sales.sort_by(|a, b| b.service_date.cmp(&a.service_date));
        if let Some(limit) = filter.limit {
            sales.truncate(limit);
        }
        Ok(sales)
    }

    async fn create_sale(&self, sale: SaleInsert) -> Result<String, BsaError> {
        let mut tables = self.write()?;
        let service = tables
            .services
            .iter()
            .find(|s| s.id == sale.service_id)
            .map(|s| named(&s.id, &s.name));
        let client = sale.client_id.as_deref().and_then(|id| {
            tables
                .clients
                .iter()
                .find(|c| c.id == id)
                .map(|c| named(&c.id, &c.name))
        });
        let staff = sale.staff_id.as_deref().and_then(|id| {
            tables
                .staff
                .iter()
                .find(|s| s.id == id)
                .map(|s| named(&s.id, &s.name))
        });
        tables.next_sale_number += 1;
        let sale_number = tables.next_sale_number;

        let id = new_id();
        tables.sales.push(Sale {
            id: id.clone(),
            sale_number: Some(sale_number),
            service_id: Some(sale.service_id),
            client_id: sale.client_id,
            staff_id: sale.staff_id,
            service_date: sale.service_date,
            start_time: sale.start_time,
            end_time: sale.end_time,
            location_type: Some(sale.location_type),
            price: sale.price,
            discount: sale.discount,
            amount_paid: sale.amount_paid,
            balance: sale.balance,
            payment_method: sale.payment_method,
            transport_cost: sale.transport_cost,
            other_expenses: sale.other_expenses,
            staff_commission_pct: sale.staff_commission_pct,
            staff_commission_amount: sale.staff_commission_amount,
            profit: sale.profit,
            status: sale.status,
            notes: sale.notes,
            created_at: Some(Utc::now()),
            service,
            client,
            staff,
        });
        Ok(id)
    }

    async fn delete_sale(&self, id: &str) -> Result<(), BsaError> {
        self.write()?.sales.retain(|s| s.id != id);
        Ok(())
    }

    async fn list_payouts(&self, limit: usize) -> Result<Vec<Payout>, BsaError> {
        Ok(self
            .read()?
            .payouts
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn create_payout(&self, payout: NewPayout) -> Result<Payout, BsaError> {
        let row = Payout {
            id: new_id(),
            staff_id: payout.staff_id,
            amount: payout.amount,
            status: Some("pending".to_string()),
            scheduled_for: payout.scheduled_for,
            processed_at: None,
            notes: payout.notes,
            created_at: Some(Utc::now()),
        };
        self.write()?.payouts.push(row.clone());
        Ok(row)
    }
}

#[async_trait]
impl MagicLinkSender for MemoryStore {
    async fn send_magic_link(&self, email: &str, redirect_to: &str) -> Result<(), BsaError> {
        tracing::info!(redirect_to, "magic link recorded (memory store)");
        self.sent_links
            .lock()
            .map_err(|_| BsaError::Internal("magic link log poisoned".to_string()))?
            .push((email.to_string(), redirect_to.to_string()));
        Ok(())
    }
}
