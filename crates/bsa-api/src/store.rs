//! Datastore seams. Implementations live in `bsa-connectors`.

use async_trait::async_trait;

use crate::records::{
    AccessCode, AccessCodeSummary, AccessCodeUpdate, Client, NewAccessCode, NewClient, NewPayout,
    NewProfile, NewService, Payout, Profile, ProfileUpdate, Sale, SaleFilter, SaleInsert, Service,
    StaffMember,
};
use crate::BsaError;

#[async_trait]
pub trait AccessCodeStore: Send + Sync {
    async fn active_access_codes(&self) -> Result<Vec<AccessCode>, BsaError>;
    async fn list_access_codes(&self) -> Result<Vec<AccessCodeSummary>, BsaError>;
    async fn create_access_code(&self, code: NewAccessCode) -> Result<AccessCodeSummary, BsaError>;
    async fn update_access_code(
        &self,
        id: &str,
        update: AccessCodeUpdate,
    ) -> Result<AccessCodeSummary, BsaError>;
    async fn delete_access_code(&self, id: &str) -> Result<(), BsaError>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn list_profiles(&self) -> Result<Vec<Profile>, BsaError>;
    async fn find_profile_by_email(&self, email: &str) -> Result<Option<Profile>, BsaError>;
    async fn create_profile(&self, profile: NewProfile) -> Result<Profile, BsaError>;
    async fn update_profile(&self, id: &str, update: ProfileUpdate) -> Result<Profile, BsaError>;
    async fn delete_profile(&self, id: &str) -> Result<(), BsaError>;
}

#[async_trait]
pub trait BusinessStore: Send + Sync {
    async fn list_clients(&self) -> Result<Vec<Client>, BsaError>;
    async fn create_client(&self, client: NewClient) -> Result<Client, BsaError>;

    /// Active services ordered by name.
    async fn list_services(&self) -> Result<Vec<Service>, BsaError>;
    async fn create_service(&self, service: NewService) -> Result<Service, BsaError>;

    /// Active staff ordered by name.
    async fn list_staff(&self) -> Result<Vec<StaffMember>, BsaError>;

    /// Sales matching `filter`, newest `service_date` first.
    async fn list_sales(&self, filter: SaleFilter) -> Result<Vec<Sale>, BsaError>;
    async fn create_sale(&self, sale: SaleInsert) -> Result<String, BsaError>;
    async fn delete_sale(&self, id: &str) -> Result<(), BsaError>;

    /// Most recently created payouts first.
    async fn list_payouts(&self, limit: usize) -> Result<Vec<Payout>, BsaError>;
    async fn create_payout(&self, payout: NewPayout) -> Result<Payout, BsaError>;
}

/// Delivers passwordless sign-in links to profile emails.
#[async_trait]
pub trait MagicLinkSender: Send + Sync {
    async fn send_magic_link(&self, email: &str, redirect_to: &str) -> Result<(), BsaError>;
}
