use std::time::Duration;

use async_trait::async_trait;
use bsa_api::{
    AccessCode, AccessCodeStore, AccessCodeSummary, AccessCodeUpdate, BsaError, BusinessStore,
    Client, MagicLinkSender, NewAccessCode, NewClient, NewPayout, NewProfile, NewService, Payout,
    Profile, ProfileStore, ProfileUpdate, Sale, SaleFilter, SaleInsert, Service, StaffMember,
};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

const ACCESS_CODE_COLUMNS: &str = "id,role,active,created_at,rotated_at";
const PROFILE_COLUMNS: &str = "id,email,role,active,created_at,last_login";
const SALE_COLUMNS: &str = "id,sale_number,service_id,client_id,staff_id,service_date,\
start_time,end_time,location_type,price,discount,amount_paid,balance,payment_method,\
transport_cost,other_expenses,staff_commission_pct,staff_commission_amount,profit,status,\
notes,created_at,services(id,name),clients(id,name),staff(id,name)";

type Query = Vec<(&'static str, String)>;

/// Rows requested per page. PostgREST may return fewer when its `max-rows` is lower.
const PAGE_SIZE: usize = 1000;

/// Supabase datastore over PostgREST, authenticated with the service-role key.
pub struct PostgrestStore {
    url: String,
    service_key: String,
    http: reqwest::Client,
}

impl PostgrestStore {
    pub fn new(url: &str, service_key: String, timeout: Duration) -> Result<Self, BsaError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BsaError::Connection(format!("failed to build http client: {e}")))?;
        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            service_key,
            http,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.url)
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("apikey", &self.service_key)
            .header("Authorization", format!("Bearer {}", self.service_key))
    }

    async fn send(&self, req: RequestBuilder, what: &str) -> Result<Response, BsaError> {
        let resp = req
            .send()
            .await
            .map_err(|e| BsaError::Connection(format!("{what} request failed: {e}")))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        if status == StatusCode::CONFLICT {
            Err(BsaError::Conflict(format!("{what} failed ({status}): {body}")))
        } else {
            Err(BsaError::Connection(format!("{what} failed ({status}): {body}")))
        }
    }

    async fn rows<T: DeserializeOwned>(resp: Response, what: &str) -> Result<Vec<T>, BsaError> {
        resp.json()
            .await
            .map_err(|e| BsaError::Connection(format!("{what} returned an unexpected body: {e}")))
    }

    /// Every row matching `query`.
    ///
    /// Without an explicit `limit`, pages through `Range` until the exact
    /// count from `Content-Range` is reached, so a server-side row cap cannot
    /// truncate the result.
    async fn select<T: DeserializeOwned>(&self, table: &str, query: Query) -> Result<Vec<T>, BsaError> {
        let what = format!("select {table}");
        if query.iter().any(|(k, _)| *k == "limit") {
            let req = self.authorized(self.http.get(self.table_url(table))).query(&query);
            let resp = self.send(req, &what).await?;
            return Self::rows(resp, &what).await;
        }

        let mut all = Vec::new();
        loop {
            let start = all.len();
            let req = self
                .authorized(self.http.get(self.table_url(table)))
                .query(&query)
                .header("Range-Unit", "items")
                .header("Range", format!("{start}-{}", start + PAGE_SIZE - 1))
                .header("Prefer", "count=exact");
            let resp = self.send(req, &what).await?;
            let total = resp
                .headers()
                .get("content-range")
                .and_then(|v| v.to_str().ok())
                .and_then(content_range_total);
            let page: Vec<T> = Self::rows(resp, &what).await?;
            let fetched = page.len();
            all.extend(page);

            match total {
                Some(total) if fetched > 0 && all.len() < total => {
                    tracing::debug!(table, fetched = all.len(), total, "fetching next page");
                }
                _ => return Ok(all),
            }
        }
    }

    async fn insert<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        table: &str,
        body: &B,
        columns: &str,
    ) -> Result<T, BsaError> {
        let what = format!("insert {table}");
        let req = self
            .authorized(self.http.post(self.table_url(table)))
            .query(&[("select", columns)])
            .header("Prefer", "return=representation")
            .json(body);
        let resp = self.send(req, &what).await?;
        Self::rows(resp, &what)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BsaError::Connection(format!("{what} returned no row")))
    }

    async fn update<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        table: &str,
        id: &str,
        body: &B,
        columns: &str,
    ) -> Result<T, BsaError> {
        let what = format!("update {table}");
        let req = self
            .authorized(self.http.patch(self.table_url(table)))
            .query(&[("id", format!("eq.{id}")), ("select", columns.to_string())])
            .header("Prefer", "return=representation")
            .json(body);
        let resp = self.send(req, &what).await?;
        Self::rows(resp, &what)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BsaError::NotFound(format!("{table} {id}")))
    }

    async fn delete(&self, table: &str, id: &str) -> Result<(), BsaError> {
        let req = self
            .authorized(self.http.delete(self.table_url(table)))
            .query(&[("id", format!("eq.{id}"))]);
        self.send(req, &format!("delete {table}")).await?;
        Ok(())
    }
}

/// Total from a `Content-Range` value such as `0-999/2500`. `None` for `*`.
fn content_range_total(value: &str) -> Option<usize> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}

fn sale_query(filter: &SaleFilter) -> Query {
    let mut query: Query = vec![
        ("select", SALE_COLUMNS.to_string()),
        ("order", "service_date.desc".to_string()),
    ];
    if let Some(from) = filter.from {
        query.push(("service_date", format!("gte.{from}")));
    }
    if let Some(to) = filter.to {
        query.push(("service_date", format!("lte.{to}")));
    }
    if let Some(status) = &filter.status {
        query.push(("status", format!("eq.{status}")));
    }
    if let Some(id) = &filter.client_id {
        query.push(("client_id", format!("eq.{id}")));
    }
    if let Some(id) = &filter.staff_id {
        query.push(("staff_id", format!("eq.{id}")));
    }
    if let Some(limit) = filter.limit {
        query.push(("limit", limit.to_string()));
    }
    query
}

#[async_trait]
impl AccessCodeStore for PostgrestStore {
    async fn active_access_codes(&self) -> Result<Vec<AccessCode>, BsaError> {
        self.select(
            "access_codes",
            vec![
                ("select", "id,role,hashed_code,active".to_string()),
                ("active", "eq.true".to_string()),
            ],
        )
        .await
    }

    async fn list_access_codes(&self) -> Result<Vec<AccessCodeSummary>, BsaError> {
        self.select("access_codes", vec![("select", ACCESS_CODE_COLUMNS.to_string())])
            .await
    }

    async fn create_access_code(&self, code: NewAccessCode) -> Result<AccessCodeSummary, BsaError> {
        self.insert("access_codes", &code, ACCESS_CODE_COLUMNS).await
    }

    async fn update_access_code(
        &self,
        id: &str,
        update: AccessCodeUpdate,
    ) -> Result<AccessCodeSummary, BsaError> {
        self.update("access_codes", id, &update, ACCESS_CODE_COLUMNS)
            .await
    }

    async fn delete_access_code(&self, id: &str) -> Result<(), BsaError> {
        self.delete("access_codes", id).await
    }
}

#[async_trait]
impl ProfileStore for PostgrestStore {
    async fn list_profiles(&self) -> Result<Vec<Profile>, BsaError> {
        self.select(
            "profiles",
            vec![
                ("select", PROFILE_COLUMNS.to_string()),
                ("order", "created_at.desc".to_string()),
            ],
        )
        .await
    }

    async fn find_profile_by_email(&self, email: &str) -> Result<Option<Profile>, BsaError> {
        let rows: Vec<Profile> = self
            .select(
                "profiles",
                vec![
                    ("select", PROFILE_COLUMNS.to_string()),
                    ("email", format!("eq.{email}")),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn create_profile(&self, profile: NewProfile) -> Result<Profile, BsaError> {
        self.insert("profiles", &profile, PROFILE_COLUMNS).await
    }

    async fn update_profile(&self, id: &str, update: ProfileUpdate) -> Result<Profile, BsaError> {
        self.update("profiles", id, &update, PROFILE_COLUMNS).await
    }

    async fn delete_profile(&self, id: &str) -> Result<(), BsaError> {
        self.delete("profiles", id).await
    }
}

#[async_trait]
impl BusinessStore for PostgrestStore {
    async fn list_clients(&self) -> Result<Vec<Client>, BsaError> {
        self.select(
            "clients",
            vec![
                ("select", "id,name,phone,email,status".to_string()),
                ("order", "name.asc".to_string()),
            ],
        )
        .await
    }

    async fn create_client(&self, client: NewClient) -> Result<Client, BsaError> {
        self.insert("clients", &client, "*").await
    }

    async fn list_services(&self) -> Result<Vec<Service>, BsaError> {
        self.select(
            "services",
            vec![
                (
                    "select",
                    "id,name,description,default_price,default_duration_minutes".to_string(),
                ),
                ("active", "eq.true".to_string()),
                ("order", "name.asc".to_string()),
            ],
        )
        .await
    }

    async fn create_service(&self, service: NewService) -> Result<Service, BsaError> {
        self.insert("services", &service, "*").await
    }

    async fn list_staff(&self) -> Result<Vec<StaffMember>, BsaError> {
        self.select(
            "staff",
            vec![
                ("select", "id,name,role,rating,active".to_string()),
                ("active", "eq.true".to_string()),
                ("order", "name.asc".to_string()),
            ],
        )
        .await
    }

    async fn list_sales(&self, filter: SaleFilter) -> Result<Vec<Sale>, BsaError> {
        self.select("sales", sale_query(&filter)).await
    }

    async fn create_sale(&self, sale: SaleInsert) -> Result<String, BsaError> {
        #[derive(serde::Deserialize)]
        struct Inserted {
            id: String,
        }
        let row: Inserted = self.insert("sales", &sale, "id").await?;
        Ok(row.id)
    }

    async fn delete_sale(&self, id: &str) -> Result<(), BsaError> {
        self.delete("sales", id).await
    }

    async fn list_payouts(&self, limit: usize) -> Result<Vec<Payout>, BsaError> {
        self.select(
            "payouts",
            vec![
                (
                    "select",
                    "id,staff_id,amount,status,scheduled_for,processed_at,notes,created_at"
                        .to_string(),
                ),
                ("order", "created_at.desc".to_string()),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }

    async fn create_payout(&self, payout: NewPayout) -> Result<Payout, BsaError> {
        self.insert("payouts", &payout, "*").await
    }
}

#[async_trait]
impl MagicLinkSender for PostgrestStore {
    /// Sign-in link for an existing auth user; `create_user` is off so this never signs anyone up.
    async fn send_magic_link(&self, email: &str, redirect_to: &str) -> Result<(), BsaError> {
        let req = self
            .authorized(self.http.post(format!("{}/auth/v1/otp", self.url)))
            .query(&[("redirect_to", redirect_to)])
            .json(&serde_json::json!({ "email": email, "create_user": false }));
        self.send(req, "send magic link").await?;
        Ok(())
    }
}
