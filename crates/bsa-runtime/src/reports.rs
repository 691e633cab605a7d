//! Month-to-date dashboard figures, reduced in process from sale rows.

use std::collections::HashMap;

use bsa_api::{BsaError, NamedRef, Sale, SaleFilter};
use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::BackOffice;
use crate::business::month_start;

const UTILIZATION_DAYS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceRevenue {
    pub service_id: String,
    pub service_name: String,
    pub total_revenue: f64,
    pub total_profit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaffRevenue {
    pub staff: NamedRef,
    pub total_revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationValue {
    pub location_type: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyMetrics {
    pub avg_service_value: i64,
    pub profit_margin: i64,
    pub utilization_rate: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub month: MonthWindow,
    pub total_revenue_month: f64,
    pub total_profit_month: f64,
    pub revenue_by_service: Vec<ServiceRevenue>,
    pub revenue_by_staff: Vec<StaffRevenue>,
    pub location_data: Vec<LocationValue>,
    pub outstanding_balance: f64,
    pub services_completed: usize,
    pub key_metrics: KeyMetrics,
}

/// Rounds half up, like a spreadsheet would (`-2.5` becomes `-2`).
#[allow(clippy::cast_possible_truncation)]
fn round_half_up(x: f64) -> i64 {
    if x.is_finite() { (x + 0.5).floor() as i64 } else { 0 }
}

/// Groups rows by key keeping first-seen order.
struct Grouped<V> {
    index: HashMap<String, usize>,
    rows: Vec<V>,
}

impl<V> Grouped<V> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            rows: Vec::new(),
        }
    }

    fn entry(&mut self, key: &str, init: impl FnOnce() -> V) -> &mut V {
        let i = *self.index.entry(key.to_string()).or_insert_with(|| {
            self.rows.push(init());
            self.rows.len() - 1
        });
        &mut self.rows[i]
    }
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn summarize(
    all_sales: &[Sale],
    active_staff: usize,
    today: NaiveDate,
) -> Overview {
    let start = month_start(today);
    let window = SaleFilter::completed_between(start, today);
    let month: Vec<&Sale> = all_sales.iter().filter(|s| window.matches(s)).collect();

    let mut by_service = Grouped::new();
    let mut by_staff = Grouped::new();
    let mut by_location = Grouped::new();
    let mut revenue = 0.0;
    let mut profit = 0.0;

    for sale in &month {
        revenue += sale.price;
        profit += sale.profit;

        let service_id = sale.service_id.as_deref().unwrap_or("unknown");
        let svc = by_service.entry(service_id, || ServiceRevenue {
            service_id: service_id.to_string(),
            service_name: sale
                .service
                .as_ref()
                .map_or_else(|| "Unknown".to_string(), |r| r.name.clone()),
            total_revenue: 0.0,
            total_profit: 0.0,
        });
        svc.total_revenue += sale.price;
        svc.total_profit += sale.profit;

        let staff_id = sale.staff_id.as_deref().unwrap_or("unassigned");
        by_staff
            .entry(staff_id, || StaffRevenue {
                staff: NamedRef {
                    id: staff_id.to_string(),
                    name: sale
                        .staff
                        .as_ref()
                        .map_or_else(|| "Unknown".to_string(), |r| r.name.clone()),
                },
                total_revenue: 0.0,
            })
            .total_revenue += sale.price;

        let location = sale.location_type.as_deref().unwrap_or("Unknown");
        by_location
            .entry(location, || LocationValue {
                location_type: location.to_string(),
                value: 0.0,
            })
            .value += sale.price;
    }

    let since = today
        .checked_sub_days(Days::new(UTILIZATION_DAYS))
        .unwrap_or(today);
    let recent_completed = all_sales
        .iter()
        .filter(|s| s.is_completed() && s.service_date >= since)
        .count();
    let capacity = (active_staff.max(1) as u64 * UTILIZATION_DAYS) as f64;

    let n = month.len();
    Overview {
        month: MonthWindow { start, end: today },
        total_revenue_month: revenue,
        total_profit_month: profit,
        revenue_by_service: by_service.rows,
        revenue_by_staff: by_staff.rows,
        location_data: by_location.rows,
        outstanding_balance: all_sales.iter().map(|s| s.balance).sum(),
        services_completed: n,
        key_metrics: KeyMetrics {
            avg_service_value: if n == 0 { 0 } else { round_half_up(revenue / n as f64) },
            profit_margin: if revenue == 0.0 {
                0
            } else {
                round_half_up(profit / revenue * 100.0)
            },
            utilization_rate: round_half_up(recent_completed as f64 / capacity * 100.0),
        },
    }
}

impl BackOffice {
    /// Dashboard figures for the month containing `today`.
    pub async fn overview(&self, today: NaiveDate) -> Result<Overview, BsaError> {
        let sales = self.stores.business.list_sales(SaleFilter::default()).await?;
        let staff = self.stores.business.list_staff().await?;
        Ok(summarize(&sales, staff.len(), today))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::office;

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn named(id: &str, name: &str) -> NamedRef {
        NamedRef {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    fn sale(date: &str, service: &str, staff: Option<&str>, price: f64, profit: f64) -> Sale {
        let mut s: Sale = serde_json::from_value(serde_json::json!({
            "id": format!("{date}-{service}-{price}"),
            "service_date": date,
            "status": "completed",
        }))
        .unwrap();
        s.service_id = Some(service.to_string());
        s.service = Some(named(service, &service.to_uppercase()));
        s.staff_id = staff.map(str::to_string);
        s.staff = staff.map(|id| named(id, "Ana"));
        s.location_type = Some("In-Shop".to_string());
        s.price = price;
        s.profit = profit;
        s
    }

    #[test]
    fn empty_month_is_all_zero() {
        let o = summarize(&[], 0, day("2025-03-15"));
        assert_eq!(o.services_completed, 0);
        assert_eq!(
            o.key_metrics,
            KeyMetrics {
                avg_service_value: 0,
                profit_margin: 0,
                utilization_rate: 0
            }
        );
        assert!(o.revenue_by_service.is_empty());
        assert_eq!(o.month.start, day("2025-03-01"));
    }

    #[test]
    fn month_totals_and_groupings() {
        let mut pending = sale("2025-03-05", "cut", Some("st1"), 999.0, 999.0);
        pending.status = "pending".to_string();
        pending.balance = 40.0;
        let mut old = sale("2025-02-27", "cut", Some("st1"), 70.0, 10.0);
        old.balance = 5.0;
        let mut home = sale("2025-03-10", "braids", None, 200.0, 50.0);
        home.location_type = Some("Home".to_string());

        let sales = vec![
            sale("2025-03-12", "cut", Some("st1"), 100.0, 60.0),
            home,
            sale("2025-03-01", "cut", Some("st1"), 50.0, 20.0),
            pending,
            old,
        ];
        let o = summarize(&sales, 2, day("2025-03-15"));

        assert_eq!(o.services_completed, 3);
        assert!((o.total_revenue_month - 350.0).abs() < 1e-9);
        assert!((o.total_profit_month - 130.0).abs() < 1e-9);
        assert!((o.outstanding_balance - 45.0).abs() < 1e-9);

        assert_eq!(o.revenue_by_service.len(), 2);
        assert_eq!(o.revenue_by_service[0].service_name, "CUT");
        assert!((o.revenue_by_service[0].total_revenue - 150.0).abs() < 1e-9);

        let unassigned = o
            .revenue_by_staff
            .iter()
            .find(|r| r.staff.id == "unassigned")
            .unwrap();
        assert!((unassigned.total_revenue - 200.0).abs() < 1e-9);

        let home = o
            .location_data
            .iter()
            .find(|l| l.location_type == "Home")
            .unwrap();
        assert!((home.value - 200.0).abs() < 1e-9);

        // 350 / 3 = 116.67; 130 / 350 = 37.1%; 4 completed in 30 days over 2 staff * 30.
        assert_eq!(o.key_metrics.avg_service_value, 117);
        assert_eq!(o.key_metrics.profit_margin, 37);
        assert_eq!(o.key_metrics.utilization_rate, 7);
    }

    #[test]
    fn rounding_matches_half_up() {
        assert_eq!(round_half_up(2.5), 3);
        assert_eq!(round_half_up(-2.5), -2);
        assert_eq!(round_half_up(f64::NAN), 0);
    }

    #[test]
    fn overview_serializes_camel_case_with_snake_rows() {
        let o = summarize(&[sale("2025-03-02", "cut", None, 10.0, 5.0)], 1, day("2025-03-15"));
        let v = serde_json::to_value(&o).unwrap();
        assert!(v["totalRevenueMonth"].is_number());
        assert!(v["keyMetrics"]["utilizationRate"].is_number());
        assert_eq!(v["revenueByService"][0]["service_name"], "CUT");
        assert_eq!(v["revenueByStaff"][0]["staff"]["id"], "unassigned");
        assert_eq!(v["month"]["start"], "2025-03-01");
    }

    #[tokio::test]
    async fn overview_reads_through_the_store() {
        let (office, store, _) = office();
        store.seed_staff("Ana", None, true).unwrap();
        store.seed_sale(sale("2025-03-02", "cut", None, 10.0, 5.0)).unwrap();
        let o = office.overview(day("2025-03-15")).await.unwrap();
        assert_eq!(o.services_completed, 1);
    }
}
