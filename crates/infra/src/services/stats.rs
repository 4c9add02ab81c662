use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use serde::Serialize;
use tracing::instrument;

use wrenchbook_inventory::Product;
use wrenchbook_parties::{Client, Vehicle};
use wrenchbook_scheduling::{Appointment, BusinessHours};
use wrenchbook_service_orders::{ServiceOrder, ServiceOrderStatus};

use crate::error::{ServiceError, ServiceResult};
use crate::store::{DocumentStore, Filter, Repository};

/// Read model: shop-wide counters for the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemStatistics {
    pub active_clients: usize,
    pub vehicles: usize,
    pub active_products: usize,
    /// Every order, keyed by status name.
    pub orders_by_status: BTreeMap<&'static str, usize>,
    /// Scheduled or confirmed appointments starting on the local date.
    pub appointments_today: usize,
    pub low_stock_products: usize,
    /// Grand totals of completed or delivered orders whose completion falls
    /// in the local month, in cents.
    pub month_revenue: u64,
    pub generated_at: DateTime<Utc>,
}

/// Read-only aggregation over the other services' documents.
#[derive(Clone)]
pub struct StatsService {
    clients: Repository<Client>,
    vehicles: Repository<Vehicle>,
    products: Repository<Product>,
    orders: Repository<ServiceOrder>,
    appointments: Repository<Appointment>,
    hours: BusinessHours,
}

impl StatsService {
    pub fn new(store: Arc<dyn DocumentStore>, hours: BusinessHours) -> Self {
        Self {
            clients: Repository::new(store.clone()),
            vehicles: Repository::new(store.clone()),
            products: Repository::new(store.clone()),
            orders: Repository::new(store.clone()),
            appointments: Repository::new(store),
            hours,
        }
    }

    /// Local-time bounds of the calendar month containing `date`.
    fn month_bounds(&self, date: NaiveDate) -> ServiceResult<(DateTime<Utc>, DateTime<Utc>)> {
        let first = date
            .with_day(1)
            .ok_or_else(|| ServiceError::validation("date out of range"))?;
        let next = first
            .checked_add_months(Months::new(1))
            .ok_or_else(|| ServiceError::validation("date out of range"))?;
        Ok((self.hours.day_bounds(first).0, self.hours.day_bounds(next).0))
    }

    /// Statistics as of `now`; "today" and "this month" are shop-local.
    #[instrument(skip(self), err)]
    pub async fn statistics(&self, now: DateTime<Utc>) -> ServiceResult<SystemStatistics> {
        let today = self.hours.local_date(now);

        let active_clients = self.clients.find(&[Filter::eq("active", true)]).await?.len();
        let vehicles = self.vehicles.all().await?.len();
        let products = self.products.find(&[Filter::eq("active", true)]).await?;
        let low_stock_products = products.iter().filter(|p| p.is_low_stock()).count();

        let orders = self.orders.all().await?;
        let mut orders_by_status = BTreeMap::new();
        for order in &orders {
            *orders_by_status.entry(order.status().as_str()).or_insert(0) += 1;
        }

        let (month_start, month_end) = self.month_bounds(today)?;
        let month_revenue = orders
            .iter()
            .filter(|o| {
                matches!(
                    o.status(),
                    ServiceOrderStatus::Completed | ServiceOrderStatus::Delivered
                )
            })
            .filter(|o| {
                o.completed_at()
                    .is_some_and(|at| at >= month_start && at < month_end)
            })
            .map(|o| o.totals().grand_total)
            .sum();

        let (day_start, day_end) = self.hours.day_bounds(today);
        let appointments_today = self
            .appointments
            .find(&[Filter::between("starts_at", day_start, day_end)])
            .await?
            .iter()
            .filter(|a| a.status().is_blocking())
            .count();

        Ok(SystemStatistics {
            active_clients,
            vehicles,
            active_products: products.len(),
            orders_by_status,
            appointments_today,
            low_stock_products,
            month_revenue,
            generated_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{
        at, seed_client, seed_order, seed_product, seed_service, seed_vehicle, test_ctx,
        test_services,
    };
    use crate::services::{NewAppointment, NewServiceLine};

    #[tokio::test]
    async fn empty_shop_reports_zeroes() {
        let services = test_services();
        let stats = services.stats.statistics(Utc::now()).await.unwrap();

        assert_eq!(stats.active_clients, 0);
        assert_eq!(stats.vehicles, 0);
        assert!(stats.orders_by_status.is_empty());
        assert_eq!(stats.month_revenue, 0);
    }

    #[tokio::test]
    async fn counts_records_orders_and_month_revenue() {
        let services = test_services();
        let ctx = test_ctx();
        let now = ctx.at;
        let today = services.appointments.business_hours().local_date(now);

        let client = seed_client(&services).await;
        let gone = seed_client(&services).await;
        services.parties.deactivate_client(&ctx, gone.id_typed()).await.unwrap();
        let vehicle = seed_vehicle(&services, &client, "STA1T23").await;
        // minimum stock is 3
        seed_product(&services, "LOW-9", 1).await;
        seed_product(&services, "OK-9", 20).await;

        let service = seed_service(&services, "REV", 60).await;
        let done = seed_order(&services, &client, &vehicle).await;
        let with_line = services
            .orders
            .add_service_line(
                &ctx,
                done.id_typed(),
                NewServiceLine {
                    service_id: service.id_typed(),
                    description: None,
                    price: None,
                    mechanic_id: None,
                },
            )
            .await
            .unwrap();
        services
            .orders
            .change_status(&ctx, done.id_typed(), ServiceOrderStatus::Completed)
            .await
            .unwrap();
        seed_order(&services, &client, &vehicle).await;

        let booked = services
            .appointments
            .create(
                &ctx,
                NewAppointment {
                    client_id: client.id_typed(),
                    vehicle_id: vehicle.id_typed(),
                    service_id: service.id_typed(),
                    starts_at: at(today, 12, 0),
                    description: None,
                    staff_id: None,
                    notes: None,
                },
            )
            .await
            .unwrap();

        let stats = services.stats.statistics(now).await.unwrap();
        assert_eq!(stats.active_clients, 1);
        assert_eq!(stats.vehicles, 1);
        assert_eq!(stats.active_products, 2);
        assert_eq!(stats.low_stock_products, 1);
        assert_eq!(stats.orders_by_status.get("completed"), Some(&1));
        assert_eq!(stats.orders_by_status.get("open"), Some(&1));
        assert_eq!(stats.month_revenue, with_line.totals().grand_total);
        assert_eq!(stats.appointments_today, 1);

        services
            .appointments
            .cancel(&ctx, booked.id_typed(), "called off")
            .await
            .unwrap();
        let stats = services.stats.statistics(now).await.unwrap();
        assert_eq!(stats.appointments_today, 0);
    }

    #[tokio::test]
    async fn delivered_orders_count_only_in_their_completion_month() {
        let services = test_services();
        let ctx = test_ctx();
        let client = seed_client(&services).await;
        let vehicle = seed_vehicle(&services, &client, "OLD1M23").await;
        let service = seed_service(&services, "OLD", 30).await;
        let order = seed_order(&services, &client, &vehicle).await;
        services
            .orders
            .add_service_line(
                &ctx,
                order.id_typed(),
                NewServiceLine {
                    service_id: service.id_typed(),
                    description: None,
                    price: Some(40_000),
                    mechanic_id: None,
                },
            )
            .await
            .unwrap();
        services
            .orders
            .change_status(&ctx, order.id_typed(), ServiceOrderStatus::Completed)
            .await
            .unwrap();
        services
            .orders
            .change_status(&ctx, order.id_typed(), ServiceOrderStatus::Delivered)
            .await
            .unwrap();

        let stats = services.stats.statistics(ctx.at).await.unwrap();
        assert_eq!(stats.month_revenue, 40_000);

        let next_year = ctx.at + chrono::Duration::days(366);
        let stats = services.stats.statistics(next_year).await.unwrap();
        assert_eq!(stats.month_revenue, 0);
        assert_eq!(stats.orders_by_status.get("delivered"), Some(&1));
    }
}
