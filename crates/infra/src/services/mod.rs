//! Application services: one per business area.
//!
//! Each operation reads current state, applies one domain mutation, persists
//! the touched documents one by one, then appends an audit record.

pub mod appointments;
pub mod catalog;
pub mod finance;
pub mod invoices;
pub mod orders;
pub mod parties;
pub mod stats;
pub mod stock;

use std::sync::Arc;

use chrono::{DateTime, Utc};

use wrenchbook_core::{AggregateId, Document, UserId};
use wrenchbook_invoicing::TaxRates;
use wrenchbook_scheduling::BusinessHours;

use crate::audit::AuditTrail;
use crate::config::AppConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::store::{CounterStore, DocumentStore, InMemoryStore, Repository};

pub use appointments::{AppointmentBook, NewAppointment};
pub use catalog::CatalogService;
pub use finance::{EntryQuery, FinanceBook};
pub use invoices::InvoiceDesk;
pub use orders::{NewProductLine, NewServiceLine, NewServiceOrder, OrderLedger, OrderQuery};
pub use parties::PartyService;
pub use stats::{StatsService, SystemStatistics};
pub use stock::StockKeeper;

/// Who is acting, and when.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationContext {
    pub actor: Option<UserId>,
    pub at: DateTime<Utc>,
}

impl OperationContext {
    pub fn new(actor: Option<UserId>, at: DateTime<Utc>) -> Self {
        Self { actor, at }
    }

    pub fn now(actor: Option<UserId>) -> Self {
        Self::new(actor, Utc::now())
    }
}

/// Business settings the services need besides storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    pub business_hours: BusinessHours,
    pub invoice_series: String,
    pub tax_rates: TaxRates,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        AppConfig::default().into()
    }
}

impl From<AppConfig> for ServiceSettings {
    fn from(config: AppConfig) -> Self {
        Self {
            business_hours: config.business_hours,
            invoice_series: config.invoice_series,
            tax_rates: config.tax_rates,
        }
    }
}

/// All application services over one shared store.
#[derive(Clone)]
pub struct Services {
    pub catalog: CatalogService,
    pub parties: PartyService,
    pub stock: StockKeeper,
    pub appointments: AppointmentBook,
    pub orders: OrderLedger,
    pub invoices: InvoiceDesk,
    pub finance: FinanceBook,
    pub stats: StatsService,
    pub audit: AuditTrail,
}

impl Services {
    pub fn new(
        docs: Arc<dyn DocumentStore>,
        counters: Arc<dyn CounterStore>,
        settings: ServiceSettings,
    ) -> Self {
        let audit = AuditTrail::new(docs.clone());
        let stock = StockKeeper::new(docs.clone(), audit.clone());
        Self {
            catalog: CatalogService::new(docs.clone(), audit.clone()),
            parties: PartyService::new(docs.clone(), audit.clone()),
            appointments: AppointmentBook::new(docs.clone(), settings.business_hours, audit.clone()),
            orders: OrderLedger::new(docs.clone(), counters.clone(), stock.clone(), audit.clone()),
            invoices: InvoiceDesk::new(
                docs.clone(),
                counters,
                settings.invoice_series,
                settings.tax_rates,
                audit.clone(),
            ),
            finance: FinanceBook::new(docs.clone(), audit.clone()),
            stats: StatsService::new(docs, settings.business_hours),
            stock,
            audit,
        }
    }

    pub fn in_memory(settings: ServiceSettings) -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self::new(store.clone(), store, settings)
    }
}

/// Load a document or fail with `NotFound(what)`.
pub(crate) async fn require<T: Document>(
    repo: &Repository<T>,
    id: AggregateId,
    what: &str,
) -> ServiceResult<T> {
    repo.get(id)
        .await?
        .ok_or_else(|| ServiceError::not_found(what))
}

/// JSON details for audit records; never fails.
pub(crate) fn details(value: impl serde::Serialize) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use serde_json::Value as JsonValue;

    use wrenchbook_catalog::{RegisterService, Service, ServiceId};
    use wrenchbook_core::AggregateId;
    use wrenchbook_inventory::{MovementDirection, Product, ProductId, RegisterProduct};
    use wrenchbook_parties::{
        Address, Client, ClientId, ClientKind, ContactInfo, RegisterClient, RegisterSupplier,
        RegisterVehicle, Supplier, SupplierId, Vehicle, VehicleId,
    };
    use wrenchbook_service_orders::ServiceOrder;

    use crate::store::{CounterStore, DocumentStore, Filter, InMemoryStore, StoreError};

    use super::{NewServiceOrder, OperationContext, ServiceSettings, Services};

    static SEQUENCE: AtomicU32 = AtomicU32::new(1);

    pub fn test_ctx() -> OperationContext {
        OperationContext::now(None)
    }

    pub fn test_services() -> Services {
        Services::in_memory(ServiceSettings::default())
    }

    /// `prefix` followed by a process-wide sequence number.
    pub fn unique(prefix: &str) -> String {
        format!("{prefix}{:04}", SEQUENCE.fetch_add(1, Ordering::SeqCst))
    }

    /// A UTC instant on `date`; the default business hours are in UTC.
    pub fn at(date: NaiveDate, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.from_utc_datetime(&date.and_hms_opt(hour, minute, 0).unwrap())
    }

    pub fn client_cmd(name: &str, tax_id: &str) -> RegisterClient {
        RegisterClient {
            client_id: ClientId::generate(),
            name: name.to_string(),
            tax_id: tax_id.to_string(),
            kind: ClientKind::Individual,
            contact: ContactInfo::default(),
            address: Address::default(),
            notes: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn supplier_cmd(legal_name: &str, tax_id: &str) -> RegisterSupplier {
        RegisterSupplier {
            supplier_id: SupplierId::generate(),
            legal_name: legal_name.to_string(),
            trade_name: None,
            tax_id: tax_id.to_string(),
            state_registration: None,
            contact: ContactInfo::default(),
            address: Address::default(),
            contact_person: None,
            notes: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn vehicle_cmd(client_id: ClientId, plate: &str) -> RegisterVehicle {
        RegisterVehicle {
            vehicle_id: VehicleId::generate(),
            client_id,
            plate: plate.to_string(),
            make: "Fiat".to_string(),
            model: "Uno".to_string(),
            manufacture_year: Some(2015),
            model_year: Some(2016),
            color: None,
            vin: None,
            mileage: 10_000,
            fuel: None,
            notes: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn service_cmd(code: &str, minutes: u32) -> RegisterService {
        RegisterService {
            service_id: ServiceId::generate(),
            code: code.to_string(),
            name: format!("Service {code}"),
            description: None,
            category: "maintenance".to_string(),
            price: 15_000,
            estimated_minutes: minutes,
            occurred_at: Utc::now(),
        }
    }

    /// Product with a minimum stock of 3.
    pub fn product_cmd(code: &str) -> RegisterProduct {
        RegisterProduct {
            product_id: ProductId::generate(),
            code: code.to_string(),
            name: format!("Part {code}"),
            description: None,
            category: "parts".to_string(),
            unit: None,
            cost_price: 1_500,
            sale_price: 2_500,
            min_stock: 3,
            max_stock: None,
            location: None,
            barcode: None,
            supplier_id: None,
            occurred_at: Utc::now(),
        }
    }

    pub async fn seed_client(services: &Services) -> Client {
        let cmd = client_cmd("Test Client", &unique("TAX"));
        services.parties.create_client(&test_ctx(), cmd).await.unwrap()
    }

    pub async fn seed_supplier(services: &Services) -> Supplier {
        let cmd = supplier_cmd("Test Supplier", &unique("CNPJ"));
        services.parties.create_supplier(&test_ctx(), cmd).await.unwrap()
    }

    pub async fn seed_vehicle(services: &Services, client: &Client, plate: &str) -> Vehicle {
        services
            .parties
            .create_vehicle(&test_ctx(), vehicle_cmd(client.id_typed(), plate))
            .await
            .unwrap()
    }

    pub async fn seed_service(services: &Services, code: &str, minutes: u32) -> Service {
        services
            .catalog
            .create(&test_ctx(), service_cmd(code, minutes))
            .await
            .unwrap()
    }

    /// Product holding `stock` units, booked as an opening inbound movement.
    pub async fn seed_product(services: &Services, code: &str, stock: u32) -> Product {
        let ctx = test_ctx();
        let product = services
            .stock
            .create_product(&ctx, product_cmd(code))
            .await
            .unwrap();
        if stock == 0 {
            return product;
        }
        let (product, _) = services
            .stock
            .move_stock(&ctx, product.id_typed(), MovementDirection::In, stock, "opening stock")
            .await
            .unwrap();
        product
    }

    pub async fn seed_order(services: &Services, client: &Client, vehicle: &Vehicle) -> ServiceOrder {
        services
            .orders
            .open(
                &test_ctx(),
                NewServiceOrder::new(client.id_typed(), vehicle.id_typed()),
            )
            .await
            .unwrap()
    }

    /// In-memory store whose writes to one collection can be switched to fail.
    pub struct FlakyStore {
        inner: InMemoryStore,
        failing_collection: &'static str,
        failing: AtomicBool,
    }

    impl FlakyStore {
        pub fn new(failing_collection: &'static str) -> Arc<Self> {
            Arc::new(Self {
                inner: InMemoryStore::new(),
                failing_collection,
                failing: AtomicBool::new(false),
            })
        }

        pub fn fail_writes(&self, on: bool) {
            self.failing.store(on, Ordering::SeqCst);
        }
    }

    #[async_trait::async_trait]
    impl DocumentStore for FlakyStore {
        async fn get(&self, collection: &str, id: AggregateId) -> Result<Option<JsonValue>, StoreError> {
            self.inner.get(collection, id).await
        }

        async fn upsert(&self, collection: &str, id: AggregateId, body: JsonValue) -> Result<(), StoreError> {
            if self.failing.load(Ordering::SeqCst) && collection == self.failing_collection {
                return Err(StoreError::Unavailable("simulated outage".to_string()));
            }
            self.inner.upsert(collection, id, body).await
        }

        async fn delete(&self, collection: &str, id: AggregateId) -> Result<bool, StoreError> {
            self.inner.delete(collection, id).await
        }

        async fn find(&self, collection: &str, filters: &[Filter]) -> Result<Vec<JsonValue>, StoreError> {
            self.inner.find(collection, filters).await
        }
    }

    #[async_trait::async_trait]
    impl CounterStore for FlakyStore {
        async fn next(&self, name: &str) -> Result<u64, StoreError> {
            self.inner.next(name).await
        }
    }
}
