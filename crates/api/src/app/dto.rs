//! Request DTOs and their mapping to service inputs.
//!
//! Every payload rejects unknown fields. Optional fields are `Option`s;
//! everything else is required.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use wrenchbook_accounting::{
    CreateEntry, EntryKind, EntryStatus, FinancialEntryId, RegisterPayment, UpdateEntry,
};
use wrenchbook_catalog::{RegisterService, ServiceId, UpdateService};
use wrenchbook_core::AggregateId;
use wrenchbook_infra::services::{
    EntryQuery, NewAppointment, NewProductLine, NewServiceLine, NewServiceOrder, OrderQuery,
};
use wrenchbook_inventory::{MovementDirection, ProductId, RegisterProduct, UpdateProduct};
use wrenchbook_parties::{
    Address, ClientId, ClientKind, ContactInfo, FuelType, RecordMaintenance, RegisterClient,
    RegisterStaff, RegisterSupplier, RegisterVehicle, StaffId, StaffRole, SupplierId,
    UpdateClient, UpdateVehicle, VehicleId,
};
use wrenchbook_scheduling::{AppointmentStatus, UpdateAppointment};
use wrenchbook_service_orders::{
    LineStatus, ServiceOrderId, ServiceOrderStatus, UpdateOrderDetails, UpdateServiceLine,
};

// -------------------------
// Shared
// -------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchQuery {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CancelRequest {
    pub reason: String,
}

// -------------------------
// Clients, vehicles, staff, suppliers
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateClientRequest {
    pub name: String,
    pub tax_id: String,
    pub kind: Option<ClientKind>,
    pub contact: Option<ContactInfo>,
    pub address: Option<Address>,
    pub notes: Option<String>,
}

impl CreateClientRequest {
    pub fn into_command(self, at: DateTime<Utc>) -> RegisterClient {
        RegisterClient {
            client_id: ClientId::generate(),
            name: self.name,
            tax_id: self.tax_id,
            kind: self.kind.unwrap_or(ClientKind::Individual),
            contact: self.contact.unwrap_or_default(),
            address: self.address.unwrap_or_default(),
            notes: self.notes,
            occurred_at: at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateClientRequest {
    pub name: Option<String>,
    pub tax_id: Option<String>,
    pub kind: Option<ClientKind>,
    pub contact: Option<ContactInfo>,
    pub address: Option<Address>,
    pub notes: Option<String>,
}

impl From<UpdateClientRequest> for UpdateClient {
    fn from(body: UpdateClientRequest) -> Self {
        UpdateClient {
            name: body.name,
            tax_id: body.tax_id,
            kind: body.kind,
            contact: body.contact,
            address: body.address,
            notes: body.notes,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateVehicleRequest {
    pub client_id: ClientId,
    pub plate: String,
    pub make: String,
    pub model: String,
    pub manufacture_year: Option<i32>,
    pub model_year: Option<i32>,
    pub color: Option<String>,
    pub vin: Option<String>,
    pub mileage: Option<u32>,
    pub fuel: Option<FuelType>,
    pub notes: Option<String>,
}

impl CreateVehicleRequest {
    pub fn into_command(self, at: DateTime<Utc>) -> RegisterVehicle {
        RegisterVehicle {
            vehicle_id: VehicleId::generate(),
            client_id: self.client_id,
            plate: self.plate,
            make: self.make,
            model: self.model,
            manufacture_year: self.manufacture_year,
            model_year: self.model_year,
            color: self.color,
            vin: self.vin,
            mileage: self.mileage.unwrap_or(0),
            fuel: self.fuel,
            notes: self.notes,
            occurred_at: at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateVehicleRequest {
    pub plate: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub manufacture_year: Option<i32>,
    pub model_year: Option<i32>,
    pub color: Option<String>,
    pub vin: Option<String>,
    pub fuel: Option<FuelType>,
    pub notes: Option<String>,
}

impl From<UpdateVehicleRequest> for UpdateVehicle {
    fn from(body: UpdateVehicleRequest) -> Self {
        UpdateVehicle {
            plate: body.plate,
            make: body.make,
            model: body.model,
            manufacture_year: body.manufacture_year,
            model_year: body.model_year,
            color: body.color,
            vin: body.vin,
            fuel: body.fuel,
            notes: body.notes,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VehicleQuery {
    pub client_id: Option<ClientId>,
    pub plate: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MaintenanceRequest {
    pub performed_at: DateTime<Utc>,
    pub mileage: u32,
    pub description: String,
}

impl From<MaintenanceRequest> for RecordMaintenance {
    fn from(body: MaintenanceRequest) -> Self {
        RecordMaintenance {
            performed_at: body.performed_at,
            mileage: body.mileage,
            description: body.description,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateStaffRequest {
    pub name: String,
    pub role: StaffRole,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl CreateStaffRequest {
    pub fn into_command(self, at: DateTime<Utc>) -> RegisterStaff {
        RegisterStaff {
            staff_id: StaffId::generate(),
            name: self.name,
            role: self.role,
            phone: self.phone,
            email: self.email,
            occurred_at: at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateSupplierRequest {
    pub legal_name: String,
    pub trade_name: Option<String>,
    pub tax_id: String,
    pub state_registration: Option<String>,
    pub contact: Option<ContactInfo>,
    pub address: Option<Address>,
    pub contact_person: Option<String>,
    pub notes: Option<String>,
}

impl CreateSupplierRequest {
    pub fn into_command(self, at: DateTime<Utc>) -> RegisterSupplier {
        RegisterSupplier {
            supplier_id: SupplierId::generate(),
            legal_name: self.legal_name,
            trade_name: self.trade_name,
            tax_id: self.tax_id,
            state_registration: self.state_registration,
            contact: self.contact.unwrap_or_default(),
            address: self.address.unwrap_or_default(),
            contact_person: self.contact_person,
            notes: self.notes,
            occurred_at: at,
        }
    }
}

// -------------------------
// Catalog and stock
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateServiceRequest {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub price: u64,
    pub estimated_minutes: u32,
}

impl CreateServiceRequest {
    pub fn into_command(self, at: DateTime<Utc>) -> RegisterService {
        RegisterService {
            service_id: ServiceId::generate(),
            code: self.code,
            name: self.name,
            description: self.description,
            category: self.category,
            price: self.price,
            estimated_minutes: self.estimated_minutes,
            occurred_at: at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateServiceRequest {
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<u64>,
    pub estimated_minutes: Option<u32>,
}

impl From<UpdateServiceRequest> for UpdateService {
    fn from(body: UpdateServiceRequest) -> Self {
        UpdateService {
            code: body.code,
            name: body.name,
            description: body.description,
            category: body.category,
            price: body.price,
            estimated_minutes: body.estimated_minutes,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateProductRequest {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub unit: Option<String>,
    pub cost_price: u64,
    pub sale_price: u64,
    pub min_stock: Option<u32>,
    pub max_stock: Option<u32>,
    pub location: Option<String>,
    pub barcode: Option<String>,
    pub supplier_id: Option<SupplierId>,
    /// Booked as an inbound movement right after creation.
    pub initial_stock: Option<u32>,
}

impl CreateProductRequest {
    /// Split into the registration command and the opening stock.
    pub fn into_command(self, at: DateTime<Utc>) -> (RegisterProduct, u32) {
        let initial = self.initial_stock.unwrap_or(0);
        (
            RegisterProduct {
                product_id: ProductId::generate(),
                code: self.code,
                name: self.name,
                description: self.description,
                category: self.category,
                unit: self.unit,
                cost_price: self.cost_price,
                sale_price: self.sale_price,
                min_stock: self.min_stock.unwrap_or(0),
                max_stock: self.max_stock,
                location: self.location,
                barcode: self.barcode,
                supplier_id: self.supplier_id,
                occurred_at: at,
            },
            initial,
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProductRequest {
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub cost_price: Option<u64>,
    pub sale_price: Option<u64>,
    pub min_stock: Option<u32>,
    pub max_stock: Option<u32>,
    pub location: Option<String>,
    pub barcode: Option<String>,
    pub supplier_id: Option<SupplierId>,
}

impl From<UpdateProductRequest> for UpdateProduct {
    fn from(body: UpdateProductRequest) -> Self {
        UpdateProduct {
            code: body.code,
            name: body.name,
            description: body.description,
            category: body.category,
            unit: body.unit,
            cost_price: body.cost_price,
            sale_price: body.sale_price,
            min_stock: body.min_stock,
            max_stock: body.max_stock,
            location: body.location,
            barcode: body.barcode,
            supplier_id: body.supplier_id,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StockMovementRequest {
    pub direction: MovementDirection,
    pub quantity: u32,
    pub reason: String,
}

// -------------------------
// Appointments
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
    pub service: Option<ServiceId>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateAppointmentRequest {
    pub client_id: ClientId,
    pub vehicle_id: VehicleId,
    pub service_id: ServiceId,
    pub starts_at: DateTime<Utc>,
    pub description: Option<String>,
    pub staff_id: Option<StaffId>,
    pub notes: Option<String>,
}

impl From<CreateAppointmentRequest> for NewAppointment {
    fn from(body: CreateAppointmentRequest) -> Self {
        NewAppointment {
            client_id: body.client_id,
            vehicle_id: body.vehicle_id,
            service_id: body.service_id,
            starts_at: body.starts_at,
            description: body.description,
            staff_id: body.staff_id,
            notes: body.notes,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateAppointmentRequest {
    pub starts_at: Option<DateTime<Utc>>,
    pub service_id: Option<ServiceId>,
    pub description: Option<String>,
    pub staff_id: Option<StaffId>,
    pub notes: Option<String>,
}

impl From<UpdateAppointmentRequest> for UpdateAppointment {
    fn from(body: UpdateAppointmentRequest) -> Self {
        UpdateAppointment {
            starts_at: body.starts_at,
            service_id: body.service_id,
            description: body.description,
            staff_id: body.staff_id,
            notes: body.notes,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppointmentListQuery {
    pub date: Option<NaiveDate>,
    pub status: Option<AppointmentStatus>,
    pub client_id: Option<ClientId>,
    pub vehicle_id: Option<VehicleId>,
}

// -------------------------
// Service orders
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpenOrderRequest {
    pub client_id: ClientId,
    pub vehicle_id: VehicleId,
    pub mileage: Option<u32>,
    pub diagnosis: Option<String>,
    pub customer_notes: Option<String>,
    pub internal_notes: Option<String>,
    pub expected_at: Option<DateTime<Utc>>,
    pub responsible_id: Option<StaffId>,
}

impl From<OpenOrderRequest> for NewServiceOrder {
    fn from(body: OpenOrderRequest) -> Self {
        NewServiceOrder {
            client_id: body.client_id,
            vehicle_id: body.vehicle_id,
            mileage: body.mileage,
            diagnosis: body.diagnosis,
            customer_notes: body.customer_notes,
            internal_notes: body.internal_notes,
            expected_at: body.expected_at,
            responsible_id: body.responsible_id,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddServiceLineRequest {
    pub service_id: ServiceId,
    pub description: Option<String>,
    pub price: Option<u64>,
    pub mechanic_id: Option<StaffId>,
}

impl From<AddServiceLineRequest> for NewServiceLine {
    fn from(body: AddServiceLineRequest) -> Self {
        NewServiceLine {
            service_id: body.service_id,
            description: body.description,
            price: body.price,
            mechanic_id: body.mechanic_id,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddProductLineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Option<u64>,
}

impl From<AddProductLineRequest> for NewProductLine {
    fn from(body: AddProductLineRequest) -> Self {
        NewProductLine {
            product_id: body.product_id,
            quantity: body.quantity,
            unit_price: body.unit_price,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateServiceLineRequest {
    pub status: Option<LineStatus>,
    pub minutes_spent: Option<u32>,
    pub mechanic_id: Option<StaffId>,
}

impl From<UpdateServiceLineRequest> for UpdateServiceLine {
    fn from(body: UpdateServiceLineRequest) -> Self {
        UpdateServiceLine {
            status: body.status,
            minutes_spent: body.minutes_spent,
            mechanic_id: body.mechanic_id,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateOrderDetailsRequest {
    pub expected_at: Option<DateTime<Utc>>,
    pub diagnosis: Option<String>,
    pub customer_notes: Option<String>,
    pub internal_notes: Option<String>,
    pub responsible_id: Option<StaffId>,
    pub discount: Option<u64>,
    pub payment_method: Option<String>,
    pub installments: Option<u8>,
}

impl From<UpdateOrderDetailsRequest> for UpdateOrderDetails {
    fn from(body: UpdateOrderDetailsRequest) -> Self {
        UpdateOrderDetails {
            expected_at: body.expected_at,
            diagnosis: body.diagnosis,
            customer_notes: body.customer_notes,
            internal_notes: body.internal_notes,
            responsible_id: body.responsible_id,
            discount: body.discount,
            payment_method: body.payment_method,
            installments: body.installments,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChangeStatusRequest {
    pub status: ServiceOrderStatus,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderListQuery {
    pub status: Option<ServiceOrderStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub client_id: Option<ClientId>,
    pub vehicle_id: Option<VehicleId>,
    pub number: Option<String>,
}

impl OrderListQuery {
    pub fn as_query(&self) -> OrderQuery {
        OrderQuery {
            status: self.status,
            from: self.from,
            to: self.to,
        }
    }
}

// -------------------------
// Invoices and finance
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IssueInvoiceRequest {
    pub service_order_id: ServiceOrderId,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InvoiceListQuery {
    pub client_id: Option<ClientId>,
    pub service_order_id: Option<ServiceOrderId>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateEntryRequest {
    pub kind: EntryKind,
    pub category: String,
    pub description: String,
    pub amount: u64,
    pub due_date: NaiveDate,
    pub paid_on: Option<NaiveDate>,
    pub payment_method: Option<String>,
    pub service_order_id: Option<ServiceOrderId>,
    pub counterparty_id: Option<AggregateId>,
    pub notes: Option<String>,
}

impl CreateEntryRequest {
    pub fn into_command(self, at: DateTime<Utc>) -> CreateEntry {
        CreateEntry {
            entry_id: FinancialEntryId::generate(),
            kind: self.kind,
            category: self.category,
            description: self.description,
            amount: self.amount,
            due_date: self.due_date,
            paid_on: self.paid_on,
            payment_method: self.payment_method,
            service_order_id: self.service_order_id,
            counterparty_id: self.counterparty_id,
            notes: self.notes,
            occurred_at: at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateEntryRequest {
    pub category: Option<String>,
    pub description: Option<String>,
    pub amount: Option<u64>,
    pub due_date: Option<NaiveDate>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
}

impl From<UpdateEntryRequest> for UpdateEntry {
    fn from(body: UpdateEntryRequest) -> Self {
        UpdateEntry {
            category: body.category,
            description: body.description,
            amount: body.amount,
            due_date: body.due_date,
            payment_method: body.payment_method,
            notes: body.notes,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaymentRequest {
    pub paid_on: NaiveDate,
    pub payment_method: Option<String>,
}

impl From<PaymentRequest> for RegisterPayment {
    fn from(body: PaymentRequest) -> Self {
        RegisterPayment {
            paid_on: body.paid_on,
            payment_method: body.payment_method,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntryListQuery {
    pub kind: Option<EntryKind>,
    pub status: Option<EntryStatus>,
    pub due_from: Option<NaiveDate>,
    pub due_to: Option<NaiveDate>,
}

impl From<EntryListQuery> for EntryQuery {
    fn from(q: EntryListQuery) -> Self {
        EntryQuery {
            kind: q.kind,
            status: q.status,
            due_from: q.due_from,
            due_to: q.due_to,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SummaryQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditQuery {
    pub entity_id: Option<AggregateId>,
}
