//! Parties domain module (clients, their vehicles, suppliers, and shop staff).
//!
//! This crate contains business rules for the people and vehicles the shop
//! deals with, implemented purely as deterministic domain logic (no IO, no
//! HTTP, no storage).

pub mod client;
pub mod staff;
pub mod supplier;
pub mod vehicle;

pub use client::{
    Address, Client, ClientId, ClientKind, ContactInfo, RegisterClient, UpdateClient,
    normalize_tax_id,
};
pub use staff::{RegisterStaff, StaffId, StaffMember, StaffRole};
pub use supplier::{RegisterSupplier, Supplier, SupplierId};
pub use vehicle::{
    FuelType, MaintenanceRecord, RecordMaintenance, RegisterVehicle, UpdateVehicle, Vehicle,
    VehicleId, normalize_plate,
};
