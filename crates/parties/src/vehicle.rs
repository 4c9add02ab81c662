use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use wrenchbook_core::error::require_text;
use wrenchbook_core::{AggregateId, Document, DomainError, DomainResult, Entity};

use crate::client::ClientId;

wrenchbook_core::typed_id!(
    /// Vehicle identifier.
    VehicleId
);

/// Fuel / powertrain type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FuelType {
    Gasoline,
    Ethanol,
    Flex,
    Diesel,
    Electric,
    Hybrid,
    Cng,
}

/// One entry of a vehicle's maintenance history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceRecord {
    pub performed_at: DateTime<Utc>,
    pub mileage: u32,
    pub description: String,
}

/// Upper-case a licence plate and drop separators.
pub fn normalize_plate(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Entity: Vehicle (always owned by one client).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    id: VehicleId,
    client_id: ClientId,
    plate: String,
    make: String,
    model: String,
    manufacture_year: Option<i32>,
    model_year: Option<i32>,
    color: Option<String>,
    vin: Option<String>,
    mileage: u32,
    fuel: Option<FuelType>,
    notes: Option<String>,
    maintenance_history: Vec<MaintenanceRecord>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Command: RegisterVehicle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterVehicle {
    pub vehicle_id: VehicleId,
    pub client_id: ClientId,
    pub plate: String,
    pub make: String,
    pub model: String,
    pub manufacture_year: Option<i32>,
    pub model_year: Option<i32>,
    pub color: Option<String>,
    pub vin: Option<String>,
    pub mileage: u32,
    pub fuel: Option<FuelType>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateVehicle. Absent fields are left untouched.
///
/// Ownership and mileage are not editable here: mileage only moves through
/// [`Vehicle::record_mileage`] and maintenance records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateVehicle {
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

/// Command: RecordMaintenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordMaintenance {
    pub performed_at: DateTime<Utc>,
    pub mileage: u32,
    pub description: String,
}

fn validate_plate(raw: &str) -> DomainResult<String> {
    let plate = normalize_plate(raw);
    if plate.len() < 5 || plate.len() > 8 {
        return Err(DomainError::validation(
            "plate must have between 5 and 8 letters or digits",
        ));
    }
    Ok(plate)
}

fn validate_year(field: &str, year: Option<i32>, now: DateTime<Utc>) -> DomainResult<Option<i32>> {
    match year {
        Some(y) if y < 1900 || y > now.year() + 1 => Err(DomainError::validation(format!(
            "{field} must be between 1900 and {}",
            now.year() + 1
        ))),
        other => Ok(other),
    }
}

impl Vehicle {
    pub fn register(cmd: RegisterVehicle) -> DomainResult<Self> {
        let plate = validate_plate(&cmd.plate)?;
        let make = require_text("make", &cmd.make)?;
        let model = require_text("model", &cmd.model)?;
        let manufacture_year =
            validate_year("manufacture_year", cmd.manufacture_year, cmd.occurred_at)?;
        let model_year = validate_year("model_year", cmd.model_year, cmd.occurred_at)?;

        Ok(Self {
            id: cmd.vehicle_id,
            client_id: cmd.client_id,
            plate,
            make,
            model,
            manufacture_year,
            model_year,
            color: cmd.color,
            vin: cmd.vin.map(|v| v.trim().to_uppercase()),
            mileage: cmd.mileage,
            fuel: cmd.fuel,
            notes: cmd.notes,
            maintenance_history: Vec::new(),
            created_at: cmd.occurred_at,
            updated_at: cmd.occurred_at,
        })
    }

    pub fn id_typed(&self) -> VehicleId {
        self.id
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub fn plate(&self) -> &str {
        &self.plate
    }

    pub fn make(&self) -> &str {
        &self.make
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn manufacture_year(&self) -> Option<i32> {
        self.manufacture_year
    }

    pub fn model_year(&self) -> Option<i32> {
        self.model_year
    }

    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    pub fn vin(&self) -> Option<&str> {
        self.vin.as_deref()
    }

    pub fn mileage(&self) -> u32 {
        self.mileage
    }

    pub fn fuel(&self) -> Option<FuelType> {
        self.fuel
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn maintenance_history(&self) -> &[MaintenanceRecord] {
        &self.maintenance_history
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn belongs_to(&self, client_id: ClientId) -> bool {
        self.client_id == client_id
    }

    pub fn update(&mut self, cmd: UpdateVehicle, at: DateTime<Utc>) -> DomainResult<()> {
        let plate = cmd.plate.as_deref().map(validate_plate).transpose()?;
        let make = cmd.make.as_deref().map(|m| require_text("make", m)).transpose()?;
        let model = cmd.model.as_deref().map(|m| require_text("model", m)).transpose()?;
        let manufacture_year = validate_year("manufacture_year", cmd.manufacture_year, at)?;
        let model_year = validate_year("model_year", cmd.model_year, at)?;

        if let Some(plate) = plate {
            self.plate = plate;
        }
        if let Some(make) = make {
            self.make = make;
        }
        if let Some(model) = model {
            self.model = model;
        }
        if manufacture_year.is_some() {
            self.manufacture_year = manufacture_year;
        }
        if model_year.is_some() {
            self.model_year = model_year;
        }
        if cmd.color.is_some() {
            self.color = cmd.color;
        }
        if let Some(vin) = cmd.vin {
            self.vin = Some(vin.trim().to_uppercase());
        }
        if cmd.fuel.is_some() {
            self.fuel = cmd.fuel;
        }
        if cmd.notes.is_some() {
            self.notes = cmd.notes;
        }
        self.updated_at = at;
        Ok(())
    }

    /// Raise the odometer reading. Lower readings are ignored.
    ///
    /// Returns whether the stored mileage changed.
    pub fn record_mileage(&mut self, mileage: u32, at: DateTime<Utc>) -> bool {
        if mileage <= self.mileage {
            return false;
        }
        self.mileage = mileage;
        self.updated_at = at;
        true
    }

    pub fn record_maintenance(&mut self, cmd: RecordMaintenance, at: DateTime<Utc>) -> DomainResult<()> {
        let description = require_text("description", &cmd.description)?;
        self.maintenance_history.push(MaintenanceRecord {
            performed_at: cmd.performed_at,
            mileage: cmd.mileage,
            description,
        });
        self.record_mileage(cmd.mileage, at);
        self.updated_at = at;
        Ok(())
    }
}

impl Entity for Vehicle {
    type Id = VehicleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Document for Vehicle {
    const COLLECTION: &'static str = "vehicles";

    fn key(&self) -> AggregateId {
        self.id.0
    }
}
