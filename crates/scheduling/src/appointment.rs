use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wrenchbook_catalog::ServiceId;
use wrenchbook_core::error::require_text;
use wrenchbook_core::{AggregateId, Document, DomainError, DomainResult, Entity};
use wrenchbook_parties::{ClientId, StaffId, VehicleId};

use crate::availability::Booking;

wrenchbook_core::typed_id!(
    /// Appointment identifier.
    AppointmentId
);

/// Appointment status lifecycle.
///
/// `Scheduled -> Confirmed -> Completed`, with `Canceled` reachable from either
/// non-terminal state. `Completed` and `Canceled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Canceled,
    Completed,
}

impl AppointmentStatus {
    /// Whether an appointment in this status occupies its time slot.
    pub fn is_blocking(self) -> bool {
        matches!(self, AppointmentStatus::Scheduled | AppointmentStatus::Confirmed)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, AppointmentStatus::Canceled | AppointmentStatus::Completed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Canceled => "canceled",
            AppointmentStatus::Completed => "completed",
        }
    }
}

/// Entity: Appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    id: AppointmentId,
    client_id: ClientId,
    vehicle_id: VehicleId,
    service_id: ServiceId,
    starts_at: DateTime<Utc>,
    description: String,
    status: AppointmentStatus,
    staff_id: Option<StaffId>,
    notes: Option<String>,
    cancel_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Command: BookAppointment.
///
/// Reference checks (client, vehicle, service, staff exist) and the conflict
/// check happen before this is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookAppointment {
    pub appointment_id: AppointmentId,
    pub client_id: ClientId,
    pub vehicle_id: VehicleId,
    pub service_id: ServiceId,
    pub starts_at: DateTime<Utc>,
    pub description: String,
    pub staff_id: Option<StaffId>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateAppointment. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateAppointment {
    pub starts_at: Option<DateTime<Utc>>,
    pub service_id: Option<ServiceId>,
    pub description: Option<String>,
    pub staff_id: Option<StaffId>,
    pub notes: Option<String>,
}

impl UpdateAppointment {
    /// Whether applying this update moves the booked interval, which calls
    /// for a fresh conflict check.
    pub fn changes_schedule(&self, current: &Appointment) -> bool {
        self.starts_at.is_some_and(|s| s != current.starts_at)
            || self.service_id.is_some_and(|s| s != current.service_id)
    }
}

impl Appointment {
    pub fn book(cmd: BookAppointment) -> DomainResult<Self> {
        Ok(Self {
            id: cmd.appointment_id,
            client_id: cmd.client_id,
            vehicle_id: cmd.vehicle_id,
            service_id: cmd.service_id,
            starts_at: cmd.starts_at,
            description: require_text("description", &cmd.description)?,
            status: AppointmentStatus::Scheduled,
            staff_id: cmd.staff_id,
            notes: cmd.notes,
            cancel_reason: None,
            created_at: cmd.occurred_at,
            updated_at: cmd.occurred_at,
        })
    }

    pub fn id_typed(&self) -> AppointmentId {
        self.id
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub fn vehicle_id(&self) -> VehicleId {
        self.vehicle_id
    }

    pub fn service_id(&self) -> ServiceId {
        self.service_id
    }

    pub fn starts_at(&self) -> DateTime<Utc> {
        self.starts_at
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn status(&self) -> AppointmentStatus {
        self.status
    }

    pub fn staff_id(&self) -> Option<StaffId> {
        self.staff_id
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn cancel_reason(&self) -> Option<&str> {
        self.cancel_reason.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// View of this appointment as an occupied interval.
    pub fn as_booking(&self, duration_minutes: u32) -> Booking {
        Booking {
            appointment_id: self.id,
            starts_at: self.starts_at,
            duration_minutes,
            status: self.status,
        }
    }

    /// Terminal appointments (completed or canceled) accept no edits.
    pub fn ensure_editable(&self) -> DomainResult<()> {
        if self.status.is_terminal() {
            return Err(DomainError::invalid_transition(format!(
                "appointment is {} and can no longer be changed",
                self.status.as_str()
            )));
        }
        Ok(())
    }

    pub fn update(&mut self, cmd: UpdateAppointment, at: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_editable()?;
        let description = cmd
            .description
            .as_deref()
            .map(|d| require_text("description", d))
            .transpose()?;

        if let Some(starts_at) = cmd.starts_at {
            self.starts_at = starts_at;
        }
        if let Some(service_id) = cmd.service_id {
            self.service_id = service_id;
        }
        if let Some(description) = description {
            self.description = description;
        }
        if cmd.staff_id.is_some() {
            self.staff_id = cmd.staff_id;
        }
        if cmd.notes.is_some() {
            self.notes = cmd.notes;
        }
        self.updated_at = at;
        Ok(())
    }

    /// Scheduled -> Confirmed.
    pub fn confirm(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        if self.status != AppointmentStatus::Scheduled {
            return Err(DomainError::invalid_transition(format!(
                "only scheduled appointments can be confirmed (current: {})",
                self.status.as_str()
            )));
        }
        self.status = AppointmentStatus::Confirmed;
        self.updated_at = at;
        Ok(())
    }

    /// Scheduled | Confirmed -> Completed.
    pub fn complete(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        if self.status.is_terminal() {
            return Err(DomainError::invalid_transition(format!(
                "cannot complete an appointment that is {}",
                self.status.as_str()
            )));
        }
        self.status = AppointmentStatus::Completed;
        self.updated_at = at;
        Ok(())
    }

    /// Scheduled | Confirmed -> Canceled. A reason is mandatory.
    pub fn cancel(&mut self, reason: &str, at: DateTime<Utc>) -> DomainResult<()> {
        if self.status.is_terminal() {
            return Err(DomainError::invalid_transition(format!(
                "cannot cancel an appointment that is {}",
                self.status.as_str()
            )));
        }
        let reason = require_text("cancel reason", reason)?;
        self.status = AppointmentStatus::Canceled;
        self.cancel_reason = Some(reason);
        self.updated_at = at;
        Ok(())
    }
}

impl Entity for Appointment {
    type Id = AppointmentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Document for Appointment {
    const COLLECTION: &'static str = "appointments";

    fn key(&self) -> AggregateId {
        self.id.0
    }
}
