//! Scheduling domain module: appointments and the availability engine.
//!
//! Everything here is pure: callers load the relevant appointments and pass
//! them in as [`Booking`]s, so slot computation and conflict checks are plain
//! functions of their inputs.

pub mod appointment;
pub mod availability;

pub use appointment::{
    Appointment, AppointmentId, AppointmentStatus, BookAppointment, UpdateAppointment,
};
pub use availability::{
    BOOKING_LEAD_BUFFER_MINUTES, Booking, BusinessHours, DEFAULT_SERVICE_MINUTES,
    SLOT_INTERVAL_MINUTES, SLOT_PROXIMITY_BUFFER_MINUTES, available_slots, check_conflict,
    find_conflicts,
};
