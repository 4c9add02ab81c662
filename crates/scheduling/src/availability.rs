//! Availability engine: slot generation and booking conflict checks.
//!
//! Two different proximity rules are in play and are kept separate on purpose
//! until the business decides how they should line up:
//!
//! - slot generation rejects a candidate whose start is less than
//!   [`SLOT_PROXIMITY_BUFFER_MINUTES`] away from an existing start, on top of
//!   plain interval overlap;
//! - booking (create / move) rejects a start when an existing appointment
//!   starts inside `[start - BOOKING_LEAD_BUFFER_MINUTES, start + duration)`.
//!
//! As a consequence a slot offered by [`available_slots`] can still be refused
//! by [`check_conflict`] (e.g. a 10:30 slot right after a 15 minute job that
//! started at 10:00).

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc};

use wrenchbook_core::{AggregateId, DomainError, DomainResult};

use crate::appointment::{AppointmentId, AppointmentStatus};

/// Distance between two consecutive candidate slot starts.
pub const SLOT_INTERVAL_MINUTES: i64 = 30;

/// Duration assumed when none is given, or when an existing appointment's
/// catalog service no longer exists.
pub const DEFAULT_SERVICE_MINUTES: u32 = 60;

/// Minimum gap between a candidate slot start and an existing start.
pub const SLOT_PROXIMITY_BUFFER_MINUTES: i64 = 15;

/// How far before a proposed start an existing start still counts as a clash.
pub const BOOKING_LEAD_BUFFER_MINUTES: i64 = 30;

/// An interval already taken on the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Booking {
    pub appointment_id: AppointmentId,
    pub starts_at: DateTime<Utc>,
    pub duration_minutes: u32,
    pub status: AppointmentStatus,
}

impl Booking {
    pub fn ends_at(&self) -> DateTime<Utc> {
        self.starts_at + Duration::minutes(i64::from(self.duration_minutes))
    }
}

/// Opening hours of the shop, in its local UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessHours {
    open: NaiveTime,
    close: NaiveTime,
    utc_offset: FixedOffset,
}

impl Default for BusinessHours {
    /// 08:00–18:00 at UTC.
    fn default() -> Self {
        Self {
            open: NaiveTime::MIN + Duration::hours(8),
            close: NaiveTime::MIN + Duration::hours(18),
            utc_offset: Utc.fix(),
        }
    }
}

impl BusinessHours {
    pub fn new(open: NaiveTime, close: NaiveTime, utc_offset: FixedOffset) -> DomainResult<Self> {
        if open >= close {
            return Err(DomainError::validation(
                "business hours must open before they close",
            ));
        }
        Ok(Self {
            open,
            close,
            utc_offset,
        })
    }

    pub fn open(&self) -> NaiveTime {
        self.open
    }

    pub fn close(&self) -> NaiveTime {
        self.close
    }

    pub fn utc_offset(&self) -> FixedOffset {
        self.utc_offset
    }

    fn local_to_utc(&self, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
        let naive = date.and_time(time)
            - Duration::seconds(i64::from(self.utc_offset.local_minus_utc()));
        Utc.from_utc_datetime(&naive)
    }

    /// Opening and closing instants of `date`.
    pub fn window(&self, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        (
            self.local_to_utc(date, self.open),
            self.local_to_utc(date, self.close),
        )
    }

    /// Local midnight of `date` up to (excluding) the next local midnight.
    pub fn day_bounds(&self, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self.local_to_utc(date, NaiveTime::MIN);
        (start, start + Duration::days(1))
    }

    /// Calendar date of an instant in shop-local time.
    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.utc_offset).date_naive()
    }
}

fn abs_gap(a: DateTime<Utc>, b: DateTime<Utc>) -> Duration {
    if a >= b { a - b } else { b - a }
}

fn slot_collides(start: DateTime<Utc>, end: DateTime<Utc>, booking: &Booking) -> bool {
    let overlaps = start < booking.ends_at() && booking.starts_at < end;
    let too_close = abs_gap(start, booking.starts_at)
        < Duration::minutes(SLOT_PROXIMITY_BUFFER_MINUTES);
    overlaps || too_close
}

/// Free slot starts on `date` for a service of `duration_minutes`.
///
/// Candidates run every [`SLOT_INTERVAL_MINUTES`] from opening time; a
/// candidate is dropped when it would end after closing time or when it
/// collides with a blocking booking on the same local day. Bookings for other
/// days or in a terminal status are ignored.
pub fn available_slots(
    hours: &BusinessHours,
    date: NaiveDate,
    duration_minutes: Option<u32>,
    bookings: &[Booking],
) -> Vec<DateTime<Utc>> {
    let duration = Duration::minutes(i64::from(
        duration_minutes.unwrap_or(DEFAULT_SERVICE_MINUTES),
    ));
    let step = Duration::minutes(SLOT_INTERVAL_MINUTES);
    let (open, close) = hours.window(date);

    let same_day: Vec<&Booking> = bookings
        .iter()
        .filter(|b| b.status.is_blocking() && hours.local_date(b.starts_at) == date)
        .collect();

    let mut slots = Vec::new();
    let mut candidate = open;
    while candidate < close {
        let end = candidate + duration;
        if end <= close && !same_day.iter().any(|b| slot_collides(candidate, end, b)) {
            slots.push(candidate);
        }
        candidate += step;
    }
    slots
}

/// Ids of blocking bookings that clash with a proposed appointment.
///
/// A booking clashes when its start falls in
/// `[proposed_start - BOOKING_LEAD_BUFFER_MINUTES, proposed_start + duration)`.
/// Only the existing start is compared; a long appointment that began more
/// than the lead buffer earlier does not count.
pub fn find_conflicts(
    proposed_start: DateTime<Utc>,
    duration_minutes: u32,
    bookings: &[Booking],
    exclude: Option<AppointmentId>,
) -> Vec<AppointmentId> {
    let window_start = proposed_start - Duration::minutes(BOOKING_LEAD_BUFFER_MINUTES);
    let window_end = proposed_start + Duration::minutes(i64::from(duration_minutes));

    bookings
        .iter()
        .filter(|b| b.status.is_blocking())
        .filter(|b| Some(b.appointment_id) != exclude)
        .filter(|b| b.starts_at >= window_start && b.starts_at < window_end)
        .map(|b| b.appointment_id)
        .collect()
}

/// Fail with [`DomainError::Conflict`] when [`find_conflicts`] finds anything.
pub fn check_conflict(
    proposed_start: DateTime<Utc>,
    duration_minutes: u32,
    bookings: &[Booking],
    exclude: Option<AppointmentId>,
) -> DomainResult<()> {
    let conflicting = find_conflicts(proposed_start, duration_minutes, bookings, exclude);
    if conflicting.is_empty() {
        return Ok(());
    }
    let ids: Vec<AggregateId> = conflicting.iter().map(|id| id.0).collect();
    Err(DomainError::conflict(
        "an appointment is already booked close to this time",
        ids,
    ))
}
