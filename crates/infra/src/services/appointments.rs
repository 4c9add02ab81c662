use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::instrument;

use wrenchbook_catalog::{Service, ServiceId};
use wrenchbook_parties::{Client, ClientId, StaffId, StaffMember, Vehicle, VehicleId};
use wrenchbook_scheduling::{
    Appointment, AppointmentId, AppointmentStatus, BOOKING_LEAD_BUFFER_MINUTES, BookAppointment,
    Booking, BusinessHours, DEFAULT_SERVICE_MINUTES, UpdateAppointment, available_slots,
    check_conflict,
};

use crate::audit::AuditTrail;
use crate::error::{ServiceError, ServiceResult};
use crate::store::{DocumentStore, Filter, Repository};

use super::{OperationContext, details, require};

/// Input for [`AppointmentBook::create`]. A blank description falls back to
/// the service name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAppointment {
    pub client_id: ClientId,
    pub vehicle_id: VehicleId,
    pub service_id: ServiceId,
    pub starts_at: DateTime<Utc>,
    pub description: Option<String>,
    pub staff_id: Option<StaffId>,
    pub notes: Option<String>,
}

/// Appointment calendar on top of the availability engine.
#[derive(Clone)]
pub struct AppointmentBook {
    appointments: Repository<Appointment>,
    services: Repository<Service>,
    clients: Repository<Client>,
    vehicles: Repository<Vehicle>,
    staff: Repository<StaffMember>,
    hours: BusinessHours,
    audit: AuditTrail,
}

impl AppointmentBook {
    pub fn new(store: Arc<dyn DocumentStore>, hours: BusinessHours, audit: AuditTrail) -> Self {
        Self {
            appointments: Repository::new(store.clone()),
            services: Repository::new(store.clone()),
            clients: Repository::new(store.clone()),
            vehicles: Repository::new(store.clone()),
            staff: Repository::new(store),
            hours,
            audit,
        }
    }

    pub fn business_hours(&self) -> BusinessHours {
        self.hours
    }

    async fn load(&self, id: AppointmentId) -> ServiceResult<Appointment> {
        require(&self.appointments, id.as_aggregate(), "appointment").await
    }

    async fn service_minutes(&self, id: ServiceId) -> ServiceResult<u32> {
        let service = require(&self.services, id.as_aggregate(), "service").await?;
        Ok(service.estimated_minutes())
    }

    /// Appointments starting in `[from, to)` as bookings.
    ///
    /// Each booking lasts as long as its service's estimate. An appointment
    /// whose service has been removed always counts as a fixed
    /// [`DEFAULT_SERVICE_MINUTES`], not as the duration being requested by
    /// the caller, so a check never depends on which service is being booked.
    async fn bookings_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> ServiceResult<Vec<Booking>> {
        let appointments = self
            .appointments
            .find(&[Filter::between("starts_at", from, to)])
            .await?;

        let mut durations: HashMap<ServiceId, u32> = HashMap::new();
        let mut bookings = Vec::with_capacity(appointments.len());
        for appointment in appointments.iter().filter(|a| a.status().is_blocking()) {
            let minutes = match durations.get(&appointment.service_id()) {
                Some(minutes) => *minutes,
                None => {
                    let minutes = self
                        .services
                        .get(appointment.service_id().as_aggregate())
                        .await?
                        .map(|s| s.estimated_minutes())
                        .unwrap_or(DEFAULT_SERVICE_MINUTES);
                    durations.insert(appointment.service_id(), minutes);
                    minutes
                }
            };
            bookings.push(appointment.as_booking(minutes));
        }
        Ok(bookings)
    }

    /// Fail with a conflict when another blocking appointment starts too close
    /// to `[starts_at, starts_at + minutes)`.
    async fn ensure_free(
        &self,
        starts_at: DateTime<Utc>,
        minutes: u32,
        exclude: Option<AppointmentId>,
    ) -> ServiceResult<()> {
        let from = starts_at - Duration::minutes(BOOKING_LEAD_BUFFER_MINUTES);
        let to = starts_at + Duration::minutes(i64::from(minutes));
        let bookings = self.bookings_between(from, to).await?;
        check_conflict(starts_at, minutes, &bookings, exclude)?;
        Ok(())
    }

    /// Free slot starts on a shop-local date.
    ///
    /// With a service the slot length is its estimated duration, otherwise
    /// [`DEFAULT_SERVICE_MINUTES`].
    #[instrument(skip(self), err)]
    pub async fn availability(
        &self,
        date: NaiveDate,
        service_id: Option<ServiceId>,
    ) -> ServiceResult<Vec<DateTime<Utc>>> {
        let minutes = match service_id {
            Some(id) => Some(self.service_minutes(id).await?),
            None => None,
        };
        let (from, to) = self.hours.day_bounds(date);
        let bookings = self.bookings_between(from, to).await?;
        Ok(available_slots(&self.hours, date, minutes, &bookings))
    }

    #[instrument(skip(self, input), fields(starts_at = %input.starts_at), err)]
    pub async fn create(&self, ctx: &OperationContext, input: NewAppointment) -> ServiceResult<Appointment> {
        require(&self.clients, input.client_id.as_aggregate(), "client").await?;
        let vehicle = require(&self.vehicles, input.vehicle_id.as_aggregate(), "vehicle").await?;
        if !vehicle.belongs_to(input.client_id) {
            return Err(ServiceError::validation("vehicle does not belong to the client"));
        }
        let service = require(&self.services, input.service_id.as_aggregate(), "service").await?;
        if let Some(staff_id) = input.staff_id {
            require(&self.staff, staff_id.as_aggregate(), "staff member").await?;
        }

        self.ensure_free(input.starts_at, service.estimated_minutes(), None)
            .await?;

        let description = input
            .description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| service.name().to_string());
        let appointment = Appointment::book(BookAppointment {
            appointment_id: AppointmentId::generate(),
            client_id: input.client_id,
            vehicle_id: input.vehicle_id,
            service_id: input.service_id,
            starts_at: input.starts_at,
            description,
            staff_id: input.staff_id,
            notes: input.notes,
            occurred_at: ctx.at,
        })?;
        self.appointments.save(&appointment).await?;

        tracing::info!(appointment_id = %appointment.id_typed(), "appointment booked");
        self.audit
            .record(
                ctx,
                "appointment.created",
                "appointment",
                appointment.id_typed().as_aggregate(),
                details(&appointment),
            )
            .await;
        Ok(appointment)
    }

    #[instrument(skip(self, cmd), err)]
    pub async fn update(
        &self,
        ctx: &OperationContext,
        id: AppointmentId,
        cmd: UpdateAppointment,
    ) -> ServiceResult<Appointment> {
        let mut appointment = self.load(id).await?;
        appointment.ensure_editable()?;
        if let Some(staff_id) = cmd.staff_id {
            require(&self.staff, staff_id.as_aggregate(), "staff member").await?;
        }
        if cmd.changes_schedule(&appointment) {
            let starts_at = cmd.starts_at.unwrap_or(appointment.starts_at());
            let service_id = cmd.service_id.unwrap_or(appointment.service_id());
            let minutes = self.service_minutes(service_id).await?;
            self.ensure_free(starts_at, minutes, Some(id)).await?;
        }

        appointment.update(cmd, ctx.at)?;
        self.appointments.save(&appointment).await?;

        self.audit
            .record(ctx, "appointment.updated", "appointment", id.as_aggregate(), details(&appointment))
            .await;
        Ok(appointment)
    }

    async fn transition(
        &self,
        ctx: &OperationContext,
        id: AppointmentId,
        action: &str,
        apply: impl FnOnce(&mut Appointment) -> wrenchbook_core::DomainResult<()>,
    ) -> ServiceResult<Appointment> {
        let mut appointment = self.load(id).await?;
        apply(&mut appointment)?;
        self.appointments.save(&appointment).await?;

        tracing::info!(status = appointment.status().as_str(), "appointment status changed");
        self.audit
            .record(
                ctx,
                action,
                "appointment",
                id.as_aggregate(),
                serde_json::json!({ "status": appointment.status() }),
            )
            .await;
        Ok(appointment)
    }

    #[instrument(skip(self), err)]
    pub async fn confirm(&self, ctx: &OperationContext, id: AppointmentId) -> ServiceResult<Appointment> {
        self.transition(ctx, id, "appointment.confirmed", |a| a.confirm(ctx.at))
            .await
    }

    #[instrument(skip(self), err)]
    pub async fn complete(&self, ctx: &OperationContext, id: AppointmentId) -> ServiceResult<Appointment> {
        self.transition(ctx, id, "appointment.completed", |a| a.complete(ctx.at))
            .await
    }

    #[instrument(skip(self, reason), err)]
    pub async fn cancel(
        &self,
        ctx: &OperationContext,
        id: AppointmentId,
        reason: &str,
    ) -> ServiceResult<Appointment> {
        self.transition(ctx, id, "appointment.canceled", |a| a.cancel(reason, ctx.at))
            .await
    }

    pub async fn get(&self, id: AppointmentId) -> ServiceResult<Appointment> {
        self.load(id).await
    }

    /// Appointments of a local date and/or status, earliest first.
    pub async fn list(
        &self,
        date: Option<NaiveDate>,
        status: Option<AppointmentStatus>,
    ) -> ServiceResult<Vec<Appointment>> {
        let mut filters = Vec::new();
        if let Some(date) = date {
            let (from, to) = self.hours.day_bounds(date);
            filters.push(Filter::between("starts_at", from, to));
        }
        if let Some(status) = status {
            filters.push(Filter::eq("status", status));
        }
        let mut appointments = self.appointments.find(&filters).await?;
        appointments.sort_by_key(|a| a.starts_at());
        Ok(appointments)
    }

    /// A client's appointments, most recent first.
    pub async fn list_by_client(&self, client_id: ClientId) -> ServiceResult<Vec<Appointment>> {
        self.list_where(Filter::eq("client_id", client_id)).await
    }

    /// A vehicle's appointments, most recent first.
    pub async fn list_by_vehicle(&self, vehicle_id: VehicleId) -> ServiceResult<Vec<Appointment>> {
        self.list_where(Filter::eq("vehicle_id", vehicle_id)).await
    }

    async fn list_where(&self, filter: Filter) -> ServiceResult<Vec<Appointment>> {
        let mut appointments = self.appointments.find(&[filter]).await?;
        appointments.sort_by(|a, b| b.starts_at().cmp(&a.starts_at()));
        Ok(appointments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{
        at, seed_client, seed_service, seed_vehicle, test_ctx, test_services, unique,
    };
    use wrenchbook_core::DomainError;

    use crate::services::{ServiceSettings, Services};
    use crate::store::InMemoryStore;

    async fn test_booking(
        services: &Services,
        service_minutes: u32,
        starts_at: DateTime<Utc>,
    ) -> ServiceResult<Appointment> {
        let client = seed_client(services).await;
        let vehicle = seed_vehicle(services, &client, &unique("TST")).await;
        let service = seed_service(services, &unique("SRV"), service_minutes).await;
        services
            .appointments
            .create(&test_ctx(), new_appointment(&client, &vehicle, &service, starts_at))
            .await
    }

    fn new_appointment(
        client: &Client,
        vehicle: &Vehicle,
        service: &Service,
        starts_at: DateTime<Utc>,
    ) -> NewAppointment {
        NewAppointment {
            client_id: client.id_typed(),
            vehicle_id: vehicle.id_typed(),
            service_id: service.id_typed(),
            starts_at,
            description: None,
            staff_id: None,
            notes: None,
        }
    }

    fn test_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 3, 12).unwrap()
    }

    #[tokio::test]
    async fn empty_day_offers_every_half_hour_until_five() {
        let services = test_services();
        let slots = services.appointments.availability(test_date(), None).await.unwrap();

        assert_eq!(slots.len(), 19);
        assert_eq!(slots.first().copied(), Some(at(test_date(), 8, 0)));
        assert_eq!(slots.last().copied(), Some(at(test_date(), 17, 0)));
    }

    #[tokio::test]
    async fn confirmed_booking_blocks_its_neighbourhood() {
        let services = test_services();
        let existing = test_booking(&services, 60, at(test_date(), 10, 0)).await.unwrap();
        services
            .appointments
            .confirm(&test_ctx(), existing.id_typed())
            .await
            .unwrap();
        let short = seed_service(&services, "QUICK", 30).await;

        let slots = services
            .appointments
            .availability(test_date(), Some(short.id_typed()))
            .await
            .unwrap();

        assert!(slots.contains(&at(test_date(), 9, 30)));
        assert!(!slots.contains(&at(test_date(), 10, 0)));
        assert!(!slots.contains(&at(test_date(), 10, 30)));
        assert!(slots.contains(&at(test_date(), 11, 0)));
    }

    #[tokio::test]
    async fn booking_with_removed_service_blocks_a_fixed_hour() {
        let store = Arc::new(InMemoryStore::new());
        let services = Services::new(store.clone(), store.clone(), ServiceSettings::default());
        let existing = test_booking(&services, 120, at(test_date(), 10, 0)).await.unwrap();
        let removed = store
            .delete("services", existing.service_id().as_aggregate())
            .await
            .unwrap();
        assert!(removed);
        let quick = seed_service(&services, "QUICK", 30).await;

        let slots = services
            .appointments
            .availability(test_date(), Some(quick.id_typed()))
            .await
            .unwrap();

        assert!(!slots.contains(&at(test_date(), 10, 30)));
        assert!(slots.contains(&at(test_date(), 11, 0)));
    }

    #[tokio::test]
    async fn booking_inside_lead_buffer_conflicts() {
        let services = test_services();
        let existing = test_booking(&services, 60, at(test_date(), 10, 0)).await.unwrap();

        let err = test_booking(&services, 60, at(test_date(), 10, 15)).await.unwrap_err();
        match err {
            ServiceError::Domain(DomainError::Conflict { conflicting, .. }) => {
                assert_eq!(conflicting, vec![existing.id_typed().as_aggregate()]);
            }
            other => panic!("expected conflict, got {other:?}"),
        }
        let day = services.appointments.list(Some(test_date()), None).await.unwrap();
        assert_eq!(day.len(), 1);
    }

    #[tokio::test]
    async fn canceled_appointment_frees_its_slot() {
        let services = test_services();
        let ctx = test_ctx();
        let existing = test_booking(&services, 60, at(test_date(), 14, 0)).await.unwrap();
        services
            .appointments
            .cancel(&ctx, existing.id_typed(), "client called off")
            .await
            .unwrap();

        test_booking(&services, 60, at(test_date(), 14, 0)).await.unwrap();
    }

    #[tokio::test]
    async fn vehicle_must_belong_to_client() {
        let services = test_services();
        let owner = seed_client(&services).await;
        let other = seed_client(&services).await;
        let vehicle = seed_vehicle(&services, &owner, "ABC1D23").await;
        let service = seed_service(&services, "ALIGN", 60).await;

        let err = services
            .appointments
            .create(
                &test_ctx(),
                new_appointment(&other, &vehicle, &service, at(test_date(), 9, 0)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn description_defaults_to_service_name() {
        let services = test_services();
        let client = seed_client(&services).await;
        let vehicle = seed_vehicle(&services, &client, "DEF4G56").await;
        let service = seed_service(&services, "BRAKE", 45).await;

        let mut input = new_appointment(&client, &vehicle, &service, at(test_date(), 8, 0));
        input.description = Some("   ".to_string());
        let appointment = services.appointments.create(&test_ctx(), input).await.unwrap();
        assert_eq!(appointment.description(), service.name());
    }

    #[tokio::test]
    async fn rescheduling_ignores_the_appointment_itself() {
        let services = test_services();
        let ctx = test_ctx();
        let appointment = test_booking(&services, 60, at(test_date(), 9, 0)).await.unwrap();

        let moved = services
            .appointments
            .update(
                &ctx,
                appointment.id_typed(),
                UpdateAppointment {
                    starts_at: Some(at(test_date(), 9, 15)),
                    ..UpdateAppointment::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.starts_at(), at(test_date(), 9, 15));

        let blocker = test_booking(&services, 60, at(test_date(), 11, 0)).await.unwrap();
        let err = services
            .appointments
            .update(
                &ctx,
                appointment.id_typed(),
                UpdateAppointment {
                    starts_at: Some(at(test_date(), 10, 45)),
                    ..UpdateAppointment::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Conflict { .. })));
        assert_ne!(blocker.id_typed(), appointment.id_typed());

        let unchanged = services.appointments.get(appointment.id_typed()).await.unwrap();
        assert_eq!(unchanged.starts_at(), at(test_date(), 9, 15));
    }

    #[tokio::test]
    async fn completed_appointment_rejects_cancel() {
        let services = test_services();
        let ctx = test_ctx();
        let appointment = test_booking(&services, 60, at(test_date(), 16, 0)).await.unwrap();
        services
            .appointments
            .complete(&ctx, appointment.id_typed())
            .await
            .unwrap();

        let err = services
            .appointments
            .cancel(&ctx, appointment.id_typed(), "too late")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::InvalidStateTransition(_))
        ));
    }

    #[tokio::test]
    async fn canceled_appointment_cannot_be_rescheduled_onto_a_taken_slot() {
        let services = test_services();
        let ctx = test_ctx();
        let canceled = test_booking(&services, 60, at(test_date(), 10, 0)).await.unwrap();
        services
            .appointments
            .cancel(&ctx, canceled.id_typed(), "client called off")
            .await
            .unwrap();
        test_booking(&services, 60, at(test_date(), 14, 0)).await.unwrap();

        let err = services
            .appointments
            .update(
                &ctx,
                canceled.id_typed(),
                UpdateAppointment {
                    starts_at: Some(at(test_date(), 14, 15)),
                    ..UpdateAppointment::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::InvalidStateTransition(_))
        ));
    }

    #[tokio::test]
    async fn list_filters_by_status_and_orders_by_start() {
        let services = test_services();
        let ctx = test_ctx();
        let late = test_booking(&services, 60, at(test_date(), 15, 0)).await.unwrap();
        let early = test_booking(&services, 60, at(test_date(), 8, 0)).await.unwrap();
        services.appointments.confirm(&ctx, late.id_typed()).await.unwrap();

        let all = services.appointments.list(Some(test_date()), None).await.unwrap();
        let ids: Vec<_> = all.iter().map(Appointment::id_typed).collect();
        assert_eq!(ids, vec![early.id_typed(), late.id_typed()]);

        let confirmed = services
            .appointments
            .list(None, Some(AppointmentStatus::Confirmed))
            .await
            .unwrap();
        assert_eq!(confirmed.len(), 1);
        assert_eq!(confirmed[0].id_typed(), late.id_typed());
    }
}
