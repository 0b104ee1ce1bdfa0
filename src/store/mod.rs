//! Storage seams. Handlers only see these traits; `AppState` carries the
//! concrete backend as trait objects.

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    Booking, BookingOutcome, Doctor, NewBooking, NewDoctor, PaymentConfirmation, PaymentDetails,
    Role, Service, ServiceName, UpdateResult, User, UserProfile,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// User records keyed by email. Doubles as the role lookup for the admin guard.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    /// Creates the user when absent. Never touches `role`.
    async fn upsert_profile(
        &self,
        email: &str,
        profile: &UserProfile,
    ) -> Result<UpdateResult, StoreError>;

    /// Does not create missing users; `matched_count` is 0 in that case.
    async fn set_role(&self, email: &str, role: Role) -> Result<UpdateResult, StoreError>;
}

#[async_trait]
pub trait DoctorStore: Send + Sync {
    async fn list_doctors(&self) -> Result<Vec<Doctor>, StoreError>;

    async fn insert_doctor(&self, doctor: NewDoctor) -> Result<Doctor, StoreError>;

    /// Returns the number of deleted records.
    async fn delete_doctor(&self, id: Uuid) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait ServiceCatalog: Send + Sync {
    async fn list_services(&self) -> Result<Vec<Service>, StoreError>;

    async fn list_service_names(&self) -> Result<Vec<ServiceName>, StoreError>;
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Atomic conditional insert on (treatment, patient_email, date).
    async fn create_booking(&self, booking: NewBooking) -> Result<BookingOutcome, StoreError>;

    async fn find_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError>;

    async fn bookings_on(&self, date: &str) -> Result<Vec<Booking>, StoreError>;

    async fn bookings_for_patient(&self, email: &str) -> Result<Vec<Booking>, StoreError>;

    /// Marks the booking paid and appends the payment in one step.
    /// `None` means the booking does not exist and nothing was written.
    async fn confirm_payment(
        &self,
        id: Uuid,
        details: PaymentDetails,
    ) -> Result<Option<PaymentConfirmation>, StoreError>;
}
