use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{BookingStore, DoctorStore, ServiceCatalog, StoreError, UserStore};
use crate::models::{
    Booking, BookingOutcome, Doctor, NewBooking, NewDoctor, Payment, PaymentConfirmation,
    PaymentDetails, Role, Service, ServiceName, UpdateResult, User, UserProfile,
};

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/* -------------------------
   DB Row Models
--------------------------*/

#[derive(Debug, FromRow)]
struct UserRow {
    email: String,
    name: Option<String>,
    role: Option<String>,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        User {
            email: r.email,
            name: r.name,
            role: r.role.as_deref().and_then(Role::parse),
        }
    }
}

#[derive(Debug, FromRow)]
struct DoctorRow {
    doctor_id: Uuid,
    name: String,
    email: Option<String>,
    specialty: String,
    img: Option<String>,
}

impl From<DoctorRow> for Doctor {
    fn from(r: DoctorRow) -> Self {
        Doctor {
            id: r.doctor_id,
            name: r.name,
            email: r.email,
            specialty: r.specialty,
            img: r.img,
        }
    }
}

#[derive(Debug, FromRow)]
struct ServiceRow {
    service_id: Uuid,
    name: String,
    slots: Vec<String>,
    price: Option<f64>,
}

impl From<ServiceRow> for Service {
    fn from(r: ServiceRow) -> Self {
        Service {
            id: r.service_id,
            name: r.name,
            slots: r.slots,
            price: r.price,
        }
    }
}

#[derive(Debug, FromRow)]
struct BookingRow {
    booking_id: Uuid,
    treatment: String,
    patient_email: String,
    patient_name: Option<String>,
    phone: Option<String>,
    date: String,
    slot: String,
    price: Option<f64>,
    paid: bool,
    transaction_id: Option<String>,
}

impl From<BookingRow> for Booking {
    fn from(r: BookingRow) -> Self {
        Booking {
            id: r.booking_id,
            treatment: r.treatment,
            patient_email: r.patient_email,
            patient_name: r.patient_name,
            phone: r.phone,
            date: r.date,
            slot: r.slot,
            price: r.price,
            paid: r.paid,
            transaction_id: r.transaction_id,
        }
    }
}

#[derive(Debug, FromRow)]
struct PaymentRow {
    payment_id: Uuid,
    booking_id: Uuid,
    transaction_id: String,
    amount: Option<f64>,
    meta: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
}

impl From<PaymentRow> for Payment {
    fn from(r: PaymentRow) -> Self {
        Payment {
            id: r.payment_id,
            booking_id: r.booking_id,
            transaction_id: r.transaction_id,
            amount: r.amount,
            meta: r.meta,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct UpsertRow {
    inserted: bool,
    changed: bool,
}

#[derive(Debug, FromRow)]
struct CountsRow {
    matched: i64,
    modified: i64,
}

const BOOKING_COLUMNS: &str = r#"
    booking_id, treatment, patient_email, patient_name, phone,
    date, slot, price, paid, transaction_id
"#;

#[async_trait]
impl UserStore for PgStore {
    async fn find_user(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT email, name, role
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(User::from))
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT email, name, role
            FROM users
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn upsert_profile(
        &self,
        email: &str,
        profile: &UserProfile,
    ) -> Result<UpdateResult, StoreError> {
        let name = profile
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());

        // xmax = 0 only for freshly inserted tuples.
        let row = sqlx::query_as::<_, UpsertRow>(
            r#"
            WITH prev AS (
              SELECT name FROM users WHERE email = $1
            )
            INSERT INTO users (email, name)
            VALUES ($1, $2)
            ON CONFLICT (email)
            DO UPDATE SET name = COALESCE(EXCLUDED.name, users.name)
            RETURNING
              (xmax = 0) AS inserted,
              (users.name IS DISTINCT FROM (SELECT name FROM prev)) AS changed
            "#,
        )
        .bind(email)
        .bind(name)
        .fetch_one(&self.db)
        .await?;

        if row.inserted {
            Ok(UpdateResult::upserted(email))
        } else {
            Ok(UpdateResult::matched(1, u64::from(row.changed)))
        }
    }

    async fn set_role(&self, email: &str, role: Role) -> Result<UpdateResult, StoreError> {
        let counts = sqlx::query_as::<_, CountsRow>(
            r#"
            WITH target AS (
              SELECT email, role FROM users WHERE email = $2 FOR UPDATE
            ),
            updated AS (
              UPDATE users u
              SET role = $1
              FROM target t
              WHERE u.email = t.email
                AND t.role IS DISTINCT FROM $1
              RETURNING u.email
            )
            SELECT
              (SELECT COUNT(*) FROM target)  AS matched,
              (SELECT COUNT(*) FROM updated) AS modified
            "#,
        )
        .bind(role.as_str())
        .bind(email)
        .fetch_one(&self.db)
        .await?;

        Ok(UpdateResult::matched(
            counts.matched.max(0) as u64,
            counts.modified.max(0) as u64,
        ))
    }
}

#[async_trait]
impl DoctorStore for PgStore {
    async fn list_doctors(&self) -> Result<Vec<Doctor>, StoreError> {
        let rows = sqlx::query_as::<_, DoctorRow>(
            r#"
            SELECT doctor_id, name, email, specialty, img
            FROM doctors
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Doctor::from).collect())
    }

    async fn insert_doctor(&self, doctor: NewDoctor) -> Result<Doctor, StoreError> {
        let row = sqlx::query_as::<_, DoctorRow>(
            r#"
            INSERT INTO doctors (doctor_id, name, email, specialty, img)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING doctor_id, name, email, specialty, img
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(doctor.name)
        .bind(doctor.email)
        .bind(doctor.specialty)
        .bind(doctor.img)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    async fn delete_doctor(&self, id: Uuid) -> Result<u64, StoreError> {
        let res = sqlx::query(
            r#"
            DELETE FROM doctors
            WHERE doctor_id = $1
            "#,
        )
        .bind(id)
        .execute(&self.db)
        .await?;

        Ok(res.rows_affected())
    }
}

#[async_trait]
impl ServiceCatalog for PgStore {
    async fn list_services(&self) -> Result<Vec<Service>, StoreError> {
        let rows = sqlx::query_as::<_, ServiceRow>(
            r#"
            SELECT service_id, name, slots, price
            FROM services
            ORDER BY display_order ASC, name ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Service::from).collect())
    }

    async fn list_service_names(&self) -> Result<Vec<ServiceName>, StoreError> {
        let rows: Vec<(Uuid, String)> = sqlx::query_as(
            r#"
            SELECT service_id, name
            FROM services
            ORDER BY display_order ASC, name ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name)| ServiceName { id, name })
            .collect())
    }
}

#[async_trait]
impl BookingStore for PgStore {
    async fn create_booking(&self, booking: NewBooking) -> Result<BookingOutcome, StoreError> {
        // The unique index on the triple makes this a single atomic decision.
        let inserted = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            INSERT INTO bookings (
              booking_id, treatment, patient_email, patient_name, phone, date, slot, price
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (treatment, patient_email, date) DO NOTHING
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&booking.treatment)
        .bind(&booking.patient_email)
        .bind(&booking.patient_name)
        .bind(&booking.phone)
        .bind(&booking.date)
        .bind(&booking.slot)
        .bind(booking.price)
        .fetch_optional(&self.db)
        .await?;

        if let Some(row) = inserted {
            return Ok(BookingOutcome::Created(row.into()));
        }

        let existing = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            SELECT {BOOKING_COLUMNS}
            FROM bookings
            WHERE treatment = $1 AND patient_email = $2 AND date = $3
            "#
        ))
        .bind(&booking.treatment)
        .bind(&booking.patient_email)
        .bind(&booking.date)
        .fetch_one(&self.db)
        .await?;

        Ok(BookingOutcome::Existing(existing.into()))
    }

    async fn find_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            SELECT {BOOKING_COLUMNS}
            FROM bookings
            WHERE booking_id = $1
            "#
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Booking::from))
    }

    async fn bookings_on(&self, date: &str) -> Result<Vec<Booking>, StoreError> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            SELECT {BOOKING_COLUMNS}
            FROM bookings
            WHERE date = $1
            ORDER BY created_at ASC
            "#
        ))
        .bind(date)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Booking::from).collect())
    }

    async fn bookings_for_patient(&self, email: &str) -> Result<Vec<Booking>, StoreError> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            SELECT {BOOKING_COLUMNS}
            FROM bookings
            WHERE patient_email = $1
            ORDER BY created_at ASC
            "#
        ))
        .bind(email)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Booking::from).collect())
    }

    async fn confirm_payment(
        &self,
        id: Uuid,
        details: PaymentDetails,
    ) -> Result<Option<PaymentConfirmation>, StoreError> {
        let mut tx = self.db.begin().await?;

        let previous = sqlx::query_as::<_, (bool, Option<String>)>(
            r#"
            SELECT paid, transaction_id
            FROM bookings
            WHERE booking_id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((was_paid, previous_tx)) = previous else {
            tx.rollback().await?;
            return Ok(None);
        };
        let modified =
            !(was_paid && previous_tx.as_deref() == Some(details.transaction_id.as_str()));

        let booking = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            UPDATE bookings
            SET paid = true, transaction_id = $2
            WHERE booking_id = $1
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&details.transaction_id)
        .fetch_one(&mut *tx)
        .await?;

        let payment = sqlx::query_as::<_, PaymentRow>(
            r#"
            INSERT INTO payments (payment_id, booking_id, transaction_id, amount, meta)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING payment_id, booking_id, transaction_id, amount, meta, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(id)
        .bind(&details.transaction_id)
        .bind(details.amount)
        .bind(details.meta)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(PaymentConfirmation {
            booking: booking.into(),
            payment: payment.into(),
            modified,
        }))
    }
}
