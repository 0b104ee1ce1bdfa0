use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{BookingStore, DoctorStore, ServiceCatalog, StoreError, UserStore};
use crate::models::{
    Booking, BookingOutcome, Doctor, NewBooking, NewDoctor, Payment, PaymentConfirmation,
    PaymentDetails, Role, Service, ServiceName, UpdateResult, User, UserProfile,
};

#[derive(Default)]
struct Collections {
    /// Insertion order, matching `created_at` order in Postgres.
    users: Vec<User>,
    doctors: Vec<Doctor>,
    services: Vec<Service>,
    bookings: Vec<Booking>,
    payments: Vec<Payment>,
}

/// Single-lock store used for local development and tests.
/// Every write holds the one lock, so multi-record updates are atomic.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_services(services: Vec<Service>) -> Self {
        Self {
            inner: RwLock::new(Collections {
                services,
                ..Collections::default()
            }),
        }
    }

    #[cfg(test)]
    pub async fn payments(&self) -> Vec<Payment> {
        self.inner.read().await.payments.clone()
    }

    #[cfg(test)]
    pub async fn booking_count(&self) -> usize {
        self.inner.read().await.bookings.len()
    }
}

/// Same catalog the Postgres seed migration installs.
pub fn default_catalog() -> Vec<Service> {
    let slots = |labels: &[&str]| labels.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    let morning = [
        "08.00 AM - 08.30 AM",
        "08.30 AM - 09.00 AM",
        "09.00 AM - 09.30 AM",
        "09.30 AM - 10.00 AM",
        "10.00 AM - 10.30 AM",
    ];
    let afternoon = [
        "01.00 PM - 01.30 PM",
        "01.30 PM - 02.00 PM",
        "02.00 PM - 02.30 PM",
        "02.30 PM - 03.00 PM",
    ];

    [
        ("Teeth Orthodontics", &morning[..], 120.0),
        ("Cosmetic Dentistry", &afternoon[..], 150.0),
        ("Teeth Cleaning", &morning[..], 80.0),
        ("Cavity Protection", &afternoon[..], 95.0),
        ("Pediatric Dental", &morning[..], 70.0),
        ("Oral Surgery", &afternoon[..], 250.0),
    ]
    .into_iter()
    .map(|(name, labels, price)| Service {
        id: Uuid::new_v4(),
        name: name.to_string(),
        slots: slots(labels),
        price: Some(price),
    })
    .collect()
}

fn trimmed_name(profile: &UserProfile) -> Option<String> {
    profile
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.inner.read().await.users.clone())
    }

    async fn upsert_profile(
        &self,
        email: &str,
        profile: &UserProfile,
    ) -> Result<UpdateResult, StoreError> {
        let mut guard = self.inner.write().await;
        let name = trimmed_name(profile);

        match guard.users.iter_mut().find(|u| u.email == email) {
            Some(user) => {
                let modified = name.is_some() && user.name != name;
                if modified {
                    user.name = name;
                }
                Ok(UpdateResult::matched(1, u64::from(modified)))
            }
            None => {
                guard.users.push(User {
                    email: email.to_string(),
                    name,
                    role: None,
                });
                Ok(UpdateResult::upserted(email))
            }
        }
    }

    async fn set_role(&self, email: &str, role: Role) -> Result<UpdateResult, StoreError> {
        let mut guard = self.inner.write().await;
        let Some(user) = guard.users.iter_mut().find(|u| u.email == email) else {
            return Ok(UpdateResult::matched(0, 0));
        };
        let modified = user.role != Some(role);
        user.role = Some(role);
        Ok(UpdateResult::matched(1, u64::from(modified)))
    }
}

#[async_trait]
impl DoctorStore for MemoryStore {
    async fn list_doctors(&self) -> Result<Vec<Doctor>, StoreError> {
        Ok(self.inner.read().await.doctors.clone())
    }

    async fn insert_doctor(&self, doctor: NewDoctor) -> Result<Doctor, StoreError> {
        let record = Doctor {
            id: Uuid::new_v4(),
            name: doctor.name,
            email: doctor.email,
            specialty: doctor.specialty,
            img: doctor.img,
        };
        self.inner.write().await.doctors.push(record.clone());
        Ok(record)
    }

    async fn delete_doctor(&self, id: Uuid) -> Result<u64, StoreError> {
        let mut guard = self.inner.write().await;
        let before = guard.doctors.len();
        guard.doctors.retain(|d| d.id != id);
        Ok((before - guard.doctors.len()) as u64)
    }
}

#[async_trait]
impl ServiceCatalog for MemoryStore {
    async fn list_services(&self) -> Result<Vec<Service>, StoreError> {
        Ok(self.inner.read().await.services.clone())
    }

    async fn list_service_names(&self) -> Result<Vec<ServiceName>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .services
            .iter()
            .map(|s| ServiceName {
                id: s.id,
                name: s.name.clone(),
            })
            .collect())
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn create_booking(&self, booking: NewBooking) -> Result<BookingOutcome, StoreError> {
        let mut guard = self.inner.write().await;

        if let Some(existing) = guard.bookings.iter().find(|b| {
            b.treatment == booking.treatment
                && b.patient_email == booking.patient_email
                && b.date == booking.date
        }) {
            return Ok(BookingOutcome::Existing(existing.clone()));
        }

        let record = Booking {
            id: Uuid::new_v4(),
            treatment: booking.treatment,
            patient_email: booking.patient_email,
            patient_name: booking.patient_name,
            phone: booking.phone,
            date: booking.date,
            slot: booking.slot,
            price: booking.price,
            paid: false,
            transaction_id: None,
        };
        guard.bookings.push(record.clone());
        Ok(BookingOutcome::Created(record))
    }

    async fn find_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .bookings
            .iter()
            .find(|b| b.id == id)
            .cloned())
    }

    async fn bookings_on(&self, date: &str) -> Result<Vec<Booking>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .bookings
            .iter()
            .filter(|b| b.date == date)
            .cloned()
            .collect())
    }

    async fn bookings_for_patient(&self, email: &str) -> Result<Vec<Booking>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .bookings
            .iter()
            .filter(|b| b.patient_email == email)
            .cloned()
            .collect())
    }

    async fn confirm_payment(
        &self,
        id: Uuid,
        details: PaymentDetails,
    ) -> Result<Option<PaymentConfirmation>, StoreError> {
        let mut guard = self.inner.write().await;

        let Some(booking) = guard.bookings.iter_mut().find(|b| b.id == id) else {
            return Ok(None);
        };
        let modified = !(booking.paid
            && booking.transaction_id.as_deref() == Some(details.transaction_id.as_str()));
        booking.paid = true;
        booking.transaction_id = Some(details.transaction_id.clone());
        let booking = booking.clone();

        let payment = Payment {
            id: Uuid::new_v4(),
            booking_id: id,
            transaction_id: details.transaction_id,
            amount: details.amount,
            meta: details.meta,
            created_at: Utc::now(),
        };
        guard.payments.push(payment.clone());

        Ok(Some(PaymentConfirmation {
            booking,
            payment,
            modified,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_booking(treatment: &str, email: &str, date: &str, slot: &str) -> NewBooking {
        NewBooking {
            treatment: treatment.into(),
            patient_email: email.into(),
            patient_name: None,
            phone: None,
            date: date.into(),
            slot: slot.into(),
            price: None,
        }
    }

    #[tokio::test]
    async fn duplicate_triple_returns_existing_without_insert() {
        let store = MemoryStore::new();

        let first = store
            .create_booking(new_booking("Teeth Cleaning", "a@x.com", "May 20, 2022", "A"))
            .await
            .unwrap();
        let BookingOutcome::Created(created) = first else {
            panic!("first booking should be created");
        };

        // Different slot, same triple.
        let second = store
            .create_booking(new_booking("Teeth Cleaning", "a@x.com", "May 20, 2022", "B"))
            .await
            .unwrap();
        match second {
            BookingOutcome::Existing(existing) => assert_eq!(existing, created),
            BookingOutcome::Created(_) => panic!("duplicate triple must not insert"),
        }
        assert_eq!(store.booking_count().await, 1);
    }

    #[tokio::test]
    async fn different_date_is_a_new_booking() {
        let store = MemoryStore::new();
        store
            .create_booking(new_booking("Teeth Cleaning", "a@x.com", "May 20, 2022", "A"))
            .await
            .unwrap();
        let other = store
            .create_booking(new_booking("Teeth Cleaning", "a@x.com", "May 21, 2022", "A"))
            .await
            .unwrap();
        assert!(matches!(other, BookingOutcome::Created(_)));
        assert_eq!(store.booking_count().await, 2);
    }

    #[tokio::test]
    async fn concurrent_identical_creates_store_one_record() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .create_booking(new_booking("Oral Surgery", "a@x.com", "May 20, 2022", "A"))
                    .await
                    .unwrap()
            }));
        }

        let mut created = 0;
        for h in handles {
            if matches!(h.await.unwrap(), BookingOutcome::Created(_)) {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        assert_eq!(store.booking_count().await, 1);
    }

    #[tokio::test]
    async fn upsert_never_grants_role_and_set_role_skips_missing_users() {
        let store = MemoryStore::new();

        let created = store
            .upsert_profile("jo@x.com", &UserProfile { name: Some("Jo".into()) })
            .await
            .unwrap();
        assert_eq!(created.upserted_id.as_deref(), Some("jo@x.com"));

        let user = store.find_user("jo@x.com").await.unwrap().unwrap();
        assert_eq!(user.role, None);

        let missing = store.set_role("ghost@x.com", Role::Admin).await.unwrap();
        assert_eq!(missing.matched_count, 0);
        assert!(store.find_user("ghost@x.com").await.unwrap().is_none());

        let granted = store.set_role("jo@x.com", Role::Admin).await.unwrap();
        assert_eq!((granted.matched_count, granted.modified_count), (1, 1));
        let again = store.set_role("jo@x.com", Role::Admin).await.unwrap();
        assert_eq!((again.matched_count, again.modified_count), (1, 0));
    }

    #[tokio::test]
    async fn confirm_payment_writes_flag_and_ledger_together() {
        let store = MemoryStore::new();
        let BookingOutcome::Created(booking) = store
            .create_booking(new_booking("Teeth Cleaning", "a@x.com", "May 20, 2022", "A"))
            .await
            .unwrap()
        else {
            panic!("expected a new booking");
        };

        let details = PaymentDetails {
            transaction_id: "pi_123".into(),
            amount: Some(80.0),
            meta: None,
        };

        let missing = store
            .confirm_payment(Uuid::new_v4(), details.clone())
            .await
            .unwrap();
        assert!(missing.is_none());
        assert!(store.payments().await.is_empty());

        let confirmed = store
            .confirm_payment(booking.id, details.clone())
            .await
            .unwrap()
            .unwrap();
        assert!(confirmed.modified);
        assert!(confirmed.booking.paid);
        assert_eq!(confirmed.booking.transaction_id.as_deref(), Some("pi_123"));
        assert_eq!(confirmed.payment.booking_id, booking.id);

        let ledger = store.payments().await;
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].transaction_id, "pi_123");

        // Same transaction again: the row is unchanged, the ledger still grows.
        let repeat = store
            .confirm_payment(booking.id, details.clone())
            .await
            .unwrap()
            .unwrap();
        assert!(!repeat.modified);
        assert_eq!(store.payments().await.len(), 2);

        let replaced = store
            .confirm_payment(
                booking.id,
                PaymentDetails {
                    transaction_id: "pi_456".into(),
                    ..details
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert!(replaced.modified);
        assert_eq!(replaced.booking.transaction_id.as_deref(), Some("pi_456"));
    }

    #[tokio::test]
    async fn users_list_in_insertion_order() {
        let store = MemoryStore::new();
        for email in ["zed@x.com", "amy@x.com", "mia@x.com"] {
            store
                .upsert_profile(email, &UserProfile::default())
                .await
                .unwrap();
        }
        // Updating an existing user must not move it.
        store
            .upsert_profile("zed@x.com", &UserProfile { name: Some("Zed".into()) })
            .await
            .unwrap();

        let emails: Vec<String> = store
            .list_users()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.email)
            .collect();
        assert_eq!(emails, ["zed@x.com", "amy@x.com", "mia@x.com"]);
    }

    #[tokio::test]
    async fn delete_doctor_reports_count() {
        let store = MemoryStore::new();
        let doc = store
            .insert_doctor(NewDoctor {
                name: "Dr. Who".into(),
                email: None,
                specialty: "Oral Surgery".into(),
                img: None,
            })
            .await
            .unwrap();
        assert_eq!(store.delete_doctor(doc.id).await.unwrap(), 1);
        assert_eq!(store.delete_doctor(doc.id).await.unwrap(), 0);
    }
}
