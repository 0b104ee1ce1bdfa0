use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::TokenService;
use crate::notify::Mailer;
use crate::payments::PaymentGateway;
use crate::store::{BookingStore, DoctorStore, ServiceCatalog, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub doctors: Arc<dyn DoctorStore>,
    pub catalog: Arc<dyn ServiceCatalog>,
    pub bookings: Arc<dyn BookingStore>,
    pub tokens: Arc<TokenService>,
    pub payments: Arc<dyn PaymentGateway>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    /// Wire every store seam to one backing store.
    pub fn new<S>(
        store: Arc<S>,
        tokens: TokenService,
        payments: Arc<dyn PaymentGateway>,
        mailer: Arc<dyn Mailer>,
    ) -> Self
    where
        S: UserStore + DoctorStore + ServiceCatalog + BookingStore + 'static,
    {
        Self {
            users: store.clone(),
            doctors: store.clone(),
            catalog: store.clone(),
            bookings: store,
            tokens: Arc::new(tokens),
            payments,
            mailer,
        }
    }
}

/* -------------------------
   Records
--------------------------*/

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
        }
    }

    /// Unknown role strings are treated as no role.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Some(Role::Admin)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Doctor {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub specialty: String,
    pub img: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    /// Display order is significant.
    pub slots: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceName {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub treatment: String,
    pub patient_email: String,
    pub patient_name: Option<String>,
    pub phone: Option<String>,
    pub date: String,
    pub slot: String,
    pub price: Option<f64>,
    pub paid: bool,
    pub transaction_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub transaction_id: String,
    pub amount: Option<f64>,
    pub meta: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/* -------------------------
   Write inputs
--------------------------*/

/// Profile fields a user may set on themselves. `role` is deliberately absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserProfile {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewDoctor {
    pub name: String,
    pub email: Option<String>,
    pub specialty: String,
    pub img: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    pub treatment: String,
    pub patient_email: String,
    pub patient_name: Option<String>,
    pub phone: Option<String>,
    pub date: String,
    #[serde(alias = "Slot")]
    pub slot: String,
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    pub transaction_id: String,
    pub amount: Option<f64>,
    pub meta: Option<serde_json::Value>,
}

/* -------------------------
   Store outcomes
--------------------------*/

#[derive(Debug, Clone)]
pub enum BookingOutcome {
    Created(Booking),
    Existing(Booking),
}

/// Result of marking a booking paid. `modified` is false when the booking
/// was already paid under the same transaction id.
#[derive(Debug, Clone)]
pub struct PaymentConfirmation {
    pub booking: Booking,
    pub payment: Payment,
    pub modified: bool,
}

impl PaymentConfirmation {
    pub fn modified_count(&self) -> u64 {
        u64::from(self.modified)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertResult {
    pub acknowledged: bool,
    pub inserted_id: Uuid,
}

impl InsertResult {
    pub fn new(inserted_id: Uuid) -> Self {
        Self {
            acknowledged: true,
            inserted_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upserted_id: Option<String>,
}

impl UpdateResult {
    pub fn matched(matched_count: u64, modified_count: u64) -> Self {
        Self {
            acknowledged: true,
            matched_count,
            modified_count,
            upserted_id: None,
        }
    }

    pub fn upserted(key: impl Into<String>) -> Self {
        Self {
            acknowledged: true,
            matched_count: 0,
            modified_count: 0,
            upserted_id: Some(key.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

impl DeleteResult {
    pub fn new(deleted_count: u64) -> Self {
        Self {
            acknowledged: true,
            deleted_count,
        }
    }
}
