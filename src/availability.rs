use std::collections::HashSet;

use crate::models::{Booking, Service};

/// Open slots per service for `date`: the catalog's slots minus every slot
/// booked for that treatment on that date. Catalog order is kept.
pub fn available_slots(date: &str, catalog: Vec<Service>, bookings: &[Booking]) -> Vec<Service> {
    catalog
        .into_iter()
        .map(|mut service| {
            let booked: HashSet<&str> = bookings
                .iter()
                .filter(|b| b.date == date && b.treatment == service.name)
                .map(|b| b.slot.as_str())
                .collect();
            service.slots.retain(|slot| !booked.contains(slot.as_str()));
            service
        })
        .collect()
}
