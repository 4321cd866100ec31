use chrono::{DateTime, Datelike, Utc};
use rand::Rng;

use crate::models::shipment::FreightType;

/// Builds `CLEX-{code}{yy}-{nnnn}` from an explicit serial.
pub fn format_reference(freight: FreightType, at: DateTime<Utc>, serial: u16) -> String {
    format!(
        "CLEX-{}{:02}-{:04}",
        freight.code(),
        at.year().rem_euclid(100),
        serial % 10_000
    )
}

/// New reference with a random four-digit serial. Uniqueness is enforced by the store.
pub fn generate_reference(freight: FreightType, at: DateTime<Utc>) -> String {
    let serial = rand::rng().random_range(0..10_000);
    format_reference(freight, at, serial)
}
