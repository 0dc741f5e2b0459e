//! # Repository Module
//!
//! Database repositories for the booking core.
//!
//! ## Two Ways In
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Pool methods (&self)            Connection functions (conn: &mut ..)   │
//! │  ─────────────────────           ───────────────────────────────────    │
//! │  db.rooms().get_by_id(101)       RoomRepository::find(&mut tx, 101)     │
//! │  db.reservations().get_by_code() ReservationRepository::update(&mut tx) │
//! │                                                                         │
//! │  One-shot reads and seeding.     Used by the booking engine inside a    │
//! │  Each call borrows a pooled      single transaction so that the check   │
//! │  connection for one query.       and the write commit together.         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Pool methods are thin wrappers that acquire a connection and call the
//! connection function, so the SQL lives in one place.
//!
//! ## Available Repositories
//!
//! - [`RoomTypeRepository`] - Room categories and rates
//! - [`RoomRepository`] - Rooms and their status
//! - [`GuestRepository`] - Guests
//! - [`ReservationRepository`] - Reservations and overlap queries
//! - [`PaymentRepository`] - Payments
//! - [`InvoiceRepository`] - Invoices and invoice items

pub mod guest;
pub mod invoice;
pub mod payment;
pub mod reservation;
pub mod room;

pub use guest::GuestRepository;
pub use invoice::InvoiceRepository;
pub use payment::PaymentRepository;
pub use reservation::ReservationRepository;
pub use room::{RoomRepository, RoomTypeRepository};

use uuid::Uuid;

/// Cuts an uppercase `[A-Z0-9]` code of `len` characters from a random UUID.
pub(crate) fn random_code(len: usize) -> String {
    let mut code = String::with_capacity(len);
    while code.len() < len {
        let hex = Uuid::new_v4().simple().to_string().to_ascii_uppercase();
        code.extend(hex.chars().take(len - code.len()));
    }
    code
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_code_shape() {
        for len in [8, 10, 40] {
            let code = random_code(len);
            assert_eq!(code.len(), len);
            assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }
}
