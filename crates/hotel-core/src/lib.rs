//! # hotel-core: Pure Booking & Ledger Logic
//!
//! This crate is the **heart** of the hotel booking core. It contains every
//! pricing, availability, state-machine and ledger rule as pure functions with
//! zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Hotel Booking Core Architecture                     │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 API layer (out of scope here)                   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │   hotel-booking: BookingEngine (locks + one transaction / op)   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ hotel-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │  ┌─────────┐ ┌──────────────┐ ┌─────────────┐ ┌─────────────┐  │   │
//! │  │  │ pricing │ │ availability │ │ reservation │ │   ledger    │  │   │
//! │  │  └─────────┘ └──────────────┘ └─────────────┘ └─────────────┘  │   │
//! │  │  ┌────────────┐ ┌─────────┐ ┌───────┐ ┌───────┐ ┌────────────┐ │   │
//! │  │  │ room_state │ │ invoice │ │ money │ │ types │ │ validation │ │   │
//! │  │  └────────────┘ └─────────┘ └───────┘ └───────┘ └────────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 hotel-db (SQLite repositories)                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`types`] - Domain records (Room, Reservation, Payment, Invoice, ...)
//! - [`pricing`] - Pricing Calculator
//! - [`availability`] - Availability Engine (interval logic)
//! - [`reservation`] - Reservation State Machine
//! - [`ledger`] - Payment Ledger arithmetic
//! - [`room_state`] - Room-State Coordinator
//! - [`invoice`] - Invoice Ledger
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::NaiveDate;
//! use hotel_core::pricing::{price_stay, PricingConfig};
//! use hotel_core::types::{Currency, DateRange, RoomType};
//!
//! let room_type = RoomType::new("Standard", 2, 150_000, 4_000, None);
//! let stay = DateRange::new(
//!     NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2025, 3, 4).unwrap(),
//! );
//!
//! let quote = price_stay(&room_type, Currency::Usd, stay, &PricingConfig::default()).unwrap();
//! assert_eq!(quote.subtotal.cents(), 12_000); // $120.00
//! assert_eq!(quote.tax.cents(), 1_920);       // 16%
//! assert_eq!(quote.total.cents(), 13_920);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod availability;
pub mod error;
pub mod invoice;
pub mod ledger;
pub mod money;
pub mod pricing;
pub mod reservation;
pub mod room_state;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default VAT applied to lodging: 16% in basis points.
pub const DEFAULT_TAX_BPS: u32 = 1600;

/// Default USD → EUR factor used when a room type has no EUR rate: 0.92.
pub const DEFAULT_EUR_PER_USD_BPS: u32 = 9200;

/// Length of a reservation confirmation code (`[A-Z0-9]{8}`).
pub const CONFIRMATION_CODE_LEN: usize = 8;

/// Length of the random part of a payment code (`PAY-[A-Z0-9]{10}`).
pub const PAYMENT_CODE_LEN: usize = 10;

/// Maximum number of nights in a single reservation.
///
/// ## Business Reason
/// Catches typos in the year (2025 → 2052) before they block a room for decades.
pub const MAX_STAY_NIGHTS: i64 = 365;

/// Maximum quantity on a single invoice line.
pub const MAX_ITEM_QUANTITY: i64 = 999;
