//! # hotel-booking: Booking & Ledger Consistency Core
//!
//! The use-cases the API layer calls. Rules live in `hotel-core`, rows in
//! `hotel-db`; this crate makes each operation atomic and serializes the
//! ones that race.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   API layer (out of scope)                                              │
//! │        │  create_reservation / record_payment / check_in / ...          │
//! │        ▼                                                                │
//! │   ┌─────────────────────────────────────────────────────────────────┐   │
//! │   │               ★ hotel-booking (THIS CRATE) ★                    │   │
//! │   │                                                                 │   │
//! │   │   BookingEngine ── LockRegistry (room / reservation / invoice)  │   │
//! │   │        │                                                        │   │
//! │   │        │  one sqlx transaction per operation                    │   │
//! │   └────────┼────────────────────────────────────────────────────────┘   │
//! │            ▼                                                            │
//! │   hotel-core (pure rules)        hotel-db (SQLite repositories)         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`engine`] - [`BookingEngine`], one method per use-case
//! - [`locks`] - Per-entity async locks
//! - [`config`] - [`HotelConfig`] (TOML file + environment)
//! - [`error`] - [`BookingError`] and its API [`ErrorCode`]
//!
//! ## Usage
//!
//! ```rust,ignore
//! use hotel_booking::{BookingEngine, HotelConfig};
//!
//! let config = HotelConfig::load(None)?;
//! let engine = BookingEngine::open(&config).await?;
//!
//! let reservation = engine.create_reservation(request).await?;
//! engine.record_payment(reservation.id, payment).await?;
//! engine.check_in(reservation.id, None).await?;
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod locks;

pub use config::{ConfigError, HotelConfig};
pub use engine::BookingEngine;
pub use error::{BookingError, BookingResult, ErrorCode, ErrorResponse};
pub use locks::LockRegistry;
