//! # hotel-db: Database Layer for the Hotel Booking Core
//!
//! SQLite persistence for rooms, guests, reservations, payments and invoices,
//! using sqlx for async access.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Booking Core Data Flow                             │
//! │                                                                         │
//! │  BookingEngine::create_reservation (hotel-booking)                      │
//! │       │  opens one transaction per operation                            │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     hotel-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌──────────────────┐   ┌─────────────┐  │   │
//! │  │   │   Database    │    │   Repositories   │   │ Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                  │   │ (embedded)  │  │   │
//! │  │   │               │    │ RoomRepository   │   │             │  │   │
//! │  │   │ SqlitePool    │◄───│ ReservationRepo  │   │ 001_initial │  │   │
//! │  │   │ WAL, FKs on   │    │ PaymentRepo      │   │ _schema.sql │  │   │
//! │  │   │               │    │ InvoiceRepo ...  │   │             │  │   │
//! │  │   └───────────────┘    └──────────────────┘   └─────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use hotel_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("hotel.db")).await?;
//! let reservation = db.reservations().get_by_code("3F9A1C2B").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::{
    GuestRepository, InvoiceRepository, PaymentRepository, ReservationRepository,
    RoomRepository, RoomTypeRepository,
};
