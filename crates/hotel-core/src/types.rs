//! # Domain Types
//!
//! Core domain records shared by every layer of the booking core.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           Domain Types                                  │
//! │                                                                         │
//! │  ┌──────────────┐      ┌──────────────┐      ┌──────────────────┐      │
//! │  │   RoomType   │◄─────│     Room     │◄─────│   Reservation    │      │
//! │  │  capacity    │      │  status      │      │  stay dates      │      │
//! │  │  base prices │      │  room_number │      │  status, totals  │      │
//! │  └──────────────┘      └──────────────┘      │  paid / balance  │      │
//! │                                              └────────┬─────────┘      │
//! │  ┌──────────────┐                                     │                 │
//! │  │    Guest     │◄────────────────────────────────────┤                 │
//! │  └──────────────┘                                     │                 │
//! │                              ┌────────────────────────┼────────┐        │
//! │                              ▼                        ▼        │        │
//! │                     ┌──────────────┐        ┌──────────────┐   │        │
//! │                     │   Payment    │        │   Invoice    │◄──┘        │
//! │                     │  amount      │        │  + items     │            │
//! │                     │  status      │        │  status      │            │
//! │                     └──────────────┘        └──────────────┘            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Records store money as `*_cents: i64` columns and rates as `*_bps: u32`,
//! with accessor methods returning [`Money`] / [`TaxRate`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%, so 1600 bps = 16% (lodging VAT).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate(crate::DEFAULT_TAX_BPS)
    }
}

// =============================================================================
// Currency
// =============================================================================

/// Currencies a stay can be priced and paid in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Venezuelan bolívar.
    Ves,
    /// US dollar.
    Usd,
    /// Euro. Falls back to a USD-derived rate when a room type has none.
    Eur,
}

impl Currency {
    /// ISO 4217 code.
    pub const fn code(&self) -> &'static str {
        match self {
            Currency::Ves => "VES",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
        }
    }

    /// Renders an amount with its currency code, e.g. `USD 139.20`.
    pub fn format(&self, amount: Money) -> String {
        format!("{} {}", self.code(), amount)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "VES" => Ok(Currency::Ves),
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            _ => Err(ValidationError::NotAllowed {
                field: "currency".to_string(),
                allowed: vec!["VES".to_string(), "USD".to_string(), "EUR".to_string()],
            }),
        }
    }
}

// =============================================================================
// Date Range
// =============================================================================

/// A stay expressed as a half-open night interval `[check_in, check_out)`.
///
/// The check-out day is not a night of the stay, which is what lets one
/// guest leave and the next arrive on the same date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

impl DateRange {
    /// Creates a range without validating it; see [`crate::validation::validate_stay`].
    pub const fn new(check_in: NaiveDate, check_out: NaiveDate) -> Self {
        DateRange {
            check_in,
            check_out,
        }
    }

    /// Number of nights. Zero or negative for an invalid range.
    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    /// Half-open overlap test: `a.in < b.out && a.out > b.in`.
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.check_in < other.check_out && self.check_out > other.check_in
    }
}

// =============================================================================
// Rooms
// =============================================================================

/// Housekeeping / operational status of a physical room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Available,
    Occupied,
    Cleaning,
    Maintenance,
    OutOfService,
}

impl RoomStatus {
    /// Statuses a room may have and still be offered for a future stay.
    pub const fn is_bookable(&self) -> bool {
        matches!(self, RoomStatus::Available | RoomStatus::Cleaning)
    }
}

/// A category of room with its capacity and nightly rates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct RoomType {
    pub id: i64,
    pub name: String,
    /// Maximum number of guests (adults + children).
    pub capacity: i64,
    pub base_price_ves_cents: i64,
    pub base_price_usd_cents: i64,
    /// Optional explicit EUR rate; derived from USD when absent.
    pub base_price_eur_cents: Option<i64>,
    pub is_active: bool,
}

impl RoomType {
    /// Builds an unsaved room type (id 0).
    pub fn new(
        name: impl Into<String>,
        capacity: i64,
        ves_cents: i64,
        usd_cents: i64,
        eur_cents: Option<i64>,
    ) -> Self {
        RoomType {
            id: 0,
            name: name.into(),
            capacity,
            base_price_ves_cents: ves_cents,
            base_price_usd_cents: usd_cents,
            base_price_eur_cents: eur_cents,
            is_active: true,
        }
    }
}

/// A physical, bookable room.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Room {
    pub id: i64,
    /// Business identifier printed on the door, e.g. "101".
    pub room_number: String,
    pub floor: i64,
    pub room_type_id: i64,
    pub status: RoomStatus,
    pub notes: Option<String>,
    pub is_active: bool,
}

// =============================================================================
// Guests
// =============================================================================

/// Fiscal identity document kinds used on invoices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
pub enum DocumentType {
    /// National identity card.
    #[serde(rename = "V")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "V"))]
    National,
    /// Resident foreigner.
    #[serde(rename = "E")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "E"))]
    Foreign,
    /// Company tax id.
    #[serde(rename = "J")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "J"))]
    Company,
    /// Government entity.
    #[serde(rename = "G")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "G"))]
    Government,
    #[serde(rename = "P")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "P"))]
    Passport,
}

/// A guest who books and pays for stays.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Guest {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub document_type: DocumentType,
    pub document_number: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl Guest {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

// =============================================================================
// Reservations
// =============================================================================

/// Lifecycle status of a reservation. See [`crate::reservation`] for the
/// legal transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    CheckedIn,
    CheckedOut,
    Cancelled,
    NoShow,
}

impl ReservationStatus {
    /// Active reservations hold exclusive use of their room's nights.
    pub const fn is_active(&self) -> bool {
        matches!(
            self,
            ReservationStatus::Pending | ReservationStatus::Confirmed | ReservationStatus::CheckedIn
        )
    }

    /// Closed reservations accept no further payments.
    pub const fn is_closed(&self) -> bool {
        matches!(
            self,
            ReservationStatus::CheckedOut | ReservationStatus::Cancelled | ReservationStatus::NoShow
        )
    }

    /// Lowercase name as stored in the database.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::CheckedIn => "checked_in",
            ReservationStatus::CheckedOut => "checked_out",
            ReservationStatus::Cancelled => "cancelled",
            ReservationStatus::NoShow => "no_show",
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A booking of one room for a half-open range of nights.
///
/// ## Ledger Fields
/// `paid_cents`, `balance_cents` and `is_paid` are only ever written through
/// [`crate::ledger`], which keeps `balance = max(0, total - paid)` and
/// `is_paid = (balance == 0)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Reservation {
    pub id: i64,
    /// Public 8-character code, unique.
    pub confirmation_code: String,
    pub guest_id: i64,
    pub room_id: i64,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub actual_check_in: Option<DateTime<Utc>>,
    pub actual_check_out: Option<DateTime<Utc>>,
    pub num_adults: i64,
    pub num_children: i64,
    pub status: ReservationStatus,
    pub currency: Currency,
    pub price_per_night_cents: i64,
    pub total_nights: i64,
    pub subtotal_cents: i64,
    pub tax_rate_bps: u32,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub paid_cents: i64,
    pub balance_cents: i64,
    pub is_paid: bool,
    pub special_requests: Option<String>,
    pub notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    /// The booked nights as a range.
    #[inline]
    pub fn stay(&self) -> DateRange {
        DateRange::new(self.check_in_date, self.check_out_date)
    }

    #[inline]
    pub fn price_per_night(&self) -> Money {
        Money::from_cents(self.price_per_night_cents)
    }

    #[inline]
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn paid(&self) -> Money {
        Money::from_cents(self.paid_cents)
    }

    #[inline]
    pub fn balance(&self) -> Money {
        Money::from_cents(self.balance_cents)
    }

    /// Total number of guests staying.
    #[inline]
    pub fn guest_count(&self) -> i64 {
        self.num_adults + self.num_children
    }
}

// =============================================================================
// Payments
// =============================================================================

/// Settlement state of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Recorded but not yet settled (e.g. transfer awaiting confirmation).
    Pending,
    /// Settled; counted in the reservation's paid amount.
    Completed,
    Failed,
    /// Reversed; no longer counted.
    Refunded,
}

/// How the guest paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CashVes,
    CashUsd,
    CashEur,
    Transfer,
    MobilePayment,
    CreditCard,
    DebitCard,
    Other,
}

/// A payment against a reservation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Payment {
    pub id: i64,
    /// Public code `PAY-XXXXXXXXXX`, unique.
    pub payment_code: String,
    pub reservation_id: i64,
    pub amount_cents: i64,
    pub currency: Currency,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub reference_number: Option<String>,
    pub bank_name: Option<String>,
    pub notes: Option<String>,
    pub payment_date: DateTime<Utc>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Invoices
// =============================================================================

/// Lifecycle status of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Issued,
    Paid,
    Cancelled,
    Void,
}

/// A fiscal invoice header. Line items live in [`InvoiceItem`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Invoice {
    pub id: i64,
    /// `FAC-YYYYMMDD-NNNN`, unique.
    pub invoice_number: String,
    pub reservation_id: Option<i64>,
    pub guest_id: i64,
    pub document_type: DocumentType,
    pub document_number: String,
    pub customer_name: String,
    pub customer_address: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub currency: Currency,
    pub subtotal_cents: i64,
    pub tax_rate_bps: u32,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub paid_cents: i64,
    pub balance_cents: i64,
    pub status: InvoiceStatus,
    pub issue_date: Option<DateTime<Utc>>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    #[inline]
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn paid(&self) -> Money {
        Money::from_cents(self.paid_cents)
    }

    #[inline]
    pub fn balance(&self) -> Money {
        Money::from_cents(self.balance_cents)
    }
}

/// One line of an invoice. `subtotal = quantity × unit_price`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InvoiceItem {
    pub id: i64,
    pub invoice_id: i64,
    pub description: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
}

impl InvoiceItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

/// An invoice together with its lines, as returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceWithItems {
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
}

// =============================================================================
// Unit Tests
// =============================================================================
