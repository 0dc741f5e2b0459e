//! # Pricing Calculator
//!
//! Turns a room type, a currency and a stay into a priced breakdown.
//!
//! ## Flow
//! ```text
//! RoomType ──► rate_for(currency) ──► price_per_night
//!                 │                        │
//!                 │ EUR missing?           ▼
//!                 └─► USD × 0.92    × nights ──► subtotal
//!                                              │
//!                              calculate_tax ◄─┘
//!                                    │
//!                    total = subtotal + tax
//! ```
//!
//! Tax rate and the EUR factor come from [`PricingConfig`], never from
//! process-wide constants, so a caller can price with a different
//! jurisdiction's rate without touching shared state.

use serde::{Deserialize, Serialize};

use crate::error::CoreResult;
use crate::money::Money;
use crate::types::{Currency, DateRange, RoomType, TaxRate};
use crate::validation::validate_stay;
use crate::{DEFAULT_EUR_PER_USD_BPS, DEFAULT_TAX_BPS};

// =============================================================================
// Configuration
// =============================================================================

/// Inputs to pricing that vary by deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Tax applied to the lodging subtotal.
    pub tax_rate: TaxRate,
    /// USD → EUR factor in basis points, used when a room type has no EUR rate.
    pub eur_per_usd_bps: u32,
}

impl Default for PricingConfig {
    fn default() -> Self {
        PricingConfig {
            tax_rate: TaxRate::from_bps(DEFAULT_TAX_BPS),
            eur_per_usd_bps: DEFAULT_EUR_PER_USD_BPS,
        }
    }
}

// =============================================================================
// Breakdown
// =============================================================================

/// The priced components of a stay, all in the stay's currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub currency: Currency,
    pub price_per_night: Money,
    pub nights: i64,
    pub subtotal: Money,
    pub tax_rate: TaxRate,
    pub tax: Money,
    pub total: Money,
}

/// Nightly rate of a room type in the requested currency.
///
/// ## Example
/// ```rust
/// use hotel_core::pricing::{rate_for, PricingConfig};
/// use hotel_core::types::{Currency, RoomType};
///
/// let standard = RoomType::new("Standard", 2, 150_000, 4_000, None);
/// let eur = rate_for(&standard, Currency::Eur, &PricingConfig::default());
/// assert_eq!(eur.cents(), 3_680); // 40.00 × 0.92
/// ```
pub fn rate_for(room_type: &RoomType, currency: Currency, config: &PricingConfig) -> Money {
    match currency {
        Currency::Ves => Money::from_cents(room_type.base_price_ves_cents),
        Currency::Usd => Money::from_cents(room_type.base_price_usd_cents),
        Currency::Eur => match room_type.base_price_eur_cents {
            Some(cents) => Money::from_cents(cents),
            None => Money::from_cents(room_type.base_price_usd_cents)
                .apply_bps(config.eur_per_usd_bps),
        },
    }
}

/// Prices a stay.
///
/// ## Errors
/// - [`CoreError::InvalidDateRange`](crate::CoreError::InvalidDateRange) when
///   the stay has zero, negative or too many nights
///
/// Unsupported currencies never reach this function: [`Currency`] parsing
/// rejects them at the boundary.
pub fn price_stay(
    room_type: &RoomType,
    currency: Currency,
    stay: DateRange,
    config: &PricingConfig,
) -> CoreResult<PriceBreakdown> {
    let nights = validate_stay(stay)?;
    let price_per_night = rate_for(room_type, currency, config);

    let subtotal = price_per_night.multiply_quantity(nights);
    let tax = subtotal.calculate_tax(config.tax_rate);

    Ok(PriceBreakdown {
        currency,
        price_per_night,
        nights,
        subtotal,
        tax_rate: config.tax_rate,
        tax,
        total: subtotal + tax,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
