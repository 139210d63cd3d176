//! Cart price breakdown.
//!
//! Pure functions over a cart snapshot; no cache or network access. The
//! breakdown is recomputed in full on every read; nothing here is stored or
//! incrementally patched, so step ordering and clamping cannot drift from the
//! cached cart.
//!
//! Evaluation order is fixed, each step feeding the next:
//! subtotal → total discount → clamped discounted subtotal → shipping
//! (judged on the *undiscounted* subtotal) → VAT (on the discounted
//! subtotal) → grand total.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::constants::{FREE_SHIPPING_THRESHOLD, SHIPPING_FEE, VAT_RATE};
use crate::models::Cart;

#[derive(Debug, Clone, PartialEq)]
pub struct PricingConfig {
    pub vat_rate: Decimal,
    pub free_shipping_threshold: Decimal,
    pub shipping_fee: Decimal,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            vat_rate: VAT_RATE,
            free_shipping_threshold: FREE_SHIPPING_THRESHOLD,
            shipping_fee: SHIPPING_FEE,
        }
    }
}

/// Derived projection over a cart; has no lifecycle of its own.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceBreakdown {
    pub subtotal: Decimal,
    pub total_discount: Decimal,
    pub discounted_subtotal: Decimal,
    pub shipping: Decimal,
    pub vat: Decimal,
    pub total: Decimal,
}

pub fn price_breakdown(cart: &Cart, config: &PricingConfig) -> PriceBreakdown {
    // The server's subtotal is authoritative when present; the local sum is a
    // fallback for degraded/offline display.
    let subtotal = cart.subtotal.unwrap_or_else(|| cart.derived_subtotal());

    // Discount eligibility is server-owned; absent means zero.
    let total_discount = cart.total_discount.unwrap_or(Decimal::ZERO);

    // Clamp so a discount can never drive the subtotal negative. The clamp is
    // a display-layer safety net; the server's number stays the truth.
    if total_discount > subtotal {
        tracing::debug!(%subtotal, %total_discount, "discount exceeds subtotal, clamping");
    }
    let discounted_subtotal = (subtotal - total_discount).max(Decimal::ZERO);

    // Shipping is judged on the undiscounted subtotal: discounts cannot buy a
    // customer past the free-shipping bar.
    let shipping = if subtotal >= config.free_shipping_threshold {
        Decimal::ZERO
    } else {
        config.shipping_fee
    };

    // VAT is charged on the discounted amount.
    let vat = (discounted_subtotal * config.vat_rate)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

    PriceBreakdown {
        subtotal,
        total_discount,
        discounted_subtotal,
        shipping,
        vat,
        total: discounted_subtotal + vat + shipping,
    }
}
