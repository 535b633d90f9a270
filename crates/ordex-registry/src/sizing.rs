//! Margin-to-quantity conversion under instrument constraints.

use crate::error::{RegistryError, RegistryResult};
use crate::rules::InstrumentRule;
use ordex_core::{Price, Qty};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Share of the venue's maximum order quantity a single order may use.
/// Staying under the hard limit leaves room for the hedge leg, which must
/// mirror the full position size.
const MAX_QTY_SHARE: Decimal = dec!(0.9);

/// Result of sizing one order.
#[derive(Debug, Clone, PartialEq)]
pub struct SizingOutcome {
    pub qty: Qty,
    /// Margin actually consumed, which exceeds the requested margin when
    /// the minimum-notional fallback raised it.
    pub effective_margin: Decimal,
    pub margin_raised: bool,
    pub clamped_to_max: bool,
}

/// Turns a margin allocation into a venue-valid order quantity.
///
/// Base formula: `qty = margin * leverage / price`, floored to the
/// quantity step. If the floored quantity falls below the instrument's
/// minimum order quantity or minimum notional, the quantity is raised to
/// the smallest step-aligned value that clears both, and the effective
/// margin grows accordingly. Finally the quantity is clamped to 90% of the
/// venue's maximum order quantity; if the clamped quantity can no longer
/// clear the minimum notional, the sizing fails with the resulting
/// notional rather than handing the caller an order the venue will
/// reject.
pub struct PositionSizeCalculator;

impl PositionSizeCalculator {
    pub fn size(
        rule: &InstrumentRule,
        margin: Decimal,
        leverage: Decimal,
        price: Price,
    ) -> RegistryResult<SizingOutcome> {
        if margin <= Decimal::ZERO {
            return Err(RegistryError::Sizing(format!(
                "margin must be positive, got {margin}"
            )));
        }
        if leverage <= Decimal::ZERO {
            return Err(RegistryError::Sizing(format!(
                "leverage must be positive, got {leverage}"
            )));
        }
        if !price.is_positive() {
            return Err(RegistryError::Sizing(format!(
                "price must be positive, got {price}"
            )));
        }
        if !rule.qty_step.is_positive() {
            return Err(RegistryError::Sizing(format!(
                "instrument {} has no quantity step",
                rule.symbol
            )));
        }

        let mut qty = rule.quantize_qty(Qty::new(margin * leverage / price.inner()));
        let mut margin_raised = false;

        if qty < rule.min_order_qty || !rule.validate_notional(qty, price) {
            let floor_by_notional = rule.min_notional / price.inner();
            let target = floor_by_notional.max(rule.min_order_qty.inner());
            qty = ceil_to_step(Qty::new(target), rule.qty_step);
            margin_raised = true;
            tracing::debug!(
                symbol = %rule.symbol,
                qty = %qty,
                "quantity below instrument minimums, raised to smallest valid size"
            );
        }

        let max_allowed = rule.quantize_qty(Qty::new(rule.max_order_qty.inner() * MAX_QTY_SHARE));
        let clamped_to_max = qty > max_allowed;
        if clamped_to_max {
            qty = max_allowed;
            tracing::warn!(
                symbol = %rule.symbol,
                qty = %qty,
                "quantity clamped to maximum order size"
            );
        }

        if !qty.is_positive() {
            return Err(RegistryError::Sizing(format!(
                "sized quantity for {} is zero",
                rule.symbol
            )));
        }
        if !rule.validate_notional(qty, price) {
            // Raising to the minimum notional ran into the max-quantity
            // ceiling; the clamped order would die at the venue.
            return Err(RegistryError::Sizing(format!(
                "{}: clamped quantity {} has notional {} below the minimum {}",
                rule.symbol,
                qty,
                qty.notional(price),
                rule.min_notional
            )));
        }

        let effective_margin = qty.inner() * price.inner() / leverage;
        Ok(SizingOutcome {
            qty,
            effective_margin,
            margin_raised,
            clamped_to_max,
        })
    }
}

/// Smallest step-aligned quantity not below `qty`.
fn ceil_to_step(qty: Qty, step: Qty) -> Qty {
    let steps = (qty.inner() / step.inner()).ceil();
    Qty::new(steps * step.inner())
}
