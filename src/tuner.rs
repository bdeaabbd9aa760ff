//! # Control variable tuning
//!
//! Once per tune interval the control variable is recalibrated so that the remaining capacity
//! would sell out evenly over the remaining time at the current price. Increases take effect at
//! once. Decreases are scheduled as an [`Adjustment`] and bleed in linearly over the next tune
//! interval, so a burst of inactivity cannot drop the price in a single step.

use crate::errors::BondError;
use crate::math::{div, mul_div, pro_rata, saturating_sub};
use crate::pricing::BondMarket;
use crate::shared_structs::Adjustment;
use scrypto::prelude::*;

/// What a tune changed, reported back to the blueprint for logging and events.
#[derive(Clone, Debug, PartialEq)]
pub struct TuneOutcome {
    pub control_variable: Decimal,
    pub max_payout: Decimal,
    pub target_debt: Decimal,
    /// Size of the downward correction scheduled by this tune, if any.
    pub scheduled_change: Option<Decimal>,
}

impl BondMarket {
    /// Portion of the pending adjustment due at `now`.
    ///
    /// Returns the amount to subtract from the control variable, the seconds elapsed since the
    /// last application, and whether part of the adjustment is still outstanding afterwards.
    pub fn control_decay(&self, now: i64) -> Result<(Decimal, i64, bool), BondError> {
        let adjustment = &self.adjustment;
        if !adjustment.active {
            return Ok((Decimal::ZERO, 0, false));
        }

        let seconds_since = now - adjustment.last_adjustment;
        if seconds_since >= adjustment.time_to_adjusted {
            return Ok((adjustment.change, seconds_since, false));
        }
        let decay = pro_rata(adjustment.change, seconds_since, adjustment.time_to_adjusted)?;
        Ok((decay, seconds_since, true))
    }

    pub fn current_control_variable(&self, now: i64) -> Result<Decimal, BondError> {
        let (decay, _, _) = self.control_decay(now)?;
        Ok(saturating_sub(self.terms.control_variable, decay))
    }

    /// Applies the due part of the pending adjustment to the stored control variable.
    pub(crate) fn apply_adjustment(&mut self, now: i64) -> Result<(), BondError> {
        if !self.adjustment.active {
            return Ok(());
        }

        let (decay, seconds_since, still_active) = self.control_decay(now)?;
        self.terms.control_variable = saturating_sub(self.terms.control_variable, decay);

        if still_active {
            self.adjustment.change = saturating_sub(self.adjustment.change, decay);
            self.adjustment.time_to_adjusted -= seconds_since;
            self.adjustment.last_adjustment = now;
        } else {
            self.adjustment.active = false;
        }
        Ok(())
    }

    /// Whether more capacity is left than a linear sell-off would leave at `now`.
    pub fn behind_schedule(&self, now: i64) -> Result<bool, BondError> {
        let time_remaining = self.terms.conclusion - now;
        let expected =
            pro_rata(self.market.initial_capacity, time_remaining, self.metadata.length)?;
        Ok(self.market.capacity > expected)
    }

    /// Recalibrates the market at `price` if a tune interval has passed since the last tune.
    ///
    /// `max_payout` and the target debt are always refreshed. The control variable is only touched
    /// when `adjust_control_variable` is set; oracle-linked markets leave it alone.
    pub fn tune(
        &mut self,
        now: i64,
        price: Decimal,
        base_supply: Decimal,
        adjust_control_variable: bool,
    ) -> Result<Option<TuneOutcome>, BondError> {
        if now < self.metadata.last_tune + self.metadata.tune_interval {
            return Ok(None);
        }
        let time_remaining = self.terms.conclusion - now;
        if time_remaining <= 0 || !price.is_positive() {
            return Ok(None);
        }

        let capacity = if self.terms.capacity_in_quote {
            div(self.market.capacity, price)?
        } else {
            self.market.capacity
        };
        let time_remaining = Decimal::from(time_remaining);

        self.market.max_payout = mul_div(
            capacity,
            Decimal::from(self.metadata.deposit_interval),
            time_remaining,
        )?;
        let target_debt = mul_div(capacity, Decimal::from(self.metadata.length), time_remaining)?;
        self.metadata.last_tune_debt = target_debt;

        let mut scheduled_change = None;
        if adjust_control_variable && target_debt.is_positive() {
            let new_control_variable = mul_div(price, base_supply, target_debt)?;
            let control_variable = self.terms.control_variable;

            if new_control_variable >= control_variable {
                self.terms.control_variable = new_control_variable;
                self.adjustment = Adjustment::inactive();
            } else if self.metadata.tune_below_capacity || self.behind_schedule(now)? {
                let change = control_variable - new_control_variable;
                self.adjustment = Adjustment {
                    change,
                    last_adjustment: now,
                    time_to_adjusted: self.metadata.tune_interval,
                    active: true,
                };
                scheduled_change = Some(change);
            }
        }

        self.metadata.last_tune = now;

        Ok(Some(TuneOutcome {
            control_variable: self.terms.control_variable,
            max_payout: self.market.max_payout,
            target_debt,
            scheduled_change,
        }))
    }
}
