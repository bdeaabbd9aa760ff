//! # Pricing and debt decay
//!
//! A market's price is `control_variable * debt_ratio`, where the debt ratio is the outstanding
//! payout obligation over the treasury's base supply. Every sale raises the debt and so the price;
//! between sales the debt decays linearly over the market length, which lowers the price again.
//! The result is a continuous descending auction whose clearing rate is steered by the tuner.
//!
//! Everything here is a pure function of the stored market state, the current time and the
//! collaborator readings passed in by the caller. Views use the non-mutating variants, deposits
//! call [`BondMarket::decay`] first so that stored state catches up with `now`.

use crate::errors::BondError;
use crate::math::{div, mul_div, pro_rata, saturating_sub};
use crate::overlay::PayoffOverlay;
use crate::shared_structs::*;
use scrypto::prelude::*;

/// All state of one market.
#[derive(ScryptoSbor, Clone, Debug, PartialEq)]
pub struct BondMarket {
    pub market: Market,
    pub terms: Terms,
    pub metadata: MarketMetadata,
    pub adjustment: Adjustment,
    pub overlay: PayoffOverlay,
}

impl BondMarket {
    /// Sets up a new market priced at `parameters.initial_price`.
    ///
    /// The opening debt equals the target debt, i.e. the capacity expressed in payout tokens, and
    /// the control variable is chosen so that this debt quotes exactly the initial price.
    pub fn new(
        quote_token: ResourceAddress,
        parameters: &MarketParameters,
        overlay: &OverlayParameters,
        base_supply: Decimal,
        oracle_price: Option<Decimal>,
        now: i64,
    ) -> Result<Self, BondError> {
        if !parameters.capacity.is_positive()
            || !parameters.initial_price.is_positive()
            || parameters.min_price.is_negative()
            || parameters.buffer.is_negative()
            || parameters.conclusion <= now
            || parameters.deposit_interval <= 0
            || parameters.tune_interval <= 0
            || parameters.vesting < 0
            || !base_supply.is_positive()
        {
            return Err(BondError::InvalidMarketParameters);
        }
        if !parameters.fixed_term && parameters.vesting < now {
            return Err(BondError::InvalidMarketParameters);
        }

        let length = parameters.conclusion - now;
        let target_debt = if parameters.capacity_in_quote {
            div(parameters.capacity, parameters.initial_price)?
        } else {
            parameters.capacity
        };
        if !target_debt.is_positive() {
            return Err(BondError::InvalidMarketParameters);
        }

        let max_payout = pro_rata(target_debt, parameters.deposit_interval, length)?;
        let max_debt = mul_div(target_debt, Decimal::ONE + parameters.buffer, Decimal::ONE)?;
        let control_variable = mul_div(parameters.initial_price, base_supply, target_debt)?;
        let overlay =
            PayoffOverlay::from_parameters(overlay, parameters.initial_price, oracle_price, now)?;

        Ok(Self {
            market: Market {
                quote_token,
                capacity: parameters.capacity,
                initial_capacity: parameters.capacity,
                total_debt: target_debt,
                max_debt,
                max_payout,
                sold: Decimal::ZERO,
                purchased: Decimal::ZERO,
            },
            terms: Terms {
                control_variable,
                min_price: parameters.min_price,
                vesting: parameters.vesting,
                conclusion: parameters.conclusion,
                fixed_term: parameters.fixed_term,
                capacity_in_quote: parameters.capacity_in_quote,
            },
            metadata: MarketMetadata {
                last_tune: now,
                last_decay: now,
                length,
                deposit_interval: parameters.deposit_interval,
                tune_interval: parameters.tune_interval,
                tune_below_capacity: parameters.tune_below_capacity,
                last_tune_debt: target_debt,
            },
            adjustment: Adjustment::inactive(),
            overlay,
        })
    }

    /// Live markets accept deposits: capacity left and conclusion not reached.
    pub fn is_live(&self, now: i64) -> bool {
        self.market.capacity.is_positive() && now < self.terms.conclusion
    }

    /// Debt shed since the last decay, `total_debt * elapsed / length`, never more than the debt.
    pub fn debt_decay(&self, now: i64) -> Result<Decimal, BondError> {
        let decay = pro_rata(
            self.market.total_debt,
            now - self.metadata.last_decay,
            self.metadata.length,
        )?;
        Ok(if decay > self.market.total_debt {
            self.market.total_debt
        } else {
            decay
        })
    }

    pub fn current_debt(&self, now: i64) -> Result<Decimal, BondError> {
        Ok(saturating_sub(self.market.total_debt, self.debt_decay(now)?))
    }

    /// Debt-based price: `current_control_variable * current_debt / base_supply`, floored at
    /// `min_price`.
    pub fn debt_price(&self, now: i64, base_supply: Decimal) -> Result<Decimal, BondError> {
        if !base_supply.is_positive() {
            return Err(BondError::MathOverflow);
        }
        let price = mul_div(
            self.current_control_variable(now)?,
            self.current_debt(now)?,
            base_supply,
        )?;
        Ok(if price < self.terms.min_price {
            self.terms.min_price
        } else {
            price
        })
    }

    /// Price quoted at `now`. Leverage markets quote the oracle-linked price and need the oracle
    /// reading; the others price off debt.
    pub fn market_price(
        &self,
        now: i64,
        base_supply: Decimal,
        oracle_price: Option<Decimal>,
    ) -> Result<Decimal, BondError> {
        match self.overlay.leverage() {
            Some(terms) => {
                let oracle_price = oracle_price.ok_or(BondError::NotLeverageMarket)?;
                let leverage = terms.current_leverage(now, self.metadata.length)?;
                terms.linked_price(oracle_price, leverage)
            }
            None => self.debt_price(now, base_supply),
        }
    }

    /// Brings stored debt and control variable up to `now`.
    pub fn decay(&mut self, now: i64) -> Result<(), BondError> {
        let decay = self.debt_decay(now)?;
        self.market.total_debt = saturating_sub(self.market.total_debt, decay);
        self.metadata.last_decay = now;
        self.apply_adjustment(now)
    }

    /// Payout tokens bought by `value` at `price`.
    pub fn payout_for(&self, value: Decimal, price: Decimal) -> Result<Decimal, BondError> {
        if !price.is_positive() {
            return Err(BondError::MaxSizeExceeded);
        }
        let payout = mul_div(value, Decimal::ONE, price)?;
        if payout > self.market.max_payout {
            return Err(BondError::MaxSizeExceeded);
        }
        Ok(payout)
    }

    /// Books a sale of `payout` tokens for `amount` quote tokens.
    ///
    /// Returns `true` when the sale exhausted the market, either by using up its capacity or by
    /// pushing debt above `max_debt`; the capacity is zeroed in both cases.
    pub fn record_purchase(&mut self, amount: Decimal, payout: Decimal) -> Result<bool, BondError> {
        let used = if self.terms.capacity_in_quote { amount } else { payout };
        if used > self.market.capacity {
            return Err(BondError::MaxSizeExceeded);
        }

        self.market.capacity -= used;
        self.market.purchased += amount;
        self.market.sold += payout;
        self.market.total_debt += payout;

        if self.market.total_debt > self.market.max_debt {
            self.market.capacity = Decimal::ZERO;
        }
        Ok(self.market.capacity.is_zero())
    }

    /// Maturity of a note issued at `now`.
    pub fn maturity(&self, now: i64) -> i64 {
        if self.terms.fixed_term {
            now + self.terms.vesting
        } else {
            self.terms.vesting
        }
    }

    pub fn close(&mut self) {
        self.market.capacity = Decimal::ZERO;
    }
}
