//! # Payoff overlays
//!
//! A market is either plain or carries one overlay referencing an external price oracle:
//! - `Call`: a capped call on the oracle price, paid as a bonus on the note's notional.
//! - `Digital`: a fixed bonus once the oracle closes above the strike.
//! - `Leverage`: the bond price itself follows the oracle with a leverage that ratchets from an
//!   initial toward a target value. Notes also carry a digital payoff.
//!
//! Options are struck relative to the oracle price at issuance and can be exercised from maturity
//! until `maturity + exercise_duration`. After that window the bonus is gone for good.

use crate::errors::BondError;
use crate::math::{mul_div, pro_rata};
use crate::shared_structs::*;
use scrypto::prelude::*;

#[derive(ScryptoSbor, Clone, Debug, PartialEq)]
pub enum PayoffOverlay {
    None,
    Call {
        oracle: ComponentAddress,
        strike: Decimal,
        cap: Decimal,
        exercise_duration: i64,
    },
    Digital {
        oracle: ComponentAddress,
        strike: Decimal,
        payoff_percentage: Decimal,
        exercise_duration: i64,
    },
    Leverage(LeverageTerms),
}

/// State of a leverage-linked market.
#[derive(ScryptoSbor, Clone, Debug, PartialEq)]
pub struct LeverageTerms {
    pub oracle: ComponentAddress,
    /// The linked price never quotes below this.
    pub floor: Decimal,
    pub strike: Decimal,
    pub payoff_percentage: Decimal,
    pub exercise_duration: i64,
    pub initial_leverage: Decimal,
    pub target_leverage: Decimal,
    /// Leverage as of `last_leverage_update`.
    pub current_leverage: Decimal,
    pub last_leverage_update: i64,
    /// Oracle price at the last checkpoint.
    pub reference_price: Decimal,
    /// Bond price at the last checkpoint.
    pub last_reference_bond_price: Decimal,
}

impl PayoffOverlay {
    /// Builds the overlay for a new market.
    ///
    /// `oracle_price` is the oracle reading at creation and is only consulted for leverage
    /// markets, whose first checkpoint pins the initial price to it.
    pub fn from_parameters(
        parameters: &OverlayParameters,
        initial_price: Decimal,
        oracle_price: Option<Decimal>,
        now: i64,
    ) -> Result<Self, BondError> {
        let overlay = match parameters.clone() {
            OverlayParameters::None => PayoffOverlay::None,
            OverlayParameters::Call {
                oracle,
                strike,
                cap,
                exercise_duration,
            } => {
                if strike.is_negative() || !cap.is_positive() || exercise_duration <= 0 {
                    return Err(BondError::InvalidMarketParameters);
                }
                PayoffOverlay::Call {
                    oracle,
                    strike,
                    cap,
                    exercise_duration,
                }
            }
            OverlayParameters::Digital {
                oracle,
                strike,
                payoff_percentage,
                exercise_duration,
            } => {
                if strike.is_negative()
                    || !payoff_percentage.is_positive()
                    || exercise_duration <= 0
                {
                    return Err(BondError::InvalidMarketParameters);
                }
                PayoffOverlay::Digital {
                    oracle,
                    strike,
                    payoff_percentage,
                    exercise_duration,
                }
            }
            OverlayParameters::Leverage {
                oracle,
                floor,
                strike,
                payoff_percentage,
                initial_leverage,
                target_leverage,
                exercise_duration,
            } => {
                let reference_price = oracle_price.ok_or(BondError::InvalidMarketParameters)?;
                if !floor.is_positive()
                    || strike.is_negative()
                    || payoff_percentage.is_negative()
                    || !initial_leverage.is_positive()
                    || !target_leverage.is_positive()
                    || !reference_price.is_positive()
                    || exercise_duration <= 0
                {
                    return Err(BondError::InvalidMarketParameters);
                }
                PayoffOverlay::Leverage(LeverageTerms {
                    oracle,
                    floor,
                    strike,
                    payoff_percentage,
                    exercise_duration,
                    initial_leverage,
                    target_leverage,
                    current_leverage: initial_leverage,
                    last_leverage_update: now,
                    reference_price,
                    last_reference_bond_price: initial_price,
                })
            }
        };
        Ok(overlay)
    }

    pub fn oracle(&self) -> Option<ComponentAddress> {
        match self {
            PayoffOverlay::None => None,
            PayoffOverlay::Call { oracle, .. } | PayoffOverlay::Digital { oracle, .. } => {
                Some(*oracle)
            }
            PayoffOverlay::Leverage(terms) => Some(terms.oracle),
        }
    }

    pub fn leverage(&self) -> Option<&LeverageTerms> {
        match self {
            PayoffOverlay::Leverage(terms) => Some(terms),
            _ => None,
        }
    }

    pub fn leverage_mut(&mut self) -> Option<&mut LeverageTerms> {
        match self {
            PayoffOverlay::Leverage(terms) => Some(terms),
            _ => None,
        }
    }

    /// Option terms for a note issued now at oracle price `reference_price`, maturing at `matured`.
    pub fn option_for_note(
        &self,
        reference_price: Option<Decimal>,
        matured: i64,
    ) -> Result<Option<NoteOption>, BondError> {
        let (kind, strike, exercise_duration) = match self {
            PayoffOverlay::None => return Ok(None),
            PayoffOverlay::Call {
                strike,
                cap,
                exercise_duration,
                ..
            } => (OptionKind::Call { cap: *cap }, *strike, *exercise_duration),
            PayoffOverlay::Digital {
                strike,
                payoff_percentage,
                exercise_duration,
                ..
            } => (
                OptionKind::Digital {
                    payoff_percentage: *payoff_percentage,
                },
                *strike,
                *exercise_duration,
            ),
            PayoffOverlay::Leverage(terms) => {
                if terms.payoff_percentage.is_zero() {
                    return Ok(None);
                }
                (
                    OptionKind::Digital {
                        payoff_percentage: terms.payoff_percentage,
                    },
                    terms.strike,
                    terms.exercise_duration,
                )
            }
        };

        let reference_price = reference_price.ok_or(BondError::InvalidMarketParameters)?;
        let strike_price = mul_div(reference_price, Decimal::ONE + strike, Decimal::ONE)?;

        Ok(Some(NoteOption {
            kind,
            reference_price,
            strike_price,
            exercise_deadline: matured + exercise_duration,
            exercised: false,
        }))
    }
}

impl LeverageTerms {
    /// Leverage accrued since the last recorded update, moving linearly from the initial toward
    /// the target leverage over the market length and stopping at the target.
    pub fn current_leverage_increment(&self, now: i64, length: i64) -> Result<Decimal, BondError> {
        let span = self.target_leverage - self.initial_leverage;
        let remaining = self.target_leverage - self.current_leverage;
        if span.is_zero() || remaining.is_zero() {
            return Ok(Decimal::ZERO);
        }

        let step = pro_rata(
            span.checked_abs().ok_or(BondError::MathOverflow)?,
            now - self.last_leverage_update,
            length,
        )?;
        let remaining_abs = remaining.checked_abs().ok_or(BondError::MathOverflow)?;
        let step = if step > remaining_abs { remaining_abs } else { step };

        Ok(if span.is_negative() { -step } else { step })
    }

    pub fn current_leverage(&self, now: i64, length: i64) -> Result<Decimal, BondError> {
        Ok(self.current_leverage + self.current_leverage_increment(now, length)?)
    }

    /// Ratchets the stored leverage up to `now`.
    pub fn record_leverage(&mut self, now: i64, length: i64) -> Result<Decimal, BondError> {
        self.current_leverage = self.current_leverage(now, length)?;
        self.last_leverage_update = now;
        Ok(self.current_leverage)
    }

    /// `max(floor, (1 + leverage * (oracle - reference) / reference) * last_reference_bond_price)`
    pub fn linked_price(
        &self,
        oracle_price: Decimal,
        leverage: Decimal,
    ) -> Result<Decimal, BondError> {
        let relative_move = mul_div(
            oracle_price - self.reference_price,
            Decimal::ONE,
            self.reference_price,
        )?;
        let factor = Decimal::ONE
            + relative_move
                .checked_mul(leverage)
                .ok_or(BondError::MathOverflow)?;
        if !factor.is_positive() {
            return Ok(self.floor);
        }

        let price = mul_div(factor, self.last_reference_bond_price, Decimal::ONE)?;
        Ok(if price < self.floor { self.floor } else { price })
    }

    /// Starts a new pricing segment at the current oracle and bond price.
    pub fn resample(&mut self, oracle_price: Decimal, bond_price: Decimal) {
        self.reference_price = oracle_price;
        self.last_reference_bond_price = bond_price;
    }
}

/// Bonus the note's option pays at `now` given the oracle price.
///
/// Zero before maturity, once exercised, after the exercise window, or at or below the strike.
pub fn option_payout(note: &Note, oracle_price: Decimal, now: i64) -> Result<Decimal, BondError> {
    let option = match &note.option {
        Some(option) => option,
        None => return Ok(Decimal::ZERO),
    };
    if option.exercised || now < note.matured || now > option.exercise_deadline {
        return Ok(Decimal::ZERO);
    }
    if oracle_price <= option.strike_price || !option.strike_price.is_positive() {
        return Ok(Decimal::ZERO);
    }

    match option.kind {
        OptionKind::Call { cap } => {
            let moneyness = mul_div(
                oracle_price - option.strike_price,
                Decimal::ONE,
                option.strike_price,
            )?;
            let rate = if moneyness > cap { cap } else { moneyness };
            mul_div(note.base_notional, rate, Decimal::ONE)
        }
        OptionKind::Digital { payoff_percentage } => {
            mul_div(note.base_notional, payoff_percentage, Decimal::ONE)
        }
    }
}

/// Whether the option of the note can still pay out at some point after `now`.
pub fn option_open(note: &Note, now: i64) -> bool {
    match &note.option {
        Some(option) => !option.exercised && now <= option.exercise_deadline,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oracle() -> ComponentAddress {
        ComponentAddress::new_or_panic([EntityType::GlobalGenericComponent as u8; NodeId::LENGTH])
    }

    fn note_with(kind: OptionKind) -> Note {
        Note {
            payout: dec!(25),
            created: 0,
            matured: 100,
            market_id: 0,
            redeemed: false,
            base_notional: dec!(25),
            leverage_at_issuance: None,
            option: Some(NoteOption {
                kind,
                reference_price: dec!(1),
                strike_price: dec!("1.05"),
                exercise_deadline: 100 + 86400,
                exercised: false,
            }),
        }
    }

    fn leverage_terms() -> LeverageTerms {
        LeverageTerms {
            oracle: oracle(),
            floor: dec!(200),
            strike: dec!("0.05"),
            payoff_percentage: dec!("0.05"),
            exercise_duration: 86400,
            initial_leverage: dec!(1),
            target_leverage: dec!(5),
            current_leverage: dec!(1),
            last_leverage_update: 0,
            reference_price: dec!(1),
            last_reference_bond_price: dec!(400),
        }
    }

    #[test]
    fn strike_is_relative_to_issuance_price() {
        let overlay = PayoffOverlay::from_parameters(
            &OverlayParameters::Digital {
                oracle: oracle(),
                strike: dec!("0.05"),
                payoff_percentage: dec!("0.1"),
                exercise_duration: 86400,
            },
            dec!(400),
            None,
            0,
        )
        .unwrap();

        let option = overlay.option_for_note(Some(dec!(2)), 100).unwrap().unwrap();
        assert_eq!(option.strike_price, dec!("2.1"));
        assert_eq!(option.exercise_deadline, 86500);
    }

    #[test]
    fn call_bonus_grows_with_price_and_is_capped() {
        let note = note_with(OptionKind::Call { cap: dec!("0.2") });

        let below = option_payout(&note, dec!("1.05"), 200).unwrap();
        let low = option_payout(&note, dec!("1.1"), 200).unwrap();
        let high = option_payout(&note, dec!("1.2"), 200).unwrap();
        let capped = option_payout(&note, dec!(10), 200).unwrap();

        assert_eq!(below, Decimal::ZERO);
        assert!(low > Decimal::ZERO);
        assert!(high > low);
        assert_eq!(capped, dec!(5));
    }

    #[test]
    fn option_pays_nothing_outside_the_exercise_window() {
        let note = note_with(OptionKind::Digital { payoff_percentage: dec!("0.1") });

        assert_eq!(option_payout(&note, dec!("1.09"), 99).unwrap(), Decimal::ZERO);
        assert_eq!(option_payout(&note, dec!("1.09"), 100).unwrap(), dec!("2.5"));
        assert_eq!(option_payout(&note, dec!("1.09"), 100 + 86401).unwrap(), Decimal::ZERO);
        assert!(!option_open(&note, 100 + 86401));
    }

    #[test]
    fn exercised_option_pays_once() {
        let mut note = note_with(OptionKind::Digital { payoff_percentage: dec!("0.1") });
        note.option.as_mut().unwrap().exercised = true;
        assert_eq!(option_payout(&note, dec!(2), 200).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn leverage_ratchets_toward_target() {
        let mut terms = leverage_terms();
        let length = 86400;

        assert_eq!(terms.current_leverage(0, length).unwrap(), dec!(1));
        assert_eq!(terms.current_leverage(21600, length).unwrap(), dec!(2));
        assert_eq!(terms.record_leverage(43200, length).unwrap(), dec!(3));
        assert_eq!(terms.current_leverage_increment(64800, length).unwrap(), dec!(1));
        assert_eq!(terms.current_leverage(10 * length, length).unwrap(), dec!(5));
    }

    #[test]
    fn linked_price_follows_oracle_and_respects_floor() {
        let terms = leverage_terms();

        assert_eq!(terms.linked_price(dec!(1), dec!(2)).unwrap(), dec!(400));
        assert_eq!(terms.linked_price(dec!("1.1"), dec!(2)).unwrap(), dec!(480));
        assert_eq!(terms.linked_price(dec!("0.9"), dec!(2)).unwrap(), dec!(320));
        assert_eq!(terms.linked_price(dec!("0.005"), dec!(1)).unwrap(), dec!(200));
        assert_eq!(terms.linked_price(dec!("0.5"), dec!(5)).unwrap(), dec!(200));
    }

    #[test]
    fn leverage_requires_oracle_reading() {
        let result = PayoffOverlay::from_parameters(
            &OverlayParameters::Leverage {
                oracle: oracle(),
                floor: dec!(200),
                strike: dec!("0.05"),
                payoff_percentage: dec!("0.05"),
                initial_leverage: dec!(1),
                target_leverage: dec!(5),
                exercise_duration: 86400,
            },
            dec!(400),
            None,
            0,
        );
        assert_eq!(result, Err(BondError::InvalidMarketParameters));
    }
}
