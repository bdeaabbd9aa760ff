//! # Bond depository shared structs
//! Market and note records owned by the depository, plus the parameter structs used to create
//! markets. Views on the depository return these types directly.

use scrypto::prelude::*;

/// Running state of a bond market.
#[derive(ScryptoSbor, Clone, Debug, PartialEq)]
pub struct Market {
    /// The token accepted as payment.
    pub quote_token: ResourceAddress,
    /// Remaining sellable amount, in quote units if `Terms::capacity_in_quote`, else in payout units.
    pub capacity: Decimal,
    /// Capacity at creation, same unit as `capacity`. Used to judge the market against its schedule.
    pub initial_capacity: Decimal,
    /// Outstanding payout obligation. Decays linearly over the market length.
    pub total_debt: Decimal,
    /// Debt level above which the market shuts itself down.
    pub max_debt: Decimal,
    /// Largest payout a single deposit may receive.
    pub max_payout: Decimal,
    /// Total payout tokens sold.
    pub sold: Decimal,
    /// Total quote tokens received.
    pub purchased: Decimal,
}

#[derive(ScryptoSbor, Clone, Debug, PartialEq)]
pub struct Terms {
    /// Scale converting the debt ratio into a price.
    pub control_variable: Decimal,
    /// Lowest price the debt-based pricing may quote.
    pub min_price: Decimal,
    /// Vesting length in seconds, or the absolute maturity timestamp when `fixed_term` is false.
    pub vesting: i64,
    /// Timestamp after which no deposits are accepted.
    pub conclusion: i64,
    pub fixed_term: bool,
    pub capacity_in_quote: bool,
}

#[derive(ScryptoSbor, Clone, Debug, PartialEq)]
pub struct MarketMetadata {
    pub last_tune: i64,
    pub last_decay: i64,
    /// Seconds between creation and conclusion.
    pub length: i64,
    /// Target interval between deposits of `max_payout` size.
    pub deposit_interval: i64,
    /// Minimum interval between control variable recalibrations.
    pub tune_interval: i64,
    /// Allows downward control variable corrections while the market is ahead of schedule.
    pub tune_below_capacity: bool,
    /// Target debt computed at the last tune.
    pub last_tune_debt: Decimal,
}

/// A scheduled, gradually applied decrease of the control variable.
#[derive(ScryptoSbor, Clone, Debug, PartialEq)]
pub struct Adjustment {
    /// Amount of control variable still to be removed.
    pub change: Decimal,
    pub last_adjustment: i64,
    /// Seconds left until `change` is fully applied.
    pub time_to_adjusted: i64,
    pub active: bool,
}

impl Adjustment {
    pub fn inactive() -> Self {
        Self {
            change: Decimal::ZERO,
            last_adjustment: 0,
            time_to_adjusted: 0,
            active: false,
        }
    }
}

/// Parameters for `create_market`.
#[derive(ScryptoSbor, Clone, Debug)]
pub struct MarketParameters {
    /// Amount on sale, in quote units if `capacity_in_quote`, else in payout units.
    pub capacity: Decimal,
    /// Starting price, in quote value per payout token.
    pub initial_price: Decimal,
    /// Floor for the debt-based price.
    pub min_price: Decimal,
    /// Allowed overshoot of debt above its target before the market closes, as a fraction (2 = 200%).
    pub buffer: Decimal,
    pub capacity_in_quote: bool,
    pub fixed_term: bool,
    pub tune_below_capacity: bool,
    pub vesting: i64,
    pub conclusion: i64,
    pub deposit_interval: i64,
    pub tune_interval: i64,
}

/// Option overlay requested at market creation.
///
/// Strikes are relative: a strike of `0.05` means the oracle must close 5% above the price it
/// showed when the note was issued.
#[derive(ScryptoSbor, Clone, Debug)]
pub enum OverlayParameters {
    None,
    Call {
        oracle: ComponentAddress,
        strike: Decimal,
        /// Maximum bonus as a fraction of the notional.
        cap: Decimal,
        exercise_duration: i64,
    },
    Digital {
        oracle: ComponentAddress,
        strike: Decimal,
        payoff_percentage: Decimal,
        exercise_duration: i64,
    },
    Leverage {
        oracle: ComponentAddress,
        floor: Decimal,
        strike: Decimal,
        payoff_percentage: Decimal,
        initial_leverage: Decimal,
        target_leverage: Decimal,
        exercise_duration: i64,
    },
}

/// A pending vesting payout of a bond account.
#[derive(ScryptoSbor, Clone, Debug, PartialEq)]
pub struct Note {
    /// Reward tokens released at maturity.
    pub payout: Decimal,
    pub created: i64,
    pub matured: i64,
    pub market_id: u64,
    /// Whether `payout` has been released. An optioned note can outlive this until it is exercised
    /// or its exercise window closes.
    pub redeemed: bool,
    /// Notional the option bonus is paid on. For leverage markets this is the deposit value
    /// divided by the linked price at issuance.
    pub base_notional: Decimal,
    pub leverage_at_issuance: Option<Decimal>,
    pub option: Option<NoteOption>,
}

/// Option terms attached to a note at issuance.
#[derive(ScryptoSbor, Clone, Debug, PartialEq)]
pub struct NoteOption {
    pub kind: OptionKind,
    /// Oracle price observed at issuance.
    pub reference_price: Decimal,
    /// Absolute oracle price the option pays above.
    pub strike_price: Decimal,
    pub exercise_deadline: i64,
    pub exercised: bool,
}

#[derive(ScryptoSbor, Clone, Debug, PartialEq)]
pub enum OptionKind {
    /// Pays `min(cap, (price - strike) / strike)` of the notional.
    Call { cap: Decimal },
    /// Pays a fixed share of the notional once the strike is crossed.
    Digital { payoff_percentage: Decimal },
}

/// Data of the bond account badge. Its local id identifies the holder's notes and rewards.
#[derive(ScryptoSbor, NonFungibleData)]
pub struct BondAccount {
    /// Seconds since the unix epoch at which the account was opened.
    pub opened_at: i64,
}

