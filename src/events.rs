//! Defines events emitted by the bond depository.

use scrypto::prelude::*;

/// Event emitted when a new market is opened.
#[derive(ScryptoSbor, ScryptoEvent, Clone)]
pub struct MarketCreatedEvent {
    pub market_id: u64,
    /// The token the market accepts as payment.
    pub quote_token: ResourceAddress,
    pub capacity: Decimal,
    pub initial_price: Decimal,
    pub conclusion: i64,
    /// Name of the payoff overlay: `none`, `call`, `digital` or `leverage`.
    pub overlay: String,
}

/// Event emitted when a market is closed by the owner or exhausted by a deposit.
#[derive(ScryptoSbor, ScryptoEvent, Clone)]
pub struct MarketClosedEvent {
    pub market_id: u64,
    /// Whether the market sold out or exceeded its max debt, as opposed to a manual close.
    pub exhausted: bool,
}

/// Event emitted on every deposit.
#[derive(ScryptoSbor, ScryptoEvent, Clone)]
pub struct BondPurchasedEvent {
    pub market_id: u64,
    pub depositor: NonFungibleLocalId,
    pub referrer: Option<NonFungibleLocalId>,
    /// Quote tokens paid.
    pub amount: Decimal,
    /// Payout tokens owed at maturity.
    pub payout: Decimal,
    pub price: Decimal,
    pub matured: i64,
    pub note_index: u64,
}

/// Event emitted when a tune recalibrated a market.
#[derive(ScryptoSbor, ScryptoEvent, Clone)]
pub struct MarketTunedEvent {
    pub market_id: u64,
    pub control_variable: Decimal,
    pub max_payout: Decimal,
    /// Downward control variable correction scheduled by the tune, if any.
    pub scheduled_change: Option<Decimal>,
}

#[derive(ScryptoSbor, ScryptoEvent, Clone)]
pub struct NoteRedeemedEvent {
    pub account: NonFungibleLocalId,
    pub market_id: u64,
    pub payout: Decimal,
    /// Option bonus paid along with the payout.
    pub bonus: Decimal,
    pub settled: bool,
}

/// Event emitted when accrued front-end or DAO rewards are withdrawn.
#[derive(ScryptoSbor, ScryptoEvent, Clone)]
pub struct RewardClaimedEvent {
    /// `None` for the DAO.
    pub account: Option<NonFungibleLocalId>,
    pub amount: Decimal,
}
