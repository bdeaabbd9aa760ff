//! # The Bond Depository Blueprint
//!
//! Sells a payout token for quote tokens through descending-price bond markets. Each sale issues a
//! note that vests into the payout token; markets may add an option bonus on top of the payout or
//! link their price to an external oracle with a ratcheting leverage.
//!
//! ## Overview
//! - **Markets:** The owner opens markets with `create_market`. Prices rise with outstanding debt
//!   and fall as that debt decays; the control variable is recalibrated every tune interval so the
//!   remaining capacity sells out over the remaining time.
//! - **Bond accounts:** Anyone can open a bond account with `open_bond_account`. The badge it
//!   returns identifies the holder's notes and referral rewards.
//! - **Deposits:** `deposit` buys bonds for a bond account. The quote tokens stay in the component
//!   until the owner withdraws them.
//! - **Redemption:** Matured notes are redeemed with a proof of the bond account badge. Payouts and
//!   option bonuses come out of the payout vault, which the owner funds with `fund_payouts`.
//!
//! ## Collaborators
//! - **Treasury:** values quote tokens (`asset_value`) and reports the payout token supply
//!   (`base_supply`) the debt ratio is measured against.
//! - **Oracles:** markets with an overlay read `latest_price` from their oracle component.

use crate::errors::{BondError, OrAbort};
use crate::events::*;
use crate::math::mul;
use crate::notes;
use crate::overlay::{option_payout, LeverageTerms, PayoffOverlay};
use crate::pricing::BondMarket;
use crate::shared_structs::*;
use scrypto::prelude::*;
use scrypto_avltree::AvlTree;

#[blueprint]
#[types(u64, BondMarket, NonFungibleLocalId, Vec<Note>, Decimal, bool, BondAccount)]
#[events(
    MarketCreatedEvent,
    MarketClosedEvent,
    BondPurchasedEvent,
    MarketTunedEvent,
    NoteRedeemedEvent,
    RewardClaimedEvent,
)]
mod depository {
    enable_method_auth! {
        methods {
            create_market => restrict_to: [OWNER];
            close => restrict_to: [OWNER];
            set_rewards => restrict_to: [OWNER];
            whitelist => restrict_to: [OWNER];
            fund_payouts => restrict_to: [OWNER];
            withdraw_quote => restrict_to: [OWNER];
            claim_dao_reward => restrict_to: [OWNER];
            open_bond_account => PUBLIC;
            deposit => PUBLIC;
            redeem => PUBLIC;
            redeem_all => PUBLIC;
            get_reward => PUBLIC;
            markets => PUBLIC;
            terms => PUBLIC;
            metadata => PUBLIC;
            adjustments => PUBLIC;
            is_live => PUBLIC;
            live_markets => PUBLIC;
            live_markets_for => PUBLIC;
            indexes_for => PUBLIC;
            market_price => PUBLIC;
            payout_for => PUBLIC;
            user_terms => PUBLIC;
            pending_rewards => PUBLIC;
            option_payout_for => PUBLIC;
            current_leverage => PUBLIC;
            current_leverage_increment => PUBLIC;
            leverage_terms => PUBLIC;
        }
    }
    struct BondDepository {
        /// All markets ever created, keyed by their sequential id.
        markets: KeyValueStore<u64, BondMarket>,
        /// Ids of live markets, mapped to their quote token.
        live: AvlTree<u64, ResourceAddress>,
        market_counter: u64,
        /// Notes per bond account. An entry exists for every account ever opened.
        notes: KeyValueStore<NonFungibleLocalId, Vec<Note>>,
        /// Collected quote tokens, one vault per quote token.
        quote_vaults: KeyValueStore<ResourceAddress, Vault>,
        /// Reward tokens backing payouts, option bonuses and rewards.
        payout_vault: FungibleVault,
        bond_account_manager: ResourceManager,
        account_counter: u64,
        /// Accrued, unclaimed front-end rewards per referrer account.
        referrer_rewards: KeyValueStore<NonFungibleLocalId, Decimal>,
        /// Referrer accounts eligible for front-end rewards.
        whitelisted: KeyValueStore<NonFungibleLocalId, bool>,
        /// Accrued, unclaimed DAO rewards.
        dao_rewards: Decimal,
        /// Share of each payout credited to a whitelisted referrer.
        ref_rate: Decimal,
        /// Share of each payout credited to the DAO.
        dao_rate: Decimal,
        treasury: Global<AnyComponent>,
    }

    impl BondDepository {
        /// Instantiates the depository and the bond account badge resource.
        ///
        /// # Arguments
        /// * `owner_badge`: Badge required for all owner methods.
        /// * `reward_token`: The payout token sold by the markets.
        /// * `treasury`: Component exposing `asset_value(ResourceAddress, Decimal) -> Decimal` and
        ///   `base_supply() -> Decimal`.
        /// * `dapp_def_address`: DApp definition linked in the metadata.
        ///
        /// # Returns
        /// The global depository and the resource address of the bond account badge.
        pub fn instantiate(
            owner_badge: ResourceAddress,
            reward_token: ResourceAddress,
            treasury: ComponentAddress,
            dapp_def_address: GlobalAddress,
        ) -> (Global<BondDepository>, ResourceAddress) {
            let (address_reservation, component_address) =
                Runtime::allocate_component_address(BondDepository::blueprint_id());

            let bond_account_manager: ResourceManager =
                ResourceBuilder::new_integer_non_fungible_with_registered_type::<BondAccount>(
                    OwnerRole::Fixed(rule!(require(owner_badge))),
                )
                .metadata(metadata!(
                    init {
                        "name" => "Bond Account", locked;
                        "symbol" => "BOND", locked;
                        "description" => "Holds your bond notes and referral rewards.", locked;
                        "dapp_definitions" => vec![dapp_def_address], updatable;
                    }
                ))
                .mint_roles(mint_roles!(
                    minter => rule!(require(global_caller(component_address)));
                    minter_updater => rule!(deny_all);
                ))
                .create_with_no_initial_supply()
                .into();

            let depository = Self {
                markets: KeyValueStore::new_with_registered_type(),
                live: AvlTree::new(),
                market_counter: 0,
                notes: KeyValueStore::new_with_registered_type(),
                quote_vaults: KeyValueStore::new(),
                payout_vault: FungibleVault::new(reward_token),
                bond_account_manager,
                account_counter: 0,
                referrer_rewards: KeyValueStore::new_with_registered_type(),
                whitelisted: KeyValueStore::new_with_registered_type(),
                dao_rewards: Decimal::ZERO,
                ref_rate: Decimal::ZERO,
                dao_rate: Decimal::ZERO,
                treasury: Global::<AnyComponent>::from(treasury),
            }
            .instantiate()
            .prepare_to_globalize(OwnerRole::Fixed(rule!(require(owner_badge))))
            .with_address(address_reservation)
            .metadata(metadata! {
                init {
                    "name" => "Bond Depository".to_string(), updatable;
                    "description" => "Sells the protocol token through descending-price bond markets.".to_string(), updatable;
                    "dapp_definition" => dapp_def_address, updatable;
                }
            })
            .globalize();

            (depository, bond_account_manager.address())
        }

        /// Opens a new market selling the payout token for `quote_token`.
        ///
        /// # Returns
        /// The id of the new market. Ids are sequential starting at 0.
        pub fn create_market(
            &mut self,
            quote_token: ResourceAddress,
            parameters: MarketParameters,
            overlay: OverlayParameters,
        ) -> u64 {
            let now = Self::now();
            let oracle_price = match &overlay {
                OverlayParameters::Leverage { oracle, .. } => Some(Self::read_oracle(*oracle)),
                _ => None,
            };

            let market = BondMarket::new(
                quote_token,
                &parameters,
                &overlay,
                self.base_supply(),
                oracle_price,
                now,
            )
            .or_abort();

            let market_id = self.market_counter;
            self.market_counter += 1;

            let overlay_name = match market.overlay {
                PayoffOverlay::None => "none",
                PayoffOverlay::Call { .. } => "call",
                PayoffOverlay::Digital { .. } => "digital",
                PayoffOverlay::Leverage(_) => "leverage",
            };

            self.markets.insert(market_id, market);
            self.live.insert(market_id, quote_token);
            if self.quote_vaults.get(&quote_token).is_none() {
                self.quote_vaults.insert(quote_token, Vault::new(quote_token));
            }

            Runtime::emit_event(MarketCreatedEvent {
                market_id,
                quote_token,
                capacity: parameters.capacity,
                initial_price: parameters.initial_price,
                conclusion: parameters.conclusion,
                overlay: overlay_name.to_string(),
            });

            market_id
        }

        /// Closes a market immediately. Closing an already closed market changes nothing.
        pub fn close(&mut self, market_id: u64) {
            let mut market = self.market(market_id);
            let was_live = market.market.capacity.is_positive();
            self.live.remove(&market_id);
            market.close();
            self.markets.insert(market_id, market);

            if was_live {
                Runtime::emit_event(MarketClosedEvent {
                    market_id,
                    exhausted: false,
                });
            }
        }

        /// Sets the front-end (`ref_rate`) and DAO (`dao_rate`) reward shares of each payout.
        pub fn set_rewards(&mut self, ref_rate: Decimal, dao_rate: Decimal) {
            assert!(
                !ref_rate.is_negative()
                    && !dao_rate.is_negative()
                    && ref_rate + dao_rate <= Decimal::ONE,
                "{}",
                BondError::InvalidRewardRates
            );
            self.ref_rate = ref_rate;
            self.dao_rate = dao_rate;
        }

        /// Makes a bond account eligible for front-end rewards.
        pub fn whitelist(&mut self, referrer: NonFungibleLocalId) {
            self.whitelisted.insert(referrer, true);
        }

        /// Adds reward tokens to the payout vault.
        pub fn fund_payouts(&mut self, payout_tokens: Bucket) {
            self.payout_vault.put(payout_tokens.as_fungible());
        }

        /// Withdraws all collected `quote_token`.
        pub fn withdraw_quote(&mut self, quote_token: ResourceAddress) -> Bucket {
            self.quote_vaults
                .get_mut(&quote_token)
                .ok_or(BondError::WrongQuoteToken)
                .or_abort()
                .take_all()
        }

        pub fn claim_dao_reward(&mut self) -> Bucket {
            let amount = self.dao_rewards;
            self.dao_rewards = Decimal::ZERO;

            Runtime::emit_event(RewardClaimedEvent {
                account: None,
                amount,
            });

            self.payout_vault.take(amount).into()
        }

        /// Mints a new bond account badge.
        pub fn open_bond_account(&mut self) -> Bucket {
            self.account_counter += 1;
            let account_id = NonFungibleLocalId::integer(self.account_counter);

            self.notes.insert(account_id.clone(), Vec::new());
            self.bond_account_manager.mint_non_fungible(
                &account_id,
                BondAccount {
                    opened_at: Self::now(),
                },
            )
        }

        /// Buys bonds from `market_id` for the bond account `depositor`.
        ///
        /// # Arguments
        /// * `payment`: Quote tokens to spend.
        /// * `max_price`: The deposit fails if the market price is above this.
        /// * `depositor`: Bond account credited with the note.
        /// * `referrer`: Bond account credited with the front-end reward if whitelisted.
        ///
        /// # Returns
        /// The payout, the maturity timestamp and the index of the new note.
        pub fn deposit(
            &mut self,
            market_id: u64,
            payment: Bucket,
            max_price: Decimal,
            depositor: NonFungibleLocalId,
            referrer: Option<NonFungibleLocalId>,
        ) -> (Decimal, i64, u64) {
            let now = Self::now();
            let mut market = self.market(market_id);

            if !market.is_live(now) {
                panic!("{}", BondError::MarketConcluded);
            }
            let quote_token = market.market.quote_token;
            if payment.resource_address() != quote_token {
                panic!("{}", BondError::WrongQuoteToken);
            }
            let mut account_notes = self
                .notes
                .get(&depositor)
                .map(|notes| notes.clone())
                .ok_or(BondError::UnknownAccount)
                .or_abort();

            market.decay(now).or_abort();
            let oracle_price = market.overlay.oracle().map(Self::read_oracle);
            let base_supply = self.base_supply();

            let length = market.metadata.length;
            let leverage = match market.overlay.leverage_mut() {
                Some(terms) => Some(terms.record_leverage(now, length).or_abort()),
                None => None,
            };

            let price = market.market_price(now, base_supply, oracle_price).or_abort();
            if price > max_price {
                panic!("{}", BondError::SlippageExceeded);
            }

            let amount = payment.amount();
            let value = self.asset_value(quote_token, amount);
            let payout = market.payout_for(value, price).or_abort();
            let exhausted = market.record_purchase(amount, payout).or_abort();

            self.accrue_rewards(payout, referrer.as_ref());

            let matured = market.maturity(now);
            let note = Note {
                payout,
                created: now,
                matured,
                market_id,
                redeemed: false,
                base_notional: payout,
                leverage_at_issuance: leverage,
                option: market.overlay.option_for_note(oracle_price, matured).or_abort(),
            };
            let note_index = notes::push_note(&mut account_notes, note);
            self.notes.insert(depositor.clone(), account_notes);

            if exhausted {
                self.live.remove(&market_id);
                Runtime::emit_event(MarketClosedEvent {
                    market_id,
                    exhausted: true,
                });
            } else if let Some(outcome) = market
                .tune(now, price, base_supply, leverage.is_none())
                .or_abort()
            {
                if let (Some(terms), Some(oracle_price)) =
                    (market.overlay.leverage_mut(), oracle_price)
                {
                    terms.resample(oracle_price, price);
                }
                debug!(
                    "market {} tuned: control variable {}, max payout {}",
                    market_id, outcome.control_variable, outcome.max_payout
                );
                Runtime::emit_event(MarketTunedEvent {
                    market_id,
                    control_variable: outcome.control_variable,
                    max_payout: outcome.max_payout,
                    scheduled_change: outcome.scheduled_change,
                });
            }

            self.markets.insert(market_id, market);
            self.quote_vaults
                .get_mut(&quote_token)
                .ok_or(BondError::WrongQuoteToken)
                .or_abort()
                .put(payment);

            Runtime::emit_event(BondPurchasedEvent {
                market_id,
                depositor,
                referrer,
                amount,
                payout,
                price,
                matured,
                note_index,
            });

            (payout, matured, note_index)
        }

        /// Redeems the matured notes at `indices`, returning payouts and option bonuses.
        ///
        /// Unmatured notes are skipped. Settled notes are removed, which moves the last note into
        /// their slot.
        pub fn redeem(&mut self, account_proof: NonFungibleProof, indices: Vec<u64>) -> Bucket {
            let account = self.account_id(account_proof);
            self.settle(account, Some(indices))
        }

        /// Redeems every matured note of the account.
        pub fn redeem_all(&mut self, account_proof: NonFungibleProof) -> Bucket {
            let account = self.account_id(account_proof);
            self.settle(account, None)
        }

        /// Withdraws the front-end rewards accrued by the account.
        pub fn get_reward(&mut self, account_proof: NonFungibleProof) -> Bucket {
            let account = self.account_id(account_proof);
            let amount = self.pending_rewards(account.clone());
            self.referrer_rewards.insert(account.clone(), Decimal::ZERO);

            Runtime::emit_event(RewardClaimedEvent {
                account: Some(account),
                amount,
            });

            self.payout_vault.take(amount).into()
        }

        pub fn markets(&self, market_id: u64) -> Market {
            self.market(market_id).market
        }

        pub fn terms(&self, market_id: u64) -> Terms {
            self.market(market_id).terms
        }

        pub fn metadata(&self, market_id: u64) -> MarketMetadata {
            self.market(market_id).metadata
        }

        pub fn adjustments(&self, market_id: u64) -> Adjustment {
            self.market(market_id).adjustment
        }

        pub fn is_live(&self, market_id: u64) -> bool {
            self.market(market_id).is_live(Self::now())
        }

        /// Ids of all markets still accepting deposits, ascending.
        pub fn live_markets(&self) -> Vec<u64> {
            let now = Self::now();
            self.live
                .range(0u64..)
                .map(|(market_id, _, _)| market_id)
                .filter(|market_id| self.market(*market_id).is_live(now))
                .collect()
        }

        pub fn live_markets_for(&self, quote_token: ResourceAddress) -> Vec<u64> {
            let now = Self::now();
            self.live
                .range(0u64..)
                .filter(|(_, token, _)| *token == quote_token)
                .map(|(market_id, _, _)| market_id)
                .filter(|market_id| self.market(*market_id).is_live(now))
                .collect()
        }

        /// Indexes of the notes held by the account.
        pub fn indexes_for(&self, account: NonFungibleLocalId) -> Vec<u64> {
            notes::indexes(&self.account_notes(&account))
        }

        /// Current market price, with debt and control variable decayed to now.
        pub fn market_price(&self, market_id: u64) -> Decimal {
            let market = self.market(market_id);
            let oracle_price = market.overlay.oracle().map(Self::read_oracle);
            market
                .market_price(Self::now(), self.base_supply(), oracle_price)
                .or_abort()
        }

        /// Payout tokens `value` would buy at the current price.
        ///
        /// Fails with `MaxSizeExceeded` above the market's max payout or at a zero price, the same
        /// way a deposit of that value would.
        pub fn payout_for(&self, value: Decimal, market_id: u64) -> Decimal {
            let market = self.market(market_id);
            let oracle_price = market.overlay.oracle().map(Self::read_oracle);
            let price = market
                .market_price(Self::now(), self.base_supply(), oracle_price)
                .or_abort();
            market.payout_for(value, price).or_abort()
        }

        pub fn user_terms(&self, account: NonFungibleLocalId, index: u64) -> Note {
            self.account_notes(&account)
                .get(index as usize)
                .cloned()
                .ok_or(BondError::InvalidIndex)
                .or_abort()
        }

        /// Front-end rewards accrued by the account and not yet withdrawn.
        pub fn pending_rewards(&self, account: NonFungibleLocalId) -> Decimal {
            self.referrer_rewards
                .get(&account)
                .map(|amount| *amount)
                .unwrap_or(Decimal::ZERO)
        }

        /// Option bonus the note would pay if redeemed now.
        pub fn option_payout_for(&self, account: NonFungibleLocalId, index: u64) -> Decimal {
            let note = self.user_terms(account, index);
            let oracle = match self.market(note.market_id).overlay.oracle() {
                Some(oracle) => oracle,
                None => return Decimal::ZERO,
            };
            option_payout(&note, Self::read_oracle(oracle), Self::now()).or_abort()
        }

        /// Leverage including the increment accrued since the last deposit.
        pub fn current_leverage(&self, market_id: u64) -> Decimal {
            let market = self.market(market_id);
            Self::leverage_of(&market)
                .current_leverage(Self::now(), market.metadata.length)
                .or_abort()
        }

        pub fn current_leverage_increment(&self, market_id: u64) -> Decimal {
            let market = self.market(market_id);
            Self::leverage_of(&market)
                .current_leverage_increment(Self::now(), market.metadata.length)
                .or_abort()
        }

        pub fn leverage_terms(&self, market_id: u64) -> LeverageTerms {
            let market = self.market(market_id);
            Self::leverage_of(&market).clone()
        }

        fn now() -> i64 {
            Clock::current_time_rounded_to_seconds().seconds_since_unix_epoch
        }

        fn market(&self, market_id: u64) -> BondMarket {
            self.markets
                .get(&market_id)
                .map(|market| market.clone())
                .ok_or(BondError::UnknownMarket)
                .or_abort()
        }

        fn leverage_of(market: &BondMarket) -> &LeverageTerms {
            market
                .overlay
                .leverage()
                .ok_or(BondError::NotLeverageMarket)
                .or_abort()
        }

        fn account_notes(&self, account: &NonFungibleLocalId) -> Vec<Note> {
            self.notes
                .get(account)
                .map(|notes| notes.clone())
                .ok_or(BondError::UnknownAccount)
                .or_abort()
        }

        fn account_id(&self, account_proof: NonFungibleProof) -> NonFungibleLocalId {
            let account_proof = account_proof.check_with_message(
                self.bond_account_manager.address(),
                &BondError::Unauthorized.to_string(),
            );
            let account = account_proof.non_fungible::<BondAccount>();
            account.local_id().clone()
        }

        fn read_oracle(oracle: ComponentAddress) -> Decimal {
            Global::<AnyComponent>::from(oracle).call_raw("latest_price", scrypto_args!())
        }

        fn base_supply(&self) -> Decimal {
            self.treasury.call_raw("base_supply", scrypto_args!())
        }

        fn asset_value(&self, resource: ResourceAddress, amount: Decimal) -> Decimal {
            self.treasury
                .call_raw("asset_value", scrypto_args!(resource, amount))
        }

        fn accrue_rewards(&mut self, payout: Decimal, referrer: Option<&NonFungibleLocalId>) {
            self.dao_rewards += mul(payout, self.dao_rate).or_abort();

            let referrer = match referrer {
                Some(referrer) => referrer,
                None => return,
            };
            let whitelisted = self
                .whitelisted
                .get(referrer)
                .map(|allowed| *allowed)
                .unwrap_or(false);
            if whitelisted {
                let reward = mul(payout, self.ref_rate).or_abort();
                let accrued = self.pending_rewards(referrer.clone());
                self.referrer_rewards.insert(referrer.clone(), accrued + reward);
            }
        }

        /// Redeems `indices`, or every note when `None`, reading each market's oracle once.
        fn settle(&mut self, account: NonFungibleLocalId, indices: Option<Vec<u64>>) -> Bucket {
            let now = Self::now();
            let mut account_notes = self.account_notes(&account);
            let indices = indices.unwrap_or_else(|| notes::indexes(&account_notes));

            let oracle_prices: BTreeMap<u64, Decimal> =
                notes::markets_needing_oracle(&account_notes, &indices, now)
                    .or_abort()
                    .into_iter()
                    .filter_map(|market_id| {
                        self.market(market_id)
                            .overlay
                            .oracle()
                            .map(|oracle| (market_id, Self::read_oracle(oracle)))
                    })
                    .collect();

            let redemption =
                notes::redeem(&mut account_notes, &indices, &oracle_prices, now).or_abort();
            self.notes.insert(account.clone(), account_notes);

            for redeemed in redemption.redeemed {
                Runtime::emit_event(NoteRedeemedEvent {
                    account: account.clone(),
                    market_id: redeemed.market_id,
                    payout: redeemed.payout,
                    bonus: redeemed.bonus,
                    settled: redeemed.settled,
                });
            }

            self.payout_vault
                .take(redemption.payout + redemption.bonus)
                .into()
        }
    }
}
