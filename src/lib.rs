//! # Bond Depository Crate
//!
//! This crate contains a Scrypto blueprint for a bond depository: a protocol that sells its own
//! token for other tokens at a discount, paying out after a vesting period. Prices are discovered
//! by a descending auction whose speed is recalibrated over time so every market sells its capacity
//! by its conclusion.
//!
//! ## Modules
//!
//! - `depository`: The `BondDepository` blueprint. Creates and closes markets, takes deposits,
//!   issues notes to bond accounts, redeems them and manages referral and DAO rewards.
//! - `pricing`: The per-market state and the debt-based pricing engine with linear debt decay.
//! - `tuner`: Control variable recalibration and the gradual application of downward adjustments.
//! - `overlay`: Optional payoff overlays: capped calls, digital payoffs and oracle-linked leverage.
//! - `notes`: Bookkeeping of the notes held by a bond account and their redemption.
//! - `events`: Events emitted by the depository.
//! - `shared_structs`: Market, note and parameter types shared across modules and returned by views.
//! - `errors` / `math`: The error type and checked fixed-point helpers.

pub mod depository;
pub mod errors;
pub mod events;
pub mod math;
pub mod notes;
pub mod overlay;
pub mod pricing;
pub mod shared_structs;
pub mod tuner;
