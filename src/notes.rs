//! # Bond notes
//!
//! Every bond account owns a list of notes. A note is added per deposit and stays in the list
//! until it is fully settled: the payout has been released and its option, if any, has either
//! been exercised or has expired. Settled notes are removed by swapping in the last note, so the
//! index of a note can change after a redemption. Callers should re-read the indexes afterwards.

use crate::errors::BondError;
use crate::overlay::{option_open, option_payout};
use crate::shared_structs::Note;
use scrypto::prelude::*;

/// Result of settling a set of notes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Redemption {
    /// Vested payouts released.
    pub payout: Decimal,
    /// Option bonuses released.
    pub bonus: Decimal,
    pub redeemed: Vec<RedeemedNote>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RedeemedNote {
    /// Index the note had when the redemption started.
    pub index: u64,
    pub market_id: u64,
    pub payout: Decimal,
    pub bonus: Decimal,
    /// Whether the note was removed from the list.
    pub settled: bool,
}

/// Appends a note and returns its index.
pub fn push_note(notes: &mut Vec<Note>, note: Note) -> u64 {
    notes.push(note);
    (notes.len() - 1) as u64
}

/// Indexes of all notes still held.
pub fn indexes(notes: &[Note]) -> Vec<u64> {
    (0..notes.len() as u64).collect()
}

/// Deduplicated indexes, highest first. Fails if any index is out of range.
fn ordered_indexes(notes: &[Note], indices: &[u64]) -> Result<Vec<u64>, BondError> {
    let mut ordered: Vec<u64> = indices.to_vec();
    ordered.sort_unstable_by(|a, b| b.cmp(a));
    ordered.dedup();
    match ordered.first() {
        Some(highest) if *highest >= notes.len() as u64 => Err(BondError::InvalidIndex),
        _ => Ok(ordered),
    }
}

/// Markets whose oracle has to be read to settle `indices` at `now`.
pub fn markets_needing_oracle(
    notes: &[Note],
    indices: &[u64],
    now: i64,
) -> Result<Vec<u64>, BondError> {
    let mut markets: Vec<u64> = ordered_indexes(notes, indices)?
        .into_iter()
        .map(|index| &notes[index as usize])
        .filter(|note| note.matured <= now && option_open(note, now))
        .map(|note| note.market_id)
        .collect();
    markets.sort_unstable();
    markets.dedup();
    Ok(markets)
}

/// Settles the notes at `indices`.
///
/// Unmatured notes are skipped. A matured note releases its payout once and its option bonus when
/// in the money inside the exercise window; `oracle_prices` holds one reading per market. Fully
/// settled notes are removed. Any out-of-range index fails the whole call before anything changes.
pub fn redeem(
    notes: &mut Vec<Note>,
    indices: &[u64],
    oracle_prices: &BTreeMap<u64, Decimal>,
    now: i64,
) -> Result<Redemption, BondError> {
    let mut redemption = Redemption::default();

    for index in ordered_indexes(notes, indices)? {
        let slot = index as usize;
        let note = &mut notes[slot];
        if now < note.matured {
            continue;
        }

        let mut payout = Decimal::ZERO;
        if !note.redeemed {
            payout = note.payout;
            note.redeemed = true;
        }

        let mut bonus = Decimal::ZERO;
        if option_open(note, now) {
            if let Some(price) = oracle_prices.get(&note.market_id) {
                bonus = option_payout(note, *price, now)?;
                if bonus.is_positive() {
                    if let Some(option) = note.option.as_mut() {
                        option.exercised = true;
                    }
                }
            }
        }

        let settled = !option_open(note, now);
        let market_id = note.market_id;
        if settled {
            notes.swap_remove(slot);
        }
        if payout.is_zero() && bonus.is_zero() && !settled {
            continue;
        }

        redemption.payout += payout;
        redemption.bonus += bonus;
        redemption.redeemed.push(RedeemedNote {
            index,
            market_id,
            payout,
            bonus,
            settled,
        });
    }

    Ok(redemption)
}
