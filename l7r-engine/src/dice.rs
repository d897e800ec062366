//! Roll-and-keep dice primitive.
//!
//! An `XkY` roll draws `X` ten-sided dice, explodes tens, and sums the `Y`
//! highest. Pools are normalized first so that no roll uses more than ten
//! dice: rolled dice beyond ten become kept dice, and kept dice beyond ten
//! become a flat +1 each.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::constants::{EXPLOSION_CHAIN_LIMIT, MAX_DICE};
use crate::rng::DieSource;

/// Dice pool description for a single roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RollParams {
    pub rolled: i32,
    pub kept: i32,
    pub modifier: i32,
    pub explode: bool,
}

impl RollParams {
    #[must_use]
    pub const fn new(rolled: i32, kept: i32) -> Self {
        Self {
            rolled,
            kept,
            modifier: 0,
            explode: true,
        }
    }

    #[must_use]
    pub const fn with_modifier(mut self, modifier: i32) -> Self {
        self.modifier = modifier;
        self
    }

    #[must_use]
    pub const fn with_explosion(mut self, explode: bool) -> Self {
        self.explode = explode;
        self
    }

    /// Apply the ten-dice cap.
    ///
    /// Rolled dice over ten are converted to kept dice, kept dice over ten
    /// to +1 each, and kept is capped at rolled. Negative counts become zero.
    #[must_use]
    pub fn normalized(self) -> Self {
        let mut rolled = self.rolled.max(0);
        let mut kept = self.kept.max(0);
        let mut modifier = self.modifier;
        if rolled > MAX_DICE {
            kept += rolled - MAX_DICE;
            rolled = MAX_DICE;
        }
        if kept > MAX_DICE {
            modifier += kept - MAX_DICE;
            kept = MAX_DICE;
        }
        Self {
            rolled,
            kept: kept.min(rolled),
            modifier,
            explode: self.explode,
        }
    }
}

impl std::fmt::Display for RollParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}k{}", self.rolled, self.kept)?;
        if self.modifier != 0 {
            write!(f, "{:+}", self.modifier)?;
        }
        Ok(())
    }
}

pub type DiceFaces = SmallVec<[i32; 10]>;

/// A resolved roll. Lives only as long as the action that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roll {
    pub params: RollParams,
    pub kept_dice: DiceFaces,
    pub total: i32,
}

/// Roll one die, chaining explosions while tens keep coming.
pub fn roll_die(explode: bool, source: &mut impl DieSource) -> i32 {
    let first = face(source);
    if !explode || first != 10 {
        return first;
    }
    let mut total = first;
    for _ in 0..EXPLOSION_CHAIN_LIMIT {
        let next = face(source);
        total += next;
        if next != 10 {
            break;
        }
    }
    total
}

fn face(source: &mut impl DieSource) -> i32 {
    i32::try_from(source.roll_die()).unwrap_or(1)
}

/// Roll a normalized pool and keep the highest dice.
pub fn roll_with(params: RollParams, source: &mut impl DieSource) -> Roll {
    let params = params.normalized();
    let mut dice: DiceFaces = (0..params.rolled)
        .map(|_| roll_die(params.explode, source))
        .collect();
    dice.sort_unstable_by(|a, b| b.cmp(a));
    dice.truncate(usize::try_from(params.kept).unwrap_or(0));
    let total = dice.iter().sum::<i32>() + params.modifier;
    log::trace!("rolled {params}: {dice:?} = {total}");
    Roll {
        params,
        kept_dice: dice,
        total,
    }
}

/// Roll `rolled`k`kept` with exploding tens and return the total.
pub fn roll(rolled: i32, kept: i32, source: &mut impl DieSource) -> i32 {
    roll_with(RollParams::new(rolled, kept), source).total
}

/// Initiative roll: non-exploding dice keeping the lowest faces.
///
/// The kept faces, ascending, are the character's action dice for the round.
pub fn roll_initiative(rolled: i32, kept: i32, source: &mut impl DieSource) -> SmallVec<[u8; 8]> {
    let rolled = rolled.clamp(0, MAX_DICE);
    let kept = usize::try_from(kept.clamp(0, rolled)).unwrap_or(0);
    let mut faces: SmallVec<[u8; 8]> = (0..rolled)
        .map(|_| u8::try_from(source.roll_die()).unwrap_or(10))
        .collect();
    faces.sort_unstable();
    faces.truncate(kept);
    faces
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::ScriptedDice;

    #[test]
    fn normalization_moves_rolled_overflow_to_kept() {
        let params = RollParams::new(12, 3).normalized();
        assert_eq!((params.rolled, params.kept, params.modifier), (10, 5, 0));
    }

    #[test]
    fn normalization_converts_kept_overflow_to_bonus() {
        let params = RollParams::new(16, 7).normalized();
        assert_eq!((params.rolled, params.kept, params.modifier), (10, 10, 3));
    }

    #[test]
    fn normalization_caps_kept_at_rolled_and_floors_at_zero() {
        let params = RollParams::new(3, 5).normalized();
        assert_eq!((params.rolled, params.kept), (3, 3));
        let params = RollParams::new(-2, -1).normalized();
        assert_eq!((params.rolled, params.kept), (0, 0));
    }

    #[test]
    fn keeps_highest_dice() {
        let mut dice = ScriptedDice::new(&[3, 9, 1, 7], 1);
        let result = roll_with(RollParams::new(4, 2), &mut dice);
        assert_eq!(result.kept_dice.as_slice(), &[9, 7]);
        assert_eq!(result.total, 16);
    }

    #[test]
    fn tens_explode_until_a_non_ten() {
        let mut dice = ScriptedDice::new(&[10, 10, 4], 1);
        assert_eq!(roll(1, 1, &mut dice), 24);
        assert_eq!(dice.draws(), 3);
    }

    #[test]
    fn unexploding_rolls_keep_tens_flat() {
        let mut dice = ScriptedDice::new(&[10, 10, 4], 1);
        let result = roll_with(RollParams::new(1, 1).with_explosion(false), &mut dice);
        assert_eq!(result.total, 10);
        assert_eq!(dice.draws(), 1);
    }

    #[test]
    fn forced_tens_accumulate_up_to_chain_limit() {
        let mut dice = ScriptedDice::constant(10);
        let total = roll(1, 1, &mut dice);
        let limit = i32::try_from(EXPLOSION_CHAIN_LIMIT).unwrap_or(0);
        assert_eq!(total, 10 * (limit + 1));
    }

    #[test]
    fn modifier_applies_after_dice() {
        let mut dice = ScriptedDice::new(&[10, 2], 1);
        let result = roll_with(RollParams::new(1, 1).with_modifier(5), &mut dice);
        assert_eq!(result.total, 17);
    }

    #[test]
    fn initiative_keeps_lowest_faces_without_exploding() {
        let mut dice = ScriptedDice::new(&[8, 10, 2, 5], 1);
        let actions = roll_initiative(4, 3, &mut dice);
        assert_eq!(actions.as_slice(), &[2, 5, 8]);
        assert_eq!(dice.draws(), 4);
    }

    #[test]
    fn display_shows_pool_and_modifier() {
        assert_eq!(RollParams::new(6, 3).with_modifier(-10).to_string(), "6k3-10");
        assert_eq!(RollParams::new(2, 1).to_string(), "2k1");
    }
}
