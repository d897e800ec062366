//! One trial: fresh combat state, a full fight, and the immutable outcome record.

use log::info;
use serde::{Deserialize, Serialize};

use crate::character::CombatTally;
use crate::combat::{Battle, CombatEnd, CombatRules};
use crate::error::EngineError;
use crate::group::{Roster, Side};
use crate::numbers::i64_to_f64;
use crate::odds::RollOdds;
use crate::rng::DieSource;
use crate::schools::SchoolHooks;

/// Survival, wound and void tallies for one character at the end of a trial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterRecord {
    pub name: String,
    pub side: Side,
    pub survived: bool,
    pub lw: i32,
    pub sw: i32,
    pub sw_remaining: i32,
    pub vp_remaining: u32,
    pub tally: CombatTally,
}

/// Per-side totals over that side's characters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideFeatures {
    pub survivors: u32,
    pub actions: u32,
    pub attacks: u32,
    pub parries: u32,
    pub damage_rolls: u32,
    pub damage_sum: i64,
    pub damage_sum_squares: i64,
    pub sw: i32,
    pub sw_remaining: i32,
    pub vp_spent: u32,
    pub vp_spent_attacks: u32,
    pub vp_spent_wound_checks: u32,
    pub vp_remaining: u32,
}

impl SideFeatures {
    fn add(&mut self, record: &CharacterRecord) {
        let tally = &record.tally;
        self.survivors += u32::from(record.survived);
        self.actions += tally.actions_taken;
        self.attacks += tally.attacks_taken;
        self.parries += tally.parries_taken;
        self.damage_rolls += tally.damage_rolls;
        self.damage_sum += tally.damage_sum;
        self.damage_sum_squares += tally.damage_sum_squares;
        self.sw += record.sw;
        self.sw_remaining += record.sw_remaining;
        self.vp_spent += tally.vp_spent;
        self.vp_spent_attacks += tally.vp_spent_attacks;
        self.vp_spent_wound_checks += tally.vp_spent_wound_checks;
        self.vp_remaining += record.vp_remaining;
    }

    /// Named numeric features, in a fixed order.
    #[must_use]
    pub fn named(&self) -> [(&'static str, f64); 13] {
        [
            ("survivors", f64::from(self.survivors)),
            ("actions", f64::from(self.actions)),
            ("attacks", f64::from(self.attacks)),
            ("parries", f64::from(self.parries)),
            ("damage_rolls", f64::from(self.damage_rolls)),
            ("damage_sum", i64_to_f64(self.damage_sum)),
            ("damage_sum_squares", i64_to_f64(self.damage_sum_squares)),
            ("sw", f64::from(self.sw)),
            ("sw_remaining", f64::from(self.sw_remaining)),
            ("vp_spent", f64::from(self.vp_spent)),
            ("vp_spent_attacks", f64::from(self.vp_spent_attacks)),
            ("vp_spent_wound_checks", f64::from(self.vp_spent_wound_checks)),
            ("vp_remaining", f64::from(self.vp_remaining)),
        ]
    }
}

/// Immutable record of one simulated combat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialOutcome {
    pub index: u32,
    pub end: CombatEnd,
    pub rounds: u32,
    pub phases: u32,
    pub control: SideFeatures,
    pub test: SideFeatures,
    pub characters: Vec<CharacterRecord>,
}

impl TrialOutcome {
    #[must_use]
    pub const fn winner(&self) -> Option<Side> {
        self.end.winner()
    }

    /// `-1` control victory, `0` tie, `1` test victory.
    #[must_use]
    pub const fn winner_code(&self) -> i8 {
        match self.end.winner() {
            Some(Side::Control) => -1,
            None => 0,
            Some(Side::Test) => 1,
        }
    }

    #[must_use]
    pub const fn side(&self, side: Side) -> &SideFeatures {
        match side {
            Side::Control => &self.control,
            Side::Test => &self.test,
        }
    }

    /// Flat feature vector: durations, winner, then `control_*` and `test_*`.
    #[must_use]
    pub fn features(&self) -> Vec<(String, f64)> {
        let mut features = vec![
            ("duration_rounds".to_string(), f64::from(self.rounds)),
            ("duration_phases".to_string(), f64::from(self.phases)),
            ("winner".to_string(), f64::from(self.winner_code())),
        ];
        for side in [Side::Control, Side::Test] {
            features.extend(
                self.side(side)
                    .named()
                    .into_iter()
                    .map(|(name, value)| (format!("{}_{name}", side.label()), value)),
            );
        }
        features
    }
}

/// Side that wins initiative ties in trial `index`; alternating keeps mirror matches fair.
#[must_use]
pub const fn precedence_for(index: u32) -> Side {
    if index % 2 == 0 { Side::Control } else { Side::Test }
}

/// Run one trial from fresh combat state to a terminal condition.
///
/// # Errors
///
/// Returns `EngineError::Invariant` if the engine reaches an inconsistent state.
pub fn run_trial(
    roster: &Roster,
    odds: &RollOdds,
    hooks: &SchoolHooks,
    rules: CombatRules,
    index: u32,
    source: &mut impl DieSource,
) -> Result<TrialOutcome, EngineError> {
    info!("trial {index} begins");
    let mut battle = Battle::new(roster, odds, hooks, rules, precedence_for(index));
    let end = battle.fight(source)?;

    let mut control = SideFeatures::default();
    let mut test = SideFeatures::default();
    let characters: Vec<CharacterRecord> = battle
        .combatants()
        .iter()
        .map(|state| {
            let fighter = battle.fighter(state.id());
            CharacterRecord {
                name: fighter.name().to_string(),
                side: state.side(),
                survived: state.is_fighting(),
                lw: state.lw(),
                sw: state.sw(),
                sw_remaining: fighter.sw_remaining().max(0),
                vp_remaining: state.vp(),
                tally: *state.tally(),
            }
        })
        .collect();
    for record in &characters {
        match record.side {
            Side::Control => control.add(record),
            Side::Test => test.add(record),
        }
    }

    info!(
        "trial {index} ends after {} rounds: {}",
        battle.round(),
        match end {
            CombatEnd::Victory(side) => format!("{side} wins"),
            CombatEnd::Tie => "tie".to_string(),
        }
    );
    Ok(TrialOutcome {
        index,
        end,
        rounds: battle.round(),
        phases: battle.phases_elapsed(),
        control,
        test,
        characters,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::{CharacterBuild, Rings, Skill};
    use crate::group::Group;
    use crate::rng::trial_stream;

    fn duel() -> Roster {
        let duelist = |name: &str| {
            CharacterBuild::new(name, Rings::uniform(3))
                .with_skill(Skill::Attack, 3)
                .with_skill(Skill::Parry, 2)
        };
        Roster::from_groups(vec![
            Group::new("a", Side::Control, vec![duelist("Kenji")]),
            Group::new("b", Side::Test, vec![duelist("Aiko")]),
        ])
        .expect("roster")
    }

    #[test]
    fn same_stream_same_outcome() {
        let roster = duel();
        let odds = RollOdds::build(100, 3).expect("odds");
        let hooks = SchoolHooks::standard();
        let first = run_trial(&roster, &odds, &hooks, CombatRules::default(), 7, &mut trial_stream(5, 7))
            .expect("trial");
        let second = run_trial(&roster, &odds, &hooks, CombatRules::default(), 7, &mut trial_stream(5, 7))
            .expect("trial");
        assert_eq!(first, second);
    }

    #[test]
    fn outcome_features_are_consistent() {
        let roster = duel();
        let odds = RollOdds::build(100, 3).expect("odds");
        let hooks = SchoolHooks::standard();
        let outcome =
            run_trial(&roster, &odds, &hooks, CombatRules::default(), 0, &mut trial_stream(9, 0))
                .expect("trial");
        let winner = outcome.winner().expect("decisive duel");
        assert_eq!(outcome.side(winner).survivors, 1);
        assert_eq!(outcome.side(winner.opponent()).survivors, 0);
        assert_eq!(outcome.side(winner.opponent()).sw_remaining, 0);
        assert!(outcome.phases <= outcome.rounds * 10);
        let features = outcome.features();
        assert_eq!(features.len(), 3 + 2 * 13);
        assert_eq!(features[2].0, "winner");
        assert!(features.iter().any(|(name, _)| name == "test_vp_spent_wound_checks"));
        assert_eq!(outcome.characters.len(), 2);
    }

    #[test]
    fn precedence_alternates_by_trial() {
        assert_eq!(precedence_for(0), Side::Control);
        assert_eq!(precedence_for(1), Side::Test);
        assert_eq!(precedence_for(10), Side::Control);
    }
}
