//! Lays out a single-elimination bracket for a list of teams.
//!
//! This module does no I/O. The store persists what is produced here and
//! resolves feed-forward pointers from the `(round, position)` pairs.

use rand::{Rng, seq::SliceRandom};

use crate::brackets::BracketError;

const ORDINAL_ROUND_NAMES: [&str; 6] = [
    "First round",
    "Second round",
    "Third round",
    "Fourth round",
    "Fifth round",
    "Sixth round",
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BracketMatch {
    pub round: usize,
    pub position: usize,
    /// Indices into [`Bracket::teams`]. Only first-round matches start with
    /// teams; every later slot is filled as results come in.
    pub sides: Option<(usize, usize)>,
    pub is_bronze_match: bool,
}

#[derive(Clone, Debug)]
pub struct Bracket<T> {
    /// Round labels, indexed by round.
    pub rounds: Vec<String>,
    /// Ordered by round, then position. The bronze match comes last.
    pub matches: Vec<BracketMatch>,
    /// The teams in shuffled order.
    pub teams: Vec<T>,
}

impl<T> Bracket<T> {
    pub fn depth(&self) -> usize {
        self.rounds.len()
    }

    pub fn first_round(&self) -> impl Iterator<Item = &BracketMatch> {
        self.matches
            .iter()
            .filter(|m| m.round == 0 && !m.is_bronze_match)
    }

    pub fn bronze_match(&self) -> Option<&BracketMatch> {
        self.matches.iter().find(|m| m.is_bronze_match)
    }

    /// Contestant identifier of the team at `index` in [`Bracket::teams`].
    pub fn contestant_id(index: usize) -> String {
        format!("c{index}")
    }
}

/// Labels for a bracket of `depth` rounds. The last two rounds are always the
/// semifinal and the final.
pub fn round_labels(depth: usize) -> Vec<String> {
    (0..depth)
        .map(|round| {
            if round + 1 == depth {
                "Final".to_string()
            } else if round + 2 == depth {
                "Semifinal".to_string()
            } else {
                ORDINAL_ROUND_NAMES
                    .get(round)
                    .map(|name| name.to_string())
                    .unwrap_or_else(|| format!("Round {}", round + 1))
            }
        })
        .collect()
}

/// Shuffles `teams` with `rng` and lays out the bracket.
///
/// The team count must be a power of two and at least two. Brackets of two or
/// more rounds get a bronze match, placed in the final round after the final.
pub fn build_bracket<T>(
    mut teams: Vec<T>,
    rng: &mut impl Rng,
) -> Result<Bracket<T>, BracketError> {
    let n = teams.len();
    if n < 2 || !n.is_power_of_two() {
        return Err(BracketError::Validation(format!(
            "a bracket needs a power-of-two number of teams (at least 2), \
             got {n}"
        )));
    }

    teams.shuffle(rng);

    let depth = n.trailing_zeros() as usize;
    let mut matches = Vec::with_capacity(n);

    for position in 0..n / 2 {
        matches.push(BracketMatch {
            round: 0,
            position,
            sides: Some((2 * position, 2 * position + 1)),
            is_bronze_match: false,
        });
    }

    let mut in_round = n / 2;
    for round in 1..depth {
        in_round /= 2;
        for position in 0..in_round {
            matches.push(BracketMatch {
                round,
                position,
                sides: None,
                is_bronze_match: false,
            });
        }
    }

    if depth >= 2 {
        matches.push(BracketMatch {
            round: depth - 1,
            position: 1,
            sides: None,
            is_bronze_match: true,
        });
    }

    Ok(Bracket {
        rounds: round_labels(depth),
        matches,
        teams,
    })
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;

    fn teams(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("team {i}")).collect()
    }

    #[test]
    fn match_counts_follow_the_team_count() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        for depth in 1..=6 {
            let n = 1usize << depth;
            let bracket = build_bracket(teams(n), &mut rng).unwrap();

            assert_eq!(bracket.depth(), depth);
            let regular = bracket
                .matches
                .iter()
                .filter(|m| !m.is_bronze_match)
                .count();
            assert_eq!(regular, n - 1);

            let bronze =
                bracket.matches.iter().filter(|m| m.is_bronze_match).count();
            assert_eq!(bronze, if depth >= 2 { 1 } else { 0 });

            let per_round = bracket
                .matches
                .iter()
                .filter(|m| !m.is_bronze_match)
                .counts_by(|m| m.round);
            for round in 0..depth {
                assert_eq!(per_round[&round], n >> (round + 1));
            }
        }
    }

    #[test]
    fn bronze_match_sits_after_the_final() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let bracket = build_bracket(teams(8), &mut rng).unwrap();
        let bronze = bracket.bronze_match().unwrap();
        assert_eq!(bronze.round, 2);
        assert_eq!(bronze.position, 1);
        assert_eq!(bronze.sides, None);
        assert_eq!(bracket.matches.last(), Some(bronze));
    }

    #[test]
    fn rejects_counts_that_are_not_powers_of_two() {
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        for n in [0, 1, 3, 6, 12] {
            assert!(matches!(
                build_bracket(teams(n), &mut rng),
                Err(BracketError::Validation(_))
            ));
        }
    }

    #[test]
    fn first_round_pairs_consecutive_shuffled_teams() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let bracket = build_bracket(teams(16), &mut rng).unwrap();

        let sides = bracket.first_round().map(|m| m.sides).collect_vec();
        assert_eq!(sides.len(), 8);
        for (position, side) in sides.into_iter().enumerate() {
            assert_eq!(side, Some((2 * position, 2 * position + 1)));
        }
        assert!(
            bracket
                .matches
                .iter()
                .filter(|m| m.round > 0)
                .all(|m| m.sides.is_none())
        );

        let mut shuffled = bracket.teams.clone();
        shuffled.sort();
        let mut original = teams(16);
        original.sort();
        assert_eq!(shuffled, original);
    }

    #[test]
    fn different_entropy_gives_different_orders() {
        let a = build_bracket(teams(16), &mut ChaCha20Rng::seed_from_u64(11))
            .unwrap();
        let b = build_bracket(teams(16), &mut ChaCha20Rng::seed_from_u64(12))
            .unwrap();
        assert_ne!(a.teams, b.teams);
    }

    #[test]
    fn round_labels_end_with_semifinal_and_final() {
        assert_eq!(round_labels(1), vec!["Final"]);
        assert_eq!(round_labels(2), vec!["Semifinal", "Final"]);
        assert_eq!(
            round_labels(4),
            vec!["First round", "Second round", "Semifinal", "Final"]
        );
        assert_eq!(round_labels(9)[6], "Round 7");
    }
}
