//! The loser bracket played at one venue: two parallel two-round blocks whose
//! teams are the losers of the main bracket's first round.

use crate::{
    brackets::{LoserBlock, Slot, build::Bracket},
    events::sports::Venue,
};

/// Loser blocks are only played when the main bracket opens with this many
/// matches (16 teams).
pub const REQUIRED_FIRST_ROUND_MATCHES: usize = 8;

const FEEDERS_PER_BLOCK: usize = REQUIRED_FIRST_ROUND_MATCHES / 2;

const ROUND_NAMES: [&str; 2] = ["First round", "Second round"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoserBlockMatch {
    pub round: usize,
    pub position: usize,
}

/// Where the loser of one main first-round match goes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoserFeed {
    pub main_position: usize,
    pub block_position: usize,
    pub slot: Slot,
}

#[derive(Clone, Debug)]
pub struct LoserBlockBracket {
    pub block: LoserBlock,
    pub rounds: Vec<String>,
    pub matches: Vec<LoserBlockMatch>,
}

impl LoserBlockBracket {
    fn new(block: LoserBlock) -> Self {
        LoserBlockBracket {
            block,
            rounds: ROUND_NAMES.iter().map(|name| name.to_string()).collect(),
            matches: vec![
                LoserBlockMatch {
                    round: 0,
                    position: 0,
                },
                LoserBlockMatch {
                    round: 0,
                    position: 1,
                },
                LoserBlockMatch {
                    round: 1,
                    position: 0,
                },
            ],
        }
    }

    /// Block A takes the losers of main positions 0-3, block B those of
    /// positions 4-7. Consecutive main matches share a block match.
    pub fn feeds(&self) -> Vec<LoserFeed> {
        let base = match self.block {
            LoserBlock::A => 0,
            LoserBlock::B => FEEDERS_PER_BLOCK,
        };
        (0..FEEDERS_PER_BLOCK)
            .map(|offset| LoserFeed {
                main_position: base + offset,
                block_position: offset / 2,
                slot: Slot::for_position(offset),
            })
            .collect()
    }

    pub fn tournament_name(&self, sport_name: &str) -> String {
        format!("{sport_name} Tournament - Loser Block {}", self.block.as_str())
    }
}

/// Derives the loser blocks for a main bracket, if the sport is played at
/// `loser_block_venue` and the bracket has exactly sixteen teams.
pub fn build_loser_blocks<T>(
    main: &Bracket<T>,
    venue: Venue,
    loser_block_venue: Venue,
) -> Option<[LoserBlockBracket; 2]> {
    if venue != loser_block_venue
        || main.first_round().count() != REQUIRED_FIRST_ROUND_MATCHES
    {
        return None;
    }

    Some(LoserBlock::ALL.map(LoserBlockBracket::new))
}
