//! Single-elimination brackets: construction, persistence and the propagation
//! of match results.

use std::{fmt, str::FromStr};

use chrono::NaiveDateTime;
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::{matches, tournament_rounds, tournaments};

pub mod build;
pub mod doc;
pub mod loser_blocks;
pub mod manage;
pub mod propagate;
pub mod store;

/// Errors produced by bracket operations. Every variant is reported for the
/// operation as a whole: a failing transaction never says which step failed.
#[derive(Debug, Error)]
pub enum BracketError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bracket invariant violated: {0}")]
    InvariantViolation(String),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Parses an identifier received from a client. Identifiers are UUIDs, so
/// anything else can be rejected before touching the database.
pub fn parse_id(kind: &str, id: &str) -> Result<String, BracketError> {
    uuid::Uuid::parse_str(id)
        .map(|id| id.to_string())
        .map_err(|_| BracketError::Validation(format!("malformed {kind} id")))
}

/// One of the two team slots of a match.
#[derive(Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    First,
    Second,
}

impl Slot {
    /// The slot a match at `position` feeds in the next round: even positions
    /// take the first slot and odd positions the second. Only used while
    /// laying out a bracket; the result is stored with the match.
    pub fn for_position(position: usize) -> Slot {
        if position % 2 == 0 {
            Slot::First
        } else {
            Slot::Second
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::First => "first",
            Slot::Second => "second",
        }
    }
}

impl FromStr for Slot {
    type Err = BracketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first" => Ok(Slot::First),
            "second" => Ok(Slot::Second),
            other => Err(BracketError::InvariantViolation(format!(
                "stored slot {other:?} is not a slot"
            ))),
        }
    }
}

#[derive(Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Debug)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Pending,
    Scheduled,
    InProgress,
    Finished,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Pending => "pending",
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::InProgress => "in_progress",
            MatchStatus::Finished => "finished",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchStatus {
    type Err = BracketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(MatchStatus::Pending),
            "scheduled" => Ok(MatchStatus::Scheduled),
            "in_progress" => Ok(MatchStatus::InProgress),
            "finished" => Ok(MatchStatus::Finished),
            other => Err(BracketError::Validation(format!(
                "unknown match status {other:?}"
            ))),
        }
    }
}

/// The two parallel mini-brackets fed by first-round losers.
#[derive(Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum LoserBlock {
    A,
    B,
}

impl LoserBlock {
    pub const ALL: [LoserBlock; 2] = [LoserBlock::A, LoserBlock::B];

    pub fn as_str(&self) -> &'static str {
        match self {
            LoserBlock::A => "A",
            LoserBlock::B => "B",
        }
    }

    /// Parses a stored block identifier. Unknown values mean the row was
    /// written by something other than the store.
    pub fn from_stored(s: &str) -> Result<LoserBlock, BracketError> {
        match s {
            "A" => Ok(LoserBlock::A),
            "B" => Ok(LoserBlock::B),
            other => Err(BracketError::InvariantViolation(format!(
                "stored loser block {other:?} is not a block"
            ))),
        }
    }
}

#[derive(Serialize, Deserialize, Queryable, Insertable, Clone, Debug)]
#[diesel(table_name = tournaments)]
#[diesel(treat_none_as_default_value = false)]
#[diesel(check_for_backend(Sqlite))]
pub struct Tournament {
    pub id: String,
    pub event_id: String,
    pub sport_id: String,
    pub name: String,
    loser_block: Option<String>,
    pub created_at: NaiveDateTime,
}

impl Tournament {
    pub fn fetch(
        tournament_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Tournament, BracketError> {
        tournaments::table
            .filter(tournaments::id.eq(tournament_id))
            .first::<Tournament>(conn)
            .optional()?
            .ok_or_else(|| {
                BracketError::NotFound(format!("tournament {tournament_id}"))
            })
    }

    pub fn loser_block(&self) -> Result<Option<LoserBlock>, BracketError> {
        self.loser_block
            .as_deref()
            .map(LoserBlock::from_stored)
            .transpose()
    }

    /// Highest round index of this tournament (the round of its final).
    pub fn max_round(
        &self,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Option<i64>, BracketError> {
        Ok(matches::table
            .filter(matches::tournament_id.eq(&self.id))
            .select(diesel::dsl::max(matches::round))
            .get_result::<Option<i64>>(conn)?)
    }

    pub fn rounds(
        &self,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Vec<Round>, BracketError> {
        Ok(tournament_rounds::table
            .filter(tournament_rounds::tournament_id.eq(&self.id))
            .order_by(tournament_rounds::seq.asc())
            .load::<Round>(conn)?)
    }

    pub fn matches(
        &self,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Vec<Match>, BracketError> {
        Ok(matches::table
            .filter(matches::tournament_id.eq(&self.id))
            .order_by((matches::round.asc(), matches::position.asc()))
            .load::<Match>(conn)?)
    }
}

#[derive(Serialize, Deserialize, Queryable, Insertable, Clone, Debug)]
#[diesel(table_name = tournament_rounds)]
#[diesel(check_for_backend(Sqlite))]
pub struct Round {
    pub id: String,
    pub tournament_id: String,
    pub seq: i64,
    pub name: String,
}

/// This struct represents a single row in the `matches` table.
#[derive(Serialize, Deserialize, Queryable, Insertable, Clone, Debug)]
#[diesel(table_name = matches)]
#[diesel(treat_none_as_default_value = false)]
#[diesel(check_for_backend(Sqlite))]
pub struct Match {
    pub id: String,
    pub tournament_id: String,
    pub round: i64,
    pub position: i64,
    pub team1_id: Option<String>,
    pub team2_id: Option<String>,
    pub team1_score: Option<i64>,
    pub team2_score: Option<i64>,
    pub winner_team_id: Option<String>,
    status: String,
    pub start_time: Option<String>,
    pub rainy_mode_start_time: Option<String>,
    pub next_match_id: Option<String>,
    next_slot: Option<String>,
    pub loser_next_match_id: Option<String>,
    loser_next_slot: Option<String>,
    pub is_bronze_match: bool,
    loser_block: Option<String>,
}

impl Match {
    #[tracing::instrument(skip(conn))]
    pub fn fetch(
        match_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Match, BracketError> {
        matches::table
            .filter(matches::id.eq(match_id))
            .first::<Match>(conn)
            .optional()?
            .ok_or_else(|| BracketError::NotFound(format!("match {match_id}")))
    }

    pub fn status(&self) -> Result<MatchStatus, BracketError> {
        self.status.parse().map_err(|_| {
            BracketError::InvariantViolation(format!(
                "match {} has unknown status {:?}",
                self.id, self.status
            ))
        })
    }

    pub fn next_slot(&self) -> Result<Option<Slot>, BracketError> {
        self.next_slot.as_deref().map(str::parse).transpose()
    }

    pub fn loser_next_slot(&self) -> Result<Option<Slot>, BracketError> {
        self.loser_next_slot.as_deref().map(str::parse).transpose()
    }

    pub fn loser_block(&self) -> Result<Option<LoserBlock>, BracketError> {
        self.loser_block
            .as_deref()
            .map(LoserBlock::from_stored)
            .transpose()
    }

    pub fn is_loser_bracket_match(&self) -> bool {
        self.loser_block.is_some()
    }

    pub fn team_in(&self, slot: Slot) -> Option<&str> {
        match slot {
            Slot::First => self.team1_id.as_deref(),
            Slot::Second => self.team2_id.as_deref(),
        }
    }
}
