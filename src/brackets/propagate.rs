//! Recording a match result and everything that follows from it: the winner
//! moves on, a semifinal or first-round loser moves sideways, the winning
//! class is awarded points and the rankings are recomputed.

use diesel::{
    SqliteConnection, connection::LoadConnection, prelude::*, sqlite::Sqlite,
};
use serde::{Deserialize, Serialize};

use crate::{
    brackets::{BracketError, Match, MatchStatus, Slot, Tournament},
    events::{
        Event,
        sports::{EventSport, Venue},
    },
    schema::matches,
    scores::{Stage, StagePoints, ledger, ranks},
    teams::Team,
};

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct MatchResult {
    pub team1_score: i64,
    pub team2_score: i64,
    pub winner_team_id: String,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Award {
    pub class_id: String,
    pub stage: Stage,
    pub column: &'static str,
    pub points: i64,
}

#[derive(Serialize, Clone, Debug)]
pub struct RecordedResult {
    pub event_id: String,
    #[serde(rename = "match")]
    pub match_: Match,
    /// `None` when the win is not worth any points.
    pub award: Option<Award>,
}

/// The stage a win in `round` represents. Loser blocks only score their
/// final.
pub fn stage_of(
    round: i64,
    max_round: i64,
    is_bronze_match: bool,
    is_loser_block: bool,
) -> Option<Stage> {
    if is_loser_block {
        return (round == max_round).then_some(Stage::LoserBlockChampion);
    }

    Some(if is_bronze_match {
        Stage::Bronze
    } else if round == max_round {
        Stage::Champion
    } else if round == 0 {
        Stage::FirstWin
    } else if round + 1 == max_round {
        Stage::ThirdWin
    } else {
        Stage::SecondWin
    })
}

fn validate(m: &Match, result: &MatchResult) -> Result<String, BracketError> {
    let (Some(team1), Some(team2)) = (m.team1_id.as_deref(), m.team2_id.as_deref())
    else {
        return Err(BracketError::Validation(
            "both teams of the match must be known before a result".to_string(),
        ));
    };

    if result.team1_score < 0 || result.team2_score < 0 {
        return Err(BracketError::Validation(
            "scores cannot be negative".to_string(),
        ));
    }

    let (winner_score, loser_score, loser) = if result.winner_team_id == team1 {
        (result.team1_score, result.team2_score, team2)
    } else if result.winner_team_id == team2 {
        (result.team2_score, result.team1_score, team1)
    } else {
        return Err(BracketError::Validation(format!(
            "team {} does not play in this match",
            result.winner_team_id
        )));
    };

    if winner_score < loser_score {
        return Err(BracketError::Validation(
            "the winner cannot have the lower score".to_string(),
        ));
    }

    Ok(loser.to_string())
}

/// Places `team_id` into `slot` of the target match. Placing a team where it
/// already is does nothing; placing it over another team is refused.
fn fill_slot(
    target_id: &str,
    slot: Slot,
    team_id: &str,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<(), BracketError> {
    let target = Match::fetch(target_id, conn).map_err(|e| match e {
        BracketError::NotFound(_) => BracketError::InvariantViolation(format!(
            "match {target_id} is linked to but does not exist"
        )),
        e => e,
    })?;

    match target.team_in(slot) {
        None => {
            let filter = matches::table.filter(matches::id.eq(&target.id));
            match slot {
                Slot::First => diesel::update(filter)
                    .set(matches::team1_id.eq(team_id))
                    .execute(conn)?,
                Slot::Second => diesel::update(filter)
                    .set(matches::team2_id.eq(team_id))
                    .execute(conn)?,
            };
            Ok(())
        }
        Some(existing) if existing == team_id => Ok(()),
        Some(existing) => {
            tracing::error!(
                match_id = %target.id,
                slot = slot.as_str(),
                existing,
                incoming = team_id,
                "refusing to overwrite an occupied slot"
            );
            Err(BracketError::InvariantViolation(format!(
                "the {} slot of match {} is already taken",
                slot.as_str(),
                target.id
            )))
        }
    }
}

/// Sends the loser of a semifinal to the bronze match.
fn advance_to_bronze(
    m: &Match,
    tournament: &Tournament,
    loser: &str,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<(), BracketError> {
    let bronze = matches::table
        .filter(matches::tournament_id.eq(&tournament.id))
        .filter(matches::is_bronze_match.eq(true))
        .select(matches::id)
        .first::<String>(conn)
        .optional()?
        .ok_or_else(|| {
            tracing::error!(tournament = %tournament.id, "bronze match missing");
            BracketError::InvariantViolation(format!(
                "tournament {} has a semifinal but no bronze match",
                tournament.id
            ))
        })?;

    let slot = m.next_slot()?.ok_or_else(|| {
        BracketError::InvariantViolation(format!(
            "semifinal {} does not feed the final",
            m.id
        ))
    })?;

    fill_slot(&bronze, slot, loser, conn)
}

/// Works out which points (if any) the win is worth and adds them.
#[allow(clippy::too_many_arguments)]
fn award_points(
    m: &Match,
    tournament: &Tournament,
    event: &Event,
    venue: Option<Venue>,
    max_round: i64,
    points: &StagePoints,
    loser_block_venue: Venue,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<Option<Award>, BracketError> {
    let is_loser_block = tournament.loser_block()?.is_some();
    let Some(stage) =
        stage_of(m.round, max_round, m.is_bronze_match, is_loser_block)
    else {
        return Ok(None);
    };
    let Some(venue) = venue else {
        return Ok(None);
    };
    if stage == Stage::LoserBlockChampion && venue != loser_block_venue {
        return Ok(None);
    }
    let Some(column) = ledger::column_for(venue, stage) else {
        return Ok(None);
    };

    let Some(winner) = m.winner_team_id.as_deref() else {
        return Ok(None);
    };
    let team = match Team::fetch(winner, conn) {
        Ok(team) => team,
        Err(BracketError::NotFound(_)) => {
            tracing::warn!(team = winner, "winner no longer exists");
            return Ok(None);
        }
        Err(e) => return Err(e),
    };
    if team.event_id != event.id {
        tracing::warn!(team = %team.id, "winner belongs to another event");
        return Ok(None);
    }

    let amount = stage.points(points);
    ledger::award(&event.id, &team.class_id, column, amount, conn)?;

    Ok(Some(Award {
        class_id: team.class_id,
        stage,
        column,
        points: amount,
    }))
}

/// Records the result of a match.
///
/// Either every consequence of the result is stored, or (on any error)
/// none is. Submitting a result again is allowed: it awards the points again,
/// and is refused if the winner changed after it was moved on.
#[tracing::instrument(skip(points, conn))]
pub fn record_result(
    match_id: &str,
    result: &MatchResult,
    points: &StagePoints,
    loser_block_venue: Venue,
    conn: &mut SqliteConnection,
) -> Result<RecordedResult, BracketError> {
    conn.immediate_transaction(|conn| {
        let m = Match::fetch(match_id, conn)?;
        let tournament = Tournament::fetch(&m.tournament_id, conn)?;
        let event = Event::fetch(&tournament.event_id, conn)?;
        let venue = EventSport::fetch(&event.id, &tournament.sport_id, conn)?
            .and_then(|event_sport| event_sport.venue());

        if event.is_rainy_mode && venue == Some(Venue::Ground) {
            return Err(BracketError::Validation(
                "ground sports are not played in rainy mode".to_string(),
            ));
        }

        let loser = validate(&m, result)?;
        let winner = result.winner_team_id.as_str();

        diesel::update(matches::table.filter(matches::id.eq(&m.id)))
            .set((
                matches::team1_score.eq(result.team1_score),
                matches::team2_score.eq(result.team2_score),
                matches::winner_team_id.eq(winner),
                matches::status.eq(MatchStatus::Finished.as_str()),
            ))
            .execute(conn)?;

        if let Some(next) = &m.next_match_id {
            let slot = m.next_slot()?.ok_or_else(|| {
                BracketError::InvariantViolation(format!(
                    "match {} has a next match but no slot",
                    m.id
                ))
            })?;
            fill_slot(next, slot, winner, conn)?;
        }

        if let Some(loser_next) = &m.loser_next_match_id {
            let slot = m.loser_next_slot()?.ok_or_else(|| {
                BracketError::InvariantViolation(format!(
                    "match {} has a loser match but no slot",
                    m.id
                ))
            })?;
            fill_slot(loser_next, slot, &loser, conn)?;
        }

        let max_round = tournament.max_round(conn)?.unwrap_or(m.round);
        let is_semifinal = tournament.loser_block()?.is_none()
            && !m.is_bronze_match
            && max_round >= 1
            && m.round == max_round - 1;
        if is_semifinal {
            advance_to_bronze(&m, &tournament, &loser, conn)?;
        }

        let m = Match::fetch(&m.id, conn)?;
        let award = award_points(
            &m,
            &tournament,
            &event,
            venue,
            max_round,
            points,
            loser_block_venue,
            conn,
        )?;

        ranks::recompute(&event, conn)?;

        tracing::info!(
            tournament = %tournament.id,
            round = m.round,
            winner,
            points = award.as_ref().map(|award| award.points).unwrap_or(0),
            "recorded result"
        );

        Ok(RecordedResult {
            event_id: event.id,
            match_: m,
            award,
        })
    })
}
