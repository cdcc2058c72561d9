//! Persists brackets as tournament, round and match rows, and rebuilds the
//! display documents from them.

use std::collections::HashMap;

use chrono::{NaiveDateTime, Utc};
use diesel::{
    SqliteConnection, connection::LoadConnection, prelude::*, sqlite::Sqlite,
};
use itertools::Itertools;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    brackets::{
        BracketError, LoserBlock, Match, MatchStatus, Round, Slot, Tournament,
        build::{Bracket, build_bracket},
        doc::BracketDoc,
        loser_blocks::{LoserBlockBracket, build_loser_blocks},
    },
    events::{
        Event,
        sports::{EventSport, Sport, Venue},
    },
    schema::{matches, sports, tournament_rounds, tournaments},
    teams::Team,
};

/// Every team entered in the event, by id.
pub fn team_index(
    event_id: &str,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<HashMap<String, Team>, BracketError> {
    Ok(Team::of_event(event_id, conn)?
        .into_iter()
        .map(|team| (team.id.clone(), team))
        .collect())
}

/// Deletes every tournament of the sport in the event, with their rounds and
/// matches. Returns the number of tournaments removed.
fn delete_tournaments(
    event_id: &str,
    sport_id: &str,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<usize, BracketError> {
    let stale = tournaments::table
        .filter(
            tournaments::event_id
                .eq(event_id)
                .and(tournaments::sport_id.eq(sport_id)),
        )
        .select(tournaments::id)
        .load::<String>(conn)?;

    diesel::delete(matches::table.filter(matches::tournament_id.eq_any(&stale)))
        .execute(conn)?;
    diesel::delete(
        tournament_rounds::table
            .filter(tournament_rounds::tournament_id.eq_any(&stale)),
    )
    .execute(conn)?;
    Ok(diesel::delete(tournaments::table.filter(tournaments::id.eq_any(&stale)))
        .execute(conn)?)
}

fn insert_tournament(
    event_id: &str,
    sport_id: &str,
    name: String,
    loser_block: Option<LoserBlock>,
    round_names: &[String],
    created_at: NaiveDateTime,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<Tournament, BracketError> {
    let tournament = Tournament {
        id: Uuid::now_v7().to_string(),
        event_id: event_id.to_string(),
        sport_id: sport_id.to_string(),
        name,
        loser_block: loser_block.map(|block| block.as_str().to_string()),
        created_at,
    };
    diesel::insert_into(tournaments::table)
        .values(&tournament)
        .execute(conn)?;

    let rounds = round_names
        .iter()
        .enumerate()
        .map(|(seq, name)| Round {
            id: Uuid::now_v7().to_string(),
            tournament_id: tournament.id.clone(),
            seq: seq as i64,
            name: name.clone(),
        })
        .collect_vec();
    diesel::insert_into(tournament_rounds::table)
        .values(&rounds)
        .execute(conn)?;

    Ok(tournament)
}

fn empty_match(
    tournament_id: &str,
    round: usize,
    position: usize,
    loser_block: Option<LoserBlock>,
) -> Match {
    Match {
        id: Uuid::now_v7().to_string(),
        tournament_id: tournament_id.to_string(),
        round: round as i64,
        position: position as i64,
        team1_id: None,
        team2_id: None,
        team1_score: None,
        team2_score: None,
        winner_team_id: None,
        status: MatchStatus::Pending.as_str().to_string(),
        start_time: None,
        rainy_mode_start_time: None,
        next_match_id: None,
        next_slot: None,
        loser_next_match_id: None,
        loser_next_slot: None,
        is_bronze_match: false,
        loser_block: loser_block.map(|block| block.as_str().to_string()),
    }
}

/// Links every match to the one its winner moves on to: the match at the next
/// round and half the position. Bronze matches and the last round are left
/// without a pointer.
fn link_feed_forward(rows: &mut [Match]) {
    let ids: HashMap<(i64, i64), String> = rows
        .iter()
        .filter(|m| !m.is_bronze_match)
        .map(|m| ((m.round, m.position), m.id.clone()))
        .collect();

    for row in rows.iter_mut().filter(|m| !m.is_bronze_match) {
        if let Some(next) = ids.get(&(row.round + 1, row.position / 2)) {
            row.next_match_id = Some(next.clone());
            row.next_slot = Some(
                Slot::for_position(row.position as usize).as_str().to_string(),
            );
        }
    }
}

/// Stores one loser block. Returns the tournament id and the ids of its
/// first-round matches by position, which the main bracket's first round
/// points its losers at.
fn persist_loser_block(
    block: &LoserBlockBracket,
    sport: &Sport,
    event_id: &str,
    created_at: NaiveDateTime,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<(String, Vec<String>), BracketError> {
    let tournament = insert_tournament(
        event_id,
        &sport.id,
        block.tournament_name(&sport.name),
        Some(block.block),
        &block.rounds,
        created_at,
        conn,
    )?;

    let mut rows = block
        .matches
        .iter()
        .map(|m| {
            empty_match(&tournament.id, m.round, m.position, Some(block.block))
        })
        .collect_vec();
    link_feed_forward(&mut rows);

    diesel::insert_into(matches::table)
        .values(&rows)
        .execute(conn)?;

    let first_round = rows
        .into_iter()
        .filter(|m| m.round == 0)
        .sorted_by_key(|m| m.position)
        .map(|m| m.id)
        .collect();
    Ok((tournament.id, first_round))
}

fn persist_main(
    bracket: &Bracket<Team>,
    blocks: Option<&[LoserBlockBracket; 2]>,
    sport: &Sport,
    event_id: &str,
    created_at: NaiveDateTime,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<Vec<String>, BracketError> {
    let main = insert_tournament(
        event_id,
        &sport.id,
        format!("{} Tournament", sport.name),
        None,
        &bracket.rounds,
        created_at,
        conn,
    )?;

    let mut loser_targets: HashMap<usize, (String, Slot)> = HashMap::new();
    let mut block_ids = Vec::new();
    for block in blocks.into_iter().flatten() {
        let (block_id, first_round) =
            persist_loser_block(block, sport, event_id, created_at, conn)?;
        block_ids.push(block_id);
        for feed in block.feeds() {
            let target = first_round.get(feed.block_position).ok_or_else(|| {
                BracketError::InvariantViolation(format!(
                    "loser block {} has no first-round match {}",
                    block.block.as_str(),
                    feed.block_position
                ))
            })?;
            loser_targets.insert(feed.main_position, (target.clone(), feed.slot));
        }
    }

    let mut rows = bracket
        .matches
        .iter()
        .map(|m| {
            let mut row = empty_match(&main.id, m.round, m.position, None);
            row.is_bronze_match = m.is_bronze_match;
            if let Some((a, b)) = m.sides {
                row.team1_id = Some(bracket.teams[a].id.clone());
                row.team2_id = Some(bracket.teams[b].id.clone());
            }
            if let Some((target, slot)) = loser_targets
                .get(&m.position)
                .filter(|_| m.round == 0 && !m.is_bronze_match)
            {
                row.loser_next_match_id = Some(target.clone());
                row.loser_next_slot = Some(slot.as_str().to_string());
            }
            row
        })
        .collect_vec();
    link_feed_forward(&mut rows);

    diesel::insert_into(matches::table)
        .values(&rows)
        .execute(conn)?;

    tracing::info!(
        tournament = %main.id,
        sport = %sport.name,
        teams = bracket.teams.len(),
        loser_blocks = block_ids.len(),
        "generated bracket"
    );

    Ok(std::iter::once(main.id).chain(block_ids).collect())
}

/// Regenerates the brackets of one sport of an event.
///
/// Existing tournaments of the sport are always deleted. When the roster
/// cannot form a bracket the sport is skipped and nothing is returned;
/// otherwise the documents of the main bracket and any loser blocks are.
#[tracing::instrument(skip(rng, conn))]
pub fn generate(
    event_id: &str,
    sport_id: &str,
    loser_block_venue: Venue,
    rng: &mut impl Rng,
    conn: &mut SqliteConnection,
) -> Result<Vec<BracketDoc>, BracketError> {
    conn.immediate_transaction(|conn| {
        let event = Event::fetch(event_id, conn)?;
        let sport = Sport::fetch(sport_id, conn)?;
        let venue = EventSport::fetch(&event.id, &sport.id, conn)?
            .ok_or_else(|| {
                BracketError::NotFound(format!(
                    "sport {sport_id} in event {event_id}"
                ))
            })?
            .venue();
        if venue.is_some_and(|venue| !venue.is_bracketed()) {
            return Err(BracketError::Validation(format!(
                "{} is not played as a bracket",
                sport.name
            )));
        }

        let removed = delete_tournaments(&event.id, &sport.id, conn)?;

        let roster = Team::roster(&event.id, &sport.id, conn)?;
        let bracket = match build_bracket(roster, rng) {
            Ok(bracket) => bracket,
            Err(BracketError::Validation(reason)) => {
                tracing::info!(
                    sport = %sport.name,
                    removed,
                    "skipping bracket generation: {reason}"
                );
                return Ok(vec![]);
            }
            Err(e) => return Err(e),
        };

        let blocks = venue
            .and_then(|venue| build_loser_blocks(&bracket, venue, loser_block_venue));

        let created_at = Utc::now().naive_utc();
        let ids = persist_main(
            &bracket,
            blocks.as_ref(),
            &sport,
            &event.id,
            created_at,
            conn,
        )?;

        let teams = team_index(&event.id, conn)?;
        ids.iter()
            .map(|id| {
                let tournament = Tournament::fetch(id, conn)?;
                BracketDoc::of_tournament(
                    &tournament,
                    event.is_rainy_mode,
                    &teams,
                    conn,
                )
            })
            .collect()
    })
}

/// Runs [`generate`] for every bracketed sport of the event. Each sport is
/// its own unit of work, so one failing sport does not undo the others.
#[tracing::instrument(skip(rng, conn))]
pub fn generate_all(
    event_id: &str,
    loser_block_venue: Venue,
    rng: &mut impl Rng,
    conn: &mut SqliteConnection,
) -> Result<Vec<BracketDoc>, BracketError> {
    let event = Event::fetch(event_id, conn)?;

    let mut docs = Vec::new();
    for (event_sport, sport) in EventSport::of_event(&event.id, conn)? {
        if event_sport.venue().is_some_and(|venue| !venue.is_bracketed()) {
            continue;
        }
        docs.extend(generate(
            &event.id,
            &sport.id,
            loser_block_venue,
            rng,
            conn,
        )?);
    }
    Ok(docs)
}

/// Previews the main bracket (and loser blocks) [`generate`] would store for
/// the current roster, shuffled with `rng`. Nothing is written.
pub fn preview(
    event_id: &str,
    sport_id: &str,
    loser_block_venue: Venue,
    rng: &mut impl Rng,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<Vec<BracketDoc>, BracketError> {
    let event = Event::fetch(event_id, conn)?;
    let sport = Sport::fetch(sport_id, conn)?;
    let venue = EventSport::fetch(&event.id, &sport.id, conn)?
        .ok_or_else(|| {
            BracketError::NotFound(format!("sport {sport_id} in event {event_id}"))
        })?
        .venue();

    let bracket = build_bracket(Team::roster(&event.id, &sport.id, conn)?, rng)?;

    let mut docs = vec![BracketDoc::preview(&bracket, &sport)];
    if let Some(blocks) = venue
        .and_then(|venue| build_loser_blocks(&bracket, venue, loser_block_venue))
    {
        docs.extend(
            blocks
                .iter()
                .map(|block| BracketDoc::preview_loser_block(block, &sport)),
        );
    }
    Ok(docs)
}

/// The documents of every tournament of the event, grouped by sport with the
/// main bracket before its loser blocks.
#[tracing::instrument(skip(conn))]
pub fn read(
    event_id: &str,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<Vec<BracketDoc>, BracketError> {
    let event = Event::fetch(event_id, conn)?;
    let teams = team_index(&event.id, conn)?;

    let tournaments = tournaments::table
        .inner_join(sports::table)
        .filter(tournaments::event_id.eq(&event.id))
        .order_by((
            sports::name.asc(),
            tournaments::loser_block.asc(),
            tournaments::created_at.asc(),
        ))
        .select(tournaments::all_columns)
        .load::<Tournament>(conn)?;

    tournaments
        .iter()
        .map(|tournament| {
            BracketDoc::of_tournament(
                tournament,
                event.is_rainy_mode,
                &teams,
                conn,
            )
        })
        .collect()
}

/// A match as seen from one of the teams playing in it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TeamMatch {
    pub match_id: String,
    pub tournament_id: String,
    pub tournament_name: String,
    pub sport_name: String,
    pub max_round: i64,
    pub round: i64,
    pub position: i64,
    pub team1_id: Option<String>,
    pub team2_id: Option<String>,
    pub team1_name: Option<String>,
    pub team2_name: Option<String>,
    pub team1_score: Option<i64>,
    pub team2_score: Option<i64>,
    pub winner_team_id: Option<String>,
    pub status: MatchStatus,
    pub next_match_id: Option<String>,
    pub start_time: Option<String>,
    pub is_bronze_match: bool,
}

/// Every match of the event that the team currently occupies.
#[tracing::instrument(skip(conn))]
pub fn matches_for_team(
    event_id: &str,
    team_id: &str,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<Vec<TeamMatch>, BracketError> {
    let team = Team::fetch(team_id, conn)?;
    if team.event_id != event_id {
        return Err(BracketError::NotFound(format!(
            "team {team_id} in event {event_id}"
        )));
    }

    let rows = matches::table
        .inner_join(tournaments::table.inner_join(sports::table))
        .filter(tournaments::event_id.eq(event_id))
        .filter(
            matches::team1_id
                .eq(team_id)
                .or(matches::team2_id.eq(team_id)),
        )
        .order_by((
            tournaments::id.asc(),
            matches::round.asc(),
            matches::position.asc(),
        ))
        .select((matches::all_columns, tournaments::all_columns, sports::name))
        .load::<(Match, Tournament, String)>(conn)?;

    let teams = team_index(event_id, conn)?;
    let name_of = |id: &Option<String>| {
        id.as_ref()
            .and_then(|id| teams.get(id))
            .map(|team| team.name.clone())
    };

    let mut max_rounds: HashMap<String, i64> = HashMap::new();
    let mut out = Vec::with_capacity(rows.len());
    for (m, tournament, sport_name) in rows {
        let max_round = match max_rounds.get(&tournament.id) {
            Some(max_round) => *max_round,
            None => {
                let max_round = tournament.max_round(conn)?.unwrap_or(m.round);
                max_rounds.insert(tournament.id.clone(), max_round);
                max_round
            }
        };

        out.push(TeamMatch {
            status: m.status()?,
            team1_name: name_of(&m.team1_id),
            team2_name: name_of(&m.team2_id),
            match_id: m.id,
            tournament_id: tournament.id,
            tournament_name: tournament.name,
            sport_name,
            max_round,
            round: m.round,
            position: m.position,
            team1_id: m.team1_id,
            team2_id: m.team2_id,
            team1_score: m.team1_score,
            team2_score: m.team2_score,
            winner_team_id: m.winner_team_id,
            next_match_id: m.next_match_id,
            start_time: m.start_time,
            is_bronze_match: m.is_bronze_match,
        });
    }
    Ok(out)
}

fn non_empty(time: &str) -> Option<&str> {
    let time = time.trim();
    (!time.is_empty()).then_some(time)
}

/// Sets the start time of a match. A pending match with a start time becomes
/// scheduled; an empty time clears it.
#[tracing::instrument(skip(conn))]
pub fn set_schedule(
    match_id: &str,
    time: &str,
    conn: &mut SqliteConnection,
) -> Result<Match, BracketError> {
    conn.immediate_transaction(|conn| {
        let m = Match::fetch(match_id, conn)?;
        let time = non_empty(time);

        let status = match (time, m.status()?) {
            (Some(_), MatchStatus::Pending) => MatchStatus::Scheduled,
            (_, status) => status,
        };

        diesel::update(matches::table.filter(matches::id.eq(&m.id)))
            .set((
                matches::start_time.eq(time),
                matches::status.eq(status.as_str()),
            ))
            .execute(conn)?;

        Match::fetch(&m.id, conn)
    })
}

/// Sets the start time used while the event is in rainy mode.
#[tracing::instrument(skip(conn))]
pub fn set_rainy_start_time(
    match_id: &str,
    time: &str,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<Match, BracketError> {
    let m = Match::fetch(match_id, conn)?;
    diesel::update(matches::table.filter(matches::id.eq(&m.id)))
        .set(matches::rainy_mode_start_time.eq(non_empty(time)))
        .execute(conn)?;
    Match::fetch(&m.id, conn)
}

#[tracing::instrument(skip(conn))]
pub fn set_status(
    match_id: &str,
    status: MatchStatus,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<Match, BracketError> {
    let m = Match::fetch(match_id, conn)?;
    diesel::update(matches::table.filter(matches::id.eq(&m.id)))
        .set(matches::status.eq(status.as_str()))
        .execute(conn)?;
    Match::fetch(&m.id, conn)
}
