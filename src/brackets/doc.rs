//! The display document a bracket viewer renders: rounds, matches and a map of
//! contestants. Nothing here is persisted; documents are rebuilt on every
//! read.

use std::collections::{BTreeMap, HashMap};

use diesel::{connection::LoadConnection, sqlite::Sqlite};
use serde::{Deserialize, Serialize};

use crate::{
    brackets::{
        BracketError, LoserBlock, Match, MatchStatus, Tournament,
        build::Bracket, loser_blocks::LoserBlockBracket,
    },
    events::sports::Sport,
    teams::Team,
};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BracketDoc {
    /// `None` for a bracket that has not been persisted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub sport_id: String,
    pub rounds: Vec<RoundDoc>,
    pub matches: Vec<MatchDoc>,
    pub contestants: BTreeMap<String, ContestantDoc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RoundDoc {
    pub name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MatchDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub round_index: i64,
    pub order: i64,
    /// One entry per occupied slot, first slot first.
    pub sides: Vec<SideDoc>,
    pub match_status: MatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rainy_mode_start_time: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_bronze_match: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_loser_bracket_match: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loser_bracket_block: Option<LoserBlock>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SideDoc {
    pub contestant_id: String,
    pub team_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scores: Vec<ScoreDoc>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_winner: bool,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreDoc {
    pub main_score: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ContestantDoc {
    pub players: Vec<PlayerDoc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PlayerDoc {
    pub title: String,
}

/// Hands out contestant ids in order of first appearance. A team that shows
/// up in several rounds keeps the id it was first given; teams are told apart
/// by name.
#[derive(Default)]
struct Contestants {
    by_name: HashMap<String, String>,
    docs: BTreeMap<String, ContestantDoc>,
}

impl Contestants {
    fn id_for(&mut self, team_name: &str) -> String {
        if let Some(id) = self.by_name.get(team_name) {
            return id.clone();
        }

        let id = Bracket::<Team>::contestant_id(self.by_name.len());
        self.by_name.insert(team_name.to_string(), id.clone());
        self.docs.insert(
            id.clone(),
            ContestantDoc {
                players: vec![PlayerDoc {
                    title: team_name.to_string(),
                }],
            },
        );
        id
    }
}

fn side_doc(
    team_id: Option<&str>,
    score: Option<i64>,
    winner: Option<&str>,
    teams: &HashMap<String, Team>,
    contestants: &mut Contestants,
) -> Option<SideDoc> {
    // a slot that points at a team which no longer exists renders as empty
    let team = teams.get(team_id?)?;
    Some(SideDoc {
        contestant_id: contestants.id_for(&team.name),
        team_id: team.id.clone(),
        scores: score
            .map(|main_score| vec![ScoreDoc { main_score }])
            .unwrap_or_default(),
        is_winner: winner == Some(team.id.as_str()),
    })
}

impl BracketDoc {
    /// Builds the document of a stored tournament.
    ///
    /// When `rainy_mode` is set, matches that have a rainy-mode start time
    /// report it as their start time.
    pub fn of_tournament(
        tournament: &Tournament,
        rainy_mode: bool,
        teams: &HashMap<String, Team>,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<BracketDoc, BracketError> {
        let rounds = tournament
            .rounds(conn)?
            .into_iter()
            .map(|round| RoundDoc { name: round.name })
            .collect();

        let mut contestants = Contestants::default();
        let matches = tournament
            .matches(conn)?
            .iter()
            .map(|m| match_doc(m, rainy_mode, teams, &mut contestants))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(BracketDoc {
            id: Some(tournament.id.clone()),
            name: tournament.name.clone(),
            sport_id: tournament.sport_id.clone(),
            rounds,
            matches,
            contestants: contestants.docs,
        })
    }

    /// The document a freshly built main bracket would have once stored.
    pub fn preview(bracket: &Bracket<Team>, sport: &Sport) -> BracketDoc {
        let mut contestants = Contestants::default();
        let matches = bracket
            .matches
            .iter()
            .map(|m| {
                let sides = m
                    .sides
                    .map(|(a, b)| {
                        [a, b]
                            .into_iter()
                            .map(|index| {
                                let team = &bracket.teams[index];
                                SideDoc {
                                    contestant_id: contestants
                                        .id_for(&team.name),
                                    team_id: team.id.clone(),
                                    scores: vec![],
                                    is_winner: false,
                                }
                            })
                            .collect()
                    })
                    .unwrap_or_default();

                MatchDoc {
                    id: None,
                    round_index: m.round as i64,
                    order: m.position as i64,
                    sides,
                    match_status: MatchStatus::Pending,
                    start_time: None,
                    rainy_mode_start_time: None,
                    is_bronze_match: m.is_bronze_match,
                    is_loser_bracket_match: false,
                    loser_bracket_block: None,
                }
            })
            .collect();

        BracketDoc {
            id: None,
            name: format!("{} Tournament", sport.name),
            sport_id: sport.id.clone(),
            rounds: bracket
                .rounds
                .iter()
                .map(|name| RoundDoc { name: name.clone() })
                .collect(),
            matches,
            contestants: contestants.docs,
        }
    }

    /// The document of a loser block before any main-bracket result is in:
    /// every slot is still empty.
    pub fn preview_loser_block(
        block: &LoserBlockBracket,
        sport: &Sport,
    ) -> BracketDoc {
        BracketDoc {
            id: None,
            name: block.tournament_name(&sport.name),
            sport_id: sport.id.clone(),
            rounds: block
                .rounds
                .iter()
                .map(|name| RoundDoc { name: name.clone() })
                .collect(),
            matches: block
                .matches
                .iter()
                .map(|m| MatchDoc {
                    id: None,
                    round_index: m.round as i64,
                    order: m.position as i64,
                    sides: vec![],
                    match_status: MatchStatus::Pending,
                    start_time: None,
                    rainy_mode_start_time: None,
                    is_bronze_match: false,
                    is_loser_bracket_match: true,
                    loser_bracket_block: Some(block.block),
                })
                .collect(),
            contestants: BTreeMap::new(),
        }
    }
}

fn match_doc(
    m: &Match,
    rainy_mode: bool,
    teams: &HashMap<String, Team>,
    contestants: &mut Contestants,
) -> Result<MatchDoc, BracketError> {
    let winner = m.winner_team_id.as_deref();
    let sides = [
        side_doc(m.team1_id.as_deref(), m.team1_score, winner, teams, contestants),
        side_doc(m.team2_id.as_deref(), m.team2_score, winner, teams, contestants),
    ]
    .into_iter()
    .flatten()
    .collect();

    let start_time = match (&m.rainy_mode_start_time, rainy_mode) {
        (Some(rainy), true) if !rainy.is_empty() => Some(rainy.clone()),
        _ => m.start_time.clone(),
    };

    Ok(MatchDoc {
        id: Some(m.id.clone()),
        round_index: m.round,
        order: m.position,
        sides,
        match_status: m.status()?,
        start_time,
        rainy_mode_start_time: m.rainy_mode_start_time.clone(),
        is_bronze_match: m.is_bronze_match,
        is_loser_bracket_match: m.is_loser_bracket_match(),
        loser_bracket_block: m.loser_block()?,
    })
}
