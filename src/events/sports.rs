use std::{fmt, str::FromStr};

use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use serde::{Deserialize, Serialize};

use crate::{
    brackets::BracketError,
    schema::{event_sports, sports},
};

#[derive(Serialize, Deserialize, Queryable, Clone, Debug)]
pub struct Sport {
    pub id: String,
    pub name: String,
}

impl Sport {
    pub fn fetch(
        sport_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Sport, BracketError> {
        sports::table
            .filter(sports::id.eq(sport_id))
            .first::<Sport>(conn)
            .optional()?
            .ok_or_else(|| BracketError::NotFound(format!("sport {sport_id}")))
    }
}

/// Where a sport is played. Every venue has its own set of score columns,
/// except the noon game, which is scored by a separate module.
#[derive(Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[serde(rename_all = "snake_case")]
pub enum Venue {
    Gym1,
    Gym2,
    Ground,
    NoonGame,
}

impl Venue {
    pub fn as_str(&self) -> &'static str {
        match self {
            Venue::Gym1 => "gym1",
            Venue::Gym2 => "gym2",
            Venue::Ground => "ground",
            Venue::NoonGame => "noon_game",
        }
    }

    /// Whether elimination brackets are generated for sports at this venue.
    pub fn is_bracketed(&self) -> bool {
        !matches!(self, Venue::NoonGame)
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Venue {
    type Err = BracketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gym1" => Ok(Venue::Gym1),
            "gym2" => Ok(Venue::Gym2),
            "ground" => Ok(Venue::Ground),
            "noon_game" => Ok(Venue::NoonGame),
            other => {
                Err(BracketError::Validation(format!("unknown venue {other:?}")))
            }
        }
    }
}

#[derive(Queryable, Clone, Debug)]
pub struct EventSport {
    pub id: String,
    pub event_id: String,
    pub sport_id: String,
    location: String,
}

impl EventSport {
    /// `None` for rows whose location this build does not know about; those
    /// sports are treated as unscored.
    pub fn venue(&self) -> Option<Venue> {
        self.location.parse().ok()
    }

    pub fn of_event(
        event_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Vec<(EventSport, Sport)>, BracketError> {
        Ok(event_sports::table
            .inner_join(sports::table)
            .filter(event_sports::event_id.eq(event_id))
            .order_by(sports::name.asc())
            .select((event_sports::all_columns, sports::all_columns))
            .load::<(EventSport, Sport)>(conn)?)
    }

    pub fn fetch(
        event_id: &str,
        sport_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Option<EventSport>, BracketError> {
        Ok(event_sports::table
            .filter(
                event_sports::event_id
                    .eq(event_id)
                    .and(event_sports::sport_id.eq(sport_id)),
            )
            .first::<EventSport>(conn)
            .optional()?)
    }
}
