use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use serde::{Deserialize, Serialize};

use crate::{brackets::BracketError, schema::events};

pub mod sports;

#[derive(Serialize, Deserialize, Queryable, Clone, Debug)]
pub struct Event {
    pub id: String,
    pub name: String,
    pub year: i64,
    season: String,
    pub is_rainy_mode: bool,
}

/// The two halves of the school year. Each year has at most one event per
/// season.
#[derive(Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Debug)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Spring,
    Autumn,
}

impl Season {
    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Spring => "spring",
            Season::Autumn => "autumn",
        }
    }
}

impl Event {
    #[tracing::instrument(skip(conn))]
    pub fn fetch(
        event_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Event, BracketError> {
        events::table
            .filter(events::id.eq(event_id))
            .first::<Event>(conn)
            .optional()?
            .ok_or_else(|| BracketError::NotFound(format!("event {event_id}")))
    }

    pub fn season(&self) -> Season {
        match self.season.as_str() {
            "autumn" => Season::Autumn,
            // enforced by a CHECK constraint
            _ => Season::Spring,
        }
    }

    /// The autumn event closes the year, so it is the one whose results also
    /// move the all-time standings.
    pub fn is_second_of_year(&self) -> bool {
        self.season() == Season::Autumn
    }
}
