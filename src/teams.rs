use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use serde::{Deserialize, Serialize};

use crate::{brackets::BracketError, schema::teams};

#[derive(Serialize, Deserialize, Queryable, Clone, Debug, PartialEq, Eq)]
pub struct Team {
    pub id: String,
    pub event_id: String,
    pub sport_id: String,
    pub class_id: String,
    pub name: String,
}

impl Team {
    #[tracing::instrument(skip(conn))]
    pub fn fetch(
        team_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Team, BracketError> {
        teams::table
            .filter(teams::id.eq(team_id))
            .first::<Team>(conn)
            .optional()?
            .ok_or_else(|| BracketError::NotFound(format!("team {team_id}")))
    }

    /// The roster for one sport of an event, in a stable order.
    pub fn roster(
        event_id: &str,
        sport_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Vec<Team>, BracketError> {
        Ok(teams::table
            .filter(
                teams::event_id
                    .eq(event_id)
                    .and(teams::sport_id.eq(sport_id)),
            )
            .order_by((teams::name.asc(), teams::id.asc()))
            .load::<Team>(conn)?)
    }

    pub fn of_event(
        event_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Vec<Team>, BracketError> {
        Ok(teams::table
            .filter(teams::event_id.eq(event_id))
            .load::<Team>(conn)?)
    }
}
