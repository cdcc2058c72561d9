//! In-memory databases populated with just enough of a festival to exercise
//! the bracket engine.

use diesel::{SqliteConnection, prelude::*};
use diesel_migrations::MigrationHarness;
use uuid::Uuid;

use crate::{
    MIGRATIONS,
    events::{Season, sports::Venue},
    schema::{classes, event_sports, events, sports, teams},
    teams::Team,
};

pub fn conn() -> SqliteConnection {
    let mut conn = SqliteConnection::establish(":memory:").unwrap();
    conn.run_pending_migrations(MIGRATIONS).unwrap();
    conn
}

pub fn event(conn: &mut SqliteConnection, year: i64, season: Season) -> String {
    let id = Uuid::now_v7().to_string();
    diesel::insert_into(events::table)
        .values((
            events::id.eq(&id),
            events::name.eq(format!("{year} {} festival", season.as_str())),
            events::year.eq(year),
            events::season.eq(season.as_str()),
            events::is_rainy_mode.eq(false),
        ))
        .execute(conn)
        .unwrap();
    id
}

pub fn set_rainy_mode(conn: &mut SqliteConnection, event_id: &str, on: bool) {
    diesel::update(events::table.filter(events::id.eq(event_id)))
        .set(events::is_rainy_mode.eq(on))
        .execute(conn)
        .unwrap();
}

/// Returns the id of the class called `name`, creating it on first use.
pub fn class(conn: &mut SqliteConnection, name: &str) -> String {
    if let Some(id) = classes::table
        .filter(classes::name.eq(name))
        .select(classes::id)
        .first::<String>(conn)
        .optional()
        .unwrap()
    {
        return id;
    }

    let id = Uuid::now_v7().to_string();
    diesel::insert_into(classes::table)
        .values((classes::id.eq(&id), classes::name.eq(name)))
        .execute(conn)
        .unwrap();
    id
}

/// Adds a sport played at `venue` to the event.
pub fn sport(
    conn: &mut SqliteConnection,
    event_id: &str,
    name: &str,
    venue: Venue,
) -> String {
    let id = sports::table
        .filter(sports::name.eq(name))
        .select(sports::id)
        .first::<String>(conn)
        .optional()
        .unwrap()
        .unwrap_or_else(|| {
            let id = Uuid::now_v7().to_string();
            diesel::insert_into(sports::table)
                .values((sports::id.eq(&id), sports::name.eq(name)))
                .execute(conn)
                .unwrap();
            id
        });

    diesel::insert_into(event_sports::table)
        .values((
            event_sports::id.eq(Uuid::now_v7().to_string()),
            event_sports::event_id.eq(event_id),
            event_sports::sport_id.eq(&id),
            event_sports::location.eq(venue.as_str()),
        ))
        .execute(conn)
        .unwrap();
    id
}

/// Enters `n` teams into the sport, team `i` belonging to the class `"C{i}"`.
pub fn teams(
    conn: &mut SqliteConnection,
    event_id: &str,
    sport_id: &str,
    n: usize,
) -> Vec<Team> {
    (0..n)
        .map(|i| {
            let class_id = class(conn, &format!("C{i:02}"));
            let team = Team {
                id: Uuid::now_v7().to_string(),
                event_id: event_id.to_string(),
                sport_id: sport_id.to_string(),
                class_id,
                name: format!("Team {i:02}"),
            };
            diesel::insert_into(teams::table)
                .values((
                    teams::id.eq(&team.id),
                    teams::event_id.eq(&team.event_id),
                    teams::sport_id.eq(&team.sport_id),
                    teams::class_id.eq(&team.class_id),
                    teams::name.eq(&team.name),
                ))
                .execute(conn)
                .unwrap();
            team
        })
        .collect()
}
