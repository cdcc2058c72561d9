//! Seeds a database with a festival to try the bracket engine against.

use clap::Parser;
use diesel::prelude::*;
use diesel_migrations::MigrationHarness;
use itertools::Itertools;
use sportsfest::{
    MIGRATIONS,
    events::{Season, sports::Venue},
    schema::{classes, event_sports, events, sports, teams},
    scores::initialize_class_scores,
};
use uuid::Uuid;

#[derive(Parser)]
pub struct Import {
    database_url: Option<String>,
    #[clap(long, default_value_t = 2025)]
    year: i64,
    /// Creates the autumn event instead of the spring one.
    #[clap(long, action)]
    autumn: bool,
}

/// Sport name, venue and number of entered teams.
const SPORTS: &[(&str, Venue, usize)] = &[
    ("Volleyball", Venue::Gym1, 8),
    ("Basketball", Venue::Gym2, 16),
    ("Soccer", Venue::Ground, 6),
    ("Tug of war", Venue::NoonGame, 16),
];

fn main() {
    let args = Import::parse();
    let db_url = if let Some(url) = args.database_url {
        url
    } else {
        std::env::var("DATABASE_URL").expect(
            "please either set `DATABASE_URL` or pass the `--database-url` flag",
        )
    };

    let mut conn = diesel::SqliteConnection::establish(&db_url).unwrap();
    conn.run_pending_migrations(MIGRATIONS).unwrap();

    let season = if args.autumn {
        Season::Autumn
    } else {
        Season::Spring
    };

    let class_rows = (1..=4)
        .cartesian_product(['A', 'B', 'C', 'D'])
        .map(|(grade, group)| {
            let name = format!("{grade}-{group}");
            let id = classes::table
                .filter(classes::name.eq(&name))
                .select(classes::id)
                .first::<String>(&mut conn)
                .optional()
                .unwrap();
            let id = id.unwrap_or_else(|| {
                let id = Uuid::now_v7().to_string();
                diesel::insert_into(classes::table)
                    .values((classes::id.eq(&id), classes::name.eq(&name)))
                    .execute(&mut conn)
                    .unwrap();
                id
            });
            (id, name)
        })
        .collect_vec();

    let event_id = Uuid::now_v7().to_string();
    diesel::insert_into(events::table)
        .values((
            events::id.eq(&event_id),
            events::name
                .eq(format!("{} sports festival {}", season.as_str(), args.year)),
            events::year.eq(args.year),
            events::season.eq(season.as_str()),
            events::is_rainy_mode.eq(false),
        ))
        .execute(&mut conn)
        .unwrap();

    for (name, venue, n_teams) in SPORTS {
        let sport_id = sports::table
            .filter(sports::name.eq(name))
            .select(sports::id)
            .first::<String>(&mut conn)
            .optional()
            .unwrap()
            .unwrap_or_else(|| {
                let id = Uuid::now_v7().to_string();
                diesel::insert_into(sports::table)
                    .values((sports::id.eq(&id), sports::name.eq(name)))
                    .execute(&mut conn)
                    .unwrap();
                id
            });

        diesel::insert_into(event_sports::table)
            .values((
                event_sports::id.eq(Uuid::now_v7().to_string()),
                event_sports::event_id.eq(&event_id),
                event_sports::sport_id.eq(&sport_id),
                event_sports::location.eq(venue.as_str()),
            ))
            .execute(&mut conn)
            .unwrap();

        for (class_id, class_name) in class_rows.iter().take(*n_teams) {
            diesel::insert_into(teams::table)
                .values((
                    teams::id.eq(Uuid::now_v7().to_string()),
                    teams::event_id.eq(&event_id),
                    teams::sport_id.eq(&sport_id),
                    teams::class_id.eq(class_id),
                    teams::name.eq(format!("{class_name} {name}")),
                ))
                .execute(&mut conn)
                .unwrap();
        }
    }

    let class_ids = class_rows.into_iter().map(|(id, _)| id).collect_vec();
    initialize_class_scores(&event_id, &class_ids, &mut conn).unwrap();

    println!("{event_id}");
}
