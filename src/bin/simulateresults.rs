//! Generates every bracket of an event and plays it out with random scores.

use clap::Parser;
use diesel::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sportsfest::{
    brackets::{
        Match, MatchStatus,
        propagate::{MatchResult, record_result},
        store,
    },
    config::FestivalConfig,
    schema::{classes, matches, tournaments},
    scores::class_scores,
};

#[derive(Parser)]
pub struct Simulate {
    event_id: String,
    database_url: Option<String>,
    #[clap(long)]
    seed: Option<u64>,
}

fn main() {
    let args = Simulate::parse();
    let db_url = if let Some(url) = args.database_url {
        url
    } else {
        std::env::var("DATABASE_URL").expect(
            "please either set `DATABASE_URL` or pass the `--database-url` flag",
        )
    };

    let mut conn = diesel::SqliteConnection::establish(&db_url).unwrap();
    let mut rng = match args.seed {
        Some(seed) => ChaCha20Rng::seed_from_u64(seed),
        None => ChaCha20Rng::from_os_rng(),
    };
    let config = FestivalConfig::default();

    let docs = store::generate_all(
        &args.event_id,
        config.loser_block_venue,
        &mut rng,
        &mut conn,
    )
    .unwrap();
    println!("generated {} brackets", docs.len());

    // every result can unlock the next round, so keep going until nothing
    // is playable
    loop {
        let playable = matches::table
            .inner_join(tournaments::table)
            .filter(tournaments::event_id.eq(&args.event_id))
            .filter(matches::team1_id.is_not_null())
            .filter(matches::team2_id.is_not_null())
            .filter(matches::status.ne(MatchStatus::Finished.as_str()))
            .select(matches::all_columns)
            .order_by((matches::round, matches::position))
            .load::<Match>(&mut conn)
            .unwrap();
        if playable.is_empty() {
            break;
        }

        for m in playable {
            let (team1_id, team2_id) =
                (m.team1_id.clone().unwrap(), m.team2_id.clone().unwrap());
            let winning = rng.random_range(1..=25);
            let losing = rng.random_range(0..winning);
            let result = if rng.random_bool(0.5) {
                MatchResult {
                    team1_score: winning,
                    team2_score: losing,
                    winner_team_id: team1_id,
                }
            } else {
                MatchResult {
                    team1_score: losing,
                    team2_score: winning,
                    winner_team_id: team2_id,
                }
            };

            record_result(
                &m.id,
                &result,
                &config.scoring,
                config.loser_block_venue,
                &mut conn,
            )
            .unwrap();
        }
    }

    for row in class_scores(&args.event_id, &mut conn).unwrap() {
        let name = classes::table
            .filter(classes::id.eq(&row.class_id))
            .select(classes::name)
            .first::<String>(&mut conn)
            .unwrap();
        println!(
            "{:>3}  {:<6} {:>5}",
            row.rank_current_event, name, row.total_points_current_event
        );
    }
}
