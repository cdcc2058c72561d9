//! Results submitted at the same time from different connections.

use std::sync::{Arc, Barrier};

use diesel::prelude::*;
use itertools::Itertools;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use crate::{
    brackets::{
        Match, Tournament,
        propagate::{MatchResult, record_result},
        store::generate,
    },
    events::{Season, sports::Venue},
    schema::tournaments,
    scores::{StagePoints, class_scores, initialize_class_scores},
    state::{make_pool, run_migrations},
    test::fixtures,
};

/// Deletes the database file (and its WAL companions) when dropped.
struct TempDb(std::path::PathBuf);

impl Drop for TempDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut path = self.0.clone().into_os_string();
            path.push(suffix);
            let _ = std::fs::remove_file(path);
        }
    }
}

#[test]
fn parallel_results_for_different_matches_all_apply() {
    let db = TempDb(
        std::env::temp_dir()
            .join(format!("sportsfest-{}.sqlite", uuid::Uuid::now_v7())),
    );
    let pool = make_pool(db.0.to_str().unwrap()).unwrap();
    run_migrations(&pool).unwrap();

    let (event, first_round) = {
        let mut conn = pool.get().unwrap();
        let event = fixtures::event(&mut conn, 2025, Season::Spring);
        let sport =
            fixtures::sport(&mut conn, &event, "Basketball", Venue::Gym2);
        let teams = fixtures::teams(&mut conn, &event, &sport, 16);
        let classes = teams.iter().map(|t| t.class_id.clone()).collect_vec();
        initialize_class_scores(&event, &classes, &mut conn).unwrap();
        generate(
            &event,
            &sport,
            Venue::Gym2,
            &mut ChaCha20Rng::seed_from_u64(3),
            &mut conn,
        )
        .unwrap();

        let main = tournaments::table
            .filter(tournaments::event_id.eq(&event))
            .filter(tournaments::loser_block.is_null())
            .first::<Tournament>(&mut *conn)
            .unwrap();
        let first_round = main
            .matches(&mut *conn)
            .unwrap()
            .into_iter()
            .filter(|m| m.round == 0)
            .collect_vec();
        (event, first_round)
    };
    assert_eq!(first_round.len(), 8);

    let barrier = Arc::new(Barrier::new(first_round.len()));
    let handles = first_round
        .iter()
        .cloned()
        .map(|m| {
            let pool = pool.clone();
            let barrier = barrier.clone();
            std::thread::spawn(move || {
                let mut conn = pool.get().unwrap();
                barrier.wait();
                record_result(
                    &m.id,
                    &MatchResult {
                        team1_score: 30,
                        team2_score: 20,
                        winner_team_id: m.team1_id.clone().unwrap(),
                    },
                    &StagePoints::default(),
                    Venue::Gym2,
                    &mut conn,
                )
            })
        })
        .collect_vec();

    let results = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect_vec();
    for result in &results {
        assert!(result.is_ok(), "{result:?}");
    }

    let mut conn = pool.get().unwrap();
    let finished = first_round
        .iter()
        .map(|m| Match::fetch(&m.id, &mut *conn).unwrap())
        .collect_vec();
    for m in &finished {
        assert_eq!(m.winner_team_id, m.team1_id);
        let next = Match::fetch(m.next_match_id.as_deref().unwrap(), &mut *conn)
            .unwrap();
        assert!(next.team1_id.is_some() && next.team2_id.is_some());
        let block = Match::fetch(
            m.loser_next_match_id.as_deref().unwrap(),
            &mut *conn,
        )
        .unwrap();
        assert!(block.team1_id.is_some() && block.team2_id.is_some());
    }

    let scores = class_scores(&event, &mut *conn).unwrap();
    assert_eq!(scores.iter().filter(|s| s.gym2_win1_points == 10).count(), 8);
    assert_eq!(
        scores
            .iter()
            .map(|s| s.total_points_current_event)
            .sum::<i64>(),
        80
    );
    assert!(
        scores
            .iter()
            .filter(|s| s.total_points_current_event == 10)
            .all(|s| s.rank_current_event == 1)
    );
}
