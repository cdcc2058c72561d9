//! Class scores: the per-venue stage counters a class earns by winning
//! matches, and the event and all-time rankings derived from them.

use diesel::{
    SqliteConnection, connection::LoadConnection, prelude::*, sqlite::Sqlite,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    brackets::BracketError,
    events::{Event, Season},
    schema::{class_scores, events},
};

pub mod ledger;
pub mod ranks;

#[derive(Serialize, Deserialize, Queryable, Clone, Debug, PartialEq, Eq)]
pub struct ClassScore {
    pub id: String,
    pub event_id: String,
    pub class_id: String,
    pub initial_points: i64,
    pub survey_points: i64,
    pub attendance_points: i64,
    pub gym1_win1_points: i64,
    pub gym1_win2_points: i64,
    pub gym1_win3_points: i64,
    pub gym1_champion_points: i64,
    pub gym2_win1_points: i64,
    pub gym2_win2_points: i64,
    pub gym2_win3_points: i64,
    pub gym2_champion_points: i64,
    pub gym2_loser_block_champion_points: i64,
    pub ground_win1_points: i64,
    pub ground_win2_points: i64,
    pub ground_win3_points: i64,
    pub ground_champion_points: i64,
    pub noon_game_points: i64,
    pub mvp_points: i64,
    pub total_points_current_event: i64,
    pub rank_current_event: i64,
    pub total_points_overall: i64,
    pub rank_overall: i64,
}

/// What a win was worth, by how far into the bracket it came.
#[derive(Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    FirstWin,
    SecondWin,
    /// Winning the semifinal.
    ThirdWin,
    Champion,
    /// Winning the bronze match. Counted with the champion points.
    Bronze,
    LoserBlockChampion,
}

/// Points awarded for each stage.
#[derive(Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Debug)]
#[serde(default)]
pub struct StagePoints {
    pub first_win: i64,
    pub second_win: i64,
    pub third_win: i64,
    pub champion: i64,
    pub bronze: i64,
    pub loser_block_champion: i64,
}

impl Default for StagePoints {
    fn default() -> Self {
        StagePoints {
            first_win: 10,
            second_win: 10,
            third_win: 10,
            champion: 10,
            bronze: 10,
            loser_block_champion: 10,
        }
    }
}

impl Stage {
    pub fn points(&self, points: &StagePoints) -> i64 {
        match self {
            Stage::FirstWin => points.first_win,
            Stage::SecondWin => points.second_win,
            Stage::ThirdWin => points.third_win,
            Stage::Champion => points.champion,
            Stage::Bronze => points.bronze,
            Stage::LoserBlockChampion => points.loser_block_champion,
        }
    }
}

/// Creates a zeroed score row for each class that does not have one yet, and
/// recomputes the rankings.
///
/// Rows of an autumn event start their all-time total from the class's total
/// in the spring event of the same year.
#[tracing::instrument(skip(conn))]
pub fn initialize_class_scores(
    event_id: &str,
    class_ids: &[String],
    conn: &mut SqliteConnection,
) -> Result<(), BracketError> {
    conn.immediate_transaction(|conn| {
        let event = Event::fetch(event_id, conn)?;

        let spring_event = if event.is_second_of_year() {
            events::table
                .filter(events::year.eq(event.year))
                .filter(events::season.eq(Season::Spring.as_str()))
                .select(events::id)
                .first::<String>(conn)
                .optional()?
        } else {
            None
        };

        for class_id in class_ids {
            let carried = match &spring_event {
                Some(spring) => class_scores::table
                    .filter(class_scores::event_id.eq(spring))
                    .filter(class_scores::class_id.eq(class_id))
                    .select(class_scores::total_points_current_event)
                    .first::<i64>(conn)
                    .optional()?
                    .unwrap_or(0),
                None => 0,
            };

            diesel::insert_into(class_scores::table)
                .values((
                    class_scores::id.eq(Uuid::now_v7().to_string()),
                    class_scores::event_id.eq(&event.id),
                    class_scores::class_id.eq(class_id),
                    class_scores::total_points_overall.eq(carried),
                ))
                .on_conflict((class_scores::event_id, class_scores::class_id))
                .do_nothing()
                .execute(conn)?;
        }

        ranks::recompute(&event, conn)
    })
}

/// The event's score rows, best first. Unranked rows (rank 0) come first
/// only while nobody has scored.
#[tracing::instrument(skip(conn))]
pub fn class_scores(
    event_id: &str,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<Vec<ClassScore>, BracketError> {
    let event = Event::fetch(event_id, conn)?;
    Ok(class_scores::table
        .filter(class_scores::event_id.eq(&event.id))
        .order_by((
            class_scores::rank_current_event.asc(),
            class_scores::class_id.asc(),
        ))
        .load::<ClassScore>(conn)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::fixtures;

    #[test]
    fn initialization_is_zeroed_and_unranked() {
        let mut conn = fixtures::conn();
        let event = fixtures::event(&mut conn, 2025, Season::Spring);
        let classes = ["1-A", "1-B", "1-C"]
            .map(|name| fixtures::class(&mut conn, name))
            .to_vec();

        initialize_class_scores(&event, &classes, &mut conn).unwrap();
        // a second call leaves existing rows alone
        initialize_class_scores(&event, &classes, &mut conn).unwrap();

        let rows = class_scores(&event, &mut conn).unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|row| row.total_points_current_event == 0
            && row.rank_current_event == 0
            && row.rank_overall == 0));
    }

    #[test]
    fn autumn_rows_carry_the_spring_total() {
        let mut conn = fixtures::conn();
        let spring = fixtures::event(&mut conn, 2025, Season::Spring);
        let autumn = fixtures::event(&mut conn, 2025, Season::Autumn);
        let class = fixtures::class(&mut conn, "2-A");

        initialize_class_scores(&spring, &[class.clone()], &mut conn).unwrap();
        ledger::award(
            &spring,
            &class,
            "gym1_win1_points",
            30,
            &mut conn,
        )
        .unwrap();

        initialize_class_scores(&autumn, &[class.clone()], &mut conn).unwrap();
        let row = &class_scores(&autumn, &mut conn).unwrap()[0];
        assert_eq!(row.total_points_current_event, 0);
        assert_eq!(row.total_points_overall, 30);
        assert_eq!(row.rank_overall, 1);
    }

    #[test]
    fn stage_points_default_to_ten() {
        let points = StagePoints::default();
        for stage in [
            Stage::FirstWin,
            Stage::SecondWin,
            Stage::ThirdWin,
            Stage::Champion,
            Stage::Bronze,
            Stage::LoserBlockChampion,
        ] {
            assert_eq!(stage.points(&points), 10);
        }
    }
}
