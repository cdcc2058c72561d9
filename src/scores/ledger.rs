//! Maps a win to the score column it counts towards and applies it.
//!
//! Awards only ever add to the stored value, so awards for different matches
//! commute.

use diesel::{
    connection::LoadConnection,
    prelude::*,
    sql_types::{BigInt, Text},
    sqlite::Sqlite,
};
use uuid::Uuid;

use crate::{brackets::BracketError, events::sports::Venue, scores::Stage};

/// The column a win at `stage` is counted in at `venue`. `None` when the venue
/// has no such counter.
pub fn column_for(venue: Venue, stage: Stage) -> Option<&'static str> {
    use Stage::*;
    use Venue::*;

    Some(match (venue, stage) {
        (Gym1, FirstWin) => "gym1_win1_points",
        (Gym1, SecondWin) => "gym1_win2_points",
        (Gym1, ThirdWin) => "gym1_win3_points",
        (Gym1, Champion | Bronze) => "gym1_champion_points",
        (Gym2, FirstWin) => "gym2_win1_points",
        (Gym2, SecondWin) => "gym2_win2_points",
        (Gym2, ThirdWin) => "gym2_win3_points",
        (Gym2, Champion | Bronze) => "gym2_champion_points",
        (Gym2, LoserBlockChampion) => "gym2_loser_block_champion_points",
        (Ground, FirstWin) => "ground_win1_points",
        (Ground, SecondWin) => "ground_win2_points",
        (Ground, ThirdWin) => "ground_win3_points",
        (Ground, Champion | Bronze) => "ground_champion_points",
        (Gym1 | Ground, LoserBlockChampion) | (NoonGame, _) => return None,
    })
}

/// Adds `amount` to `column` of the class's row for the event, and to both of
/// its running totals. The row is created if it does not exist.
///
/// `column` must come from [`column_for`]; it is spliced into the statement.
#[tracing::instrument(skip(conn))]
pub fn award(
    event_id: &str,
    class_id: &str,
    column: &'static str,
    amount: i64,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<(), BracketError> {
    let query = format!(
        "INSERT INTO class_scores \
             (id, event_id, class_id, {column}, \
              total_points_current_event, total_points_overall) \
         VALUES (?, ?, ?, ?, ?, ?) \
         ON CONFLICT (event_id, class_id) DO UPDATE SET \
             {column} = {column} + excluded.{column}, \
             total_points_current_event = \
                 total_points_current_event + excluded.total_points_current_event, \
             total_points_overall = \
                 total_points_overall + excluded.total_points_overall"
    );

    diesel::sql_query(query)
        .bind::<Text, _>(Uuid::now_v7().to_string())
        .bind::<Text, _>(event_id)
        .bind::<Text, _>(class_id)
        .bind::<BigInt, _>(amount)
        .bind::<BigInt, _>(amount)
        .bind::<BigInt, _>(amount)
        .execute(conn)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        events::Season,
        scores::{class_scores, initialize_class_scores},
        test::fixtures,
    };

    #[test]
    fn every_venue_stage_pair_has_a_distinct_column() {
        let mut seen = std::collections::HashSet::new();
        for venue in [Venue::Gym1, Venue::Gym2, Venue::Ground] {
            for stage in [
                Stage::FirstWin,
                Stage::SecondWin,
                Stage::ThirdWin,
                Stage::Champion,
            ] {
                let column = column_for(venue, stage).unwrap();
                assert!(column.starts_with(venue.as_str()));
                assert!(seen.insert(column));
            }
            assert_eq!(
                column_for(venue, Stage::Bronze),
                column_for(venue, Stage::Champion)
            );
        }

        assert_eq!(
            column_for(Venue::Gym2, Stage::LoserBlockChampion),
            Some("gym2_loser_block_champion_points")
        );
        assert_eq!(column_for(Venue::Gym1, Stage::LoserBlockChampion), None);
        assert_eq!(column_for(Venue::NoonGame, Stage::Champion), None);
    }

    #[test]
    fn awards_add_up_and_create_missing_rows() {
        let mut conn = fixtures::conn();
        let event = fixtures::event(&mut conn, 2025, Season::Spring);
        let class = fixtures::class(&mut conn, "3-C");

        award(&event, &class, "ground_win2_points", 10, &mut conn).unwrap();
        award(&event, &class, "ground_win2_points", 15, &mut conn).unwrap();
        award(&event, &class, "ground_champion_points", 5, &mut conn).unwrap();

        let rows = class_scores(&event, &mut conn).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.ground_win2_points, 25);
        assert_eq!(row.ground_champion_points, 5);
        assert_eq!(row.total_points_current_event, 30);
        assert_eq!(row.total_points_overall, 30);

        initialize_class_scores(&event, &[class.clone()], &mut conn).unwrap();
        let rows = class_scores(&event, &mut conn).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total_points_current_event, 30);
        assert_eq!(rows[0].rank_current_event, 1);
    }
}
