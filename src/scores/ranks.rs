use std::collections::HashMap;

use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use itertools::Itertools;

use crate::{brackets::BracketError, events::Event, schema::class_scores};

/// Dense ranks for `totals`, highest total first: equal totals share a rank
/// and the next distinct total ranks exactly one lower.
///
/// While every total is zero nobody is ranked, and every rank is `0`.
pub fn dense_ranks(totals: &[i64]) -> Vec<i64> {
    if totals.iter().all(|total| *total == 0) {
        return vec![0; totals.len()];
    }

    let rank_of: HashMap<i64, i64> = totals
        .iter()
        .copied()
        .sorted_unstable_by(|a, b| b.cmp(a))
        .dedup()
        .zip(1..)
        .collect();

    totals.iter().map(|total| rank_of[total]).collect()
}

/// Recomputes the current-event ranks of every class in the event, and the
/// all-time ranks when the event closes its year.
#[tracing::instrument(skip_all, fields(event = %event.id))]
pub fn recompute(
    event: &Event,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<(), BracketError> {
    let rows = class_scores::table
        .filter(class_scores::event_id.eq(&event.id))
        .select((
            class_scores::id,
            class_scores::total_points_current_event,
            class_scores::total_points_overall,
        ))
        .load::<(String, i64, i64)>(conn)?;

    let current =
        dense_ranks(&rows.iter().map(|(_, total, _)| *total).collect_vec());
    for ((id, _, _), rank) in rows.iter().zip(current) {
        diesel::update(class_scores::table.filter(class_scores::id.eq(id)))
            .set(class_scores::rank_current_event.eq(rank))
            .execute(conn)?;
    }

    if event.is_second_of_year() {
        let overall =
            dense_ranks(&rows.iter().map(|(_, _, total)| *total).collect_vec());
        for ((id, _, _), rank) in rows.iter().zip(overall) {
            diesel::update(class_scores::table.filter(class_scores::id.eq(id)))
                .set(class_scores::rank_overall.eq(rank))
                .execute(conn)?;
        }
    }

    Ok(())
}
