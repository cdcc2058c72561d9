//! HTTP handlers for generating, viewing and updating brackets.

use axum::{
    Extension, Json,
    extract::{Path, WebSocketUpgrade, ws},
    response::{IntoResponse, Response},
};
use futures::{sink::SinkExt, stream::StreamExt};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::Deserialize;
use tokio::sync::broadcast::{Receiver, Sender, error::RecvError};

use crate::{
    brackets::{
        BracketError, Match, MatchStatus, Tournament,
        doc::BracketDoc,
        parse_id,
        propagate::{MatchResult, RecordedResult, record_result},
        store::{self, TeamMatch},
    },
    config::FestivalConfig,
    msg::{Msg, MsgContents},
    scores::{self, ClassScore},
    state::{DbConn, DbPool, with_conn},
    util_resp::JsonResponse,
};

/// Sends the event's current documents to every subscribed viewer. Failing to
/// publish never fails the request that triggered it.
async fn publish(pool: DbPool, tx: &Sender<Msg>, event_id: String) {
    let id = event_id.clone();
    let docs = with_conn(pool, move |conn| store::read(&id, conn))
        .await
        .and_then(|docs| {
            serde_json::to_string(&docs)
                .map_err(|e| BracketError::Internal(e.to_string()))
        });

    match docs {
        Ok(json) => {
            // no receivers is fine
            let _ = tx.send(Msg {
                event_id,
                inner: MsgContents::BracketsUpdated(json),
            });
        }
        Err(e) => tracing::warn!(event = %event_id, "could not publish update: {e}"),
    }
}

/// Runs a single-match mutation and returns the updated match along with the
/// event it belongs to.
fn with_event(
    conn: &mut DbConn,
    m: Match,
) -> Result<(Match, String), BracketError> {
    let event_id = Tournament::fetch(&m.tournament_id, conn)?.event_id;
    Ok((m, event_id))
}

#[tracing::instrument(skip(pool, tx, config))]
pub async fn do_generate_all(
    Path(event_id): Path<String>,
    Extension(pool): Extension<DbPool>,
    Extension(tx): Extension<Sender<Msg>>,
    Extension(config): Extension<FestivalConfig>,
) -> JsonResponse<Vec<BracketDoc>> {
    let event_id = parse_id("event", &event_id)?;

    let id = event_id.clone();
    let docs = with_conn(pool.clone(), move |conn| {
        store::generate_all(
            &id,
            config.loser_block_venue,
            &mut ChaCha20Rng::from_os_rng(),
            conn,
        )
    })
    .await?;

    publish(pool, &tx, event_id).await;
    Ok(Json(docs))
}

#[tracing::instrument(skip(pool, tx, config))]
pub async fn do_generate_sport(
    Path((event_id, sport_id)): Path<(String, String)>,
    Extension(pool): Extension<DbPool>,
    Extension(tx): Extension<Sender<Msg>>,
    Extension(config): Extension<FestivalConfig>,
) -> JsonResponse<Vec<BracketDoc>> {
    let event_id = parse_id("event", &event_id)?;
    let sport_id = parse_id("sport", &sport_id)?;

    let id = event_id.clone();
    let docs = with_conn(pool.clone(), move |conn| {
        store::generate(
            &id,
            &sport_id,
            config.loser_block_venue,
            &mut ChaCha20Rng::from_os_rng(),
            conn,
        )
    })
    .await?;

    publish(pool, &tx, event_id).await;
    Ok(Json(docs))
}

pub async fn do_preview_sport(
    Path((event_id, sport_id)): Path<(String, String)>,
    Extension(pool): Extension<DbPool>,
    Extension(config): Extension<FestivalConfig>,
) -> JsonResponse<Vec<BracketDoc>> {
    let event_id = parse_id("event", &event_id)?;
    let sport_id = parse_id("sport", &sport_id)?;

    let docs = with_conn(pool, move |conn| {
        store::preview(
            &event_id,
            &sport_id,
            config.loser_block_venue,
            &mut ChaCha20Rng::from_os_rng(),
            conn,
        )
    })
    .await?;
    Ok(Json(docs))
}

pub async fn view_brackets(
    Path(event_id): Path<String>,
    Extension(pool): Extension<DbPool>,
) -> JsonResponse<Vec<BracketDoc>> {
    let event_id = parse_id("event", &event_id)?;
    Ok(Json(
        with_conn(pool, move |conn| store::read(&event_id, conn)).await?,
    ))
}

pub async fn team_matches(
    Path((event_id, team_id)): Path<(String, String)>,
    Extension(pool): Extension<DbPool>,
) -> JsonResponse<Vec<TeamMatch>> {
    let event_id = parse_id("event", &event_id)?;
    let team_id = parse_id("team", &team_id)?;
    Ok(Json(
        with_conn(pool, move |conn| {
            store::matches_for_team(&event_id, &team_id, conn)
        })
        .await?,
    ))
}

pub async fn class_score_table(
    Path(event_id): Path<String>,
    Extension(pool): Extension<DbPool>,
) -> JsonResponse<Vec<ClassScore>> {
    let event_id = parse_id("event", &event_id)?;
    Ok(Json(
        with_conn(pool, move |conn| scores::class_scores(&event_id, conn))
            .await?,
    ))
}

#[tracing::instrument(skip(pool, tx, config))]
pub async fn do_record_result(
    Path(match_id): Path<String>,
    Extension(pool): Extension<DbPool>,
    Extension(tx): Extension<Sender<Msg>>,
    Extension(config): Extension<FestivalConfig>,
    Json(mut result): Json<MatchResult>,
) -> JsonResponse<RecordedResult> {
    let match_id = parse_id("match", &match_id)?;
    result.winner_team_id = parse_id("team", &result.winner_team_id)?;

    let recorded = with_conn(pool.clone(), move |conn| {
        record_result(
            &match_id,
            &result,
            &config.scoring,
            config.loser_block_venue,
            conn,
        )
    })
    .await?;

    publish(pool, &tx, recorded.event_id.clone()).await;
    Ok(Json(recorded))
}

#[derive(Deserialize, Debug)]
pub struct StartTimeForm {
    #[serde(default)]
    pub start_time: String,
}

#[tracing::instrument(skip(pool, tx))]
pub async fn do_set_start_time(
    Path(match_id): Path<String>,
    Extension(pool): Extension<DbPool>,
    Extension(tx): Extension<Sender<Msg>>,
    Json(form): Json<StartTimeForm>,
) -> JsonResponse<Match> {
    let match_id = parse_id("match", &match_id)?;
    let (m, event_id) = with_conn(pool.clone(), move |conn| {
        let m = store::set_schedule(&match_id, &form.start_time, conn)?;
        with_event(conn, m)
    })
    .await?;

    publish(pool, &tx, event_id).await;
    Ok(Json(m))
}

#[tracing::instrument(skip(pool, tx))]
pub async fn do_set_rainy_start_time(
    Path(match_id): Path<String>,
    Extension(pool): Extension<DbPool>,
    Extension(tx): Extension<Sender<Msg>>,
    Json(form): Json<StartTimeForm>,
) -> JsonResponse<Match> {
    let match_id = parse_id("match", &match_id)?;
    let (m, event_id) = with_conn(pool.clone(), move |conn| {
        let m = store::set_rainy_start_time(&match_id, &form.start_time, conn)?;
        with_event(conn, m)
    })
    .await?;

    publish(pool, &tx, event_id).await;
    Ok(Json(m))
}

#[derive(Deserialize, Debug)]
pub struct StatusForm {
    pub status: String,
}

#[tracing::instrument(skip(pool, tx))]
pub async fn do_set_status(
    Path(match_id): Path<String>,
    Extension(pool): Extension<DbPool>,
    Extension(tx): Extension<Sender<Msg>>,
    Json(form): Json<StatusForm>,
) -> JsonResponse<Match> {
    let match_id = parse_id("match", &match_id)?;
    let status: MatchStatus = form.status.parse()?;

    let (m, event_id) = with_conn(pool.clone(), move |conn| {
        let m = store::set_status(&match_id, status, conn)?;
        with_event(conn, m)
    })
    .await?;

    publish(pool, &tx, event_id).await;
    Ok(Json(m))
}

/// Provides a WebSocket channel which forwards every bracket update of the
/// event to the client.
pub async fn bracket_updates(
    ws: WebSocketUpgrade,
    Path(event_id): Path<String>,
    Extension(tx): Extension<Sender<Msg>>,
) -> Response {
    let event_id = match parse_id("event", &event_id) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    let rx = tx.subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, rx, event_id))
}

async fn handle_socket(
    socket: ws::WebSocket,
    mut rx: Receiver<Msg>,
    event_id: String,
) {
    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        loop {
            let msg = match rx.recv().await {
                Ok(msg) => msg,
                // a slow client only needs the latest state
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            };
            if msg.event_id != event_id {
                continue;
            }

            let MsgContents::BracketsUpdated(json) = msg.inner;
            if sender.send(ws::Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(_msg)) = receiver.next().await {
            // keep alive
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };
}
