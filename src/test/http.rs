//! Drives the router end to end, the way the admin console and the public
//! viewer would.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use axum_test::TestServer;
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tower::ServiceExt;

use crate::{
    brackets::doc::BracketDoc,
    config::{FestivalConfig, create_app, create_app_with_sender},
    events::{Season, sports::Venue},
    msg::{Msg, MsgContents},
    scores::{ClassScore, initialize_class_scores},
    state::{DbPool, make_pool, run_migrations},
    teams::Team,
    test::fixtures,
};

struct Festival {
    pool: DbPool,
    event_id: String,
    sport_id: String,
    teams: Vec<Team>,
}

/// A spring event with a single four-team sport played at `venue`.
fn festival(venue: Venue) -> Festival {
    let pool = make_pool(":memory:").unwrap();
    run_migrations(&pool).unwrap();

    let mut conn = pool.get().unwrap();
    let event_id = fixtures::event(&mut conn, 2025, Season::Spring);
    let sport_id = fixtures::sport(&mut conn, &event_id, "Volleyball", venue);
    let teams = fixtures::teams(&mut conn, &event_id, &sport_id, 4);
    let class_ids = teams.iter().map(|t| t.class_id.clone()).collect::<Vec<_>>();
    initialize_class_scores(&event_id, &class_ids, &mut conn).unwrap();
    drop(conn);

    Festival {
        pool,
        event_id,
        sport_id,
        teams,
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn generate_play_and_rank() {
    let f = festival(Venue::Ground);
    let app = create_app(f.pool.clone(), FestivalConfig::default());

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/events/{}/tournaments/generate", f.event_id),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let docs: Vec<BracketDoc> =
        serde_json::from_value(json_body(response).await).unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].sport_id, f.sport_id);
    assert_eq!(docs[0].contestants.len(), 4);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/events/{}/tournaments", f.event_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let read: Vec<BracketDoc> =
        serde_json::from_value(json_body(response).await).unwrap();
    assert_eq!(read, docs);

    let first = docs[0]
        .matches
        .iter()
        .find(|m| m.round_index == 0 && m.order == 0)
        .unwrap();
    let match_id = first.id.clone().unwrap();
    let winner = first.sides[1].team_id.clone();

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/matches/{match_id}/result"),
            json!({
                "team1_score": 12,
                "team2_score": 25,
                "winner_team_id": winner,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let recorded = json_body(response).await;
    assert_eq!(recorded["event_id"], json!(f.event_id));
    assert_eq!(recorded["match"]["status"], json!("finished"));
    assert_eq!(recorded["award"]["stage"], json!("first_win"));

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/events/{}/class-scores", f.event_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let scores: Vec<ClassScore> =
        serde_json::from_value(json_body(response).await).unwrap();
    let winner_class = &f.teams.iter().find(|t| t.id == winner).unwrap().class_id;
    assert_eq!(&scores[0].class_id, winner_class);
    assert_eq!(scores[0].rank_current_event, 1);
    assert!(scores[0].ground_win1_points > 0);
    assert!(scores[1..].iter().all(|s| s.rank_current_event == 2));
}

#[tokio::test]
async fn errors_map_to_statuses() {
    let f = festival(Venue::Gym1);
    let server =
        TestServer::new(create_app(f.pool.clone(), FestivalConfig::default()))
            .unwrap();

    server
        .get("/events/not-a-uuid/tournaments")
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    server
        .put(&format!("/matches/{}/status", uuid::Uuid::now_v7()))
        .json(&json!({ "status": "finished" }))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let docs = server
        .post(&format!(
            "/events/{}/sports/{}/tournaments/generate",
            f.event_id, f.sport_id
        ))
        .await
        .json::<Vec<BracketDoc>>();
    let semifinal = docs[0]
        .matches
        .iter()
        .find(|m| m.round_index == 0 && m.order == 0)
        .unwrap();
    let match_id = semifinal.id.clone().unwrap();

    server
        .put(&format!("/matches/{match_id}/status"))
        .json(&json!({ "status": "postponed" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let first = semifinal.sides[0].team_id.clone();
    let second = semifinal.sides[1].team_id.clone();
    server
        .put(&format!("/matches/{match_id}/result"))
        .json(&json!({
            "team1_score": 2,
            "team2_score": 1,
            "winner_team_id": first,
        }))
        .await
        .assert_status_ok();

    // the first winner already sits in the final
    let response = server
        .put(&format!("/matches/{match_id}/result"))
        .json(&json!({
            "team1_score": 1,
            "team2_score": 2,
            "winner_team_id": second,
        }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    assert!(response.json::<Value>()["error"].is_string());
}

#[tokio::test]
async fn schedule_changes_are_broadcast() {
    let f = festival(Venue::Gym1);
    let (tx, mut rx) = broadcast::channel::<Msg>(16);
    let server = TestServer::new(create_app_with_sender(
        f.pool.clone(),
        FestivalConfig::default(),
        tx,
    ))
    .unwrap();

    let docs = server
        .post(&format!("/events/{}/tournaments/generate", f.event_id))
        .await
        .json::<Vec<BracketDoc>>();
    let generated = rx.try_recv().unwrap();
    assert_eq!(generated.event_id, f.event_id);

    let match_id = docs[0].matches[0].id.clone().unwrap();
    let response = server
        .put(&format!("/matches/{match_id}/start-time"))
        .json(&json!({ "start_time": " 10:30 " }))
        .await;
    response.assert_status_ok();
    let m = response.json::<Value>();
    assert_eq!(m["start_time"], json!("10:30"));
    assert_eq!(m["status"], json!("scheduled"));

    let Msg { event_id, inner } = rx.try_recv().unwrap();
    assert_eq!(event_id, f.event_id);
    let MsgContents::BracketsUpdated(json) = inner;
    let docs: Vec<BracketDoc> = serde_json::from_str(&json).unwrap();
    assert!(
        docs[0]
            .matches
            .iter()
            .any(|m| m.start_time.as_deref() == Some("10:30"))
    );
}

#[tokio::test]
async fn previews_are_not_stored() {
    let f = festival(Venue::Gym1);
    let server =
        TestServer::new(create_app(f.pool.clone(), FestivalConfig::default()))
            .unwrap();

    let preview = server
        .post(&format!(
            "/events/{}/sports/{}/tournaments/preview",
            f.event_id, f.sport_id
        ))
        .await
        .json::<Vec<BracketDoc>>();
    assert_eq!(preview.len(), 1);
    assert!(preview[0].id.is_none());

    let stored = server
        .get(&format!("/events/{}/tournaments", f.event_id))
        .await
        .json::<Vec<BracketDoc>>();
    assert!(stored.is_empty());
}

#[tokio::test]
async fn winner_ids_are_matched_in_any_case() {
    let f = festival(Venue::Gym1);
    let server =
        TestServer::new(create_app(f.pool.clone(), FestivalConfig::default()))
            .unwrap();

    let docs = server
        .post(&format!("/events/{}/tournaments/generate", f.event_id))
        .await
        .json::<Vec<BracketDoc>>();
    let first = docs[0]
        .matches
        .iter()
        .find(|m| m.round_index == 0 && m.order == 0)
        .unwrap();
    let winner = first.sides[0].team_id.clone();

    let response = server
        .put(&format!("/matches/{}/result", first.id.clone().unwrap()))
        .json(&json!({
            "team1_score": 3,
            "team2_score": 0,
            "winner_team_id": winner.to_uppercase(),
        }))
        .await;
    response.assert_status_ok();
    let recorded = response.json::<Value>();
    assert_eq!(recorded["match"]["winner_team_id"], json!(winner));
}
