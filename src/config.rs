use std::path::Path;

use axum::{
    Extension, Router,
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast::{self, Sender};
use tower_http::trace::TraceLayer;

use crate::{
    brackets::manage::{
        bracket_updates, class_score_table, do_generate_all, do_generate_sport,
        do_preview_sport, do_record_result, do_set_rainy_start_time,
        do_set_start_time, do_set_status, team_matches, view_brackets,
    },
    events::sports::Venue,
    msg::Msg,
    scores::StagePoints,
    state::DbPool,
};

/// Festival-wide settings, read from a TOML file. Every field has a default,
/// so an empty file (or none at all) is a valid configuration.
#[derive(Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Debug)]
#[serde(default)]
pub struct FestivalConfig {
    pub scoring: StagePoints,
    /// The venue whose sixteen-team brackets get loser blocks.
    pub loser_block_venue: Venue,
}

impl Default for FestivalConfig {
    fn default() -> Self {
        FestivalConfig {
            scoring: StagePoints::default(),
            loser_block_venue: Venue::Gym2,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
}

impl FestivalConfig {
    pub fn from_toml(s: &str) -> Result<FestivalConfig, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: Option<&Path>) -> Result<FestivalConfig, ConfigError> {
        match path {
            Some(path) => Self::from_toml(&std::fs::read_to_string(path)?),
            None => Ok(FestivalConfig::default()),
        }
    }
}

pub fn create_app(pool: DbPool, config: FestivalConfig) -> Router {
    let (tx, _) = broadcast::channel::<Msg>(1000);
    create_app_with_sender(pool, config, tx)
}

/// Like [`create_app`], publishing bracket updates on `tx`.
pub fn create_app_with_sender(
    pool: DbPool,
    config: FestivalConfig,
    tx: Sender<Msg>,
) -> Router {
    Router::new()
        .route("/events/:event_id/tournaments", get(view_brackets))
        .route("/events/:event_id/tournaments/generate", post(do_generate_all))
        .route("/events/:event_id/tournaments/updates", get(bracket_updates))
        .route(
            "/events/:event_id/sports/:sport_id/tournaments/generate",
            post(do_generate_sport),
        )
        .route(
            "/events/:event_id/sports/:sport_id/tournaments/preview",
            post(do_preview_sport),
        )
        .route("/events/:event_id/teams/:team_id/matches", get(team_matches))
        .route("/events/:event_id/class-scores", get(class_score_table))
        .route("/matches/:match_id/result", put(do_record_result))
        .route("/matches/:match_id/start-time", put(do_set_start_time))
        .route(
            "/matches/:match_id/rainy-start-time",
            put(do_set_rainy_start_time),
        )
        .route("/matches/:match_id/status", put(do_set_status))
        .layer(Extension(pool))
        .layer(Extension(tx))
        .layer(Extension(config))
        .layer(TraceLayer::new_for_http())
}
