use diesel_migrations::{EmbeddedMigrations, embed_migrations};

pub mod brackets;
pub mod config;
pub mod events;
pub mod msg;
pub mod schema;
pub mod scores;
pub mod state;
pub mod teams;
pub mod util_resp;

#[cfg(test)]
mod test;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");
