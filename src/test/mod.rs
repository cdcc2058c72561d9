pub mod fixtures;

mod concurrency;
mod http;
