//! HTTP API handlers for mcat-api
//!
//! One module per catalog entity; each exposes a `*_routes()` builder that
//! `build_router` merges.

pub mod albums;
pub mod artists;
pub mod form;
pub mod genres;
pub mod health;
pub mod query;
pub mod tracks;

pub use albums::album_routes;
pub use artists::artist_routes;
pub use genres::genre_routes;
pub use health::health_routes;
pub use tracks::track_routes;
