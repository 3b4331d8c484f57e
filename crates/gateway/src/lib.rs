//! Axum WebSocket/HTTP surface: room, viewer and signaling connections, plus
//! the REST routes for OAuth sign-in and account management.

mod http;
mod room_ws;
mod router;
mod signaling_ws;
mod state;
mod tls;
mod viewer_ws;

pub use router::build_router;
pub use state::AppState;
pub use tls::load_rustls_config;
