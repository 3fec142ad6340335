pub mod error;
pub mod handlers;
pub mod state;
pub mod viewer;

pub use state::ApiState;

use axum::{Extension, Router, routing::get};

use crate::domain::reactions::TargetKind;

pub fn build_api_router(state: ApiState) -> Router {
    Router::new()
        .nest("/api/sounds", reaction_routes(TargetKind::Sound))
        .nest("/api/comments", reaction_routes(TargetKind::Comment))
        .with_state(state)
}

fn reaction_routes(kind: TargetKind) -> Router<ApiState> {
    Router::new()
        .route(
            "/{id}/reactions",
            get(handlers::get_reaction)
                .put(handlers::set_reaction)
                .delete(handlers::clear_reaction),
        )
        .route("/reactions", get(handlers::get_reactions))
        .layer(Extension(kind))
}
