use std::sync::LazyLock;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::Html,
};
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    persist::{PersistError, files::TrailSelection},
    trail::Trail,
    validate::parse_trail,
};

use super::{AppState, error::ApiError};

static USER_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]+$").expect("valid regex"));

/// Rejects user ids that could escape the data directory; runs before any file access.
fn check_user(user: &str) -> Result<(), ApiError> {
    if USER_ID.is_match(user) {
        Ok(())
    } else {
        Err(ApiError::NotFound)
    }
}

fn authenticate(state: &AppState, user: &str, secret: &str) -> Result<(), ApiError> {
    check_user(user)?;
    if state.auth.authenticate(user, secret) {
        Ok(())
    } else {
        warn!(user = %user, "authentication failed");
        Err(ApiError::AuthFailure)
    }
}

/// `POST /trail/{user}/{secret}`
pub async fn post_trail(
    State(state): State<AppState>,
    Path((user, secret)): Path<(String, String)>,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    authenticate(&state, &user, &secret)?;
    let trail = parse_trail(&body)?;
    let ack = trail.ack_body();

    let slot = state.users.slot(&user);
    let _guard = slot.lock().await;

    let dir = state.trails.clone();
    let owner = user.clone();
    let (trail, outcome) = tokio::task::spawn_blocking(move || {
        let outcome = dir.store_trail(&owner, &trail, &body)?;
        Ok::<_, PersistError>((trail, outcome))
    })
    .await??;

    info!(
        user = %user,
        id = %trail.id(),
        version = trail.version(),
        readings = trail.readings().len(),
        created = outcome.created,
        "accepted trail"
    );
    Ok((StatusCode::CREATED, Json(ack)))
}

/// `GET /plot/{user}/{secret}/{all | id,id,...}`
pub async fn get_plot(
    State(state): State<AppState>,
    Path((user, secret, params)): Path<(String, String, String)>,
) -> Result<Html<String>, ApiError> {
    authenticate(&state, &user, &secret)?;
    let selection = TrailSelection::parse(&params)?;

    let slot = state.users.slot(&user);
    let mut guard = slot.lock().await;

    let dir = state.trails.clone();
    let owner = user.clone();
    let files = tokio::task::spawn_blocking(move || dir.load_trails(&owner, &selection)).await??;
    let trails: Vec<Trail> = files
        .into_iter()
        .filter_map(|file| match parse_trail(&file.body) {
            Ok(trail) => Some(trail),
            Err(err) => {
                warn!(
                    user = %user,
                    file = %file.file_name,
                    %err,
                    "skipping stored trail that no longer validates"
                );
                None
            }
        })
        .collect();

    if guard.needs_reload(state.users.ttl()) {
        let dir = state.trails.clone();
        let owner = user.clone();
        let store = tokio::task::spawn_blocking(move || dir.load_waypoints(&owner)).await??;
        debug!(user = %user, waypoints = store.len(), "loaded waypoint store");
        guard.install(store);
    }
    let store = guard
        .waypoints_mut()
        .ok_or_else(|| ApiError::Unexpected("waypoint store not loaded".to_string()))?;

    let renderer = state.renderer();
    let added = renderer.merge_waypoints(&trails, store);
    if let Some(snapshot) = store.dirty_snapshot() {
        let dir = state.trails.clone();
        let owner = user.clone();
        tokio::task::spawn_blocking(move || dir.write_waypoints(&owner, &snapshot)).await??;
        store.mark_clean();
    }

    let plot = renderer.render(&trails, store);
    info!(
        user = %user,
        trails = trails.len(),
        new_waypoints = added,
        markers = plot.markers.len(),
        "rendered plot"
    );
    Ok(Html(plot.to_html()))
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}

#[cfg(test)]
mod tests {
    use super::check_user;

    #[test]
    fn user_ids_are_alphanumeric() {
        assert!(check_user("alice42").is_ok());
        assert!(check_user("").is_err());
        assert!(check_user("..").is_err());
        assert!(check_user("a-b").is_err());
    }
}
