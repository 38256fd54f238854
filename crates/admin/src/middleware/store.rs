//! Store selection extractors.
//!
//! Almost every page works inside one store. The selected store lives in the
//! session; handlers take [`RequireStore`] to get it. The session copy is
//! checked against the database on every request, so a renamed store shows
//! its current name and a removed one sends the user back to the picker.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::{
    db::StoreRepository,
    models::{CurrentStore, Store, session_keys},
    state::AppState,
};

/// Path of the store picker.
pub const SELECT_STORE_PATH: &str = "/stores/select";

/// Extractor that requires a selected store.
///
/// Without one, HTML requests are redirected to the store picker and
/// `/api/` requests get 401 Unauthorized.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireStore(store): RequireStore) -> impl IntoResponse {
///     format!("Working in {}", store.name)
/// }
/// ```
pub struct RequireStore(pub CurrentStore);

/// Error returned when no store is selected.
#[derive(Debug, PartialEq, Eq)]
pub enum StoreRejection {
    /// Redirect to the store picker (for HTML requests).
    RedirectToSelect,
    /// Unauthorized response (for API requests).
    Unauthorized,
    /// The store could not be loaded.
    Unavailable,
}

impl IntoResponse for StoreRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToSelect => Redirect::to(SELECT_STORE_PATH).into_response(),
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "No store selected").into_response(),
            Self::Unavailable => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

/// How the session's store compares with the database row.
#[derive(Debug, PartialEq, Eq)]
pub enum StoreCheck {
    /// The store no longer exists.
    Missing,
    /// The session copy is current.
    Current,
    /// The store was renamed since it was selected.
    Renamed(CurrentStore),
}

impl StoreCheck {
    /// Compare the session copy with the row loaded for its ID.
    #[must_use]
    pub fn compare(cached: &CurrentStore, loaded: Option<&Store>) -> Self {
        match loaded {
            None => Self::Missing,
            Some(store) if store.name == cached.name => Self::Current,
            Some(store) => Self::Renamed(CurrentStore::from(store)),
        }
    }
}

impl<S> FromRequestParts<S> for RequireStore
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = StoreRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let is_api = parts.uri.path().starts_with("/api/");
        let rejection = || {
            if is_api {
                StoreRejection::Unauthorized
            } else {
                StoreRejection::RedirectToSelect
            }
        };

        // Set by SessionManagerLayer
        let session = parts.extensions.get::<Session>().ok_or_else(rejection)?;

        let store: CurrentStore = session
            .get(session_keys::CURRENT_STORE)
            .await
            .ok()
            .flatten()
            .ok_or_else(rejection)?;

        let state = AppState::from_ref(state);
        let loaded = StoreRepository::new(state.pool())
            .get(store.id)
            .await
            .map_err(|e| {
                tracing::error!(store_id = %store.id, error = %e, "Failed to load selected store");
                StoreRejection::Unavailable
            })?;

        match StoreCheck::compare(&store, loaded.as_ref()) {
            StoreCheck::Current => Ok(Self(store)),
            StoreCheck::Renamed(current) => {
                tracing::info!(store_id = %current.id, store_name = %current.name, "Selected store was renamed");
                if let Err(e) = set_current_store(session, &current).await {
                    tracing::warn!(error = %e, "Failed to refresh selected store");
                }
                Ok(Self(current))
            }
            StoreCheck::Missing => {
                tracing::warn!(store_id = %store.id, "Selected store no longer exists");
                if let Err(e) = clear_current_store(session).await {
                    tracing::warn!(error = %e, "Failed to clear selected store");
                }
                Err(rejection())
            }
        }
    }
}

/// Extractor that optionally gets the selected store.
///
/// Used by the store picker to highlight the current choice.
pub struct OptionalStore(pub Option<CurrentStore>);

impl<S> FromRequestParts<S> for OptionalStore
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let store = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<CurrentStore>(session_keys::CURRENT_STORE)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        Ok(Self(store))
    }
}

/// Select a store for this session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_store(
    session: &Session,
    store: &CurrentStore,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_STORE, store).await
}

/// Forget the selected store.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_store(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentStore>(session_keys::CURRENT_STORE)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tradedesk_core::StoreId;

    use super::*;

    #[test]
    fn test_rejection_responses() {
        let response = StoreRejection::RedirectToSelect.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get("location").and_then(|v| v.to_str().ok()),
            Some(SELECT_STORE_PATH)
        );

        let response = StoreRejection::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = StoreRejection::Unavailable.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    fn cached() -> CurrentStore {
        CurrentStore {
            id: StoreId::new(7),
            name: "Main".to_string(),
        }
    }

    fn row(name: &str) -> Store {
        Store {
            id: StoreId::new(7),
            name: name.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_store_check_uses_database_name() {
        assert_eq!(StoreCheck::compare(&cached(), Some(&row("Main"))), StoreCheck::Current);
        assert_eq!(
            StoreCheck::compare(&cached(), Some(&row("Honten"))),
            StoreCheck::Renamed(CurrentStore {
                id: StoreId::new(7),
                name: "Honten".to_string(),
            })
        );
        assert_eq!(StoreCheck::compare(&cached(), None), StoreCheck::Missing);
    }
}
