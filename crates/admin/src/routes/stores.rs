//! Store selection and creation handlers.
//!
//! These pages are reachable without a selected store.

use askama::Template;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use tradedesk_core::StoreId;

use crate::{
    db::{RepositoryError, StoreRepository},
    error::{AppError, set_sentry_store},
    filters,
    middleware::{
        OptionalStore, clear_current_store, set_current_store, set_flash, take_flash,
    },
    models::{CurrentStore, Store},
    state::AppState,
};

use super::{Layout, render};

/// Longest store name.
pub const STORE_NAME_MAX: usize = 100;

/// Store view for the picker.
#[derive(Debug, Clone)]
pub struct StoreView {
    pub id: i32,
    pub name: String,
    pub selected: bool,
}

/// Store picker template.
#[derive(Template)]
#[template(path = "stores/select.html")]
pub struct SelectStoreTemplate {
    pub layout: Layout,
    pub stores: Vec<StoreView>,
    pub error: Option<String>,
    pub new_name: String,
}

/// Form input for selecting a store.
#[derive(Debug, Deserialize)]
pub struct SelectStoreInput {
    #[serde(default)]
    pub store_id: String,
}

/// Form input for creating a store.
#[derive(Debug, Deserialize)]
pub struct CreateStoreInput {
    #[serde(default)]
    pub name: String,
}

async fn picker(
    state: &AppState,
    session: &Session,
    current: Option<&CurrentStore>,
    error: Option<String>,
    new_name: String,
) -> Result<SelectStoreTemplate, AppError> {
    let stores = StoreRepository::new(state.pool()).list().await?;

    // A store removed from the database stays in old sessions
    let current = current.filter(|c| stores.iter().any(|s| s.id == c.id));
    if current.is_none() {
        clear_current_store(session).await?;
    }

    Ok(SelectStoreTemplate {
        layout: Layout {
            store_name: current.map(|s| s.name.clone()),
            current_path: "/stores/select",
            flash: take_flash(session).await,
        },
        stores: stores
            .iter()
            .map(|s| StoreView {
                id: s.id.as_i32(),
                name: s.name.clone(),
                selected: current.is_some_and(|c| c.id == s.id),
            })
            .collect(),
        error,
        new_name,
    })
}

async fn select_store(session: &Session, store: &Store) -> Result<(), AppError> {
    let current = CurrentStore::from(store);
    set_current_store(session, &current).await?;
    set_sentry_store(store.id.as_i32(), &store.name);
    tracing::info!(store_id = %store.id, store_name = %store.name, "Store selected");
    Ok(())
}

/// Store picker page handler.
#[instrument(skip(current, state, session))]
pub async fn select_page(
    OptionalStore(current): OptionalStore,
    State(state): State<AppState>,
    session: Session,
) -> Result<Response, AppError> {
    let template = picker(&state, &session, current.as_ref(), None, String::new()).await?;
    Ok(render(&template).into_response())
}

/// Select store handler.
#[instrument(skip(current, state, session))]
pub async fn select(
    OptionalStore(current): OptionalStore,
    State(state): State<AppState>,
    session: Session,
    Form(input): Form<SelectStoreInput>,
) -> Result<Response, AppError> {
    let store = match input.store_id.trim().parse::<i32>() {
        Ok(id) => StoreRepository::new(state.pool()).get(StoreId::new(id)).await?,
        Err(_) => None,
    };

    let Some(store) = store else {
        let message = "Choose one of the listed stores".to_string();
        return rejected(&state, &session, current.as_ref(), message, String::new()).await;
    };

    select_store(&session, &store).await?;
    Ok(Redirect::to("/").into_response())
}

/// Validate a store name, returning the trimmed name.
fn validate_name(name: &str) -> Result<&str, String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("store name is required".to_string());
    }
    if name.chars().count() > STORE_NAME_MAX {
        return Err(format!(
            "store name must be at most {STORE_NAME_MAX} characters"
        ));
    }
    Ok(name)
}

/// Re-render the picker with a message.
async fn rejected(
    state: &AppState,
    session: &Session,
    current: Option<&CurrentStore>,
    message: String,
    new_name: String,
) -> Result<Response, AppError> {
    let template = picker(state, session, current, Some(message), new_name).await?;
    Ok((StatusCode::UNPROCESSABLE_ENTITY, render(&template)).into_response())
}

/// Create store handler. The new store becomes the selected one.
#[instrument(skip(current, state, session))]
pub async fn create(
    OptionalStore(current): OptionalStore,
    State(state): State<AppState>,
    session: Session,
    Form(input): Form<CreateStoreInput>,
) -> Result<Response, AppError> {
    let name = match validate_name(&input.name) {
        Ok(name) => name,
        Err(message) => {
            let name = input.name.clone();
            return rejected(&state, &session, current.as_ref(), message, name).await;
        }
    };

    match StoreRepository::new(state.pool()).create(name).await {
        Ok(store) => {
            tracing::info!(store_id = %store.id, store_name = %store.name, "Store created");
            select_store(&session, &store).await?;
            set_flash(&session, format!("Store \"{}\" created", store.name)).await?;
            Ok(Redirect::to("/").into_response())
        }
        Err(RepositoryError::Conflict(message)) => {
            let name = name.to_string();
            rejected(&state, &session, current.as_ref(), message, name).await
        }
        Err(e) => Err(e.into()),
    }
}
