use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::Path;
use axum::routing::{get, patch, post};
use axum::{middleware, Extension, Json, Router};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::auth::SessionProvider;
use crate::domain::{
    ChoiceRecord, ContestSettings, ExpandedBet, LineWithChoices, NewLine, ProgressReport,
    ScoredBet, UserId, UserRecord,
};
use crate::picks::{AdminUser, Leaderboard, PicksService};

use super::dto::{
    DisplayNameRequest, ProfileResponse, SubmitBetsRequest, UpdateChoiceWinStatusRequest,
    UpdatePaymentRequest, UpdateSettingsRequest,
};
use super::error::ApiError;
use super::extract::CurrentUser;
use super::logging::log_requests;

#[derive(Clone)]
pub struct ServerContext {
    pub picks: Arc<dyn PicksService>,
    pub sessions: Arc<dyn SessionProvider>,
}

pub struct PicksServer {
    router: Router,
}

impl PicksServer {
    pub fn new(picks: Arc<dyn PicksService>, sessions: Arc<dyn SessionProvider>) -> Self {
        let context = Arc::new(ServerContext { picks, sessions });

        let router = Router::new()
            .route("/health", get(health))
            .route("/auth/user", get(get_current_user))
            .route("/auth/user/display-name", post(set_display_name))
            .route("/lines", get(list_lines))
            .route("/bets", get(list_bets).post(submit_bets))
            .route("/progress", get(get_progress))
            .route("/settings", get(get_settings).patch(update_settings))
            .route("/leaderboard/users", get(get_leaderboard))
            .route("/admin/lines", post(create_line))
            .route(
                "/admin/win-status/update-choice",
                post(update_choice_win_status),
            )
            .route("/admin/users", get(list_admin_users))
            .route("/admin/users/:user_id/payment", patch(update_payment))
            .layer(Extension(context))
            .layer(middleware::from_fn(log_requests))
            .layer(CorsLayer::permissive());

        Self { router }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn into_router(self) -> Router {
        self.router
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn get_current_user(
    Extension(ctx): Extension<Arc<ServerContext>>,
    CurrentUser(identity): CurrentUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = ctx.picks.profile(&identity).await?;
    Ok(Json(ProfileResponse::from_domain(user, &identity)))
}

async fn set_display_name(
    Extension(ctx): Extension<Arc<ServerContext>>,
    CurrentUser(identity): CurrentUser,
    body: Result<Json<DisplayNameRequest>, JsonRejection>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let Json(request) = body?;
    let user = ctx
        .picks
        .set_display_name(&identity, &request.display_name)
        .await?;
    Ok(Json(ProfileResponse::from_domain(user, &identity)))
}

async fn list_lines(
    Extension(ctx): Extension<Arc<ServerContext>>,
    CurrentUser(_identity): CurrentUser,
) -> Result<Json<Vec<LineWithChoices>>, ApiError> {
    Ok(Json(ctx.picks.list_lines().await?))
}

async fn list_bets(
    Extension(ctx): Extension<Arc<ServerContext>>,
    CurrentUser(identity): CurrentUser,
) -> Result<Json<Vec<ScoredBet>>, ApiError> {
    Ok(Json(ctx.picks.list_bets(&identity).await?))
}

async fn submit_bets(
    Extension(ctx): Extension<Arc<ServerContext>>,
    CurrentUser(identity): CurrentUser,
    body: Result<Json<SubmitBetsRequest>, JsonRejection>,
) -> Result<Json<Vec<ExpandedBet>>, ApiError> {
    let Json(request) = body?;
    Ok(Json(
        ctx.picks.submit_bets(&identity, request.choice_ids).await?,
    ))
}

async fn get_progress(
    Extension(ctx): Extension<Arc<ServerContext>>,
    CurrentUser(identity): CurrentUser,
) -> Result<Json<ProgressReport>, ApiError> {
    Ok(Json(ctx.picks.progress(&identity).await?))
}

async fn get_settings(
    Extension(ctx): Extension<Arc<ServerContext>>,
    CurrentUser(_identity): CurrentUser,
) -> Result<Json<ContestSettings>, ApiError> {
    Ok(Json(ctx.picks.settings().await?))
}

async fn update_settings(
    Extension(ctx): Extension<Arc<ServerContext>>,
    CurrentUser(identity): CurrentUser,
    body: Result<Json<UpdateSettingsRequest>, JsonRejection>,
) -> Result<Json<ContestSettings>, ApiError> {
    let Json(request) = body?;
    Ok(Json(
        ctx.picks
            .update_settings(&identity, ContestSettings::from(request))
            .await?,
    ))
}

async fn get_leaderboard(
    Extension(ctx): Extension<Arc<ServerContext>>,
    CurrentUser(identity): CurrentUser,
) -> Result<Json<Leaderboard>, ApiError> {
    Ok(Json(ctx.picks.leaderboard(&identity).await?))
}

async fn create_line(
    Extension(ctx): Extension<Arc<ServerContext>>,
    CurrentUser(identity): CurrentUser,
    body: Result<Json<NewLine>, JsonRejection>,
) -> Result<Json<LineWithChoices>, ApiError> {
    // Authorize before looking at the payload.
    identity.require_admin()?;
    let Json(line) = body?;
    Ok(Json(ctx.picks.create_line(&identity, line).await?))
}

async fn update_choice_win_status(
    Extension(ctx): Extension<Arc<ServerContext>>,
    CurrentUser(identity): CurrentUser,
    body: Result<Json<UpdateChoiceWinStatusRequest>, JsonRejection>,
) -> Result<Json<ChoiceRecord>, ApiError> {
    identity.require_admin()?;
    let Json(request) = body?;
    let choice = ctx
        .picks
        .update_win_status(&identity, request.choice_id, request.status())
        .await?;
    Ok(Json(choice))
}

async fn list_admin_users(
    Extension(ctx): Extension<Arc<ServerContext>>,
    CurrentUser(identity): CurrentUser,
) -> Result<Json<Vec<AdminUser>>, ApiError> {
    Ok(Json(ctx.picks.admin_users(&identity).await?))
}

async fn update_payment(
    Extension(ctx): Extension<Arc<ServerContext>>,
    CurrentUser(identity): CurrentUser,
    user_id: Result<Path<UserId>, PathRejection>,
    body: Result<Json<UpdatePaymentRequest>, JsonRejection>,
) -> Result<Json<UserRecord>, ApiError> {
    identity.require_admin()?;
    let Path(user_id) = user_id?;
    let Json(request) = body?;
    Ok(Json(
        ctx.picks
            .set_payment(&identity, user_id, request.has_paid)
            .await?,
    ))
}
