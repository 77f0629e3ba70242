use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use super::models::NewSession;
use super::service::GameService;
use super::types::{
    validate_username, ApiResponse, HistoryData, HistoryQuery, LeaderboardQuery, PlayerStatsData,
    PlayerSummary, SubmitGameData, SubmitGameRequest,
};
use crate::shared::{AppError, AppState, FieldError};

/// HTTP handler for submitting a finished round
///
/// POST /game/submit
#[instrument(name = "submit_game", skip(state, payload))]
pub async fn submit_game(
    State(state): State<AppState>,
    payload: Result<Json<SubmitGameRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<SubmitGameData>>, AppError> {
    let Json(request) = payload.map_err(|rejection| {
        AppError::Validation(vec![FieldError::new("body", rejection.body_text())])
    })?;
    request
        .validate()
        .map_err(AppError::from_validation_errors)?;

    let service = GameService::new(Arc::clone(&state.game_repository));
    let round = NewSession {
        player_choice: request.player_choice,
        computer_choice: request.computer_choice,
        result: request.result,
        session_duration: request.session_duration,
    };
    let data = service.submit_result(&request.username, round).await?;

    let message = if data.is_new_user {
        "New player created and game recorded"
    } else {
        "Game result recorded"
    };
    info!(username = %request.username, is_new_user = data.is_new_user, "Submission accepted");

    Ok(Json(ApiResponse::with_message(message, data)))
}

/// HTTP handler for the leaderboard
///
/// GET /game/leaderboard?limit=N
#[instrument(name = "get_leaderboard", skip(state))]
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<ApiResponse<Vec<PlayerSummary>>>, AppError> {
    let service = GameService::new(Arc::clone(&state.game_repository));
    let players = service.get_leaderboard(query.limit()).await?;
    Ok(Json(ApiResponse::ok(players)))
}

/// HTTP handler for a player's aggregate stats and streaks
///
/// GET /game/player/:username
#[instrument(name = "get_player_stats", skip(state))]
pub async fn get_player_stats(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<ApiResponse<PlayerStatsData>>, AppError> {
    validate_username(&username)?;

    let service = GameService::new(Arc::clone(&state.game_repository));
    let stats = service.get_player_stats(&username).await?;
    Ok(Json(ApiResponse::ok(stats)))
}

/// HTTP handler for a player's paginated session history
///
/// GET /game/player/:username/history?page=&limit=
#[instrument(name = "get_player_history", skip(state))]
pub async fn get_player_history(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<HistoryData>>, AppError> {
    validate_username(&username)?;

    let service = GameService::new(Arc::clone(&state.game_repository));
    let history = service
        .get_player_history(&username, query.page(), query.limit())
        .await?;
    Ok(Json(ApiResponse::ok(history)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::repository::InMemoryGameRepository;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        routing::{get, post},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt; // for `oneshot`

    fn test_app() -> Router {
        let game_repository = Arc::new(InMemoryGameRepository::new());
        let app_state = AppState::new(game_repository);

        Router::new()
            .route("/game/submit", post(submit_game))
            .route("/game/leaderboard", get(get_leaderboard))
            .route("/game/player/:username", get(get_player_stats))
            .route("/game/player/:username/history", get(get_player_history))
            .with_state(app_state)
    }

    fn submit_request(body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/game/submit")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn winning_submission(username: &str) -> Value {
        json!({
            "username": username,
            "result": "win",
            "player_choice": "rock",
            "computer_choice": "scissors",
            "session_duration": 25
        })
    }

    #[tokio::test]
    async fn submit_records_round_and_reports_new_player() {
        let app = test_app();

        let response = app
            .clone()
            .oneshot(submit_request(&winning_submission("fresh_player")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["message"], json!("New player created and game recorded"));
        assert_eq!(body["data"]["is_new_user"], json!(true));
        assert_eq!(body["data"]["user"]["wins"], json!(1));
        assert_eq!(body["data"]["game_session"]["result"], json!("win"));

        let response = app
            .oneshot(submit_request(&winning_submission("fresh_player")))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["message"], json!("Game result recorded"));
        assert_eq!(body["data"]["is_new_user"], json!(false));
        assert_eq!(body["data"]["user"]["total_games"], json!(2));
    }

    #[tokio::test]
    async fn invalid_username_yields_field_errors() {
        let app = test_app();

        let mut body = winning_submission("x");
        body["username"] = json!("x!");
        let response = app.oneshot(submit_request(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["message"], json!("Validation failed"));
        let errors = body["errors"].as_array().unwrap();
        assert!(errors.iter().all(|e| e["field"] == json!("username")));
        assert_eq!(errors.len(), 2);
    }

    #[tokio::test]
    async fn unknown_choice_value_is_a_bad_request() {
        let app = test_app();

        let mut body = winning_submission("someone");
        body["player_choice"] = json!("lizard");
        let response = app.oneshot(submit_request(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["success"], json!(false));
    }

    #[tokio::test]
    async fn unknown_player_is_not_found() {
        let app = test_app();

        let request = Request::builder()
            .uri("/game/player/stranger")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(response).await;
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["message"], json!("Player not found"));
    }

    #[tokio::test]
    async fn malformed_path_username_is_rejected_before_lookup() {
        let app = test_app();

        let request = Request::builder()
            .uri("/game/player/a!/history")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn non_numeric_limit_falls_back_to_default() {
        let app = test_app();

        app.clone()
            .oneshot(submit_request(&winning_submission("casual")))
            .await
            .unwrap();

        let request = Request::builder()
            .uri("/game/leaderboard?limit=abc")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let request = Request::builder()
            .uri("/game/player/casual/history?page=abc&limit=xyz")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["pagination"]["page"], json!(1));
        assert_eq!(body["data"]["pagination"]["limit"], json!(20));
    }

    #[tokio::test]
    async fn leaderboard_returns_player_summaries() {
        let app = test_app();

        app.clone()
            .oneshot(submit_request(&winning_submission("top_dog")))
            .await
            .unwrap();

        let request = Request::builder()
            .uri("/game/leaderboard?limit=5")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["success"], json!(true));
        let entries = body["data"].as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["username"], json!("top_dog"));
        assert_eq!(entries[0]["win_rate"], json!(100.0));
    }
}
