//! Roll call for caretakers, count history and alert review for administrators

use actix_web::{web, HttpResponse};
use std::sync::Arc;

use crate::AppState;
use crate::auth::{AdminSession, CaretakerSession};
use crate::error::{ApiError, ApiResult};
use crate::handlers::{ApiResponse, PaginatedResponse, PaginationQuery};
use crate::models::*;
use crate::reconciliation;

/// Counts joined with their caretaker and alert; callers append WHERE/ORDER BY.
pub(crate) const COUNT_REPORT_SELECT: &str = r#"
    SELECT c.id, c.counted_at, c.expected_count, c.observed_count, c.user_id,
           u.username AS caretaker,
           a.id AS alert_id, a.message AS alert_message, a.resolved AS alert_resolved
    FROM counts c
    JOIN users u ON u.id = c.user_id
    LEFT JOIN alerts a ON a.count_id = c.id
"#;

const ALERT_VIEW_SELECT: &str = r#"
    SELECT a.id, a.message, a.resolved, a.count_id, c.counted_at, u.username AS caretaker
    FROM alerts a
    JOIN counts c ON c.id = a.count_id
    JOIN users u ON u.id = c.user_id
"#;

// ==================== ROLL CALL ====================

/// In-herd animals to check, in identity order.
pub async fn get_roster(
    _session: CaretakerSession,
    app_state: web::Data<Arc<AppState>>,
) -> ApiResult<HttpResponse> {
    let roster = reconciliation::roster(&app_state.db_pool).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(roster)))
}

pub async fn submit_roll_call(
    session: CaretakerSession,
    app_state: web::Data<Arc<AppState>>,
    body: web::Json<RollCallSubmission>,
) -> ApiResult<HttpResponse> {
    let outcome = reconciliation::record_count(
        &app_state.db_pool,
        session.0.user_id,
        &body.present,
        app_state.config.roll_call.reject_unknown_animals,
    )
    .await?;

    let message = outcome.notice();
    Ok(HttpResponse::Created().json(ApiResponse::success_with_message(outcome, message)))
}

// ==================== COUNTS ====================

/// Count history, newest first.
pub async fn get_counts(
    _session: AdminSession,
    app_state: web::Data<Arc<AppState>>,
    query: web::Query<PaginationQuery>,
) -> ApiResult<HttpResponse> {
    let (page, per_page, offset) = query.normalize();

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM counts")
        .fetch_one(&app_state.db_pool)
        .await?;

    let sql = format!(
        "{} ORDER BY c.counted_at DESC, c.id DESC LIMIT ? OFFSET ?",
        COUNT_REPORT_SELECT
    );
    let counts = sqlx::query_as::<_, CountReport>(&sql)
        .bind(per_page)
        .bind(offset)
        .fetch_all(&app_state.db_pool)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(PaginatedResponse::new(
        counts, total, page, per_page,
    ))))
}

pub async fn get_count(
    _session: AdminSession,
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let sql = format!("{} WHERE c.id = ?", COUNT_REPORT_SELECT);
    let count = sqlx::query_as::<_, CountReport>(&sql)
        .bind(path.into_inner())
        .fetch_optional(&app_state.db_pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Count"))?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(count)))
}

// ==================== ALERTS ====================

/// Unresolved alerts newest first; `include_resolved=true` lists all of them.
pub async fn get_alerts(
    _session: AdminSession,
    app_state: web::Data<Arc<AppState>>,
    query: web::Query<PaginationQuery>,
    filter: web::Query<AlertListQuery>,
) -> ApiResult<HttpResponse> {
    let (page, per_page, offset) = query.normalize();
    let where_clause = if filter.include_resolved { "" } else { " WHERE a.resolved = 0" };

    let count_sql = format!("SELECT COUNT(*) FROM alerts a{}", where_clause);
    let total: i64 = sqlx::query_scalar(&count_sql)
        .fetch_one(&app_state.db_pool)
        .await?;

    let sql = format!(
        "{}{} ORDER BY a.id DESC LIMIT ? OFFSET ?",
        ALERT_VIEW_SELECT, where_clause
    );
    let alerts = sqlx::query_as::<_, AlertView>(&sql)
        .bind(per_page)
        .bind(offset)
        .fetch_all(&app_state.db_pool)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(PaginatedResponse::new(
        alerts, total, page, per_page,
    ))))
}

/// Marks an alert resolved. Resolving an already resolved alert succeeds.
pub async fn resolve_alert(
    session: AdminSession,
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let alert_id = path.into_inner();

    let result = sqlx::query("UPDATE alerts SET resolved = 1 WHERE id = ?")
        .bind(alert_id)
        .execute(&app_state.db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Alert"));
    }

    let alert = sqlx::query_as::<_, Alert>("SELECT * FROM alerts WHERE id = ?")
        .bind(alert_id)
        .fetch_one(&app_state.db_pool)
        .await?;

    log::info!("Alert {} resolved by {}", alert_id, session.0.username);
    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        alert,
        "Alert resolved.".to_string(),
    )))
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::test;
    use serde_json::{json, Value};

    use crate::auth::UserRole;
    use crate::reconciliation::ALL_PRESENT_NOTICE;
    use crate::testing::{bearer, test_app, test_config, TestContext};

    #[actix_rt::test]
    async fn test_roll_call_raises_and_resolves_alert() {
        let ctx = TestContext::new().await;
        let (_, admin) = ctx.user("admin", UserRole::Administrator).await;
        let (_, caretaker) = ctx.user("rosa", UserRole::Caretaker).await;
        let a1 = ctx.animal("VAC-001", "InHerd").await;
        ctx.animal("VAC-002", "InHerd").await;
        let a3 = ctx.animal("VAC-003", "InHerd").await;
        ctx.animal("VAC-004", "Inactive").await;
        let app = test_app!(ctx);

        let req = test::TestRequest::get()
            .uri("/api/v1/roll-call")
            .insert_header(bearer(&caretaker))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 3);

        let req = test::TestRequest::post()
            .uri("/api/v1/roll-call")
            .insert_header(bearer(&caretaker))
            .set_json(json!({ "present": [a1, a3] }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Count discrepancy. 1 animals missing: VAC-002");
        assert_eq!(body["data"]["count"]["expected_count"], 3);
        assert_eq!(body["data"]["count"]["observed_count"], 2);
        let alert_id = body["data"]["alert"]["id"].as_i64().unwrap();

        let req = test::TestRequest::get()
            .uri("/api/v1/alerts")
            .insert_header(bearer(&admin))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["total"], 1);
        assert_eq!(body["data"]["data"][0]["caretaker"], "rosa");

        for _ in 0..2 {
            let req = test::TestRequest::post()
                .uri(&format!("/api/v1/alerts/{}/resolve", alert_id))
                .insert_header(bearer(&admin))
                .to_request();
            let body: Value = test::call_and_read_body_json(&app, req).await;
            assert_eq!(body["data"]["resolved"], true);
        }

        let req = test::TestRequest::get()
            .uri("/api/v1/alerts")
            .insert_header(bearer(&admin))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["total"], 0);

        let req = test::TestRequest::get()
            .uri("/api/v1/alerts?include_resolved=true")
            .insert_header(bearer(&admin))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["total"], 1);
    }

    #[actix_rt::test]
    async fn test_counts_listed_newest_first() {
        let ctx = TestContext::new().await;
        let (_, admin) = ctx.user("admin", UserRole::Administrator).await;
        let (_, caretaker) = ctx.user("rosa", UserRole::Caretaker).await;
        let a1 = ctx.animal("VAC-001", "InHerd").await;
        let app = test_app!(ctx);

        for present in [json!([]), json!([a1])] {
            let req = test::TestRequest::post()
                .uri("/api/v1/roll-call")
                .insert_header(bearer(&caretaker))
                .set_json(json!({ "present": present }))
                .to_request();
            test::call_service(&app, req).await;
        }

        let req = test::TestRequest::get()
            .uri("/api/v1/counts")
            .insert_header(bearer(&admin))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["total"], 2);
        let latest = &body["data"]["data"][0];
        assert_eq!(latest["observed_count"], 1);
        assert!(latest["alert_id"].is_null());
        let older = &body["data"]["data"][1];
        assert_eq!(older["observed_count"], 0);
        assert!(older["alert_id"].is_i64());

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/counts/{}", older["id"]))
            .insert_header(bearer(&admin))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["caretaker"], "rosa");

        let req = test::TestRequest::get()
            .uri("/api/v1/counts/999")
            .insert_header(bearer(&admin))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_rt::test]
    async fn test_all_present_notice_and_missing_body() {
        let ctx = TestContext::new().await;
        let (_, caretaker) = ctx.user("rosa", UserRole::Caretaker).await;
        let app = test_app!(ctx);

        // No animals and no "present" field: empty against empty
        let req = test::TestRequest::post()
            .uri("/api/v1/roll-call")
            .insert_header(bearer(&caretaker))
            .set_json(json!({}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], ALL_PRESENT_NOTICE);
        assert_eq!(body["data"]["count"]["expected_count"], 0);
        assert!(body["data"]["alert"].is_null());
    }

    #[actix_rt::test]
    async fn test_roll_call_is_caretaker_only() {
        let ctx = TestContext::new().await;
        let (_, admin) = ctx.user("admin", UserRole::Administrator).await;
        let (_, caretaker) = ctx.user("rosa", UserRole::Caretaker).await;
        let app = test_app!(ctx);

        let req = test::TestRequest::post()
            .uri("/api/v1/roll-call")
            .insert_header(bearer(&admin))
            .set_json(json!({ "present": [] }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);

        let req = test::TestRequest::get()
            .uri("/api/v1/alerts")
            .insert_header(bearer(&caretaker))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);

        let counts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM counts")
            .fetch_one(&ctx.state.db_pool)
            .await
            .unwrap();
        assert_eq!(counts, 0);
    }

    #[actix_rt::test]
    async fn test_strict_roster_rejects_unknown_animals() {
        let mut config = test_config();
        config.roll_call.reject_unknown_animals = true;
        let ctx = TestContext::with_config(config).await;
        let (_, caretaker) = ctx.user("rosa", UserRole::Caretaker).await;
        let a1 = ctx.animal("VAC-001", "InHerd").await;
        let app = test_app!(ctx);

        let req = test::TestRequest::post()
            .uri("/api/v1/roll-call")
            .insert_header(bearer(&caretaker))
            .set_json(json!({ "present": [a1, 4242] }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let counts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM counts")
            .fetch_one(&ctx.state.db_pool)
            .await
            .unwrap();
        assert_eq!(counts, 0);
    }

    #[actix_rt::test]
    async fn test_resolving_unknown_alert_is_not_found() {
        let ctx = TestContext::new().await;
        let (_, admin) = ctx.user("admin", UserRole::Administrator).await;
        let app = test_app!(ctx);

        let req = test::TestRequest::post()
            .uri("/api/v1/alerts/77/resolve")
            .insert_header(bearer(&admin))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_rt::test]
    async fn test_deleted_caretaker_is_sent_to_login() {
        let ctx = TestContext::new().await;
        let (rosa, caretaker) = ctx.user("rosa", UserRole::Caretaker).await;
        ctx.animal("VAC-001", "InHerd").await;
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(rosa.id)
            .execute(&ctx.state.db_pool)
            .await
            .unwrap();
        let app = test_app!(ctx);

        let req = test::TestRequest::post()
            .uri("/api/v1/roll-call")
            .insert_header(bearer(&caretaker))
            .set_json(json!({ "present": [] }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);

        let counts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM counts")
            .fetch_one(&ctx.state.db_pool)
            .await
            .unwrap();
        assert_eq!(counts, 0);
    }
}
