//! Role landing screens

use actix_web::{web, HttpResponse};
use std::sync::Arc;

use crate::AppState;
use crate::auth::{AdminSession, CaretakerSession};
use crate::count_handlers::COUNT_REPORT_SELECT;
use crate::error::ApiResult;
use crate::handlers::ApiResponse;
use crate::models::{AdminDashboard, AnimalStatus, CaretakerDashboard, Count, CountReport};

const RECENT_COUNTS: i64 = 5;

pub async fn admin_dashboard(
    _session: AdminSession,
    app_state: web::Data<Arc<AppState>>,
) -> ApiResult<HttpResponse> {
    let pool = &app_state.db_pool;

    let active_animals: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM animals WHERE status != ?")
        .bind(AnimalStatus::INACTIVE)
        .fetch_one(pool)
        .await?;

    let in_herd_animals: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM animals WHERE status = ?")
        .bind(AnimalStatus::IN_HERD)
        .fetch_one(pool)
        .await?;

    let unresolved_alerts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM alerts WHERE resolved = 0")
        .fetch_one(pool)
        .await?;

    let total_counts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM counts")
        .fetch_one(pool)
        .await?;

    let latest_sql = format!(
        "{} ORDER BY c.counted_at DESC, c.id DESC LIMIT 1",
        COUNT_REPORT_SELECT
    );
    let latest_count = sqlx::query_as::<_, CountReport>(&latest_sql)
        .fetch_optional(pool)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(AdminDashboard {
        active_animals,
        in_herd_animals,
        unresolved_alerts,
        total_counts,
        latest_count,
    })))
}

pub async fn caretaker_dashboard(
    session: CaretakerSession,
    app_state: web::Data<Arc<AppState>>,
) -> ApiResult<HttpResponse> {
    let pool = &app_state.db_pool;

    let roster_size: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM animals WHERE status = ?")
        .bind(AnimalStatus::IN_HERD)
        .fetch_one(pool)
        .await?;

    let recent_counts = sqlx::query_as::<_, Count>(
        "SELECT * FROM counts WHERE user_id = ? ORDER BY counted_at DESC, id DESC LIMIT ?",
    )
        .bind(session.0.user_id)
        .bind(RECENT_COUNTS)
        .fetch_all(pool)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(CaretakerDashboard {
        roster_size,
        recent_counts,
    })))
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::test;
    use serde_json::Value;

    use crate::auth::UserRole;
    use crate::reconciliation;
    use crate::testing::{bearer, test_app, TestContext};

    #[actix_rt::test]
    async fn test_dashboards_reflect_latest_count() {
        let ctx = TestContext::new().await;
        let (_, admin) = ctx.user("admin", UserRole::Administrator).await;
        let (rosa, rosa_token) = ctx.user("rosa", UserRole::Caretaker).await;
        let a1 = ctx.animal("VAC-001", "InHerd").await;
        ctx.animal("VAC-002", "InHerd").await;
        ctx.animal("VAC-003", "Sold").await;
        ctx.animal("VAC-004", "Inactive").await;
        reconciliation::record_count(&ctx.state.db_pool, rosa.id, &[a1], false)
            .await
            .unwrap();
        let app = test_app!(ctx);

        let req = test::TestRequest::get()
            .uri("/dashboard/admin")
            .insert_header(bearer(&admin))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let data = &body["data"];
        assert_eq!(data["active_animals"], 3);
        assert_eq!(data["in_herd_animals"], 2);
        assert_eq!(data["unresolved_alerts"], 1);
        assert_eq!(data["total_counts"], 1);
        assert_eq!(data["latest_count"]["caretaker"], "rosa");
        assert_eq!(data["latest_count"]["alert_message"], "Count discrepancy. 1 animals missing: VAC-002");

        let req = test::TestRequest::get()
            .uri("/dashboard/caretaker")
            .insert_header(bearer(&rosa_token))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["roster_size"], 2);
        assert_eq!(body["data"]["recent_counts"].as_array().unwrap().len(), 1);

        let req = test::TestRequest::get()
            .uri("/dashboard/admin")
            .insert_header(bearer(&rosa_token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    }
}
