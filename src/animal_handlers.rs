//! Animal screens: active listing, code generation on create, soft delete

use actix_web::{web, HttpResponse};
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use validator::Validate;

use crate::AppState;
use crate::auth::AdminSession;
use crate::error::{ApiError, ApiResult};
use crate::handlers::{ApiResponse, PaginatedResponse, PaginationQuery};
use crate::models::*;
use crate::repositories::{merge_optional, merge_required, TreatmentRepository};

async fn find_animal(pool: &SqlitePool, id: i64) -> ApiResult<Animal> {
    sqlx::query_as::<_, Animal>("SELECT * FROM animals WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Animal"))
}

/// Stores a new animal under the next code for its type.
///
/// The per-type count (inactive animals included) is taken by the INSERT
/// itself, under the write lock, so concurrent creations of one type receive
/// consecutive codes. A computed code that already exists (two types sharing
/// a prefix) is a conflict.
pub async fn insert_animal(pool: &SqlitePool, data: &CreateAnimalRequest) -> ApiResult<Animal> {
    let animal_type = data.animal_type.trim();
    let prefix = code_prefix(animal_type);
    let status = data
        .status
        .as_deref()
        .map(AnimalStatus::parse)
        .unwrap_or_default();
    let name = data
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());

    let now = Utc::now();
    let id = sqlx::query(
        r#"INSERT INTO animals (code, animal_type, name, status, created_at, updated_at)
           SELECT ? || '-' || printf('%03d', COUNT(*) + 1), ?, ?, ?, ?, ?
           FROM animals WHERE animal_type = ?"#,
    )
        .bind(&prefix)
        .bind(animal_type)
        .bind(name)
        .bind(status.as_str())
        .bind(now)
        .bind(now)
        .bind(animal_type)
        .execute(pool)
        .await
        .map_err(|e| {
            ApiError::from_write(
                e,
                format!("Could not create the animal: the next {} code is already in use.", prefix),
            )
        })?
        .last_insert_rowid();

    find_animal(pool, id).await
}

/// Animals that are not soft-deleted, newest first.
pub async fn get_animals(
    _session: AdminSession,
    app_state: web::Data<Arc<AppState>>,
    query: web::Query<PaginationQuery>,
) -> ApiResult<HttpResponse> {
    let (page, per_page, offset) = query.normalize();
    let pattern = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", s));

    let filter = if pattern.is_some() {
        "status != ? AND (code LIKE ? OR animal_type LIKE ? OR name LIKE ?)"
    } else {
        "status != ?"
    };

    let count_sql = format!("SELECT COUNT(*) FROM animals WHERE {}", filter);
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql).bind(AnimalStatus::INACTIVE);
    if let Some(ref p) = pattern {
        count_query = count_query.bind(p).bind(p).bind(p);
    }
    let total = count_query.fetch_one(&app_state.db_pool).await?;

    let select_sql = format!(
        "SELECT * FROM animals WHERE {} ORDER BY id DESC LIMIT ? OFFSET ?",
        filter
    );
    let mut select_query = sqlx::query_as::<_, Animal>(&select_sql).bind(AnimalStatus::INACTIVE);
    if let Some(ref p) = pattern {
        select_query = select_query.bind(p).bind(p).bind(p);
    }
    let animals = select_query
        .bind(per_page)
        .bind(offset)
        .fetch_all(&app_state.db_pool)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(PaginatedResponse::new(
        animals, total, page, per_page,
    ))))
}

pub async fn get_animal(
    _session: AdminSession,
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let animal = find_animal(&app_state.db_pool, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(animal)))
}

pub async fn create_animal(
    session: AdminSession,
    app_state: web::Data<Arc<AppState>>,
    body: web::Json<CreateAnimalRequest>,
) -> ApiResult<HttpResponse> {
    body.validate()?;

    let animal = insert_animal(&app_state.db_pool, &body).await?;

    log::info!("Animal {} ({}) created by {}", animal.code, animal.animal_type, session.0.username);
    let message = format!("Animal {} created successfully.", animal.code);
    Ok(HttpResponse::Created().json(ApiResponse::success_with_message(animal, message)))
}

/// Edits type, name or status. The code assigned at creation never changes.
pub async fn update_animal(
    session: AdminSession,
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<i64>,
    body: web::Json<UpdateAnimalRequest>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let data = body.into_inner();
    data.validate()?;

    let current = find_animal(&app_state.db_pool, id).await?;
    let status = match data.status {
        Some(ref s) => AnimalStatus::parse(s).as_str().to_string(),
        None => current.status,
    };

    sqlx::query(
        "UPDATE animals SET animal_type = ?, name = ?, status = ?, updated_at = ? WHERE id = ?",
    )
        .bind(merge_required(data.animal_type, current.animal_type))
        .bind(merge_optional(data.name, current.name))
        .bind(&status)
        .bind(Utc::now())
        .bind(id)
        .execute(&app_state.db_pool)
        .await?;

    let animal = find_animal(&app_state.db_pool, id).await?;
    log::info!("Animal {} updated by {}", animal.code, session.0.username);
    let message = format!("Animal {} updated successfully.", animal.code);
    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(animal, message)))
}

/// Soft delete: the row stays, marked inactive.
pub async fn delete_animal(
    session: AdminSession,
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let animal = find_animal(&app_state.db_pool, path.into_inner()).await?;

    sqlx::query("UPDATE animals SET status = ?, updated_at = ? WHERE id = ?")
        .bind(AnimalStatus::INACTIVE)
        .bind(Utc::now())
        .bind(animal.id)
        .execute(&app_state.db_pool)
        .await?;

    log::info!("Animal {} marked inactive by {}", animal.code, session.0.username);
    Ok(HttpResponse::Ok().json(ApiResponse::message(format!(
        "Animal {} has been removed.",
        animal.code
    ))))
}

pub async fn get_animal_treatments(
    _session: AdminSession,
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let animal = find_animal(&app_state.db_pool, path.into_inner()).await?;
    let treatments = TreatmentRepository
        .list_for_animal(&app_state.db_pool, animal.id)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(treatments)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{file_pool, test_pool};

    fn request(animal_type: &str) -> CreateAnimalRequest {
        CreateAnimalRequest {
            animal_type: animal_type.to_string(),
            name: None,
            status: None,
        }
    }

    #[actix_rt::test]
    async fn test_codes_follow_per_type_sequence() {
        let pool = test_pool().await;

        let first = insert_animal(&pool, &request("Vaca")).await.unwrap();
        let sheep = insert_animal(&pool, &request("Oveja")).await.unwrap();
        let second = insert_animal(&pool, &request("Vaca")).await.unwrap();

        assert_eq!(first.code, "VAC-001");
        assert_eq!(sheep.code, "OVE-001");
        assert_eq!(second.code, "VAC-002");
        assert_eq!(first.status, AnimalStatus::IN_HERD);
    }

    #[actix_rt::test]
    async fn test_inactive_animals_still_advance_sequence() {
        let pool = test_pool().await;

        let first = insert_animal(&pool, &request("Vaca")).await.unwrap();
        sqlx::query("UPDATE animals SET status = 'Inactive' WHERE id = ?")
            .bind(first.id)
            .execute(&pool)
            .await
            .unwrap();

        let next = insert_animal(&pool, &request("Vaca")).await.unwrap();
        assert_eq!(next.code, "VAC-002");
    }

    #[actix_rt::test]
    async fn test_prefix_clash_is_conflict() {
        let pool = test_pool().await;

        insert_animal(&pool, &request("Vaca")).await.unwrap();
        let err = insert_animal(&pool, &request("Vacuno")).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM animals")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(total, 1);
    }

    #[actix_rt::test]
    async fn test_explicit_status_and_name_are_normalized() {
        let pool = test_pool().await;

        let animal = insert_animal(
            &pool,
            &CreateAnimalRequest {
                animal_type: " Cabra ".to_string(),
                name: Some("  ".to_string()),
                status: Some("en rebaño".to_string()),
            },
        )
            .await
            .unwrap();

        assert_eq!(animal.code, "CAB-001");
        assert_eq!(animal.animal_type, "Cabra");
        assert_eq!(animal.name, None);
        assert_eq!(animal.status, AnimalStatus::IN_HERD);
    }

    #[actix_rt::test]
    async fn test_concurrent_creation_of_one_type_gets_consecutive_codes() {
        let dir = tempfile::tempdir().unwrap();
        let pool = file_pool(&dir.path().join("herd.db"), 4).await;

        for animal_type in ["Vaca", "Toro", "Oveja", "Cabra", "Cerdo", "Burro", "Llama", "Mula"] {
            let req = request(animal_type);
            let (a, b) = tokio::join!(insert_animal(&pool, &req), insert_animal(&pool, &req));

            let mut codes = Vec::new();
            for outcome in [a, b] {
                match outcome {
                    Ok(animal) => codes.push(animal.code),
                    Err(ApiError::Conflict(_)) => {}
                    Err(other) => panic!("creating a {} failed: {}", animal_type, other),
                }
            }
            codes.sort();

            let prefix = code_prefix(animal_type);
            let expected: Vec<String> = (1..=codes.len())
                .map(|n| format!("{}-{:03}", prefix, n))
                .collect();
            assert_eq!(codes, expected);
        }

        pool.close().await;
    }

    mod http {
        use actix_web::http::{header, StatusCode};
        use actix_web::test;
        use serde_json::{json, Value};

        use crate::auth::UserRole;
        use crate::error::LOGIN_PATH;
        use crate::testing::{bearer, test_app, TestContext};

        #[actix_rt::test]
        async fn test_caretaker_cannot_delete_animal() {
            let ctx = TestContext::new().await;
            let (_, token) = ctx.user("rosa", UserRole::Caretaker).await;
            let animal_id = ctx.animal("VAC-001", "InHerd").await;
            let app = test_app!(ctx);

            let req = test::TestRequest::delete()
                .uri(&format!("/api/v1/animals/{}", animal_id))
                .insert_header(bearer(&token))
                .to_request();
            let resp = test::call_service(&app, req).await;

            assert_eq!(resp.status(), StatusCode::SEE_OTHER);
            assert_eq!(resp.headers().get(header::LOCATION).unwrap(), LOGIN_PATH);

            let status: String = sqlx::query_scalar("SELECT status FROM animals WHERE id = ?")
                .bind(animal_id)
                .fetch_one(&ctx.state.db_pool)
                .await
                .unwrap();
            assert_eq!(status, "InHerd");
        }

        #[actix_rt::test]
        async fn test_page_far_past_the_end_is_empty() {
            let ctx = TestContext::new().await;
            let (_, token) = ctx.user("admin", UserRole::Administrator).await;
            ctx.animal("VAC-001", "InHerd").await;
            let app = test_app!(ctx);

            let req = test::TestRequest::get()
                .uri(&format!("/api/v1/animals?page={}", i64::MAX))
                .insert_header(bearer(&token))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK);

            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["data"]["total"], 1);
            assert!(body["data"]["data"].as_array().unwrap().is_empty());
        }

        #[actix_rt::test]
        async fn test_listing_requires_session() {
            let ctx = TestContext::new().await;
            let app = test_app!(ctx);

            let req = test::TestRequest::get().uri("/api/v1/animals").to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::SEE_OTHER);

            let req = test::TestRequest::get()
                .uri("/api/v1/animals")
                .insert_header(bearer("not-a-token"))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        }

        #[actix_rt::test]
        async fn test_create_soft_delete_and_list() {
            let ctx = TestContext::new().await;
            let (_, token) = ctx.user("admin", UserRole::Administrator).await;
            let app = test_app!(ctx);

            let req = test::TestRequest::post()
                .uri("/api/v1/animals")
                .insert_header(bearer(&token))
                .set_json(json!({ "animal_type": "Vaca", "name": "Lola" }))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::CREATED);
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["data"]["code"], "VAC-001");
            let first_id = body["data"]["id"].as_i64().unwrap();

            let req = test::TestRequest::post()
                .uri("/api/v1/animals")
                .insert_header(bearer(&token))
                .set_json(json!({ "animal_type": "Vaca" }))
                .to_request();
            let body: Value = test::call_and_read_body_json(&app, req).await;
            assert_eq!(body["data"]["code"], "VAC-002");

            let req = test::TestRequest::delete()
                .uri(&format!("/api/v1/animals/{}", first_id))
                .insert_header(bearer(&token))
                .to_request();
            let body: Value = test::call_and_read_body_json(&app, req).await;
            assert_eq!(body["message"], "Animal VAC-001 has been removed.");

            let req = test::TestRequest::get()
                .uri("/api/v1/animals")
                .insert_header(bearer(&token))
                .to_request();
            let body: Value = test::call_and_read_body_json(&app, req).await;
            assert_eq!(body["data"]["total"], 1);
            assert_eq!(body["data"]["data"][0]["code"], "VAC-002");

            // Still readable directly, marked inactive
            let req = test::TestRequest::get()
                .uri(&format!("/api/v1/animals/{}", first_id))
                .insert_header(bearer(&token))
                .to_request();
            let body: Value = test::call_and_read_body_json(&app, req).await;
            assert_eq!(body["data"]["status"], "Inactive");
        }

        #[actix_rt::test]
        async fn test_blank_type_is_rejected() {
            let ctx = TestContext::new().await;
            let (_, token) = ctx.user("admin", UserRole::Administrator).await;
            let app = test_app!(ctx);

            let req = test::TestRequest::post()
                .uri("/api/v1/animals")
                .insert_header(bearer(&token))
                .set_json(json!({ "animal_type": "   " }))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        }

        #[actix_rt::test]
        async fn test_update_keeps_code() {
            let ctx = TestContext::new().await;
            let (_, token) = ctx.user("admin", UserRole::Administrator).await;
            let animal_id = ctx.animal("VAC-001", "InHerd").await;
            let app = test_app!(ctx);

            let req = test::TestRequest::put()
                .uri(&format!("/api/v1/animals/{}", animal_id))
                .insert_header(bearer(&token))
                .set_json(json!({ "animal_type": "Toro", "name": "Bravo", "status": "sold" }))
                .to_request();
            let body: Value = test::call_and_read_body_json(&app, req).await;
            assert_eq!(body["data"]["code"], "VAC-001");
            assert_eq!(body["data"]["animal_type"], "Toro");
            assert_eq!(body["data"]["name"], "Bravo");
            assert_eq!(body["data"]["status"], "sold");
        }
    }
}
