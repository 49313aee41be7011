//! Administrator CRUD screens shared by every farm-record entity

use actix_web::{web, HttpResponse, Scope};
use std::sync::Arc;
use validator::Validate;

use crate::AppState;
use crate::auth::AdminSession;
use crate::error::ApiResult;
use crate::handlers::{ApiResponse, PaginationQuery};
use crate::repositories::CrudRepository;

pub async fn list<R: CrudRepository>(
    _session: AdminSession,
    app_state: web::Data<Arc<AppState>>,
    repo: web::Data<R>,
    query: web::Query<PaginationQuery>,
) -> ApiResult<HttpResponse> {
    let page = repo.get_paginated(&app_state.db_pool, &query).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(page)))
}

pub async fn get<R: CrudRepository>(
    _session: AdminSession,
    app_state: web::Data<Arc<AppState>>,
    repo: web::Data<R>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let entity = repo.find(&app_state.db_pool, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(entity)))
}

pub async fn create<R: CrudRepository>(
    session: AdminSession,
    app_state: web::Data<Arc<AppState>>,
    repo: web::Data<R>,
    body: web::Json<R::Create>,
) -> ApiResult<HttpResponse> {
    let data = body.into_inner();
    data.validate()?;

    let entity = repo.create(&app_state.db_pool, data).await?;

    log::info!("{} created by {}", repo.entity_label(), session.0.username);
    Ok(HttpResponse::Created().json(ApiResponse::success_with_message(
        entity,
        format!("{} created successfully.", repo.entity_label()),
    )))
}

pub async fn update<R: CrudRepository>(
    session: AdminSession,
    app_state: web::Data<Arc<AppState>>,
    repo: web::Data<R>,
    path: web::Path<i64>,
    body: web::Json<R::Update>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let data = body.into_inner();
    data.validate()?;

    let entity = repo.update(&app_state.db_pool, id, data).await?;

    log::info!("{} {} updated by {}", repo.entity_label(), id, session.0.username);
    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        entity,
        format!("{} updated successfully.", repo.entity_label()),
    )))
}

pub async fn delete<R: CrudRepository>(
    session: AdminSession,
    app_state: web::Data<Arc<AppState>>,
    repo: web::Data<R>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    repo.delete(&app_state.db_pool, id).await?;

    log::info!("{} {} deleted by {}", repo.entity_label(), id, session.0.username);
    Ok(HttpResponse::Ok().json(ApiResponse::message(format!(
        "{} deleted successfully.",
        repo.entity_label()
    ))))
}

/// Mounts list/get/create/update/delete for `R` under `path`.
pub fn crud_scope<R: CrudRepository>(path: &str) -> Scope {
    web::scope(path)
        .app_data(web::Data::new(R::default()))
        .route("", web::get().to(list::<R>))
        .route("", web::post().to(create::<R>))
        .route("/{id}", web::get().to(get::<R>))
        .route("/{id}", web::put().to(update::<R>))
        .route("/{id}", web::delete().to(delete::<R>))
}
