use anyhow::Context;
use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    app_error::AppError,
    app_state::AppState,
    models::{CreateTestimonialEntity, TestimonialEntity},
    schema::testimonials,
};

pub fn routes() -> Router<AppState> {
    Router::new().nest(
        "/testimonials",
        Router::new()
            .route("/", routing::get(get_testimonials))
            .route("/", routing::post(create_testimonial))
            .route("/", routing::patch(update_testimonial))
            .route("/", routing::delete(delete_testimonial)),
    )
}

const MAX_RATING: i32 = 5;

fn check_rating(rating: i32) -> Result<(), AppError> {
    if !(0..=MAX_RATING).contains(&rating) {
        return Err(AppError::BadRequest(format!(
            "Rating must be between 0 and {MAX_RATING}"
        )));
    }
    Ok(())
}

async fn get_testimonials(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let testimonials: Vec<TestimonialEntity> = testimonials::table
        .order_by(testimonials::created_at.desc())
        .select(TestimonialEntity::as_select())
        .get_results(conn)
        .await
        .context("Failed to get testimonials")?;

    Ok(Json(testimonials))
}

#[derive(Deserialize)]
struct CreateTestimonialReq {
    author_id: Uuid,
    author_name: String,
    subject: String,
    message: String,
    rating: i32,
}

async fn create_testimonial(
    State(state): State<AppState>,
    Json(body): Json<CreateTestimonialReq>,
) -> Result<impl IntoResponse, AppError> {
    if body.message.trim().is_empty() {
        return Err(AppError::BadRequest("Message is required".into()));
    }
    check_rating(body.rating)?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let testimonial: TestimonialEntity = diesel::insert_into(testimonials::table)
        .values(CreateTestimonialEntity {
            author_id: body.author_id,
            author_name: body.author_name,
            subject: body.subject,
            message: body.message,
            rating: body.rating,
        })
        .returning(TestimonialEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to create testimonial")?;

    Ok((StatusCode::CREATED, Json(testimonial)))
}

#[derive(Deserialize)]
struct UpdateTestimonialReq {
    user_id: Uuid,
    testimonial_id: Uuid,
    subject: String,
    message: String,
    rating: i32,
}

/// Authors may only edit their own testimonials.
async fn update_testimonial(
    State(state): State<AppState>,
    Json(body): Json<UpdateTestimonialReq>,
) -> Result<impl IntoResponse, AppError> {
    check_rating(body.rating)?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let existing: TestimonialEntity = testimonials::table
        .find(body.testimonial_id)
        .select(TestimonialEntity::as_select())
        .get_result(conn)
        .await?;
    if existing.author_id != body.user_id {
        return Err(AppError::ForbiddenResource(
            "Only the author can edit this testimonial".into(),
        ));
    }

    let testimonial: TestimonialEntity = diesel::update(testimonials::table.find(existing.id))
        .set((
            testimonials::subject.eq(body.subject),
            testimonials::message.eq(body.message),
            testimonials::rating.eq(body.rating),
        ))
        .returning(TestimonialEntity::as_returning())
        .get_result(conn)
        .await?;

    Ok(Json(testimonial))
}

#[derive(Deserialize)]
struct DeleteTestimonialReq {
    user_id: Uuid,
    testimonial_id: Uuid,
    #[serde(default)]
    is_admin: bool,
}

async fn delete_testimonial(
    State(state): State<AppState>,
    Json(body): Json<DeleteTestimonialReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let existing: TestimonialEntity = testimonials::table
        .find(body.testimonial_id)
        .select(TestimonialEntity::as_select())
        .get_result(conn)
        .await?;
    if existing.author_id != body.user_id && !body.is_admin {
        return Err(AppError::ForbiddenResource(
            "Only the author can delete this testimonial".into(),
        ));
    }

    diesel::delete(testimonials::table.find(existing.id))
        .execute(conn)
        .await?;

    Ok(Json(serde_json::json!({
        "message": "Testimonial deleted successfully",
        "testimonial_id": existing.id,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratings_outside_the_scale_are_rejected() {
        assert!(check_rating(-1).is_err());
        assert!(check_rating(6).is_err());
        assert!(check_rating(0).is_ok());
        assert!(check_rating(5).is_ok());
    }
}
