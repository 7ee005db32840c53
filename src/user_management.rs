use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde::Deserialize;

use crate::app_state::AppState;
use crate::auth::current_user;
use crate::errors::internal_error;
use crate::models::PublicUser;

const MIN_QUERY_LEN: usize = 2;

#[derive(Debug, Deserialize)]
pub struct FindUserQuery {
    pub query: String,
}

/// GET /users/find?query=..
/// Case-insensitive substring match on email.
pub async fn find_user_email(
    req: HttpRequest,
    query: web::Query<FindUserQuery>,
    data: web::Data<AppState>,
) -> impl Responder {
    if current_user(&req).is_none() {
        return HttpResponse::Unauthorized().body("Unauthorized");
    }
    let needle = query.query.trim();
    if needle.chars().count() < MIN_QUERY_LEN {
        return HttpResponse::BadRequest()
            .body(format!("Query must be at least {} characters", MIN_QUERY_LEN));
    }
    match data.store.search_users_by_email(needle).await {
        Ok(users) => {
            let users: Vec<PublicUser> = users.into_iter().map(PublicUser::from).collect();
            HttpResponse::Ok().json(users)
        }
        Err(e) => internal_error("Error fetching users", e),
    }
}

/// GET /users/{user_id}
pub async fn get_user_by_id(
    req: HttpRequest,
    path: web::Path<String>,
    data: web::Data<AppState>,
) -> impl Responder {
    if current_user(&req).is_none() {
        return HttpResponse::Unauthorized().body("Unauthorized");
    }
    match data.store.find_user(&path).await {
        Ok(Some(user)) => HttpResponse::Ok().json(PublicUser::from(user)),
        Ok(None) => HttpResponse::NotFound().body("User not found"),
        Err(e) => internal_error("Error fetching user", e),
    }
}
