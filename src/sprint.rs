// src/sprint.rs

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Deserialize;

use crate::app_state::AppState;
use crate::auth::current_user;
use crate::errors::{internal_error, ValidationError};
use crate::models::{Sprint, SprintStatus};
use crate::project::{load_project, Access};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSprintRequest {
    pub name: String,
    pub goal: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSprintRequest {
    pub name: Option<String>,
    pub goal: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: SprintStatus,
}

/// Fetches a sprint and makes sure it hangs off `project_id`.
async fn load_sprint(
    data: &AppState,
    project_id: &str,
    sprint_id: &str,
) -> Result<Sprint, HttpResponse> {
    match data.store.find_sprint(sprint_id).await {
        Ok(Some(sprint)) if sprint.project == project_id => Ok(sprint),
        Ok(_) => Err(HttpResponse::NotFound().body("Sprint not found")),
        Err(e) => Err(internal_error("Error fetching sprint", e)),
    }
}

/// GET /projects/{project_id}/sprints
/// Ordered by start date.
pub async fn list_sprints(
    req: HttpRequest,
    data: web::Data<AppState>,
    project_id: web::Path<String>,
) -> impl Responder {
    let current_user = match current_user(&req) {
        Some(uid) => uid,
        None => return HttpResponse::Unauthorized().body("Unauthorized"),
    };
    if let Err(resp) = load_project(&data, &project_id, &current_user, Access::Member).await {
        return resp;
    }
    match data.store.list_sprints(&project_id).await {
        Ok(sprints) => HttpResponse::Ok().json(sprints),
        Err(e) => internal_error("Error fetching sprints", e),
    }
}

/// POST /projects/{project_id}/sprints
pub async fn create_sprint(
    req: HttpRequest,
    data: web::Data<AppState>,
    project_id: web::Path<String>,
    payload: web::Json<CreateSprintRequest>,
) -> impl Responder {
    let current_user = match current_user(&req) {
        Some(uid) => uid,
        None => return HttpResponse::Unauthorized().body("Unauthorized"),
    };
    debug!("create_sprint in {} with payload: {:?}", project_id, payload);

    // Both references must resolve before anything is written.
    let project = match data.store.find_project(&project_id).await {
        Ok(Some(p)) => p,
        Ok(None) => {
            return HttpResponse::BadRequest()
                .body(ValidationError::UnknownProject(project_id.to_string()).to_string())
        }
        Err(e) => return internal_error("Error fetching project", e),
    };
    match data.store.find_user(&current_user).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return HttpResponse::BadRequest()
                .body(ValidationError::UnknownUser(current_user).to_string())
        }
        Err(e) => return internal_error("Error fetching user", e),
    }
    if !project.is_member(&current_user) {
        return HttpResponse::Forbidden().body("Not a member of this project");
    }

    let payload = payload.into_inner();
    let sprint = match Sprint::new(
        &payload.name,
        payload.goal,
        &project.id,
        payload.start_date,
        payload.end_date,
        &current_user,
    ) {
        Ok(s) => s,
        Err(e) => return HttpResponse::BadRequest().body(e.to_string()),
    };

    match data.store.insert_sprint(&sprint).await {
        Ok(()) => {
            info!("Sprint created {:?} in project {}", sprint.id, project.id);
            HttpResponse::Created().json(sprint)
        }
        Err(e) => internal_error("Error creating sprint", e),
    }
}

/// GET /projects/{project_id}/sprints/{sprint_id}
pub async fn get_sprint(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> impl Responder {
    let (project_id, sprint_id) = path.into_inner();
    let current_user = match current_user(&req) {
        Some(uid) => uid,
        None => return HttpResponse::Unauthorized().body("Unauthorized"),
    };
    if let Err(resp) = load_project(&data, &project_id, &current_user, Access::Member).await {
        return resp;
    }
    match load_sprint(&data, &project_id, &sprint_id).await {
        Ok(sprint) => HttpResponse::Ok().json(sprint),
        Err(resp) => resp,
    }
}

/// PUT /projects/{project_id}/sprints/{sprint_id}
/// Name, goal and dates. Status has its own endpoint.
pub async fn update_sprint(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
    payload: web::Json<UpdateSprintRequest>,
) -> impl Responder {
    let (project_id, sprint_id) = path.into_inner();
    let current_user = match current_user(&req) {
        Some(uid) => uid,
        None => return HttpResponse::Unauthorized().body("Unauthorized"),
    };
    if let Err(resp) = load_project(&data, &project_id, &current_user, Access::Member).await {
        return resp;
    }
    let mut sprint = match load_sprint(&data, &project_id, &sprint_id).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let payload = payload.into_inner();
    if payload.name.is_none()
        && payload.goal.is_none()
        && payload.start_date.is_none()
        && payload.end_date.is_none()
    {
        return HttpResponse::BadRequest().body("No fields to update");
    }
    if let Some(name) = payload.name {
        sprint.name = name.trim().to_string();
    }
    if let Some(goal) = payload.goal {
        sprint.goal = Some(goal);
    }
    if let Some(start) = payload.start_date {
        sprint.start_date = start;
    }
    if let Some(end) = payload.end_date {
        sprint.end_date = end;
    }
    if let Err(e) = sprint.validate() {
        return HttpResponse::BadRequest().body(e.to_string());
    }
    sprint.updated_at = Utc::now();

    match data.store.update_sprint_fields(&sprint).await {
        Ok(Some(stored)) => HttpResponse::Ok().json(stored),
        Ok(None) => HttpResponse::NotFound().body("Sprint not found"),
        Err(e) => internal_error("Error updating sprint", e),
    }
}

/// PUT /projects/{project_id}/sprints/{sprint_id}/status
/// Forward-only: planned -> active -> completed.
pub async fn update_sprint_status(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
    payload: web::Json<UpdateStatusRequest>,
) -> impl Responder {
    let (project_id, sprint_id) = path.into_inner();
    let current_user = match current_user(&req) {
        Some(uid) => uid,
        None => return HttpResponse::Unauthorized().body("Unauthorized"),
    };
    if let Err(resp) = load_project(&data, &project_id, &current_user, Access::Member).await {
        return resp;
    }
    let mut sprint = match load_sprint(&data, &project_id, &sprint_id).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let next = payload.status;
    if let Err(e) = sprint.check_transition(next) {
        return HttpResponse::Conflict().body(e.to_string());
    }
    if sprint.status == next {
        return HttpResponse::Ok().json(sprint);
    }

    match data.store.transition_sprint(&sprint.id, sprint.status, next).await {
        Ok(true) => {
            info!("Sprint {} moved {} -> {}", sprint.id, sprint.status, next);
            sprint.status = next;
            sprint.updated_at = Utc::now();
            HttpResponse::Ok().json(sprint)
        }
        Ok(false) => {
            warn!("Sprint {} changed status concurrently", sprint.id);
            HttpResponse::Conflict().body("Sprint status changed concurrently, reload and retry")
        }
        Err(e) => internal_error("Error updating sprint status", e),
    }
}

/// DELETE /projects/{project_id}/sprints/{sprint_id}
/// The sprint's tasks return to the backlog.
pub async fn delete_sprint(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> impl Responder {
    let (project_id, sprint_id) = path.into_inner();
    let current_user = match current_user(&req) {
        Some(uid) => uid,
        None => return HttpResponse::Unauthorized().body("Unauthorized"),
    };
    if let Err(resp) = load_project(&data, &project_id, &current_user, Access::Member).await {
        return resp;
    }
    if let Err(resp) = load_sprint(&data, &project_id, &sprint_id).await {
        return resp;
    }

    match data.store.delete_sprint(&sprint_id).await {
        Ok(true) => HttpResponse::Ok().body("Sprint deleted"),
        Ok(false) => HttpResponse::NotFound().body("Sprint not found or already deleted"),
        Err(e) => internal_error("Error deleting sprint", e),
    }
}
