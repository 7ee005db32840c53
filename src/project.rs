// src/project.rs

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use chrono::Utc;
use log::{debug, error, info};
use serde::Deserialize;

use crate::app_state::AppState;
use crate::auth::current_user;
use crate::errors::{internal_error, ValidationError};
use crate::models::{Project, ProjectStatus};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub members: Vec<String>,
    pub columns: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub columns: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    pub user_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Member,
    Owner,
}

/// Loads a project and checks the caller may act on it. The `Err` side is the
/// response to return as is.
pub async fn load_project(
    data: &AppState,
    project_id: &str,
    user_id: &str,
    access: Access,
) -> Result<Project, HttpResponse> {
    let project = match data.store.find_project(project_id).await {
        Ok(Some(p)) => p,
        Ok(None) => return Err(HttpResponse::NotFound().body("Project not found")),
        Err(e) => return Err(internal_error("Error fetching project", e)),
    };
    let allowed = match access {
        Access::Member => project.is_member(user_id),
        Access::Owner => project.is_owner(user_id),
    };
    if !allowed {
        debug!("User {} denied {:?} access to project {}", user_id, access, project_id);
        return Err(match access {
            Access::Member => HttpResponse::Forbidden().body("Not a member of this project"),
            Access::Owner => HttpResponse::Forbidden().body("Only the project owner can do this"),
        });
    }
    Ok(project)
}

/// Checks that every id names an existing user.
async fn check_users_exist(data: &AppState, ids: &[String]) -> Result<(), HttpResponse> {
    for id in ids {
        match data.store.find_user(id).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                return Err(HttpResponse::BadRequest()
                    .body(ValidationError::UnknownUser(id.clone()).to_string()))
            }
            Err(e) => return Err(internal_error("Error checking users", e)),
        }
    }
    Ok(())
}

/// POST /projects
/// The caller becomes owner and first member.
pub async fn create_project(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<CreateProjectRequest>,
) -> impl Responder {
    let current_user = match current_user(&req) {
        Some(uid) => uid,
        None => return HttpResponse::Unauthorized().body("Unauthorized"),
    };
    debug!("create_project by {} with payload: {:?}", current_user, payload);

    let payload = payload.into_inner();
    if let Err(resp) = check_users_exist(&data, &payload.members).await {
        return resp;
    }

    let project = match Project::new(
        &payload.title,
        payload.description,
        &current_user,
        payload.members,
        payload.columns,
    ) {
        Ok(p) => p,
        Err(e) => return HttpResponse::BadRequest().body(e.to_string()),
    };

    if let Err(e) = data.store.insert_project(&project).await {
        return internal_error("Error creating project", e);
    }
    info!("Project created {:?}", project.id);
    HttpResponse::Created().json(project)
}

/// GET /projects
/// Projects the caller is a member of.
pub async fn list_projects(req: HttpRequest, data: web::Data<AppState>) -> impl Responder {
    let current_user = match current_user(&req) {
        Some(uid) => uid,
        None => return HttpResponse::Unauthorized().body("Unauthorized"),
    };
    match data.store.list_projects_for_member(&current_user).await {
        Ok(projects) => HttpResponse::Ok().json(projects),
        Err(e) => internal_error("Error fetching projects", e),
    }
}

/// GET /projects/{project_id}
pub async fn get_project(
    req: HttpRequest,
    data: web::Data<AppState>,
    project_id: web::Path<String>,
) -> impl Responder {
    let current_user = match current_user(&req) {
        Some(uid) => uid,
        None => return HttpResponse::Unauthorized().body("Unauthorized"),
    };
    match load_project(&data, &project_id, &current_user, Access::Member).await {
        Ok(project) => HttpResponse::Ok().json(project),
        Err(resp) => resp,
    }
}

/// PUT /projects/{project_id}
pub async fn update_project(
    req: HttpRequest,
    data: web::Data<AppState>,
    project_id: web::Path<String>,
    update_info: web::Json<UpdateProjectRequest>,
) -> impl Responder {
    let current_user = match current_user(&req) {
        Some(uid) => uid,
        None => return HttpResponse::Unauthorized().body("Unauthorized"),
    };
    let mut project = match load_project(&data, &project_id, &current_user, Access::Owner).await {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    let update_info = update_info.into_inner();
    if update_info.title.is_none()
        && update_info.description.is_none()
        && update_info.status.is_none()
        && update_info.columns.is_none()
    {
        return HttpResponse::BadRequest().body("No fields to update");
    }

    if let Some(title) = &update_info.title {
        if let Err(e) = project.set_title(title) {
            return HttpResponse::BadRequest().body(e.to_string());
        }
    }
    if let Some(description) = update_info.description {
        project.description = Some(description);
    }
    if let Some(status) = update_info.status {
        project.status = status;
    }
    if let Some(columns) = update_info.columns {
        if let Err(e) = project.set_columns(columns) {
            return HttpResponse::BadRequest().body(e.to_string());
        }
        // A column may only disappear once it is empty.
        let tasks = match data.store.list_tasks(&project.id).await {
            Ok(tasks) => tasks,
            Err(e) => return internal_error("Error checking tasks", e),
        };
        if let Some(task) = tasks.iter().find(|t| !project.has_column(&t.column)) {
            return HttpResponse::BadRequest()
                .body(ValidationError::ColumnInUse(task.column.clone()).to_string());
        }
    }
    project.updated_at = Utc::now();

    match data.store.replace_project(&project).await {
        Ok(true) => HttpResponse::Ok().json(project),
        Ok(false) => HttpResponse::NotFound().body("Project not found"),
        Err(e) => internal_error("Error updating project", e),
    }
}

/// DELETE /projects/{project_id}
/// Removes the project with its sprints and tasks.
pub async fn delete_project(
    req: HttpRequest,
    data: web::Data<AppState>,
    project_id: web::Path<String>,
) -> impl Responder {
    let current_user = match current_user(&req) {
        Some(uid) => uid,
        None => return HttpResponse::Unauthorized().body("Unauthorized"),
    };
    if let Err(resp) = load_project(&data, &project_id, &current_user, Access::Owner).await {
        return resp;
    }

    match data.store.delete_project(&project_id).await {
        Ok(true) => {
            info!("Project deleted {}", project_id);
            HttpResponse::Ok().body("Project deleted")
        }
        Ok(false) => HttpResponse::NotFound().body("Project not found"),
        Err(e) => internal_error("Error deleting project", e),
    }
}

/// POST /projects/{project_id}/members
pub async fn add_member(
    req: HttpRequest,
    data: web::Data<AppState>,
    project_id: web::Path<String>,
    payload: web::Json<AddMemberRequest>,
) -> impl Responder {
    let current_user = match current_user(&req) {
        Some(uid) => uid,
        None => return HttpResponse::Unauthorized().body("Unauthorized"),
    };
    let mut project = match load_project(&data, &project_id, &current_user, Access::Owner).await {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    if let Err(resp) = check_users_exist(&data, std::slice::from_ref(&payload.user_id)).await {
        return resp;
    }
    if !project.add_member(&payload.user_id) {
        return HttpResponse::BadRequest().body("User already in project");
    }
    project.updated_at = Utc::now();

    match data.store.replace_project(&project).await {
        Ok(true) => {
            info!("Added {} to project {}", payload.user_id, project.id);
            HttpResponse::Ok().json(project)
        }
        Ok(false) => HttpResponse::NotFound().body("Project not found"),
        Err(e) => internal_error("Error adding member", e),
    }
}

/// DELETE /projects/{project_id}/members/{user_id}
pub async fn remove_member(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> impl Responder {
    let (project_id, user_id) = path.into_inner();
    let current_user = match current_user(&req) {
        Some(uid) => uid,
        None => return HttpResponse::Unauthorized().body("Unauthorized"),
    };
    let mut project = match load_project(&data, &project_id, &current_user, Access::Owner).await {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    match project.remove_member(&user_id) {
        Ok(true) => {}
        Ok(false) => return HttpResponse::NotFound().body("User is not a member"),
        Err(e) => return HttpResponse::BadRequest().body(e.to_string()),
    }
    project.updated_at = Utc::now();

    match data.store.replace_project(&project).await {
        Ok(true) => {}
        Ok(false) => return HttpResponse::NotFound().body("Project not found"),
        Err(e) => {
            error!("Error removing {} from project {}: {}", user_id, project_id, e);
            return HttpResponse::InternalServerError().body("Error removing member");
        }
    }

    // Assignees must stay members.
    match data.store.unassign_tasks(&project.id, &user_id).await {
        Ok(count) => {
            info!("Removed {} from project {}, {} tasks unassigned", user_id, project.id, count);
            HttpResponse::Ok().json(project)
        }
        Err(e) => internal_error("Error unassigning tasks", e),
    }
}
