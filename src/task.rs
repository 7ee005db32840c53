// src/task.rs

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use chrono::Utc;
use log::{debug, info};
use serde::Deserialize;

use crate::app_state::AppState;
use crate::auth::current_user;
use crate::board::{append_key, sort_by_zone, validate_zone};
use crate::errors::{internal_error, ValidationError};
use crate::models::{Task, Zone};
use crate::project::{load_project, Access};

/// Request payload for creating a task. Without a column the task lands in
/// the project's first column; without a sprint, in the backlog.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    pub sprint: Option<String>,
    pub column: Option<String>,
    pub assignee: Option<String>,
}

/// Placement changes go through the move endpoint instead.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub assignee: Option<String>,
}

/// GET /projects/{project_id}/tasks
pub async fn list_tasks(
    req: HttpRequest,
    data: web::Data<AppState>,
    project_id: web::Path<String>,
) -> impl Responder {
    let current_user = match current_user(&req) {
        Some(uid) => uid,
        None => return HttpResponse::Unauthorized().body("Unauthorized"),
    };
    let project = match load_project(&data, &project_id, &current_user, Access::Member).await {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let sprints = match data.store.list_sprints(&project.id).await {
        Ok(s) => s,
        Err(e) => return internal_error("Error fetching sprints", e),
    };
    match data.store.list_tasks(&project.id).await {
        Ok(mut tasks) => {
            sort_by_zone(&mut tasks, &project, &sprints);
            HttpResponse::Ok().json(tasks)
        }
        Err(e) => internal_error("Error fetching tasks", e),
    }
}

/// POST /projects/{project_id}/tasks
pub async fn create_task(
    req: HttpRequest,
    data: web::Data<AppState>,
    project_id: web::Path<String>,
    payload: web::Json<CreateTaskRequest>,
) -> impl Responder {
    let current_user = match current_user(&req) {
        Some(uid) => uid,
        None => return HttpResponse::Unauthorized().body("Unauthorized"),
    };
    let project = match load_project(&data, &project_id, &current_user, Access::Member).await {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    debug!("create_task in {} with payload: {:?}", project.id, payload);

    let payload = payload.into_inner();
    let column = match payload.column.or_else(|| project.columns.first().cloned()) {
        Some(c) => c,
        None => return HttpResponse::BadRequest().body(ValidationError::Missing("column").to_string()),
    };
    let zone = Zone {
        sprint: payload.sprint,
        column,
    };
    if let Err(resp) = validate_zone(&data, &project, &zone).await {
        return resp;
    }
    if let Some(assignee) = &payload.assignee {
        if !project.is_member(assignee) {
            return HttpResponse::BadRequest()
                .body(ValidationError::AssigneeNotMember(assignee.clone()).to_string());
        }
    }

    let zone_keys: Vec<f64> = match data.store.list_tasks(&project.id).await {
        Ok(tasks) => tasks
            .iter()
            .filter(|t| t.in_zone(&zone))
            .map(|t| t.position)
            .collect(),
        Err(e) => return internal_error("Error fetching tasks", e),
    };

    let mut task = match Task::new(
        &project.id,
        zone,
        &payload.title,
        payload.description,
        append_key(&zone_keys),
        &current_user,
    ) {
        Ok(t) => t,
        Err(e) => return HttpResponse::BadRequest().body(e.to_string()),
    };
    task.assignee = payload.assignee;

    match data.store.insert_task(&task).await {
        Ok(()) => {
            info!("Task created {:?} in project {}", task.id, project.id);
            HttpResponse::Created().json(task)
        }
        Err(e) => internal_error("Error creating task", e),
    }
}

/// GET /projects/{project_id}/tasks/{task_id}
pub async fn get_task(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> impl Responder {
    let (project_id, task_id) = path.into_inner();
    let current_user = match current_user(&req) {
        Some(uid) => uid,
        None => return HttpResponse::Unauthorized().body("Unauthorized"),
    };
    if let Err(resp) = load_project(&data, &project_id, &current_user, Access::Member).await {
        return resp;
    }
    match data.store.find_task(&task_id).await {
        Ok(Some(task)) if task.project == project_id => HttpResponse::Ok().json(task),
        Ok(_) => HttpResponse::NotFound().body("Task not found"),
        Err(e) => internal_error("Error fetching task", e),
    }
}

/// PUT /projects/{project_id}/tasks/{task_id}
pub async fn update_task(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
    payload: web::Json<UpdateTaskRequest>,
) -> impl Responder {
    let (project_id, task_id) = path.into_inner();
    let current_user = match current_user(&req) {
        Some(uid) => uid,
        None => return HttpResponse::Unauthorized().body("Unauthorized"),
    };
    let project = match load_project(&data, &project_id, &current_user, Access::Member).await {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let mut task = match data.store.find_task(&task_id).await {
        Ok(Some(t)) if t.project == project.id => t,
        Ok(_) => return HttpResponse::NotFound().body("Task not found"),
        Err(e) => return internal_error("Error fetching task", e),
    };

    let payload = payload.into_inner();
    if payload.title.is_none() && payload.description.is_none() && payload.assignee.is_none() {
        return HttpResponse::BadRequest().body("No fields to update");
    }
    if let Some(title) = payload.title {
        let title = title.trim();
        if title.is_empty() {
            return HttpResponse::BadRequest().body(ValidationError::Missing("title").to_string());
        }
        task.title = title.to_string();
    }
    if let Some(description) = payload.description {
        task.description = Some(description);
    }
    if let Some(assignee) = payload.assignee {
        if !project.is_member(&assignee) {
            return HttpResponse::BadRequest()
                .body(ValidationError::AssigneeNotMember(assignee).to_string());
        }
        task.assignee = Some(assignee);
    }
    task.updated_at = Utc::now();

    match data.store.replace_task(&task).await {
        Ok(true) => HttpResponse::Ok().json(task),
        Ok(false) => HttpResponse::NotFound().body("Task not found"),
        Err(e) => internal_error("Error updating task", e),
    }
}

/// DELETE /projects/{project_id}/tasks/{task_id}
pub async fn delete_task(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> impl Responder {
    let (project_id, task_id) = path.into_inner();
    let current_user = match current_user(&req) {
        Some(uid) => uid,
        None => return HttpResponse::Unauthorized().body("Unauthorized"),
    };
    if let Err(resp) = load_project(&data, &project_id, &current_user, Access::Member).await {
        return resp;
    }
    match data.store.find_task(&task_id).await {
        Ok(Some(task)) if task.project == project_id => {}
        Ok(_) => return HttpResponse::NotFound().body("Task not found"),
        Err(e) => return internal_error("Error fetching task", e),
    }

    match data.store.delete_task(&task_id).await {
        Ok(true) => HttpResponse::Ok().body("Task deleted"),
        Ok(false) => HttpResponse::NotFound().body("Task not found or already deleted"),
        Err(e) => internal_error("Error deleting task", e),
    }
}
