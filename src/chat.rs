// File: chat.rs

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use log::{debug, info};
use serde::Deserialize;

use crate::app_state::AppState;
use crate::auth::current_user;
use crate::chat_server::{Broadcast, ChatEvent};
use crate::errors::internal_error;
use crate::models::{ChatMessage, ChatRole, Reaction};
use crate::project::{load_project, Access};

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub message: String,
    pub project: Option<String>,
    /// Requested role snapshot. Capped by `ChatRole::granted`, never recomputed later.
    pub role: Option<ChatRole>,
}

#[derive(Debug, Deserialize)]
pub struct ListMessagesQuery {
    pub project: Option<String>,
    #[serde(default)]
    pub pinned: bool,
}

#[derive(Debug, Deserialize)]
pub struct ReactionRequest {
    pub kind: String,
}

/// Project messages require membership; global ones only a login.
async fn check_read_access(
    data: &AppState,
    project: Option<&str>,
    user_id: &str,
) -> Result<(), HttpResponse> {
    if let Some(project_id) = project {
        load_project(data, project_id, user_id, Access::Member).await?;
    }
    Ok(())
}

/// Project messages are moderated by the project owner, global ones by their author.
async fn check_moderation(
    data: &AppState,
    message: &ChatMessage,
    user_id: &str,
) -> Result<(), HttpResponse> {
    match &message.project {
        Some(project_id) => {
            let project = load_project(data, project_id, user_id, Access::Member).await?;
            if project.is_owner(user_id) {
                Ok(())
            } else {
                Err(HttpResponse::Forbidden().body("Only the project owner can do this"))
            }
        }
        None if message.author == user_id => Ok(()),
        None => Err(HttpResponse::Forbidden().body("Only the author can do this")),
    }
}

async fn load_message(data: &AppState, message_id: &str) -> Result<ChatMessage, HttpResponse> {
    match data.store.find_message(message_id).await {
        Ok(Some(m)) => Ok(m),
        Ok(None) => Err(HttpResponse::NotFound().body("Message not found")),
        Err(e) => Err(internal_error("Error fetching message", e)),
    }
}

/// GET /chat/messages?project=..&pinned=..
pub async fn list_messages(
    req: HttpRequest,
    data: web::Data<AppState>,
    query: web::Query<ListMessagesQuery>,
) -> impl Responder {
    let current_user = match current_user(&req) {
        Some(uid) => uid,
        None => return HttpResponse::Unauthorized().body("Unauthorized"),
    };
    let project = query.project.as_deref();
    if let Err(resp) = check_read_access(&data, project, &current_user).await {
        return resp;
    }
    match data.store.list_messages(project, query.pinned).await {
        Ok(messages) => HttpResponse::Ok().json(messages),
        Err(e) => internal_error("Error fetching messages", e),
    }
}

/// POST /chat/messages
pub async fn post_message(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<PostMessageRequest>,
) -> impl Responder {
    let current_user = match current_user(&req) {
        Some(uid) => uid,
        None => return HttpResponse::Unauthorized().body("Unauthorized"),
    };
    let payload = payload.into_inner();
    let is_owner = match payload.project.as_deref() {
        Some(project_id) => match load_project(&data, project_id, &current_user, Access::Member).await {
            Ok(project) => project.is_owner(&current_user),
            Err(resp) => return resp,
        },
        None => false,
    };
    let role = ChatRole::granted(payload.role, is_owner);

    let message = match ChatMessage::new(&payload.message, &current_user, payload.project, Some(role)) {
        Ok(m) => m,
        Err(e) => return HttpResponse::BadRequest().body(e.to_string()),
    };
    if let Err(e) = data.store.insert_message(&message).await {
        return internal_error("Error sending message", e);
    }
    debug!("Message {} posted by {}", message.id, current_user);

    data.chat_server.do_send(Broadcast(ChatEvent::MessagePosted {
        message: message.clone(),
    }));
    HttpResponse::Created().json(message)
}

/// POST /chat/messages/{message_id}/pin
/// Flips `isPinned`.
pub async fn toggle_pin(
    req: HttpRequest,
    data: web::Data<AppState>,
    message_id: web::Path<String>,
) -> impl Responder {
    let current_user = match current_user(&req) {
        Some(uid) => uid,
        None => return HttpResponse::Unauthorized().body("Unauthorized"),
    };
    let message = match load_message(&data, &message_id).await {
        Ok(m) => m,
        Err(resp) => return resp,
    };
    if let Err(resp) = check_moderation(&data, &message, &current_user).await {
        return resp;
    }

    match data.store.set_pinned(&message.id, !message.is_pinned).await {
        Ok(Some(updated)) => {
            info!("Message {} pinned={}", updated.id, updated.is_pinned);
            data.chat_server.do_send(Broadcast(ChatEvent::MessageUpdated {
                message: updated.clone(),
            }));
            HttpResponse::Ok().json(updated)
        }
        Ok(None) => HttpResponse::NotFound().body("Message not found"),
        Err(e) => internal_error("Error pinning message", e),
    }
}

/// POST /chat/messages/{message_id}/reactions
pub async fn add_reaction(
    req: HttpRequest,
    data: web::Data<AppState>,
    message_id: web::Path<String>,
    payload: web::Json<ReactionRequest>,
) -> impl Responder {
    let current_user = match current_user(&req) {
        Some(uid) => uid,
        None => return HttpResponse::Unauthorized().body("Unauthorized"),
    };
    let message = match load_message(&data, &message_id).await {
        Ok(m) => m,
        Err(resp) => return resp,
    };
    if let Err(resp) = check_read_access(&data, message.project.as_deref(), &current_user).await {
        return resp;
    }
    let reaction = match Reaction::new(&current_user, &payload.kind) {
        Ok(r) => r,
        Err(e) => return HttpResponse::BadRequest().body(e.to_string()),
    };

    match data.store.add_reaction(&message.id, &reaction).await {
        Ok(Some(updated)) => {
            data.chat_server.do_send(Broadcast(ChatEvent::MessageUpdated {
                message: updated.clone(),
            }));
            HttpResponse::Ok().json(updated)
        }
        Ok(None) => HttpResponse::NotFound().body("Message not found"),
        Err(e) => internal_error("Error adding reaction", e),
    }
}

/// DELETE /chat/messages/{message_id}/reactions/{kind}
/// Removes the caller's own reaction of that kind.
pub async fn remove_reaction(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> impl Responder {
    let (message_id, kind) = path.into_inner();
    let current_user = match current_user(&req) {
        Some(uid) => uid,
        None => return HttpResponse::Unauthorized().body("Unauthorized"),
    };
    let message = match load_message(&data, &message_id).await {
        Ok(m) => m,
        Err(resp) => return resp,
    };
    if let Err(resp) = check_read_access(&data, message.project.as_deref(), &current_user).await {
        return resp;
    }
    let reaction = match Reaction::new(&current_user, &kind) {
        Ok(r) => r,
        Err(e) => return HttpResponse::BadRequest().body(e.to_string()),
    };

    match data.store.remove_reaction(&message.id, &reaction).await {
        Ok(Some(updated)) => {
            data.chat_server.do_send(Broadcast(ChatEvent::MessageUpdated {
                message: updated.clone(),
            }));
            HttpResponse::Ok().json(updated)
        }
        Ok(None) => HttpResponse::NotFound().body("Message not found"),
        Err(e) => internal_error("Error removing reaction", e),
    }
}

/// DELETE /chat/messages/{message_id}
/// Allowed for the author, and for the project owner on project messages.
pub async fn delete_message(
    req: HttpRequest,
    data: web::Data<AppState>,
    message_id: web::Path<String>,
) -> impl Responder {
    let current_user = match current_user(&req) {
        Some(uid) => uid,
        None => return HttpResponse::Unauthorized().body("Unauthorized"),
    };
    let message = match load_message(&data, &message_id).await {
        Ok(m) => m,
        Err(resp) => return resp,
    };
    if message.author != current_user {
        if let Err(resp) = check_moderation(&data, &message, &current_user).await {
            return resp;
        }
    }

    match data.store.delete_message(&message.id).await {
        Ok(true) => {
            data.chat_server.do_send(Broadcast(ChatEvent::MessageDeleted {
                message_id: message.id,
                project: message.project,
            }));
            HttpResponse::Ok().body("Message deleted")
        }
        Ok(false) => HttpResponse::NotFound().body("Message not found or already deleted"),
        Err(e) => internal_error("Error deleting message", e),
    }
}
