pub mod app_state;
pub mod auth;
pub mod board;
pub mod chat;
pub mod chat_server;
pub mod config;
pub mod errors;
pub mod health;
pub mod models;
pub mod project;
pub mod sprint;
pub mod store;
pub mod task;
pub mod user_management;
pub mod web_socket_server;

use actix_web::web;

use crate::auth::{login, signup};
use crate::board::{get_board, move_task};
use crate::chat::{
    add_reaction, delete_message, list_messages, post_message, remove_reaction, toggle_pin,
};
use crate::health::{is_live, ping};
use crate::project::{
    add_member, create_project, delete_project, get_project, list_projects, remove_member,
    update_project,
};
use crate::sprint::{
    create_sprint, delete_sprint, get_sprint, list_sprints, update_sprint, update_sprint_status,
};
use crate::task::{create_task, delete_task, get_task, list_tasks, update_task};
use crate::user_management::{find_user_email, get_user_by_id};
use crate::web_socket_server::ws_index;

/// Every route of the service. Middleware and app data are added by the caller.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/islive", web::get().to(is_live))
        .route("/ping", web::get().to(ping))
        .service(
            web::scope("/auth")
                .route("/signup", web::post().to(signup))
                .route("/login", web::post().to(login)),
        )
        // USERS
        .service(
            web::scope("/users")
                .route("/find", web::get().to(find_user_email))
                .route("/{user_id}", web::get().to(get_user_by_id)),
        )
        // PROJECTS
        .service(
            web::scope("/projects")
                .route("", web::post().to(create_project))
                .route("", web::get().to(list_projects))
                .service(
                    web::scope("/{project_id}")
                        .route("", web::get().to(get_project))
                        .route("", web::put().to(update_project))
                        .route("", web::delete().to(delete_project))
                        .route("/members", web::post().to(add_member))
                        .route("/members/{user_id}", web::delete().to(remove_member))
                        .route("/board", web::get().to(get_board))
                        .service(
                            web::scope("/sprints")
                                .route("", web::get().to(list_sprints))
                                .route("", web::post().to(create_sprint))
                                .route("/{sprint_id}", web::get().to(get_sprint))
                                .route("/{sprint_id}", web::put().to(update_sprint))
                                .route("/{sprint_id}", web::delete().to(delete_sprint))
                                .route("/{sprint_id}/status", web::put().to(update_sprint_status)),
                        )
                        .service(
                            web::scope("/tasks")
                                .route("", web::get().to(list_tasks))
                                .route("", web::post().to(create_task))
                                .route("/{task_id}", web::get().to(get_task))
                                .route("/{task_id}", web::put().to(update_task))
                                .route("/{task_id}", web::delete().to(delete_task))
                                .route("/{task_id}/move", web::put().to(move_task)),
                        ),
                ),
        )
        // CHAT
        .service(
            web::scope("/chat/messages")
                .route("", web::get().to(list_messages))
                .route("", web::post().to(post_message))
                .route("/{message_id}", web::delete().to(delete_message))
                .route("/{message_id}/pin", web::post().to(toggle_pin))
                .route("/{message_id}/reactions", web::post().to(add_reaction))
                .route("/{message_id}/reactions/{kind}", web::delete().to(remove_reaction)),
        )
        // WEBSOCKET route for real-time chat
        .service(web::resource("/ws").route(web::get().to(ws_index)));
}
