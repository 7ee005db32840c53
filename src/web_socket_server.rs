use std::time::{Duration, Instant};

use actix::prelude::*;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use log::{debug, error, info, warn};
use serde::Deserialize;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::auth::verify_token;
use crate::chat_server::{ChatEvent, ChatServer, Connect, Disconnect, Room};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: String,
    pub project: Option<String>,
}

/// One subscribed browser tab. Receives chat events; anything it sends besides
/// control frames is ignored.
pub struct WsSession {
    pub id: Uuid,
    pub user_id: String,
    pub room: Room,
    pub hb: Instant,
    pub addr: Addr<ChatServer>,
}

impl WsSession {
    pub fn new(user_id: String, room: Room, addr: Addr<ChatServer>) -> Self {
        WsSession {
            id: Uuid::new_v4(),
            user_id,
            room,
            hb: Instant::now(),
            addr,
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                info!("WebSocket heartbeat failed for {}, disconnecting", act.user_id);
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.hb(ctx);

        let addr = ctx.address();
        self.addr
            .send(Connect {
                session_id: self.id,
                room: self.room.clone(),
                addr: addr.recipient(),
            })
            .into_actor(self)
            .then(|res, _act, ctx| {
                if res.is_err() {
                    error!("Failed to register with chat server");
                    ctx.stop();
                }
                fut::ready(())
            })
            .wait(ctx);
    }

    fn stopped(&mut self, _: &mut Self::Context) {
        self.addr.do_send(Disconnect {
            session_id: self.id,
            room: self.room.clone(),
        });
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.hb = Instant::now();
                debug!("Ignoring client text from {}: {}", self.user_id, text);
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Err(e) => {
                warn!("WebSocket error: {}", e);
                ctx.stop();
            }
            _ => {}
        }
    }
}

impl Handler<ChatEvent> for WsSession {
    type Result = ();

    fn handle(&mut self, msg: ChatEvent, ctx: &mut Self::Context) {
        match serde_json::to_string(&msg) {
            Ok(text) => ctx.text(text),
            Err(e) => error!("Could not encode chat event: {}", e),
        }
    }
}

/// GET /ws?token=..&project=..
/// Browsers cannot set headers on websocket upgrades, so the token travels in the query.
pub async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    data: web::Data<AppState>,
    query: web::Query<WsQuery>,
) -> Result<HttpResponse, Error> {
    let user_id = match verify_token(&query.token, &data.config.jwt_secret) {
        Ok(uid) => uid,
        Err(e) => return Ok(HttpResponse::Unauthorized().body(format!("Invalid token: {}", e))),
    };

    if let Some(project_id) = &query.project {
        match data.store.find_project(project_id).await {
            Ok(Some(project)) if project.is_member(&user_id) => {}
            Ok(Some(_)) => return Ok(HttpResponse::Forbidden().body("Not a member of this project")),
            Ok(None) => return Ok(HttpResponse::NotFound().body("Project not found")),
            Err(e) => {
                error!("Error loading project for websocket: {}", e);
                return Ok(HttpResponse::InternalServerError().body("Error loading project"));
            }
        }
    }

    let room = Room::for_project(query.project.as_deref());
    let session = WsSession::new(user_id, room, data.chat_server.clone());
    ws::start(session, &req, stream)
}
