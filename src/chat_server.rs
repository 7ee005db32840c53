use std::collections::HashMap;

use actix::prelude::*;
use log::{debug, info};
use serde::Serialize;
use uuid::Uuid;

use crate::models::ChatMessage;

/// A broadcast scope: the global chat or one project's chat.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Room {
    Global,
    Project(String),
}

impl Room {
    pub fn for_project(project: Option<&str>) -> Self {
        match project {
            Some(p) => Room::Project(p.to_string()),
            None => Room::Global,
        }
    }
}

/// Pushed to every session in the affected room.
#[derive(Message, Debug, Clone, Serialize)]
#[rtype(result = "()")]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChatEvent {
    MessagePosted { message: ChatMessage },
    MessageUpdated { message: ChatMessage },
    #[serde(rename_all = "camelCase")]
    MessageDeleted { message_id: String, project: Option<String> },
}

impl ChatEvent {
    pub fn room(&self) -> Room {
        match self {
            ChatEvent::MessagePosted { message } | ChatEvent::MessageUpdated { message } => {
                Room::for_project(message.project.as_deref())
            }
            ChatEvent::MessageDeleted { project, .. } => Room::for_project(project.as_deref()),
        }
    }
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Connect {
    pub session_id: Uuid,
    pub room: Room,
    pub addr: Recipient<ChatEvent>,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Disconnect {
    pub session_id: Uuid,
    pub room: Room,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Broadcast(pub ChatEvent);

#[derive(Message)]
#[rtype(result = "usize")]
pub struct SessionCount(pub Room);

/// Fans chat events out to websocket sessions. Persistence happens in the
/// REST handlers before anything reaches this actor.
#[derive(Default)]
pub struct ChatServer {
    rooms: HashMap<Room, HashMap<Uuid, Recipient<ChatEvent>>>,
}

impl ChatServer {
    pub fn new() -> Self {
        ChatServer::default()
    }
}

impl Actor for ChatServer {
    type Context = Context<Self>;
}

impl Handler<Connect> for ChatServer {
    type Result = ();

    fn handle(&mut self, msg: Connect, _: &mut Context<Self>) {
        info!("Session {} joined {:?}", msg.session_id, msg.room);
        self.rooms
            .entry(msg.room)
            .or_default()
            .insert(msg.session_id, msg.addr);
    }
}

impl Handler<Disconnect> for ChatServer {
    type Result = ();

    fn handle(&mut self, msg: Disconnect, _: &mut Context<Self>) {
        info!("Session {} left {:?}", msg.session_id, msg.room);
        if let Some(sessions) = self.rooms.get_mut(&msg.room) {
            sessions.remove(&msg.session_id);
            if sessions.is_empty() {
                self.rooms.remove(&msg.room);
            }
        }
    }
}

impl Handler<Broadcast> for ChatServer {
    type Result = ();

    fn handle(&mut self, Broadcast(event): Broadcast, _: &mut Context<Self>) {
        let room = event.room();
        if let Some(sessions) = self.rooms.get(&room) {
            debug!("Broadcasting to {} sessions in {:?}", sessions.len(), room);
            for addr in sessions.values() {
                addr.do_send(event.clone());
            }
        }
    }
}

impl Handler<SessionCount> for ChatServer {
    type Result = usize;

    fn handle(&mut self, SessionCount(room): SessionCount, _: &mut Context<Self>) -> usize {
        self.rooms.get(&room).map_or(0, |s| s.len())
    }
}
