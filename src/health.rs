use actix_web::{web, HttpResponse, Responder};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LivenessReport {
    pub status: String,
    pub message: String,
    pub timestamp: String,
    /// Seconds since the process started.
    pub uptime: f64,
    pub database: String,
    pub ready_state: u8,
}

/// GET /islive
/// 200 while the database is connected or connecting, 500 otherwise.
pub async fn is_live(data: web::Data<AppState>) -> impl Responder {
    let state = data.store.ready_state().await;
    let live = state.is_live();
    let report = LivenessReport {
        status: if live { "ok" } else { "error" }.to_string(),
        message: if live {
            "Server is live".to_string()
        } else {
            "Database connection is not available".to_string()
        },
        timestamp: Utc::now().to_rfc3339(),
        uptime: data.started_at.elapsed().as_secs_f64(),
        database: state.label().to_string(),
        ready_state: state.code(),
    };
    if live {
        HttpResponse::Ok().json(report)
    } else {
        HttpResponse::InternalServerError().json(report)
    }
}

/// GET /ping
pub async fn ping() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "message": "pong",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
