// src/board.rs
//
// Task placement on the board. A drop is resolved to a single order key between
// the neighbours at the target index; the client mirrors this to reorder
// optimistically before the write lands. Concurrent drops are last write wins.

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::auth::current_user;
use crate::errors::{internal_error, ValidationError};
use crate::models::task::sort_by_position;
use crate::models::{Project, Sprint, SprintStatus, Task, Zone};
use crate::project::{load_project, Access};

/// Spacing between neighbouring keys after appends and renumbering.
pub const POSITION_GAP: f64 = 1024.0;

/// Key for an item inserted at `index` among `siblings` (sorted ascending).
/// `None` when no key fits strictly between the neighbours.
pub fn order_key_at(siblings: &[f64], index: usize) -> Option<f64> {
    let index = index.min(siblings.len());
    let prev = index.checked_sub(1).map(|i| siblings[i]);
    let next = siblings.get(index).copied();
    match (prev, next) {
        (None, None) => Some(POSITION_GAP),
        (Some(prev), None) => Some(prev + POSITION_GAP),
        (None, Some(next)) => Some(next - POSITION_GAP),
        (Some(prev), Some(next)) => {
            let mid = prev + (next - prev) / 2.0;
            (mid > prev && mid < next).then_some(mid)
        }
    }
}

/// Key for appending after the last sibling.
pub fn append_key(siblings: &[f64]) -> f64 {
    siblings.last().map_or(POSITION_GAP, |last| last + POSITION_GAP)
}

/// Outcome of a drop: the moved task's key, plus new keys for siblings when
/// the zone had to be renumbered.
#[derive(Debug, Clone, PartialEq)]
pub struct MovePlan {
    pub position: f64,
    pub renumbered: Vec<(String, f64)>,
}

/// `siblings` are the destination zone's tasks without the moved one, sorted by position.
pub fn plan_move(siblings: &[Task], index: usize, moved_id: &str) -> MovePlan {
    let keys: Vec<f64> = siblings.iter().map(|t| t.position).collect();
    if let Some(position) = order_key_at(&keys, index) {
        return MovePlan {
            position,
            renumbered: Vec::new(),
        };
    }

    let index = index.min(siblings.len());
    let mut order: Vec<&str> = siblings.iter().map(|t| t.id.as_str()).collect();
    order.insert(index, moved_id);

    let mut plan = MovePlan {
        position: 0.0,
        renumbered: Vec::new(),
    };
    for (i, id) in order.into_iter().enumerate() {
        let key = (i as f64 + 1.0) * POSITION_GAP;
        if id == moved_id {
            plan.position = key;
        } else if siblings.iter().any(|t| t.id == id && t.position != key) {
            plan.renumbered.push((id.to_string(), key));
        }
    }
    plan
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardZone {
    pub sprint: Option<String>,
    pub column: String,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardView {
    pub project: String,
    pub columns: Vec<String>,
    pub sprints: Vec<Sprint>,
    pub zones: Vec<BoardZone>,
}

/// Backlog first, then every sprint not yet completed, each split into the
/// project's columns. `sprints` must already be in start-date order.
pub fn build_board(project: &Project, sprints: Vec<Sprint>, mut tasks: Vec<Task>) -> BoardView {
    sort_by_position(&mut tasks);
    let open: Vec<Sprint> = sprints
        .into_iter()
        .filter(|s| s.status != SprintStatus::Completed)
        .collect();

    let lanes = std::iter::once(None).chain(open.iter().map(|s| Some(s.id.clone())));
    let mut zones = Vec::new();
    for sprint in lanes {
        for column in &project.columns {
            let zone = Zone {
                sprint: sprint.clone(),
                column: column.clone(),
            };
            zones.push(BoardZone {
                tasks: tasks.iter().filter(|t| t.in_zone(&zone)).cloned().collect(),
                sprint: zone.sprint,
                column: zone.column,
            });
        }
    }

    BoardView {
        project: project.id.clone(),
        columns: project.columns.clone(),
        sprints: open,
        zones,
    }
}

/// Stable sort grouping `tasks` by zone: backlog first, then sprints in the
/// given order, columns in project order. Position order within a zone is kept.
pub fn sort_by_zone(tasks: &mut [Task], project: &Project, sprints: &[Sprint]) {
    tasks.sort_by_key(|t| {
        let lane = match &t.sprint {
            None => 0,
            Some(id) => sprints
                .iter()
                .position(|s| &s.id == id)
                .map_or(usize::MAX, |i| i + 1),
        };
        let column = project
            .columns
            .iter()
            .position(|c| c == &t.column)
            .unwrap_or(usize::MAX);
        (lane, column)
    });
}

/// Checks that `zone` exists in `project`. Sprints must belong to it and be
/// open, since completed sprints are not shown on the board.
pub async fn validate_zone(data: &AppState, project: &Project, zone: &Zone) -> Result<(), HttpResponse> {
    if !project.has_column(&zone.column) {
        return Err(HttpResponse::BadRequest()
            .body(ValidationError::UnknownColumn(zone.column.clone()).to_string()));
    }
    if let Some(sprint_id) = &zone.sprint {
        match data.store.find_sprint(sprint_id).await {
            Ok(Some(sprint)) if sprint.project == project.id => {
                if sprint.status == SprintStatus::Completed {
                    return Err(HttpResponse::BadRequest()
                        .body(ValidationError::ClosedSprint(sprint_id.clone()).to_string()));
                }
            }
            Ok(_) => {
                return Err(HttpResponse::BadRequest()
                    .body(ValidationError::ForeignSprint(sprint_id.clone()).to_string()))
            }
            Err(e) => return Err(internal_error("Error fetching sprint", e)),
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveTaskRequest {
    pub sprint: Option<String>,
    pub column: String,
    /// Target slot within the destination zone, past-the-end appends.
    pub index: usize,
}

/// GET /projects/{project_id}/board
pub async fn get_board(
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
    let tasks = match data.store.list_tasks(&project.id).await {
        Ok(t) => t,
        Err(e) => return internal_error("Error fetching tasks", e),
    };
    HttpResponse::Ok().json(build_board(&project, sprints, tasks))
}

/// PUT /projects/{project_id}/tasks/{task_id}/move
pub async fn move_task(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
    payload: web::Json<MoveTaskRequest>,
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
    let zone = Zone {
        sprint: payload.sprint,
        column: payload.column,
    };
    if let Err(resp) = validate_zone(&data, &project, &zone).await {
        return resp;
    }

    let siblings: Vec<Task> = match data.store.list_tasks(&project.id).await {
        Ok(tasks) => tasks
            .into_iter()
            .filter(|t| t.in_zone(&zone) && t.id != task.id)
            .collect(),
        Err(e) => return internal_error("Error fetching tasks", e),
    };
    let plan = plan_move(&siblings, payload.index, &task.id);

    if !plan.renumbered.is_empty() {
        debug!("Renumbering {} tasks in {:?}", plan.renumbered.len(), zone);
    }
    for (id, position) in &plan.renumbered {
        if let Err(e) = data.store.move_task(id, &zone, *position).await {
            return internal_error("Error reordering tasks", e);
        }
    }

    match data.store.move_task(&task.id, &zone, plan.position).await {
        Ok(true) => {
            info!("Task {} moved from {:?} to {:?} at {}", task.id, task.zone(), zone, plan.position);
            task.sprint = zone.sprint;
            task.column = zone.column;
            task.position = plan.position;
            HttpResponse::Ok().json(task)
        }
        Ok(false) => HttpResponse::NotFound().body("Task not found"),
        Err(e) => internal_error("Error moving task", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task_at(id: &str, position: f64) -> Task {
        let zone = Zone { sprint: None, column: "todo".into() };
        let mut task = Task::new("p", zone, id, None, position, "u").unwrap();
        task.id = id.to_string();
        task
    }

    #[test]
    fn keys_at_the_edges() {
        assert_eq!(order_key_at(&[], 0), Some(POSITION_GAP));
        assert_eq!(order_key_at(&[1024.0, 2048.0], 0), Some(0.0));
        assert_eq!(order_key_at(&[1024.0, 2048.0], 2), Some(3072.0));
        assert_eq!(order_key_at(&[1024.0, 2048.0], 99), Some(3072.0));
    }

    #[test]
    fn key_between_neighbours() {
        let key = order_key_at(&[1024.0, 2048.0], 1).unwrap();
        assert!(key > 1024.0 && key < 2048.0);
    }

    #[test]
    fn exhausted_gap_has_no_key() {
        let a = 1.0_f64;
        let b = f64::from_bits(a.to_bits() + 1);
        assert_eq!(order_key_at(&[a, b], 1), None);
        assert_eq!(order_key_at(&[5.0, 5.0], 1), None);
    }

    #[test]
    fn append_after_last() {
        assert_eq!(append_key(&[]), POSITION_GAP);
        assert_eq!(append_key(&[10.0, 20.0]), 20.0 + POSITION_GAP);
    }

    #[test]
    fn plan_uses_midpoint_when_possible() {
        let siblings = vec![task_at("a", 1024.0), task_at("b", 2048.0)];
        let plan = plan_move(&siblings, 1, "m");
        assert_eq!(plan.position, 1536.0);
        assert!(plan.renumbered.is_empty());
    }

    #[test]
    fn plan_renumbers_when_gap_is_exhausted() {
        let siblings = vec![task_at("a", 7.0), task_at("b", 7.0), task_at("c", 9.0)];
        let plan = plan_move(&siblings, 1, "m");

        assert_eq!(plan.position, 2.0 * POSITION_GAP);
        assert_eq!(
            plan.renumbered,
            vec![
                ("a".to_string(), POSITION_GAP),
                ("b".to_string(), 3.0 * POSITION_GAP),
                ("c".to_string(), 4.0 * POSITION_GAP),
            ]
        );
    }

    #[test]
    fn board_skips_completed_sprints() {
        use chrono::Utc;

        let project = Project::new("P", None, "u", vec![], Some(vec!["todo".into(), "done".into()])).unwrap();
        let now = Utc::now();
        let open = Sprint::new("open", None, &project.id, now, now, "u").unwrap();
        let mut closed = Sprint::new("closed", None, &project.id, now, now, "u").unwrap();
        closed.status = SprintStatus::Completed;

        let mut in_sprint = task_at("t1", 2.0);
        in_sprint.sprint = Some(open.id.clone());
        let backlog_late = task_at("t2", 5.0);
        let backlog_early = task_at("t3", 1.0);

        let board = build_board(
            &project,
            vec![open.clone(), closed],
            vec![in_sprint, backlog_late, backlog_early],
        );

        assert_eq!(board.sprints.len(), 1);
        assert_eq!(board.zones.len(), 4);
        let backlog_todo = &board.zones[0];
        assert_eq!(backlog_todo.sprint, None);
        let ids: Vec<_> = backlog_todo.tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t3", "t2"]);
        assert_eq!(board.zones[2].sprint.as_deref(), Some(open.id.as_str()));
        assert_eq!(board.zones[2].tasks.len(), 1);
    }

    #[test]
    fn listing_groups_by_zone_then_position() {
        use chrono::Utc;

        let project = Project::new("P", None, "u", vec![], Some(vec!["todo".into(), "done".into()])).unwrap();
        let now = Utc::now();
        let sprint = Sprint::new("S", None, &project.id, now, now, "u").unwrap();

        let mut sprint_todo = task_at("s-todo", 1.0);
        sprint_todo.sprint = Some(sprint.id.clone());
        let mut backlog_done = task_at("b-done", 1.0);
        backlog_done.column = "done".into();
        let mut tasks = vec![sprint_todo, backlog_done, task_at("b-todo-2", 2.0), task_at("b-todo-1", 1.0)];
        sort_by_position(&mut tasks);
        sort_by_zone(&mut tasks, &project, std::slice::from_ref(&sprint));

        let ids: Vec<_> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["b-todo-1", "b-todo-2", "b-done", "s-todo"]);
    }
}
