use rusqlite::Connection;

use crate::db::queries;
use crate::errors::SchedulingError;
use crate::models::{AssignedWorker, Worker};

pub fn list_workers(conn: &Connection) -> Result<Vec<Worker>, SchedulingError> {
    Ok(queries::list_workers(conn)?)
}

pub fn add_worker(conn: &Connection, name: &str, phone: &str) -> Result<Worker, SchedulingError> {
    let mut problems = vec![];
    if name.trim().is_empty() {
        problems.push("worker name is required".to_string());
    }
    if phone.trim().is_empty() {
        problems.push("worker phone is required".to_string());
    }
    if !problems.is_empty() {
        return Err(SchedulingError::Validation(problems));
    }

    let worker = Worker {
        id: uuid::Uuid::new_v4().to_string(),
        name: name.trim().to_string(),
        phone: phone.trim().to_string(),
    };
    queries::insert_worker(conn, &worker)?;
    tracing::info!(worker_id = %worker.id, "worker added");
    Ok(worker)
}

/// Builds the worker reference stored on a booking. When the caller gives no
/// name the worker must exist in the local directory.
pub fn resolve_assignment(
    conn: &Connection,
    worker_id: &str,
    worker_name: Option<&str>,
) -> Result<AssignedWorker, SchedulingError> {
    let worker_id = worker_id.trim();
    if worker_id.is_empty() {
        return Err(SchedulingError::validation("worker_id is required"));
    }

    let worker_name = match worker_name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => name.to_string(),
        None => {
            queries::get_worker(conn, worker_id)?
                .ok_or_else(|| SchedulingError::NotFound(format!("worker {worker_id}")))?
                .name
        }
    };

    Ok(AssignedWorker {
        worker_id: worker_id.to_string(),
        worker_name,
    })
}
