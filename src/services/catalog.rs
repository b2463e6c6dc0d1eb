use rusqlite::Connection;

use crate::db::{is_unique_violation, queries};
use crate::errors::SchedulingError;
use crate::models::slot::{canonical_time, parse_time_of_day};
use crate::models::MasterSlot;

/// Active slots, earliest first.
pub fn list_active_slots(conn: &Connection) -> Result<Vec<MasterSlot>, SchedulingError> {
    Ok(queries::list_slots(conn, true)?)
}

pub fn list_all_slots(conn: &Connection) -> Result<Vec<MasterSlot>, SchedulingError> {
    Ok(queries::list_slots(conn, false)?)
}

pub fn add_slot(conn: &Connection, time_of_day: &str) -> Result<MasterSlot, SchedulingError> {
    let time = parse_time_of_day(time_of_day)
        .map_err(|e| SchedulingError::validation(e.to_string()))?;
    let slot = MasterSlot {
        id: uuid::Uuid::new_v4().to_string(),
        time_of_day: canonical_time(&time),
        active: true,
    };

    match queries::insert_slot(conn, &slot) {
        Ok(()) => {
            tracing::info!(slot_id = %slot.id, time = %slot.time_of_day, "slot added");
            Ok(slot)
        }
        Err(e) if is_unique_violation(&e) => Err(SchedulingError::DuplicateSlot {
            time: slot.time_of_day,
        }),
        Err(e) => Err(e.into()),
    }
}

/// Idempotent. Existing bookings at this slot are not touched either way.
pub fn set_active(
    conn: &Connection,
    id: &str,
    active: bool,
) -> Result<MasterSlot, SchedulingError> {
    let slot = queries::get_slot(conn, id)?
        .ok_or_else(|| SchedulingError::NotFound(format!("slot {id}")))?;
    if slot.active == active {
        return Ok(slot);
    }

    match queries::set_slot_active(conn, id, active) {
        Ok(_) => {
            tracing::info!(slot_id = %id, active, "slot toggled");
            Ok(MasterSlot { active, ..slot })
        }
        Err(e) if is_unique_violation(&e) => Err(SchedulingError::DuplicateSlot {
            time: slot.time_of_day,
        }),
        Err(e) => Err(e.into()),
    }
}

/// Hard delete. Bookings keep their stored time and a dangling slot id.
pub fn remove_slot(conn: &Connection, id: &str) -> Result<(), SchedulingError> {
    if !queries::delete_slot(conn, id)? {
        return Err(SchedulingError::NotFound(format!("slot {id}")));
    }
    tracing::info!(slot_id = %id, "slot removed");
    Ok(())
}
