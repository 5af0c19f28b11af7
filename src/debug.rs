use crate::lead::Lead;
use crate::VehicleId;
use serde_json::json;
use slotmap::Key;

thread_local!(
    static DEBUG_FRAME: std::cell::RefCell<Vec<serde_json::Value>> = Default::default();
);

/// Records the lead a vehicle followed during the current frame.
pub fn debug_lead(vehicle: VehicleId, pos: f64, lead: Option<Lead>) {
    DEBUG_FRAME.with(|frame| {
        frame.borrow_mut().push(json!({
            "type": "lead",
            "vehicle": vehicle.data().as_ffi(),
            "pos": pos,
            "lead": lead.map(|lead| json!({
                "kind": lead.kind,
                "pos": lead.pos,
                "vel": lead.vel,
                "len": lead.len,
            })),
        }))
    })
}

/// Records that a vehicle was refused entry to an intersection.
pub fn debug_denied(vehicle: VehicleId, pos: f64) {
    DEBUG_FRAME.with(|frame| {
        frame.borrow_mut().push(json!({
            "type": "denied",
            "vehicle": vehicle.data().as_ffi(),
            "pos": pos,
        }))
    })
}

pub fn take_debug_frame() -> serde_json::Value {
    json!(DEBUG_FRAME.with(|frame| frame.take()))
}
