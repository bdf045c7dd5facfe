//! Response formatting.
//!
//! The daemon always ships the full status snapshot; which fields the user
//! sees, and in what shape, is decided here. The JSON payloads keep the
//! string-valued fields the web frontends have always parsed.

use ptz_common::types::{InversionFlags, MotorStatus};
use serde_json::json;

/// Multi-line human-readable status summary.
pub fn show_status(status: &MotorStatus) -> String {
    let mut out = String::new();
    out.push_str(&format!("Max X Steps {}.\n", status.x_max_steps));
    out.push_str(&format!("Max Y Steps {}.\n", status.y_max_steps));
    out.push_str(&format!("Status Move: {}.\n", status.state.as_wire()));
    out.push_str(&format!("X Steps {}.\n", status.x));
    out.push_str(&format!("Y Steps {}.\n", status.y));
    out.push_str(&format!("Speed {}.\n", status.speed));
    out.push_str(&format!(
        "Invert X {}.\n",
        u32::from(status.inversion.contains(InversionFlags::INVERT_X))
    ));
    out.push_str(&format!(
        "Invert Y {}.\n",
        u32::from(status.inversion.contains(InversionFlags::INVERT_Y))
    ));
    out
}

/// Position/status JSON polled by the camera frontend.
pub fn json_status(status: &MotorStatus) -> String {
    json!({
        "status": status.state.as_wire().to_string(),
        "xpos": status.x.to_string(),
        "ypos": status.y.to_string(),
        "speed": status.speed.to_string(),
    })
    .to_string()
}

/// Full parameter JSON fetched once when a client page loads.
pub fn json_initial(status: &MotorStatus) -> String {
    json!({
        "status": status.state.as_wire().to_string(),
        "xpos": status.x.to_string(),
        "ypos": status.y.to_string(),
        "xmax": status.x_max_steps.to_string(),
        "ymax": status.y_max_steps.to_string(),
        "speed": status.speed.to_string(),
    })
    .to_string()
}

/// Bare `x,y` line.
pub fn xy_pos(status: &MotorStatus) -> String {
    format!("{},{}", status.x, status.y)
}
