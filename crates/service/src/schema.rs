//! Document schema navigator.
//!
//! Stored documents are expected to carry a substrate description at the
//! fixed path `config.recipes[0].trays[0].positions[0].substrate1`. The
//! navigator resolves that path explicitly so callers get a descriptive
//! error naming the first missing segment instead of an opaque failure.

use serde_json::Value;

use crate::errors::ServiceError;

/// Fields written by [`apply_patch`]; everything else under `substrate1`
/// is preserved verbatim.
#[derive(Debug, Clone)]
pub struct SubstratePatch {
    pub thickness: serde_json::Number,
    pub material: String,
}

fn missing(segment: &str) -> ServiceError {
    ServiceError::Malformed(format!("missing {} in document", segment))
}

/// Resolve the substrate field of a document.
pub fn substrate(doc: &Value) -> Result<&Value, ServiceError> {
    let config = doc.get("config").ok_or_else(|| missing("config"))?;
    let recipe = config
        .get("recipes")
        .and_then(|v| v.get(0))
        .ok_or_else(|| missing("recipes[0]"))?;
    let tray = recipe
        .get("trays")
        .and_then(|v| v.get(0))
        .ok_or_else(|| missing("trays[0]"))?;
    let position = tray
        .get("positions")
        .and_then(|v| v.get(0))
        .ok_or_else(|| missing("positions[0]"))?;
    position.get("substrate1").ok_or_else(|| missing("substrate1"))
}

fn substrate_mut(doc: &mut Value) -> Result<&mut Value, ServiceError> {
    let config = doc.get_mut("config").ok_or_else(|| missing("config"))?;
    let recipe = config
        .get_mut("recipes")
        .and_then(|v| v.get_mut(0))
        .ok_or_else(|| missing("recipes[0]"))?;
    let tray = recipe
        .get_mut("trays")
        .and_then(|v| v.get_mut(0))
        .ok_or_else(|| missing("trays[0]"))?;
    let position = tray
        .get_mut("positions")
        .and_then(|v| v.get_mut(0))
        .ok_or_else(|| missing("positions[0]"))?;
    position
        .get_mut("substrate1")
        .ok_or_else(|| missing("substrate1"))
}

/// Overwrite `thickness` and `material` on the substrate field in place,
/// leaving sibling fields untouched.
pub fn apply_patch(doc: &mut Value, patch: &SubstratePatch) -> Result<(), ServiceError> {
    let substrate = substrate_mut(doc)?;
    let obj = substrate.as_object_mut().ok_or_else(|| {
        ServiceError::Malformed("substrate1 is not an object".into())
    })?;
    obj.insert("thickness".into(), Value::Number(patch.thickness.clone()));
    obj.insert("material".into(), Value::String(patch.material.clone()));
    Ok(())
}
