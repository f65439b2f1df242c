// src/api/handlers/interactions.rs
use std::collections::HashMap;
use std::sync::Arc;

use actix_web::{web, HttpRequest, HttpResponse, Result};
use log::{debug, warn};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::AppState;
use crate::delivery::DeliveryTarget;
use crate::router::{EventKind, InboundEvent, OptionValue};

const PING: u8 = 1;
const APPLICATION_COMMAND: u8 = 2;
const MODAL_SUBMIT: u8 = 5;

#[derive(Debug, Deserialize)]
pub struct RawInteraction {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub data: Option<RawData>,
}

#[derive(Debug, Deserialize)]
pub struct RawData {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    options: Vec<RawOption>,
    #[serde(default)]
    custom_id: Option<String>,
    #[serde(default)]
    components: Vec<RawRow>,
}

#[derive(Debug, Deserialize)]
struct RawOption {
    name: String,
    #[serde(default)]
    value: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(default)]
    components: Vec<RawInput>,
}

#[derive(Debug, Deserialize)]
struct RawInput {
    custom_id: String,
    #[serde(default)]
    value: Option<String>,
}

/// Converts a platform interaction into a router event. Returns `None` for
/// interaction types the bot does not handle.
pub fn to_event(raw: &RawInteraction) -> Option<InboundEvent> {
    let data = raw.data.as_ref()?;
    let kind = match raw.kind {
        APPLICATION_COMMAND => {
            let options = data
                .options
                .iter()
                .filter_map(|opt| {
                    let value = match opt.value.as_ref()? {
                        Value::String(s) => OptionValue::Text(s.clone()),
                        Value::Bool(b) => OptionValue::Boolean(*b),
                        Value::Number(n) => OptionValue::Integer(n.as_i64()?),
                        _ => return None,
                    };
                    Some((opt.name.clone(), value))
                })
                .collect();
            EventKind::Command { name: data.name.clone()?, options }
        }
        MODAL_SUBMIT => {
            let fields: HashMap<String, String> = data
                .components
                .iter()
                .flat_map(|row| row.components.iter())
                .map(|input| (input.custom_id.clone(), input.value.clone().unwrap_or_default()))
                .collect();
            EventKind::FormSubmit { custom_id: data.custom_id.clone()?, fields }
        }
        _ => return None,
    };

    Some(InboundEvent {
        id: raw.id.clone(),
        channel_id: raw.channel_id.clone(),
        kind,
    })
}

pub async fn interactions(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    if let Some(verifier) = &state.verifier {
        let header = |name: &str| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };
        let signature = header("X-Signature-Ed25519");
        let timestamp = header("X-Signature-Timestamp");
        if !verifier.verify(&timestamp, &body, &signature) {
            warn!("Rejected interaction with a bad signature");
            return Ok(HttpResponse::Unauthorized().json(json!({ "error": "invalid request signature" })));
        }
    }

    let raw: RawInteraction = match serde_json::from_slice(&body) {
        Ok(raw) => raw,
        Err(e) => {
            return Ok(HttpResponse::BadRequest().json(json!({ "error": e.to_string() })));
        }
    };

    if raw.kind == PING {
        return Ok(HttpResponse::Ok().json(json!({ "type": PING })));
    }

    let Some(event) = to_event(&raw) else {
        debug!("Ignoring interaction {} of type {}", raw.id, raw.kind);
        return Ok(HttpResponse::BadRequest().json(json!({ "error": "unsupported interaction type" })));
    };

    let target = DeliveryTarget::new(Arc::new(state.discord.interaction(&raw.id, &raw.token)));
    state.router.spawn(event, target);

    Ok(HttpResponse::Accepted().finish())
}
