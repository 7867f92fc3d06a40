use axum::Json;
use serde_json::{Value, json};

use crate::res;

pub(crate) async fn categories() -> Json<Value> {
    Json(json!({ "ok": true, "categories": res::categories() }))
}
