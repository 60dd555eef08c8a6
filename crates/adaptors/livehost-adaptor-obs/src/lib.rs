//! obs-websocket v5 scene controller
//!
//! Minimal client for the obs-websocket v5 protocol: Hello/Identify
//! handshake (with challenge-response auth when OBS has a password set),
//! then plain request/response frames. The connection is established lazily
//! on first use and re-established after a drop, matching how the assistant
//! treats scene switching as strictly best-effort.

#![warn(missing_docs)]
#![warn(clippy::all)]

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures_util::{SinkExt, StreamExt};
use livehost_core::scene::SceneController;
use livehost_core::{LiveHostError, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Handshake and per-request timeout
const OP_TIMEOUT: Duration = Duration::from_secs(10);

// obs-websocket v5 opcodes
const OP_HELLO: u64 = 0;
const OP_IDENTIFY: u64 = 1;
const OP_IDENTIFIED: u64 = 2;
const OP_REQUEST: u64 = 6;
const OP_REQUEST_RESPONSE: u64 = 7;

#[derive(Debug, Deserialize)]
struct HelloAuth {
    challenge: String,
    salt: String,
}

/// Scene controller speaking obs-websocket v5
pub struct ObsSceneController {
    url: String,
    password: Option<String>,
    conn: Mutex<Option<WsStream>>,
}

impl ObsSceneController {
    /// Create a controller for the given host/port. `password` matches the
    /// obs-websocket server setting; None when auth is disabled.
    pub fn new(host: impl AsRef<str>, port: u16, password: Option<String>) -> Self {
        Self {
            url: format!("ws://{}:{}", host.as_ref(), port),
            password: password.filter(|p| !p.is_empty()),
            conn: Mutex::new(None),
        }
    }

    /// obs-websocket auth string:
    /// base64(sha256(base64(sha256(password + salt)) + challenge))
    fn auth_string(password: &str, salt: &str, challenge: &str) -> String {
        let secret = BASE64.encode(Sha256::digest(format!("{}{}", password, salt)));
        BASE64.encode(Sha256::digest(format!("{}{}", secret, challenge)))
    }

    async fn open_connection(&self) -> Result<WsStream> {
        tracing::info!("Connecting to OBS at {}", self.url);
        let (mut ws, _) = timeout(OP_TIMEOUT, connect_async(&self.url))
            .await
            .map_err(|_| LiveHostError::timeout("OBS connection timed out"))?
            .map_err(|e| LiveHostError::scene(format!("OBS connect failed: {}", e)))?;

        // Hello
        let hello = Self::read_op(&mut ws, OP_HELLO).await?;
        let auth = hello
            .get("authentication")
            .cloned()
            .map(serde_json::from_value::<HelloAuth>)
            .transpose()?;

        // Identify
        let mut identify = json!({ "rpcVersion": 1 });
        if let Some(auth) = auth {
            let password = self.password.as_deref().ok_or_else(|| {
                LiveHostError::auth("OBS requires a password but none is configured")
            })?;
            identify["authentication"] =
                Value::String(Self::auth_string(password, &auth.salt, &auth.challenge));
        }
        Self::send_op(&mut ws, OP_IDENTIFY, identify).await?;

        // Identified
        Self::read_op(&mut ws, OP_IDENTIFIED).await?;
        tracing::info!("Connected to OBS");
        Ok(ws)
    }

    async fn send_op(ws: &mut WsStream, op: u64, d: Value) -> Result<()> {
        let frame = json!({ "op": op, "d": d });
        ws.send(Message::Text(frame.to_string()))
            .await
            .map_err(|e| LiveHostError::scene(format!("OBS send failed: {}", e)))
    }

    /// Read frames until one with the wanted opcode arrives (events in
    /// between are skipped)
    async fn read_op(ws: &mut WsStream, want: u64) -> Result<Value> {
        let deadline = tokio::time::Instant::now() + OP_TIMEOUT;
        loop {
            let frame = timeout(deadline - tokio::time::Instant::now(), ws.next())
                .await
                .map_err(|_| LiveHostError::timeout("OBS response timed out"))?
                .ok_or_else(|| LiveHostError::scene("OBS closed the connection"))?
                .map_err(|e| LiveHostError::scene(format!("OBS read failed: {}", e)))?;

            let Message::Text(text) = frame else { continue };
            let value: Value = serde_json::from_str(&text)?;
            if value.get("op").and_then(Value::as_u64) == Some(want) {
                return Ok(value.get("d").cloned().unwrap_or(Value::Null));
            }
        }
    }

    /// Issue one request, lazily (re)connecting first. A transport failure
    /// drops the cached connection so the next call starts fresh.
    async fn request(&self, request_type: &str, request_data: Value) -> Result<Value> {
        let mut guard = self.conn.lock().await;
        if guard.is_none() {
            *guard = Some(self.open_connection().await?);
        }
        let ws = guard.as_mut().unwrap();

        let request_id = uuid::Uuid::new_v4().to_string();
        let d = json!({
            "requestType": request_type,
            "requestId": request_id,
            "requestData": request_data,
        });

        let result = async {
            Self::send_op(ws, OP_REQUEST, d).await?;
            loop {
                let response = Self::read_op(ws, OP_REQUEST_RESPONSE).await?;
                if response.get("requestId").and_then(Value::as_str) != Some(&request_id) {
                    continue;
                }
                let status = response.get("requestStatus").cloned().unwrap_or(Value::Null);
                if status.get("result").and_then(Value::as_bool) != Some(true) {
                    let comment = status
                        .get("comment")
                        .and_then(Value::as_str)
                        .unwrap_or("request rejected");
                    return Err(LiveHostError::scene(format!(
                        "{} failed: {}",
                        request_type, comment
                    )));
                }
                return Ok(response.get("responseData").cloned().unwrap_or(Value::Null));
            }
        }
        .await;

        if let Err(LiveHostError::Timeout(_)) | Err(LiveHostError::Scene(_)) = &result {
            // Next call reconnects
            *guard = None;
        }
        result
    }
}

#[async_trait]
impl SceneController for ObsSceneController {
    async fn switch_scene(&self, name: &str) -> Result<()> {
        tracing::info!("Switching to scene: {}", name);
        self.request("SetCurrentProgramScene", json!({ "sceneName": name }))
            .await?;
        Ok(())
    }

    async fn list_scenes(&self) -> Result<Vec<String>> {
        let data = self.request("GetSceneList", json!({})).await?;
        let scenes = data
            .get("scenes")
            .and_then(Value::as_array)
            .map(|scenes| {
                scenes
                    .iter()
                    .filter_map(|s| s.get("sceneName").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok(scenes)
    }

    async fn current_scene(&self) -> Result<String> {
        let data = self.request("GetCurrentProgramScene", json!({})).await?;
        data.get("currentProgramSceneName")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| LiveHostError::scene("OBS returned no current scene"))
    }
}
