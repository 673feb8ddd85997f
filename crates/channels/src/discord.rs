//! Discord channel adapter.
//!
//! Receives messages over the Discord Gateway WebSocket and talks to the REST
//! API for everything else: posting replies, reading channel history, and
//! resolving channel names.
//!
//! The gateway session identifies with the `GUILD_MESSAGES`, `DIRECT_MESSAGES`
//! and `MESSAGE_CONTENT` intents. Message content is a privileged intent and
//! must be enabled for the bot in the Developer Portal. Dropped sessions are
//! re-established with a fresh identify; authentication failures end the
//! stream with an error.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chatdigest_core::channel::{Channel, ChannelId, ChannelMessage};
use chatdigest_core::error::ChannelError;
use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, trace, warn};

pub const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// Discord rejects message content longer than this many characters.
const DISCORD_MAX_MESSAGE_LEN: usize = 2000;

/// Largest page `GET /channels/{id}/messages` serves.
const HISTORY_PAGE_LIMIT: usize = 100;

/// GUILDS (1) | GUILD_MESSAGES (512) | DIRECT_MESSAGES (4096) | MESSAGE_CONTENT (32768)
const GATEWAY_INTENTS: u64 = 1 | 512 | 4096 | 32768;

const DEFAULT_HEARTBEAT_MS: u64 = 41_250;
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Discord channel configuration.
#[derive(Clone)]
pub struct DiscordConfig {
    /// Bot token from Discord Developer Portal.
    pub bot_token: String,
    /// Channel IDs to listen in. Empty = all channels.
    pub channel_filter: Vec<String>,
    /// REST API root.
    pub api_base: String,
}

impl DiscordConfig {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            channel_filter: Vec::new(),
            api_base: DISCORD_API_BASE.into(),
        }
    }
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("bot_token", &"[REDACTED]")
            .field("channel_filter", &self.channel_filter)
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Authenticated REST client, shared with the gateway task.
#[derive(Clone)]
struct RestClient {
    client: reqwest::Client,
    token: String,
    api_base: String,
}

impl RestClient {
    fn new(config: &DiscordConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            token: config.bot_token.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        }
    }

    fn authorization(&self) -> String {
        format!("Bot {}", self.token)
    }

    async fn get_json(&self, path: &str) -> Result<Value, ChannelError> {
        let response = self
            .client
            .get(format!("{}{path}", self.api_base))
            .header("Authorization", self.authorization())
            .send()
            .await
            .map_err(|e| ChannelError::ConnectionLost(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChannelError::ConnectionLost(format!(
                "Discord API returned {status}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ChannelError::ConnectionLost(format!("Invalid Discord response: {e}")))
    }

    async fn post_message(&self, channel_id: &str, content: &str) -> Result<(), ChannelError> {
        let failed = |reason: String| ChannelError::DeliveryFailed {
            channel: "discord".into(),
            reason,
        };

        let response = self
            .client
            .post(format!("{}/channels/{channel_id}/messages", self.api_base))
            .header("Authorization", self.authorization())
            .json(&json!({ "content": content }))
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %body, "Discord send failed");
            return Err(failed(format!("status {status}")));
        }
        Ok(())
    }

    async fn gateway_url(&self) -> Result<String, ChannelError> {
        let body = self.get_json("/gateway/bot").await?;
        let url = body["url"].as_str().ok_or_else(|| {
            ChannelError::ConnectionLost("Missing 'url' in gateway response".into())
        })?;
        Ok(format!("{url}/?v=10&encoding=json"))
    }
}

/// Resolves and remembers channel names for reply labels.
#[derive(Clone)]
struct ChannelNames {
    rest: RestClient,
    known: Arc<RwLock<HashMap<String, Option<String>>>>,
}

impl ChannelNames {
    async fn lookup(&self, channel_id: &str) -> Option<String> {
        if let Some(name) = self.known.read().await.get(channel_id) {
            return name.clone();
        }

        // DM channels have no name
        let name = match self.rest.get_json(&format!("/channels/{channel_id}")).await {
            Ok(body) => body["name"].as_str().map(String::from),
            Err(e) => {
                debug!(channel_id, error = %e, "Could not resolve channel name");
                return None;
            }
        };
        self.known
            .write()
            .await
            .insert(channel_id.to_string(), name.clone());
        name
    }
}

/// Discord channel adapter.
pub struct DiscordChannel {
    config: DiscordConfig,
    channel_id: ChannelId,
    rest: RestClient,
    names: ChannelNames,
    gateway: Mutex<Option<JoinHandle<()>>>,
}

impl DiscordChannel {
    pub fn new(config: DiscordConfig) -> Self {
        let rest = RestClient::new(&config);
        let names = ChannelNames {
            rest: rest.clone(),
            known: Arc::new(RwLock::new(HashMap::new())),
        };
        Self {
            config,
            channel_id: ChannelId("discord".into()),
            rest,
            names,
            gateway: Mutex::new(None),
        }
    }
}

/// Whether messages from a Discord channel are relayed.
fn listens_to(filter: &[String], chat_id: &str) -> bool {
    filter.is_empty() || filter.iter().any(|c| c == chat_id)
}

#[async_trait]
impl Channel for DiscordChannel {
    fn name(&self) -> &str {
        "discord"
    }

    fn id(&self) -> &ChannelId {
        &self.channel_id
    }

    async fn start(
        &self,
    ) -> Result<mpsc::Receiver<Result<ChannelMessage, ChannelError>>, ChannelError> {
        if self.config.bot_token.is_empty() {
            return Err(ChannelError::NotConfigured("Discord bot token is empty".into()));
        }

        let mut gateway = self.gateway.lock().await;
        if let Some(previous) = gateway.take() {
            previous.abort();
        }

        info!("Discord channel starting");
        let (tx, rx) = mpsc::channel(64);
        let session = GatewaySession {
            rest: self.rest.clone(),
            names: self.names.clone(),
            filter: self.config.channel_filter.clone(),
            tx,
        };
        *gateway = Some(tokio::spawn(session.run()));
        Ok(rx)
    }

    async fn send(&self, chat_id: &str, content: &str) -> Result<(), ChannelError> {
        for chunk in chunk_content(content, DISCORD_MAX_MESSAGE_LEN) {
            self.rest.post_message(chat_id, &chunk).await?;
        }
        debug!(chat_id = %chat_id, content_len = content.len(), "Discord reply sent");
        Ok(())
    }

    async fn history(
        &self,
        chat_id: &str,
        limit: usize,
    ) -> Result<Vec<ChannelMessage>, ChannelError> {
        let limit = limit.clamp(1, HISTORY_PAGE_LIMIT);
        let body = self
            .rest
            .get_json(&format!("/channels/{chat_id}/messages?limit={limit}"))
            .await?;

        // The API serves newest first
        let mut messages: Vec<ChannelMessage> = body
            .as_array()
            .map(|page| page.iter().filter_map(message_from_api).collect())
            .unwrap_or_default();
        messages.reverse();
        Ok(messages)
    }

    async fn stop(&self) -> Result<(), ChannelError> {
        info!("Discord channel stopping");
        if let Some(gateway) = self.gateway.lock().await.take() {
            gateway.abort();
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, ChannelError> {
        if self.config.bot_token.is_empty() {
            return Ok(false);
        }
        self.rest.get_json("/users/@me").await.map(|_| true)
    }
}

/// How a gateway connection ended.
#[derive(Debug, PartialEq, Eq)]
enum SessionEnd {
    /// The consumer dropped the message stream
    Closed,
    /// Discord asked for, or the network forced, a new connection
    Reconnect,
    /// Discord refused the session for good (bad token, disallowed intents)
    Fatal(String),
}

/// Aborts the wrapped task when dropped.
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Gateway receive loop feeding one message stream.
struct GatewaySession {
    rest: RestClient,
    names: ChannelNames,
    filter: Vec<String>,
    tx: mpsc::Sender<Result<ChannelMessage, ChannelError>>,
}

impl GatewaySession {
    async fn run(self) {
        loop {
            match self.connect().await {
                Ok(SessionEnd::Closed) => break,
                Ok(SessionEnd::Fatal(reason)) => {
                    warn!(reason = %reason, "Discord gateway refused the session");
                    let _ = self.tx.send(Err(ChannelError::ConnectionLost(reason))).await;
                    break;
                }
                Ok(SessionEnd::Reconnect) => info!("Discord gateway asked to reconnect"),
                Err(e) => warn!(error = %e, "Discord gateway session failed"),
            }

            if self.tx.is_closed() {
                break;
            }
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
        info!("Discord gateway connection ended");
    }

    async fn connect(&self) -> Result<SessionEnd, ChannelError> {
        let lost = |e: tokio_tungstenite::tungstenite::Error| {
            ChannelError::ConnectionLost(e.to_string())
        };

        let url = self.rest.gateway_url().await?;
        info!(url = %url, "Connecting to Discord gateway");
        let (stream, _) = tokio_tungstenite::connect_async(&url).await.map_err(lost)?;
        let (mut write, mut read) = stream.split();

        let heartbeat_ms = match read.next().await {
            Some(Ok(frame)) => frame
                .to_text()
                .ok()
                .and_then(|text| serde_json::from_str::<Value>(text).ok())
                .and_then(|payload| hello_interval(&payload))
                .unwrap_or_else(|| {
                    warn!("Expected Hello from Discord gateway");
                    DEFAULT_HEARTBEAT_MS
                }),
            Some(Err(e)) => return Err(lost(e)),
            None => return Ok(SessionEnd::Reconnect),
        };
        debug!(heartbeat_ms, "Discord heartbeat interval");

        // One writer owns the sink; heartbeats and replies queue frames to it
        let (frames, mut outgoing) = mpsc::channel::<String>(16);
        let _writer = AbortOnDrop(tokio::spawn(async move {
            while let Some(frame) = outgoing.recv().await {
                if let Err(e) = write.send(WsMessage::Text(frame.into())).await {
                    warn!(error = %e, "Discord gateway write failed");
                    break;
                }
            }
        }));

        let sequence = Arc::new(AtomicU64::new(0));
        let _heartbeat = {
            let frames = frames.clone();
            let sequence = sequence.clone();
            AbortOnDrop(tokio::spawn(async move {
                let mut interval = tokio::time::interval(Duration::from_millis(heartbeat_ms));
                loop {
                    interval.tick().await;
                    let frame = heartbeat_frame(sequence.load(Ordering::Relaxed));
                    if frames.send(frame).await.is_err() {
                        break;
                    }
                }
            }))
        };

        let _ = frames.send(identify_frame(&self.rest.token)).await;

        while let Some(frame) = read.next().await {
            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => return Err(lost(e)),
            };

            if let WsMessage::Close(close) = &frame {
                let code = close.as_ref().map(|c| u16::from(c.code)).unwrap_or(1000);
                if is_fatal_close(code) {
                    let reason = close.as_ref().map(|c| c.reason.to_string()).unwrap_or_default();
                    return Ok(SessionEnd::Fatal(format!("close code {code}: {reason}")));
                }
                return Ok(SessionEnd::Reconnect);
            }

            let Ok(text) = frame.to_text() else { continue };
            let Ok(payload) = serde_json::from_str::<Value>(text) else {
                continue;
            };
            if let Some(seq) = payload["s"].as_u64() {
                sequence.store(seq, Ordering::Relaxed);
            }

            match payload["op"].as_u64() {
                Some(0) => {
                    if let Some(end) = self.dispatch(&payload).await {
                        return Ok(end);
                    }
                }
                Some(1) => {
                    let _ = frames.send(heartbeat_frame(sequence.load(Ordering::Relaxed))).await;
                }
                Some(7) | Some(9) => return Ok(SessionEnd::Reconnect),
                Some(11) => trace!("Discord heartbeat acknowledged"),
                _ => {}
            }
        }

        Ok(SessionEnd::Reconnect)
    }

    /// Handle a dispatch event; returns an end state when the stream is gone.
    async fn dispatch(&self, payload: &Value) -> Option<SessionEnd> {
        match payload["t"].as_str() {
            Some("READY") => {
                let user = payload["d"]["user"]["username"].as_str().unwrap_or("unknown");
                info!(user = %user, "Discord gateway ready");
                None
            }
            Some("MESSAGE_CREATE") => {
                let mut message = message_from_api(&payload["d"])?;
                if !listens_to(&self.filter, &message.chat_id) {
                    return None;
                }
                message.chat_name = self.names.lookup(&message.chat_id).await;
                if self.tx.send(Ok(message)).await.is_err() {
                    return Some(SessionEnd::Closed);
                }
                None
            }
            _ => None,
        }
    }
}

/// Heartbeat interval from a Hello (op 10) payload.
fn hello_interval(payload: &Value) -> Option<u64> {
    if payload["op"].as_u64() != Some(10) {
        return None;
    }
    payload["d"]["heartbeat_interval"].as_u64()
}

fn identify_frame(token: &str) -> String {
    json!({
        "op": 2,
        "d": {
            "token": token,
            "intents": GATEWAY_INTENTS,
            "properties": {
                "os": std::env::consts::OS,
                "browser": "chatdigest",
                "device": "chatdigest"
            }
        }
    })
    .to_string()
}

/// Heartbeat (op 1) carrying the last sequence number; 0 means none seen yet.
fn heartbeat_frame(sequence: u64) -> String {
    let last = if sequence == 0 { Value::Null } else { json!(sequence) };
    json!({ "op": 1, "d": last }).to_string()
}

/// Close codes after which reconnecting cannot succeed.
fn is_fatal_close(code: u16) -> bool {
    matches!(code, 4004 | 4010..=4014)
}

/// Convert a Discord message object (gateway or REST) to a channel message.
fn message_from_api(data: &Value) -> Option<ChannelMessage> {
    let chat_id = data["channel_id"].as_str()?;
    let author = &data["author"];
    let sender_id = author["id"].as_str()?;

    // Server nickname, then global display name, then username
    let sender_name = data["member"]["nick"]
        .as_str()
        .or_else(|| author["global_name"].as_str())
        .or_else(|| author["username"].as_str())
        .map(String::from);

    let timestamp = data["timestamp"]
        .as_str()
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        .map(|ts| ts.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);

    Some(ChannelMessage {
        channel_id: ChannelId("discord".into()),
        chat_id: chat_id.to_string(),
        chat_name: None,
        sender_id: sender_id.to_string(),
        sender_name,
        content: data["content"].as_str().unwrap_or_default().to_string(),
        is_bot: author["bot"].as_bool().unwrap_or(false),
        timestamp,
    })
}

/// Split text into pieces of at most `max` characters, preferring line breaks.
fn chunk_content(text: &str, max: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();
        if current_len + line_len > max && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if line_len > max {
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(max) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        current.push_str(line);
        current_len += line_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
