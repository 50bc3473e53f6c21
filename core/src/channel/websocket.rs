//! WebSocket Voice Channel
//!
//! JSON events over a WebSocket to the hosted conversational-agent service
//! (`{endpoint}?agent_id={id}`).
//!
//! Only the conversation side of the protocol is handled: transcripts,
//! connection lifecycle, keep-alive pings and the speaking indicator. Audio
//! chunks are never decoded or played; their length is used to estimate
//! how long the agent is speaking.
//!
//! # Tasks
//!
//! ```text
//! reader task:  socket ──► parse ──► translate ──► event queue
//!                                       │
//!                                       └─► pong ──┐
//! writer task:  outgoing mpsc ◄── send_text/close ◄┘ ──► socket
//! ```
//!
//! When the service ends the stream the reader queues a close frame, so the
//! writer answers it and shuts the socket. Both tasks are aborted on drop.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::{LiveState, VoiceChannel};
use crate::error::ChannelError;
use crate::events::{ChannelEvent, EventSender};
use crate::session::ConnectionStatus;

/// Bytes per second of the agent's PCM output (16 kHz, mono, 16-bit)
pub const PCM_BYTES_PER_SEC: u64 = 16_000 * 2;

/// How long `close` waits for the close frame to flush
const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

// ============================================================================
// Wire format
// ============================================================================

/// Events sent by the agent service
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Handshake complete
    ConversationInitiationMetadata {
        /// Conversation details
        #[serde(default)]
        conversation_initiation_metadata_event: Option<InitiationMetadata>,
    },
    /// A line spoken by the agent
    AgentResponse {
        /// Response payload
        agent_response_event: AgentResponseEvent,
    },
    /// Recognised user speech
    UserTranscript {
        /// Transcript payload
        user_transcription_event: UserTranscriptionEvent,
    },
    /// A chunk of agent audio
    Audio {
        /// Audio payload
        audio_event: AudioEvent,
    },
    /// The user interrupted the agent
    Interruption,
    /// Keep-alive
    Ping {
        /// Ping payload
        ping_event: PingEvent,
    },
    /// Anything else (VAD scores, tool calls, corrections)
    #[serde(other)]
    Other,
}

/// Handshake details
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct InitiationMetadata {
    /// Service-side conversation id
    #[serde(default)]
    pub conversation_id: Option<String>,
    /// Output audio format, e.g. `pcm_16000`
    #[serde(default)]
    pub agent_output_audio_format: Option<String>,
}

/// Agent line payload
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct AgentResponseEvent {
    /// Text of the line
    pub agent_response: String,
}

/// User speech payload
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct UserTranscriptionEvent {
    /// Recognised text
    pub user_transcript: String,
}

/// Audio payload
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct AudioEvent {
    /// Base64-encoded PCM
    #[serde(default)]
    pub audio_base_64: String,
}

/// Ping payload
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct PingEvent {
    /// Id echoed in the pong
    pub event_id: u64,
}

/// Messages sent to the agent service
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// First message after the socket opens
    ConversationInitiationClientData,
    /// Keep-alive answer
    Pong {
        /// Id from the ping
        event_id: u64,
    },
    /// Typed user turn
    UserMessage {
        /// Text of the turn
        text: String,
    },
}

impl ClientMessage {
    fn to_frame(&self) -> Result<Message, ChannelError> {
        serde_json::to_string(self)
            .map(Message::Text)
            .map_err(|e| ChannelError::Protocol(e.to_string()))
    }
}

/// What the reader task does with one server event
#[derive(Clone, Debug, PartialEq)]
pub enum Inbound {
    /// Mark connected and emit `Connect`
    Connected,
    /// Forward an event to the controller
    Emit(ChannelEvent),
    /// Agent audio queued for this long
    Speak(Duration),
    /// Agent audio cut off
    StopSpeaking,
    /// Answer a ping
    Pong(u64),
    /// Nothing to do
    Ignore,
}

/// Map a server event to the reader's action
pub fn translate(event: ServerEvent) -> Inbound {
    match event {
        ServerEvent::ConversationInitiationMetadata { .. } => Inbound::Connected,
        ServerEvent::AgentResponse {
            agent_response_event,
        } => Inbound::Emit(ChannelEvent::agent(agent_response_event.agent_response)),
        ServerEvent::UserTranscript {
            user_transcription_event,
        } => Inbound::Emit(ChannelEvent::user(user_transcription_event.user_transcript)),
        ServerEvent::Audio { audio_event } => {
            Inbound::Speak(pcm_duration(&audio_event.audio_base_64))
        }
        ServerEvent::Interruption => Inbound::StopSpeaking,
        ServerEvent::Ping { ping_event } => Inbound::Pong(ping_event.event_id),
        ServerEvent::Other => Inbound::Ignore,
    }
}

/// Playback length of a base64 PCM chunk
pub fn pcm_duration(audio_base64: &str) -> Duration {
    let encoded = audio_base64.trim();
    let padding = encoded.bytes().rev().take_while(|b| *b == b'=').count();
    let bytes = (encoded.len() * 3 / 4).saturating_sub(padding) as u64;
    Duration::from_micros(bytes * 1_000_000 / PCM_BYTES_PER_SEC)
}

/// Connection URL for an agent.
///
/// A path-less endpoint gets `/` so the request target stays valid.
pub fn connection_url(endpoint: &str, agent_id: &str) -> String {
    let (base, query) = match endpoint.split_once('?') {
        Some((base, query)) => (base, Some(query)),
        None => (endpoint, None),
    };
    let authority = base.find("://").map_or(0, |idx| idx + 3);
    let slash = if base[authority..].contains('/') { "" } else { "/" };

    match query {
        Some(query) if !query.is_empty() => {
            format!("{base}{slash}?{query}&agent_id={agent_id}")
        }
        _ => format!("{base}{slash}?agent_id={agent_id}"),
    }
}

// ============================================================================
// Channel
// ============================================================================

/// Speaking estimate from queued audio
#[derive(Debug, Default)]
struct SpeechClock {
    until: Mutex<Option<Instant>>,
}

impl SpeechClock {
    fn extend(&self, duration: Duration, now: Instant) {
        let mut until = self.until.lock();
        let start = match *until {
            Some(end) if end > now => end,
            _ => now,
        };
        *until = Some(start + duration);
    }

    fn stop(&self) {
        *self.until.lock() = None;
    }

    fn is_speaking(&self, now: Instant) -> bool {
        let until = *self.until.lock();
        until.is_some_and(|end| now < end)
    }
}

/// Voice channel backed by the hosted agent's WebSocket API
pub struct WebSocketChannel {
    endpoint: String,
    live: Arc<LiveState>,
    speech: Arc<SpeechClock>,
    outgoing: Option<mpsc::UnboundedSender<Message>>,
    events: Option<EventSender>,
    reader: Option<JoinHandle<()>>,
    writer: Option<JoinHandle<()>>,
}

impl WebSocketChannel {
    /// Create a channel for `endpoint` (ws:// or wss://)
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            live: Arc::new(LiveState::default()),
            speech: Arc::new(SpeechClock::default()),
            outgoing: None,
            events: None,
            reader: None,
            writer: None,
        }
    }

    fn stop_tasks(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        if let Some(writer) = self.writer.take() {
            writer.abort();
        }
    }
}

async fn read_loop<S>(
    mut stream: S,
    live: Arc<LiveState>,
    speech: Arc<SpeechClock>,
    outgoing: mpsc::UnboundedSender<Message>,
    events: EventSender,
) where
    S: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(frame) = stream.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(frame)) => {
                tracing::debug!(frame = ?frame, "Agent service closed the socket");
                break;
            }
            Ok(_) => continue,
            Err(err) => {
                tracing::warn!(error = %err, "WebSocket receive failed");
                let _ = events
                    .send(ChannelEvent::Error {
                        message: err.to_string(),
                    })
                    .await;
                break;
            }
        };

        let event = match serde_json::from_str::<ServerEvent>(&text) {
            Ok(event) => event,
            Err(err) => {
                tracing::debug!(error = %err, "Unparseable server event skipped");
                continue;
            }
        };

        match translate(event) {
            Inbound::Connected => {
                live.set_connected(true);
                if events.send(ChannelEvent::Connect).await.is_err() {
                    break;
                }
            }
            Inbound::Emit(event) => {
                if events.send(event).await.is_err() {
                    break;
                }
            }
            Inbound::Speak(duration) => speech.extend(duration, Instant::now()),
            Inbound::StopSpeaking => speech.stop(),
            Inbound::Pong(event_id) => match (ClientMessage::Pong { event_id }).to_frame() {
                Ok(frame) => {
                    let _ = outgoing.send(frame);
                }
                Err(err) => tracing::debug!(error = %err, "Pong not encoded"),
            },
            Inbound::Ignore => {}
        }
    }

    live.set_connected(false);
    speech.stop();
    if outgoing.send(Message::Close(None)).is_err() {
        tracing::debug!("Writer already stopped");
    }
    drop(outgoing);
    let _ = events.send(ChannelEvent::Disconnect).await;
}

#[async_trait]
impl VoiceChannel for WebSocketChannel {
    fn name(&self) -> &str {
        "websocket"
    }

    async fn open(&mut self, agent_id: &str, events: EventSender) -> Result<(), ChannelError> {
        self.stop_tasks();

        let url = connection_url(&self.endpoint, agent_id);
        tracing::info!(url = %url, "Connecting to agent service");

        let (socket, _) = connect_async(url.as_str())
            .await
            .map_err(|e| ChannelError::Connect(e.to_string()))?;
        let (mut sink, stream) = socket.split();

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();
        out_tx
            .send(ClientMessage::ConversationInitiationClientData.to_frame()?)
            .map_err(|e| ChannelError::Transport(e.to_string()))?;

        self.writer = Some(tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                let closing = matches!(frame, Message::Close(_));
                if let Err(err) = sink.send(frame).await {
                    tracing::debug!(error = %err, "WebSocket send failed");
                    break;
                }
                if closing {
                    break;
                }
            }
            let _ = sink.close().await;
        }));

        self.reader = Some(tokio::spawn(read_loop(
            stream,
            Arc::clone(&self.live),
            Arc::clone(&self.speech),
            out_tx.clone(),
            events.clone(),
        )));

        self.outgoing = Some(out_tx);
        self.events = Some(events);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }

        // A writer that stopped after the service closed the socket is fine
        let was_connected = self.live.status() == ConnectionStatus::Connected;
        let mut result = Ok(());
        if let Some(outgoing) = self.outgoing.take() {
            if outgoing.send(Message::Close(None)).is_err() && was_connected {
                result = Err(ChannelError::Transport("writer already stopped".into()));
            }
        }
        if let Some(writer) = self.writer.take() {
            if tokio::time::timeout(CLOSE_FLUSH_TIMEOUT, writer).await.is_err() {
                tracing::warn!("Close frame not flushed in time");
            }
        }

        self.live.set_connected(false);
        self.speech.stop();
        if let Some(events) = self.events.take() {
            if was_connected {
                let _ = events.send(ChannelEvent::Disconnect).await;
            }
        }
        result
    }

    fn status(&self) -> ConnectionStatus {
        self.live.status()
    }

    fn is_speaking(&self) -> bool {
        self.live.status() == ConnectionStatus::Connected && self.speech.is_speaking(Instant::now())
    }

    async fn send_text(&mut self, text: &str) -> Result<(), ChannelError> {
        let outgoing = self.outgoing.as_ref().ok_or(ChannelError::NotOpen)?;
        let frame = ClientMessage::UserMessage {
            text: text.to_string(),
        }
        .to_frame()?;
        outgoing
            .send(frame)
            .map_err(|e| ChannelError::Transport(e.to_string()))?;

        if let Some(events) = &self.events {
            let _ = events.send(ChannelEvent::user(text)).await;
        }
        Ok(())
    }
}

impl Drop for WebSocketChannel {
    fn drop(&mut self) {
        self.stop_tasks();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(json: &str) -> ServerEvent {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_metadata_connects() {
        let event = parse(
            r#"{"type":"conversation_initiation_metadata","conversation_initiation_metadata_event":{"conversation_id":"conv_1","agent_output_audio_format":"pcm_16000"}}"#,
        );
        assert_eq!(translate(event), Inbound::Connected);
    }

    #[test]
    fn test_transcripts() {
        let agent = parse(
            r#"{"type":"agent_response","agent_response_event":{"agent_response":"Behold!"}}"#,
        );
        assert_eq!(translate(agent), Inbound::Emit(ChannelEvent::agent("Behold!")));

        let user = parse(
            r#"{"type":"user_transcript","user_transcription_event":{"user_transcript":"wow"}}"#,
        );
        assert_eq!(translate(user), Inbound::Emit(ChannelEvent::user("wow")));
    }

    #[test]
    fn test_ping_and_interruption() {
        let ping = parse(r#"{"type":"ping","ping_event":{"event_id":7,"ping_ms":40}}"#);
        assert_eq!(translate(ping), Inbound::Pong(7));

        let cut = parse(r#"{"type":"interruption","interruption_event":{"event_id":3}}"#);
        assert_eq!(translate(cut), Inbound::StopSpeaking);
    }

    #[test]
    fn test_unknown_event_ignored() {
        let event = parse(r#"{"type":"vad_score","vad_score_event":{"vad_score":0.4}}"#);
        assert_eq!(translate(event), Inbound::Ignore);
    }

    #[test]
    fn test_pcm_duration() {
        // 42668 base64 chars decode to 32001 bytes, just over one second
        let one_second = "A".repeat(32_000 / 3 * 4 + 4);
        let duration = pcm_duration(&one_second);
        assert!(duration >= Duration::from_millis(999));
        assert!(duration <= Duration::from_millis(1001));

        assert_eq!(pcm_duration(""), Duration::ZERO);
        // "AAA=" decodes to 2 bytes
        assert_eq!(pcm_duration("AAA="), Duration::from_micros(2 * 1_000_000 / 32_000));
    }

    #[test]
    fn test_client_messages() {
        let json = serde_json::to_string(&ClientMessage::Pong { event_id: 7 }).unwrap();
        assert_eq!(json, r#"{"type":"pong","event_id":7}"#);

        let json = serde_json::to_string(&ClientMessage::UserMessage {
            text: "hello".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"user_message","text":"hello"}"#);
    }

    #[test]
    fn test_connection_url() {
        assert_eq!(
            connection_url("wss://example.test/conv", "agent_1"),
            "wss://example.test/conv?agent_id=agent_1"
        );
        assert_eq!(
            connection_url("wss://example.test/conv?v=2", "agent_1"),
            "wss://example.test/conv?v=2&agent_id=agent_1"
        );
    }

    #[test]
    fn test_connection_url_without_path() {
        assert_eq!(
            connection_url("ws://127.0.0.1:9000", "agent_1"),
            "ws://127.0.0.1:9000/?agent_id=agent_1"
        );
        assert_eq!(
            connection_url("ws://127.0.0.1:9000?v=2", "agent_1"),
            "ws://127.0.0.1:9000/?v=2&agent_id=agent_1"
        );
        assert_eq!(
            connection_url("ws://127.0.0.1:9000/", "agent_1"),
            "ws://127.0.0.1:9000/?agent_id=agent_1"
        );
    }

    /// Local agent service: handshake, one line, then hang up.
    ///
    /// Returns the client's first frame and whether it answered the close.
    async fn hang_up_server(listener: tokio::net::TcpListener) -> (Message, bool) {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
        let first = ws.next().await.unwrap().unwrap();

        ws.send(Message::Text(
            r#"{"type":"conversation_initiation_metadata"}"#.to_string(),
        ))
        .await
        .unwrap();
        ws.send(Message::Text(
            r#"{"type":"agent_response","agent_response_event":{"agent_response":"Goodbye"}}"#
                .to_string(),
        ))
        .await
        .unwrap();
        ws.send(Message::Close(None)).await.unwrap();

        let answered = tokio::time::timeout(Duration::from_secs(2), async {
            while let Some(frame) = ws.next().await {
                match frame {
                    Ok(Message::Close(_)) => return true,
                    Ok(_) => continue,
                    Err(_) => return false,
                }
            }
            false
        })
        .await
        .unwrap_or(false);
        (first, answered)
    }

    #[tokio::test]
    async fn test_service_hang_up_closes_socket() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(hang_up_server(listener));

        let mut channel = WebSocketChannel::new(format!("ws://{addr}"));
        let (tx, mut rx) = crate::events::event_queue();
        channel.open("agent_1", tx).await.unwrap();

        let mut received = Vec::new();
        while let Ok(Some(event)) =
            tokio::time::timeout(Duration::from_secs(2), rx.recv()).await
        {
            let done = event == ChannelEvent::Disconnect;
            received.push(event);
            if done {
                break;
            }
        }
        assert_eq!(
            received,
            vec![
                ChannelEvent::Connect,
                ChannelEvent::agent("Goodbye"),
                ChannelEvent::Disconnect,
            ]
        );

        let (first, answered) = server.await.unwrap();
        assert!(first.to_text().unwrap().contains("conversation_initiation_client_data"));
        assert!(answered, "client left the socket open after the service closed it");

        assert_eq!(channel.status(), ConnectionStatus::Disconnected);
        channel.close().await.unwrap();
    }

    #[test]
    fn test_speech_clock_queues_chunks() {
        let clock = SpeechClock::default();
        let now = Instant::now();
        clock.extend(Duration::from_millis(500), now);
        clock.extend(Duration::from_millis(500), now);

        assert!(clock.is_speaking(now + Duration::from_millis(900)));
        assert!(!clock.is_speaking(now + Duration::from_millis(1000)));

        clock.stop();
        assert!(!clock.is_speaking(now));
    }

    #[tokio::test]
    async fn test_send_text_before_open() {
        let mut channel = WebSocketChannel::new("ws://127.0.0.1:9");
        assert!(matches!(
            channel.send_text("hi").await,
            Err(ChannelError::NotOpen)
        ));
        assert_eq!(channel.status(), ConnectionStatus::Disconnected);
        assert!(!channel.is_speaking());
    }
}
