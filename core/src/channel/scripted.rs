//! Scripted Voice Channel
//!
//! Plays a timed script of agent and user lines without any network. Used by
//! the `--demo` mode and by tests. Failures can be injected for `open` and
//! `close`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use super::{LiveState, VoiceChannel};
use crate::error::ChannelError;
use crate::events::{ChannelEvent, EventSender};
use crate::session::ConnectionStatus;

/// What happens at a script cue
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScriptStep {
    /// Agent says a line and speaks for `speak_ms`
    Agent {
        /// Transcript text
        text: String,
        /// How long the speaking flag stays up
        speak_ms: u64,
    },
    /// A user transcript line
    User {
        /// Transcript text
        text: String,
    },
    /// Channel-reported error
    Error {
        /// Error text
        message: String,
    },
    /// Agent closes the channel
    HangUp,
}

/// A step and the pause before it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptCue {
    /// Pause before the step, measured from the end of the previous step
    pub after_ms: u64,
    /// The step
    pub step: ScriptStep,
}

/// Ordered list of cues
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Script {
    cues: Vec<ScriptCue>,
}

impl Script {
    /// Empty script (connects, then stays silent)
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an agent line
    pub fn agent(mut self, after_ms: u64, text: impl Into<String>, speak_ms: u64) -> Self {
        self.cues.push(ScriptCue {
            after_ms,
            step: ScriptStep::Agent {
                text: text.into(),
                speak_ms,
            },
        });
        self
    }

    /// Add a user line
    pub fn user(mut self, after_ms: u64, text: impl Into<String>) -> Self {
        self.cues.push(ScriptCue {
            after_ms,
            step: ScriptStep::User { text: text.into() },
        });
        self
    }

    /// Add a channel error
    pub fn error(mut self, after_ms: u64, message: impl Into<String>) -> Self {
        self.cues.push(ScriptCue {
            after_ms,
            step: ScriptStep::Error {
                message: message.into(),
            },
        });
        self
    }

    /// End with the agent hanging up
    pub fn hang_up(mut self, after_ms: u64) -> Self {
        self.cues.push(ScriptCue {
            after_ms,
            step: ScriptStep::HangUp,
        });
        self
    }

    /// The cues in order
    pub fn cues(&self) -> &[ScriptCue] {
        &self.cues
    }

    /// The built-in demo conversation
    pub fn magic_man_demo() -> Self {
        Self::new()
            .agent(
                1200,
                "Ahh, a visitor! Step closer, seeker. The Magic Man sees all.",
                3200,
            )
            .user(2500, "What do you see?")
            .agent(
                900,
                "I see a terminal, glowing in the dark, and someone who types when they should speak.",
                4200,
            )
            .user(3000, "Can you do a trick?")
            .agent(
                800,
                "Behold! I have made your free time disappear. Truly my finest work.",
                3600,
            )
            .user(3500, "That's not a trick.")
            .agent(900, "Bah. This is boring. Goodbye!", 2000)
            .hang_up(600)
    }
}

/// Voice channel that plays a [`Script`]
pub struct ScriptedChannel {
    script: Script,
    live: Arc<LiveState>,
    task: Option<JoinHandle<()>>,
    events: Option<EventSender>,
    connect_delay: Duration,
    fail_open: Option<String>,
    fail_close: Option<String>,
}

impl ScriptedChannel {
    /// Create a channel for `script`
    pub fn new(script: Script) -> Self {
        Self {
            script,
            live: Arc::new(LiveState::default()),
            task: None,
            events: None,
            connect_delay: Duration::ZERO,
            fail_open: None,
            fail_close: None,
        }
    }

    /// Simulated handshake time
    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    /// Make every `open` fail with `reason`
    pub fn failing_open(mut self, reason: impl Into<String>) -> Self {
        self.fail_open = Some(reason.into());
        self
    }

    /// Make every `close` fail with `reason`
    pub fn failing_close(mut self, reason: impl Into<String>) -> Self {
        self.fail_close = Some(reason.into());
        self
    }

    fn stop_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn play(script: Script, live: Arc<LiveState>, events: EventSender) {
    for cue in script.cues {
        tokio::time::sleep(Duration::from_millis(cue.after_ms)).await;

        let event = match cue.step {
            ScriptStep::Agent { text, speak_ms } => {
                live.set_speaking(true);
                if events.send(ChannelEvent::agent(text)).await.is_err() {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(speak_ms)).await;
                live.set_speaking(false);
                continue;
            }
            ScriptStep::User { text } => ChannelEvent::user(text),
            ScriptStep::Error { message } => ChannelEvent::Error { message },
            ScriptStep::HangUp => {
                live.set_connected(false);
                let _ = events.send(ChannelEvent::Disconnect).await;
                tracing::debug!("Scripted agent hung up");
                return;
            }
        };

        if events.send(event).await.is_err() {
            return;
        }
    }
}

#[async_trait]
impl VoiceChannel for ScriptedChannel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn open(&mut self, agent_id: &str, events: EventSender) -> Result<(), ChannelError> {
        if self.task.is_some() && self.live.status() == ConnectionStatus::Connected {
            return Err(ChannelError::Connect("channel already open".into()));
        }
        self.stop_task();

        if let Some(reason) = &self.fail_open {
            return Err(ChannelError::Connect(reason.clone()));
        }
        if !self.connect_delay.is_zero() {
            tokio::time::sleep(self.connect_delay).await;
        }

        tracing::debug!(agent_id, cues = self.script.cues().len(), "Scripted channel open");
        self.live.set_connected(true);
        events
            .send(ChannelEvent::Connect)
            .await
            .map_err(|_| ChannelError::Connect("event queue closed".into()))?;

        self.task = Some(tokio::spawn(play(
            self.script.clone(),
            Arc::clone(&self.live),
            events.clone(),
        )));
        self.events = Some(events);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        self.stop_task();

        if let Some(reason) = &self.fail_close {
            return Err(ChannelError::Transport(reason.clone()));
        }

        let was_connected = self.live.status() == ConnectionStatus::Connected;
        self.live.set_connected(false);
        if let Some(events) = self.events.take() {
            if was_connected {
                let _ = events.send(ChannelEvent::Disconnect).await;
            }
        }
        Ok(())
    }

    fn status(&self) -> ConnectionStatus {
        self.live.status()
    }

    fn is_speaking(&self) -> bool {
        self.live.is_speaking()
    }

    async fn send_text(&mut self, text: &str) -> Result<(), ChannelError> {
        let events = self.events.as_ref().ok_or(ChannelError::NotOpen)?;
        events
            .send(ChannelEvent::user(text))
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))
    }
}

impl Drop for ScriptedChannel {
    fn drop(&mut self) {
        self.stop_task();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::event_queue;
    use pretty_assertions::assert_eq;

    #[tokio::test(start_paused = true)]
    async fn test_plays_script_in_order() {
        let script = Script::new()
            .agent(10, "hello", 50)
            .user(10, "hi")
            .hang_up(10);
        let mut channel = ScriptedChannel::new(script);
        let (tx, mut rx) = event_queue();

        channel.open("agent_test", tx).await.unwrap();
        assert_eq!(channel.status(), ConnectionStatus::Connected);

        let mut seen = Vec::new();
        while let Some(event) = rx.recv().await {
            let done = event == ChannelEvent::Disconnect;
            seen.push(event);
            if done {
                break;
            }
        }

        assert_eq!(
            seen,
            vec![
                ChannelEvent::Connect,
                ChannelEvent::agent("hello"),
                ChannelEvent::user("hi"),
                ChannelEvent::Disconnect,
            ]
        );
        assert_eq!(channel.status(), ConnectionStatus::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_speaking_flag_follows_agent_lines() {
        let mut channel = ScriptedChannel::new(Script::new().agent(0, "a long line", 1000));
        let (tx, mut rx) = event_queue();
        channel.open("agent_test", tx).await.unwrap();

        assert_eq!(rx.recv().await, Some(ChannelEvent::Connect));
        assert_eq!(rx.recv().await, Some(ChannelEvent::agent("a long line")));
        assert!(channel.is_speaking());

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(!channel.is_speaking());
    }

    #[tokio::test]
    async fn test_open_failure() {
        let mut channel = ScriptedChannel::new(Script::new()).failing_open("no route");
        let (tx, _rx) = event_queue();
        let err = channel.open("agent_test", tx).await.unwrap_err();
        assert!(err.to_string().contains("no route"));
        assert_eq!(channel.status(), ConnectionStatus::Disconnected);
    }

    #[tokio::test]
    async fn test_close_emits_disconnect_and_stops_script() {
        let mut channel = ScriptedChannel::new(Script::magic_man_demo());
        let (tx, mut rx) = event_queue();
        channel.open("agent_test", tx).await.unwrap();
        channel.close().await.unwrap();

        assert_eq!(rx.recv().await, Some(ChannelEvent::Connect));
        assert_eq!(rx.recv().await, Some(ChannelEvent::Disconnect));
        assert_eq!(channel.status(), ConnectionStatus::Disconnected);
        assert!(!channel.is_speaking());
    }

    #[tokio::test]
    async fn test_close_failure_is_reported() {
        let mut channel = ScriptedChannel::new(Script::new()).failing_close("socket wedged");
        let (tx, _rx) = event_queue();
        channel.open("agent_test", tx).await.unwrap();
        assert!(matches!(
            channel.close().await,
            Err(ChannelError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_send_text_requires_open_channel() {
        let mut channel = ScriptedChannel::new(Script::new());
        assert!(matches!(
            channel.send_text("hello").await,
            Err(ChannelError::NotOpen)
        ));

        let (tx, mut rx) = event_queue();
        channel.open("agent_test", tx).await.unwrap();
        channel.send_text("hello").await.unwrap();
        assert_eq!(rx.recv().await, Some(ChannelEvent::Connect));
        assert_eq!(rx.recv().await, Some(ChannelEvent::user("hello")));
    }

    #[test]
    fn test_demo_script_ends_with_hang_up() {
        let demo = Script::magic_man_demo();
        assert_eq!(demo.cues().last().map(|c| &c.step), Some(&ScriptStep::HangUp));
    }
}
