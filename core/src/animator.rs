//! Character Animator
//!
//! Presentation state machine for the Magic Man sprite. It is driven by two
//! inputs, `visible` and `speaking`, and by elapsed time fed through
//! [`CharacterAnimator::update`]. It owns no external resource.
//!
//! # Phases
//!
//! ```text
//!            visible                 poof done
//!   Hidden ──────────▶ Appearing ──────────────▶ Present
//!     ▲                   │                        │
//!     │    !visible       │                        │ !visible
//!     ├───────────────────┘                        │
//!     │                                            ▼
//!     │◀───────────── (Immediate) ─────────────────┤
//!     │                                            │ (Poof)
//!     └────────────── Disappearing ◀───────────────┘
//!         poof done
//! ```
//!
//! # Timers
//!
//! Each phase carries its own frame timer inside its state variant. Leaving a
//! phase drops the timer, so no frame cycling can outlive the phase that
//! started it, and two cycles can never run at once.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::AnimationConfig;

/// Sprite asset identifiers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrameId {
    /// Mouth closed, breathing in
    MouthClosedA,
    /// Mouth closed, breathing out
    MouthClosedB,
    /// Mouth slightly open
    MouthOpenA,
    /// Mouth wide open
    MouthOpenB,
    /// Mouth half open
    MouthOpenC,
    /// Mouth round
    MouthOpenD,
    /// Small smoke puff
    PoofA,
    /// Large smoke puff
    PoofB,
}

/// Idle (breathing) cycle
pub const MOUTH_CLOSED_FRAMES: [FrameId; 2] = [FrameId::MouthClosedA, FrameId::MouthClosedB];

/// Talking cycle
pub const MOUTH_OPEN_FRAMES: [FrameId; 4] = [
    FrameId::MouthOpenA,
    FrameId::MouthOpenB,
    FrameId::MouthOpenC,
    FrameId::MouthOpenD,
];

/// Appear/disappear transition
pub const POOF_FRAMES: [FrameId; 2] = [FrameId::PoofA, FrameId::PoofB];

/// Animator phase
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Nothing on screen
    Hidden,
    /// Poof-in playing
    Appearing,
    /// Character on screen, idle or talking
    Present,
    /// Poof-out playing
    Disappearing,
}

/// What the animator is currently playing
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AnimationKind {
    /// Breathing with mouth closed
    Idle,
    /// Mouth flaps
    Talking,
    /// Appearing poof
    PoofIn,
    /// Disappearing poof
    PoofOut,
}

/// Direction of a finished poof
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PoofDirection {
    /// Character has appeared
    In,
    /// Character has vanished
    Out,
}

/// How the character leaves when `visible` turns false
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitTransition {
    /// Hide at once
    #[default]
    Immediate,
    /// Play the poof sequence, then hide
    Poof,
}

/// Called when a poof sequence finishes
pub type PoofCallback = Box<dyn FnMut(PoofDirection) + Send>;

/// Fixed-interval frame timer
#[derive(Clone, Debug)]
struct FrameTimer {
    interval: Duration,
    elapsed: Duration,
}

impl FrameTimer {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            elapsed: Duration::ZERO,
        }
    }

    /// Accumulate time and return how many intervals elapsed
    fn advance(&mut self, delta: Duration) -> u32 {
        self.elapsed += delta;
        let interval = self.interval.as_nanos().max(1);
        let ticks = self.elapsed.as_nanos() / interval;
        if ticks > 0 {
            let consumed = self.interval * u32::try_from(ticks).unwrap_or(u32::MAX);
            self.elapsed = self.elapsed.saturating_sub(consumed);
        }
        u32::try_from(ticks).unwrap_or(u32::MAX)
    }

    fn remaining(&self) -> Duration {
        self.interval.saturating_sub(self.elapsed)
    }
}

#[derive(Clone, Debug)]
struct PoofPlayback {
    frame: usize,
    timer: FrameTimer,
}

impl PoofPlayback {
    fn new(interval: Duration) -> Self {
        Self {
            frame: 0,
            timer: FrameTimer::new(interval),
        }
    }

    /// Advance; returns `true` once the last frame has been shown in full
    fn advance(&mut self, delta: Duration) -> bool {
        for _ in 0..self.timer.advance(delta) {
            if self.frame + 1 >= POOF_FRAMES.len() {
                return true;
            }
            self.frame += 1;
        }
        false
    }
}

#[derive(Clone, Debug)]
struct CyclePlayback {
    idle_frame: usize,
    talk_frame: usize,
    timer: FrameTimer,
}

#[derive(Clone, Debug)]
enum CharacterState {
    Hidden,
    Appearing(PoofPlayback),
    Present(CyclePlayback),
    Disappearing(PoofPlayback),
}

/// Sprite state machine for the Magic Man character
pub struct CharacterAnimator {
    state: CharacterState,
    visible: bool,
    speaking: bool,
    timing: AnimationConfig,
    on_poof_complete: Option<PoofCallback>,
    frame_changed: bool,
}

impl CharacterAnimator {
    /// Create a hidden animator with the given timing
    pub fn new(timing: AnimationConfig) -> Self {
        Self {
            state: CharacterState::Hidden,
            visible: false,
            speaking: false,
            timing,
            on_poof_complete: None,
            frame_changed: false,
        }
    }

    /// Register a callback for finished poof sequences
    pub fn set_on_poof_complete(&mut self, callback: PoofCallback) {
        self.on_poof_complete = Some(callback);
    }

    /// Update the `visible` input
    pub fn set_visible(&mut self, visible: bool) {
        if self.visible == visible {
            return;
        }
        self.visible = visible;

        let next = match (&self.state, visible) {
            (CharacterState::Hidden | CharacterState::Disappearing(_), true) => Some(
                CharacterState::Appearing(PoofPlayback::new(self.timing.poof_frame())),
            ),
            (CharacterState::Appearing(_), false) => Some(CharacterState::Hidden),
            (CharacterState::Present(_), false) => Some(match self.timing.exit_transition {
                ExitTransition::Immediate => CharacterState::Hidden,
                ExitTransition::Poof => {
                    CharacterState::Disappearing(PoofPlayback::new(self.timing.poof_frame()))
                }
            }),
            _ => None,
        };

        if let Some(state) = next {
            self.enter(state);
        }
    }

    /// Update the `speaking` input
    pub fn set_speaking(&mut self, speaking: bool) {
        if self.speaking == speaking {
            return;
        }
        self.speaking = speaking;

        let interval = self.cycle_interval();
        if let CharacterState::Present(cycle) = &mut self.state {
            cycle.timer = FrameTimer::new(interval);
            if speaking {
                cycle.talk_frame = 0;
            } else {
                cycle.idle_frame = 0;
            }
            self.frame_changed = true;
        }
    }

    /// Advance the active phase's timer
    ///
    /// Returns `true` if the displayed frame changed.
    pub fn update(&mut self, delta: Duration) -> bool {
        let speaking = self.speaking;
        let mut completed = None;
        let mut changed = false;

        match &mut self.state {
            CharacterState::Hidden => {}
            CharacterState::Appearing(poof) => {
                let before = poof.frame;
                if poof.advance(delta) {
                    completed = Some(PoofDirection::In);
                } else {
                    changed = poof.frame != before;
                }
            }
            CharacterState::Disappearing(poof) => {
                let before = poof.frame;
                if poof.advance(delta) {
                    completed = Some(PoofDirection::Out);
                } else {
                    changed = poof.frame != before;
                }
            }
            CharacterState::Present(cycle) => {
                let ticks = cycle.timer.advance(delta) as usize;
                if ticks > 0 {
                    if speaking {
                        cycle.talk_frame = (cycle.talk_frame + ticks) % MOUTH_OPEN_FRAMES.len();
                    } else {
                        cycle.idle_frame = (cycle.idle_frame + ticks) % MOUTH_CLOSED_FRAMES.len();
                    }
                    changed = true;
                }
            }
        }

        if let Some(direction) = completed {
            let next = match direction {
                PoofDirection::In => self.present_state(),
                PoofDirection::Out => CharacterState::Hidden,
            };
            self.enter(next);
            self.fire_poof_complete(direction);
            changed = true;
        }
        self.frame_changed = self.frame_changed || changed;
        changed
    }

    /// Return to `Hidden` and drop every running timer
    pub fn reset(&mut self) {
        self.visible = false;
        self.speaking = false;
        self.enter(CharacterState::Hidden);
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        match self.state {
            CharacterState::Hidden => Phase::Hidden,
            CharacterState::Appearing(_) => Phase::Appearing,
            CharacterState::Present(_) => Phase::Present,
            CharacterState::Disappearing(_) => Phase::Disappearing,
        }
    }

    /// Animation playing in the current phase (`None` while hidden)
    pub fn animation_kind(&self) -> Option<AnimationKind> {
        match self.state {
            CharacterState::Hidden => None,
            CharacterState::Appearing(_) => Some(AnimationKind::PoofIn),
            CharacterState::Disappearing(_) => Some(AnimationKind::PoofOut),
            CharacterState::Present(_) if self.speaking => Some(AnimationKind::Talking),
            CharacterState::Present(_) => Some(AnimationKind::Idle),
        }
    }

    /// Index into the active frame list
    pub fn frame_index(&self) -> usize {
        match &self.state {
            CharacterState::Hidden => 0,
            CharacterState::Appearing(poof) | CharacterState::Disappearing(poof) => poof.frame,
            CharacterState::Present(cycle) if self.speaking => cycle.talk_frame,
            CharacterState::Present(cycle) => cycle.idle_frame,
        }
    }

    /// Frame to draw (`None` while hidden)
    pub fn current_frame(&self) -> Option<FrameId> {
        let index = self.frame_index();
        match self.animation_kind()? {
            AnimationKind::PoofIn | AnimationKind::PoofOut => POOF_FRAMES.get(index).copied(),
            AnimationKind::Talking => MOUTH_OPEN_FRAMES.get(index).copied(),
            AnimationKind::Idle => MOUTH_CLOSED_FRAMES.get(index).copied(),
        }
    }

    /// Whether the character body is drawn (present only)
    pub fn shows_character(&self) -> bool {
        matches!(self.state, CharacterState::Present(_))
    }

    /// Time until the next frame change (long when nothing is animating)
    pub fn time_to_next_frame(&self) -> Duration {
        match &self.state {
            CharacterState::Hidden => Duration::from_secs(60),
            CharacterState::Appearing(poof) | CharacterState::Disappearing(poof) => {
                poof.timer.remaining()
            }
            CharacterState::Present(cycle) => cycle.timer.remaining(),
        }
    }

    /// The `visible` input as last set
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// The `speaking` input as last set
    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    /// Exit transition in use
    pub fn exit_transition(&self) -> ExitTransition {
        self.timing.exit_transition
    }

    /// Whether the frame changed since the last call, clearing the flag
    pub fn take_frame_changed(&mut self) -> bool {
        std::mem::take(&mut self.frame_changed)
    }

    fn cycle_interval(&self) -> Duration {
        if self.speaking {
            self.timing.talking_frame()
        } else {
            self.timing.idle_frame()
        }
    }

    fn present_state(&self) -> CharacterState {
        CharacterState::Present(CyclePlayback {
            idle_frame: 0,
            talk_frame: 0,
            timer: FrameTimer::new(self.cycle_interval()),
        })
    }

    fn enter(&mut self, state: CharacterState) {
        tracing::trace!(from = ?self.phase(), "Character phase change");
        self.state = state;
        self.frame_changed = true;
    }

    fn fire_poof_complete(&mut self, direction: PoofDirection) {
        if let Some(callback) = self.on_poof_complete.as_mut() {
            callback(direction);
        }
    }
}

impl Default for CharacterAnimator {
    fn default() -> Self {
        Self::new(AnimationConfig::default())
    }
}

impl std::fmt::Debug for CharacterAnimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CharacterAnimator")
            .field("phase", &self.phase())
            .field("frame", &self.current_frame())
            .field("visible", &self.visible)
            .field("speaking", &self.speaking)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::sync::{Arc, Mutex};

    const POOF: Duration = Duration::from_millis(150);
    const IDLE: Duration = Duration::from_millis(800);
    const TALK: Duration = Duration::from_millis(150);

    fn poof_timing() -> AnimationConfig {
        AnimationConfig {
            exit_transition: ExitTransition::Poof,
            ..AnimationConfig::default()
        }
    }

    fn appeared(timing: AnimationConfig) -> CharacterAnimator {
        let mut animator = CharacterAnimator::new(timing);
        animator.set_visible(true);
        animator.update(POOF * 2);
        assert_eq!(animator.phase(), Phase::Present);
        animator
    }

    #[test]
    fn test_starts_hidden() {
        let animator = CharacterAnimator::default();
        assert_eq!(animator.phase(), Phase::Hidden);
        assert_eq!(animator.current_frame(), None);
        assert_eq!(animator.animation_kind(), None);
    }

    #[test]
    fn test_poof_in_sequence() {
        let mut animator = CharacterAnimator::default();
        animator.set_visible(true);
        assert_eq!(animator.phase(), Phase::Appearing);
        assert_eq!(animator.current_frame(), Some(FrameId::PoofA));

        animator.update(POOF);
        assert_eq!(animator.current_frame(), Some(FrameId::PoofB));
        assert_eq!(animator.phase(), Phase::Appearing);

        animator.update(POOF);
        assert_eq!(animator.phase(), Phase::Present);
        assert_eq!(animator.current_frame(), Some(FrameId::MouthClosedA));
    }

    #[test]
    fn test_poof_complete_callback() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut animator = CharacterAnimator::new(poof_timing());
        animator.set_on_poof_complete(Box::new(move |dir| sink.lock().unwrap().push(dir)));

        animator.set_visible(true);
        animator.update(POOF * 2);
        animator.set_visible(false);
        assert_eq!(animator.phase(), Phase::Disappearing);
        animator.update(POOF * 2);
        assert_eq!(animator.phase(), Phase::Hidden);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![PoofDirection::In, PoofDirection::Out]
        );
    }

    #[test]
    fn test_speaking_cannot_interrupt_poof() {
        let mut animator = CharacterAnimator::default();
        animator.set_visible(true);
        animator.set_speaking(true);
        assert_eq!(animator.phase(), Phase::Appearing);
        assert_eq!(animator.animation_kind(), Some(AnimationKind::PoofIn));

        animator.update(POOF);
        assert_eq!(animator.phase(), Phase::Appearing);

        animator.update(POOF);
        assert_eq!(animator.phase(), Phase::Present);
        assert_eq!(animator.animation_kind(), Some(AnimationKind::Talking));
        assert_eq!(animator.current_frame(), Some(FrameId::MouthOpenA));
    }

    #[test]
    fn test_idle_cycle_is_slow() {
        let mut animator = appeared(AnimationConfig::default());

        animator.update(IDLE - Duration::from_millis(1));
        assert_eq!(animator.current_frame(), Some(FrameId::MouthClosedA));

        animator.update(Duration::from_millis(1));
        assert_eq!(animator.current_frame(), Some(FrameId::MouthClosedB));

        animator.update(IDLE);
        assert_eq!(animator.current_frame(), Some(FrameId::MouthClosedA));
    }

    #[test]
    fn test_talking_cycle_is_fast() {
        let mut animator = appeared(AnimationConfig::default());
        animator.set_speaking(true);

        let mut frames = vec![animator.current_frame()];
        for _ in 0..4 {
            animator.update(TALK);
            frames.push(animator.current_frame());
        }

        assert_eq!(
            frames,
            vec![
                Some(FrameId::MouthOpenA),
                Some(FrameId::MouthOpenB),
                Some(FrameId::MouthOpenC),
                Some(FrameId::MouthOpenD),
                Some(FrameId::MouthOpenA),
            ]
        );
    }

    #[test]
    fn test_speaking_switch_restarts_cycle_timer() {
        let mut animator = appeared(AnimationConfig::default());
        animator.set_speaking(true);
        animator.update(TALK * 2);
        assert_eq!(animator.current_frame(), Some(FrameId::MouthOpenC));

        // Partially through an idle frame, then back to talking
        animator.set_speaking(false);
        assert_eq!(animator.current_frame(), Some(FrameId::MouthClosedA));
        animator.update(IDLE / 2);
        animator.set_speaking(true);
        assert_eq!(animator.current_frame(), Some(FrameId::MouthOpenA));
        assert_eq!(animator.time_to_next_frame(), TALK);
    }

    #[test]
    fn test_immediate_exit_hides_at_once() {
        let mut animator = appeared(AnimationConfig::default());
        animator.set_speaking(true);
        animator.set_visible(false);

        assert_eq!(animator.phase(), Phase::Hidden);
        assert_eq!(animator.current_frame(), None);
    }

    #[test]
    fn test_poof_exit_plays_poof_out() {
        let mut animator = appeared(poof_timing());
        animator.set_visible(false);

        assert_eq!(animator.phase(), Phase::Disappearing);
        assert_eq!(animator.animation_kind(), Some(AnimationKind::PoofOut));
        assert_eq!(animator.current_frame(), Some(FrameId::PoofA));

        animator.update(POOF);
        assert_eq!(animator.current_frame(), Some(FrameId::PoofB));
        animator.update(POOF);
        assert_eq!(animator.phase(), Phase::Hidden);
    }

    #[test]
    fn test_reappear_during_poof_out() {
        let mut animator = appeared(poof_timing());
        animator.set_visible(false);
        animator.update(POOF);
        animator.set_visible(true);

        assert_eq!(animator.phase(), Phase::Appearing);
        assert_eq!(animator.frame_index(), 0);
    }

    #[test]
    fn test_hide_during_poof_in_cancels_it() {
        let mut animator = CharacterAnimator::default();
        animator.set_visible(true);
        animator.update(POOF);
        animator.set_visible(false);
        assert_eq!(animator.phase(), Phase::Hidden);

        // The cancelled poof never completes later
        animator.update(Duration::from_secs(5));
        assert_eq!(animator.phase(), Phase::Hidden);
    }

    #[test]
    fn test_repeated_visible_starts_no_new_poof() {
        let mut animator = CharacterAnimator::default();
        animator.set_visible(true);
        animator.update(POOF);
        assert_eq!(animator.frame_index(), 1);

        animator.set_visible(true);
        assert_eq!(animator.phase(), Phase::Appearing);
        assert_eq!(animator.frame_index(), 1);

        animator.update(POOF);
        animator.set_visible(true);
        assert_eq!(animator.phase(), Phase::Present);

        let mut hidden = CharacterAnimator::default();
        hidden.set_visible(false);
        assert_eq!(hidden.phase(), Phase::Hidden);
    }

    #[test]
    fn test_no_cycling_outside_present() {
        let mut animator = CharacterAnimator::default();
        animator.set_speaking(true);
        assert!(!animator.update(Duration::from_secs(10)));
        assert_eq!(animator.current_frame(), None);
    }

    #[test]
    fn test_reset_drops_timers() {
        let mut animator = appeared(AnimationConfig::default());
        animator.set_speaking(true);
        animator.reset();

        assert_eq!(animator.phase(), Phase::Hidden);
        assert!(!animator.is_visible());
        assert!(!animator.is_speaking());
        assert!(!animator.update(Duration::from_secs(10)));
    }

    #[test]
    fn test_frame_changed_flag() {
        let mut animator = CharacterAnimator::default();
        assert!(!animator.take_frame_changed());

        animator.set_visible(true);
        assert!(animator.take_frame_changed());
        assert!(!animator.take_frame_changed());

        animator.update(Duration::from_millis(10));
        assert!(!animator.take_frame_changed());
    }

    #[test]
    fn test_random_toggles_keep_phase_consistent() {
        for exit in [ExitTransition::Immediate, ExitTransition::Poof] {
            let mut rng = StdRng::seed_from_u64(0x4d61_6769);
            let mut animator = CharacterAnimator::new(AnimationConfig {
                exit_transition: exit,
                ..AnimationConfig::default()
            });

            for _ in 0..2_000 {
                match rng.gen_range(0..3) {
                    0 => animator.set_visible(rng.gen_bool(0.5)),
                    1 => animator.set_speaking(rng.gen_bool(0.5)),
                    _ => {
                        animator.update(Duration::from_millis(rng.gen_range(0..400)));
                    }
                }

                let kind = animator.animation_kind();
                match animator.phase() {
                    Phase::Hidden => assert_eq!(kind, None),
                    Phase::Appearing => assert_eq!(kind, Some(AnimationKind::PoofIn)),
                    Phase::Disappearing => {
                        assert_eq!(exit, ExitTransition::Poof);
                        assert_eq!(kind, Some(AnimationKind::PoofOut));
                    }
                    Phase::Present => {
                        assert!(animator.is_visible());
                        assert!(matches!(
                            kind,
                            Some(AnimationKind::Idle | AnimationKind::Talking)
                        ));
                    }
                }

                if !animator.is_visible() {
                    assert!(!animator.shows_character());
                }
            }
        }
    }
}
