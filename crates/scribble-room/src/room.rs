//! The per-room game state machine.
//!
//! [`Room`] is plain synchronous state. Every public method is one
//! run-to-completion reaction: it mutates the room and returns the events
//! to deliver, in order. Delays (pacing pauses, the draw timer, hint
//! checks, the choice timeout) are [`TurnTimer`]s whose callbacks post an
//! [`AlarmFired`] into the channel given at construction. The owner feeds
//! those back through [`Room::handle_alarm`], which drops any alarm whose
//! timer was cleared or re-armed in the meantime.

use std::collections::VecDeque;
use std::time::Duration;

use scribble_protocol::{
    ChatMode, ChoosingView, LiveState, MatchView, PlayerId, PlayerInfo, Recipient, RoomId,
    RoomSnapshot, ServerEvent, SettingUpdate, Settings, Visibility,
};
use scribble_timer::{HintSchedule, TimerTicket, TurnTimer};
use tokio::sync::mpsc;

use crate::scoring::{drawer_score, guesser_score, unguessed_at_most};
use crate::{Collaborators, RoomConfig, RoomError, RoomStatus};

/// One event and who receives it.
pub type Outbound = (Recipient, ServerEvent);

/// What a fired timer asks the room to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alarm {
    /// Round announcement is over; pick the first drawer.
    BeginTurn,
    /// Post-turn pacing is over; pick the next drawer.
    NextTurn,
    /// Final standings have been shown; reset to the lobby.
    Restart,
    /// The drawer did not pick a word in time.
    ChoiceTimeout,
    /// The draw time ran out.
    MatchTimeout,
    /// Hint check number `n` of this turn.
    HintCheck(usize),
}

/// Posted by a timer callback. Only meaningful to the room that armed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmFired {
    pub alarm: Alarm,
    pub ticket: TimerTicket,
}

#[derive(Debug, Clone)]
struct Player {
    id: PlayerId,
    name: String,
    score: u32,
}

impl Player {
    fn info(&self) -> PlayerInfo {
        PlayerInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            score: self.score,
        }
    }
}

/// The secret word with its per-character reveal state.
#[derive(Debug, Clone)]
struct SecretWord {
    text: String,
    chars: Vec<char>,
    revealed: Vec<bool>,
}

impl SecretWord {
    fn new(text: String) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let revealed = chars.iter().map(|c| *c == ' ').collect();
        Self {
            text,
            chars,
            revealed,
        }
    }

    fn masked(&self) -> String {
        self.chars
            .iter()
            .zip(&self.revealed)
            .map(|(c, shown)| if *shown { *c } else { '_' })
            .collect()
    }

    fn hidden(&self) -> Vec<usize> {
        self.revealed
            .iter()
            .enumerate()
            .filter(|(_, shown)| !**shown)
            .map(|(i, _)| i)
            .collect()
    }

    fn len(&self) -> usize {
        self.chars.len()
    }

    fn matches(&self, guess: &str) -> bool {
        normalize(guess) == normalize(&self.text)
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

#[derive(Debug)]
enum TurnPhase {
    Choosing { choices: Vec<String> },
    Drawing { word: SecretWord },
}

/// State of the current turn, from drawer pick to close-out.
#[derive(Debug)]
struct MatchState {
    drawer_id: PlayerId,
    drawer_name: String,
    phase: TurnPhase,
    hints_used: u32,
    hint_plan: HintSchedule,
    /// Correct guessers with the score each earned, in guess order.
    correct: Vec<(PlayerId, u32)>,
}

impl MatchState {
    fn has_guessed(&self, id: &PlayerId) -> bool {
        self.correct.iter().any(|(p, _)| p == id)
    }

    fn knows_word(&self, id: &PlayerId) -> bool {
        self.drawer_id == *id || self.has_guessed(id)
    }

    fn word(&self) -> Option<&SecretWord> {
        match &self.phase {
            TurnPhase::Drawing { word } => Some(word),
            TurnPhase::Choosing { .. } => None,
        }
    }
}

/// A single game room.
pub struct Room {
    id: RoomId,
    visibility: Visibility,
    host_id: PlayerId,
    status: RoomStatus,
    settings: Settings,
    config: RoomConfig,
    /// Join order.
    players: Vec<Player>,
    round: u32,
    /// Players yet to draw this round.
    remaining: VecDeque<PlayerId>,
    turn: Option<MatchState>,
    collaborators: Collaborators,

    /// Choice timeout while choosing, draw time while drawing.
    turn_timer: TurnTimer,
    hint_timers: Vec<TurnTimer>,
    /// Announcement, post-turn, and results pauses.
    pacing: TurnTimer,
    alarms: mpsc::UnboundedSender<AlarmFired>,

    outbox: Vec<Outbound>,
}

impl Room {
    /// Creates a room in the lobby with `host` as its only player.
    pub fn new(
        id: RoomId,
        visibility: Visibility,
        host: (PlayerId, String),
        config: RoomConfig,
        collaborators: Collaborators,
        alarms: mpsc::UnboundedSender<AlarmFired>,
    ) -> Self {
        let (host_id, host_name) = host;
        Self {
            id,
            visibility,
            host_id: host_id.clone(),
            status: RoomStatus::Waiting,
            settings: Settings::default(),
            config,
            players: vec![Player {
                id: host_id,
                name: host_name,
                score: 0,
            }],
            round: 0,
            remaining: VecDeque::new(),
            turn: None,
            collaborators,
            turn_timer: TurnTimer::new(),
            hint_timers: Vec::new(),
            pacing: TurnTimer::new(),
            alarms,
            outbox: Vec::new(),
        }
    }

    // -----------------------------------------------------------------
    // Membership
    // -----------------------------------------------------------------

    /// Seats a player and returns what they need to render the room,
    /// including the live turn if one is running. Membership broadcasts
    /// are left to the caller.
    pub fn add_player(&mut self, id: PlayerId, name: String) -> Result<RoomSnapshot, RoomError> {
        if self.has_player(&id) {
            return Err(RoomError::AlreadyInRoom(id, self.id.clone()));
        }
        if self.players.len() >= self.settings.total_players {
            return Err(RoomError::RoomFull(self.id.clone()));
        }

        tracing::info!(room_id = %self.id, player_id = %id, "player joined");
        self.players.push(Player { id, name, score: 0 });
        Ok(self.snapshot())
    }

    /// Removes a player and resolves whatever their departure interrupts.
    pub fn remove_player(&mut self, id: &PlayerId) -> Result<Vec<Outbound>, RoomError> {
        let index = self
            .players
            .iter()
            .position(|p| p.id == *id)
            .ok_or_else(|| RoomError::NotInRoom(id.clone()))?;
        self.players.remove(index);
        self.remaining.retain(|p| p != id);
        if let Some(turn) = self.turn.as_mut() {
            turn.correct.retain(|(p, _)| p != id);
        }
        tracing::info!(
            room_id = %self.id,
            player_id = %id,
            players = self.players.len(),
            "player left"
        );

        if self.players.is_empty() {
            self.clear_timers();
            self.turn = None;
            return Ok(self.take_outbox());
        }

        if self.host_id == *id {
            self.reassign_host();
        }

        if self.status.is_playing() && self.players.len() == 1 {
            if self.status == RoomStatus::InMatch {
                self.end_match();
            }
            self.announce_winner();
            return Ok(self.take_outbox());
        }

        let Some(turn) = self.turn.as_ref() else {
            return Ok(self.take_outbox());
        };
        if turn.drawer_id == *id {
            match turn.phase {
                TurnPhase::Choosing { .. } => {
                    tracing::debug!(room_id = %self.id, "drawer left while choosing");
                    self.turn_timer.clear();
                    self.turn = None;
                    self.choose_drawer();
                }
                TurnPhase::Drawing { .. } => {
                    tracing::debug!(room_id = %self.id, "drawer left while drawing");
                    self.end_match();
                }
            }
        } else if self.status == RoomStatus::InMatch && self.all_guessed() {
            self.end_match();
        }
        Ok(self.take_outbox())
    }

    fn reassign_host(&mut self) {
        let Some(next) = self.players.first() else {
            return;
        };
        self.host_id = next.id.clone();
        tracing::info!(room_id = %self.id, host_id = %self.host_id, "host reassigned");
        self.emit(
            Recipient::all_but(&self.host_id),
            ServerEvent::HostInfo {
                host_id: self.host_id.clone(),
            },
        );
        self.emit(
            Recipient::Player(self.host_id.clone()),
            ServerEvent::SetHost {
                host_id: self.host_id.clone(),
            },
        );
    }

    // -----------------------------------------------------------------
    // Lobby
    // -----------------------------------------------------------------

    /// Changes one setting. Host only, lobby only.
    pub fn update_setting(
        &mut self,
        by: &PlayerId,
        update: SettingUpdate,
    ) -> Result<Vec<Outbound>, RoomError> {
        self.require_host(by)?;
        self.require_status(RoomStatus::Waiting, "settings can only change in the lobby")?;

        let settings = self.settings.with_update(update);
        self.check_settings(&settings)?;
        self.settings = settings;
        self.emit(
            Recipient::All,
            ServerEvent::SettingsUpdated {
                settings: self.settings,
            },
        );
        Ok(self.take_outbox())
    }

    /// Starts a game with `settings`. Host only, lobby only.
    pub fn start_game(
        &mut self,
        by: &PlayerId,
        settings: Settings,
    ) -> Result<Vec<Outbound>, RoomError> {
        self.require_host(by)?;
        self.require_status(RoomStatus::Waiting, "a game is already running")?;
        if self.players.len() < self.config.min_players {
            return Err(RoomError::NotEnoughPlayers {
                needed: self.config.min_players,
                have: self.players.len(),
            });
        }
        self.check_settings(&settings)?;

        self.settings = settings;
        for player in &mut self.players {
            player.score = 0;
        }
        self.set_status(RoomStatus::InProgress);
        self.round = 1;
        tracing::info!(
            room_id = %self.id,
            players = self.players.len(),
            rounds = settings.max_rounds,
            "game started"
        );

        self.emit(Recipient::All, ServerEvent::SettingsUpdated { settings });
        self.start_round();
        Ok(self.take_outbox())
    }

    fn check_settings(&self, settings: &Settings) -> Result<(), RoomError> {
        settings.validate()?;
        if settings.total_players < self.players.len() {
            return Err(RoomError::InvalidSettings(format!(
                "room already has {} players",
                self.players.len()
            )));
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Rounds and turns
    // -----------------------------------------------------------------

    fn start_round(&mut self) {
        self.remaining = self.players.iter().map(|p| p.id.clone()).collect();
        tracing::debug!(
            room_id = %self.id,
            round = self.round,
            drawers = self.remaining.len(),
            "round starting"
        );
        self.emit(Recipient::All, ServerEvent::RoundInfo { round: self.round });
        self.arm(Alarm::BeginTurn, self.config.announce_delay);
    }

    /// Pops the next drawer and offers them words. An exhausted queue
    /// closes the round.
    fn choose_drawer(&mut self) {
        if !self.status.is_playing() {
            tracing::debug!(
                room_id = %self.id,
                status = %self.status,
                "no game running, not choosing a drawer"
            );
            return;
        }

        let drawer = loop {
            let Some(candidate) = self.remaining.pop_front() else {
                self.end_round();
                return;
            };
            if let Some(player) = self.players.iter().find(|p| p.id == candidate) {
                break player.clone();
            }
            tracing::debug!(room_id = %self.id, player_id = %candidate, "skipping departed drawer");
        };

        let count = self.settings.choice_count;
        let choices = self.collaborators.words.choices(count);
        if choices.len() < count {
            tracing::warn!(
                room_id = %self.id,
                wanted = count,
                got = choices.len(),
                "word source exhausted, ending round"
            );
            self.end_round();
            return;
        }

        tracing::info!(room_id = %self.id, drawer = %drawer.id, "drawer choosing");
        self.turn = Some(MatchState {
            drawer_id: drawer.id.clone(),
            drawer_name: drawer.name.clone(),
            phase: TurnPhase::Choosing {
                choices: choices.clone(),
            },
            hints_used: 0,
            hint_plan: HintSchedule::plan(self.settings.draw_time, self.settings.hints),
            correct: Vec::new(),
        });

        self.emit(
            Recipient::Player(drawer.id.clone()),
            ServerEvent::Choosing {
                view: ChoosingView::Drawer { choices },
            },
        );
        self.emit(
            Recipient::all_but(&drawer.id),
            ServerEvent::Choosing {
                view: ChoosingView::Guesser {
                    drawer_name: drawer.name,
                },
            },
        );
        self.arm(Alarm::ChoiceTimeout, self.config.choice_timeout);
    }

    /// The drawer picked `word`.
    ///
    /// A pick after the turn already started (or with no turn at all) is
    /// a lost race and ignored.
    pub fn start_match(&mut self, by: &PlayerId, word: &str) -> Result<Vec<Outbound>, RoomError> {
        let Some(turn) = self.turn.as_ref() else {
            tracing::debug!(
                room_id = %self.id,
                player_id = %by,
                "word picked with no turn running"
            );
            return Ok(Vec::new());
        };
        if turn.drawer_id != *by {
            return Err(RoomError::NotDrawer(by.clone()));
        }
        let TurnPhase::Choosing { choices } = &turn.phase else {
            tracing::debug!(room_id = %self.id, "word already chosen, ignoring pick");
            return Ok(Vec::new());
        };
        let Some(picked) = choices.iter().find(|c| normalize(c) == normalize(word)) else {
            return Err(RoomError::InvalidState(format!("{word:?} was not offered")));
        };

        let picked = picked.clone();
        self.begin_drawing(picked);
        Ok(self.take_outbox())
    }

    fn auto_pick(&mut self) {
        let Some(TurnPhase::Choosing { choices }) = self.turn.as_ref().map(|t| &t.phase) else {
            return;
        };
        if choices.is_empty() {
            return;
        }
        let index = self.collaborators.picker.pick(choices.len());
        let Some(word) = choices.get(index).cloned() else {
            return;
        };
        tracing::debug!(room_id = %self.id, "drawer did not choose, picking for them");
        self.begin_drawing(word);
    }

    fn begin_drawing(&mut self, word: String) {
        let Some(turn) = self.turn.as_mut() else {
            return;
        };
        if matches!(turn.phase, TurnPhase::Drawing { .. }) {
            tracing::debug!(room_id = %self.id, "turn already drawing");
            return;
        }

        let secret = SecretWord::new(word);
        let masked = secret.masked();
        let text = secret.text.clone();
        let drawer_id = turn.drawer_id.clone();
        let offsets = turn.hint_plan.offsets();
        turn.phase = TurnPhase::Drawing { word: secret };

        self.turn_timer.clear();
        self.set_status(RoomStatus::InMatch);
        tracing::info!(room_id = %self.id, drawer = %drawer_id, "match started");

        let draw_time = self.settings.draw_time;
        self.emit(
            Recipient::Player(drawer_id.clone()),
            ServerEvent::StartMatch {
                view: MatchView::Drawer { word: text },
                draw_time,
            },
        );
        self.emit(
            Recipient::all_but(&drawer_id),
            ServerEvent::StartMatch {
                view: MatchView::Guesser {
                    masked_word: masked,
                },
                draw_time,
            },
        );

        self.arm(Alarm::MatchTimeout, secs(draw_time));
        for (n, offset) in offsets.into_iter().enumerate() {
            self.arm(Alarm::HintCheck(n), secs(offset));
        }
    }

    // -----------------------------------------------------------------
    // Guessing
    // -----------------------------------------------------------------

    /// Handles a chat line, which doubles as a guess while drawing.
    pub fn validate_guess(&mut self, by: &PlayerId, text: &str) -> Result<Vec<Outbound>, RoomError> {
        let name = self
            .name_of(by)
            .ok_or_else(|| RoomError::NotInRoom(by.clone()))?
            .to_owned();

        let drawing = self.status == RoomStatus::InMatch;
        let Some(turn) = self.turn.as_ref().filter(|_| drawing) else {
            self.chat(Recipient::All, name, text.to_owned(), ChatMode::Normal);
            return Ok(self.take_outbox());
        };
        let Some(word) = turn.word() else {
            self.chat(Recipient::All, name, text.to_owned(), ChatMode::Normal);
            return Ok(self.take_outbox());
        };

        if !word.matches(text) {
            self.chat(Recipient::All, name, text.to_owned(), ChatMode::Normal);
            return Ok(self.take_outbox());
        }

        if turn.knows_word(by) {
            // The word itself, typed by someone who already knows it. Keep
            // it among those who know.
            let knowers: Vec<PlayerId> = self
                .players
                .iter()
                .filter(|p| turn.knows_word(&p.id))
                .map(|p| p.id.clone())
                .collect();
            for id in knowers {
                self.chat(Recipient::Player(id), name.clone(), text.to_owned(), ChatMode::Normal);
            }
            return Ok(self.take_outbox());
        }

        self.record_guess(by, name);
        Ok(self.take_outbox())
    }

    fn record_guess(&mut self, by: &PlayerId, name: String) {
        let guessers = self.guesser_count();
        let Some(turn) = self.turn.as_mut() else {
            return;
        };
        let Some(word) = turn.word() else {
            return;
        };
        let text = word.text.clone();
        let unguessed = guessers.saturating_sub(turn.correct.len());
        let score = guesser_score(unguessed, guessers);
        turn.correct.push((by.clone(), score));
        tracing::info!(room_id = %self.id, player_id = %by, score, "correct guess");

        self.emit(
            Recipient::Player(by.clone()),
            ServerEvent::Guessed { word: text },
        );
        self.chat(
            Recipient::All,
            name.clone(),
            format!("{name} guessed the word!"),
            ChatMode::SystemSuccess,
        );

        if self.all_guessed() {
            self.end_match();
        } else {
            self.accelerate();
        }
    }

    /// Shrinks the turn to the tightest cutoff the current guess count has
    /// reached, if that is shorter than what is left.
    fn accelerate(&mut self) {
        let Some(turn) = self.turn.as_ref() else {
            return;
        };
        let correct = turn.correct.len();
        let guessers = self.guesser_count();
        let secs_left = self.turn_timer.secs_left();
        let draw_time = self.settings.draw_time;

        let target = self
            .config
            .cutoffs
            .iter()
            .filter(|c| unguessed_at_most(correct, guessers, c.unguessed_percent))
            .map(|c| c.threshold(draw_time))
            .filter(|t| *t < secs_left)
            .min();
        let Some(time_left) = target else {
            return;
        };

        tracing::debug!(room_id = %self.id, from = secs_left, to = time_left, "reducing time");
        self.arm(Alarm::MatchTimeout, secs(time_left));
        self.emit(Recipient::All, ServerEvent::ReduceTime { time_left });
        self.provide_hint(time_left);
    }

    /// Reveals one more character if the next hint is due with
    /// `secs_left` remaining and the caps allow it.
    fn provide_hint(&mut self, secs_left: u32) {
        if self.status != RoomStatus::InMatch {
            return;
        }
        let max_hints = self.settings.hints;
        let config = &self.config;
        let picker = &self.collaborators.picker;
        let Some(turn) = self.turn.as_mut() else {
            return;
        };
        let TurnPhase::Drawing { word } = &mut turn.phase else {
            return;
        };

        if turn.hints_used >= max_hints
            || turn.hints_used >= config.reveal_cap(word.len())
            || !turn.hint_plan.is_due(turn.hints_used, secs_left)
        {
            return;
        }
        let hidden = word.hidden();
        if hidden.is_empty() {
            return;
        }
        let Some(index) = hidden.get(picker.pick(hidden.len())).copied() else {
            return;
        };
        word.revealed[index] = true;
        turn.hints_used += 1;

        let masked_word = word.masked();
        let mut excluded = vec![turn.drawer_id.clone()];
        excluded.extend(turn.correct.iter().map(|(p, _)| p.clone()));
        tracing::debug!(room_id = %self.id, hints_used = turn.hints_used, "hint revealed");
        self.emit(
            Recipient::AllExcept(excluded),
            ServerEvent::Hint { masked_word },
        );
    }

    // -----------------------------------------------------------------
    // Close-out
    // -----------------------------------------------------------------

    /// Closes the running turn. A no-op unless a turn is drawing.
    fn end_match(&mut self) {
        if self.status != RoomStatus::InMatch {
            tracing::debug!(room_id = %self.id, status = %self.status, "no match to end");
            return;
        }
        let Some(turn) = self.turn.take() else {
            return;
        };
        self.turn_timer.clear();
        for timer in &mut self.hint_timers {
            timer.clear();
        }
        self.set_status(RoomStatus::InProgress);

        let drawer_present = self.has_player(&turn.drawer_id);
        let drawer_points = if drawer_present {
            drawer_score(turn.correct.len(), self.players.len() - 1)
        } else {
            0
        };

        let mut deltas = Vec::with_capacity(self.players.len());
        for player in &mut self.players {
            let earned = if player.id == turn.drawer_id {
                drawer_points
            } else {
                turn.correct
                    .iter()
                    .find(|(id, _)| *id == player.id)
                    .map_or(0, |(_, score)| *score)
            };
            player.score += earned;
            deltas.push(PlayerInfo {
                id: player.id.clone(),
                name: player.name.clone(),
                score: earned,
            });
        }

        let word = turn.word().map(|w| w.text.clone()).unwrap_or_default();
        tracing::info!(
            room_id = %self.id,
            drawer = %turn.drawer_id,
            correct = turn.correct.len(),
            "match ended"
        );
        self.emit(Recipient::All, ServerEvent::EndMatch { scores: deltas, word });
        self.emit_members();
        self.arm(Alarm::NextTurn, self.config.match_pacing);
    }

    fn end_round(&mut self) {
        self.turn = None;
        self.turn_timer.clear();
        if self.round >= self.settings.max_rounds {
            self.announce_winner();
        } else {
            self.round += 1;
            self.start_round();
        }
    }

    fn announce_winner(&mut self) {
        self.clear_timers();
        self.turn = None;
        self.remaining.clear();
        self.set_status(RoomStatus::Finished);

        let players = self.ranked();
        if let Some(winner) = players.first() {
            tracing::info!(
                room_id = %self.id,
                winner = %winner.id,
                score = winner.score,
                "game finished"
            );
        }
        self.emit(Recipient::All, ServerEvent::Results { players });
        self.arm(Alarm::Restart, self.config.results_pacing);
    }

    fn restart(&mut self) {
        if self.status != RoomStatus::Finished {
            return;
        }
        self.set_status(RoomStatus::Waiting);
        self.round = 0;
        let defaults = Settings::default();
        self.settings = Settings {
            total_players: defaults.total_players.max(self.players.len()),
            ..defaults
        };
        for player in &mut self.players {
            player.score = 0;
        }
        tracing::info!(room_id = %self.id, "room reset to lobby");
        self.emit(Recipient::All, ServerEvent::Restart);
        self.emit(
            Recipient::All,
            ServerEvent::SettingsUpdated {
                settings: self.settings,
            },
        );
        self.emit_members();
    }

    // -----------------------------------------------------------------
    // Relay
    // -----------------------------------------------------------------

    /// Forwards an opaque drawing payload from the drawer to everyone else.
    pub fn relay_drawing(
        &mut self,
        by: &PlayerId,
        data: serde_json::Value,
    ) -> Result<Vec<Outbound>, RoomError> {
        let is_drawer = self.turn.as_ref().is_some_and(|t| t.drawer_id == *by);
        if !is_drawer {
            return Err(RoomError::NotDrawer(by.clone()));
        }
        if self.status == RoomStatus::InMatch {
            self.emit(Recipient::all_but(by), ServerEvent::DrawingData { data });
        }
        Ok(self.take_outbox())
    }

    // -----------------------------------------------------------------
    // Timers
    // -----------------------------------------------------------------

    /// Applies a fired timer. Alarms from a cleared or re-armed timer are
    /// dropped.
    pub fn handle_alarm(&mut self, fired: AlarmFired) -> Vec<Outbound> {
        let accepted = self
            .timer_mut(fired.alarm)
            .is_some_and(|timer| timer.fire(fired.ticket));
        if !accepted {
            tracing::debug!(room_id = %self.id, alarm = ?fired.alarm, "stale alarm ignored");
            return Vec::new();
        }

        match fired.alarm {
            Alarm::BeginTurn | Alarm::NextTurn => self.choose_drawer(),
            Alarm::Restart => self.restart(),
            Alarm::ChoiceTimeout => self.auto_pick(),
            Alarm::MatchTimeout => self.end_match(),
            Alarm::HintCheck(_) => {
                let secs_left = self.turn_timer.secs_left();
                self.provide_hint(secs_left);
            }
        }
        self.take_outbox()
    }

    fn timer_mut(&mut self, alarm: Alarm) -> Option<&mut TurnTimer> {
        match alarm {
            Alarm::BeginTurn | Alarm::NextTurn | Alarm::Restart => Some(&mut self.pacing),
            Alarm::ChoiceTimeout | Alarm::MatchTimeout => Some(&mut self.turn_timer),
            Alarm::HintCheck(n) => self.hint_timers.get_mut(n),
        }
    }

    fn arm(&mut self, alarm: Alarm, after: Duration) {
        if let Alarm::HintCheck(n) = alarm {
            if self.hint_timers.len() <= n {
                self.hint_timers.resize_with(n + 1, TurnTimer::new);
            }
        }
        let alarms = self.alarms.clone();
        let on_fire = move |ticket: TimerTicket| {
            let _ = alarms.send(AlarmFired { alarm, ticket });
        };
        if let Some(timer) = self.timer_mut(alarm) {
            timer.start(after, on_fire);
        }
    }

    fn clear_timers(&mut self) {
        self.turn_timer.clear();
        self.pacing.clear();
        for timer in &mut self.hint_timers {
            timer.clear();
        }
    }

    // -----------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn host_id(&self) -> &PlayerId {
        &self.host_id
    }

    pub fn status(&self) -> RoomStatus {
        self.status
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn has_player(&self, id: &PlayerId) -> bool {
        self.players.iter().any(|p| p.id == *id)
    }

    pub fn name_of(&self, id: &PlayerId) -> Option<&str> {
        self.players
            .iter()
            .find(|p| p.id == *id)
            .map(|p| p.name.as_str())
    }

    pub fn score_of(&self, id: &PlayerId) -> Option<u32> {
        self.players.iter().find(|p| p.id == *id).map(|p| p.score)
    }

    pub fn drawer_id(&self) -> Option<&PlayerId> {
        self.turn.as_ref().map(|t| &t.drawer_id)
    }

    pub fn hints_used(&self) -> u32 {
        self.turn.as_ref().map_or(0, |t| t.hints_used)
    }

    /// Seconds left in the running turn, rounded up. Zero between turns.
    pub fn secs_left(&self) -> u32 {
        if self.status == RoomStatus::InMatch {
            self.turn_timer.secs_left()
        } else {
            0
        }
    }

    pub fn correct_guessers(&self) -> Vec<PlayerId> {
        self.turn
            .as_ref()
            .map(|t| t.correct.iter().map(|(p, _)| p.clone()).collect())
            .unwrap_or_default()
    }

    pub fn remaining_drawers(&self) -> Vec<PlayerId> {
        self.remaining.iter().cloned().collect()
    }

    /// Member list in join order while in the lobby, by score once a
    /// game has started.
    pub fn members(&self) -> Vec<PlayerInfo> {
        if self.status == RoomStatus::Waiting {
            self.players.iter().map(Player::info).collect()
        } else {
            self.ranked()
        }
    }

    pub fn live_state(&self) -> LiveState {
        let Some(turn) = self.turn.as_ref() else {
            return LiveState::Idle;
        };
        match &turn.phase {
            TurnPhase::Choosing { .. } => LiveState::Choosing {
                drawer_name: turn.drawer_name.clone(),
            },
            TurnPhase::Drawing { word } => LiveState::Drawing {
                masked_word: word.masked(),
                time_left: self.secs_left(),
            },
        }
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            room_id: self.id.clone(),
            host_id: self.host_id.clone(),
            players: self.members(),
            settings: self.settings,
            round: self.round,
            live: self.live_state(),
        }
    }

    // -----------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------

    fn ranked(&self) -> Vec<PlayerInfo> {
        let mut players: Vec<PlayerInfo> = self.players.iter().map(Player::info).collect();
        players.sort_by(|a, b| b.score.cmp(&a.score));
        players
    }

    /// Players other than the drawer.
    fn guesser_count(&self) -> usize {
        match self.turn.as_ref() {
            Some(turn) if self.has_player(&turn.drawer_id) => self.players.len() - 1,
            _ => self.players.len(),
        }
    }

    fn all_guessed(&self) -> bool {
        self.turn
            .as_ref()
            .is_some_and(|t| t.correct.len() >= self.guesser_count())
    }

    fn require_host(&self, by: &PlayerId) -> Result<(), RoomError> {
        if self.host_id == *by {
            Ok(())
        } else {
            Err(RoomError::NotHost(by.clone()))
        }
    }

    fn require_status(&self, status: RoomStatus, reason: &str) -> Result<(), RoomError> {
        if self.status == status {
            Ok(())
        } else {
            Err(RoomError::InvalidState(reason.to_owned()))
        }
    }

    fn set_status(&mut self, next: RoomStatus) {
        debug_assert!(
            self.status.can_transition_to(next),
            "illegal transition {} -> {}",
            self.status,
            next
        );
        self.status = next;
    }

    fn emit(&mut self, to: Recipient, event: ServerEvent) {
        self.outbox.push((to, event));
    }

    fn emit_members(&mut self) {
        let players = self.members();
        self.emit(Recipient::All, ServerEvent::RoomMembers { players });
    }

    fn chat(&mut self, to: Recipient, name: String, text: String, mode: ChatMode) {
        self.emit(to, ServerEvent::Chat { name, text, mode });
    }

    fn take_outbox(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.outbox)
    }
}

impl std::fmt::Debug for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Room")
            .field("id", &self.id)
            .field("status", &self.status)
            .field("round", &self.round)
            .field("players", &self.players.len())
            .finish_non_exhaustive()
    }
}

fn secs(n: u32) -> Duration {
    Duration::from_secs(u64::from(n))
}
