//! Gameplay tests for the `Room` state machine.
//!
//! Time is paused, so timers fire as soon as the runtime is idle and
//! `advance` moves the clock exactly. Words and hint positions come from
//! fixed collaborators.

use std::sync::Arc;
use std::time::Duration;

use scribble_protocol::{
    ChatMode, ChoosingView, LiveState, MatchView, PlayerId, PlayerInfo, Recipient, RoomId,
    ServerEvent, SettingUpdate, Settings, Visibility,
};
use scribble_room::{
    AlarmFired, Collaborators, IndexPicker, Outbound, Room, RoomConfig, RoomError, RoomStatus,
    WordSource,
};
use tokio::sync::mpsc;
use tokio::time::{self, Instant};

// =========================================================================
// Fixtures
// =========================================================================

struct FixedWords(Vec<&'static str>);

impl WordSource for FixedWords {
    fn choices(&self, count: usize) -> Vec<String> {
        self.0.iter().take(count).map(|w| w.to_string()).collect()
    }
}

/// Always picks the first candidate.
struct FirstPicker;

impl IndexPicker for FirstPicker {
    fn pick(&self, _upper: usize) -> usize {
        0
    }
}

fn alice() -> PlayerId {
    PlayerId::from("alice")
}

fn bob() -> PlayerId {
    PlayerId::from("bob")
}

fn carol() -> PlayerId {
    PlayerId::from("carol")
}

struct Harness {
    room: Room,
    alarms: mpsc::UnboundedReceiver<AlarmFired>,
}

impl Harness {
    /// A lobby hosted by Alice.
    fn new() -> Self {
        Self::with_words(vec!["apple", "banana", "cherry"])
    }

    fn with_words(words: Vec<&'static str>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let collaborators = Collaborators {
            words: Arc::new(FixedWords(words)),
            picker: Arc::new(FirstPicker),
        };
        let room = Room::new(
            RoomId::from("room01"),
            Visibility::Private,
            (alice(), "Alice".into()),
            RoomConfig::default(),
            collaborators,
            tx,
        );
        Self { room, alarms: rx }
    }

    fn join(&mut self, id: PlayerId, name: &str) {
        self.room.add_player(id, name.into()).unwrap();
    }

    /// Waits for the next alarm and applies it.
    async fn next_alarm(&mut self) -> Vec<Outbound> {
        let fired = self.alarms.recv().await.unwrap();
        self.room.handle_alarm(fired)
    }

    /// Applies alarms until an event matching `pred` shows up. Returns
    /// everything emitted along the way.
    async fn pump_until(&mut self, pred: impl Fn(&ServerEvent) -> bool) -> Vec<Outbound> {
        let mut seen = Vec::new();
        for _ in 0..100 {
            let events = self.next_alarm().await;
            let done = events.iter().any(|(_, e)| pred(e));
            seen.extend(events);
            if done {
                return seen;
            }
        }
        panic!("expected event never arrived");
    }

    /// Starts a game and runs the announcement so the first drawer is
    /// choosing.
    async fn start(&mut self, settings: Settings) -> Vec<Outbound> {
        self.room.start_game(&alice(), settings).unwrap();
        self.pump_until(is_choosing).await
    }
}

fn is_choosing(event: &ServerEvent) -> bool {
    matches!(event, ServerEvent::Choosing { .. })
}

fn is_end_match(event: &ServerEvent) -> bool {
    matches!(event, ServerEvent::EndMatch { .. })
}

fn events_only(events: &[Outbound]) -> Vec<&ServerEvent> {
    events.iter().map(|(_, e)| e).collect()
}

fn choosing_drawer(events: &[Outbound]) -> Option<PlayerId> {
    events.iter().find_map(|(to, e)| match (to, e) {
        (
            Recipient::Player(id),
            ServerEvent::Choosing {
                view: ChoosingView::Drawer { .. },
            },
        ) => Some(id.clone()),
        _ => None,
    })
}

fn end_match_scores(events: &[Outbound]) -> Option<Vec<PlayerInfo>> {
    events.iter().find_map(|(_, e)| match e {
        ServerEvent::EndMatch { scores, .. } => Some(scores.clone()),
        _ => None,
    })
}

fn reductions(events: &[Outbound]) -> Vec<u32> {
    events
        .iter()
        .filter_map(|(_, e)| match e {
            ServerEvent::ReduceTime { time_left } => Some(*time_left),
            _ => None,
        })
        .collect()
}

fn hints(events: &[Outbound]) -> Vec<(Recipient, String)> {
    events
        .iter()
        .filter_map(|(to, e)| match e {
            ServerEvent::Hint { masked_word } => Some((to.clone(), masked_word.clone())),
            _ => None,
        })
        .collect()
}

fn delta_of(scores: &[PlayerInfo], id: &PlayerId) -> Option<u32> {
    scores.iter().find(|p| p.id == *id).map(|p| p.score)
}

// =========================================================================
// Lobby
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_room_created_by_alice() {
    let h = Harness::new();
    assert_eq!(h.room.player_count(), 1);
    assert_eq!(h.room.host_id(), &alice());
    assert_eq!(h.room.status(), RoomStatus::Waiting);
    assert_eq!(*h.room.settings(), Settings::default());

    let settings = h.room.settings();
    assert_eq!(settings.total_players, 8);
    assert_eq!(settings.max_rounds, 3);
    assert_eq!(settings.draw_time, 80);
    assert_eq!(settings.hints, 2);
}

#[tokio::test(start_paused = true)]
async fn test_join_rejected_when_full() {
    let mut h = Harness::new();
    let events = h
        .room
        .update_setting(&alice(), SettingUpdate::TotalPlayers(2))
        .unwrap();
    assert!(matches!(
        events.as_slice(),
        [(Recipient::All, ServerEvent::SettingsUpdated { settings })] if settings.total_players == 2
    ));

    h.join(bob(), "Bob");
    let err = h.room.add_player(carol(), "Carol".into()).unwrap_err();
    assert!(matches!(err, RoomError::RoomFull(_)));
    assert_eq!(h.room.player_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_join_rejected() {
    let mut h = Harness::new();
    let err = h.room.add_player(alice(), "Alice".into()).unwrap_err();
    assert!(matches!(err, RoomError::AlreadyInRoom(..)));
}

#[tokio::test(start_paused = true)]
async fn test_settings_are_host_only_and_cannot_drop_below_headcount() {
    let mut h = Harness::new();
    h.join(bob(), "Bob");
    h.join(carol(), "Carol");

    let err = h
        .room
        .update_setting(&bob(), SettingUpdate::Hints(3))
        .unwrap_err();
    assert!(matches!(err, RoomError::NotHost(_)));

    let err = h
        .room
        .update_setting(&alice(), SettingUpdate::TotalPlayers(2))
        .unwrap_err();
    assert!(matches!(err, RoomError::InvalidSettings(_)));
    assert_eq!(h.room.settings().total_players, 8);
}

#[tokio::test(start_paused = true)]
async fn test_start_requires_host_and_two_players() {
    let mut h = Harness::new();
    let err = h
        .room
        .start_game(&alice(), Settings::default())
        .unwrap_err();
    assert!(matches!(
        err,
        RoomError::NotEnoughPlayers { needed: 2, have: 1 }
    ));

    h.join(bob(), "Bob");
    let err = h.room.start_game(&bob(), Settings::default()).unwrap_err();
    assert!(matches!(err, RoomError::NotHost(_)));
    assert_eq!(h.room.status(), RoomStatus::Waiting);
}

#[tokio::test(start_paused = true)]
async fn test_settings_locked_once_game_runs() {
    let mut h = Harness::new();
    h.join(bob(), "Bob");
    h.room.start_game(&alice(), Settings::default()).unwrap();

    let err = h
        .room
        .update_setting(&alice(), SettingUpdate::DrawTime(60))
        .unwrap_err();
    assert!(matches!(err, RoomError::InvalidState(_)));
    let err = h
        .room
        .start_game(&alice(), Settings::default())
        .unwrap_err();
    assert!(matches!(err, RoomError::InvalidState(_)));
}

#[tokio::test(start_paused = true)]
async fn test_host_leaving_lobby_hands_over_host() {
    let mut h = Harness::new();
    h.join(bob(), "Bob");
    h.join(carol(), "Carol");

    let events = h.room.remove_player(&alice()).unwrap();
    assert_eq!(h.room.host_id(), &bob());
    assert_eq!(
        events,
        vec![
            (
                Recipient::AllExcept(vec![bob()]),
                ServerEvent::HostInfo { host_id: bob() }
            ),
            (
                Recipient::Player(bob()),
                ServerEvent::SetHost { host_id: bob() }
            ),
        ]
    );
}

// =========================================================================
// Turn flow
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_start_game_announces_round_then_offers_words() {
    let mut h = Harness::new();
    h.join(bob(), "Bob");
    let begun = Instant::now();

    let events = h.room.start_game(&alice(), Settings::default()).unwrap();
    assert_eq!(h.room.status(), RoomStatus::InProgress);
    assert_eq!(h.room.round(), 1);
    assert!(events_only(&events).contains(&&ServerEvent::RoundInfo { round: 1 }));

    let events = h.next_alarm().await;
    assert_eq!(begun.elapsed(), Duration::from_secs(3));
    assert_eq!(h.room.drawer_id(), Some(&alice()));
    assert_eq!(
        events,
        vec![
            (
                Recipient::Player(alice()),
                ServerEvent::Choosing {
                    view: ChoosingView::Drawer {
                        choices: vec!["apple".into(), "banana".into(), "cherry".into()],
                    },
                },
            ),
            (
                Recipient::AllExcept(vec![alice()]),
                ServerEvent::Choosing {
                    view: ChoosingView::Guesser {
                        drawer_name: "Alice".into(),
                    },
                },
            ),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_start_match_sends_word_to_drawer_before_mask() {
    let mut h = Harness::new();
    h.join(bob(), "Bob");
    h.start(Settings::default()).await;

    let events = h.room.start_match(&alice(), "apple").unwrap();
    assert_eq!(h.room.status(), RoomStatus::InMatch);
    assert_eq!(
        events,
        vec![
            (
                Recipient::Player(alice()),
                ServerEvent::StartMatch {
                    view: MatchView::Drawer {
                        word: "apple".into()
                    },
                    draw_time: 80,
                },
            ),
            (
                Recipient::AllExcept(vec![alice()]),
                ServerEvent::StartMatch {
                    view: MatchView::Guesser {
                        masked_word: "_____".into()
                    },
                    draw_time: 80,
                },
            ),
        ]
    );
    assert_eq!(h.room.secs_left(), 80);
}

#[tokio::test(start_paused = true)]
async fn test_second_pick_is_ignored() {
    let mut h = Harness::new();
    h.join(bob(), "Bob");
    h.start(Settings::default()).await;

    h.room.start_match(&alice(), "apple").unwrap();
    let events = h.room.start_match(&alice(), "banana").unwrap();
    assert!(events.is_empty());

    let err = h.room.start_match(&bob(), "banana").unwrap_err();
    assert!(matches!(err, RoomError::NotDrawer(_)));
}

#[tokio::test(start_paused = true)]
async fn test_pick_must_be_offered() {
    let mut h = Harness::new();
    h.join(bob(), "Bob");
    h.start(Settings::default()).await;

    let err = h.room.start_match(&alice(), "durian").unwrap_err();
    assert!(matches!(err, RoomError::InvalidState(_)));
    assert_eq!(h.room.status(), RoomStatus::InProgress);
}

#[tokio::test(start_paused = true)]
async fn test_choice_timeout_picks_for_drawer() {
    let mut h = Harness::new();
    h.join(bob(), "Bob");
    h.start(Settings::default()).await;
    let offered = Instant::now();

    let events = h.next_alarm().await;
    assert_eq!(offered.elapsed(), Duration::from_secs(15));
    assert_eq!(h.room.status(), RoomStatus::InMatch);
    assert!(events_only(&events).contains(&&ServerEvent::StartMatch {
        view: MatchView::Drawer {
            word: "apple".into()
        },
        draw_time: 80,
    }));
}

#[tokio::test(start_paused = true)]
async fn test_sole_guesser_ends_match_immediately() {
    let mut h = Harness::new();
    h.join(bob(), "Bob");
    h.start(Settings::default()).await;
    h.room.start_match(&alice(), "apple").unwrap();
    let started = Instant::now();

    time::advance(Duration::from_secs(10)).await;
    let events = h.room.validate_guess(&bob(), "apple").unwrap();

    assert_eq!(
        events[0],
        (
            Recipient::Player(bob()),
            ServerEvent::Guessed {
                word: "apple".into()
            }
        )
    );
    assert_eq!(
        events[1],
        (
            Recipient::All,
            ServerEvent::Chat {
                name: "Bob".into(),
                text: "Bob guessed the word!".into(),
                mode: ChatMode::SystemSuccess,
            }
        )
    );
    let scores = end_match_scores(&events).unwrap();
    assert_eq!(delta_of(&scores, &alice()), Some(100));
    assert_eq!(delta_of(&scores, &bob()), Some(100));
    assert_eq!(h.room.status(), RoomStatus::InProgress);
    assert_eq!(h.room.hints_used(), 0);

    // Next thing to happen is the post-turn pause; no hint check survives.
    let events = h.next_alarm().await;
    assert_eq!(started.elapsed(), Duration::from_secs(15));
    assert!(hints(&events).is_empty());
    assert_eq!(choosing_drawer(&events), Some(bob()));
}

#[tokio::test(start_paused = true)]
async fn test_guess_is_trimmed_and_case_insensitive() {
    let mut h = Harness::new();
    h.join(bob(), "Bob");
    h.start(Settings::default()).await;
    h.room.start_match(&alice(), "apple").unwrap();

    let events = h.room.validate_guess(&bob(), "  APPLE ").unwrap();
    assert!(end_match_scores(&events).is_some());
}

#[tokio::test(start_paused = true)]
async fn test_wrong_guess_is_plain_chat() {
    let mut h = Harness::new();
    h.join(bob(), "Bob");
    h.start(Settings::default()).await;
    h.room.start_match(&alice(), "apple").unwrap();

    let events = h.room.validate_guess(&bob(), "pear").unwrap();
    assert_eq!(
        events,
        vec![(
            Recipient::All,
            ServerEvent::Chat {
                name: "Bob".into(),
                text: "pear".into(),
                mode: ChatMode::Normal,
            }
        )]
    );
    assert!(h.room.correct_guessers().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_drawer_saying_the_word_stays_private() {
    let mut h = Harness::new();
    h.join(bob(), "Bob");
    h.join(carol(), "Carol");
    h.start(Settings::default()).await;
    h.room.start_match(&alice(), "apple").unwrap();

    let events = h.room.validate_guess(&alice(), "apple").unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].0, Recipient::Player(alice()));
    assert!(h.room.correct_guessers().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_earlier_guesses_score_more_and_time_only_shrinks() {
    let mut h = Harness::new();
    let dave = PlayerId::from("dave");
    let erin = PlayerId::from("erin");
    h.join(bob(), "Bob");
    h.join(carol(), "Carol");
    h.join(dave.clone(), "Dave");
    h.join(erin.clone(), "Erin");
    h.start(Settings::default()).await;
    h.room.start_match(&alice(), "apple").unwrap();

    let mut reduced = Vec::new();

    // 75% still missing: above every cutoff.
    reduced.extend(reductions(&h.room.validate_guess(&bob(), "apple").unwrap()));
    assert!(reduced.is_empty());

    // 50% missing: 72% of 80.
    time::advance(Duration::from_secs(2)).await;
    reduced.extend(reductions(&h.room.validate_guess(&carol(), "apple").unwrap()));
    assert_eq!(reduced, vec![57]);
    assert_eq!(h.room.secs_left(), 57);

    // 25% missing: 42% of 80.
    time::advance(Duration::from_secs(2)).await;
    reduced.extend(reductions(&h.room.validate_guess(&dave, "apple").unwrap()));
    assert_eq!(reduced, vec![57, 33]);
    assert_eq!(h.room.secs_left(), 33);

    let events = h.room.validate_guess(&erin, "apple").unwrap();
    assert!(reductions(&events).is_empty());
    let scores = end_match_scores(&events).unwrap();
    assert_eq!(delta_of(&scores, &bob()), Some(100));
    assert_eq!(delta_of(&scores, &carol()), Some(75));
    assert_eq!(delta_of(&scores, &dave), Some(50));
    assert_eq!(delta_of(&scores, &erin), Some(25));
    assert_eq!(delta_of(&scores, &alice()), Some(100));
}

#[tokio::test(start_paused = true)]
async fn test_repeat_guess_scores_once() {
    let mut h = Harness::new();
    h.join(bob(), "Bob");
    h.join(carol(), "Carol");
    h.start(Settings::default()).await;
    h.room.start_match(&alice(), "apple").unwrap();

    h.room.validate_guess(&bob(), "apple").unwrap();
    let events = h.room.validate_guess(&bob(), "apple").unwrap();
    assert!(reductions(&events).is_empty());
    assert_eq!(h.room.correct_guessers(), vec![bob()]);
}

#[tokio::test(start_paused = true)]
async fn test_late_guess_after_close_out_changes_nothing() {
    let mut h = Harness::new();
    h.join(bob(), "Bob");
    h.start(Settings::default()).await;
    h.room.start_match(&alice(), "apple").unwrap();
    h.room.validate_guess(&bob(), "apple").unwrap();
    assert_eq!(h.room.score_of(&bob()), Some(100));

    let events = h.room.validate_guess(&bob(), "apple").unwrap();
    assert!(end_match_scores(&events).is_none());
    assert_eq!(
        events_only(&events),
        vec![&ServerEvent::Chat {
            name: "Bob".into(),
            text: "apple".into(),
            mode: ChatMode::Normal,
        }]
    );
    assert_eq!(h.room.score_of(&bob()), Some(100));
    assert_eq!(h.room.score_of(&alice()), Some(100));
}

#[tokio::test(start_paused = true)]
async fn test_match_timeout_scores_nothing_without_guesses() {
    let mut h = Harness::new();
    h.join(bob(), "Bob");
    h.start(Settings::default()).await;
    h.room.start_match(&alice(), "apple").unwrap();
    let started = Instant::now();

    let events = h.pump_until(is_end_match).await;
    assert_eq!(started.elapsed(), Duration::from_secs(80));
    let scores = end_match_scores(&events).unwrap();
    assert!(scores.iter().all(|p| p.score == 0));
    assert!(events_only(&events).contains(&&ServerEvent::EndMatch {
        scores,
        word: "apple".into(),
    }));
}

// =========================================================================
// Hints
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_hints_reveal_on_schedule() {
    let mut h = Harness::new();
    h.join(bob(), "Bob");
    h.start(Settings::default()).await;
    h.room.start_match(&alice(), "apple").unwrap();
    let started = Instant::now();

    let first = h.next_alarm().await;
    assert_eq!(started.elapsed(), Duration::from_secs(28));
    assert_eq!(
        hints(&first),
        vec![(Recipient::AllExcept(vec![alice()]), "a____".to_string())]
    );

    let second = h.next_alarm().await;
    assert_eq!(started.elapsed(), Duration::from_secs(54));
    assert_eq!(hints(&second)[0].1, "ap___");
    assert_eq!(h.room.hints_used(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_hints_skip_players_who_already_guessed() {
    let mut h = Harness::new();
    h.join(bob(), "Bob");
    h.join(carol(), "Carol");
    h.start(Settings::default()).await;
    h.room.start_match(&alice(), "apple").unwrap();

    time::advance(Duration::from_secs(1)).await;
    h.room.validate_guess(&bob(), "apple").unwrap();

    let events = h.next_alarm().await;
    assert_eq!(
        hints(&events),
        vec![(
            Recipient::AllExcept(vec![alice(), bob()]),
            "a____".to_string()
        )]
    );
}

#[tokio::test(start_paused = true)]
async fn test_hints_capped_at_half_the_word() {
    let mut h = Harness::with_words(vec!["cat", "dog", "owl"]);
    h.join(bob(), "Bob");
    let settings = Settings {
        draw_time: 60,
        hints: 3,
        ..Settings::default()
    };
    h.start(settings).await;
    h.room.start_match(&alice(), "cat").unwrap();

    let events = h.pump_until(is_end_match).await;
    assert_eq!(hints(&events).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_hints_stop_at_setting_on_long_word() {
    let mut h = Harness::with_words(vec!["strawberry", "watermelon", "blackberry"]);
    let dave = PlayerId::from("dave");
    let erin = PlayerId::from("erin");
    h.join(bob(), "Bob");
    h.join(carol(), "Carol");
    h.join(dave.clone(), "Dave");
    h.join(erin.clone(), "Erin");
    let settings = Settings {
        hints: 1,
        ..Settings::default()
    };
    h.start(settings).await;
    h.room.start_match(&alice(), "strawberry").unwrap();
    let started = Instant::now();

    let first = h.next_alarm().await;
    assert_eq!(started.elapsed(), Duration::from_secs(40));
    assert_eq!(
        hints(&first),
        vec![(Recipient::AllExcept(vec![alice()]), "s_________".to_string())]
    );
    assert_eq!(h.room.hints_used(), 1);

    // Half the word could still be revealed, but one hint is the limit.
    h.room.validate_guess(&bob(), "strawberry").unwrap();
    h.room.validate_guess(&carol(), "strawberry").unwrap();
    let events = h.room.validate_guess(&dave, "strawberry").unwrap();
    assert_eq!(reductions(&events), vec![33]);
    assert!(hints(&events).is_empty());
    assert_eq!(h.room.hints_used(), 1);

    let events = h.pump_until(is_end_match).await;
    assert!(hints(&events).is_empty());
    assert_eq!(started.elapsed(), Duration::from_secs(73));
}

// =========================================================================
// Churn
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_drawer_leaving_mid_drawing_keeps_guesser_scores() {
    let mut h = Harness::new();
    h.join(bob(), "Bob");
    h.join(carol(), "Carol");
    h.start(Settings::default()).await;
    h.room.start_match(&alice(), "apple").unwrap();

    time::advance(Duration::from_secs(5)).await;
    let events = h.room.validate_guess(&bob(), "apple").unwrap();
    assert_eq!(reductions(&events), vec![57]);

    let events = h.room.remove_player(&alice()).unwrap();
    let scores = end_match_scores(&events).unwrap();
    assert_eq!(delta_of(&scores, &alice()), None);
    assert_eq!(delta_of(&scores, &bob()), Some(100));
    assert_eq!(delta_of(&scores, &carol()), Some(0));
    assert_eq!(h.room.score_of(&bob()), Some(100));
    assert_eq!(h.room.host_id(), &bob());
    assert_eq!(h.room.status(), RoomStatus::InProgress);

    let events = h.next_alarm().await;
    assert_eq!(choosing_drawer(&events), Some(bob()));
}

#[tokio::test(start_paused = true)]
async fn test_drawer_leaving_while_choosing_picks_replacement() {
    let mut h = Harness::new();
    h.join(bob(), "Bob");
    h.join(carol(), "Carol");
    h.start(Settings::default()).await;

    let events = h.room.remove_player(&alice()).unwrap();
    assert_eq!(choosing_drawer(&events), Some(bob()));
    assert_eq!(h.room.remaining_drawers(), vec![carol()]);
}

#[tokio::test(start_paused = true)]
async fn test_last_guesser_leaving_ends_match() {
    let mut h = Harness::new();
    h.join(bob(), "Bob");
    h.join(carol(), "Carol");
    h.start(Settings::default()).await;
    h.room.start_match(&alice(), "apple").unwrap();
    h.room.validate_guess(&bob(), "apple").unwrap();

    let events = h.room.remove_player(&carol()).unwrap();
    let scores = end_match_scores(&events).unwrap();
    assert_eq!(delta_of(&scores, &alice()), Some(100));
    assert_eq!(delta_of(&scores, &bob()), Some(100));
}

#[tokio::test(start_paused = true)]
async fn test_lone_survivor_wins() {
    let mut h = Harness::new();
    h.join(bob(), "Bob");
    h.start(Settings::default()).await;
    h.room.start_match(&alice(), "apple").unwrap();

    let events = h.room.remove_player(&bob()).unwrap();
    assert_eq!(h.room.status(), RoomStatus::Finished);
    assert!(events_only(&events).iter().any(|e| matches!(
        e,
        ServerEvent::Results { players } if players.len() == 1 && players[0].id == alice()
    )));

    let events = h.next_alarm().await;
    assert!(events_only(&events).contains(&&ServerEvent::Restart));
    assert_eq!(h.room.status(), RoomStatus::Waiting);
}

#[tokio::test(start_paused = true)]
async fn test_mid_game_joiner_sees_live_turn() {
    let mut h = Harness::new();
    h.join(bob(), "Bob");
    h.start(Settings::default()).await;

    let snapshot = h.room.add_player(carol(), "Carol".into()).unwrap();
    assert_eq!(
        snapshot.live,
        LiveState::Choosing {
            drawer_name: "Alice".into()
        }
    );

    h.room.start_match(&alice(), "apple").unwrap();
    time::advance(Duration::from_secs(20)).await;
    let dave = PlayerId::from("dave");
    let snapshot = h.room.add_player(dave, "Dave".into()).unwrap();
    assert_eq!(snapshot.round, 1);
    assert_eq!(
        snapshot.live,
        LiveState::Drawing {
            masked_word: "_____".into(),
            time_left: 60,
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_drawing_relay_is_drawer_only() {
    let mut h = Harness::new();
    h.join(bob(), "Bob");
    h.start(Settings::default()).await;
    h.room.start_match(&alice(), "apple").unwrap();

    let data = serde_json::json!({ "x": 1, "y": 2 });
    let err = h.room.relay_drawing(&bob(), data.clone()).unwrap_err();
    assert!(matches!(err, RoomError::NotDrawer(_)));

    let events = h.room.relay_drawing(&alice(), data.clone()).unwrap();
    assert_eq!(
        events,
        vec![(
            Recipient::AllExcept(vec![alice()]),
            ServerEvent::DrawingData { data }
        )]
    );
}

// =========================================================================
// Rounds and end of game
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_every_player_draws_once_per_round() {
    let mut h = Harness::new();
    h.join(bob(), "Bob");
    h.join(carol(), "Carol");
    let settings = Settings {
        max_rounds: 2,
        draw_time: 15,
        ..Settings::default()
    };
    let events = h.start(settings).await;
    assert_eq!(h.room.remaining_drawers(), vec![bob(), carol()]);

    let mut drawers = vec![choosing_drawer(&events).unwrap()];
    let events = h
        .pump_until(|e| *e == ServerEvent::RoundInfo { round: 2 })
        .await;
    drawers.extend(events.iter().filter_map(|(to, e)| match (to, e) {
        (
            Recipient::Player(id),
            ServerEvent::Choosing {
                view: ChoosingView::Drawer { .. },
            },
        ) => Some(id.clone()),
        _ => None,
    }));

    assert_eq!(drawers, vec![alice(), bob(), carol()]);
    assert_eq!(h.room.round(), 2);
    assert_eq!(h.room.remaining_drawers(), vec![alice(), bob(), carol()]);
}

#[tokio::test(start_paused = true)]
async fn test_final_round_announces_winner_then_resets() {
    let mut h = Harness::new();
    h.join(bob(), "Bob");
    h.join(carol(), "Carol");
    let settings = Settings {
        max_rounds: 1,
        draw_time: 30,
        hints: 1,
        ..Settings::default()
    };
    h.start(settings).await;

    // Alice draws; only Bob finds it.
    h.room.start_match(&alice(), "apple").unwrap();
    h.room.validate_guess(&bob(), "apple").unwrap();

    // Bob and Carol draw with nobody guessing.
    let results = loop {
        let events = h.next_alarm().await;
        let results = events.iter().find_map(|(_, e)| match e {
            ServerEvent::Results { players } => Some(players.clone()),
            _ => None,
        });
        if let Some(players) = results {
            break players;
        }
        if let Some(drawer) = choosing_drawer(&events) {
            h.room.start_match(&drawer, "apple").unwrap();
        }
    };

    let ranking: Vec<(PlayerId, u32)> = results.iter().map(|p| (p.id.clone(), p.score)).collect();
    assert_eq!(ranking, vec![(bob(), 100), (alice(), 50), (carol(), 0)]);
    assert_eq!(h.room.status(), RoomStatus::Finished);

    let finished = Instant::now();
    let events = h.next_alarm().await;
    assert_eq!(finished.elapsed(), Duration::from_secs(4));
    assert_eq!(events[0], (Recipient::All, ServerEvent::Restart));
    assert_eq!(
        events[1],
        (
            Recipient::All,
            ServerEvent::SettingsUpdated {
                settings: Settings::default()
            }
        )
    );
    assert!(matches!(events[2].1, ServerEvent::RoomMembers { .. }));
    assert_eq!(h.room.status(), RoomStatus::Waiting);
    assert_eq!(h.room.round(), 0);
    assert_eq!(*h.room.settings(), Settings::default());
    for id in [alice(), bob(), carol()] {
        assert_eq!(h.room.score_of(&id), Some(0));
    }
}

#[tokio::test(start_paused = true)]
async fn test_short_word_source_ends_round() {
    let mut h = Harness::with_words(vec!["apple", "banana"]);
    h.join(bob(), "Bob");
    let settings = Settings {
        max_rounds: 1,
        ..Settings::default()
    };
    h.room.start_game(&alice(), settings).unwrap();

    let events = h.next_alarm().await;
    assert!(choosing_drawer(&events).is_none());
    assert!(events_only(&events)
        .iter()
        .any(|e| matches!(e, ServerEvent::Results { .. })));
    assert_eq!(h.room.status(), RoomStatus::Finished);
}
