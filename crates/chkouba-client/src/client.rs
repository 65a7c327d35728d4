//! client - one table, one connection
//!
//! owns the scene state and routes the three kinds of events it reacts to:
//! server frames, surface completions and pointer gestures. outbound
//! messages queue up until the host drains them.
//!
//! ```text
//! UPDATE
//! ├── pending reset? hard reset
//! ├── invariants ok? diff against last snapshot
//! ├── confirm pending local move
//! ├── inferred move: lock ids, start pipeline
//! ├── sync unlocked entities, piles, hud
//! ├── idle ai seat? schedule ack
//! └── turn marker after settle
//! ```

use crate::config::{AnimationTimings, ClientConfig, ViewportConfig};
use crate::diff::{infer_remote_move, RemoteMove};
use crate::error::{ClientError, ProtocolAnomaly, Result};
use crate::hud::{HudView, Status};
use crate::input::{InputController, PointerEvent, Rejected};
use crate::layout::Layout;
use crate::protocol::{self, ClientMessage, ServerMessage};
use crate::registry::{EntityRegistry, SyncContext, SyncReport};
use crate::sequencer::{AnimationSequencer, Scene};
use crate::snapshot::Snapshot;
use crate::surface::{AssetResolver, Surface, Ticket};
use crate::timeline::{Continuation, Timeline};
use crate::turn::{self, TurnIndicator};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Lost(String),
}

/// what handling one server frame did
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpdateReport {
    pub inferred: Option<RemoteMove>,
    /// inference skipped this cycle
    pub anomaly: Option<ProtocolAnomaly>,
    /// a pending local move was confirmed
    pub confirmed: bool,
    pub sync: SyncReport,
}

pub struct Client<S: Surface> {
    config: ClientConfig,
    timings: AnimationTimings,
    layout: Layout,
    surface: S,
    registry: EntityRegistry,
    sequencer: AnimationSequencer,
    turn: TurnIndicator,
    input: InputController,
    timeline: Timeline,
    last: Option<Snapshot>,
    local: usize,
    outbound: Vec<ClientMessage>,
    reset_pending: bool,
    connection: ConnectionState,
}

impl<S: Surface> Client<S> {
    pub fn new(config: ClientConfig, surface: S) -> Result<Self> {
        config.validate()?;
        let timings = config.effective_timings();
        Ok(Self {
            layout: Layout::new(config.viewport),
            registry: EntityRegistry::new(AssetResolver::new(config.assets.card_back.clone())),
            input: InputController::new(timings.tap_threshold, timings.failsafe),
            timings,
            config,
            surface,
            sequencer: AnimationSequencer::new(),
            turn: TurnIndicator::new(),
            timeline: Timeline::new(),
            last: None,
            local: 0,
            outbound: Vec::new(),
            reset_pending: false,
            connection: ConnectionState::Connecting,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.last.as_ref()
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn sequencer(&self) -> &AnimationSequencer {
        &self.sequencer
    }

    pub fn pending_move(&self) -> Option<&crate::card::CardId> {
        self.input.pending()
    }

    pub fn connection(&self) -> &ConnectionState {
        &self.connection
    }

    pub fn local_seat(&self) -> usize {
        self.local
    }

    /// take everything queued for the server
    pub fn drain_outbound(&mut self) -> Vec<ClientMessage> {
        std::mem::take(&mut self.outbound)
    }

    /// transport is open; ask for the current state once
    pub fn connected(&mut self) {
        tracing::info!(player = %self.config.player_name, "connected, requesting state");
        self.connection = ConnectionState::Open;
        self.outbound.push(ClientMessage::GetState);
    }

    /// terminal: nothing is retried here
    pub fn connection_lost(&mut self, reason: impl Into<String>) -> ClientError {
        let reason = reason.into();
        tracing::warn!(%reason, "connection lost");
        self.connection = ConnectionState::Lost(reason.clone());
        let mut hud = match &self.last {
            Some(snap) => HudView::build(snap, self.local, self.local, &self.layout),
            None => HudView::waiting(),
        };
        hud.status = Status::ConnectionLost(reason.clone());
        self.surface.update_hud(&hud);
        ClientError::ConnectionLost(reason)
    }

    pub fn handle_text(&mut self, text: &str) -> Result<UpdateReport> {
        let msg = protocol::decode(text)?;
        Ok(self.handle_message(msg))
    }

    pub fn handle_message(&mut self, msg: ServerMessage) -> UpdateReport {
        match msg {
            ServerMessage::Init { state } => {
                tracing::info!(seats = state.seat_count(), "received INIT");
                self.reset();
                self.apply(state, true)
            }
            ServerMessage::Update { state } => {
                if self.reset_pending {
                    tracing::debug!("applying requested reset");
                    self.reset();
                }
                self.apply(state, false)
            }
        }
    }

    fn apply(&mut self, curr: Snapshot, init: bool) -> UpdateReport {
        let mut report = UpdateReport::default();
        let local = curr.local_seat_index(&self.config.player_name);
        self.local = local;

        match curr.check_invariants() {
            Err(anomaly) => {
                tracing::warn!(%anomaly, "snapshot violates card invariants, skipping inference");
                report.anomaly = Some(anomaly);
            }
            Ok(()) if !init => {
                if let Some(prev) = &self.last {
                    match infer_remote_move(prev, &curr, local) {
                        Ok(mv) => report.inferred = mv,
                        Err(anomaly) => {
                            tracing::warn!(%anomaly, "cannot infer remote move, resyncing");
                            report.anomaly = Some(anomaly);
                        }
                    }
                }
            }
            Ok(()) => {}
        }

        report.confirmed = self.input.confirm(&curr, local);

        if let Some(mv) = &report.inferred {
            tracing::info!(seat = mv.seat_index, played = %mv.played.id, captured = mv.captured.len(), "remote move");
            let mut scene = Scene {
                layout: &self.layout,
                timings: &self.timings,
                local,
                snapshot: &curr,
                registry: &mut self.registry,
                surface: &mut self.surface,
                timeline: &mut self.timeline,
                outbound: &mut self.outbound,
            };
            self.sequencer.begin(mv.clone(), &mut scene);
        }

        let ctx = SyncContext {
            layout: &self.layout,
            local,
            timings: &self.timings,
            snap: self.config.snap,
            previous: self.last.as_ref(),
            move_inferred: report.inferred.is_some(),
        };
        report.sync = self
            .registry
            .sync(&curr, self.sequencer.locks(), &ctx, &mut self.surface, &mut self.timeline);
        tracing::debug!(
            spawned = report.sync.spawned.len(),
            moved = report.sync.moved.len(),
            removing = report.sync.removing.len(),
            locked = report.sync.skipped.len(),
            "synced"
        );

        self.decorate(&curr);

        let mut scene = Scene {
            layout: &self.layout,
            timings: &self.timings,
            local,
            snapshot: &curr,
            registry: &mut self.registry,
            surface: &mut self.surface,
            timeline: &mut self.timeline,
            outbound: &mut self.outbound,
        };
        self.sequencer.schedule_nudge(report.inferred.is_some(), &mut scene);

        if init {
            self.turn
                .refresh(&curr, self.sequencer.in_flight_seat(), local, &self.layout, &mut self.surface);
        } else {
            let ticket = self.timeline.issue(Continuation::TurnSettle);
            self.surface.start_timer(self.timings.sync, ticket);
        }

        self.last = Some(curr);
        report
    }

    /// piles and hud for `snap`
    fn decorate(&mut self, snap: &Snapshot) {
        for seat in 0..snap.seat_count() {
            if let Some(pile) = self.registry.pile_view(snap, seat, self.local, &self.layout, &self.surface) {
                self.surface.draw_pile(&pile);
            }
        }
        let active = turn::active_seat(snap, self.sequencer.in_flight_seat());
        let hud = HudView::build(snap, self.local, active, &self.layout);
        self.surface.update_hud(&hud);
    }

    /// plain sync of the last snapshot, no inference
    fn resync(&mut self) -> Option<SyncReport> {
        let snap = self.last.take()?;
        let ctx = SyncContext {
            layout: &self.layout,
            local: self.local,
            timings: &self.timings,
            snap: self.config.snap,
            previous: Some(&snap),
            move_inferred: false,
        };
        let report = self
            .registry
            .sync(&snap, self.sequencer.locks(), &ctx, &mut self.surface, &mut self.timeline);
        self.decorate(&snap);
        self.last = Some(snap);
        Some(report)
    }

    /// a tween group or timer issued under `ticket` finished
    pub fn on_complete(&mut self, ticket: Ticket) {
        let Some(continuation) = self.timeline.take(ticket) else {
            tracing::trace!(ticket, "completion for unknown ticket");
            return;
        };

        match continuation {
            Continuation::Stage { pipeline, step } => {
                let Some(snap) = self.last.take() else {
                    return;
                };
                let mut scene = Scene {
                    layout: &self.layout,
                    timings: &self.timings,
                    local: self.local,
                    snapshot: &snap,
                    registry: &mut self.registry,
                    surface: &mut self.surface,
                    timeline: &mut self.timeline,
                    outbound: &mut self.outbound,
                };
                let finished = self.sequencer.advance(pipeline, step, &mut scene);
                self.last = Some(snap);
                if finished {
                    self.resync();
                    self.refresh_turn();
                }
            }
            Continuation::Removal(id) => self.registry.finish_removal(&id, &mut self.surface),
            Continuation::Failsafe(id) => {
                if self.input.expire(&id) {
                    self.resync();
                }
            }
            Continuation::AutoAck => {
                let still_waiting = self.sequencer.is_idle()
                    && self
                        .last
                        .as_ref()
                        .and_then(|s| s.current_seat().map(|seat| (s, seat)))
                        .map(|(s, seat)| {
                            seat.is_ai && s.current_seat_index != self.local && !s.round_finished && !s.game_over
                        })
                        .unwrap_or(false);
                if still_waiting {
                    tracing::debug!("nudging idle ai seat");
                    self.outbound.push(ClientMessage::AnimationComplete);
                }
            }
            Continuation::TurnSettle => self.refresh_turn(),
        }
    }

    fn refresh_turn(&mut self) {
        let Some(snap) = &self.last else {
            return;
        };
        let in_flight = self.sequencer.in_flight_seat();
        if self
            .turn
            .refresh(snap, in_flight, self.local, &self.layout, &mut self.surface)
            .is_some()
        {
            let active = turn::active_seat(snap, in_flight);
            let hud = HudView::build(snap, self.local, active, &self.layout);
            self.surface.update_hud(&hud);
        }
    }

    /// pointer gesture on a card
    pub fn on_pointer(&mut self, event: PointerEvent) -> std::result::Result<(), Rejected> {
        if let PointerEvent::DragRelease { card, at } = &event {
            self.registry.mark_displaced(card, *at);
        }
        let outcome = self.input.handle(
            &event,
            self.last.as_ref(),
            self.local,
            &mut self.timeline,
            &mut self.surface,
        );
        match outcome {
            Ok(msg) => {
                self.outbound.push(msg);
                Ok(())
            }
            Err(rejected) => {
                if matches!(event, PointerEvent::DragRelease { .. }) {
                    // put the card back where it belongs
                    self.resync();
                }
                Err(rejected)
            }
        }
    }

    /// ask for a fresh game; the scene is torn down on the next snapshot
    pub fn request_reset(&mut self) {
        self.reset_pending = true;
        self.outbound.push(ClientMessage::Reset);
    }

    pub fn start_game(&mut self) {
        self.reset_pending = true;
        self.outbound.push(ClientMessage::StartGame);
    }

    pub fn next_round(&mut self) {
        self.outbound.push(ClientMessage::NextRound);
    }

    /// drop every entity, lock, pending move and the last snapshot
    pub fn reset(&mut self) {
        self.registry.clear(&mut self.surface);
        self.sequencer.clear();
        self.timeline.clear();
        self.input.reset();
        self.turn.reset();
        self.last = None;
        self.reset_pending = false;
    }

    /// relayout everything for a new viewport
    pub fn resize(&mut self, viewport: ViewportConfig) {
        tracing::debug!(width = viewport.width, height = viewport.height, "resize");
        self.config.viewport = viewport;
        self.layout = Layout::new(viewport);
        if self.resync().is_some() {
            if let Some(snap) = &self.last {
                self.turn.redraw(snap, self.local, &self.layout, &mut self.surface);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::fixtures::*;
    use crate::surface::recording::RecordingSurface;

    fn config() -> ClientConfig {
        ClientConfig {
            player_name: "Alice".into(),
            ..Default::default()
        }
    }

    fn client() -> Client<RecordingSurface> {
        Client::new(config(), RecordingSurface::new()).unwrap()
    }

    fn settle(client: &mut Client<RecordingSurface>) {
        while let Some(ticket) = client.surface_mut().next_due() {
            client.on_complete(ticket);
        }
    }

    fn base() -> Snapshot {
        snapshot(
            &["7H"],
            vec![seat("Alice", &["1D", "2D"], &[], false), seat("Bot", &["3D", "4S", "5C"], &[], true)],
            0,
        )
    }

    #[test]
    fn test_connected_requests_state() {
        let mut c = client();
        c.connected();
        assert_eq!(c.drain_outbound(), vec![ClientMessage::GetState]);
        assert_eq!(c.connection(), &ConnectionState::Open);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut cfg = config();
        cfg.player_name = " ".into();
        assert!(matches!(
            Client::new(cfg, RecordingSurface::new()),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn test_init_syncs_and_marks_turn() {
        let mut c = client();
        c.handle_message(ServerMessage::Init { state: base() });
        assert_eq!(c.registry().len(), 6);
        assert_eq!(c.surface().turn_marker(), Some(0));
        assert_eq!(c.surface().cues(), 1);
        assert_eq!(c.surface().hud().map(|h| h.status.clone()), Some(Status::YourTurn));
    }

    #[test]
    fn test_lock_set_excluded_from_sync() {
        let mut c = client();
        c.handle_message(ServerMessage::Init { state: base() });
        let mut next = base();
        next.table.clear();
        next.seats[1].hand = cards(&["4S", "5C"]);
        next.seats[1].captured_cards = cards(&["7H", "3D"]);
        let report = c.handle_message(ServerMessage::Update { state: next });

        let mut skipped = report.sync.skipped.clone();
        skipped.sort();
        let mut locks: Vec<_> = c.sequencer().locks().iter().cloned().collect();
        locks.sort();
        assert_eq!(skipped, locks);
        // 7H was known; locked ids are neither removed nor moved by sync
        assert!(report.sync.removing.is_empty());
    }

    #[test]
    fn test_anomaly_falls_back_to_resync() {
        let mut c = client();
        c.handle_message(ServerMessage::Init { state: base() });
        let mut bad = base();
        bad.seats[0].hand.push(card("7H"));
        let report = c.handle_message(ServerMessage::Update { state: bad });
        assert!(matches!(report.anomaly, Some(ProtocolAnomaly::DuplicateCard { .. })));
        assert!(report.inferred.is_none());
        assert!(c.sequencer().is_idle());
    }

    #[test]
    fn test_auto_ack_for_idle_ai_turn() {
        let mut c = client();
        let mut snap = base();
        snap.current_seat_index = 1;
        c.handle_message(ServerMessage::Init { state: snap });
        assert!(c.drain_outbound().is_empty());
        settle(&mut c);
        assert_eq!(c.drain_outbound(), vec![ClientMessage::AnimationComplete]);
    }

    #[test]
    fn test_reset_request_applies_on_next_update() {
        let mut c = client();
        c.handle_message(ServerMessage::Init { state: base() });
        c.request_reset();
        assert_eq!(c.drain_outbound(), vec![ClientMessage::Reset]);
        assert_eq!(c.registry().len(), 6);

        let fresh = snapshot(&[], vec![seat("Alice", &["9S"], &[], false), seat("Bot", &["8S"], &[], true)], 0);
        let report = c.handle_message(ServerMessage::Update { state: fresh });
        assert!(report.inferred.is_none());
        assert_eq!(c.registry().len(), 2);
        assert!(report.sync.removing.is_empty());
    }

    #[test]
    fn test_failsafe_snaps_card_back() {
        let mut c = client();
        c.handle_message(ServerMessage::Init { state: base() });
        settle(&mut c);
        let home = c.registry().get(&"1D".into()).unwrap().transform;

        let released = c.on_pointer(PointerEvent::DragRelease {
            card: "1D".into(),
            at: crate::layout::Point::new(640.0, 360.0),
        });
        assert!(released.is_ok());
        assert!(c.pending_move().is_some());
        settle(&mut c);
        assert!(c.pending_move().is_none());
        assert_eq!(c.registry().get(&"1D".into()).unwrap().transform, home);
    }

    #[test]
    fn test_resize_relayouts() {
        let mut c = client();
        c.handle_message(ServerMessage::Init { state: base() });
        let before = c.registry().get(&"7H".into()).unwrap().transform.position;
        c.resize(ViewportConfig {
            width: 800.0,
            height: 600.0,
        });
        let after = c.registry().get(&"7H".into()).unwrap().transform.position;
        assert_ne!(before, after);
        assert_eq!(after, crate::layout::Point::new(400.0, 300.0));
    }

    #[test]
    fn test_connection_lost_is_reported() {
        let mut c = client();
        let err = c.connection_lost("closed by peer");
        assert!(matches!(err, ClientError::ConnectionLost(_)));
        assert_eq!(
            c.surface().hud().map(|h| h.status.clone()),
            Some(Status::ConnectionLost("closed by peer".into()))
        );
    }

    #[test]
    fn test_unseated_name_uses_seat_zero_for_diff() {
        let mut cfg = config();
        cfg.player_name = "Carol".into();
        let mut c = Client::new(cfg, RecordingSurface::new()).unwrap();
        c.handle_message(ServerMessage::Init { state: base() });
        assert_eq!(c.local_seat(), 0);

        let mut next = base();
        next.table.push(card("4S"));
        next.seats[1].hand = cards(&["3D", "5C"]);
        let report = c.handle_message(ServerMessage::Update { state: next });
        let mv = report.inferred.unwrap();
        assert_eq!(mv.seat_index, 1);
        assert_eq!(mv.played.id.as_str(), "4S");
    }

    #[test]
    fn test_decode_error_surfaces() {
        let mut c = client();
        assert!(matches!(c.handle_text("{"), Err(ClientError::Decode(_))));
    }
}
