use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::room::GameRoom;
use crate::types::{ClientMsg, Player, ServerMsg, Status};

/// Per-connection outbound channel. Sends are fire-and-forget; a closed
/// receiver just means the socket is already gone.
pub type OutboundTx = mpsc::UnboundedSender<ServerMsg>;

/// A logged-in connection.
struct Session {
    name: String,
    status: Status,
    pin: String,
    room: Option<String>,
}

impl Session {
    fn public(&self, conn_id: &str) -> Player {
        Player {
            id: conn_id.to_string(),
            name: self.name.clone(),
            status: self.status,
        }
    }
}

/// The single service object owning all matchmaking and room state. Wrapped
/// in a `Mutex` by the caller; every handler runs under one lock acquisition,
/// so mutations touching a room and its occupants are serialized.
pub struct Lobby {
    /// PIN -> display name, loaded once at startup.
    credentials: HashMap<String, String>,
    /// conn_id -> outbound sender, shared with the socket accept path.
    conns: Arc<DashMap<String, OutboundTx>>,
    /// conn_id -> session, one per live authenticated connection.
    players: HashMap<String, Session>,
    /// PINs currently bound to a live connection.
    pins_in_use: HashSet<String>,
    /// room_id -> room.
    rooms: HashMap<String, GameRoom>,
    /// Pending play requests as (sender, target) pairs.
    pending: HashSet<(String, String)>,
}

impl Lobby {
    pub fn new(
        credentials: HashMap<String, String>,
        conns: Arc<DashMap<String, OutboundTx>>,
    ) -> Lobby {
        Lobby {
            credentials,
            conns,
            players: HashMap::new(),
            pins_in_use: HashSet::new(),
            rooms: HashMap::new(),
            pending: HashSet::new(),
        }
    }

    /// Dispatch one inbound message from a connection.
    pub fn handle(&mut self, conn_id: &str, msg: ClientMsg) {
        match msg {
            ClientMsg::SetPin { pin } => self.login(conn_id, pin),
            ClientMsg::PlayRequest { target_id } => self.play_request(conn_id, &target_id),
            ClientMsg::WithdrawRequest { target_id } => self.withdraw(conn_id, &target_id),
            ClientMsg::AcceptRequest { sender_id } => self.accept(conn_id, &sender_id),
            ClientMsg::DeclineRequest { sender_id } => self.decline(conn_id, &sender_id),
            ClientMsg::Move { cell_index } => self.apply_move(conn_id, cell_index),
            ClientMsg::ChatMessage { text } => self.chat(conn_id, text),
            ClientMsg::NewGameRequest => self.rematch(conn_id),
            ClientMsg::LeaveRoom => self.leave_room(conn_id),
        }
    }

    // ─── Identity registry ────────────────────────────────────────

    fn login(&mut self, conn_id: &str, pin: String) {
        if self.players.contains_key(conn_id) {
            // Already authenticated on this connection.
            return;
        }

        let Some(name) = self.credentials.get(&pin).cloned() else {
            self.send(conn_id, ServerMsg::LoginError {
                message: "Invalid PIN.".to_string(),
            });
            return;
        };

        if self.pins_in_use.contains(&pin) {
            self.send(conn_id, ServerMsg::LoginError {
                message: "This PIN is already in use.".to_string(),
            });
            return;
        }

        self.pins_in_use.insert(pin.clone());
        let session = Session {
            name: name.clone(),
            status: Status::Online,
            pin,
            room: None,
        };
        let player = session.public(conn_id);
        self.players.insert(conn_id.to_string(), session);

        self.send(conn_id, ServerMsg::LoginSuccess { player });
        self.broadcast_player_list();
        tracing::info!("Player {} ({}) logged in", name, conn_id);
    }

    /// Reconcile an abruptly or cleanly closed connection. Idempotent; runs
    /// room teardown, handshake voidance, and registry removal as one unit.
    pub fn disconnect(&mut self, conn_id: &str) {
        self.conns.remove(conn_id);

        // Void pending requests involving this identity, telling the peer.
        let voided: Vec<(String, String)> = self
            .pending
            .iter()
            .filter(|(from, to)| from == conn_id || to == conn_id)
            .cloned()
            .collect();
        for pair in voided {
            self.pending.remove(&pair);
            let (from, to) = pair;
            if from == conn_id {
                self.send(&to, ServerMsg::RequestWithdrawn {
                    sender_id: conn_id.to_string(),
                });
            } else {
                self.send(&from, ServerMsg::RequestDeclined {
                    sender_id: conn_id.to_string(),
                });
            }
        }

        let Some(session) = self.players.remove(conn_id) else {
            return;
        };
        self.pins_in_use.remove(&session.pin);

        if let Some(room_id) = session.room {
            if let Some(room) = self.rooms.get(&room_id) {
                if let Some(opponent) = room.seats.opponent_of(conn_id) {
                    let opponent = opponent.to_string();
                    self.send(&opponent, ServerMsg::OpponentLeft);
                }
            }
            self.teardown(&room_id);
        }

        self.broadcast_player_list();
        tracing::info!("Player {} ({}) disconnected", session.name, conn_id);
    }

    // ─── Presence ─────────────────────────────────────────────────

    /// Push the full lobby view to every live connection. Each client
    /// filters out its own entry locally.
    fn broadcast_player_list(&self) {
        let players: Vec<Player> = self
            .players
            .iter()
            .map(|(id, session)| session.public(id))
            .collect();
        for entry in self.conns.iter() {
            let _ = entry.value().send(ServerMsg::UpdatePlayerList {
                players: players.clone(),
            });
        }
    }

    // ─── Matchmaking handshake ────────────────────────────────────

    fn play_request(&mut self, conn_id: &str, target_id: &str) {
        if target_id == conn_id {
            return;
        }
        let Some(sender) = self.players.get(conn_id) else {
            return;
        };
        // Dropped silently if the target has since disconnected.
        if !self.players.contains_key(target_id) {
            return;
        }

        let from = sender.public(conn_id);
        self.pending
            .insert((conn_id.to_string(), target_id.to_string()));
        self.send(target_id, ServerMsg::PlayRequest { from });
    }

    fn withdraw(&mut self, conn_id: &str, target_id: &str) {
        if self
            .pending
            .remove(&(conn_id.to_string(), target_id.to_string()))
        {
            self.send(target_id, ServerMsg::RequestWithdrawn {
                sender_id: conn_id.to_string(),
            });
        }
    }

    fn decline(&mut self, conn_id: &str, sender_id: &str) {
        if self
            .pending
            .remove(&(sender_id.to_string(), conn_id.to_string()))
        {
            self.send(sender_id, ServerMsg::RequestDeclined {
                sender_id: conn_id.to_string(),
            });
        }
    }

    fn accept(&mut self, conn_id: &str, sender_id: &str) {
        if !self
            .pending
            .remove(&(sender_id.to_string(), conn_id.to_string()))
        {
            self.send(conn_id, ServerMsg::Error {
                message: "No pending request from this player.".to_string(),
            });
            return;
        }

        let acceptor_online = self
            .players
            .get(conn_id)
            .is_some_and(|s| s.status == Status::Online);
        let sender_online = self
            .players
            .get(sender_id)
            .is_some_and(|s| s.status == Status::Online);

        if !acceptor_online || !sender_online {
            self.send(conn_id, ServerMsg::Error {
                message: "Player is no longer available.".to_string(),
            });
            self.send(sender_id, ServerMsg::Error {
                message: "Opponent is no longer available.".to_string(),
            });
            return;
        }

        // A crossed request in the other direction is consumed too.
        self.pending
            .remove(&(conn_id.to_string(), sender_id.to_string()));

        let room = GameRoom::new(conn_id, sender_id);
        let room_id = room.id.clone();
        for occupant in [conn_id, sender_id] {
            if let Some(session) = self.players.get_mut(occupant) {
                session.status = Status::Playing;
                session.room = Some(room_id.clone());
            }
        }
        self.rooms.insert(room_id.clone(), room);

        self.push_room_state(&room_id, true);
        self.broadcast_player_list();
        tracing::info!("Room {} created", room_id);
    }

    // ─── Room manager & game state machine ────────────────────────

    fn apply_move(&mut self, conn_id: &str, cell_index: usize) {
        let Some(room_id) = self.room_of(conn_id) else {
            return;
        };
        let Some(room) = self.rooms.get_mut(&room_id) else {
            return;
        };
        if room.apply_move(conn_id, cell_index) {
            self.push_room_state(&room_id, false);
        }
    }

    fn rematch(&mut self, conn_id: &str) {
        let Some(room_id) = self.room_of(conn_id) else {
            return;
        };
        let Some(room) = self.rooms.get_mut(&room_id) else {
            return;
        };
        if room.rematch(conn_id) {
            self.push_room_state(&room_id, false);
            tracing::info!("Room {} reset for a rematch", room_id);
        }
    }

    fn leave_room(&mut self, conn_id: &str) {
        let Some(room_id) = self.room_of(conn_id) else {
            return;
        };
        if let Some(room) = self.rooms.get(&room_id) {
            if let Some(opponent) = room.seats.opponent_of(conn_id) {
                let opponent = opponent.to_string();
                self.send(&opponent, ServerMsg::OpponentLeft);
            }
        }
        self.teardown(&room_id);
    }

    /// Remove a room and return both occupants to the lobby. A second call
    /// for the same id is a no-op.
    fn teardown(&mut self, room_id: &str) {
        let Some(room) = self.rooms.remove(room_id) else {
            return;
        };
        for occupant in [&room.seats.x, &room.seats.o] {
            if let Some(session) = self.players.get_mut(occupant) {
                session.status = Status::Online;
                session.room = None;
            }
        }
        self.broadcast_player_list();
        tracing::info!("Room {} torn down", room_id);
    }

    /// Push each occupant's perspective of the room.
    fn push_room_state(&self, room_id: &str, start: bool) {
        let Some(room) = self.rooms.get(room_id) else {
            return;
        };
        for occupant in [room.seats.x.clone(), room.seats.o.clone()] {
            let opponent_name = room
                .seats
                .opponent_of(&occupant)
                .and_then(|opp| self.players.get(opp))
                .map(|s| s.name.as_str())
                .unwrap_or("Opponent");
            let Some(game) = room.perspective_for(&occupant, opponent_name) else {
                continue;
            };
            let msg = if start {
                ServerMsg::GameStart { game }
            } else {
                ServerMsg::GameUpdate { game }
            };
            self.send(&occupant, msg);
        }
    }

    // ─── Chat relay ───────────────────────────────────────────────

    fn chat(&mut self, conn_id: &str, text: String) {
        let Some(session) = self.players.get(conn_id) else {
            return;
        };
        let from = session.name.clone();
        let Some(room_id) = session.room.clone() else {
            return;
        };
        let Some(room) = self.rooms.get(&room_id) else {
            return;
        };
        if let Some(opponent) = room.seats.opponent_of(conn_id) {
            let opponent = opponent.to_string();
            self.send(&opponent, ServerMsg::ChatMessage { from, text });
        }
    }

    // ─── Helpers ──────────────────────────────────────────────────

    fn room_of(&self, conn_id: &str) -> Option<String> {
        self.players.get(conn_id)?.room.clone()
    }

    fn send(&self, conn_id: &str, msg: ServerMsg) {
        if let Some(tx) = self.conns.get(conn_id) {
            let _ = tx.send(msg);
        }
    }
}
