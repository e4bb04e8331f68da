use serde::{Deserialize, Serialize};

/// A player's symbol on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    pub fn other(self) -> Mark {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }
}

impl std::fmt::Display for Mark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mark::X => write!(f, "X"),
            Mark::O => write!(f, "O"),
        }
    }
}

/// Outcome of a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameResult {
    X,
    O,
    #[serde(rename = "draw")]
    Draw,
}

impl From<Mark> for GameResult {
    fn from(mark: Mark) -> Self {
        match mark {
            Mark::X => GameResult::X,
            Mark::O => GameResult::O,
        }
    }
}

/// Lobby availability of a logged-in player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Online,
    Playing,
}

/// Public view of a logged-in player, as broadcast in the lobby list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub status: Status,
}

/// Which connection holds which symbol in a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seats {
    #[serde(rename = "X")]
    pub x: String,
    #[serde(rename = "O")]
    pub o: String,
}

impl Seats {
    pub fn mark_of(&self, conn_id: &str) -> Option<Mark> {
        if self.x == conn_id {
            Some(Mark::X)
        } else if self.o == conn_id {
            Some(Mark::O)
        } else {
            None
        }
    }

    pub fn opponent_of(&self, conn_id: &str) -> Option<&str> {
        match self.mark_of(conn_id)? {
            Mark::X => Some(&self.o),
            Mark::O => Some(&self.x),
        }
    }
}

/// Room state projected for one participant: identical for both sides except
/// for `player_symbol` and `opponent_name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub id: String,
    pub board: [Option<Mark>; 9],
    pub players: Seats,
    pub turn: Mark,
    pub winner: Option<GameResult>,
    pub player_symbol: Mark,
    pub opponent_name: String,
}

/// Messages sent from server to clients via WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMsg {
    LoginSuccess {
        player: Player,
    },
    LoginError {
        message: String,
    },
    UpdatePlayerList {
        players: Vec<Player>,
    },
    PlayRequest {
        from: Player,
    },
    #[serde(rename_all = "camelCase")]
    RequestWithdrawn {
        sender_id: String,
    },
    #[serde(rename_all = "camelCase")]
    RequestDeclined {
        sender_id: String,
    },
    GameStart {
        game: PlayerView,
    },
    GameUpdate {
        game: PlayerView,
    },
    ChatMessage {
        from: String,
        text: String,
    },
    OpponentLeft,
    Error {
        message: String,
    },
}

/// Messages sent from clients to server via WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMsg {
    SetPin {
        pin: String,
    },
    #[serde(rename_all = "camelCase")]
    PlayRequest {
        target_id: String,
    },
    #[serde(rename_all = "camelCase")]
    WithdrawRequest {
        target_id: String,
    },
    #[serde(rename_all = "camelCase")]
    AcceptRequest {
        sender_id: String,
    },
    #[serde(rename_all = "camelCase")]
    DeclineRequest {
        sender_id: String,
    },
    #[serde(rename_all = "camelCase")]
    Move {
        cell_index: usize,
    },
    ChatMessage {
        text: String,
    },
    NewGameRequest,
    LeaveRoom,
}
