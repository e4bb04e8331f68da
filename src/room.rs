use rand::Rng;

use crate::types::{GameResult, Mark, PlayerView, Seats};

/// Rows, columns, diagonals — checked in this order, first match wins.
const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// An active two-player game. The board, turn, and winner are only ever
/// mutated through `apply_move` and `rematch`.
#[derive(Debug, Clone)]
pub struct GameRoom {
    pub id: String,
    pub board: [Option<Mark>; 9],
    pub seats: Seats,
    pub turn: Mark,
    pub winner: Option<GameResult>,
}

impl GameRoom {
    /// Create a room for two connections. Symbols are assigned by an
    /// unbiased coin flip; X always opens.
    pub fn new(conn_a: &str, conn_b: &str) -> GameRoom {
        let seats = if rand::rng().random_bool(0.5) {
            Seats {
                x: conn_a.to_string(),
                o: conn_b.to_string(),
            }
        } else {
            Seats {
                x: conn_b.to_string(),
                o: conn_a.to_string(),
            }
        };

        GameRoom {
            id: format!("game-{}-{}", conn_a, conn_b),
            board: [None; 9],
            seats,
            turn: Mark::X,
            winner: None,
        }
    }

    /// Attempt a move. Returns false (leaving the room untouched) if the
    /// connection is not seated, it is not its turn, the cell is taken or out
    /// of range, or the game is already over.
    pub fn apply_move(&mut self, conn_id: &str, cell: usize) -> bool {
        let Some(mark) = self.seats.mark_of(conn_id) else {
            return false;
        };
        if self.winner.is_some() || self.turn != mark {
            return false;
        }
        if cell >= 9 || self.board[cell].is_some() {
            return false;
        }

        self.board[cell] = Some(mark);

        if let Some(result) = evaluate(&self.board) {
            self.winner = Some(result);
        } else {
            self.turn = self.turn.other();
        }
        true
    }

    /// Reset a finished game for another round. The starting turn is
    /// re-randomized rather than alternated.
    pub fn rematch(&mut self, conn_id: &str) -> bool {
        if self.winner.is_none() || self.seats.mark_of(conn_id).is_none() {
            return false;
        }

        self.board = [None; 9];
        self.winner = None;
        self.turn = if rand::rng().random_bool(0.5) {
            Mark::X
        } else {
            Mark::O
        };
        true
    }

    /// Project the room for one participant.
    pub fn perspective_for(&self, conn_id: &str, opponent_name: &str) -> Option<PlayerView> {
        let player_symbol = self.seats.mark_of(conn_id)?;
        Some(PlayerView {
            id: self.id.clone(),
            board: self.board,
            players: self.seats.clone(),
            turn: self.turn,
            winner: self.winner,
            player_symbol,
            opponent_name: opponent_name.to_string(),
        })
    }
}

/// Winner if a line is complete, draw if the board is full, otherwise none.
fn evaluate(board: &[Option<Mark>; 9]) -> Option<GameResult> {
    for [a, b, c] in LINES {
        if let Some(mark) = board[a] {
            if board[b] == Some(mark) && board[c] == Some(mark) {
                return Some(mark.into());
            }
        }
    }

    if board.iter().all(|cell| cell.is_some()) {
        Some(GameResult::Draw)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_room() -> GameRoom {
        GameRoom {
            id: "game-a-b".to_string(),
            board: [None; 9],
            seats: Seats {
                x: "a".to_string(),
                o: "b".to_string(),
            },
            turn: Mark::X,
            winner: None,
        }
    }

    #[test]
    fn symbols_split_between_both_players() {
        let room = GameRoom::new("a", "b");
        assert_ne!(room.seats.x, room.seats.o);
        assert!(room.seats.mark_of("a").is_some());
        assert!(room.seats.mark_of("b").is_some());
        assert_eq!(room.turn, Mark::X);
        assert!(room.board.iter().all(|c| c.is_none()));
    }

    #[test]
    fn coin_flip_produces_both_assignments() {
        let mut a_was_x = false;
        let mut b_was_x = false;
        for _ in 0..200 {
            let room = GameRoom::new("a", "b");
            match room.seats.mark_of("a") {
                Some(Mark::X) => a_was_x = true,
                _ => b_was_x = true,
            }
        }
        assert!(a_was_x && b_was_x);
    }

    #[test]
    fn turn_alternates_on_valid_moves() {
        let mut room = fixed_room();
        assert!(room.apply_move("a", 0));
        assert_eq!(room.turn, Mark::O);
        assert!(room.apply_move("b", 4));
        assert_eq!(room.turn, Mark::X);
        assert_eq!(room.board[0], Some(Mark::X));
        assert_eq!(room.board[4], Some(Mark::O));
    }

    #[test]
    fn rejects_out_of_turn_move() {
        let mut room = fixed_room();
        assert!(!room.apply_move("b", 0));
        assert!(room.board.iter().all(|c| c.is_none()));
        assert_eq!(room.turn, Mark::X);
    }

    #[test]
    fn rejects_occupied_cell() {
        let mut room = fixed_room();
        assert!(room.apply_move("a", 0));
        assert!(!room.apply_move("b", 0));
        assert_eq!(room.board[0], Some(Mark::X));
        assert_eq!(room.turn, Mark::O);
    }

    #[test]
    fn rejects_out_of_range_cell() {
        let mut room = fixed_room();
        assert!(!room.apply_move("a", 9));
        assert_eq!(room.turn, Mark::X);
    }

    #[test]
    fn rejects_non_participant() {
        let mut room = fixed_room();
        assert!(!room.apply_move("stranger", 0));
    }

    #[test]
    fn detects_every_winning_line() {
        for line in LINES {
            let mut board = [None; 9];
            for cell in line {
                board[cell] = Some(Mark::O);
            }
            assert_eq!(evaluate(&board), Some(GameResult::O), "line {:?}", line);
        }
    }

    #[test]
    fn full_board_without_line_is_a_draw() {
        // X O X / X O O / O X X
        let x = Some(Mark::X);
        let o = Some(Mark::O);
        let board = [x, o, x, x, o, o, o, x, x];
        assert_eq!(evaluate(&board), Some(GameResult::Draw));
    }

    #[test]
    fn win_ends_the_game() {
        let mut room = fixed_room();
        // X takes the top row.
        assert!(room.apply_move("a", 0));
        assert!(room.apply_move("b", 3));
        assert!(room.apply_move("a", 1));
        assert!(room.apply_move("b", 4));
        assert!(room.apply_move("a", 2));
        assert_eq!(room.winner, Some(GameResult::X));
        // Turn does not flip past a terminal state, and no further moves land.
        assert_eq!(room.turn, Mark::X);
        assert!(!room.apply_move("b", 5));
        assert_eq!(room.board[5], None);
    }

    #[test]
    fn rematch_only_after_terminal_state() {
        let mut room = fixed_room();
        assert!(!room.rematch("a"));

        room.winner = Some(GameResult::X);
        room.board[0] = Some(Mark::X);
        assert!(!room.rematch("stranger"));
        assert!(room.rematch("a"));
        assert!(room.board.iter().all(|c| c.is_none()));
        assert_eq!(room.winner, None);
    }

    #[test]
    fn rematch_randomizes_starting_turn() {
        let mut saw_x = false;
        let mut saw_o = false;
        for _ in 0..200 {
            let mut room = fixed_room();
            room.winner = Some(GameResult::Draw);
            assert!(room.rematch("b"));
            match room.turn {
                Mark::X => saw_x = true,
                Mark::O => saw_o = true,
            }
        }
        assert!(saw_x && saw_o);
    }

    #[test]
    fn perspectives_are_complementary() {
        let room = fixed_room();
        let a = room.perspective_for("a", "Bob").unwrap();
        let b = room.perspective_for("b", "Alice").unwrap();
        assert_eq!(a.player_symbol, Mark::X);
        assert_eq!(b.player_symbol, Mark::O);
        assert_eq!(a.opponent_name, "Bob");
        assert_eq!(b.opponent_name, "Alice");
        assert_eq!(a.id, b.id);
        assert!(room.perspective_for("stranger", "x").is_none());
    }
}
