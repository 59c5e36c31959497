use fogmate::chess::{Color, PieceType, Square, StandardRules};
use fogmate::game::{
    EndReason, GameError, GameSession, MoveOutcome, PlayerId, Players, Status,
};
use fogmate::messages::ServerMessage;

const WHITE: PlayerId = PlayerId(1);
const BLACK: PlayerId = PlayerId(2);
const OUTSIDER: PlayerId = PlayerId(3);

fn sq(name: &str) -> Square {
    name.parse().unwrap()
}

fn players() -> Players {
    Players {
        white: WHITE,
        black: BLACK,
    }
}

fn new_game() -> GameSession {
    GameSession::new("g_test".to_string(), Box::new(StandardRules::new()), players())
}

fn game_from_fen(fen: &str) -> GameSession {
    GameSession::new(
        "g_test".to_string(),
        Box::new(StandardRules::from_fen(fen).unwrap()),
        players(),
    )
}

fn play(session: &mut GameSession, moves: &[(PlayerId, &str, &str)]) -> MoveOutcome {
    let mut last = None;
    for &(player, from, to) in moves {
        last = Some(session.submit_move(player, sq(from), sq(to), None).unwrap());
    }
    last.unwrap()
}

#[test]
fn test_wrong_player_cannot_move() {
    let mut session = new_game();
    let before = session.view(Color::White);

    let result = session.submit_move(BLACK, sq("e7"), sq("e5"), None);
    assert_eq!(result.unwrap_err(), GameError::NotYourTurn);

    let result = session.submit_move(OUTSIDER, sq("e2"), sq("e4"), None);
    assert_eq!(result.unwrap_err(), GameError::NotYourTurn);

    assert_eq!(session.turn(), Color::White);
    assert_eq!(session.view(Color::White), before);
    assert_eq!(session.status(), Status::InProgress);
}

#[test]
fn test_illegal_move_leaves_state_untouched() {
    let mut session = new_game();
    let before = session.view(Color::White);

    let result = session.submit_move(WHITE, sq("e2"), sq("e5"), None);
    assert!(matches!(result, Err(GameError::IllegalMove(_))));
    assert_eq!(session.turn(), Color::White);
    assert_eq!(session.view(Color::White), before);
}

#[test]
fn test_each_side_gets_its_own_view() {
    let mut session = new_game();
    let outcome = play(
        &mut session,
        &[(WHITE, "e2", "e4"), (BLACK, "d7", "d5")],
    );

    assert_eq!(outcome.turn, Color::White);
    assert!(!outcome.is_game_over);

    // The pawns face each other diagonally, so each side sees the other
    let white = outcome.view_for(Color::White);
    assert!(white.visible.contains(sq("d5")));
    assert_eq!(white.board.get(sq("d5")).map(|p| p.color), Some(Color::Black));
    let black = outcome.view_for(Color::Black);
    assert!(black.visible.contains(sq("e4")));

    // Neither side sees the far back rank
    assert!(white.board.get(sq("e8")).is_none());
    assert!(black.board.get(sq("e1")).is_none());
}

#[test]
fn test_checkmate_ends_the_game() {
    let mut session = new_game();
    let outcome = play(
        &mut session,
        &[
            (WHITE, "f2", "f3"),
            (BLACK, "e7", "e5"),
            (WHITE, "g2", "g4"),
            (BLACK, "d8", "h4"),
        ],
    );

    assert!(outcome.is_game_over);
    assert!(outcome.is_checkmate);
    assert_eq!(outcome.winner, Some(Color::Black));
    assert_eq!(
        session.status(),
        Status::Ended {
            reason: EndReason::Checkmate,
            winner: Some(Color::Black),
        }
    );

    for color in Color::ALL {
        let json = serde_json::to_value(ServerMessage::move_made(&outcome, color)).unwrap();
        assert_eq!(json["isCheckmate"], true);
        assert_eq!(json["isGameOver"], true);
        assert_eq!(json["winner"], "black");
    }

    let result = session.submit_move(WHITE, sq("e2"), sq("e4"), None);
    assert_eq!(result.unwrap_err(), GameError::SessionInactive);
}

#[test]
fn test_check_is_never_reported() {
    let mut session = new_game();
    let outcome = play(
        &mut session,
        &[
            (WHITE, "e2", "e4"),
            (BLACK, "f7", "f5"),
            (WHITE, "d1", "h5"),
        ],
    );

    assert!(!outcome.is_game_over);
    assert!(!outcome.is_checkmate);
    assert_eq!(outcome.winner, None);

    for color in Color::ALL {
        let json = serde_json::to_value(ServerMessage::move_made(&outcome, color)).unwrap();
        let mut keys: Vec<&str> = json
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        keys.sort();
        assert_eq!(
            keys,
            vec![
                "board",
                "isCheckmate",
                "isGameOver",
                "move",
                "turn",
                "type",
                "visibleSquares",
                "winner"
            ]
        );
        assert_eq!(json["move"], serde_json::json!({"from": "d1", "to": "h5"}));
    }
}

#[test]
fn test_stalemate_has_no_winner() {
    let mut session = game_from_fen("7k/8/6Q1/8/8/8/8/K7 w - - 0 1");
    let outcome = session
        .submit_move(WHITE, sq("g6"), sq("f7"), None)
        .unwrap();

    assert!(outcome.is_game_over);
    assert!(!outcome.is_checkmate);
    assert_eq!(outcome.winner, None);
    assert_eq!(
        session.status(),
        Status::Ended {
            reason: EndReason::Stalemate,
            winner: None,
        }
    );
}

#[test]
fn test_fifty_move_rule_is_a_draw() {
    let mut session = game_from_fen("4k3/8/8/8/8/8/8/R3K3 w - - 99 80");
    let outcome = session
        .submit_move(WHITE, sq("a1"), sq("a2"), None)
        .unwrap();

    assert!(outcome.is_game_over);
    assert!(!outcome.is_checkmate);
    assert_eq!(outcome.winner, None);
    assert_eq!(
        session.status(),
        Status::Ended {
            reason: EndReason::Draw,
            winner: None,
        }
    );
}

#[test]
fn test_threefold_repetition_is_a_draw() {
    let mut session = game_from_fen("4k3/8/8/8/8/8/8/R3K3 w - - 0 1");
    let shuffle = [
        (WHITE, "a1", "a2"),
        (BLACK, "e8", "d8"),
        (WHITE, "a2", "a1"),
        (BLACK, "d8", "e8"),
    ];

    let outcome = play(&mut session, &shuffle);
    assert!(!outcome.is_game_over);
    let outcome = play(&mut session, &shuffle[..3]);
    assert!(!outcome.is_game_over);
    assert!(session.status().is_in_progress());

    let outcome = play(&mut session, &shuffle[3..]);
    assert!(outcome.is_game_over);
    assert_eq!(outcome.winner, None);
    assert_eq!(
        session.status(),
        Status::Ended {
            reason: EndReason::Draw,
            winner: None,
        }
    );
}

#[test]
fn test_promotion_choice_reaches_the_board() {
    let mut session = game_from_fen("8/P6k/8/8/8/8/8/K7 w - - 0 1");
    let outcome = session
        .submit_move(WHITE, sq("a7"), sq("a8"), Some(PieceType::Knight))
        .unwrap();
    let promoted = outcome.view_for(Color::White).board.get(sq("a8")).unwrap();
    assert_eq!(promoted.kind, PieceType::Knight);
}

#[test]
fn test_query_moves_respects_visibility() {
    let session = new_game();

    let mut moves = session.query_moves(WHITE, sq("e2")).unwrap();
    moves.sort();
    let mut expected = vec![sq("e3"), sq("e4")];
    expected.sort();
    assert_eq!(moves, expected);

    // Black gets nothing for a square it cannot see, even one with legal moves
    assert!(session.query_moves(BLACK, sq("e2")).unwrap().is_empty());
    assert!(session.query_moves(WHITE, sq("g8")).unwrap().is_empty());

    // Visible square with no legal moves
    assert!(session.query_moves(WHITE, sq("a1")).unwrap().is_empty());

    assert_eq!(
        session.query_moves(OUTSIDER, sq("e2")).unwrap_err(),
        GameError::NotAPlayer
    );
}

#[test]
fn test_query_moves_for_waiting_side() {
    // Destinations come from the true position, so the side not on move
    // gets nothing back for its own pieces
    let session = new_game();
    assert!(session.query_moves(BLACK, sq("e7")).unwrap().is_empty());
}

#[test]
fn test_resign() {
    let mut session = new_game();
    let over = session.resign(BLACK).unwrap();
    assert_eq!(over.reason, EndReason::Resignation);
    assert_eq!(over.winner, Color::White);
    assert!(session.status().is_ended());

    assert_eq!(session.resign(WHITE).unwrap_err(), GameError::SessionInactive);
    assert_eq!(session.resign(OUTSIDER).unwrap_err(), GameError::NotAPlayer);
}

#[test]
fn test_disconnect() {
    let mut session = new_game();
    assert!(session.handle_disconnect(OUTSIDER).is_none());
    assert!(session.status().is_in_progress());

    let over = session.handle_disconnect(WHITE).unwrap();
    assert_eq!(over.reason, EndReason::Disconnect);
    assert_eq!(over.winner, Color::Black);

    // A second disconnect after the game ended changes nothing
    assert!(session.handle_disconnect(BLACK).is_none());
}
