//! Tests for the SQLite match repository.

use strictly_arena::db::{
    MatchFinish, MatchRepository, MatchStatus, NewGameRow, NewMatchRow, NewMoveRow, NewOpeningRow,
};
use strictly_gomoku::{
    ColorAssignment, Coord, EndReason, MatchConfig, MoveRecord, OpeningRecord, Outcome, Seat, Side,
};
use tempfile::NamedTempFile;

/// Creates a temporary database with migrations applied. The file handle
/// must stay in scope to keep the file alive.
fn setup_test_db() -> (NamedTempFile, MatchRepository) {
    let db_file = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = db_file.path().to_str().expect("Invalid path").to_string();
    let repo = MatchRepository::open(db_path).expect("Failed to open repository");
    (db_file, repo)
}

fn new_match(repo: &MatchRepository, id: &str) {
    let config = serde_json::to_string(&MatchConfig::default()).expect("Config serializes");
    repo.create_match(NewMatchRow::new(id.into(), config, "alice".into(), "bob".into()))
        .expect("Create failed");
}

#[test]
fn test_create_and_get_match() {
    let (_db, repo) = setup_test_db();
    new_match(&repo, "m-1");

    let row = repo.get_match("m-1").expect("Query failed").expect("Match missing");
    assert_eq!(row.first_player_id(), "alice");
    assert_eq!(row.parse_status().unwrap(), MatchStatus::Active);
    assert_eq!(row.match_config().unwrap(), MatchConfig::default());
    assert!(row.winning_seat().unwrap().is_none());
    assert!(row.ended_at().is_none());
}

#[test]
fn test_duplicate_match_id_fails() {
    let (_db, repo) = setup_test_db();
    new_match(&repo, "m-1");
    let row = NewMatchRow::new("m-1".into(), "{}".into(), "a".into(), "b".into());
    let again = repo.create_match(row);
    assert!(again.is_err(), "Duplicate id should fail");
}

#[test]
fn test_get_match_not_found() {
    let (_db, repo) = setup_test_db();
    assert!(repo.get_match("nope").expect("Query failed").is_none());
}

#[test]
fn test_moves_ignore_repeats_and_come_back_ordered() {
    let (_db, repo) = setup_test_db();
    new_match(&repo, "m-1");

    let records = [
        MoveRecord::new(2, 1, Coord::new(3, 3), Side::Black),
        MoveRecord::new(1, 2, Coord::new(8, 8), Side::White),
        MoveRecord::new(1, 1, Coord::new(7, 7), Side::Black),
    ];
    for record in &records {
        let player = if record.side == Side::Black { "alice" } else { "bob" };
        assert!(repo.record_move(NewMoveRow::from_record("m-1", player, record, false)).unwrap());
    }
    let repeat = NewMoveRow::from_record("m-1", "alice", &records[2], false);
    assert!(!repo.record_move(repeat).unwrap(), "Repeat should be ignored");

    let rows = repo.moves_for("m-1").expect("Query failed");
    let loaded: Vec<MoveRecord> = rows.iter().map(|r| r.to_record().unwrap()).collect();
    assert_eq!(loaded, vec![records[2], records[1], records[0]]);
    assert_eq!(rows[1].player_user_id(), "bob");
}

#[test]
fn test_games_record_once() {
    let (_db, repo) = setup_test_db();
    new_match(&repo, "m-1");

    let win = NewGameRow::new("m-1", 1, Outcome::Winner(Side::White), EndReason::Timeout, 12);
    assert!(repo.record_game(win.clone()).unwrap());
    assert!(!repo.record_game(win).unwrap());
    assert!(repo
        .record_game(NewGameRow::new("m-1", 2, Outcome::Draw, EndReason::BoardFull, 225))
        .unwrap());

    let games = repo.games_for("m-1").expect("Query failed");
    assert_eq!(games.len(), 2);
    assert_eq!(games[0].outcome().unwrap(), Outcome::Winner(Side::White));
    assert_eq!(games[0].end_reason().unwrap(), EndReason::Timeout);
    assert_eq!(games[1].outcome().unwrap(), Outcome::Draw);
}

#[test]
fn test_opening_stored_per_game() {
    let (_db, repo) = setup_test_db();
    new_match(&repo, "m-1");
    let pending = OpeningRecord::new(1, true, None);
    let chosen = OpeningRecord::new(1, true, Some(ColorAssignment::with(Seat::First, Side::White)));
    let second = OpeningRecord::new(2, false, Some(ColorAssignment::standard()));
    for record in [pending, chosen, second] {
        let row = NewOpeningRow::from_record("m-1", &record).expect("Row builds");
        repo.record_opening(row).expect("Upsert failed");
    }

    let rows = repo.openings_for("m-1").expect("Query failed");
    let loaded: Vec<OpeningRecord> = rows.iter().map(|r| r.to_record().unwrap()).collect();
    assert_eq!(loaded, vec![chosen, second]);
}

#[test]
fn test_finish_match() {
    let (_db, repo) = setup_test_db();
    new_match(&repo, "m-1");
    repo.finish_match(
        "m-1",
        &MatchFinish::new(Seat::First, "alice".into(), EndReason::Line, 31),
    )
    .expect("Finish failed");

    let row = repo.get_match("m-1").unwrap().unwrap();
    assert_eq!(row.parse_status().unwrap(), MatchStatus::Finished);
    assert_eq!(row.winner().as_deref(), Some("first"));
    assert_eq!(row.winning_seat().unwrap(), Some(Seat::First));
    assert_eq!(row.winner_user_id().as_deref(), Some("alice"));
    assert_eq!(*row.total_moves(), 31);
    assert!(row.ended_at().is_some());
}

#[test]
fn test_list_matches_and_reopen() {
    let (db, repo) = setup_test_db();
    new_match(&repo, "m-1");
    new_match(&repo, "m-2");
    assert_eq!(repo.list_matches().unwrap().len(), 2);

    let path = db.path().to_str().unwrap().to_string();
    let reopened = MatchRepository::open(path).expect("Reopen failed");
    assert_eq!(reopened.list_matches().unwrap().len(), 2);
}
