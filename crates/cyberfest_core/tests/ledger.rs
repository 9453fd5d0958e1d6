use cyberfest_core::db::open_db_in_memory;
use cyberfest_core::{
    ClaimConfig, ClaimService, LedgerService, LedgerServiceError, LedgerWatch, ProblemStatementFilter,
    ProblemStatementId, ProblemStatementRequest, ProblemStatementUpdate, RecordStore,
    SqliteClaimRepository, SqliteProblemStatementRepository, SqliteTeamRepository, TeamKey,
    TeamService, ValidationError,
};
use rusqlite::Connection;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn ledger(
    conn: &Connection,
) -> LedgerService<SqliteProblemStatementRepository<'_>, SqliteTeamRepository<'_>> {
    LedgerService::new(
        SqliteProblemStatementRepository::try_new(conn).unwrap(),
        SqliteTeamRepository::try_new(conn).unwrap(),
        3,
    )
}

fn request(id: &str, title: &str, category: Option<&str>) -> ProblemStatementRequest {
    ProblemStatementRequest {
        id: id.to_string(),
        title: title.to_string(),
        category: category.map(str::to_string),
        ..ProblemStatementRequest::default()
    }
}

fn claim(conn: &Connection, team: &str, id: &str) {
    let key = TeamKey::from_display_name(team).unwrap();
    let id = ProblemStatementId::parse(id).unwrap();
    ClaimService::new(
        SqliteClaimRepository::try_new(conn).unwrap(),
        ClaimConfig::default(),
    )
    .claim(&key, &id)
    .unwrap();
}

fn issue(conn: &Connection, names: &[&str]) {
    let service = TeamService::new(SqliteTeamRepository::try_new(conn).unwrap());
    for name in names {
        service.issue_credentials(name, "pw").unwrap();
    }
}

#[test]
fn create_applies_default_capacity_and_normalizes_text() {
    let conn = open_db_in_memory().unwrap();
    let created = ledger(&conn)
        .create_problem_statement(&ProblemStatementRequest {
            id: " ps-1 ".to_string(),
            title: "  Phishing triage ".to_string(),
            description: Some("   ".to_string()),
            category: Some(" Email ".to_string()),
            capacity: None,
        })
        .unwrap();

    assert_eq!(created.id.as_str(), "ps-1");
    assert_eq!(created.title, "Phishing triage");
    assert_eq!(created.description, None);
    assert_eq!(created.category.as_deref(), Some("Email"));
    assert_eq!(created.capacity, 3);
    assert_eq!(created.claim_count, 0);
}

#[test]
fn create_rejects_invalid_and_duplicate_ids() {
    let conn = open_db_in_memory().unwrap();
    let ledger = ledger(&conn);
    ledger
        .create_problem_statement(&request("ps-1", "First", None))
        .unwrap();

    assert!(matches!(
        ledger.create_problem_statement(&request("ps-1", "Again", None)),
        Err(LedgerServiceError::ProblemStatementIdTaken(_))
    ));
    assert!(matches!(
        ledger.create_problem_statement(&request("ps 2", "Bad id", None)),
        Err(LedgerServiceError::Validation(
            ValidationError::InvalidProblemStatementId(_)
        ))
    ));
    assert!(matches!(
        ledger.create_problem_statement(&ProblemStatementRequest {
            capacity: Some(0),
            ..request("ps-3", "Zero", None)
        }),
        Err(LedgerServiceError::Validation(ValidationError::ZeroCapacity))
    ));
}

#[test]
fn listing_is_ordered_and_reports_availability() {
    let conn = open_db_in_memory().unwrap();
    issue(&conn, &["Alpha"]);
    let ledger = ledger(&conn);
    ledger
        .create_problem_statement(&request("ps-2", "Second", None))
        .unwrap();
    ledger
        .create_problem_statement(&ProblemStatementRequest {
            capacity: Some(1),
            ..request("ps-1", "First", None)
        })
        .unwrap();
    claim(&conn, "Alpha", "ps-1");

    let summaries = ledger.list_problem_statements().unwrap();
    let ids: Vec<&str> = summaries.iter().map(|summary| summary.id.as_str()).collect();
    assert_eq!(ids, vec!["ps-1", "ps-2"]);
    assert_eq!(summaries[0].claim_count, 1);
    assert!(!summaries[0].has_availability);
    assert!(summaries[1].has_availability);
}

#[test]
fn search_filters_by_text_and_availability() {
    let conn = open_db_in_memory().unwrap();
    issue(&conn, &["Alpha"]);
    let ledger = ledger(&conn);
    ledger
        .create_problem_statement(&ProblemStatementRequest {
            capacity: Some(1),
            ..request("ps-1", "Memory forensics", Some("Forensics"))
        })
        .unwrap();
    ledger
        .create_problem_statement(&request("ps-2", "Disk carving", Some("Forensics")))
        .unwrap();
    ledger
        .create_problem_statement(&request("ps-3", "Phishing triage", Some("Email")))
        .unwrap();
    claim(&conn, "Alpha", "ps-1");

    let forensics = ledger
        .search_problem_statements(&ProblemStatementFilter {
            query: Some("forensics".to_string()),
            only_available: false,
        })
        .unwrap();
    assert_eq!(forensics.len(), 2);

    let open_forensics = ledger
        .search_problem_statements(&ProblemStatementFilter {
            query: Some("FORENSICS".to_string()),
            only_available: true,
        })
        .unwrap();
    assert_eq!(open_forensics.len(), 1);
    assert_eq!(open_forensics[0].id.as_str(), "ps-2");
}

#[test]
fn update_mirrors_title_into_team_selection() {
    let conn = open_db_in_memory().unwrap();
    issue(&conn, &["Alpha"]);
    let ledger = ledger(&conn);
    ledger
        .create_problem_statement(&request("ps-1", "Old title", None))
        .unwrap();
    claim(&conn, "Alpha", "ps-1");

    let id = ProblemStatementId::parse("ps-1").unwrap();
    let updated = ledger
        .update_problem_statement(
            &id,
            &ProblemStatementUpdate {
                title: Some("New title".to_string()),
                category: Some(Some("Web".to_string())),
                ..ProblemStatementUpdate::default()
            },
        )
        .unwrap();
    assert_eq!(updated.title, "New title");
    assert_eq!(updated.category.as_deref(), Some("Web"));
    assert_eq!(updated.claim_count, 1);

    let team = ledger
        .get_team(&TeamKey::parse("alpha").unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(
        team.selected_problem_statement_title.as_deref(),
        Some("New title")
    );
}

#[test]
fn update_rejects_capacity_below_claims() {
    let conn = open_db_in_memory().unwrap();
    issue(&conn, &["Alpha", "Beta"]);
    let ledger = ledger(&conn);
    ledger
        .create_problem_statement(&request("ps-1", "Title", None))
        .unwrap();
    claim(&conn, "Alpha", "ps-1");
    claim(&conn, "Beta", "ps-1");

    let id = ProblemStatementId::parse("ps-1").unwrap();
    let err = ledger
        .update_problem_statement(
            &id,
            &ProblemStatementUpdate {
                capacity: Some(1),
                ..ProblemStatementUpdate::default()
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerServiceError::CapacityBelowClaims {
            capacity: 1,
            claim_count: 2,
            ..
        }
    ));

    let shrunk = ledger
        .update_problem_statement(
            &id,
            &ProblemStatementUpdate {
                capacity: Some(2),
                ..ProblemStatementUpdate::default()
            },
        )
        .unwrap();
    assert!(!shrunk.has_availability());
}

#[test]
fn empty_update_returns_current_record() {
    let conn = open_db_in_memory().unwrap();
    let ledger = ledger(&conn);
    let created = ledger
        .create_problem_statement(&request("ps-1", "Title", None))
        .unwrap();
    let same = ledger
        .update_problem_statement(&created.id, &ProblemStatementUpdate::default())
        .unwrap();
    assert_eq!(same, created);

    let missing = ProblemStatementId::parse("ps-9").unwrap();
    assert!(matches!(
        ledger.update_problem_statement(&missing, &ProblemStatementUpdate::default()),
        Err(LedgerServiceError::ProblemStatementNotFound(_))
    ));
}

#[test]
fn delete_is_rejected_while_claims_exist() {
    let conn = open_db_in_memory().unwrap();
    issue(&conn, &["Alpha"]);
    let ledger = ledger(&conn);
    ledger
        .create_problem_statement(&request("ps-1", "Claimed", None))
        .unwrap();
    ledger
        .create_problem_statement(&request("ps-2", "Unclaimed", None))
        .unwrap();
    claim(&conn, "Alpha", "ps-1");

    let claimed = ProblemStatementId::parse("ps-1").unwrap();
    assert!(matches!(
        ledger.delete_problem_statement(&claimed),
        Err(LedgerServiceError::HasClaims(_))
    ));

    let unclaimed = ProblemStatementId::parse("ps-2").unwrap();
    ledger.delete_problem_statement(&unclaimed).unwrap();
    assert!(matches!(
        ledger.get_problem_statement(&unclaimed),
        Err(LedgerServiceError::ProblemStatementNotFound(_))
    ));
}

#[test]
fn team_listing_exposes_selection_without_credentials() {
    let conn = open_db_in_memory().unwrap();
    issue(&conn, &["Beta", "Alpha"]);
    let ledger = ledger(&conn);
    ledger
        .create_problem_statement(&request("ps-1", "Title", None))
        .unwrap();
    claim(&conn, "Beta", "ps-1");

    let teams = ledger.list_teams().unwrap();
    let keys: Vec<&str> = teams.iter().map(|team| team.key.as_str()).collect();
    assert_eq!(keys, vec!["alpha", "beta"]);
    assert_eq!(teams[0].selected_problem_statement_id, None);
    assert_eq!(
        teams[1]
            .selected_problem_statement_id
            .as_ref()
            .map(ProblemStatementId::as_str),
        Some("ps-1")
    );

    let json = serde_json::to_string(&teams).unwrap();
    assert!(!json.contains("salt"));
    assert!(!json.contains("hash"));
    assert!(ledger
        .get_team(&TeamKey::parse("ghost").unwrap())
        .unwrap()
        .is_none());
}

#[test]
fn watch_reports_only_external_commits() {
    let dir = tempfile::tempdir().unwrap();
    let store = RecordStore::open(dir.path().join("watch.sqlite3"), Duration::from_secs(5)).unwrap();
    let writer = store.connect().unwrap();
    issue(&writer, &["Alpha"]);
    ledger(&writer)
        .create_problem_statement(&request("ps-1", "Title", None))
        .unwrap();

    let watch_conn = store.connect().unwrap();
    let mut watch = LedgerWatch::try_new(&watch_conn).unwrap();

    let first = watch.poll().unwrap().expect("first poll returns a snapshot");
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].claim_count, 0);
    assert!(watch.poll().unwrap().is_none());

    claim(&writer, "Alpha", "ps-1");
    let changed = watch.poll().unwrap().expect("external commit is reported");
    assert_eq!(changed[0].claim_count, 1);
    assert!(watch.poll().unwrap().is_none());
}

#[test]
fn reads_stay_consistent_while_claims_and_resets_commit() {
    let dir = tempfile::tempdir().unwrap();
    let store =
        RecordStore::open(dir.path().join("snapshot.sqlite3"), Duration::from_secs(5)).unwrap();
    {
        let conn = store.connect().unwrap();
        issue(&conn, &["Alpha"]);
        ledger(&conn)
            .create_problem_statement(&request("ps-1", "Title", None))
            .unwrap();
    }

    let done = Arc::new(AtomicBool::new(false));
    let writer = {
        let store = store.clone();
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let conn = store.connect().unwrap();
            let claims = ClaimService::new(
                SqliteClaimRepository::try_new(&conn).unwrap(),
                ClaimConfig::default(),
            );
            let key = TeamKey::parse("alpha").unwrap();
            let id = ProblemStatementId::parse("ps-1").unwrap();
            for _ in 0..300 {
                claims.claim(&key, &id).unwrap();
                claims.reset_claims(&id).unwrap();
            }
            done.store(true, Ordering::SeqCst);
        })
    };

    let conn = store.connect().unwrap();
    let ledger = ledger(&conn);
    let id = ProblemStatementId::parse("ps-1").unwrap();
    let mut reads = 0;
    while !done.load(Ordering::SeqCst) || reads == 0 {
        let statement = ledger.get_problem_statement(&id).unwrap();
        assert_eq!(statement.claim_count as usize, statement.claimants.len());
        let listed = ledger.list_problem_statements().unwrap();
        assert!(listed[0].claim_count <= 1);
        reads += 1;
    }
    writer.join().unwrap();
    assert!(reads > 0);
}
