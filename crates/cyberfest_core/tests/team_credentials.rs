use cyberfest_core::db::open_db_in_memory;
use cyberfest_core::{
    verify_password, SqliteTeamRepository, TeamKey, TeamRepository, TeamService, TeamServiceError,
    ValidationError,
};

#[test]
fn issued_credentials_verify_exact_password_only() {
    let conn = open_db_in_memory().unwrap();
    let service = TeamService::new(SqliteTeamRepository::try_new(&conn).unwrap());

    let summary = service
        .issue_credentials("Null Pointers", "hunter2")
        .unwrap();
    assert_eq!(summary.key.as_str(), "null-pointers");
    assert_eq!(summary.display_name, "Null Pointers");
    assert!(summary.selected_problem_statement_id.is_none());

    let repo = SqliteTeamRepository::try_new(&conn).unwrap();
    let stored = repo.get_team(&summary.key).unwrap().unwrap();
    assert_eq!(stored.password_salt.len(), 32);
    assert_eq!(stored.password_hash.len(), 64);
    assert!(verify_password("hunter2", &stored.password_salt, &stored.password_hash).unwrap());
    assert!(!verify_password("hunter3", &stored.password_salt, &stored.password_hash).unwrap());
}

#[test]
fn same_password_gets_distinct_salts() {
    let conn = open_db_in_memory().unwrap();
    let service = TeamService::new(SqliteTeamRepository::try_new(&conn).unwrap());
    service.issue_credentials("Alpha", "shared").unwrap();
    service.issue_credentials("Beta", "shared").unwrap();

    let repo = SqliteTeamRepository::try_new(&conn).unwrap();
    let alpha = repo.get_team(&TeamKey::parse("alpha").unwrap()).unwrap().unwrap();
    let beta = repo.get_team(&TeamKey::parse("beta").unwrap()).unwrap().unwrap();
    assert_ne!(alpha.password_salt, beta.password_salt);
    assert_ne!(alpha.password_hash, beta.password_hash);
    assert!(!verify_password("shared", &alpha.password_salt, &beta.password_hash).unwrap());
}

#[test]
fn colliding_display_names_are_rejected_without_overwrite() {
    let conn = open_db_in_memory().unwrap();
    let service = TeamService::new(SqliteTeamRepository::try_new(&conn).unwrap());
    service.issue_credentials("Red Team", "first").unwrap();

    let err = service.issue_credentials("red team!", "second").unwrap_err();
    assert!(matches!(err, TeamServiceError::TeamKeyTaken(ref key) if key.as_str() == "red-team"));

    service
        .authenticate("Red Team", "first")
        .expect("original credential must survive");
    assert!(matches!(
        service.authenticate("Red Team", "second"),
        Err(TeamServiceError::CredentialInvalid)
    ));
}

#[test]
fn authenticate_accepts_display_name_or_key() {
    let conn = open_db_in_memory().unwrap();
    let service = TeamService::new(SqliteTeamRepository::try_new(&conn).unwrap());
    service.issue_credentials("Byte Me", "pw").unwrap();

    assert_eq!(
        service.authenticate("  BYTE   me ", "pw").unwrap().key.as_str(),
        "byte-me"
    );
    assert_eq!(service.authenticate("byte-me", "pw").unwrap().display_name, "Byte Me");
}

#[test]
fn authenticate_reports_unknown_team() {
    let conn = open_db_in_memory().unwrap();
    let service = TeamService::new(SqliteTeamRepository::try_new(&conn).unwrap());
    assert!(matches!(
        service.authenticate("Ghosts", "pw"),
        Err(TeamServiceError::TeamNotFound(ref key)) if key.as_str() == "ghosts"
    ));
}

#[test]
fn malformed_stored_salt_is_credential_invalid() {
    let conn = open_db_in_memory().unwrap();
    let service = TeamService::new(SqliteTeamRepository::try_new(&conn).unwrap());
    service.issue_credentials("Alpha", "pw").unwrap();
    conn.execute(
        "UPDATE teams SET password_salt = 'not-hex' WHERE team_key = 'alpha';",
        [],
    )
    .unwrap();

    assert!(matches!(
        service.authenticate("Alpha", "pw"),
        Err(TeamServiceError::CredentialInvalid)
    ));
}

#[test]
fn issue_rejects_blank_names_and_empty_passwords() {
    let conn = open_db_in_memory().unwrap();
    let service = TeamService::new(SqliteTeamRepository::try_new(&conn).unwrap());

    assert!(matches!(
        service.issue_credentials("   ", "pw"),
        Err(TeamServiceError::InvalidName(ValidationError::EmptyDisplayName))
    ));
    assert!(matches!(
        service.issue_credentials("???", "pw"),
        Err(TeamServiceError::InvalidName(ValidationError::UnusableTeamName(_)))
    ));
    assert!(matches!(
        service.issue_credentials("Alpha", ""),
        Err(TeamServiceError::Credential(_))
    ));

    let repo = SqliteTeamRepository::try_new(&conn).unwrap();
    assert!(repo.list_teams().unwrap().is_empty());
}
