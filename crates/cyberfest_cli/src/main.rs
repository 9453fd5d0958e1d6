//! Operator CLI for the CyberFest claim desk.
//!
//! # Responsibility
//! - Wire config, logging and the record store for one-shot commands.
//! - Print claim rejections as short user messages and exit non-zero.

use clap::{Parser, Subcommand};
use cyberfest_core::{
    core_version, init_logging_from_config, AppConfig, ClaimService, LedgerService, LedgerWatch,
    ProblemStatementFilter, ProblemStatementId, ProblemStatementRequest, ProblemStatementUpdate,
    RecordStore, SqliteClaimRepository, SqliteProblemStatementRepository, SqliteTeamRepository,
    TeamKey, TeamService,
};
use log::warn;
use rusqlite::Connection;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "cyberfest", version, about = "CyberFest problem statement claim desk")]
struct Cli {
    /// JSON config file; every field is optional.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Overrides `db_path` from the config.
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Overrides `log_dir` from the config. Must be absolute.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Creates or migrates the database file.
    Init,
    IssueTeam {
        #[arg(long)]
        name: String,
        #[arg(long)]
        password: String,
    },
    AddStatement {
        #[arg(long)]
        id: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// Defaults to `claim.default_capacity`.
        #[arg(long)]
        capacity: Option<u32>,
    },
    UpdateStatement {
        #[arg(long)]
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        capacity: Option<u32>,
    },
    DeleteStatement {
        #[arg(long)]
        id: String,
    },
    ListStatements {
        #[arg(long)]
        available_only: bool,
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        json: bool,
    },
    ListTeams {
        #[arg(long)]
        json: bool,
    },
    /// Authenticates a team and claims a problem statement for it.
    Claim {
        #[arg(long)]
        team: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        statement: String,
    },
    /// Clears every claim on one problem statement.
    Reset {
        #[arg(long)]
        statement: String,
    },
    /// Clears one team's selection.
    ReleaseTeam {
        #[arg(long)]
        team: String,
    },
    /// Prints the problem statement listing whenever it changes.
    Watch {
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let mut config = AppConfig::load_or_default(cli.config.as_deref()).map_err(|e| e.to_string())?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(log_dir) = cli.log_dir {
        config.log_dir = Some(log_dir);
    }
    config.validate().map_err(|e| e.to_string())?;
    if let Err(err) = init_logging_from_config(&config) {
        eprintln!("logging disabled: {err}");
    }

    let store = RecordStore::open(&config.db_path, config.claim.busy_timeout())
        .map_err(|e| e.to_string())?;
    let conn = store.connect().map_err(|e| e.to_string())?;

    match cli.cmd {
        Command::Init => {
            println!(
                "cyberfest_core {} database ready at {}",
                core_version(),
                store.path().display()
            );
            Ok(())
        }
        Command::IssueTeam { name, password } => {
            let teams = team_service(&conn)?;
            let team = teams
                .issue_credentials(&name, &password)
                .map_err(|e| e.to_string())?;
            println!("issued team `{}` with key `{}`", team.display_name, team.key);
            Ok(())
        }
        Command::AddStatement {
            id,
            title,
            description,
            category,
            capacity,
        } => {
            let created = ledger_service(&conn, &config)?
                .create_problem_statement(&ProblemStatementRequest {
                    id,
                    title,
                    description,
                    category,
                    capacity,
                })
                .map_err(|e| e.to_string())?;
            println!(
                "added {} `{}` (capacity {})",
                created.id, created.title, created.capacity
            );
            Ok(())
        }
        Command::UpdateStatement {
            id,
            title,
            description,
            category,
            capacity,
        } => {
            let id = parse_statement_id(&id)?;
            let update = ProblemStatementUpdate {
                title,
                description: description.map(Some),
                category: category.map(Some),
                capacity,
            };
            let updated = ledger_service(&conn, &config)?
                .update_problem_statement(&id, &update)
                .map_err(|e| e.to_string())?;
            println!(
                "updated {} `{}` ({}/{})",
                updated.id, updated.title, updated.claim_count, updated.capacity
            );
            Ok(())
        }
        Command::DeleteStatement { id } => {
            let id = parse_statement_id(&id)?;
            ledger_service(&conn, &config)?
                .delete_problem_statement(&id)
                .map_err(|e| e.to_string())?;
            println!("deleted {id}");
            Ok(())
        }
        Command::ListStatements {
            available_only,
            query,
            json,
        } => {
            let filter = ProblemStatementFilter {
                query,
                only_available: available_only,
            };
            let summaries = ledger_service(&conn, &config)?
                .search_problem_statements(&filter)
                .map_err(|e| e.to_string())?;
            if json {
                let text = serde_json::to_string_pretty(&summaries).map_err(|e| e.to_string())?;
                println!("{text}");
            } else {
                for summary in summaries {
                    println!(
                        "{:<12} {:>2}/{:<2} {:<5} {}",
                        summary.id.as_str(),
                        summary.claim_count,
                        summary.capacity,
                        if summary.has_availability { "open" } else { "full" },
                        summary.title
                    );
                }
            }
            Ok(())
        }
        Command::ListTeams { json } => {
            let teams = ledger_service(&conn, &config)?
                .list_teams()
                .map_err(|e| e.to_string())?;
            if json {
                let text = serde_json::to_string_pretty(&teams).map_err(|e| e.to_string())?;
                println!("{text}");
            } else {
                for team in teams {
                    println!(
                        "{:<24} {:<12} {}",
                        team.key.as_str(),
                        team.selected_problem_statement_id
                            .as_ref()
                            .map_or("-", ProblemStatementId::as_str),
                        team.display_name
                    );
                }
            }
            Ok(())
        }
        Command::Claim {
            team,
            password,
            statement,
        } => {
            let id = parse_statement_id(&statement)?;
            let teams = team_service(&conn)?;
            let claims = claim_service(&conn, &config)?;
            match claims.claim_as(&teams, &team, &password, &id) {
                Ok(outcome) if outcome.newly_claimed => {
                    println!(
                        "claimed {} `{}` ({}/{})",
                        outcome.problem_statement_id,
                        outcome.title,
                        outcome.claim_count,
                        outcome.capacity
                    );
                    Ok(())
                }
                Ok(outcome) => {
                    println!(
                        "already holding {} `{}`",
                        outcome.problem_statement_id, outcome.title
                    );
                    Ok(())
                }
                Err(err) => {
                    warn!("event=cli_claim module=cli status=rejected error_code={}", err.code());
                    Err(err.user_message().to_string())
                }
            }
        }
        Command::Reset { statement } => {
            let id = parse_statement_id(&statement)?;
            let outcome = claim_service(&conn, &config)?
                .reset_claims(&id)
                .map_err(|e| e.to_string())?;
            println!(
                "reset {} (released {} team(s))",
                outcome.problem_statement_id,
                outcome.released_teams.len()
            );
            Ok(())
        }
        Command::ReleaseTeam { team } => {
            let key = TeamKey::from_display_name(&team).map_err(|e| e.to_string())?;
            let outcome = claim_service(&conn, &config)?
                .release_team(&key)
                .map_err(|e| e.to_string())?;
            match outcome.released_from {
                Some(id) => println!("released {} from {id}", outcome.team_key),
                None => println!("{} held no problem statement", outcome.team_key),
            }
            Ok(())
        }
        Command::Watch { interval_ms } => {
            let mut watch = LedgerWatch::try_new(&conn).map_err(|e| e.to_string())?;
            loop {
                if let Some(snapshot) = watch.poll().map_err(|e| e.to_string())? {
                    let text = serde_json::to_string(&snapshot).map_err(|e| e.to_string())?;
                    println!("{text}");
                }
                std::thread::sleep(Duration::from_millis(interval_ms));
            }
        }
    }
}

fn parse_statement_id(value: &str) -> Result<ProblemStatementId, String> {
    ProblemStatementId::parse(value).map_err(|e| e.to_string())
}

fn team_service(conn: &Connection) -> Result<TeamService<SqliteTeamRepository<'_>>, String> {
    let repo = SqliteTeamRepository::try_new(conn).map_err(|e| e.to_string())?;
    Ok(TeamService::new(repo))
}

fn claim_service<'conn>(
    conn: &'conn Connection,
    config: &AppConfig,
) -> Result<ClaimService<SqliteClaimRepository<'conn>>, String> {
    let repo = SqliteClaimRepository::try_new(conn).map_err(|e| e.to_string())?;
    Ok(ClaimService::new(repo, config.claim.clone()))
}

fn ledger_service<'conn>(
    conn: &'conn Connection,
    config: &AppConfig,
) -> Result<
    LedgerService<SqliteProblemStatementRepository<'conn>, SqliteTeamRepository<'conn>>,
    String,
> {
    let statements = SqliteProblemStatementRepository::try_new(conn).map_err(|e| e.to_string())?;
    let teams = SqliteTeamRepository::try_new(conn).map_err(|e| e.to_string())?;
    Ok(LedgerService::new(
        statements,
        teams,
        config.claim.default_capacity,
    ))
}
