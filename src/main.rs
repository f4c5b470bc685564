//! askdb - ask a relational database questions in natural language.
//!
//! Interactive entry point: reads questions from stdin, runs them through
//! the safety and execution pipeline, and prints paginated results.

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use askdb::audit::{AuditFilter, AuditLog};
use askdb::cli::Cli;
use askdb::config::Config;
use askdb::exec::{MockQueryService, QueryService, RemoteQueryService, RemoteServiceConfig};
use askdb::llm::{MockSqlGenerator, OpenAiGenerator, SqlGenerator};
use askdb::paginate::Page;
use askdb::pipeline::{Pipeline, TurnResponse};
use askdb::safety::Validator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    if cli.log_file {
        askdb::logging::init_file_logging();
    } else {
        askdb::logging::init_stderr_logging();
    }

    let mut config = Config::load_from_file(&cli.config_path())?;
    config.apply_env_overrides();
    if let Some(ref endpoint) = cli.query_service {
        config.query_service.endpoint = endpoint.clone();
    }
    if let Some(page_size) = cli.page_size {
        config.pipeline.page_size = page_size;
    }
    config.validate()?;

    let generator: Arc<dyn SqlGenerator> = if cli.mock {
        Arc::new(MockSqlGenerator::new())
    } else {
        Arc::new(OpenAiGenerator::from_env().context("LLM setup failed")?)
    };

    let service: Arc<dyn QueryService> = if cli.mock {
        Arc::new(MockQueryService::with_numbered_rows(45))
    } else {
        Arc::new(RemoteQueryService::new(
            RemoteServiceConfig::new(&config.query_service.endpoint)
                .with_timeout(config.pipeline.query_timeout_secs),
        )?)
    };

    let audit_path = match cli.audit_db {
        Some(ref path) => path.clone(),
        None => AuditLog::default_path()?,
    };
    let audit = Arc::new(AuditLog::open(&audit_path).await?);

    let pipeline = Pipeline::new(generator, service, audit)
        .with_validator(Validator::new(config.pipeline.sensitive_columns.clone()))
        .with_page_size(config.pipeline.page_size)
        .with_query_timeout(Duration::from_secs(config.pipeline.query_timeout_secs));

    run_repl(&pipeline, &cli.session).await
}

/// Reads questions and commands from stdin until EOF or `quit`.
async fn run_repl(pipeline: &Pipeline, session_id: &str) -> anyhow::Result<()> {
    println!("askdb - type a question, 'next' for the next page, 'audit' for recent entries, 'quit' to exit.");

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();

        match input {
            "" => continue,
            "quit" | "exit" => break,
            "next" => match pipeline.next_page(session_id).await {
                Ok(page) if page.is_empty() => println!("No more rows."),
                Ok(page) => print_page(&page),
                Err(e) => println!("{e}"),
            },
            "audit" => {
                let filter = AuditFilter {
                    limit: Some(10),
                    ..Default::default()
                };
                match pipeline.audit().list(&filter).await {
                    Ok(entries) => {
                        for entry in entries {
                            println!(
                                "{} [{}] {} ({} rows, {} ms)",
                                entry.created_at,
                                entry.outcome,
                                entry.sql,
                                entry.row_count,
                                entry.execution_time_ms
                            );
                        }
                    }
                    Err(e) => println!("{e}"),
                }
            }
            question => match pipeline.ask(question, session_id).await {
                Ok(TurnResponse::Page { sql, page }) => {
                    println!("SQL: {sql}");
                    print_page(&page);
                }
                Ok(TurnResponse::Rejected { sql, reason }) => {
                    println!("Refused: {}", reason.user_message());
                    println!("Candidate SQL was: {sql}");
                }
                Ok(TurnResponse::Failed { error, .. }) => {
                    println!("Execution failed: {error}");
                }
                Err(e) => println!("{}: {e}", e.category()),
            },
        }
    }

    pipeline.end_session(session_id);
    Ok(())
}

/// Prints a page as a simple text table.
fn print_page(page: &Page) {
    if page.is_empty() {
        println!("(no rows)");
        return;
    }

    let header: Vec<&str> = page.columns.iter().map(|c| c.name.as_str()).collect();
    let header = header.join(" | ");
    println!("{header}");
    println!("{}", "-".repeat(header.len()));

    for row in &page.rows {
        let cells: Vec<String> = row.iter().map(|v| v.to_display_string()).collect();
        println!("{}", cells.join(" | "));
    }

    if page.has_more {
        println!("... more rows available, type 'next'");
    }
}
