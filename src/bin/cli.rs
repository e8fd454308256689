//! LedgerDB - CLI Client

use std::env;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context};
use rust_decimal::Decimal;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing_subscriber::EnvFilter;

use ledgerdb::ledger::{EventType, FinancialEvent, LedgerSet};
use ledgerdb::storage::Tuple;
use ledgerdb::{Database, DatabaseConfig};

const HISTORY_FILE: &str = ".ledgerdb_history";

/// Print welcome banner
fn print_banner(db: &Database) {
    println!(
        r#"
 LedgerDB - an embedded relational engine with verifiable ledgers
 Database '{}' ({} tables)
 Type '.help' for help, '.quit' to exit
"#,
        db.name(),
        db.list_tables().len()
    );
}

/// Print help message
fn print_help() {
    println!(
        r#"
Commands:
  .help                        Show this help message
  .quit                        Exit LedgerDB
  .tables                      List all tables
  .schema [table]              Show table schema
  .ledger list                 List ledgers
  .ledger append <ledger> <type> <tx> <account> <amount> <currency> [counterparty]
                               Append a completed financial event
  .ledger verify [ledger]      Verify hash chains
  .ledger trail <ledger> <id>  Entries for a transaction or account
  .ledger balance <ledger> <account>
                               Replay completed events into balances

SQL Commands:
  CREATE TABLE ...   Create a new table
  DROP TABLE ...     Drop tables
  SHOW TABLES        List tables
  INSERT INTO ...    Insert rows
  SELECT ...         Query data, optionally with one JOIN
  UPDATE ...         Update rows
  DELETE FROM ...    Delete rows
  BEGIN / COMMIT / ROLLBACK

Examples:
  CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, email TEXT UNIQUE);
  INSERT INTO users VALUES (1, 'Alice', 'alice@example.com');
  SELECT * FROM users WHERE id = 1;
"#
    );
}

/// Format query results as a table
fn format_results(columns: &[String], rows: &[Tuple]) -> String {
    if columns.is_empty() && rows.is_empty() {
        return String::new();
    }

    // Calculate column widths
    let mut widths: Vec<usize> = columns.iter().map(|c| c.len()).collect();
    for row in rows {
        for (i, value) in row.values().iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(value.to_string().len());
            }
        }
    }

    let separator: String = widths
        .iter()
        .map(|w| "-".repeat(*w + 2))
        .collect::<Vec<_>>()
        .join("+");
    let separator = format!("+{}+\n", separator);

    let mut output = String::new();
    output.push_str(&separator);
    let header: String = columns
        .iter()
        .zip(&widths)
        .map(|(c, w)| format!(" {:^width$} ", c, width = *w))
        .collect::<Vec<_>>()
        .join("|");
    output.push_str(&format!("|{}|\n", header));
    output.push_str(&separator);

    for row in rows {
        let row_str: String = row
            .values()
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!(" {:>width$} ", v.to_string(), width = *w))
            .collect::<Vec<_>>()
            .join("|");
        output.push_str(&format!("|{}|\n", row_str));
    }

    if !rows.is_empty() {
        output.push_str(&separator);
    }
    output.push_str(&format!("{} row(s) returned\n", rows.len()));
    output
}

/// Execute a SQL statement
fn execute_sql(sql: &str, db: &mut Database) {
    let sql = sql.trim();
    if sql.is_empty() {
        return;
    }

    match db.execute(sql) {
        Ok(result) => {
            if !result.columns.is_empty() {
                print!("{}", format_results(&result.columns, &result.rows));
            } else if let Some(msg) = result.message {
                println!("{}", msg);
            } else if result.affected_rows > 0 {
                println!("{} row(s) affected", result.affected_rows);
            }
        }
        Err(e) => eprintln!("Error: {}", e),
    }
}

/// Handle special dot commands; returns false on `.quit`
fn handle_special_command(cmd: &str, db: &Database, ledgers: &LedgerSet) -> bool {
    let parts: Vec<&str> = cmd.split_whitespace().collect();

    match parts.first().copied() {
        Some(".help") => print_help(),
        Some(".quit") | Some(".exit") => return false,
        Some(".tables") => {
            let tables = db.list_tables();
            if tables.is_empty() {
                println!("No tables found.");
            } else {
                println!("Tables:");
                for table in tables {
                    println!("  {}", table);
                }
            }
        }
        Some(".schema") => {
            let names = match parts.get(1) {
                Some(name) => vec![name.to_string()],
                None => db.list_tables(),
            };
            for name in names {
                match db.catalog().get_table_info(&name) {
                    Ok(info) => println!("{}", info),
                    Err(e) => eprintln!("Error: {}", e),
                }
            }
        }
        Some(".ledger") => {
            if let Err(e) = handle_ledger_command(&parts[1..], ledgers) {
                eprintln!("Error: {:#}", e);
            }
        }
        Some(cmd) => {
            eprintln!("Unknown command: {}", cmd);
            eprintln!("Type '.help' for available commands.");
        }
        None => {}
    }
    true
}

fn handle_ledger_command(args: &[&str], ledgers: &LedgerSet) -> anyhow::Result<()> {
    match args {
        ["list"] | [] => {
            for name in ledgers.list() {
                println!("  {}", name);
            }
        }
        ["append", rest @ ..] => {
            let (ledger, event) = parse_append(rest)?;
            let entry = ledgers.get_or_create(ledger)?.append(event)?;
            println!("Entry {} appended ({})", entry.sequence_index, entry.hash);
        }
        ["verify", names @ ..] => {
            let reports = ledgers.verify_all();
            for (name, report) in reports {
                if !names.is_empty() && !names.contains(&name.as_str()) {
                    continue;
                }
                match report.first_invalid_index {
                    None => println!("{}: valid ({} entries)", name, report.entries_checked),
                    Some(index) => println!(
                        "{}: INVALID at entry {} ({})",
                        name,
                        index,
                        report.reason.unwrap_or_default()
                    ),
                }
            }
        }
        ["trail", ledger, id] => {
            let ledger = ledgers
                .get(ledger)
                .ok_or_else(|| anyhow!("no ledger named '{}'", ledger))?;
            for entry in ledger.entries_for(id) {
                let event = &entry.payload;
                println!(
                    "{:>4}  {}  {:<10} {} {} {} -> {}  [{}]",
                    entry.sequence_index,
                    entry.timestamp.to_rfc3339(),
                    event.event_type,
                    event.amount,
                    event.currency,
                    event.account_id,
                    event.counterparty_account_id.as_deref().unwrap_or("-"),
                    event.status
                );
            }
        }
        ["balance", ledger, account] => {
            let ledger = ledgers
                .get(ledger)
                .ok_or_else(|| anyhow!("no ledger named '{}'", ledger))?;
            let balances = ledger.balance_for(account);
            if balances.is_empty() {
                println!("No completed events for '{}'", account);
            }
            for (currency, amount) in balances {
                println!("  {} {}", amount, currency);
            }
        }
        _ => bail!("usage: see .help"),
    }
    Ok(())
}

const APPEND_USAGE: &str =
    "usage: .ledger append <ledger> <type> <tx> <account> <amount> <currency> [counterparty]";

/// Parse `.ledger append` arguments into the target ledger and its event
fn parse_append<'a>(args: &[&'a str]) -> anyhow::Result<(&'a str, FinancialEvent)> {
    let (ledger, event_type, tx, account, amount, currency, counterparty) = match args {
        [ledger, event_type, tx, account, amount, currency] => {
            (*ledger, *event_type, *tx, *account, *amount, *currency, None)
        }
        [ledger, event_type, tx, account, amount, currency, counterparty] => (
            *ledger,
            *event_type,
            *tx,
            *account,
            *amount,
            *currency,
            Some(*counterparty),
        ),
        _ => bail!(APPEND_USAGE),
    };

    let event_type = EventType::from_name(event_type)
        .ok_or_else(|| anyhow!("unknown event type '{}'", event_type))?;
    let amount =
        Decimal::from_str(amount).with_context(|| format!("invalid amount '{}'", amount))?;

    let mut event = FinancialEvent::new(event_type, tx, account, amount, currency);
    if let Some(counterparty) = counterparty {
        event = event.counterparty(counterparty);
    }
    Ok((ledger, event))
}

/// Command line options
fn parse_args() -> anyhow::Result<(DatabaseConfig, bool)> {
    let mut config = DatabaseConfig::from_env()?;
    let mut in_memory = false;

    let args: Vec<String> = env::args().skip(1).collect();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--data-dir" | "-d" => {
                let dir = iter.next().context("--data-dir needs a value")?;
                config = config.data_dir(dir);
            }
            "--name" | "-n" => {
                let name = iter.next().context("--name needs a value")?;
                config = config.name(name.as_str());
            }
            "--no-sync" => config = config.sync(false),
            "--in-memory" => in_memory = true,
            other => bail!("unknown argument '{}'", other),
        }
    }
    Ok((config, in_memory))
}

/// Main REPL loop
fn run_repl(db: &mut Database, ledgers: &LedgerSet) -> anyhow::Result<()> {
    let mut editor = DefaultEditor::new()?;
    let _ = editor.load_history(HISTORY_FILE);

    print_banner(db);

    let mut input_buffer = String::new();
    loop {
        let prompt = if input_buffer.is_empty() {
            "ledgerdb> "
        } else {
            "     ...> "
        };

        let line = match editor.readline(prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                input_buffer.clear();
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let trimmed = line.trim();

        if input_buffer.is_empty() && trimmed.starts_with('.') {
            let _ = editor.add_history_entry(trimmed);
            if !handle_special_command(trimmed, db, ledgers) {
                break;
            }
            continue;
        }

        // An empty line ends a multi-line statement
        if trimmed.is_empty() {
            if !input_buffer.is_empty() {
                let sql = std::mem::take(&mut input_buffer);
                execute_sql(&sql, db);
            }
            continue;
        }

        if !input_buffer.is_empty() {
            input_buffer.push(' ');
        }
        input_buffer.push_str(trimmed);

        if trimmed.ends_with(';') {
            let sql = std::mem::take(&mut input_buffer);
            let _ = editor.add_history_entry(sql.as_str());
            execute_sql(&sql, db);
        }
    }

    let _ = editor.save_history(HISTORY_FILE);
    if db.in_transaction() {
        println!("Open transaction discarded.");
    }
    println!("Goodbye!");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let (config, in_memory) = parse_args()?;
    let (mut db, ledgers) = if in_memory {
        (Database::in_memory(config.name.clone()), LedgerSet::in_memory())
    } else {
        let db = Database::open(&config)
            .with_context(|| format!("failed to open database '{}'", config.name))?;
        (db, LedgerSet::for_database(&config)?)
    };

    run_repl(&mut db, &ledgers)
}
