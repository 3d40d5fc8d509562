//! qail-lens — inspect and rewrite T-SQL from the command line
//!
//! # Usage
//!
//! ```bash
//! # Which databases does a query touch?
//! qail-lens databases "SELECT * FROM [Sales].[dbo].[Orders]"
//!
//! # Read the SQL from stdin, print JSON
//! cat report.sql | qail-lens analyze --format json
//!
//! # Page-count variant of a query
//! qail-lens count "SELECT Id, Name FROM Users WHERE Active = 1"
//! ```

use std::io::Read;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use qail_lens::prelude::*;
use serde::Serialize;

#[derive(Parser)]
#[command(name = "qail-lens")]
#[command(author = "QAIL Contributors")]
#[command(version = "0.1.0")]
#[command(about = "🔍 Extract structure from T-SQL and rewrite SELECT statements", long_about = None)]
#[command(after_help = "EXAMPLES:
    qail-lens columns 'SELECT u.Name, COUNT(*) AS Total FROM Users u GROUP BY u.Name'
    qail-lens top 25 'SELECT * FROM Orders ORDER BY Id'
    qail-lens order 'Email DESC' < query.sql")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    format: OutputFormat,

    /// Time budget per pattern evaluation, in milliseconds
    #[arg(long, env = "QAIL_LENS_BUDGET_MS", global = true)]
    budget_ms: Option<u64>,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List referenced database names
    Databases {
        /// SQL text (read from stdin when omitted)
        sql: Option<String>,
    },
    /// Show the first table after FROM/JOIN
    Table { sql: Option<String> },
    /// Resolve the SELECT list
    Columns { sql: Option<String> },
    /// List simple WHERE predicates
    Conditions { sql: Option<String> },
    /// Show the ORDER BY list
    OrderBy { sql: Option<String> },
    /// Everything above in one report
    Analyze { sql: Option<String> },
    /// Rewrite into SELECT COUNT(*)
    Count { sql: Option<String> },
    /// Rewrite with TOP n
    Top {
        /// Row limit
        n: i64,
        sql: Option<String>,
    },
    /// Rewrite with SELECT DISTINCT
    Distinct { sql: Option<String> },
    /// Replace the ORDER BY clause
    Order {
        /// New ordering, e.g. "Name ASC, Id DESC"
        clause: String,
        sql: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "qail_lens=debug" } else { "qail_lens=warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let mut config = LensConfig::load().context("Failed to load lens configuration")?;
    if let Some(ms) = cli.budget_ms {
        if ms == 0 {
            return Err(LensError::Input("--budget-ms must be greater than zero".to_string()).into());
        }
        config.match_budget_ms = ms;
    }
    let lens = Lens::from_config(&config);
    tracing::debug!(budget_ms = config.match_budget_ms, "lens ready");

    let format = cli.format;
    match &cli.command {
        Commands::Databases { sql } => {
            let names = lens.extract_database_names(&read_sql(sql)?);
            print_list("Databases", &names, format)
        }
        Commands::Table { sql } => {
            let table = lens.extract_first_table_name(&read_sql(sql)?);
            print_single("Table", table.as_deref(), format)
        }
        Commands::Columns { sql } => {
            let columns = lens.extract_column_details(&read_sql(sql)?);
            print_rows(&columns, format, &["database", "table", "column", "alias"], column_row)
        }
        Commands::Conditions { sql } => {
            let conditions = lens.extract_where_conditions(&read_sql(sql)?);
            print_rows(&conditions, format, &["column", "operator", "value"], condition_row)
        }
        Commands::OrderBy { sql } => {
            let order = lens.extract_order_by_clause(&read_sql(sql)?);
            print_single("ORDER BY", order.as_deref(), format)
        }
        Commands::Analyze { sql } => {
            let analysis = lens
                .analyze(&read_sql(sql)?)
                .ok_or_else(|| LensError::Input("analyze needs a SELECT statement".to_string()))?;
            print_analysis(&analysis, format)
        }
        Commands::Count { sql } => {
            let rewritten = lens.to_count(&read_sql(sql)?);
            print_rewrite("count", rewritten, format)
        }
        Commands::Top { n, sql } => {
            if *n <= 0 {
                return Err(LensError::Input(format!("TOP needs a positive row count, got {}", n)).into());
            }
            let rewritten = lens.to_top(&read_sql(sql)?, *n);
            print_rewrite("top", rewritten, format)
        }
        Commands::Distinct { sql } => {
            let rewritten = lens.to_distinct(&read_sql(sql)?);
            print_rewrite("distinct", rewritten, format)
        }
        Commands::Order { clause, sql } => {
            if clause.trim().is_empty() {
                return Err(LensError::Input("ORDER BY clause is blank".to_string()).into());
            }
            let rewritten = lens.to_order_by(&read_sql(sql)?, clause);
            print_rewrite("order", rewritten, format)
        }
    }
}

/// The SQL argument, or all of stdin when it was omitted.
fn read_sql(arg: &Option<String>) -> Result<String> {
    let sql = match arg {
        Some(sql) => sql.clone(),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(LensError::from)
                .context("Failed to read SQL from stdin")?;
            buf
        }
    };
    if sql.trim().is_empty() {
        return Err(LensError::Input("no SQL given; pass it as an argument or on stdin".to_string()).into());
    }
    Ok(sql)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_list(title: &str, items: &[String], format: OutputFormat) -> Result<()> {
    if let OutputFormat::Json = format {
        return print_json(items);
    }
    if items.is_empty() {
        println!("{}", "(none)".dimmed());
        return Ok(());
    }
    println!("{}", format!("{}:", title).green().bold());
    for item in items {
        println!("  • {}", item.white());
    }
    Ok(())
}

fn print_single(title: &str, value: Option<&str>, format: OutputFormat) -> Result<()> {
    if let OutputFormat::Json = format {
        return print_json(&value);
    }
    match value {
        Some(v) => println!("{} {}", format!("{}:", title).green().bold(), v.white()),
        None => println!("{}", "(none)".dimmed()),
    }
    Ok(())
}

fn print_rewrite(operation: &'static str, rewritten: Option<String>, format: OutputFormat) -> Result<()> {
    let sql = rewritten.ok_or_else(|| LensError::not_applicable(operation))?;
    if let OutputFormat::Json = format {
        return print_json(&sql);
    }
    println!("{}", "Rewritten SQL:".green().bold());
    println!("{}", sql.white());
    Ok(())
}

fn column_row(col: &ColumnReference) -> Vec<String> {
    vec![
        col.database_name.clone().unwrap_or_default(),
        col.table_name.clone().unwrap_or_default(),
        col.column.name.clone(),
        col.column.alias.clone().unwrap_or_default(),
    ]
}

fn condition_row(cond: &WhereCondition) -> Vec<String> {
    vec![cond.column.name.clone(), cond.operator.to_string(), cond.value.clone()]
}

fn print_rows<T: Serialize>(
    items: &[T],
    format: OutputFormat,
    headers: &[&str],
    row: fn(&T) -> Vec<String>,
) -> Result<()> {
    if let OutputFormat::Json = format {
        return print_json(items);
    }
    if items.is_empty() {
        println!("{}", "(no results)".dimmed());
        return Ok(());
    }

    let rows: Vec<Vec<String>> = items.iter().map(row).collect();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for cells in &rows {
        for (w, cell) in widths.iter_mut().zip(cells) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let header: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(h, w)| format!("{:width$}", h, width = *w))
        .collect();
    println!("{}", header.join(" │ ").white().bold());

    let sep: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
    println!("{}", sep.join("─┼─").dimmed());

    for cells in &rows {
        let line: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:width$}", c, width = *w))
            .collect();
        println!("{}", line.join(" │ "));
    }

    println!();
    println!("{} row(s)", rows.len().to_string().cyan());
    Ok(())
}

fn print_analysis(analysis: &QueryAnalysis, format: OutputFormat) -> Result<()> {
    if let OutputFormat::Json = format {
        return print_json(analysis);
    }

    println!("{}", "🔍 Query Analysis".cyan().bold());
    println!();
    let none = || "(none)".dimmed().to_string();

    let databases = if analysis.databases.is_empty() {
        none()
    } else {
        analysis.databases.join(", ").white().to_string()
    };
    println!("  {} {}", "Databases:".dimmed(), databases);
    println!(
        "  {} {}",
        "Table:".dimmed(),
        analysis.table.as_deref().map_or_else(none, |t| t.white().to_string())
    );

    let modifiers = &analysis.modifiers;
    let mut flags = Vec::new();
    if modifiers.distinct {
        flags.push("DISTINCT".to_string());
    }
    if modifiers.all {
        flags.push("ALL".to_string());
    }
    if let Some(top) = &modifiers.top {
        flags.push(top.clone());
    }
    if !flags.is_empty() {
        println!("  {} {}", "Modifiers:".dimmed(), flags.join(" ").yellow());
    }

    if !analysis.columns.is_empty() {
        println!("  {}", "Columns:".dimmed());
        for col in &analysis.columns {
            let qualifier: Vec<&str> = [col.database_name.as_deref(), col.table_name.as_deref()]
                .into_iter()
                .flatten()
                .collect();
            let mut line = if qualifier.is_empty() {
                col.column.name.white().to_string()
            } else {
                format!("{}.{}", qualifier.join(".").dimmed(), col.column.name.white())
            };
            if let Some(alias) = &col.column.alias {
                line.push_str(&format!(" {} {}", "as".dimmed(), alias.cyan()));
            }
            println!("    • {}", line);
        }
    }

    if !analysis.conditions.is_empty() {
        println!("  {}", "Conditions:".dimmed());
        for cond in &analysis.conditions {
            println!(
                "    {} {} {}",
                cond.column.name.white(),
                cond.operator.to_string().cyan(),
                cond.value.yellow()
            );
        }
    }

    if let Some(order) = &analysis.order_by {
        println!("  {} {}", "Order by:".dimmed(), order.white());
    }
    if let Some(page) = &analysis.pagination {
        println!("  {} {}", "Pagination:".dimmed(), page.white());
    }
    Ok(())
}
