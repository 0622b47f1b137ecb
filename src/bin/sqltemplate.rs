// ABOUTME: Command-line tool for rendering and running SQL templates against configured connections
// ABOUTME: Prints rendered SQL with flattened parameters, query rows as JSON, or affected row counts
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 sqltemplate contributors

//! Usage:
//! ```bash
//! # Render a template and show the parameters it would bind
//! sqltemplate --template-dir ./sql render reports/activity.sql --context '{"since": "2025-01-01"}'
//!
//! # Render an inline template
//! sqltemplate render --inline 'SELECT * FROM users WHERE id = %(id)s' --context '{"id": 7}'
//!
//! # Run a query and print rows as column mappings
//! sqltemplate --database-url sqlite:./data/app.db query reports/activity.sql
//!
//! # Run on another alias and print the single value
//! SQLTEMPLATE_DATABASES=reporting=sqlite:./data/reporting.db \
//!   sqltemplate query --using reporting --format scalar --inline 'SELECT count(*) FROM users'
//!
//! # Run a statement and print the affected row count
//! sqltemplate exec --inline 'DELETE FROM sessions WHERE expired = 1'
//! ```

use std::path::PathBuf;

use anyhow::{anyhow, Context as _, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::json;
use sqltemplate::config::{DatabaseUrl, SqlTemplateConfig};
use sqltemplate::constants::DEFAULT_CONNECTION_ALIAS;
use sqltemplate::logging::LoggingConfig;
use sqltemplate::{Context, SqlTemplate, TemplateQuery};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "sqltemplate",
    version,
    about = "Render and run SQL templates",
    long_about = "Render SQL templates with a JSON context, show the parameters they bind, and run them against the connections configured in the environment."
)]
struct CliArgs {
    #[command(subcommand)]
    command: Command,

    /// URL of the default connection (overrides DATABASE_URL)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Template directory, searched before SQLTEMPLATE_DIRS (repeatable)
    #[arg(long, global = true)]
    template_dir: Vec<PathBuf>,

    /// Application directory whose sqltemplates/ subdirectory holds templates (repeatable)
    #[arg(long, global = true)]
    app_dir: Vec<PathBuf>,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Print rendered SQL and the flattened parameters as JSON
    Render(TemplateArgs),

    /// Run a query and print its rows as JSON
    Query {
        #[command(flatten)]
        template: TemplateArgs,

        /// Connection alias
        #[arg(long)]
        using: Option<String>,

        /// Row shape
        #[arg(long, value_enum, default_value_t = OutputFormat::Values)]
        format: OutputFormat,
    },

    /// Run a statement and print the number of affected rows
    Exec {
        #[command(flatten)]
        template: TemplateArgs,

        /// Connection alias
        #[arg(long)]
        using: Option<String>,
    },
}

#[derive(Args)]
struct TemplateArgs {
    /// Template name, looked up in the template directories
    #[arg(required_unless_present = "inline", conflicts_with = "inline")]
    name: Option<String>,

    /// Template source given on the command line
    #[arg(long)]
    inline: Option<String>,

    /// Context as a JSON object
    #[arg(long, default_value = "{}")]
    context: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Rows as column mappings
    Values,
    /// Rows as value lists
    ValuesList,
    /// First column of the only row
    Scalar,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    let mut logging = LoggingConfig::from_env();
    if args.verbose {
        logging = logging.with_level("debug");
    }
    logging.init()?;

    let config = load_config(&args)?;
    let service = SqlTemplate::from_config(&config).await?;

    match args.command {
        Command::Render(template) => {
            let query = build_query(&service, &template, None)?;
            let output = json!({
                "sql": query.sql()?,
                "params": query.query_params(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Command::Query {
            template,
            using,
            format,
        } => {
            let query = build_query(&service, &template, using.as_deref())?;
            let output = match format {
                OutputFormat::Values => serde_json::to_value(query.values()?.into_rows().await?)?,
                OutputFormat::ValuesList => {
                    serde_json::to_value(query.values_list()?.into_rows().await?)?
                }
                OutputFormat::Scalar => serde_json::to_value(query.scalar().await?)?,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Command::Exec { template, using } => {
            let query = build_query(&service, &template, using.as_deref())?;
            let affected = query.execute_update().await?;
            info!(affected, "Statement executed");
            println!("{affected}");
        }
    }

    service.connections().close_all().await;
    Ok(())
}

fn load_config(args: &CliArgs) -> Result<SqlTemplateConfig> {
    let mut config = SqlTemplateConfig::from_env()?;

    if let Some(url) = &args.database_url {
        config
            .database
            .connections
            .insert(DEFAULT_CONNECTION_ALIAS.to_owned(), DatabaseUrl::parse_url(url)?);
    }

    let mut dirs = args.template_dir.clone();
    dirs.append(&mut config.templates.dirs);
    config.templates.dirs = dirs;
    config.templates.app_dirs.extend(args.app_dir.iter().cloned());

    Ok(config)
}

fn build_query(
    service: &SqlTemplate,
    template: &TemplateArgs,
    using: Option<&str>,
) -> Result<TemplateQuery> {
    let json: serde_json::Value =
        serde_json::from_str(&template.context).context("--context is not valid JSON")?;
    let context = Context::from_json(json)?;

    let query = match (&template.inline, &template.name) {
        (Some(source), _) => service.query_from_string(source, context)?,
        (None, Some(name)) => service.get(name, context)?,
        (None, None) => return Err(anyhow!("a template name or --inline is required")),
    };
    Ok(match using {
        Some(alias) => query.using(alias),
        None => query,
    })
}
