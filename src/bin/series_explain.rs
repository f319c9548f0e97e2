//!
//! series_explain
//! --------------
//! Resolves a series definition against the built-in category templates (plus
//! any catalog given with `--templates`) and prints the plan as JSON: the
//! effective aggregation method, the aggregator and the columns each series
//! reads. With start/end text it also prints the resolved query window.

use std::env;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use perfseries::groups::StaticGroupMembership;
use perfseries::ident::{Database, Id};
use perfseries::registry::{DataProviderRegistry, SharedTemplateRegistry, TemplateRegistry};
use perfseries::series::{SERIES_SEPARATOR, TOKEN_SEPARATOR};
use perfseries::{DataSourceConfig, SeriesQuery};

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} <definition> [<start> <end>] [--database <DBID>] [--changeset <id>]... [--templates <file.json>] [--config <file.json>] [--alias <a_b_...>]\n\nExamples:\n  {program} \"MAX~ABCD-EFGH.1~Interval.WebRequest~maxDuration\"\n  {program} \"ABCD-EFGH.1~ABCD-EFGH.2~JVM~heapMemUsedPercent\" \"now-60\" \"now\"\n  {program} \"ABCD-EFGH.1~Interval.Sql~avgSQLDuration\" 2015-04-26 \"2015-04-26{{+1D}}\" --changeset 0002.0\n\nIf --database is omitted the database of the first identifier is used."
    );
}

/// Database id of the first well-formed identifier in the definition.
fn infer_database(definition: &str) -> Option<String> {
    definition
        .split(SERIES_SEPARATOR)
        .flat_map(|clause| clause.split(TOKEN_SEPARATOR))
        .find_map(|token| Id::parse(token.trim()).ok())
        .map(|id| id.database_id().to_string())
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("log filter")?;
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let mut args: Vec<String> = env::args().collect();
    let program = args.remove(0);

    let mut positional: Vec<String> = Vec::new();
    let mut database: Option<String> = None;
    let mut changesets: Vec<String> = Vec::new();
    let mut templates: Option<String> = None;
    let mut config_path: Option<String> = None;
    let mut alias: Option<String> = None;

    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        let value = args.get(i + 1).cloned();
        let take = |slot: &mut Option<String>| -> Result<()> {
            *slot = Some(value.clone().ok_or_else(|| anyhow!("{} requires a value", flag))?);
            Ok(())
        };
        match flag {
            "--database" => { take(&mut database)?; i += 2; }
            "--templates" => { take(&mut templates)?; i += 2; }
            "--config" => { take(&mut config_path)?; i += 2; }
            "--alias" => { take(&mut alias)?; i += 2; }
            "--changeset" => {
                changesets.push(value.clone().ok_or_else(|| anyhow!("--changeset requires a value"))?);
                i += 2;
            }
            "-h" | "--help" => {
                print_usage(&program);
                return Ok(());
            }
            other if other.starts_with("--") => {
                eprintln!("Unrecognized argument: {}", other);
                print_usage(&program);
                std::process::exit(2);
            }
            other => { positional.push(other.to_string()); i += 1; }
        }
    }

    let (definition, window) = match positional.as_slice() {
        [d] => (d.clone(), None),
        [d, s, e] => (d.clone(), Some((s.clone(), e.clone()))),
        _ => {
            print_usage(&program);
            std::process::exit(2);
        }
    };

    let mut registry = TemplateRegistry::with_builtin_templates()?;
    if let Some(path) = &templates {
        let n = registry.load_json_file(Path::new(path))?;
        info!(target: "perfseries", "loaded {} templates from {}", n, path);
    }
    let config = match &config_path {
        Some(p) => DataSourceConfig::from_path(Path::new(p))?,
        None => DataSourceConfig::default(),
    }
    .apply_env()?;

    let db_id = database
        .or_else(|| infer_database(&definition))
        .ok_or_else(|| anyhow!("cannot determine database; pass --database"))?;
    let mut db = Database::new(db_id).with_changesets(changesets);
    if let Some(schema) = &config.schema {
        db = db.with_schema(schema.clone());
    }

    let providers = DataProviderRegistry::new(SharedTemplateRegistry::new(registry));
    let groups = StaticGroupMembership::new();
    let query = SeriesQuery::new(&providers, &db, &groups, &config);

    let plan = query.plan(&definition, alias.as_deref())?;
    let window = match window {
        Some((s, e)) => Some(query.window(&s, &e)?),
        None => None,
    };
    let out = serde_json::json!({
        "database": db.id(),
        "schema_prefix": db.schema_prefix(),
        "max_points_per_series": config.max_points_per_series,
        "series": plan,
        "window": window,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
