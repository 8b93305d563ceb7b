//! End-to-end tests against a live PostgreSQL database.
//!
//! Set TEST_DATABASE_URL (or DATABASE_URL) to run these; they create and
//! drop their own schema. The configured role must be allowed to create
//! schemas in the target database.

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use pganon_core::{ColumnConfig, Config, DatabaseConfig, JsonPathConfig, Registry};
use pganon_engine::{Anonymizer, CancelFlag, RunOptions};

fn database_url() -> Result<String> {
    std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .context("set TEST_DATABASE_URL or DATABASE_URL for integration tests")
}

async fn pool() -> Result<PgPool> {
    let url = database_url()?;
    PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .context("connecting to Postgres")
}

/// Database config pointing at the same server the fixtures run on.
fn database_config() -> Result<DatabaseConfig> {
    let url = database_url()?;
    let parsed = url::Url::parse(&url).context("parsing database url")?;
    Ok(DatabaseConfig {
        host: parsed.host_str().map(str::to_string),
        port: parsed.port(),
        database: Some(parsed.path().trim_start_matches('/').to_string()),
        user: (!parsed.username().is_empty()).then(|| parsed.username().to_string()),
        password: parsed.password().map(str::to_string),
        sslmode: Some("disable".to_string()),
        ..DatabaseConfig::default()
    })
}

async fn reset_schema(pool: &PgPool, ddl: &str) -> Result<()> {
    sqlx::query("DROP SCHEMA IF EXISTS anontest CASCADE")
        .execute(pool)
        .await?;
    sqlx::query("CREATE SCHEMA anontest").execute(pool).await?;
    for statement in ddl.split(';') {
        let sql = statement.trim();
        if sql.is_empty() {
            continue;
        }
        sqlx::query(sql)
            .execute(pool)
            .await
            .with_context(|| format!("fixture statement: {sql}"))?;
    }
    Ok(())
}

fn scalar(column: &str, pattern: &str) -> ColumnConfig {
    ColumnConfig {
        column: column.to_string(),
        pattern: Some(pattern.to_string()),
        json_paths: Vec::new(),
    }
}

fn config(columns: Vec<ColumnConfig>) -> Result<Config> {
    Ok(Config {
        database: database_config()?,
        patterns: Default::default(),
        columns,
    })
}

async fn run(columns: Vec<ColumnConfig>) -> Result<pganon_core::RunStats> {
    let anonymizer = Anonymizer::new(config(columns)?, &Registry::new(), RunOptions::default())?;
    anonymizer
        .run(&CancelFlag::new())
        .await
        .context("anonymization run")
}

async fn text_values(pool: &PgPool, sql: &str) -> Result<Vec<Option<String>>> {
    let rows = sqlx::query(sql).fetch_all(pool).await?;
    Ok(rows
        .into_iter()
        .map(|row| row.try_get::<Option<String>, _>(0))
        .collect::<std::result::Result<_, _>>()?)
}

#[tokio::test]
async fn shared_mapping_across_columns() -> Result<()> {
    // The same original in two configured columns maps identically.
    let pool = pool().await?;
    reset_schema(
        &pool,
        r#"
        CREATE TABLE anontest.users (id int PRIMARY KEY, email text);
        CREATE TABLE anontest.events (id int PRIMARY KEY, actor_email text);
        INSERT INTO anontest.users VALUES (1, 'john.smith@x.com');
        INSERT INTO anontest.events VALUES (1, 'john.smith@x.com');
        "#,
    )
    .await?;

    run(vec![
        scalar("anontest.users.email", "EMAIL"),
        scalar("anontest.events.actor_email", "EMAIL"),
    ])
    .await?;

    let users = text_values(&pool, "SELECT email FROM anontest.users").await?;
    let events = text_values(&pool, "SELECT actor_email FROM anontest.events").await?;

    let user_email = users[0].clone().unwrap();
    let event_email = events[0].clone().unwrap();
    assert_eq!(user_email, event_email, "same original must map identically");
    assert_ne!(user_email, "john.smith@x.com");
    assert_eq!(user_email.matches('@').count(), 1);
    assert!(!user_email.starts_with('@'), "local part must be non-empty");
    Ok(())
}

#[tokio::test]
async fn cascade_target_is_skipped_but_follows_parent() -> Result<()> {
    // The child column is never processed directly; the database cascade
    // keeps it equal to the parent's new value.
    let pool = pool().await?;
    reset_schema(
        &pool,
        r#"
        CREATE TABLE anontest.parents (name text PRIMARY KEY);
        CREATE TABLE anontest.children (
            id int PRIMARY KEY,
            parent_name text REFERENCES anontest.parents(name) ON UPDATE CASCADE
        );
        INSERT INTO anontest.parents VALUES ('Alice');
        INSERT INTO anontest.children VALUES (1, 'Alice');
        "#,
    )
    .await?;

    run(vec![
        scalar("anontest.parents.name", "PERSON_NAME"),
        scalar("anontest.children.parent_name", "PERSON_NAME"),
    ])
    .await?;

    let parent = text_values(&pool, "SELECT name FROM anontest.parents").await?[0]
        .clone()
        .unwrap();
    let child = text_values(&pool, "SELECT parent_name FROM anontest.children").await?[0]
        .clone()
        .unwrap();

    assert_ne!(parent, "Alice");
    assert_eq!(parent, child, "cascade must propagate the new parent value");
    Ok(())
}

#[tokio::test]
async fn unique_column_collisions_get_suffixes() -> Result<()> {
    // EMAIL embeds an input hash, so force a collision through the
    // dictionary instead: both values distinct, outputs must stay distinct
    // under the unique constraint.
    let pool = pool().await?;
    reset_schema(
        &pool,
        r#"
        CREATE TABLE anontest.accounts (id int PRIMARY KEY, email text UNIQUE);
        INSERT INTO anontest.accounts VALUES (1, 'a@x.com'), (2, 'b@x.com');
        "#,
    )
    .await?;

    run(vec![scalar("anontest.accounts.email", "EMAIL")]).await?;

    let emails: Vec<String> = text_values(&pool, "SELECT email FROM anontest.accounts")
        .await?
        .into_iter()
        .flatten()
        .collect();
    assert_eq!(emails.len(), 2);
    assert_ne!(emails[0], emails[1], "unique constraint must survive");
    for email in &emails {
        assert_eq!(email.matches('@').count(), 1);
    }
    Ok(())
}

#[tokio::test]
async fn nulls_are_preserved_and_counted_out() -> Result<()> {
    // 10 rows, 3 NULL. Only the 7 non-null rows are touched.
    let pool = pool().await?;
    reset_schema(
        &pool,
        r#"
        CREATE TABLE anontest.people (id int PRIMARY KEY, phone text);
        INSERT INTO anontest.people
        SELECT i, CASE WHEN i <= 7 THEN '202-555-01' || lpad(i::text, 2, '0') END
        FROM generate_series(1, 10) AS i;
        "#,
    )
    .await?;

    let stats = run(vec![scalar("anontest.people.phone", "US_PHONE")]).await?;

    assert_eq!(stats.total_rows, 7);
    assert_eq!(stats.total_anonymized, 7);

    let null_count = sqlx::query("SELECT COUNT(*) FROM anontest.people WHERE phone IS NULL")
        .fetch_one(&pool)
        .await?
        .try_get::<i64, _>(0)?;
    assert_eq!(null_count, 3, "NULL rows must stay NULL");
    Ok(())
}

#[tokio::test]
async fn json_wildcard_rewrites_all_matches() -> Result<()> {
    // Both array elements rewritten, structure and siblings untouched.
    let pool = pool().await?;
    reset_schema(
        &pool,
        r#"
        CREATE TABLE anontest.profiles (id int PRIMARY KEY, profile jsonb);
        INSERT INTO anontest.profiles VALUES
            (1, '{"contacts":[{"email":"a@x.com","kind":1},{"email":"b@x.com","kind":2}],"plan":"pro"}');
        "#,
    )
    .await?;

    run(vec![ColumnConfig {
        column: "anontest.profiles.profile".to_string(),
        pattern: None,
        json_paths: vec![JsonPathConfig {
            path: "$.contacts[*].email".to_string(),
            pattern: "EMAIL".to_string(),
        }],
    }])
    .await?;

    let raw = text_values(&pool, "SELECT profile::text FROM anontest.profiles").await?[0]
        .clone()
        .unwrap();
    let doc: serde_json::Value = serde_json::from_str(&raw)?;

    let contacts = doc["contacts"].as_array().context("contacts array")?;
    assert_eq!(contacts.len(), 2);
    for (i, contact) in contacts.iter().enumerate() {
        let email = contact["email"].as_str().context("email string")?;
        assert!(email.contains('@'));
        assert!(!email.ends_with("@x.com"), "original domain must be gone");
        assert_eq!(contact["kind"], serde_json::json!(i as i64 + 1));
    }
    assert_eq!(doc["plan"], "pro");
    Ok(())
}

#[tokio::test]
async fn failed_column_rolls_back_everything() -> Result<()> {
    // One column succeeds, then the next column's batch update fails (the
    // generated text cannot fit varchar(2)). Nothing may survive the
    // rollback.
    let pool = pool().await?;
    reset_schema(
        &pool,
        r#"
        CREATE TABLE anontest.ok_col (id int PRIMARY KEY, name text);
        CREATE TABLE anontest.bad_col (id int PRIMARY KEY, code varchar(2));
        INSERT INTO anontest.ok_col VALUES (1, 'Alice');
        INSERT INTO anontest.bad_col VALUES (1, 'ab');
        "#,
    )
    .await?;

    // LOREMIPSUM yields text far longer than varchar(2).
    let outcome = run(vec![
        scalar("anontest.ok_col.name", "PERSON_NAME"),
        scalar("anontest.bad_col.code", "LOREMIPSUM"),
    ])
    .await;
    assert!(outcome.is_err(), "oversized value must fail the run");

    let name = text_values(&pool, "SELECT name FROM anontest.ok_col").await?[0]
        .clone()
        .unwrap();
    let code = text_values(&pool, "SELECT code FROM anontest.bad_col").await?[0]
        .clone()
        .unwrap();
    assert_eq!(name, "Alice", "successful column must also roll back");
    assert_eq!(code, "ab");
    Ok(())
}
