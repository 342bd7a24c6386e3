use sqlx::AnyPool;

pub async fn migrate(pool: &AnyPool) -> anyhow::Result<()> {
    // Leads
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS leads (
  lead_id TEXT PRIMARY KEY,
  name TEXT,
  email TEXT,
  phone TEXT,
  address TEXT,
  service_category TEXT,
  service TEXT,
  city TEXT,
  amount TEXT,
  pincode TEXT,
  source_file TEXT NOT NULL,
  created_at TEXT NOT NULL
);
"#,
    )
    .execute(pool)
    .await?;

    // Subscribers. Plan and count are nullable: absent means `none` / 0.
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS subscribers (
  user_id TEXT PRIMARY KEY,
  active_plan TEXT,
  current_lead_count BIGINT CHECK (current_lead_count IS NULL OR current_lead_count >= 0)
);
"#,
    )
    .execute(pool)
    .await?;

    // Categories each subscriber services
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS subscriber_categories (
  user_id TEXT NOT NULL,
  service_category TEXT NOT NULL,
  PRIMARY KEY (user_id, service_category)
);
"#,
    )
    .execute(pool)
    .await?;

    // Lead links
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS lead_links (
  lead_id TEXT NOT NULL,
  user_id TEXT NOT NULL,
  status TEXT NOT NULL CHECK (status IN ('locked', 'unlocked')),
  service_category TEXT NOT NULL,
  PRIMARY KEY (lead_id, user_id)
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
CREATE INDEX IF NOT EXISTS idx_subscriber_categories_category
ON subscriber_categories(service_category);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(r#"CREATE INDEX IF NOT EXISTS idx_lead_links_user ON lead_links(user_id);"#)
        .execute(pool)
        .await?;

    Ok(())
}
