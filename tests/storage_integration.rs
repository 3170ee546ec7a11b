use std::env;
use std::sync::Arc;

use rust_leads_api::executor::{QueryExecutor, RetryPolicy, SqlValue};
use rust_leads_api::leads::{LeadFunnelService, LeadStep};
use sqlx::Row;

/// Integration smoke tests against a real MySQL instance.
/// Marked ignored to avoid running against production by accident; set
/// TEST_DATABASE_URL to run.
async fn executor_from_env() -> anyhow::Result<QueryExecutor> {
    let db_url = env::var("TEST_DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("Set TEST_DATABASE_URL to run this test"))?;

    let pool = sqlx::mysql::MySqlPoolOptions::new()
        .max_connections(2)
        .connect(&db_url)
        .await?;
    Ok(QueryExecutor::new(pool, RetryPolicy::default()))
}

#[tokio::test]
#[ignore]
async fn executor_binds_parameters_round_trip() -> anyhow::Result<()> {
    let executor = executor_from_env().await?;

    let rows = executor
        .fetch_all("SELECT ? AS answer", &[SqlValue::Int(42)])
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    assert_eq!(rows.len(), 1);
    let answer: i64 = rows[0].try_get("answer")?;
    assert_eq!(answer, 42);
    Ok(())
}

#[tokio::test]
#[ignore]
async fn step_one_then_finalize_smoke_test() -> anyhow::Result<()> {
    let executor = Arc::new(executor_from_env().await?);
    let service = LeadFunnelService::new(Arc::clone(&executor));

    // Unique natural key per run to avoid collisions on repeated runs.
    let pancard = format!(
        "ZZ{:04}T",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)?
            .subsec_millis()
    );

    let step = LeadStep::from_request(
        1,
        &serde_json::json!({ "mobile": "+91 98765-43210", "utm_source": "web" }),
    )
    .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    service
        .save_lead_by_step(step, &pancard)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    // Finalizing straight after step 1 must succeed with empty derived
    // name parts, and a second finalize must not duplicate the records.
    for _ in 0..2 {
        let step = LeadStep::from_request(6, &serde_json::json!({}))
            .map_err(|e| anyhow::anyhow!(e.to_string()))?;
        service
            .save_lead_by_step(step, &pancard)
            .await
            .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    }

    let rows = executor
        .fetch_all(
            "SELECT c.customer_id FROM lead_customer c \
             JOIN leads l ON l.lead_id = c.customer_lead_id \
             WHERE l.pancard = ?",
            &[SqlValue::from(pancard.as_str())],
        )
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert_eq!(rows.len(), 1);
    Ok(())
}
