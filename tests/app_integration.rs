use chrono::{Duration, Utc};
use ledger_jobs::core::config::AppConfig;
use ledger_jobs::core::{
    AssetTypeFilter, AssetTypeRepository, CurrencyCode, GoldDenomination, InstrumentClass,
    Transaction, TransactionFilter, TransactionKind, TransactionRepository, User,
};
use ledger_jobs::jobs::Job;
use ledger_jobs::jobs::reminders::month_start;
use ledger_jobs::store::{DiskStore, MemoryStore};
use ledger_jobs::{AppCommand, JobKind, build_jobs, seed};
use rust_decimal::Decimal;
use std::fs;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

mod test_utils {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn create_feed_server(mock_response: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/today.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;
        mock_server
    }

    pub async fn create_push_server(expected_requests: u64) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/--/api/v2/push/send"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"data":[{"status":"ok","id":"ticket-1"}]}"#),
            )
            .expect(expected_requests)
            .mount(&mock_server)
            .await;
        mock_server
    }
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn config_for(feed_uri: &str, push_uri: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.feeds.default_url = format!("{feed_uri}/v4/today.json");
    config.notifications.push_url = format!("{push_uri}/--/api/v2/push/send");
    config
}

fn transaction(id: i64, date: chrono::DateTime<Utc>) -> Transaction {
    Transaction {
        id,
        user_id: 1,
        asset_type_id: None,
        kind: TransactionKind::Expense,
        income_category_id: None,
        expense_category_id: Some(4),
        amount: Decimal::new(1250, 0),
        description: Some("Rent".to_string()),
        date,
        recurring: false,
        day_of_month: None,
        active: true,
    }
}

#[test_log::test(tokio::test)]
async fn test_price_sync_against_builtin_feed() {
    let feed = test_utils::create_feed_server(
        r#"{
            "Update_Date": "2024-06-10 09:00:00",
            "USD": {"Type": "Currency", "Buying": "32,15", "Selling": "32,20"},
            "EUR": {"Type": "Currency", "Buying": "-", "Selling": "-"},
            "gram-altin": {"Type": "Gold", "Buying": "2.456,78", "Selling": "2.460,10"}
        }"#,
    )
    .await;
    let store = Arc::new(MemoryStore::new());
    seed::seed_default_asset_types(store.as_ref()).await.unwrap();

    let jobs = build_jobs(store.clone(), &config_for(&feed.uri(), &feed.uri())).unwrap();
    let report = jobs.price_sync.run().await.unwrap();
    info!(%report, "Price sync report");

    // Base currency skipped, EUR unparseable, GBP absent
    assert_eq!(report.skipped, 1);
    assert_eq!(report.attempted, 7);
    assert_eq!(report.succeeded, 5);
    assert_eq!(report.failed, 2);

    let assets = store
        .find_asset_types(&AssetTypeFilter::default())
        .await
        .unwrap();
    let value_of = |class: InstrumentClass| {
        assets
            .iter()
            .find(|a| a.class == class)
            .map(|a| (a.value, a.updated_at.is_some()))
            .unwrap()
    };
    assert_eq!(
        value_of(InstrumentClass::Currency(CurrencyCode::Usd)),
        (dec("32.15"), true)
    );
    assert_eq!(
        value_of(InstrumentClass::Currency(CurrencyCode::Eur)),
        (Decimal::ZERO, false)
    );
    assert_eq!(
        value_of(InstrumentClass::Gold(GoldDenomination::Gram)),
        (dec("2456.78"), true)
    );
    assert_eq!(
        value_of(InstrumentClass::Gold(GoldDenomination::Quarter)),
        (dec("4299.365"), true)
    );
    assert_eq!(
        value_of(InstrumentClass::Gold(GoldDenomination::Full)),
        (dec("17197.46"), true)
    );
    assert_eq!(value_of(InstrumentClass::BaseCurrency), (Decimal::ONE, false));
}

#[test_log::test(tokio::test)]
async fn test_due_obligation_is_reminded_once() {
    let push = test_utils::create_push_server(1).await;
    let store = Arc::new(MemoryStore::new());
    store
        .insert_user(User {
            id: 1,
            active: true,
            push_token: Some("ExponentPushToken[abc]".to_string()),
        })
        .await;
    let mut template = transaction(10, month_start(Utc::now()) - Duration::days(10));
    template.recurring = true;
    template.day_of_month = Some(1);
    store.insert_transaction(template).await;

    let jobs = build_jobs(store.clone(), &config_for(&push.uri(), &push.uri())).unwrap();

    let report = jobs.reminders.run().await.unwrap();
    assert_eq!((report.attempted, report.succeeded, report.failed), (1, 1, 0));

    // Within the cooldown the next run stays quiet
    let report = jobs.reminders.run().await.unwrap();
    assert_eq!(report.attempted, 0);
}

#[test_log::test(tokio::test)]
async fn test_retention_on_disk_store() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let now = Utc::now();
    {
        let store = Arc::new(DiskStore::open(temp_dir.path()).unwrap());
        store
            .insert_transaction(&transaction(1, now - Duration::days(400)))
            .unwrap();
        store
            .insert_transaction(&transaction(2, now - Duration::days(30)))
            .unwrap();
        store
            .insert_transaction(&transaction(3, now - Duration::days(800)))
            .unwrap();

        let jobs = build_jobs(store, &AppConfig::default()).unwrap();
        let report = jobs.get(JobKind::Retention).run().await.unwrap();
        assert_eq!((report.attempted, report.succeeded), (2, 2));
    }

    let reopened = DiskStore::open(temp_dir.path()).unwrap();
    let remaining: Vec<i64> = reopened
        .find_transactions(&TransactionFilter::default())
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(remaining, vec![2]);
}

#[test_log::test(tokio::test)]
async fn test_run_command_with_config_file() {
    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    let config_path = config_file.path();
    let config_content = r#"
        feeds:
          default_url: "http://127.0.0.1:9/today.json"
          timeout_secs: 1
        retention:
          commit_chunk_size: 10
    "#;
    fs::write(config_path, config_content).expect("Failed to write config file");

    for command in [
        AppCommand::Seed,
        AppCommand::Run(JobKind::Retention),
        AppCommand::Run(JobKind::Reminders),
        AppCommand::SetSetting {
            key: "PriceFeed.DefaultUrl".to_string(),
            value: "http://127.0.0.1:9/other.json".to_string(),
        },
    ] {
        let result =
            ledger_jobs::run_command(command.clone(), Some(config_path.to_str().unwrap()), true)
                .await;
        assert!(
            result.is_ok(),
            "{command:?} failed with: {:?}",
            result.err()
        );
    }
}
