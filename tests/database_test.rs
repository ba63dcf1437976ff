mod helpers;

use helpers::*;
use sqlx::{PgPool, Row};
use stockpick_backend::error::RepositoryError;
use stockpick_backend::models::*;
use stockpick_backend::repositories::*;

// ============================================================================
// Migration Tests
// ============================================================================

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_migrations_ran(pool: PgPool) {
    let tables = vec![
        "competitions",
        "participants",
        "portfolio_stocks",
        "price_history",
        "audit_events",
    ];

    for table in tables {
        let row = sqlx::query(
            "SELECT EXISTS (SELECT FROM information_schema.tables WHERE table_name = $1)",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .unwrap();
        let exists: bool = row.get(0);
        assert!(exists, "Table {} should exist", table);
    }
}

// ============================================================================
// Competition Repository Tests
// ============================================================================

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_competition_round_trip(pool: PgPool) {
    let db = TestDatabase::from_pool(pool);
    db.cleanup().await;

    let comp = Competition::new_backfill(
        "Summer".into(),
        day(2025, 6, 30),
        Some(1000.0),
        at(2025, 9, 1, 12),
    );
    let created = db.repos.competitions.create(&comp).await.unwrap();
    assert_eq!(created.slug, comp.slug);
    assert_eq!(created.mode_enum(), CompetitionMode::Backfill);

    let found = db
        .repos
        .competitions
        .find_by_slug(&comp.slug.to_uppercase())
        .await
        .unwrap()
        .expect("slug lookup should ignore case");
    assert_eq!(found.id, comp.id);
    assert_eq!(found.budget, Some(1000.0));

    let finalized = db.repos.competitions.set_finalized(comp.id, true).await.unwrap();
    assert!(finalized.finalized);
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_competition_window_check_constraint(pool: PgPool) {
    let db = TestDatabase::from_pool(pool);
    db.cleanup().await;

    let comp = Competition::new_live(
        "Backwards".into(),
        at(2025, 9, 8, 0),
        at(2025, 9, 1, 0),
        None,
        at(2025, 9, 1, 0),
    );
    let err = db.repos.competitions.create(&comp).await.unwrap_err();
    assert!(matches!(err, RepositoryError::ConstraintViolation(_)));
}

// ============================================================================
// Participant and Stock Repository Tests
// ============================================================================

async fn seed_competition(db: &TestDatabase) -> Competition {
    let comp = Competition::new_live(
        "Live".into(),
        at(2025, 9, 1, 0),
        at(2025, 9, 8, 0),
        None,
        at(2025, 9, 1, 0),
    );
    db.repos.competitions.create(&comp).await.unwrap()
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_participant_name_unique_ignoring_case(pool: PgPool) {
    let db = TestDatabase::from_pool(pool);
    db.cleanup().await;
    let comp = seed_competition(&db).await;

    let alice = Participant::new(comp.id, "Alice".into(), at(2025, 9, 1, 1));
    db.repos.participants.create_with_stocks(&alice, &[]).await.unwrap();

    let shouting = Participant::new(comp.id, "ALICE".into(), at(2025, 9, 1, 2));
    let err = db
        .repos
        .participants
        .create_with_stocks(&shouting, &[])
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Duplicate(_)));

    let found = db.repos.participants.find_by_name(comp.id, "aLiCe").await.unwrap();
    assert_eq!(found.map(|p| p.id), Some(alice.id));
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_portfolio_edit_and_cascade(pool: PgPool) {
    let db = TestDatabase::from_pool(pool);
    db.cleanup().await;
    let comp = seed_competition(&db).await;

    let bob = Participant::new(comp.id, "Bob".into(), at(2025, 9, 1, 1));
    let stocks = vec![
        PortfolioStock::new(bob.id, "AAPL".into(), 1.0, Some(230.0), Some(230.0), at(2025, 9, 1, 1)),
        PortfolioStock::new(bob.id, "MSFT".into(), 2.0, Some(400.0), Some(400.0), at(2025, 9, 1, 1)),
    ];
    db.repos.participants.create_with_stocks(&bob, &stocks).await.unwrap();

    let edit = StockEdit {
        remove: vec!["AAPL".into()],
        reweight: vec![("MSFT".into(), 3.0)],
        add: vec![PortfolioStock::new(
            bob.id,
            "NVDA".into(),
            5.0,
            Some(120.0),
            Some(120.0),
            at(2025, 9, 2, 0),
        )],
        updated_at: at(2025, 9, 2, 0),
    };
    db.repos.stocks.apply_edit(bob.id, &edit).await.unwrap();

    let held = db.repos.stocks.find_by_participant(bob.id).await.unwrap();
    let tickers: Vec<&str> = held.iter().map(|s| s.ticker.as_str()).collect();
    assert_eq!(tickers, vec!["MSFT", "NVDA"]);
    assert_eq!(held[0].shares, 3.0);

    db.repos
        .participants
        .update_aggregate(bob.id, Some(4.2), Some("MSFT"))
        .await
        .unwrap();
    let stored = db.repos.participants.find_by_name(comp.id, "bob").await.unwrap().unwrap();
    assert_eq!(stored.percent_change, Some(4.2));
    assert_eq!(stored.primary_ticker.as_deref(), Some("MSFT"));

    assert!(db.repos.participants.delete(bob.id).await.unwrap());
    let orphans = db.repos.stocks.find_by_participants(&[bob.id]).await.unwrap();
    assert!(orphans.is_empty());
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_save_prices(pool: PgPool) {
    let db = TestDatabase::from_pool(pool);
    db.cleanup().await;
    let comp = seed_competition(&db).await;

    let carol = Participant::new(comp.id, "Carol".into(), at(2025, 9, 1, 1));
    let mut stock = PortfolioStock::new(carol.id, "TSLA".into(), 1.0, None, None, at(2025, 9, 1, 1));
    db.repos
        .participants
        .create_with_stocks(&carol, std::slice::from_ref(&stock))
        .await
        .unwrap();

    stock.baseline_price = Some(300.0);
    stock.current_price = Some(330.0);
    stock.percent_change = Some(10.0);
    stock.updated_at = at(2025, 9, 2, 0);
    db.repos.stocks.save_prices(&stock).await.unwrap();

    let stored = db.repos.stocks.find_by_participant(carol.id).await.unwrap();
    assert_eq!(stored[0].baseline_price, Some(300.0));
    assert_eq!(stored[0].current_price, Some(330.0));
    assert_eq!(stored[0].percent_change, Some(10.0));
}

// ============================================================================
// Append-only Logs
// ============================================================================

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_audit_and_price_history(pool: PgPool) {
    let db = TestDatabase::from_pool(pool);
    db.cleanup().await;
    let comp = seed_competition(&db).await;

    let event = AuditEvent::new(
        comp.id,
        AuditAction::Create,
        "system".into(),
        serde_json::json!({ "slug": comp.slug }),
        at(2025, 9, 1, 0),
    );
    db.repos.audit.append(&event).await.unwrap();
    let events = db.repos.audit.find_by_competition(comp.id).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action_enum(), Some(AuditAction::Create));
    assert_eq!(events[0].details["slug"], comp.slug.as_str());

    for (hour, price) in [(1, 100.0), (2, 101.0), (3, 99.5)] {
        let sample = PriceHistorySample::new("NVDA".into(), price, at(2025, 9, 1, hour));
        db.repos.price_history.append(&sample).await.unwrap();
    }
    let recent = db.repos.price_history.recent("NVDA", 2).await.unwrap();
    let prices: Vec<f64> = recent.iter().map(|s| s.price).collect();
    assert_eq!(prices, vec![99.5, 101.0]);
}
