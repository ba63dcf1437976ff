mod helpers;

use helpers::*;
use stockpick_backend::error::AppError;
use stockpick_backend::models::*;
use tokio_test::{assert_err, assert_ok};

const TEN_TICKERS: [&str; 10] = [
    "AAPL", "MSFT", "NVDA", "META", "AMZN", "GOOG", "TSLA", "NFLX", "AMD", "INTC",
];

// ============================================================================
// Join: baseline assignment
// ============================================================================

#[tokio::test]
async fn test_backfill_join_allocates_budget_and_uses_historical_baseline() {
    let app = TestApp::default_app();
    app.prices.set_historical("NVDA", day(2025, 6, 30), 123.54);
    app.prices.set_current("NVDA", 148.90);
    let comp = app.create_backfill(day(2025, 6, 30), Some(1000.0)).await;

    let joined = app.join(&comp, "Alice", &["nvda"]).await;

    assert_eq!(joined.stocks.len(), 1);
    let stock = &joined.stocks[0];
    assert_eq!(stock.ticker, "NVDA");
    assert_eq!(stock.baseline_price, Some(123.54));
    assert_eq!(stock.current_price, Some(148.90));
    assert!(approx(stock.shares, 1000.0 / 123.54, 1e-9));
    assert!(approx(stock.percent_change.unwrap(), 20.55, 0.05));
    assert!(approx(joined.participant.percent_change.unwrap(), 20.55, 0.05));
    assert_eq!(joined.participant.primary_ticker.as_deref(), Some("NVDA"));
}

#[tokio::test]
async fn test_backfill_join_weights_by_investment() {
    let app = TestApp::default_app();
    app.prices.set_historical("META", day(2025, 6, 30), 504.22);
    app.prices.set_current("META", 612.77);
    app.prices.set_historical("NVDA", day(2025, 6, 30), 123.54);
    app.prices.set_current("NVDA", 148.90);
    let comp = app.create_backfill(day(2025, 6, 30), None).await;

    let picks = vec![Pick::new("META", Some(1.0)), Pick::new("NVDA", Some(2.5))];
    let joined = assert_ok!(
        app.state
            .portfolios
            .join_competition(&comp.slug, "Eve", &picks)
            .await
    );

    let aggregate = joined.participant.percent_change.unwrap();
    assert!(approx(aggregate, 21.1, 0.1), "got {}", aggregate);
    assert_eq!(joined.participant.primary_ticker.as_deref(), Some("META"));
}

#[tokio::test]
async fn test_live_join_uses_current_price_only() {
    let app = TestApp::default_app();
    app.prices.set_current("AAPL", 230.0);
    let comp = app
        .create_live(at(2025, 9, 1, 0), at(2025, 9, 8, 0), None)
        .await;

    let joined = app.join(&comp, "Bob", &["AAPL"]).await;

    assert_eq!(joined.stocks[0].baseline_price, Some(230.0));
    assert_eq!(joined.stocks[0].shares, 1.0);
    assert_eq!(joined.participant.percent_change, Some(0.0));
    assert_eq!(app.prices.historical_calls(), 0);
}

#[tokio::test]
async fn test_backfill_without_history_is_price_unavailable() {
    let app = TestApp::default_app();
    app.prices.set_current("AAPL", 230.0);
    let comp = app.create_backfill(day(2025, 6, 30), Some(1000.0)).await;

    let result = app
        .state
        .portfolios
        .join_competition(&comp.slug, "Alice", &[Pick::single("AAPL")])
        .await;

    assert!(matches!(result, Err(AppError::PriceUnavailable(_))));
    assert_eq!(app.participant_count(&comp).await, 0);
}

#[tokio::test]
async fn test_unknown_ticker_is_rejected() {
    let app = TestApp::default_app();
    let comp = app
        .create_live(at(2025, 9, 1, 0), at(2025, 9, 8, 0), None)
        .await;

    let result = app
        .state
        .portfolios
        .join_competition(&comp.slug, "Alice", &[Pick::single("ZZZZ")])
        .await;

    assert!(matches!(result, Err(AppError::InvalidTicker(t)) if t == "ZZZZ"));
    assert_eq!(app.participant_count(&comp).await, 0);
}

// ============================================================================
// Join: validation before side effects
// ============================================================================

#[tokio::test]
async fn test_name_taken_ignores_case() {
    let app = TestApp::default_app();
    app.prices.set_current("AAPL", 230.0);
    let comp = app
        .create_live(at(2025, 9, 1, 0), at(2025, 9, 8, 0), None)
        .await;
    app.join(&comp, "Alice", &["AAPL"]).await;
    let calls = app.prices.calls();

    let result = app
        .state
        .portfolios
        .join_competition(&comp.slug, "ALICE", &[Pick::single("AAPL")])
        .await;

    assert!(matches!(result, Err(AppError::NameTaken(_))));
    assert_eq!(app.prices.calls(), calls);
    assert_eq!(app.participant_count(&comp).await, 1);
}

#[tokio::test]
async fn test_eleven_tickers_rejected_without_price_lookups() {
    let app = TestApp::default_app();
    let comp = app
        .create_live(at(2025, 9, 1, 0), at(2025, 9, 8, 0), None)
        .await;

    let mut picks: Vec<Pick> = TEN_TICKERS.iter().map(|t| Pick::single(*t)).collect();
    picks.push(Pick::single("ORCL"));

    let result = app
        .state
        .portfolios
        .join_competition(&comp.slug, "Greedy", &picks)
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(app.prices.calls(), 0);
    assert_eq!(app.participant_count(&comp).await, 0);
}

#[tokio::test]
async fn test_duplicate_ticker_in_picks_rejected() {
    let app = TestApp::default_app();
    let comp = app
        .create_live(at(2025, 9, 1, 0), at(2025, 9, 8, 0), None)
        .await;

    let picks = vec![Pick::single("nvda"), Pick::single("NVDA")];
    let result = app
        .state
        .portfolios
        .join_competition(&comp.slug, "Dupe", &picks)
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(app.prices.calls(), 0);
}

#[tokio::test]
async fn test_budget_exceeded_persists_nothing() {
    let app = TestApp::default_app();
    app.prices.set_historical("NVDA", day(2025, 6, 30), 123.54);
    app.prices.set_current("NVDA", 148.90);
    let comp = app.create_backfill(day(2025, 6, 30), Some(1000.0)).await;

    let result = app
        .state
        .portfolios
        .join_competition(&comp.slug, "Spender", &[Pick::new("NVDA", Some(10.0))])
        .await;

    assert!(matches!(result, Err(AppError::BudgetExceeded(_))));
    assert_eq!(app.participant_count(&comp).await, 0);
}

#[tokio::test]
async fn test_join_unknown_competition() {
    let app = TestApp::default_app();
    let result = app
        .state
        .portfolios
        .join_competition("nope1234", "Alice", &[Pick::single("AAPL")])
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

// ============================================================================
// Edit
// ============================================================================

#[tokio::test]
async fn test_eleventh_ticker_on_edit_rejected_without_price_lookups() {
    let app = TestApp::default_app();
    for ticker in TEN_TICKERS {
        app.prices.set_current(ticker, 100.0);
    }
    app.prices.set_current("ORCL", 100.0);
    let comp = app
        .create_live(at(2025, 9, 1, 0), at(2025, 9, 8, 0), None)
        .await;
    let joined = app.join(&comp, "Full", &TEN_TICKERS).await;
    let calls = app.prices.calls();

    let changes = vec![PortfolioChange::Add {
        ticker: "ORCL".into(),
        shares: None,
    }];
    let result = app
        .state
        .portfolios
        .edit_portfolio(&comp.slug, "Full", &changes)
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(app.prices.calls(), calls);
    let stocks = app
        .state
        .repos
        .stocks
        .find_by_participant(joined.participant.id)
        .await
        .unwrap();
    assert_eq!(stocks.len(), 10);
}

#[tokio::test]
async fn test_live_edit_prefers_window_start_history_then_current() {
    let app = TestApp::default_app();
    app.prices.set_current("AAPL", 230.0);
    app.prices.set_current("MSFT", 400.0);
    app.prices.set_current("NVDA", 120.0);
    app.prices.set_historical("NVDA", day(2025, 8, 25), 100.0);
    let comp = app
        .create_live(at(2025, 8, 25, 0), at(2025, 9, 8, 0), None)
        .await;
    app.join(&comp, "Alice", &["AAPL"]).await;

    let changes = vec![
        PortfolioChange::Add {
            ticker: "msft".into(),
            shares: None,
        },
        PortfolioChange::Add {
            ticker: "NVDA".into(),
            shares: Some(2.0),
        },
    ];
    let edited = assert_ok!(
        app.state
            .portfolios
            .edit_portfolio(&comp.slug, "alice", &changes)
            .await
    );

    let msft = edited.stocks.iter().find(|s| s.ticker == "MSFT").unwrap();
    assert_eq!(msft.baseline_price, Some(400.0));
    assert_eq!(msft.percent_change, Some(0.0));

    let nvda = edited.stocks.iter().find(|s| s.ticker == "NVDA").unwrap();
    assert_eq!(nvda.baseline_price, Some(100.0));
    assert_eq!(nvda.shares, 2.0);
    assert!(approx(nvda.percent_change.unwrap(), 20.0, 1e-9));

    // 230 + 400 invested flat, 200 invested at +20%
    let aggregate = edited.participant.percent_change.unwrap();
    assert!(approx(aggregate, 40.0 / 830.0 * 100.0, 1e-9), "got {}", aggregate);
}

#[tokio::test]
async fn test_upcoming_live_edit_uses_current_price() {
    let app = TestApp::default_app();
    app.prices.set_current("AAPL", 230.0);
    app.prices.set_current("NVDA", 120.0);
    app.prices.set_historical("NVDA", day(2025, 9, 5), 100.0);
    let comp = app
        .create_live(at(2025, 9, 5, 0), at(2025, 9, 12, 0), None)
        .await;
    app.join(&comp, "Alice", &["AAPL"]).await;
    let historical = app.prices.historical_calls();

    let changes = vec![PortfolioChange::Add {
        ticker: "NVDA".into(),
        shares: None,
    }];
    let edited = assert_ok!(
        app.state
            .portfolios
            .edit_portfolio(&comp.slug, "Alice", &changes)
            .await
    );

    let nvda = edited.stocks.iter().find(|s| s.ticker == "NVDA").unwrap();
    assert_eq!(nvda.baseline_price, Some(120.0));
    assert_eq!(nvda.percent_change, Some(0.0));
    assert_eq!(app.prices.historical_calls(), historical);
}

#[tokio::test]
async fn test_edit_allocates_over_final_portfolio_size() {
    let app = TestApp::default_app();
    app.prices.set_current("AAPL", 250.0);
    app.prices.set_current("MSFT", 250.0);
    app.prices.set_current("NVDA", 100.0);
    let comp = app
        .create_live(at(2025, 9, 1, 0), at(2025, 9, 8, 0), Some(1000.0))
        .await;
    let joined = app.join(&comp, "Alice", &["AAPL"]).await;
    assert!(approx(joined.stocks[0].shares, 4.0, 1e-9));

    let changes = vec![
        PortfolioChange::Remove {
            ticker: "AAPL".into(),
        },
        PortfolioChange::Add {
            ticker: "MSFT".into(),
            shares: None,
        },
        PortfolioChange::Add {
            ticker: "NVDA".into(),
            shares: None,
        },
    ];
    let edited = assert_ok!(
        app.state
            .portfolios
            .edit_portfolio(&comp.slug, "Alice", &changes)
            .await
    );

    let shares: Vec<(String, f64)> = edited
        .stocks
        .iter()
        .map(|s| (s.ticker.clone(), s.shares))
        .collect();
    assert_eq!(shares.len(), 2);
    assert!(shares.iter().any(|(t, s)| t == "MSFT" && approx(*s, 2.0, 1e-9)));
    assert!(shares.iter().any(|(t, s)| t == "NVDA" && approx(*s, 5.0, 1e-9)));
    assert_eq!(edited.participant.primary_ticker.as_deref(), Some("MSFT"));
}

#[tokio::test]
async fn test_reweight_over_budget_keeps_old_shares() {
    let app = TestApp::default_app();
    app.prices.set_current("AAPL", 250.0);
    let comp = app
        .create_live(at(2025, 9, 1, 0), at(2025, 9, 8, 0), Some(1000.0))
        .await;
    let joined = app.join(&comp, "Alice", &["AAPL"]).await;

    let changes = vec![PortfolioChange::Reweight {
        ticker: "AAPL".into(),
        shares: 5.0,
    }];
    let result = app
        .state
        .portfolios
        .edit_portfolio(&comp.slug, "Alice", &changes)
        .await;

    assert!(matches!(result, Err(AppError::BudgetExceeded(_))));
    let stocks = app
        .state
        .repos
        .stocks
        .find_by_participant(joined.participant.id)
        .await
        .unwrap();
    assert!(approx(stocks[0].shares, 4.0, 1e-9));
}

#[tokio::test]
async fn test_edit_rejects_unknown_participant_and_absent_ticker() {
    let app = TestApp::default_app();
    app.prices.set_current("AAPL", 250.0);
    let comp = app
        .create_live(at(2025, 9, 1, 0), at(2025, 9, 8, 0), None)
        .await;
    app.join(&comp, "Alice", &["AAPL"]).await;

    let remove_msft = vec![PortfolioChange::Remove {
        ticker: "MSFT".into(),
    }];
    let result = app
        .state
        .portfolios
        .edit_portfolio(&comp.slug, "Mallory", &remove_msft)
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));

    let result = app
        .state
        .portfolios
        .edit_portfolio(&comp.slug, "Alice", &remove_msft)
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    let remove_last = vec![PortfolioChange::Remove {
        ticker: "AAPL".into(),
    }];
    let result = app
        .state
        .portfolios
        .edit_portfolio(&comp.slug, "Alice", &remove_last)
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_backfill_edit_requires_history() {
    let app = TestApp::default_app();
    app.prices.set_historical("NVDA", day(2025, 6, 30), 123.54);
    app.prices.set_current("NVDA", 148.90);
    app.prices.set_current("AAPL", 230.0);
    let comp = app.create_backfill(day(2025, 6, 30), None).await;
    app.join(&comp, "Alice", &["NVDA"]).await;

    let changes = vec![PortfolioChange::Add {
        ticker: "AAPL".into(),
        shares: None,
    }];
    let result = app
        .state
        .portfolios
        .edit_portfolio(&comp.slug, "Alice", &changes)
        .await;
    assert!(matches!(result, Err(AppError::PriceUnavailable(_))));
}

// ============================================================================
// Locking and leaving
// ============================================================================

#[tokio::test]
async fn test_live_competition_locks_after_window_end() {
    let app = TestApp::default_app();
    app.prices.set_current("AAPL", 230.0);
    let comp = app
        .create_live(at(2025, 9, 1, 0), at(2025, 9, 8, 0), None)
        .await;
    app.join(&comp, "Alice", &["AAPL"]).await;

    app.clock.set(at(2025, 9, 8, 1));

    let join = app
        .state
        .portfolios
        .join_competition(&comp.slug, "Late", &[Pick::single("AAPL")])
        .await;
    assert!(matches!(join, Err(AppError::CompetitionLocked(_))));

    let edit = app
        .state
        .portfolios
        .edit_portfolio(
            &comp.slug,
            "Alice",
            &[PortfolioChange::Reweight {
                ticker: "AAPL".into(),
                shares: 2.0,
            }],
        )
        .await;
    assert!(matches!(edit, Err(AppError::CompetitionLocked(_))));

    let leave = app.state.portfolios.leave_competition(&comp.slug, "Alice").await;
    assert!(matches!(leave, Err(AppError::CompetitionLocked(_))));
}

#[tokio::test]
async fn test_leave_then_rejoin_under_same_name() {
    let app = TestApp::default_app();
    app.prices.set_current("AAPL", 230.0);
    let comp = app
        .create_live(at(2025, 9, 1, 0), at(2025, 9, 8, 0), None)
        .await;
    let first = app.join(&comp, "Bob", &["AAPL"]).await;

    assert_ok!(app.state.portfolios.leave_competition(&comp.slug, "BOB").await);
    assert_eq!(app.participant_count(&comp).await, 0);
    let orphaned = app
        .state
        .repos
        .stocks
        .find_by_participant(first.participant.id)
        .await
        .unwrap();
    assert!(orphaned.is_empty());

    assert_err!(app.state.portfolios.leave_competition(&comp.slug, "Bob").await);

    app.join(&comp, "Bob", &["AAPL"]).await;

    let actions: Vec<String> = app
        .state
        .repos
        .audit
        .find_by_competition(comp.id)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.action)
        .collect();
    assert_eq!(actions, vec!["create", "join", "leave", "join"]);
}
