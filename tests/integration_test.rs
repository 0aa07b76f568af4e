//! End-to-end tests for the simulation pipeline.
//!
//! Covers the decision loop over synthetic markets, the simulator's money
//! handling, data sources and result persistence.

mod common;

use approx::assert_relative_eq;
use barsim::adapters::csv_adapter::CsvAdapter;
use barsim::adapters::fallback_source::FallbackSource;
use barsim::domain::backtest::{
    persist_result, run_backtest, run_simulation, BacktestConfig, LedgerEntry, Simulator,
};
use barsim::domain::decision::{Action, EntryOrder, WaitReason};
use barsim::domain::error::SimError;
use barsim::domain::pattern::CandlePattern;
use barsim::domain::position::{Direction, EntrySnapshot, EntryTrigger, ExitReason, Trade};
use barsim::domain::strategy::StrategyConfig;
use barsim::ports::data_port::BarSource;
use common::*;
use proptest::prelude::*;

fn config_with(balance: f64, fee_pct: f64) -> BacktestConfig {
    BacktestConfig {
        initial_balance: balance,
        fee_pct,
        ..sample_config()
    }
}

fn blank_snapshot() -> EntrySnapshot {
    EntrySnapshot {
        rsi: 50.0,
        atr: 0.0,
        adx: None,
        macd_histogram: 0.0,
        stoch_k: 50.0,
        volatility_pct: 0.0,
        sma_short: 100.0,
        sma_long: 100.0,
        bollinger_width_pct: 0.0,
        support: None,
        resistance: None,
        pattern: CandlePattern::None,
    }
}

fn long_order(price: f64, size: f64, stop_loss: f64, take_profit: f64) -> EntryOrder {
    EntryOrder {
        direction: Direction::Long,
        price,
        size,
        leverage: 10.0,
        stop_loss,
        take_profit,
        reason: EntryTrigger::Confirmation,
        snapshot: blank_snapshot(),
    }
}

fn trades(ledger_entries: &[LedgerEntry]) -> Vec<&Trade> {
    ledger_entries
        .iter()
        .filter_map(|e| match e {
            LedgerEntry::Trade(t) => Some(t),
            LedgerEntry::Halt { .. } => None,
        })
        .collect()
}

fn assert_balance_chain(initial: f64, trades: &[&Trade]) {
    let mut expected = initial;
    for trade in trades {
        expected += trade.profit;
        assert_relative_eq!(trade.new_balance, expected, epsilon = 1e-6);
    }
}

fn assert_no_overlap(trades: &[&Trade]) {
    for pair in trades.windows(2) {
        assert!(pair[1].entry_time >= pair[0].exit_time);
    }
    for trade in trades {
        assert!(trade.exit_time >= trade.entry_time);
    }
}

mod synthetic_markets {
    use super::*;

    #[test]
    fn flat_market_only_waits() {
        let strategy = StrategyConfig::default();
        let config = sample_config();
        let bars = bars_from_closes(&[100.0; 40]);
        let mut sim = Simulator::new(&config, &strategy);

        for end in 1..=bars.len() {
            let action = sim.step(&bars[..end]);
            assert!(
                matches!(action, Action::Wait { .. }),
                "bar {end}: unexpected {action:?}"
            );
        }
        let result = sim.finish();
        assert_eq!(result.stats.total_trades, 0);
        assert_eq!(result.account.balance, config.initial_balance);
    }

    #[test]
    fn warmup_reports_insufficient_data() {
        let strategy = StrategyConfig::default();
        let config = sample_config();
        let bars = rising_bars(3, 100.0);
        let mut sim = Simulator::new(&config, &strategy);
        assert_eq!(
            sim.step(&bars),
            Action::Wait {
                reason: WaitReason::InsufficientData
            }
        );
    }

    #[test]
    fn rising_market_goes_long_and_takes_profit() {
        let strategy = StrategyConfig::default();
        let config = sample_config();
        let result = run_backtest(&rising_bars(30, 100.0), &config, &strategy);

        let first = result.ledger.trades().next().expect("a trade");
        assert_eq!(first.direction, Direction::Long);
        assert_eq!(first.exit_reason, ExitReason::TakeProfit);
        assert!(first.profit > 0.0);
        assert!(first.exit_price > first.entry_price);
        assert!(result.stats.trades_won >= 1);
    }

    #[test]
    fn runs_are_deterministic() {
        let strategy = StrategyConfig::default();
        let config = sample_config();
        let bars = wave_bars(200);
        let a = run_backtest(&bars, &config, &strategy);
        let b = run_backtest(&bars, &config, &strategy);
        assert_eq!(format!("{a:?}"), format!("{b:?}"));
    }

    #[test]
    fn wave_market_keeps_ledger_consistent() {
        let strategy = StrategyConfig::default();
        let config = sample_config();
        let result = run_backtest(&wave_bars(300), &config, &strategy);

        let trades = trades(result.ledger.entries());
        assert_balance_chain(config.initial_balance, &trades);
        assert_no_overlap(&trades);
        assert_eq!(result.stats.total_trades, trades.len());
        assert_eq!(result.bars_processed, 300);
    }
}

mod simulator {
    use super::*;

    #[test]
    fn stop_loss_fires_on_hold() {
        let strategy = StrategyConfig::default();
        let config = config_with(10_000.0, 0.05);
        let bars = bars_from_closes(&[100.0, 99.80]);
        let mut sim = Simulator::new(&config, &strategy);

        sim.apply_action(&Action::Enter(long_order(100.0, 10.0, 99.85, 100.20)), &bars[0]);
        assert!(sim.position().is_some());
        sim.apply_action(&Action::Hold, &bars[1]);

        assert!(sim.position().is_none());
        let trade = sim.ledger().trades().next().unwrap();
        assert_eq!(trade.exit_reason, ExitReason::StopLoss);
        assert_eq!(trade.exit_price, 99.80);
        assert!(trade.profit < 0.0);
    }

    #[test]
    fn take_profit_fires_on_wait() {
        let strategy = StrategyConfig::default();
        let config = config_with(10_000.0, 0.0);
        let bars = bars_from_closes(&[100.0, 100.30]);
        let mut sim = Simulator::new(&config, &strategy);

        sim.apply_action(&Action::Enter(long_order(100.0, 10.0, 99.85, 100.20)), &bars[0]);
        sim.apply_action(
            &Action::Wait {
                reason: WaitReason::NoSignal,
            },
            &bars[1],
        );
        let trade = sim.ledger().trades().next().unwrap();
        assert_eq!(trade.exit_reason, ExitReason::TakeProfit);
        assert_relative_eq!(trade.profit, 3.0, epsilon = 1e-9);
    }

    #[test]
    fn exhausted_balance_halts_the_run() {
        let strategy = StrategyConfig::default();
        let config = config_with(100.0, 0.0);
        let bars = bars_from_closes(&[100.0, 90.0, 91.0]);
        let mut sim = Simulator::new(&config, &strategy);

        sim.apply_action(&Action::Enter(long_order(100.0, 10.0, 0.0, 0.0)), &bars[0]);
        sim.apply_action(
            &Action::Exit {
                price: 90.0,
                reason: ExitReason::Signal,
            },
            &bars[1],
        );
        assert_relative_eq!(sim.account().balance, 0.0, epsilon = 1e-9);

        assert_eq!(sim.step(&bars), Action::Halt);
        assert!(sim.is_halted());

        let result = sim.finish();
        assert!(result.stats.halted);
        assert_eq!(result.stats.total_trades, 1);
        assert!(matches!(
            result.ledger.entries().last(),
            Some(LedgerEntry::Halt { .. })
        ));
    }

    #[test]
    fn unaffordable_entry_leaves_account_untouched() {
        let strategy = StrategyConfig::default();
        let config = config_with(50.0, 0.05);
        let bars = bars_from_closes(&[100.0]);
        let mut sim = Simulator::new(&config, &strategy);

        sim.apply_action(&Action::Enter(long_order(100.0, 10.0, 99.0, 101.0)), &bars[0]);
        assert!(sim.position().is_none());
        assert_eq!(sim.account().balance, 50.0);
    }
}

mod sources {
    use super::*;

    #[test]
    fn empty_source_is_no_data() {
        let source = MockBarSource::new();
        let err = run_simulation(&source, &sample_config(), &StrategyConfig::default())
            .unwrap_err();
        match err {
            SimError::NoData { ticker, interval } => {
                assert_eq!(ticker, "BTCUSDT");
                assert_eq!(interval, Interval::M5);
            }
            other => panic!("expected NoData, got {other:?}"),
        }
    }

    #[test]
    fn source_errors_propagate() {
        let source = MockBarSource::new().with_error("BTCUSDT", "connection refused");
        let err = run_simulation(&source, &sample_config(), &StrategyConfig::default())
            .unwrap_err();
        assert!(matches!(err, SimError::Database { .. }));
    }

    #[test]
    fn simulation_uses_fetched_bars() {
        let source = MockBarSource::new().with_bars("BTCUSDT", rising_bars(30, 100.0));
        let result =
            run_simulation(&source, &sample_config(), &StrategyConfig::default()).unwrap();
        assert_eq!(result.bars_processed, 30);
        assert!(result.stats.total_trades >= 1);
    }

    #[test]
    fn fallback_fills_in_for_empty_primary() {
        let primary = MockBarSource::new();
        let secondary = MockBarSource::new().with_bars("BTCUSDT", rising_bars(5, 100.0));
        let source = FallbackSource::new(primary, secondary);
        let bars = source
            .fetch_bars("BTCUSDT", date(2024, 1, 1), date(2024, 1, 2), Interval::M5)
            .unwrap();
        assert_eq!(bars.len(), 5);
    }

    #[test]
    fn fallback_keeps_primary_errors() {
        let primary = MockBarSource::new().with_error("BTCUSDT", "locked");
        let secondary = MockBarSource::new().with_bars("BTCUSDT", rising_bars(5, 100.0));
        let source = FallbackSource::new(primary, secondary);
        assert!(
            source
                .fetch_bars("BTCUSDT", date(2024, 1, 1), date(2024, 1, 2), Interval::M5)
                .is_err()
        );
    }

    #[test]
    fn csv_directory_drives_a_simulation() {
        use std::io::Write;

        let dir = tempfile::TempDir::new().unwrap();
        let mut file = std::fs::File::create(dir.path().join("BTCUSDT_5m.csv")).unwrap();
        writeln!(file, "timestamp,open,high,low,close,volume").unwrap();
        for bar in rising_bars(30, 100.0) {
            writeln!(
                file,
                "{},{},{},{},{},{}",
                bar.timestamp.format("%Y-%m-%d %H:%M:%S"),
                bar.open,
                bar.high,
                bar.low,
                bar.close,
                bar.volume
            )
            .unwrap();
        }
        drop(file);

        let source = CsvAdapter::new(dir.path().to_path_buf());
        let from_csv =
            run_simulation(&source, &sample_config(), &StrategyConfig::default()).unwrap();
        let in_memory = run_backtest(
            &rising_bars(30, 100.0),
            &sample_config(),
            &StrategyConfig::default(),
        );
        assert_eq!(from_csv.bars_processed, 30);
        assert_eq!(from_csv.stats, in_memory.stats);
    }
}

mod persistence {
    use super::*;

    #[test]
    fn persist_hands_record_and_trades_to_sink() {
        let strategy = StrategyConfig::default();
        let config = sample_config();
        let result = run_backtest(&rising_bars(30, 100.0), &config, &strategy);
        let sink = RecordingSink::default();

        let id = persist_result(&sink, &config, &strategy, &result).unwrap();
        assert_eq!(id, 1);

        let sims = sink.simulations.borrow();
        assert_eq!(sims.len(), 1);
        assert_eq!(sims[0].0.ticker, "BTCUSDT");
        assert_eq!(sims[0].0.strategy_name, strategy.name);
        assert_eq!(sims[0].0.bars_processed, 30);
        assert_eq!(sims[0].1, result.stats);

        let saved = sink.trades.borrow();
        assert_eq!(saved[0].0, id);
        assert_eq!(saved[0].1.len(), result.stats.total_trades);
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn sqlite_round_trip() {
        use barsim::adapters::sqlite_adapter::SqliteAdapter;

        let db = SqliteAdapter::in_memory().unwrap();
        db.insert_bars("BTCUSDT", Interval::M5, &rising_bars(30, 100.0))
            .unwrap();

        let strategy = StrategyConfig::default();
        let config = sample_config();
        let result = run_simulation(&db, &config, &strategy).unwrap();
        let id = persist_result(&db, &config, &strategy, &result).unwrap();

        assert_eq!(db.trade_count(id).unwrap(), result.stats.total_trades);
        let stored = db.simulation_summary(id).unwrap().unwrap();
        assert_relative_eq!(stored.final_balance, result.stats.final_balance, epsilon = 1e-9);
        assert!(!stored.halted);
    }
}

fn random_walk(steps: Vec<f64>) -> Vec<Bar> {
    let mut price = 100.0;
    let closes: Vec<f64> = steps
        .into_iter()
        .map(|s| {
            price = (price * (1.0 + s)).max(1.0);
            price
        })
        .collect();
    bars_from_closes(&closes)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn ledger_invariants_hold(steps in prop::collection::vec(-0.004f64..0.004, 30..150)) {
        let strategy = StrategyConfig::default();
        let config = sample_config();
        let result = run_backtest(&random_walk(steps), &config, &strategy);

        let trades = trades(result.ledger.entries());
        assert_balance_chain(config.initial_balance, &trades);
        assert_no_overlap(&trades);
        prop_assert_eq!(result.stats.total_trades, trades.len());
        let halts = result
            .ledger
            .entries()
            .iter()
            .filter(|e| matches!(e, LedgerEntry::Halt { .. }))
            .count();
        prop_assert!(halts <= 1);
    }
}
