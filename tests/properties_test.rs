//! Property tests for the returns engine.

mod common;

use chrono::Duration;
use common::*;
use proptest::prelude::*;
use stockdash::domain::price_table::PriceTable;
use stockdash::domain::returns;

fn bars_from(symbol: &str, quotes: &[(f64, f64)]) -> Vec<OhlcvBar> {
    let start = date(2024, 1, 1);
    quotes
        .iter()
        .enumerate()
        .map(|(i, &(open, close))| OhlcvBar {
            symbol: symbol.to_string(),
            date: start + Duration::days(i as i64),
            open,
            high: open.max(close),
            low: open.min(close),
            close,
            volume: 0,
        })
        .collect()
}

fn table(series: &[(&str, Vec<(f64, f64)>)]) -> PriceTable {
    PriceTable::from_series(
        series
            .iter()
            .map(|(symbol, quotes)| (symbol.to_string(), bars_from(symbol, quotes)))
            .collect(),
    )
}

fn closes(values: &[f64]) -> Vec<(f64, f64)> {
    values.iter().map(|&c| (c, c)).collect()
}

fn price() -> impl Strategy<Value = f64> {
    1.0f64..1000.0
}

proptest! {
    #[test]
    fn constant_price_has_zero_returns(p in price(), n in 3usize..60) {
        let prices = table(&[("NVDA", closes(&vec![p; n]))]);
        let daily = returns::daily_returns(&prices).unwrap();
        let column = daily.get("NVDA").unwrap();

        prop_assert_eq!(column[0], None);
        for r in &column[1..] {
            prop_assert_eq!(*r, Some(0.0));
        }
        let vol = returns::volatility(&daily, true).unwrap();
        prop_assert_eq!(vol.get("NVDA"), Some(0.0));
    }

    #[test]
    fn cumulative_return_uses_endpoints(values in prop::collection::vec(price(), 2..60)) {
        let prices = table(&[("MSFT", closes(&values))]);
        let cumulative = returns::cumulative_return(&prices).unwrap();
        let expected = (values[values.len() - 1] / values[0] - 1.0) * 100.0;
        prop_assert!((cumulative.get("MSFT").unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn annualized_volatility_is_scaled_daily(values in prop::collection::vec(price(), 3..60)) {
        let prices = table(&[("AMZN", closes(&values))]);
        let daily = returns::daily_returns(&prices).unwrap();
        let plain = returns::volatility(&daily, false).unwrap().get("AMZN").unwrap();
        let annual = returns::volatility(&daily, true).unwrap().get("AMZN").unwrap();
        prop_assert!(plain >= 0.0);
        prop_assert!((annual - plain * 252f64.sqrt()).abs() <= 1e-9 * annual.abs().max(1.0));
    }

    #[test]
    fn intraday_ratios_differ_when_open_differs(open in price(), close in price()) {
        prop_assume!((open - close).abs() > 1e-6);
        let prices = table(&[("META", vec![(open, close)])]);
        let vs_close = returns::intraday_perf_vs_close(&prices).unwrap().get("META").unwrap();
        let vs_open = returns::intraday_perf_vs_open(&prices).unwrap().get("META").unwrap();

        prop_assert!((vs_close - (close - open) / close).abs() < 1e-12);
        prop_assert!((vs_open - (close - open) / open).abs() < 1e-12);
        prop_assert!(vs_close != vs_open);
    }

    #[test]
    fn symbol_metrics_do_not_depend_on_companions(
        a in prop::collection::vec(price(), 3..40),
        b in prop::collection::vec(price(), 3..40),
    ) {
        let n = a.len().min(b.len());
        let (a, b) = (&a[..n], &b[..n]);
        let alone = table(&[("NVDA", closes(a))]);
        let together = table(&[("NVDA", closes(a)), ("GOOGL", closes(b))]);

        let cum_alone = returns::cumulative_return(&alone).unwrap();
        let cum_together = returns::cumulative_return(&together).unwrap();
        prop_assert_eq!(cum_alone.get("NVDA"), cum_together.get("NVDA"));
        prop_assert_eq!(cum_together.len(), 2);

        let daily_alone = returns::daily_returns(&alone).unwrap();
        let daily_together = returns::daily_returns(&together).unwrap();
        prop_assert_eq!(daily_alone.get("NVDA"), daily_together.get("NVDA"));
        prop_assert_eq!(
            returns::volatility(&daily_alone, false).unwrap().get("NVDA"),
            returns::volatility(&daily_together, false).unwrap().get("NVDA")
        );
    }
}

#[test]
fn zero_divisors_fail_each_ratio() {
    let zero_close = table(&[("NVDA", vec![(5.0, 0.0)])]);
    assert!(returns::intraday_perf_vs_close(&zero_close).is_err());
    assert!(returns::intraday_perf_vs_open(&zero_close).is_ok());

    let zero_open = table(&[("NVDA", vec![(0.0, 5.0)])]);
    assert!(returns::intraday_perf_vs_open(&zero_open).is_err());
    assert!(returns::intraday_perf_vs_close(&zero_open).is_ok());
}

#[test]
fn compounding_ten_percent_series() {
    let prices = table(&[("NVDA", closes(&[100.0, 110.0, 121.0, 133.1]))]);
    let cumulative = returns::cumulative_return(&prices).unwrap();
    assert!((cumulative.get("NVDA").unwrap() - 33.1).abs() < 1e-9);

    let daily = returns::daily_returns(&prices).unwrap();
    let column = daily.get("NVDA").unwrap();
    assert_eq!(column[0], None);
    for r in &column[1..] {
        assert!((r.unwrap() - 0.1).abs() < 1e-12);
    }
}
