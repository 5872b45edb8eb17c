//! Use-case scenarios against a repository that replays facts verbatim.
//!
//! `Replay` ignores the query and returns its facts in stored order, which
//! lets these tests feed orchestrators unsorted or foreign facts.

use chrono::{DateTime, Duration, TimeZone, Utc};
use marketfacts_core::data::{
    EconomicUnitReadRepository, InMemoryRepository, PriceQuery, PriceReadRepository, PriceStream,
    RepositoryError, TimeWindow,
};
use marketfacts_core::domain::{
    EconomicUnit, EconomicUnitType, InstrumentType, Interval, Listing, PriceBarFact, RawPriceBar,
};
use marketfacts_runner::{
    BuildAssetWithPrices, BuildEconomicUnitWithListings, FailurePolicy,
    GetPricesMultipleIdentities, PricesQuery, UseCaseError,
};
use proptest::prelude::*;
use rust_decimal_macros::dec;
use std::sync::Arc;

struct Replay(Vec<PriceBarFact>);

impl PriceReadRepository for Replay {
    fn name(&self) -> &str {
        "replay"
    }

    fn get_prices<'a>(&'a self, _query: &PriceQuery) -> Result<PriceStream<'a>, RepositoryError> {
        Ok(Box::new(self.0.iter().cloned().map(Ok)))
    }
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn bar(code: &str, days: i64, close: rust_decimal::Decimal) -> PriceBarFact {
    RawPriceBar::new(code, "1d", t0() + Duration::days(days), close)
        .build()
        .unwrap()
}

fn aapl_query() -> PriceQuery {
    let window = TimeWindow::new(t0(), Some(t0() + Duration::days(5))).unwrap();
    PriceQuery::new("AAPL", Interval::Day1, window).unwrap()
}

#[test]
fn asset_prices_are_sorted_by_timestamp() {
    let repo = Arc::new(Replay(vec![
        bar("AAPL", 2, dec!(102)),
        bar("AAPL", 1, dec!(101)),
        bar("AAPL", 3, dec!(103)),
    ]));

    let asset = BuildAssetWithPrices::new(repo).execute(&aapl_query()).unwrap();

    let ts: Vec<_> = asset.prices().iter().map(|b| b.ts()).collect();
    assert_eq!(
        ts,
        vec![
            t0() + Duration::days(1),
            t0() + Duration::days(2),
            t0() + Duration::days(3)
        ]
    );
}

#[test]
fn equal_timestamps_keep_fetch_order() {
    let repo = Arc::new(Replay(vec![
        bar("AAPL", 2, dec!(1)),
        bar("AAPL", 1, dec!(2)),
        bar("AAPL", 2, dec!(3)),
    ]));

    let asset = BuildAssetWithPrices::new(repo).execute(&aapl_query()).unwrap();
    let closes: Vec<_> = asset.prices().iter().map(|b| b.close()).collect();
    assert_eq!(closes, vec![dec!(2), dec!(1), dec!(3)]);
}

#[test]
fn foreign_identity_is_reported_with_both_codes() {
    let repo = Arc::new(Replay(vec![bar("MSFT", 1, dec!(400))]));

    let err = BuildAssetWithPrices::new(repo).execute(&aapl_query()).unwrap_err();

    assert!(matches!(err, UseCaseError::Consistency(_)));
    let msg = err.to_string();
    assert!(msg.contains("AAPL") && msg.contains("MSFT"), "{msg}");
}

#[test]
fn identity_check_can_be_disabled() {
    let repo = Arc::new(Replay(vec![bar("MSFT", 1, dec!(400))]));
    let asset = BuildAssetWithPrices::new(repo)
        .verify_identity(false)
        .execute(&aapl_query())
        .unwrap();
    assert_eq!(asset.code(), "AAPL");
    assert_eq!(asset.prices()[0].code(), "MSFT");
}

#[test]
fn consistency_errors_are_fatal_even_when_skipping() {
    let repo = Arc::new(Replay(vec![bar("MSFT", 1, dec!(400))]));
    let dto = PricesQuery::new(["AAPL"], Interval::Day1, t0(), None);

    let err = GetPricesMultipleIdentities::new(repo)
        .policy(FailurePolicy::SkipAndLog)
        .execute(&dto)
        .unwrap_err();
    assert!(matches!(err, UseCaseError::Consistency(_)));
}

#[test]
fn unit_looked_up_by_code_gets_listings_and_prices() {
    let usd = |symbol: &str| Listing::new(symbol, "NASDAQ", "USD", Some(InstrumentType::Equity)).unwrap();
    let repo = Arc::new(
        InMemoryRepository::new("fixture")
            .with_units([EconomicUnit::new("ALPHABET", EconomicUnitType::Corporate).unwrap()])
            .with_listings("ALPHABET", [usd("GOOGL"), usd("GOOG")])
            .with_prices([
                bar("GOOG", 2, dec!(141)),
                bar("GOOGL", 1, dec!(139)),
                bar("GOOG", 1, dec!(140)),
            ]),
    );

    let unit = repo.get_by_code("alphabet").unwrap().unwrap();
    let unit = BuildEconomicUnitWithListings::new(repo.clone(), repo)
        .execute(unit, Interval::Day1, TimeWindow::since(t0()))
        .unwrap();

    assert_eq!(unit.listings().len(), 2);
    let closes: Vec<_> = unit.prices().iter().map(|b| (b.code(), b.close())).collect();
    assert_eq!(
        closes,
        vec![("GOOGL", dec!(139)), ("GOOG", dec!(140)), ("GOOG", dec!(141))]
    );
}

proptest! {
    #[test]
    fn built_asset_is_always_sorted(offsets in prop::collection::vec(0..10_000i64, 0..50)) {
        let bars: Vec<_> = offsets
            .iter()
            .map(|&m| {
                RawPriceBar::new("AAPL", "1d", t0() + Duration::minutes(m), m)
                    .build()
                    .unwrap()
            })
            .collect();
        let repo = Arc::new(Replay(bars));
        let query = PriceQuery::new("AAPL", Interval::Day1, TimeWindow::since(t0())).unwrap();

        let asset = BuildAssetWithPrices::new(repo).execute(&query).unwrap();

        prop_assert_eq!(asset.prices().len(), offsets.len());
        for pair in asset.prices().windows(2) {
            prop_assert!(pair[0].ts() <= pair[1].ts());
        }
    }
}
