//! Property tests for range validation and dispatch.
//!
//! Uses proptest to verify:
//! 1. Ranges within a source's limit always validate
//! 2. Inverted ranges are rejected by every source
//! 3. N subscribers and one publish notify each exactly once, in order

use chrono::{Duration, NaiveDate};
use gridfeed_core::source::{ElexonBmReport, IbexDamMcr, SourceAdapter, TernaCredentials, TernaRenewable};
use gridfeed_core::{DateRange, EventManager, Record, Subscriber, SubscriberError, DATA_EMIT};
use proptest::prelude::*;
use reqwest::blocking::Client;
use std::sync::{Arc, Mutex};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_start() -> impl Strategy<Value = NaiveDate> {
    (0i64..3650).prop_map(|offset| NaiveDate::from_ymd_opt(2015, 1, 1).unwrap() + Duration::days(offset))
}

fn adapters() -> Vec<Box<dyn SourceAdapter>> {
    let client = Client::new();
    vec![
        Box::new(ElexonBmReport::new(client.clone())),
        Box::new(TernaRenewable::new(
            client.clone(),
            TernaCredentials {
                client_id: "id".into(),
                client_secret: "secret".into(),
            },
        )),
        Box::new(IbexDamMcr::new(client)),
    ]
}

// ── 1. Valid ranges ──────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Any ordered range up to a week is accepted by every source.
    #[test]
    fn week_long_ranges_always_validate(start in arb_start(), span in 0i64..=7) {
        let range = DateRange::new(start, start + Duration::days(span));
        for adapter in adapters() {
            prop_assert!(adapter.validate_range(&range).is_ok(), "{} rejected {}", adapter.name(), range);
        }
    }

    /// Only Elexon caps the span.
    #[test]
    fn long_ranges_rejected_only_by_elexon(start in arb_start(), span in 8i64..400) {
        let range = DateRange::new(start, start + Duration::days(span));
        for adapter in adapters() {
            let ok = adapter.validate_range(&range).is_ok();
            prop_assert_eq!(ok, adapter.name() != "elexon_bm_report");
        }
    }
}

// ── 2. Inverted ranges ───────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn inverted_ranges_always_fail(start in arb_start(), back in 1i64..400) {
        let range = DateRange::new(start, start - Duration::days(back));
        for adapter in adapters() {
            prop_assert!(adapter.validate_range(&range).is_err());
        }
    }
}

// ── 3. Dispatch order ────────────────────────────────────────────────

struct Recorder {
    id: usize,
    log: Arc<Mutex<Vec<usize>>>,
}

impl Subscriber for Recorder {
    fn update(&self, _records: &[Record]) -> Result<(), SubscriberError> {
        self.log.lock().unwrap().push(self.id);
        Ok(())
    }
}

proptest! {
    #[test]
    fn each_subscriber_notified_once_in_order(n in 0usize..32) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut events = EventManager::new();
        for id in 0..n {
            events.subscribe(DATA_EMIT, Arc::new(Recorder { id, log: Arc::clone(&log) }));
        }

        events.publish(DATA_EMIT, &[]).unwrap();

        let expected: Vec<usize> = (0..n).collect();
        prop_assert_eq!(&*log.lock().unwrap(), &expected);
    }
}
