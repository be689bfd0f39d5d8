// tests/property/admission_test.rs

//! The admission chain never dispatches a request it should have refused.

use bytes::Bytes;
use proptest::prelude::*;
use spinelproxy::core::ProxyError;
use spinelproxy::core::commands::CommandTable;
use spinelproxy::core::handler::admission::{Verdict, admit};
use spinelproxy::core::protocol::Request;
use spinelproxy::core::state::BlackKeys;
use std::time::Duration;

const KEYED_COMMANDS: &[&str] = &["get", "set", "incr", "hget", "lpush", "zadd", "expire"];

fn request(name: &str, args: &[Vec<u8>]) -> Request {
    let mut parts = vec![Bytes::from(name.to_string())];
    parts.extend(args.iter().map(|a| Bytes::from(a.clone())));
    Request::new(parts)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 200,
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_blacked_key_is_always_rejected(
        name in prop::sample::select(KEYED_COMMANDS),
        key in prop::collection::vec(any::<u8>(), 1..32),
        rest in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..8), 1..3),
    ) {
        let table = CommandTable::standard();
        let black_keys = BlackKeys::new();
        black_keys.insert(Bytes::from(key.clone()), Duration::from_secs(60));

        let mut args = vec![key];
        args.extend(rest);
        let req = request(name, &args);
        let verdict = admit(&table, &black_keys, &req);

        // Arity may reject first; dispatch never happens.
        prop_assert!(matches!(
            verdict,
            Verdict::Reject(ProxyError::KeyBlocked(_))
                | Verdict::Reject(ProxyError::WrongArgumentCount(_))
        ), "{:?}", verdict);
    }

    #[test]
    fn test_unknown_names_are_bad_commands(name in "[a-z]{12,20}") {
        let table = CommandTable::standard();
        let req = request(&name, &[b"k".to_vec()]);
        prop_assert_eq!(
            admit(&table, &BlackKeys::new(), &req),
            Verdict::Reject(ProxyError::BadCommand)
        );
    }

    #[test]
    fn test_admission_is_case_insensitive(upper in any::<bool>(), key in "[a-z]{1,10}") {
        let table = CommandTable::standard();
        let name = if upper { "GET" } else { "get" };
        let req = request(name, &[key.into_bytes()]);
        prop_assert!(matches!(
            admit(&table, &BlackKeys::new(), &req),
            Verdict::Dispatch(_)
        ));
    }

    #[test]
    fn test_arity_bounds_hold_for_every_rule(extra in 1usize..4) {
        let table = CommandTable::standard();
        let black_keys = BlackKeys::new();
        for entry in table.entries() {
            let args_for = |len: usize| vec![b"k".to_vec(); len - 1];

            if entry.min_args > 1 {
                let short = request(entry.name, &args_for(entry.min_args - 1));
                prop_assert_eq!(
                    admit(&table, &black_keys, &short),
                    Verdict::Reject(ProxyError::WrongArgumentCount(entry.name.to_ascii_lowercase()))
                );
            }

            let within = request(entry.name, &args_for(entry.min_args));
            prop_assert_eq!(
                admit(&table, &black_keys, &within),
                Verdict::Dispatch(entry.handler)
            );

            if let Some(max) = entry.max_args {
                let long = request(entry.name, &args_for(max + extra));
                prop_assert_eq!(
                    admit(&table, &black_keys, &long),
                    Verdict::Reject(ProxyError::WrongArgumentCount(entry.name.to_ascii_lowercase()))
                );
            }
        }
    }
}
