use phone_enrich_engine::{EnrichError, Window, WindowConfig};
use proptest::prelude::*;

fn selector() -> impl Strategy<Value = WindowConfig> {
    prop_oneof![
        Just(WindowConfig::default()),
        (1usize..40).prop_map(|n| WindowConfig {
            limit: Some(n),
            ..Default::default()
        }),
        (1usize..40).prop_map(|n| WindowConfig {
            last: Some(n),
            ..Default::default()
        }),
        (proptest::option::of(1usize..40), proptest::option::of(1usize..40)).prop_map(
            |(from_row, to_row)| WindowConfig {
                from_row,
                to_row,
                ..Default::default()
            }
        ),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn resolved_windows_stay_inside_the_table(config in selector(), rows in 1usize..30) {
        match Window::resolve(&config, rows) {
            Ok(window) => {
                prop_assert!(window.start >= 1);
                prop_assert!(window.start <= window.end);
                prop_assert!(window.end <= rows);
                if let Some(limit) = config.limit {
                    prop_assert_eq!(window.len(), limit.min(rows));
                }
                if let Some(last) = config.last {
                    prop_assert_eq!(window.len(), last);
                    prop_assert_eq!(window.end, rows);
                }
            }
            Err(err) => prop_assert!(matches!(err, EnrichError::Range(_)), "{}", err),
        }
    }

    #[test]
    fn two_selectors_never_resolve(limit in 1usize..10, last in 1usize..10, from in 1usize..10) {
        let both = WindowConfig { limit: Some(limit), last: Some(last), ..Default::default() };
        prop_assert!(matches!(Window::resolve(&both, 20), Err(EnrichError::Config(_))));
        let mixed = WindowConfig { from_row: Some(from), limit: Some(limit), ..Default::default() };
        prop_assert!(matches!(Window::resolve(&mixed, 20), Err(EnrichError::Config(_))));
    }
}
