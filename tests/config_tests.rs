use go_test_report::config::{grouping_policy, ConfigError, IndicatorSize};
use go_test_report::report::GroupingPolicy;

#[test]
fn single_value_sets_width_and_height() {
    let size: IndicatorSize = "24".parse().unwrap();
    assert_eq!(size, IndicatorSize { width: 24, height: 24 });
    assert_eq!(size.width_px(), "24px");
    assert_eq!(size.height_px(), "24px");
}

#[test]
fn width_by_height() {
    let size: IndicatorSize = "24x16".parse().unwrap();
    assert_eq!((size.width_px(), size.height_px()), ("24px".to_string(), "16px".to_string()));
    let upper: IndicatorSize = "20X10".parse().unwrap();
    assert_eq!(upper, IndicatorSize { width: 20, height: 10 });
}

#[test]
fn more_than_one_separator_is_malformed() {
    let err = "10xx19".parse::<IndicatorSize>().unwrap_err();
    assert_eq!(err, ConfigError::MalformedSize);
    assert_eq!(
        err.to_string(),
        "malformed size value; only one x is allowed if specifying width and height"
    );
}

#[test]
fn non_numeric_components_are_named() {
    match "Bx27".parse::<IndicatorSize>().unwrap_err() {
        ConfigError::InvalidSize { component, .. } => assert_eq!(component, "b"),
        other => panic!("unexpected error: {other}"),
    }
    match "10xA".parse::<IndicatorSize>().unwrap_err() {
        ConfigError::InvalidSize { component, .. } => assert_eq!(component, "a"),
        other => panic!("unexpected error: {other}"),
    }
    match "x".parse::<IndicatorSize>().unwrap_err() {
        ConfigError::InvalidSize { component, .. } => assert_eq!(component, ""),
        other => panic!("unexpected error: {other}"),
    }
    assert!("-4".parse::<IndicatorSize>().is_err());
}

#[test]
fn group_size_must_be_positive() {
    assert_eq!(grouping_policy(0, false), Err(ConfigError::GroupSize));
    assert_eq!(grouping_policy(32, false), Ok(GroupingPolicy::Window(32)));
    assert_eq!(grouping_policy(0, true), Ok(GroupingPolicy::ByGroup));
}
