use daqstream::core::channels::{physical_name, validate_channel_id};
use daqstream::core::{ChannelSet, DaqError};

#[test]
fn test_duplicates_collapse_and_ids_sort() {
    let set = ChannelSet::new(["ai3", "ai1", "ai3"]).unwrap();
    assert_eq!(set.as_slice(), &["ai1".to_string(), "ai3".to_string()]);
    assert_eq!(set.len(), 2);
}

#[test]
fn test_supply_order_does_not_matter() {
    let a = ChannelSet::new(["ai2", "ai0", "ai7"]).unwrap();
    let b = ChannelSet::new(["ai7", "ai2", "ai0"]).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.index_of("ai0"), Some(0));
    assert_eq!(a.index_of("ai7"), Some(2));
    assert_eq!(a.index_of("ai5"), None);
}

#[test]
fn test_empty_set_is_rejected() {
    let result = ChannelSet::new(Vec::<String>::new());
    assert!(matches!(result, Err(DaqError::Configuration(_))));
}

#[test]
fn test_ids_that_break_csv_are_rejected() {
    assert!(validate_channel_id("ai0").is_ok());
    assert!(validate_channel_id("ai,0").is_err());
    assert!(validate_channel_id("ai 0").is_err());
    assert!(validate_channel_id("").is_err());
    assert!(ChannelSet::new(["ai0", "a\"b"]).is_err());
}

#[test]
fn test_header_and_physical_names() {
    let set = ChannelSet::new(["ai1", "ai0"]).unwrap();
    assert_eq!(set.header(), vec!["time", "ai0", "ai1"]);
    assert_eq!(set.physical_names("Dev1"), vec!["/Dev1/ai0", "/Dev1/ai1"]);
    assert_eq!(physical_name("/Dev2/", "ai4"), "/Dev2/ai4");
}

#[test]
fn test_json_round_trip_normalizes() {
    let set: ChannelSet = serde_json::from_str(r#"["ai2", "ai0", "ai2"]"#).unwrap();
    assert_eq!(serde_json::to_string(&set).unwrap(), r#"["ai0","ai2"]"#);

    let bad: Result<ChannelSet, _> = serde_json::from_str("[]");
    assert!(bad.is_err());
}
