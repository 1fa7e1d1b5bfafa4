use ferrous_mdns_domain::{DomainError, PropertyValue, TxtProperties};

#[test]
fn test_properties_encode_as_key_value_strings() {
    let properties: TxtProperties = [("path", PropertyValue::from("/~paulsm/"))]
        .into_iter()
        .collect();

    let text = properties.encode().unwrap();

    assert_eq!(text, b"\x0epath=/~paulsm/".to_vec());
}

#[test]
fn test_empty_properties_encode_as_single_empty_string() {
    assert_eq!(TxtProperties::new().encode().unwrap(), vec![0]);
    assert!(TxtProperties::decode(&[0]).is_empty());
}

#[test]
fn test_decode_value_rules() {
    let text = b"\x04flag\x09prop_true\x08prop_x=y\x0cprop_on=true\x0eprop_off=false";
    let properties = TxtProperties::decode(text);

    assert_eq!(properties.get("flag"), Some(&PropertyValue::Bool(true)));
    assert_eq!(properties.get("prop_true"), Some(&PropertyValue::Bool(true)));
    assert_eq!(properties.get("prop_on"), Some(&PropertyValue::Bool(true)));
    assert_eq!(properties.get("prop_off"), Some(&PropertyValue::Bool(false)));
    assert_eq!(
        properties.get("prop_x"),
        Some(&PropertyValue::Bytes(b"y".to_vec()))
    );
}

#[test]
fn test_blank_value_decodes_false() {
    let properties = TxtProperties::decode(b"\x0aprop_none=");
    assert_eq!(properties.get("prop_none"), Some(&PropertyValue::Bool(false)));
}

#[test]
fn test_encode_then_decode_keeps_order_and_values() {
    let mut properties = TxtProperties::new();
    properties.insert("prop_string", "a_prop");
    properties.insert("prop_true", true);
    properties.insert("prop_false", false);
    properties.insert("prop_bytes", b"\x01\x02".as_slice());

    let decoded = TxtProperties::decode(&properties.encode().unwrap());

    let keys: Vec<&[u8]> = decoded.iter().map(|(k, _)| k).collect();
    assert_eq!(
        keys,
        vec![
            b"prop_string".as_slice(),
            b"prop_true".as_slice(),
            b"prop_false".as_slice(),
            b"prop_bytes".as_slice()
        ]
    );
    assert_eq!(decoded.get("prop_true"), Some(&PropertyValue::Bool(true)));
    assert_eq!(decoded.get("prop_false"), Some(&PropertyValue::Bool(false)));
    assert_eq!(
        decoded.get("prop_bytes"),
        Some(&PropertyValue::Bytes(vec![1, 2]))
    );
}

#[test]
fn test_insert_replaces_existing_key_in_place() {
    let mut properties = TxtProperties::new();
    properties.insert("a", "1");
    properties.insert("b", "2");
    properties.insert("a", "3");

    assert_eq!(properties.len(), 2);
    assert_eq!(properties.iter().next().unwrap().0, b"a");
    assert_eq!(properties.get("a").unwrap().as_str(), Some("3"));
    assert_eq!(properties.remove("b").unwrap().as_str(), Some("2"));
}

#[test]
fn test_oversized_property_is_rejected() {
    let mut properties = TxtProperties::new();
    properties.insert("k", "v".repeat(254));

    assert!(matches!(
        properties.encode(),
        Err(DomainError::NamePartTooLong(_))
    ));
}
