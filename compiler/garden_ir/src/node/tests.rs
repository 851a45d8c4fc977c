use super::*;
use pretty_assertions::assert_eq;

#[test]
fn test_float_literal_normalization() {
    assert_eq!(Literal::float(-0.0), Literal::float(0.0));
    assert_eq!(Literal::float(f64::NAN), Literal::float(-f64::NAN));
    assert_eq!(Literal::float(1.5).as_float(), Some(1.5));
    assert_eq!(Literal::Int(1).as_float(), None);
}

#[test]
fn test_operator_symbol_roundtrip() {
    for op in Operator::ALL {
        assert_eq!(Operator::from_symbol(op.symbol()), Some(op));
    }
    assert_eq!(Operator::from_symbol("+="), None);
}

#[test]
fn test_operator_tags_unique() {
    let mut tags: Vec<u8> = Operator::ALL.iter().map(|op| op.tag()).collect();
    tags.sort_unstable();
    tags.dedup();
    assert_eq!(tags.len(), Operator::ALL.len());
}

#[test]
fn test_binder() {
    let x = Name::from_raw(1);
    assert_eq!(NodeKind::Def(x).binder(), Some(x));
    assert_eq!(NodeKind::Let(x).binder(), Some(x));
    assert_eq!(NodeKind::Symbol(x).binder(), None);
}

#[test]
fn test_node_id_hex() {
    let mut bytes = [0u8; 32];
    bytes[0] = 0xab;
    bytes[31] = 0x01;
    let id = NodeId::from_bytes(bytes);
    let hex = id.to_hex();
    assert_eq!(hex.len(), 64);
    assert!(hex.starts_with("ab00"));
    assert!(hex.ends_with("01"));
    assert_eq!(id.to_string(), "ab0000000000");
    assert_eq!(hex.parse::<NodeId>(), Ok(id));
}

#[test]
fn test_node_id_parse_errors() {
    assert_eq!("abc".parse::<NodeId>(), Err(ParseNodeIdError::Length(3)));
    let bad = "z".repeat(64);
    assert_eq!(bad.parse::<NodeId>(), Err(ParseNodeIdError::Digit));
}
