use std::cmp::Ordering;

use ipnetwork::Ipv4Network;
use rovsim::prefix::{is_subnet, Prefix, SubnetRelation};
use rovsim::shared::PrefixError;

#[test]
fn test_parse_valid() {
    let p = Prefix::parse("192.168.1.0/24").unwrap();
    assert_eq!(p.octets(), [192, 168, 1, 0]);
    assert_eq!(p.mask(), 24);
    assert_eq!(p.to_string(), "192.168.1.0/24");
    assert_eq!(p.as_u32(), 0xC0A8_0100);
}

#[test]
fn test_parse_rejects_malformed_text() {
    for text in [
        "10.0.0/24",
        "10.0.0.0.0/24",
        "10.0.0.0",
        "10.0.0.0/33",
        "10.0.0.256/24",
        "10.a.0.0/8",
        "10.0.0.0/x",
        "+10.0.0.0/24",
        "10.0.0.0/+24",
        "10.0.+1.0/24",
        "",
    ] {
        assert_eq!(
            Prefix::parse(text),
            Err(PrefixError::InvalidFormat(text.to_string())),
            "{:?} should be rejected",
            text
        );
    }
}

#[test]
fn test_normalization_is_idempotent() {
    for text in [
        "10.1.2.3/8",
        "172.16.255.1/12",
        "192.168.77.200/20",
        "8.8.8.8/32",
        "1.2.3.4/0",
        "203.0.113.77/27",
    ] {
        let once = Prefix::parse(text).unwrap();
        let twice = Prefix::parse(&once.to_string()).unwrap();
        assert_eq!(once, twice);

        let host_mask = if once.mask() == 32 {
            0
        } else {
            u32::MAX >> once.mask()
        };
        assert_eq!(once.as_u32() & host_mask, 0, "host bits left in {}", once);
    }
}

#[test]
fn test_textual_variants_compare_equal() {
    let a: Prefix = "10.0.0.1/24".parse().unwrap();
    let b: Prefix = "10.0.0.200/24".parse().unwrap();
    assert_eq!(a, b);
    assert_eq!(a.cmp(&b), Ordering::Equal);
}

#[test]
fn test_ordering() {
    let mut prefixes: Vec<Prefix> = ["10.1.0.0/16", "10.0.0.0/24", "9.0.0.0/8", "10.0.0.0/8"]
        .iter()
        .map(|t| t.parse().unwrap())
        .collect();
    prefixes.sort();
    let sorted: Vec<String> = prefixes.iter().map(|p| p.to_string()).collect();
    assert_eq!(
        sorted,
        vec!["9.0.0.0/8", "10.0.0.0/8", "10.0.0.0/24", "10.1.0.0/16"]
    );
}

#[test]
fn test_subnet_relationship() {
    let p8 = Prefix::parse("10.0.0.0/8").unwrap();
    let p16 = Prefix::parse("10.20.0.0/16").unwrap();
    let p20 = Prefix::parse("10.20.16.0/20").unwrap();
    let other = Prefix::parse("11.0.0.0/8").unwrap();

    assert_eq!(p16.subnet_relationship(&p8), SubnetRelation::MoreSpecific);
    assert_eq!(p8.subnet_relationship(&p16), SubnetRelation::LessSpecific);
    assert_eq!(p16.subnet_relationship(&p16), SubnetRelation::Equal);
    assert_eq!(p8.subnet_relationship(&other), SubnetRelation::Disjoint);
    assert_eq!(p20.subnet_relationship(&p16), SubnetRelation::MoreSpecific);

    let sibling = Prefix::parse("10.20.32.0/20").unwrap();
    assert_eq!(p20.subnet_relationship(&sibling), SubnetRelation::Disjoint);
    assert!(p8.contains(&p20));
    assert!(!p20.contains(&p8));
}

#[test]
fn test_is_subnet_utility() {
    assert_eq!(is_subnet("10.0.0.0/8", "10.1.0.0/16"), Ok(true));
    assert_eq!(is_subnet("10.1.0.0/16", "10.0.0.0/8"), Ok(false));
    assert_eq!(is_subnet("10.0.0.0/8", "10.0.0.0/8"), Ok(false));
    assert!(is_subnet("10.0.0.0/8", "bogus").is_err());
}

#[test]
fn test_ipnetwork_conversion() {
    let p = Prefix::parse("198.51.100.0/24").unwrap();
    let net = Ipv4Network::try_from(p).unwrap();
    assert_eq!(net.prefix(), 24);
    assert_eq!(Prefix::from(net), p);

    let host_bits: Ipv4Network = "198.51.100.9/24".parse().unwrap();
    assert_eq!(Prefix::from(host_bits), p);
}

#[test]
fn test_serde_as_string() {
    let p = Prefix::parse("10.0.0.0/24").unwrap();
    let json = serde_json::to_string(&p).unwrap();
    assert_eq!(json, "\"10.0.0.0/24\"");
    let back: Prefix = serde_json::from_str("\"10.0.0.7/24\"").unwrap();
    assert_eq!(back, p);
    assert!(serde_json::from_str::<Prefix>("\"10.0.0/24\"").is_err());
}
