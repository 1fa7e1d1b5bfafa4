use ferrous_mdns_domain::dns_record::CLASS_IN;
use ferrous_mdns_domain::{DnsQuestion, DnsRecord, DomainError, RecordData, RecordType};
use ferrous_mdns_infrastructure::dns::wire::{FLAGS_TC, HEADER_LEN};
use ferrous_mdns_infrastructure::dns::{DnsIncoming, DnsOutgoing};

fn sample_records() -> Vec<DnsRecord> {
    vec![
        DnsRecord::pointer("_http._tcp.local.", "Web._http._tcp.local.", 120),
        DnsRecord::service("Web._http._tcp.local.", 0, 0, 80, "host.local.", 120),
        DnsRecord::text("Web._http._tcp.local.", b"\x0apath=/home".to_vec(), 120),
        DnsRecord::address("host.local.", "192.168.1.20".parse().unwrap(), 120),
        DnsRecord::address("host.local.", "fe80::1".parse().unwrap(), 120),
        DnsRecord::host_info("host.local.", "ARM64", "Linux", 120),
    ]
}

#[test]
fn test_round_trip_preserves_questions_and_answers() {
    let mut out = DnsOutgoing::response();
    out.add_question(DnsQuestion::new("_http._tcp.local.", RecordType::PTR, CLASS_IN));
    for record in sample_records() {
        out.add_answer_at_time(record, None);
    }

    let incoming = DnsIncoming::parse(&out.packet().unwrap());

    assert!(incoming.is_valid());
    assert!(incoming.is_response());
    assert_eq!(incoming.questions, out.questions);
    assert_eq!(incoming.answers.len(), out.answers.len());
    for (decoded, original) in incoming.answers.iter().zip(out.answers.iter()) {
        assert!(decoded.same_identity(original), "{} != {}", decoded, original);
        assert_eq!(decoded.ttl, original.ttl);
    }
}

#[test]
fn test_round_trip_of_every_section() {
    let mut out = DnsOutgoing::query();
    out.add_question(DnsQuestion::new("Web._http._tcp.local.", RecordType::ANY, CLASS_IN));
    out.add_answer_at_time(sample_records()[0].clone(), None);
    out.add_authoritative_answer(sample_records()[1].clone());
    out.add_additional_answer(sample_records()[3].clone());

    let incoming = DnsIncoming::parse(&out.packet().unwrap());

    assert!(incoming.is_query());
    assert_eq!(incoming.questions.len(), 1);
    assert_eq!(incoming.answers.len(), 1);
    assert_eq!(incoming.authorities.len(), 1);
    assert_eq!(incoming.additionals.len(), 1);
    assert!(incoming.authorities[0].same_identity(&out.authorities[0]));
}

#[test]
fn test_header_has_zero_id_and_counts() {
    let mut out = DnsOutgoing::response();
    for record in sample_records() {
        out.add_answer_at_time(record, None);
    }
    let bytes = out.packet().unwrap();

    assert_eq!(&bytes[0..2], &[0, 0]);
    assert_eq!(u16::from_be_bytes([bytes[2], bytes[3]]), 0x8400);
    assert_eq!(u16::from_be_bytes([bytes[6], bytes[7]]), 6);
}

#[test]
fn test_packet_is_deterministic() {
    let mut out = DnsOutgoing::response();
    for record in sample_records() {
        out.add_answer_at_time(record, None);
    }
    assert_eq!(out.packet().unwrap(), out.packet().unwrap());
}

#[test]
fn test_label_longer_than_63_bytes_fails() {
    let long_label = "x".repeat(64);
    let mut out = DnsOutgoing::query();
    out.add_question(DnsQuestion::new(
        format!("{}.local.", long_label),
        RecordType::A,
        CLASS_IN,
    ));

    assert!(matches!(out.packet(), Err(DomainError::NamePartTooLong(_))));
}

#[test]
fn test_many_short_labels_within_budget_succeed() {
    let name = format!("{}local.", "a.".repeat(100));
    let mut out = DnsOutgoing::query();
    out.add_question(DnsQuestion::new(name.clone(), RecordType::A, CLASS_IN));

    let incoming = DnsIncoming::parse(&out.packet().unwrap());
    assert!(incoming.is_valid());
    assert_eq!(incoming.questions[0].name, name);
}

#[test]
fn test_name_longer_than_255_bytes_fails() {
    let name = format!("{}local.", "abcdefghij.".repeat(24));
    let mut out = DnsOutgoing::query();
    out.add_question(DnsQuestion::new(name, RecordType::A, CLASS_IN));

    assert!(matches!(out.packet(), Err(DomainError::NamePartTooLong(_))));
}

#[test]
fn test_hinfo_string_longer_than_255_bytes_fails() {
    let mut out = DnsOutgoing::response();
    out.add_answer_at_time(
        DnsRecord::host_info("host.local.", "C".repeat(257), "Linux", 120),
        None,
    );

    assert!(matches!(out.packet(), Err(DomainError::NamePartTooLong(_))));
}

#[test]
fn test_garbage_is_invalid_not_an_error() {
    let incoming = DnsIncoming::parse(b"\x00\x00\x84\x00\x00\x01\x00\x00\x00\x00\x00\x00\x3fbroken");

    assert!(!incoming.is_valid());
    assert!(incoming.error().is_some());
    assert!(incoming.questions.is_empty());
}

#[test]
fn test_unknown_type_is_kept_apart_from_answers() {
    let mut bytes = vec![0, 0, 0x84, 0, 0, 0, 0, 2, 0, 0, 0, 0];
    // root name, TYPE99, IN, ttl 60, 2 bytes of data
    bytes.extend_from_slice(&[0, 0, 99, 0, 1, 0, 0, 0, 60, 0, 2, 0xAB, 0xCD]);
    // a.local. A 10.0.0.1
    bytes.extend_from_slice(b"\x01a\x05local\x00");
    bytes.extend_from_slice(&[0, 1, 0, 1, 0, 0, 0, 60, 0, 4, 10, 0, 0, 1]);

    let incoming = DnsIncoming::parse(&bytes);

    assert!(incoming.is_valid());
    assert_eq!(incoming.answers.len(), 1);
    assert_eq!(incoming.answers[0].record_type(), RecordType::A);
    assert_eq!(incoming.unknown.len(), 1);
    assert_eq!(incoming.unknown[0].record_type(), RecordType::Other(99));
    assert_eq!(incoming.unknown[0].data, RecordData::Unknown(vec![0xAB, 0xCD]));
}

#[test]
fn test_rdata_overrun_is_invalid() {
    let mut bytes = vec![0, 0, 0x84, 0, 0, 0, 0, 1, 0, 0, 0, 0];
    // SRV claiming 3 bytes of rdata but carrying a full SRV body
    bytes.extend_from_slice(b"\x01a\x05local\x00");
    bytes.extend_from_slice(&[0, 33, 0, 1, 0, 0, 0, 60, 0, 3]);
    bytes.extend_from_slice(&[0, 0, 0, 0, 0, 80, 0]);

    assert!(!DnsIncoming::parse(&bytes).is_valid());
}

#[test]
fn test_multicast_sets_cache_flush_on_unique_records_only() {
    let mut out = DnsOutgoing::response();
    out.add_answer_at_time(sample_records()[0].clone(), None);
    out.add_answer_at_time(sample_records()[3].clone(), None);

    let incoming = DnsIncoming::parse(&out.packet().unwrap());
    assert!(!incoming.answers[0].entry.unique);
    assert!(incoming.answers[1].entry.unique);

    let unicast = out.clone().with_multicast(false);
    let incoming = DnsIncoming::parse(&unicast.packet().unwrap());
    assert!(!incoming.answers[1].entry.unique);
}

#[test]
fn test_message_split_across_packets_within_budget() {
    let mut out = DnsOutgoing::response();
    for i in 0..200 {
        out.add_answer_at_time(
            DnsRecord::pointer("_http._tcp.local.", format!("Instance {}._http._tcp.local.", i), 120),
            None,
        );
    }

    let packets = out.packets(512).unwrap();

    assert!(packets.len() > 1);
    assert!(packets.iter().all(|packet| packet.bytes.len() <= 512));
    assert!(packets.last().unwrap().complete);
    let total: usize = packets
        .iter()
        .map(|packet| DnsIncoming::parse(&packet.bytes).answers.len())
        .sum();
    assert_eq!(total, 200);
}

#[test]
fn test_split_query_sets_truncated_bit_until_last_packet() {
    let mut out = DnsOutgoing::query();
    out.add_question(DnsQuestion::new("_http._tcp.local.", RecordType::PTR, CLASS_IN));
    for i in 0..100 {
        out.add_answer_at_time(
            DnsRecord::pointer("_http._tcp.local.", format!("Known {}._http._tcp.local.", i), 120),
            None,
        );
    }

    let packets = out.packets(512).unwrap();
    let (last, rest) = packets.split_last().unwrap();

    for packet in rest {
        let flags = u16::from_be_bytes([packet.bytes[2], packet.bytes[3]]);
        assert_eq!(flags & FLAGS_TC, FLAGS_TC);
    }
    let flags = u16::from_be_bytes([last.bytes[2], last.bytes[3]]);
    assert_eq!(flags & FLAGS_TC, 0);
}

#[test]
fn test_entry_larger_than_budget_is_skipped_and_reported() {
    let mut text = Vec::new();
    for _ in 0..3 {
        text.push(200u8);
        text.extend(std::iter::repeat(b'x').take(200));
    }
    let mut out = DnsOutgoing::response();
    out.add_answer_at_time(DnsRecord::text("Big._http._tcp.local.", text, 120), None);
    out.add_answer_at_time(sample_records()[0].clone(), None);

    let packets = out.packets(512).unwrap();

    assert_eq!(packets.len(), 1);
    assert_eq!(packets[0].oversized, vec!["Big._http._tcp.local.".to_string()]);
    assert_eq!(DnsIncoming::parse(&packets[0].bytes).answers.len(), 1);
    assert!(packets[0].bytes.len() > HEADER_LEN);
}

#[test]
fn test_known_answer_suppression() {
    let candidate = DnsRecord::pointer("_http._tcp.local.", "Web._http._tcp.local.", 120);
    let query_with = |known: DnsRecord| {
        let mut out = DnsOutgoing::query();
        out.add_question(DnsQuestion::new("_http._tcp.local.", RecordType::PTR, CLASS_IN));
        out.add_answer_at_time(known, None);
        DnsIncoming::parse(&out.packet().unwrap())
    };

    let same_ttl = query_with(candidate.clone());
    assert!(!DnsOutgoing::response().add_answer(&same_ttl, candidate.clone()));

    let half_ttl = query_with(candidate.clone().with_ttl(60));
    assert!(DnsOutgoing::response().add_answer(&half_ttl, candidate.clone()));

    let other_name = query_with(DnsRecord::pointer(
        "_ipp._tcp.local.",
        "Web._http._tcp.local.",
        120,
    ));
    assert!(DnsOutgoing::response().add_answer(&other_name, candidate.clone()));

    let other_type = query_with(DnsRecord::text(
        "_http._tcp.local.",
        b"\x16Web._http._tcp.local.".to_vec(),
        120,
    ));
    assert!(DnsOutgoing::response().add_answer(&other_type, candidate));
}
