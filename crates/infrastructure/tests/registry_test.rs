mod helpers;

use ferrous_mdns_domain::dns_record::CLASS_IN;
use ferrous_mdns_domain::{DnsQuestion, DomainError, RecordType, SERVICE_TYPE_ENUMERATION};
use ferrous_mdns_infrastructure::dns::ServiceRegistry;
use helpers::{test_service, TEST_TYPE};

fn question(name: &str, record_type: RecordType) -> DnsQuestion {
    DnsQuestion::new(name, record_type, CLASS_IN)
}

fn registry_with(instances: &[&str]) -> ServiceRegistry {
    let registry = ServiceRegistry::new();
    for instance in instances {
        registry.add(test_service(instance).with_ttl(120)).unwrap();
    }
    registry
}

#[test]
fn test_add_rejects_duplicate_name_ignoring_case() {
    let registry = registry_with(&["Web"]);

    let duplicate = test_service("WEB");
    assert!(matches!(
        registry.add(duplicate),
        Err(DomainError::NonUniqueName(_))
    ));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_update_requires_registration() {
    let registry = ServiceRegistry::new();
    assert!(matches!(
        registry.update(test_service("Web")),
        Err(DomainError::ServiceNotRegistered(_))
    ));
}

#[test]
fn test_lookup_by_type_and_server() {
    let registry = registry_with(&["One", "Two"]);

    assert_eq!(registry.get_infos_type(TEST_TYPE).len(), 2);
    assert_eq!(registry.get_infos_server("TESTHOST.local.").len(), 2);
    assert!(registry
        .get_info_name(&format!("one.{}", TEST_TYPE))
        .is_some());
    assert!(registry.remove(&format!("One.{}", TEST_TYPE)).is_some());
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_ptr_question_answers_with_additionals() {
    let registry = registry_with(&["Web"]);

    let answer = registry.answer_query(&question(TEST_TYPE, RecordType::PTR));

    assert_eq!(answer.answers.len(), 1);
    assert_eq!(answer.answers[0].alias(), Some("Web._test._tcp.local."));
    assert_eq!(answer.answers[0].ttl, 120);
    let types: Vec<RecordType> = answer.additionals.iter().map(|r| r.record_type()).collect();
    assert_eq!(types, vec![RecordType::SRV, RecordType::TXT, RecordType::A]);
}

#[test]
fn test_enumeration_lists_each_type_once() {
    let registry = registry_with(&["One", "Two"]);

    let answer = registry.answer_query(&question(SERVICE_TYPE_ENUMERATION, RecordType::PTR));

    assert_eq!(answer.answers.len(), 1);
    assert_eq!(answer.answers[0].alias(), Some(TEST_TYPE));
}

#[test]
fn test_srv_question_adds_address() {
    let registry = registry_with(&["Web"]);

    let answer = registry.answer_query(&question("web._test._tcp.local.", RecordType::SRV));

    assert_eq!(answer.answers.len(), 1);
    assert_eq!(answer.answers[0].record_type(), RecordType::SRV);
    assert_eq!(answer.additionals.len(), 1);
    assert_eq!(answer.additionals[0].record_type(), RecordType::A);
}

#[test]
fn test_any_question_on_instance_returns_srv_and_txt() {
    let registry = registry_with(&["Web"]);

    let answer = registry.answer_query(&question("Web._test._tcp.local.", RecordType::ANY));

    let mut types: Vec<RecordType> = answer.answers.iter().map(|r| r.record_type()).collect();
    types.sort_by_key(|t| t.to_u16());
    assert_eq!(types, vec![RecordType::TXT, RecordType::SRV]);
}

#[test]
fn test_address_question_on_server() {
    let registry = registry_with(&["Web"]);

    let answer = registry.answer_query(&question("testhost.local.", RecordType::A));
    assert_eq!(answer.answers.len(), 1);

    let answer = registry.answer_query(&question("testhost.local.", RecordType::AAAA));
    assert!(answer.answers.is_empty());
}

#[test]
fn test_unrelated_question_has_no_answer() {
    let registry = registry_with(&["Web"]);

    let answer = registry.answer_query(&question("_ipp._tcp.local.", RecordType::PTR));
    assert!(answer.answers.is_empty());
    assert!(answer.additionals.is_empty());
}
