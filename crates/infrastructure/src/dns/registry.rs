use ferrous_mdns_domain::{
    service_type_name, DnsQuestion, DnsRecord, DomainError, RecordType, ServiceInfo,
    DEFAULT_TTL, SERVICE_TYPE_ENUMERATION,
};
use rustc_hash::FxHashMap;
use std::sync::RwLock;

/// Records answering one question: the answers proper plus what the asker
/// would otherwise have to query for next.
#[derive(Debug, Default, Clone)]
pub struct QueryAnswer {
    pub answers: Vec<DnsRecord>,
    pub additionals: Vec<DnsRecord>,
}

impl QueryAnswer {
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}

/// Services published by this host, keyed by lowercased instance name.
pub struct ServiceRegistry {
    services: RwLock<FxHashMap<String, ServiceInfo>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self {
            services: RwLock::new(FxHashMap::default()),
        }
    }

    pub fn add(&self, info: ServiceInfo) -> Result<(), DomainError> {
        let mut services = self.services.write().unwrap_or_else(|e| e.into_inner());
        let key = info.key();
        if services.contains_key(&key) {
            return Err(DomainError::NonUniqueName(info.name));
        }
        services.insert(key, info);
        Ok(())
    }

    pub fn remove(&self, name: &str) -> Option<ServiceInfo> {
        self.services
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&name.to_ascii_lowercase())
    }

    /// Replace a registered service; returns the previous version.
    pub fn update(&self, info: ServiceInfo) -> Result<ServiceInfo, DomainError> {
        let mut services = self.services.write().unwrap_or_else(|e| e.into_inner());
        match services.get_mut(&info.key()) {
            Some(current) => Ok(std::mem::replace(current, info)),
            None => Err(DomainError::ServiceNotRegistered(info.name)),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.services
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(&name.to_ascii_lowercase())
    }

    pub fn get_info_name(&self, name: &str) -> Option<ServiceInfo> {
        self.services
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&name.to_ascii_lowercase())
            .cloned()
    }

    pub fn get_infos_type(&self, service_type: &str) -> Vec<ServiceInfo> {
        let services = self.services.read().unwrap_or_else(|e| e.into_inner());
        services
            .values()
            .filter(|info| info.service_type.eq_ignore_ascii_case(service_type))
            .cloned()
            .collect()
    }

    pub fn get_infos_server(&self, server: &str) -> Vec<ServiceInfo> {
        let services = self.services.read().unwrap_or_else(|e| e.into_inner());
        services
            .values()
            .filter(|info| info.server.eq_ignore_ascii_case(server))
            .cloned()
            .collect()
    }

    /// Distinct base service types with at least one registration.
    pub fn get_types(&self) -> Vec<String> {
        let services = self.services.read().unwrap_or_else(|e| e.into_inner());
        let mut types: Vec<String> = services
            .values()
            .map(|info| {
                service_type_name(&info.service_type)
                    .unwrap_or_else(|_| info.service_type.clone())
                    .to_ascii_lowercase()
            })
            .collect();
        types.sort();
        types.dedup();
        types
    }

    pub fn infos(&self) -> Vec<ServiceInfo> {
        self.services
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.services
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Locally owned records matching `question`.
    pub fn answer_query(&self, question: &DnsQuestion) -> QueryAnswer {
        let mut answer = QueryAnswer::default();
        let wants = |record_type: RecordType| question.record_type.matches(record_type);

        if wants(RecordType::PTR) && question.name.eq_ignore_ascii_case(SERVICE_TYPE_ENUMERATION)
        {
            for service_type in self.get_types() {
                answer.answers.push(DnsRecord::pointer(
                    SERVICE_TYPE_ENUMERATION,
                    service_type,
                    DEFAULT_TTL,
                ));
            }
        }

        let services = self.services.read().unwrap_or_else(|e| e.into_inner());
        for info in services.values() {
            if wants(RecordType::PTR) && info.service_type.eq_ignore_ascii_case(&question.name) {
                answer.answers.push(info.ptr_record(info.ttl));
                answer.additionals.push(info.srv_record(info.ttl));
                answer.additionals.push(info.txt_record(info.ttl));
                answer.additionals.extend(info.address_record(info.ttl));
            }

            if info.name.eq_ignore_ascii_case(&question.name) {
                if wants(RecordType::SRV) {
                    answer.answers.push(info.srv_record(info.ttl));
                    if question.record_type == RecordType::SRV {
                        answer.additionals.extend(info.address_record(info.ttl));
                    }
                }
                if wants(RecordType::TXT) {
                    answer.answers.push(info.txt_record(info.ttl));
                }
            }

            if info.server.eq_ignore_ascii_case(&question.name) {
                if let Some(address) = info.address_record(info.ttl) {
                    if wants(address.record_type()) {
                        answer.answers.push(address);
                    }
                }
            }
        }
        drop(services);

        answer
            .answers
            .retain(|record| question.answered_by(record));
        answer
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
