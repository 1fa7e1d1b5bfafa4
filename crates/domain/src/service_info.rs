use crate::dns_record::DnsRecord;
use crate::errors::DomainError;
use crate::service_name::{service_type_name, split_instance_name, validate_domain_name};
use crate::txt_properties::TxtProperties;
use std::net::IpAddr;

/// TTL applied to published records when the caller does not choose one.
pub const DEFAULT_TTL: u32 = 60 * 60;

/// Everything needed to publish or describe one DNS-SD service instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    /// `_http._tcp.local.` or `<subtype>._sub._http._tcp.local.`
    pub service_type: String,
    /// Fully qualified instance name, ending with the service type.
    pub name: String,
    pub address: Option<IpAddr>,
    pub port: u16,
    pub weight: u16,
    pub priority: u16,
    pub properties: TxtProperties,
    /// Encoded TXT payload; kept in step with `properties`.
    pub text: Vec<u8>,
    /// Target host of the SRV record.
    pub server: String,
    pub ttl: u32,
}

impl ServiceInfo {
    pub fn new(service_type: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            service_type: service_type.into(),
            server: name.clone(),
            name,
            address: None,
            port: 0,
            weight: 0,
            priority: 0,
            properties: TxtProperties::new(),
            text: vec![0],
            ttl: DEFAULT_TTL,
        }
    }

    pub fn with_address(mut self, address: IpAddr) -> Self {
        self.address = Some(address);
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_weight(mut self, weight: u16) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_priority(mut self, priority: u16) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = server.into();
        self
    }

    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_properties(mut self, properties: TxtProperties) -> Result<Self, DomainError> {
        self.set_properties(properties)?;
        Ok(self)
    }

    pub fn set_properties(&mut self, properties: TxtProperties) -> Result<(), DomainError> {
        self.text = properties.encode()?;
        self.properties = properties;
        Ok(())
    }

    /// Adopt a TXT payload received from the network.
    pub fn set_text(&mut self, text: Vec<u8>) {
        self.properties = TxtProperties::decode(&text);
        self.text = text;
    }

    pub fn key(&self) -> String {
        self.name.to_ascii_lowercase()
    }

    /// The instance label, i.e. the name without its service type.
    pub fn instance_name(&self) -> &str {
        split_instance_name(&self.name, &self.service_type)
            .or_else(|| {
                service_type_name(&self.name)
                    .ok()
                    .and_then(|base| split_instance_name(&self.name, &base))
            })
            .unwrap_or(&self.name)
    }

    /// Naming checks performed before anything is published.
    pub fn validate(&self) -> Result<(), DomainError> {
        service_type_name(&self.service_type)?;
        let base = service_type_name(&self.name)?;
        if !self.service_type.ends_with(&base) {
            return Err(DomainError::BadTypeInName(format!(
                "{:?} is not an instance of {:?}",
                self.name, self.service_type
            )));
        }
        validate_domain_name(&self.name)?;
        validate_domain_name(&self.server)?;
        Ok(())
    }

    pub fn ptr_record(&self, ttl: u32) -> DnsRecord {
        DnsRecord::pointer(&self.service_type, &self.name, ttl)
    }

    pub fn srv_record(&self, ttl: u32) -> DnsRecord {
        DnsRecord::service(
            &self.name,
            self.priority,
            self.weight,
            self.port,
            &self.server,
            ttl,
        )
    }

    pub fn txt_record(&self, ttl: u32) -> DnsRecord {
        DnsRecord::text(&self.name, self.text.clone(), ttl)
    }

    pub fn address_record(&self, ttl: u32) -> Option<DnsRecord> {
        self.address
            .map(|address| DnsRecord::address(&self.server, address, ttl))
    }

    /// PTR, SRV, TXT and (when known) the host address, in announce order.
    pub fn dns_records(&self, ttl: u32) -> Vec<DnsRecord> {
        let mut records = vec![
            self.ptr_record(ttl),
            self.srv_record(ttl),
            self.txt_record(ttl),
        ];
        records.extend(self.address_record(ttl));
        records
    }

    /// Records that assert ownership of the name during probing.
    pub fn ownership_records(&self, ttl: u32) -> Vec<DnsRecord> {
        let mut records = vec![self.srv_record(ttl)];
        records.extend(self.address_record(ttl));
        records
    }
}
