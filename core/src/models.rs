/// One open-port finding attributed to the profile that produced it.
///
/// Identity (for deduplication and CSV output) is the full
/// `(ip, port, scan_type, service)` tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScanResult {
    pub ip: String,
    pub port: u16,
    pub scan_type: String,
    pub service: Option<String>,
}

impl ScanResult {
    pub fn new(ip: impl Into<String>, port: u16, scan_type: impl Into<String>) -> Self {
        ScanResult { ip: ip.into(), port, scan_type: scan_type.into(), service: None }
    }

    pub fn with_service(mut self, service: Option<String>) -> Self {
        self.service = service.filter(|s| !s.trim().is_empty());
        self
    }
}

/// A vulnerability reported by the `vulners` script for an open port.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VulnFinding {
    pub ip: String,
    pub port: u16,
    pub id: String,
    pub cvss: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Service,
    Port,
}

impl QueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::Service => "service",
            QueryKind::Port => "port",
        }
    }
}

/// Raw exploit-database output for one port and one query kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExploitLookupResult {
    pub ip: String,
    pub port: u16,
    pub kind: QueryKind,
    pub query: String,
    pub output: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_service_is_dropped() {
        let r = ScanResult::new("10.0.0.1", 22, "service_version").with_service(Some("  ".into()));
        assert_eq!(r.service, None);
        let r = ScanResult::new("10.0.0.1", 22, "service_version").with_service(Some("ssh".into()));
        assert_eq!(r.service.as_deref(), Some("ssh"));
    }

    #[test]
    fn query_kind_labels() {
        assert_eq!(QueryKind::Service.as_str(), "service");
        assert_eq!(QueryKind::Port.as_str(), "port");
    }
}
