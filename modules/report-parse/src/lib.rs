//! Open-port extraction from nmap reports (XML and normal text output).

mod text;
mod xml;

pub use text::{extract_text, scan_sections};
pub use xml::parse_xml;

use anyhow::Result;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vulnerability {
    pub id: String,
    pub cvss: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenPort {
    pub ip: String,
    pub port: u16,
    pub protocol: String,
    pub state: String,
    pub service: Option<String>,
    pub vulns: Vec<Vulnerability>,
}

impl OpenPort {
    pub fn new(ip: &str, port: u16, protocol: &str) -> Self {
        OpenPort {
            ip: ip.to_string(),
            port,
            protocol: protocol.to_string(),
            state: "open".to_string(),
            service: None,
            vulns: Vec::new(),
        }
    }
}

/// Read a report that may carry non-UTF-8 bytes copied from remote banners.
pub fn read_report(path: &Path) -> std::io::Result<String> {
    Ok(String::from_utf8_lossy(&std::fs::read(path)?).into_owned())
}

/// Parse whichever report exists for one invocation. XML is preferred; the
/// normal output is used when the XML file is missing or does not parse.
/// Returns `None` when neither report could be read.
pub fn parse_report_files(xml: &Path, normal: &Path, default_ip: &str) -> Option<Vec<OpenPort>> {
    if let Ok(s) = read_report(xml) {
        match parse_xml(&s) {
            Ok(ports) => return Some(ports),
            Err(e) => tracing::warn!(path = %xml.display(), error = %e, "xml report unusable, falling back to normal output"),
        }
    }
    match read_report(normal) {
        Ok(s) => Some(extract_text(&s, Some(default_ip))),
        Err(e) => {
            tracing::warn!(path = %normal.display(), error = %e, "no readable report");
            None
        }
    }
}

/// Parse a saved report, choosing the parser by content. Combined normal
/// output is split on its `# Scan Type:` markers so each section keeps the
/// profile name it was produced by; XML yields one unnamed section.
pub fn parse_saved_report(content: &str) -> Result<Vec<(Option<String>, Vec<OpenPort>)>> {
    if content.trim_start().starts_with("<?xml") || content.contains("<nmaprun") {
        return Ok(vec![(None, parse_xml(content)?)]);
    }
    Ok(scan_sections(content)
        .into_iter()
        .map(|(name, body)| (name, extract_text(&body, None)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const XML: &str = r#"<?xml version="1.0"?>
<nmaprun><host><address addr="10.1.1.1" addrtype="ipv4"/>
<ports><port protocol="tcp" portid="22"><state state="open"/><service name="ssh"/></port></ports>
</host></nmaprun>"#;

    #[test]
    fn prefers_xml_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let xml = dir.path().join("r.xml");
        let normal = dir.path().join("r.nmap");
        std::fs::write(&xml, XML).unwrap();
        std::fs::write(&normal, "PORT STATE SERVICE\n80/tcp open http\n\n").unwrap();
        let ports = parse_report_files(&xml, &normal, "10.1.1.1").unwrap();
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].port, 22);
    }

    #[test]
    fn falls_back_to_text() {
        let dir = tempfile::tempdir().unwrap();
        let xml = dir.path().join("r.xml");
        let normal = dir.path().join("r.nmap");
        std::fs::write(&xml, "<nmaprun><host>").unwrap();
        std::fs::write(&normal, "PORT STATE SERVICE\n80/tcp open http\n\n").unwrap();
        let ports = parse_report_files(&xml, &normal, "10.1.1.2").unwrap();
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].ip, "10.1.1.2");
        assert_eq!(ports[0].port, 80);
    }

    #[test]
    fn latin1_banner_does_not_lose_ports() {
        let dir = tempfile::tempdir().unwrap();
        let xml = dir.path().join("r.xml");
        let normal = dir.path().join("r.nmap");
        std::fs::write(&normal, b"PORT   STATE SERVICE\n80/tcp open  http\n|_http-title: Caf\xE9\n\n").unwrap();
        let ports = parse_report_files(&xml, &normal, "10.1.1.3").unwrap();
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].port, 80);
    }

    #[test]
    fn none_when_nothing_written() {
        let dir = tempfile::tempdir().unwrap();
        let r = parse_report_files(&dir.path().join("a.xml"), &dir.path().join("a.nmap"), "10.0.0.1");
        assert!(r.is_none());
    }

    #[test]
    fn saved_xml_is_one_section() {
        let sections = parse_saved_report(XML).unwrap();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].0, None);
        assert_eq!(sections[0].1[0].port, 22);
    }

    #[test]
    fn saved_combined_report_keeps_scan_types() {
        let txt = "\n# Scan Type: quick_scan\nNmap scan report for 10.0.0.5\nPORT STATE SERVICE\n443/tcp open https\n\n\
# Scan Type: all_ports\nNmap scan report for 10.0.0.5\nPORT STATE SERVICE\n8443/tcp open https-alt\n";
        let sections = parse_saved_report(txt).unwrap();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].0.as_deref(), Some("quick_scan"));
        assert_eq!(sections[0].1[0].ip, "10.0.0.5");
        assert_eq!(sections[1].1[0].port, 8443);
    }
}
