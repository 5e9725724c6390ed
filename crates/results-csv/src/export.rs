use anyhow::{Context, Result};
use recon_core::{ExploitLookupResult, ScanResult, VulnFinding};
use std::fs::File;
use std::io::Write;
use std::path::Path;

pub const RESULTS_HEADER: [&str; 3] = ["IP Address", "Port", "Scan Type"];
pub const SERVICE_COLUMN: &str = "Service";
pub const EXPLOITS_HEADER: [&str; 5] = ["IP Address", "Port", "Query Type", "Query", "Output"];
pub const VULNS_HEADER: [&str; 4] = ["IP Address", "Port", "Vulnerability ID", "CVSS"];

fn create(path: &Path) -> Result<File> {
    File::create(path).with_context(|| format!("failed to create {}", path.display()))
}

/// Write the open-port summary. The header row is always written, so an
/// empty run still produces a valid file. Returns the number of data rows.
pub fn write_results(path: &Path, rows: &[ScanResult], with_service: bool) -> Result<usize> {
    write_results_to(create(path)?, rows, with_service)
}

pub fn write_results_to<W: Write>(w: W, rows: &[ScanResult], with_service: bool) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(w);
    if with_service {
        let mut header = RESULTS_HEADER.to_vec();
        header.push(SERVICE_COLUMN);
        wtr.write_record(&header)?;
    } else {
        wtr.write_record(RESULTS_HEADER)?;
    }
    for r in rows {
        let port = r.port.to_string();
        if with_service {
            wtr.write_record([r.ip.as_str(), port.as_str(), r.scan_type.as_str(), r.service.as_deref().unwrap_or_default()])?;
        } else {
            wtr.write_record([r.ip.as_str(), port.as_str(), r.scan_type.as_str()])?;
        }
    }
    wtr.flush()?;
    Ok(rows.len())
}

pub fn write_exploits(path: &Path, rows: &[ExploitLookupResult]) -> Result<usize> {
    write_exploits_to(create(path)?, rows)
}

pub fn write_exploits_to<W: Write>(w: W, rows: &[ExploitLookupResult]) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(w);
    wtr.write_record(EXPLOITS_HEADER)?;
    for r in rows {
        let port = r.port.to_string();
        wtr.write_record([r.ip.as_str(), port.as_str(), r.kind.as_str(), r.query.as_str(), r.output.as_str()])?;
    }
    wtr.flush()?;
    Ok(rows.len())
}

pub fn write_vulns(path: &Path, rows: &[VulnFinding]) -> Result<usize> {
    write_vulns_to(create(path)?, rows)
}

pub fn write_vulns_to<W: Write>(w: W, rows: &[VulnFinding]) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(w);
    wtr.write_record(VULNS_HEADER)?;
    for r in rows {
        let port = r.port.to_string();
        wtr.write_record([r.ip.as_str(), port.as_str(), r.id.as_str(), r.cvss.as_deref().unwrap_or_default()])?;
    }
    wtr.flush()?;
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use recon_core::QueryKind;

    fn render(rows: &[ScanResult], with_service: bool) -> String {
        let mut buf = Vec::new();
        write_results_to(&mut buf, rows, with_service).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn zero_rows_is_header_only() {
        assert_eq!(render(&[], false), "IP Address,Port,Scan Type\n");
        assert_eq!(render(&[], true), "IP Address,Port,Scan Type,Service\n");
    }

    #[test]
    fn writes_rows_in_order() {
        let rows = vec![
            ScanResult::new("10.0.0.1", 80, "default_scripts"),
            ScanResult::new("10.0.0.1", 22, "service_version").with_service(Some("ssh OpenSSH 8.9p1".into())),
        ];
        assert_eq!(
            render(&rows, false),
            "IP Address,Port,Scan Type\n10.0.0.1,80,default_scripts\n10.0.0.1,22,service_version\n"
        );
        assert_eq!(
            render(&rows, true),
            "IP Address,Port,Scan Type,Service\n10.0.0.1,80,default_scripts,\n10.0.0.1,22,service_version,ssh OpenSSH 8.9p1\n"
        );
    }

    #[test]
    fn exploit_output_is_quoted() {
        let rows = vec![ExploitLookupResult {
            ip: "10.0.0.1".into(),
            port: 21,
            kind: QueryKind::Service,
            query: "vsftpd 2.3.4".into(),
            output: "vsftpd 2.3.4 - Backdoor, Command Execution\n".into(),
        }];
        let mut buf = Vec::new();
        write_exploits_to(&mut buf, &rows).unwrap();
        let s = String::from_utf8(buf).unwrap();
        assert!(s.starts_with("IP Address,Port,Query Type,Query,Output\n"));
        assert!(s.contains("10.0.0.1,21,service,vsftpd 2.3.4,\"vsftpd 2.3.4 - Backdoor, Command Execution\n\""));
    }

    #[test]
    fn vulns_csv() {
        let rows = vec![VulnFinding { ip: "10.0.0.1".into(), port: 80, id: "CVE-2021-44790".into(), cvss: Some("7.5".into()) }];
        let mut buf = Vec::new();
        write_vulns_to(&mut buf, &rows).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "IP Address,Port,Vulnerability ID,CVSS\n10.0.0.1,80,CVE-2021-44790,7.5\n");
    }

    #[test]
    fn header_only_file_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("output.csv");
        assert_eq!(write_results(&p, &[], false).unwrap(), 0);
        assert_eq!(std::fs::read_to_string(&p).unwrap(), "IP Address,Port,Scan Type\n");
    }
}
