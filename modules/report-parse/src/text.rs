use crate::OpenPort;
use regex::Regex;
use std::sync::OnceLock;

fn port_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{1,5})/([a-z]+)\s+(\S+)(?:\s+(.*))?$").unwrap())
}

/// Line-oriented extraction from nmap normal (`-oN`) output.
///
/// Capture runs from a `PORT` column header to the next blank line or report
/// header. Only `<port>/<proto>` lines in state `open` become records.
/// `default_ip` is used until the first `Nmap scan report for` line.
pub fn extract_text(content: &str, default_ip: Option<&str>) -> Vec<OpenPort> {
    let mut out = Vec::new();
    let mut current_ip = default_ip.map(str::to_string);
    let mut capture = false;
    for line in content.lines() {
        if let Some(rest) = line.strip_prefix("Nmap scan report for ") {
            current_ip = Some(report_host(rest));
            capture = false;
            continue;
        }
        if line.starts_with("PORT") {
            capture = true;
            continue;
        }
        if !capture {
            continue;
        }
        if line.trim().is_empty() {
            capture = false;
            continue;
        }
        let Some(caps) = port_line().captures(line.trim_end()) else { continue };
        let Ok(port) = caps[1].parse::<u16>() else { continue };
        if &caps[3] != "open" {
            continue;
        }
        let Some(ip) = current_ip.as_deref() else {
            tracing::debug!(line, "port line before any report header");
            continue;
        };
        let mut p = OpenPort::new(ip, port, &caps[2]);
        p.service = caps
            .get(4)
            .map(|m| m.as_str().split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|s| !s.is_empty());
        out.push(p);
    }
    out
}

/// Split a combined report into its `# Scan Type: <name>` sections. Text
/// before the first marker forms an unnamed section.
pub fn scan_sections(content: &str) -> Vec<(Option<String>, String)> {
    let mut out: Vec<(Option<String>, String)> = Vec::new();
    let mut name: Option<String> = None;
    let mut body = String::new();
    for line in content.lines() {
        if let Some(rest) = line.strip_prefix("# Scan Type:") {
            if name.is_some() || !body.trim().is_empty() {
                out.push((name.take(), std::mem::take(&mut body)));
            }
            name = Some(rest.trim().to_string());
            body.clear();
            continue;
        }
        body.push_str(line);
        body.push('\n');
    }
    if name.is_some() || !body.trim().is_empty() {
        out.push((name, body));
    }
    out
}

/// `host.example (10.0.0.1)` -> `10.0.0.1`; a bare address is returned as is.
fn report_host(rest: &str) -> String {
    let last = rest.split_whitespace().last().unwrap_or_default();
    last.trim_start_matches('(').trim_end_matches(')').to_string()
}
