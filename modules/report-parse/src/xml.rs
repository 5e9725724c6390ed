use crate::{OpenPort, Vulnerability};
use anyhow::{bail, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Parse nmap `-oX` output into open ports.
///
/// Ports are attributed to the first non-MAC `<address>` of their `<host>`.
/// Vulnerability entries come from the `vulners` NSE script tables.
pub fn parse_xml(content: &str) -> Result<Vec<OpenPort>> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);
    let mut st = State::default();
    loop {
        match reader.read_event()? {
            Event::Start(e) => st.open(&e, false)?,
            Event::Empty(e) => st.open(&e, true)?,
            Event::End(e) => st.close(e.name().as_ref()),
            Event::Text(t) => {
                if st.elem_key.is_some() {
                    let v = t.unescape()?.into_owned();
                    st.text(v);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    if !st.finished {
        bail!("truncated report: missing </nmaprun>");
    }
    Ok(st.out)
}

#[derive(Default)]
struct State {
    out: Vec<OpenPort>,
    host_ip: Option<String>,
    host_ports: Vec<OpenPort>,
    port: Option<OpenPort>,
    in_vulners: bool,
    table_depth: usize,
    elem_key: Option<String>,
    vuln_id: Option<String>,
    vuln_cvss: Option<String>,
    finished: bool,
}

impl State {
    fn open(&mut self, e: &BytesStart, empty: bool) -> Result<()> {
        match e.name().as_ref() {
            b"host" if !empty => {
                self.host_ip = None;
                self.host_ports.clear();
            }
            b"address" => {
                let kind = attr(e, b"addrtype")?;
                if self.host_ip.is_none() && kind.as_deref() != Some("mac") {
                    self.host_ip = attr(e, b"addr")?;
                }
            }
            b"port" if !empty => {
                let proto = attr(e, b"protocol")?.unwrap_or_else(|| "tcp".into());
                let portid = attr(e, b"portid")?.unwrap_or_default();
                self.port = match portid.parse::<u16>() {
                    Ok(n) => {
                        let mut p = OpenPort::new("", n, &proto);
                        p.state.clear();
                        Some(p)
                    }
                    Err(_) => {
                        tracing::debug!(portid = %portid, "skipping port with unparsable id");
                        None
                    }
                };
            }
            b"state" => {
                if let Some(p) = self.port.as_mut() {
                    p.state = attr(e, b"state")?.unwrap_or_default();
                }
            }
            b"service" => {
                if let Some(p) = self.port.as_mut() {
                    p.service = service_string(e)?;
                }
            }
            b"script" if !empty => {
                self.in_vulners = self.port.is_some() && attr(e, b"id")?.as_deref() == Some("vulners");
                self.table_depth = 0;
            }
            b"table" if self.in_vulners && !empty => {
                self.table_depth += 1;
                if self.table_depth == 2 {
                    self.vuln_id = None;
                    self.vuln_cvss = None;
                }
            }
            b"elem" if self.in_vulners && !empty => {
                self.elem_key = attr(e, b"key")?;
            }
            _ => {}
        }
        Ok(())
    }

    fn text(&mut self, v: String) {
        if !self.in_vulners || self.table_depth != 2 {
            return;
        }
        match self.elem_key.as_deref() {
            Some("id") => self.vuln_id = Some(v),
            Some("cvss") => self.vuln_cvss = Some(v),
            _ => {}
        }
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"elem" => self.elem_key = None,
            b"table" if self.in_vulners => {
                if self.table_depth == 2 {
                    if let (Some(id), Some(p)) = (self.vuln_id.take(), self.port.as_mut()) {
                        p.vulns.push(Vulnerability { id, cvss: self.vuln_cvss.take() });
                    }
                }
                self.table_depth = self.table_depth.saturating_sub(1);
            }
            b"script" => self.in_vulners = false,
            b"port" => {
                if let Some(p) = self.port.take() {
                    if p.state == "open" {
                        self.host_ports.push(p);
                    }
                }
            }
            b"host" => {
                let ip = self.host_ip.take().unwrap_or_default();
                for mut p in self.host_ports.drain(..) {
                    p.ip = ip.clone();
                    self.out.push(p);
                }
            }
            b"nmaprun" => self.finished = true,
            _ => {}
        }
    }
}

fn attr(e: &BytesStart, key: &[u8]) -> Result<Option<String>> {
    for a in e.attributes() {
        let a = a?;
        if a.key.as_ref() == key {
            return Ok(Some(a.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// `name product version (extrainfo)`, skipping missing parts.
fn service_string(e: &BytesStart) -> Result<Option<String>> {
    let mut parts = Vec::new();
    let keys: [&[u8]; 3] = [b"name", b"product", b"version"];
    for key in keys {
        if let Some(v) = attr(e, key)?.filter(|v| !v.is_empty()) {
            parts.push(v);
        }
    }
    if let Some(x) = attr(e, b"extrainfo")?.filter(|v| !v.is_empty()) {
        parts.push(format!("({x})"));
    }
    Ok(if parts.is_empty() { None } else { Some(parts.join(" ")) })
}
