//! Offline exploit-database lookups (searchsploit) for discovered ports.

use anyhow::{anyhow, Result};
use recon_core::{ExploitLookupResult, QueryKind, ScanResult};
use std::collections::HashMap;
use std::process::{Command, Stdio};

pub trait ExploitSearch {
    /// Run one query and return the tool's raw text output.
    fn search(&mut self, terms: &[String]) -> Result<String>;
}

pub struct Searchsploit {
    binary: String,
}

impl Searchsploit {
    pub fn new(binary: impl Into<String>) -> Self {
        Searchsploit { binary: binary.into() }
    }
}

impl ExploitSearch for Searchsploit {
    fn search(&mut self, terms: &[String]) -> Result<String> {
        let out = Command::new(&self.binary)
            .args(terms)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| anyhow!("failed to spawn {}: {}", self.binary, e))?;
        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(anyhow!("{} exited with status {}: {}", self.binary, out.status, stderr.trim()));
        }
        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }
}

/// Search terms for a service string. Punctuation nmap wraps around extra
/// info is stripped so `(Ubuntu Linux; protocol 2.0)` becomes plain words.
pub fn service_terms(service: &str) -> Vec<String> {
    service
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| matches!(c, '(' | ')' | ';' | ',')))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Looks up every row twice (by service string, by port number). Identical
/// queries hit the tool once per run.
pub struct Lookup<'a, S: ExploitSearch + ?Sized> {
    search: &'a mut S,
    cache: HashMap<Vec<String>, String>,
    pub queries_run: usize,
}

impl<'a, S: ExploitSearch + ?Sized> Lookup<'a, S> {
    pub fn new(search: &'a mut S) -> Self {
        Lookup { search, cache: HashMap::new(), queries_run: 0 }
    }

    fn query(&mut self, terms: Vec<String>) -> String {
        if let Some(hit) = self.cache.get(&terms) {
            return hit.clone();
        }
        self.queries_run += 1;
        let text = match self.search.search(&terms) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(query = %terms.join(" "), error = %e, "exploit lookup failed");
                format!("error: {e}")
            }
        };
        self.cache.insert(terms, text.clone());
        text
    }

    pub fn lookup_row(&mut self, row: &ScanResult) -> [ExploitLookupResult; 2] {
        let by_service = match row.service.as_deref().map(service_terms).filter(|t| !t.is_empty()) {
            Some(terms) => {
                let query = terms.join(" ");
                let output = self.query(terms);
                ExploitLookupResult { ip: row.ip.clone(), port: row.port, kind: QueryKind::Service, query, output }
            }
            None => ExploitLookupResult {
                ip: row.ip.clone(),
                port: row.port,
                kind: QueryKind::Service,
                query: String::new(),
                output: "skipped: no service detected".to_string(),
            },
        };
        let port = row.port.to_string();
        let output = self.query(vec![port.clone()]);
        let by_port = ExploitLookupResult { ip: row.ip.clone(), port: row.port, kind: QueryKind::Port, query: port, output };
        [by_service, by_port]
    }
}

pub fn lookup_all<S: ExploitSearch + ?Sized>(search: &mut S, rows: &[ScanResult]) -> Vec<ExploitLookupResult> {
    let mut lk = Lookup::new(search);
    let mut out = Vec::with_capacity(rows.len() * 2);
    for r in rows {
        tracing::info!(ip = %r.ip, port = r.port, "searching exploit database");
        out.extend(lk.lookup_row(r));
    }
    tracing::info!(rows = rows.len(), queries = lk.queries_run, "exploit lookups done");
    out
}
