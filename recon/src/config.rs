use crate::OutputFormat;
use anyhow::{Context, Result};
use recon_core::profile::ProfileDef;
use recon_core::ProfileSet;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG: &str = "recon.yaml";

#[derive(Debug, Default, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ScanConfig {
    pub output: Option<String>,
    pub delay_secs: Option<u64>,
    pub fast_only: Option<bool>,
    pub service: Option<bool>,
    pub dedup: Option<bool>,
    pub exploits: Option<bool>,
    pub keep_xml: Option<bool>,
    pub out_dir: Option<PathBuf>,
    pub nmap: Option<String>,
    pub searchsploit: Option<String>,
    pub format: Option<OutputFormat>,
}

#[derive(Debug, Default, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub scan: Option<ScanConfig>,
    /// Replaces the built-in recon profile set when present.
    pub profiles: Option<Vec<ProfileDef>>,
}

impl Config {
    pub fn base_profiles(&self) -> Result<ProfileSet> {
        match &self.profiles {
            Some(defs) => Ok(ProfileSet::from_defs(defs)?),
            None => Ok(ProfileSet::recon()),
        }
    }
}

/// Load the given config, or `./recon.yaml` if present. A missing default file
/// is not an error; a file that exists but does not parse is.
pub fn load_config(path: Option<&Path>) -> Result<Option<Config>> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let p = Path::new(DEFAULT_CONFIG);
            if p.exists() { p.to_path_buf() } else { return Ok(None); }
        }
    };
    let s = fs::read_to_string(&path).with_context(|| format!("failed to read config {}", path.display()))?;
    let cfg = parse_config(&s).with_context(|| format!("invalid config {}", path.display()))?;
    Ok(Some(cfg))
}

pub fn parse_config(s: &str) -> Result<Config> {
    Ok(serde_yaml::from_str(s)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use recon_core::Tier;

    #[test]
    fn parses_scan_section_and_profiles() {
        let cfg = parse_config(
            r#"
scan:
  output: results.csv
  delay_secs: 2
  dedup: true
profiles:
  - name: quick
    args: "-Pn -sV --top-ports 100"
  - name: everything
    args: "-p-"
    tier: long
"#,
        )
        .unwrap();
        let scan = cfg.scan.clone().unwrap();
        assert_eq!(scan.output.as_deref(), Some("results.csv"));
        assert_eq!(scan.delay_secs, Some(2));
        assert_eq!(scan.dedup, Some(true));
        let set = cfg.base_profiles().unwrap();
        assert_eq!(set.names(), vec!["quick", "everything"]);
        let tiers: Vec<Tier> = set.iter().map(|p| p.tier).collect();
        assert_eq!(tiers, vec![Tier::Fast, Tier::Long]);
    }

    #[test]
    fn no_profiles_means_builtin() {
        let cfg = parse_config("scan:\n  service: true\n").unwrap();
        assert_eq!(cfg.base_profiles().unwrap(), ProfileSet::recon());
    }

    #[test]
    fn duplicate_profile_names_rejected() {
        let cfg = parse_config("profiles:\n  - {name: a, args: \"-sV\"}\n  - {name: a, args: \"-sC\"}\n").unwrap();
        assert!(cfg.base_profiles().is_err());
    }

    #[test]
    fn unknown_keys_rejected() {
        assert!(parse_config("scan:\n  dealy_secs: 3\n").is_err());
    }

    #[test]
    fn output_format_is_checked() {
        let cfg = parse_config("scan:\n  format: jsonl\n").unwrap();
        assert_eq!(cfg.scan.unwrap().format, Some(OutputFormat::Jsonl));
        assert!(parse_config("scan:\n  format: josn\n").is_err());
    }

    #[test]
    fn explicit_missing_file_is_error() {
        assert!(load_config(Some(Path::new("/nonexistent/recon.yaml"))).is_err());
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("custom.yaml");
        fs::write(&p, "scan:\n  nmap: /opt/nmap/bin/nmap\n").unwrap();
        let cfg = load_config(Some(&p)).unwrap().unwrap();
        assert_eq!(cfg.scan.unwrap().nmap.as_deref(), Some("/opt/nmap/bin/nmap"));
    }
}
