//! Scan profiles: named nmap argument sets, grouped into an ordered set.

use crate::ReconError;
use serde::Deserialize;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Fast,
    Long,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanProfile {
    pub name: String,
    pub args: Vec<String>,
    pub tier: Tier,
}

impl ScanProfile {
    /// Build a profile from a whitespace-separated argument string.
    pub fn new(name: &str, args: &str, tier: Tier) -> Self {
        ScanProfile {
            name: name.to_string(),
            args: args.split_whitespace().map(str::to_string).collect(),
            tier,
        }
    }

    pub fn args_display(&self) -> String {
        self.args.join(" ")
    }
}

/// Profile definition as written in a config file.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileDef {
    pub name: String,
    pub args: String,
    #[serde(default)]
    pub tier: Tier,
}

impl From<&ProfileDef> for ScanProfile {
    fn from(d: &ProfileDef) -> Self {
        ScanProfile::new(d.name.trim(), &d.args, d.tier)
    }
}

pub fn syn_all_ports() -> ScanProfile {
    ScanProfile::new("syn_all_ports", "-sS -p-", Tier::Long)
}

pub fn aggressive() -> ScanProfile {
    ScanProfile::new("aggressive", "-T4 -A", Tier::Long)
}

pub fn vulners() -> ScanProfile {
    ScanProfile::new("vulners", "-sV --script vulners", Tier::Long)
}

/// Flags that pick the effective profile set for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanMode {
    pub fast_only: bool,
    pub syn: bool,
    pub aggressive: bool,
    pub vulners: bool,
}

/// Ordered, non-empty list of profiles with unique names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSet {
    profiles: Vec<ScanProfile>,
}

impl ProfileSet {
    pub fn new(profiles: Vec<ScanProfile>) -> Result<Self, ReconError> {
        if profiles.is_empty() {
            return Err(ReconError::EmptyProfileSet);
        }
        let mut seen = HashSet::new();
        for p in &profiles {
            if p.args.is_empty() {
                return Err(ReconError::EmptyProfile(p.name.clone()));
            }
            if !seen.insert(p.name.as_str()) {
                return Err(ReconError::DuplicateProfile(p.name.clone()));
            }
        }
        Ok(ProfileSet { profiles })
    }

    pub fn from_defs(defs: &[ProfileDef]) -> Result<Self, ReconError> {
        ProfileSet::new(defs.iter().map(ScanProfile::from).collect())
    }

    /// Built-in reconnaissance set: quick checks first, then the slow sweeps.
    pub fn recon() -> Self {
        let profiles = vec![
            ScanProfile::new("default_scripts", "-sC", Tier::Fast),
            ScanProfile::new("service_version", "-sV", Tier::Fast),
            ScanProfile::new("light_version", "-sV --version-light", Tier::Fast),
            ScanProfile::new("ping_scan", "-sn", Tier::Fast),
            ScanProfile::new("quick_scan", "-Pn -sV --top-ports 50 --open", Tier::Fast),
            ScanProfile::new("smb_vuln", "-Pn --script smb-vuln* -p139,445", Tier::Fast),
            ScanProfile::new("udp_scan", "-sU -sC -sV", Tier::Fast),
            ScanProfile::new("all_ports", "-p-", Tier::Long),
            ScanProfile::new("slow_scan", "-T0", Tier::Long),
        ];
        ProfileSet { profiles }
    }

    /// Apply run flags to a base set. `syn` wins over `aggressive`; both
    /// replace the base set. `vulners` appends a vulnerability script pass.
    pub fn select(&self, mode: ScanMode) -> Result<ProfileSet, ReconError> {
        let mut out: Vec<ScanProfile> = if mode.syn {
            vec![syn_all_ports()]
        } else if mode.aggressive {
            vec![aggressive()]
        } else if mode.fast_only {
            self.profiles.iter().filter(|p| p.tier == Tier::Fast).cloned().collect()
        } else {
            self.profiles.clone()
        };
        if mode.vulners && !out.iter().any(|p| p.name == "vulners") {
            out.push(vulners());
        }
        ProfileSet::new(out)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScanProfile> {
        self.profiles.iter()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.profiles.iter().map(|p| p.name.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a ProfileSet {
    type Item = &'a ScanProfile;
    type IntoIter = std::slice::Iter<'a, ScanProfile>;

    fn into_iter(self) -> Self::IntoIter {
        self.profiles.iter()
    }
}
