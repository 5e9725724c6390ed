use anyhow::Result;
use recon_core::{ReconError, ScanProfile, Target};
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Where a single invocation writes its reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub normal: PathBuf,
    pub xml: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStatus {
    pub success: bool,
    pub code: Option<i32>,
}

impl RunStatus {
    pub fn ok() -> Self {
        RunStatus { success: true, code: Some(0) }
    }
}

/// One blocking scanner invocation for one target and one profile.
///
/// An `Err` means the scanner could not be run at all and aborts the run;
/// a failed exit is reported through [`RunStatus`].
pub trait ScanTool {
    fn name(&self) -> &str;
    fn run(&mut self, target: &Target, profile: &ScanProfile, out: &ReportPaths) -> Result<RunStatus>;
}

pub struct NmapTool {
    binary: String,
    show_output: bool,
}

impl NmapTool {
    pub fn new(binary: impl Into<String>) -> Self {
        NmapTool { binary: binary.into(), show_output: false }
    }

    /// Pass nmap's own console output through to stdout.
    pub fn show_output(mut self, yes: bool) -> Self {
        self.show_output = yes;
        self
    }

    /// Check that the binary can be launched; returns its version banner.
    pub fn verify(&self) -> Result<String> {
        let out = Command::new(&self.binary)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .map_err(|e| ReconError::ToolUnavailable { tool: self.binary.clone(), source: e })?;
        let s = String::from_utf8_lossy(&out.stdout);
        Ok(s.lines().next().unwrap_or_default().trim().to_string())
    }

    /// Argument vector for one invocation: profile arguments (plus `-6` for
    /// IPv6 targets), report destinations, then the target address last.
    pub fn command_args(target: &Target, profile: &ScanProfile, out: &ReportPaths) -> Vec<OsString> {
        let mut args: Vec<OsString> = profile.args.iter().map(OsString::from).collect();
        if target.0.is_ipv6() && !profile.args.iter().any(|a| a == "-6") {
            args.push("-6".into());
        }
        args.push("-oN".into());
        args.push(out.normal.clone().into_os_string());
        args.push("-oX".into());
        args.push(out.xml.clone().into_os_string());
        args.push(target.to_string().into());
        args
    }
}

impl ScanTool for NmapTool {
    fn name(&self) -> &str {
        &self.binary
    }

    fn run(&mut self, target: &Target, profile: &ScanProfile, out: &ReportPaths) -> Result<RunStatus> {
        let args = Self::command_args(target, profile, out);
        tracing::debug!(binary = %self.binary, ?args, "launching scanner");
        let stdout = if self.show_output { Stdio::inherit() } else { Stdio::null() };
        let status = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(stdout)
            .status()
            .map_err(|e| ReconError::ToolUnavailable { tool: self.binary.clone(), source: e })?;
        Ok(RunStatus { success: status.success(), code: status.code() })
    }
}
