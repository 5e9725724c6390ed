use crate::{RunWorkspace, ScanTool};
use anyhow::Result;
use recon_core::pacing::Pacer;
use recon_core::{ProfileSet, ScanProfile, ScanResult, Target, VulnFinding};
use tracing::{info, warn};

/// Accumulated output of a run, threaded through every scan step by value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Findings {
    pub results: Vec<ScanResult>,
    pub vulns: Vec<VulnFinding>,
    pub invocations: usize,
    pub failed_exits: usize,
    pub missing_reports: usize,
}

/// Run one profile against one target and fold its open ports into `acc`.
pub fn run_profile<T: ScanTool + ?Sized>(
    tool: &mut T,
    target: &Target,
    profile: &ScanProfile,
    ws: &RunWorkspace,
    mut acc: Findings,
) -> Result<Findings> {
    let paths = ws.scratch();
    // leftovers from an earlier invocation must not be read as this one's output
    ws.clear_scratch(&paths)?;
    info!(target = %target, profile = %profile.name, "running: {} {} {}", tool.name(), profile.args_display(), target);
    let status = tool.run(target, profile, &paths)?;
    acc.invocations += 1;
    if !status.success {
        acc.failed_exits += 1;
        warn!(target = %target, profile = %profile.name, code = ?status.code, "scanner exited with failure");
    }

    if paths.normal.exists() {
        if let Err(e) = ws.append_section(&profile.name, &paths.normal) {
            warn!(error = %e, "could not append to combined report");
        }
    }

    let target_ip = target.to_string();
    match report_parse::parse_report_files(&paths.xml, &paths.normal, &target_ip) {
        Some(ports) => {
            let before = acc.results.len();
            for p in ports {
                let ip = if p.ip.is_empty() { target_ip.clone() } else { p.ip };
                for v in p.vulns {
                    acc.vulns.push(VulnFinding { ip: ip.clone(), port: p.port, id: v.id, cvss: v.cvss });
                }
                acc.results.push(ScanResult::new(ip, p.port, profile.name.as_str()).with_service(p.service));
            }
            info!(target = %target, profile = %profile.name, open = acc.results.len() - before, "scan finished");
        }
        None => {
            acc.missing_reports += 1;
            warn!(target = %target, profile = %profile.name, "no report produced, skipping");
        }
    }

    if let Err(e) = ws.archive_xml(target, profile, &paths) {
        warn!(error = %e, "could not archive xml report");
    }
    if let Err(e) = ws.clear_scratch(&paths) {
        warn!(error = %e, "could not remove scratch files");
    }
    Ok(acc)
}

/// Run every profile, in order, against one target.
pub fn scan_target<T: ScanTool + ?Sized>(
    tool: &mut T,
    target: &Target,
    profiles: &ProfileSet,
    ws: &RunWorkspace,
    acc: Findings,
) -> Result<Findings> {
    profiles.iter().try_fold(acc, |acc, p| run_profile(tool, target, p, ws, acc))
}

/// Scan all targets in input order, pausing between targets.
pub fn scan_all<T: ScanTool + ?Sized>(
    tool: &mut T,
    targets: &[Target],
    profiles: &ProfileSet,
    ws: &RunWorkspace,
    pacer: &mut Pacer,
) -> Result<Findings> {
    let mut acc = Findings::default();
    for (i, t) in targets.iter().enumerate() {
        pacer.wait();
        info!("[{}/{}] scanning target {}", i + 1, targets.len(), t);
        acc = scan_target(tool, t, profiles, ws, acc)?;
    }
    Ok(acc)
}
