use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use nmap_runner::{Findings, NmapTool, RunWorkspace, ScanTool};
use recon_core::pacing::Pacer;
use recon_core::{ExploitLookupResult, ProfileSet, ReconError, ScanMode, ScanResult, Target, VulnFinding};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Instant;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use config::{Config, ScanConfig};

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_else(|_| String::new())
}

/// `jsonl` prints one object per open-port row followed by a summary object.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat { Text, Json, Jsonl }

#[derive(Debug, Parser)]
#[command(name = "recon", version, about = "Sequential nmap reconnaissance with CSV summaries")]
struct Cli {
    /// Optional config file (YAML). If omitted, loads ./recon.yaml if present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// More log output (repeat for trace). RUST_LOG overrides.
    #[arg(long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, Default, Args)]
struct ModeArgs {
    /// Run only the fast-tier profiles
    #[arg(long)]
    fast: bool,
    /// Single aggressive pass (-T4 -A) instead of the profile set
    #[arg(short, long)]
    aggressive: bool,
    /// Single SYN pass over all ports (-sS -p-); wins over --aggressive
    #[arg(short, long)]
    syn: bool,
    /// Append a vulners script pass and write vulns.csv
    #[arg(short, long)]
    vulners: bool,
}

#[derive(Debug, Clone, Default, Args)]
struct ScanArgs {
    /// File with one IP address (or CIDR) per line; blanks and # comments ignored
    file: PathBuf,
    /// Summary CSV, relative to the run directory (default: output.csv)
    #[arg(short, long)]
    output: Option<String>,
    /// Seconds to wait between targets
    #[arg(short = 't', long = "time", value_name = "SECS")]
    delay_secs: Option<u64>,
    #[command(flatten)]
    mode: ModeArgs,
    /// Add a Service column to the summary CSV
    #[arg(long)]
    service: bool,
    /// Drop duplicate rows (first occurrence wins)
    #[arg(long)]
    dedup: bool,
    /// Query searchsploit for every row and write exploits.csv
    #[arg(long)]
    exploits: bool,
    /// Keep each invocation's XML report under <run dir>/xml/
    #[arg(long)]
    keep_xml: bool,
    /// Show nmap's console output while it runs
    #[arg(long)]
    show_output: bool,
    /// Run directory (default: output_<MM-DD_HH-MM>)
    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,
    /// nmap binary
    #[arg(long, value_name = "PATH")]
    nmap: Option<String>,
    /// searchsploit binary
    #[arg(long, value_name = "PATH")]
    searchsploit: Option<String>,
    /// Summary format on stdout
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print version information
    Version,
    /// List the profiles a scan would run, in order
    Profiles {
        #[command(flatten)]
        mode: ModeArgs,
    },
    /// Scan every target with every selected profile and summarize open ports
    Scan(ScanArgs),
    /// Re-extract open ports from a saved .nmap or .xml report into CSV
    Extract {
        /// Report file (combined scan_results.nmap or an nmap XML report)
        report: PathBuf,
        /// Scan type for rows without a `# Scan Type:` section
        #[arg(long, default_value = "imported")]
        scan_type: String,
        /// Output CSV
        #[arg(short, long, default_value = "output.csv")]
        output: PathBuf,
        /// Add a Service column
        #[arg(long, default_value_t = false)]
        service: bool,
        /// Drop duplicate rows
        #[arg(long, default_value_t = false)]
        dedup: bool,
    },
}

/// Effective scan options after merging CLI flags over the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ScanSettings {
    file: PathBuf,
    output: String,
    delay_secs: u64,
    mode: ScanMode,
    service: bool,
    dedup: bool,
    exploits: bool,
    keep_xml: bool,
    show_output: bool,
    out_dir: Option<PathBuf>,
    nmap: String,
    searchsploit: String,
    format: OutputFormat,
}

impl ScanSettings {
    fn resolve(args: ScanArgs, cfg: Option<&ScanConfig>) -> Self {
        let c = cfg.cloned().unwrap_or_default();
        let mode = ScanMode {
            fast_only: args.mode.fast || c.fast_only.unwrap_or(false),
            syn: args.mode.syn,
            aggressive: args.mode.aggressive,
            vulners: args.mode.vulners,
        };
        ScanSettings {
            file: args.file,
            output: args.output.or(c.output).unwrap_or_else(|| "output.csv".into()),
            delay_secs: args.delay_secs.or(c.delay_secs).unwrap_or(0),
            mode,
            service: args.service || c.service.unwrap_or(false),
            dedup: args.dedup || c.dedup.unwrap_or(false),
            exploits: args.exploits || c.exploits.unwrap_or(false),
            keep_xml: args.keep_xml || c.keep_xml.unwrap_or(false),
            show_output: args.show_output,
            out_dir: args.out_dir.or(c.out_dir),
            nmap: args.nmap.or(c.nmap).unwrap_or_else(|| "nmap".into()),
            searchsploit: args.searchsploit.or(c.searchsploit).unwrap_or_else(|| "searchsploit".into()),
            format: args.format.or(c.format).unwrap_or(OutputFormat::Text),
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let filter = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();
}

fn default_run_dir() -> Result<PathBuf> {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    let stamp = now.format(format_description!("[month]-[day]_[hour]-[minute]"))?;
    Ok(PathBuf::from(format!("output_{stamp}")))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);
    let loaded_cfg = config::load_config(cli.config.as_deref())?;
    match cli.command {
        Commands::Version => {
            println!("recon {} (core {})", env!("CARGO_PKG_VERSION"), recon_core::version());
        }
        Commands::Profiles { mode } => {
            let settings = ScanSettings::resolve(ScanArgs { mode, ..Default::default() }, scan_section(&loaded_cfg));
            let profiles = base_profiles(&loaded_cfg)?.select(settings.mode)?;
            for p in &profiles {
                println!("{:<18} {:<5} {}", p.name, format!("{:?}", p.tier).to_lowercase(), p.args_display());
            }
        }
        Commands::Scan(args) => {
            let settings = ScanSettings::resolve(args, scan_section(&loaded_cfg));
            let profiles = base_profiles(&loaded_cfg)?.select(settings.mode)?;
            run_scan(&settings, &profiles)?;
        }
        Commands::Extract { report, scan_type, output, service, dedup } => {
            let content = report_parse::read_report(&report)
                .with_context(|| format!("failed to read report {}", report.display()))?;
            let rows = extract_rows(&content, &scan_type)
                .map_err(|e| ReconError::MalformedReport { path: report.clone(), reason: e.to_string() })?;
            let rows = if dedup { results_csv::dedup_rows(rows) } else { rows };
            let n = results_csv::write_results(&output, &rows, service)?;
            println!("{} rows from {} written to {}", n, report.display(), output.display());
        }
    }
    Ok(())
}

fn scan_section(cfg: &Option<Config>) -> Option<&ScanConfig> {
    cfg.as_ref().and_then(|c| c.scan.as_ref())
}

fn base_profiles(cfg: &Option<Config>) -> Result<ProfileSet> {
    match cfg {
        Some(c) => c.base_profiles(),
        None => Ok(ProfileSet::recon()),
    }
}

fn extract_rows(content: &str, default_scan_type: &str) -> Result<Vec<ScanResult>> {
    let mut rows = Vec::new();
    for (name, ports) in report_parse::parse_saved_report(content)? {
        let scan_type = name.as_deref().unwrap_or(default_scan_type);
        rows.extend(ports.into_iter().map(|p| ScanResult::new(p.ip, p.port, scan_type).with_service(p.service)));
    }
    Ok(rows)
}

fn run_scan(s: &ScanSettings, profiles: &ProfileSet) -> Result<()> {
    let targets = recon_core::load_targets(&s.file)?;
    let dir = match &s.out_dir { Some(d) => d.clone(), None => default_run_dir()? };
    let ws = RunWorkspace::create(dir)?.keep_xml(s.keep_xml);
    let mut nmap = NmapTool::new(s.nmap.clone()).show_output(s.show_output);
    let banner = nmap.verify()?;
    info!(scanner = %banner, "scanner found");
    let mut searcher = if s.exploits { exploit_searcher(&s.searchsploit) } else { None };
    let report = execute(&mut nmap, s, profiles, &targets, &ws, searcher.as_mut())?;
    println!("{}", Summary { settings: s, profiles, report: &report }.render()?);
    Ok(())
}

type ExploitFn = Box<dyn FnMut(&[ScanResult]) -> Vec<ExploitLookupResult>>;

#[cfg(feature = "exploits")]
fn exploit_searcher(binary: &str) -> Option<ExploitFn> {
    let mut ss = exploit_lookup::Searchsploit::new(binary);
    Some(Box::new(move |rows: &[ScanResult]| exploit_lookup::lookup_all(&mut ss, rows)))
}

#[cfg(not(feature = "exploits"))]
fn exploit_searcher(_binary: &str) -> Option<ExploitFn> {
    warn!("built without the `exploits` feature; skipping exploit lookups");
    None
}

/// What one scan run produced, after the CSV files are written.
#[derive(Debug)]
struct RunReport {
    targets: usize,
    findings: Findings,
    rows: Vec<ScanResult>,
    csv: PathBuf,
    vuln_rows: Option<usize>,
    exploit_rows: Option<usize>,
    duration_ms: u128,
    started_at: String,
    ended_at: String,
}

/// Scan every target, then write the summary CSV, `vulns.csv` and
/// `exploits.csv` into the run directory.
fn execute<T: ScanTool + ?Sized>(
    tool: &mut T,
    s: &ScanSettings,
    profiles: &ProfileSet,
    targets: &[Target],
    ws: &RunWorkspace,
    exploits: Option<&mut ExploitFn>,
) -> Result<RunReport> {
    info!(
        targets = targets.len(),
        profiles = %profiles.names().join(","),
        delay_secs = s.delay_secs,
        dir = %ws.dir().display(),
        "starting run"
    );
    let started_at = now_rfc3339();
    let start = Instant::now();
    let mut pacer = Pacer::from_secs(s.delay_secs);
    let findings = nmap_runner::scan_all(tool, targets, profiles, ws, &mut pacer)?;
    let duration_ms = start.elapsed().as_millis();
    let ended_at = now_rfc3339();

    let rows = if s.dedup { results_csv::dedup_rows(findings.results.clone()) } else { findings.results.clone() };
    let csv = ws.dir().join(&s.output);
    results_csv::write_results(&csv, &rows, s.service)?;
    for r in &rows {
        debug!("exported result for {}:{} to {}", r.ip, r.port, csv.display());
    }

    let vuln_rows = if s.mode.vulners || !findings.vulns.is_empty() {
        let v = results_csv::dedup_rows(findings.vulns.clone());
        results_csv::write_vulns(&ws.dir().join("vulns.csv"), &v)?;
        Some(v.len())
    } else {
        None
    };

    let exploit_rows = match exploits {
        Some(lookup) => {
            let results = lookup(rows.as_slice());
            Some(results_csv::write_exploits(&ws.dir().join("exploits.csv"), &results)?)
        }
        None => None,
    };

    Ok(RunReport {
        targets: targets.len(),
        findings,
        rows,
        csv,
        vuln_rows,
        exploit_rows,
        duration_ms,
        started_at,
        ended_at,
    })
}

struct Summary<'a> {
    settings: &'a ScanSettings,
    profiles: &'a ProfileSet,
    report: &'a RunReport,
}

impl Summary<'_> {
    fn render(&self) -> Result<String> {
        let r = self.report;
        let f = &r.findings;
        if f.missing_reports > 0 {
            warn!(missing = f.missing_reports, "some scans produced no report");
        }
        let totals = serde_json::json!({
            "targets": r.targets,
            "profiles": self.profiles.names(),
            "invocations": f.invocations,
            "failed_exits": f.failed_exits,
            "missing_reports": f.missing_reports,
            "rows": r.rows.len(),
            "csv": r.csv.display().to_string(),
            "vuln_rows": r.vuln_rows,
            "exploit_rows": r.exploit_rows,
            "delay_secs": self.settings.delay_secs,
            "duration_ms": r.duration_ms as u64,
            "started_at": r.started_at,
            "ended_at": r.ended_at,
        });
        Ok(match self.settings.format {
            OutputFormat::Text => {
                let mut lines = vec![format!(
                    "{} targets x {} profiles: {} scans, {} open-port rows -> {} ({} ms)",
                    r.targets,
                    self.profiles.len(),
                    f.invocations,
                    r.rows.len(),
                    r.csv.display(),
                    r.duration_ms
                )];
                lines.extend(host_lines(&r.rows, &f.vulns));
                lines.join("\n")
            }
            OutputFormat::Json => serde_json::to_string(&totals)?,
            OutputFormat::Jsonl => {
                let mut lines = Vec::with_capacity(r.rows.len() + 1);
                for row in &r.rows {
                    let obj = serde_json::json!({
                        "ip": row.ip,
                        "port": row.port,
                        "scan_type": row.scan_type,
                        "service": row.service,
                    });
                    lines.push(serde_json::to_string(&obj)?);
                }
                lines.push(serde_json::to_string(&serde_json::json!({ "summary": totals }))?);
                lines.join("\n")
            }
        })
    }
}

/// Per-host lines: open ports (first-seen order, each port once), then one
/// line per port with vulnerability findings.
fn host_lines(rows: &[ScanResult], vulns: &[VulnFinding]) -> Vec<String> {
    let mut hosts: Vec<(&str, Vec<(u16, Option<&str>)>)> = Vec::new();
    for r in rows {
        let idx = match hosts.iter().position(|(ip, _)| *ip == r.ip) {
            Some(i) => i,
            None => {
                hosts.push((r.ip.as_str(), Vec::new()));
                hosts.len() - 1
            }
        };
        let ports = &mut hosts[idx].1;
        match ports.iter_mut().find(|(p, _)| *p == r.port) {
            Some(entry) => {
                if entry.1.is_none() {
                    entry.1 = r.service.as_deref();
                }
            }
            None => ports.push((r.port, r.service.as_deref())),
        }
    }
    let mut out = Vec::new();
    for (ip, ports) in &hosts {
        let list: Vec<String> = ports
            .iter()
            .map(|(p, svc)| match svc {
                Some(s) => format!("{p} ({s})"),
                None => p.to_string(),
            })
            .collect();
        out.push(format!("Open ports on {}: {}", ip, list.join(", ")));
        for (p, _) in ports {
            let found: Vec<String> = results_csv::dedup_rows(
                vulns.iter().filter(|v| v.ip == *ip && v.port == *p).cloned().collect(),
            )
            .into_iter()
            .map(|v| match v.cvss {
                Some(c) => format!("{} ({})", v.id, c),
                None => v.id,
            })
            .collect();
            if !found.is_empty() {
                out.push(format!("  Vulnerabilities found on port {}: {}", p, found.join(", ")));
            }
        }
    }
    out
}
