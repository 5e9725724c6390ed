use crate::ReportPaths;
use anyhow::{Context, Result};
use recon_core::{ScanProfile, Target};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const BASE: &str = "scan_results";

/// Output directory of one run.
///
/// Holds the combined normal-output report (`scan_results.nmap`), the scratch
/// files each invocation writes into, and optionally an `xml/` archive with
/// one report per target and profile.
#[derive(Debug, Clone)]
pub struct RunWorkspace {
    dir: PathBuf,
    keep_xml: bool,
}

impl RunWorkspace {
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).with_context(|| format!("failed to create output dir {}", dir.display()))?;
        Ok(RunWorkspace { dir, keep_xml: false })
    }

    pub fn keep_xml(mut self, yes: bool) -> Self {
        self.keep_xml = yes;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn combined_report(&self) -> PathBuf {
        self.dir.join(format!("{BASE}.nmap"))
    }

    pub fn scratch(&self) -> ReportPaths {
        ReportPaths {
            normal: self.dir.join(format!("{BASE}_tmp.nmap")),
            xml: self.dir.join(format!("{BASE}_tmp.xml")),
        }
    }

    /// Append one invocation's normal output under a `# Scan Type:` marker.
    pub fn append_section(&self, scan_type: &str, normal: &Path) -> Result<()> {
        let body = fs::read(normal).with_context(|| format!("failed to read {}", normal.display()))?;
        let path = self.combined_report();
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        write!(f, "\n# Scan Type: {scan_type}\n")?;
        f.write_all(&body)?;
        Ok(())
    }

    /// Move the scratch XML into `xml/<ip>_<profile>.xml`.
    pub fn archive_xml(&self, target: &Target, profile: &ScanProfile, paths: &ReportPaths) -> Result<Option<PathBuf>> {
        if !self.keep_xml || !paths.xml.exists() {
            return Ok(None);
        }
        let dir = self.dir.join("xml");
        fs::create_dir_all(&dir)?;
        let dest = dir.join(format!("{}_{}.xml", file_safe(&target.to_string()), file_safe(&profile.name)));
        fs::rename(&paths.xml, &dest).with_context(|| format!("failed to archive {}", dest.display()))?;
        Ok(Some(dest))
    }

    pub fn clear_scratch(&self, paths: &ReportPaths) -> Result<()> {
        for p in [&paths.normal, &paths.xml] {
            match fs::remove_file(p) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e).with_context(|| format!("failed to remove {}", p.display())),
            }
        }
        Ok(())
    }
}

fn file_safe(s: &str) -> String {
    s.chars().map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' }).collect()
}
