//! Sequential nmap orchestration: one blocking invocation per target and
//! profile, reports collected into a run workspace.

mod dispatch;
mod tool;
mod workspace;

pub use dispatch::{run_profile, scan_all, scan_target, Findings};
pub use tool::{NmapTool, ReportPaths, RunStatus, ScanTool};
pub use workspace::RunWorkspace;
