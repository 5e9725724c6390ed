use std::collections::HashSet;
use std::hash::Hash;

/// Drop exact duplicates, keeping the first occurrence of each row in place.
pub fn dedup_rows<T: Eq + Hash + Clone>(rows: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::with_capacity(rows.len());
    rows.into_iter().filter(|r| seen.insert(r.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use recon_core::ScanResult;

    fn row(ip: &str, port: u16, scan: &str, svc: Option<&str>) -> ScanResult {
        ScanResult::new(ip, port, scan).with_service(svc.map(str::to_string))
    }

    #[test]
    fn removes_exact_duplicates_keeping_first() {
        let rows = vec![
            row("10.0.0.1", 80, "default_scripts", None),
            row("10.0.0.1", 22, "default_scripts", None),
            row("10.0.0.1", 80, "default_scripts", None),
            row("10.0.0.2", 80, "default_scripts", None),
            row("10.0.0.1", 22, "default_scripts", None),
        ];
        let out = dedup_rows(rows);
        let got: Vec<(&str, u16)> = out.iter().map(|r| (r.ip.as_str(), r.port)).collect();
        assert_eq!(got, vec![("10.0.0.1", 80), ("10.0.0.1", 22), ("10.0.0.2", 80)]);
    }

    #[test]
    fn any_differing_field_keeps_both() {
        let rows = vec![
            row("10.0.0.1", 80, "default_scripts", None),
            row("10.0.0.1", 80, "service_version", None),
            row("10.0.0.1", 80, "service_version", Some("http")),
        ];
        assert_eq!(dedup_rows(rows).len(), 3);
    }

    #[test]
    fn empty_in_empty_out() {
        assert!(dedup_rows(Vec::<ScanResult>::new()).is_empty());
    }
}
