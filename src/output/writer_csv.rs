use crate::models::{Outcome, ResultSet};
use csv::Writer;
use std::fs::File;
use std::path::Path;

/// Write the raw audit sequence: one row per probe, in submission order per target.
pub fn write_csv(path: &Path, results: &[ResultSet]) -> anyhow::Result<()> {
    let f = File::create(path)?;
    let mut w = Writer::from_writer(f);
    w.write_record(["target","index","candidate","host","status_code","content_length","body_digest","error"])?;
    for result in results {
        for rec in &result.records {
            let (status, length, digest, error) = match &rec.outcome {
                Outcome::Response(r) => (
                    r.status_code.to_string(),
                    r.content_length.to_string(),
                    r.body_digest.clone(),
                    String::new(),
                ),
                Outcome::Failed(e) => (String::new(), String::new(), String::new(), e.to_string()),
            };
            w.write_record(&[
                result.target.clone(),
                rec.index.to_string(),
                rec.candidate.name.clone(),
                rec.host.clone(),
                status,
                length,
                digest,
                error,
            ])?;
        }
    }
    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{RequestError, RequestErrorKind};
    use crate::models::{Candidate, ResponseCapture, ScanRecord};
    use std::sync::Arc;

    #[test]
    fn one_row_per_record_with_errors_inline() {
        let ok = ScanRecord {
            index: 0,
            candidate: Candidate::new("www.%s"),
            host: "www.corp.local".into(),
            outcome: Outcome::Response(ResponseCapture {
                status_code: 200,
                content_length: 5,
                body_digest: "abc".into(),
                body: None,
                headers: Vec::new(),
            }),
        };
        let failed = ScanRecord {
            index: 1,
            candidate: Candidate::new("dev"),
            host: "dev".into(),
            outcome: Outcome::Failed(RequestError::new(RequestErrorKind::Timeout, "slow")),
        };
        let result = ResultSet {
            target: "10.0.0.1".into(),
            records: vec![Arc::new(ok), Arc::new(failed)],
            ..Default::default()
        };

        let path = std::env::temp_dir().join(format!("vhost_hunter_csv_{}.csv", std::process::id()));
        write_csv(&path, &[result]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "10.0.0.1,0,www.%s,www.corp.local,200,5,abc,");
        assert_eq!(lines[2], "10.0.0.1,1,dev,dev,,,,Timeout: slow");
    }
}
