use crate::models::ResultSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write one JSON document holding every result set, in target order.
pub fn write_json(path: &Path, results: &[ResultSet]) -> anyhow::Result<()> {
    let mut f = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut f, results)?;
    f.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_an_array_of_result_sets() {
        let result = ResultSet { target: "10.0.0.1".into(), unique_depth: 1, ..Default::default() };
        let path = std::env::temp_dir().join(format!("vhost_hunter_json_{}.json", std::process::id()));
        write_json(&path, &[result]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(value[0]["target"], "10.0.0.1");
        assert_eq!(value[0]["scanned"], 0);
        assert!(value[0]["groups"].as_array().unwrap().is_empty());
    }
}
