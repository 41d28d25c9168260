use crate::workflow::Workflow;
use anyhow::Context;
use std::fs;
use std::path::Path;

/// Render a workflow as pretty JSON with sorted keys and 2-space indentation.
///
/// Going through `serde_json::Value` sorts object keys, since its map is
/// ordered by key.
pub fn render_workflow_json(workflow: &Workflow) -> anyhow::Result<String> {
    let value = serde_json::to_value(workflow)?;
    Ok(serde_json::to_string_pretty(&value)?)
}

/// Write a workflow to `path`, replacing any existing file.
pub fn write_workflow(workflow: &Workflow, path: &Path) -> anyhow::Result<()> {
    let json = render_workflow_json(workflow)?;
    fs::write(path, json).with_context(|| format!("write workflow {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{FileMapping, JobDescriptor};
    use pretty_assertions::assert_eq;

    #[test]
    fn keys_are_sorted_and_numbers_stay_numbers() {
        let job = JobDescriptor::new("wf_nps_coin_0100", "run.sh")
            .with_inputs(vec![FileMapping::new("a", "/mss/a")])
            .with_disk_bytes(41_000_000_000);
        let json = render_workflow_json(&Workflow::new("wf", vec![job])).unwrap();

        let expected = r#"{
  "jobs": [
    {
      "command": [
        "run.sh"
      ],
      "disk_bytes": 41000000000,
      "inputs": [
        {
          "local": "a",
          "remote": "/mss/a"
        }
      ],
      "name": "wf_nps_coin_0100"
    }
  ],
  "name": "wf"
}"#;
        assert_eq!(json, expected);
    }

    #[test]
    fn written_file_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wf.json");
        let wf = Workflow::new("wf", vec![JobDescriptor::new("wf_job0", "echo hi")]);
        write_workflow(&wf, &path).unwrap();

        let back: Workflow = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back, wf);
    }
}
