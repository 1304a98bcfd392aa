mod common;

use common::{pipeline, xlsx, ScriptedProvider};
use llm_policy_audit::artifact::{carried_suffix, ArtifactStore};
use llm_policy_audit::stages::RewriteRequest;
use llm_policy_audit::{Backend, Error};
use std::fs;
use tempfile::TempDir;

fn rewrite_request(input: &str) -> RewriteRequest<'_> {
    RewriteRequest {
        input_filename: input,
        system_instructions: "Return JSON",
        backend: Backend::Anthropic,
        model: "claude-haiku-4-5",
    }
}

#[tokio::test]
async fn test_stages_refuse_paths_outside_the_store() {
    let dir = TempDir::new().unwrap();
    let provider = ScriptedProvider::new(&[]);
    let pipeline = pipeline(dir.path(), provider.clone());

    // A real file sitting just outside the store
    fs::write(dir.path().join("outside.xlsx"), xlsx(&[&["id"]])).unwrap();

    for name in ["../outside.xlsx", "../../etc/passwd", "/etc/passwd"] {
        let err = pipeline.rewrite(rewrite_request(name)).await.unwrap_err();
        assert!(matches!(err, Error::PathSafety(_)), "rewrite accepted {name:?}");

        let err = pipeline.report(name).unwrap_err();
        assert!(matches!(err, Error::PathSafety(_)), "report accepted {name:?}");
    }
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_missing_artifact_is_not_found() {
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(dir.path(), ScriptedProvider::new(&[]));

    let err = pipeline
        .rewrite(rewrite_request("20240101_120000_Acme_SOC2.xlsx"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ArtifactNotFound(_)));
    assert!(err.is_client_error());
}

#[test]
fn test_carried_suffix_next_stage_name() {
    let dir = TempDir::new().unwrap();
    let store = ArtifactStore::open(dir.path()).unwrap();

    let next = format!(
        "{}_{}.xlsx",
        store.timestamp(),
        carried_suffix("20240101_120000_Acme_SOC2.xlsx")
    );
    assert!(next.ends_with("_Acme_SOC2.xlsx"));
    assert_eq!(next.len(), "YYYYMMDD_HHMMSS_Acme_SOC2.xlsx".len());
    assert_eq!(carried_suffix(&next), "Acme_SOC2");
}

#[test]
fn test_report_on_non_timestamped_name_keeps_whole_stem() {
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(dir.path(), ScriptedProvider::new(&[]));

    let table = xlsx(&[
        &["id", "title", "control", "suggestions"],
        &["1", "Access Control", "Must enforce MFA", "Add MFA"],
    ]);
    pipeline.store().write("acme_soc2.xlsx", &table).unwrap();

    let report = pipeline.report("acme_soc2.xlsx").unwrap();
    assert_eq!(report.docx_file, "20240101_120000_acme_soc2.docx");
    assert!(report.rows_reported);
}
