//! Integration tests for the harvester
//!
//! These tests use wiremock to stand in for the search source and run the
//! full query loop end-to-end over HTTP.

use query_harvest::config::{load_config, Config};
use query_harvest::crawler::{run_harvest, RunOptions};
use query_harvest::output::gather_status;
use query_harvest::storage::{ProgressStore, ResultWriter};
use std::path::Path;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Writes a zero-delay configuration and a two-query input file into `dir`
fn create_test_config(dir: &Path, base_url: &str) -> Config {
    let root = dir.display();
    std::fs::write(
        dir.join("queries.csv"),
        "id,text\n7,neural search\n8,missing topic\n",
    )
    .unwrap();

    let toml = format!(
        r#"
[input]
queries-path = "{root}/queries.csv"

[source]
base-url = "{base_url}/search"
page-load-timeout-secs = 5
summary-wait-secs = 1
results-wait-secs = 1

[politeness]
query-delay-min-secs = 0.0
query-delay-max-secs = 0.0
action-delay-min-secs = 0.0
action-delay-max-secs = 0.0
scroll-settle-ms = 0

[downloads]
asset-dir = "{root}/assets"
fetch-timeout-secs = 5

[output]
results-dir = "{root}/results"
progress-path = "{root}/progress.json"
"#
    );
    let config_path = dir.join("harvest.toml");
    std::fs::write(&config_path, toml).unwrap();
    load_config(&config_path).unwrap()
}

fn pdf_body() -> Vec<u8> {
    let mut body = b"%PDF-1.4\n".to_vec();
    body.extend(std::iter::repeat(b'0').take(4096));
    body
}

/// Mounts a source with one two-page query; only the first item has an asset
async fn mount_source(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("queryText", "neural search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body>
                <div class="Dashboard-statistics">Showing 1-2 of 2 results</div>
                <div class="List-results-items">
                  <div class="result-item">
                    <h3><a href="/document/101/">Paper One</a></h3>
                    <span class="author">Ada Lovelace</span>
                    <div class="publisher-info-container">Journal of Engines</div>
                    <span class="detail-info-year">1843</span>
                    <div class="description">Notes on the analytical engine.</div>
                  </div>
                  <div class="result-item">
                    <h3><a href="/document/102/">Paper Two</a></h3>
                  </div>
                </div>
                <a class="next-page" href="/search/page2">Next</a>
            </body></html>"#,
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search/page2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><div class="List-results-items"></div></body></html>"#,
        ))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/document/101/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "session=xyz; Path=/")
                .set_body_string(
                    r#"<html><body><a href="/stamp/stamp.jsp?arnumber=101">View PDF</a></body></html>"#,
                ),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/document/102/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body><p>Abstract only</p></body></html>"),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/stamp/stamp.jsp"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><iframe src="/stamp/getPDF.jsp?arnumber=101"></iframe></body></html>"#,
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/stamp/getPDF.jsp"))
        .and(header("cookie", "session=xyz"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(pdf_body()))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_harvest_and_resume() {
    let server = MockServer::start().await;
    mount_source(&server).await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), &server.uri());

    let summary = run_harvest(config.clone(), RunOptions::default(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.pending, 2);
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.items, 2);
    assert_eq!(summary.assets_downloaded, 1);
    assert!(!summary.interrupted);

    // Result file for the successful query only
    let writer = ResultWriter::new(&config.output.results_dir);
    let result = writer.load("7").unwrap().expect("result file for query 7");
    assert!(writer.load("8").unwrap().is_none());
    assert_eq!(result.query_text, "neural search");
    assert_eq!(result.reported_total, "Showing 1-2 of 2 results");
    assert_eq!(result.item_count, 2);

    let first = &result.items[0];
    assert_eq!(first.title, "Paper One");
    assert_eq!(first.authors, "Ada Lovelace");
    assert_eq!(first.year, "1843");
    assert_eq!(first.external_id, "101");
    assert!(first.asset_downloaded);
    let asset_path = first.asset_path.clone().unwrap();
    assert!(asset_path.ends_with("101_Paper One.pdf"));
    assert_eq!(std::fs::read(&asset_path).unwrap(), pdf_body());

    let second = &result.items[1];
    assert_eq!(second.authors, "N/A");
    assert!(!second.asset_downloaded);
    assert_eq!(second.asset_path, None);

    let progress = ProgressStore::load(Path::new(&config.output.progress_path)).unwrap();
    assert_eq!(progress.completed, vec!["7"]);
    assert_eq!(progress.failed.len(), 1);
    assert_eq!(progress.failed[0].query_id, "8");

    // Second run: the completed query is skipped, the failed one retried
    let summary = run_harvest(config.clone(), RunOptions::default(), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.pending, 1);
    assert_eq!(summary.failed, 1);

    let progress = ProgressStore::load(Path::new(&config.output.progress_path)).unwrap();
    assert_eq!(progress.completed, vec!["7"]);
    assert_eq!(progress.failed.len(), 2);
    assert_eq!(progress.outstanding_failures(), 1);

    let status = gather_status(&config).unwrap();
    assert_eq!(status.total_queries, Some(2));
    assert_eq!(status.remaining, Some(1));
    assert_eq!(status.result_files, 1);
    assert_eq!(status.asset_files, 1);
}

#[tokio::test]
async fn test_cancelled_run_records_nothing() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), &server.uri());

    let cancel = CancellationToken::new();
    cancel.cancel();
    let summary = run_harvest(config.clone(), RunOptions::default(), cancel)
        .await
        .unwrap();

    assert!(summary.interrupted);
    assert_eq!(summary.completed + summary.failed, 0);

    let progress = ProgressStore::load(Path::new(&config.output.progress_path)).unwrap();
    assert!(progress.completed.is_empty());
    assert!(progress.failed.is_empty());
}

#[tokio::test]
async fn test_fresh_and_start_from() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), &server.uri());

    let mut store = ProgressStore::open(Path::new(&config.output.progress_path)).unwrap();
    store.mark_completed("7").unwrap();

    // Only query 8 is selected; it fails against the empty server
    let options = RunOptions {
        fresh: true,
        start_from: Some(8),
    };
    let summary = run_harvest(config.clone(), options, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.pending, 1);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.failed, 1);

    let progress = ProgressStore::load(Path::new(&config.output.progress_path)).unwrap();
    assert!(progress.completed.is_empty());
    assert_eq!(progress.failed[0].query_id, "8");
}
