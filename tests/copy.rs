use camino::Utf8PathBuf;
use serde_json::{Value, json};

use impactu_harvest::app::{Harvester, ProgressEvent, ProgressSink};
use impactu_harvest::config::ApiSettings;
use impactu_harvest::domain::{Document, ProductsPage};
use impactu_harvest::error::HarvestError;
use impactu_harvest::impactu::ProductsClient;
use impactu_harvest::store::{Collection, MemoryCollection, Store};

struct NoopSink;

impl ProgressSink for NoopSink {
    fn event(&self, _event: ProgressEvent) {}
}

struct UnusedClient;

impl ProductsClient for UnusedClient {
    fn fetch_page(&self, _page: u32, _max: u32) -> Result<ProductsPage, HarvestError> {
        Err(HarvestError::ApiHttp("not used".to_string()))
    }
}

fn staged(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

fn staged_products() -> Vec<Document> {
    vec![
        staged(json!({
            "titles": [{"title": "First", "lang": "en"}],
            "authors": [{"full_name": "Jane Ann Doe"}],
            "abstract": "Dropped",
            "keep_abstract": false,
            "bibliographic_info": {"start_page": "1", "end_page": "9"},
            "external_ids": [{"source": "doi", "id": "10.1/a"}]
        })),
        staged(json!({
            "titles": [{"title": "Second", "lang": "es"}],
            "abstract": "Kept",
            "keep_abstract": true,
            "external_ids": [{"source": "pmid", "id": "42"}]
        })),
        staged(json!({
            "titles": [{"title": "Third", "lang": "pt"}]
        })),
    ]
}

#[test]
fn copies_one_record_per_staged_product_in_one_write() {
    let staging = MemoryCollection::with_documents("No_Scholar", staged_products());
    let destination = MemoryCollection::new("For_Moai");
    let harvester = Harvester::new(UnusedClient, &staging, &destination, ApiSettings::default());

    let report = harvester.copy(&NoopSink).unwrap();

    assert_eq!(report.records_read, 3);
    assert_eq!(report.records_written, 3);
    assert_eq!(report.batches, 1);
    assert_eq!(destination.bulk_writes(), 1);

    let written = destination.find_all().unwrap();
    assert_eq!(written[0]["title"], json!("First"));
    assert_eq!(written[0]["author"], json!("JA, Doe"));
    assert_eq!(written[0]["abstract"], json!(""));
    assert_eq!(written[0]["page"], json!("1 - 9"));
    assert_eq!(written[0]["doi"], json!("10.1/a"));
    assert_eq!(written[1]["abstract"], json!("Kept"));
    assert_eq!(written[1]["pmid"], json!("42"));
    assert_eq!(written[2]["language"], json!("pt"));
    assert_eq!(staging.count().unwrap(), 3);
}

#[test]
fn empty_staging_writes_nothing() {
    let staging = MemoryCollection::new("No_Scholar");
    let destination = MemoryCollection::new("For_Moai");
    let harvester = Harvester::new(UnusedClient, &staging, &destination, ApiSettings::default());

    let report = harvester.copy(&NoopSink).unwrap();

    assert_eq!(report.records_read, 0);
    assert_eq!(report.records_written, 0);
    assert_eq!(report.batches, 0);
    assert_eq!(destination.bulk_writes(), 0);
}

#[test]
fn rerunning_copy_duplicates_records() {
    let staging = MemoryCollection::with_documents("No_Scholar", staged_products());
    let destination = MemoryCollection::new("For_Moai");
    let harvester = Harvester::new(UnusedClient, &staging, &destination, ApiSettings::default());

    harvester.copy(&NoopSink).unwrap();
    harvester.copy(&NoopSink).unwrap();

    let written = destination.find_all().unwrap();
    assert_eq!(written.len(), 6);
    assert_eq!(written[0], written[3]);
    assert_eq!(written[2], written[5]);
}

#[test]
fn batch_size_splits_writes() {
    let staging = MemoryCollection::with_documents("No_Scholar", staged_products());
    let destination = MemoryCollection::new("For_Moai");
    let harvester = Harvester::new(UnusedClient, &staging, &destination, ApiSettings::default())
        .with_copy_batch_size(Some(2));

    let report = harvester.copy(&NoopSink).unwrap();

    assert_eq!(report.batches, 2);
    assert_eq!(report.records_written, 3);
    assert_eq!(destination.bulk_writes(), 2);
}

#[test]
fn copies_between_file_collections() {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    let store = Store::new_with_root(root);
    let staging = store.collection("ImpactU", "No_Scholar");
    let destination = store.collection("ImpactU", "For_Moai");
    for document in staged_products() {
        staging.insert_one(document).unwrap();
    }
    let harvester = Harvester::new(UnusedClient, staging, destination, ApiSettings::default());

    harvester.copy(&NoopSink).unwrap();

    let status = harvester.status().unwrap();
    assert_eq!(status.staging.documents, 3);
    assert_eq!(status.destination.documents, 3);
    assert_eq!(status.destination.name, "For_Moai");
}
