use serde_json::json;

use impactu_harvest::domain::{Author, Document, Scalar};
use impactu_harvest::normalize::{format_author, format_authors, normalize, page_range};

fn document(value: serde_json::Value) -> Document {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

fn authors(names: &[&str]) -> Vec<Author> {
    names
        .iter()
        .map(|name| Author {
            full_name: Some(name.to_string()),
        })
        .collect()
}

#[test]
fn author_initials_and_surname() {
    assert_eq!(format_author("Jane Ann Doe"), "JA, Doe");
    assert_eq!(format_author("Doe"), "Doe");
    assert_eq!(format_author(""), "");
}

#[test]
fn three_authors_joined() {
    let list = authors(&["Jane Ann Doe", "John Smith", "Ann Lee"]);
    assert_eq!(format_authors(&list), "JA, Doe and J, Smith and A, Lee");
}

#[test]
fn authors_beyond_third_are_dropped() {
    let list = authors(&["Jane Ann Doe", "John Smith", "Ann Lee", "Carl Sagan"]);
    assert_eq!(format_authors(&list), "JA, Doe and J, Smith and A, Lee");
}

#[test]
fn page_bounds() {
    let ten = Scalar::from("10");
    let twenty = Scalar::from("20");
    let blank = Scalar::from("");
    assert_eq!(page_range(Some(&ten), Some(&twenty)), "10 - 20");
    assert_eq!(page_range(Some(&ten), Some(&blank)), "10");
    assert_eq!(page_range(Some(&blank), Some(&twenty)), "20");
    assert_eq!(page_range(Some(&blank), Some(&blank)), "");
    assert_eq!(page_range(None, None), "");
}

#[test]
fn doi_and_pmid_from_external_ids() {
    let record = normalize(&document(json!({
        "external_ids": [
            {"source": "doi", "id": "10.1/x"},
            {"source": "pmid", "id": "999"}
        ]
    })));
    assert_eq!(record.doi, "10.1/x");
    assert_eq!(record.pmid, "999");

    let record = normalize(&document(json!({"external_ids": []})));
    assert_eq!(record.doi, "");
    assert_eq!(record.pmid, "");
}

#[test]
fn last_duplicate_doi_wins() {
    let record = normalize(&document(json!({
        "external_ids": [
            {"source": "doi", "id": "10.1/first"},
            {"source": "doi", "id": "10.1/second"}
        ]
    })));
    assert_eq!(record.doi, "10.1/second");
}

#[test]
fn abstract_follows_keep_flag() {
    let suppressed = normalize(&document(json!({
        "abstract": "Some findings.",
        "keep_abstract": false
    })));
    assert_eq!(suppressed.abstract_text, json!(""));

    let kept = normalize(&document(json!({
        "abstract": "Some findings.",
        "keep_abstract": true
    })));
    assert_eq!(kept.abstract_text, json!("Some findings."));

    let unflagged = normalize(&document(json!({"abstract": "Some findings."})));
    assert_eq!(unflagged.abstract_text, json!("Some findings."));
}

#[test]
fn falsy_keep_flag_suppresses_abstract() {
    for flag in [json!(null), json!(0), json!(""), json!([])] {
        let record = normalize(&document(json!({
            "abstract": "Confidential findings.",
            "keep_abstract": flag
        })));
        assert_eq!(record.abstract_text, json!(""), "flag {flag}");
    }

    let record = normalize(&document(json!({
        "abstract": "Public findings.",
        "keep_abstract": "yes"
    })));
    assert_eq!(record.abstract_text, json!("Public findings."));
}

#[test]
fn abstract_passes_through_verbatim() {
    let structured = json!({"es": "Resumen", "en": "Summary"});
    let record = normalize(&document(json!({"abstract": structured.clone()})));
    assert_eq!(record.abstract_text, structured);

    let record = normalize(&document(json!({"abstract": null})));
    assert_eq!(record.abstract_text, json!(null));

    let record = normalize(&document(json!({})));
    assert_eq!(record.abstract_text, json!(""));
}

#[test]
fn numeric_zero_page_bound_counts_as_present() {
    let zero = Scalar::Number(0.into());
    let five = Scalar::Number(5.into());
    assert_eq!(page_range(Some(&zero), Some(&five)), "0 - 5");
    assert_eq!(page_range(Some(&zero), None), "0");

    let record = normalize(&document(json!({
        "bibliographic_info": {"start_page": 0, "end_page": ""}
    })));
    assert_eq!(record.page, "0");
}

#[test]
fn full_record() {
    let record = normalize(&document(json!({
        "titles": [
            {"title": "Dengue in Antioquia", "lang": "en"},
            {"title": "Dengue en Antioquia", "lang": "es"}
        ],
        "authors": [{"full_name": "Maria Fernanda Gomez"}, {"full_name": "Luis Perez"}],
        "source": {
            "names": [{"name": ""}, {"name": "Revista Médica"}, {"name": "Rev Med"}],
            "publisher": {"name": "Universidad de Antioquia", "country_code": "CO"}
        },
        "bibliographic_info": {"volume": "12", "issue": 3, "start_page": "10", "end_page": "20"},
        "year_published": 2021,
        "abstract": "Hidden",
        "keep_abstract": false,
        "external_ids": [{"source": "doi", "id": "10.1/x"}]
    })));

    assert_eq!(record.journal, "Revista Médica");
    assert_eq!(record.publisher, "Universidad de Antioquia");
    assert_eq!(record.country, "CO");
    assert_eq!(record.title, "Dengue in Antioquia");
    assert_eq!(record.language, "en");
    assert_eq!(record.author, "MF, Gomez and L, Perez");
    assert_eq!(record.year, Scalar::Number(2021.into()));
    assert_eq!(record.volume, Scalar::from("12"));
    assert_eq!(record.issue, Scalar::Number(3.into()));
    assert_eq!(record.page, "10 - 20");
    assert_eq!(record.abstract_text, json!(""));
    assert_eq!(record.doi, "10.1/x");
    assert_eq!(record.pmid, "");
}

#[test]
fn missing_structure_degrades_to_empty() {
    let record = normalize(&document(json!({})));
    assert_eq!(record.journal, "");
    assert_eq!(record.publisher, "");
    assert_eq!(record.country, "");
    assert_eq!(record.title, "");
    assert_eq!(record.language, "");
    assert_eq!(record.author, "");
    assert_eq!(record.year, Scalar::default());
    assert_eq!(record.volume, Scalar::default());
    assert_eq!(record.page, "");
}

#[test]
fn malformed_structure_degrades_to_empty() {
    let record = normalize(&document(json!({
        "source": {"names": "not a list", "publisher": "Elsevier"},
        "titles": [],
        "authors": [{"full_name": null}, "bogus"],
        "bibliographic_info": null
    })));
    assert_eq!(record.journal, "");
    assert_eq!(record.publisher, "");
    assert_eq!(record.country, "");
    assert_eq!(record.title, "");
    assert_eq!(record.author, " and ");
    assert_eq!(record.page, "");

    let record = normalize(&document(json!({"source": ["not", "an", "object"]})));
    assert_eq!(record.publisher, "");
    assert_eq!(record.journal, "");
}

#[test]
fn normalized_document_has_exact_keys() {
    let record = normalize(&document(json!({"year_published": "2020"})));
    let doc = record.into_document().unwrap();
    let mut keys: Vec<&str> = doc.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(
        keys,
        vec![
            "abstract", "author", "country", "doi", "issue", "journal", "language", "page",
            "pmid", "publisher", "title", "volume", "year"
        ]
    );
    assert_eq!(doc["year"], json!("2020"));
}
