#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use dirsync::db::{Database, Person};
use dirsync::error::ExtractError;
use dirsync::extract::{Converter, Extractor, ProfileLayout};
use dirsync::fetch::{create_http_client, ProfileFetcher};
use dirsync::reconcile::Reconciler;
use dirsync::workers::SyncContext;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Treats the fetched page as already converted: the mock server serves
/// tagged text directly.
pub struct PassThroughConverter;

impl Converter for PassThroughConverter {
    fn convert(&self, html_path: &Path) -> Result<String, ExtractError> {
        Ok(std::fs::read_to_string(html_path)?)
    }
}

/// Tagged text for a profile page in the directory's layout.
pub fn profile_page(name: &str, address: &[&str], room: &str, mail_stop: &str, email: &str) -> String {
    let mut page = String::from("[ROW:0]\n<COL:1>Employee Directory\n");
    page.push_str(&format!("[ROW:2]\n<COL:1>{}\n", name));
    if !email.is_empty() {
        page.push_str(&format!("[ROW:6]\n<COL:2>E-mail\n<COL:4>{}\n", email));
    }
    for (offset, line) in address.iter().enumerate() {
        page.push_str(&format!("[ROW:{}]\n<COL:4>{}\n", 14 + offset, line));
    }
    page.push_str(&format!("[ROW:18]\n<COL:4>{}\n", room));
    page.push_str(&format!("[ROW:19]\n<COL:4>{}\n", mail_stop));
    page
}

pub async fn mount_profile(server: &MockServer, url_path: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(url_path))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

pub async fn memory_store(people: &[Person]) -> (Database, Vec<i64>) {
    let db = Database::connect("sqlite::memory:", 1).await.unwrap();
    db.create_schema().await.unwrap();
    let mut ids = Vec::new();
    for person in people {
        ids.push(db.insert_person(person).await.unwrap());
    }
    (db, ids)
}

pub fn sync_context(server: &MockServer, db: Database, work_dir: &Path) -> Arc<SyncContext> {
    let fetcher = ProfileFetcher::new(
        create_http_client().unwrap(),
        &format!("{}/", server.uri()),
        2,
        Duration::from_millis(10),
    );
    let extractor = Extractor::new(Arc::new(PassThroughConverter), work_dir.to_path_buf());
    Arc::new(SyncContext::new(
        fetcher,
        extractor,
        ProfileLayout::default(),
        Reconciler::new(db, "faa.gov", true),
    ))
}
