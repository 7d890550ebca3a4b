//! Wiremock fixtures shaped like the catalog API and image host.

use std::path::Path;
use std::time::Duration;

use chapter_downloader_core::RetrievalConfig;
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const API_PREFIX: &str = "/api/manga";
pub const IMAGE_PREFIX: &str = "/img";

/// Config pointing every endpoint at `server`, with pacing disabled.
pub fn config_for(
    server: &MockServer,
    slug: &str,
    start: u32,
    end: u32,
    output_dir: &Path,
) -> RetrievalConfig {
    let mut config = RetrievalConfig::new(slug, start, end);
    config.api_base = format!("{}{API_PREFIX}", server.uri());
    config.image_host = server.uri();
    config.referer = format!("{}/", server.uri());
    config.output_dir = output_dir.to_path_buf();
    config.request_delay = Duration::ZERO;
    config.connect_timeout = Duration::from_secs(5);
    config.read_timeout = Duration::from_secs(10);
    config
}

/// Serves the chapter listing as `{"data": [{"number", "volume"}, ...]}`.
pub async fn mount_listing(server: &MockServer, slug: &str, entries: &[(&str, u32)]) {
    let data: Vec<Value> = entries
        .iter()
        .map(|(number, volume)| json!({ "number": number, "volume": volume.to_string() }))
        .collect();
    Mock::given(method("GET"))
        .and(path(format!("{API_PREFIX}/{slug}/chapters")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": data })))
        .mount(server)
        .await;
}

/// Serves series metadata carrying `eng_name`.
pub async fn mount_metadata(server: &MockServer, slug: &str, title: &str) {
    Mock::given(method("GET"))
        .and(path(format!("{API_PREFIX}/{slug}")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": { "eng_name": title } })),
        )
        .mount(server)
        .await;
}

/// Manifest body for `number` with pages under [`IMAGE_PREFIX`].
pub fn manifest_body(number: &str, name: &str, pages: &[&str]) -> Value {
    let pages: Vec<Value> = pages
        .iter()
        .map(|page| json!({ "url": format!("{IMAGE_PREFIX}/{number}/{page}") }))
        .collect();
    json!({
        "data": {
            "id": format!("id-{number}"),
            "number": number,
            "name": name,
            "pages": pages,
            "teams": [{ "name": "Night Owls" }]
        }
    })
}

/// Serves `body` for the manifest of `number` at `volume`.
pub async fn mount_manifest(server: &MockServer, slug: &str, number: &str, volume: u32, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("{API_PREFIX}/{slug}/chapter")))
        .and(query_param("number", number))
        .and(query_param("volume", volume.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Serves `bytes` for one page after `delay`.
pub async fn mount_page(server: &MockServer, number: &str, page: &str, bytes: &[u8], delay: Duration) {
    Mock::given(method("GET"))
        .and(path(format!("{IMAGE_PREFIX}/{number}/{page}")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(bytes.to_vec())
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

/// Mounts a manifest plus one image per page for a chapter at `volume`.
pub async fn mount_chapter(server: &MockServer, slug: &str, number: &str, volume: u32, pages: &[&str]) {
    mount_manifest(
        server,
        slug,
        number,
        volume,
        manifest_body(number, &format!("Part {number}"), pages),
    )
    .await;
    for page in pages {
        mount_page(
            server,
            number,
            page,
            format!("{number}/{page}").as_bytes(),
            Duration::ZERO,
        )
        .await;
    }
}

/// Number of received requests whose path starts with `prefix`.
pub async fn requests_under(server: &MockServer, prefix: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path().starts_with(prefix))
        .count()
}

/// Number of received requests for exactly `route`.
pub async fn requests_at(server: &MockServer, route: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == route)
        .count()
}
