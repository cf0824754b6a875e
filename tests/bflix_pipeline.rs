//! Bflix search → detail → playback against a mock site.

use cinefetch::config::ResolutionConfig;
use cinefetch::crypto::vrf;
use cinefetch::model::ContentKind;
use cinefetch::{BflixResolver, HttpClient, Resolver};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "OrAimkpzm6phmN3j";

fn resolver(server: &MockServer) -> BflixResolver {
    BflixResolver::with_base_url(HttpClient::new().unwrap(), &server.uri())
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(body)
}

/// The `vrf` value as the server sees it after query decoding.
fn vrf_param(text: &str) -> String {
    let token = vrf::encode(text, KEY).unwrap();
    urlencoding::decode(&token).unwrap().into_owned()
}

/// A server lookup answer carrying `url` as a bare VRF token.
fn episode_info(url: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({ "url": vrf_param(url) }))
}

const FILM_PAGE: &str = r#"
    <div id="watch" data-id="8kx1"></div>
    <div class="info">
      <h1>Dark</h1>
      <img class="poster" src="https://img.example/dark.jpg">
      <div class="desc">A missing child sets four families on a hunt.</div>
      <div class="meta"><div>Genre: <a>Drama</a> <a>Mystery</a></div></div>
    </div>"#;

const SERVERS: &str = r#"
    <div class="episode"><a href="/series/dark-xyz/1-2" data-kname="1-2"
        data-ep='{"28":"s28","35":"s35","41":"s41","99":"s99"}'><span class="name">Lies</span></a></div>
    <div class="episode"><a href="/series/dark-xyz/1-1" data-kname="1-1"
        data-ep='{"28":"e1"}'><span class="name">Secrets</span></a></div>"#;

async fn mount_film(server: &MockServer, film_path: &str, servers_html: &str) {
    Mock::given(method("GET"))
        .and(path(film_path))
        .respond_with(html(FILM_PAGE))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ajax/film/servers"))
        .and(query_param("id", "8kx1"))
        .and(query_param("vrf", vrf_param("8kx1")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "html": servers_html })),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn search_sends_vrf_and_reads_quality() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("keyword", "dark"))
        .and(query_param("vrf", vrf_param("dark")))
        .respond_with(html(
            r#"<div class="filmlist">
                 <div class="item">
                   <a class="poster" href="/series/dark-xyz"><img src="https://img.example/dark.jpg"></a>
                   <div class="quality">HD</div>
                   <h3><a href="/series/dark-xyz">Dark</a></h3>
                 </div>
                 <div class="item">
                   <a class="poster" href="/movie/dark-city"><img src="https://img.example/city.jpg"></a>
                   <h3><a href="/movie/dark-city">Dark City</a></h3>
                 </div>
               </div>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let items = resolver(&server)
        .search("dark", &ResolutionConfig::default())
        .await;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].id, "Bflix:/series/dark-xyz");
    assert_eq!(items[0].kind, ContentKind::Series);
    assert_eq!(items[0].extra.get("quality").map(String::as_str), Some("HD"));
    assert_eq!(items[1].kind, ContentKind::Movie);
}

#[tokio::test]
async fn series_detail_orders_episodes() {
    let server = MockServer::start().await;
    mount_film(&server, "/series/dark-xyz", SERVERS).await;

    let detail = resolver(&server)
        .load_detail("Bflix:/series/dark-xyz", &ResolutionConfig::default())
        .await
        .expect("detail should load");

    assert_eq!(detail.title, "Dark");
    assert_eq!(detail.kind, ContentKind::Series);
    assert_eq!(detail.genres, ["Drama", "Mystery"]);
    assert_eq!(detail.poster_url.as_deref(), Some("https://img.example/dark.jpg"));
    let children: Vec<_> = detail
        .children
        .iter()
        .map(|c| (c.season, c.episode, c.title.as_str()))
        .collect();
    assert_eq!(children, [(1, 1, "Secrets"), (1, 2, "Lies")]);
    assert_eq!(detail.children[1].id, "Bflix:/series/dark-xyz/1-2");
}

#[tokio::test]
async fn movie_detail_reuses_item_path() {
    let server = MockServer::start().await;
    mount_film(&server, "/movie/dark-city", SERVERS).await;

    let detail = resolver(&server)
        .load_detail("Bflix:/movie/dark-city", &ResolutionConfig::default())
        .await
        .unwrap();
    assert_eq!(detail.kind, ContentKind::Movie);
    assert_eq!(detail.children.len(), 1);
    assert_eq!(detail.children[0].id, "Bflix:/movie/dark-city");
    assert_eq!((detail.children[0].season, detail.children[0].episode), (1, 1));
}

#[tokio::test]
async fn detail_without_watch_id_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/series/gone"))
        .respond_with(html("<div class=\"info\"><h1>Gone</h1></div>"))
        .mount(&server)
        .await;

    assert!(resolver(&server)
        .load_detail("Bflix:/series/gone", &ResolutionConfig::default())
        .await
        .is_none());
}

#[tokio::test]
async fn playback_walks_allowed_servers_in_order() {
    let server = MockServer::start().await;
    mount_film(&server, "/series/dark-xyz/1-2", SERVERS).await;

    Mock::given(method("GET"))
        .and(path("/ajax/episode/info"))
        .and(query_param("id", "s28"))
        .respond_with(episode_info("https://cdn.example/dark/master.m3u8"))
        .mount(&server)
        .await;
    // one broken server must not stop the loop
    Mock::given(method("GET"))
        .and(path("/ajax/episode/info"))
        .and(query_param("id", "s35"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ajax/episode/info"))
        .and(query_param("id", "s41"))
        .respond_with(episode_info("https://direct.example/dark.mp4"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ajax/episode/info"))
        .and(query_param("id", "s99"))
        .respond_with(episode_info("https://never.example/x.mp4"))
        .expect(0)
        .mount(&server)
        .await;

    let streams = resolver(&server)
        .resolve_playback("Bflix:/series/dark-xyz/1-2", &ResolutionConfig::default())
        .await;

    let got: Vec<_> = streams
        .iter()
        .map(|s| (s.label.as_str(), s.url.as_str()))
        .collect();
    assert_eq!(
        got,
        [
            ("Server 28 (HLS)", "https://cdn.example/dark/master.m3u8"),
            ("Server 41 (Direct)", "https://direct.example/dark.mp4"),
        ]
    );
    assert!(streams.iter().all(|s| s.source_name == "Bflix"));
}

#[tokio::test]
async fn playback_matches_full_suffix_and_caps() {
    let server = MockServer::start().await;
    mount_film(&server, "/series/dark-xyz/1-2-full", SERVERS).await;
    Mock::given(method("GET"))
        .and(path("/ajax/episode/info"))
        .respond_with(episode_info("https://cdn.example/any.m3u8"))
        .mount(&server)
        .await;

    let config = ResolutionConfig::default().with_result_limit(2);
    let streams = resolver(&server)
        .resolve_playback("Bflix:/series/dark-xyz/1-2-full", &config)
        .await;
    let labels: Vec<_> = streams.iter().map(|s| s.label.as_str()).collect();
    assert_eq!(labels, ["Server 28 (HLS)", "Server 35 (HLS)"]);
}

#[tokio::test]
async fn playback_without_matching_block_is_empty() {
    let server = MockServer::start().await;
    mount_film(&server, "/series/dark-xyz/9-9", SERVERS).await;

    let streams = resolver(&server)
        .resolve_playback("Bflix:/series/dark-xyz/9-9", &ResolutionConfig::default())
        .await;
    assert!(streams.is_empty());
}

#[tokio::test]
async fn servers_response_without_html_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/movie/dark-city"))
        .respond_with(html(FILM_PAGE))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ajax/film/servers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "status": 404 })))
        .mount(&server)
        .await;

    let resolver = resolver(&server);
    let config = ResolutionConfig::default();
    assert!(resolver
        .resolve_playback("Bflix:/movie/dark-city", &config)
        .await
        .is_empty());
    assert!(resolver
        .load_detail("Bflix:/movie/dark-city", &config)
        .await
        .is_some());
}
