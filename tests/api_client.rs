use axum::Router;
use axum::extract::Query;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use photo_browser::api::{PhotoApi, UnsplashClient};
use photo_browser::config::Configuration;
use photo_browser::error::FetchError;
use photo_browser::events::{MergeMode, PageRequest};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct Params {
    client_id: String,
    page: u32,
    query: Option<String>,
    per_page: Option<u32>,
}

fn unauthorized(params: &Params) -> Option<Response> {
    (params.client_id != "KEY").then(|| {
        (StatusCode::UNAUTHORIZED, "OAuth error: The access token is invalid").into_response()
    })
}

async fn feed(Query(params): Query<Params>) -> Response {
    if let Some(denied) = unauthorized(&params) {
        return denied;
    }
    let per_page = params.per_page.unwrap_or(2);
    let photos: Vec<_> = (0..per_page)
        .map(|n| {
            json!({
                "id": format!("p{}-{n}", params.page),
                "description": "curated",
                "urls": { "small": format!("https://img.test/p{}-{n}", params.page) },
                "user": { "name": "Ansel" }
            })
        })
        .collect();
    axum::Json(photos).into_response()
}

async fn search(Query(params): Query<Params>) -> Response {
    if let Some(denied) = unauthorized(&params) {
        return denied;
    }
    let term = params.query.unwrap_or_default();
    axum::Json(json!({
        "total": 133,
        "total_pages": 7,
        "results": [
            { "id": format!("{term}-{}-a", params.page) },
            { "id": format!("{term}-{}-b", params.page) }
        ]
    }))
    .into_response()
}

async fn serve() -> String {
    let router = Router::new()
        .route("/photos", get(feed))
        .route("/search/photos", get(search))
        .route("/broken/photos", get(|| async { "<html>not json</html>" }))
        .route(
            "/broken/search/photos",
            get(|| async { axum::Json(json!({ "total": 0 })) }),
        );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test server");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("test server");
    });
    format!("http://{addr}")
}

fn client(base: &str, key: &str, per_page: Option<u32>) -> UnsplashClient {
    let cfg = Configuration {
        api_base_url: base.to_string(),
        access_key: Some(key.to_string()),
        per_page,
        ..Configuration::default()
    };
    UnsplashClient::new(&cfg).expect("client")
}

fn request(page: u32, query: &str) -> PageRequest {
    PageRequest {
        id: 1,
        page,
        query: query.to_string(),
        merge: MergeMode::Append,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn feed_endpoint_yields_bare_array() {
    let base = serve().await;
    let photos = client(&base, "KEY", Some(3))
        .fetch_page(request(2, ""))
        .await
        .expect("feed page");
    let ids: Vec<_> = photos.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, ["p2-0", "p2-1", "p2-2"]);
    assert_eq!(photos[0].attribution(), Some("Ansel"));
    assert_eq!(photos[0].grid_url(), Some("https://img.test/p2-0"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn search_endpoint_yields_results_field() {
    let base = serve().await;
    let photos = client(&base, "KEY", None)
        .fetch_page(request(3, "sea lions"))
        .await
        .expect("search page");
    let ids: Vec<_> = photos.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, ["sea lions-3-a", "sea lions-3-b"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn non_success_status_is_reported_without_the_key() {
    let base = serve().await;
    let err = client(&base, "WRONG", None)
        .fetch_page(request(1, ""))
        .await
        .expect_err("unauthorized");
    match &err {
        FetchError::Status { status, url } => {
            assert_eq!(*status, reqwest::StatusCode::UNAUTHORIZED);
            assert!(url.ends_with("/photos"));
        }
        other => panic!("expected status error, got {other:?}"),
    }
    assert!(!err.to_string().contains("WRONG"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn malformed_bodies_are_decode_errors() {
    let base = format!("{}/broken", serve().await);
    let api = client(&base, "KEY", None);

    let err = api.fetch_page(request(1, "")).await.expect_err("html body");
    assert!(matches!(err, FetchError::Decode(_)), "got {err:?}");

    let err = api
        .fetch_page(request(1, "cats"))
        .await
        .expect_err("missing results");
    assert!(matches!(err, FetchError::Decode(_)), "got {err:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unreachable_server_is_a_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(&format!("http://{addr}"), "KEY", None)
        .fetch_page(request(1, ""))
        .await
        .expect_err("connection refused");
    assert!(matches!(err, FetchError::Transport(_)), "got {err:?}");
}
