mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use http_body_util::BodyExt;
use tower::ServiceExt;

use common::{SITE_TITLE, TestApp, build_app, multipart_body, multipart_content_type,
    offline_github_settings};

async fn get(app: &TestApp, path: &str) -> Response {
    app.router
        .clone()
        .oneshot(
            Request::builder()
                .uri(path)
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response")
}

async fn upload(app: &TestApp, filename: &str, content: &[u8], authed: bool) -> Response {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/upload_post")
        .header(header::CONTENT_TYPE, multipart_content_type());
    if authed {
        builder = builder.header(header::COOKIE, app.session_cookie());
    }
    app.router
        .clone()
        .oneshot(builder.body(Body::from(multipart_body(filename, content))).expect("request"))
        .await
        .expect("response")
}

async fn post_form(app: &TestApp, path: &str, body: &str, authed: bool) -> Response {
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if authed {
        builder = builder.header(header::COOKIE, app.session_cookie());
    }
    app.router
        .clone()
        .oneshot(builder.body(Body::from(body.to_string())).expect("request"))
        .await
        .expect("response")
}

async fn body_text(response: Response) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .expect("location header")
        .to_str()
        .expect("ascii location")
}

#[tokio::test]
async fn index_renders_on_an_empty_store() {
    let app = build_app(offline_github_settings());
    let response = get(&app, "/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains(SITE_TITLE));
}

#[tokio::test]
async fn upload_requires_a_session() {
    let app = build_app(offline_github_settings());
    let response = upload(&app, "Hello.md", b"# Hello", false).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(app.store.posts.lock().await.is_empty());
}

#[tokio::test]
async fn upload_creates_a_post_and_redirects_to_it() {
    let app = build_app(offline_github_settings());

    let response = upload(
        &app,
        "Hello World.md",
        b"# Hello\n\nSome **markdown** body.\n",
        true,
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/posts/hello-world");

    let posts = app.store.posts.lock().await;
    assert_eq!(posts.len(), 1);
    let post = &posts[0];
    assert_eq!(post.title, "Hello World");
    assert_eq!(post.slug, "hello-world");
    assert_eq!(post.read_time, "1 min read");
    assert!(post.body.contains("<strong>markdown</strong>"));
    drop(posts);

    let detail = get(&app, "/posts/hello-world").await;
    assert_eq!(detail.status(), StatusCode::OK);
    let body = body_text(detail).await;
    assert!(body.contains("Hello World"));
    assert!(body.contains("<strong>markdown</strong>"));
}

#[tokio::test]
async fn reupload_with_the_same_title_updates_in_place() {
    let app = build_app(offline_github_settings());

    upload(&app, "Evolving.md", b"first draft", true).await;
    let first_id = app.store.posts.lock().await[0].id;

    upload(&app, "Evolving.md", b"second draft, revised", true).await;
    let posts = app.store.posts.lock().await;
    assert_eq!(posts.len(), 1, "re-upload must not duplicate");
    assert_eq!(posts[0].id, first_id, "re-upload must keep the same row");
    assert!(posts[0].body.contains("second draft"));
    assert!(posts[0].updated_at >= posts[0].created_at);
    drop(posts);

    use penna::application::repos::PostsRepo;
    let by_title = app
        .store
        .find_by_title("Evolving")
        .await
        .expect("lookup")
        .expect("post exists");
    assert_eq!(by_title.id, first_id);
}

#[tokio::test]
async fn upload_rejects_invalid_utf8_without_persisting() {
    let app = build_app(offline_github_settings());
    let response = upload(&app, "Broken.md", &[0xff, 0xfe, 0x00, 0x80], true).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.store.posts.lock().await.is_empty());
}

#[tokio::test]
async fn upload_without_the_file_field_is_rejected() {
    let app = build_app(offline_github_settings());
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nx\r\n--{b}--\r\n",
        b = common::MULTIPART_BOUNDARY
    );
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/upload_post")
                .header(header::CONTENT_TYPE, multipart_content_type())
                .header(header::COOKIE, app.session_cookie())
                .body(Body::from(body))
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn source_block_is_extracted_from_the_body() {
    let app = build_app(offline_github_settings());
    upload(
        &app,
        "Cited.md",
        "text before\n\n<div id=\"source\">adapted from <a href=\"https://example.com/origin\">the origin</a></div>\n\ntext after\n"
            .as_bytes(),
        true,
    )
    .await;

    let posts = app.store.posts.lock().await;
    let post = &posts[0];
    assert!(!post.body.contains("id=\"source\""));
    let source = post.source.as_deref().expect("source fragment");
    assert!(source.contains("adapted from"));
    assert!(post.body.contains("text before"));
    assert!(post.body.contains("text after"));
}

#[tokio::test]
async fn toc_and_description_are_derived() {
    let app = build_app(offline_github_settings());
    upload(
        &app,
        "Structured.md",
        b"## Motivation\n\nwhy\n\n## Approach\n\nhow\n",
        true,
    )
    .await;

    let posts = app.store.posts.lock().await;
    let post = &posts[0];
    let toc = post.toc.as_deref().expect("toc");
    assert!(toc.contains("#motivation"));
    assert!(toc.contains("#approach"));
    let description = post.description.as_deref().expect("description");
    assert!(description.contains("Motivation"));
    assert!(description.chars().count() <= 128);
}

#[tokio::test]
async fn creating_a_topic_tags_existing_posts() {
    let app = build_app(offline_github_settings());
    upload(&app, "On Rust.md", b"Learning rust, one day at a time.", true).await;

    let response = post_form(&app, "/topics", "name=rust", true).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let topics = app.store.topics.lock().await;
    assert_eq!(topics.len(), 1);
    assert_eq!(topics[0].name, "Rust", "name is capitalized on creation");
    let topic_id = topics[0].id;
    drop(topics);

    let posts = app.store.posts.lock().await;
    let links = app.store.links.lock().await;
    assert!(links.contains(&(posts[0].id, topic_id)));
}

#[tokio::test]
async fn topic_creation_differing_only_in_case_is_a_noop() {
    let app = build_app(offline_github_settings());
    post_form(&app, "/topics", "name=Rust", true).await;
    upload(&app, "Later.md", b"rust arrived after the first topic", true).await;

    // Re-creating under a different case must neither add a topic nor rescan.
    let response = post_form(&app, "/topics", "name=RUST", true).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    assert_eq!(app.store.topics.lock().await.len(), 1);
    let posts = app.store.posts.lock().await;
    let links = app.store.links.lock().await;
    // The later post was tagged at upload time already; the no-op path must
    // not have added anything beyond that.
    assert_eq!(links.len(), 1);
    assert!(links.iter().all(|(post_id, _)| *post_id == posts[0].id));
}

#[tokio::test]
async fn upload_auto_assigns_existing_topics() {
    let app = build_app(offline_github_settings());
    post_form(&app, "/topics", "name=database", true).await;

    upload(&app, "Schemas.md", b"Designing a database schema calmly.", true).await;

    let posts = app.store.posts.lock().await;
    let topics = app.store.topics.lock().await;
    let links = app.store.links.lock().await;
    assert!(links.contains(&(posts[0].id, topics[0].id)));
}

#[tokio::test]
async fn cjk_topics_match_as_indivisible_units() {
    let app = build_app(offline_github_settings());
    upload(&app, "中文笔记.md", "这篇文章讨论数据库设计。".as_bytes(), true).await;

    post_form(&app, "/topics", "name=数据库", true).await;

    let posts = app.store.posts.lock().await;
    let topics = app.store.topics.lock().await;
    assert_eq!(topics[0].name, "数据库");
    let links = app.store.links.lock().await;
    assert!(links.contains(&(posts[0].id, topics[0].id)));
}

#[tokio::test]
async fn deleting_a_topic_keeps_the_posts() {
    let app = build_app(offline_github_settings());
    upload(&app, "Kept.md", b"all about rust, again", true).await;
    post_form(&app, "/topics", "name=Rust", true).await;
    assert_eq!(app.store.links.lock().await.len(), 1);

    let response = post_form(&app, "/topics/Rust/delete", "", true).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    assert!(app.store.topics.lock().await.is_empty());
    assert!(app.store.links.lock().await.is_empty());

    let detail = get(&app, "/posts/kept").await;
    assert_eq!(detail.status(), StatusCode::OK);
    let body = body_text(detail).await;
    assert!(body.contains("rust, again"));
}

#[tokio::test]
async fn deleting_an_unknown_topic_is_a_404() {
    let app = build_app(offline_github_settings());
    let response = post_form(&app, "/topics/Nope/delete", "", true).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn topic_management_requires_a_session() {
    let app = build_app(offline_github_settings());
    let create = post_form(&app, "/topics", "name=Rust", false).await;
    assert_eq!(create.status(), StatusCode::UNAUTHORIZED);
    let delete = post_form(&app, "/topics/Rust/delete", "", false).await;
    assert_eq!(delete.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_slug_renders_the_not_found_page() {
    let app = build_app(offline_github_settings());
    let response = get(&app, "/posts/no-such-post").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_text(response).await;
    assert!(body.contains("404"));
}

#[tokio::test]
async fn sitemap_lists_the_index_and_posts() {
    let app = build_app(offline_github_settings());
    upload(&app, "Mapped.md", b"content", true).await;

    let response = get(&app, "/sitemap.xml").await;
    assert_eq!(response.status(), StatusCode::OK);
    let xml = body_text(response).await;
    assert!(xml.contains("<loc>http://blog.test/</loc>"));
    assert!(xml.contains("<loc>http://blog.test/posts/mapped</loc>"));
}

#[tokio::test]
async fn robots_and_health_respond() {
    let app = build_app(offline_github_settings());

    let robots = get(&app, "/robots.txt").await;
    assert_eq!(robots.status(), StatusCode::OK);
    assert!(body_text(robots).await.contains("Sitemap:"));

    let health = get(&app, "/_health/db").await;
    assert_eq!(health.status(), StatusCode::OK);
}

#[tokio::test]
async fn chinese_titles_get_transliterated_slugs() {
    let app = build_app(offline_github_settings());
    let response = upload(&app, "基础教程.md", "# 内容\n".as_bytes(), true).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/posts/ji-chu-jiao-cheng");
}
