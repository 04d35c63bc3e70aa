use common::ShareConfig;
use sharesum::share::{resolve_shared_text, SharedContent};

const ARTICLE_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><title>Ferris goes to space</title></head>
<body>
  <nav><a href="/">Home</a> <a href="/about">About</a></nav>
  <article>
    <h1>Ferris goes to space</h1>
    <p>The crab mascot of the Rust project was launched into low orbit this morning aboard a
    small research satellite, according to the team that built the flight software in Rust.</p>
    <p>Engineers said the onboard scheduler ran for the entire mission without a single memory
    fault, which they credited to the borrow checker and a conservative use of unsafe code.</p>
    <p>The satellite will stay in orbit for six months while collecting radiation measurements
    that will be published as open data at the end of the year.</p>
  </article>
  <footer>Copyright example.com</footer>
</body>
</html>"#;

fn fetching() -> ShareConfig {
    ShareConfig {
        fetch_links: Some(true),
        fetch_timeout_seconds: Some(5),
        max_chars: None,
    }
}

#[tokio::test]
async fn bare_link_is_expanded_with_article_text() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("GET", "/story")
        .with_status(200)
        .with_header("content-type", "text/html; charset=utf-8")
        .with_body(ARTICLE_HTML)
        .create_async()
        .await;

    let link = format!("{}/story", server.url());
    let text = resolve_shared_text(SharedContent::new(link.clone()), &fetching()).await;

    assert!(text.starts_with(&link), "{}", text);
    assert!(text.contains("borrow checker"), "{}", text);

    mock.assert_async().await;
}

#[tokio::test]
async fn unreachable_link_is_passed_through() {
    let mut server = mockito::Server::new_async().await;

    let _mock = server
        .mock("GET", "/gone")
        .with_status(404)
        .create_async()
        .await;

    let link = format!("{}/gone", server.url());
    let text = resolve_shared_text(SharedContent::new(format!("  {}  ", link)), &fetching()).await;

    assert_eq!(text, link);
}

#[tokio::test]
async fn text_with_a_link_inside_is_not_fetched() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("GET", "/story")
        .with_status(200)
        .with_body(ARTICLE_HTML)
        .expect(0)
        .create_async()
        .await;

    let shared = format!("Look at this: {}/story", server.url());
    let text = resolve_shared_text(
        SharedContent::new(shared.clone()).with_subject("From a friend"),
        &fetching(),
    )
    .await;

    assert_eq!(text, format!("From a friend\n\n{}", shared));
    mock.assert_async().await;
}
