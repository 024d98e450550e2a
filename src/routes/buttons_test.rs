use super::*;
use crate::services::links::LinkButton;

#[tokio::test]
async fn no_query_yields_defaults() {
    let Json(buttons) = resolve(RawQuery(None)).await;
    assert_eq!(buttons, links::default_buttons());
}

#[tokio::test]
async fn configured_buttons_replace_defaults() {
    let Json(buttons) = resolve(RawQuery(Some("btn=Docs|https://docs.rs".into()))).await;
    assert_eq!(
        buttons,
        vec![LinkButton { title: "Docs".into(), url: "https://docs.rs".into() }]
    );
}

#[tokio::test]
async fn only_invalid_buttons_fall_back_to_defaults() {
    let Json(buttons) = resolve(RawQuery(Some("btn=Bad|ftp://x".into()))).await;
    assert_eq!(buttons, links::default_buttons());
}
