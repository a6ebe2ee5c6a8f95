//! State-changing routes reject requests without the session's token.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;

use dvd_shop_integration_tests::{SHIPPING_FORM, Shop, add_to_cart, register};

#[tokio::test]
async fn test_forged_requests_are_forbidden_before_any_mutation() {
    let shop = Shop::new().await;
    let mut client = shop.client();
    register(&mut client, "ada").await;
    add_to_cart(&mut client, shop.casablanca, 1).await;

    let cases = [
        (
            "/shop/addtocart",
            format!("Quantity=1&ProductId={}", shop.vertigo),
        ),
        ("/shop/removefromcart?id=1", String::new()),
        ("/shop/checkout", SHIPPING_FORM.to_string()),
        ("/shop/payment", "email=ada%40example.com&token=tok_visa".to_string()),
        ("/account/logout", String::new()),
        ("/account/login", "username=ada&password=x".to_string()),
        ("/account/register", "username=eve&password=long+enough".to_string()),
    ];
    for (uri, body) in cases {
        let response = client.post_form_without_token(uri, &body).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{uri}");
    }

    let (status, cart) = client.get_json("/shop/cart").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["item_count"], 1);
    assert!(shop.gateway.customers().is_empty());
    assert_eq!(shop.store.order_count().await, 0);

    // Still signed in: logout without a token did nothing.
    let (status, _) = client.get_json("/shop/checkout").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_token_from_another_session_is_rejected() {
    let shop = Shop::new().await;
    let mut victim = shop.client();
    victim.get("/shop").await;
    let stolen = victim.token().unwrap().to_string();

    let mut attacker = shop.client();
    attacker.get("/shop").await;
    let response = attacker
        .post_form_without_token(
            "/shop/addtocart",
            &format!(
                "Quantity=1&ProductId={}&csrf_token={}",
                shop.casablanca,
                stolen.replace('+', "%2B").replace('/', "%2F").replace('=', "%3D")
            ),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
