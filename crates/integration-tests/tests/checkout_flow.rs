//! Checkout, payment and order commit end to end.

#![allow(clippy::unwrap_used)]

use axum::http::{StatusCode, header};

use dvd_shop_integration_tests::{
    FakeGateway, PAYMENT_FORM, SHIPPING_FORM, Shop, TestClient, add_to_cart, json_body, register,
};

async fn checked_out(shop: &Shop) -> TestClient {
    let mut client = shop.client();
    register(&mut client, "ada").await;
    add_to_cart(&mut client, shop.casablanca, 2).await;
    add_to_cart(&mut client, shop.vertigo, 1).await;

    let response = client.post_form("/shop/checkout", SHIPPING_FORM).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    client
}

#[tokio::test]
async fn test_successful_payment_commits_order_and_empties_cart() {
    let shop = Shop::new().await;
    let mut client = checked_out(&shop).await;

    let (_, payment) = client.get_json("/shop/payment").await;
    assert_eq!(payment["total"], "39.97");

    let response = client.post_form("/shop/payment", PAYMENT_FORM).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers()[header::LOCATION]
        .to_str()
        .unwrap()
        .to_string();

    assert_eq!(shop.gateway.charges(), vec![3997]);
    assert_eq!(shop.gateway.customers(), vec!["ada@example.com".to_string()]);
    assert_eq!(shop.store.order_count().await, 1);
    assert_eq!(shop.store.order_detail_count().await, 2);

    let (status, order) = client.get_json(&location).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["order"]["total"], "39.97");
    assert_eq!(order["order"]["owner"], "ada");
    assert_eq!(order["order"]["shipping"]["city"], "London");
    let details = order["details"].as_array().unwrap();
    assert_eq!(details[0]["quantity"], 2);
    assert_eq!(details[0]["price"], "9.99");
    assert_eq!(details[1]["quantity"], 1);
    assert_eq!(details[1]["price"], "19.99");

    let (_, cart) = client.get_json("/shop/cart").await;
    assert!(cart["lines"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_declined_payment_leaves_no_order_and_cart_intact() {
    let shop = Shop::with_gateway(FakeGateway::declining()).await;
    let mut client = checked_out(&shop).await;

    let response = client.post_form("/shop/payment", PAYMENT_FORM).await;
    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().starts_with("Payment declined"));

    assert_eq!(shop.store.order_count().await, 0);
    assert_eq!(shop.store.order_detail_count().await, 0);
    let (_, cart) = client.get_json("/shop/cart").await;
    assert_eq!(cart["total"], "39.97");
}

#[tokio::test]
async fn test_failed_commit_leaves_no_order_and_cart_intact() {
    let shop = Shop::new().await;
    let mut client = checked_out(&shop).await;
    shop.store.fail_commits(true);

    let response = client.post_form("/shop/payment", PAYMENT_FORM).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["error"], "Internal server error");

    assert_eq!(shop.store.order_count().await, 0);
    let (_, cart) = client.get_json("/shop/cart").await;
    assert_eq!(cart["item_count"], 3);
}

#[tokio::test]
async fn test_cart_change_after_checkout_blocks_the_charge() {
    let shop = Shop::new().await;
    let mut client = checked_out(&shop).await;
    add_to_cart(&mut client, shop.vertigo, 1).await;

    let response = client.post_form("/shop/payment", PAYMENT_FORM).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "cart changed since checkout");
    assert!(shop.gateway.customers().is_empty());
}

#[tokio::test]
async fn test_empty_cart_cannot_check_out() {
    let shop = Shop::new().await;
    let mut client = shop.client();
    register(&mut client, "ada").await;

    let response = client.post_form("/shop/checkout", SHIPPING_FORM).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "cart is empty");
}

#[tokio::test]
async fn test_orders_are_visible_only_to_their_owner() {
    let shop = Shop::new().await;
    let mut client = checked_out(&shop).await;
    let response = client.post_form("/shop/payment", PAYMENT_FORM).await;
    let location = response.headers()[header::LOCATION]
        .to_str()
        .unwrap()
        .to_string();

    let mut other = shop.client();
    register(&mut other, "grace").await;
    let (status, _) = other.get_json(&location).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let mut guest = shop.client();
    let (status, _) = guest.get_json(&location).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
