#![cfg(feature = "storage-rocksdb")]

mod common;

use tempfile::tempdir;

#[test]
fn test_rocksdb_cart_survives_restart() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    // 1. First run: two burgers and fries
    let mut cmd1 = common::storefront();
    cmd1.arg("cart")
        .arg("tests/fixtures/cart_events.csv")
        .arg("--db-path")
        .arg(&db_path);

    let output1 = cmd1.output().expect("Failed to execute command");
    assert!(output1.status.success());
    let stdout1 = String::from_utf8_lossy(&output1.stdout);
    assert!(stdout1.contains("subtotal,19.00"));

    // 2. Second run: same events replayed onto the restored cart
    let mut cmd2 = common::storefront();
    cmd2.arg("cart")
        .arg("tests/fixtures/cart_events.csv")
        .arg("--db-path")
        .arg(&db_path);

    let output2 = cmd2.output().expect("Failed to execute command");
    assert!(output2.status.success());
    let stdout2 = String::from_utf8_lossy(&output2.stdout);

    // Restored 2 burgers + 1 fries, merged with the same again
    assert!(stdout2.contains("1,Burger,4,8.00,32.00,no onions"));
    assert!(stdout2.contains("subtotal,38.00"));
}

#[test]
fn test_rocksdb_sessions_are_isolated() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    let mut first = common::storefront();
    first
        .arg("cart")
        .arg("tests/fixtures/cart_events.csv")
        .arg("--db-path")
        .arg(&db_path)
        .arg("--session")
        .arg("alice");
    assert!(first.output().unwrap().status.success());

    let mut second = common::storefront();
    second
        .arg("cart")
        .arg("tests/fixtures/cart_events.csv")
        .arg("--db-path")
        .arg(&db_path)
        .arg("--session")
        .arg("bob");
    let output = second.output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("subtotal,19.00"));
}

#[test]
fn test_rocksdb_checkout_clears_saved_cart() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    let mut checkout = common::storefront();
    checkout
        .arg("--demo")
        .arg("checkout")
        .arg("tests/fixtures/cart_events.csv")
        .arg("--db-path")
        .arg(&db_path);
    assert!(checkout.output().unwrap().status.success());

    let empty = dir.path().join("empty.csv");
    common::write_lines(&empty, &[&common::HEADER.join(",")]).unwrap();

    let mut cart = common::storefront();
    cart.arg("cart").arg(&empty).arg("--db-path").arg(&db_path);
    let output = cart.output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("subtotal,0.00"));
}
