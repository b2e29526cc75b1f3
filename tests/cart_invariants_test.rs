mod common;

use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use storefront::domain::cart::Cart;
use storefront::domain::money::Money;
use storefront::interfaces::csv::cart_event_reader::CartEventReader;

const PRICES: [Decimal; 4] = [dec!(8.00), dec!(3.00), dec!(1.50), dec!(12.25)];

fn expected_total(cart: &Cart) -> Decimal {
    cart.lines()
        .iter()
        .map(|l| Decimal::from(l.quantity) * l.unit_price.0)
        .sum()
}

#[test]
fn test_random_mutations_keep_totals_consistent() {
    let mut rng = rand::thread_rng();
    let mut cart = Cart::new();

    for _ in 0..2_000 {
        let id = rng.gen_range(1..=PRICES.len() as i64);
        let price = Money::new(PRICES[(id - 1) as usize]);
        match rng.gen_range(0..10) {
            0..=5 => cart.add_priced(id, "Item", price, rng.gen_range(0..4), ""),
            6 | 7 => cart.update_quantity(id, rng.gen_range(-1..5)),
            8 => cart.remove_item(id),
            _ => {
                if rng.gen_bool(0.1) {
                    cart.clear();
                }
            }
        }

        assert_eq!(cart.total_price().0, expected_total(&cart));
        assert!(cart.lines().iter().all(|l| l.quantity > 0));
        let mut ids: Vec<_> = cart.lines().iter().map(|l| l.menu_item_id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), cart.lines().len());
        assert_eq!(
            cart.total_items(),
            cart.lines().iter().map(|l| u64::from(l.quantity)).sum::<u64>()
        );
    }
}

#[test]
fn test_adds_merge_and_zero_quantity_removes() {
    let mut cart = Cart::new();
    let burger = Money::new(dec!(8.00));

    cart.add_priced(1, "Burger", burger, 2, "");
    cart.add_priced(1, "Burger", burger, 3, "");
    assert_eq!(cart.lines().len(), 1);
    assert_eq!(cart.line(1).map(|l| l.quantity), Some(5));

    let mut removed = cart.clone();
    removed.remove_item(1);
    cart.update_quantity(1, 0);
    assert_eq!(cart, removed);
    assert!(cart.is_empty());
    assert_eq!(cart.total_price(), Money::default());
}

#[test]
fn test_generated_event_stream_totals() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.csv");
    common::generate_cart_events(&path, 300).unwrap();

    let mut cart = Cart::new();
    let reader = CartEventReader::new(std::fs::File::open(&path).unwrap());
    for command in reader.commands() {
        command.unwrap().apply(&mut cart);
    }

    // 100 of each: 100 * (8.00 + 3.00 + 1.50)
    assert_eq!(cart.lines().len(), 3);
    assert_eq!(cart.total_price(), Money::new(dec!(1250.00)));
    assert_eq!(cart.total_items(), 300);
}
