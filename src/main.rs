use clap::{Args, Parser, Subcommand};
use miette::{IntoDiagnostic, Result, miette};
use rust_decimal::Decimal;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use storefront::application::cart::CartHandle;
use storefront::application::checkout::{CheckoutReceipt, CheckoutRequest};
use storefront::application::context::{StorefrontContext, StorefrontPorts};
use storefront::application::kitchen::KitchenQueue;
use storefront::application::notifications::Notifications;
use storefront::application::session::Session;
use storefront::config::{DEFAULT_API_URL, StorefrontConfig};
use storefront::domain::delivery::DeliveryDetails;
use storefront::domain::kitchen::StatusFilter;
use storefront::domain::order::{OrderStatus, OrderType};
use storefront::domain::ports::{CardProcessorRef, CartStoreRef, CheckoutJournalRef, OrderApiRef};
use storefront::infrastructure::fake::FakeBackend;
use storefront::infrastructure::http::HttpStorefrontApi;
use storefront::infrastructure::in_memory::{InMemoryCartStore, InMemoryCheckoutJournal};
#[cfg(feature = "storage-rocksdb")]
use storefront::infrastructure::rocksdb::RocksDBStore;
use storefront::infrastructure::stripe::{StripeCardProcessor, TEST_PAYMENT_METHOD};
use storefront::interfaces::csv::cart_event_reader::CartEventReader;
use storefront::interfaces::csv::cart_writer::CartWriter;
use storefront::interfaces::csv::ticket_writer::TicketWriter;
use storefront::telemetry::setup_tracing;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Backend API base URL
    #[arg(long, env = "STOREFRONT_API_URL", default_value = DEFAULT_API_URL, global = true)]
    api_url: String,

    /// Bearer token for the backend
    #[arg(long, env = "STOREFRONT_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Sales tax rate applied to cart totals
    #[arg(long, env = "STOREFRONT_TAX_RATE", default_value = "0.08", global = true)]
    tax_rate: Decimal,

    /// Run against an in-process demo backend instead of the API
    #[arg(long, global = true)]
    demo: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay cart events from a CSV file and print the resulting cart
    Cart(CartArgs),
    /// Print the kitchen ticket queue
    Kitchen(KitchenArgs),
    /// Build a cart from CSV events and place it as a paid order
    Checkout(CheckoutArgs),
}

#[derive(Args)]
struct StorageArgs {
    /// Session id the cart and checkout progress are stored under
    #[arg(long, default_value = "cli")]
    session: String,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,
}

#[derive(Args)]
struct CartArgs {
    /// Input cart events CSV file
    input: PathBuf,

    #[command(flatten)]
    storage: StorageArgs,
}

#[derive(Args)]
struct KitchenArgs {
    /// Only show tickets in this status
    #[arg(long)]
    status: Option<OrderStatus>,

    /// Fetch once and exit instead of polling
    #[arg(long)]
    once: bool,

    /// Poll period in seconds
    #[arg(long)]
    interval: Option<u64>,
}

#[derive(Args)]
struct CheckoutArgs {
    /// Input cart events CSV file
    input: PathBuf,

    #[arg(long, default_value = "takeout")]
    order_type: OrderType,

    /// Delivery address (delivery orders)
    #[arg(long)]
    address: Option<String>,

    /// Note for the courier
    #[arg(long)]
    instructions: Option<String>,

    #[arg(long, default_value = "")]
    name: String,

    #[arg(long)]
    phone: Option<String>,

    /// Complete as pickup if delivery cannot be booked
    #[arg(long)]
    pickup_on_delivery_failure: bool,

    #[arg(long, env = "STRIPE_SECRET_KEY", hide_env_values = true)]
    stripe_key: Option<String>,

    #[arg(long, default_value = TEST_PAYMENT_METHOD)]
    payment_method: String,

    #[command(flatten)]
    storage: StorageArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_tracing();
    let cli = Cli::parse();

    let config = StorefrontConfig {
        api_url: cli.api_url,
        tax_rate: cli.tax_rate,
        ..StorefrontConfig::default()
    };
    config.validate().into_diagnostic()?;

    match cli.command {
        Command::Cart(args) => run_cart(&config, args).await,
        Command::Kitchen(args) => run_kitchen(&config, cli.token, cli.demo, args).await,
        Command::Checkout(args) => run_checkout(config, cli.token, cli.demo, args).await,
    }
}

#[cfg(feature = "storage-rocksdb")]
fn open_stores(db_path: Option<PathBuf>) -> Result<(CartStoreRef, CheckoutJournalRef)> {
    if let Some(db_path) = db_path {
        // Use persistent storage (RocksDB)
        let store = RocksDBStore::open(db_path).into_diagnostic()?;
        return Ok((Arc::new(store.clone()), Arc::new(store)));
    }
    Ok(in_memory_stores())
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_stores(db_path: Option<PathBuf>) -> Result<(CartStoreRef, CheckoutJournalRef)> {
    if db_path.is_some() {
        eprintln!(
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(in_memory_stores())
}

fn in_memory_stores() -> (CartStoreRef, CheckoutJournalRef) {
    (
        Arc::new(InMemoryCartStore::new()),
        Arc::new(InMemoryCheckoutJournal::new()),
    )
}

/// Applies every valid row to `cart`; bad rows are reported and skipped.
fn replay_events(cart: &CartHandle, input: &Path) -> Result<()> {
    let file = File::open(input).into_diagnostic()?;
    let reader = CartEventReader::new(file);
    for command in reader.commands() {
        match command {
            Ok(command) => cart.update(|c| command.apply(c)),
            Err(e) => eprintln!("Error reading cart event: {}", e),
        }
    }
    Ok(())
}

async fn run_cart(config: &StorefrontConfig, args: CartArgs) -> Result<()> {
    let (carts, _) = open_stores(args.storage.db_path)?;
    let cart = CartHandle::persistent(carts, args.storage.session);
    cart.restore().await.into_diagnostic()?;

    replay_events(&cart, &args.input)?;
    cart.persist().await.into_diagnostic()?;

    let stdout = io::stdout();
    let mut writer = CartWriter::new(stdout.lock());
    writer
        .write_cart(&cart.snapshot(), config.tax_rate)
        .into_diagnostic()?;
    Ok(())
}

async fn run_kitchen(
    config: &StorefrontConfig,
    token: Option<String>,
    demo: bool,
    args: KitchenArgs,
) -> Result<()> {
    let api: OrderApiRef = if demo {
        Arc::new(FakeBackend::with_sample_data())
    } else {
        let session = token.map(Session::with_token).unwrap_or_default();
        Arc::new(HttpStorefrontApi::new(config, session).into_diagnostic()?)
    };
    let kitchen = KitchenQueue::new(api, Notifications::new());
    let filter = args.status.map_or(StatusFilter::All, StatusFilter::Only);

    if args.once {
        kitchen.refresh().await.into_diagnostic()?;
        return print_tickets(&kitchen, filter);
    }

    let interval = args
        .interval
        .map(Duration::from_secs)
        .unwrap_or(config.kitchen_refresh_interval);
    let mut updates = kitchen.subscribe();
    let poller = kitchen.spawn_poller(interval);
    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let loading = updates.borrow_and_update().is_loading;
                if !loading {
                    print_tickets(&kitchen, filter)?;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    poller.stop();
    Ok(())
}

fn print_tickets(kitchen: &KitchenQueue, filter: StatusFilter) -> Result<()> {
    let counts = kitchen.counts();
    eprintln!(
        "preparing: {}, ready: {}, total: {}",
        counts.preparing, counts.ready, counts.total
    );
    if let Some(error) = kitchen.last_error() {
        eprintln!("Refresh failed: {error}");
    }
    let stdout = io::stdout();
    let mut writer = TicketWriter::new(stdout.lock());
    writer
        .write_tickets(&kitchen.filtered(filter), chrono::Local::now().naive_local())
        .into_diagnostic()
}

async fn run_checkout(
    config: StorefrontConfig,
    token: Option<String>,
    demo: bool,
    args: CheckoutArgs,
) -> Result<()> {
    let (carts, journal) = open_stores(args.storage.db_path)?;
    let session = Session::new();

    let ports = if demo {
        let backend = Arc::new(FakeBackend::with_sample_data());
        StorefrontPorts::from_backend(backend.clone(), backend, Some(carts), journal)
    } else {
        let secret = args
            .stripe_key
            .ok_or_else(|| miette!("STRIPE_SECRET_KEY (or --stripe-key) is required for checkout"))?;
        let cards: CardProcessorRef = Arc::new(
            StripeCardProcessor::new(
                &config.card_processor_url,
                secret,
                args.payment_method,
                config.request_timeout,
            )
            .into_diagnostic()?,
        );
        let api = Arc::new(HttpStorefrontApi::new(&config, session.clone()).into_diagnostic()?);
        StorefrontPorts::from_backend(api, cards, Some(carts), journal)
    };
    let ctx = StorefrontContext::new(config, ports, session, args.storage.session);

    let user = if demo {
        None
    } else {
        let user = ctx
            .authenticator()
            .initialize(token)
            .await
            .into_diagnostic()?;
        if user.is_none() {
            return Err(miette!("Not signed in: provide a valid STOREFRONT_TOKEN"));
        }
        user
    };

    ctx.cart().restore().await.into_diagnostic()?;
    replay_events(ctx.cart(), &args.input)?;
    ctx.cart().persist().await.into_diagnostic()?;

    let customer_name = if args.name.is_empty() {
        user.map(|u| u.full_name()).unwrap_or_default()
    } else {
        args.name
    };
    let request = CheckoutRequest {
        order_type: args.order_type,
        delivery: args.address.map(|address| DeliveryDetails {
            address,
            instructions: args.instructions,
            customer_name,
            customer_phone: args
                .phone
                .unwrap_or_else(|| ctx.config().contact_phone.clone()),
        }),
    };

    let receipt = match ctx.checkout().submit(&request).await {
        Ok(receipt) => receipt,
        Err(e) if e.can_skip_delivery() && args.pickup_on_delivery_failure => {
            eprintln!("Delivery unavailable: {e}. Completing as pickup.");
            ctx.checkout().skip_delivery().await.into_diagnostic()?
        }
        Err(e) => return Err(e).into_diagnostic(),
    };
    print_receipt(&receipt)
}

fn print_receipt(receipt: &CheckoutReceipt) -> Result<()> {
    let stdout = io::stdout();
    let mut writer = csv::Writer::from_writer(stdout.lock());
    let mut row = |key: &str, value: String| writer.write_record([key, value.as_str()]);

    row("order_id", receipt.order_id.to_string()).into_diagnostic()?;
    row("order_type", receipt.order_type.to_string()).into_diagnostic()?;
    if let Some(id) = &receipt.payment_intent_id {
        row("payment_intent_id", id.clone()).into_diagnostic()?;
    }
    if let Some(amount) = receipt.amount_charged {
        row("amount_charged", amount.to_plain()).into_diagnostic()?;
    }
    if let Some(delivery) = &receipt.delivery {
        row("delivery_id", delivery.delivery_id.clone()).into_diagnostic()?;
        row("tracking_url", delivery.tracking_url.clone()).into_diagnostic()?;
    }
    writer.flush().into_diagnostic()
}
