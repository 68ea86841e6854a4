//! sig demo: one instrumented checkout flowing through the `tracing` bridge

use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use sig::backend::bridge::{TracingLogger, TracingTracer};
use sig::backend::memory::MemoryMeter;
use sig::backend::{KeyValue, Meter};
use sig::init::{init_subscriber, SubscriberConfig};
use sig::{attrs, Context, CorrelationId, Registry};

#[derive(Parser)]
#[command(name = "sig-demo")]
#[command(author, version, about = "Emit correlated spans, logs, and metrics for a sample checkout", long_about = None)]
struct Cli {
    /// Disable the tracing backend
    #[arg(long)]
    no_tracing: bool,
    /// Disable the logging backend
    #[arg(long)]
    no_logging: bool,
    /// Enable the metrics backend and print every call it received at exit
    #[arg(long)]
    metrics: bool,
    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Compact)]
    format: Format,
    /// Filter directive (tracing-subscriber syntax)
    #[arg(long, env = "SIG_LOG", default_value = "sig=trace,warn")]
    filter: String,
    /// Make the payment step fail
    #[arg(long)]
    fail: bool,
    /// Number of items in the cart
    #[arg(long, default_value_t = 3)]
    items: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Compact,
    Full,
}

#[derive(Debug, thiserror::Error)]
#[error("payment declined for {items} items")]
struct PaymentDeclined {
    items: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = SubscriberConfig {
        compact: cli.format == Format::Compact,
        ansi_colors: std::io::stdout().is_terminal(),
        filter_directive: Some(cli.filter.clone()),
        include_file_line: false,
        ..SubscriberConfig::development()
    };
    let _guard = init_subscriber(&config).context("failed to install subscriber")?;

    let meter = MemoryMeter::new();
    let mut builder = Registry::builder();
    if !cli.no_tracing {
        builder = builder.tracer(Arc::new(TracingTracer::new()));
    }
    if !cli.no_logging {
        builder = builder.logger(Arc::new(TracingLogger::new()));
    }
    if cli.metrics {
        builder = builder.meter(Arc::new(meter.clone()));
    }
    let registry = Arc::new(builder.build());

    let cx = Context::new().with_correlation_id(CorrelationId::new());
    let outcome = checkout(&registry, cx, cli.items, cli.fail).await;

    if cli.metrics {
        for call in meter.calls() {
            println!(
                "metric {}: {} {}",
                call.name,
                call.measurement,
                sig::attrs::render(&call.attributes)
            );
        }
    }
    if let Err(err) = outcome {
        println!("checkout failed: {err}");
    }
    Ok(())
}

async fn checkout(
    registry: &Arc<Registry>,
    cx: Context,
    items: u32,
    fail: bool,
) -> anyhow::Result<()> {
    let started = Instant::now();
    let mut unit = sig::start!(registry, cx);
    unit.info("cart loaded", &[attrs! { "items" => items }]);

    let reserved = tokio::spawn(reserve(registry.clone(), unit.context().clone(), items)).await?;
    if reserved < items {
        unit.warn("partial reservation", &[attrs! { "reserved" => reserved, "requested" => items }]);
    }

    let payment = charge(reserved, fail);
    unit.error(payment.as_ref().err(), &[attrs! { "stage" => "payment" }]);

    if let Some(meter) = registry.meter() {
        let status = if payment.is_ok() { "ok" } else { "declined" };
        meter.add("checkout.total", 1, &[KeyValue::new("status", status)]);
        meter.record(
            "checkout.latency_ms",
            started.elapsed().as_secs_f64() * 1000.0,
            &[],
        );
    }

    unit.end();
    payment?;
    Ok(())
}

async fn reserve(registry: Arc<Registry>, cx: Context, items: u32) -> u32 {
    let mut unit = sig::start!(registry, cx);
    let reserved = items.min(2);
    unit.debug("stock checked", &[attrs! { "available" => 2, "requested" => items }]);
    unit.end();
    reserved
}

fn charge(items: u32, fail: bool) -> Result<u32, PaymentDeclined> {
    if fail {
        Err(PaymentDeclined { items })
    } else {
        Ok(items * 1250)
    }
}
