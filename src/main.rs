use async_trait::async_trait;
use clap::{Parser, Subcommand};
use franchiso_boost::application::flow::{BoostFlow, FlowEvent, FlowState};
use franchiso_boost::application::loader::WidgetLoader;
use franchiso_boost::config::Config;
use franchiso_boost::domain::package::{PaymentPackage, format_idr};
use franchiso_boost::domain::ports::{CheckoutWidget, WidgetOutcome};
use franchiso_boost::domain::session::{Credential, PaymentSession, TargetEntity};
use franchiso_boost::infrastructure::checkout::{HttpScriptHost, RedirectCheckout};
use franchiso_boost::infrastructure::clock::TokioSleeper;
use franchiso_boost::infrastructure::http::HttpBoostBackend;
use miette::{IntoDiagnostic, Result};
use std::io::{Stdout, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the boost packages and their prices
    Packages,

    /// Pay for a boost and wait until the listing reports it active
    Pay {
        /// Franchise listing to boost
        #[arg(long)]
        franchise: String,

        /// Package duration in days: 7, 14 or 30
        #[arg(long, default_value = "7")]
        package: PaymentPackage,

        /// Bearer token of the signed-in franchisor
        #[arg(long, env = "FRANCHISO_ACCESS_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Configuration file. Defaults to ./franchiso.toml when present.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Packages => {
            for package in PaymentPackage::ALL {
                println!(
                    "{:>2}  {:<8}  {}",
                    package.as_wire(),
                    package.to_string(),
                    format_idr(package.price())
                );
            }
            Ok(())
        }
        Command::Pay {
            franchise,
            package,
            token,
            config,
        } => {
            let config = Config::load(config.as_deref()).into_diagnostic()?;
            let target = TargetEntity::new(franchise, Credential::from_optional(token));
            run_boost(&config, &target, package).await
        }
    }
}

/// Prints the flow's status lines. Every stdout write of a payment goes
/// through here, so lines appear in the order the flow produced them.
#[derive(Default)]
struct Console {
    events: Mutex<Option<mpsc::UnboundedReceiver<FlowEvent>>>,
}

impl Console {
    fn attach(&self, events: mpsc::UnboundedReceiver<FlowEvent>) {
        *self.events.lock().unwrap_or_else(PoisonError::into_inner) = Some(events);
    }

    // Errors are reported once, by the exit path in `run_boost`.
    fn flush(&self) {
        let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(events) = events.as_mut() else {
            return;
        };
        let mut out = std::io::stdout().lock();
        while let Ok(event) = events.try_recv() {
            if let FlowEvent::Status(message) = event {
                let _ = writeln!(out, "{message}");
            }
        }
        let _ = out.flush();
    }
}

/// Shows pending status lines before handing the session to the user.
struct ConsoleCheckout {
    console: Arc<Console>,
    checkout: RedirectCheckout<Stdout>,
}

#[async_trait]
impl CheckoutWidget for ConsoleCheckout {
    async fn pay(&self, session: &PaymentSession) -> WidgetOutcome {
        self.console.flush();
        self.checkout.pay(session).await
    }
}

async fn run_boost(config: &Config, target: &TargetEntity, package: PaymentPackage) -> Result<()> {
    let host = HttpScriptHost::new(config.request_timeout()).into_diagnostic()?;
    let loader = WidgetLoader::new(Arc::new(host), config.script_tag());
    let backend = HttpBoostBackend::from_config(config).into_diagnostic()?;
    let console = Arc::new(Console::default());
    let widget = ConsoleCheckout {
        console: Arc::clone(&console),
        checkout: RedirectCheckout::new(std::io::stdout()),
    };

    let (mut flow, events) = BoostFlow::new(
        loader,
        Arc::new(backend),
        Arc::new(widget),
        Arc::new(TokioSleeper),
    );
    console.attach(events);

    flow.pay(target, package).await;
    console.flush();
    let outcome = flow.settled().await;
    console.flush();

    match outcome {
        FlowState::Errored(error) => Err(error).into_diagnostic(),
        _ => Ok(()),
    }
}
