// src/main.rs
use std::io::{self, BufRead, Write};
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
#[cfg(feature = "desktop")]
use log::error;

use cova_assist::{
    Deployment, EndpointClient, ImageHandle, ImageSerializer, Mode, PathSource, Prediction, ProcessOutcome,
    RequestResult, RequestState, ServiceConfig, Session,
};
#[cfg(feature = "desktop")]
use cova_assist::{AcquisitionConfig, DesktopSource};

const DEFAULT_QUESTION: &str = "What do you see in this image?";

#[derive(Parser)]
#[command(name = "cova-assist")]
#[command(about = "Send photos to the COVA assistance models", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ServiceArgs {
    /// Inference service deployment
    #[arg(long, short = 'd', value_enum, default_value_t = Deployment::GoogleCloud)]
    deployment: Deployment,

    /// Override the deployment's base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,
}

#[derive(Args)]
struct RequestArgs {
    /// Inference mode
    #[arg(long, short = 'm', value_enum, default_value_t = Mode::Atm)]
    mode: Mode,

    /// Question about the image (required for vqa, optional for walking)
    #[arg(long, short = 'q')]
    question: Option<String>,

    /// Print the annotated JSON payload instead of the summary
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    service: ServiceArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Send an existing image (path, file://, http(s):// or data: URI)
    Predict {
        /// Image to send
        #[arg(long, short = 'i')]
        image: String,

        #[command(flatten)]
        request: RequestArgs,
    },
    /// Capture the screen and send it
    #[cfg(feature = "desktop")]
    Capture {
        #[command(flatten)]
        request: RequestArgs,
    },
    /// Pick an image with a file dialog and send it
    #[cfg(feature = "desktop")]
    Select {
        #[command(flatten)]
        request: RequestArgs,
    },
    /// Run the interactive assistant
    Interactive {
        #[command(flatten)]
        service: ServiceArgs,
    },
    /// List deployments and their endpoints
    Endpoints,
}

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init_from_env(env_logger::Env::default().filter_or("RUST_LOG", "info"));

    let cli = Cli::parse();

    match cli.command {
        Commands::Predict { image, request } => run_predict(image, request),
        #[cfg(feature = "desktop")]
        Commands::Capture { request } => run_desktop(request, Acquire::Capture),
        #[cfg(feature = "desktop")]
        Commands::Select { request } => run_desktop(request, Acquire::Select),
        Commands::Interactive { service } => run_interactive_mode(service),
        Commands::Endpoints => list_endpoints(),
    }
}

fn build_session(service: &ServiceArgs) -> Result<Session<EndpointClient>> {
    let mut config = ServiceConfig::for_deployment(service.deployment, service.base_url.clone())?;
    if let Some(secs) = service.timeout {
        config = config.with_request_timeout(Duration::from_secs(secs));
    }

    let serializer = ImageSerializer::with_timeout(config.request_timeout)?;
    let client = EndpointClient::new(config)?;
    Ok(Session::new(client, serializer))
}

fn configure(request: &RequestArgs) -> Result<Session<EndpointClient>> {
    let session = build_session(&request.service)?.with_mode(request.mode);
    if let Some(question) = &request.question {
        session.set_question(question.as_str());
    }
    Ok(session)
}

fn run_predict(image: String, request: RequestArgs) -> Result<()> {
    let session = configure(&request)?;
    let mut source = PathSource::new(ImageHandle::new(image));
    session.select(&mut source);
    process_and_report(&session, request.json)
}

#[cfg(feature = "desktop")]
#[derive(Clone, Copy)]
enum Acquire {
    Capture,
    Select,
}

#[cfg(feature = "desktop")]
fn acquire_from_desktop(session: &Session<EndpointClient>, source: &mut DesktopSource, kind: Acquire) -> Result<bool> {
    let acquired = match kind {
        Acquire::Capture => session.capture(source),
        Acquire::Select => session.select(source),
    };
    if let Some(failure) = session.state().failure() {
        return Err(anyhow!(failure.message.clone()));
    }
    Ok(acquired)
}

#[cfg(feature = "desktop")]
fn run_desktop(request: RequestArgs, kind: Acquire) -> Result<()> {
    let session = configure(&request)?;
    let mut source = DesktopSource::new(AcquisitionConfig::default());
    if !acquire_from_desktop(&session, &mut source, kind)? {
        println!("No image selected");
        return Ok(());
    }
    process_and_report(&session, request.json)
}

fn process_and_report(session: &Session<EndpointClient>, as_json: bool) -> Result<()> {
    match session.process() {
        ProcessOutcome::Completed(RequestState::Succeeded(result)) => render(&result, as_json),
        ProcessOutcome::Completed(RequestState::Failed(failure)) => Err(anyhow!(failure.message)),
        other => {
            info!("Request finished without a result: {:?}", other);
            Ok(())
        }
    }
}

fn render(result: &RequestResult, as_json: bool) -> Result<()> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(&result.payload)?);
        return Ok(());
    }

    println!("\n=== {} ===", result.mode.label());
    println!("Response Time: {:.2} seconds", result.response_time_secs());
    if let Some(device) = &result.device {
        println!("Processing Device: {}", device);
    }
    match result.prediction() {
        Prediction::Answer(text) => println!("{}", text),
        Prediction::Json(payload) => println!("{}", serde_json::to_string_pretty(payload)?),
    }
    println!("===========================================\n");
    Ok(())
}

fn list_endpoints() -> Result<()> {
    println!("\nDeployments:");
    for deployment in Deployment::ALL {
        match ServiceConfig::for_deployment(deployment, None) {
            Ok(config) => {
                println!("  {} ({})", deployment, config.base_url);
                for mode in config.endpoints.modes() {
                    if let Some(url) = config.url_for(mode) {
                        println!("    - {:<8} {}", mode, url);
                    }
                }
            }
            Err(e) => println!("  {} (not configured: {})", deployment, e),
        }
    }
    println!();
    Ok(())
}

fn prompt(stdin: &io::Stdin, input: &mut String, text: &str) -> Result<String> {
    print!("{}", text);
    io::stdout().flush()?;
    input.clear();
    stdin.lock().read_line(input)?;
    Ok(input.trim().to_string())
}

fn run_interactive_mode(service: ServiceArgs) -> Result<()> {
    println!("COVA Assistant Interactive Mode");
    println!("===============================");

    let session = build_session(&service)?;
    let supports_vqa = session.connector().config().endpoints.get(Mode::Vqa).is_some();
    session.set_mode(if supports_vqa { Mode::Vqa } else { Mode::Atm });
    session.set_question(DEFAULT_QUESTION);

    let stdin = io::stdin();
    let mut input = String::new();
    #[cfg(feature = "desktop")]
    let mut source = DesktopSource::new(AcquisitionConfig::default());
    #[cfg(not(feature = "desktop"))]
    let mut source = ();

    // Main menu loop
    loop {
        let mode = session.mode();
        println!("\nMode: {} | Image: {}", mode.label(), describe_image(&session));
        if mode.accepts_question() {
            println!("Question: {}", session.question());
        }
        println!("\nMain Menu:");
        println!("1. Take Photo (screen capture)");
        println!("2. Select Photo");
        println!("3. Enter image path or URL");
        println!("4. Change mode");
        println!("5. Set question");
        println!("6. Process image");
        println!("7. Exit");

        let choice = prompt(&stdin, &mut input, "\nEnter your choice (1-7): ")?;
        match choice.as_str() {
            "1" => desktop_menu_action(&session, &mut source, true),
            "2" => desktop_menu_action(&session, &mut source, false),
            "3" => {
                let uri = prompt(&stdin, &mut input, "Image path or URL (empty to cancel): ")?;
                if !uri.is_empty() {
                    session.set_image(ImageHandle::new(uri));
                    println!("✓ Image set");
                }
            }
            "4" => {
                let modes: Vec<Mode> = session.connector().config().endpoints.modes().collect();
                for (i, mode) in modes.iter().enumerate() {
                    println!("  {}. {}", i + 1, mode.label());
                }
                let picked = prompt(&stdin, &mut input, "Select mode: ")?;
                match picked.parse::<usize>().ok().and_then(|n| n.checked_sub(1)).and_then(|i| modes.get(i)) {
                    Some(mode) => session.set_mode(*mode),
                    None => println!("Invalid mode"),
                }
            }
            "5" => {
                let question = prompt(&stdin, &mut input, "Enter your question about the image: ")?;
                session.set_question(question);
            }
            "6" => {
                println!("\nProcessing with {}...", session.mode().label());
                if let Err(e) = process_and_report(&session, false) {
                    println!("✗ {}", e);
                }
            }
            "7" => {
                println!("Exiting COVA Assistant");
                break;
            }
            _ => {
                println!("Invalid choice. Please enter a number between 1 and 7.");
            }
        }
    }

    Ok(())
}

fn describe_image(session: &Session<EndpointClient>) -> String {
    session
        .image()
        .map(|handle| handle.to_string())
        .unwrap_or_else(|| "No image selected".to_string())
}

#[cfg(feature = "desktop")]
fn desktop_menu_action(session: &Session<EndpointClient>, source: &mut DesktopSource, capture: bool) {
    let kind = if capture { Acquire::Capture } else { Acquire::Select };
    match acquire_from_desktop(session, source, kind) {
        Ok(true) => println!("✓ Image acquired"),
        Ok(false) => println!("No image selected"),
        Err(e) => {
            error!("Image acquisition failed: {}", e);
            println!("✗ {}", e);
        }
    }
}

#[cfg(not(feature = "desktop"))]
fn desktop_menu_action(_session: &Session<EndpointClient>, _source: &mut (), _capture: bool) {
    println!("✗ Screen capture and file dialogs need the `desktop` feature");
}
