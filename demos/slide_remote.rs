//! Slide remote over an attached window.
//!
//! Demonstrates:
//! - Starting a presentation from a controller context
//! - Accepting it in the opened window's receiver
//! - Exchanging slide commands both ways
//! - Reconnecting after the controller drops its channel
//! - Terminating from the controller
//!
//! Usage:
//!   cargo run --example slide_remote
//!   cargo run --example slide_remote -- --debug

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use presentation_shim::{
    ConnectionState, MemoryWindows, Message, Presentation, Result, WindowMechanism, WindowOptions,
};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Constants
// ============================================================================

const DECK_URL: &str = "https://slides.example/deck.html";
const SLIDE_COUNT: usize = 4;

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let debug = std::env::args().any(|a| a == "--debug");
    init_logging(debug);

    if let Err(e) = run().await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        "presentation_shim=debug"
    } else {
        "presentation_shim=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

async fn run() -> Result<()> {
    println!("=== Slide Remote ===\n");

    // ========================================================================
    // Controller
    // ========================================================================

    println!("[1] Building controller...");
    let host = MemoryWindows::root();
    let controller = Presentation::builder()
        .mechanism(WindowMechanism::with_options(
            Arc::new(host.clone()),
            WindowOptions::new().with_display_name("Projector"),
        ))
        .build()?;
    println!("    ✓ Mechanisms: {:?}\n", controller.mechanism_names());

    println!("[2] Starting presentation of {DECK_URL}...");
    let request = controller.request(DECK_URL)?;
    let starting = tokio::spawn(async move { request.start().await });

    // ========================================================================
    // Receiver
    // ========================================================================

    let Some(child) = host.next_opened().await else {
        eprintln!("    ✗ No window was opened");
        return Ok(());
    };
    println!("    ✓ Window {} opened", child.id());

    let receiver = Presentation::builder()
        .mechanism(WindowMechanism::new(Arc::new(child.clone())))
        .build()?;
    let screen = receiver.receiver().get_connection().await?;
    let remote = match starting.await {
        Ok(result) => result?,
        Err(e) => {
            eprintln!("    ✗ Start task failed: {e}");
            return Ok(());
        }
    };
    println!("    ✓ Connected as presentation {}\n", remote.id());

    // ========================================================================
    // Drive Slides
    // ========================================================================

    println!("[3] Driving slides...");
    let (slides_tx, mut slides_rx) = mpsc::unbounded_channel();
    screen.set_message_handler(move |message| {
        let _ = slides_tx.send(message);
    });

    let (acks_tx, mut acks_rx) = mpsc::unbounded_channel();
    remote.set_message_handler(move |message| {
        let _ = acks_tx.send(message);
    });

    for slide in 1..=SLIDE_COUNT {
        remote.send(format!("goto {slide}"))?;
        if let Some(Message::Text(command)) = slides_rx.recv().await {
            println!("    screen <- {command}");
            screen.send(format!("showing {slide}"))?;
        }
        if let Some(Message::Text(ack)) = acks_rx.recv().await {
            println!("    remote <- {ack}");
        }
    }
    println!("    ✓ {SLIDE_COUNT} slides shown\n");

    // ========================================================================
    // Reconnect
    // ========================================================================

    println!("[4] Dropping and restoring the channel...");
    remote.close();
    println!("    state: {:?}", remote.state());

    let again = controller
        .request(DECK_URL)?
        .reconnect(&remote.id().to_string())
        .await?;
    println!("    state: {:?}", again.state());

    again.send("goto 1")?;
    if let Some(Message::Text(command)) = slides_rx.recv().await {
        println!("    screen <- {command}");
    }
    println!("    ✓ Reconnected\n");

    // ========================================================================
    // Terminate
    // ========================================================================

    println!("[5] Terminating...");
    again.terminate().await;
    if again.state() != ConnectionState::Terminated {
        eprintln!("    ✗ Unexpected state: {:?}", again.state());
    }
    println!("    window closed: {}", child.is_closed());
    println!("    ✓ Done");

    Ok(())
}
