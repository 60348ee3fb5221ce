//! Session setup benchmark suite.
//!
//! Measures the presentation layer itself over in-memory pipes:
//! - `start()` from discovery to a connected connection
//! - Reconnect after the channel was closed
//! - Message throughput on a connected connection
//!
//! Run with: cargo bench --bench materialize
//! Results saved to: target/criterion/

use std::sync::Arc;

use async_trait::async_trait;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use parking_lot::Mutex;
use tokio::runtime::Runtime;
use url::Url;

use presentation_shim::mechanism::IncomingControllerHandler;
use presentation_shim::{
    Channel, Connection, Display, Mechanism, PeerHandle, Presentation, Result, pipe,
};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const URL: &str = "https://slides.example/deck.html";
const DISPLAY_COUNTS: &[usize] = &[1, 8, 64];
const MESSAGE_COUNTS: &[u64] = &[100, 1_000];

// ============================================================================
// Pipe Mechanism
// ============================================================================

/// Display whose channels are pipes; only the newest remote end is kept.
struct PipeDisplay {
    name: String,
    remote: Mutex<Option<Channel>>,
}

#[async_trait]
impl PeerHandle for PipeDisplay {
    fn mechanism(&self) -> &str {
        "bench"
    }

    async fn create_channel(&self) -> Result<Channel> {
        let (local, remote) = pipe();
        remote.set_message_handler(|_| {});
        *self.remote.lock() = Some(remote);
        Ok(local)
    }

    async fn terminate(&self) -> Result<()> {
        self.remote.lock().take();
        Ok(())
    }
}

#[async_trait]
impl Display for PipeDisplay {
    fn name(&self) -> &str {
        &self.name
    }

    async fn navigate(&self, _url: &Url) -> Result<()> {
        Ok(())
    }
}

/// Mechanism reporting a fixed number of pipe displays.
struct PipeMechanism {
    displays: Vec<Arc<PipeDisplay>>,
}

impl PipeMechanism {
    fn new(count: usize) -> Self {
        let displays = (0..count)
            .map(|i| {
                Arc::new(PipeDisplay {
                    name: format!("Screen {i}"),
                    remote: Mutex::new(None),
                })
            })
            .collect();
        Self { displays }
    }
}

#[async_trait]
impl Mechanism for PipeMechanism {
    fn name(&self) -> &str {
        "bench"
    }

    async fn available_displays(&self) -> Vec<Arc<dyn Display>> {
        self.displays
            .iter()
            .map(|d| Arc::clone(d) as Arc<dyn Display>)
            .collect()
    }

    fn monitor_incoming_controllers(&self, _handler: IncomingControllerHandler) {}
}

fn presentation(displays: usize) -> Presentation {
    Presentation::builder()
        .mechanism(PipeMechanism::new(displays))
        .build()
        .expect("build")
}

async fn start(presentation: &Presentation) -> Connection {
    presentation
        .request(URL)
        .expect("request")
        .start()
        .await
        .expect("start")
}

// ============================================================================
// Benchmark: Start
// ============================================================================

fn bench_start(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");

    let mut group = c.benchmark_group("start");
    for &count in DISPLAY_COUNTS {
        group.bench_with_input(BenchmarkId::new("displays", count), &count, |b, &count| {
            b.to_async(&rt).iter(|| async move {
                let presentation = presentation(count);
                start(&presentation).await
            });
        });
    }
    group.finish();
}

// ============================================================================
// Benchmark: Reconnect
// ============================================================================

fn bench_reconnect(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let presentation = presentation(1);
    let connection = rt.block_on(start(&presentation));
    let request = presentation.request(URL).expect("request");
    let id = connection.id().to_string();

    c.bench_function("reconnect_after_close", |b| {
        b.to_async(&rt).iter(|| async {
            connection.close();
            request.reconnect(&id).await.expect("reconnect")
        });
    });
}

// ============================================================================
// Benchmark: Send
// ============================================================================

fn bench_send(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let presentation = presentation(1);
    let connection = rt.block_on(start(&presentation));

    let mut group = c.benchmark_group("send");
    for &count in MESSAGE_COUNTS {
        group.throughput(Throughput::Elements(count));
        group.bench_with_input(BenchmarkId::new("messages", count), &count, |b, &count| {
            b.iter(|| {
                for i in 0..count {
                    connection.send(format!("goto {i}")).expect("send");
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_start, bench_reconnect, bench_send);
criterion_main!(benches);
