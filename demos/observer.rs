//! Terminal-outcome observer walkthrough
//! Run with: cargo run --example observer
//! With tracing: RUST_LOG=debug cargo run --example observer --features tracing

use layercache_deferred::{Deferred, DeferredBuilder, on_cancel};
use std::time::Duration;
use tokio::time::sleep;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    // A task that succeeds: the observer stays silent
    let ok = DeferredBuilder::new()
        .name("succeeds")
        .spawn(async { Ok::<_, String>("payload") });
    on_cancel(&ok, |err| println!("never printed: {err}"));
    println!("succeeds -> {:?}", ok.wait().await);

    // A task that fails: the observer gets the task's own error
    let failing = DeferredBuilder::new()
        .name("fails")
        .spawn(async { Err::<&str, _>(String::from("backend returned 503")) });
    on_cancel(&failing, |err| println!("observer saw failure: {err}"));
    println!("fails -> {:?}", failing.wait().await);

    // A task that is cancelled while running
    let slow = DeferredBuilder::new().name("cancelled").spawn(async {
        sleep(Duration::from_secs(10)).await;
        Ok::<_, String>("too late")
    });
    on_cancel(&slow, |err| println!("observer saw cancellation: {err}"));
    sleep(Duration::from_millis(50)).await;
    slow.cancel();
    println!("cancelled -> {:?}", slow.wait().await);

    // Registering after the fact still follows the final state
    on_cancel(&slow, |_| println!("late observer fired for the cancelled task"));
    on_cancel(&ok, |_| println!("never printed either"));

    let settled = Deferred::<(), String>::cancelled();
    on_cancel(&settled, |_| println!("pre-cancelled handle notified"));

    sleep(Duration::from_millis(50)).await;
}
