use tokio::time::{sleep, Duration};
use tracing::{error, info};

use tracing_kube_meta::init::init_kube_json_stdout;

#[tokio::main]
async fn main() {
    // Simulate the downward-API projection a pod spec would provide.
    std::env::set_var("POD_NAME", "demo-7f8");
    std::env::set_var("POD_NAMESPACE", "staging");
    std::env::set_var("NODE_NAME", "node-a");

    init_kube_json_stdout().expect("init logging");

    info!("starting service");

    error!(
        user_id = 42,
        reason = "invalid password",
        "authentication failed"
    );

    // Give the background task a little time to drain the channel.
    sleep(Duration::from_secs(2)).await;
}
