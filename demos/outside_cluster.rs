use tokio::time::{sleep, Duration};
use tracing::info;

use tracing_kube_meta::init::init_kube_json_stdout;

/// Run without any downward-API sources present: resolution finds
/// nothing and records carry only base and caller fields.
#[tokio::main]
async fn main() {
    init_kube_json_stdout().expect("init logging");

    info!(request_id = "abc-1", "handled request");

    sleep(Duration::from_secs(2)).await;
}
