//! Live delivery tracking.

use agritrade_core::DeliveryAgentId;
use agritrade_retailer::RetailerState;

/// Print each new position of `agent` until Ctrl-C (or the first one, with
/// `once`).
pub async fn follow(state: &RetailerState, agent: DeliveryAgentId, once: bool) {
    let mut handle = state.track(agent);
    println!(
        "Tracking delivery agent {agent} every {}s (Ctrl-C to stop)",
        state.config().tracking_interval.as_secs()
    );

    loop {
        tokio::select! {
            position = handle.changed() => {
                let Some(position) = position else {
                    println!("Tracking stopped");
                    break;
                };
                println!(
                    "{}  lat {:.6}  lng {:.6}",
                    position.observed_at.format("%H:%M:%S"),
                    position.point.lat,
                    position.point.lng
                );
                if once {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        }
    }

    handle.stop();
}
