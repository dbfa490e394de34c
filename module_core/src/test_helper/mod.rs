use crate::{Event, EventBus, EventKind, EventKindType};
use core::panic;
use tokio::time::timeout;

/// Sends a quit signal to a running module and waits for it to stop gracefully.
///
/// Publishes a [`QuitEvent`](EventKind::QuitEvent) through the given
/// [`EventBus`], then waits up to 100ms for the module's task to complete.
/// Panics if the module doesn't stop in time or its task returns an error.
pub async fn stop_module(event_bus: &EventBus, handle: &mut tokio::task::JoinHandle<Result<(), ()>>) {
    event_bus.publish(&Event {
        kind: EventKind::QuitEvent,
    });
    let _ = timeout(std::time::Duration::from_millis(100), handle)
        .await
        .expect("Module doesn't handle quit event in timeout")
        .unwrap();
}

/// Waits asynchronously for an event of the given [`EventKindType`] on a
/// broadcast receiver, polling in small steps so the wait stays responsive.
///
/// Panics if no matching event arrives within `duration`.
pub async fn wait_for_event(
    rx: &mut tokio::sync::broadcast::Receiver<Event>,
    duration: std::time::Duration,
    exp_event: EventKindType,
) -> Event {
    let steps = (duration.as_millis() / 10).max(1);
    let step_duration = duration / (steps as u32);
    for _ in 0..steps {
        if let Ok(Ok(event)) = timeout(step_duration, rx.recv()).await
            && event.event_type() == exp_event
        {
            return event;
        }
    }
    panic!("Failed to receive event of type {:?}", exp_event);
}
