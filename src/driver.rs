//! Async driver owning the session
//!
//! One task owns the [`SessionManager`] and multiplexes inbound commands
//! with timer ticks, so no state is ever shared between tasks.

use crate::protocol::{Inbound, Outbound};
use crate::scheduler::{Scheduler, TimerFired};
use crate::session::SessionManager;
use crate::settings::GameplaySettings;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Queue depth for commands and events
const CHANNEL_CAPACITY: usize = 256;

/// Run until the inbound channel closes, then dispose the session
pub async fn run(
    mut session: SessionManager,
    mut inbound: mpsc::Receiver<Inbound>,
    mut fired: mpsc::UnboundedReceiver<TimerFired>,
    outbound: mpsc::Sender<Outbound>,
) {
    debug!("Driver loop started");

    loop {
        let outbox = tokio::select! {
            msg = inbound.recv() => match msg {
                Some(Inbound { from, command }) => session.handle(&from, command),
                None => break,
            },
            Some(tick) = fired.recv() => session.on_timer(tick),
        };

        for event in outbox {
            if outbound.send(event).await.is_err() {
                warn!("Outbound channel closed, stopping driver");
                session.dispose();
                return;
            }
        }
    }

    info!("Inbound channel closed, stopping driver");
    session.dispose();
}

/// Spawn a driver on the current runtime. Returns the task handle, the
/// command sender and the event receiver.
pub fn spawn(
    settings: GameplaySettings,
) -> (JoinHandle<()>, mpsc::Sender<Inbound>, mpsc::Receiver<Outbound>) {
    let (inbound_tx, inbound_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (outbound_tx, outbound_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (fired_tx, fired_rx) = mpsc::unbounded_channel();

    let session = SessionManager::init(settings, Scheduler::new(fired_tx));
    let handle = tokio::spawn(run(session, inbound_rx, fired_rx, outbound_tx));
    (handle, inbound_tx, outbound_rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Command, ServerEvent};
    use std::time::Duration;
    use tokio::time::sleep;

    fn inbound(from: &str, command: Command) -> Inbound {
        Inbound {
            from: from.into(),
            command,
        }
    }

    fn drain(rx: &mut mpsc::Receiver<Outbound>) -> Vec<Outbound> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn board_updates(events: &[Outbound]) -> usize {
        events
            .iter()
            .filter(|o| matches!(o.event, ServerEvent::UpdateBoard { .. }))
            .count()
    }

    #[tokio::test(start_paused = true)]
    async fn test_gravity_ticks_until_everyone_leaves() {
        let (handle, tx, mut rx) = spawn(GameplaySettings::default());
        for (id, name) in [("c1", "ann"), ("c2", "bob")] {
            tx.send(inbound(
                id,
                Command::Join {
                    room: "lobby".into(),
                    player_name: name.into(),
                },
            ))
            .await
            .unwrap();
        }
        tx.send(inbound("c1", Command::StartGame { room: "lobby".into() }))
            .await
            .unwrap();

        sleep(Duration::from_millis(10)).await;
        let events = drain(&mut rx);
        assert!(events.iter().any(|o| matches!(o.event, ServerEvent::Joined { is_host: true, .. })));
        assert_eq!(board_updates(&events), 2);

        // One gravity tick updates both boards
        sleep(Duration::from_millis(1000)).await;
        assert_eq!(board_updates(&drain(&mut rx)), 2);

        tx.send(inbound("c1", Command::Leave)).await.unwrap();
        tx.send(inbound("c2", Command::Leave)).await.unwrap();
        sleep(Duration::from_millis(5000)).await;
        assert_eq!(board_updates(&drain(&mut rx)), 0);

        drop(tx);
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_go_back_to_sender() {
        let (_handle, tx, mut rx) = spawn(GameplaySettings::default());
        tx.send(inbound(
            "c1",
            Command::Move {
                direction: "left".into(),
            },
        ))
        .await
        .unwrap();

        let reply = rx.recv().await.unwrap();
        assert_eq!(reply.to, "c1");
        assert!(matches!(reply.event, ServerEvent::MoveError { .. }));
    }
}
