//! The single-writer game loop.
//!
//! Every world mutation funnels through this task: inbound commands from the
//! per-connection reader tasks, the periodic item-spawn tick, and the effect
//! queue's deadlines. Broadcasts are handed to the registry's per-connection
//! queues and never awaited here.

use crate::analytics::AnalyticsSink;
use crate::registry::Registry;
use crate::utils::now_ms;
use crate::world::{MoveInput, Outbound, World};
use log::debug;
use shared::{ClientEvent, PlayerId, ITEM_SPAWN_INTERVAL_MS};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, sleep, Duration, MissedTickBehavior};

/// Commands submitted to the game loop by the transport layer.
#[derive(Debug)]
pub enum Command {
    /// A new connection: register its outbound queue, create its player and
    /// report the allocated id back to the reader task.
    Connect {
        sender: mpsc::Sender<String>,
        ack: oneshot::Sender<PlayerId>,
    },
    Disconnect {
        id: PlayerId,
    },
    Event {
        id: PlayerId,
        event: ClientEvent,
    },
}

/// Runs until the command channel closes (i.e. the listener is gone).
pub async fn run_game_loop(
    mut world: World,
    mut registry: Registry,
    mut commands: mpsc::Receiver<Command>,
    mut analytics: AnalyticsSink,
) {
    let mut spawn_ticker = interval(Duration::from_millis(ITEM_SPAWN_INTERVAL_MS));
    spawn_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // Skip the first tick since it fires immediately.
    spawn_ticker.tick().await;

    loop {
        let next_deadline = world.effects.next_due();

        tokio::select! {
            command = commands.recv() => {
                match command {
                    Some(command) => {
                        process_command(&mut world, &mut registry, &mut analytics, command)
                    }
                    None => {
                        debug!("Command channel closed, game loop stopping");
                        break;
                    }
                }
            }
            _ = spawn_ticker.tick() => {
                route(&registry, world.spawn_item(now_ms()));
            }
            _ = sleep_until_ms(next_deadline), if next_deadline.is_some() => {
                route(&registry, world.tick_effects(now_ms()));
            }
        }
    }
}

async fn sleep_until_ms(due: Option<u64>) {
    if let Some(due) = due {
        let now = now_ms();
        if due > now {
            sleep(Duration::from_millis(due - now)).await;
        }
    }
}

/// Applies one command to the world and routes whatever events it produced.
pub fn process_command(
    world: &mut World,
    registry: &mut Registry,
    analytics: &mut AnalyticsSink,
    command: Command,
) {
    match command {
        Command::Connect { sender, ack } => {
            let (id, events) = world.add_player();
            // Register before routing so the init snapshot has a queue.
            registry.add_session(id, sender);
            route(registry, events);
            if ack.send(id).is_err() {
                // Reader task died between accept and ack; normal teardown
                // will follow with its Disconnect command.
                debug!("Connection for player {} vanished before ack", id);
            }
        }
        Command::Disconnect { id } => {
            registry.remove_session(id);
            route(registry, world.remove_player(id));
        }
        Command::Event { id, event } => match event {
            ClientEvent::SetName { name } => {
                route(registry, world.set_name(id, name));
            }
            ClientEvent::Move {
                up,
                down,
                left,
                right,
                direction,
            } => {
                let input = MoveInput {
                    up,
                    down,
                    left,
                    right,
                    direction,
                };
                let (events, sample) = world.apply_move(id, &input);
                if let Some(sample) = sample {
                    analytics.record_move(&sample);
                }
                route(registry, events);
            }
            ClientEvent::Attack => {
                let (events, samples) = world.attack(id, now_ms());
                for sample in &samples {
                    analytics.record_attack(sample);
                }
                route(registry, events);
            }
            ClientEvent::UseItem { slot } => {
                route(registry, world.use_item(id, slot, now_ms()));
            }
            ClientEvent::Chat { message } => {
                route(registry, world.chat(id, message, now_ms()));
            }
        },
    }
}

fn route(registry: &Registry, events: Vec<Outbound>) {
    for event in events {
        match event {
            Outbound::All(event) => registry.broadcast(&event),
            Outbound::AllExcept(id, event) => registry.broadcast_except(id, &event),
            Outbound::To(id, event) => registry.unicast(id, &event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SESSION_QUEUE_DEPTH;
    use serde_json::Value;
    use shared::Direction;

    struct Fixture {
        world: World,
        registry: Registry,
        analytics: AnalyticsSink,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                world: World::with_seed(7),
                registry: Registry::new(),
                analytics: AnalyticsSink::disabled(),
            }
        }

        fn connect(&mut self) -> (PlayerId, mpsc::Receiver<String>) {
            let (tx, rx) = mpsc::channel(SESSION_QUEUE_DEPTH);
            let (ack_tx, mut ack_rx) = oneshot::channel();
            process_command(
                &mut self.world,
                &mut self.registry,
                &mut self.analytics,
                Command::Connect {
                    sender: tx,
                    ack: ack_tx,
                },
            );
            (ack_rx.try_recv().unwrap(), rx)
        }

        fn submit(&mut self, id: PlayerId, event: ClientEvent) {
            process_command(
                &mut self.world,
                &mut self.registry,
                &mut self.analytics,
                Command::Event { id, event },
            );
        }
    }

    fn next_json(rx: &mut mpsc::Receiver<String>) -> Value {
        serde_json::from_str(&rx.try_recv().unwrap()).unwrap()
    }

    #[test]
    fn test_connect_sends_init_to_newcomer_and_join_to_rest() {
        let mut fixture = Fixture::new();
        let (a, mut rx_a) = fixture.connect();

        let init = next_json(&mut rx_a);
        assert_eq!(init["type"], "gameInit");
        assert_eq!(init["playerId"], a);

        let (b, mut rx_b) = fixture.connect();
        let joined = next_json(&mut rx_a);
        assert_eq!(joined["type"], "playerJoined");
        assert_eq!(joined["player"]["id"], b);

        let init_b = next_json(&mut rx_b);
        assert_eq!(init_b["type"], "gameInit");
        assert_eq!(init_b["players"].as_object().unwrap().len(), 2);
    }

    #[test]
    fn test_move_event_broadcasts_to_others_only() {
        let mut fixture = Fixture::new();
        let (a, mut rx_a) = fixture.connect();
        let (_b, mut rx_b) = fixture.connect();
        let _ = rx_a.try_recv(); // drain gameInit
        let _ = rx_a.try_recv(); // drain playerJoined
        let _ = rx_b.try_recv(); // drain gameInit

        fixture.submit(
            a,
            ClientEvent::Move {
                up: false,
                down: false,
                left: false,
                right: true,
                direction: Direction::Right,
            },
        );

        let moved = next_json(&mut rx_b);
        assert_eq!(moved["type"], "playerMoved");
        assert_eq!(moved["id"], a);
        assert_eq!(moved["step"], 1);
        assert!(rx_a.try_recv().is_err(), "mover gets no echo");
    }

    #[test]
    fn test_disconnect_broadcasts_player_left() {
        let mut fixture = Fixture::new();
        let (a, _rx_a) = fixture.connect();
        let (_b, mut rx_b) = fixture.connect();
        let _ = rx_b.try_recv(); // drain gameInit

        process_command(
            &mut fixture.world,
            &mut fixture.registry,
            &mut fixture.analytics,
            Command::Disconnect { id: a },
        );

        assert!(fixture.world.players.get(&a).is_none());
        let left = next_json(&mut rx_b);
        assert_eq!(left["type"], "playerLeft");
        assert_eq!(left["id"], a);
    }

    #[test]
    fn test_chat_relays_to_everyone_with_timestamp() {
        let mut fixture = Fixture::new();
        let (a, mut rx_a) = fixture.connect();
        let (_b, mut rx_b) = fixture.connect();
        let _ = rx_a.try_recv();
        let _ = rx_a.try_recv();
        let _ = rx_b.try_recv();

        fixture.submit(
            a,
            ClientEvent::Chat {
                message: "gg".to_string(),
            },
        );

        for rx in [&mut rx_a, &mut rx_b] {
            let chat = next_json(rx);
            assert_eq!(chat["type"], "chat");
            assert_eq!(chat["message"], "gg");
            assert_eq!(chat["name"], "anonymous");
            assert!(chat["timestamp"].as_u64().unwrap() > 0);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_game_loop_spawns_items_on_cadence() {
        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        let loop_handle = tokio::spawn(run_game_loop(
            World::with_seed(7),
            Registry::new(),
            cmd_rx,
            AnalyticsSink::disabled(),
        ));

        let (tx, mut rx) = mpsc::channel(SESSION_QUEUE_DEPTH);
        let (ack_tx, ack_rx) = oneshot::channel();
        cmd_tx
            .send(Command::Connect {
                sender: tx,
                ack: ack_tx,
            })
            .await
            .unwrap();
        ack_rx.await.unwrap();
        let init = rx.recv().await.unwrap();
        assert!(init.contains("\"gameInit\""));

        // Paused clock: advancing past the interval forces a spawn tick.
        tokio::time::advance(Duration::from_millis(ITEM_SPAWN_INTERVAL_MS + 50)).await;
        let created = rx.recv().await.unwrap();
        assert!(created.contains("\"itemCreated\""));

        drop(cmd_tx);
        loop_handle.await.unwrap();
    }
}
