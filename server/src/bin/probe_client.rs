//! Headless protocol probe: connects to a running server, drives a few
//! events and prints everything the server sends back. Handy for manual
//! testing without a rendering client.

use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::{sleep, Duration};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:3000".to_string());

    println!("Connecting to {}", addr);
    let stream = TcpStream::connect(&addr).await?;
    let (read_half, mut write_half) = stream.into_split();

    tokio::spawn(async move {
        let mut lines = BufReader::new(read_half).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            println!("<- {}", line);
        }
        println!("Server closed the connection");
    });

    let events = vec![
        json!({"type": "setName", "name": "probe"}),
        json!({"type": "chat", "message": "probe online"}),
        json!({"type": "move", "up": false, "down": false, "left": false,
               "right": true, "direction": "right"}),
        json!({"type": "move", "up": true, "down": false, "left": false,
               "right": true, "direction": "right"}),
        json!({"type": "attack"}),
        json!({"type": "useItem", "slot": 0}),
    ];

    for event in events {
        let line = event.to_string();
        println!("-> {}", line);
        write_half.write_all(line.as_bytes()).await?;
        write_half.write_all(b"\n").await?;
        sleep(Duration::from_millis(500)).await;
    }

    // Linger to observe broadcasts from other players and item spawns.
    sleep(Duration::from_secs(10)).await;
    Ok(())
}
