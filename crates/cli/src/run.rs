// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use futures_util::stream::{self, StreamExt};
use tracing::info;

use doorbot::{ApiValue, Client, HistoryQuery};

use crate::config::{Command, Config};
use crate::download::{self, event_id};

/// Execute the parsed command against a fresh client.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let client = Client::new(config.client)?;

    match config.command {
        Command::Devices => print_json(&client.devices().await?)?,
        Command::History { limit, older_than } => {
            print_json(&client.history(&HistoryQuery { limit, older_than }).await?)?
        }
        Command::Dings => print_json(&client.dings().await?)?,
        Command::Links { limit } => {
            for url in links(&client, limit).await? {
                println!("{url}");
            }
        }
        Command::Download { limit, out, concurrency } => {
            let summary = download::run(&client, limit, &out, usize::from(concurrency)).await?;
            info!(%summary, out = %out.display(), "download finished");
            println!("{summary}");
        }
        Command::AlarmDevices { location } => {
            let reply = client.alarm_devices(&location).await?;
            print_json(reply.body())?;
            client.close_alarm(&location).await;
        }
        Command::AlarmMode { location, zid, mode, bypass } => {
            let reply = client.set_alarm_mode(&location, &zid, mode, &bypass).await?;
            print_json(&reply.raw)?;
            client.close_alarm(&location).await;
        }
    }
    Ok(())
}

/// Recording URL of each recent event, in history order.
async fn links(client: &Client, limit: Option<u32>) -> anyhow::Result<Vec<String>> {
    let page = client.history(&HistoryQuery { limit, older_than: None }).await?;
    let ids: Vec<String> = page.as_array().unwrap_or(&[]).iter().filter_map(event_id).collect();

    let urls: Vec<_> = stream::iter(ids)
        .map(|id| async move { client.recording(&id).await })
        .buffered(10)
        .collect()
        .await;
    Ok(urls.into_iter().collect::<Result<_, _>>()?)
}

fn print_json(value: &ApiValue) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&value.to_json())?);
    Ok(())
}
