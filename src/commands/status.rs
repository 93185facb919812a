use anyhow::Result;
use serde::Serialize;
use voidcrawler_storage::Storage;

#[derive(Serialize)]
struct StatusCounts {
    nodes: i64,
    edges: i64,
}

pub async fn run(db_path: &str, json: bool) -> Result<()> {
    let storage = Storage::open(db_path).await?;

    let nodes = storage.node_count().await?;
    let edges = storage.edge_count().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&StatusCounts { nodes, edges })?);
        return Ok(());
    }

    println!("\n╔══════════════════════════════════════════════╗");
    println!("║              VoidCrawler Status               ║");
    println!("╠══════════════════════════════════════════════╣");
    println!("║ Nodes crawled:      {:>20}    ║", nodes);
    println!("║ Edges discovered:   {:>20}    ║", edges);
    println!("╚══════════════════════════════════════════════╝\n");

    Ok(())
}
