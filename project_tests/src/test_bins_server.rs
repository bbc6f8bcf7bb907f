use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use lib_wastebins::core::COLLECTION_THRESHOLD;

/// Walks a running bin server through the create, fill, sort and route flow.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Address of the running server
    #[clap(short, long, default_value = "127.0.0.1:8080")]
    addr: String,
}

struct Reply {
    status_line: String,
    body: Value,
}

async fn send(addr: &str, method: &str, path: &str, body: &str) -> Result<Reply> {
    let mut stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("failed to connect to {}", addr))?;

    let raw = format!(
        "{} {} HTTP/1.1\r\nHost: {}\r\nContent-Length: {}\r\n\r\n{}",
        method,
        path,
        addr,
        body.len(),
        body
    );
    stream.write_all(raw.as_bytes()).await?;

    let mut reply = String::new();
    stream.read_to_string(&mut reply).await?;

    let Some((head, body)) = reply.split_once("\r\n\r\n") else {
        bail!("reply without header terminator: {:?}", reply);
    };
    let status_line = head.lines().next().unwrap_or_default().to_string();
    let body = serde_json::from_str(body).with_context(|| format!("body is not JSON: {:?}", body))?;
    Ok(Reply { status_line, body })
}

fn show(step: &str, reply: &Reply) {
    println!("{:<28} {} {}", step, reply.status_line, reply.body);
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    println!("Testing bin server at {}...", args.addr);

    let created = send(&args.addr, "POST", "/bins", "location=Library&type=plastic&fill=75").await?;
    show("create Library", &created);
    let id = created.body["id"]
        .as_u64()
        .context("created bin has no numeric id")?;

    let filled = send(&args.addr, "POST", &format!("/bins/{}/fill", id), "").await?;
    show("fill", &filled);

    let sorted = send(&args.addr, "POST", &format!("/bins/{}/sort", id), "").await?;
    show("sort", &sorted);

    let route = send(&args.addr, "GET", "/route", "").await?;
    show("route", &route);
    let level = filled.body["fillLevel"].as_f64().unwrap_or_default();
    let on_route = route.body["route"]
        .as_array()
        .is_some_and(|ids| ids.iter().any(|v| v.as_u64() == Some(id)));
    if on_route != (level >= COLLECTION_THRESHOLD) {
        bail!("bin {} is at {} but on_route={}", id, level, on_route);
    }

    let missing = send(&args.addr, "POST", "/bins/999999/fill", "").await?;
    show("fill unknown bin", &missing);

    let all = send(&args.addr, "GET", "/bins", "").await?;
    show("list", &all);

    println!("All steps completed.");
    Ok(())
}
