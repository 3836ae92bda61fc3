//! spindle demo
//!
//! 1 リクエスト分のページを組み立て、flush されたチャンクを順に stdout へ出す。
//!
//! - `user` → `page`: primary（レイアウト）が待つタスク
//! - `feed`: 遅いタスク。primary を待たせず、pipe で後から流す
//! - `ads`: 失敗するタスク。失敗した結果でも断片は届く
//!
//! 使い方: `spindle-cli [config.json]`（ログは `RUST_LOG` で調整）

use std::time::Duration;

use anyhow::Context;
use serde_json::json;
use spindle_core::impls::{ChannelExchange, ChannelFrame, HandlebarsViews};
use spindle_core::{
    Dependencies, PipeOptions, RendererConfig, RequestContext, TaskError, ViewOptions,
};
use tokio::time::sleep;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const LAYOUT: &str = "<!doctype html><html><head><title>{{title}}</title></head><body>\
<h1>{{page.heading}}</h1><div id=\"feed\">loading…</div><div id=\"ads\"></div>\n";

const FEED: &str = "<ul>{{#each data}}<li>{{this}}</li>{{/each}}</ul>";

const ADS: &str = "{{#if error}}<!-- ads unavailable: {{error}} -->{{else}}{{data}}{{/if}}";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;
    let config = load_config(std::env::args().nth(1))?;

    let views = HandlebarsViews::new()
        .with_view("layout", LAYOUT)?
        .with_view("feed", FEED)?
        .with_view("ads", ADS)?;

    let (exchange, mut body) = ChannelExchange::new("GET", 16);
    let mut ctx = RequestContext::new(exchange, views).with_config(config);

    ctx.assign("user", &[], |_deps| async {
        sleep(Duration::from_millis(20)).await;
        Ok(json!({"name": "ann"}))
    })?;
    ctx.assign("page", &["user"], |deps: Dependencies| async move {
        let Some(name) = deps.data("user").and_then(|u| u["name"].as_str()) else {
            return Err(TaskError::new("user has no name"));
        };
        Ok(json!({"heading": format!("Hello, {name}")}))
    })?;
    ctx.assign("feed", &[], |_deps| async {
        sleep(Duration::from_millis(200)).await;
        Ok(json!(["first post", "second post"]))
    })?
    .render_required(false)
    .pipe("feed", PipeOptions::default())?;
    ctx.assign("ads", &[], |_deps| async {
        sleep(Duration::from_millis(50)).await;
        Err(TaskError::new("ad server timeout"))
    })?
    .pipe("ads", PipeOptions::default())?;

    ctx.render_view_streaming("layout", json!({"title": "spindle demo"}), ViewOptions::html());

    info!(request = %ctx.request_id(), "responding");
    let request = tokio::spawn(async move {
        let result = ctx.respond().await;
        (result, ctx.counts())
    });

    while let Some(frame) = body.recv().await {
        match frame {
            ChannelFrame::Head { status, headers } => {
                println!("HTTP {status}");
                for (name, value) in headers {
                    println!("{name}: {value}");
                }
                println!();
            }
            ChannelFrame::Data(chunk) => println!("{}", String::from_utf8_lossy(&chunk)),
        }
    }

    let (result, counts) = request.await.context("request task panicked")?;
    result?;
    info!(
        succeeded = counts.succeeded,
        failed = counts.failed,
        "request finished"
    );
    Ok(())
}

fn init_logging() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info,spindle_core=debug"))?;
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .context("install tracing subscriber")
}

fn load_config(path: Option<String>) -> anyhow::Result<RendererConfig> {
    let Some(path) = path else {
        return Ok(RendererConfig::default());
    };
    let raw = std::fs::read_to_string(&path).with_context(|| format!("read config {path}"))?;
    RendererConfig::from_json(&raw).with_context(|| format!("parse config {path}"))
}
