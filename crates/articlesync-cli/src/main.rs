//! # Article Sync CLI
//!
//! Command-line utilities for inspecting edit actions offline.
//!
//! Actions are read and printed in their wire form. `null` stands for
//! `NoAction`.

use anyhow::{Context, Result};
use articlesync_adapter_api::{decode_article_id, encode_article_id};
use articlesync_core::{apply, classify, merge, merge_order, DocId, EditAction};
use articlesync_proto::{decode, encode, ActionEnvelope, CodecError, TopicScheme, WireAction};
use std::env;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_help();
        return Ok(());
    }

    match args[1].as_str() {
        "diff" => {
            if args.len() < 4 {
                eprintln!("Usage: articlesync diff <old-file> <new-file>");
                std::process::exit(1);
            }
            let old = read_text(&args[2])?;
            let new = read_text(&args[3])?;
            println!("{}", action_to_json(&classify(&old, &new))?);
        }
        "apply" => {
            if args.len() < 4 {
                eprintln!("Usage: articlesync apply <file> <action-json>");
                std::process::exit(1);
            }
            let baseline = read_text(&args[2])?;
            let action = action_from_json(&args[3])?;
            let result = apply(&baseline, &action).context("Failed to apply action")?;
            print!("{result}");
        }
        "merge" => {
            if args.len() < 5 {
                eprintln!("Usage: articlesync merge <baseline-file> <local-json> <remote-json>");
                std::process::exit(1);
            }
            let baseline = read_text(&args[2])?;
            let local = action_from_json(&args[3])?;
            let remote = action_from_json(&args[4])?;
            eprintln!("order: {:?}", merge_order(&local, &remote));
            let merged = merge(&baseline, &local, &remote).context("Failed to merge actions")?;
            print!("{merged}");
        }
        "topic" => {
            if args.len() < 3 {
                eprintln!("Usage: articlesync topic <tenant> [article-id]");
                std::process::exit(1);
            }
            let scheme = TopicScheme::new(args[2].as_str());
            println!("{}", topic_for(&scheme, args.get(3).map(String::as_str)));
        }
        "inspect" => {
            if args.len() < 3 {
                eprintln!("Usage: articlesync inspect <payload-file>");
                std::process::exit(1);
            }
            let bytes = std::fs::read(&args[2])
                .with_context(|| format!("Failed to read {}", args[2]))?;
            let envelope = ActionEnvelope::from_cbor(&bytes).context("Invalid CBOR envelope")?;
            let stamp = envelope.stamp().context("Invalid edit stamp")?;
            eprintln!("stamp: {stamp}");
            println!("{}", envelope.to_json()?);
        }
        "encode" => {
            if args.len() < 3 {
                eprintln!("Usage: articlesync encode <article-id>");
                std::process::exit(1);
            }
            println!("{}", encode_article_id(&args[2]));
        }
        "decode" => {
            if args.len() < 3 {
                eprintln!("Usage: articlesync decode <encoded>");
                std::process::exit(1);
            }
            let decoded = decode_article_id(&args[2]).context("Failed to decode")?;
            println!("{decoded}");
        }
        "help" | "--help" | "-h" => {
            print_help();
        }
        cmd => {
            eprintln!("Unknown command: {cmd}");
            print_help();
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Action topic of one article, or the tenant-wide wildcard.
fn topic_for(scheme: &TopicScheme, article_id: Option<&str>) -> String {
    match article_id {
        Some(id) => scheme.action(&DocId::new(id).topic_hash()),
        None => scheme.tenant_wildcard(),
    }
}

fn read_text(path: &str) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))
}

fn action_to_json(action: &EditAction) -> Result<String> {
    let wire = match encode(action) {
        Ok(wire) => Some(wire),
        Err(CodecError::NoAction) => None,
        Err(err) => return Err(err.into()),
    };
    Ok(serde_json::to_string(&wire)?)
}

fn action_from_json(json: &str) -> Result<EditAction> {
    let wire: Option<WireAction> =
        serde_json::from_str(json).with_context(|| format!("Invalid action JSON: {json}"))?;
    match wire {
        None => Ok(EditAction::NoAction),
        Some(wire) => decode(wire).context("Invalid action"),
    }
}

fn print_help() {
    println!(
        r#"Article Sync CLI

USAGE:
    articlesync <COMMAND> [OPTIONS]

COMMANDS:
    diff <old-file> <new-file>                 Classify the edit between two texts
    apply <file> <action-json>                 Apply an action to a text
    merge <baseline-file> <local> <remote>     Merge a local and a remote action
    topic <tenant> [article-id]                Print an article's MQTT action topic,
                                               or the tenant wildcard
    inspect <payload-file>                     Print a captured CBOR envelope as JSON
    encode <article-id>                        Percent-encode an article ID
    decode <encoded>                           Decode a percent-encoded article ID
    help                                       Show this help message

EXAMPLES:
    articlesync diff before.md after.md
    articlesync apply before.md '{{"kind":"insert","position":5,"text":"!"}}'
    articlesync merge base.md '{{"kind":"insert","position":2,"text":"X"}}' null
    articlesync topic newsroom "2024/elections-live"
"#
    );
}
