//! Decodes a body stored in a file and prints the fields as JSON.
//!
//! ```text
//! cargo run --example decode_file -- 'multipart/form-data; boundary=AaB03x' body.bin
//! ```

use bytes::Bytes;
use micro_body::{ParseContext, parse_body};
use std::env;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let mut args = env::args().skip(1);
    let (Some(content_type), Some(path)) = (args.next(), args.next()) else {
        error!("usage: decode_file <content-type> <path>");
        return;
    };

    let body = match std::fs::read(&path) {
        Ok(bytes) => Bytes::from(bytes),
        Err(e) => {
            error!(cause = %e, path = %path, "failed to read body");
            return;
        }
    };

    info!(content_type = %content_type, size = body.len(), "decoding body");
    let fields = parse_body(&ParseContext::default(), Some(&content_type), &body);

    match serde_json::to_string_pretty(&fields) {
        Ok(json) => println!("{json}"),
        Err(e) => error!(cause = %e, "failed to render fields"),
    }
}
