//! Incremental newline-delimited JSON request bodies
//!
//! Producers stream one JSON value per line over a single long request.
//! Lines are handed over as soon as their newline arrives so the values reach
//! live watchers while the upload is still in progress.

use axum::body::Body;
use futures::StreamExt;

/// Feed every non-blank, trimmed line of `body` to `on_line`.
///
/// A trailing line without a newline is delivered when the body ends.
pub async fn for_each_line<F>(body: Body, mut on_line: F) -> Result<(), axum::Error>
where
    F: FnMut(&str),
{
    let mut stream = body.into_data_stream();
    let mut buffer: Vec<u8> = Vec::new();

    while let Some(chunk) = stream.next().await {
        buffer.extend_from_slice(&chunk?);
        while let Some(newline) = buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = buffer.drain(..=newline).collect();
            emit(&line[..newline], &mut on_line);
        }
    }
    emit(&buffer, &mut on_line);

    Ok(())
}

fn emit<F: FnMut(&str)>(line: &[u8], on_line: &mut F) {
    let text = String::from_utf8_lossy(line);
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        on_line(trimmed);
    }
}
