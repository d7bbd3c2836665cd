//! The CLI's [`ObjectHandler`]: one JSON document per line.

use std::io::Write;

use async_trait::async_trait;
use connector::{ConnectorObject, ObjectHandler, Timestamp};
use serde::Serialize;
use tracing::error;

#[derive(Serialize)]
struct Record<'a> {
    last_updated: i64,
    #[serde(flatten)]
    object: &'a ConnectorObject,
}

/// Writes each object as a JSON line, optionally stopping after `limit`
/// objects.
///
/// A write failure stops the sync; the error is kept for the caller.
pub struct JsonLinesHandler<W> {
    writer: W,
    limit: Option<u64>,
    written: u64,
    failure: Option<std::io::Error>,
}

impl<W: Write + Send> JsonLinesHandler<W> {
    pub fn new(writer: W, limit: Option<u64>) -> Self {
        Self {
            writer,
            limit,
            written: 0,
            failure: None,
        }
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flushes the writer and returns the first write failure, if any.
    pub fn finish(mut self) -> std::io::Result<W> {
        if let Some(err) = self.failure.take() {
            return Err(err);
        }
        self.writer.flush()?;
        Ok(self.writer)
    }

    fn limit_reached(&self) -> bool {
        self.limit.is_some_and(|limit| self.written >= limit)
    }

    fn write_record(&mut self, object: &ConnectorObject, last_updated: Timestamp) -> std::io::Result<()> {
        let record = Record {
            last_updated: last_updated.as_millis(),
            object,
        };
        serde_json::to_writer(&mut self.writer, &record)?;
        self.writer.write_all(b"\n")
    }
}

#[async_trait]
impl<W: Write + Send> ObjectHandler for JsonLinesHandler<W> {
    async fn handle(&mut self, object: ConnectorObject, last_updated: Timestamp) -> bool {
        if self.limit_reached() {
            return false;
        }
        if let Err(err) = self.write_record(&object, last_updated) {
            error!(uid = %object.uid(), error = %err, "Failed to write object");
            self.failure = Some(err);
            return false;
        }
        self.written += 1;
        !self.limit_reached()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use connector::schema::{ObjectClass, TAGS};
    use connector::Uid;
    use std::collections::BTreeSet;

    fn object(uid: &str) -> ConnectorObject {
        let mut object = ConnectorObject::new(ObjectClass::new("Code Scanning Alert"), Uid::new(uid).unwrap());
        object.set_attribute(&TAGS, BTreeSet::from(["security".to_string()]));
        object
    }

    #[tokio::test]
    async fn test_writes_one_json_document_per_line() {
        let mut handler = JsonLinesHandler::new(Vec::new(), None);
        let ts = Timestamp::from_millis(1_000).unwrap();

        assert!(handler.handle(object("js/xss"), ts).await);
        assert!(handler.handle(object("py/sqli"), ts).await);

        let out = String::from_utf8(handler.finish().unwrap()).unwrap();
        let lines: Vec<serde_json::Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["uid"], "js/xss");
        assert_eq!(lines[0]["name"], "js/xss");
        assert_eq!(lines[0]["last_updated"], 1_000);
        assert_eq!(lines[1]["attributes"]["TAGS"], serde_json::json!(["security"]));
    }

    #[tokio::test]
    async fn test_stops_once_the_limit_is_reached() {
        let mut handler = JsonLinesHandler::new(Vec::new(), Some(2));
        let ts = Timestamp::now();

        assert!(handler.handle(object("a"), ts).await);
        assert!(!handler.handle(object("b"), ts).await);
        assert_eq!(handler.written(), 2);
    }

    #[tokio::test]
    async fn test_zero_limit_writes_nothing() {
        let mut handler = JsonLinesHandler::new(Vec::new(), Some(0));

        assert!(!handler.handle(object("a"), Timestamp::now()).await);
        assert_eq!(handler.written(), 0);
        assert!(handler.finish().unwrap().is_empty());
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_write_failures_stop_the_sync_and_are_reported() {
        let mut handler = JsonLinesHandler::new(BrokenPipe, None);

        assert!(!handler.handle(object("a"), Timestamp::now()).await);
        assert_eq!(handler.written(), 0);
        let err = handler.finish().err().unwrap();
        assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);
    }
}
