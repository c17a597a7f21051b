//! In-memory server side for driving a `LineClient` in tests.

use std::time::Duration;

use mcp_line_client::rpc::{LineClient, Request};
use tokio::io::{
    duplex, split, AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf,
    WriteHalf,
};

pub type TestClient = LineClient<ReadHalf<DuplexStream>, WriteHalf<DuplexStream>>;

/// The far end of a client's streams, standing in for the server process.
pub struct MockServer {
    lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
    writer: WriteHalf<DuplexStream>,
}

impl MockServer {
    /// Read and parse the next request line.
    pub async fn read_request(&mut self) -> Request {
        let line = self
            .lines
            .next_line()
            .await
            .expect("read failed")
            .expect("client closed its stream");
        serde_json::from_str(&line).expect("client wrote invalid JSON")
    }

    /// Returns the next raw line if one arrives within `wait`.
    pub async fn try_read_line(&mut self, wait: Duration) -> Option<String> {
        tokio::time::timeout(wait, self.lines.next_line())
            .await
            .ok()
            .and_then(Result::ok)
            .flatten()
    }

    /// Write raw bytes to the client.
    pub async fn write_bytes(&mut self, data: &[u8]) {
        self.writer.write_all(data).await.unwrap();
        self.writer.flush().await.unwrap();
    }

    /// Write raw text to the client.
    pub async fn write_raw(&mut self, data: &str) {
        self.write_bytes(data.as_bytes()).await;
    }

    /// Write one line to the client.
    pub async fn write_line(&mut self, line: &str) {
        self.write_raw(&format!("{line}\n")).await;
    }
}

/// Create a client connected to an in-memory server.
pub fn pair() -> (TestClient, MockServer) {
    let (client_io, server_io) = duplex(64 * 1024);
    let (client_r, client_w) = split(client_io);
    let (server_r, server_w) = split(server_io);
    (
        LineClient::new(client_r, client_w),
        MockServer {
            lines: BufReader::new(server_r).lines(),
            writer: server_w,
        },
    )
}

/// A `tools/call` result wrapping `payload` as text content.
pub fn tool_result(id: u64, payload: &serde_json::Value) -> String {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {"content": [{"type": "text", "text": payload.to_string()}]}
    })
    .to_string()
}
