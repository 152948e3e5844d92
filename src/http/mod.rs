//! HTTP pieces of the CONNECT handshake.
//!
//! Only the client side of a single CONNECT exchange is covered here; there is
//! no general purpose HTTP client.
//!
//! # Architecture
//!
//! - **`status`**: Parses the response status line (`HTTP/1.1 200 Connection Established`)
//! - **`parser`**: Splits a proxy response head into status line and headers
//! - **`response`**: The `ProxyResponse` capability and the byte-accumulating `ConnectResponse`
//! - **`writer`**: Writes the serialized CONNECT request to the proxy socket
//!
//! # Response accumulation
//!
//! ```text
//!        ┌─────────────┐
//!        │   Pending   │ ← Waiting for "\r\n\r\n"
//!        └──────┬──────┘
//!               │ Head terminator received
//!               ├─ Status line parses → Parsed (body until Content-Length)
//!               └─ Anything else      → Malformed (raw bytes are the content)
//! ```
//!
//! # Example
//!
//! ```
//! use tunnelgate::http::response::{ConnectResponse, ProxyResponse};
//!
//! let response = ConnectResponse::from_bytes(
//!     b"HTTP/1.1 407 Proxy Auth Required\r\nContent-Length: 6\r\n\r\ndenied",
//! );
//!
//! assert!(!response.is_missing_content());
//! assert_eq!(response.status().unwrap().status_code(), 407);
//! assert_eq!(response.error(), "denied");
//! ```

pub mod status;
pub mod parser;
pub mod response;
pub mod writer;
